//! Owning context for the whole bridge: one worker thread runs both session
//! controllers so potentially blocking engine calls never stall the caller,
//! while events flow back over the dispatcher channel.

use crate::audio::source::SourceFactory;
use crate::credentials::CredentialStore;
use crate::dispatch::EventDispatcher;
use crate::engine::SpeechEngine;
use crate::events::BridgeEvent;
use crate::session::{RecognitionSessionController, SynthesisSessionController};
use crate::ssml::SpeakOptions;
use crate::{Result, SpeechBridgeError};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

/// Commands accepted by the bridge worker.
#[derive(Debug)]
pub enum BridgeCommand {
    BuildConfig {
        subscription_key: String,
        authorization_token: String,
        region: String,
        reply: Sender<Result<bool>>,
    },
    StartRecognizing {
        token: String,
        language: String,
        reply: Sender<Result<()>>,
    },
    StopRecognition {
        reply: Sender<Result<()>>,
    },
    StartSynthesizing {
        token: String,
        options: SpeakOptions,
        reply: Sender<Result<()>>,
    },
    StopSynthesize {
        reply: Sender<Result<()>>,
    },
    Shutdown,
}

/// Pending result of one bridge operation.
///
/// The worker completes it once the underlying engine call returns; `wait`
/// is the caller's explicit synchronous join.
pub struct Reply<T> {
    reply_rx: Receiver<Result<T>>,
}

impl<T> Reply<T> {
    fn pending() -> (Sender<Result<T>>, Self) {
        let (reply_tx, reply_rx) = bounded(1);
        (reply_tx, Self { reply_rx })
    }

    fn failed(error: SpeechBridgeError) -> Self {
        let (reply_tx, reply) = Self::pending();
        let _ = reply_tx.send(Err(error));
        reply
    }

    /// Block until the worker finishes the operation.
    pub fn wait(self) -> Result<T> {
        self.reply_rx
            .recv()
            .map_err(|_| SpeechBridgeError::Channel("bridge worker stopped".into()))?
    }

    /// Non-blocking poll; `None` while the operation is still running.
    pub fn try_wait(&self) -> Option<Result<T>> {
        self.reply_rx.try_recv().ok()
    }
}

/// Caller-side handle: issues commands, drains events, owns the worker.
pub struct BridgeHandle {
    command_tx: Sender<BridgeCommand>,
    event_rx: Receiver<BridgeEvent>,
    worker: Option<JoinHandle<()>>,
}

impl BridgeHandle {
    fn send(&self, command: BridgeCommand) -> bool {
        self.command_tx.send(command).is_ok()
    }

    pub fn build_config(
        &self,
        subscription_key: &str,
        authorization_token: &str,
        region: &str,
    ) -> Reply<bool> {
        let (reply_tx, reply) = Reply::pending();
        let sent = self.send(BridgeCommand::BuildConfig {
            subscription_key: subscription_key.to_string(),
            authorization_token: authorization_token.to_string(),
            region: region.to_string(),
            reply: reply_tx,
        });
        if !sent {
            return Reply::failed(SpeechBridgeError::Channel("bridge worker stopped".into()));
        }
        reply
    }

    pub fn start_recognizing(&self, token: &str, language: &str) -> Reply<()> {
        let (reply_tx, reply) = Reply::pending();
        let sent = self.send(BridgeCommand::StartRecognizing {
            token: token.to_string(),
            language: language.to_string(),
            reply: reply_tx,
        });
        if !sent {
            return Reply::failed(SpeechBridgeError::Channel("bridge worker stopped".into()));
        }
        reply
    }

    pub fn stop_recognition(&self) -> Reply<()> {
        let (reply_tx, reply) = Reply::pending();
        if !self.send(BridgeCommand::StopRecognition { reply: reply_tx }) {
            return Reply::failed(SpeechBridgeError::Channel("bridge worker stopped".into()));
        }
        reply
    }

    pub fn start_synthesizing(&self, token: &str, options: SpeakOptions) -> Reply<()> {
        let (reply_tx, reply) = Reply::pending();
        let sent = self.send(BridgeCommand::StartSynthesizing {
            token: token.to_string(),
            options,
            reply: reply_tx,
        });
        if !sent {
            return Reply::failed(SpeechBridgeError::Channel("bridge worker stopped".into()));
        }
        reply
    }

    pub fn stop_synthesize(&self) -> Reply<()> {
        let (reply_tx, reply) = Reply::pending();
        if !self.send(BridgeCommand::StopSynthesize { reply: reply_tx }) {
            return Reply::failed(SpeechBridgeError::Channel("bridge worker stopped".into()));
        }
        reply
    }

    /// Try to receive one pushed event without blocking.
    pub fn try_recv_event(&self) -> Option<BridgeEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Block up to `timeout` for the next pushed event.
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<BridgeEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// The raw event stream, for callers draining on their own context.
    pub fn event_receiver(&self) -> Receiver<BridgeEvent> {
        self.event_rx.clone()
    }

    /// Stop any active session, release the engine handle, and join the
    /// worker.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let _ = self.command_tx.send(BridgeCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Bridge worker panicked during shutdown");
            }
        }
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

/// Entry point tying engine, credential store, and controllers together.
pub struct SpeechBridge;

impl SpeechBridge {
    /// Spawn the bridge worker with an explicit capture source factory.
    pub fn spawn(engine: Arc<dyn SpeechEngine>, source_factory: SourceFactory) -> Result<BridgeHandle> {
        let (command_tx, command_rx) = bounded(16);
        let (dispatcher, event_rx) = EventDispatcher::new();

        let worker = thread::Builder::new()
            .name("speech-bridge".into())
            .spawn(move || {
                // Controllers hold non-Send device guards, so they are
                // constructed here and never leave this thread.
                let store = Arc::new(CredentialStore::new(engine));
                let mut recognition = RecognitionSessionController::new(
                    Arc::clone(&store),
                    dispatcher.clone(),
                    source_factory,
                );
                let mut synthesis =
                    SynthesisSessionController::new(Arc::clone(&store), dispatcher.clone());

                info!("Bridge worker started");
                while let Ok(command) = command_rx.recv() {
                    match command {
                        BridgeCommand::BuildConfig {
                            subscription_key,
                            authorization_token,
                            region,
                            reply,
                        } => {
                            let result = store
                                .build(&subscription_key, &authorization_token, &region)
                                .map(|_| true);
                            let _ = reply.send(result);
                        }
                        BridgeCommand::StartRecognizing {
                            token,
                            language,
                            reply,
                        } => {
                            let result = recognition.start(&token, &language);
                            if let Err(e) = &result {
                                dispatcher
                                    .dispatch(BridgeEvent::Exception(format!("Exception: {}", e)));
                            }
                            let _ = reply.send(result);
                        }
                        BridgeCommand::StopRecognition { reply } => {
                            // Best-effort: errors are surfaced out of band,
                            // the call itself always succeeds.
                            if let Err(e) = recognition.stop() {
                                dispatcher
                                    .dispatch(BridgeEvent::Exception(format!("Exception: {}", e)));
                            }
                            let _ = reply.send(Ok(()));
                        }
                        BridgeCommand::StartSynthesizing {
                            token,
                            options,
                            reply,
                        } => {
                            let result = synthesis.start(&token, &options);
                            if let Err(e) = &result {
                                if matches!(e, SpeechBridgeError::Synthesis(_)) {
                                    dispatcher.dispatch(BridgeEvent::Exception(format!(
                                        "Exception: {}",
                                        e
                                    )));
                                }
                            }
                            let _ = reply.send(result);
                        }
                        BridgeCommand::StopSynthesize { reply } => {
                            let result = synthesis.stop();
                            if let Err(e) = &result {
                                dispatcher
                                    .dispatch(BridgeEvent::Exception(format!("Exception: {}", e)));
                            }
                            let _ = reply.send(result);
                        }
                        BridgeCommand::Shutdown => break,
                    }
                }

                // Detach sequence: sessions down, handle released
                let _ = recognition.stop();
                synthesis.close();
                store.reset();
                info!("Bridge worker stopped");
            })
            .map_err(|e| SpeechBridgeError::Channel(e.to_string()))?;

        Ok(BridgeHandle {
            command_tx,
            event_rx,
            worker: Some(worker),
        })
    }

    /// Spawn with the default microphone capture source.
    #[cfg(feature = "audio-io")]
    pub fn with_microphone(engine: Arc<dyn SpeechEngine>) -> Result<BridgeHandle> {
        Self::spawn(engine, crate::audio::source::microphone_factory())
    }
}
