//! Synthesis session lifecycle: one synthesizer plus its service connection,
//! reused across speak requests.

use crate::credentials::CredentialStore;
use crate::dispatch::{EventDispatcher, SynthesisEventSink};
use crate::engine::{EngineHandle, SynthesisChannel};
use crate::ssml::{self, SpeakOptions};
use crate::{Result, SpeechBridgeError};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisState {
    Idle,
    Connecting,
    Speaking,
}

struct ActiveSynthesis {
    id: Uuid,
    handle: Arc<dyn EngineHandle>,
    channel: Box<dyn SynthesisChannel>,
}

/// State machine coordinating SSML assembly and the engine's synthesis
/// primitives. A repeat start reuses the existing connection (interrupt,
/// rotate token, reopen) instead of rebuilding, unless the subscription
/// identity changed underneath it.
pub struct SynthesisSessionController {
    store: Arc<CredentialStore>,
    dispatcher: EventDispatcher,
    session: Option<ActiveSynthesis>,
    state: SynthesisState,
}

impl SynthesisSessionController {
    pub fn new(store: Arc<CredentialStore>, dispatcher: EventDispatcher) -> Self {
        Self {
            store,
            dispatcher,
            session: None,
            state: SynthesisState::Idle,
        }
    }

    pub fn state(&self) -> SynthesisState {
        self.state
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Speak the given text.
    ///
    /// Ensures a live synthesizer first (building or reusing the engine
    /// connection), then validates the request, then submits the markup
    /// document. Validation failures therefore leave a usable session
    /// behind but issue no engine speak call.
    pub fn start(&mut self, token: &str, options: &SpeakOptions) -> Result<()> {
        self.state = SynthesisState::Connecting;
        match self.ensure_channel(token) {
            Ok(()) => {}
            Err(e) => {
                self.state = SynthesisState::Idle;
                return Err(e);
            }
        }

        if options.text.is_empty() || options.identifier.is_empty() {
            self.state = SynthesisState::Idle;
            return Err(SpeechBridgeError::InvalidRequest);
        }

        let document = ssml::build_document(
            &options.text,
            &options.identifier,
            &options.role,
            &options.style,
        );

        let session = self.session.as_mut().expect("channel ensured above");
        match session.channel.speak_ssml(&document) {
            Ok(()) => {
                self.state = SynthesisState::Speaking;
                info!(session = %session.id, "Speak request submitted");
                Ok(())
            }
            Err(e) => {
                self.state = SynthesisState::Idle;
                Err(e)
            }
        }
    }

    fn ensure_channel(&mut self, token: &str) -> Result<()> {
        let handle = self.store.build("", token, "")?;

        if let Some(active) = self.session.as_mut() {
            if Arc::ptr_eq(&active.handle, &handle) {
                // Reuse: interrupt in-flight speech, refresh auth, reconnect
                debug!("Reusing synthesis connection");
                active.channel.stop_speaking()?;
                active.channel.rotate_token(token)?;
                active.channel.open_connection()?;
                return Ok(());
            }
            debug!("Engine handle changed, rebuilding synthesis channel");
            let mut stale = self.session.take().expect("checked above");
            stale.channel.close();
        }

        let sink = SynthesisEventSink::new(self.dispatcher.clone());
        let channel = handle.open_synthesis_channel(sink)?;
        self.session = Some(ActiveSynthesis {
            id: Uuid::new_v4(),
            handle,
            channel,
        });
        Ok(())
    }

    /// Interrupt the current utterance. The connection is preserved so a
    /// subsequent start reuses it.
    pub fn stop(&mut self) -> Result<()> {
        let result = match self.session.as_mut() {
            Some(active) => active.channel.stop_speaking(),
            None => Ok(()),
        };
        self.state = SynthesisState::Idle;
        result
    }

    /// Full teardown: close the synthesizer and connection.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.channel.close();
            info!("Synthesis session closed");
        }
        self.state = SynthesisState::Idle;
    }
}

impl Drop for SynthesisSessionController {
    fn drop(&mut self) {
        self.close();
    }
}
