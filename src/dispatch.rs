//! Marshals engine-thread callbacks onto the caller's delivery channel.
//!
//! The engine raises events from its own callback threads; `dispatch` is a
//! plain unbounded-channel send, so it hands off and returns without ever
//! blocking the engine thread on caller-side processing. Per-session ordering
//! holds because each session raises its events from a single producer.

use crate::events::{BridgeEvent, RecognitionEvent, SynthesisEvent};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

#[derive(Clone)]
pub struct EventDispatcher {
    event_tx: Sender<BridgeEvent>,
}

impl EventDispatcher {
    /// Create a dispatcher and the receiver the caller drains on its own
    /// context.
    pub fn new() -> (Self, Receiver<BridgeEvent>) {
        let (event_tx, event_rx) = unbounded();
        (Self { event_tx }, event_rx)
    }

    /// Forward one event. Never blocks; delivery fails silently only when the
    /// caller has dropped its receiver.
    pub fn dispatch(&self, event: BridgeEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("Event receiver dropped, discarding event");
        }
    }
}

/// Recognition-session view of the dispatcher, applying the product's
/// content filter before forwarding.
#[derive(Clone)]
pub struct RecognitionEventSink {
    dispatcher: EventDispatcher,
}

impl RecognitionEventSink {
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn raise(&self, event: RecognitionEvent) {
        // Final results with no text are suppressed; interim hypotheses are
        // forwarded unconditionally, including empty ones.
        if let RecognitionEvent::Recognized(text) = &event {
            if text.is_empty() {
                debug!("Suppressing empty recognized result");
                return;
            }
        }
        self.dispatcher.dispatch(BridgeEvent::Recognition(event));
    }
}

/// Synthesis-session view of the dispatcher. Pass-through; the only payload
/// kept is the engine's error detail on cancellation.
#[derive(Clone)]
pub struct SynthesisEventSink {
    dispatcher: EventDispatcher,
}

impl SynthesisEventSink {
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn raise(&self, event: SynthesisEvent) {
        self.dispatcher.dispatch(BridgeEvent::Synthesis(event));
    }
}
