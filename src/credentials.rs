//! Credential validation and the shared engine handle.

use crate::engine::{EngineHandle, SpeechEngine};
use crate::{Result, SpeechBridgeError};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Engine credentials. Exactly one of `subscription_key` /
/// `authorization_token` is non-empty at creation; the token may be rotated
/// afterwards without rebuilding the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub subscription_key: String,
    pub authorization_token: String,
    pub region: String,
}

impl Credentials {
    /// Subscription identity: region plus subscription key. Token rotation
    /// does not change identity.
    fn same_identity(&self, subscription_key: &str, region: &str) -> bool {
        let region_unchanged = region.is_empty() || region == self.region;
        let key_unchanged =
            subscription_key.is_empty() || subscription_key == self.subscription_key;
        region_unchanged && key_unchanged
    }
}

struct StoreState {
    credentials: Credentials,
    handle: Arc<dyn EngineHandle>,
}

/// Validates and holds engine credentials; produces the engine handle lazily
/// and shares it across both session controllers.
pub struct CredentialStore {
    engine: Arc<dyn SpeechEngine>,
    state: Mutex<Option<StoreState>>,
}

impl CredentialStore {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            state: Mutex::new(None),
        }
    }

    /// Build or refresh the engine configuration.
    ///
    /// First call validates the inputs and exchanges them for a handle.
    /// Later calls with an unchanged subscription identity rotate the token
    /// in place and return the same handle; a changed identity rebuilds it.
    pub fn build(
        &self,
        subscription_key: &str,
        authorization_token: &str,
        region: &str,
    ) -> Result<Arc<dyn EngineHandle>> {
        let mut state = self.state.lock();

        if let Some(existing) = state.as_mut() {
            if existing
                .credentials
                .same_identity(subscription_key, region)
            {
                if !authorization_token.is_empty() {
                    existing.handle.rotate_token(authorization_token)?;
                    existing.credentials.authorization_token = authorization_token.to_string();
                    debug!("Rotated authorization token on existing configuration");
                }
                return Ok(Arc::clone(&existing.handle));
            }
            info!("Subscription identity changed, rebuilding engine handle");
        }

        if region.is_empty() {
            return Err(SpeechBridgeError::InvalidRegion);
        }
        if subscription_key.is_empty() && authorization_token.is_empty() {
            return Err(SpeechBridgeError::MissingCredential);
        }

        let credentials = Credentials {
            subscription_key: subscription_key.to_string(),
            authorization_token: authorization_token.to_string(),
            region: region.to_string(),
        };
        let handle = self.engine.configure(&credentials)?;
        info!("Engine configuration built for region {}", region);

        *state = Some(StoreState {
            credentials,
            handle: Arc::clone(&handle),
        });
        Ok(handle)
    }

    /// The current handle, if a configuration has been built.
    pub fn handle(&self) -> Option<Arc<dyn EngineHandle>> {
        self.state.lock().as_ref().map(|s| Arc::clone(&s.handle))
    }

    /// Release the handle. Required before teardown and before rebuilding
    /// with a different subscription identity from scratch.
    pub fn reset(&self) {
        if self.state.lock().take().is_some() {
            info!("Engine configuration released");
        }
    }
}
