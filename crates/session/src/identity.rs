use snafu::ensure;

use super::error::{AlreadyEstablishedSnafu, SessionResult};
use super::ids::SessionId;
use super::store::SessionStore;

/// Storage key the browser widget has always used.
pub const DEFAULT_SESSION_KEY: &str = "session_id";

/// Hands out the one session id of the current session, minting it on first use.
pub struct SessionIdentity<S> {
    store: S,
    key: String,
}

impl<S> SessionIdentity<S>
where
    S: SessionStore,
{
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_SESSION_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the stored id, or mints and stores a new one.
    ///
    /// Repeated calls within a session return the same id. Empty or malformed
    /// stored values count as absent.
    pub fn get_session_id(&self) -> SessionResult<SessionId> {
        if let Some(existing) = self.current()? {
            return Ok(existing);
        }

        let minted = SessionId::generate();
        self.store.set(&self.key, minted.as_str())?;
        tracing::debug!(key = %self.key, session_id = %minted, "minted session id");
        Ok(minted)
    }

    /// Reads the stored id without minting one.
    pub fn current(&self) -> SessionResult<Option<SessionId>> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(None);
        };

        if raw.is_empty() {
            return Ok(None);
        }

        match SessionId::parse(&raw) {
            Ok(id) => Ok(Some(id)),
            Err(error) => {
                tracing::warn!(key = %self.key, error = %error, "ignoring malformed stored session id");
                Ok(None)
            }
        }
    }

    /// Stores a caller-provided id when the session has none yet.
    ///
    /// Adopting the id that is already stored is a no-op; any other id is refused.
    pub fn adopt(&self, id: &SessionId) -> SessionResult<()> {
        if let Some(existing) = self.current()? {
            ensure!(
                existing == *id,
                AlreadyEstablishedSnafu {
                    stage: "adopt-session-id",
                    existing: existing.into_string(),
                    attempted: id.to_string(),
                }
            );
            return Ok(());
        }

        self.store.set(&self.key, id.as_str())
    }

    /// Forgets the id; the next call to `get_session_id` mints a fresh one.
    pub fn reset(&self) -> SessionResult<()> {
        self.store.remove(&self.key)
    }
}
