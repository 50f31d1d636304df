#![deny(unsafe_code)]

//! Per-session identity for the chat widget.
//!
//! A session id is minted lazily, kept in a session-scoped key/value store and
//! reused for every exchange until that store is cleared.
pub mod error;
pub mod identity;
pub mod ids;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use identity::{DEFAULT_SESSION_KEY, SessionIdentity};
pub use ids::{SESSION_ID_LEN, SessionId, is_canonical};
pub use store::{MemorySessionStore, SessionStore};

/// Mints a fresh identifier without storing it anywhere.
pub fn generate_session_id() -> String {
    SessionId::generate().into_string()
}
