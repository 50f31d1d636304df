use std::fmt;
use std::str::FromStr;

use snafu::ensure;
use uuid::Uuid;

use super::error::{InvalidIdSnafu, SessionError, SessionResult};

const GROUP_COUNT: usize = 4;
const GROUP_WIDTH: usize = 4;

/// Length of a canonical id: four groups of four hex digits plus three hyphens.
pub const SESSION_ID_LEN: usize = GROUP_COUNT * GROUP_WIDTH + (GROUP_COUNT - 1);

/// Correlates every exchange of one browsing session with a backend conversation.
///
/// Always canonical: `xxxx-xxxx-xxxx-xxxx`, lowercase hex. Not meant as a secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Draws 64 random bits and formats them in canonical form.
    pub fn generate() -> Self {
        let raw = Uuid::new_v4();
        let bytes = raw.as_bytes();
        // v4 pins the version nibble in byte 6 and the variant bits in byte 8.
        let random = [
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[10], bytes[11],
        ];

        let mut formatted = String::with_capacity(SESSION_ID_LEN);
        for (index, group) in random.chunks(2).enumerate() {
            if index > 0 {
                formatted.push('-');
            }
            for byte in group {
                formatted.push_str(&format!("{byte:02x}"));
            }
        }

        Self(formatted)
    }

    pub fn parse(raw: &str) -> SessionResult<Self> {
        ensure!(
            is_canonical(raw),
            InvalidIdSnafu {
                stage: "parse-session-id",
                raw: raw.to_string(),
            }
        );
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Returns true for `xxxx-xxxx-xxxx-xxxx` with lowercase hex digits.
pub fn is_canonical(raw: &str) -> bool {
    if raw.len() != SESSION_ID_LEN {
        return false;
    }

    let mut groups = 0;
    for group in raw.split('-') {
        groups += 1;
        let hex = group
            .bytes()
            .all(|byte| matches!(byte, b'0'..=b'9' | b'a'..=b'f'));
        if group.len() != GROUP_WIDTH || !hex {
            return false;
        }
    }

    groups == GROUP_COUNT
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(raw: &str) -> SessionResult<Self> {
        Self::parse(raw)
    }
}
