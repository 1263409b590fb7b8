//! Session identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for deriving session stream ids from their keys.
const SESSION_STREAM_NAMESPACE: Uuid = Uuid::from_u128(0x6a0f_3c2e_9b41_4d7a_8e25_c1f0_7d93_b846);

/// Identifies the one quiz session allowed per guild channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    /// The chat guild (server/group) the quiz runs in.
    pub guild_id: String,
    /// The channel questions are published to.
    pub channel_id: String,
}

impl SessionKey {
    /// Creates a session key.
    #[must_use]
    pub fn new(guild_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            channel_id: channel_id.into(),
        }
    }

    /// Returns the id of the event stream holding this key's sessions.
    ///
    /// The id is a pure function of the key; the guild id is length-prefixed
    /// so that no two distinct keys map to the same name.
    #[must_use]
    pub fn stream_id(&self) -> Uuid {
        let name = format!(
            "{}:{}:{}",
            self.guild_id.len(),
            self.guild_id,
            self.channel_id
        );
        Uuid::new_v5(&SESSION_STREAM_NAMESPACE, name.as_bytes())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.guild_id, self.channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id_is_stable_for_equal_keys() {
        let a = SessionKey::new("guild-1", "channel-1");
        let b = SessionKey::new("guild-1", "channel-1");

        assert_eq!(a.stream_id(), b.stream_id());
    }

    #[test]
    fn test_stream_id_differs_when_separator_moves() {
        let a = SessionKey::new("a:b", "c");
        let b = SessionKey::new("a", "b:c");

        assert_ne!(a.stream_id(), b.stream_id());
    }

    #[test]
    fn test_display_joins_guild_and_channel() {
        assert_eq!(SessionKey::new("g", "c").to_string(), "g/c");
    }
}
