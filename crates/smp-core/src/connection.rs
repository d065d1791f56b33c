//! Connection identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned to an accepted connection.
///
/// Ids are handed out by the server's client registry, start at 1, grow
/// monotonically, and are never reused for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// The first id a fresh registry hands out.
    pub const FIRST: ConnectionId = ConnectionId(1);

    /// Returns the id that follows this one.
    pub fn next(self) -> ConnectionId {
        ConnectionId(self.0 + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cid={}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_id_is_one() {
        assert_eq!(ConnectionId::FIRST.get(), 1);
    }

    #[test]
    fn test_next_increments_by_one() {
        assert_eq!(ConnectionId(41).next(), ConnectionId(42));
    }

    #[test]
    fn test_display_includes_prefix() {
        assert_eq!(ConnectionId(7).to_string(), "cid=7");
    }

    #[test]
    fn test_ids_order_by_value() {
        assert!(ConnectionId(1) < ConnectionId(2));
    }

    #[test]
    fn test_serializes_as_bare_integer() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            id: ConnectionId,
        }

        let toml_str = toml::to_string(&Wrapper { id: ConnectionId(9) }).unwrap();
        assert_eq!(toml_str.trim(), "id = 9");

        let restored: Wrapper = toml::from_str(&toml_str).unwrap();
        assert_eq!(restored.id, ConnectionId(9));
    }
}
