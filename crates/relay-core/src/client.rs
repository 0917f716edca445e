//! Client identity entities and value objects.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::limits::{truncate_utf8, MAX_NAME_LEN};
use crate::DomainError;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Unique identifier for a connected client.
///
/// Assigned by the registry from a monotonically increasing counter and
/// never reused while the process runs, so a private message addressed to
/// an id can never reach a later client that happens to reuse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(u32);

impl ClientId {
    /// Creates a client id from its raw value.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ClientId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for ClientId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .map(Self)
            .map_err(|e| DomainError::ParseError {
                field: "client id".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Human-readable name shown next to a client's messages.
///
/// Starts out as the decimal form of the client's id. Names are not
/// unique and are bounded to [`MAX_NAME_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    /// Creates a display name, truncating it to [`MAX_NAME_LEN`] bytes.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let bounded = truncate_utf8(name, MAX_NAME_LEN);
        if bounded.len() < name.len() {
            debug!(
                original_len = name.len(),
                max = MAX_NAME_LEN,
                "Display name truncated"
            );
        }
        Self(bounded.to_string())
    }

    /// The initial display name for a client: its id as text.
    pub fn from_id(id: ClientId) -> Self {
        Self(id.to_string())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Client Info
// ============================================================================

/// Registry-visible description of a connected client.
///
/// This is the read model handed out by lookups and snapshots. The
/// connection itself stays owned by the session that accepted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    /// Unique id, invariant for the lifetime of the connection
    pub id: ClientId,

    /// Current display name
    pub name: DisplayName,

    /// Peer address captured at accept time
    pub remote_addr: SocketAddr,

    /// When the client was admitted to the registry
    pub connected_at: DateTime<Utc>,
}

impl ClientInfo {
    /// Creates the info for a freshly admitted client.
    pub fn new(id: ClientId, remote_addr: SocketAddr) -> Self {
        Self {
            id,
            name: DisplayName::from_id(id),
            remote_addr,
            connected_at: Utc::now(),
        }
    }

    /// Time elapsed since admission, in whole seconds.
    pub fn connected_secs(&self) -> i64 {
        (Utc::now() - self.connected_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    #[test]
    fn test_client_id_display_and_parse() {
        let id = ClientId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<ClientId>(), Ok(id));
    }

    #[test]
    fn test_client_id_rejects_non_numeric() {
        let err = "abc".parse::<ClientId>().unwrap_err();
        assert!(matches!(err, DomainError::ParseError { .. }));
        assert!("-1".parse::<ClientId>().is_err());
    }

    #[test]
    fn test_client_id_ordering() {
        assert!(ClientId::new(10) < ClientId::new(11));
    }

    #[test]
    fn test_client_id_serializes_transparently() {
        let json = serde_json::to_string(&ClientId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_display_name_from_id() {
        assert_eq!(DisplayName::from_id(ClientId::new(10)).as_str(), "10");
    }

    #[test]
    fn test_display_name_truncated() {
        let long = "x".repeat(100);
        let name = DisplayName::new(&long);
        assert_eq!(name.as_str().len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_client_info_defaults_name_to_id() {
        let info = ClientInfo::new(ClientId::new(12), addr());
        assert_eq!(info.name.as_str(), "12");
        assert_eq!(info.remote_addr, addr());
        assert!(info.connected_secs() >= 0);
    }
}
