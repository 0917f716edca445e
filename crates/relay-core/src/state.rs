//! Per-connection session state machine.

use std::fmt;

use serde::Serialize;

use crate::{DomainError, DomainResult};

/// Lifecycle state of a single client session.
///
/// ```text
/// Connecting ──admitted──▶ Active ──quit/eof/error──▶ Closing ──released──▶ Closed
///      │                                                                      ▲
///      └──────────────────────────── registry full ───────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Accepted but not yet admitted to the registry
    #[default]
    Connecting,

    /// Registered and reading commands
    Active,

    /// Termination requested, final sends being drained
    Closing,

    /// Handle released and removed from the registry
    Closed,
}

impl SessionState {
    /// Returns true if `next` is a legal successor of this state.
    ///
    /// `Active -> Active` is legal: every dispatched command other than
    /// quit keeps the session active.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Active)
                | (Self::Connecting, Self::Closed)
                | (Self::Active, Self::Active)
                | (Self::Active, Self::Closing)
                | (Self::Closing, Self::Closed)
        )
    }

    /// Returns the successor state, or an error if the move is illegal.
    pub fn transition(self, next: SessionState) -> DomainResult<SessionState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Returns true once the session has fully terminated.
    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}
