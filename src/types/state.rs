//! Acquisition session lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an [`AcquisitionSession`](crate::session::AcquisitionSession) is in its lifecycle.
///
/// Setup walks forward one state per control step. `Stopped` and `Aborted`
/// are terminal; `Aborted` can be reached from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    ApiVerified,
    PoweredOn,
    Configured,
    SocketConnected,
    Streaming,
    Stopped,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Aborted)
    }

    /// The state a successful setup step leads to, if any.
    pub fn next_setup_state(self) -> Option<SessionState> {
        match self {
            SessionState::Idle => Some(SessionState::ApiVerified),
            SessionState::ApiVerified => Some(SessionState::PoweredOn),
            SessionState::PoweredOn => Some(SessionState::Configured),
            SessionState::Configured => Some(SessionState::SocketConnected),
            SessionState::SocketConnected => Some(SessionState::Streaming),
            SessionState::Streaming | SessionState::Stopped | SessionState::Aborted => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::ApiVerified => "API verified",
            SessionState::PoweredOn => "powered on",
            SessionState::Configured => "configured",
            SessionState::SocketConnected => "socket connected",
            SessionState::Streaming => "streaming",
            SessionState::Stopped => "stopped",
            SessionState::Aborted => "aborted",
        };
        f.write_str(label)
    }
}
