//! Scan session states.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// State of a scan session.
///
/// `Idle → RequestingPermission → Active ⇄ Paused → Stopped`, with
/// `RequestingPermission → Stopped` when the camera cannot be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// Created, not started.
    Idle,
    /// Waiting for the camera acquisition to complete.
    RequestingPermission,
    /// Sampling and decoding.
    Active,
    /// Sampling continues, decoding is suppressed.
    Paused,
    /// Torn down. Terminal.
    Stopped,
}

impl ScanState {
    /// True while the sampling loop runs.
    pub fn is_scanning(self) -> bool {
        matches!(self, ScanState::Active | ScanState::Paused)
    }

    /// True once the session is torn down.
    pub fn is_terminal(self) -> bool {
        self == ScanState::Stopped
    }

    /// Numeric code used by the state gauge.
    pub fn code(self) -> i64 {
        match self {
            ScanState::Idle => 0,
            ScanState::RequestingPermission => 1,
            ScanState::Active => 2,
            ScanState::Paused => 3,
            ScanState::Stopped => 4,
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Idle => "idle",
            ScanState::RequestingPermission => "requesting-permission",
            ScanState::Active => "active",
            ScanState::Paused => "paused",
            ScanState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A control operation was called from a state where it is not valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {operation} a scan session that is {state}")]
pub struct InvalidTransition {
    /// The rejected operation.
    pub operation: &'static str,
    /// State at the time of the call.
    pub state: ScanState,
}
