//! Errors surfaced to scan callers.
//!
//! The set is closed: "frame not ready" and "no code found" are ordinary
//! loop outcomes and never appear here.

use thiserror::Error;

/// Errors a scan session or a permission/device query can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The platform lacks a camera API or a 2D pixel-buffer capability.
    #[error("camera scanning is not supported on this platform")]
    NotSupported,
    /// The user denied camera access, or acquisition otherwise failed.
    #[error("camera permission denied or acquisition failed")]
    NoPermissions,
    /// Video input devices cannot be listed on this platform.
    #[error("video input device enumeration is not supported")]
    EnumerationUnsupported,
}
