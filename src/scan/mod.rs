//! Scan session control.
//!
//! [`ScanController`] runs the sampling loop: it acquires the camera,
//! ticks at a bounded rate, snapshots ready frames, hands them to the
//! codec, and delivers non-empty payloads on a [`PayloadStream`]. Pause,
//! resume and toggle gate decoding; stop tears everything down.

mod controller;
mod state;
mod stats;
mod stream;

pub use controller::{ScanController, ScanOptions};
pub use state::{InvalidTransition, ScanState};
pub use stats::ScanStats;
pub use stream::PayloadStream;
