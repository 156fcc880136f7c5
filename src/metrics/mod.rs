//! Prometheus metrics exporter for scan monitoring.
//!
//! This module provides observability into the scan loop by exposing
//! its counters in Prometheus format, optionally via an HTTP endpoint.
//!
//! # Metrics Exposed
//!
//! ## Session Metrics
//! - `qr_scan_session_state` - Session state code (0=idle .. 4=stopped)
//! - `qr_scan_camera_active` - Whether a camera stream is bound
//!
//! ## Loop Metrics
//! - `qr_scan_ticks_total` - Logical ticks processed
//! - `qr_scan_paused_ticks_total` - Ticks skipped while paused
//! - `qr_scan_not_ready_ticks_total` - Ticks skipped without a ready frame
//! - `qr_scan_decode_attempts_total` - Frames handed to the codec
//! - `qr_scan_decode_failures_total` - Decode calls that failed
//! - `qr_scan_payloads_total` - Payloads delivered
//!
//! ## Camera Metrics
//! - `qr_scan_camera_acquisitions_total` - Camera streams bound
//! - `qr_scan_camera_releases_total` - Camera streams released
//!
//! # Example
//!
//! ```no_run
//! use qr_scan::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     state_code: 2,
//!     camera_active: true,
//!     ticks: 40,
//!     decode_attempts: 35,
//!     payloads_emitted: 1,
//!     camera_acquisitions: 1,
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
