//! QR Scan Library
//!
//! Continuously samples frames from a live camera, decodes QR symbols from
//! them, and delivers the decoded payloads on a cancellable stream.
//!
//! # Architecture
//!
//! ```text
//! permission → capture (camera resource → frame snapshot) → codec
//!                   ↑                                          ↓
//!                   └──────────── scan (state machine) ────────┘
//!                                      ↓
//!                              metrics (counters)
//! ```
//!
//! # Design Principles
//!
//! - **Bounded rate**: decode attempts happen at most once per tick interval
//! - **Warm pause**: pausing suppresses decoding but keeps the camera open
//! - **Single release**: the camera is released exactly once per session,
//!   and an acquisition that completes after a stop is discarded
//! - **Quiet misses**: "frame not ready" and "no code found" are normal
//!   outcomes, never errors
//!
//! # Example
//!
//! ```no_run
//! use qr_scan::{
//!     capture::{ScanConfig, StillImageSource, StillPlatform},
//!     codec::QrCodec,
//!     permission::PermissionGate,
//!     scan::{ScanController, ScanOptions},
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = Arc::new(StillPlatform::new());
//! let gate = PermissionGate::new(platform.clone());
//! gate.request_permission().await?;
//!
//! let scanner = ScanController::new(platform, Arc::new(QrCodec::new()), ScanConfig::default())?;
//! let source = Arc::new(StillImageSource::open("code.png")?);
//! let mut payloads = scanner.start(source, ScanOptions::default())?;
//!
//! if let Some(result) = payloads.next_payload().await {
//!     println!("decoded: {}", result?);
//! }
//! scanner.stop();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod codec;
mod error;
pub mod metrics;
pub mod permission;
pub mod scan;

// Re-export commonly used types at crate root
pub use capture::{CameraPlatform, CameraResource, FrameBuffer, ScanConfig, VideoSource};
pub use codec::{Codec, CodecOptions, DecodedPayload, QrCodec};
pub use error::ScanError;
pub use permission::{Granted, PermissionGate};
pub use scan::{PayloadStream, ScanController, ScanOptions, ScanState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
