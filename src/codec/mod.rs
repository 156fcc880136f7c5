//! Visual code decoding.
//!
//! The scan engine treats decoding as an opaque, side-effect-free function
//! from a pixel buffer to an optional payload. Finding nothing in a frame
//! is the common case and is not an error.

mod mock;
mod payload;
mod qr;

pub use mock::MockCodec;
pub use payload::DecodedPayload;
pub use qr::QrCodec;

use crate::capture::FrameBuffer;
use serde::{Deserialize, Serialize};

/// Which luminance polarities to try when looking for a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InversionAttempts {
    /// Normal image first, then inverted.
    #[default]
    AttemptBoth,
    /// Normal image only.
    DontInvert,
    /// Inverted image only.
    OnlyInvert,
    /// Inverted image first, then normal.
    InvertFirst,
}

impl InversionAttempts {
    /// Decode passes in order; `true` means the inverted image.
    pub fn passes(self) -> &'static [bool] {
        match self {
            InversionAttempts::AttemptBoth => &[false, true],
            InversionAttempts::DontInvert => &[false],
            InversionAttempts::OnlyInvert => &[true],
            InversionAttempts::InvertFirst => &[true, false],
        }
    }
}

/// Options passed to every decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CodecOptions {
    /// Polarities to attempt.
    pub inversion: InversionAttempts,
}

/// A decoder for machine-readable visual codes.
///
/// Implementations must be deterministic for a given buffer and options.
pub trait Codec: Send + Sync {
    /// Looks for a code in `frame`.
    fn decode(&self, frame: &FrameBuffer, options: &CodecOptions) -> Option<DecodedPayload>;
}
