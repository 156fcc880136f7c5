//! QR decoding backed by `rqrr`.

use super::{Codec, CodecOptions, DecodedPayload};
use crate::capture::FrameBuffer;

/// QR code decoder.
///
/// Converts the RGBA frame to luma once, then runs grid detection on the
/// normal and/or inverted image as the options request. The first grid
/// that decodes to a non-empty string wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrCodec;

impl QrCodec {
    /// Creates a codec backed by `rqrr`.
    pub fn new() -> Self {
        Self
    }
}

impl Codec for QrCodec {
    fn decode(&self, frame: &FrameBuffer, options: &CodecOptions) -> Option<DecodedPayload> {
        if frame.is_empty() || !frame.is_valid() {
            return None;
        }

        let start = std::time::Instant::now();
        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let luma = frame.to_luma();

        let found = options
            .inversion
            .passes()
            .iter()
            .find_map(|&inverted| decode_luma(&luma, width, height, inverted));

        tracing::trace!(
            width,
            height,
            found = found.is_some(),
            decode_ms = start.elapsed().as_millis() as u64,
            "QR decode pass complete"
        );
        found
    }
}

fn decode_luma(luma: &[u8], width: usize, height: usize, inverted: bool) -> Option<DecodedPayload> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
        let value = luma[y * width + x];
        if inverted {
            255 - value
        } else {
            value
        }
    });

    prepared.detect_grids().into_iter().find_map(|grid| match grid.decode() {
        Ok((_meta, content)) => DecodedPayload::new(content),
        Err(e) => {
            tracing::debug!(error = ?e, inverted, "Failed to decode QR grid");
            None
        }
    })
}
