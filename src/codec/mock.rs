//! Scripted codec for exercising scan behavior without real symbols.

use super::{Codec, CodecOptions, DecodedPayload};
use crate::capture::FrameBuffer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Codec that maps the first byte of a frame to a fixed result.
///
/// Pairs with [`MockVideoSource`](crate::capture::MockVideoSource), which
/// fills frames with a per-frame tag byte.
#[derive(Debug, Default)]
pub struct MockCodec {
    results: HashMap<u8, String>,
    panic_on: Option<u8>,
    calls: AtomicUsize,
}

impl MockCodec {
    /// Codec that finds nothing in any frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames tagged `tag` decode to `text`.
    ///
    /// An empty `text` still decodes to nothing, since no payload can be empty.
    pub fn on(mut self, tag: u8, text: impl Into<String>) -> Self {
        self.results.insert(tag, text.into());
        self
    }

    /// Frames tagged `tag` make the codec panic.
    pub fn panic_on(mut self, tag: u8) -> Self {
        self.panic_on = Some(tag);
        self
    }

    /// Number of decode calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Codec for MockCodec {
    fn decode(&self, frame: &FrameBuffer, _options: &CodecOptions) -> Option<DecodedPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let tag = *frame.pixels().first()?;
        if self.panic_on == Some(tag) {
            panic!("mock codec failure on tag {tag}");
        }
        self.results.get(&tag).cloned().and_then(DecodedPayload::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_tags() {
        let codec = MockCodec::new().on(5, "HELLO").on(6, "");
        let mut frame = FrameBuffer::new(2, 2);

        frame.pixels_mut().fill(5);
        assert_eq!(
            codec.decode(&frame, &CodecOptions::default()).unwrap().as_str(),
            "HELLO"
        );

        frame.pixels_mut().fill(6);
        assert!(codec.decode(&frame, &CodecOptions::default()).is_none());

        frame.pixels_mut().fill(7);
        assert!(codec.decode(&frame, &CodecOptions::default()).is_none());
        assert_eq!(codec.calls(), 3);
    }
}
