//! Reusable RGBA frame buffer and the snapshotter that fills it.

use super::{CameraResource, SourceStatus};

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A reusable RGBA8 pixel buffer.
///
/// The buffer keeps its allocation across frames and is only resized
/// when the source dimensions change.
#[derive(Clone, Default)]
pub struct FrameBuffer {
    /// Row-major RGBA8 pixel data.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
}

impl FrameBuffer {
    /// Creates a zeroed buffer of the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        let mut buffer = Self::default();
        buffer.resize(width, height);
        buffer
    }

    /// Wraps existing RGBA8 data.
    ///
    /// Returns `None` if the data length does not match the dimensions.
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        let buffer = Self {
            pixels,
            width,
            height,
        };
        buffer.is_valid().then_some(buffer)
    }

    /// Resizes the buffer, reusing the existing allocation where possible.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.resize(self.pixel_count() * BYTES_PER_PIXEL, 0);
    }

    /// Zeroes every pixel.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Returns the raw RGBA data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the raw RGBA data for writing.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// True if the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count() * BYTES_PER_PIXEL
    }

    /// Converts the frame to 8-bit luma.
    pub fn to_luma(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|px| {
                let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
                ((r * 77 + g * 150 + b * 29) >> 8) as u8
            })
            .collect()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

/// Copies frames from a bound video source into a reusable buffer.
#[derive(Debug, Default)]
pub struct FrameSnapshotter {
    buffer: FrameBuffer,
    resizes: u64,
}

impl FrameSnapshotter {
    /// Creates a snapshotter with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current frame of `camera`'s source into the buffer.
    ///
    /// `status` is the ready status the caller just observed; the buffer is
    /// resized to it first if the dimensions changed. Calling this with a
    /// status that is not ready yields unspecified pixel content.
    ///
    /// Returns `None` once the camera has been released.
    pub fn snapshot(
        &mut self,
        camera: &CameraResource,
        status: SourceStatus,
    ) -> Option<&FrameBuffer> {
        let buffer = &mut self.buffer;
        let mut resized = false;

        camera.with_source(|source| {
            if buffer.width() != status.width || buffer.height() != status.height {
                buffer.resize(status.width, status.height);
                resized = true;
            } else {
                buffer.clear();
            }
            source.draw_into(buffer);
        })?;

        if resized {
            self.resizes += 1;
            tracing::debug!(
                width = status.width,
                height = status.height,
                "Resized frame buffer"
            );
        }

        Some(&self.buffer)
    }

    /// Returns the most recent snapshot.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Number of times the buffer was resized.
    pub fn resize_count(&self) -> u64 {
        self.resizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockStream, MockVideoSource, ReadyState};
    use std::sync::Arc;

    #[test]
    fn test_buffer_creation() {
        let buffer = FrameBuffer::new(640, 480);

        assert_eq!(buffer.width(), 640);
        assert_eq!(buffer.height(), 480);
        assert_eq!(buffer.pixels().len(), 640 * 480 * 4);
        assert!(buffer.is_valid());
    }

    #[test]
    fn test_from_rgba_invalid_size() {
        assert!(FrameBuffer::from_rgba(vec![0u8; 100], 640, 480).is_none());
        assert!(FrameBuffer::from_rgba(vec![0u8; 16], 2, 2).is_some());
    }

    #[test]
    fn test_resize_keeps_allocation_when_shrinking() {
        let mut buffer = FrameBuffer::new(64, 64);
        let capacity = buffer.pixels.capacity();

        buffer.resize(32, 32);
        assert_eq!(buffer.pixels().len(), 32 * 32 * 4);
        assert_eq!(buffer.pixels.capacity(), capacity);
    }

    #[test]
    fn test_luma_conversion() {
        let buffer =
            FrameBuffer::from_rgba(vec![255, 255, 255, 255, 0, 0, 0, 255], 2, 1).unwrap();
        let luma = buffer.to_luma();
        assert_eq!(luma.len(), 2);
        assert!(luma[0] >= 254);
        assert_eq!(luma[1], 0);
    }

    #[test]
    fn test_snapshot_resizes_only_on_dimension_change() {
        let source = Arc::new(MockVideoSource::new());
        let camera = CameraResource::bind(source.clone(), Box::new(MockStream::new("test")));
        let mut snapshotter = FrameSnapshotter::new();

        let status = SourceStatus::new(4, 4, ReadyState::HaveEnoughData);
        source.set_tag(7);
        let frame = snapshotter.snapshot(&camera, status).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.pixels()[0], 7);

        snapshotter.snapshot(&camera, status).unwrap();
        assert_eq!(snapshotter.resize_count(), 1);

        snapshotter
            .snapshot(&camera, SourceStatus::new(8, 2, ReadyState::HaveEnoughData))
            .unwrap();
        assert_eq!(snapshotter.resize_count(), 2);
        assert_eq!(snapshotter.buffer().pixel_count(), 16);
    }

    #[test]
    fn test_snapshot_after_release() {
        let source = Arc::new(MockVideoSource::new());
        let camera = CameraResource::bind(source, Box::new(MockStream::new("test")));
        camera.release();

        let mut snapshotter = FrameSnapshotter::new();
        let status = SourceStatus::new(4, 4, ReadyState::HaveEnoughData);
        assert!(snapshotter.snapshot(&camera, status).is_none());
    }
}
