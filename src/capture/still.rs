//! Still image presented as a live video source.
//!
//! Useful for scanning an image file through the same engine that drives
//! a camera, and for end-to-end tests with real QR symbols.

use super::{
    AcquireError, Capabilities, CameraPlatform, Constraints, DeviceInfo, FrameBuffer,
    MediaStream, ReadyState, SourceStatus, VideoSource,
};
use async_trait::async_trait;
use image::RgbaImage;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Errors loading a still image source.
#[derive(Debug, Error)]
pub enum StillImageError {
    /// The file could not be read or decoded.
    #[error("failed to load image: {0}")]
    Load(#[from] image::ImageError),
    /// The image has no pixels.
    #[error("image has zero dimensions")]
    Empty,
}

/// A video source that always shows the same image once bound.
pub struct StillImageSource {
    image: RgbaImage,
    bound: AtomicBool,
}

impl StillImageSource {
    /// Loads an image file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StillImageError> {
        let image = image::open(path.as_ref())?.to_rgba8();
        tracing::info!(
            path = %path.as_ref().display(),
            width = image.width(),
            height = image.height(),
            "Loaded still image source"
        );
        Self::from_image(image)
    }

    /// Wraps an in-memory image.
    pub fn from_image(image: RgbaImage) -> Result<Self, StillImageError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(StillImageError::Empty);
        }
        Ok(Self {
            image,
            bound: AtomicBool::new(false),
        })
    }
}

impl VideoSource for StillImageSource {
    fn status(&self) -> SourceStatus {
        if !self.bound.load(Ordering::Acquire) {
            return SourceStatus::EMPTY;
        }
        SourceStatus::new(
            self.image.width(),
            self.image.height(),
            ReadyState::HaveEnoughData,
        )
    }

    fn attach(&self, _stream: &dyn MediaStream) {
        self.bound.store(true, Ordering::Release);
    }

    fn detach(&self) {
        self.bound.store(false, Ordering::Release);
    }

    fn draw_into(&self, buffer: &mut FrameBuffer) {
        let src = self.image.as_raw();
        let dst = buffer.pixels_mut();
        let len = src.len().min(dst.len());
        dst[..len].copy_from_slice(&src[..len]);
    }
}

impl std::fmt::Debug for StillImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StillImageSource")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

#[derive(Debug)]
struct StillStream;

impl MediaStream for StillStream {
    fn label(&self) -> &str {
        "still-image"
    }

    fn stop(&mut self) {}
}

/// Platform whose only "camera" is a still image.
#[derive(Debug, Default)]
pub struct StillPlatform;

impl StillPlatform {
    /// Creates the platform.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CameraPlatform for StillPlatform {
    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    async fn acquire(&self, _constraints: &Constraints) -> Result<Box<dyn MediaStream>, AcquireError> {
        Ok(Box::new(StillStream))
    }

    async fn enumerate_devices(&self) -> Option<Vec<DeviceInfo>> {
        Some(vec![DeviceInfo::video_input("still", "Still image")])
    }
}
