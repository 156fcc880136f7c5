//! Live video source abstraction.

use super::{FrameBuffer, MediaStream};
use serde::{Deserialize, Serialize};

/// How much data a video source has buffered.
///
/// Only [`ReadyState::HaveEnoughData`] means a frame can be sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReadyState {
    /// Nothing is known about the media yet.
    HaveNothing,
    /// Dimensions are known but no frame data is available.
    HaveMetadata,
    /// The current frame is available, but not the next one.
    HaveCurrentData,
    /// The current frame and at least one more are available.
    HaveFutureData,
    /// Enough data is buffered to sample continuously.
    HaveEnoughData,
}

/// Read-only snapshot of a source's dimensions and readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceStatus {
    /// Current frame width in pixels.
    pub width: u32,
    /// Current frame height in pixels.
    pub height: u32,
    /// Buffering state reported by the source.
    pub ready_state: ReadyState,
}

impl SourceStatus {
    /// Status of a source with no media bound.
    pub const EMPTY: SourceStatus = SourceStatus {
        width: 0,
        height: 0,
        ready_state: ReadyState::HaveNothing,
    };

    /// Creates a status snapshot.
    pub fn new(width: u32, height: u32, ready_state: ReadyState) -> Self {
        Self {
            width,
            height,
            ready_state,
        }
    }

    /// True iff the frame has non-zero dimensions and enough buffered data.
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0 && self.ready_state == ReadyState::HaveEnoughData
    }
}

/// A live producer of video frames.
///
/// The source is borrowed by a scan session for its whole duration. It is
/// bound to a camera stream with [`attach`](VideoSource::attach) and
/// unbound with [`detach`](VideoSource::detach) when the camera is
/// released.
pub trait VideoSource: Send + Sync {
    /// Returns the current dimensions and readiness.
    fn status(&self) -> SourceStatus;

    /// Binds an acquired camera stream to this source.
    fn attach(&self, stream: &dyn MediaStream);

    /// Clears the stream binding.
    fn detach(&self);

    /// Draws the current frame into `buffer` as RGBA8.
    ///
    /// The buffer has already been sized to the dimensions most recently
    /// reported by [`status`](VideoSource::status).
    fn draw_into(&self, buffer: &mut FrameBuffer);
}
