//! Camera acquisition, video sources and frame snapshots.
//!
//! This module owns everything between the host camera API and the pixel
//! buffer handed to the codec: the platform contract, the camera resource
//! lifecycle guard, the reusable frame buffer, and scan configuration.

mod camera;
mod config;
mod frame;
mod mock;
#[cfg(feature = "camera")]
mod native;
mod platform;
mod source;
mod still;

pub use camera::CameraResource;
pub use config::{ConfigError, FileConfig, OutputConfig, ScanConfig};
pub use frame::{FrameBuffer, FrameSnapshotter, BYTES_PER_PIXEL};
pub use mock::{AcquireGate, CallCounter, MockFrame, MockPlatform, MockStream, MockVideoSource};
#[cfg(feature = "camera")]
pub use native::{NativePlatform, NativeSource};
pub use platform::{
    AcquireError, CameraPlatform, Capabilities, Constraints, DeviceInfo, DeviceKind, FacingMode,
    MediaStream,
};
pub use source::{ReadyState, SourceStatus, VideoSource};
pub use still::{StillImageError, StillImageSource, StillPlatform};
