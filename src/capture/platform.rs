//! Platform camera API contract.
//!
//! The scan engine never talks to hardware directly. Everything it needs
//! from the host (capability flags, stream acquisition, device listing)
//! goes through [`CameraPlatform`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a platform camera acquisition.
#[derive(Debug, Clone, Error)]
pub enum AcquireError {
    /// The platform has no camera acquisition API.
    #[error("camera acquisition is not supported")]
    NotSupported,
    /// The user or the system refused access.
    #[error("camera access denied")]
    Denied,
    /// A camera could not be opened.
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Facing the user (front camera).
    User,
    /// Facing away from the user (rear camera).
    #[default]
    Environment,
}

/// Constraints passed to a camera acquisition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    /// Preferred facing direction, if any.
    pub facing: Option<FacingMode>,
    /// Specific device to open, if any.
    pub device_id: Option<String>,
}

impl Constraints {
    /// Any video camera, no preferences.
    pub fn any() -> Self {
        Self::default()
    }

    /// A camera facing the given direction.
    pub fn facing(facing: FacingMode) -> Self {
        Self {
            facing: Some(facing),
            device_id: None,
        }
    }
}

/// Capabilities the host platform exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// A 2D pixel buffer can be drawn into.
    pub pixel_buffer: bool,
    /// Cameras can be acquired.
    pub camera_acquisition: bool,
    /// Media devices can be enumerated.
    pub device_enumeration: bool,
}

impl Capabilities {
    /// Every capability present.
    pub fn full() -> Self {
        Self {
            pixel_buffer: true,
            camera_acquisition: true,
            device_enumeration: true,
        }
    }

    /// True iff scanning is possible at all.
    pub fn can_scan(&self) -> bool {
        self.pixel_buffer && self.camera_acquisition
    }
}

/// Kind of media device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Camera or other video input.
    VideoInput,
    /// Microphone.
    AudioInput,
    /// Speaker or headset.
    AudioOutput,
}

/// Description of a media device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable identifier, usable as [`Constraints::device_id`].
    pub device_id: String,
    /// Human readable label.
    pub label: String,
    /// Device kind.
    pub kind: DeviceKind,
}

impl DeviceInfo {
    /// Creates a video input descriptor.
    pub fn video_input(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
            kind: DeviceKind::VideoInput,
        }
    }
}

/// An acquired camera stream.
///
/// Stopping the stream releases the hardware. The owner guarantees
/// [`stop`](MediaStream::stop) is called at most once.
pub trait MediaStream: Send {
    /// Label used in logs.
    fn label(&self) -> &str;

    /// Stops the underlying hardware track.
    fn stop(&mut self);
}

/// Host camera API.
#[async_trait]
pub trait CameraPlatform: Send + Sync {
    /// Reports the capabilities this platform has.
    fn capabilities(&self) -> Capabilities;

    /// Acquires a camera stream matching `constraints`.
    ///
    /// On platforms with a permission prompt this is where the user is asked.
    async fn acquire(&self, constraints: &Constraints) -> Result<Box<dyn MediaStream>, AcquireError>;

    /// Lists media devices, or `None` if enumeration is unavailable.
    async fn enumerate_devices(&self) -> Option<Vec<DeviceInfo>>;
}
