//! Camera permission and capability checks.
//!
//! A permission request performs a real but immediately released camera
//! acquisition, since that is how hosts trigger their permission prompt.
//! Callers should debounce requests themselves.

use crate::capture::{CameraPlatform, Constraints, DeviceInfo, DeviceKind};
use crate::ScanError;
use std::sync::Arc;

/// Proof that camera access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Granted;

/// Requests camera access and probes platform capabilities.
#[derive(Clone)]
pub struct PermissionGate {
    platform: Arc<dyn CameraPlatform>,
}

impl PermissionGate {
    /// Creates a gate over `platform`.
    pub fn new(platform: Arc<dyn CameraPlatform>) -> Self {
        Self { platform }
    }

    /// True iff the platform can both draw pixel buffers and acquire cameras.
    pub fn check_capability(&self) -> bool {
        self.platform.capabilities().can_scan()
    }

    /// Triggers the platform permission prompt with a probe acquisition.
    ///
    /// The probe stream is stopped before this returns. Without the required
    /// capabilities no acquisition is attempted.
    pub async fn request_permission(&self) -> Result<Granted, ScanError> {
        if !self.check_capability() {
            tracing::warn!("Permission request on a platform without scan capability");
            return Err(ScanError::NoPermissions);
        }

        match self.platform.acquire(&Constraints::any()).await {
            Ok(mut probe) => {
                probe.stop();
                tracing::info!(stream = probe.label(), "Camera permission granted");
                Ok(Granted)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Camera permission refused");
                Err(ScanError::NoPermissions)
            }
        }
    }

    /// Lists video input devices in platform order.
    pub async fn list_video_input_devices(&self) -> Result<Vec<DeviceInfo>, ScanError> {
        if !self.platform.capabilities().device_enumeration {
            return Err(ScanError::EnumerationUnsupported);
        }
        let devices = self
            .platform
            .enumerate_devices()
            .await
            .ok_or(ScanError::EnumerationUnsupported)?;

        Ok(devices
            .into_iter()
            .filter(|device| device.kind == DeviceKind::VideoInput)
            .collect())
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate")
            .field("capabilities", &self.platform.capabilities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Capabilities, MockPlatform};

    #[tokio::test]
    async fn test_no_capability_means_no_permission() {
        let platform = Arc::new(MockPlatform::without_camera());
        let gate = PermissionGate::new(platform.clone());

        assert!(!gate.check_capability());
        assert_eq!(gate.request_permission().await, Err(ScanError::NoPermissions));
        assert_eq!(platform.acquire_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_pixel_buffer_means_no_permission() {
        let platform = Arc::new(MockPlatform::with_capabilities(Capabilities {
            pixel_buffer: false,
            ..Capabilities::full()
        }));
        let gate = PermissionGate::new(platform.clone());

        assert_eq!(gate.request_permission().await, Err(ScanError::NoPermissions));
        assert_eq!(platform.acquire_count(), 0);
    }

    #[tokio::test]
    async fn test_granted_probe_is_released() {
        let platform = Arc::new(MockPlatform::new());
        let gate = PermissionGate::new(platform.clone());

        assert_eq!(gate.request_permission().await, Ok(Granted));
        assert_eq!(platform.acquire_count(), 1);
        assert_eq!(platform.stop_count(), 1);
        assert_eq!(platform.last_constraints(), Some(Constraints::any()));
    }

    #[tokio::test]
    async fn test_denied() {
        let platform = Arc::new(MockPlatform::denying());
        let gate = PermissionGate::new(platform.clone());

        assert_eq!(gate.request_permission().await, Err(ScanError::NoPermissions));
        assert_eq!(platform.stop_count(), 0);
    }

    #[tokio::test]
    async fn test_lists_only_video_inputs() {
        let gate = PermissionGate::new(Arc::new(MockPlatform::new()));

        let devices = gate.list_video_input_devices().await.unwrap();
        let ids: Vec<_> = devices.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["cam-0", "cam-1"]);
    }

    #[tokio::test]
    async fn test_enumeration_unsupported() {
        let platform = MockPlatform::with_capabilities(Capabilities {
            device_enumeration: false,
            ..Capabilities::full()
        });
        let gate = PermissionGate::new(Arc::new(platform));
        assert_eq!(
            gate.list_video_input_devices().await,
            Err(ScanError::EnumerationUnsupported)
        );

        let gate = PermissionGate::new(Arc::new(MockPlatform::new().with_devices(None)));
        assert_eq!(
            gate.list_video_input_devices().await,
            Err(ScanError::EnumerationUnsupported)
        );
    }
}
