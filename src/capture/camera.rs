//! Camera resource lifecycle guard.
//!
//! A [`CameraResource`] owns one acquired stream and the video source it
//! is bound to. Release is idempotent and mutually exclusive with frame
//! access, so a snapshot can never read from a source whose stream has
//! already been stopped.

use super::{CameraPlatform, Constraints, MediaStream, SourceStatus, VideoSource};
use crate::ScanError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// An acquired camera stream bound to a video source.
pub struct CameraResource {
    source: Arc<dyn VideoSource>,
    /// `None` once released.
    stream: Mutex<Option<Box<dyn MediaStream>>>,
}

impl CameraResource {
    /// Acquires a stream from `platform` and binds it to `source`.
    pub async fn acquire(
        platform: &dyn CameraPlatform,
        source: Arc<dyn VideoSource>,
        constraints: &Constraints,
    ) -> Result<Self, ScanError> {
        let stream = Self::request_stream(platform, constraints).await?;
        Ok(Self::bind(source, stream))
    }

    /// Acquires a raw stream without binding it.
    ///
    /// Callers that may need to discard the result (for example because the
    /// session was stopped while the request was pending) bind it later with
    /// [`bind`](Self::bind), or stop it directly.
    pub async fn request_stream(
        platform: &dyn CameraPlatform,
        constraints: &Constraints,
    ) -> Result<Box<dyn MediaStream>, ScanError> {
        if !platform.capabilities().camera_acquisition {
            return Err(ScanError::NotSupported);
        }

        platform.acquire(constraints).await.map_err(|e| {
            tracing::warn!(error = %e, "Camera acquisition failed");
            match e {
                super::AcquireError::NotSupported => ScanError::NotSupported,
                _ => ScanError::NoPermissions,
            }
        })
    }

    /// Binds an acquired stream to a video source.
    pub fn bind(source: Arc<dyn VideoSource>, stream: Box<dyn MediaStream>) -> Self {
        source.attach(stream.as_ref());
        tracing::info!(stream = stream.label(), "Camera stream bound to video source");
        Self {
            source,
            stream: Mutex::new(Some(stream)),
        }
    }

    /// Stops the stream and clears the source binding.
    ///
    /// Only the first call has an effect; returns true for that call.
    /// Waits for any in-progress [`with_source`](Self::with_source) call.
    pub fn release(&self) -> bool {
        let mut slot = self.lock_stream();
        match slot.take() {
            Some(mut stream) => {
                stream.stop();
                self.source.detach();
                tracing::info!(stream = stream.label(), "Camera stream released");
                true
            }
            None => false,
        }
    }

    /// True until [`release`](Self::release) has been called.
    pub fn is_held(&self) -> bool {
        self.lock_stream().is_some()
    }

    /// Returns the source status if a frame can be sampled right now.
    pub fn ready_status(&self) -> Option<SourceStatus> {
        let slot = self.lock_stream();
        slot.as_ref()?;
        let status = self.source.status();
        status.is_ready().then_some(status)
    }

    /// True iff the bound source has a frame ready to sample.
    pub fn is_frame_ready(&self) -> bool {
        self.ready_status().is_some()
    }

    /// Runs `f` against the bound source while holding the release guard.
    ///
    /// Returns `None` without calling `f` if the resource was released.
    pub fn with_source<R>(&self, f: impl FnOnce(&dyn VideoSource) -> R) -> Option<R> {
        let slot = self.lock_stream();
        slot.as_ref()?;
        Some(f(self.source.as_ref()))
    }

    fn lock_stream(&self) -> MutexGuard<'_, Option<Box<dyn MediaStream>>> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CameraResource {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for CameraResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraResource")
            .field("held", &self.is_held())
            .finish()
    }
}
