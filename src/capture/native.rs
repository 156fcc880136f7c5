//! Native camera backend built on `nokhwa`.
//!
//! Each acquired stream runs a dedicated capture thread that opens the
//! device, pumps decoded RGBA frames into a shared slot, and closes the
//! device when the stream is stopped. The camera is opened, read and
//! closed on that one thread.

use super::{
    AcquireError, Capabilities, CameraPlatform, Constraints, DeviceInfo, FrameBuffer,
    MediaStream, ReadyState, SourceStatus, VideoSource,
};
use async_trait::async_trait;
use nokhwa::{
    pixel_format::RgbAFormat,
    utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::oneshot;

// delay before retrying after a failed frame grab
const RETRY_DELAY_MS: u64 = 50;

struct LatestFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[derive(Default)]
struct FrameSlot {
    latest: Mutex<Option<LatestFrame>>,
}

impl FrameSlot {
    fn lock(&self) -> MutexGuard<'_, Option<LatestFrame>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Video source fed by a native camera stream.
pub struct NativeSource {
    slot: Arc<FrameSlot>,
    bound: AtomicBool,
}

impl NativeSource {
    /// Creates an unbound source with no frame yet.
    pub fn new() -> Self {
        Self {
            slot: Arc::new(FrameSlot::default()),
            bound: AtomicBool::new(false),
        }
    }
}

impl Default for NativeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for NativeSource {
    fn status(&self) -> SourceStatus {
        if !self.bound.load(Ordering::Acquire) {
            return SourceStatus::EMPTY;
        }
        match self.slot.lock().as_ref() {
            Some(frame) => SourceStatus::new(frame.width, frame.height, ReadyState::HaveEnoughData),
            None => SourceStatus::EMPTY,
        }
    }

    fn attach(&self, _stream: &dyn MediaStream) {
        self.bound.store(true, Ordering::Release);
    }

    fn detach(&self) {
        self.bound.store(false, Ordering::Release);
    }

    fn draw_into(&self, buffer: &mut FrameBuffer) {
        if let Some(frame) = self.slot.lock().as_ref() {
            let dst = buffer.pixels_mut();
            let len = frame.pixels.len().min(dst.len());
            dst[..len].copy_from_slice(&frame.pixels[..len]);
        }
    }
}

struct NativeStream {
    label: String,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MediaStream for NativeStream {
    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(label = %self.label, "Camera capture thread panicked");
            }
        }
    }
}

/// Camera platform backed by the host's native camera API.
pub struct NativePlatform {
    slot: Arc<FrameSlot>,
}

impl NativePlatform {
    /// Creates a platform whose streams feed `source`.
    pub fn new(source: &NativeSource) -> Self {
        Self {
            slot: Arc::clone(&source.slot),
        }
    }
}

#[async_trait]
impl CameraPlatform for NativePlatform {
    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    async fn acquire(&self, constraints: &Constraints) -> Result<Box<dyn MediaStream>, AcquireError> {
        let index = match &constraints.device_id {
            Some(id) => id
                .parse::<u32>()
                .map_err(|_| AcquireError::Unavailable(format!("unknown device id {id}")))?,
            None => 0,
        };
        if let Some(facing) = constraints.facing {
            tracing::debug!(?facing, "Facing preference ignored by native backend");
        }

        let (init_tx, init_rx) = oneshot::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = std::thread::Builder::new()
            .name(format!("camera-{index}"))
            .spawn({
                let slot = Arc::clone(&self.slot);
                let stop = Arc::clone(&stop);
                move || capture_loop(index, slot, stop, init_tx)
            })
            .map_err(|e| AcquireError::Unavailable(e.to_string()))?;

        match init_rx.await {
            Ok(Ok(())) => Ok(Box::new(NativeStream {
                label: format!("camera-{index}"),
                stop,
                handle: Some(handle),
            })),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => Err(AcquireError::Unavailable(
                "capture thread exited before opening the camera".into(),
            )),
        }
    }

    async fn enumerate_devices(&self) -> Option<Vec<DeviceInfo>> {
        match nokhwa::query(ApiBackend::Auto) {
            Ok(cameras) => Some(
                cameras
                    .iter()
                    .map(|info| DeviceInfo::video_input(info.index().to_string(), info.human_name()))
                    .collect(),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Camera enumeration failed");
                None
            }
        }
    }
}

fn capture_loop(
    index: u32,
    slot: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
    init_tx: oneshot::Sender<Result<(), AcquireError>>,
) {
    let requested =
        RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let opened = Camera::new(CameraIndex::Index(index), requested).and_then(|mut camera| {
        camera.open_stream()?;
        Ok(camera)
    });

    let mut camera = match opened {
        Ok(camera) => {
            let _ = init_tx.send(Ok(()));
            camera
        }
        Err(e) => {
            let _ = init_tx.send(Err(AcquireError::Unavailable(e.to_string())));
            return;
        }
    };

    tracing::info!(index, "Camera capture loop started");
    while !stop.load(Ordering::Acquire) {
        let decoded = camera
            .frame()
            .and_then(|buffer| buffer.decode_image::<RgbAFormat>());
        match decoded {
            Ok(image) => {
                let (width, height) = (image.width(), image.height());
                *slot.lock() = Some(LatestFrame {
                    width,
                    height,
                    pixels: image.into_raw(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Frame grab failed");
                std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
            }
        }
    }

    if let Err(e) = camera.stop_stream() {
        tracing::warn!(error = %e, "Failed to stop camera stream");
    }
    *slot.lock() = None;
    tracing::info!(index, "Camera capture loop stopped");
}
