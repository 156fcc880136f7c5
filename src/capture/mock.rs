//! Scriptable test doubles for the camera platform and video source.
//!
//! These generate no real frames; they exist so scan behavior can be
//! exercised deterministically without hardware.

use super::{
    AcquireError, Capabilities, CameraPlatform, Constraints, DeviceInfo, DeviceKind, FrameBuffer,
    MediaStream, ReadyState, SourceStatus, VideoSource,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared call counter.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    /// Current count.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn incr(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock camera stream that counts how often it is stopped.
#[derive(Debug)]
pub struct MockStream {
    label: String,
    stops: CallCounter,
}

impl MockStream {
    /// Stream with its own stop counter.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            stops: CallCounter::default(),
        }
    }

    fn with_counter(label: impl Into<String>, stops: CallCounter) -> Self {
        Self {
            label: label.into(),
            stops,
        }
    }

    /// Counter incremented on every [`MediaStream::stop`].
    pub fn stop_counter(&self) -> CallCounter {
        self.stops.clone()
    }
}

impl MediaStream for MockStream {
    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&mut self) {
        self.stops.incr();
        tracing::debug!(label = %self.label, "MockStream stopped");
    }
}

/// Resolves a pending acquisition on a gated [`MockPlatform`].
#[derive(Debug)]
pub struct AcquireGate {
    sender: oneshot::Sender<bool>,
}

impl AcquireGate {
    /// Lets the pending acquisition succeed.
    pub fn grant(self) {
        let _ = self.sender.send(true);
    }

    /// Makes the pending acquisition fail with [`AcquireError::Denied`].
    pub fn deny(self) {
        let _ = self.sender.send(false);
    }
}

#[derive(Debug)]
enum AcquireBehavior {
    Grant,
    Deny,
    Gated(Mutex<Option<oneshot::Receiver<bool>>>),
}

/// Mock camera platform.
#[derive(Debug)]
pub struct MockPlatform {
    capabilities: Capabilities,
    behavior: AcquireBehavior,
    devices: Option<Vec<DeviceInfo>>,
    acquires: CallCounter,
    stops: CallCounter,
    last_constraints: Mutex<Option<Constraints>>,
}

impl MockPlatform {
    /// Platform with every capability that grants every acquisition.
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities::full(),
            behavior: AcquireBehavior::Grant,
            devices: Some(vec![
                DeviceInfo::video_input("cam-0", "Front Camera"),
                DeviceInfo {
                    device_id: "mic-0".into(),
                    label: "Microphone".into(),
                    kind: DeviceKind::AudioInput,
                },
                DeviceInfo::video_input("cam-1", "Rear Camera"),
            ]),
            acquires: CallCounter::default(),
            stops: CallCounter::default(),
            last_constraints: Mutex::new(None),
        }
    }

    /// Platform whose acquisitions are always denied.
    pub fn denying() -> Self {
        Self {
            behavior: AcquireBehavior::Deny,
            ..Self::new()
        }
    }

    /// Platform without a camera API.
    pub fn without_camera() -> Self {
        Self::with_capabilities(Capabilities {
            camera_acquisition: false,
            ..Capabilities::full()
        })
    }

    /// Platform with custom capabilities.
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            ..Self::new()
        }
    }

    /// Platform whose first acquisition waits until the gate is resolved.
    pub fn gated() -> (Self, AcquireGate) {
        let (sender, receiver) = oneshot::channel();
        let platform = Self {
            behavior: AcquireBehavior::Gated(Mutex::new(Some(receiver))),
            ..Self::new()
        };
        (platform, AcquireGate { sender })
    }

    /// Replaces the enumerated device list.
    pub fn with_devices(mut self, devices: Option<Vec<DeviceInfo>>) -> Self {
        self.devices = devices;
        self
    }

    /// Number of acquisitions attempted.
    pub fn acquire_count(&self) -> usize {
        self.acquires.get()
    }

    /// Number of acquired streams that have been stopped.
    pub fn stop_count(&self) -> usize {
        self.stops.get()
    }

    /// Constraints of the most recent acquisition.
    pub fn last_constraints(&self) -> Option<Constraints> {
        lock(&self.last_constraints).clone()
    }

    fn stream(&self) -> Box<dyn MediaStream> {
        let label = format!("mock-{}", self.acquires.get());
        Box::new(MockStream::with_counter(label, self.stops.clone()))
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraPlatform for MockPlatform {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn acquire(&self, constraints: &Constraints) -> Result<Box<dyn MediaStream>, AcquireError> {
        self.acquires.incr();
        *lock(&self.last_constraints) = Some(constraints.clone());

        if !self.capabilities.camera_acquisition {
            return Err(AcquireError::NotSupported);
        }

        match &self.behavior {
            AcquireBehavior::Grant => Ok(self.stream()),
            AcquireBehavior::Deny => Err(AcquireError::Denied),
            AcquireBehavior::Gated(gate) => {
                let receiver = lock(gate).take();
                let granted = match receiver {
                    Some(receiver) => receiver.await.unwrap_or(false),
                    None => true,
                };
                if granted {
                    Ok(self.stream())
                } else {
                    Err(AcquireError::Denied)
                }
            }
        }
    }

    async fn enumerate_devices(&self) -> Option<Vec<DeviceInfo>> {
        if !self.capabilities.device_enumeration {
            return None;
        }
        self.devices.clone()
    }
}

/// One scripted frame of a [`MockVideoSource`].
#[derive(Debug, Clone, Copy)]
pub struct MockFrame {
    /// Status reported for this frame.
    pub status: SourceStatus,
    /// Byte value the frame is filled with when drawn.
    pub tag: u8,
}

/// Mock video source replaying a script of frames.
///
/// Every [`VideoSource::status`] call while attached consumes one scripted
/// frame; once the script runs out the fallback status is reported.
/// Drawing fills the buffer with the tag of the last consumed frame.
#[derive(Debug)]
pub struct MockVideoSource {
    script: Mutex<VecDeque<MockFrame>>,
    fallback: Mutex<SourceStatus>,
    tag: AtomicU8,
    attached: AtomicBool,
    attaches: CallCounter,
    detaches: CallCounter,
    probes: CallCounter,
}

impl MockVideoSource {
    /// Source that is never ready unless scripted.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(SourceStatus::EMPTY),
            tag: AtomicU8::new(0),
            attached: AtomicBool::new(false),
            attaches: CallCounter::default(),
            detaches: CallCounter::default(),
            probes: CallCounter::default(),
        }
    }

    /// Source that always reports a ready frame of the given size.
    pub fn ready(width: u32, height: u32, tag: u8) -> Self {
        let source = Self::new();
        source.set_fallback(SourceStatus::new(width, height, ReadyState::HaveEnoughData));
        source.set_tag(tag);
        source
    }

    /// Appends `count` frames with zero dimensions.
    pub fn push_not_ready(&self, count: usize) {
        let mut script = lock(&self.script);
        for _ in 0..count {
            script.push_back(MockFrame {
                status: SourceStatus::new(0, 0, ReadyState::HaveMetadata),
                tag: 0,
            });
        }
    }

    /// Appends a ready frame filled with `tag`.
    pub fn push_ready(&self, width: u32, height: u32, tag: u8) {
        lock(&self.script).push_back(MockFrame {
            status: SourceStatus::new(width, height, ReadyState::HaveEnoughData),
            tag,
        });
    }

    /// Sets the status reported once the script is exhausted.
    pub fn set_fallback(&self, status: SourceStatus) {
        *lock(&self.fallback) = status;
    }

    /// Sets the fill value used by the next draw.
    pub fn set_tag(&self, tag: u8) {
        self.tag.store(tag, Ordering::SeqCst);
    }

    /// Number of times a stream was attached.
    pub fn attach_count(&self) -> usize {
        self.attaches.get()
    }

    /// Number of times the binding was cleared.
    pub fn detach_count(&self) -> usize {
        self.detaches.get()
    }

    /// Number of status queries made while attached.
    pub fn probe_count(&self) -> usize {
        self.probes.get()
    }

    /// True while a stream is attached.
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

impl Default for MockVideoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSource for MockVideoSource {
    fn status(&self) -> SourceStatus {
        if !self.is_attached() {
            return SourceStatus::EMPTY;
        }
        self.probes.incr();

        match lock(&self.script).pop_front() {
            Some(frame) => {
                self.set_tag(frame.tag);
                frame.status
            }
            None => *lock(&self.fallback),
        }
    }

    fn attach(&self, stream: &dyn MediaStream) {
        self.attaches.incr();
        self.attached.store(true, Ordering::SeqCst);
        tracing::debug!(stream = stream.label(), "MockVideoSource attached");
    }

    fn detach(&self) {
        self.detaches.incr();
        self.attached.store(false, Ordering::SeqCst);
    }

    fn draw_into(&self, buffer: &mut FrameBuffer) {
        buffer.pixels_mut().fill(self.tag.load(Ordering::SeqCst));
    }
}
