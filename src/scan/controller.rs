//! Scan session state machine and sampling loop.
//!
//! One Tokio task drives each session. It first acquires the camera, then
//! ticks at the configured interval. Every state transition happens under
//! the session lock, and the generation counter is bumped on every stop so
//! an acquisition that completes afterwards is discarded instead of bound.
//!
//! Pausing only suppresses decode dispatch; the timer keeps ticking and
//! the camera stays warm, so resuming takes effect on the next tick.

use super::stats::StatsCounters;
use super::{InvalidTransition, PayloadStream, ScanState, ScanStats};
use crate::capture::{
    CameraPlatform, CameraResource, ConfigError, Constraints, FacingMode, FrameSnapshotter,
    ScanConfig, VideoSource,
};
use crate::codec::{Codec, CodecOptions, DecodedPayload};
use crate::ScanError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

pub(crate) type PayloadResult = Result<DecodedPayload, ScanError>;

/// Per-session options supplied to [`ScanController::start`].
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Camera facing; falls back to [`ScanConfig::preferred_facing`].
    pub preferred_facing: Option<FacingMode>,
    /// Specific camera to open.
    pub device_id: Option<String>,
    /// Codec options; falls back to the defaults.
    pub codec_options: Option<CodecOptions>,
}

struct Session {
    state: ScanState,
    camera: Option<Arc<CameraResource>>,
    shutdown: Option<watch::Sender<bool>>,
}

struct Shared {
    session: Mutex<Session>,
    /// Continue flag: decode on the next tick only while set.
    running: AtomicBool,
    generation: AtomicU64,
    stats: StatsCounters,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn stop(&self) {
        let camera = {
            let mut session = self.lock();
            if session.state.is_terminal() {
                return;
            }
            let previous = session.state;
            session.state = ScanState::Stopped;
            self.running.store(false, Ordering::SeqCst);
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(shutdown) = session.shutdown.take() {
                let _ = shutdown.send(true);
            }
            tracing::info!(from = %previous, generation, "Scan session stopped");
            session.camera.take()
        };

        if let Some(camera) = camera {
            if camera.release() {
                StatsCounters::bump(&self.stats.camera_releases);
            }
        }
    }

    /// Moves a session that failed to acquire its camera to `Stopped`.
    ///
    /// Returns false if the session was already stopped by the caller, in
    /// which case the error is not surfaced.
    fn fail(&self, generation: u64, error: ScanError) -> bool {
        let mut session = self.lock();
        if !self.is_current(generation) || session.state.is_terminal() {
            return false;
        }
        session.state = ScanState::Stopped;
        self.running.store(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        session.shutdown = None;
        tracing::warn!(error = %error, "Scan session failed");
        true
    }
}

/// Drives one scan session.
///
/// Cloning yields another handle to the same session, so one clone can be
/// handed to a signal handler while another drives the UI.
#[derive(Clone)]
pub struct ScanController {
    platform: Arc<dyn CameraPlatform>,
    codec: Arc<dyn Codec>,
    config: ScanConfig,
    shared: Arc<Shared>,
}

impl ScanController {
    /// Creates an idle controller.
    pub fn new(
        platform: Arc<dyn CameraPlatform>,
        codec: Arc<dyn Codec>,
        config: ScanConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            platform,
            codec,
            config,
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    state: ScanState::Idle,
                    camera: None,
                    shutdown: None,
                }),
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                stats: StatsCounters::default(),
            }),
        })
    }

    /// Current state.
    pub fn state(&self) -> ScanState {
        self.shared.lock().state
    }

    /// Current generation; advanced by every stop.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// Value of the continue flag.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the session counters.
    pub fn stats(&self) -> ScanStats {
        let state = self.state();
        self.shared.stats.snapshot(state, self.generation())
    }

    /// Starts scanning `source`.
    ///
    /// Valid only from [`ScanState::Idle`]. The returned stream yields
    /// decoded payloads; if the camera cannot be acquired it yields exactly
    /// one error and ends. Dropping the stream stops the session.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        &self,
        source: Arc<dyn VideoSource>,
        options: ScanOptions,
    ) -> Result<PayloadStream, InvalidTransition> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let generation = {
            let mut session = self.shared.lock();
            if session.state != ScanState::Idle {
                return Err(InvalidTransition {
                    operation: "start",
                    state: session.state,
                });
            }
            session.state = ScanState::RequestingPermission;
            session.shutdown = Some(shutdown_tx);
            self.shared.running.store(true, Ordering::SeqCst);
            self.generation()
        };

        let facing = options.preferred_facing.unwrap_or(self.config.preferred_facing);
        let constraints = Constraints {
            device_id: options.device_id,
            ..Constraints::facing(facing)
        };
        tracing::info!(
            generation,
            interval_ms = self.config.tick_interval_ms,
            facing = ?constraints.facing,
            "Scan session starting"
        );

        let task = SessionTask {
            shared: Arc::clone(&self.shared),
            platform: Arc::clone(&self.platform),
            codec: Arc::clone(&self.codec),
            config: self.config.clone(),
            source,
            constraints,
            codec_options: options.codec_options.unwrap_or_default(),
            generation,
            tx: Some(tx),
            shutdown: shutdown_rx,
        };
        tokio::spawn(task.run());

        Ok(PayloadStream::new(rx, self.clone()))
    }

    /// Suppresses decoding until [`resume`](Self::resume).
    ///
    /// A no-op when already paused.
    pub fn pause(&self) -> Result<(), InvalidTransition> {
        let mut session = self.shared.lock();
        let state = session.state;
        match state {
            ScanState::Active | ScanState::Paused => {
                self.shared.running.store(false, Ordering::SeqCst);
                if state == ScanState::Active {
                    session.state = ScanState::Paused;
                    tracing::debug!("Scan paused");
                }
                Ok(())
            }
            _ => Err(InvalidTransition {
                operation: "pause",
                state,
            }),
        }
    }

    /// Re-enables decoding.
    ///
    /// A no-op when already active.
    pub fn resume(&self) -> Result<(), InvalidTransition> {
        let mut session = self.shared.lock();
        let state = session.state;
        match state {
            ScanState::Active | ScanState::Paused => {
                self.shared.running.store(true, Ordering::SeqCst);
                if state == ScanState::Paused {
                    session.state = ScanState::Active;
                    tracing::debug!("Scan resumed");
                }
                Ok(())
            }
            _ => Err(InvalidTransition {
                operation: "resume",
                state,
            }),
        }
    }

    /// Flips between active and paused, returning the new state.
    pub fn toggle(&self) -> Result<ScanState, InvalidTransition> {
        let mut session = self.shared.lock();
        let state = session.state;
        if !state.is_scanning() {
            return Err(InvalidTransition {
                operation: "toggle",
                state,
            });
        }

        let running = !self.shared.running.load(Ordering::SeqCst);
        self.shared.running.store(running, Ordering::SeqCst);
        session.state = if running {
            ScanState::Active
        } else {
            ScanState::Paused
        };
        tracing::debug!(state = %session.state, "Scan toggled");
        Ok(session.state)
    }

    /// Tears the session down and releases the camera.
    ///
    /// Safe from any state and any thread, any number of times. The camera
    /// is released exactly once; a pending acquisition is discarded when it
    /// completes.
    pub fn stop(&self) {
        self.shared.stop();
    }
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("state", &self.state())
            .field("generation", &self.generation())
            .field("config", &self.config)
            .finish()
    }
}

struct SessionTask {
    shared: Arc<Shared>,
    platform: Arc<dyn CameraPlatform>,
    codec: Arc<dyn Codec>,
    config: ScanConfig,
    source: Arc<dyn VideoSource>,
    constraints: Constraints,
    codec_options: CodecOptions,
    generation: u64,
    /// Dropped as soon as the session stops so the stream ends promptly.
    tx: Option<mpsc::Sender<PayloadResult>>,
    shutdown: watch::Receiver<bool>,
}

impl SessionTask {
    async fn run(mut self) {
        let camera = match self.establish().await {
            Ok(Some(camera)) => camera,
            Ok(None) => return,
            Err(error) => {
                if self.shared.fail(self.generation, error) {
                    if let Some(tx) = self.tx.take() {
                        let _ = tx.send(Err(error)).await;
                    }
                }
                return;
            }
        };

        self.sample(&camera).await;
        tracing::debug!(generation = self.generation, "Scan loop exited");
    }

    /// Acquires the camera and moves the session to `Active`.
    ///
    /// Returns `Ok(None)` if the session was stopped while the acquisition
    /// was pending; the late stream is stopped without being bound. The
    /// payload sender is dropped at the stop itself, not when the platform
    /// finally answers.
    async fn establish(&mut self) -> Result<Option<Arc<CameraResource>>, ScanError> {
        if !self.shared.is_current(self.generation) {
            return Ok(None);
        }
        if !self.platform.capabilities().can_scan() {
            return Err(ScanError::NotSupported);
        }

        let platform = Arc::clone(&self.platform);
        let request = CameraResource::request_stream(platform.as_ref(), &self.constraints);
        tokio::pin!(request);

        let acquired = tokio::select! {
            biased;
            acquired = &mut request => acquired,
            _ = self.shutdown.changed() => {
                self.tx = None;
                tracing::debug!("Session stopped while camera acquisition was pending");
                (&mut request).await
            }
        };
        let mut stream = acquired?;

        let mut session = self.shared.lock();
        if !self.shared.is_current(self.generation)
            || session.state != ScanState::RequestingPermission
        {
            drop(session);
            stream.stop();
            StatsCounters::bump(&self.shared.stats.stale_acquisitions);
            tracing::info!(
                stream = stream.label(),
                "Discarded camera acquired after the session stopped"
            );
            return Ok(None);
        }

        let camera = Arc::new(CameraResource::bind(Arc::clone(&self.source), stream));
        session.camera = Some(Arc::clone(&camera));
        session.state = if self.shared.running.load(Ordering::SeqCst) {
            ScanState::Active
        } else {
            ScanState::Paused
        };
        StatsCounters::bump(&self.shared.stats.camera_acquisitions);
        tracing::info!(generation = self.generation, "Scan session active");
        Ok(Some(camera))
    }

    async fn sample(&mut self, camera: &CameraResource) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut snapshotter = FrameSnapshotter::new();

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                _ = interval.tick() => {}
            }
            if !self.shared.is_current(self.generation) {
                break;
            }

            let Some(payload) = self.tick(camera, &mut snapshotter) else {
                continue;
            };
            if !self.shared.is_current(self.generation) {
                break;
            }

            tracing::debug!(len = payload.as_str().len(), "Decoded payload");
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                sent = tx.send(Ok(payload)) => {
                    if sent.is_err() {
                        tracing::info!("Payload consumer went away");
                        self.shared.stop();
                        break;
                    }
                    StatsCounters::bump(&self.shared.stats.payloads_emitted);
                }
            }
        }
    }

    fn tick(
        &self,
        camera: &CameraResource,
        snapshotter: &mut FrameSnapshotter,
    ) -> Option<DecodedPayload> {
        let stats = &self.shared.stats;
        StatsCounters::bump(&stats.ticks);

        if !self.shared.running.load(Ordering::SeqCst) {
            StatsCounters::bump(&stats.paused_ticks);
            tracing::trace!("Tick skipped: paused");
            return None;
        }

        let Some(status) = camera.ready_status() else {
            StatsCounters::bump(&stats.not_ready_ticks);
            tracing::trace!("Tick skipped: frame not ready");
            return None;
        };

        let frame = snapshotter.snapshot(camera, status)?;
        StatsCounters::bump(&stats.decode_attempts);

        let codec = self.codec.as_ref();
        let options = &self.codec_options;
        match panic::catch_unwind(AssertUnwindSafe(|| codec.decode(frame, options))) {
            Ok(found) => found,
            Err(_) => {
                StatsCounters::bump(&stats.decode_failures);
                tracing::warn!("Codec panicked; treating frame as having no code");
                None
            }
        }
    }
}
