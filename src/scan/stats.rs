//! Scan loop counters.

use super::ScanState;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of a session's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Current session state.
    pub state: ScanState,
    /// Session generation.
    pub generation: u64,
    /// Logical ticks processed.
    pub ticks: u64,
    /// Ticks skipped because the session was paused.
    pub paused_ticks: u64,
    /// Ticks skipped because no frame was ready.
    pub not_ready_ticks: u64,
    /// Frames handed to the codec.
    pub decode_attempts: u64,
    /// Decode calls that panicked.
    pub decode_failures: u64,
    /// Payloads delivered to the consumer.
    pub payloads_emitted: u64,
    /// Camera streams bound to the session.
    pub camera_acquisitions: u64,
    /// Camera streams released by the session.
    pub camera_releases: u64,
    /// Acquisitions discarded because the session had already stopped.
    pub stale_acquisitions: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub(crate) ticks: AtomicU64,
    pub(crate) paused_ticks: AtomicU64,
    pub(crate) not_ready_ticks: AtomicU64,
    pub(crate) decode_attempts: AtomicU64,
    pub(crate) decode_failures: AtomicU64,
    pub(crate) payloads_emitted: AtomicU64,
    pub(crate) camera_acquisitions: AtomicU64,
    pub(crate) camera_releases: AtomicU64,
    pub(crate) stale_acquisitions: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, state: ScanState, generation: u64) -> ScanStats {
        let get = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        ScanStats {
            state,
            generation,
            ticks: get(&self.ticks),
            paused_ticks: get(&self.paused_ticks),
            not_ready_ticks: get(&self.not_ready_ticks),
            decode_attempts: get(&self.decode_attempts),
            decode_failures: get(&self.decode_failures),
            payloads_emitted: get(&self.payloads_emitted),
            camera_acquisitions: get(&self.camera_acquisitions),
            camera_releases: get(&self.camera_releases),
            stale_acquisitions: get(&self.stale_acquisitions),
        }
    }
}
