//! Metrics collection and registry.

use crate::scan::ScanStats;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of scanner state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Numeric session state (see [`ScanState::code`](crate::scan::ScanState::code)).
    pub state_code: i64,
    /// Whether a camera stream is currently bound.
    pub camera_active: bool,
    /// Logical ticks processed.
    pub ticks: u64,
    /// Ticks skipped while paused.
    pub paused_ticks: u64,
    /// Ticks skipped because no frame was ready.
    pub not_ready_ticks: u64,
    /// Frames handed to the codec.
    pub decode_attempts: u64,
    /// Decode calls that failed.
    pub decode_failures: u64,
    /// Payloads delivered to the consumer.
    pub payloads_emitted: u64,
    /// Camera streams bound.
    pub camera_acquisitions: u64,
    /// Camera streams released.
    pub camera_releases: u64,
}

/// Prometheus metrics registry for scan monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    // Session metrics
    session_state: IntGauge,
    camera_active: IntGauge,

    // Loop metrics
    ticks_total: IntCounter,
    paused_ticks_total: IntCounter,
    not_ready_ticks_total: IntCounter,
    decode_attempts_total: IntCounter,
    decode_failures_total: IntCounter,
    payloads_total: IntCounter,

    // Camera metrics
    camera_acquisitions_total: IntCounter,
    camera_releases_total: IntCounter,
}

/// Advances a counter to `target`; counters never go backwards.
fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all scan metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let session_state = IntGauge::new(
            "qr_scan_session_state",
            "Session state (0=idle, 1=requesting, 2=active, 3=paused, 4=stopped)",
        )?;
        let camera_active = IntGauge::new(
            "qr_scan_camera_active",
            "Whether a camera stream is bound (1=yes, 0=no)",
        )?;

        let ticks_total = IntCounter::new("qr_scan_ticks_total", "Logical ticks processed")?;
        let paused_ticks_total = IntCounter::new(
            "qr_scan_paused_ticks_total",
            "Ticks skipped because scanning was paused",
        )?;
        let not_ready_ticks_total = IntCounter::new(
            "qr_scan_not_ready_ticks_total",
            "Ticks skipped because no frame was ready",
        )?;
        let decode_attempts_total = IntCounter::new(
            "qr_scan_decode_attempts_total",
            "Frames handed to the codec",
        )?;
        let decode_failures_total = IntCounter::new(
            "qr_scan_decode_failures_total",
            "Decode calls that failed and were treated as empty",
        )?;
        let payloads_total = IntCounter::new(
            "qr_scan_payloads_total",
            "Decoded payloads delivered to the consumer",
        )?;

        let camera_acquisitions_total = IntCounter::new(
            "qr_scan_camera_acquisitions_total",
            "Camera streams bound to a session",
        )?;
        let camera_releases_total = IntCounter::new(
            "qr_scan_camera_releases_total",
            "Camera streams released by a session",
        )?;

        registry.register(Box::new(session_state.clone()))?;
        registry.register(Box::new(camera_active.clone()))?;
        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(paused_ticks_total.clone()))?;
        registry.register(Box::new(not_ready_ticks_total.clone()))?;
        registry.register(Box::new(decode_attempts_total.clone()))?;
        registry.register(Box::new(decode_failures_total.clone()))?;
        registry.register(Box::new(payloads_total.clone()))?;
        registry.register(Box::new(camera_acquisitions_total.clone()))?;
        registry.register(Box::new(camera_releases_total.clone()))?;

        Ok(Self {
            registry,
            session_state,
            camera_active,
            ticks_total,
            paused_ticks_total,
            not_ready_ticks_total,
            decode_attempts_total,
            decode_failures_total,
            payloads_total,
            camera_acquisitions_total,
            camera_releases_total,
        })
    }

    /// Updates all metrics from a snapshot of scanner state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.session_state.set(snapshot.state_code);
        self.camera_active.set(if snapshot.camera_active { 1 } else { 0 });

        advance(&self.ticks_total, snapshot.ticks);
        advance(&self.paused_ticks_total, snapshot.paused_ticks);
        advance(&self.not_ready_ticks_total, snapshot.not_ready_ticks);
        advance(&self.decode_attempts_total, snapshot.decode_attempts);
        advance(&self.decode_failures_total, snapshot.decode_failures);
        advance(&self.payloads_total, snapshot.payloads_emitted);
        advance(&self.camera_acquisitions_total, snapshot.camera_acquisitions);
        advance(&self.camera_releases_total, snapshot.camera_releases);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl From<&ScanStats> for MetricsSnapshot {
    fn from(stats: &ScanStats) -> Self {
        Self {
            state_code: stats.state.code(),
            camera_active: stats.camera_acquisitions > stats.camera_releases,
            ticks: stats.ticks,
            paused_ticks: stats.paused_ticks,
            not_ready_ticks: stats.not_ready_ticks,
            decode_attempts: stats.decode_attempts,
            decode_failures: stats.decode_failures,
            payloads_emitted: stats.payloads_emitted,
            camera_acquisitions: stats.camera_acquisitions,
            camera_releases: stats.camera_releases,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanState;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let snapshot = MetricsSnapshot {
            state_code: ScanState::Active.code(),
            camera_active: true,
            ticks: 10,
            paused_ticks: 2,
            not_ready_ticks: 3,
            decode_attempts: 5,
            decode_failures: 0,
            payloads_emitted: 1,
            camera_acquisitions: 1,
            camera_releases: 0,
        };

        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("qr_scan_session_state 2"));
        assert!(output.contains("qr_scan_camera_active 1"));
        assert!(output.contains("qr_scan_ticks_total 10"));
        assert!(output.contains("qr_scan_payloads_total 1"));
    }

    #[test]
    fn test_counters_never_decrease() {
        let registry = MetricsRegistry::new().unwrap();

        registry.update(&MetricsSnapshot {
            ticks: 10,
            ..Default::default()
        });
        registry.update(&MetricsSnapshot {
            ticks: 4,
            ..Default::default()
        });

        let output = registry.encode().unwrap();
        assert!(output.contains("qr_scan_ticks_total 10"));
    }

    #[test]
    fn test_snapshot_from_stats() {
        let stats = ScanStats {
            state: ScanState::Stopped,
            generation: 1,
            ticks: 7,
            paused_ticks: 0,
            not_ready_ticks: 3,
            decode_attempts: 4,
            decode_failures: 1,
            payloads_emitted: 1,
            camera_acquisitions: 1,
            camera_releases: 1,
            stale_acquisitions: 0,
        };

        let snapshot = MetricsSnapshot::from(&stats);
        assert_eq!(snapshot.state_code, 4);
        assert!(!snapshot.camera_active);
        assert_eq!(snapshot.decode_attempts, 4);
    }
}
