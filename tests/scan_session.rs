//! End-to-end behavior of a scan session against the mock platform.

use qr_scan::capture::{Capabilities, MockPlatform, MockVideoSource, ScanConfig};
use qr_scan::codec::MockCodec;
use qr_scan::scan::{ScanController, ScanOptions, ScanState};
use qr_scan::ScanError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn scanner(platform: &Arc<MockPlatform>, codec: MockCodec) -> ScanController {
    ScanController::new(platform.clone(), Arc::new(codec), ScanConfig::default()).unwrap()
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    while !condition() {
        sleep(Duration::from_millis(10)).await;
    }
}

/// Three not-ready frames, one frame without a code, then "HELLO".
fn hello_source() -> Arc<MockVideoSource> {
    let source = Arc::new(MockVideoSource::new());
    source.push_not_ready(3);
    source.push_ready(64, 48, 1);
    source.push_ready(64, 48, 2);
    source
}

#[tokio::test(start_paused = true)]
async fn test_emits_payload_after_frames_become_ready() {
    let platform = Arc::new(MockPlatform::new());
    let scanner = scanner(&platform, MockCodec::new().on(2, "HELLO"));
    let source = hello_source();

    let started = Instant::now();
    let mut payloads = scanner.start(source.clone(), ScanOptions::default()).unwrap();

    let payload = payloads.next_payload().await.unwrap().unwrap();
    assert_eq!(payload.as_str(), "HELLO");
    assert_eq!(started.elapsed(), Duration::from_millis(1200));

    let stats = scanner.stats();
    assert_eq!(stats.state, ScanState::Active);
    assert_eq!(stats.ticks, 5);
    assert_eq!(stats.not_ready_ticks, 3);
    assert_eq!(stats.decode_attempts, 2);
    assert_eq!(stats.payloads_emitted, 1);

    // Nothing else decodes; the source falls back to an empty status.
    sleep(Duration::from_secs(3)).await;
    assert!(payloads.try_next_payload().is_none());

    payloads.cancel();
    assert!(payloads.next_payload().await.is_none());
    assert_eq!(platform.stop_count(), 1);
    assert!(!source.is_attached());
}

#[tokio::test(start_paused = true)]
async fn test_pause_suppresses_decoding_until_resume() {
    let platform = Arc::new(MockPlatform::new());
    let scanner = scanner(&platform, MockCodec::new().on(2, "HELLO"));
    let source = hello_source();

    let mut payloads = scanner.start(source.clone(), ScanOptions::default()).unwrap();
    wait_for(|| source.probe_count() == 4).await;
    scanner.pause().unwrap();

    let ticks_before = scanner.stats().ticks;
    sleep(Duration::from_secs(3)).await;

    let stats = scanner.stats();
    assert_eq!(source.probe_count(), 4);
    assert!(stats.ticks >= ticks_before + 9);
    assert!(stats.paused_ticks >= 9);
    assert_eq!(stats.decode_attempts, 1);
    assert!(payloads.try_next_payload().is_none());
    assert!(source.is_attached());

    scanner.resume().unwrap();
    let payload = payloads.next_payload().await.unwrap().unwrap();
    assert_eq!(payload.as_str(), "HELLO");
    assert_eq!(source.probe_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_twice_keeps_scanning() {
    let platform = Arc::new(MockPlatform::new());
    let scanner = scanner(&platform, MockCodec::new().on(2, "HELLO"));
    let source = hello_source();

    let mut payloads = scanner.start(source.clone(), ScanOptions::default()).unwrap();
    wait_for(|| scanner.state() == ScanState::Active).await;

    assert_eq!(scanner.toggle().unwrap(), ScanState::Paused);
    assert_eq!(scanner.toggle().unwrap(), ScanState::Active);

    let payload = payloads.next_payload().await.unwrap().unwrap();
    assert_eq!(payload.as_str(), "HELLO");
}

#[tokio::test(start_paused = true)]
async fn test_stop_releases_camera_once() {
    let platform = Arc::new(MockPlatform::new());
    let scanner = scanner(&platform, MockCodec::new());
    let source = Arc::new(MockVideoSource::ready(32, 32, 0));

    let mut payloads = scanner.start(source.clone(), ScanOptions::default()).unwrap();
    wait_for(|| scanner.state() == ScanState::Active).await;

    for _ in 0..5 {
        scanner.stop();
    }
    payloads.cancel();

    assert_eq!(scanner.state(), ScanState::Stopped);
    assert_eq!(platform.stop_count(), 1);
    assert_eq!(source.detach_count(), 1);
    assert_eq!(scanner.stats().camera_releases, 1);
    assert!(payloads.next_payload().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_stops_release_once() {
    let platform = Arc::new(MockPlatform::new());
    let scanner = scanner(&platform, MockCodec::new());
    let source = Arc::new(MockVideoSource::ready(32, 32, 0));

    let mut payloads = scanner.start(source.clone(), ScanOptions::default()).unwrap();
    wait_for(|| scanner.state() == ScanState::Active).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let scanner = scanner.clone();
            std::thread::spawn(move || {
                for _ in 0..4 {
                    scanner.stop();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(platform.stop_count(), 1);
    assert_eq!(source.detach_count(), 1);
    assert_eq!(scanner.generation(), 1);
    assert!(payloads.next_payload().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_no_ticks_after_stop() {
    let platform = Arc::new(MockPlatform::new());
    let codec = Arc::new(MockCodec::new());
    let scanner =
        ScanController::new(platform.clone(), codec.clone(), ScanConfig::default()).unwrap();
    let source = Arc::new(MockVideoSource::ready(32, 32, 0));

    let mut payloads = scanner.start(source.clone(), ScanOptions::default()).unwrap();
    wait_for(|| scanner.stats().decode_attempts >= 3).await;

    scanner.stop();
    let stats = scanner.stats();
    let calls = codec.calls();
    let probes = source.probe_count();

    sleep(Duration::from_secs(5)).await;

    assert_eq!(scanner.stats().ticks, stats.ticks);
    assert_eq!(codec.calls(), calls);
    assert_eq!(source.probe_count(), probes);
    assert!(payloads.next_payload().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_stream_stops_session() {
    let platform = Arc::new(MockPlatform::new());
    let scanner = scanner(&platform, MockCodec::new());
    let source = Arc::new(MockVideoSource::ready(32, 32, 0));

    let payloads = scanner.start(source.clone(), ScanOptions::default()).unwrap();
    wait_for(|| scanner.state() == ScanState::Active).await;

    drop(payloads);

    assert_eq!(scanner.state(), ScanState::Stopped);
    assert_eq!(platform.stop_count(), 1);
    assert!(!source.is_attached());
}

#[tokio::test(start_paused = true)]
async fn test_missing_camera_api_reports_not_supported() {
    let platform = Arc::new(MockPlatform::without_camera());
    let scanner = scanner(&platform, MockCodec::new());
    let source = Arc::new(MockVideoSource::ready(32, 32, 0));

    let mut payloads = scanner.start(source.clone(), ScanOptions::default()).unwrap();

    assert_eq!(payloads.next_payload().await, Some(Err(ScanError::NotSupported)));
    assert!(payloads.next_payload().await.is_none());
    assert_eq!(platform.acquire_count(), 0);
    assert_eq!(source.attach_count(), 0);
    assert_eq!(scanner.state(), ScanState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_missing_pixel_buffer_reports_not_supported() {
    let platform = Arc::new(MockPlatform::with_capabilities(Capabilities {
        pixel_buffer: false,
        ..Capabilities::full()
    }));
    let scanner = scanner(&platform, MockCodec::new());

    let mut payloads = scanner
        .start(Arc::new(MockVideoSource::new()), ScanOptions::default())
        .unwrap();

    assert_eq!(payloads.next_payload().await, Some(Err(ScanError::NotSupported)));
    assert!(payloads.next_payload().await.is_none());
    assert_eq!(platform.acquire_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_denied_camera_reports_no_permissions() {
    let platform = Arc::new(MockPlatform::denying());
    let scanner = scanner(&platform, MockCodec::new());
    let source = Arc::new(MockVideoSource::ready(32, 32, 0));

    let mut payloads = scanner.start(source.clone(), ScanOptions::default()).unwrap();

    assert_eq!(payloads.next_payload().await, Some(Err(ScanError::NoPermissions)));
    assert!(payloads.next_payload().await.is_none());
    assert_eq!(platform.acquire_count(), 1);
    assert_eq!(platform.stop_count(), 0);
    assert_eq!(source.attach_count(), 0);
    assert_eq!(scanner.state(), ScanState::Stopped);

    // A failed session stays failed; controls are rejected.
    assert!(scanner.pause().is_err());
    scanner.stop();
    assert_eq!(scanner.state(), ScanState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_acquisition_after_stop_is_discarded() {
    let (platform, gate) = MockPlatform::gated();
    let platform = Arc::new(platform);
    let scanner = scanner(&platform, MockCodec::new());
    let source = Arc::new(MockVideoSource::ready(32, 32, 0));

    let mut payloads = scanner.start(source.clone(), ScanOptions::default()).unwrap();
    wait_for(|| platform.acquire_count() == 1).await;
    assert_eq!(scanner.state(), ScanState::RequestingPermission);

    scanner.stop();
    gate.grant();

    assert!(payloads.next_payload().await.is_none());
    wait_for(|| platform.stop_count() == 1).await;
    let stats = scanner.stats();
    assert_eq!(platform.stop_count(), 1);
    assert_eq!(source.attach_count(), 0);
    assert_eq!(stats.stale_acquisitions, 1);
    assert_eq!(stats.camera_acquisitions, 0);
    assert_eq!(stats.camera_releases, 0);
    assert_eq!(scanner.state(), ScanState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_ends_stream_while_acquisition_pending() {
    let (platform, gate) = MockPlatform::gated();
    let platform = Arc::new(platform);
    let scanner = scanner(&platform, MockCodec::new());
    let source = Arc::new(MockVideoSource::ready(32, 32, 0));

    let mut payloads = scanner.start(source.clone(), ScanOptions::default()).unwrap();
    wait_for(|| platform.acquire_count() == 1).await;

    scanner.stop();

    // The platform has not answered yet; the stream must still end.
    let ended = tokio::time::timeout(Duration::from_secs(5), payloads.next_payload()).await;
    assert_eq!(ended, Ok(None));
    assert_eq!(platform.stop_count(), 0);

    // A late grant is still stopped and never bound.
    gate.grant();
    wait_for(|| platform.stop_count() == 1).await;
    assert_eq!(source.attach_count(), 0);
    assert_eq!(scanner.stats().stale_acquisitions, 1);
    assert_eq!(scanner.stats().camera_acquisitions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_denial_after_stop_is_not_reported() {
    let (platform, gate) = MockPlatform::gated();
    let platform = Arc::new(platform);
    let scanner = scanner(&platform, MockCodec::new());

    let mut payloads = scanner
        .start(Arc::new(MockVideoSource::new()), ScanOptions::default())
        .unwrap();
    wait_for(|| platform.acquire_count() == 1).await;

    scanner.stop();
    gate.deny();

    assert!(payloads.next_payload().await.is_none());
    assert_eq!(platform.stop_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_task_runs_never_acquires() {
    let platform = Arc::new(MockPlatform::new());
    let scanner = scanner(&platform, MockCodec::new());

    let mut payloads = scanner
        .start(Arc::new(MockVideoSource::new()), ScanOptions::default())
        .unwrap();
    scanner.stop();

    assert!(payloads.next_payload().await.is_none());
    assert_eq!(platform.acquire_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_codec_panic_is_absorbed() {
    let platform = Arc::new(MockPlatform::new());
    let scanner = scanner(&platform, MockCodec::new().panic_on(9).on(2, "AFTER"));
    let source = Arc::new(MockVideoSource::new());
    source.push_ready(16, 16, 9);
    source.push_ready(16, 16, 2);

    let mut payloads = scanner.start(source, ScanOptions::default()).unwrap();

    let payload = payloads.next_payload().await.unwrap().unwrap();
    assert_eq!(payload.as_str(), "AFTER");

    let stats = scanner.stats();
    assert_eq!(stats.decode_attempts, 2);
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(stats.state, ScanState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_empty_payload_is_never_emitted() {
    let platform = Arc::new(MockPlatform::new());
    let scanner = scanner(&platform, MockCodec::new().on(3, ""));
    let source = Arc::new(MockVideoSource::ready(16, 16, 3));

    let mut payloads = scanner.start(source, ScanOptions::default()).unwrap();
    sleep(Duration::from_secs(2)).await;

    assert!(payloads.try_next_payload().is_none());
    assert!(scanner.stats().decode_attempts >= 6);
    assert_eq!(scanner.stats().payloads_emitted, 0);
}

#[tokio::test(start_paused = true)]
async fn test_configured_interval_sets_cadence() {
    let platform = Arc::new(MockPlatform::new());
    let scanner = ScanController::new(
        platform.clone(),
        Arc::new(MockCodec::new().on(2, "HELLO")),
        ScanConfig::with_interval(50),
    )
    .unwrap();

    let started = Instant::now();
    let mut payloads = scanner.start(hello_source(), ScanOptions::default()).unwrap();

    let payload = payloads.next_payload().await.unwrap().unwrap();
    assert_eq!(payload.as_str(), "HELLO");
    assert_eq!(started.elapsed(), Duration::from_millis(200));
}
