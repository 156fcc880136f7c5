//! QR Scan CLI
//!
//! Scans a still image (or, with the `camera` feature, a live camera) and
//! prints every decoded payload until interrupted.

use clap::Parser;
use qr_scan::{
    capture::{CameraPlatform, FileConfig, StillImageSource, StillPlatform, VideoSource},
    codec::QrCodec,
    permission::PermissionGate,
    scan::{ScanController, ScanOptions},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "qr-scan", version, about = "Scan QR codes from a camera or image")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scan a still image instead of a camera.
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Camera device to open (see --list-devices).
    #[arg(short, long)]
    device: Option<String>,

    /// List video input devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Exit after the first decoded payload.
    #[arg(long)]
    once: bool,

    /// Override the tick interval in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,
}

fn select_source(cli: &Cli) -> Result<(Arc<dyn CameraPlatform>, Arc<dyn VideoSource>), String> {
    match &cli.image {
        Some(path) => {
            let source = StillImageSource::open(path).map_err(|e| e.to_string())?;
            Ok((Arc::new(StillPlatform::new()), Arc::new(source)))
        }
        None => camera_source(),
    }
}

#[cfg(feature = "camera")]
fn camera_source() -> Result<(Arc<dyn CameraPlatform>, Arc<dyn VideoSource>), String> {
    let source = qr_scan::capture::NativeSource::new();
    let platform = qr_scan::capture::NativePlatform::new(&source);
    Ok((Arc::new(platform), Arc::new(source)))
}

#[cfg(not(feature = "camera"))]
fn camera_source() -> Result<(Arc<dyn CameraPlatform>, Arc<dyn VideoSource>), String> {
    Err("no video source: pass --image, or build with the `camera` feature".into())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    info!("QR Scan v{}", qr_scan::VERSION);

    let mut config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(2);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(interval_ms) = cli.interval_ms {
        config.scan.tick_interval_ms = interval_ms;
    }
    let exit_after_first = cli.once || config.output.exit_after_first;

    let (platform, source) = match select_source(&cli) {
        Ok(selected) => selected,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let gate = PermissionGate::new(Arc::clone(&platform));

    if cli.list_devices {
        match gate.list_video_input_devices().await {
            Ok(devices) => {
                for device in devices {
                    println!("{}\t{}", device.device_id, device.label);
                }
                return;
            }
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }

    if !gate.check_capability() {
        eprintln!("{}", qr_scan::ScanError::NotSupported);
        std::process::exit(1);
    }
    if let Err(e) = gate.request_permission().await {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let scanner = match ScanController::new(platform, Arc::new(QrCodec::new()), config.scan.clone())
    {
        Ok(scanner) => scanner,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let interrupt = scanner.clone();
    if let Err(e) = ctrlc::set_handler(move || interrupt.stop()) {
        warn!("Failed to install interrupt handler: {}", e);
    }

    #[cfg(feature = "metrics")]
    if config.output.metrics_port != 0 {
        spawn_metrics_server(config.output.metrics_port, scanner.clone());
    }

    let options = ScanOptions {
        device_id: cli.device.clone(),
        codec_options: Some(config.codec),
        ..Default::default()
    };
    let mut payloads = match scanner.start(source, options) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Scanning; press Ctrl-C to stop");
    let mut failed = false;
    while let Some(result) = payloads.next_payload().await {
        match result {
            Ok(payload) => {
                println!(
                    "[{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    payload
                );
                if exit_after_first {
                    scanner.stop();
                }
            }
            Err(e) => {
                eprintln!("Scan failed: {}", e);
                failed = true;
            }
        }
    }

    let stats = scanner.stats();
    info!(
        ticks = stats.ticks,
        decode_attempts = stats.decode_attempts,
        payloads = stats.payloads_emitted,
        "Scan finished"
    );

    if failed {
        std::process::exit(1);
    }
}

#[cfg(feature = "metrics")]
fn spawn_metrics_server(port: u16, scanner: ScanController) {
    use qr_scan::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};

    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            return;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            interval.tick().await;
            state.write().await.update(&scanner.stats());
        }
    });
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            warn!("Metrics server stopped: {}", e);
        }
    });
}
