//! # FX.25 TNC
//!
//! Host build of the multi-port TNC core.
//!
//! Brings up every port of the configured board against a simulated GPIO
//! bank, replays a captured sample file through the sample router and
//! drains the transmit queues.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use fx25_tnc::config::{Config, LoggingConfig};
use fx25_tnc::dsp::detector::EnergyDetector;
use fx25_tnc::hdlc::queue::TxReceiver;
use fx25_tnc::hw::adc::ReaderSampleSource;
use fx25_tnc::hw::gpio::SimulatedGpio;
use fx25_tnc::tnc::router::SampleRouter;
use fx25_tnc::tnc::system::TncSystem;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Set up the tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. When a log file
/// is configured the returned guard must be kept alive to flush it.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.to_lowercase()));

    let Some(path) = &logging.file else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("log file path {} has no file name", path.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}

/// Stand-in for the bit-clock task: consume transmit words and log them
fn spawn_tx_drain(receiver: TxReceiver) -> Result<thread::JoinHandle<()>> {
    let port = receiver.port();
    let handle = thread::Builder::new()
        .name(format!("tx-{}", port))
        .spawn(move || {
            let mut bytes: u64 = 0;
            while let Some(word) = receiver.recv() {
                bytes += word.len() as u64;
                debug!("port {}: tx word {:02X?} ({} bytes total)", port, &word[..], bytes);
            }
        })
        .with_context(|| format!("failed to start transmit drain for port {}", port))?;
    Ok(handle)
}

/// Main entry point for the TNC
///
/// # Control Flow
///
/// 1. Load configuration (first argument, or `config/default.toml`)
/// 2. Set up logging
/// 3. Initialize every port; any GPIO failure aborts startup
/// 4. Start the transmit drains and, if an input file is configured, the
///    sample router
/// 5. Run until Ctrl+C
///
/// # Errors
///
/// Returns error if the configuration is invalid, port bring-up fails or
/// the sample input cannot be opened.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging)?;

    info!("FX.25 TNC v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let profile = config.hardware.resolve()?;
    let gpio = Arc::new(SimulatedGpio::new());
    let (system, receivers) = TncSystem::init(&profile, &config.tnc_settings(), gpio)
        .context("TNC initialization failed")?;
    let system = Arc::new(system);

    for receiver in receivers {
        spawn_tx_drain(receiver)?;
    }

    match &config.router.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open sample input {}", path.display()))?;
            let source = ReaderSampleSource::new(BufReader::new(file));
            let detector = EnergyDetector::new(system.ports().len(), config.detector);

            SampleRouter::new(
                system.clone(),
                Box::new(detector),
                Box::new(source),
                config.router.batch_samples,
            )
            .spawn()?;
            info!("Replaying samples from {}", path.display());
        }
        None => info!("No sample input configured, receive path idle"),
    }

    info!("Press Ctrl+C to exit");
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");

    for port in system.ports() {
        let cdt = port.carrier_detect();
        info!(
            "port {}: carrier detect {} (level {}), {} words pending",
            port.index(),
            if cdt.active { "on" } else { "off" },
            cdt.level,
            port.tx_queue().len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_default_config_file_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = Config::load(path).unwrap();
        assert!(config.hardware.resolve().is_ok());
    }

    #[test]
    fn test_tx_drain_consumes_queue() {
        use fx25_tnc::hdlc::protocol::WordWidth;
        use fx25_tnc::hdlc::queue::transmit_queue;

        let (queue, receiver) = transmit_queue(0, 1, WordWidth::Bits8);
        let handle = spawn_tx_drain(receiver).unwrap();

        // Capacity 1: only completes if the drain keeps up
        queue.send_frame(&[0xFF; 32]).unwrap();

        drop(queue);
        handle.join().unwrap();
    }
}
