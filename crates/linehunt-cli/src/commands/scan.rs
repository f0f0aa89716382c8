use anyhow::{Context, Result};
use linehunt_core::{Config, ReaderSource, Scan, ScanConfig, ShutdownHandle};
use std::future::Future;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use crate::output::ConsoleSink;
use crate::{OutputFormat, ScanOptions};

/// Exit status when the scan was interrupted
const EXIT_CANCELLED: i32 = 130;
/// Exit status when the input failed mid-stream
const EXIT_SOURCE_ERROR: i32 = 2;

pub fn run(
    config: &Config,
    term: String,
    file: Option<PathBuf>,
    options: &ScanOptions,
    format: OutputFormat,
) -> Result<i32> {
    let mut scan_config = ScanConfig::from_config(config, term);
    if let Some(capacity) = options.capacity {
        scan_config.capacity = capacity;
    }
    if let Some(workers) = options.workers {
        scan_config.workers = workers;
    }
    scan_config.ignore_case |= options.ignore_case;

    let scan = Scan::new(scan_config).context("Failed to set up scan")?;
    install_ctrl_c(scan.shutdown_handle());

    let show_workers = config.output.show_workers && !options.total_only;
    let sink = ConsoleSink::new(format, show_workers);

    let report = match file.as_deref() {
        Some(path) if path != Path::new("-") => {
            let source = ReaderSource::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            scan.run(source, &sink)
        }
        _ => scan.run(ReaderSource::new(BufReader::new(io::stdin())), &sink),
    }
    .context("Scan failed")?;

    sink.finish(&report)?;

    if report.source_error.is_some() {
        Ok(EXIT_SOURCE_ERROR)
    } else if report.cancelled {
        Ok(EXIT_CANCELLED)
    } else {
        Ok(0)
    }
}

/// How interrupt handling ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupts {
    /// A second interrupt arrived while the scan was still winding down
    Forced,
    /// Interrupts could not be received
    Unavailable,
}

/// Wire Ctrl-C to the scan's shutdown handle
///
/// The signal is awaited on a dedicated thread with its own small runtime,
/// so the scan threads never touch async code. A second Ctrl-C exits right
/// away, since the reader may be stuck in a blocking read on stdin.
fn install_ctrl_c(handle: ShutdownHandle) {
    let spawned = std::thread::Builder::new()
        .name("linehunt-signal".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!("Ctrl-C handling unavailable: {}", e);
                    return;
                }
            };

            let outcome = runtime.block_on(handle_interrupts(tokio::signal::ctrl_c, handle));
            if outcome == Interrupts::Forced {
                std::process::exit(EXIT_CANCELLED);
            }
        });

    if let Err(e) = spawned {
        tracing::warn!("Failed to start signal thread: {}", e);
    }
}

/// First interrupt requests a graceful shutdown, the second gives up
async fn handle_interrupts<F, Fut>(mut next_interrupt: F, handle: ShutdownHandle) -> Interrupts
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        return Interrupts::Unavailable;
    }
    eprintln!("Interrupted, finishing up... (press Ctrl-C again to exit now)");
    handle.request_shutdown();

    match next_interrupt().await {
        Ok(()) => {
            eprintln!("Interrupted again, exiting");
            Interrupts::Forced
        }
        Err(e) => {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            Interrupts::Unavailable
        }
    }
}
