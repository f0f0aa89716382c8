use anyhow::Result;
use linehunt_core::{ResultSink, ScanReport, Tally};
use std::io::{self, Write};

use crate::OutputFormat;

/// Prints results to stdout in the selected format
///
/// Plain output is written as soon as the workers aggregate; the JSON and
/// pretty formats need the full report and are written by `finish`.
pub struct ConsoleSink {
    format: OutputFormat,
    show_workers: bool,
}

impl ConsoleSink {
    pub fn new(format: OutputFormat, show_workers: bool) -> Self {
        Self {
            format,
            show_workers,
        }
    }

    pub fn finish(&self, report: &ScanReport) -> Result<()> {
        let output = match self.format {
            OutputFormat::Plain => {
                if report.cancelled {
                    eprintln!(
                        "Cancelled after {} lines; counts are partial",
                        report.tally.consumed()
                    );
                }
                return Ok(());
            }
            OutputFormat::Json => report.format_json(),
            OutputFormat::Pretty => report.format_pretty(self.show_workers),
        };

        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", output.trim_end())?;
        stdout.flush()?;
        Ok(())
    }
}

impl ResultSink for ConsoleSink {
    fn report(&self, tally: &Tally) {
        if self.format != OutputFormat::Plain {
            return;
        }

        let output = tally.format_plain(self.show_workers);
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout.write_all(output.as_bytes()).and_then(|()| stdout.flush()) {
            tracing::warn!("Failed to write results: {}", e);
        }
    }

    fn source_failed(&self, error: &io::Error) {
        eprintln!("linehunt: read error: {}", error);
    }
}
