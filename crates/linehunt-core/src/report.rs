use std::io;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One worker's contribution to a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerTally {
    /// Worker index, fixed at launch
    pub index: usize,
    /// Lines that matched the search term
    pub matched: u64,
    /// Lines taken off the queue
    pub consumed: u64,
    /// The worker hit an error and its counts were discarded
    pub failed: bool,
}

/// Aggregate computed once, after every worker has finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Sum of matches over all workers
    pub total: u64,
    /// Per-worker counts, ordered by index
    pub workers: Vec<WorkerTally>,
}

impl Tally {
    /// Lines consumed by all workers together
    pub fn consumed(&self) -> u64 {
        self.workers.iter().map(|w| w.consumed).sum()
    }

    pub fn failed_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.failed).count()
    }

    /// Format as plain text: the total, optionally followed by one line
    /// per worker (grep -c style)
    pub fn format_plain(&self, show_workers: bool) -> String {
        let mut output = format!("{}\n", self.total);

        if show_workers {
            for worker in &self.workers {
                output.push_str(&format!(
                    "worker {}: {}{}\n",
                    worker.index,
                    worker.matched,
                    if worker.failed { " (failed)" } else { "" }
                ));
            }
        }

        output
    }
}

/// Receives the results of a scan
///
/// `report` is called exactly once per completed run, from the
/// aggregating worker's thread.
pub trait ResultSink: Send + Sync {
    fn report(&self, tally: &Tally);

    /// Called at most once, when the line source failed mid-stream
    fn source_failed(&self, error: &io::Error) {
        tracing::warn!("Line source failed, results are partial: {}", error);
    }
}

/// Logs the aggregate through `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl ResultSink for TracingSink {
    fn report(&self, tally: &Tally) {
        tracing::info!("Total matches: {}", tally.total);
        for worker in &tally.workers {
            tracing::info!(
                "Worker {}: {} matches in {} lines{}",
                worker.index,
                worker.matched,
                worker.consumed,
                if worker.failed { " (failed)" } else { "" }
            );
        }
    }
}

/// Keeps every tally and source error it receives
#[derive(Debug, Default)]
pub struct CollectSink {
    tallies: Mutex<Vec<Tally>>,
    errors: Mutex<Vec<String>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tallies(&self) -> Vec<Tally> {
        self.tallies.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl ResultSink for CollectSink {
    fn report(&self, tally: &Tally) {
        self.tallies.lock().push(tally.clone());
    }

    fn source_failed(&self, error: &io::Error) {
        self.errors.lock().push(error.to_string());
    }
}

/// Everything known about a finished scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// The aggregate handed to the sink
    pub tally: Tally,
    /// Lines read from the source
    pub lines_read: u64,
    /// Lines queued for the workers
    pub produced: u64,
    /// The run was cut short by a shutdown request
    pub cancelled: bool,
    /// Mid-stream read error, if any
    pub source_error: Option<String>,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn total(&self) -> u64 {
        self.tally.total
    }

    pub fn format_plain(&self, show_workers: bool) -> String {
        self.tally.format_plain(show_workers)
    }

    /// Format as JSON
    pub fn format_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format for human-readable output
    pub fn format_pretty(&self, show_workers: bool) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Found {} matching lines in {} lines ({:.1}ms)\n",
            self.tally.total, self.produced, self.elapsed_ms as f64
        ));
        output.push_str(&"─".repeat(50));
        output.push('\n');

        if show_workers {
            for worker in &self.tally.workers {
                let status = if worker.failed { "failed" } else { "ok" };
                output.push_str(&format!(
                    "  worker {:>3}  {:>10} matches  {:>10} lines  {}\n",
                    worker.index, worker.matched, worker.consumed, status
                ));
            }
        }

        if self.cancelled {
            output.push_str("\nScan cancelled; counts cover the lines processed before shutdown.\n");
        }
        if let Some(error) = &self.source_error {
            output.push_str(&format!("\nInput error: {}\n", error));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ScanReport {
        ScanReport {
            tally: Tally {
                total: 3,
                workers: vec![
                    WorkerTally { index: 0, matched: 1, consumed: 4, failed: false },
                    WorkerTally { index: 1, matched: 2, consumed: 3, failed: false },
                    WorkerTally { index: 2, matched: 0, consumed: 0, failed: true },
                ],
            },
            lines_read: 8,
            produced: 7,
            cancelled: false,
            source_error: None,
            elapsed_ms: 12,
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_tally_helpers() {
        let report = report();
        assert_eq!(report.total(), 3);
        assert_eq!(report.tally.consumed(), 7);
        assert_eq!(report.tally.failed_workers(), 1);
    }

    #[test]
    fn test_format_plain() {
        let report = report();
        assert_eq!(report.format_plain(false), "3\n");

        let output = report.format_plain(true);
        assert!(output.starts_with("3\n"));
        assert!(output.contains("worker 1: 2\n"));
        assert!(output.contains("worker 2: 0 (failed)\n"));
    }

    #[test]
    fn test_format_json() {
        let json: serde_json::Value = serde_json::from_str(&report().format_json()).unwrap();
        assert_eq!(json["tally"]["total"], 3);
        assert_eq!(json["tally"]["workers"].as_array().unwrap().len(), 3);
        assert_eq!(json["cancelled"], false);
    }

    #[test]
    fn test_format_pretty_mentions_partial_results() {
        let mut report = report();
        report.cancelled = true;
        report.source_error = Some("unexpected EOF".to_string());

        let output = report.format_pretty(true);
        assert!(output.contains("Found 3 matching lines"));
        assert!(output.contains("cancelled"));
        assert!(output.contains("Input error: unexpected EOF"));
    }

    #[test]
    fn test_collect_sink() {
        let sink = CollectSink::new();
        sink.report(&report().tally);
        sink.source_failed(&io::Error::new(io::ErrorKind::Other, "gone"));

        assert_eq!(sink.tallies().len(), 1);
        assert_eq!(sink.errors(), vec!["gone".to_string()]);
    }
}
