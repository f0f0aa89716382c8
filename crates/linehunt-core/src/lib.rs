//! linehunt-core - Core library for linehunt parallel line search
//!
//! This crate provides the producer/consumer pipeline behind linehunt:
//! - A bounded blocking queue with end-of-stream and cancellation
//! - A reader thread draining a line source into the queue
//! - A fixed pool of workers counting matching lines
//! - A one-shot rendezvous where worker 0 aggregates the counts
//! - Configuration management

pub mod cancel;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod predicate;
pub mod producer;
pub mod queue;
pub mod rendezvous;
pub mod report;
pub mod source;
pub mod worker;

pub use cancel::{CancelFlag, ShutdownHandle};
pub use config::{Config, ScanConfig};
pub use error::{LinehuntError, Result};
pub use pipeline::Scan;
pub use predicate::{Predicate, Substring};
pub use queue::{BoundedQueue, PushError};
pub use report::{CollectSink, ResultSink, ScanReport, Tally, TracingSink, WorkerTally};
pub use source::{LineSource, ReaderSource};
