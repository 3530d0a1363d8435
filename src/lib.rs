//! focus-signal - Behavioral focus signals from window-focus logs
//!
//! Turns a flat log of (timestamp, window title) samples into a session-aware,
//! temporally-aware enriched table through a deterministic pipeline:
//! adaptation → session segmentation → temporal features → rolling windows
//! → category reduction → score synthesis → encoding.
//!
//! ## Scores
//!
//! - **FQS** (Focus Quality Score, 0-100): share of productive time spent in
//!   High Load work
//! - **CSC** (Context Switch Cost, per hour): weighted cost of category
//!   transitions
//! - **Risk** (0-10): composite of both scores with session and time-of-day
//!   patterns
//!
//! Window titles are labelled by an external [`CategoryOracle`]; the pipeline
//! calls it once per distinct title and caches the answers.

pub mod adapter;
pub mod analytics;
pub mod config;
pub mod encoder;
pub mod error;
pub mod oracle;
pub mod pipeline;
pub mod reducer;
pub mod rolling;
pub mod session;
pub mod synthesis;
pub mod temporal;
pub mod types;

pub use adapter::{load_event_log, parse_event_bytes, parse_event_log, AdapterStats, InputFormat};
pub use config::{PipelineConfig, RetryPolicy};
pub use encoder::{FocusReport, OutputFormat, ReportEncoder};
pub use error::{OracleError, PipelineError};
pub use oracle::{CategoryOracle, LabelCache, StaticLabelOracle};
pub use pipeline::{analyze_file, FocusPipeline, PipelineOutput};
pub use types::{Category, Classification, EnrichedRow, Event, EventLog, RiskLevel, Scores};

/// Crate version embedded in every run report
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for run reports
pub const PRODUCER_NAME: &str = "focus-signal";
