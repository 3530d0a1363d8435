//! Pipeline configuration
//!
//! A `PipelineConfig` is built explicitly (or loaded from JSON) and handed to
//! the pipeline entry point. Nothing here is global, so independent runs can
//! use different settings side by side.

use crate::error::PipelineError;
use crate::types::FqsDenominator;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Nominal seconds between two samples of the window logger
pub const DEFAULT_SAMPLING_INTERVAL_SECS: u32 = 5;

/// Rows considered by the distinct-title window
pub const DEFAULT_UNIQUE_WINDOW_ROWS: usize = 10;

/// Trailing span for switch counting (15 minutes)
pub const DEFAULT_SWITCH_WINDOW_SECS: u32 = 900;

/// Minimum High Load run counted as a flow session (5 minutes)
pub const DEFAULT_FLOW_MIN_SECS: u32 = 300;

/// Configuration for a single pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seconds represented by one event
    pub sampling_interval_secs: u32,
    /// K: rows in the distinct-title window
    pub unique_window_rows: usize,
    /// T: trailing time span for switch counting
    pub switch_window_secs: u32,
    /// FQS denominator policy, fixed for the whole run
    pub fqs_denominator: FqsDenominator,
    /// Minimum duration of a flow session
    pub flow_min_secs: u32,
    /// A gap larger than `factor * interval` raises a sampling-gap flag
    pub gap_tolerance_factor: f64,
    /// Retry policy for the category oracle
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampling_interval_secs: DEFAULT_SAMPLING_INTERVAL_SECS,
            unique_window_rows: DEFAULT_UNIQUE_WINDOW_ROWS,
            switch_window_secs: DEFAULT_SWITCH_WINDOW_SECS,
            fqs_denominator: FqsDenominator::default(),
            flow_min_secs: DEFAULT_FLOW_MIN_SECS,
            gap_tolerance_factor: 2.0,
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.sampling_interval_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "sampling_interval_secs must be positive".to_string(),
            ));
        }
        if self.unique_window_rows == 0 {
            return Err(PipelineError::InvalidConfig(
                "unique_window_rows must be at least 1".to_string(),
            ));
        }
        if self.switch_window_secs < self.sampling_interval_secs {
            return Err(PipelineError::InvalidConfig(format!(
                "switch_window_secs ({}) must cover at least one sampling interval ({})",
                self.switch_window_secs, self.sampling_interval_secs
            )));
        }
        if !(self.gap_tolerance_factor.is_finite() && self.gap_tolerance_factor >= 1.0) {
            return Err(PipelineError::InvalidConfig(
                "gap_tolerance_factor must be a finite value >= 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(PipelineError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// W: rows covered by the switch-counting window
    pub fn switch_window_rows(&self) -> usize {
        (self.switch_window_secs / self.sampling_interval_secs).max(1) as usize
    }

    /// Nominal length of the switch-counting window in minutes
    pub fn switch_window_minutes(&self) -> f64 {
        (self.switch_window_rows() as f64 * self.sampling_interval_secs as f64) / 60.0
    }

    /// Rows a flow session must span
    pub fn flow_min_rows(&self) -> usize {
        (self.flow_min_secs / self.sampling_interval_secs).max(1) as usize
    }
}

/// Bounded exponential backoff for oracle lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy that retries without sleeping
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay before a given attempt (0-indexed). The first attempt never waits.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let mult = self.backoff_multiplier.max(1.0);
        let delay = self.initial_delay_ms as f64 * mult.powi((attempt - 1) as i32);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }
}
