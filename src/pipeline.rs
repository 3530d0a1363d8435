//! Pipeline orchestration
//!
//! This module provides the public API for focus-signal.
//! It runs the full pipeline from a raw window-focus log to the enriched
//! table, the log-level scores and the composite risk.

use crate::adapter::{load_event_log, AdapterStats, InputFormat};
use crate::analytics::{quality_flags, LogAnalytics, LogAnalyzer};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::oracle::{CategoryOracle, LabelCache, LabelResolver, ResolverStats};
use crate::reducer::CategoryReducer;
use crate::rolling::RollingWindowAnalyzer;
use crate::session::SessionSegmenter;
use crate::synthesis::ScoreSynthesizer;
use crate::temporal::TemporalFeatureDeriver;
use crate::types::{
    CategoryFeatures, EnrichedRow, EventLog, QualityFlag, RiskAssessment, RollingFeatures, Scores,
    SessionFeatures, SessionPatternStats, TemporalFeatures,
};
use std::path::Path;

/// Everything one run produces
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Configuration the run used
    pub config: PipelineConfig,
    /// One row per retained event, in input order
    pub rows: Vec<EnrichedRow>,
    pub scores: Scores,
    pub risk: RiskAssessment,
    pub session_stats: SessionPatternStats,
    pub analytics: LogAnalytics,
    pub quality_flags: Vec<QualityFlag>,
    pub adapter_stats: AdapterStats,
    pub resolver_stats: ResolverStats,
    /// Titles whose label lookup failed permanently
    pub unclassified_titles: Vec<String>,
}

/// Analyze a log file in one shot with a fresh label cache.
///
/// # Example
/// ```ignore
/// let output = analyze_file(
///     Path::new("window_log.csv"),
///     InputFormat::Csv,
///     &oracle,
///     PipelineConfig::default(),
/// )?;
/// println!("FQS {:.1}", output.scores.fqs);
/// ```
pub fn analyze_file(
    path: &Path,
    format: InputFormat,
    oracle: &dyn CategoryOracle,
    config: PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    FocusPipeline::new(config)?.run_file(path, format, oracle)
}

/// Stateful pipeline that keeps resolved labels between runs.
///
/// Reusing one pipeline (or reloading its saved labels) means each title is
/// sent to the oracle at most once, and re-runs over the same log produce
/// identical tables.
pub struct FocusPipeline {
    config: PipelineConfig,
    labels: LabelCache,
}

impl FocusPipeline {
    /// Create a pipeline with a validated configuration
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            labels: LabelCache::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Seed the label cache from JSON
    pub fn load_labels(&mut self, json: &str) -> Result<(), PipelineError> {
        self.labels = LabelCache::from_json(json)?;
        Ok(())
    }

    /// Save the label cache to JSON
    pub fn save_labels(&self) -> Result<String, PipelineError> {
        self.labels.to_json()
    }

    pub fn labels(&self) -> &LabelCache {
        &self.labels
    }

    /// Load a log from disk and run it
    pub fn run_file(
        &mut self,
        path: &Path,
        format: InputFormat,
        oracle: &dyn CategoryOracle,
    ) -> Result<PipelineOutput, PipelineError> {
        let (log, adapter_stats) = load_event_log(path, format)?;
        Ok(self.run_with_stats(&log, oracle, adapter_stats))
    }

    /// Run an in-memory log
    pub fn run(&mut self, log: &EventLog, oracle: &dyn CategoryOracle) -> PipelineOutput {
        let adapter_stats = AdapterStats {
            total_rows: log.len(),
            retained_rows: log.len(),
            ..Default::default()
        };
        self.run_with_stats(log, oracle, adapter_stats)
    }

    /// Run an already-parsed log, carrying its adapter row accounting.
    ///
    /// Pipeline stages:
    /// 1. Session, temporal and rolling features (label-independent)
    /// 2. LabelResolver - one oracle lookup per distinct title
    /// 3. CategoryReducer - per-row switch costs, FQS and CSC
    /// 4. ScoreSynthesizer - pattern statistics and composite risk
    /// 5. LogAnalyzer - supplementary analytics and quality flags
    pub fn run_with_stats(
        &mut self,
        log: &EventLog,
        oracle: &dyn CategoryOracle,
        adapter_stats: AdapterStats,
    ) -> PipelineOutput {
        let config = &self.config;
        let interval = config.sampling_interval_secs;
        log::info!("enriching {} events", log.len());

        // Stage 1: Derive label-independent features
        let sessions = SessionSegmenter::segment(log, interval);
        let temporal = TemporalFeatureDeriver::derive(log, interval);
        let rolling = RollingWindowAnalyzer::new(
            config.unique_window_rows,
            config.switch_window_rows(),
            interval,
        )
        .analyze(log);

        // Stage 2: Resolve categories
        let mut resolver = LabelResolver::with_cache(
            oracle,
            config.retry.clone(),
            std::mem::take(&mut self.labels),
        );
        let labels = resolver.resolve_log(log);
        let resolver_stats = resolver.stats().clone();
        let unclassified_titles: Vec<String> = resolver.fallback_titles().iter().cloned().collect();
        self.labels = resolver.labels_to_persist();

        // Stage 3: Reduce categories into scores
        let categories = CategoryReducer::derive_row_features(&labels, interval);
        let scores = CategoryReducer::reduce(&categories, interval, config.fqs_denominator);

        // Stage 4: Synthesize risk
        let session_stats = ScoreSynthesizer::pattern_stats(&sessions, &temporal, &rolling);
        let risk = ScoreSynthesizer::assess(&scores, &session_stats, log.len());

        // Stage 5: Analytics and data quality
        let analytics = LogAnalyzer::analyze(log, &temporal, &rolling, &categories, config);
        let quality_flags = quality_flags(
            log,
            config,
            adapter_stats.dropped_rows(),
            unclassified_titles.len(),
        );

        log::info!(
            "FQS {:.1} ({:?}), CSC {:.1}/h, risk {:.2} ({:?})",
            scores.fqs,
            scores.fqs_denominator,
            scores.csc,
            risk.score,
            risk.level
        );

        let rows = assemble_rows(
            log,
            &sessions,
            &temporal,
            &rolling,
            categories,
            &scores,
            risk.score,
        );

        PipelineOutput {
            config: config.clone(),
            rows,
            scores,
            risk,
            session_stats,
            analytics,
            quality_flags,
            adapter_stats,
            resolver_stats,
            unclassified_titles,
        }
    }
}

/// Join row-aligned stage outputs into enriched rows with broadcast scores
fn assemble_rows(
    log: &EventLog,
    sessions: &[SessionFeatures],
    temporal: &[TemporalFeatures],
    rolling: &[RollingFeatures],
    categories: Vec<CategoryFeatures>,
    scores: &Scores,
    risk_score: f64,
) -> Vec<EnrichedRow> {
    log.events
        .iter()
        .zip(sessions)
        .zip(temporal)
        .zip(rolling)
        .zip(categories)
        .map(|((((event, s), t), r), c)| EnrichedRow {
            timestamp: event.timestamp,
            window_title: event.window_title.clone(),
            hour_of_day: t.hour_of_day,
            day_of_week: t.day_of_week.clone(),
            minute_of_day: t.minute_of_day,
            is_evening: t.is_evening,
            is_early_morning: t.is_early_morning,
            time_bucket: t.day_part,
            is_first_in_hour: t.is_first_in_hour,
            cumulative_work_seconds: t.cumulative_work_secs,
            session_id: s.session_id,
            consecutive_window_count: s.consecutive_count,
            session_duration_seconds: s.position_secs,
            seconds_since_last_switch: s.seconds_since_last_switch,
            session_length: s.session_length,
            total_session_duration_seconds: s.total_duration_secs,
            session_length_vs_average: s.length_vs_average,
            is_extended_session: s.is_extended,
            is_brief_session: s.is_brief,
            unique_titles_last_k: r.unique_titles_last_k,
            switches_last_t: r.switches_last_t,
            switching_rate_per_hour: r.switching_rate_per_hour,
            category: c.category,
            confidence_reason: c.rationale,
            previous_category: c.previous_category,
            category_switch: c.category_switch,
            switch_cost: c.switch_cost,
            fqs_score: scores.fqs,
            csc_score: scores.csc,
            risk_score,
        })
        .collect()
}
