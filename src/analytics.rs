//! Log-level analytics
//!
//! Summaries that sit beside the two headline scores: an hour-of-day profile,
//! peak and low energy hours, sustained High Load (flow) sessions, a cognitive
//! load index over the last hour of the log, work-life balance for the last
//! logged day, an enrichment summary, and data quality flags.

use crate::config::PipelineConfig;
use crate::types::{
    Category, CategoryFeatures, DayPart, EventLog, QualityFlag, RollingFeatures,
    TemporalFeatures,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Logs shorter than this raise `QualityFlag::ShortLog`
const SHORT_LOG_SECS: f64 = 3600.0;

/// Trailing span used for the cognitive load index
const COGNITIVE_LOAD_WINDOW_SECS: i64 = 3600;

/// Hours reported at each end of the energy ranking
const ENERGY_HOURS_REPORTED: usize = 2;

/// Logged hours per day considered balanced, inclusive
const BALANCED_DAY_HOURS: (f64, f64) = (6.0, 9.0);

/// Target logged hours per day
const TARGET_DAY_HOURS: f64 = 8.0;

/// Category mix and switching rate for one hour of the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyProfile {
    pub hour: u32,
    pub rows: usize,
    pub high_load_pct: f64,
    pub communication_pct: f64,
    pub low_load_pct: f64,
    pub mean_switching_rate: f64,
}

/// Maximal run of consecutive High Load rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSession {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub rows: usize,
    pub duration_secs: u64,
}

/// Coarse band of the cognitive load index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadStatus {
    Low,
    Moderate,
    High,
}

/// Cognitive load over the trailing hour of the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveLoad {
    /// Index in [0, 10]
    pub index: f64,
    pub status: LoadStatus,
    /// Rows inside the trailing window
    pub window_rows: usize,
}

/// Hours of the day ranked by High Load share
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyHours {
    /// Highest High Load share first
    pub peak_hours: Vec<u32>,
    /// Tail of the ranking, lowest last
    pub low_hours: Vec<u32>,
}

/// Day classification against the balanced range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceStatus {
    Balanced,
    Overworking,
    Underworking,
}

/// Work-life balance of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLifeBalance {
    pub day: NaiveDate,
    pub total_hours: f64,
    /// High Load hours
    pub work_hours: f64,
    /// Low Load hours
    pub break_hours: f64,
    pub target_hours: f64,
    /// break / total × 10, capped at 10
    pub balance_score: f64,
    pub status: BalanceStatus,
    pub excess_hours: f64,
}

/// Headline numbers of an enrichment run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentSummary {
    pub total_rows: usize,
    pub total_hours: f64,
    pub distinct_titles: usize,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    /// Percentage of rows per day part
    pub day_part_distribution: BTreeMap<DayPart, f64>,
}

/// All supplementary analytics of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogAnalytics {
    pub summary: EnrichmentSummary,
    pub hourly_profile: Vec<HourlyProfile>,
    pub energy_hours: EnergyHours,
    pub flow_sessions: Vec<FlowSession>,
    pub total_flow_secs: u64,
    pub cognitive_load: CognitiveLoad,
    /// Last logged day; absent for an empty log
    pub work_life_balance: Option<WorkLifeBalance>,
}

/// Log analyzer
pub struct LogAnalyzer;

impl LogAnalyzer {
    /// Compute analytics from row-aligned stage outputs
    pub fn analyze(
        log: &EventLog,
        temporal: &[TemporalFeatures],
        rolling: &[RollingFeatures],
        categories: &[CategoryFeatures],
        config: &PipelineConfig,
    ) -> LogAnalytics {
        let interval = config.sampling_interval_secs;
        let flow_sessions = flow_sessions(log, categories, interval, config.flow_min_rows());
        let total_flow_secs = flow_sessions.iter().map(|f| f.duration_secs).sum();
        let hourly_profile = hourly_profile(temporal, rolling, categories);

        LogAnalytics {
            summary: summarize(log, temporal, interval),
            energy_hours: energy_hours(&hourly_profile),
            hourly_profile,
            flow_sessions,
            total_flow_secs,
            cognitive_load: cognitive_load(log, categories),
            work_life_balance: work_life_balance(log, categories, interval),
        }
    }
}

fn summarize(log: &EventLog, temporal: &[TemporalFeatures], interval_secs: u32) -> EnrichmentSummary {
    let distinct_titles = log.titles().collect::<HashSet<_>>().len();

    let mut day_parts: BTreeMap<DayPart, usize> = BTreeMap::new();
    for t in temporal {
        *day_parts.entry(t.day_part).or_insert(0) += 1;
    }
    let day_part_distribution = day_parts
        .into_iter()
        .map(|(part, count)| (part, percent(count, temporal.len())))
        .collect();

    EnrichmentSummary {
        total_rows: log.len(),
        total_hours: log.len() as f64 * interval_secs as f64 / 3600.0,
        distinct_titles,
        first_timestamp: log.events.first().map(|e| e.timestamp),
        last_timestamp: log.events.last().map(|e| e.timestamp),
        day_part_distribution,
    }
}

/// Per hour-of-day profile, ordered by hour, covering only hours with rows
pub fn hourly_profile(
    temporal: &[TemporalFeatures],
    rolling: &[RollingFeatures],
    categories: &[CategoryFeatures],
) -> Vec<HourlyProfile> {
    #[derive(Default)]
    struct Bucket {
        rows: usize,
        high: usize,
        comm: usize,
        low: usize,
        rate_sum: f64,
    }

    let mut buckets: BTreeMap<u32, Bucket> = BTreeMap::new();
    for ((t, r), c) in temporal.iter().zip(rolling).zip(categories) {
        let bucket = buckets.entry(t.hour_of_day).or_default();
        bucket.rows += 1;
        bucket.rate_sum += r.switching_rate_per_hour;
        match c.category {
            Category::HighLoad => bucket.high += 1,
            Category::Communication => bucket.comm += 1,
            Category::LowLoad => bucket.low += 1,
            Category::Unclassified => {}
        }
    }

    buckets
        .into_iter()
        .map(|(hour, b)| HourlyProfile {
            hour,
            rows: b.rows,
            high_load_pct: percent(b.high, b.rows),
            communication_pct: percent(b.comm, b.rows),
            low_load_pct: percent(b.low, b.rows),
            mean_switching_rate: b.rate_sum / b.rows as f64,
        })
        .collect()
}

/// Rank profiled hours by High Load share; ties keep hour order
pub fn energy_hours(profile: &[HourlyProfile]) -> EnergyHours {
    let mut ranked: Vec<&HourlyProfile> = profile.iter().collect();
    ranked.sort_by(|a, b| b.high_load_pct.total_cmp(&a.high_load_pct));

    let peak_hours = ranked
        .iter()
        .take(ENERGY_HOURS_REPORTED)
        .map(|p| p.hour)
        .collect();
    let low_hours = ranked[ranked.len().saturating_sub(ENERGY_HOURS_REPORTED)..]
        .iter()
        .map(|p| p.hour)
        .collect();

    EnergyHours {
        peak_hours,
        low_hours,
    }
}

/// Maximal High Load runs spanning at least `min_rows` rows
pub fn flow_sessions(
    log: &EventLog,
    categories: &[CategoryFeatures],
    interval_secs: u32,
    min_rows: usize,
) -> Vec<FlowSession> {
    let mut sessions = Vec::new();
    let mut run_start: Option<usize> = None;

    // Sentinel step past the end closes a trailing run
    for i in 0..=categories.len() {
        let high_load = categories
            .get(i)
            .is_some_and(|c| c.category == Category::HighLoad);

        match (high_load, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                let rows = i - start;
                if rows >= min_rows {
                    if let (Some(first), Some(last)) = (log.events.get(start), log.events.get(i - 1)) {
                        sessions.push(FlowSession {
                            start: first.timestamp,
                            end: last.timestamp,
                            rows,
                            duration_secs: rows as u64 * interval_secs as u64,
                        });
                    }
                }
                run_start = None;
            }
            _ => {}
        }
    }

    sessions
}

/// Cognitive load index over the hour ending at the last event.
///
/// `10·high + 4·communication − 2·low` over category fractions, clamped to
/// [0, 10].
pub fn cognitive_load(log: &EventLog, categories: &[CategoryFeatures]) -> CognitiveLoad {
    let Some(last) = log.events.last() else {
        return CognitiveLoad {
            index: 0.0,
            status: LoadStatus::Low,
            window_rows: 0,
        };
    };
    let window_start = last.timestamp - Duration::seconds(COGNITIVE_LOAD_WINDOW_SECS);

    let (mut rows, mut high, mut comm, mut low) = (0usize, 0usize, 0usize, 0usize);
    for (event, c) in log.events.iter().zip(categories) {
        if event.timestamp < window_start || event.timestamp > last.timestamp {
            continue;
        }
        rows += 1;
        match c.category {
            Category::HighLoad => high += 1,
            Category::Communication => comm += 1,
            Category::LowLoad => low += 1,
            Category::Unclassified => {}
        }
    }

    let index = if rows == 0 {
        0.0
    } else {
        let n = rows as f64;
        (10.0 * high as f64 / n + 4.0 * comm as f64 / n - 2.0 * low as f64 / n).clamp(0.0, 10.0)
    };

    CognitiveLoad {
        index,
        status: load_status(index),
        window_rows: rows,
    }
}

/// Work-life balance over the calendar day of the last event
pub fn work_life_balance(
    log: &EventLog,
    categories: &[CategoryFeatures],
    interval_secs: u32,
) -> Option<WorkLifeBalance> {
    let day = log.events.last()?.timestamp.date();

    let (mut rows, mut high, mut low) = (0usize, 0usize, 0usize);
    for (event, c) in log.events.iter().zip(categories) {
        if event.timestamp.date() != day {
            continue;
        }
        rows += 1;
        match c.category {
            Category::HighLoad => high += 1,
            Category::LowLoad => low += 1,
            _ => {}
        }
    }

    let hours = |count: usize| count as f64 * interval_secs as f64 / 3600.0;
    let total_hours = hours(rows);
    let break_hours = hours(low);
    let balance_score = if total_hours > 0.0 {
        (break_hours / total_hours * 10.0).min(10.0)
    } else {
        0.0
    };

    Some(WorkLifeBalance {
        day,
        total_hours,
        work_hours: hours(high),
        break_hours,
        target_hours: TARGET_DAY_HOURS,
        balance_score,
        status: balance_status(total_hours),
        excess_hours: (total_hours - TARGET_DAY_HOURS).max(0.0),
    })
}

fn balance_status(total_hours: f64) -> BalanceStatus {
    let (low, high) = BALANCED_DAY_HOURS;
    if total_hours > high {
        BalanceStatus::Overworking
    } else if total_hours >= low {
        BalanceStatus::Balanced
    } else {
        BalanceStatus::Underworking
    }
}

fn load_status(index: f64) -> LoadStatus {
    if index > 7.0 {
        LoadStatus::High
    } else if index > 4.0 {
        LoadStatus::Moderate
    } else {
        LoadStatus::Low
    }
}

/// Data quality flags for a run, in a fixed order
pub fn quality_flags(
    log: &EventLog,
    config: &PipelineConfig,
    dropped_rows: usize,
    unclassified_titles: usize,
) -> Vec<QualityFlag> {
    let mut flags = Vec::new();

    if log.is_empty() {
        flags.push(QualityFlag::EmptyLog);
    } else if (log.len() as f64 * config.sampling_interval_secs as f64) < SHORT_LOG_SECS {
        flags.push(QualityFlag::ShortLog);
    }

    let max_gap_ms =
        (config.sampling_interval_secs as f64 * config.gap_tolerance_factor * 1000.0) as i64;
    let mut non_monotonic = false;
    let mut gaps = false;
    for pair in log.events.windows(2) {
        let delta = (pair[1].timestamp - pair[0].timestamp).num_milliseconds();
        non_monotonic |= delta < 0;
        gaps |= delta > max_gap_ms;
    }
    if non_monotonic {
        flags.push(QualityFlag::NonMonotonicTimestamps);
    }
    if gaps {
        flags.push(QualityFlag::SamplingGaps);
    }
    if unclassified_titles > 0 {
        flags.push(QualityFlag::UnclassifiedTitles);
    }
    if dropped_rows > 0 {
        flags.push(QualityFlag::DroppedRows);
    }

    for flag in &flags {
        log::warn!("data quality: {flag:?}");
    }
    flags
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}
