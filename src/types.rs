//! Core data types
//!
//! This module defines the event log, the per-row derived features produced by
//! each enrichment stage, and the log-level scores and report structures that
//! downstream consumers read.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single window-focus sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Local wall-clock time of the sample
    pub timestamp: NaiveDateTime,
    /// Title of the focused window (never empty once in an `EventLog`)
    pub window_title: String,
}

impl Event {
    pub fn new(timestamp: NaiveDateTime, window_title: impl Into<String>) -> Self {
        Self {
            timestamp,
            window_title: window_title.into(),
        }
    }
}

/// Ordered, validated sequence of events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub events: Vec<Event>,
}

impl EventLog {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over window titles in log order
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.window_title.as_str())
    }
}

/// Cognitive-load category assigned to a window title
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "High Load")]
    HighLoad,
    #[serde(rename = "Communication")]
    Communication,
    #[serde(rename = "Low Load")]
    LowLoad,
    #[serde(rename = "Unclassified")]
    Unclassified,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::HighLoad,
        Category::Communication,
        Category::LowLoad,
        Category::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::HighLoad => "High Load",
            Category::Communication => "Communication",
            Category::LowLoad => "Low Load",
            Category::Unclassified => "Unclassified",
        }
    }

    /// Whether the category counts toward the productive FQS denominator
    pub fn is_productive(&self) -> bool {
        matches!(self, Category::HighLoad | Category::Communication)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Lenient parse: case, spacing and `_`/`-` separators are ignored, and any
    /// `UNCLASSIFIED_*` error bucket collapses into `Unclassified`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "highload" | "high" => Ok(Category::HighLoad),
            "communication" | "comm" => Ok(Category::Communication),
            "lowload" | "low" => Ok(Category::LowLoad),
            k if k.starts_with("unclassified") => Ok(Category::Unclassified),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

/// Oracle answer for a window title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    #[serde(default)]
    pub rationale: String,
}

impl Classification {
    pub fn new(category: Category, rationale: impl Into<String>) -> Self {
        Self {
            category,
            rationale: rationale.into(),
        }
    }
}

/// Day-part bucket derived from the hour of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayPart {
    #[serde(rename = "Early_Morning")]
    EarlyMorning,
    Morning,
    Midday,
    Afternoon,
    Evening,
    Night,
}

impl DayPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayPart::EarlyMorning => "Early_Morning",
            DayPart::Morning => "Morning",
            DayPart::Midday => "Midday",
            DayPart::Afternoon => "Afternoon",
            DayPart::Evening => "Evening",
            DayPart::Night => "Night",
        }
    }
}

/// Row-local calendar features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalFeatures {
    /// Hour of day (0-23)
    pub hour_of_day: u32,
    /// Full weekday name ("Monday")
    pub day_of_week: String,
    /// Minute of day (0-1439)
    pub minute_of_day: u32,
    /// Hour >= 18
    pub is_evening: bool,
    /// Hour < 7
    pub is_early_morning: bool,
    pub day_part: DayPart,
    /// Hour differs from the previous row (always true on row 0)
    pub is_first_in_hour: bool,
    /// Row index scaled by the sampling interval
    pub cumulative_work_secs: u64,
}

/// Session membership features for a single row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFeatures {
    /// 1-based ordinal of the session
    pub session_id: u32,
    /// 1-based position of the row within its session
    pub consecutive_count: u32,
    /// Seconds elapsed within the session including this row
    pub position_secs: u64,
    /// Seconds since the session started (excludes this row)
    pub seconds_since_last_switch: u64,
    /// Event count of the whole session, broadcast to every member row
    pub session_length: u32,
    /// Duration of the whole session, broadcast to every member row
    pub total_duration_secs: u64,
    /// Total duration relative to the row-weighted mean session duration
    pub length_vs_average: f64,
    /// Session longer than twice the mean
    pub is_extended: bool,
    /// Session shorter than half the mean
    pub is_brief: bool,
}

/// Backward-looking window statistics for a single row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingFeatures {
    /// Distinct titles among the last K rows (inclusive)
    pub unique_titles_last_k: u32,
    /// Title-change boundaries inside the trailing T-second window
    pub switches_last_t: u32,
    /// Switches normalised to a per-hour rate
    pub switching_rate_per_hour: f64,
}

/// Category-derived features for a single row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFeatures {
    pub category: Category,
    pub rationale: String,
    /// Category of the previous row (row 0 uses its own)
    pub previous_category: Category,
    /// Category differs from the previous row
    pub category_switch: bool,
    /// Cost multiplier times sampling interval
    pub switch_cost: f64,
}

/// Which rows form the FQS denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FqsDenominator {
    /// High Load and Communication rows only
    #[default]
    Productive,
    /// Every row in the log
    AllRows,
}

/// Log-level focus and switching scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// Focus Quality Score (0-100)
    pub fqs: f64,
    /// Context Switch Cost in cost-units per hour (>= 0)
    pub csc: f64,
    /// Denominator policy used for `fqs`
    pub fqs_denominator: FqsDenominator,
    /// Sum of per-row switch costs
    pub total_switch_cost: f64,
    /// Logged duration in hours
    pub total_duration_hours: f64,
    /// Rows whose category differs from the previous row
    pub category_switches: u32,
    /// Seconds attributed to each category
    pub category_seconds: BTreeMap<Category, u64>,
}

impl Scores {
    /// Scores for a log with no rows
    pub fn empty(fqs_denominator: FqsDenominator) -> Self {
        Self {
            fqs: 0.0,
            csc: 0.0,
            fqs_denominator,
            total_switch_cost: 0.0,
            total_duration_hours: 0.0,
            category_switches: 0,
            category_seconds: BTreeMap::new(),
        }
    }
}

/// Session and temporal pattern statistics feeding risk synthesis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPatternStats {
    pub session_count: u32,
    /// Row-weighted mean of total session duration (seconds)
    pub avg_session_secs: f64,
    /// Percentage of rows in brief sessions
    pub brief_session_pct: f64,
    /// Percentage of rows in extended sessions
    pub extended_session_pct: f64,
    /// Percentage of rows at or after 18:00
    pub evening_pct: f64,
    /// Percentage of rows before 07:00
    pub early_morning_pct: f64,
    pub mean_switching_rate: f64,
    pub peak_switching_rate: f64,
    pub max_switches_last_t: u32,
    pub mean_unique_titles: f64,
    /// Window-title changes across the whole log
    pub total_title_switches: u32,
}

/// Ordered risk levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Healthy,
    Moderate,
    High,
    Critical,
}

/// Individual risk components, each in [0, 10]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskComponents {
    pub focus_deficit: f64,
    pub switch_cost: f64,
    pub switching_intensity: f64,
    pub fragmentation: f64,
    pub circadian: f64,
    pub overwork: f64,
}

/// Composite risk indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Composite score in [0, 10]
    pub score: f64,
    pub level: RiskLevel,
    pub components: RiskComponents,
}

/// Data quality flags raised during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// No rows survived input validation
    EmptyLog,
    /// Less than one hour of logged time
    ShortLog,
    /// Some timestamps go backwards
    NonMonotonicTimestamps,
    /// Gaps larger than the sampling tolerance (sampler stalled)
    SamplingGaps,
    /// At least one title fell back to Unclassified
    UnclassifiedTitles,
    /// Malformed rows were dropped from the input
    DroppedRows,
}

/// One row of the enriched output table.
///
/// Column names are part of the downstream contract and must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "Window_Title")]
    pub window_title: String,
    #[serde(rename = "Hour_of_Day")]
    pub hour_of_day: u32,
    #[serde(rename = "Day_of_Week")]
    pub day_of_week: String,
    #[serde(rename = "Minute_of_Day")]
    pub minute_of_day: u32,
    #[serde(rename = "Is_Evening")]
    pub is_evening: bool,
    #[serde(rename = "Is_Early_Morning")]
    pub is_early_morning: bool,
    #[serde(rename = "Time_Bucket")]
    pub time_bucket: DayPart,
    #[serde(rename = "Is_First_in_Hour")]
    pub is_first_in_hour: bool,
    #[serde(rename = "Cumulative_Work_Seconds")]
    pub cumulative_work_seconds: u64,
    #[serde(rename = "Session_ID")]
    pub session_id: u32,
    #[serde(rename = "Consecutive_Window_Count")]
    pub consecutive_window_count: u32,
    #[serde(rename = "Session_Duration_Seconds")]
    pub session_duration_seconds: u64,
    #[serde(rename = "Seconds_Since_Last_Switch")]
    pub seconds_since_last_switch: u64,
    #[serde(rename = "Session_Length")]
    pub session_length: u32,
    #[serde(rename = "Total_Session_Duration_Seconds")]
    pub total_session_duration_seconds: u64,
    #[serde(rename = "Session_Length_vs_Average")]
    pub session_length_vs_average: f64,
    #[serde(rename = "Is_Extended_Session")]
    pub is_extended_session: bool,
    #[serde(rename = "Is_Brief_Session")]
    pub is_brief_session: bool,
    #[serde(rename = "Unique_Titles_Last_K")]
    pub unique_titles_last_k: u32,
    #[serde(rename = "Switches_Last_T")]
    pub switches_last_t: u32,
    #[serde(rename = "Switching_Rate_Per_Hour")]
    pub switching_rate_per_hour: f64,
    #[serde(rename = "Category")]
    pub category: Category,
    #[serde(rename = "Confidence_Reason")]
    pub confidence_reason: String,
    #[serde(rename = "Previous_Category")]
    pub previous_category: Category,
    #[serde(rename = "Category_Switch")]
    pub category_switch: bool,
    #[serde(rename = "Switch_Cost")]
    pub switch_cost: f64,
    #[serde(rename = "FQS_Score")]
    pub fqs_score: f64,
    #[serde(rename = "CSC_Score")]
    pub csc_score: f64,
    #[serde(rename = "Risk_Score")]
    pub risk_score: f64,
}

impl EnrichedRow {
    /// Column names in output order
    pub const COLUMNS: [&'static str; 30] = [
        "Timestamp",
        "Window_Title",
        "Hour_of_Day",
        "Day_of_Week",
        "Minute_of_Day",
        "Is_Evening",
        "Is_Early_Morning",
        "Time_Bucket",
        "Is_First_in_Hour",
        "Cumulative_Work_Seconds",
        "Session_ID",
        "Consecutive_Window_Count",
        "Session_Duration_Seconds",
        "Seconds_Since_Last_Switch",
        "Session_Length",
        "Total_Session_Duration_Seconds",
        "Session_Length_vs_Average",
        "Is_Extended_Session",
        "Is_Brief_Session",
        "Unique_Titles_Last_K",
        "Switches_Last_T",
        "Switching_Rate_Per_Hour",
        "Category",
        "Confidence_Reason",
        "Previous_Category",
        "Category_Switch",
        "Switch_Cost",
        "FQS_Score",
        "CSC_Score",
        "Risk_Score",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&Category::HighLoad).unwrap();
        assert_eq!(json, "\"High Load\"");

        let parsed: Category = serde_json::from_str("\"Low Load\"").unwrap();
        assert_eq!(parsed, Category::LowLoad);
    }

    #[test]
    fn test_category_lenient_parse() {
        assert_eq!("high load".parse::<Category>(), Ok(Category::HighLoad));
        assert_eq!("HIGH_LOAD".parse::<Category>(), Ok(Category::HighLoad));
        assert_eq!(" Communication ".parse::<Category>(), Ok(Category::Communication));
        assert_eq!("low-load".parse::<Category>(), Ok(Category::LowLoad));
        assert_eq!(
            "UNCLASSIFIED_API_FAIL".parse::<Category>(),
            Ok(Category::Unclassified)
        );
        assert!("gaming".parse::<Category>().is_err());
    }

    #[test]
    fn test_productive_set() {
        assert!(Category::HighLoad.is_productive());
        assert!(Category::Communication.is_productive());
        assert!(!Category::LowLoad.is_productive());
        assert!(!Category::Unclassified.is_productive());
    }

    #[test]
    fn test_day_part_serialization() {
        let json = serde_json::to_string(&DayPart::EarlyMorning).unwrap();
        assert_eq!(json, "\"Early_Morning\"");
        assert_eq!(DayPart::Night.as_str(), "Night");
    }

    #[test]
    fn test_fqs_denominator_serialization() {
        let json = serde_json::to_string(&FqsDenominator::AllRows).unwrap();
        assert_eq!(json, "\"all_rows\"");
        assert_eq!(FqsDenominator::default(), FqsDenominator::Productive);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Healthy < RiskLevel::Moderate);
        assert!(RiskLevel::Moderate < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }
}
