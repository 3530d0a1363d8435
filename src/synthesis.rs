//! Score synthesis
//!
//! Combines the log-level scores with session and temporal pattern statistics
//! into a bounded composite risk indicator in [0, 10].

use crate::session::SessionSegmenter;
use crate::types::{
    RiskAssessment, RiskComponents, RiskLevel, RollingFeatures, Scores, SessionFeatures,
    SessionPatternStats, TemporalFeatures,
};

/// Component weights, in field order of `RiskComponents`
const FOCUS_DEFICIT_WEIGHT: f64 = 0.25;
const SWITCH_COST_WEIGHT: f64 = 0.20;
const SWITCHING_INTENSITY_WEIGHT: f64 = 0.20;
const FRAGMENTATION_WEIGHT: f64 = 0.15;
const CIRCADIAN_WEIGHT: f64 = 0.15;
const OVERWORK_WEIGHT: f64 = 0.05;

/// Switching rate (per hour) that saturates the switching-intensity component
const SATURATING_SWITCH_RATE: f64 = 100.0;

/// Upper bound of every component and of the composite
const MAX_RISK: f64 = 10.0;

/// Score synthesizer
pub struct ScoreSynthesizer;

impl ScoreSynthesizer {
    /// Summarize per-row session, temporal and rolling features.
    ///
    /// All three slices are row-aligned with the event log.
    pub fn pattern_stats(
        sessions: &[SessionFeatures],
        temporal: &[TemporalFeatures],
        rolling: &[RollingFeatures],
    ) -> SessionPatternStats {
        let n = sessions.len();
        if n == 0 {
            return SessionPatternStats::default();
        }

        let session_count = SessionSegmenter::session_count(sessions);
        let avg_session_secs =
            sessions.iter().map(|s| s.total_duration_secs as f64).sum::<f64>() / n as f64;

        let brief_rows = sessions.iter().filter(|s| s.is_brief).count();
        let extended_rows = sessions.iter().filter(|s| s.is_extended).count();
        let evening_rows = temporal.iter().filter(|t| t.is_evening).count();
        let early_rows = temporal.iter().filter(|t| t.is_early_morning).count();

        let (rate_sum, peak_rate, max_switches, unique_sum) = rolling.iter().fold(
            (0.0, 0.0_f64, 0_u32, 0.0),
            |(sum, peak, max, uniq), r| {
                (
                    sum + r.switching_rate_per_hour,
                    peak.max(r.switching_rate_per_hour),
                    max.max(r.switches_last_t),
                    uniq + r.unique_titles_last_k as f64,
                )
            },
        );

        SessionPatternStats {
            session_count,
            avg_session_secs,
            brief_session_pct: percent(brief_rows, n),
            extended_session_pct: percent(extended_rows, n),
            evening_pct: percent(evening_rows, temporal.len()),
            early_morning_pct: percent(early_rows, temporal.len()),
            mean_switching_rate: mean(rate_sum, rolling.len()),
            peak_switching_rate: peak_rate,
            max_switches_last_t: max_switches,
            mean_unique_titles: mean(unique_sum, rolling.len()),
            total_title_switches: session_count.saturating_sub(1),
        }
    }

    /// Combine scores and pattern statistics into a composite risk
    pub fn assess(scores: &Scores, stats: &SessionPatternStats, row_count: usize) -> RiskAssessment {
        let components = RiskComponents {
            focus_deficit: if row_count == 0 {
                0.0
            } else {
                bounded((100.0 - scores.fqs) / 10.0)
            },
            // CSC / 3600 is the mean multiplier per row; the worst pair costs 5
            switch_cost: bounded(2.0 * scores.csc / 3600.0),
            switching_intensity: bounded(
                stats.peak_switching_rate / SATURATING_SWITCH_RATE * MAX_RISK,
            ),
            fragmentation: bounded(stats.brief_session_pct / 10.0),
            circadian: bounded((stats.evening_pct + stats.early_morning_pct) / 10.0),
            overwork: bounded(stats.extended_session_pct / 10.0),
        };

        let score = bounded(composite(&components));
        let level = risk_level(score);

        log::debug!("risk components: {components:?}");

        RiskAssessment {
            score,
            level,
            components,
        }
    }
}

/// Weighted sum of risk components
fn composite(c: &RiskComponents) -> f64 {
    FOCUS_DEFICIT_WEIGHT * c.focus_deficit
        + SWITCH_COST_WEIGHT * c.switch_cost
        + SWITCHING_INTENSITY_WEIGHT * c.switching_intensity
        + FRAGMENTATION_WEIGHT * c.fragmentation
        + CIRCADIAN_WEIGHT * c.circadian
        + OVERWORK_WEIGHT * c.overwork
}

/// Map a composite score onto the ordered risk levels
pub fn risk_level(score: f64) -> RiskLevel {
    if score < 3.0 {
        RiskLevel::Healthy
    } else if score < 5.0 {
        RiskLevel::Moderate
    } else if score < 7.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

fn bounded(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, MAX_RISK)
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rolling::RollingWindowAnalyzer;
    use crate::temporal::TemporalFeatureDeriver;
    use crate::types::{Event, EventLog, FqsDenominator};
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;

    fn make_test_log(hour: u32, titles: &[&str]) -> EventLog {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        EventLog::new(
            titles
                .iter()
                .enumerate()
                .map(|(i, t)| Event::new(start + Duration::seconds(5 * i as i64), *t))
                .collect(),
        )
    }

    fn make_test_stats(log: &EventLog) -> SessionPatternStats {
        let sessions = SessionSegmenter::segment(log, 5);
        let temporal = TemporalFeatureDeriver::derive(log, 5);
        let rolling = RollingWindowAnalyzer::new(10, 180, 5).analyze(log);
        ScoreSynthesizer::pattern_stats(&sessions, &temporal, &rolling)
    }

    fn make_test_scores(fqs: f64, csc: f64) -> Scores {
        Scores {
            fqs,
            csc,
            ..Scores::empty(FqsDenominator::Productive)
        }
    }

    #[test]
    fn test_pattern_stats() {
        let log = make_test_log(19, &["A", "A", "B", "A"]);
        let stats = make_test_stats(&log);

        assert_eq!(stats.session_count, 3);
        assert_eq!(stats.total_title_switches, 2);
        assert_eq!(stats.max_switches_last_t, 2);
        assert_eq!(stats.evening_pct, 100.0);
        assert_eq!(stats.early_morning_pct, 0.0);
        // Totals per row: 10, 10, 5, 5
        assert!((stats.avg_session_secs - 7.5).abs() < 1e-9);
        // Peak rate: 2 switches in a 15 minute window
        assert!((stats.peak_switching_rate - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_log_is_healthy_zero() {
        let stats = ScoreSynthesizer::pattern_stats(&[], &[], &[]);
        assert_eq!(stats, SessionPatternStats::default());

        let risk = ScoreSynthesizer::assess(&Scores::empty(FqsDenominator::Productive), &stats, 0);
        assert_eq!(risk.score, 0.0);
        assert_eq!(risk.level, RiskLevel::Healthy);
    }

    #[test]
    fn test_components_bounded() {
        let stats = SessionPatternStats {
            brief_session_pct: 100.0,
            extended_session_pct: 100.0,
            evening_pct: 100.0,
            early_morning_pct: 100.0,
            peak_switching_rate: 10_000.0,
            ..Default::default()
        };
        let risk = ScoreSynthesizer::assess(&make_test_scores(0.0, 1.0e9), &stats, 100);

        let c = &risk.components;
        for value in [
            c.focus_deficit,
            c.switch_cost,
            c.switching_intensity,
            c.fragmentation,
            c.circadian,
            c.overwork,
        ] {
            assert!((0.0..=10.0).contains(&value));
        }
        assert!((risk.score - 10.0).abs() < 1e-9);
        assert_eq!(risk.level, RiskLevel::Critical);
    }

    #[test]
    fn test_focused_daytime_log_is_healthy() {
        // One hour of a single High Load title during the morning
        let titles = vec!["editor"; 720];
        let log = make_test_log(10, &titles);
        let stats = make_test_stats(&log);
        // Every same-category row costs 1x, so CSC = 3600 per hour
        let risk = ScoreSynthesizer::assess(&make_test_scores(100.0, 3600.0), &stats, log.len());

        assert_eq!(risk.components.focus_deficit, 0.0);
        assert!((risk.components.switch_cost - 2.0).abs() < 1e-9);
        assert_eq!(risk.components.switching_intensity, 0.0);
        assert_eq!(risk.components.circadian, 0.0);
        assert!((risk.score - 0.4).abs() < 1e-9);
        assert_eq!(risk.level, RiskLevel::Healthy);
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(risk_level(0.0), RiskLevel::Healthy);
        assert_eq!(risk_level(2.99), RiskLevel::Healthy);
        assert_eq!(risk_level(3.0), RiskLevel::Moderate);
        assert_eq!(risk_level(5.0), RiskLevel::High);
        assert_eq!(risk_level(7.0), RiskLevel::Critical);
        assert_eq!(risk_level(10.0), RiskLevel::Critical);
    }

    #[test]
    fn test_lower_fqs_raises_risk() {
        let stats = SessionPatternStats::default();
        let focused = ScoreSynthesizer::assess(&make_test_scores(90.0, 0.0), &stats, 10);
        let scattered = ScoreSynthesizer::assess(&make_test_scores(10.0, 0.0), &stats, 10);
        assert!(scattered.score > focused.score);
    }
}
