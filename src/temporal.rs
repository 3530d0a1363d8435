//! Temporal feature derivation
//!
//! Calendar and time-of-day features computed from each row's timestamp.
//! Every feature except `is_first_in_hour` is row-local.

use crate::types::{DayPart, EventLog, TemporalFeatures};
use chrono::{NaiveDateTime, Timelike};

/// Hour at which evening work starts
const EVENING_START_HOUR: u32 = 18;

/// Hour before which work counts as early morning
const EARLY_MORNING_END_HOUR: u32 = 7;

/// Temporal feature deriver
pub struct TemporalFeatureDeriver;

impl TemporalFeatureDeriver {
    /// Derive temporal features for every row of the log
    pub fn derive(log: &EventLog, interval_secs: u32) -> Vec<TemporalFeatures> {
        let mut previous_hour: Option<u32> = None;

        log.events
            .iter()
            .enumerate()
            .map(|(i, event)| {
                let mut features = Self::derive_row(&event.timestamp);
                features.is_first_in_hour = previous_hour != Some(features.hour_of_day);
                features.cumulative_work_secs = i as u64 * interval_secs as u64;
                previous_hour = Some(features.hour_of_day);
                features
            })
            .collect()
    }

    /// Row-local features for a single timestamp
    pub fn derive_row(timestamp: &NaiveDateTime) -> TemporalFeatures {
        let hour = timestamp.hour();
        TemporalFeatures {
            hour_of_day: hour,
            day_of_week: timestamp.format("%A").to_string(),
            minute_of_day: hour * 60 + timestamp.minute(),
            is_evening: hour >= EVENING_START_HOUR,
            is_early_morning: hour < EARLY_MORNING_END_HOUR,
            day_part: day_part(hour),
            is_first_in_hour: false,
            cumulative_work_secs: 0,
        }
    }
}

/// Map an hour of day onto its bucket.
///
/// Buckets partition 0-23: Early_Morning [5,9), Morning [9,12),
/// Midday [12,14), Afternoon [14,17), Evening [17,20), Night otherwise.
pub fn day_part(hour: u32) -> DayPart {
    match hour {
        5..=8 => DayPart::EarlyMorning,
        9..=11 => DayPart::Morning,
        12..=13 => DayPart::Midday,
        14..=16 => DayPart::Afternoon,
        17..=19 => DayPart::Evening,
        _ => DayPart::Night,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_day_part_partitions_all_hours() {
        let expected = [
            (0, DayPart::Night),
            (4, DayPart::Night),
            (5, DayPart::EarlyMorning),
            (8, DayPart::EarlyMorning),
            (9, DayPart::Morning),
            (11, DayPart::Morning),
            (12, DayPart::Midday),
            (13, DayPart::Midday),
            (14, DayPart::Afternoon),
            (16, DayPart::Afternoon),
            (17, DayPart::Evening),
            (19, DayPart::Evening),
            (20, DayPart::Night),
            (23, DayPart::Night),
        ];
        for (hour, part) in expected {
            assert_eq!(day_part(hour), part, "hour {hour}");
        }

        let night_hours = (0..24).filter(|h| day_part(*h) == DayPart::Night).count();
        assert_eq!(night_hours, 9);
    }

    #[test]
    fn test_derive_row() {
        // 2024-01-15 is a Monday
        let features = TemporalFeatureDeriver::derive_row(&at(15, 18, 42));
        assert_eq!(features.hour_of_day, 18);
        assert_eq!(features.day_of_week, "Monday");
        assert_eq!(features.minute_of_day, 18 * 60 + 42);
        assert!(features.is_evening);
        assert!(!features.is_early_morning);
        assert_eq!(features.day_part, DayPart::Evening);
    }

    #[test]
    fn test_evening_and_early_morning_boundaries() {
        let six_fifty = TemporalFeatureDeriver::derive_row(&at(16, 6, 59));
        assert!(six_fifty.is_early_morning);
        assert_eq!(six_fifty.day_of_week, "Tuesday");

        let seven = TemporalFeatureDeriver::derive_row(&at(16, 7, 0));
        assert!(!seven.is_early_morning);

        let five_pm = TemporalFeatureDeriver::derive_row(&at(16, 17, 59));
        assert!(!five_pm.is_evening);
        assert_eq!(TemporalFeatureDeriver::derive_row(&at(16, 23, 59)).minute_of_day, 1439);
    }

    #[test]
    fn test_first_in_hour_and_cumulative_time() {
        let log = EventLog::new(vec![
            Event::new(at(15, 9, 59), "a"),
            Event::new(at(15, 9, 59), "a"),
            Event::new(at(15, 10, 0), "b"),
            Event::new(at(15, 10, 0), "b"),
        ]);
        let features = TemporalFeatureDeriver::derive(&log, 5);

        let first: Vec<bool> = features.iter().map(|f| f.is_first_in_hour).collect();
        assert_eq!(first, vec![true, false, true, false]);

        let cumulative: Vec<u64> = features.iter().map(|f| f.cumulative_work_secs).collect();
        assert_eq!(cumulative, vec![0, 5, 10, 15]);
    }
}
