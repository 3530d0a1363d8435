//! Rolling window analysis
//!
//! Backward-looking window statistics computed in a single left-to-right
//! pass. Both windows are inclusive of the current row and clipped to the
//! available history near the start of the log.

use crate::types::{EventLog, RollingFeatures};
use std::collections::{HashMap, VecDeque};

/// Sliding multiset of the last `capacity` titles
struct DistinctTitleWindow<'a> {
    capacity: usize,
    titles: VecDeque<&'a str>,
    counts: HashMap<&'a str, u32>,
}

impl<'a> DistinctTitleWindow<'a> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            titles: VecDeque::with_capacity(capacity + 1),
            counts: HashMap::new(),
        }
    }

    fn push(&mut self, title: &'a str) -> u32 {
        self.titles.push_back(title);
        *self.counts.entry(title).or_insert(0) += 1;

        if self.titles.len() > self.capacity {
            if let Some(evicted) = self.titles.pop_front() {
                if let Some(count) = self.counts.get_mut(evicted) {
                    *count -= 1;
                    if *count == 0 {
                        self.counts.remove(evicted);
                    }
                }
            }
        }

        self.counts.len() as u32
    }
}

/// Sliding count of title-change boundaries among the last `capacity` rows.
///
/// A boundary at row j is counted only while row j-1 is also inside the
/// window, so the window's first row never contributes.
struct SwitchCounter {
    capacity: usize,
    changes: VecDeque<bool>,
    count: u32,
}

impl SwitchCounter {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            changes: VecDeque::with_capacity(capacity + 1),
            count: 0,
        }
    }

    fn push(&mut self, changed: bool) -> u32 {
        if !self.changes.is_empty() && changed {
            self.count += 1;
        }
        self.changes.push_back(changed);

        if self.changes.len() > self.capacity {
            self.changes.pop_front();
            // The new front lost its predecessor
            if self.changes.front() == Some(&true) {
                self.count -= 1;
            }
        }

        self.count
    }
}

/// Rolling window analyzer
pub struct RollingWindowAnalyzer {
    /// K: rows in the distinct-title window
    unique_window_rows: usize,
    /// W: rows in the switch-counting window
    switch_window_rows: usize,
    /// W expressed in minutes
    switch_window_minutes: f64,
}

impl RollingWindowAnalyzer {
    pub fn new(unique_window_rows: usize, switch_window_rows: usize, interval_secs: u32) -> Self {
        let unique_window_rows = unique_window_rows.max(1);
        let switch_window_rows = switch_window_rows.max(1);
        Self {
            unique_window_rows,
            switch_window_rows,
            switch_window_minutes: switch_window_rows as f64 * interval_secs as f64 / 60.0,
        }
    }

    /// Compute rolling features for every row in O(n)
    pub fn analyze(&self, log: &EventLog) -> Vec<RollingFeatures> {
        let mut distinct = DistinctTitleWindow::new(self.unique_window_rows);
        let mut switches = SwitchCounter::new(self.switch_window_rows);
        let mut previous: Option<&str> = None;
        let mut out = Vec::with_capacity(log.len());

        for title in log.titles() {
            let changed = previous.is_some_and(|prev| prev != title);
            let unique_titles_last_k = distinct.push(title);
            let switches_last_t = switches.push(changed);

            out.push(RollingFeatures {
                unique_titles_last_k,
                switches_last_t,
                switching_rate_per_hour: self.rate_per_hour(switches_last_t),
            });
            previous = Some(title);
        }

        out
    }

    fn rate_per_hour(&self, switches: u32) -> f64 {
        if self.switch_window_minutes <= 0.0 {
            return 0.0;
        }
        (switches as f64 / self.switch_window_minutes) * 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn make_test_log(titles: &[&str]) -> EventLog {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        EventLog::new(
            titles
                .iter()
                .enumerate()
                .map(|(i, t)| Event::new(start + Duration::seconds(5 * i as i64), *t))
                .collect(),
        )
    }

    /// Quadratic reference implementation of the window semantics
    fn naive(titles: &[&str], k: usize, w: usize) -> Vec<(u32, u32)> {
        (0..titles.len())
            .map(|i| {
                let k_start = (i + 1).saturating_sub(k);
                let unique: HashSet<&str> = titles[k_start..=i].iter().copied().collect();

                let w_start = (i + 1).saturating_sub(w);
                let switches = (w_start + 1..=i)
                    .filter(|&j| titles[j] != titles[j - 1])
                    .count();
                (unique.len() as u32, switches as u32)
            })
            .collect()
    }

    #[test]
    fn test_first_row_window() {
        let analyzer = RollingWindowAnalyzer::new(10, 180, 5);
        let features = analyzer.analyze(&make_test_log(&["a"]));
        assert_eq!(features[0].unique_titles_last_k, 1);
        assert_eq!(features[0].switches_last_t, 0);
        assert_eq!(features[0].switching_rate_per_hour, 0.0);
    }

    #[test]
    fn test_matches_reference_implementation() {
        let titles = [
            "a", "b", "a", "a", "c", "d", "d", "a", "e", "f", "f", "g", "a", "b", "b", "b", "c",
            "h", "i", "j", "a", "a",
        ];
        for (k, w) in [(1, 1), (2, 3), (3, 5), (10, 180), (4, 2)] {
            let analyzer = RollingWindowAnalyzer::new(k, w, 5);
            let got: Vec<(u32, u32)> = analyzer
                .analyze(&make_test_log(&titles))
                .iter()
                .map(|f| (f.unique_titles_last_k, f.switches_last_t))
                .collect();
            assert_eq!(got, naive(&titles, k, w), "k={k} w={w}");
        }
    }

    #[test]
    fn test_unique_titles_bounded() {
        let titles: Vec<String> = (0..40).map(|i| format!("title-{i}")).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let analyzer = RollingWindowAnalyzer::new(10, 180, 5);

        for (i, f) in analyzer.analyze(&make_test_log(&refs)).iter().enumerate() {
            assert!(f.unique_titles_last_k as usize <= 10.min(i + 1));
        }
    }

    #[test]
    fn test_switching_rate_per_hour() {
        // W = 180 rows at 5s = 15 minutes; 3 switches -> 12 per hour
        let analyzer = RollingWindowAnalyzer::new(10, 180, 5);
        let features = analyzer.analyze(&make_test_log(&["a", "b", "a", "b"]));
        assert_eq!(features[3].switches_last_t, 3);
        assert!((features[3].switching_rate_per_hour - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_switch_window_slides() {
        // With W = 2 only the boundary between the last two rows is visible
        let analyzer = RollingWindowAnalyzer::new(10, 2, 5);
        let features = analyzer.analyze(&make_test_log(&["a", "b", "b", "c", "c"]));
        let switches: Vec<u32> = features.iter().map(|f| f.switches_last_t).collect();
        assert_eq!(switches, vec![0, 1, 0, 1, 0]);
    }
}
