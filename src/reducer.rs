//! Category reduction
//!
//! Folds per-row categories into the two log-level scores:
//!
//! - **FQS** (Focus Quality Score): High Load rows as a percentage of the
//!   configured denominator.
//! - **CSC** (Context Switch Cost): weighted transition cost per logged hour.

use crate::types::{Category, CategoryFeatures, Classification, FqsDenominator, Scores};
use std::collections::BTreeMap;

/// Multiplier for a (previous, current) category transition.
///
/// Staying inside a category is cheap, crossing between High Load and
/// Communication is the most disruptive, and every pair not listed costs 1.
pub fn switch_multiplier(previous: Category, current: Category) -> f64 {
    use Category::*;

    match (previous, current) {
        (HighLoad, Communication) => 5.0,
        (Communication, HighLoad) => 4.0,
        (HighLoad, LowLoad) => 3.0,
        (LowLoad, HighLoad) => 3.0,
        (Communication, LowLoad) => 2.0,
        (LowLoad, Communication) => 2.0,
        (HighLoad, HighLoad) => 1.0,
        (Communication, Communication) => 1.0,
        (LowLoad, LowLoad) => 0.5,
        (Unclassified, Unclassified) => 5.0,
        _ => 1.0,
    }
}

/// Category reducer
pub struct CategoryReducer;

impl CategoryReducer {
    /// Attach previous-category and switch-cost features to each row
    pub fn derive_row_features(
        labels: &[Classification],
        interval_secs: u32,
    ) -> Vec<CategoryFeatures> {
        let interval = interval_secs as f64;
        let mut previous: Option<Category> = None;

        labels
            .iter()
            .map(|label| {
                let current = label.category;
                // Row 0 is seeded with its own category
                let previous_category = previous.unwrap_or(current);
                previous = Some(current);

                CategoryFeatures {
                    category: current,
                    rationale: label.rationale.clone(),
                    previous_category,
                    category_switch: previous_category != current,
                    switch_cost: switch_multiplier(previous_category, current) * interval,
                }
            })
            .collect()
    }

    /// Reduce row features into FQS and CSC
    pub fn reduce(
        rows: &[CategoryFeatures],
        interval_secs: u32,
        denominator: FqsDenominator,
    ) -> Scores {
        if rows.is_empty() {
            return Scores::empty(denominator);
        }

        let interval = interval_secs as u64;
        let mut category_seconds: BTreeMap<Category, u64> = BTreeMap::new();
        let mut total_switch_cost = 0.0;
        let mut category_switches = 0;

        for row in rows {
            *category_seconds.entry(row.category).or_insert(0) += interval;
            total_switch_cost += row.switch_cost;
            if row.category_switch {
                category_switches += 1;
            }
        }

        let high_load_rows = rows
            .iter()
            .filter(|r| r.category == Category::HighLoad)
            .count();
        let denominator_rows = match denominator {
            FqsDenominator::Productive => rows.iter().filter(|r| r.category.is_productive()).count(),
            FqsDenominator::AllRows => rows.len(),
        };

        let total_duration_hours = (rows.len() as u64 * interval) as f64 / 3600.0;

        Scores {
            fqs: compute_fqs(high_load_rows, denominator_rows),
            csc: compute_csc(total_switch_cost, total_duration_hours),
            fqs_denominator: denominator,
            total_switch_cost,
            total_duration_hours,
            category_switches,
            category_seconds,
        }
    }
}

/// High Load share of the denominator as a percentage; 0 when empty
fn compute_fqs(high_load_rows: usize, denominator_rows: usize) -> f64 {
    if denominator_rows == 0 {
        return 0.0;
    }
    (high_load_rows as f64 / denominator_rows as f64 * 100.0).clamp(0.0, 100.0)
}

/// Total switch cost per logged hour; 0 for a zero-length log
fn compute_csc(total_switch_cost: f64, total_duration_hours: f64) -> f64 {
    if total_duration_hours <= 0.0 {
        return 0.0;
    }
    (total_switch_cost / total_duration_hours).max(0.0)
}
