//! Session segmentation
//!
//! A session is a maximal run of consecutive events with the same window
//! title. Segmentation is two-pass: a forward scan assigns session ids and
//! running positions, then each session's maximum position is broadcast back
//! to all of its rows.

use crate::types::{EventLog, SessionFeatures};

/// Sessions longer than this multiple of the mean are extended
const EXTENDED_SESSION_FACTOR: f64 = 2.0;

/// Sessions shorter than this multiple of the mean are brief
const BRIEF_SESSION_FACTOR: f64 = 0.5;

/// Session segmenter
pub struct SessionSegmenter;

impl SessionSegmenter {
    /// Compute session features for every row of the log
    pub fn segment(log: &EventLog, interval_secs: u32) -> Vec<SessionFeatures> {
        let interval = interval_secs as u64;

        // Pass 1: session ids and running counts
        let mut assignments: Vec<(u32, u32)> = Vec::with_capacity(log.len());
        let mut session_lengths: Vec<u32> = Vec::new();
        let mut previous: Option<&str> = None;

        for title in log.titles() {
            // Row 0 compares against itself, so it opens session 1 without a branch
            let changed = previous.map_or(true, |prev| prev != title);
            if changed {
                session_lengths.push(0);
            }
            let session_idx = session_lengths.len() - 1;
            session_lengths[session_idx] += 1;
            assignments.push((session_lengths.len() as u32, session_lengths[session_idx]));
            previous = Some(title);
        }

        // Pass 2: broadcast whole-session lengths
        let lengths: Vec<u32> = assignments
            .iter()
            .map(|(id, _)| session_lengths[(*id - 1) as usize])
            .collect();
        let totals: Vec<u64> = lengths.iter().map(|&len| len as u64 * interval).collect();

        let mean_total = mean_u64(&totals);

        assignments
            .into_iter()
            .zip(lengths.into_iter().zip(totals))
            .map(|((session_id, count), (session_length, total_duration_secs))| {
                let length_vs_average = if mean_total > 0.0 {
                    total_duration_secs as f64 / mean_total
                } else {
                    0.0
                };
                SessionFeatures {
                    session_id,
                    consecutive_count: count,
                    position_secs: count as u64 * interval,
                    seconds_since_last_switch: (count as u64 - 1) * interval,
                    session_length,
                    total_duration_secs,
                    length_vs_average,
                    is_extended: mean_total > 0.0
                        && total_duration_secs as f64 > mean_total * EXTENDED_SESSION_FACTOR,
                    is_brief: mean_total > 0.0
                        && (total_duration_secs as f64) < mean_total * BRIEF_SESSION_FACTOR,
                }
            })
            .collect()
    }

    /// Number of distinct sessions in segmented output
    pub fn session_count(features: &[SessionFeatures]) -> u32 {
        features.last().map_or(0, |f| f.session_id)
    }
}

fn mean_u64(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}
