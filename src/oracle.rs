//! Category oracle boundary
//!
//! Labelling a window title is delegated to an external `CategoryOracle`.
//! The `LabelResolver` calls it at most once per distinct title per run,
//! retries transient failures with bounded exponential backoff, and falls
//! back to `Category::Unclassified` when a title cannot be labelled. Results
//! live in a write-once `LabelCache` that can be persisted between runs.

use crate::config::RetryPolicy;
use crate::error::{OracleError, PipelineError};
use crate::types::{Category, Classification, EventLog};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::thread;

/// External labelling function: window title to category
pub trait CategoryOracle {
    fn classify(&self, title: &str) -> Result<Classification, OracleError>;
}

impl<F> CategoryOracle for F
where
    F: Fn(&str) -> Result<Classification, OracleError>,
{
    fn classify(&self, title: &str) -> Result<Classification, OracleError> {
        self(title)
    }
}

/// Oracle backed by a fixed title-to-category table
#[derive(Debug, Clone, Default)]
pub struct StaticLabelOracle {
    labels: HashMap<String, Classification>,
}

/// Accepted shapes for a label file entry
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelEntry {
    Full(Classification),
    Bare(String),
}

impl StaticLabelOracle {
    pub fn new(labels: HashMap<String, Classification>) -> Self {
        Self { labels }
    }

    /// Load a JSON object mapping titles to either a category string or a
    /// `{ "category": ..., "rationale": ... }` object.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let raw: HashMap<String, LabelEntry> = serde_json::from_str(json)?;
        let mut labels = HashMap::with_capacity(raw.len());

        for (title, entry) in raw {
            let classification = match entry {
                LabelEntry::Full(c) => c,
                LabelEntry::Bare(name) => {
                    let category = name.parse::<Category>().map_err(|e| {
                        PipelineError::ParseError(format!("label for '{title}': {e}"))
                    })?;
                    Classification::new(category, "static label")
                }
            };
            labels.insert(title, classification);
        }

        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl CategoryOracle for StaticLabelOracle {
    fn classify(&self, title: &str) -> Result<Classification, OracleError> {
        self.labels
            .get(title)
            .cloned()
            .ok_or_else(|| OracleError::Rejected(format!("no label for '{title}'")))
    }
}

/// Write-once title-to-classification cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelCache {
    labels: BTreeMap<String, Classification>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, title: &str) -> Option<&Classification> {
        self.labels.get(title)
    }

    /// Insert a label unless the title already has one.
    ///
    /// Returns the entry that is now authoritative for the title.
    pub fn insert_once(&mut self, title: &str, classification: Classification) -> &Classification {
        self.labels
            .entry(title.to_string())
            .or_insert(classification)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Classification)> {
        self.labels.iter()
    }

    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Counters for one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverStats {
    /// Distinct titles in the log
    pub distinct_titles: usize,
    /// Titles answered from the cache
    pub cache_hits: usize,
    /// Oracle invocations, retries included
    pub oracle_calls: usize,
    /// Retries after a transient failure
    pub retries: usize,
    /// Titles that fell back to Unclassified
    pub fallbacks: usize,
}

/// Resolves categories for a log through an oracle and a label cache
pub struct LabelResolver<'a> {
    oracle: &'a dyn CategoryOracle,
    policy: RetryPolicy,
    cache: LabelCache,
    fallback_titles: BTreeSet<String>,
    stats: ResolverStats,
}

impl<'a> LabelResolver<'a> {
    pub fn new(oracle: &'a dyn CategoryOracle, policy: RetryPolicy) -> Self {
        Self::with_cache(oracle, policy, LabelCache::new())
    }

    /// Start from previously resolved labels
    pub fn with_cache(oracle: &'a dyn CategoryOracle, policy: RetryPolicy, cache: LabelCache) -> Self {
        Self {
            oracle,
            policy,
            cache,
            fallback_titles: BTreeSet::new(),
            stats: ResolverStats::default(),
        }
    }

    /// Resolve every distinct title once and broadcast labels to all rows
    pub fn resolve_log(&mut self, log: &EventLog) -> Vec<Classification> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for title in log.titles() {
            if seen.insert(title) {
                self.resolve_title(title);
            }
        }
        self.stats.distinct_titles = seen.len();

        log.titles()
            .map(|title| {
                self.cache
                    .get(title)
                    .cloned()
                    .unwrap_or_else(|| fallback("title missing from cache"))
            })
            .collect()
    }

    /// Resolve one title, consulting the cache first
    pub fn resolve_title(&mut self, title: &str) -> Classification {
        if let Some(cached) = self.cache.get(title) {
            self.stats.cache_hits += 1;
            return cached.clone();
        }

        let classification = match self.call_with_retry(title) {
            Ok(c) => {
                log::debug!("labelled '{}' as {}", title, c.category);
                c
            }
            Err(e) => {
                log::warn!("falling back to Unclassified for '{}': {}", title, e);
                self.stats.fallbacks += 1;
                self.fallback_titles.insert(title.to_string());
                fallback(&e.to_string())
            }
        };

        self.cache.insert_once(title, classification).clone()
    }

    fn call_with_retry(&mut self, title: &str) -> Result<Classification, OracleError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_err = OracleError::Transient("no attempt made".to_string());

        for attempt in 0..attempts {
            let delay = self.policy.delay_for_attempt(attempt);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            if attempt > 0 {
                self.stats.retries += 1;
            }

            self.stats.oracle_calls += 1;
            match self.oracle.classify(title) {
                Ok(c) => return Ok(c),
                Err(e) if e.is_transient() => {
                    log::debug!(
                        "attempt {}/{} for '{}' failed: {}",
                        attempt + 1,
                        attempts,
                        title,
                        e
                    );
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err)
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    pub fn cache(&self) -> &LabelCache {
        &self.cache
    }

    /// Titles that fell back to Unclassified during this run
    pub fn fallback_titles(&self) -> &BTreeSet<String> {
        &self.fallback_titles
    }

    /// Cache contents worth keeping for the next run (fallbacks excluded, so
    /// failed titles are retried later)
    pub fn labels_to_persist(&self) -> LabelCache {
        LabelCache {
            labels: self
                .cache
                .iter()
                .filter(|(title, _)| !self.fallback_titles.contains(*title))
                .map(|(title, c)| (title.clone(), c.clone()))
                .collect(),
        }
    }
}

fn fallback(reason: &str) -> Classification {
    Classification::new(Category::Unclassified, format!("unclassified: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

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

    /// Oracle that records calls and fails a scripted number of times per title
    struct ScriptedOracle {
        failures_before_success: HashMap<&'static str, usize>,
        calls: RefCell<HashMap<String, usize>>,
    }

    impl ScriptedOracle {
        fn new(failures: &[(&'static str, usize)]) -> Self {
            Self {
                failures_before_success: failures.iter().copied().collect(),
                calls: RefCell::new(HashMap::new()),
            }
        }

        fn calls_for(&self, title: &str) -> usize {
            self.calls.borrow().get(title).copied().unwrap_or(0)
        }
    }

    impl CategoryOracle for ScriptedOracle {
        fn classify(&self, title: &str) -> Result<Classification, OracleError> {
            let mut calls = self.calls.borrow_mut();
            let n = calls.entry(title.to_string()).or_insert(0);
            *n += 1;

            let failures = self.failures_before_success.get(title).copied().unwrap_or(0);
            if *n <= failures {
                return Err(OracleError::Transient("rate limited".to_string()));
            }
            let category = if title.contains("Code") {
                Category::HighLoad
            } else {
                Category::Communication
            };
            Ok(Classification::new(category, "scripted"))
        }
    }

    #[test]
    fn test_oracle_called_once_per_distinct_title() {
        let oracle = ScriptedOracle::new(&[]);
        let mut resolver = LabelResolver::new(&oracle, RetryPolicy::immediate(3));

        let log = make_test_log(&["VS Code", "VS Code", "Slack", "VS Code", "Slack"]);
        let labels = resolver.resolve_log(&log);

        let categories: Vec<Category> = labels.iter().map(|c| c.category).collect();
        assert_eq!(
            categories,
            vec![
                Category::HighLoad,
                Category::HighLoad,
                Category::Communication,
                Category::HighLoad,
                Category::Communication,
            ]
        );
        assert_eq!(oracle.calls_for("VS Code"), 1);
        assert_eq!(oracle.calls_for("Slack"), 1);
        assert_eq!(resolver.stats().distinct_titles, 2);
        assert_eq!(resolver.stats().oracle_calls, 2);
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let oracle = ScriptedOracle::new(&[("VS Code", 2)]);
        let mut resolver = LabelResolver::new(&oracle, RetryPolicy::immediate(3));

        let c = resolver.resolve_title("VS Code");
        assert_eq!(c.category, Category::HighLoad);
        assert_eq!(oracle.calls_for("VS Code"), 3);
        assert_eq!(resolver.stats().retries, 2);
        assert_eq!(resolver.stats().fallbacks, 0);
    }

    #[test]
    fn test_exhausted_retries_fall_back_to_unclassified() {
        let oracle = ScriptedOracle::new(&[("Slack", 10)]);
        let mut resolver = LabelResolver::new(&oracle, RetryPolicy::immediate(4));

        let log = make_test_log(&["Slack", "VS Code", "Slack"]);
        let labels = resolver.resolve_log(&log);

        assert_eq!(labels[0].category, Category::Unclassified);
        assert_eq!(labels[2].category, Category::Unclassified);
        assert_eq!(labels[1].category, Category::HighLoad);
        assert_eq!(oracle.calls_for("Slack"), 4);
        assert_eq!(resolver.stats().fallbacks, 1);
        assert!(resolver.fallback_titles().contains("Slack"));

        // Failed titles are not persisted
        let persisted = resolver.labels_to_persist();
        assert_eq!(persisted.len(), 1);
        assert!(persisted.get("Slack").is_none());
    }

    #[test]
    fn test_rejection_is_not_retried() {
        let oracle = |_: &str| -> Result<Classification, OracleError> {
            Err(OracleError::Rejected("policy".to_string()))
        };
        let mut resolver = LabelResolver::new(&oracle, RetryPolicy::immediate(5));

        let c = resolver.resolve_title("anything");
        assert_eq!(c.category, Category::Unclassified);
        assert_eq!(resolver.stats().oracle_calls, 1);
        assert_eq!(resolver.stats().retries, 0);
    }

    #[test]
    fn test_cached_labels_skip_oracle() {
        let mut cache = LabelCache::new();
        cache.insert_once("VS Code", Classification::new(Category::LowLoad, "from disk"));

        let oracle = ScriptedOracle::new(&[]);
        let mut resolver =
            LabelResolver::with_cache(&oracle, RetryPolicy::immediate(3), cache);
        let labels = resolver.resolve_log(&make_test_log(&["VS Code", "VS Code"]));

        assert_eq!(labels[0].category, Category::LowLoad);
        assert_eq!(oracle.calls_for("VS Code"), 0);
        assert_eq!(resolver.stats().cache_hits, 1);
    }

    #[test]
    fn test_cache_is_write_once() {
        let mut cache = LabelCache::new();
        cache.insert_once("a", Classification::new(Category::HighLoad, "first"));
        let kept = cache
            .insert_once("a", Classification::new(Category::LowLoad, "second"))
            .clone();
        assert_eq!(kept.category, Category::HighLoad);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_label_cache_json() {
        let mut cache = LabelCache::new();
        cache.insert_once("Slack", Classification::new(Category::Communication, "chat"));
        let json = cache.to_json().unwrap();
        assert!(json.contains("\"Communication\""));

        let restored = LabelCache::from_json(&json).unwrap();
        assert_eq!(restored, cache);
    }

    #[test]
    fn test_static_oracle_from_json() {
        let oracle = StaticLabelOracle::from_json(
            r#"{
                "main.rs - VS Code": "High Load",
                "Slack": { "category": "Communication", "rationale": "team chat" },
                "YouTube": "low load"
            }"#,
        )
        .unwrap();

        assert_eq!(oracle.len(), 3);
        assert_eq!(
            oracle.classify("main.rs - VS Code").unwrap().category,
            Category::HighLoad
        );
        assert_eq!(oracle.classify("Slack").unwrap().rationale, "team chat");
        assert_eq!(oracle.classify("YouTube").unwrap().category, Category::LowLoad);
        assert!(matches!(
            oracle.classify("Unknown"),
            Err(OracleError::Rejected(_))
        ));

        assert!(StaticLabelOracle::from_json(r#"{ "x": "Gaming" }"#).is_err());
    }
}
