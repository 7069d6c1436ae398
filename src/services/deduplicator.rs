//! Duplicate detection within one import job
//!
//! Keys are normalized emails. `first_occurrence` is a single atomic
//! check-and-set so identical records arriving from parallel batch workers
//! can never both pass as non-duplicate.

use std::collections::HashSet;

use parking_lot::Mutex;

/// Concurrent set of identifying keys seen by one job.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: Mutex<HashSet<String>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with keys already imported in earlier jobs, so re-imports are
    /// classified duplicates from row one.
    pub fn with_known_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            seen: Mutex::new(keys.into_iter().map(|k| normalize_key(&k)).collect()),
        }
    }

    /// Atomic check-and-set: true exactly once per key, first caller wins.
    pub fn first_occurrence(&self, key: &str) -> bool {
        self.seen.lock().insert(normalize_key(key))
    }

    /// Number of distinct keys recorded so far.
    pub fn distinct_keys(&self) -> usize {
        self.seen.lock().len()
    }
}

/// Normalized form of the identifying field: trimmed and lower-cased.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_occurrence_wins() {
        let dedup = Deduplicator::new();
        assert!(dedup.first_occurrence("jan@firma.cz"));
        assert!(!dedup.first_occurrence("jan@firma.cz"));
    }

    #[test]
    fn test_normalization_folds_case_and_whitespace() {
        let dedup = Deduplicator::new();
        assert!(dedup.first_occurrence("Jan@Firma.CZ"));
        assert!(!dedup.first_occurrence("  jan@firma.cz  "));
        assert_eq!(dedup.distinct_keys(), 1);
    }

    #[test]
    fn test_known_keys_are_duplicates_from_the_start() {
        let dedup = Deduplicator::with_known_keys(vec!["Existing@Firma.cz".to_string()]);
        assert!(!dedup.first_occurrence("existing@firma.cz"));
        assert!(dedup.first_occurrence("new@firma.cz"));
    }

    #[test]
    fn test_concurrent_check_and_set_admits_exactly_one() {
        let dedup = Arc::new(Deduplicator::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let dedup = Arc::clone(&dedup);
                std::thread::spawn(move || dedup.first_occurrence("same@firma.cz"))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
