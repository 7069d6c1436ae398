//! Persistence collaborator
//!
//! Downstream subscriber storage is out of scope for the pipeline; it only
//! needs a yes/no answer per record. Sink failures are recorded on the
//! record's `ImportResult` and never fail the job.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::{DuplicateHandling, ImportOptions};

/// One record handed to the sink: the identifying email plus the mapped
/// canonical fields from the source row.
#[derive(Debug, Clone)]
pub struct SubscriberRecord {
    pub row_number: u64,
    pub email: String,
    pub fields: HashMap<String, String>,
    /// True when this record is a duplicate being routed under an
    /// `update`/`replace` policy rather than a fresh insert.
    pub is_duplicate: bool,
}

/// Downstream persistence capability.
#[async_trait]
pub trait SubscriberSink: Send + Sync {
    /// Persist one record; returns whether it actually landed. `group_ids`
    /// and `segment_ids` ride along inside `options`, untouched.
    async fn persist(&self, record: &SubscriberRecord, options: &ImportOptions) -> Result<bool>;

    /// Identifying keys already persisted by earlier imports. Seeded into
    /// the duplicate detector at job start, so a re-imported address is
    /// classified a duplicate from row one.
    async fn known_identifiers(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// In-memory sink: inserts new emails, honors the duplicate policy.
#[derive(Default)]
pub struct MemorySink {
    subscribers: Mutex<HashMap<String, SubscriberRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn contains(&self, email: &str) -> bool {
        self.subscribers.lock().contains_key(&email.to_lowercase())
    }
}

#[async_trait]
impl SubscriberSink for MemorySink {
    async fn persist(&self, record: &SubscriberRecord, options: &ImportOptions) -> Result<bool> {
        let key = record.email.to_lowercase();
        let mut subscribers = self.subscribers.lock();
        if record.is_duplicate {
            return Ok(match options.duplicate_handling {
                DuplicateHandling::Skip => false,
                DuplicateHandling::Update | DuplicateHandling::Replace => {
                    subscribers.insert(key, record.clone());
                    true
                }
            });
        }
        subscribers.insert(key, record.clone());
        Ok(true)
    }

    async fn known_identifiers(&self) -> Result<Vec<String>> {
        Ok(self.subscribers.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(email: &str, is_duplicate: bool) -> SubscriberRecord {
        SubscriberRecord {
            row_number: 1,
            email: email.to_string(),
            fields: HashMap::new(),
            is_duplicate,
        }
    }

    #[tokio::test]
    async fn test_memory_sink_inserts_new_record() {
        let sink = MemorySink::new();
        let options = ImportOptions::with_email_column("Email");
        let imported = sink.persist(&record("jan@firma.cz", false), &options).await.unwrap();
        assert!(imported);
        assert!(sink.contains("jan@firma.cz"));
    }

    #[tokio::test]
    async fn test_memory_sink_skips_duplicate_under_skip_policy() {
        let sink = MemorySink::new();
        let options = ImportOptions::with_email_column("Email");
        let imported = sink.persist(&record("jan@firma.cz", true), &options).await.unwrap();
        assert!(!imported);
        assert_eq!(sink.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_memory_sink_reports_known_identifiers() {
        let sink = MemorySink::new();
        let options = ImportOptions::with_email_column("Email");
        sink.persist(&record("Jan@Firma.cz", false), &options).await.unwrap();

        let keys = sink.known_identifiers().await.unwrap();
        assert_eq!(keys, vec!["jan@firma.cz"]);
    }

    #[tokio::test]
    async fn test_memory_sink_updates_duplicate_under_update_policy() {
        let sink = MemorySink::new();
        let mut options = ImportOptions::with_email_column("Email");
        options.duplicate_handling = DuplicateHandling::Update;
        let imported = sink.persist(&record("jan@firma.cz", true), &options).await.unwrap();
        assert!(imported);
        assert_eq!(sink.subscriber_count(), 1);
    }
}
