//! Business logic services

pub mod cancellation;
pub mod decoder;
pub mod deduplicator;
pub mod import_processor;
pub mod job_store;
pub mod persistence;
pub mod progress;
pub mod report;
pub mod storage;
pub mod validator;
