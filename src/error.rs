//! Error taxonomy for the import pipeline.
//!
//! Configuration problems are surfaced before a job exists; everything that
//! happens after job creation is reported through the job's own status field,
//! never as an error the polling client sees directly.

use thiserror::Error;
use uuid::Uuid;

/// Fatal pre-processing errors. When one of these fires, no `ImportJob`
/// has been created.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The column mapping has no entry routing a source column to `email`.
    #[error("column mapping has no entry for the identifying field 'email'")]
    MissingIdentifierMapping,

    /// The file is empty or has no header row.
    #[error("file has no header row")]
    EmptyFile,

    /// The header row contains none of the columns mapped to `email`.
    #[error("header row has no column mapped to 'email'")]
    MissingIdentifierColumn,

    /// Validation threshold outside 0-100.
    #[error("validation threshold must be between 0 and 100, got {0}")]
    InvalidThreshold(u8),

    /// Batch size of zero would stall the pipeline.
    #[error("batch size must be a positive integer")]
    InvalidBatchSize,

    /// The file reference could not be opened or read.
    #[error("cannot read import file: {0}")]
    UnreadableFile(String),
}

/// Errors returned by the `ImportService` API surface.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("import job {0} not found")]
    JobNotFound(Uuid),

    /// Caller tried to cancel a job owned by somebody else.
    #[error("caller does not own import job {0}")]
    NotOwner(Uuid),

    /// Report requested while the job is still running.
    #[error("import job {0} has not finished; report not available yet")]
    JobNotFinished(Uuid),

    /// Cancel requested for a job that already reached a terminal state.
    #[error("import job {0} already finished")]
    JobAlreadyFinished(Uuid),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_message_names_email_field() {
        let err = ConfigurationError::MissingIdentifierMapping;
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn test_import_error_wraps_configuration_error() {
        let err: ImportError = ConfigurationError::EmptyFile.into();
        assert!(matches!(err, ImportError::Configuration(_)));
    }

    #[test]
    fn test_not_owner_message_contains_job_id() {
        let id = Uuid::new_v4();
        let err = ImportError::NotOwner(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
