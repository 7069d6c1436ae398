//! Configuration management

use std::time::Duration;

use anyhow::{self, Result};

use crate::services::import_processor::ProcessorSettings;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Budget for a single validator call, in milliseconds
    pub record_timeout_ms: u64,

    /// Consecutive validation timeouts after which a job is failed
    pub max_consecutive_timeouts: u32,

    /// Batch size used when the caller does not specify one
    pub default_batch_size: usize,

    /// Confidence threshold used when the caller does not specify one
    pub default_validation_threshold: u8,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let record_timeout_ms = env_or("RECORD_TIMEOUT_MS", 5_000)?;
        let max_consecutive_timeouts = env_or("MAX_CONSECUTIVE_TIMEOUTS", 25)?;
        let default_batch_size = env_or("DEFAULT_BATCH_SIZE", 500)?;
        let default_validation_threshold: u8 = env_or("VALIDATION_THRESHOLD", 70)?;

        if record_timeout_ms == 0 {
            anyhow::bail!("RECORD_TIMEOUT_MS must be a positive number of milliseconds");
        }
        if default_batch_size == 0 {
            anyhow::bail!("DEFAULT_BATCH_SIZE must be a positive integer");
        }
        if default_validation_threshold > 100 {
            anyhow::bail!(
                "VALIDATION_THRESHOLD must be between 0 and 100 (current: {})",
                default_validation_threshold
            );
        }

        Ok(Self {
            record_timeout_ms,
            max_consecutive_timeouts,
            default_batch_size,
            default_validation_threshold,
        })
    }

    /// Processor knobs derived from this configuration.
    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            record_timeout: Duration::from_millis(self.record_timeout_ms),
            max_consecutive_timeouts: self.max_consecutive_timeouts,
        }
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} is not a valid value for {}: {}", raw, name, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_defaults_when_nothing_set() {
        std::env::remove_var("RECORD_TIMEOUT_MS");
        std::env::remove_var("DEFAULT_BATCH_SIZE");
        std::env::remove_var("VALIDATION_THRESHOLD");

        let config = Config::from_env().unwrap();
        assert_eq!(config.record_timeout_ms, 5_000);
        assert_eq!(config.default_batch_size, 500);
        assert_eq!(config.default_validation_threshold, 70);
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_rejects_zero_batch_size() {
        std::env::set_var("DEFAULT_BATCH_SIZE", "0");
        assert!(Config::from_env().is_err());
        std::env::remove_var("DEFAULT_BATCH_SIZE");
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_rejects_threshold_over_100() {
        std::env::set_var("VALIDATION_THRESHOLD", "150");
        assert!(Config::from_env().is_err());
        std::env::remove_var("VALIDATION_THRESHOLD");
    }

    #[test]
    fn test_processor_settings_conversion() {
        let config = Config {
            record_timeout_ms: 2_000,
            max_consecutive_timeouts: 10,
            default_batch_size: 100,
            default_validation_threshold: 60,
        };
        let settings = config.processor_settings();
        assert_eq!(settings.record_timeout, Duration::from_millis(2_000));
        assert_eq!(settings.max_consecutive_timeouts, 10);
    }
}
