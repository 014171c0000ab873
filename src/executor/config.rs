use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BraidError, Result};

/// Default number of search operations allowed to run at once.
pub const DEFAULT_MAX_WORKERS: usize = 6;

/// Configuration for the [`SearchExecutor`](super::SearchExecutor) worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum number of task bodies running concurrently. Further tasks
    /// queue until a worker frees up.
    pub max_workers: usize,
    /// Upper bound on how long shutdown waits for in-flight work, in
    /// milliseconds. `None` waits until everything has finished.
    pub shutdown_timeout_ms: Option<u64>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            shutdown_timeout_ms: None,
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn shutdown_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.shutdown_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(BraidError::invalid_config(
                "max_workers must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_workers, 6);
        assert_eq!(config.shutdown_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = ExecutorConfig::new().max_workers(0);
        assert!(matches!(
            config.validate(),
            Err(BraidError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ExecutorConfig = serde_json::from_str(r#"{"max_workers": 2}"#).unwrap();
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.shutdown_timeout_ms, None);

        let config: ExecutorConfig =
            serde_json::from_str(r#"{"shutdown_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
        assert_eq!(config.shutdown_timeout(), Some(Duration::from_millis(250)));
    }
}
