// Queue Domain Model

use super::Capacity;
use crate::error::{QueueError, Result};
use serde::{Deserialize, Serialize};

/// Queue identifier (used to label log output)
pub type QueueName = String;

/// Default queue name when none is configured
pub const DEFAULT_QUEUE_NAME: &str = "default";

/// Default capacity: one in-flight call, nothing waiting
pub const DEFAULT_CAPACITY: usize = 1;

/// Environment variable holding the queue name
pub const ENV_QUEUE_NAME: &str = "TASKGATE_QUEUE_NAME";

/// Environment variable holding the queue capacity
pub const ENV_QUEUE_CAPACITY: &str = "TASKGATE_QUEUE_CAPACITY";

const MAX_NAME_LEN: usize = 64;

/// Queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_name")]
    pub name: QueueName,
    pub capacity: Capacity,
}

fn default_name() -> QueueName {
    DEFAULT_QUEUE_NAME.to_string()
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, capacity: Capacity) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }

    /// Load configuration from `TASKGATE_QUEUE_NAME` / `TASKGATE_QUEUE_CAPACITY`
    ///
    /// Missing variables fall back to the defaults; present but malformed
    /// values are an error.
    pub fn from_env() -> Result<Self> {
        let name = std::env::var(ENV_QUEUE_NAME).unwrap_or_else(|_| default_name());
        let capacity = match std::env::var(ENV_QUEUE_CAPACITY) {
            Ok(raw) => raw.parse::<Capacity>()?,
            Err(_) => Capacity::new(DEFAULT_CAPACITY)?,
        };

        let config = Self::new(name, capacity);
        config.validate()?;
        Ok(config)
    }

    /// Validate the queue name
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(QueueError::Config("queue name cannot be empty".to_string()));
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(QueueError::Config(format!(
                "queue name too long ({} > {} chars)",
                self.name.len(),
                MAX_NAME_LEN
            )));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(QueueError::Config(format!(
                "queue name must be alphanumeric (plus '_', '-', '.'): {}",
                self.name
            )));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            capacity: Capacity::ONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str) -> QueueConfig {
        QueueConfig::new(name, Capacity::new(2).unwrap())
    }

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.name, "default");
        assert_eq!(config.capacity.get(), DEFAULT_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_name_empty() {
        let err = config("").validate().unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_validate_name_too_long() {
        let err = config(&"a".repeat(65)).validate().unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn test_validate_name_invalid_chars() {
        let err = config("invalid@queue!").validate().unwrap_err();
        assert!(err.to_string().contains("alphanumeric"));
    }

    #[test]
    fn test_validate_name_accepts_separators() {
        assert!(config("api.calls_v2-eu").validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_default_name() {
        let config: QueueConfig = serde_json::from_str(r#"{"capacity": 3}"#).unwrap();
        assert_eq!(config.name, DEFAULT_QUEUE_NAME);
        assert_eq!(config.capacity.get(), 3);
    }

    #[test]
    fn test_deserialize_rejects_zero_capacity() {
        let result = serde_json::from_str::<QueueConfig>(r#"{"name": "q", "capacity": 0}"#);
        assert!(result.is_err());
    }
}
