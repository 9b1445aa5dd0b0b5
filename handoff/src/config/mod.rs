// src/config/mod.rs

//! Producer configuration.
//!
//! Configuration is read as YAML into [`raw::ProducerConfigRaw`] and then
//! validated into a [`ProducerConfig`]. Every field is optional; missing
//! fields take the defaults below.
//!
//! ```yaml
//! version: 1
//! interval: 200ms
//! start_delay: 0s
//! thread_name: keyboard-ticker
//! ```

pub mod raw;

use crate::error::ConfigError;
use raw::ProducerConfigRaw;

use std::path::Path;
use std::time::Duration;

/// Reference production cadence.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);
/// Name given to the ticker thread unless configured otherwise.
pub const DEFAULT_THREAD_NAME: &str = "fibre-handoff-ticker";

const SUPPORTED_VERSION: u32 = 1;

/// Validated settings for a [`Producer`](crate::Producer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerConfig {
  /// Time between two productions.
  pub interval: Duration,
  /// Delay before the first production. Zero produces immediately.
  pub start_delay: Duration,
  /// Name of the ticker thread.
  pub thread_name: String,
}

impl Default for ProducerConfig {
  fn default() -> Self {
    Self {
      interval: DEFAULT_INTERVAL,
      start_delay: Duration::ZERO,
      thread_name: DEFAULT_THREAD_NAME.to_string(),
    }
  }
}

impl ProducerConfig {
  /// Parses and validates a YAML document.
  pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
    let raw: ProducerConfigRaw =
      serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Self::from_raw(raw)
  }

  /// Reads, parses and validates a YAML file.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    Self::from_yaml_str(&contents)
  }

  /// Validates raw configuration, filling in defaults.
  pub fn from_raw(raw: ProducerConfigRaw) -> Result<Self, ConfigError> {
    if raw.version != SUPPORTED_VERSION {
      return Err(ConfigError::InvalidValue {
        field: "version".to_string(),
        message: format!("unsupported version {}, expected {}", raw.version, SUPPORTED_VERSION),
      });
    }

    let defaults = Self::default();

    let interval = match raw.interval {
      Some(s) => parse_duration("interval", &s)?,
      None => defaults.interval,
    };
    if interval.is_zero() {
      return Err(ConfigError::InvalidValue {
        field: "interval".to_string(),
        message: "must be greater than zero".to_string(),
      });
    }

    let start_delay = match raw.start_delay {
      Some(s) => parse_duration("start_delay", &s)?,
      None => defaults.start_delay,
    };

    let thread_name = match raw.thread_name {
      Some(name) if name.trim().is_empty() => {
        return Err(ConfigError::InvalidValue {
          field: "thread_name".to_string(),
          message: "must not be empty".to_string(),
        })
      }
      Some(name) if name.contains('\0') => {
        return Err(ConfigError::InvalidValue {
          field: "thread_name".to_string(),
          message: "must not contain NUL bytes".to_string(),
        })
      }
      Some(name) => name,
      None => defaults.thread_name,
    };

    Ok(Self {
      interval,
      start_delay,
      thread_name,
    })
  }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
  humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidValue {
    field: field.to_string(),
    message: format!("'{}' is not a duration: {}", value, e),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn empty_document_yields_defaults() {
    // An empty YAML document deserializes to null, so use an empty mapping.
    let config = ProducerConfig::from_yaml_str("{}").unwrap();
    assert_eq!(config, ProducerConfig::default());
    assert_eq!(config.interval, Duration::from_millis(200));
  }

  #[test]
  fn parses_human_durations() {
    let yaml = "interval: 1s 500ms\nstart_delay: 50ms\nthread_name: keys\n";
    let config = ProducerConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(
      config,
      ProducerConfig {
        interval: Duration::from_millis(1500),
        start_delay: Duration::from_millis(50),
        thread_name: "keys".to_string(),
      }
    );
  }

  #[test]
  fn rejects_zero_interval() {
    let err = ProducerConfig::from_yaml_str("interval: 0s").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "interval"));
  }

  #[test]
  fn rejects_bad_duration() {
    let err = ProducerConfig::from_yaml_str("start_delay: soon").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "start_delay"));
  }

  #[test]
  fn rejects_unknown_fields() {
    let err = ProducerConfig::from_yaml_str("capacity: 10").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
  }

  #[test]
  fn rejects_nul_in_thread_name() {
    let err = ProducerConfig::from_yaml_str("thread_name: \"tick\\0er\"").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "thread_name"));
  }

  #[test]
  fn rejects_unsupported_version() {
    let err = ProducerConfig::from_yaml_str("version: 2").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "version"));
  }
}
