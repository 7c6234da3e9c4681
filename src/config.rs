//! # Pipeline configuration.
//!
//! Provides [`ConsumerConfig`] and [`ProducerConfig`], the constructor
//! parameters of the pipeline workers. There are no files or environment
//! variables: every knob is a plain field with a sensible [`Default`].
//!
//! Configs are checked by the builders (`validate`) so misuse fails at
//! construction, not on first use.
//!
//! ## Sentinel values
//! - `queue_capacity = 0` → unbounded queue

use std::borrow::Cow;

use crate::error::ConfigError;
use crate::policies::BackoffPolicy;

/// Settings for one [`Consumer`](crate::Consumer).
///
/// ## Field semantics
/// - `name`: label used in logs (must be non-empty)
/// - `queue_capacity`: maximum queued items (`0` = unbounded)
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    /// Human-readable name for logs.
    pub name: Cow<'static, str>,

    /// Maximum number of items waiting in the queue.
    ///
    /// - `0` = unbounded
    /// - `n > 0` = items offered while `n` are queued are rejected with
    ///   [`EnqueueError::Full`](crate::EnqueueError::Full)
    pub queue_capacity: usize,
}

impl ConsumerConfig {
    /// Returns the queue limit as an `Option` (`None` = unbounded).
    #[inline]
    pub fn capacity_limit(&self) -> Option<usize> {
        match self.queue_capacity {
            0 => None,
            n => Some(n),
        }
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        Ok(())
    }
}

impl Default for ConsumerConfig {
    /// `name = "consumer"`, unbounded queue.
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("consumer"),
            queue_capacity: 0,
        }
    }
}

/// Settings for one [`Producer`](crate::Producer).
#[derive(Clone, Debug)]
pub struct ProducerConfig {
    /// Human-readable name for logs.
    pub name: Cow<'static, str>,

    /// Pacing after iterations that produced nothing or failed.
    ///
    /// Grows with the number of consecutive idle iterations and resets once an
    /// item is produced. See [`BackoffPolicy`].
    pub idle_backoff: BackoffPolicy,
}

impl ProducerConfig {
    /// Checks the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        self.idle_backoff.validate()
    }
}

impl Default for ProducerConfig {
    /// `name = "producer"`, `idle_backoff = BackoffPolicy::default()`.
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("producer"),
            idle_backoff: BackoffPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_means_unbounded() {
        let cfg = ConsumerConfig::default();
        assert_eq!(cfg.capacity_limit(), None);

        let cfg = ConsumerConfig {
            queue_capacity: 2,
            ..ConsumerConfig::default()
        };
        assert_eq!(cfg.capacity_limit(), Some(2));
    }

    #[test]
    fn test_blank_name_rejected() {
        let cfg = ConsumerConfig {
            name: "  ".into(),
            ..ConsumerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyName));
    }

    #[test]
    fn test_producer_validates_backoff() {
        let mut cfg = ProducerConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.idle_backoff.first = Duration::from_secs(1);
        cfg.idle_backoff.max = Duration::from_millis(1);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidBackoff { .. })
        ));
    }
}
