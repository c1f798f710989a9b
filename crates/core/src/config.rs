use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::retry::RetryConfig;
use crate::core::scheduler::Scheduler;

/// Tunables for dispatching a batch.
///
/// The delays are defaults, not provider facts: no provider documents the
/// quota window they are meant to avoid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchSettings {
    pub max_retries: u32,
    #[serde(rename = "backoffMs", with = "duration_ms")]
    pub backoff: Duration,
    #[serde(rename = "staggerMs", with = "duration_ms")]
    pub stagger: Duration,
    /// Upper bound on in-flight tasks; the pool size is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_secs(1),
            stagger: Scheduler::DEFAULT_STAGGER,
            concurrency: None,
        }
    }
}

impl DispatchSettings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::custom(self.max_retries, self.backoff)
    }

    /// Effective budget: the smallest of pool size, configured cap and
    /// per-call hint, never below 1.
    pub fn budget(&self, pool_size: usize, hint: Option<usize>) -> usize {
        [Some(pool_size), self.concurrency, hint]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(1)
            .max(1)
    }

    pub fn scheduler(&self, pool_size: usize, hint: Option<usize>) -> Scheduler {
        Scheduler::new(self.budget(pool_size, hint)).with_stagger(self.stagger)
    }
}

/// Serde helpers storing durations as integer milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u128::from(u64::MAX)) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(d) => serializer.serialize_some(&(d.as_millis().min(u128::from(u64::MAX)) as u64)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_millis))
        }
    }
}
