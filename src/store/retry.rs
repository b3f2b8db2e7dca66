//! # Store Retry
//!
//! Bounded exponential backoff around a [`VolumeStore`]. Only
//! `RepositoryFailure` is retried; missing keys and policy errors are final.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{VolumeInfo, VolumeStore};
use crate::errors::{AccessError, AccessResult};
use crate::observability::Logger;
use crate::retrieval::ContentReader;

/// Retry parameters as they appear in the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRetryConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    4
}

impl Default for StoreRetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Backoff schedule for store calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_attempts: 1,
        }
    }

    /// Delay before retry number `retry_count` (0 = first retry), capped at `max_delay`
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        retry_delay(retry_count, self.initial_delay).min(self.max_delay)
    }
}

impl From<StoreRetryConfig> for RetryPolicy {
    fn from(config: StoreRetryConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

/// Exponential backoff: `base * 2^retry_count`, saturating.
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier)
}

/// Store wrapper that retries repository failures
#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: VolumeStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn with_retry<T>(&self, op: &str, mut call: impl FnMut(&S) -> AccessResult<T>) -> AccessResult<T> {
        let attempts = self.policy.max_attempts.max(1);
        let mut retry_count = 0;

        loop {
            match call(&self.inner) {
                Err(AccessError::RepositoryFailure { message }) => {
                    if retry_count + 1 >= attempts {
                        return Err(AccessError::repository(format!(
                            "{} failed after {} attempts: {}",
                            op, attempts, message
                        )));
                    }

                    let delay = self.policy.delay_for(retry_count);
                    let attempt = (retry_count + 1).to_string();
                    let delay_ms = delay.as_millis().to_string();
                    Logger::warn(
                        "STORE_RETRY",
                        &[
                            ("attempt", attempt.as_str()),
                            ("delay_ms", delay_ms.as_str()),
                            ("error", message.as_str()),
                            ("op", op),
                        ],
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    retry_count += 1;
                }
                other => return other,
            }
        }
    }
}

impl<S: VolumeStore> VolumeStore for RetryingStore<S> {
    fn volume_info(&self, volume_id: &str) -> AccessResult<VolumeInfo> {
        self.with_retry("volume_info", |store| store.volume_info(volume_id))
    }

    fn page(&self, volume_id: &str, sequence: u32) -> AccessResult<Vec<u8>> {
        self.with_retry("page", |store| store.page(volume_id, sequence))
    }

    fn metadata(&self, volume_id: &str) -> AccessResult<Vec<ContentReader>> {
        self.with_retry("metadata", |store| store.metadata(volume_id))
    }
}
