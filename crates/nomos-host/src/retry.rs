// SPDX-License-Identifier: MIT OR Apache-2.0
//! Exponential backoff with jitter around [`crate::ProviderHost::get_provider`]
//! (spec §9 Open Questions, supplemented per `SPEC_FULL.md` §C.4).
//!
//! Off by default (`max_retries = 0`): providers are expected to be
//! reliably reachable once their binary has been resolved, so the base
//! behavior is to fail fast and let the caller decide whether to retry
//! a whole compile run.

use crate::{HostError, ProcessHandle, ProviderHost};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::warn;

/// Retry configuration for [`get_provider_with_retry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial one. `0` disables retry.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    #[serde(with = "duration_millis")]
    pub base_delay: Duration,
    /// Cap on backoff delay.
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,
    /// Jitter factor in `[0.0, 1.0]`.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.5,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(val: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        val.as_millis().serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let ms: u64 = u64::deserialize(de)?;
        Ok(Duration::from_millis(ms))
    }
}

fn compute_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = 2u64.saturating_pow(attempt);
    let delay_ms = (config.base_delay.as_millis() as u64).saturating_mul(exp);
    let capped_ms = delay_ms.min(config.max_delay.as_millis() as u64);

    let jitter_factor = config.jitter_factor.clamp(0.0, 1.0);
    if jitter_factor > 0.0 && capped_ms > 0 {
        let jitter_range = (capped_ms as f64 * jitter_factor) as u64;
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos() as u64;
        let pseudo = nanos.wrapping_mul(attempt as u64 + 1);
        let jitter = if jitter_range > 0 {
            pseudo % jitter_range
        } else {
            0
        };
        Duration::from_millis(capped_ms.saturating_sub(jitter))
    } else {
        Duration::from_millis(capped_ms)
    }
}

/// Returns `true` for [`HostError`] variants worth retrying — transient
/// startup failures, not malformed-protocol or missing-binary errors.
fn is_retryable(err: &HostError) -> bool {
    matches!(
        err,
        HostError::HandshakeTimedOut { .. } | HostError::HealthCheckFailed { .. }
    )
}

/// Like [`ProviderHost::get_provider`], but retries transient start
/// failures with exponential backoff per `config`.
pub async fn get_provider_with_retry(
    host: &ProviderHost,
    alias: &str,
    binary_path: &Path,
    config: &RetryConfig,
) -> Result<Arc<ProcessHandle>, HostError> {
    let start = Instant::now();
    let max_attempts = config.max_retries + 1;
    let mut last_err = None;

    for attempt in 0..max_attempts {
        match host.get_provider(alias, binary_path).await {
            Ok(handle) => return Ok(handle),
            Err(e) if attempt + 1 < max_attempts && is_retryable(&e) => {
                let delay = compute_delay(config, attempt);
                warn!(
                    target: "nomos.host.retry",
                    alias,
                    attempt,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "provider start failed, retrying"
                );
                last_err = Some(e);
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.expect("loop always attempts at least once"))
}
