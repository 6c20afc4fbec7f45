use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use gridguide_core::FetchSource;
use gridguide_runtime_config::SyncSettings;
use tracing::warn;

/// How often a failed source fetch is retried within one round.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            delays: settings
                .retry_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.delays
            .get(attempt as usize)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// Run `fetch` until it succeeds or the policy is exhausted.
pub async fn retry_fetch<T, F, Fut>(
    source: FetchSource,
    policy: &RetryPolicy,
    mut fetch: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_retries + 1;
    let mut attempt = 0;

    loop {
        match fetch().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Fetching {} attempt {}/{} failed ({:#}), retrying in {}ms",
                    source,
                    attempt + 1,
                    max_attempts,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) if max_attempts > 1 => {
                return Err(e.context(format!("{source} failed after {max_attempts} attempts")));
            }
            Err(e) => return Err(e),
        }
    }
}
