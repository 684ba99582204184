use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{channel::ChatChannel, error::ChannelError, types::InboundMessage};

/// Minimum delay between reconnect attempts.
const BACKOFF_BASE: Duration = Duration::from_secs(5);
/// Maximum delay between reconnect attempts.
const BACKOFF_MAX: Duration = Duration::from_secs(300); // 5 minutes
/// Consecutive failed attempts before giving up.
const MAX_ATTEMPTS: u32 = 10;
/// A session that stayed up this long resets the failure streak.
const HEALTHY_SESSION: Duration = Duration::from_secs(60);
/// Jitter fraction applied to each delay (+0 … 10 %).
const JITTER_FRACTION: f64 = 0.10;

/// Reconnect schedule for [`listen_with_backoff`].
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    pub max_attempts: u32,
    pub healthy_after: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: BACKOFF_BASE,
            max: BACKOFF_MAX,
            max_attempts: MAX_ATTEMPTS,
            healthy_after: HEALTHY_SESSION,
        }
    }
}

/// Keep a transport listening, reconnecting with exponential backoff.
///
/// Schedule: 5 s → 10 s → 20 s → … → 300 s (cap), each plus up to 10 %
/// jitter. Returns `Ok(())` once the transport reports the receiver closed,
/// and the last error after [`BackoffPolicy::max_attempts`] consecutive
/// failures.
pub async fn listen_with_backoff(
    channel: Arc<dyn ChatChannel>,
    tx: mpsc::Sender<InboundMessage>,
    policy: BackoffPolicy,
) -> Result<(), ChannelError> {
    let name = channel.name().to_string();
    let mut delay = policy.base;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        info!(channel = %name, attempt, "connecting chat transport");
        let started = Instant::now();

        match channel.listen(tx.clone()).await {
            Ok(()) => {
                info!(channel = %name, "chat transport stopped: receiver closed");
                return Ok(());
            }
            Err(e) => {
                if started.elapsed() >= policy.healthy_after {
                    attempt = 1;
                    delay = policy.base;
                }
                if attempt >= policy.max_attempts {
                    error!(channel = %name, error = %e, "chat transport failed after retries");
                    return Err(e);
                }
                if tx.is_closed() {
                    return Ok(());
                }

                let total = delay + jitter(delay);
                warn!(
                    channel = %name,
                    attempt,
                    max = policy.max_attempts,
                    error = %e,
                    retry_after_ms = total.as_millis() as u64,
                    "chat transport dropped, reconnecting with backoff"
                );
                sleep(total).await;
                delay = (delay * 2).min(policy.max);
            }
        }
    }
}

/// Return a random jitter offset in `0 … JITTER_FRACTION * base`.
fn jitter(base: Duration) -> Duration {
    let max = base.mul_f64(JITTER_FRACTION);
    if max.is_zero() {
        return Duration::ZERO;
    }
    max.mul_f64(rand::thread_rng().gen_range(0.0..1.0))
}
