//! Token-bucket rate limiter for calls to the publishing service.
//!
//! ```text
//! capacity C, refill R tokens/s
//!
//! available = min(C, tokens + floor(elapsed * R))
//! ```
//!
//! Refill is computed lazily on every check; there is no background timer.
//! Callers of [`RateLimiter::acquire`] queue on a fair mutex, so a caller
//! that arrived first is always served first. While the bucket is empty the
//! caller at the head of the queue sleeps until the next token is due,
//! re-checking at least every [`RECHECK_INTERVAL`].
//!
//! A full bucket admits `C` calls at once and then one every `1/R` seconds,
//! so the first second after an idle period can see up to `C + R`
//! completions. Once the burst is spent no rolling one-second window holds
//! more than `R`.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default bucket capacity (the service's burst allowance).
pub const DEFAULT_CAPACITY: u32 = 3;

/// Default refill rate in tokens per second (the service's quota).
pub const DEFAULT_REFILL_PER_SEC: u32 = 3;

/// Upper bound on a single park while waiting for a token.
pub const RECHECK_INTERVAL: Duration = Duration::from_millis(100);

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Rate limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of tokens held at once.
    pub capacity: u32,
    /// Whole tokens added per second.
    pub refill_per_sec: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            refill_per_sec: DEFAULT_REFILL_PER_SEC,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimiterError {
    #[error("Rate limiter capacity must be at least 1")]
    ZeroCapacity,

    #[error("Rate limiter refill rate must be at least 1 token per second")]
    ZeroRefillRate,
}

impl RateLimiterConfig {
    pub fn validate(&self) -> Result<(), RateLimiterError> {
        if self.capacity == 0 {
            return Err(RateLimiterError::ZeroCapacity);
        }
        if self.refill_per_sec == 0 {
            return Err(RateLimiterError::ZeroRefillRate);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    /// Origin for the next refill computation.
    last_refill: Instant,
}

/// Token bucket shared by every outbound call for the process lifetime.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter with a full bucket.
    pub fn new(config: RateLimiterConfig) -> Result<Self, RateLimiterError> {
        config.validate()?;
        Ok(Self {
            config,
            bucket: Mutex::new(Bucket {
                tokens: config.capacity,
                last_refill: Instant::now(),
            }),
        })
    }

    pub fn config(&self) -> RateLimiterConfig {
        self.config
    }

    /// Take one token, waiting for a refill if the bucket is empty.
    ///
    /// Waiters are served strictly in arrival order.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;
        loop {
            let now = Instant::now();
            self.refill(&mut bucket, now);
            if bucket.tokens > 0 {
                bucket.tokens -= 1;
                return;
            }
            let wait = self.until_next_token(&bucket, now).min(RECHECK_INTERVAL);
            tracing::trace!(wait_ms = wait.as_millis() as u64, "Rate limiter empty, parking");
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens available at this instant. Waits behind queued acquirers.
    pub async fn available_tokens(&self) -> u32 {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket, Instant::now());
        bucket.tokens
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        // Nothing accrues while the bucket is full.
        if bucket.tokens >= self.config.capacity {
            bucket.last_refill = now;
            return;
        }
        let rate = u128::from(self.config.refill_per_sec);
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_nanos();
        let minted = elapsed * rate / NANOS_PER_SEC;
        if minted == 0 {
            return;
        }
        let room = u128::from(self.config.capacity - bucket.tokens);
        if minted >= room {
            bucket.tokens = self.config.capacity;
            bucket.last_refill = now;
        } else {
            bucket.tokens += minted as u32;
            // Advance by exactly the time those tokens took, keeping any
            // partial progress toward the next one.
            let spent = (minted * NANOS_PER_SEC).div_ceil(rate);
            bucket.last_refill += Duration::from_nanos(spent as u64);
        }
    }

    fn until_next_token(&self, bucket: &Bucket, now: Instant) -> Duration {
        let per_token = NANOS_PER_SEC.div_ceil(u128::from(self.config.refill_per_sec));
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_nanos();
        let remaining = per_token.saturating_sub(elapsed).max(1);
        Duration::from_nanos(remaining as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;

    fn limiter(capacity: u32, refill_per_sec: u32) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            capacity,
            refill_per_sec,
        })
        .unwrap()
    }

    #[test]
    fn zero_config_rejected() {
        assert_matches!(
            RateLimiter::new(RateLimiterConfig {
                capacity: 0,
                refill_per_sec: 3
            }),
            Err(RateLimiterError::ZeroCapacity)
        );
        assert_matches!(
            RateLimiter::new(RateLimiterConfig {
                capacity: 3,
                refill_per_sec: 0
            }),
            Err(RateLimiterError::ZeroRefillRate)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn burst_up_to_capacity_is_immediate() {
        let limiter = limiter(3, 3);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.available_tokens().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ten_acquires_take_at_least_seven_refill_periods() {
        let limiter = limiter(3, 3);
        let start = Instant::now();
        let mut completions = Vec::new();
        for _ in 0..10 {
            limiter.acquire().await;
            completions.push(start.elapsed());
        }

        let total = *completions.last().unwrap();
        assert!(total >= Duration::from_millis(2_330), "took {total:?}");
        assert!(total < Duration::from_millis(2_500), "took {total:?}");

        // The burst plus one second of refill bounds the first window.
        let first_second = completions
            .iter()
            .filter(|t| **t <= Duration::from_secs(1))
            .count();
        assert!(first_second <= 3 + 3, "{first_second} in the first second");

        // After the initial burst, any four consecutive completions span at
        // least a second: never more than 3 in a rolling 1-second window.
        for window in completions[3..].windows(4) {
            let span = window[3] - window[0];
            assert!(span >= Duration::from_millis(990), "span {span:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refill_is_capped_at_capacity() {
        let limiter = limiter(3, 3);
        for _ in 0..3 {
            limiter.acquire().await;
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(limiter.available_tokens().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_refill_counts_whole_tokens_only() {
        let limiter = limiter(3, 3);
        for _ in 0..3 {
            limiter.acquire().await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(limiter.available_tokens().await, 1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        // 700ms in total: the leftover 167ms from the first read still counts.
        assert_eq!(limiter.available_tokens().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_are_served_in_arrival_order() {
        let limiter = Arc::new(limiter(1, 1));
        limiter.acquire().await;

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..4 {
            let limiter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                order.lock().unwrap().push(i);
            }));
            // Let the task reach the admission queue before the next one.
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }
}
