// Token-bucket pacing for the fetcher.
//
// The bucket refills at `refill_rate` tokens/s up to `bucket_limit`. A
// request with a token available proceeds immediately; otherwise the caller
// sleeps until one accrues, plus a small uniform jitter so request spacing
// is not perfectly regular.

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;

pub struct RateLimiter {
    refill_rate: f64,
    bucket_limit: f64,
    tokens: f64,
    last_add: Instant,
}

impl RateLimiter {
    pub fn new(refill_rate: f64, bucket_limit: f64) -> Self {
        Self {
            refill_rate,
            bucket_limit,
            tokens: 0.0,
            last_add: Instant::now(),
        }
    }

    /// Take one token, sleeping until one is available.
    pub fn acquire(&mut self) {
        if let Some(base_wait) = self.try_take(Instant::now()) {
            let jitter = rand::thread_rng().gen_range(-0.3..=0.3);
            let wait = (base_wait + jitter).max(0.0);
            thread::sleep(Duration::from_secs_f64(wait));

            // The token accrued during the sleep is consumed right away.
            self.last_add = Instant::now();
            self.tokens = 0.0;
        }
    }

    /// Refill from elapsed time and try to take a token. Returns the wait
    /// in seconds when the bucket is empty.
    fn try_take(&mut self, now: Instant) -> Option<f64> {
        let elapsed = now.duration_since(self.last_add).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.bucket_limit);
        self.last_add = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            Some((1.0 - self.tokens) / self.refill_rate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bucket_waits_a_full_token() {
        let mut limiter = RateLimiter::new(1.0, 10.0);
        let now = limiter.last_add;
        let wait = limiter.try_take(now).expect("bucket starts empty");
        assert!((wait - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_refill_allows_immediate_requests() {
        let mut limiter = RateLimiter::new(1.0, 10.0);
        let later = limiter.last_add + Duration::from_secs(5);
        for _ in 0..5 {
            assert!(limiter.try_take(later).is_none());
        }
        assert!(limiter.try_take(later).is_some());
    }

    #[test]
    fn test_bucket_is_capped() {
        let mut limiter = RateLimiter::new(1.0, 10.0);
        let much_later = limiter.last_add + Duration::from_secs(3600);
        for _ in 0..10 {
            assert!(limiter.try_take(much_later).is_none());
        }
        assert!(limiter.try_take(much_later).is_some());
    }

    #[test]
    fn test_partial_token_shortens_the_wait() {
        let mut limiter = RateLimiter::new(2.0, 10.0);
        let now = limiter.last_add;
        // 0.25 s at 2 tokens/s leaves half a token: wait (1 - 0.5) / 2.
        let later = now + Duration::from_millis(250);
        let wait = limiter.try_take(later).expect("under one token");
        assert!((wait - 0.25).abs() < 1e-9);
    }
}
