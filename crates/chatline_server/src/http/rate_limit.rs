//! Per-client request limiting.
//!
//! # Invariants
//! - Each client IP gets at most `requests` requests per fixed window.
//! - Requests without a known peer address share one bucket.
//! - A limit with zero requests or a zero window admits everything.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use log::warn;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub const fn new(requests: u32, window: Duration) -> Self {
        Self { requests, window }
    }

    pub const fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.requests > 0 && !self.window.is_zero()
    }
}

struct Window {
    started_at: Instant,
    count: u32,
}

pub(crate) struct RateLimiter {
    limit: RateLimit,
    windows: Mutex<HashMap<Option<IpAddr>, Window>>,
}

impl RateLimiter {
    pub(crate) fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request from `client`.
    ///
    /// Returns the time left in the current window when the client is over
    /// its limit.
    pub(crate) fn check(&self, client: Option<IpAddr>, now: Instant) -> Result<(), Duration> {
        if !self.limit.is_enabled() {
            return Ok(());
        }

        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        if windows.len() >= PRUNE_THRESHOLD {
            let span = self.limit.window;
            windows.retain(|_, window| now.saturating_duration_since(window.started_at) < span);
        }

        let window = windows.entry(client).or_insert(Window {
            started_at: now,
            count: 0,
        });
        let elapsed = now.saturating_duration_since(window.started_at);
        if elapsed >= self.limit.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.limit.requests {
            return Err(self
                .limit
                .window
                .saturating_sub(now.saturating_duration_since(window.started_at)));
        }
        window.count += 1;
        Ok(())
    }
}

pub(super) async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match limiter.check(client, Instant::now()) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            warn!(
                "event=rate_limited module=http status=rejected client={} retry_after_s={seconds}",
                client.map_or_else(|| "unknown".to_string(), |ip| ip.to_string())
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, seconds.to_string())],
                "Too Many Requests",
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RateLimit, RateLimiter};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::{Duration, Instant};

    const A: Option<IpAddr> = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
    const B: Option<IpAddr> = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));

    #[test]
    fn limit_applies_per_client() {
        let limiter = RateLimiter::new(RateLimit::new(2, Duration::from_secs(60)));
        let now = Instant::now();

        assert!(limiter.check(A, now).is_ok());
        assert!(limiter.check(A, now).is_ok());
        assert!(limiter.check(A, now).is_err());
        assert!(limiter.check(B, now).is_ok());
    }

    #[test]
    fn window_reset_admits_again() {
        let limiter = RateLimiter::new(RateLimit::new(1, Duration::from_secs(10)));
        let start = Instant::now();

        assert!(limiter.check(A, start).is_ok());
        let wait = limiter
            .check(A, start + Duration::from_secs(4))
            .unwrap_err();
        assert_eq!(wait, Duration::from_secs(6));
        assert!(limiter.check(A, start + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn disabled_limit_admits_everything() {
        let limiter = RateLimiter::new(RateLimit::disabled());
        let now = Instant::now();
        for _ in 0..100 {
            assert!(limiter.check(None, now).is_ok());
        }
        assert!(!RateLimit::new(5, Duration::ZERO).is_enabled());
    }
}
