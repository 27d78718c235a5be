use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::AppConfig;
use crate::error::AppError;

/// Per-client request budget over a rolling window (sliding log).
///
/// Requests over budget are rejected immediately; nothing is queued.
#[derive(Clone)]
pub struct RequestRateLimiter {
    state: Arc<Mutex<RequestLogs>>,
    window: Duration,
    max_requests: u32,
    metrics: Arc<RateLimitMetrics>,
}

struct RequestLogs {
    by_key: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

/// Which budget a request is charged against
#[derive(Clone, Copy)]
pub enum LimitScope {
    /// Unauthenticated auth routes, keyed by client address
    Auth,
    /// Authenticated routes, keyed by user id
    Api,
    /// Rejected bearer tokens on protected routes, keyed by client address
    BadToken,
}

#[derive(Default)]
struct RateLimitMetrics {
    auth_allowed: AtomicU64,
    auth_limited: AtomicU64,
    api_allowed: AtomicU64,
    api_limited: AtomicU64,
    bad_token_recorded: AtomicU64,
    bad_token_limited: AtomicU64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub auth_allowed: u64,
    pub auth_limited: u64,
    pub api_allowed: u64,
    pub api_limited: u64,
    pub bad_token_recorded: u64,
    pub bad_token_limited: u64,
}

impl RequestRateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.rate_limit_window, config.rate_limit_max_requests)
    }

    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(RequestLogs {
                by_key: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            window,
            max_requests,
            metrics: Arc::new(RateLimitMetrics::default()),
        }
    }

    /// Charge one request, rejecting it when the budget is already spent.
    pub async fn check(&self, scope: LimitScope, client_key: &str) -> Result<(), AppError> {
        self.admit(scope, client_key, true).await
    }

    /// Reject when the budget is spent, without charging anything.
    pub async fn ensure_available(
        &self,
        scope: LimitScope,
        client_key: &str,
    ) -> Result<(), AppError> {
        self.admit(scope, client_key, false).await
    }

    /// Charge a request that has already been handled, such as a rejected token.
    pub async fn record(&self, scope: LimitScope, client_key: &str) {
        let now = Instant::now();
        let mut logs = self.state.lock().await;
        self.sweep(&mut logs, now);
        logs.by_key
            .entry(scoped_key(scope, client_key))
            .or_default()
            .push_back(now);
        drop(logs);
        self.mark(scope, true);
    }

    async fn admit(&self, scope: LimitScope, client_key: &str, charge: bool) -> Result<(), AppError> {
        let key = scoped_key(scope, client_key);
        let now = Instant::now();
        let mut logs = self.state.lock().await;
        self.sweep(&mut logs, now);

        let log = logs.by_key.entry(key.clone()).or_default();
        while log
            .front()
            .is_some_and(|at| now.duration_since(*at) >= self.window)
        {
            log.pop_front();
        }

        if log.len() >= self.max_requests as usize {
            // The oldest request in the window is the next to age out.
            let retry_after = log.front().map_or(self.window, |oldest| {
                self.window.saturating_sub(now.duration_since(*oldest))
            });
            let retry_after_secs = ceil_secs(retry_after);
            self.mark(scope, false);
            tracing::warn!(
                scope = scope.label(),
                client = journal_core::util::user_fingerprint(client_key),
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(AppError::too_many_requests(
                "Rate limit exceeded, try again later",
                retry_after_secs,
            ));
        }

        if charge {
            log.push_back(now);
            self.mark(scope, true);
        } else if log.is_empty() {
            logs.by_key.remove(&key);
        }
        Ok(())
    }

    /// Drop clients with no request left in the window, at most once per window.
    fn sweep(&self, logs: &mut RequestLogs, now: Instant) {
        if now.duration_since(logs.last_sweep) < self.window {
            return;
        }
        let window = self.window;
        logs.by_key
            .retain(|_, log| log.back().is_some_and(|at| now.duration_since(*at) < window));
        logs.last_sweep = now;
    }

    pub fn metrics_snapshot(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            auth_allowed: self.metrics.auth_allowed.load(Ordering::Relaxed),
            auth_limited: self.metrics.auth_limited.load(Ordering::Relaxed),
            api_allowed: self.metrics.api_allowed.load(Ordering::Relaxed),
            api_limited: self.metrics.api_limited.load(Ordering::Relaxed),
            bad_token_recorded: self.metrics.bad_token_recorded.load(Ordering::Relaxed),
            bad_token_limited: self.metrics.bad_token_limited.load(Ordering::Relaxed),
        }
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.state.lock().await.by_key.len()
    }

    fn mark(&self, scope: LimitScope, allowed: bool) {
        let counter = match (scope, allowed) {
            (LimitScope::Auth, true) => &self.metrics.auth_allowed,
            (LimitScope::Auth, false) => &self.metrics.auth_limited,
            (LimitScope::Api, true) => &self.metrics.api_allowed,
            (LimitScope::Api, false) => &self.metrics.api_limited,
            (LimitScope::BadToken, true) => &self.metrics.bad_token_recorded,
            (LimitScope::BadToken, false) => &self.metrics.bad_token_limited,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl LimitScope {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Api => "api",
            Self::BadToken => "bad_token",
        }
    }
}

fn scoped_key(scope: LimitScope, client_key: &str) -> String {
    format!("{}:{client_key}", scope.label())
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
