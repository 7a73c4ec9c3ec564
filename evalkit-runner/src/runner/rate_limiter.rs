//! Sliding-window request and token limits

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const WINDOW: Duration = Duration::from_secs(60);

/// Per-minute request and token budget shared by every call to a provider
pub struct RateLimiter {
    requests_per_minute: u32,
    tokens_per_minute: u32,
    window: Duration,
    requests: Mutex<VecDeque<Instant>>,
    token_usage: Mutex<VecDeque<(Instant, u64)>>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, tokens_per_minute: u32) -> Self {
        Self::with_window(requests_per_minute, tokens_per_minute, WINDOW)
    }

    /// Limiter over a custom window length
    pub fn with_window(requests_per_minute: u32, tokens_per_minute: u32, window: Duration) -> Self {
        Self {
            requests_per_minute: requests_per_minute.max(1),
            tokens_per_minute,
            window,
            requests: Mutex::new(VecDeque::new()),
            token_usage: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until both the request and the token budget allow another call,
    /// then record the request.
    pub async fn acquire(&self) {
        loop {
            if let Some(wait) = self.request_wait().await {
                tracing::debug!("Request budget exhausted, waiting {:?}", wait);
                tokio::time::sleep(wait).await;
                continue;
            }

            if self.tokens_per_minute > 0
                && self.current_token_usage().await >= u64::from(self.tokens_per_minute)
            {
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }

            let mut requests = self.requests.lock().await;
            if requests.len() < self.requests_per_minute as usize {
                requests.push_back(Instant::now());
                return;
            }
        }
    }

    /// Time until the oldest request leaves the window, if at the limit
    async fn request_wait(&self) -> Option<Duration> {
        let mut requests = self.requests.lock().await;
        let now = Instant::now();
        prune(&mut requests, now, self.window, |t| *t);

        if requests.len() < self.requests_per_minute as usize {
            return None;
        }

        requests.front().map(|&oldest| {
            self.window.saturating_sub(now.duration_since(oldest)) + Duration::from_millis(10)
        })
    }

    /// Record token usage of a completed call
    pub async fn record_tokens(&self, tokens: u32) {
        let mut usage = self.token_usage.lock().await;
        let now = Instant::now();
        prune(&mut usage, now, self.window, |(t, _)| *t);
        usage.push_back((now, u64::from(tokens)));
    }

    /// Tokens used within the current window
    pub async fn current_token_usage(&self) -> u64 {
        let mut usage = self.token_usage.lock().await;
        prune(&mut usage, Instant::now(), self.window, |(t, _)| *t);
        usage.iter().map(|(_, t)| t).sum()
    }
}

fn prune<T>(entries: &mut VecDeque<T>, now: Instant, window: Duration, at: impl Fn(&T) -> Instant) {
    while let Some(front) = entries.front() {
        if now.duration_since(at(front)) > window {
            entries.pop_front();
        } else {
            break;
        }
    }
}
