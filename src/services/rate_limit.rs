// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sliding-window request limiter.
//!
//! Strava enforces two quotas at once: a short (15 minute) and a long
//! (daily) window. Every API call goes through [`RateLimiter::acquire`],
//! which waits until both windows have room and then records the call.
//! Responses carry the server's own usage counters, which are fed back in
//! through [`RateLimiter::observe`] so the local view never undercounts.
//! Padding for daily usage counts only against the long window.

use crate::config::RateLimitConfig;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Usage fraction above which we start warning.
const USAGE_WARN_RATIO: f64 = 0.8;

/// Usage counters as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitUsage {
    pub short_usage: u32,
    pub long_usage: u32,
    pub short_limit: Option<u32>,
    pub long_limit: Option<u32>,
}

/// Point-in-time view of both windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub short_used: u32,
    pub short_limit: u32,
    pub long_used: u32,
    pub long_limit: u32,
}

impl QuotaSnapshot {
    pub fn short_percent(&self) -> f64 {
        percent(self.short_used, self.short_limit)
    }

    pub fn long_percent(&self) -> f64 {
        percent(self.long_used, self.long_limit)
    }
}

fn percent(used: u32, limit: u32) -> f64 {
    if limit == 0 {
        return 100.0;
    }
    f64::from(used) / f64::from(limit) * 100.0
}

/// One logged call.
#[derive(Clone, Copy)]
struct Call {
    at: Instant,
    /// False for padding that only reflects daily usage.
    in_short: bool,
}

impl Call {
    fn new(at: Instant) -> Self {
        Self { at, in_short: true }
    }

    fn long_only(at: Instant) -> Self {
        Self {
            at,
            in_short: false,
        }
    }
}

struct WindowState {
    /// Calls inside the long window, oldest first.
    calls: VecDeque<Call>,
    short_limit: u32,
    long_limit: u32,
    last_call: Option<Instant>,
}

/// Two-window sliding log limiter with a fixed spacing between calls.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<WindowState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let state = WindowState {
            calls: VecDeque::new(),
            short_limit: config.short_limit.max(1),
            long_limit: config.long_limit.max(1),
            last_call: None,
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait until one more call fits in both windows, then record it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.lock();
                let now = Instant::now();
                self.prune(&mut state, now);
                match self.wait_time(&state, now) {
                    None => {
                        state.calls.push_back(Call::new(now));
                        state.last_call = Some(now);
                        return;
                    }
                    Some(wait) => wait,
                }
            };

            if wait >= Duration::from_secs(1) {
                tracing::info!(wait_secs = wait.as_secs(), "Rate limit reached, waiting");
            }
            tokio::time::sleep(wait).await;
        }
    }

    /// Resync with the usage the service reports.
    ///
    /// Adopts tighter limits and pads the local log so that neither window
    /// counts fewer calls than the service has seen.
    pub fn observe(&self, usage: RateLimitUsage) {
        let mut state = self.lock();
        let now = Instant::now();
        self.prune(&mut state, now);

        if let Some(limit) = usage.short_limit.filter(|l| *l > 0) {
            state.short_limit = state.short_limit.min(limit);
        }
        if let Some(limit) = usage.long_limit.filter(|l| *l > 0) {
            state.long_limit = state.long_limit.min(limit);
        }

        let short_target = usage.short_usage.min(state.short_limit);
        let short_used = self.short_count(&state, now);
        for _ in short_used..short_target {
            state.calls.push_back(Call::new(now));
        }

        // Daily usage beyond the short window's view must not fill the short window.
        let long_target = usage.long_usage.min(state.long_limit);
        let long_used = state.calls.len() as u32;
        for _ in long_used..long_target {
            state.calls.push_back(Call::long_only(now));
        }

        let snapshot = self.snapshot_locked(&state, now);
        drop(state);

        if snapshot.short_percent() > USAGE_WARN_RATIO * 100.0 {
            tracing::warn!(
                percent = snapshot.short_percent(),
                "High usage of 15-minute rate limit"
            );
        }
        if snapshot.long_percent() > USAGE_WARN_RATIO * 100.0 {
            tracing::warn!(
                percent = snapshot.long_percent(),
                "High usage of daily rate limit"
            );
        }
    }

    /// Treat the short window as exhausted. Called on every quota rejection,
    /// after any reported usage has been observed.
    pub fn saturate(&self) {
        let mut state = self.lock();
        let now = Instant::now();
        self.prune(&mut state, now);
        let short_used = self.short_count(&state, now);
        for _ in short_used..state.short_limit {
            state.calls.push_back(Call::new(now));
        }
        tracing::warn!("Quota rejected by server, pausing until the short window clears");
    }

    /// Current usage of both windows.
    pub fn snapshot(&self) -> QuotaSnapshot {
        let mut state = self.lock();
        let now = Instant::now();
        self.prune(&mut state, now);
        self.snapshot_locked(&state, now)
    }

    fn snapshot_locked(&self, state: &WindowState, now: Instant) -> QuotaSnapshot {
        QuotaSnapshot {
            short_used: self.short_count(state, now),
            short_limit: state.short_limit,
            long_used: state.calls.len() as u32,
            long_limit: state.long_limit,
        }
    }

    /// Drop calls that have left the long window.
    fn prune(&self, state: &mut WindowState, now: Instant) {
        while let Some(oldest) = state.calls.front() {
            if now.duration_since(oldest.at) >= self.config.long_window {
                state.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Calls counted against the short window, newest first.
    fn short_calls<'a>(
        &self,
        state: &'a WindowState,
        now: Instant,
    ) -> impl Iterator<Item = &'a Call> + 'a {
        let window = self.config.short_window;
        state
            .calls
            .iter()
            .rev()
            .take_while(move |c| now.duration_since(c.at) < window)
            .filter(|c| c.in_short)
    }

    fn short_count(&self, state: &WindowState, now: Instant) -> u32 {
        self.short_calls(state, now).count() as u32
    }

    /// How long until one more call is allowed, or `None` if it is allowed now.
    fn wait_time(&self, state: &WindowState, now: Instant) -> Option<Duration> {
        let mut wait = Duration::ZERO;

        if self.short_count(state, now) >= state.short_limit {
            if let Some(oldest) = self.short_calls(state, now).last() {
                wait = wait.max(self.config.short_window - now.duration_since(oldest.at));
            }
        }

        if state.calls.len() >= state.long_limit as usize {
            if let Some(oldest) = state.calls.front() {
                wait = wait.max(self.config.long_window - now.duration_since(oldest.at));
            }
        }

        if let Some(last) = state.last_call {
            let since = now.duration_since(last);
            if since < self.config.extra_delay {
                wait = wait.max(self.config.extra_delay - since);
            }
        }

        (!wait.is_zero()).then_some(wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(short_limit: u32, long_limit: u32) -> RateLimitConfig {
        RateLimitConfig {
            short_window: Duration::from_secs(60),
            short_limit,
            long_window: Duration::from_secs(600),
            long_limit,
            extra_delay: Duration::ZERO,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_when_short_window_full() {
        let limiter = RateLimiter::new(config(2, 100));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_long_window() {
        let limiter = RateLimiter::new(config(100, 3));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_extra_delay_spaces_calls() {
        let limiter =
            RateLimiter::new(config(100, 100).with_extra_delay(Duration::from_millis(1500)));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_ever_exceeds_its_limit() {
        let limiter = RateLimiter::new(config(3, 7));
        let mut stamps = Vec::new();

        for _ in 0..25 {
            limiter.acquire().await;
            stamps.push(Instant::now());
        }

        for (i, start) in stamps.iter().enumerate() {
            let in_short = stamps[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < Duration::from_secs(60))
                .count();
            let in_long = stamps[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < Duration::from_secs(600))
                .count();
            assert!(in_short <= 3, "short window held {in_short} calls");
            assert!(in_long <= 7, "long window held {in_long} calls");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_pads_local_log_and_tightens_limits() {
        let limiter = RateLimiter::new(config(100, 1000));
        limiter.observe(RateLimitUsage {
            short_usage: 5,
            long_usage: 8,
            short_limit: Some(6),
            long_limit: Some(2000),
        });

        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.short_used, 5);
        assert_eq!(snapshot.long_used, 8);
        assert_eq!(snapshot.short_limit, 6);
        assert_eq!(snapshot.long_limit, 1000);

        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_usage_does_not_fill_short_window() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        limiter.acquire().await;
        limiter.observe(RateLimitUsage {
            short_usage: 1,
            long_usage: 300,
            short_limit: Some(100),
            long_limit: Some(1000),
        });

        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.short_used, 1);
        assert_eq!(snapshot.long_used, 300);

        // Only the one-second spacing applies, not the 15-minute window.
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(limiter.snapshot().short_used, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_padding_still_counts_against_long_window() {
        let limiter = RateLimiter::new(config(100, 10));
        limiter.observe(RateLimitUsage {
            short_usage: 0,
            long_usage: 10,
            short_limit: None,
            long_limit: None,
        });

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_saturate_blocks_until_short_window_clears() {
        let limiter = RateLimiter::new(config(10, 100));
        limiter.saturate();
        assert_eq!(limiter.snapshot().short_used, 10);

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[test]
    fn test_snapshot_percentages() {
        let snapshot = QuotaSnapshot {
            short_used: 40,
            short_limit: 100,
            long_used: 0,
            long_limit: 0,
        };
        assert_eq!(snapshot.short_percent(), 40.0);
        assert_eq!(snapshot.long_percent(), 100.0);
    }
}
