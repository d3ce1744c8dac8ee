//! Process-wide budget for outbound model calls.
//!
//! One shared instance caps daily and per-minute usage. The cap is soft:
//! `can_proceed` and `record` are separate steps, so two concurrent
//! callers can both pass the check right at the limit. The window state
//! itself is mutex-guarded, so counters never corrupt.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Mutex;

pub const MAX_AI_REQUESTS_PER_DAY: u32 = 1000;
pub const MAX_AI_REQUESTS_PER_MINUTE: u32 = 20;

#[derive(Debug)]
struct RateWindow {
    daily_count: u32,
    daily_window_start: DateTime<Utc>,
    minute_timestamps: Vec<DateTime<Utc>>,
}

/// Usage snapshot for diagnostics and dashboards.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RateLimiterStats {
    pub daily_used: u32,
    pub daily_limit: u32,
    pub percent_used: f64,
    pub can_proceed: bool,
}

pub struct RateLimiter {
    daily_limit: u32,
    per_minute_limit: u32,
    window: Mutex<RateWindow>,
}

impl RateLimiter {
    pub fn new(daily_limit: u32, per_minute_limit: u32) -> Self {
        Self {
            daily_limit,
            per_minute_limit,
            window: Mutex::new(RateWindow {
                daily_count: 0,
                daily_window_start: Utc::now(),
                minute_timestamps: Vec::new(),
            }),
        }
    }

    /// True when a model call is currently within budget.
    /// Callers must check this immediately before issuing the call.
    pub fn can_proceed(&self) -> bool {
        self.can_proceed_at(Utc::now())
    }

    pub fn can_proceed_at(&self, now: DateTime<Utc>) -> bool {
        let mut w = self.lock();

        // Daily window rolls over silently after 24h.
        if now - w.daily_window_start >= Duration::hours(24) {
            w.daily_count = 0;
            w.daily_window_start = now;
        }

        if w.daily_count >= self.daily_limit {
            tracing::warn!(daily_used = w.daily_count, "daily model budget exhausted");
            return false;
        }

        // Prune the minute window to the trailing 60 seconds.
        w.minute_timestamps
            .retain(|t| now - *t < Duration::seconds(60));
        if w.minute_timestamps.len() as u32 >= self.per_minute_limit {
            tracing::warn!(
                minute_used = w.minute_timestamps.len(),
                "per-minute model budget exhausted"
            );
            return false;
        }

        true
    }

    /// Consume budget. Call only after actually issuing the external call.
    pub fn record(&self) {
        self.record_at(Utc::now());
    }

    pub fn record_at(&self, now: DateTime<Utc>) {
        let mut w = self.lock();
        w.minute_timestamps.push(now);
        w.daily_count += 1;
    }

    pub fn stats(&self) -> RateLimiterStats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> RateLimiterStats {
        let can_proceed = self.can_proceed_at(now);
        let w = self.lock();
        RateLimiterStats {
            daily_used: w.daily_count,
            daily_limit: self.daily_limit,
            percent_used: f64::from(w.daily_count) / f64::from(self.daily_limit) * 100.0,
            can_proceed,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RateWindow> {
        // A poisoned lock only means another caller panicked mid-update;
        // the counters are still usable.
        self.window.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MAX_AI_REQUESTS_PER_DAY, MAX_AI_REQUESTS_PER_MINUTE)
    }
}
