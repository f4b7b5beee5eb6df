// =============================================================================
// RATE LIMITER - Fixed-window admission control for Gemini calls
// =============================================================================
//
// Every model call (chat, stream, embed-widget) goes through this gate so the
// service stays inside the Gemini free-tier quota. The window is fixed, not
// sliding: the counter resets when a full window has elapsed since the first
// request of the current window.
//
// State lives behind a Mutex so the check-then-increment sequence is atomic
// under concurrent requests. Nothing is persisted; a process restart opens a
// fresh window.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tunables for the admission window.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Length of the fixed window.
    pub window: Duration,
    /// Maximum accepted requests per window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            // One hour / 60 requests tracks the Gemini free-tier budget.
            window: Duration::from_millis(60 * 60 * 1000),
            max_requests: 60,
        }
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub can_proceed: bool,
    /// How long until the current window expires. Zero when admitted.
    pub time_to_wait: Duration,
}

struct WindowState {
    request_count: u32,
    window_start: Instant,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<WindowState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(WindowState {
                request_count: 0,
                window_start: Instant::now(),
            }),
        }
    }

    /// Checks whether a request may proceed, counting it if so.
    ///
    /// Rejected requests are not queued and do not increment the counter;
    /// the caller is expected to surface `time_to_wait` to the client.
    pub fn check(&self) -> RateLimitDecision {
        self.check_at(Instant::now())
    }

    /// Remaining budget in the current window.
    pub fn remaining_requests(&self) -> u32 {
        let state = self.lock_state();
        self.config.max_requests.saturating_sub(state.request_count)
    }

    /// Renders a wait duration for user-facing messages, e.g. "12 minutes".
    pub fn format_time_to_wait(time_to_wait: Duration) -> String {
        let minutes = (time_to_wait.as_millis() as f64 / 60_000.0).ceil() as u64;
        let minutes = minutes.max(1);
        if minutes == 1 {
            "1 minute".to_string()
        } else {
            format!("{} minutes", minutes)
        }
    }

    fn check_at(&self, now: Instant) -> RateLimitDecision {
        let mut state = self.lock_state();

        let elapsed = now.saturating_duration_since(state.window_start);

        // Open a fresh window once the previous one has fully elapsed.
        if elapsed >= self.config.window {
            state.request_count = 0;
            state.window_start = now;
        }

        if state.request_count >= self.config.max_requests {
            let elapsed = now.saturating_duration_since(state.window_start);
            return RateLimitDecision {
                can_proceed: false,
                time_to_wait: self.config.window.saturating_sub(elapsed),
            };
        }

        state.request_count += 1;
        RateLimitDecision {
            can_proceed: true,
            time_to_wait: Duration::ZERO,
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, WindowState> {
        // A poisoned lock only means another thread panicked mid-check; the
        // counter itself is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
