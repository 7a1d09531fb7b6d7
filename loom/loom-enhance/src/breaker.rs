//! Circuit breaker for provider calls.
//!
//! Counts consecutive failures and opens after a threshold. While open, no
//! calls are issued and every payload falls back to its original. After a
//! cooldown the breaker half-opens: one probe call is allowed, and its
//! outcome closes or reopens the circuit. Safe for concurrent use within a
//! job and across jobs.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// A consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    state: Mutex<State>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOLDOWN)
    }
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            state: Mutex::new(State {
                phase: Phase::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Whether a call may be issued right now. An open breaker half-opens
    /// once its cooldown has elapsed, admitting a single probe.
    pub fn call_permitted(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.phase {
            Phase::Closed | Phase::HalfOpen => true,
            Phase::Open => {
                let elapsed = state
                    .opened_at
                    .map(|t| t.elapsed() >= self.cooldown)
                    .unwrap_or(true);
                if elapsed {
                    state.phase = Phase::HalfOpen;
                    tracing::info!("circuit breaker half-open, admitting a probe call");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap();
        if state.phase != Phase::Closed {
            tracing::info!("circuit breaker closed after successful call");
        }
        state.phase = Phase::Closed;
        state.consecutive_failures = 0;
        state.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap();
        state.consecutive_failures += 1;
        let reopen = state.phase == Phase::HalfOpen;
        if reopen || state.consecutive_failures >= self.threshold {
            if state.phase != Phase::Open {
                tracing::warn!(
                    consecutive_failures = state.consecutive_failures,
                    "circuit breaker opened, suppressing provider calls"
                );
            }
            state.phase = Phase::Open;
            state.opened_at = Some(Instant::now());
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().phase == Phase::Open
    }
}
