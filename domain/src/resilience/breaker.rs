//! Per-tool circuit breaker state machine.
//!
//! Pure logic: every method takes `now` explicitly, so the machine can be
//! driven deterministically in tests. Serialisation of concurrent callers is
//! the owner's job (the application's breaker bank holds one mutex per tool).
//!
//! ```text
//!            failures >= threshold
//!   Closed ─────────────────────────▶ Open
//!     ▲                               │  ▲
//!     │ trial succeeds     cooldown   │  │ trial fails
//!     │                    elapsed    ▼  │
//!     └──────────────────────────── HalfOpen
//! ```
//!
//! HalfOpen admits exactly one trial call; callers arriving while the trial
//! is in flight are rejected as if the breaker were open.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[default]
    Closed, // Normal operation, allow all calls
    Open,     // Failing, reject all calls immediately
    HalfOpen, // Testing, allow a single trial call
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thresholds shared by every breaker in a bank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakerPolicy {
    /// Consecutive failures that open a closed breaker
    pub failure_threshold: u32,
    /// Time an open breaker rejects calls before admitting a trial
    pub cooldown: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

impl BreakerPolicy {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }
}

/// Outcome of asking a breaker for permission to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Closed: call passes through.
    Allowed,
    /// HalfOpen: this caller holds the single trial slot.
    Trial,
    /// Open, or a trial is already in flight.
    Rejected { retry_after: Option<Duration> },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Admission::Rejected { .. })
    }
}

/// State of one tool's breaker.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    open_since: Option<Instant>,
    trial_in_flight: bool,
    times_opened: u32,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn times_opened(&self) -> u32 {
        self.times_opened
    }

    pub fn trial_in_flight(&self) -> bool {
        self.trial_in_flight
    }

    /// Ask permission for one call.
    ///
    /// An Open breaker whose cooldown has elapsed moves to HalfOpen and hands
    /// the trial slot to this caller before the call executes.
    pub fn admit(&mut self, policy: &BreakerPolicy, now: Instant) -> Admission {
        match self.state {
            CircuitState::Closed => Admission::Allowed,
            CircuitState::Open => match self.remaining_cooldown(policy, now) {
                Some(remaining) => Admission::Rejected {
                    retry_after: Some(remaining),
                },
                None => {
                    self.state = CircuitState::HalfOpen;
                    self.trial_in_flight = true;
                    Admission::Trial
                }
            },
            CircuitState::HalfOpen => {
                if self.trial_in_flight {
                    Admission::Rejected { retry_after: None }
                } else {
                    self.trial_in_flight = true;
                    Admission::Trial
                }
            }
        }
    }

    /// Record a successful call made under `admission`.
    ///
    /// - HalfOpen -> Closed, counter reset (trial holder only)
    /// - Closed -> Closed, counter reset (failures are consecutive)
    /// - Open: ignored; a straggler admitted before the breaker opened
    ///   cannot close it, only a trial can
    pub fn record_success(&mut self, admission: Admission) {
        if !self.accepts(admission) {
            return;
        }
        match self.state {
            CircuitState::HalfOpen => {
                self.state = CircuitState::Closed;
                self.consecutive_failures = 0;
                self.last_failure = None;
                self.open_since = None;
                self.trial_in_flight = false;
            }
            CircuitState::Closed => {
                self.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call made under `admission`.
    ///
    /// - Closed -> Open once the threshold is reached
    /// - HalfOpen -> Open, cooldown restarts (trial holder only)
    /// - Open: counter and timestamp only
    pub fn record_failure(&mut self, admission: Admission, policy: &BreakerPolicy, now: Instant) {
        if !self.accepts(admission) {
            return;
        }
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure = Some(now);

        match self.state {
            CircuitState::Closed => {
                if self.consecutive_failures >= policy.failure_threshold {
                    self.open(now);
                }
            }
            CircuitState::HalfOpen => self.open(now),
            CircuitState::Open => {}
        }
    }

    /// While HalfOpen only the trial's outcome decides; calls admitted before
    /// the breaker opened finish without effect.
    fn accepts(&self, admission: Admission) -> bool {
        match admission {
            Admission::Rejected { .. } => false,
            Admission::Allowed => self.state != CircuitState::HalfOpen,
            Admission::Trial => true,
        }
    }

    /// Give back a trial slot whose call produced no verdict about the
    /// dependency (e.g. the handler rejected the caller's input).
    pub fn release_trial(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.trial_in_flight = false;
        }
    }

    /// Let the next call through early once the dependency is known to be
    /// healthy again. Only applies to an Open breaker past its cooldown.
    pub fn force_half_open(&mut self, policy: &BreakerPolicy, now: Instant) -> bool {
        if self.state == CircuitState::Open && self.remaining_cooldown(policy, now).is_none() {
            self.state = CircuitState::HalfOpen;
            self.trial_in_flight = false;
            true
        } else {
            false
        }
    }

    /// Operator reset to Closed.
    pub fn reset(&mut self) {
        *self = Self {
            times_opened: self.times_opened,
            ..Self::default()
        };
    }

    /// Time left before an Open breaker admits a trial.
    pub fn remaining_cooldown(&self, policy: &BreakerPolicy, now: Instant) -> Option<Duration> {
        if self.state != CircuitState::Open {
            return None;
        }
        let opened = self.open_since?;
        let elapsed = now.saturating_duration_since(opened);
        policy.cooldown.checked_sub(elapsed).filter(|d| !d.is_zero())
    }

    pub fn snapshot(&self, tool_id: &str, policy: &BreakerPolicy, now: Instant) -> BreakerSnapshot {
        BreakerSnapshot {
            tool_id: tool_id.to_string(),
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            times_opened: self.times_opened,
            trial_in_flight: self.trial_in_flight,
            open_for_ms: self
                .open_since
                .filter(|_| self.state != CircuitState::Closed)
                .map(|since| now.saturating_duration_since(since).as_millis() as u64),
            retry_after_ms: self
                .remaining_cooldown(policy, now)
                .map(|d| d.as_millis() as u64),
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.open_since = Some(now);
        self.trial_in_flight = false;
        self.times_opened = self.times_opened.saturating_add(1);
    }
}

/// Read model of one breaker for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub tool_id: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub times_opened: u32,
    pub trial_in_flight: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_for_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}
