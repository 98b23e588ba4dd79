use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClockError {
    #[error("session clock already started")]
    AlreadyStarted,

    #[error("time limit must be greater than zero")]
    ZeroTimeLimit,
}

/// Signal produced by [`SessionClock::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// One unit elapsed; `remaining` seconds are left.
    Tick { remaining: u32 },
    /// The countdown reached zero. Emitted exactly once per clock.
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockState {
    Idle,
    Running,
    Expired,
    Cancelled,
}

/// Single countdown for one session.
///
/// The clock does not own a timer: something else calls [`tick`](Self::tick) on a
/// fixed cadence. Once `Timeout` has been returned, or after [`cancel`](Self::cancel),
/// every further tick is a no-op and `remaining_seconds` stays frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClock {
    state: ClockState,
    time_limit_seconds: u32,
    remaining_seconds: u32,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ClockState::Idle,
            time_limit_seconds: 0,
            remaining_seconds: 0,
        }
    }

    /// Begin counting down from `time_limit_seconds`.
    ///
    /// # Errors
    ///
    /// Returns `ClockError::AlreadyStarted` if the clock left `Idle`, or
    /// `ClockError::ZeroTimeLimit` for a zero budget.
    pub fn start(&mut self, time_limit_seconds: u32) -> Result<(), ClockError> {
        if self.state != ClockState::Idle {
            return Err(ClockError::AlreadyStarted);
        }
        if time_limit_seconds == 0 {
            return Err(ClockError::ZeroTimeLimit);
        }
        self.time_limit_seconds = time_limit_seconds;
        self.remaining_seconds = time_limit_seconds;
        self.state = ClockState::Running;
        Ok(())
    }

    /// Advance the countdown by one unit.
    ///
    /// Returns `None` when the clock is not running.
    pub fn tick(&mut self) -> Option<ClockEvent> {
        if self.state != ClockState::Running {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.state = ClockState::Expired;
            return Some(ClockEvent::Timeout);
        }
        Some(ClockEvent::Tick {
            remaining: self.remaining_seconds,
        })
    }

    /// Stop all future ticks. Safe from any state, including after timeout.
    pub fn cancel(&mut self) {
        if matches!(self.state, ClockState::Idle | ClockState::Running) {
            self.state = ClockState::Cancelled;
        }
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn time_limit_seconds(&self) -> u32 {
        self.time_limit_seconds
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.time_limit_seconds - self.remaining_seconds
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    #[must_use]
    pub fn has_timed_out(&self) -> bool {
        self.state == ClockState::Expired
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state == ClockState::Cancelled
    }

    /// Running with at most `threshold_secs` left.
    #[must_use]
    pub fn is_low_on_time(&self, threshold_secs: u32) -> bool {
        self.is_running() && self.remaining_seconds <= threshold_secs
    }
}
