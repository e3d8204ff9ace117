//! Countdown for the challenge currently on screen
//!
//! Only one challenge is presented at a time, so there is a single timer for
//! the whole session. It is driven by an external one-second tick and runs
//! `Armed -> Ticking -> {Expired | Cancelled}`. Running out of time counts as
//! a failed attempt with no option selected.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    challenge::ChallengeId,
    constants::challenge::{LOW_TIME_THRESHOLD, TICK_INTERVAL},
};

/// Errors raised by the challenge timer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Another challenge is already being timed
    #[error("challenge {0} is already active")]
    AlreadyArmed(ChallengeId),
}

/// Lifecycle of the countdown
#[serde_with::serde_as]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    /// No challenge has been armed since the session started
    #[default]
    Idle,
    /// Armed, waiting for the first tick
    Armed {
        /// The challenge being timed
        challenge: ChallengeId,
        /// Full time allowed for the challenge
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        duration: Duration,
    },
    /// Counting down
    Ticking {
        /// The challenge being timed
        challenge: ChallengeId,
        /// Time left before expiry
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
    },
    /// Ran out of time
    Expired {
        /// The challenge that ran out of time
        challenge: ChallengeId,
    },
    /// Stopped before running out
    Cancelled {
        /// The challenge whose countdown was stopped
        challenge: ChallengeId,
    },
}

/// Identifies one armed countdown
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerHandle {
    /// The challenge being timed
    pub challenge: ChallengeId,
    /// Full time allowed for the challenge
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub duration: Duration,
}

/// Result of one countdown step
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tick {
    /// The challenge being timed
    pub challenge: ChallengeId,
    /// Time left after this step
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub remaining: Duration,
    /// Whether this step raised the low-time signal
    pub low_time: bool,
    /// Whether this step ran the countdown out
    pub expired: bool,
}

/// The single countdown shared by all challenges of a session
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ChallengeTimer {
    state: State,
}

impl ChallengeTimer {
    /// Creates an idle timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of the countdown
    pub fn state(&self) -> State {
        self.state
    }

    /// The challenge currently counting down, if any
    pub fn active_challenge(&self) -> Option<ChallengeId> {
        match self.state {
            State::Armed { challenge, .. } | State::Ticking { challenge, .. } => Some(challenge),
            State::Idle | State::Expired { .. } | State::Cancelled { .. } => None,
        }
    }

    /// Time left on the active countdown, if any
    pub fn remaining(&self) -> Option<Duration> {
        match self.state {
            State::Armed { duration, .. } => Some(duration),
            State::Ticking { remaining, .. } => Some(remaining),
            State::Idle | State::Expired { .. } | State::Cancelled { .. } => None,
        }
    }

    /// Starts timing `challenge`
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyArmed`] if a countdown is still running. The
    /// running countdown is not affected.
    pub fn arm(&mut self, challenge: ChallengeId, duration: Duration) -> Result<TimerHandle, Error> {
        if let Some(active) = self.active_challenge() {
            return Err(Error::AlreadyArmed(active));
        }

        self.state = State::Armed {
            challenge,
            duration,
        };

        Ok(TimerHandle {
            challenge,
            duration,
        })
    }

    /// Advances the countdown by one tick interval
    ///
    /// Every step that leaves between one second and the low-time threshold
    /// on the clock raises `low_time`. The step that reaches zero moves the
    /// timer to [`State::Expired`] and raises `expired` instead. Returns
    /// `None` when no countdown is running.
    pub fn tick(&mut self) -> Option<Tick> {
        let (challenge, remaining) = match self.state {
            State::Armed {
                challenge,
                duration,
            } => (challenge, duration),
            State::Ticking {
                challenge,
                remaining,
            } => (challenge, remaining),
            State::Idle | State::Expired { .. } | State::Cancelled { .. } => return None,
        };

        let remaining = remaining.saturating_sub(TICK_INTERVAL);

        if remaining.is_zero() {
            self.state = State::Expired { challenge };

            return Some(Tick {
                challenge,
                remaining,
                low_time: false,
                expired: true,
            });
        }

        self.state = State::Ticking {
            challenge,
            remaining,
        };

        Some(Tick {
            challenge,
            remaining,
            low_time: remaining <= LOW_TIME_THRESHOLD,
            expired: false,
        })
    }

    /// Stops the running countdown
    ///
    /// Safe to call in any state. Returns `true` if a countdown was running
    /// and is now [`State::Cancelled`]; terminal and idle states are left
    /// as they are.
    pub fn cancel(&mut self) -> bool {
        match self.active_challenge() {
            Some(challenge) => {
                self.state = State::Cancelled { challenge };
                true
            }
            None => false,
        }
    }
}
