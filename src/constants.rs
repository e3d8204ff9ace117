//! Configuration constants for the Orchard game system
//!
//! This module contains the limits and timings used throughout the game
//! system, grouped by the component that enforces them.

/// Spinner wheel constants
pub mod spinner {
    use std::time::Duration;

    /// Minimum number of full turns added to a spin
    pub const MIN_FULL_TURNS: u32 = 10;
    /// Maximum number of full turns added to a spin (inclusive)
    pub const MAX_FULL_TURNS: u32 = 15;
    /// Length of the spin animation, from start to rest
    pub const SPIN_DURATION: Duration = Duration::from_millis(5000);
    /// Degrees in one full turn of the wheel
    pub const FULL_TURN_DEGREES: f64 = 360.;
}

/// Challenge (multiple choice question) constants
pub mod challenge {
    use std::time::Duration;

    /// Number of answer options every challenge carries
    pub const OPTION_COUNT: usize = 4;
    /// Highest valid index into a challenge's options
    pub const LAST_OPTION_INDEX: usize = OPTION_COUNT - 1;
    /// Minimum length of a challenge prompt
    pub const MIN_PROMPT_LENGTH: usize = 3;
    /// Maximum length of a challenge prompt
    pub const MAX_PROMPT_LENGTH: usize = 200;
    /// Maximum length of a single answer option
    pub const MAX_OPTION_LENGTH: usize = 200;
    /// Minimum time limit in seconds for answering a challenge
    pub const MIN_TIME_LIMIT: u64 = 5;
    /// Maximum time limit in seconds for answering a challenge
    pub const MAX_TIME_LIMIT: u64 = 240;
    /// Default time limit for answering a challenge
    pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(30);
    /// Interval between two countdown ticks
    pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
    /// Remaining time at or below which every tick raises a low-time signal
    pub const LOW_TIME_THRESHOLD: Duration = Duration::from_secs(6);
}

/// Secret keyword constants
pub mod keyword {
    /// Maximum length of the keyword as typed, whitespace included
    pub const MAX_LENGTH: usize = 40;
}

/// Roster constants
pub mod roster {
    /// Maximum number of participants in a single roster
    pub const MAX_PARTICIPANT_COUNT: usize = 200;
    /// Maximum length of a participant display name
    pub const MAX_NAME_LENGTH: usize = 100;
}

/// External content generation constants
pub mod generation {
    use std::time::Duration;

    /// Number of retries after the first attempt hits a quota limit
    pub const MAX_RETRIES: u32 = 2;
    /// Delay before the first retry, doubled for every following retry
    pub const INITIAL_BACKOFF: Duration = Duration::from_millis(3000);
}
