//! Challenges: the multiple choice questions that unlock keyword letters
//!
//! Every challenge carries exactly four options and is linked to one letter
//! position of the secret keyword. Challenges are written (or generated)
//! while the session is being configured and are immutable once play starts.

use std::{fmt::Display, str::FromStr};

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

use crate::constants::challenge::{
    LAST_OPTION_INDEX, MAX_OPTION_LENGTH, MAX_PROMPT_LENGTH, MIN_PROMPT_LENGTH, OPTION_COUNT,
};

/// A unique identifier for a challenge
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct ChallengeId(Uuid);

impl ChallengeId {
    /// Creates a new random challenge ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChallengeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ChallengeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ChallengeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// One multiple choice question tied to one keyword letter position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Challenge {
    /// Identity of the challenge within the session
    #[garde(skip)]
    pub id: ChallengeId,
    /// The question shown to the class
    #[garde(length(chars, min = MIN_PROMPT_LENGTH, max = MAX_PROMPT_LENGTH))]
    pub prompt: String,
    /// The answer options, in display order
    #[garde(length(equal = OPTION_COUNT), inner(length(chars, max = MAX_OPTION_LENGTH)))]
    pub options: Vec<String>,
    /// Index of the correct entry in `options`
    #[garde(range(max = LAST_OPTION_INDEX))]
    pub correct_option: usize,
    /// Index of the keyword letter this challenge reveals
    #[garde(skip)]
    pub linked_position: usize,
}

impl Challenge {
    /// Creates a challenge with a fresh identity
    pub fn new(
        prompt: impl Into<String>,
        options: [String; OPTION_COUNT],
        correct_option: usize,
        linked_position: usize,
    ) -> Self {
        Self {
            id: ChallengeId::new(),
            prompt: prompt.into(),
            options: options.into(),
            correct_option,
            linked_position,
        }
    }

    /// Creates an empty challenge for the teacher to fill in
    pub fn blank(linked_position: usize) -> Self {
        Self::new("", Default::default(), 0, linked_position)
    }

    /// Returns `true` if `option` is the index of the correct answer
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_option
    }
}
