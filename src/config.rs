//! Session configuration
//!
//! Before play starts the teacher picks a secret keyword and a grade, writes
//! (or generates) one challenge per keyword letter, imports the class roster
//! and chooses how long each challenge may stay open. This module holds that
//! setup and validates it; a session can only start from a configuration
//! that passes validation.

use std::time::Duration;

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    challenge::Challenge,
    constants::{
        challenge::{DEFAULT_TIME_LIMIT, MAX_TIME_LIMIT, MIN_TIME_LIMIT},
        keyword::MAX_LENGTH as MAX_KEYWORD_LENGTH,
        roster::{MAX_NAME_LENGTH, MAX_PARTICIPANT_COUNT},
    },
    generation::{self, Attachment, GeneratedQuestion, GenerationRequest},
    reveal::keyword_letters,
    roster::clean_names,
};

type ValidationResult = garde::Result;

/// School grade the generated questions are pitched at
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
pub enum Grade {
    /// Tenth grade
    #[default]
    #[serde(rename = "10")]
    #[display("10")]
    Ten,
    /// Eleventh grade
    #[serde(rename = "11")]
    #[display("11")]
    Eleven,
    /// Twelfth grade
    #[serde(rename = "12")]
    #[display("12")]
    Twelve,
}

/// Validates that a duration falls within specified bounds
fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    field: &'static str,
    val: &Duration,
) -> ValidationResult {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "{field} is outside of the bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

fn validate_time_limit(val: &Duration) -> ValidationResult {
    validate_duration::<MIN_TIME_LIMIT, MAX_TIME_LIMIT>("time_limit", val)
}

fn validate_keyword(val: &str) -> ValidationResult {
    if keyword_letters(val).is_empty() {
        Err(garde::Error::new("keyword has no letters"))
    } else {
        Ok(())
    }
}

fn validate_roster(val: &[String]) -> ValidationResult {
    if clean_names(val).is_empty() {
        Err(garde::Error::new("roster has no names"))
    } else {
        Ok(())
    }
}

/// Everything the teacher sets up before a session starts
///
/// The one-to-one link between challenges and keyword letters is checked
/// when the session starts, not by [`Validate`].
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// The secret keyword as typed, whitespace included
    #[garde(length(chars, max = MAX_KEYWORD_LENGTH), custom(|v, _| validate_keyword(v)))]
    keyword: String,
    /// Grade the questions are written for
    #[garde(skip)]
    grade: Grade,
    /// One challenge per keyword letter
    #[garde(dive)]
    challenges: Vec<Challenge>,
    /// Display names of the class
    #[garde(
        length(max = MAX_PARTICIPANT_COUNT),
        inner(length(chars, max = MAX_NAME_LENGTH)),
        custom(|v, _| validate_roster(v))
    )]
    roster: Vec<String>,
    /// How long a challenge stays open before it expires
    #[garde(custom(|v, _| validate_time_limit(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    time_limit: Duration,
}

impl SessionConfig {
    /// Creates a configuration with one blank challenge per keyword letter
    pub fn new(keyword: impl Into<String>) -> Self {
        let mut config = Self {
            keyword: String::new(),
            grade: Grade::default(),
            challenges: Vec::new(),
            roster: Vec::new(),
            time_limit: DEFAULT_TIME_LIMIT,
        };
        config.set_keyword(keyword);
        config
    }

    /// Replaces the keyword and resets the challenges to blanks
    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.keyword = keyword.into();
        self.challenges = (0..self.letters().len()).map(Challenge::blank).collect_vec();
    }

    /// The keyword as typed
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// The keyword letters the challenges are linked to
    pub fn letters(&self) -> Vec<char> {
        keyword_letters(&self.keyword)
    }

    /// Grade the questions are written for
    pub fn grade(&self) -> Grade {
        self.grade
    }

    /// Sets the grade the questions are written for
    pub fn set_grade(&mut self, grade: Grade) {
        self.grade = grade;
    }

    /// The challenges, in keyword order
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    /// Mutable access to one challenge for editing
    pub fn challenge_mut(&mut self, index: usize) -> Option<&mut Challenge> {
        self.challenges.get_mut(index)
    }

    /// Replaces every challenge
    pub fn set_challenges(&mut self, challenges: Vec<Challenge>) {
        self.challenges = challenges;
    }

    /// The roster as imported
    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    /// Replaces the roster, trimming names and dropping blanks
    pub fn set_roster<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.roster = clean_names(names);
    }

    /// How long a challenge stays open
    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Sets how long a challenge stays open
    pub fn set_time_limit(&mut self, time_limit: Duration) {
        self.time_limit = time_limit;
    }

    /// Builds the request for generating this keyword's challenges
    pub fn generation_request(&self, attachment: Option<Attachment>) -> GenerationRequest {
        GenerationRequest {
            keyword: self.keyword.clone(),
            grade: self.grade,
            attachment,
        }
    }

    /// Rebuilds the challenges from generated questions
    ///
    /// Letter `i` takes question `i`, or the first question when fewer were
    /// generated than there are letters. Missing pieces are filled with
    /// placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`generation::Error::GenerationFailed`] if `generated` is
    /// empty. The existing challenges are kept in that case.
    pub fn apply_generated(
        &mut self,
        generated: &[GeneratedQuestion],
    ) -> Result<(), generation::Error> {
        let Some(first) = generated.first() else {
            return Err(generation::Error::GenerationFailed(
                "no questions were generated".to_owned(),
            ));
        };

        self.challenges = self
            .letters()
            .into_iter()
            .enumerate()
            .map(|(position, letter)| {
                generated
                    .get(position)
                    .unwrap_or(first)
                    .to_challenge(letter, position)
            })
            .collect_vec();

        Ok(())
    }
}
