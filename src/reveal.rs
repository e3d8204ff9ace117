//! Keyword reveal ledger
//!
//! This module tracks which letters of the secret keyword have been unlocked.
//! Letter positions are canonical keyword indices; any shuffled on-screen
//! arrangement is a presentation concern and never reaches the ledger.

use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::challenge::{Challenge, ChallengeId};

/// Turns a keyword as typed into its letter sequence
///
/// Whitespace is dropped and letters are upper-cased.
pub fn keyword_letters(keyword: &str) -> Vec<char> {
    keyword
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect_vec()
}

/// Errors raised by the reveal ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Challenges do not map one-to-one onto keyword positions
    #[error("challenges do not map one-to-one onto the keyword: {0}")]
    MappingMismatch(MappingMismatch),
    /// The challenge is not part of this session
    #[error("unknown challenge {0}")]
    UnknownChallenge(ChallengeId),
}

/// The way a challenge set fails to cover the keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum MappingMismatch {
    /// The number of challenges differs from the number of letters
    #[display("{challenges} challenges for {letters} letters")]
    Count {
        /// Number of challenges supplied
        challenges: usize,
        /// Number of keyword letters
        letters: usize,
    },
    /// A challenge points past the end of the keyword
    #[display("position {_0} is out of range")]
    OutOfRange(usize),
    /// Two challenges point at the same letter
    #[display("position {_0} is linked more than once")]
    Duplicate(usize),
    /// Two challenges share an identity
    #[display("challenge {_0} appears more than once")]
    DuplicateId(ChallengeId),
}

/// Outcome of marking a challenge answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevealEvent {
    /// The challenge that was answered
    pub challenge: ChallengeId,
    /// Canonical keyword index that was revealed
    pub position: usize,
    /// The letter at that position
    pub letter: char,
    /// Whether this call revealed the letter (`false` on repeats)
    pub changed: bool,
    /// Whether every letter is now revealed
    pub complete: bool,
}

/// Progress through the session's challenges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    /// Number of distinct challenges answered correctly
    pub answered: usize,
    /// Number of challenges in the session
    pub total: usize,
    /// Whether every challenge has been answered
    pub is_complete: bool,
}

/// Revealed-letter state for one keyword
///
/// Slot `i` is revealed exactly when the challenge linked to position `i`
/// has been answered correctly at least once. Slots never un-reveal.
#[derive(Debug, Clone)]
pub struct RevealLedger {
    letters: Vec<char>,
    revealed: Vec<Option<char>>,
    positions: HashMap<ChallengeId, usize>,
    /// Events of answered challenges, in answer order
    answered: Vec<RevealEvent>,
}

impl RevealLedger {
    /// Builds a ledger, checking that `challenges` cover `letters` one-to-one
    ///
    /// # Errors
    ///
    /// Returns [`Error::MappingMismatch`] if the counts differ, a position is
    /// out of range, two challenges share a position, or two challenges
    /// share an identity. No ledger is built in that case.
    pub fn new(letters: Vec<char>, challenges: &[Challenge]) -> Result<Self, Error> {
        if challenges.len() != letters.len() {
            return Err(Error::MappingMismatch(MappingMismatch::Count {
                challenges: challenges.len(),
                letters: letters.len(),
            }));
        }

        if let Some(challenge) = challenges
            .iter()
            .find(|challenge| challenge.linked_position >= letters.len())
        {
            return Err(Error::MappingMismatch(MappingMismatch::OutOfRange(
                challenge.linked_position,
            )));
        }

        if let Some(position) = challenges
            .iter()
            .map(|challenge| challenge.linked_position)
            .duplicates()
            .next()
        {
            return Err(Error::MappingMismatch(MappingMismatch::Duplicate(position)));
        }

        if let Some(id) = challenges
            .iter()
            .map(|challenge| challenge.id)
            .duplicates()
            .next()
        {
            return Err(Error::MappingMismatch(MappingMismatch::DuplicateId(id)));
        }

        Ok(Self {
            revealed: vec![None; letters.len()],
            positions: challenges
                .iter()
                .map(|challenge| (challenge.id, challenge.linked_position))
                .collect(),
            letters,
            answered: Vec::new(),
        })
    }

    /// Reveals the letter linked to `challenge`
    ///
    /// Marking an already answered challenge again changes nothing and
    /// returns the earlier event with `changed` set to `false`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownChallenge`] if the challenge is not part of
    /// this ledger.
    pub fn mark_answered(&mut self, challenge: ChallengeId) -> Result<RevealEvent, Error> {
        if let Some(previous) = self.event(challenge) {
            return Ok(RevealEvent {
                changed: false,
                ..previous
            });
        }

        let position = *self
            .positions
            .get(&challenge)
            .ok_or(Error::UnknownChallenge(challenge))?;
        let letter = self.letters[position];
        self.revealed[position] = Some(letter);

        let event = RevealEvent {
            challenge,
            position,
            letter,
            changed: true,
            complete: self.answered.len() + 1 == self.positions.len(),
        };
        self.answered.push(event);

        tracing::debug!(%challenge, position, complete = event.complete, "letter revealed");

        Ok(event)
    }

    /// The event recorded when `challenge` was first answered
    pub fn event(&self, challenge: ChallengeId) -> Option<RevealEvent> {
        self.answered
            .iter()
            .find(|event| event.challenge == challenge)
            .copied()
    }

    /// Returns `true` if `challenge` has been answered
    pub fn is_answered(&self, challenge: ChallengeId) -> bool {
        self.event(challenge).is_some()
    }

    /// Snapshot of every slot, `None` for letters still hidden
    pub fn current_display(&self) -> Vec<Option<char>> {
        self.revealed.clone()
    }

    /// Answered challenges in the order they were answered
    pub fn answer_order(&self) -> Vec<ChallengeId> {
        self.answered.iter().map(|event| event.challenge).collect_vec()
    }

    /// The full letter sequence
    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    /// Returns `true` once every letter is revealed
    pub fn is_complete(&self) -> bool {
        self.answered.len() == self.positions.len()
    }

    /// Counts of answered and total challenges
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            answered: self.answered.len(),
            total: self.positions.len(),
            is_complete: self.is_complete(),
        }
    }
}
