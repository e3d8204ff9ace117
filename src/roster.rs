//! Participant roster and eligible pool
//!
//! This module keeps the canonical list of participants imported for a
//! session together with the shrinking subset that is still eligible to be
//! picked by the spinner. Participants are tracked by an identity assigned
//! at import time, so two students sharing a display name remain two
//! distinct selectable entries.

use std::{fmt::Display, str::FromStr};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

/// A unique identifier for a participant within a roster
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Creates a new random participant ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ParticipantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A single roster entry: an identity and the name shown on the wheel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identity assigned when the roster was seeded
    pub id: ParticipantId,
    /// Display name, not necessarily unique
    pub name: String,
}

impl Participant {
    /// Creates a participant with a fresh identity
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(),
            name: name.into(),
        }
    }
}

impl Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Errors that can occur while seeding or shrinking the roster
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The supplied names contained no usable entry
    #[error("roster is empty")]
    InvalidRoster,
    /// The participant is not in the eligible pool
    #[error("participant {0} is not eligible")]
    NotFound(ParticipantId),
}

/// Trims every name and drops the ones left blank
pub fn clean_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().trim().to_owned())
        .filter(|name| !name.is_empty())
        .collect_vec()
}

/// The canonical participant list and its eligible subset
///
/// The full list is never destroyed during a session; only the eligible
/// pool shrinks, one participant per spinner win. Both keep insertion order.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RosterPool {
    /// Every participant imported for the session
    full: Vec<Participant>,
    /// Participants not yet picked by the spinner
    eligible: Vec<Participant>,
}

impl RosterPool {
    /// Creates a roster from display names
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRoster`] if no name is left after trimming.
    pub fn new<I, S>(names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pool = Self::default();
        pool.seed(names)?;
        Ok(pool)
    }

    /// Replaces both the full list and the eligible pool
    ///
    /// Each name gets a new identity. On failure the current roster is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRoster`] if no name is left after trimming.
    pub fn seed<I, S>(&mut self, names: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let participants = clean_names(names)
            .into_iter()
            .map(Participant::new)
            .collect_vec();

        if participants.is_empty() {
            return Err(Error::InvalidRoster);
        }

        self.eligible.clone_from(&participants);
        self.full = participants;

        Ok(())
    }

    /// Makes every participant of the full list eligible again
    ///
    /// Identities are kept, so a participant picked before the reseed is the
    /// same participant afterwards.
    pub fn reseed(&mut self) {
        self.eligible.clone_from(&self.full);
    }

    /// The participants still eligible, in insertion order
    pub fn eligible(&self) -> &[Participant] {
        &self.eligible
    }

    /// Every participant imported for the session, in insertion order
    pub fn full(&self) -> &[Participant] {
        &self.full
    }

    /// Removes exactly one participant from the eligible pool
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the participant is not eligible. The
    /// pool is unchanged in that case.
    pub fn remove(&mut self, id: ParticipantId) -> Result<Participant, Error> {
        let position = self
            .eligible
            .iter()
            .position(|participant| participant.id == id)
            .ok_or(Error::NotFound(id))?;

        Ok(self.eligible.remove(position))
    }

    /// Returns `true` once nobody is left to pick
    pub fn is_exhausted(&self) -> bool {
        self.eligible.is_empty()
    }
}
