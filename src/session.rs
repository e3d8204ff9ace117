//! Presentation hooks
//!
//! This module defines the trait through which the game reports what just
//! happened to whatever is presenting it: sound effects, confetti, status
//! banners. The game never depends on how, or whether, a notification is
//! rendered.

use std::time::Duration;

use crate::{challenge::ChallengeId, reveal::RevealEvent, roster::Participant};

/// Receiver of the named events the game emits
///
/// Methods take `&self` so one sink can be shared with the rendering side;
/// implementations that record state use interior mutability.
pub trait NotificationSink {
    /// The spinner settled on `participant`
    fn selected(&self, participant: &Participant);

    /// A countdown step left `remaining` on the clock, at or under the
    /// low-time threshold
    fn tick_low(&self, challenge: ChallengeId, remaining: Duration);

    /// A correct answer revealed a keyword letter
    fn revealed(&self, event: &RevealEvent);

    /// The last letter of the keyword was revealed
    fn completed(&self);

    /// An incorrect option was submitted; the challenge stays open
    fn wrong_attempt(&self, challenge: ChallengeId, option: usize);

    /// The countdown for `challenge` ran out
    fn expired(&self, challenge: ChallengeId);

    /// The completed session was finalized
    ///
    /// The default implementation ignores the event.
    fn finalized(&self, _keyword: &[char]) {}
}

/// A sink that drops every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl NotificationSink for Silent {
    fn selected(&self, _participant: &Participant) {}

    fn tick_low(&self, _challenge: ChallengeId, _remaining: Duration) {}

    fn revealed(&self, _event: &RevealEvent) {}

    fn completed(&self) {}

    fn wrong_attempt(&self, _challenge: ChallengeId, _option: usize) {}

    fn expired(&self, _challenge: ChallengeId) {}
}
