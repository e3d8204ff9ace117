//! Core game logic and state management
//!
//! This module contains the game session: it ties the roster, the spinner,
//! the reveal ledger and the challenge timer together. A round goes
//!
//! 1. spin the wheel and settle on a student, who leaves the eligible pool;
//! 2. open a challenge, which starts the countdown;
//! 3. a correct answer reveals the linked letter and ends the round, a wrong
//!    one leaves the challenge open, and running out of time closes it
//!    unanswered;
//!
//! until every letter is revealed and the session can be finalized.
//!
//! All handlers run on the caller's single control path and are safe against
//! repeated events such as a double-clicked spin button or a double-submitted
//! answer: repeats are rejected or ignored rather than applied twice.

use std::time::Duration;

use fastrand::Rng;
use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::Instant;

use crate::{
    challenge::{Challenge, ChallengeId},
    config::SessionConfig,
    reveal::{self, RevealEvent, RevealLedger, SessionProgress},
    roster::{self, Participant, RosterPool},
    session::NotificationSink,
    spinner::{self, SpinFrame, SpinHandle, SpinnerEngine},
    timer::{self, ChallengeTimer, Tick, TimerHandle},
};

/// Represents the current phase of the session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Challenges are being played
    #[default]
    Playing,
    /// Every letter is revealed, waiting for the finale
    Completed,
    /// The finale has been shown
    Finalized,
}

/// Errors returned by the game session
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration did not pass validation
    #[error("invalid session configuration: {0}")]
    InvalidConfig(#[from] garde::Report),
    /// Roster failure
    #[error(transparent)]
    Roster(#[from] roster::Error),
    /// Spinner failure
    #[error(transparent)]
    Spinner(#[from] spinner::Error),
    /// Reveal ledger failure
    #[error(transparent)]
    Reveal(#[from] reveal::Error),
    /// Countdown failure
    #[error(transparent)]
    Timer(#[from] timer::Error),
    /// No challenge exists at the index
    #[error("no challenge at index {0}")]
    UnknownChallenge(usize),
    /// The challenge was already answered correctly
    #[error("challenge {0} has already been answered")]
    AlreadyAnswered(ChallengeId),
    /// Every letter is already revealed
    #[error("the session is complete")]
    SessionFinished,
}

/// What an answer submission did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnswerOutcome {
    /// The answer was correct and revealed a letter
    Correct(RevealEvent),
    /// The answer was wrong; the challenge stays open
    Wrong {
        /// The option that was submitted
        option: usize,
    },
    /// No challenge was open, or the option does not exist
    Ignored,
}

/// A running session
#[derive(Debug)]
pub struct Game {
    challenges: Vec<Challenge>,
    time_limit: Duration,
    roster: RosterPool,
    spinner: SpinnerEngine,
    ledger: RevealLedger,
    timer: ChallengeTimer,
    /// The student picked by the last spin, until their round ends
    current_pick: Option<Participant>,
    /// Random arrangement of letter positions for display
    display_order: Vec<usize>,
    phase: Phase,
}

impl Game {
    /// Starts a session from a configuration
    ///
    /// # Errors
    ///
    /// Fails without building a session if the roster is empty, if the
    /// challenges do not map one-to-one onto the keyword letters, or if the
    /// configuration does not validate.
    pub fn start(config: &SessionConfig) -> Result<Self, Error> {
        Self::start_with_rng(config, Rng::new())
    }

    /// Starts a session drawing all randomness from `rng`
    ///
    /// # Errors
    ///
    /// See [`Game::start`].
    pub fn start_with_rng(config: &SessionConfig, mut rng: Rng) -> Result<Self, Error> {
        let roster = RosterPool::new(config.roster())?;
        let ledger = RevealLedger::new(config.letters(), config.challenges())?;
        config.validate()?;

        let mut display_order = (0..ledger.letters().len()).collect_vec();
        rng.shuffle(&mut display_order);

        tracing::info!(
            letters = display_order.len(),
            participants = roster.full().len(),
            "session started"
        );

        Ok(Self {
            challenges: config.challenges().to_vec(),
            time_limit: config.time_limit(),
            roster,
            spinner: SpinnerEngine::with_rng(rng.fork()),
            ledger,
            timer: ChallengeTimer::new(),
            current_pick: None,
            display_order,
            phase: Phase::Playing,
        })
    }

    /// Current phase of the session
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The keyword letters
    pub fn letters(&self) -> &[char] {
        self.ledger.letters()
    }

    /// The challenges, in keyword order
    pub fn challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    /// The roster and its eligible pool
    pub fn roster(&self) -> &RosterPool {
        &self.roster
    }

    /// The student picked by the last spin, if their round is still running
    pub fn current_pick(&self) -> Option<&Participant> {
        self.current_pick.as_ref()
    }

    /// Revealed letters by canonical position, `None` where still hidden
    pub fn display(&self) -> Vec<Option<char>> {
        self.ledger.current_display()
    }

    /// Letter positions in the order they are laid out on screen
    pub fn display_order(&self) -> &[usize] {
        &self.display_order
    }

    /// Answered and total challenge counts
    pub fn progress(&self) -> SessionProgress {
        self.ledger.progress()
    }

    /// Answered challenges in the order they were answered
    pub fn answer_order(&self) -> Vec<ChallengeId> {
        self.ledger.answer_order()
    }

    /// Returns `true` if the challenge at `index` has been answered
    pub fn is_answered(&self, index: usize) -> bool {
        self.challenges
            .get(index)
            .is_some_and(|challenge| self.ledger.is_answered(challenge.id))
    }

    /// Index of the challenge currently open, if any
    pub fn active_challenge(&self) -> Option<usize> {
        let active = self.timer.active_challenge()?;
        self.challenges
            .iter()
            .position(|challenge| challenge.id == active)
    }

    /// Time left on the open challenge, if any
    pub fn remaining_time(&self) -> Option<Duration> {
        self.timer.remaining()
    }

    /// Phase of the spinner
    pub fn spinner_phase(&self) -> spinner::Phase {
        self.spinner.phase()
    }

    /// Starts a new selection round by spinning the wheel
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionFinished`] once every letter is revealed,
    /// [`spinner::Error::AlreadySpinning`] while a spin is in progress and
    /// [`spinner::Error::EmptyPool`] when everyone has been picked.
    pub fn spin(&mut self, now: Instant) -> Result<SpinHandle, Error> {
        if self.phase != Phase::Playing {
            return Err(Error::SessionFinished);
        }

        let handle = self
            .spinner
            .start_spin(self.roster.eligible(), now)
            .inspect_err(|error| tracing::debug!(%error, "spin request ignored"))?;
        self.current_pick = None;

        Ok(handle)
    }

    /// Frame of the spin in progress at `now`
    pub fn spin_frame(&self, now: Instant) -> Option<SpinFrame> {
        self.spinner.advance(now)
    }

    /// Commits the winner once the spin animation has played out
    ///
    /// The winner leaves the eligible pool and becomes the current pick.
    /// Returns the winner once per spin and `None` otherwise. A spin that
    /// settles after the last letter was revealed is discarded.
    pub fn settle_spin(
        &mut self,
        now: Instant,
        notifications: &impl NotificationSink,
    ) -> Option<Participant> {
        let winner = self.spinner.settle(now)?;

        if self.phase != Phase::Playing {
            tracing::debug!(winner = %winner, "discarding spin settled after completion");
            return None;
        }

        if let Err(error) = self.roster.remove(winner.id) {
            tracing::warn!(%error, "spin winner was no longer eligible");
        }

        self.current_pick = Some(winner.clone());
        notifications.selected(&winner);

        Some(winner)
    }

    /// Makes every participant eligible again
    ///
    /// The current pick is cleared, so nobody is both picked and eligible.
    pub fn reseed_roster(&mut self) {
        self.roster.reseed();
        self.current_pick = None;
    }

    /// Opens the challenge at `index` and starts its countdown
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionFinished`] once every letter is revealed,
    /// [`Error::UnknownChallenge`] for an index out of range,
    /// [`Error::AlreadyAnswered`] for a challenge already answered and
    /// [`timer::Error::AlreadyArmed`] while another challenge is open. The
    /// open challenge is not affected by a rejected request.
    pub fn open_challenge(&mut self, index: usize) -> Result<TimerHandle, Error> {
        if self.phase != Phase::Playing {
            return Err(Error::SessionFinished);
        }

        let challenge = self
            .challenges
            .get(index)
            .ok_or(Error::UnknownChallenge(index))?;

        if self.ledger.is_answered(challenge.id) {
            return Err(Error::AlreadyAnswered(challenge.id));
        }

        let handle = self
            .timer
            .arm(challenge.id, self.time_limit)
            .inspect_err(|error| tracing::debug!(%error, index, "open request ignored"))?;

        Ok(handle)
    }

    /// Closes the open challenge without answering it
    ///
    /// The challenge can be opened again later. Returns `false` if nothing
    /// was open.
    pub fn close_challenge(&mut self) -> bool {
        self.timer.cancel()
    }

    /// Submits option `option` for the open challenge
    ///
    /// A correct answer reveals the linked letter, stops the countdown and
    /// ends the current pick's round. A wrong answer only raises a
    /// notification; the countdown keeps running and the class may try
    /// again.
    ///
    /// # Errors
    ///
    /// Returns [`reveal::Error::UnknownChallenge`] if the open challenge is
    /// missing from the ledger, which a session built by [`Game::start`]
    /// never produces.
    pub fn submit_answer(
        &mut self,
        option: usize,
        notifications: &impl NotificationSink,
    ) -> Result<AnswerOutcome, Error> {
        let Some(challenge) = self
            .active_challenge()
            .and_then(|index| self.challenges.get(index))
        else {
            return Ok(AnswerOutcome::Ignored);
        };

        if option >= challenge.options.len() {
            return Ok(AnswerOutcome::Ignored);
        }

        if !challenge.is_correct(option) {
            notifications.wrong_attempt(challenge.id, option);
            return Ok(AnswerOutcome::Wrong { option });
        }

        let event = self.ledger.mark_answered(challenge.id)?;
        self.timer.cancel();
        self.current_pick = None;
        notifications.revealed(&event);

        if event.complete {
            tracing::info!("keyword fully revealed");
            self.phase = Phase::Completed;
            notifications.completed();
        }

        Ok(AnswerOutcome::Correct(event))
    }

    /// Advances the countdown of the open challenge by one second
    ///
    /// Running out of time closes the challenge unanswered. Returns `None`
    /// when nothing is counting down.
    pub fn tick(&mut self, notifications: &impl NotificationSink) -> Option<Tick> {
        let tick = self.timer.tick()?;

        if tick.low_time {
            notifications.tick_low(tick.challenge, tick.remaining);
        }
        if tick.expired {
            tracing::info!(challenge = %tick.challenge, "challenge expired");
            notifications.expired(tick.challenge);
        }

        Some(tick)
    }

    /// Shows the finale of a completed session
    ///
    /// Returns `true` the first time it is called after completion and
    /// `false` otherwise.
    pub fn finalize(&mut self, notifications: &impl NotificationSink) -> bool {
        if self.phase != Phase::Completed {
            return false;
        }

        self.phase = Phase::Finalized;
        notifications.finalized(self.ledger.letters());

        true
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{
        constants::{challenge::DEFAULT_TIME_LIMIT, spinner::SPIN_DURATION},
        session::Silent,
        timer::State,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Selected(String),
        TickLow(u64),
        Revealed(usize),
        Completed,
        WrongAttempt(usize),
        Expired,
        Finalized,
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Event>>);

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.0.borrow().clone()
        }

        fn count(&self, event: &Event) -> usize {
            self.0.borrow().iter().filter(|e| *e == event).count()
        }
    }

    impl NotificationSink for Recorder {
        fn selected(&self, participant: &Participant) {
            self.0
                .borrow_mut()
                .push(Event::Selected(participant.name.clone()));
        }

        fn tick_low(&self, _challenge: ChallengeId, remaining: Duration) {
            self.0
                .borrow_mut()
                .push(Event::TickLow(remaining.as_secs()));
        }

        fn revealed(&self, event: &RevealEvent) {
            self.0.borrow_mut().push(Event::Revealed(event.position));
        }

        fn completed(&self) {
            self.0.borrow_mut().push(Event::Completed);
        }

        fn wrong_attempt(&self, _challenge: ChallengeId, option: usize) {
            self.0.borrow_mut().push(Event::WrongAttempt(option));
        }

        fn expired(&self, _challenge: ChallengeId) {
            self.0.borrow_mut().push(Event::Expired);
        }

        fn finalized(&self, _keyword: &[char]) {
            self.0.borrow_mut().push(Event::Finalized);
        }
    }

    fn config(keyword: &str, names: &[&str]) -> SessionConfig {
        let mut config = SessionConfig::new(keyword);
        for index in 0..config.challenges().len() {
            let challenge = config.challenge_mut(index).unwrap();
            challenge.prompt = format!("Question {index}");
            challenge.options = ["A", "B", "C", "D"].map(String::from).to_vec();
            challenge.correct_option = index % 4;
        }
        config.set_roster(names);
        config
    }

    fn game(keyword: &str, names: &[&str]) -> Game {
        Game::start_with_rng(&config(keyword, names), Rng::with_seed(42)).unwrap()
    }

    fn correct_option(game: &Game, index: usize) -> usize {
        game.challenges()[index].correct_option
    }

    #[test]
    fn test_start_rejects_mapping_mismatch() {
        let mut config = config("HELLO", &["An"]);
        let four = config.challenges()[..4].to_vec();
        config.set_challenges(four);

        assert!(matches!(
            Game::start(&config),
            Err(Error::Reveal(reveal::Error::MappingMismatch(_)))
        ));
    }

    #[test]
    fn test_start_rejects_empty_roster() {
        let config = config("CPU", &[]);

        assert!(matches!(
            Game::start(&config),
            Err(Error::Roster(roster::Error::InvalidRoster))
        ));
    }

    #[test]
    fn test_start_rejects_blank_prompts() {
        let mut config = SessionConfig::new("CPU");
        config.set_roster(["An"]);

        assert!(matches!(
            Game::start(&config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_start_state() {
        let game = game("HELLO", &["An", "Binh"]);

        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(game.display(), [None; 5]);
        assert_eq!(game.roster().eligible().len(), 2);
        assert_eq!(game.current_pick(), None);
        assert_eq!(game.active_challenge(), None);
        assert_eq!(
            game.display_order().iter().copied().sorted().collect_vec(),
            [0, 1, 2, 3, 4]
        );
    }

    #[test]
    fn test_spin_selects_and_removes_winner() {
        let sink = Recorder::default();
        let mut game = game("CPU", &["An", "Binh", "Chi"]);
        let start = Instant::now();

        game.spin(start).unwrap();
        assert!(matches!(
            game.spin(start),
            Err(Error::Spinner(spinner::Error::AlreadySpinning))
        ));
        assert!(game.spin_frame(start).is_some());
        assert_eq!(game.settle_spin(start, &sink), None);

        let winner = game.settle_spin(start + SPIN_DURATION, &sink).unwrap();

        assert_eq!(game.current_pick(), Some(&winner));
        assert_eq!(game.roster().eligible().len(), 2);
        assert!(!game.roster().eligible().contains(&winner));
        assert_eq!(sink.events(), [Event::Selected(winner.name.clone())]);
        assert_eq!(game.settle_spin(start + SPIN_DURATION, &sink), None);
    }

    #[test]
    fn test_spin_until_exhausted_then_reseed() {
        let sink = Silent;
        let mut game = game("OS", &["An", "Binh"]);
        let mut now = Instant::now();
        let mut winners = Vec::new();

        for _ in 0..2 {
            game.spin(now).unwrap();
            now += SPIN_DURATION;
            winners.push(game.settle_spin(now, &sink).unwrap());
        }

        assert_ne!(winners[0].id, winners[1].id);
        assert!(game.roster().is_exhausted());
        assert!(matches!(
            game.spin(now),
            Err(Error::Spinner(spinner::Error::EmptyPool))
        ));

        game.reseed_roster();
        assert!(game.spin(now).is_ok());
        assert_eq!(game.current_pick(), None);
    }

    #[test]
    fn test_reseed_clears_current_pick() {
        let mut game = game("CPU", &["An", "Binh"]);
        let start = Instant::now();
        game.spin(start).unwrap();
        let winner = game.settle_spin(start + SPIN_DURATION, &Silent).unwrap();
        assert_eq!(game.current_pick(), Some(&winner));

        game.reseed_roster();

        assert_eq!(game.roster().eligible().len(), 2);
        assert_eq!(game.current_pick(), None);
        assert!(
            game.current_pick()
                .is_none_or(|pick| !game.roster().eligible().contains(pick))
        );
    }

    #[test]
    fn test_spin_settling_after_completion_is_discarded() {
        let sink = Recorder::default();
        let mut game = game("OS", &["An", "Binh"]);
        let start = Instant::now();

        game.open_challenge(0).unwrap();
        game.submit_answer(correct_option(&game, 0), &sink).unwrap();
        game.spin(start).unwrap();
        game.open_challenge(1).unwrap();
        game.submit_answer(correct_option(&game, 1), &sink).unwrap();
        assert_eq!(game.phase(), Phase::Completed);

        assert_eq!(game.settle_spin(start + SPIN_DURATION, &sink), None);
        assert_eq!(game.current_pick(), None);
        assert_eq!(game.roster().eligible().len(), 2);
        assert_eq!(game.spinner_phase(), spinner::Phase::Idle);
        assert_eq!(
            sink.events(),
            [Event::Revealed(0), Event::Revealed(1), Event::Completed]
        );
    }

    #[test]
    fn test_wrong_answer_keeps_challenge_open() {
        let sink = Recorder::default();
        let mut game = game("CPU", &["An"]);

        game.open_challenge(1).unwrap();
        let wrong = (correct_option(&game, 1) + 1) % 4;

        assert_eq!(
            game.submit_answer(wrong, &sink).unwrap(),
            AnswerOutcome::Wrong { option: wrong }
        );
        assert_eq!(game.active_challenge(), Some(1));
        assert_eq!(game.remaining_time(), Some(DEFAULT_TIME_LIMIT));
        assert!(!game.is_answered(1));
        assert_eq!(sink.events(), [Event::WrongAttempt(wrong)]);
    }

    #[test]
    fn test_correct_answer_reveals_and_clears_pick() {
        let sink = Recorder::default();
        let mut game = game("CPU", &["An"]);
        let start = Instant::now();
        game.spin(start).unwrap();
        game.settle_spin(start + SPIN_DURATION, &sink).unwrap();

        game.open_challenge(2).unwrap();
        let outcome = game
            .submit_answer(correct_option(&game, 2), &sink)
            .unwrap();

        assert!(matches!(outcome, AnswerOutcome::Correct(event) if event.letter == 'U'));
        assert_eq!(game.display(), [None, None, Some('U')]);
        assert_eq!(game.current_pick(), None);
        assert_eq!(game.active_challenge(), None);
        assert!(game.is_answered(2));

        assert_eq!(
            game.submit_answer(correct_option(&game, 2), &sink).unwrap(),
            AnswerOutcome::Ignored
        );
        assert_eq!(sink.count(&Event::Revealed(2)), 1);
        assert!(matches!(
            game.open_challenge(2),
            Err(Error::AlreadyAnswered(_))
        ));
    }

    #[test]
    fn test_only_one_challenge_open() {
        let mut game = game("CPU", &["An"]);

        game.open_challenge(0).unwrap();
        assert!(matches!(
            game.open_challenge(1),
            Err(Error::Timer(timer::Error::AlreadyArmed(_)))
        ));
        assert_eq!(game.active_challenge(), Some(0));

        assert!(game.close_challenge());
        assert!(!game.close_challenge());
        assert!(game.open_challenge(1).is_ok());
    }

    #[test]
    fn test_unknown_challenge_and_ignored_submissions() {
        let sink = Recorder::default();
        let mut game = game("CPU", &["An"]);

        assert!(matches!(
            game.open_challenge(3),
            Err(Error::UnknownChallenge(3))
        ));
        assert_eq!(game.submit_answer(0, &sink).unwrap(), AnswerOutcome::Ignored);

        game.open_challenge(0).unwrap();
        assert_eq!(game.submit_answer(4, &sink).unwrap(), AnswerOutcome::Ignored);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_expiry_closes_challenge_unanswered() {
        let sink = Recorder::default();
        let mut game = game("CPU", &["An"]);
        game.open_challenge(0).unwrap();

        let ticks = (0..DEFAULT_TIME_LIMIT.as_secs())
            .filter_map(|_| game.tick(&sink))
            .collect_vec();

        assert!(ticks.last().unwrap().expired);
        assert_eq!(
            sink.events(),
            [6, 5, 4, 3, 2, 1]
                .map(Event::TickLow)
                .into_iter()
                .chain([Event::Expired])
                .collect_vec()
        );
        assert_eq!(game.active_challenge(), None);
        assert!(!game.is_answered(0));
        assert_eq!(game.tick(&sink), None);
        assert_eq!(
            game.submit_answer(correct_option(&game, 0), &sink).unwrap(),
            AnswerOutcome::Ignored
        );

        assert!(game.open_challenge(0).is_ok());
        assert!(matches!(game.timer.state(), State::Armed { .. }));
    }

    #[test]
    fn test_full_session_completes_and_finalizes() {
        let sink = Recorder::default();
        let mut game = game("HELLO", &["An", "Binh", "Chi", "Dung", "Em"]);
        let mut now = Instant::now();

        for index in [4, 0, 1, 2, 3] {
            game.spin(now).unwrap();
            now += SPIN_DURATION;
            game.settle_spin(now, &sink).unwrap();

            game.open_challenge(index).unwrap();
            game.submit_answer(correct_option(&game, index), &sink)
                .unwrap();

            if index == 2 {
                assert_eq!(
                    game.display(),
                    [Some('H'), Some('E'), Some('L'), None, Some('O')]
                );
            }
        }

        assert_eq!(game.phase(), Phase::Completed);
        assert!(game.progress().is_complete);
        assert_eq!(game.display(), "HELLO".chars().map(Some).collect_vec());
        assert_eq!(
            game.answer_order(),
            [4, 0, 1, 2, 3].map(|i| game.challenges()[i].id)
        );
        assert_eq!(sink.count(&Event::Completed), 1);

        assert!(matches!(game.spin(now), Err(Error::SessionFinished)));
        assert!(matches!(
            game.open_challenge(0),
            Err(Error::SessionFinished)
        ));

        assert!(game.finalize(&sink));
        assert!(!game.finalize(&sink));
        assert_eq!(game.phase(), Phase::Finalized);
        assert_eq!(sink.count(&Event::Finalized), 1);
    }

    #[test]
    fn test_finalize_requires_completion() {
        let sink = Recorder::default();
        let mut game = game("CPU", &["An"]);

        assert!(!game.finalize(&sink));
        assert_eq!(game.phase(), Phase::Playing);
    }
}
