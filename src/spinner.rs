//! Spinner wheel model
//!
//! The wheel is drawn with one equal segment per eligible participant and a
//! fixed pointer at the top. A spin draws a random target rotation up front,
//! the presentation layer polls [`SpinnerEngine::advance`] once per frame to
//! animate towards it, and once the animation has played out the winner is
//! read off the final resting angle with [`resolve`]. Because the winner is
//! derived from the same angle the wheel stops at, what the pointer shows and
//! what the game records always agree.

use fastrand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::Instant;

use crate::{
    constants::spinner::{FULL_TURN_DEGREES, MAX_FULL_TURNS, MIN_FULL_TURNS, SPIN_DURATION},
    roster::Participant,
};

/// Errors that can occur when starting a spin
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// There is nobody on the wheel
    #[error("no eligible participant to spin for")]
    EmptyPool,
    /// A spin is already in progress
    #[error("the wheel is already spinning")]
    AlreadySpinning,
}

/// Observable phase of the spinner
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// At rest, ready for a new spin
    #[default]
    Idle,
    /// Animating towards the target rotation
    Spinning,
}

/// Draws the rotation a new spin comes to rest at
///
/// The wheel always moves forward by a whole number of turns in
/// `MIN_FULL_TURNS..=MAX_FULL_TURNS` plus a uniform offset in `[0, 360)`.
/// The offset alone decides the winner, so every segment is equally likely
/// whatever the starting orientation.
pub fn draw_target_rotation(current_rotation: f64, rng: &mut Rng) -> f64 {
    let full_turns = rng.u32(MIN_FULL_TURNS..=MAX_FULL_TURNS);
    let offset = rng.f64() * FULL_TURN_DEGREES;

    current_rotation + f64::from(full_turns) * FULL_TURN_DEGREES + offset
}

/// Quartic ease-out: fast start, long gentle stop
pub fn ease_out_quartic(progress: f64) -> f64 {
    1. - (1. - progress).powi(4)
}

/// Width in degrees of one segment on a wheel of `count` entries
fn segment_width(count: usize) -> f64 {
    FULL_TURN_DEGREES / count as f64
}

/// Maps a resting rotation to the entry under the pointer
///
/// The wheel turns clockwise under a pointer fixed at the top, so the angle
/// under the pointer runs opposite to the rotation. Returns `None` only for
/// an empty wheel.
pub fn resolve<T>(final_rotation: f64, entries: &[T]) -> Option<&T> {
    if entries.is_empty() {
        return None;
    }

    let normalized =
        (FULL_TURN_DEGREES - (final_rotation % FULL_TURN_DEGREES)) % FULL_TURN_DEGREES;
    let index = (normalized / segment_width(entries.len())).floor() as usize % entries.len();

    entries.get(index)
}

/// Describes one spin from start to rest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinHandle {
    /// When the spin started
    pub started_at: Instant,
    /// Rotation of the wheel when the spin started
    pub start_rotation: f64,
    /// Rotation the wheel comes to rest at
    pub target_rotation: f64,
    /// Number of segments on the wheel for this spin
    pub segment_count: usize,
}

/// Snapshot of the wheel for one animation frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpinFrame {
    /// Rotation in degrees to draw the wheel at
    pub rotation: f64,
    /// Linear progress through the animation in `[0, 1]`
    pub progress: f64,
    /// Number of segment boundaries that have passed the pointer so far
    ///
    /// A change between two frames means a boundary was just crossed.
    pub segments_passed: u64,
}

impl SpinHandle {
    /// Computes the frame at `now`
    ///
    /// Pure in `now`: calling it twice with the same instant gives the same
    /// frame. Instants before the start clamp to the first frame, instants
    /// after the end to the resting frame.
    pub fn frame(&self, now: Instant) -> SpinFrame {
        let elapsed = now.saturating_duration_since(self.started_at);
        let progress = (elapsed.as_secs_f64() / SPIN_DURATION.as_secs_f64()).min(1.);

        let rotation = if progress >= 1. {
            self.target_rotation
        } else {
            self.start_rotation
                + (self.target_rotation - self.start_rotation) * ease_out_quartic(progress)
        };

        SpinFrame {
            rotation,
            progress,
            segments_passed: (rotation / segment_width(self.segment_count.max(1))).floor() as u64,
        }
    }

    /// Returns `true` once the full animation duration has elapsed
    pub fn is_finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= SPIN_DURATION
    }
}

/// A spin in progress with the wheel it was started over
#[derive(Debug, Clone)]
struct ActiveSpin {
    handle: SpinHandle,
    eligible: Vec<Participant>,
}

/// The spinner wheel and its `Idle -> Spinning -> Idle` cycle
///
/// Settling is the single [`SpinnerEngine::settle`] call that resolves the
/// winner and returns the wheel to rest, so it is never observable as a
/// phase. The engine owns no timer. It is driven entirely by the instants
/// passed in by the caller's animation loop.
#[derive(Debug)]
pub struct SpinnerEngine {
    rng: Rng,
    /// Resting rotation of the wheel between spins
    rotation: f64,
    spin: Option<ActiveSpin>,
}

impl Default for SpinnerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SpinnerEngine {
    /// Creates a wheel at rest with an entropy-seeded generator
    pub fn new() -> Self {
        Self::with_rng(Rng::new())
    }

    /// Creates a wheel at rest drawing its spins from `rng`
    pub fn with_rng(rng: Rng) -> Self {
        Self {
            rng,
            rotation: 0.,
            spin: None,
        }
    }

    /// Current phase of the wheel
    pub fn phase(&self) -> Phase {
        if self.spin.is_some() {
            Phase::Spinning
        } else {
            Phase::Idle
        }
    }

    /// Rotation the wheel rests at, updated when a spin settles
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// The spin in progress, if any
    pub fn current_spin(&self) -> Option<&SpinHandle> {
        self.spin.as_ref().map(|spin| &spin.handle)
    }

    /// Starts a spin over a snapshot of `eligible`
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadySpinning`] while a previous spin has not
    /// settled, and [`Error::EmptyPool`] if `eligible` is empty.
    pub fn start_spin(
        &mut self,
        eligible: &[Participant],
        now: Instant,
    ) -> Result<SpinHandle, Error> {
        if self.spin.is_some() {
            return Err(Error::AlreadySpinning);
        }
        if eligible.is_empty() {
            return Err(Error::EmptyPool);
        }

        let handle = SpinHandle {
            started_at: now,
            start_rotation: self.rotation,
            target_rotation: draw_target_rotation(self.rotation, &mut self.rng),
            segment_count: eligible.len(),
        };

        tracing::debug!(
            segments = handle.segment_count,
            target = handle.target_rotation,
            "spin started"
        );

        self.spin = Some(ActiveSpin {
            handle,
            eligible: eligible.to_vec(),
        });

        Ok(handle)
    }

    /// Frame of the spin in progress at `now`, or `None` when at rest
    pub fn advance(&self, now: Instant) -> Option<SpinFrame> {
        self.current_spin().map(|handle| handle.frame(now))
    }

    /// Returns `true` if a spin is in progress and its animation has ended
    pub fn is_finished(&self, now: Instant) -> bool {
        self.current_spin()
            .is_some_and(|handle| handle.is_finished(now))
    }

    /// Commits the winner of a finished spin
    ///
    /// Returns the winner exactly once per spin: `None` while the animation
    /// is still playing and on every call after the spin has settled.
    pub fn settle(&mut self, now: Instant) -> Option<Participant> {
        if !self.is_finished(now) {
            return None;
        }

        let ActiveSpin { handle, eligible } = self.spin.take()?;

        let winner = resolve(handle.target_rotation, &eligible).cloned();
        self.rotation = handle.target_rotation;

        if let Some(winner) = &winner {
            tracing::info!(winner = %winner, rotation = self.rotation, "spin settled");
        }

        winner
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use super::*;

    fn roster(count: usize) -> Vec<Participant> {
        (0..count)
            .map(|i| Participant::new(format!("Student {i}")))
            .collect()
    }

    #[test]
    fn test_resolve_pointer_mapping() {
        let wheel = ["A", "B", "C", "D"];

        assert_eq!(resolve(0., &wheel), Some(&"A"));
        assert_eq!(resolve(10., &wheel), Some(&"D"));
        assert_eq!(resolve(100., &wheel), Some(&"C"));
        assert_eq!(resolve(200., &wheel), Some(&"B"));
        assert_eq!(resolve(359.9, &wheel), Some(&"A"));
        assert_eq!(resolve(720. + 45., &wheel), Some(&"D"));
    }

    #[test]
    fn test_resolve_empty_and_single() {
        let empty: [&str; 0] = [];
        assert_eq!(resolve(42., &empty), None);

        for rotation in [0., 1., 179.5, 359.99, 7200.25] {
            assert_eq!(resolve(rotation, &["Solo"]), Some(&"Solo"));
        }
    }

    #[test]
    fn test_resolve_is_deterministic_and_in_pool() {
        let mut rng = Rng::with_seed(11);
        let wheel = roster(7);

        for _ in 0..1_000 {
            let rotation = draw_target_rotation(rng.f64() * 10_000., &mut rng);
            let first = resolve(rotation, &wheel).unwrap();
            let second = resolve(rotation, &wheel).unwrap();

            assert_eq!(first, second);
            assert!(wheel.contains(first));
        }
    }

    #[test]
    fn test_target_rotation_moves_forward() {
        let mut rng = Rng::with_seed(3);
        let current = 1234.5;

        for _ in 0..1_000 {
            let target = draw_target_rotation(current, &mut rng);
            let travelled = target - current;

            assert!(travelled >= f64::from(MIN_FULL_TURNS) * FULL_TURN_DEGREES);
            assert!(travelled < f64::from(MAX_FULL_TURNS + 1) * FULL_TURN_DEGREES);
        }
    }

    #[test]
    fn test_fairness_chi_square() {
        const PARTICIPANTS: usize = 5;
        const SPINS: usize = 50_000;
        // chi-square critical value for 4 degrees of freedom at p = 0.0001
        const CRITICAL: f64 = 23.51;

        let mut rng = Rng::with_seed(2024);
        let wheel: Vec<usize> = (0..PARTICIPANTS).collect();
        let mut counts = [0usize; PARTICIPANTS];
        let mut rotation = 77.7;

        for _ in 0..SPINS {
            rotation = draw_target_rotation(rotation, &mut rng);
            counts[*resolve(rotation, &wheel).unwrap()] += 1;
        }

        let expected = SPINS as f64 / PARTICIPANTS as f64;
        let chi_square: f64 = counts
            .iter()
            .map(|&observed| (observed as f64 - expected).powi(2) / expected)
            .sum();

        assert!(chi_square < CRITICAL, "chi-square {chi_square}: {counts:?}");
    }

    #[test]
    fn test_ease_out_quartic_bounds() {
        assert!(ease_out_quartic(0.).abs() < f64::EPSILON);
        assert!((ease_out_quartic(1.) - 1.).abs() < f64::EPSILON);
        assert!(ease_out_quartic(0.5) > 0.5);
    }

    #[test]
    fn test_start_spin_empty_pool() {
        let mut engine = SpinnerEngine::with_rng(Rng::with_seed(1));
        assert_eq!(
            engine.start_spin(&[], Instant::now()),
            Err(Error::EmptyPool)
        );
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn test_start_spin_rejects_reentry() {
        let mut engine = SpinnerEngine::with_rng(Rng::with_seed(1));
        let wheel = roster(3);
        let now = Instant::now();

        let handle = engine.start_spin(&wheel, now).unwrap();
        assert_eq!(engine.phase(), Phase::Spinning);
        assert_eq!(
            engine.start_spin(&wheel, now + Duration::from_millis(10)),
            Err(Error::AlreadySpinning)
        );
        assert_eq!(engine.current_spin(), Some(&handle));
    }

    #[test]
    fn test_advance_is_pure_and_monotonic() {
        let mut engine = SpinnerEngine::with_rng(Rng::with_seed(5));
        let start = Instant::now();
        let handle = engine.start_spin(&roster(4), start).unwrap();

        let first = engine.advance(start).unwrap();
        assert!((first.rotation - handle.start_rotation).abs() < f64::EPSILON);

        let mut last = first.rotation;
        for ms in (0..=5_000).step_by(250) {
            let now = start + Duration::from_millis(ms);
            let frame = engine.advance(now).unwrap();
            assert_eq!(Some(frame), engine.advance(now));
            assert!(frame.rotation >= last);
            last = frame.rotation;
        }

        let end = engine.advance(start + Duration::from_secs(60)).unwrap();
        assert!((end.rotation - handle.target_rotation).abs() < f64::EPSILON);
        assert!((end.progress - 1.).abs() < f64::EPSILON);
    }

    #[test]
    fn test_is_finished_after_duration() {
        let mut engine = SpinnerEngine::with_rng(Rng::with_seed(5));
        let start = Instant::now();
        engine.start_spin(&roster(2), start).unwrap();

        assert!(!engine.is_finished(start + SPIN_DURATION - Duration::from_millis(1)));
        assert!(engine.is_finished(start + SPIN_DURATION));
    }

    #[test]
    fn test_settle_commits_winner_once() {
        let mut engine = SpinnerEngine::with_rng(Rng::with_seed(9));
        let wheel = roster(6);
        let start = Instant::now();
        let handle = engine.start_spin(&wheel, start).unwrap();

        assert_eq!(engine.settle(start + Duration::from_secs(1)), None);
        assert_eq!(engine.phase(), Phase::Spinning);

        let end = start + SPIN_DURATION;
        let winner = engine.settle(end).unwrap();
        assert_eq!(Some(&winner), resolve(handle.target_rotation, &wheel));
        assert_eq!(engine.phase(), Phase::Idle);
        assert!((engine.rotation() - handle.target_rotation).abs() < f64::EPSILON);

        assert_eq!(engine.settle(end), None);
        assert_eq!(engine.advance(end), None);
    }

    #[test]
    fn test_single_participant_plays_full_spin() {
        let mut engine = SpinnerEngine::with_rng(Rng::with_seed(4));
        let wheel = roster(1);
        let start = Instant::now();
        engine.start_spin(&wheel, start).unwrap();

        assert_eq!(engine.settle(start + Duration::from_millis(4_999)), None);
        assert_eq!(engine.settle(start + SPIN_DURATION), Some(wheel[0].clone()));
    }

    #[test]
    fn test_next_spin_starts_from_rest() {
        let mut engine = SpinnerEngine::with_rng(Rng::with_seed(8));
        let wheel = roster(3);
        let start = Instant::now();

        engine.start_spin(&wheel, start).unwrap();
        engine.settle(start + SPIN_DURATION).unwrap();
        let rest = engine.rotation();

        let later = start + Duration::from_secs(10);
        let handle = engine.start_spin(&wheel, later).unwrap();
        assert!((handle.start_rotation - rest).abs() < f64::EPSILON);
        assert!(handle.target_rotation > rest);
    }

    #[test]
    fn test_segments_passed_counts_boundaries() {
        let handle = SpinHandle {
            started_at: Instant::now(),
            start_rotation: 0.,
            target_rotation: 450.,
            segment_count: 4,
        };

        let end = handle.frame(handle.started_at + SPIN_DURATION);
        assert_eq!(end.segments_passed, 5);
        assert_eq!(handle.frame(handle.started_at).segments_passed, 0);
    }
}
