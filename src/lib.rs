//! # Orchard
//!
//! This library provides the core logic of a classroom keyword-reveal quiz.
//! A teacher hides a keyword behind one multiple-choice challenge per
//! letter. A fair spinning wheel picks a student, the student answers a timed
//! challenge, and each correct answer reveals the letter linked to it until
//! the whole keyword is uncovered.
//!
//! The crate is framework free: rendering, audio and timing sources live
//! with the caller, which drives [`game::Game`] with clock instants and
//! one-second ticks and receives named events through
//! [`session::NotificationSink`]. Content generation talks to an external
//! service through [`generation::ContentService`].

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]

pub mod challenge;
pub mod config;
pub mod constants;
pub mod game;
pub mod generation;
pub mod reveal;
pub mod roster;
pub mod session;
pub mod spinner;
pub mod timer;
