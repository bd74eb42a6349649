//! Automatic shot and score detection for GPS-tracked golf rounds.
//!
//! Location samples flow through [`tracker::RoundTracker`], which enriches
//! each one with hole and position context ([`position`]), detects shots
//! from movement ([`movement`]), and persists the result. When the player
//! reaches the pin, [`completion`] and [`scoring`] turn the accumulated shots
//! into a score recommendation, and [`validation`] records the final score.

pub mod advice;
pub mod completion;
pub mod config;
pub mod course;
pub mod error;
pub mod geo;
pub mod ingest;
pub mod movement;
pub mod position;
pub mod sample;
pub mod scoring;
pub mod shot;
pub mod simulate;
pub mod storage;
pub mod tracker;
pub mod validation;

pub use config::TrackerConfig;
pub use course::{CourseId, CourseLayout, HoleLayout, Round, RoundId, UserId};
pub use geo::Coordinate;
pub use sample::{LocationSample, LocationUpdate};
pub use tracker::{LocationProcessingResult, RoundTracker};
