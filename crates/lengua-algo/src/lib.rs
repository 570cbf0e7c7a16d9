//! # lengua-algo - core algorithms for adaptive Spanish learning
//!
//! Pure Rust implementations of the recommendation and retention logic
//! behind the lengua backend:
//!
//! - **SM-2 scheduling** - per-word review intervals from recall quality
//! - **Level assessment** - CEFR estimation from behavioral comprehension
//!   signals across a short probe-video sequence
//! - **Content scoring** - multi-factor ranking of candidates against a
//!   learner profile
//! - **Feed assembly** - filter, rank, diversify and review-injection
//!   pipeline producing an ordered feed
//!
//! ## Design
//!
//! - **Pure and synchronous** - no I/O, no async, no interior mutability;
//!   every function is deterministic given its inputs and a caller-supplied
//!   `now`
//! - **Reusable** - the backend consumes this crate, but nothing here knows
//!   about HTTP, storage or content sources
//! - **Fully tested** - the scheduling sequences, level transitions and
//!   pipeline invariants all have colocated unit tests
//!
//! ## Modules
//!
//! - [`types`] - CEFR levels, content candidates, learner profiles
//! - [`srs`] - SM-2 review transition and the vocabulary memory model
//! - [`assessment`] - onboarding level-assessment state machine
//! - [`scoring`] - candidate scoring against a learner profile
//! - [`feed`] - feed assembly pipeline

pub mod assessment;
pub mod feed;
pub mod scoring;
pub mod srs;
pub mod types;

pub use assessment::{
    AssessmentOutcome, AssessmentProgress, AssessmentSession, BehaviorSignal, ProbeVideo,
    ResponseStep,
};
pub use srs::{ReviewQuality, SrsState, VocabularyEntry, VocabularyStats};
pub use types::{CefrLevel, ContentCandidate, ContentType, FeedItem, LearnerProfile};
