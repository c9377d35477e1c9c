//! # reputrust-score
//! The composite score pipeline: five `[0, 100]` sub-scores (trust,
//! quality, reliability, economic, social) blended and Sybil-discounted
//! into a single `[0, 1000]` score and tier, with a score-history log and
//! tier-change events.

pub mod composite;
pub mod economic;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod quality;
pub mod reliability;
pub mod social;
pub mod trust;

pub use composite::{compose, tier_for_score};
pub use error::ScoreError;
pub use history::ScoreHistoryStore;
pub use pipeline::{RecomputeOutcome, ScorePipeline};
