//! Composes the five sub-scores and the Sybil-risk penalty into the single
//! `[0, 1000]` score and its tier.

use reputrust_core::constants::{
    SYBIL_PENALTY_FACTOR, WEIGHT_ECONOMIC, WEIGHT_QUALITY, WEIGHT_RELIABILITY, WEIGHT_SOCIAL,
    WEIGHT_TRUST,
};
use reputrust_core::types::{SubScores, Tier};

pub fn compose(sub: &SubScores, sybil_risk_score: f64) -> u32 {
    let blended = WEIGHT_TRUST * sub.trust
        + WEIGHT_QUALITY * sub.quality
        + WEIGHT_RELIABILITY * sub.reliability
        + WEIGHT_ECONOMIC * sub.economic
        + WEIGHT_SOCIAL * sub.social;
    let penalty = 1.0 - SYBIL_PENALTY_FACTOR * (sybil_risk_score / 100.0);
    let overall = (10.0 * blended * penalty).round();
    overall.clamp(0.0, 1000.0) as u32
}

pub fn tier_for_score(score: u32) -> Tier {
    Tier::for_score(score)
}
