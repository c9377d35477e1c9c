//! `trust` sub-score: a Bayesian-smoothed positive-vote ratio weighted by
//! each voter's own authority.

use reputrust_core::constants::TRUST_SMOOTHING_PRIOR;
use reputrust_core::ids::AgentId;
use reputrust_core::types::{Polarity, Vote};

/// `authority_of` returns a voter's `pagerank_normalized` (0-100); unknown
/// voters fall back to a neutral weight of 1 rather than zero, so a single
/// vote from an unseen agent still counts instead of vanishing.
pub fn compute_trust(votes: &[Vote], authority_of: impl Fn(AgentId) -> u32) -> f64 {
    if votes.is_empty() {
        return 50.0;
    }

    let mut positive_weight = 0.0;
    let mut total_weight = 0.0;
    for vote in votes {
        let weight = (authority_of(vote.voter).max(1)) as f64;
        total_weight += weight;
        if vote.polarity == Polarity::Up {
            positive_weight += weight;
        }
    }

    let smoothed = (positive_weight + TRUST_SMOOTHING_PRIOR)
        / (total_weight + 2.0 * TRUST_SMOOTHING_PRIOR);
    (smoothed * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reputrust_core::ids::ReceiptId;
    use reputrust_core::ids::Hash256;
    use reputrust_core::types::QualityScores;

    fn vote(voter: AgentId, subject: AgentId, polarity: Polarity) -> Vote {
        Vote {
            receipt_id: ReceiptId {
                payer: voter,
                payee: subject,
                signature_hash: Hash256::of("s"),
            },
            voter,
            subject,
            polarity,
            quality: QualityScores {
                response_quality: 50.0,
                response_speed: 50.0,
                accuracy: 50.0,
                professionalism: 50.0,
            },
            comment_hash: None,
            weight: 50.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn no_votes_returns_neutral_midpoint() {
        assert_eq!(compute_trust(&[], |_| 50), 50.0);
    }

    #[test]
    fn all_positive_votes_from_high_authority_voters_trend_high() {
        let votes: Vec<_> = (0..10)
            .map(|i| vote(AgentId(i), AgentId(99), Polarity::Up))
            .collect();
        let score = compute_trust(&votes, |_| 80);
        assert!(score > 80.0, "expected a high trust score, got {score}");
    }

    #[test]
    fn all_negative_votes_trend_low() {
        let votes: Vec<_> = (0..10)
            .map(|i| vote(AgentId(i), AgentId(99), Polarity::Down))
            .collect();
        let score = compute_trust(&votes, |_| 80);
        assert!(score < 20.0, "expected a low trust score, got {score}");
    }

    #[test]
    fn unknown_voters_still_count_with_neutral_weight() {
        let votes = vec![vote(AgentId(1), AgentId(99), Polarity::Up)];
        let score = compute_trust(&votes, |_| 0);
        assert!(score > 50.0);
    }
}
