//! `quality` sub-score: a weighted mean of the four quality axes across
//! recent votes, with linear time decay.

use chrono::{DateTime, Utc};
use reputrust_core::constants::QUALITY_WINDOW_DAYS;
use reputrust_core::types::Vote;

pub fn compute_quality(votes: &[Vote], now: DateTime<Utc>) -> f64 {
    let window_days = QUALITY_WINDOW_DAYS as f64;
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for vote in votes {
        let age_days = (now - vote.timestamp).num_seconds() as f64 / 86_400.0;
        if age_days < 0.0 || age_days > window_days {
            continue;
        }
        let weight = (1.0 - age_days / window_days).max(0.0);
        weighted_sum += weight * vote.quality.mean();
        weight_total += weight;
    }

    if weight_total <= 0.0 {
        return 0.0;
    }
    (weighted_sum / weight_total).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use reputrust_core::ids::{Hash256, ReceiptId};
    use reputrust_core::types::{AgentId, Polarity, QualityScores};

    fn vote_at(age_days: i64, mean: f64) -> Vote {
        Vote {
            receipt_id: ReceiptId {
                payer: AgentId(1),
                payee: AgentId(2),
                signature_hash: Hash256::of("s"),
            },
            voter: AgentId(1),
            subject: AgentId(2),
            polarity: Polarity::Up,
            quality: QualityScores {
                response_quality: mean,
                response_speed: mean,
                accuracy: mean,
                professionalism: mean,
            },
            comment_hash: None,
            weight: 100.0,
            timestamp: Utc::now() - Duration::days(age_days),
        }
    }

    #[test]
    fn no_votes_yields_zero() {
        assert_eq!(compute_quality(&[], Utc::now()), 0.0);
    }

    #[test]
    fn votes_outside_window_are_excluded() {
        let votes = vec![vote_at(200, 100.0)];
        assert_eq!(compute_quality(&votes, Utc::now()), 0.0);
    }

    #[test]
    fn recent_vote_outweighs_old_vote() {
        let votes = vec![vote_at(0, 100.0), vote_at(89, 0.0)];
        let score = compute_quality(&votes, Utc::now());
        assert!(score > 50.0, "expected recency to dominate, got {score}");
    }

    #[test]
    fn uniform_quality_returns_that_value() {
        let votes = vec![vote_at(10, 75.0), vote_at(20, 75.0)];
        let score = compute_quality(&votes, Utc::now());
        assert!((score - 75.0).abs() < 1e-9);
    }
}
