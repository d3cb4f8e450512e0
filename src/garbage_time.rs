//! Garbage-time risk: a heavily favored team tends to rest its starters late
//! in a lopsided game, depressing their counting stats. When the supplied
//! match odds mark the player's team as a strong favorite, the projection and
//! confidence are shrunk by a bounded penalty.

use serde::{Deserialize, Serialize};

pub const FAVORITE_THRESHOLD: f64 = 1.25;
const BASE_PENALTY: f64 = 0.08;
const BLOWOUT_BONUS_PENALTY: f64 = 0.05;
const MAX_PENALTY: f64 = 0.15;
const BLOWOUT_MARGIN: f64 = 10.0;

/// Minimum scorers at 20+ points for the rotation-depth signal. The count is
/// a fixed stand-in (a real count needs per-player logs for the whole
/// roster, which the provider path does not fetch); a favored team is
/// assumed to carry at least this many.
const ASSUMED_SCORERS_20PLUS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarbageTimeRisk {
    pub is_risky: bool,
    pub penalty_factor: f64,
    pub reason: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedPrediction {
    pub projection: f64,
    pub confidence: i32,
    pub penalty_applied: bool,
    pub risk: GarbageTimeRisk,
}

/// Pure risk decision from the odds and (optionally) the team's recent
/// average winning margin.
pub fn assess_risk(odds: f64, recent_avg_margin: Option<f64>) -> GarbageTimeRisk {
    if odds > FAVORITE_THRESHOLD {
        return GarbageTimeRisk {
            is_risky: false,
            penalty_factor: 0.0,
            reason: format!(
                "team is not a strong favorite (odds {:.2} > {:.2})",
                odds, FAVORITE_THRESHOLD
            ),
            recommendation: "no adjustment".to_string(),
        };
    }

    let mut base = BASE_PENALTY;
    if recent_avg_margin.is_some_and(|m| m > BLOWOUT_MARGIN) {
        base += BLOWOUT_BONUS_PENALTY;
    }

    // Extra scorers beyond the baseline would widen the penalty; with the
    // fixed count this term contributes nothing.
    let extra = 0.03 * (ASSUMED_SCORERS_20PLUS.saturating_sub(2)) as f64;
    let penalty = (base + extra).min(MAX_PENALTY);

    GarbageTimeRisk {
        is_risky: true,
        penalty_factor: penalty,
        reason: format!(
            "team is a strong favorite (odds {:.2}) with {}+ regular 20-point scorers",
            odds, ASSUMED_SCORERS_20PLUS
        ),
        recommendation: format!(
            "reduce projection and confidence by {:.0}%",
            penalty * 100.0
        ),
    }
}

/// Apply the penalty to a projection/confidence pair. Confidence shrinks by
/// a softer factor than the projection and is truncated to an integer.
pub fn apply_penalty(
    projection: f64,
    confidence: i32,
    odds: f64,
    recent_avg_margin: Option<f64>,
) -> AdjustedPrediction {
    let risk = assess_risk(odds, recent_avg_margin);
    if !risk.is_risky {
        return AdjustedPrediction {
            projection,
            confidence,
            penalty_applied: false,
            risk,
        };
    }

    let p = risk.penalty_factor;
    AdjustedPrediction {
        projection: projection * (1.0 - p),
        confidence: (confidence as f64 * (1.0 - p * 0.8)) as i32,
        penalty_applied: true,
        risk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_favorite_carries_no_penalty() {
        let risk = assess_risk(1.85, None);
        assert!(!risk.is_risky);
        assert_eq!(risk.penalty_factor, 0.0);
    }

    #[test]
    fn favorite_is_flagged_within_penalty_bounds() {
        let risk = assess_risk(1.22, None);
        assert!(risk.is_risky);
        assert!(risk.penalty_factor >= BASE_PENALTY);
        assert!(risk.penalty_factor <= MAX_PENALTY);
    }

    #[test]
    fn blowout_tendency_widens_the_penalty() {
        let plain = assess_risk(1.22, Some(4.0));
        let blowout = assess_risk(1.22, Some(12.5));
        assert!((plain.penalty_factor - BASE_PENALTY).abs() < 1e-12);
        assert!((blowout.penalty_factor - (BASE_PENALTY + BLOWOUT_BONUS_PENALTY)).abs() < 1e-12);
        assert!(blowout.penalty_factor <= MAX_PENALTY);
    }

    #[test]
    fn penalty_shrinks_projection_and_confidence() {
        let adjusted = apply_penalty(35.0, 80, 1.22, None);
        assert!(adjusted.penalty_applied);
        assert!(adjusted.projection < 35.0);
        assert!(adjusted.confidence < 80);
        // Confidence shrinks by the softened factor: 80 * (1 - 0.08*0.8).
        assert_eq!(adjusted.confidence, 74);
    }

    #[test]
    fn no_penalty_leaves_inputs_untouched() {
        let adjusted = apply_penalty(35.0, 80, 1.85, None);
        assert!(!adjusted.penalty_applied);
        assert_eq!(adjusted.projection, 35.0);
        assert_eq!(adjusted.confidence, 80);
    }
}
