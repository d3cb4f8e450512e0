//! Combined-score projection for a matchup, with an over/under call against
//! a supplied line. Two scoring policies share one fetch path: the
//! regression model (primary) and the earlier additive model (legacy,
//! kept for comparison only).

use rayon::join;
use serde::{Deserialize, Serialize};

use crate::model::{
    ConfidenceTier, TeamMatchupContext, TeamSideContext, TotalDecision, TotalPolicy,
};
use crate::nba_client;

const PACE_BASELINE: f64 = 98.0;
const TEMPO_COEFF: f64 = 0.9;
const EFFICIENCY_COEFF: f64 = 0.35;
const FORM_COEFF: f64 = 0.5;
const SHOOTING_BASELINE: f64 = 45.0;
const SHOOTING_COEFF: f64 = 0.6;
const DEFENSE_SUM_BASELINE: f64 = 226.0;
const DEFENSE_COEFF: f64 = 0.5;
const DECISION_MARGIN: f64 = 3.0;
const HIGH_CONFIDENCE_MARGIN: f64 = 5.0;

const LEGACY_HOME_ADVANTAGE: f64 = 3.5;
const LEGACY_DEF_COEFF: f64 = 0.3;
const LEGACY_FIRST_HALF_SHARE: f64 = 0.48;

/// Additive term breakdown of the regression model, kept in the result so
/// the report can show where the projection came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TermBreakdown {
    pub base: f64,
    pub tempo: f64,
    pub efficiency: f64,
    pub form: f64,
    pub shooting: f64,
    pub defense_penalty: f64,
    pub home_court: f64,
    pub raw_total: f64,
    pub regression_ratio: f64,
    pub regression_multiplier: f64,
    pub fine_adjustment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalCall {
    pub threshold: f64,
    pub margin: f64,
    pub decision: TotalDecision,
    /// Only meaningful when a decision was made (not Pass).
    pub confidence: ConfidenceTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamTotalResult {
    pub home_team: String,
    pub away_team: String,
    pub season: String,
    pub projection: f64,
    pub avg_pace: f64,
    pub home_season_avg: f64,
    pub away_season_avg: f64,
    pub home_last5_avg: f64,
    pub away_last5_avg: f64,
    pub home_off_rating: f64,
    pub home_def_rating: f64,
    pub away_off_rating: f64,
    pub away_def_rating: f64,
    pub terms: Option<TermBreakdown>,
    pub call: Option<TotalCall>,
    pub suggested_threshold: f64,
    /// Legacy policy only; first halves land around 48% of the total.
    pub first_half_estimate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchupSide {
    Home,
    Away,
}

#[derive(Debug, Clone)]
pub enum MatchupOutcome {
    Ready(Box<TeamTotalResult>),
    TeamNotFound(MatchupSide),
    NoData,
}

/// Short recent samples regress toward the season scoring level; the ratio
/// of season to last-5 scoring picks a bucketed correction multiplier.
pub fn regression_multiplier(ratio: f64) -> f64 {
    if ratio < 0.90 {
        0.90
    } else if ratio < 0.94 {
        0.93
    } else if ratio > 1.08 {
        1.05
    } else if ratio > 1.04 {
        1.02
    } else {
        1.00
    }
}

fn regression_ratio(ctx: &TeamMatchupContext) -> f64 {
    let last5_sum = ctx.home.last5.points_avg + ctx.away.last5.points_avg;
    if last5_sum == 0.0 {
        return 1.0;
    }
    (ctx.home.season.points + ctx.away.season.points) / last5_sum
}

/// Regression-model projection with its term breakdown.
pub fn project_regression(ctx: &TeamMatchupContext) -> (f64, TermBreakdown) {
    let home = &ctx.home;
    let away = &ctx.away;
    let avg_pace = (home.advanced.pace + away.advanced.pace) / 2.0;

    let base = home.last5.points_avg + away.last5.points_avg;
    let tempo = (avg_pace - PACE_BASELINE) * TEMPO_COEFF;
    // Asymmetric: each offense measured against the opposing defense.
    let efficiency = ((home.advanced.off_rating - away.advanced.def_rating)
        + (away.advanced.off_rating - home.advanced.def_rating))
        * EFFICIENCY_COEFF;
    let form = ((home.last5.points_avg - home.season.points)
        + (away.last5.points_avg - away.season.points))
        * FORM_COEFF;
    let avg_shooting = (home.last5.fg_pct_avg
        + away.last5.fg_pct_avg
        + home.last5.fg3_pct_avg
        + away.last5.fg3_pct_avg)
        / 4.0;
    let shooting = (avg_shooting - SHOOTING_BASELINE) * SHOOTING_COEFF;
    let defense_penalty =
        ((home.advanced.def_rating + away.advanced.def_rating) - DEFENSE_SUM_BASELINE)
            * DEFENSE_COEFF;
    let home_court = if avg_pace < PACE_BASELINE { 1.5 } else { 1.0 };

    let raw_total = base + tempo + efficiency + form + shooting - defense_penalty + home_court;

    let ratio = regression_ratio(ctx);
    let multiplier = regression_multiplier(ratio);
    let mut total = raw_total * multiplier;

    let mut fine_adjustment = 0.0;
    if home.advanced.def_rating < 112.0 && away.advanced.def_rating < 112.0 {
        fine_adjustment -= 4.0;
    }
    let form_divergence = ((home.last5.points_avg - home.season.points)
        - (away.last5.points_avg - away.season.points))
        .abs();
    if form_divergence > 15.0 {
        fine_adjustment -= 6.0;
    }
    if away.last5.points_avg > 118.0 {
        fine_adjustment += 2.0;
    }
    total += fine_adjustment;

    let terms = TermBreakdown {
        base,
        tempo,
        efficiency,
        form,
        shooting,
        defense_penalty,
        home_court,
        raw_total,
        regression_ratio: ratio,
        regression_multiplier: multiplier,
        fine_adjustment,
    };
    (total, terms)
}

/// Legacy projection: per-side season scoring adjusted for the opposing
/// defense, scaled by tempo, with a flat home bump. No regression step.
pub fn project_legacy(ctx: &TeamMatchupContext) -> f64 {
    let home = &ctx.home;
    let away = &ctx.away;
    let tempo_factor = (home.advanced.pace + away.advanced.pace) / 2.0 / 100.0;

    let home_score = (home.season.points
        + (away.advanced.def_rating - 110.0) * LEGACY_DEF_COEFF
        + LEGACY_HOME_ADVANTAGE)
        * tempo_factor;
    let away_score =
        (away.season.points + (home.advanced.def_rating - 110.0) * LEGACY_DEF_COEFF) * tempo_factor;

    home_score + away_score
}

/// Over/under call for the regression policy. The +-3 band around the line
/// is a deliberate no-bet zone.
pub fn decide_regression(total: f64, threshold: f64) -> TotalCall {
    let margin = total - threshold;
    let decision = if margin >= DECISION_MARGIN {
        TotalDecision::Over
    } else if margin <= -DECISION_MARGIN {
        TotalDecision::Under
    } else {
        TotalDecision::Pass
    };
    let confidence = match decision {
        TotalDecision::Pass => ConfidenceTier::Low,
        _ if margin.abs() >= HIGH_CONFIDENCE_MARGIN => ConfidenceTier::High,
        _ => ConfidenceTier::Medium,
    };
    TotalCall {
        threshold,
        margin,
        decision,
        confidence,
    }
}

/// Legacy decision ladder: wider bands, a flat confidence score per band,
/// no-bet inside +-2.
pub fn decide_legacy(total: f64, threshold: f64) -> TotalCall {
    let margin = total - threshold;
    let decision = if margin.abs() < 2.0 {
        TotalDecision::Pass
    } else if margin > 0.0 {
        TotalDecision::Over
    } else {
        TotalDecision::Under
    };
    let confidence = if decision == TotalDecision::Pass {
        ConfidenceTier::Low
    } else if margin.abs() >= 5.0 {
        ConfidenceTier::High
    } else if margin.abs() >= 3.0 {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    };
    TotalCall {
        threshold,
        margin,
        decision,
        confidence,
    }
}

/// Pure scoring over an assembled matchup context.
pub fn score(ctx: &TeamMatchupContext, threshold: Option<f64>, policy: TotalPolicy) -> TeamTotalResult {
    let avg_pace = (ctx.home.advanced.pace + ctx.away.advanced.pace) / 2.0;

    let (projection, terms, first_half) = match policy {
        TotalPolicy::Regression => {
            let (total, terms) = project_regression(ctx);
            (total, Some(terms), None)
        }
        TotalPolicy::Legacy => {
            let total = project_legacy(ctx);
            (total, None, Some(total * LEGACY_FIRST_HALF_SHARE))
        }
    };

    let call = threshold.map(|line| match policy {
        TotalPolicy::Regression => decide_regression(projection, line),
        TotalPolicy::Legacy => decide_legacy(projection, line),
    });

    TeamTotalResult {
        home_team: ctx.home.name.clone(),
        away_team: ctx.away.name.clone(),
        season: ctx.season.clone(),
        projection,
        avg_pace,
        home_season_avg: ctx.home.season.points,
        away_season_avg: ctx.away.season.points,
        home_last5_avg: ctx.home.last5.points_avg,
        away_last5_avg: ctx.away.last5.points_avg,
        home_off_rating: ctx.home.advanced.off_rating,
        home_def_rating: ctx.home.advanced.def_rating,
        away_off_rating: ctx.away.advanced.off_rating,
        away_def_rating: ctx.away.advanced.def_rating,
        terms,
        call,
        suggested_threshold: projection - 3.0,
        first_half_estimate: first_half,
    }
}

fn fetch_side(team_id: u64, name: String, season: &str) -> Option<TeamSideContext> {
    let season_stats = nba_client::fetch_team_rate_stats(team_id, season)?;
    // Missing advanced stats fall back to league-typical defaults rather
    // than aborting the matchup.
    let advanced = nba_client::fetch_team_advanced_stats(team_id, season)
        .unwrap_or(crate::model::TeamAdvancedStats {
            pace: 100.0,
            off_rating: 110.0,
            def_rating: 110.0,
        });
    let last5 = nba_client::fetch_team_last5(team_id, season)?;
    Some(TeamSideContext {
        name,
        season: season_stats,
        advanced,
        last5,
    })
}

/// Resolve both teams, fetch their stat bundles (in parallel; the shared
/// rate limiter spaces the provider calls), and score the matchup.
pub fn run(
    home: &str,
    away: &str,
    threshold: Option<f64>,
    policy: TotalPolicy,
    season: &str,
) -> MatchupOutcome {
    let Some(home_team) = nba_client::find_team(home) else {
        return MatchupOutcome::TeamNotFound(MatchupSide::Home);
    };
    let Some(away_team) = nba_client::find_team(away) else {
        return MatchupOutcome::TeamNotFound(MatchupSide::Away);
    };

    let (home_side, away_side) = join(
        || fetch_side(home_team.id, home_team.full_name.to_string(), season),
        || fetch_side(away_team.id, away_team.full_name.to_string(), season),
    );
    let (Some(home_side), Some(away_side)) = (home_side, away_side) else {
        return MatchupOutcome::NoData;
    };

    let ctx = TeamMatchupContext {
        season: season.to_string(),
        home: home_side,
        away: away_side,
    };
    MatchupOutcome::Ready(Box::new(score(&ctx, threshold, policy)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TeamAdvancedStats, TeamLast5Stats, TeamSeasonStats};

    fn side(name: &str, season_pts: f64, last5_pts: f64, pace: f64, off: f64, def: f64) -> TeamSideContext {
        TeamSideContext {
            name: name.to_string(),
            season: TeamSeasonStats {
                points: season_pts,
                opp_points: None,
            },
            advanced: TeamAdvancedStats {
                pace,
                off_rating: off,
                def_rating: def,
            },
            last5: TeamLast5Stats {
                points_avg: last5_pts,
                opp_points_avg: 110.0,
                fg_pct_avg: 47.0,
                fg3_pct_avg: 36.0,
                total_avg: last5_pts + 110.0,
                games: 5,
                avg_margin: 2.0,
            },
        }
    }

    fn balanced_ctx() -> TeamMatchupContext {
        TeamMatchupContext {
            season: "2024-25".to_string(),
            home: side("Home", 114.0, 114.0, 98.0, 113.0, 113.0),
            away: side("Away", 114.0, 114.0, 98.0, 113.0, 113.0),
        }
    }

    #[test]
    fn regression_multiplier_buckets() {
        assert_eq!(regression_multiplier(0.88), 0.90);
        assert_eq!(regression_multiplier(0.92), 0.93);
        assert_eq!(regression_multiplier(1.00), 1.00);
        assert_eq!(regression_multiplier(1.05), 1.02);
        assert_eq!(regression_multiplier(1.10), 1.05);
        // Bucket edges stay in the neutral band.
        assert_eq!(regression_multiplier(0.94), 1.00);
        assert_eq!(regression_multiplier(1.04), 1.00);
        assert_eq!(regression_multiplier(1.08), 1.00);
    }

    #[test]
    fn identical_teams_at_baseline_pace_reduce_to_known_terms() {
        let ctx = balanced_ctx();
        let (total, terms) = project_regression(&ctx);

        assert_eq!(terms.base, 228.0);
        assert_eq!(terms.tempo, 0.0);
        assert_eq!(terms.form, 0.0);
        assert_eq!(terms.home_court, 1.0); // pace == 98 is not "slow"
        assert!((terms.regression_ratio - 1.0).abs() < 1e-12);
        assert_eq!(terms.regression_multiplier, 1.0);

        // V = ((113-113)+(113-113))*0.35, S = (41.5-45)*0.6, D = (226-226)*0.5
        assert_eq!(terms.efficiency, 0.0);
        assert!((terms.shooting - (41.5 - 45.0) * 0.6).abs() < 1e-12);
        assert_eq!(terms.defense_penalty, 0.0);

        let expected = terms.base + terms.efficiency + terms.form + terms.shooting
            - terms.defense_penalty
            + terms.home_court
            + terms.fine_adjustment;
        assert!((total - expected).abs() < 1e-9);
    }

    #[test]
    fn slow_matchups_get_the_larger_home_bump() {
        let mut ctx = balanced_ctx();
        ctx.home.advanced.pace = 96.0;
        ctx.away.advanced.pace = 96.0;
        let (_, terms) = project_regression(&ctx);
        assert_eq!(terms.home_court, 1.5);
        assert!(terms.tempo < 0.0);
    }

    #[test]
    fn strong_defenses_trigger_the_fine_adjustment() {
        let mut ctx = balanced_ctx();
        ctx.home.advanced.def_rating = 110.0;
        ctx.away.advanced.def_rating = 111.0;
        let (_, terms) = project_regression(&ctx);
        assert!((terms.fine_adjustment - (-4.0)).abs() < 1e-12);
    }

    #[test]
    fn form_divergence_subtracts_six() {
        let mut ctx = balanced_ctx();
        ctx.home.last5.points_avg = 130.0; // +16 over season
        let (_, terms) = project_regression(&ctx);
        assert!(terms.fine_adjustment <= -6.0);
    }

    #[test]
    fn hot_away_team_adds_two() {
        let mut ctx = balanced_ctx();
        ctx.away.last5.points_avg = 119.0;
        ctx.away.season.points = 118.0; // keep the form divergence small
        let (_, terms) = project_regression(&ctx);
        assert!((terms.fine_adjustment - 2.0).abs() < 1e-12);
    }

    #[test]
    fn decision_dead_zone_is_a_pass() {
        assert_eq!(decide_regression(220.0, 218.0).decision, TotalDecision::Pass);
        assert_eq!(decide_regression(224.0, 218.0).decision, TotalDecision::Over);
        assert_eq!(decide_regression(214.0, 218.0).decision, TotalDecision::Under);
    }

    #[test]
    fn decision_confidence_tiers() {
        assert_eq!(
            decide_regression(224.0, 218.0).confidence,
            ConfidenceTier::High
        );
        assert_eq!(
            decide_regression(221.5, 218.0).confidence,
            ConfidenceTier::Medium
        );
    }

    #[test]
    fn legacy_projection_is_tempo_scaled() {
        let ctx = balanced_ctx();
        let total = project_legacy(&ctx);
        // (114 + 0.9 + 3.5)*0.98 + (114 + 0.9)*0.98
        let expected = (114.0 + 3.0 * 0.3 + 3.5) * 0.98 + (114.0 + 3.0 * 0.3) * 0.98;
        assert!((total - expected).abs() < 1e-9);
    }

    #[test]
    fn legacy_decision_no_bet_inside_two() {
        assert_eq!(decide_legacy(220.0, 219.0).decision, TotalDecision::Pass);
        assert_eq!(decide_legacy(224.5, 219.0).decision, TotalDecision::Over);
        assert_eq!(decide_legacy(215.0, 219.0).decision, TotalDecision::Under);
    }

    #[test]
    fn score_carries_policy_extras() {
        let ctx = balanced_ctx();
        let regression = score(&ctx, Some(220.0), TotalPolicy::Regression);
        assert!(regression.terms.is_some());
        assert!(regression.first_half_estimate.is_none());

        let legacy = score(&ctx, Some(220.0), TotalPolicy::Legacy);
        assert!(legacy.terms.is_none());
        let fh = legacy.first_half_estimate.unwrap();
        assert!((fh - legacy.projection * 0.48).abs() < 1e-9);
    }

    #[test]
    fn zero_last5_points_guard_regression_ratio() {
        let mut ctx = balanced_ctx();
        ctx.home.last5.points_avg = 0.0;
        ctx.away.last5.points_avg = 0.0;
        let (_, terms) = project_regression(&ctx);
        assert_eq!(terms.regression_ratio, 1.0);
        assert_eq!(terms.regression_multiplier, 1.0);
    }
}
