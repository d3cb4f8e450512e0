//! Player threshold engine: turns a season of box scores into a
//! confidence-scored verdict on whether the player clears a stat threshold.

use serde::Serialize;

use crate::box_score::{mean, per_game, sample_std};
use crate::garbage_time;
use crate::model::{
    GameRow, MinutesLevel, PlayerProfile, PredictionResult, RiskLabel, SeasonAggregate,
    StatCombination, ThresholdQuery, Venue, VenueContext,
};
use crate::nba_client;

const HOME_AWAY_WEIGHT: f64 = 0.7;
const SEASON_WEIGHT_WITH_VENUE: f64 = 0.3;
const SEASON_WEIGHT_UNKNOWN: f64 = 0.6;
const LAST5_WEIGHT_UNKNOWN: f64 = 0.4;
const TEMPO_PACE_FLOOR: f64 = 100.0;
const TEMPO_BONUS_PER_PACE: f64 = 0.3;
const LAST5_WINDOW: usize = 5;

/// Everything the pure analysis needs, assembled by the fetch step (or by a
/// test directly).
#[derive(Debug, Clone)]
pub struct PlayerDataset {
    pub player: String,
    pub profile: PlayerProfile,
    pub season: SeasonAggregate,
    /// Game log, newest first.
    pub games: Vec<GameRow>,
    pub team_pace: Option<f64>,
    pub team_off_rating: Option<f64>,
}

/// Engine outcome. Absence is data, not an error: the caller renders a clean
/// "analysis unavailable" for the non-Ready variants.
#[derive(Debug, Clone)]
pub enum PlayerAnalysisOutcome {
    Ready(Box<PredictionResult>),
    PlayerNotFound,
    NoSeasonData,
    NoGameLog,
}

pub fn combined_values(games: &[GameRow], combination: StatCombination) -> Vec<f64> {
    games.iter().map(|g| combination.value(g)).collect()
}

/// Pass rate as a percentage plus raw counts.
pub fn pass_rate(values: &[f64], threshold: f64) -> (f64, u32, u32) {
    let total = values.len() as u32;
    let passed = values.iter().filter(|v| **v >= threshold).count() as u32;
    let rate = if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    };
    (rate, passed, total)
}

/// Average of the combined value over home games and away games separately.
/// A side with no games averages to zero.
pub fn home_away_split(games: &[GameRow], combination: StatCombination) -> (f64, f64) {
    let mut home = Vec::new();
    let mut away = Vec::new();
    for g in games {
        match g.venue() {
            Some(Venue::Home) => home.push(combination.value(g)),
            Some(Venue::Away) => away.push(combination.value(g)),
            None => {}
        }
    }
    (mean(&home), mean(&away))
}

fn consistency_coeff(std_dev: f64) -> f64 {
    if std_dev > 10.0 {
        0.6
    } else if std_dev > 7.0 {
        0.75
    } else if std_dev > 5.0 {
        0.9
    } else if std_dev < 4.0 {
        1.15
    } else {
        1.0
    }
}

/// Risk tier and confidence for a projection against the threshold.
///
/// The sub-60 last-5 penalty is applied to the margin before both the
/// confidence formula and the tier conditions, so a cold streak degrades the
/// tier as well as the score. First matching tier wins.
pub fn classify(
    projection: f64,
    threshold: f64,
    season_pass_rate: f64,
    last5_pass_rate: f64,
    std_dev: f64,
) -> (RiskLabel, i32) {
    let mut diff = projection - threshold;

    let consistency = consistency_coeff(std_dev);
    let form = (last5_pass_rate * 0.7 + season_pass_rate * 0.3) / 100.0;

    if last5_pass_rate < 60.0 {
        diff -= (60.0 - last5_pass_rate) * 0.1;
    }

    let confidence = if threshold > 0.0 {
        ((diff / threshold * 100.0) * consistency * form) as i32
    } else {
        0
    };
    let confidence = confidence.clamp(0, 100);

    if diff >= 5.0 && last5_pass_rate >= 80.0 && std_dev < 6.0 {
        (RiskLabel::VerySafe, confidence.max(85))
    } else if diff >= 4.0 && last5_pass_rate >= 70.0 && std_dev < 7.0 {
        (RiskLabel::Safe, confidence.max(75))
    } else if diff >= 3.0 && last5_pass_rate >= 60.0 {
        let floor = if std_dev > 7.0 { 60 } else { 65 };
        (RiskLabel::MediumRisk, confidence.max(floor))
    } else if diff >= 1.5 && last5_pass_rate >= 50.0 {
        (RiskLabel::HighRisk, confidence.max(50))
    } else if diff >= 0.0 && last5_pass_rate >= 40.0 {
        (RiskLabel::Risky, confidence.max(40))
    } else {
        (RiskLabel::Avoid, confidence.min(30))
    }
}

pub fn suggested_threshold(projection: f64, std_dev: f64) -> f64 {
    (projection - 0.5 * std_dev).max(0.0)
}

/// Pure analysis over an assembled dataset. Deterministic: identical inputs
/// yield an identical result.
pub fn analyze(dataset: &PlayerDataset, query: &ThresholdQuery) -> PredictionResult {
    let combo = query.combination;
    let season_avg = per_game(
        combo.season_total(&dataset.season),
        dataset.season.games_played,
    );

    let values = combined_values(&dataset.games, combo);
    let last5: Vec<f64> = values.iter().copied().take(LAST5_WINDOW).collect();

    let (season_rate, season_passed, season_total) = pass_rate(&values, query.threshold);
    let (last5_rate, last5_passed, last5_total) = pass_rate(&last5, query.threshold);
    let last5_avg = mean(&last5);
    let std_dev = sample_std(&values);
    let (home_avg, away_avg) = home_away_split(&dataset.games, combo);

    let blended = match query.venue {
        VenueContext::Home => {
            home_avg * HOME_AWAY_WEIGHT + season_avg * SEASON_WEIGHT_WITH_VENUE
        }
        VenueContext::Away => {
            away_avg * HOME_AWAY_WEIGHT + season_avg * SEASON_WEIGHT_WITH_VENUE
        }
        VenueContext::Unknown => {
            season_avg * SEASON_WEIGHT_UNKNOWN + last5_avg * LAST5_WEIGHT_UNKNOWN
        }
    };

    let tempo_bonus = match dataset.team_pace {
        Some(pace) if pace > TEMPO_PACE_FLOOR => (pace - TEMPO_PACE_FLOOR) * TEMPO_BONUS_PER_PACE,
        _ => 0.0,
    };

    let mut projection = blended + tempo_bonus;
    let (mut risk, mut confidence) =
        classify(projection, query.threshold, season_rate, last5_rate, std_dev);

    // The suggested line comes from the unpenalized projection and is not
    // recomputed after a garbage-time shrink.
    let suggested = suggested_threshold(projection, std_dev);

    let mut garbage_time_warning = None;
    if let Some(odds) = query.odds {
        let adjusted = garbage_time::apply_penalty(projection, confidence, odds, None);
        if adjusted.penalty_applied {
            projection = adjusted.projection;
            garbage_time_warning = Some(adjusted.risk.recommendation.clone());
            let re = classify(projection, query.threshold, season_rate, last5_rate, std_dev);
            risk = re.0;
            confidence = re.1;
        }
    }

    let avg_minutes = dataset.season.avg_minutes();

    PredictionResult {
        player: dataset.player.clone(),
        team: dataset.profile.team_name.clone(),
        position: dataset.profile.position.clone(),
        season: dataset.season.season.clone(),
        combination: combo,
        threshold: query.threshold,
        games_played: dataset.season.games_played,
        avg_minutes,
        minutes_level: MinutesLevel::from_avg(avg_minutes),
        season_avg,
        last5_avg,
        blended_avg: blended,
        projection,
        season_pass_rate: season_rate,
        season_pass_count: season_passed,
        season_game_count: season_total,
        last5_pass_rate: last5_rate,
        last5_pass_count: last5_passed,
        last5_game_count: last5_total,
        home_avg,
        away_avg,
        home_away_diff: home_avg - away_avg,
        team_pace: dataset.team_pace,
        team_off_rating: dataset.team_off_rating,
        tempo_bonus,
        std_dev,
        risk,
        confidence,
        suggested_threshold: suggested,
        garbage_time_warning,
        odds: query.odds,
    }
}

/// Fetch-and-analyze. Resolution is substring, case-insensitive, first match
/// wins; ambiguous names are not disambiguated.
pub fn run(query: &ThresholdQuery, season: Option<&str>) -> PlayerAnalysisOutcome {
    let Some(candidates) = nba_client::find_players(&query.player) else {
        return PlayerAnalysisOutcome::PlayerNotFound;
    };
    let Some(player) = candidates.first() else {
        return PlayerAnalysisOutcome::PlayerNotFound;
    };

    let profile = nba_client::fetch_player_profile(player.id).unwrap_or_default();

    let Some((season_agg, resolved_season)) =
        nba_client::fetch_season_aggregate(player.id, season)
    else {
        return PlayerAnalysisOutcome::NoSeasonData;
    };

    let games = nba_client::fetch_game_log(player.id, &resolved_season).unwrap_or_default();
    if games.is_empty() {
        return PlayerAnalysisOutcome::NoGameLog;
    }

    let team_name = profile
        .team_name
        .clone()
        .or_else(|| profile.team_abbreviation.clone());
    let advanced = team_name
        .as_deref()
        .and_then(nba_client::find_team)
        .and_then(|team| nba_client::fetch_team_advanced_stats(team.id, &resolved_season));

    let dataset = PlayerDataset {
        player: player.full_name.clone(),
        profile,
        season: season_agg,
        games,
        team_pace: advanced.map(|a| a.pace),
        team_off_rating: advanced.map(|a| a.off_rating),
    };

    PlayerAnalysisOutcome::Ready(Box::new(analyze(&dataset, query)))
}

#[derive(Debug, Clone, Serialize)]
pub struct SerializedOutcome {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PredictionResult>,
}

impl PlayerAnalysisOutcome {
    pub fn serializable(&self) -> SerializedOutcome {
        match self {
            PlayerAnalysisOutcome::Ready(result) => SerializedOutcome {
                status: "ok",
                result: Some((**result).clone()),
            },
            PlayerAnalysisOutcome::PlayerNotFound => SerializedOutcome {
                status: "player_not_found",
                result: None,
            },
            PlayerAnalysisOutcome::NoSeasonData => SerializedOutcome {
                status: "no_season_data",
                result: None,
            },
            PlayerAnalysisOutcome::NoGameLog => SerializedOutcome {
                status: "no_game_log",
                result: None,
            },
        }
    }
}
