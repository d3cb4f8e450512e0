use nba_props::model::{
    GameRow, PlayerProfile, RiskLabel, SeasonAggregate, StatCombination, ThresholdQuery,
    VenueContext,
};
use nba_props::threshold::{analyze, PlayerDataset};

fn game(date: &str, matchup: &str, points: f64) -> GameRow {
    GameRow {
        game_date: date.to_string(),
        matchup: matchup.to_string(),
        win: Some(true),
        minutes: 34.0,
        points,
        rebounds: 8.0,
        off_rebounds: 2.0,
        def_rebounds: 6.0,
        assists: 6.0,
        steals: 1.0,
        blocks: 1.0,
        turnovers: 3.0,
        fouls: 2.0,
        fgm: 9.0,
        fga: 19.0,
        fg3m: 2.0,
        fg3a: 6.0,
        ftm: 4.0,
        fta: 5.0,
        plus_minus: 4.0,
    }
}

/// Seven games, newest first. Points: 30, 26, 25, 27, 23, 35, 22.
fn dataset(team_pace: Option<f64>) -> PlayerDataset {
    let games = vec![
        game("JAN 15, 2025", "LAL vs. MIA", 30.0),
        game("JAN 13, 2025", "LAL vs. SAS", 26.0),
        game("JAN 11, 2025", "LAL @ DAL", 25.0),
        game("JAN 09, 2025", "LAL @ CHA", 27.0),
        game("JAN 07, 2025", "LAL vs. DAL", 23.0),
        game("JAN 05, 2025", "LAL @ HOU", 35.0),
        game("JAN 03, 2025", "LAL vs. ATL", 22.0),
    ];
    let points_total: f64 = games.iter().map(|g| g.points).sum();
    PlayerDataset {
        player: "Test Player".to_string(),
        profile: PlayerProfile {
            team_name: Some("Los Angeles Lakers".to_string()),
            team_abbreviation: Some("LAL".to_string()),
            position: Some("F".to_string()),
        },
        season: SeasonAggregate {
            season: "2024-25".to_string(),
            games_played: 7,
            minutes: 238.0,
            points: points_total,
            rebounds: 56.0,
            assists: 42.0,
            steals: 7.0,
            blocks: 7.0,
            turnovers: 21.0,
        },
        games,
        team_pace,
        team_off_rating: Some(113.0),
    }
}

fn query(threshold: f64, venue: VenueContext, odds: Option<f64>) -> ThresholdQuery {
    ThresholdQuery {
        player: "Test Player".to_string(),
        threshold,
        combination: StatCombination::Points,
        venue,
        odds,
    }
}

#[test]
fn unknown_venue_blends_season_and_last5() {
    let result = analyze(&dataset(Some(102.0)), &query(25.0, VenueContext::Unknown, None));

    let season_avg = 188.0 / 7.0;
    let last5_avg = (30.0 + 26.0 + 25.0 + 27.0 + 23.0) / 5.0;
    assert!((result.season_avg - season_avg).abs() < 1e-9);
    assert!((result.last5_avg - last5_avg).abs() < 1e-9);
    assert!((result.blended_avg - (season_avg * 0.6 + last5_avg * 0.4)).abs() < 1e-9);

    // Pace 102 clears the 100 floor by two.
    assert!((result.tempo_bonus - 0.6).abs() < 1e-9);
    assert!((result.projection - (result.blended_avg + 0.6)).abs() < 1e-9);

    assert_eq!(result.season_pass_count, 5);
    assert_eq!(result.season_game_count, 7);
    assert_eq!(result.last5_pass_count, 4);
    assert!((result.last5_pass_rate - 80.0).abs() < 1e-9);

    assert_eq!(result.risk, RiskLabel::HighRisk);
    assert_eq!(result.confidence, 50);
}

#[test]
fn home_venue_weights_home_average() {
    let result = analyze(&dataset(None), &query(25.0, VenueContext::Home, None));

    let home_avg = (30.0 + 26.0 + 23.0 + 22.0) / 4.0;
    let away_avg = (25.0 + 27.0 + 35.0) / 3.0;
    let season_avg = 188.0 / 7.0;
    assert!((result.home_avg - home_avg).abs() < 1e-9);
    assert!((result.away_avg - away_avg).abs() < 1e-9);
    assert!((result.home_away_diff - (home_avg - away_avg)).abs() < 1e-9);
    assert!((result.blended_avg - (home_avg * 0.7 + season_avg * 0.3)).abs() < 1e-9);
    // No pace data, no bonus.
    assert_eq!(result.tempo_bonus, 0.0);
    assert!(result.team_pace.is_none());
}

#[test]
fn away_venue_weights_away_average() {
    let result = analyze(&dataset(None), &query(25.0, VenueContext::Away, None));
    let away_avg = (25.0 + 27.0 + 35.0) / 3.0;
    let season_avg = 188.0 / 7.0;
    assert!((result.blended_avg - (away_avg * 0.7 + season_avg * 0.3)).abs() < 1e-9);
}

#[test]
fn slow_pace_earns_no_bonus() {
    let result = analyze(&dataset(Some(98.5)), &query(25.0, VenueContext::Unknown, None));
    assert_eq!(result.tempo_bonus, 0.0);
    assert_eq!(result.team_pace, Some(98.5));
}

#[test]
fn analysis_is_deterministic() {
    let data = dataset(Some(101.0));
    let q = query(25.0, VenueContext::Unknown, None);
    let first = analyze(&data, &q);
    let second = analyze(&data, &q);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn strong_favorite_odds_shrink_the_projection() {
    let data = dataset(Some(102.0));
    let plain = analyze(&data, &query(25.0, VenueContext::Unknown, None));
    let adjusted = analyze(&data, &query(25.0, VenueContext::Unknown, Some(1.22)));

    assert!(adjusted.projection < plain.projection);
    assert!((adjusted.projection - plain.projection * 0.92).abs() < 1e-9);
    assert!(adjusted.garbage_time_warning.is_some());
    assert_eq!(adjusted.odds, Some(1.22));

    // The safer-threshold suggestion is computed before the penalty.
    assert!((adjusted.suggested_threshold - plain.suggested_threshold).abs() < 1e-9);
}

#[test]
fn moderate_odds_change_nothing() {
    let data = dataset(Some(102.0));
    let plain = analyze(&data, &query(25.0, VenueContext::Unknown, None));
    let with_odds = analyze(&data, &query(25.0, VenueContext::Unknown, Some(1.85)));

    assert_eq!(with_odds.projection, plain.projection);
    assert_eq!(with_odds.confidence, plain.confidence);
    assert!(with_odds.garbage_time_warning.is_none());
}

#[test]
fn penalty_reclassifies_against_the_new_margin() {
    // Threshold close under the projection: the 8% shrink drops the margin
    // below zero and the verdict collapses to the bottom tier.
    let data = dataset(Some(102.0));
    let q_plain = query(26.0, VenueContext::Unknown, None);
    let q_odds = query(26.0, VenueContext::Unknown, Some(1.22));

    let plain = analyze(&data, &q_plain);
    let adjusted = analyze(&data, &q_odds);

    assert!(plain.projection > 26.0);
    assert_eq!(plain.risk, RiskLabel::Risky);
    assert!(adjusted.projection < 26.0);
    assert_eq!(adjusted.risk, RiskLabel::Avoid);
    assert!(adjusted.confidence < plain.confidence);
}

#[test]
fn result_shape_keeps_its_field_names() {
    // The serialized mapping is append-only; consumers key on these names.
    let result = analyze(&dataset(Some(101.0)), &query(25.0, VenueContext::Unknown, None));
    let value = serde_json::to_value(&result).unwrap();
    for key in [
        "player",
        "season_avg",
        "last5_avg",
        "blended_avg",
        "projection",
        "threshold",
        "season_pass_rate",
        "last5_pass_rate",
        "std_dev",
        "risk",
        "confidence",
        "suggested_threshold",
        "home_avg",
        "away_avg",
        "tempo_bonus",
    ] {
        assert!(value.get(key).is_some(), "missing field {key}");
    }
}
