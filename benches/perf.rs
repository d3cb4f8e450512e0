use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use nba_props::box_score::season_rollup;
use nba_props::model::{
    GameRow, PlayerProfile, SeasonAggregate, StatCombination, TeamAdvancedStats, TeamLast5Stats,
    TeamMatchupContext, TeamSeasonStats, TeamSideContext, ThresholdQuery, VenueContext,
};
use nba_props::nba_client::parse_game_log_json;
use nba_props::team_total::project_regression;
use nba_props::threshold::{analyze, PlayerDataset};

static GAME_LOG_JSON: &str = include_str!("../tests/fixtures/player_gamelog.json");

fn sample_games(count: usize) -> Vec<GameRow> {
    (0..count)
        .map(|i| GameRow {
            game_date: format!("JAN {:02}, 2025", (count - i) % 28 + 1),
            matchup: if i % 2 == 0 {
                "LAL vs. BOS".to_string()
            } else {
                "LAL @ BOS".to_string()
            },
            win: Some(i % 3 != 0),
            minutes: 30.0 + (i % 10) as f64,
            points: 18.0 + (i % 15) as f64,
            rebounds: 5.0 + (i % 8) as f64,
            off_rebounds: 1.0,
            def_rebounds: 4.0 + (i % 8) as f64,
            assists: 4.0 + (i % 7) as f64,
            steals: (i % 3) as f64,
            blocks: (i % 2) as f64,
            turnovers: 2.0 + (i % 4) as f64,
            fouls: 2.0,
            fgm: 7.0 + (i % 6) as f64,
            fga: 16.0 + (i % 6) as f64,
            fg3m: 2.0,
            fg3a: 6.0,
            ftm: 3.0,
            fta: 4.0,
            plus_minus: (i as f64 % 20.0) - 10.0,
        })
        .collect()
}

fn sample_dataset() -> PlayerDataset {
    let games = sample_games(72);
    let season = SeasonAggregate {
        season: "2024-25".to_string(),
        games_played: games.len() as u32,
        minutes: games.iter().map(|g| g.minutes).sum(),
        points: games.iter().map(|g| g.points).sum(),
        rebounds: games.iter().map(|g| g.rebounds).sum(),
        assists: games.iter().map(|g| g.assists).sum(),
        steals: games.iter().map(|g| g.steals).sum(),
        blocks: games.iter().map(|g| g.blocks).sum(),
        turnovers: games.iter().map(|g| g.turnovers).sum(),
    };
    PlayerDataset {
        player: "Bench Player".to_string(),
        profile: PlayerProfile::default(),
        season,
        games,
        team_pace: Some(101.5),
        team_off_rating: Some(114.0),
    }
}

fn bench_game_log_parse(c: &mut Criterion) {
    c.bench_function("game_log_parse", |b| {
        b.iter(|| {
            let games = parse_game_log_json(black_box(GAME_LOG_JSON)).unwrap();
            black_box(games.len());
        })
    });
}

fn bench_threshold_analyze(c: &mut Criterion) {
    let dataset = sample_dataset();
    let query = ThresholdQuery {
        player: "Bench Player".to_string(),
        threshold: 32.0,
        combination: StatCombination::PointsAssistsRebounds,
        venue: VenueContext::Unknown,
        odds: Some(1.22),
    };
    c.bench_function("threshold_analyze", |b| {
        b.iter(|| {
            let result = analyze(black_box(&dataset), black_box(&query));
            black_box(result.confidence);
        })
    });
}

fn bench_season_rollup(c: &mut Criterion) {
    let games = sample_games(72);
    c.bench_function("season_rollup", |b| {
        b.iter(|| {
            let rollup = season_rollup(black_box(&games));
            black_box(rollup.avg_ts_pct);
        })
    });
}

fn bench_team_projection(c: &mut Criterion) {
    let side = |pts: f64, last5: f64| TeamSideContext {
        name: "Bench".to_string(),
        season: TeamSeasonStats {
            points: pts,
            opp_points: None,
        },
        advanced: TeamAdvancedStats {
            pace: 100.4,
            off_rating: 114.2,
            def_rating: 112.7,
        },
        last5: TeamLast5Stats {
            points_avg: last5,
            opp_points_avg: 111.0,
            fg_pct_avg: 47.0,
            fg3_pct_avg: 36.0,
            total_avg: last5 + 111.0,
            games: 5,
            avg_margin: 2.5,
        },
    };
    let ctx = TeamMatchupContext {
        season: "2024-25".to_string(),
        home: side(114.5, 117.8),
        away: side(111.9, 109.4),
    };
    c.bench_function("team_projection", |b| {
        b.iter(|| {
            let (total, terms) = project_regression(black_box(&ctx));
            black_box((total, terms.regression_multiplier));
        })
    });
}

criterion_group!(
    perf,
    bench_game_log_parse,
    bench_threshold_analyze,
    bench_season_rollup,
    bench_team_projection
);
criterion_main!(perf);
