use serde::{Deserialize, Serialize};

use crate::model::GameRow;

/// Per-game average, guarded against an empty season.
pub fn per_game(total: f64, games: u32) -> f64 {
    if games == 0 { 0.0 } else { total / games as f64 }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1). Zero for fewer than two samples.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// TS% = PTS / (2 * (FGA + 0.44 * FTA)). Zero when the denominator is zero.
pub fn true_shooting_pct(points: f64, fga: f64, fta: f64) -> f64 {
    let denom = 2.0 * (fga + 0.44 * fta);
    if denom == 0.0 { 0.0 } else { points / denom }
}

/// eFG% = (FGM + 0.5 * FG3M) / FGA. Zero when FGA is zero.
pub fn effective_fg_pct(fgm: f64, fg3m: f64, fga: f64) -> f64 {
    if fga == 0.0 { 0.0 } else { (fgm + 0.5 * fg3m) / fga }
}

/// AST/TOV. With zero turnovers the raw assist count is reported (not a true
/// ratio ceiling); zero assists and zero turnovers report zero.
pub fn assist_turnover_ratio(assists: f64, turnovers: f64) -> f64 {
    if turnovers > 0.0 {
        assists / turnovers
    } else if assists > 0.0 {
        assists
    } else {
        0.0
    }
}

fn double_digit_count(points: f64, rebounds: f64, assists: f64, steals: f64, blocks: f64) -> usize {
    [points, rebounds, assists, steals, blocks]
        .iter()
        .filter(|v| **v >= 10.0)
        .count()
}

pub fn is_double_double(points: f64, rebounds: f64, assists: f64, steals: f64, blocks: f64) -> bool {
    double_digit_count(points, rebounds, assists, steals, blocks) >= 2
}

pub fn is_triple_double(points: f64, rebounds: f64, assists: f64, steals: f64, blocks: f64) -> bool {
    double_digit_count(points, rebounds, assists, steals, blocks) >= 3
}

/// A game row with its derived shooting/playmaking metrics attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub game: GameRow,
    pub ts_pct: f64,
    pub efg_pct: f64,
    pub ast_tov_ratio: f64,
    pub double_double: bool,
    pub triple_double: bool,
}

pub fn enrich(game: &GameRow) -> EnrichedRow {
    EnrichedRow {
        ts_pct: true_shooting_pct(game.points, game.fga, game.fta),
        efg_pct: effective_fg_pct(game.fgm, game.fg3m, game.fga),
        ast_tov_ratio: assist_turnover_ratio(game.assists, game.turnovers),
        double_double: is_double_double(
            game.points,
            game.rebounds,
            game.assists,
            game.steals,
            game.blocks,
        ),
        triple_double: is_triple_double(
            game.points,
            game.rebounds,
            game.assists,
            game.steals,
            game.blocks,
        ),
        game: game.clone(),
    }
}

/// Season-level means over the enriched columns plus double/triple-double
/// tallies. Percentages are fractions of games played.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonRollup {
    pub games: u32,
    pub avg_minutes: f64,
    pub avg_points: f64,
    pub avg_rebounds: f64,
    pub avg_off_rebounds: f64,
    pub avg_def_rebounds: f64,
    pub avg_assists: f64,
    pub avg_steals: f64,
    pub avg_blocks: f64,
    pub avg_turnovers: f64,
    pub avg_fouls: f64,
    pub avg_plus_minus: f64,
    pub avg_ts_pct: f64,
    pub avg_efg_pct: f64,
    pub avg_ast_tov_ratio: f64,
    pub avg_fgm: f64,
    pub avg_fga: f64,
    pub avg_fg3m: f64,
    pub avg_fg3a: f64,
    pub avg_ftm: f64,
    pub avg_fta: f64,
    pub avg_fg2m: f64,
    pub avg_fg2a: f64,
    pub fg2_pct: f64,
    pub double_doubles: u32,
    pub triple_doubles: u32,
    pub double_double_pct: f64,
    pub triple_double_pct: f64,
}

pub fn season_rollup(games: &[GameRow]) -> SeasonRollup {
    if games.is_empty() {
        return SeasonRollup::default();
    }

    let enriched: Vec<EnrichedRow> = games.iter().map(enrich).collect();
    let n = games.len() as u32;

    let col = |f: fn(&GameRow) -> f64| -> f64 {
        mean(&games.iter().map(f).collect::<Vec<_>>())
    };

    let double_doubles = enriched.iter().filter(|e| e.double_double).count() as u32;
    let triple_doubles = enriched.iter().filter(|e| e.triple_double).count() as u32;

    let fg2m_total: f64 = games.iter().map(|g| g.fgm - g.fg3m).sum();
    let fg2a_total: f64 = games.iter().map(|g| g.fga - g.fg3a).sum();

    SeasonRollup {
        games: n,
        avg_minutes: col(|g| g.minutes),
        avg_points: col(|g| g.points),
        avg_rebounds: col(|g| g.rebounds),
        avg_off_rebounds: col(|g| g.off_rebounds),
        avg_def_rebounds: col(|g| g.def_rebounds),
        avg_assists: col(|g| g.assists),
        avg_steals: col(|g| g.steals),
        avg_blocks: col(|g| g.blocks),
        avg_turnovers: col(|g| g.turnovers),
        avg_fouls: col(|g| g.fouls),
        avg_plus_minus: col(|g| g.plus_minus),
        avg_ts_pct: mean(&enriched.iter().map(|e| e.ts_pct).collect::<Vec<_>>()),
        avg_efg_pct: mean(&enriched.iter().map(|e| e.efg_pct).collect::<Vec<_>>()),
        avg_ast_tov_ratio: mean(&enriched.iter().map(|e| e.ast_tov_ratio).collect::<Vec<_>>()),
        avg_fgm: col(|g| g.fgm),
        avg_fga: col(|g| g.fga),
        avg_fg3m: col(|g| g.fg3m),
        avg_fg3a: col(|g| g.fg3a),
        avg_ftm: col(|g| g.ftm),
        avg_fta: col(|g| g.fta),
        avg_fg2m: fg2m_total / n as f64,
        avg_fg2a: fg2a_total / n as f64,
        fg2_pct: if fg2a_total > 0.0 { fg2m_total / fg2a_total } else { 0.0 },
        double_doubles,
        triple_doubles,
        double_double_pct: double_doubles as f64 / n as f64 * 100.0,
        triple_double_pct: triple_doubles as f64 / n as f64 * 100.0,
    }
}
