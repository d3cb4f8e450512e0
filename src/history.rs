//! Append-only record of past player analyses. The engines never read this;
//! it exists so the CLI can show what was asked before and how it was
//! scored.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};

use crate::model::PredictionResult;
use crate::stats_cache::app_cache_dir;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: i64,
    pub player: String,
    pub threshold: f64,
    pub combination: String,
    pub season_avg: f64,
    pub pass_rate: f64,
    pub risk: String,
    pub confidence: i32,
    pub suggested_threshold: f64,
    pub created_at: String,
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("analysis_history.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player TEXT NOT NULL,
            threshold REAL NOT NULL,
            combination TEXT NOT NULL,
            season_avg REAL NOT NULL,
            pass_rate REAL NOT NULL,
            risk TEXT NOT NULL,
            confidence INTEGER NOT NULL,
            suggested_threshold REAL NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .context("init analysis history schema")
}

pub fn record(conn: &Connection, result: &PredictionResult) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO analysis_history
            (player, threshold, combination, season_avg, pass_rate, risk,
             confidence, suggested_threshold, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            result.player,
            result.threshold,
            result.combination.code(),
            result.season_avg,
            result.season_pass_rate,
            result.risk.as_str(),
            result.confidence,
            result.suggested_threshold,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("insert analysis history row")?;
    Ok(())
}

/// Newest entries first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<HistoryEntry>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT id, player, threshold, combination, season_avg, pass_rate,
                   risk, confidence, suggested_threshold, created_at
            FROM analysis_history
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .context("prepare history query")?;

    let rows = stmt
        .query_map(params![limit], |row| {
            Ok(HistoryEntry {
                id: row.get(0)?,
                player: row.get(1)?,
                threshold: row.get(2)?,
                combination: row.get(3)?,
                season_avg: row.get(4)?,
                pass_rate: row.get(5)?,
                risk: row.get(6)?,
                confidence: row.get(7)?,
                suggested_threshold: row.get(8)?,
                created_at: row.get(9)?,
            })
        })
        .context("query analysis history")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("read analysis history row")?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MinutesLevel, RiskLabel, StatCombination};

    fn sample_result(player: &str, confidence: i32) -> PredictionResult {
        PredictionResult {
            player: player.to_string(),
            team: Some("Los Angeles Lakers".to_string()),
            position: Some("F".to_string()),
            season: "2024-25".to_string(),
            combination: StatCombination::PointsAssistsRebounds,
            threshold: 40.0,
            games_played: 70,
            avg_minutes: 35.0,
            minutes_level: MinutesLevel::High,
            season_avg: 42.0,
            last5_avg: 44.0,
            blended_avg: 42.8,
            projection: 43.1,
            season_pass_rate: 64.0,
            season_pass_count: 45,
            season_game_count: 70,
            last5_pass_rate: 80.0,
            last5_pass_count: 4,
            last5_game_count: 5,
            home_avg: 43.0,
            away_avg: 41.0,
            home_away_diff: 2.0,
            team_pace: Some(101.2),
            team_off_rating: Some(114.0),
            tempo_bonus: 0.36,
            std_dev: 5.5,
            risk: RiskLabel::MediumRisk,
            confidence,
            suggested_threshold: 40.3,
            garbage_time_warning: None,
            odds: None,
        }
    }

    #[test]
    fn record_and_read_back_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        record(&conn, &sample_result("LeBron James", 67)).unwrap();
        record(&conn, &sample_result("Nikola Jokic", 82)).unwrap();

        let rows = recent(&conn, 10).unwrap();
        assert_eq!(rows.len(), 2);
        // Newest first.
        assert_eq!(rows[0].player, "Nikola Jokic");
        assert_eq!(rows[0].confidence, 82);
        assert_eq!(rows[1].player, "LeBron James");
        assert_eq!(rows[1].combination, "SAR");
        assert_eq!(rows[1].risk, "medium risk");
    }

    #[test]
    fn recent_respects_the_limit() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        for i in 0..5 {
            record(&conn, &sample_result(&format!("Player {i}"), 50 + i)).unwrap();
        }
        let rows = recent(&conn, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].player, "Player 4");
    }
}
