//! Stats-provider client. Endpoint wrappers fetch the NBA tabular JSON shape
//! (`resultSets` with `headers` + `rowSet`), parse it into the crate's model
//! types, and flatten transient failure to absence: after retries are
//! exhausted an error is logged and the caller sees "no data", never a
//! transport error kind.

use std::collections::HashMap;
use std::env;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::Value;

use crate::http_client::http_client;
use crate::model::{
    current_season, GameRow, PlayerProfile, PlayerRef, SeasonAggregate, TeamAdvancedStats,
    TeamLast5Stats, TeamRef, TeamSeasonStats,
};
use crate::stats_cache;

const STATS_BASE: &str = "https://stats.nba.com/stats";

const PLAYER_INDEX_TTL: Duration = Duration::from_secs(24 * 3600);
const CAREER_TTL: Duration = Duration::from_secs(24 * 3600);
const GAME_LOG_TTL: Duration = Duration::from_secs(3 * 3600);
const PROFILE_TTL: Duration = Duration::from_secs(24 * 3600);
const TEAM_STATS_TTL: Duration = Duration::from_secs(6 * 3600);
const TEAM_LOG_TTL: Duration = Duration::from_secs(3 * 3600);

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 500;
const RETRY_BACKOFF: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub min_interval: Duration,
    pub cache_disabled: bool,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let min_interval_ms = env::var("NBA_MIN_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300)
            .clamp(0, 5_000);
        let cache_disabled = env::var("NBA_CACHE_DISABLED")
            .map(|v| {
                let v = v.trim().to_ascii_lowercase();
                v == "1" || v == "true" || v == "yes"
            })
            .unwrap_or(false);
        Self {
            min_interval: Duration::from_millis(min_interval_ms),
            cache_disabled,
        }
    }
}

static CONFIG: OnceCell<ClientConfig> = OnceCell::new();
static LAST_CALL: Mutex<Option<Instant>> = Mutex::new(None);

fn config() -> &'static ClientConfig {
    CONFIG.get_or_init(ClientConfig::from_env)
}

/// Space provider calls by the configured minimum interval. Cache hits do
/// not pass through here.
fn rate_limit() {
    let min_interval = config().min_interval;
    if min_interval.is_zero() {
        return;
    }
    let mut guard = LAST_CALL.lock().expect("rate limiter lock poisoned");
    if let Some(last) = *guard {
        let elapsed = last.elapsed();
        if elapsed < min_interval {
            std::thread::sleep(min_interval - elapsed);
        }
    }
    *guard = Some(Instant::now());
}

fn fetch_stats_json(url: &str, ttl: Duration) -> Result<String> {
    let cfg = config();
    if !cfg.cache_disabled {
        if let Some(body) = stats_cache::lookup(url, ttl) {
            return Ok(body);
        }
    }

    let client = http_client()?;
    let mut delay = Duration::from_millis(RETRY_DELAY_MS);
    let mut last_err = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            std::thread::sleep(delay);
            delay = Duration::from_millis((delay.as_millis() as f64 * RETRY_BACKOFF) as u64);
        }
        rate_limit();

        let outcome = client
            .get(url)
            .send()
            .context("request failed")
            .and_then(|resp| {
                let status = resp.status();
                let body = resp.text().context("failed reading body")?;
                if !status.is_success() {
                    return Err(anyhow!("http {}: {}", status, body));
                }
                Ok(body)
            });

        match outcome {
            Ok(body) => {
                if !cfg.cache_disabled {
                    stats_cache::store(url, &body);
                }
                return Ok(body);
            }
            Err(err) => {
                eprintln!(
                    "warning: provider call failed (attempt {}/{}): {err:#}",
                    attempt + 1,
                    MAX_RETRIES
                );
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("provider call failed")))
}

// ---------------------------------------------------------------------------
// resultSet table parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(default, rename = "resultSets")]
    result_sets: Vec<ResultTable>,
    // A few endpoints use the singular key.
    #[serde(default, rename = "resultSet")]
    result_set: Option<ResultTable>,
}

#[derive(Debug, Deserialize)]
struct ResultTable {
    #[serde(default)]
    name: String,
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<Value>>,
}

/// Column access by header name over one result table.
struct TableReader {
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl TableReader {
    fn new(table: ResultTable) -> Self {
        let index = table
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_ascii_uppercase(), i))
            .collect();
        Self {
            index,
            rows: table.row_set,
        }
    }

    fn has(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    fn f64(&self, row: &[Value], column: &str) -> Option<f64> {
        let value = row.get(*self.index.get(column)?)?;
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn u64(&self, row: &[Value], column: &str) -> Option<u64> {
        self.f64(row, column).map(|v| v as u64)
    }

    fn string(&self, row: &[Value], column: &str) -> Option<String> {
        let value = row.get(*self.index.get(column)?)?;
        match value {
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() { None } else { Some(s.to_string()) }
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn find_table(raw: &str, name: &str) -> Result<TableReader> {
    let resp: StatsResponse = serde_json::from_str(raw).context("parse stats response")?;
    let table = resp
        .result_sets
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
        .or(resp.result_set)
        .ok_or_else(|| anyhow!("result set '{name}' missing"))?;
    Ok(TableReader::new(table))
}

pub fn parse_player_index_json(raw: &str) -> Result<Vec<PlayerRef>> {
    let table = find_table(raw, "CommonAllPlayers")?;
    let mut players = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let Some(id) = table.u64(row, "PERSON_ID") else {
            continue;
        };
        let Some(full_name) = table.string(row, "DISPLAY_FIRST_LAST") else {
            continue;
        };
        players.push(PlayerRef { id, full_name });
    }
    Ok(players)
}

pub fn parse_career_totals_json(raw: &str) -> Result<Vec<SeasonAggregate>> {
    let table = find_table(raw, "SeasonTotalsRegularSeason")?;
    let mut seasons = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let Some(season) = table.string(row, "SEASON_ID") else {
            continue;
        };
        seasons.push(SeasonAggregate {
            season,
            games_played: table.f64(row, "GP").unwrap_or(0.0) as u32,
            minutes: table.f64(row, "MIN").unwrap_or(0.0),
            points: table.f64(row, "PTS").unwrap_or(0.0),
            rebounds: table.f64(row, "REB").unwrap_or(0.0),
            assists: table.f64(row, "AST").unwrap_or(0.0),
            steals: table.f64(row, "STL").unwrap_or(0.0),
            blocks: table.f64(row, "BLK").unwrap_or(0.0),
            turnovers: table.f64(row, "TOV").unwrap_or(0.0),
        });
    }
    Ok(seasons)
}

pub fn parse_game_log_json(raw: &str) -> Result<Vec<GameRow>> {
    let table = find_table(raw, "PlayerGameLog")?;
    let mut games = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let game = GameRow {
            game_date: table.string(row, "GAME_DATE").unwrap_or_default(),
            matchup: table.string(row, "MATCHUP").unwrap_or_default(),
            win: table.string(row, "WL").map(|wl| wl == "W"),
            minutes: table.f64(row, "MIN").unwrap_or(0.0),
            points: table.f64(row, "PTS").unwrap_or(0.0),
            rebounds: table.f64(row, "REB").unwrap_or(0.0),
            off_rebounds: table.f64(row, "OREB").unwrap_or(0.0),
            def_rebounds: table.f64(row, "DREB").unwrap_or(0.0),
            assists: table.f64(row, "AST").unwrap_or(0.0),
            steals: table.f64(row, "STL").unwrap_or(0.0),
            blocks: table.f64(row, "BLK").unwrap_or(0.0),
            turnovers: table.f64(row, "TOV").unwrap_or(0.0),
            fouls: table.f64(row, "PF").unwrap_or(0.0),
            fgm: table.f64(row, "FGM").unwrap_or(0.0),
            fga: table.f64(row, "FGA").unwrap_or(0.0),
            fg3m: table.f64(row, "FG3M").unwrap_or(0.0),
            fg3a: table.f64(row, "FG3A").unwrap_or(0.0),
            ftm: table.f64(row, "FTM").unwrap_or(0.0),
            fta: table.f64(row, "FTA").unwrap_or(0.0),
            plus_minus: table.f64(row, "PLUS_MINUS").unwrap_or(0.0),
        };
        games.push(game.sanitize());
    }
    Ok(games)
}

pub fn parse_player_profile_json(raw: &str) -> Result<PlayerProfile> {
    let table = find_table(raw, "CommonPlayerInfo")?;
    let Some(row) = table.rows.first() else {
        return Ok(PlayerProfile::default());
    };
    Ok(PlayerProfile {
        team_name: table.string(row, "TEAM_NAME"),
        team_abbreviation: table.string(row, "TEAM_ABBREVIATION"),
        position: table.string(row, "POSITION"),
    })
}

pub fn parse_team_rate_stats_json(raw: &str, team_id: u64) -> Result<Option<TeamSeasonStats>> {
    let table = find_table(raw, "LeagueDashTeamStats")?;
    for row in &table.rows {
        if table.u64(row, "TEAM_ID") != Some(team_id) {
            continue;
        }
        let points = table.f64(row, "PTS").unwrap_or(0.0);
        let opp_points = if table.has("OPP_PTS") {
            table.f64(row, "OPP_PTS")
        } else {
            None
        };
        return Ok(Some(TeamSeasonStats { points, opp_points }));
    }
    Ok(None)
}

pub fn parse_team_advanced_json(raw: &str, team_id: u64) -> Result<Option<TeamAdvancedStats>> {
    let table = find_table(raw, "LeagueDashTeamStats")?;
    for row in &table.rows {
        if table.u64(row, "TEAM_ID") != Some(team_id) {
            continue;
        }
        return Ok(Some(TeamAdvancedStats {
            pace: table.f64(row, "PACE").unwrap_or(100.0),
            off_rating: table.f64(row, "OFF_RATING").unwrap_or(110.0),
            def_rating: table.f64(row, "DEF_RATING").unwrap_or(110.0),
        }));
    }
    Ok(None)
}

/// One row of a team game log, as needed by the last-5 window.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamGameRow {
    pub game_date: String,
    pub points: f64,
    pub plus_minus: f64,
    pub fg_pct: Option<f64>,
    pub fg3_pct: Option<f64>,
}

pub fn parse_team_game_log_json(raw: &str) -> Result<Vec<TeamGameRow>> {
    let table = find_table(raw, "LeagueGameFinderResults")?;
    let mut games = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        games.push(TeamGameRow {
            game_date: table.string(row, "GAME_DATE").unwrap_or_default(),
            points: table.f64(row, "PTS").unwrap_or(0.0),
            plus_minus: table.f64(row, "PLUS_MINUS").unwrap_or(0.0),
            fg_pct: table.f64(row, "FG_PCT"),
            fg3_pct: table.f64(row, "FG3_PCT"),
        });
    }
    // Game-finder dates are ISO-like, so string order is date order.
    games.sort_by(|a, b| b.game_date.cmp(&a.game_date));
    Ok(games)
}

/// Condense the newest five team games into the last-5 window. The opponent
/// score is reconstructed as PTS - PLUS_MINUS; shooting falls back to
/// league-typical numbers when the log carries no percentages.
pub fn team_last5_from_games(games: &[TeamGameRow]) -> Option<TeamLast5Stats> {
    if games.is_empty() {
        return None;
    }
    let window: Vec<&TeamGameRow> = games.iter().take(5).collect();
    let n = window.len() as f64;

    let points_avg = window.iter().map(|g| g.points).sum::<f64>() / n;
    let opp_points_avg = window.iter().map(|g| g.points - g.plus_minus).sum::<f64>() / n;
    let avg_margin = window.iter().map(|g| g.plus_minus).sum::<f64>() / n;

    let fg: Vec<f64> = window.iter().filter_map(|g| g.fg_pct).map(|p| p * 100.0).collect();
    let fg3: Vec<f64> = window.iter().filter_map(|g| g.fg3_pct).map(|p| p * 100.0).collect();
    let fg_pct_avg = if fg.is_empty() {
        45.0
    } else {
        fg.iter().sum::<f64>() / fg.len() as f64
    };
    let fg3_pct_avg = if fg3.is_empty() {
        35.0
    } else {
        fg3.iter().sum::<f64>() / fg3.len() as f64
    };

    Some(TeamLast5Stats {
        points_avg,
        opp_points_avg,
        fg_pct_avg,
        fg3_pct_avg,
        total_avg: points_avg + opp_points_avg,
        games: window.len() as u32,
        avg_margin,
    })
}

// ---------------------------------------------------------------------------
// Team table and fuzzy resolution
// ---------------------------------------------------------------------------

pub const TEAMS: &[TeamRef] = &[
    TeamRef { id: 1610612737, full_name: "Atlanta Hawks", nickname: "Hawks", abbreviation: "ATL" },
    TeamRef { id: 1610612738, full_name: "Boston Celtics", nickname: "Celtics", abbreviation: "BOS" },
    TeamRef { id: 1610612751, full_name: "Brooklyn Nets", nickname: "Nets", abbreviation: "BKN" },
    TeamRef { id: 1610612766, full_name: "Charlotte Hornets", nickname: "Hornets", abbreviation: "CHA" },
    TeamRef { id: 1610612741, full_name: "Chicago Bulls", nickname: "Bulls", abbreviation: "CHI" },
    TeamRef { id: 1610612739, full_name: "Cleveland Cavaliers", nickname: "Cavaliers", abbreviation: "CLE" },
    TeamRef { id: 1610612742, full_name: "Dallas Mavericks", nickname: "Mavericks", abbreviation: "DAL" },
    TeamRef { id: 1610612743, full_name: "Denver Nuggets", nickname: "Nuggets", abbreviation: "DEN" },
    TeamRef { id: 1610612765, full_name: "Detroit Pistons", nickname: "Pistons", abbreviation: "DET" },
    TeamRef { id: 1610612744, full_name: "Golden State Warriors", nickname: "Warriors", abbreviation: "GSW" },
    TeamRef { id: 1610612745, full_name: "Houston Rockets", nickname: "Rockets", abbreviation: "HOU" },
    TeamRef { id: 1610612754, full_name: "Indiana Pacers", nickname: "Pacers", abbreviation: "IND" },
    TeamRef { id: 1610612746, full_name: "LA Clippers", nickname: "Clippers", abbreviation: "LAC" },
    TeamRef { id: 1610612747, full_name: "Los Angeles Lakers", nickname: "Lakers", abbreviation: "LAL" },
    TeamRef { id: 1610612763, full_name: "Memphis Grizzlies", nickname: "Grizzlies", abbreviation: "MEM" },
    TeamRef { id: 1610612748, full_name: "Miami Heat", nickname: "Heat", abbreviation: "MIA" },
    TeamRef { id: 1610612749, full_name: "Milwaukee Bucks", nickname: "Bucks", abbreviation: "MIL" },
    TeamRef { id: 1610612750, full_name: "Minnesota Timberwolves", nickname: "Timberwolves", abbreviation: "MIN" },
    TeamRef { id: 1610612740, full_name: "New Orleans Pelicans", nickname: "Pelicans", abbreviation: "NOP" },
    TeamRef { id: 1610612752, full_name: "New York Knicks", nickname: "Knicks", abbreviation: "NYK" },
    TeamRef { id: 1610612760, full_name: "Oklahoma City Thunder", nickname: "Thunder", abbreviation: "OKC" },
    TeamRef { id: 1610612753, full_name: "Orlando Magic", nickname: "Magic", abbreviation: "ORL" },
    TeamRef { id: 1610612755, full_name: "Philadelphia 76ers", nickname: "76ers", abbreviation: "PHI" },
    TeamRef { id: 1610612756, full_name: "Phoenix Suns", nickname: "Suns", abbreviation: "PHX" },
    TeamRef { id: 1610612757, full_name: "Portland Trail Blazers", nickname: "Trail Blazers", abbreviation: "POR" },
    TeamRef { id: 1610612758, full_name: "Sacramento Kings", nickname: "Kings", abbreviation: "SAC" },
    TeamRef { id: 1610612759, full_name: "San Antonio Spurs", nickname: "Spurs", abbreviation: "SAS" },
    TeamRef { id: 1610612761, full_name: "Toronto Raptors", nickname: "Raptors", abbreviation: "TOR" },
    TeamRef { id: 1610612762, full_name: "Utah Jazz", nickname: "Jazz", abbreviation: "UTA" },
    TeamRef { id: 1610612764, full_name: "Washington Wizards", nickname: "Wizards", abbreviation: "WAS" },
];

/// Substring match on full name or nickname (case-insensitive), or exact
/// abbreviation. First match wins.
pub fn find_team(name: &str) -> Option<TeamRef> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let abbr = name.trim().to_uppercase();
    TEAMS
        .iter()
        .find(|team| {
            team.full_name.to_lowercase().contains(&needle)
                || team.nickname.to_lowercase().contains(&needle)
                || team.abbreviation == abbr
        })
        .copied()
}

/// Substring match over a player index. Case-insensitive; callers take the
/// first hit.
pub fn match_players<'a>(index: &'a [PlayerRef], name: &str) -> Vec<&'a PlayerRef> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    index
        .iter()
        .filter(|p| p.full_name.to_lowercase().contains(&needle))
        .collect()
}

// ---------------------------------------------------------------------------
// Fetch wrappers (absence-flattening)
// ---------------------------------------------------------------------------

fn log_and_none<T>(what: &str, err: anyhow::Error) -> Option<T> {
    eprintln!("warning: {what} unavailable: {err:#}");
    None
}

pub fn find_players(name: &str) -> Option<Vec<PlayerRef>> {
    let season = current_season();
    let url = format!(
        "{STATS_BASE}/commonallplayers?LeagueID=00&Season={season}&IsOnlyCurrentSeason=0"
    );
    let raw = match fetch_stats_json(&url, PLAYER_INDEX_TTL) {
        Ok(raw) => raw,
        Err(err) => return log_and_none("player index", err),
    };
    let index = match parse_player_index_json(&raw) {
        Ok(index) => index,
        Err(err) => return log_and_none("player index", err),
    };
    let matches: Vec<PlayerRef> = match_players(&index, name).into_iter().cloned().collect();
    if matches.is_empty() { None } else { Some(matches) }
}

/// Season totals for the requested season, falling back to the most recent
/// season on record when the requested one is absent. Returns the aggregate
/// together with the season label that was actually resolved.
pub fn fetch_season_aggregate(
    player_id: u64,
    season: Option<&str>,
) -> Option<(SeasonAggregate, String)> {
    let url = format!("{STATS_BASE}/playercareerstats?PlayerID={player_id}&PerMode=Totals");
    let raw = match fetch_stats_json(&url, CAREER_TTL) {
        Ok(raw) => raw,
        Err(err) => return log_and_none("season stats", err),
    };
    let seasons = match parse_career_totals_json(&raw) {
        Ok(seasons) => seasons,
        Err(err) => return log_and_none("season stats", err),
    };
    let wanted = season.map(str::to_string).unwrap_or_else(current_season);
    let picked = resolve_season(&seasons, &wanted)?;
    let resolved = picked.season.clone();
    Some((picked, resolved))
}

/// Pick the requested season from a career table, falling back to the most
/// recent season on record when it is absent.
pub fn resolve_season(seasons: &[SeasonAggregate], wanted: &str) -> Option<SeasonAggregate> {
    seasons
        .iter()
        .find(|s| s.season == wanted)
        .or_else(|| seasons.last())
        .cloned()
}

pub fn fetch_game_log(player_id: u64, season: &str) -> Option<Vec<GameRow>> {
    let url = format!(
        "{STATS_BASE}/playergamelog?PlayerID={player_id}&Season={season}&SeasonType=Regular%20Season"
    );
    let raw = match fetch_stats_json(&url, GAME_LOG_TTL) {
        Ok(raw) => raw,
        Err(err) => return log_and_none("game log", err),
    };
    match parse_game_log_json(&raw) {
        Ok(games) => Some(games),
        Err(err) => log_and_none("game log", err),
    }
}

pub fn fetch_player_profile(player_id: u64) -> Option<PlayerProfile> {
    let url = format!("{STATS_BASE}/commonplayerinfo?PlayerID={player_id}");
    let raw = match fetch_stats_json(&url, PROFILE_TTL) {
        Ok(raw) => raw,
        Err(err) => return log_and_none("player profile", err),
    };
    match parse_player_profile_json(&raw) {
        Ok(profile) => Some(profile),
        Err(err) => log_and_none("player profile", err),
    }
}

pub fn fetch_team_rate_stats(team_id: u64, season: &str) -> Option<TeamSeasonStats> {
    let url = format!(
        "{STATS_BASE}/leaguedashteamstats?Season={season}&SeasonType=Regular%20Season&PerMode=PerGame&MeasureType=Base"
    );
    let raw = match fetch_stats_json(&url, TEAM_STATS_TTL) {
        Ok(raw) => raw,
        Err(err) => return log_and_none("team stats", err),
    };
    match parse_team_rate_stats_json(&raw, team_id) {
        Ok(stats) => stats,
        Err(err) => log_and_none("team stats", err),
    }
}

pub fn fetch_team_advanced_stats(team_id: u64, season: &str) -> Option<TeamAdvancedStats> {
    let url = format!(
        "{STATS_BASE}/leaguedashteamstats?Season={season}&SeasonType=Regular%20Season&PerMode=PerGame&MeasureType=Advanced"
    );
    let raw = match fetch_stats_json(&url, TEAM_STATS_TTL) {
        Ok(raw) => raw,
        Err(err) => return log_and_none("team advanced stats", err),
    };
    match parse_team_advanced_json(&raw, team_id) {
        Ok(stats) => stats,
        Err(err) => log_and_none("team advanced stats", err),
    }
}

pub fn fetch_team_last5(team_id: u64, season: &str) -> Option<TeamLast5Stats> {
    let url = format!(
        "{STATS_BASE}/leaguegamefinder?TeamIDNullable={team_id}&SeasonNullable={season}&SeasonTypeNullable=Regular%20Season"
    );
    let raw = match fetch_stats_json(&url, TEAM_LOG_TTL) {
        Ok(raw) => raw,
        Err(err) => return log_and_none("team game log", err),
    };
    match parse_team_game_log_json(&raw) {
        Ok(games) => team_last5_from_games(&games),
        Err(err) => log_and_none("team game log", err),
    }
}
