use serde::{Deserialize, Serialize};

/// One played game for one player, as delivered by the provider.
///
/// Game logs arrive newest first and are kept in that order; last-5 windows
/// take the head of the slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRow {
    pub game_date: String,
    pub matchup: String,
    pub win: Option<bool>,
    pub minutes: f64,
    pub points: f64,
    pub rebounds: f64,
    pub off_rebounds: f64,
    pub def_rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub turnovers: f64,
    pub fouls: f64,
    pub fgm: f64,
    pub fga: f64,
    pub fg3m: f64,
    pub fg3a: f64,
    pub ftm: f64,
    pub fta: f64,
    pub plus_minus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Home,
    Away,
}

impl GameRow {
    /// Guard the row invariants: attempts >= makes, minutes >= 0.
    pub fn sanitize(mut self) -> Self {
        self.minutes = self.minutes.max(0.0);
        self.fga = self.fga.max(self.fgm);
        self.fg3a = self.fg3a.max(self.fg3m);
        self.fta = self.fta.max(self.ftm);
        self
    }

    /// Venue from the matchup convention: "LAL vs. BOS" is home,
    /// "LAL @ BOS" is away. Anything else is unparseable.
    pub fn venue(&self) -> Option<Venue> {
        if self.matchup.contains("vs.") {
            Some(Venue::Home)
        } else if self.matchup.contains('@') {
            Some(Venue::Away)
        } else {
            None
        }
    }
}

/// Season totals for one player. Per-game rates are derived by dividing by
/// games played, guarded against an empty season.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonAggregate {
    pub season: String,
    pub games_played: u32,
    pub minutes: f64,
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub turnovers: f64,
}

impl SeasonAggregate {
    pub fn avg_minutes(&self) -> f64 {
        crate::box_score::per_game(self.minutes, self.games_played)
    }
}

/// Which box-score fields sum into the value compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatCombination {
    Points,
    Assists,
    Rebounds,
    /// Points + assists + rebounds ("SAR").
    PointsAssistsRebounds,
}

impl StatCombination {
    pub fn value(&self, game: &GameRow) -> f64 {
        match self {
            StatCombination::Points => game.points,
            StatCombination::Assists => game.assists,
            StatCombination::Rebounds => game.rebounds,
            StatCombination::PointsAssistsRebounds => {
                game.points + game.assists + game.rebounds
            }
        }
    }

    pub fn season_total(&self, season: &SeasonAggregate) -> f64 {
        match self {
            StatCombination::Points => season.points,
            StatCombination::Assists => season.assists,
            StatCombination::Rebounds => season.rebounds,
            StatCombination::PointsAssistsRebounds => {
                season.points + season.assists + season.rebounds
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            StatCombination::Points => "PTS",
            StatCombination::Assists => "AST",
            StatCombination::Rebounds => "REB",
            StatCombination::PointsAssistsRebounds => "SAR",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PTS" | "POINTS" => Some(StatCombination::Points),
            "AST" | "ASSISTS" => Some(StatCombination::Assists),
            "REB" | "REBOUNDS" => Some(StatCombination::Rebounds),
            "SAR" | "PRA" => Some(StatCombination::PointsAssistsRebounds),
            _ => None,
        }
    }
}

/// Venue context supplied by the caller (not derived from data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VenueContext {
    Home,
    Away,
    Unknown,
}

impl VenueContext {
    pub fn label(&self) -> &'static str {
        match self {
            VenueContext::Home => "home",
            VenueContext::Away => "away",
            VenueContext::Unknown => "unknown",
        }
    }
}

/// Input to the player threshold engine. Built per request, never persisted.
#[derive(Debug, Clone)]
pub struct ThresholdQuery {
    pub player: String,
    pub threshold: f64,
    pub combination: StatCombination,
    pub venue: VenueContext,
    pub odds: Option<f64>,
}

/// Ordered risk tiers, strictest first. Exactly one applies to any
/// (diff, last-5 pass rate, std) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    VerySafe,
    Safe,
    MediumRisk,
    HighRisk,
    Risky,
    Avoid,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::VerySafe => "very safe",
            RiskLabel::Safe => "safe",
            RiskLabel::MediumRisk => "medium risk",
            RiskLabel::HighRisk => "high risk",
            RiskLabel::Risky => "risky",
            RiskLabel::Avoid => "avoid",
        }
    }
}

/// Reported average-minutes band. Informational only; not part of scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinutesLevel {
    High,
    Medium,
    Low,
}

impl MinutesLevel {
    pub fn from_avg(avg_minutes: f64) -> Self {
        if avg_minutes >= 32.0 {
            MinutesLevel::High
        } else if avg_minutes >= 25.0 {
            MinutesLevel::Medium
        } else {
            MinutesLevel::Low
        }
    }
}

/// Flat result of a player threshold analysis. Consumers treat this shape as
/// append-only; renaming or removing fields breaks them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub player: String,
    pub team: Option<String>,
    pub position: Option<String>,
    pub season: String,
    pub combination: StatCombination,
    pub threshold: f64,
    pub games_played: u32,
    pub avg_minutes: f64,
    pub minutes_level: MinutesLevel,
    pub season_avg: f64,
    pub last5_avg: f64,
    pub blended_avg: f64,
    pub projection: f64,
    pub season_pass_rate: f64,
    pub season_pass_count: u32,
    pub season_game_count: u32,
    pub last5_pass_rate: f64,
    pub last5_pass_count: u32,
    pub last5_game_count: u32,
    pub home_avg: f64,
    pub away_avg: f64,
    pub home_away_diff: f64,
    pub team_pace: Option<f64>,
    pub team_off_rating: Option<f64>,
    pub tempo_bonus: f64,
    pub std_dev: f64,
    pub risk: RiskLabel,
    pub confidence: i32,
    pub suggested_threshold: f64,
    pub garbage_time_warning: Option<String>,
    pub odds: Option<f64>,
}

/// Resolved player from the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: u64,
    pub full_name: String,
}

/// Entry from the static team table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamRef {
    pub id: u64,
    pub full_name: &'static str,
    pub nickname: &'static str,
    pub abbreviation: &'static str,
}

/// Team profile fetched from player info (name + position come with it).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub team_name: Option<String>,
    pub team_abbreviation: Option<String>,
    pub position: Option<String>,
}

/// Season per-game rate stats for a team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamSeasonStats {
    pub points: f64,
    pub opp_points: Option<f64>,
}

/// Pace and ratings from the Advanced measure.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TeamAdvancedStats {
    pub pace: f64,
    pub off_rating: f64,
    pub def_rating: f64,
}

/// Last-5-game rate stats for a team, derived from its game log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamLast5Stats {
    pub points_avg: f64,
    pub opp_points_avg: f64,
    pub fg_pct_avg: f64,
    pub fg3_pct_avg: f64,
    pub total_avg: f64,
    pub games: u32,
    /// Average winning margin over the window; feeds the garbage-time module.
    pub avg_margin: f64,
}

/// Everything the team-total scoring needs for one side.
#[derive(Debug, Clone)]
pub struct TeamSideContext {
    pub name: String,
    pub season: TeamSeasonStats,
    pub advanced: TeamAdvancedStats,
    pub last5: TeamLast5Stats,
}

/// Request-scoped context for one matchup analysis.
#[derive(Debug, Clone)]
pub struct TeamMatchupContext {
    pub season: String,
    pub home: TeamSideContext,
    pub away: TeamSideContext,
}

/// Over/under call against a supplied threshold. `Pass` is the deliberate
/// dead zone where no bet is recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TotalDecision {
    Over,
    Under,
    Pass,
}

impl TotalDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalDecision::Over => "over",
            TotalDecision::Under => "under",
            TotalDecision::Pass => "pass",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

/// Which scoring variant to run. Regression is the primary model; Legacy is
/// the earlier additive model kept as a comparison fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalPolicy {
    Regression,
    Legacy,
}

/// Current NBA season label ("2025-26"). The season rolls over in October.
pub fn current_season() -> String {
    season_label_for(chrono::Local::now().date_naive())
}

pub fn season_label_for(date: chrono::NaiveDate) -> String {
    use chrono::Datelike;
    let year = date.year();
    if date.month() >= 10 {
        format!("{}-{:02}", year, (year + 1) % 100)
    } else {
        format!("{}-{:02}", year - 1, year % 100)
    }
}
