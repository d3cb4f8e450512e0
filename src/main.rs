use std::env;
use std::process::ExitCode;

use anyhow::Result;

use nba_props::box_score;
use nba_props::history;
use nba_props::nba_client;
use nba_props::model::{
    current_season, StatCombination, ThresholdQuery, TotalPolicy, VenueContext,
};
use nba_props::team_total::{self, MatchupOutcome, MatchupSide, TeamTotalResult};
use nba_props::threshold::{self, PlayerAnalysisOutcome};

const DEFAULT_THRESHOLD: f64 = 40.0;
const DEFAULT_HISTORY_LIMIT: u32 = 10;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        print_usage();
        return ExitCode::FAILURE;
    };

    let outcome = match command {
        "player" => run_player(&args[1..]),
        "matchup" => run_matchup(&args[1..]),
        "enrich" => run_enrich(&args[1..]),
        "history" => run_history(&args[1..]),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(ExitCode::SUCCESS)
        }
        other => {
            eprintln!("unknown command: {other}");
            print_usage();
            Ok(ExitCode::FAILURE)
        }
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  nba_props player <name> <threshold> [--combo sar|pts|ast|reb]");
    eprintln!("            [--venue home|away] [--odds X | --home-odds X --away-odds Y]");
    eprintln!("            [--season YYYY-YY] [--json]");
    eprintln!("  nba_props matchup <home> <away> [--threshold X] [--legacy]");
    eprintln!("            [--season YYYY-YY] [--json]");
    eprintln!("  nba_props enrich <name> [--season YYYY-YY] [--json]");
    eprintln!("  nba_props history [limit]");
}

struct Flags {
    combo: StatCombination,
    venue: VenueContext,
    odds: Option<f64>,
    home_odds: Option<f64>,
    away_odds: Option<f64>,
    threshold: Option<f64>,
    season: Option<String>,
    legacy: bool,
    json: bool,
}

/// Flag parsing is deliberately lenient about numbers: a malformed odds or
/// threshold value is dropped (with a warning) instead of failing the run.
fn parse_flags(args: &[String]) -> Flags {
    let mut flags = Flags {
        combo: StatCombination::PointsAssistsRebounds,
        venue: VenueContext::Unknown,
        odds: None,
        home_odds: None,
        away_odds: None,
        threshold: None,
        season: None,
        legacy: false,
        json: false,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| -> Option<String> {
            let v = iter.next().cloned();
            if v.is_none() {
                eprintln!("warning: {name} expects a value; ignored");
            }
            v
        };
        match arg.as_str() {
            "--combo" => {
                if let Some(v) = value("--combo") {
                    match StatCombination::parse(&v) {
                        Some(combo) => flags.combo = combo,
                        None => eprintln!("warning: unknown combination '{v}'; using SAR"),
                    }
                }
            }
            "--venue" => {
                if let Some(v) = value("--venue") {
                    flags.venue = match v.to_ascii_lowercase().as_str() {
                        "home" => VenueContext::Home,
                        "away" => VenueContext::Away,
                        _ => {
                            eprintln!("warning: unknown venue '{v}'; treating as unknown");
                            VenueContext::Unknown
                        }
                    };
                }
            }
            "--odds" => flags.odds = value("--odds").and_then(|v| parse_lenient_f64(&v, "odds")),
            "--home-odds" => {
                flags.home_odds = value("--home-odds").and_then(|v| parse_lenient_f64(&v, "odds"))
            }
            "--away-odds" => {
                flags.away_odds = value("--away-odds").and_then(|v| parse_lenient_f64(&v, "odds"))
            }
            "--threshold" => {
                flags.threshold =
                    value("--threshold").and_then(|v| parse_lenient_f64(&v, "threshold"))
            }
            "--season" => flags.season = value("--season"),
            "--legacy" => flags.legacy = true,
            "--json" => flags.json = true,
            other if other.starts_with("--") => {
                eprintln!("warning: unknown flag {other}; ignored");
            }
            _ => {}
        }
    }
    flags
}

/// `--season` wins over the `NBA_SEASON` environment override.
fn season_override(flags: &Flags) -> Option<String> {
    flags.season.clone().or_else(|| {
        env::var("NBA_SEASON")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

fn parse_lenient_f64(raw: &str, what: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("warning: ignoring malformed {what} '{raw}'");
            None
        }
    }
}

fn run_player(args: &[String]) -> Result<ExitCode> {
    let Some(name) = args.first().filter(|a| !a.starts_with("--")) else {
        eprintln!("player command needs a name");
        print_usage();
        return Ok(ExitCode::FAILURE);
    };

    let threshold = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .and_then(|raw| parse_lenient_f64(raw, "threshold"))
        .unwrap_or_else(|| {
            eprintln!("using default threshold {DEFAULT_THRESHOLD}");
            DEFAULT_THRESHOLD
        });

    let flags = parse_flags(args);

    // With per-side odds and a known venue, the player's own side decides
    // which price feeds the garbage-time check.
    let odds = match (flags.home_odds, flags.away_odds, flags.venue) {
        (Some(home), Some(_), VenueContext::Home) => Some(home),
        (Some(_), Some(away), VenueContext::Away) => Some(away),
        _ => flags.odds,
    };

    let query = ThresholdQuery {
        player: name.clone(),
        threshold,
        combination: flags.combo,
        venue: flags.venue,
        odds,
    };

    let season = season_override(&flags);
    let outcome = threshold::run(&query, season.as_deref());

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&outcome.serializable())?);
    }

    match outcome {
        PlayerAnalysisOutcome::Ready(result) => {
            if !flags.json {
                print_player_report(&result);
            }
            if let Some(path) = history::default_db_path() {
                match history::open_db(&path) {
                    Ok(conn) => {
                        if let Err(err) = history::record(&conn, &result) {
                            eprintln!("warning: failed to record history: {err:#}");
                        }
                    }
                    Err(err) => eprintln!("warning: history db unavailable: {err:#}"),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        PlayerAnalysisOutcome::PlayerNotFound => {
            println!("analysis unavailable: no player matches '{name}'");
            Ok(ExitCode::SUCCESS)
        }
        PlayerAnalysisOutcome::NoSeasonData => {
            println!("analysis unavailable: no season stats for '{name}'");
            Ok(ExitCode::SUCCESS)
        }
        PlayerAnalysisOutcome::NoGameLog => {
            println!("analysis unavailable: no game log for '{name}'");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_player_report(result: &nba_props::model::PredictionResult) {
    let line = "-".repeat(64);
    println!("{line}");
    println!(
        "{} ({} / {})",
        result.player,
        result.team.as_deref().unwrap_or("unknown team"),
        result.position.as_deref().unwrap_or("?")
    );
    println!(
        "season {} | {} games | {:.1} min avg ({:?})",
        result.season, result.games_played, result.avg_minutes, result.minutes_level
    );
    println!("{line}");
    println!(
        "combination {} vs threshold {:.1}",
        result.combination.code(),
        result.threshold
    );
    println!(
        "season avg {:.1} | last-5 avg {:.1} | blended {:.1}",
        result.season_avg, result.last5_avg, result.blended_avg
    );
    println!(
        "home avg {:.1} | away avg {:.1} | diff {:+.1}",
        result.home_avg, result.away_avg, result.home_away_diff
    );
    if let Some(pace) = result.team_pace {
        println!(
            "team pace {:.1}{} | tempo bonus +{:.1}",
            pace,
            result
                .team_off_rating
                .map(|o| format!(" | off rating {o:.1}"))
                .unwrap_or_default(),
            result.tempo_bonus
        );
    }
    println!(
        "pass rate: season {:.1}% ({}/{}) | last-5 {:.1}% ({}/{})",
        result.season_pass_rate,
        result.season_pass_count,
        result.season_game_count,
        result.last5_pass_rate,
        result.last5_pass_count,
        result.last5_game_count
    );
    println!("std dev {:.1}", result.std_dev);
    println!("{line}");
    println!("projection {:.1}", result.projection);
    println!(
        "verdict: {} | confidence {}%",
        result.risk.as_str(),
        result.confidence
    );
    println!("suggested safer threshold: {:.1}", result.suggested_threshold);
    if let Some(warning) = &result.garbage_time_warning {
        println!("garbage-time risk: {warning}");
        if let Some(odds) = result.odds {
            println!("  (match odds {odds:.2})");
        }
    }
    println!("{line}");
}

fn run_matchup(args: &[String]) -> Result<ExitCode> {
    let positional: Vec<&String> = args
        .iter()
        .take_while(|a| !a.starts_with("--"))
        .collect();
    let (Some(home), Some(away)) = (positional.first(), positional.get(1)) else {
        eprintln!("matchup command needs two team names");
        print_usage();
        return Ok(ExitCode::FAILURE);
    };

    let flags = parse_flags(args);
    let season = season_override(&flags).unwrap_or_else(current_season);
    let policy = if flags.legacy {
        TotalPolicy::Legacy
    } else {
        TotalPolicy::Regression
    };

    let outcome = team_total::run(home, away, flags.threshold, policy, &season);

    match outcome {
        MatchupOutcome::Ready(result) => {
            if flags.json {
                println!("{}", serde_json::to_string_pretty(&*result)?);
            } else {
                print_matchup_report(&result);
            }
            Ok(ExitCode::SUCCESS)
        }
        MatchupOutcome::TeamNotFound(side) => {
            let name = match side {
                MatchupSide::Home => home,
                MatchupSide::Away => away,
            };
            println!("analysis unavailable: no team matches '{name}'");
            Ok(ExitCode::SUCCESS)
        }
        MatchupOutcome::NoData => {
            println!("analysis unavailable: team stats could not be fetched");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_matchup_report(result: &TeamTotalResult) {
    let line = "-".repeat(64);
    println!("{line}");
    println!(
        "{} vs {} ({})",
        result.home_team, result.away_team, result.season
    );
    println!("{line}");
    println!(
        "season avg: home {:.1} | away {:.1}",
        result.home_season_avg, result.away_season_avg
    );
    println!(
        "last-5 avg: home {:.1} | away {:.1}",
        result.home_last5_avg, result.away_last5_avg
    );
    println!(
        "ratings: home {:.1}/{:.1} | away {:.1}/{:.1} | pace {:.1}",
        result.home_off_rating,
        result.home_def_rating,
        result.away_off_rating,
        result.away_def_rating,
        result.avg_pace
    );
    if let Some(terms) = &result.terms {
        println!("{line}");
        println!("base {:.1}", terms.base);
        println!("tempo {:+.1}", terms.tempo);
        println!("efficiency {:+.1}", terms.efficiency);
        println!("form {:+.1}", terms.form);
        println!("shooting {:+.1}", terms.shooting);
        println!("defense penalty {:+.1}", -terms.defense_penalty);
        println!("home court {:+.1}", terms.home_court);
        println!(
            "raw total {:.1} x regression {:.2} (ratio {:.3}) {:+.1} fine adj",
            terms.raw_total,
            terms.regression_multiplier,
            terms.regression_ratio,
            terms.fine_adjustment
        );
    }
    println!("{line}");
    println!("projected total: {:.1}", result.projection);
    if let Some(first_half) = result.first_half_estimate {
        println!("first-half estimate: {:.1}", first_half);
    }
    if let Some(call) = &result.call {
        println!(
            "line {:.1} -> {} (margin {:+.1}, confidence {:?})",
            call.threshold,
            call.decision.as_str(),
            call.margin,
            call.confidence
        );
    } else {
        println!("suggested threshold: {:.1}", result.suggested_threshold);
    }
    println!("{line}");
}

fn run_enrich(args: &[String]) -> Result<ExitCode> {
    let Some(name) = args.first().filter(|a| !a.starts_with("--")) else {
        eprintln!("enrich command needs a player name");
        print_usage();
        return Ok(ExitCode::FAILURE);
    };
    let flags = parse_flags(args);

    let Some(candidates) = nba_client::find_players(name) else {
        println!("analysis unavailable: no player matches '{name}'");
        return Ok(ExitCode::SUCCESS);
    };
    let player = &candidates[0];

    let wanted = season_override(&flags);
    let Some((_, season)) = nba_client::fetch_season_aggregate(player.id, wanted.as_deref())
    else {
        println!("analysis unavailable: no season stats for '{name}'");
        return Ok(ExitCode::SUCCESS);
    };
    let games = nba_client::fetch_game_log(player.id, &season).unwrap_or_default();
    if games.is_empty() {
        println!("analysis unavailable: no game log for '{name}'");
        return Ok(ExitCode::SUCCESS);
    }

    let rollup = box_score::season_rollup(&games);
    if flags.json {
        println!("{}", serde_json::to_string_pretty(&rollup)?);
        return Ok(ExitCode::SUCCESS);
    }

    let line = "-".repeat(64);
    println!("{line}");
    println!("{} | season {} | {} games", player.full_name, season, rollup.games);
    println!("{line}");
    println!("minutes {:.1} | plus/minus {:+.2}", rollup.avg_minutes, rollup.avg_plus_minus);
    println!(
        "scoring: {:.1} pts ({:.1} ft, {:.1} two-pt at {:.0}%, {:.1} three-pt)",
        rollup.avg_points,
        rollup.avg_ftm,
        rollup.avg_fg2m,
        rollup.fg2_pct * 100.0,
        rollup.avg_fg3m
    );
    println!(
        "rebounds: {:.1} total ({:.1} off / {:.1} def)",
        rollup.avg_rebounds, rollup.avg_off_rebounds, rollup.avg_def_rebounds
    );
    println!(
        "assists {:.1} | turnovers {:.1} | ast/tov {:.2} | steals {:.1} | blocks {:.1} | fouls {:.1}",
        rollup.avg_assists,
        rollup.avg_turnovers,
        rollup.avg_ast_tov_ratio,
        rollup.avg_steals,
        rollup.avg_blocks,
        rollup.avg_fouls
    );
    println!(
        "true shooting {:.1}% | effective fg {:.1}%",
        rollup.avg_ts_pct * 100.0,
        rollup.avg_efg_pct * 100.0
    );
    println!(
        "double-doubles {} ({:.0}%) | triple-doubles {} ({:.0}%)",
        rollup.double_doubles,
        rollup.double_double_pct,
        rollup.triple_doubles,
        rollup.triple_double_pct
    );
    println!("{line}");
    Ok(ExitCode::SUCCESS)
}

fn run_history(args: &[String]) -> Result<ExitCode> {
    let limit = args
        .first()
        .and_then(|raw| raw.parse::<u32>().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);

    let Some(path) = history::default_db_path() else {
        println!("no cache directory available; history is disabled");
        return Ok(ExitCode::SUCCESS);
    };
    let conn = history::open_db(&path)?;
    let rows = history::recent(&conn, limit)?;

    if rows.is_empty() {
        println!("no recorded analyses yet");
        return Ok(ExitCode::SUCCESS);
    }
    for row in rows {
        println!(
            "{} | {} {} {:.1}+ | season avg {:.1} | pass {:.1}% | {} ({}%)",
            row.created_at,
            row.player,
            row.combination,
            row.threshold,
            row.season_avg,
            row.pass_rate,
            row.risk,
            row.confidence
        );
    }
    Ok(ExitCode::SUCCESS)
}
