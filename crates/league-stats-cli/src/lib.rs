//! `lgs`: command-line reports over a SQLite league ledger.
//!
//! [`run_cli`] executes a parsed [`Cli`]; [`run_command`] runs a single
//! command against an already opened store.

pub mod logging;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use league_stats_core::{
    career_record, format_win_percentage, leaderboard, rivalries_for, season_journey, top_nemesis,
    top_victim, CareerRecord, H2hPairRecord, LeaderboardEntry, LeaderboardMetric, LeagueRecord,
    LeagueReport, LedgerScope, LedgerSnapshot, MemberDashboard, MemberId, RecordCategory,
    RecordType, RivalryEntry, SeasonId, SeasonJourney, StatsRuleset,
};
use league_stats_store_sqlite::SqliteLedgerStore;
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "lgs")]
#[command(about = "League history statistics CLI")]
pub struct Cli {
    #[arg(long, default_value = "./league_stats.sqlite3")]
    db: PathBuf,

    /// JSON ruleset file; overrides the newest ruleset stored in the database.
    #[arg(long)]
    ruleset: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import a JSON ledger snapshot (seasons, members, teams, matches).
    Import(ImportArgs),
    /// Record that one member identity was merged into another.
    Merge(MergeArgs),
    Career(MemberArgs),
    H2h(H2hArgs),
    Matrix,
    Rivalries(MemberArgs),
    Standings(StandingsArgs),
    Records(RecordsArgs),
    RecordCheck(RecordCheckArgs),
    Leaderboard(LeaderboardArgs),
    Dashboard(DashboardArgs),
    /// List final matches excluded from aggregation.
    Skipped,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[arg(long)]
    file: PathBuf,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    #[arg(long)]
    from: String,
    #[arg(long)]
    into: String,
}

#[derive(Debug, Args)]
pub struct MemberArgs {
    #[arg(long)]
    member: String,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct H2hArgs {
    #[arg(long)]
    member: String,
    #[arg(long)]
    opponent: String,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct StandingsArgs {
    #[arg(long)]
    season: String,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct RecordsArgs {
    #[arg(long)]
    category: Option<CategoryArg>,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct RecordCheckArgs {
    #[arg(long)]
    record_type: String,
    #[arg(long)]
    value: f64,
}

#[derive(Debug, Args)]
pub struct LeaderboardArgs {
    #[arg(long)]
    metric: MetricArg,
    #[arg(long, default_value_t = 10)]
    limit: usize,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    #[arg(long)]
    member: String,
    #[arg(long)]
    season: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    #[value(name = "single_week")]
    SingleWeek,
    Season,
    Career,
    Playoff,
    Dubious,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MetricArg {
    Wins,
    Points,
    #[value(name = "win_percentage")]
    WinPercentage,
    Championships,
    #[value(name = "playoff_appearances")]
    PlayoffAppearances,
}

/// Opens and migrates the database, resolves the ruleset, then runs the command.
///
/// # Errors
/// Returns an error when the database cannot be opened or migrated, the
/// ruleset file is invalid, or command execution fails.
pub fn run_cli(cli: Cli) -> Result<()> {
    let mut store = SqliteLedgerStore::open(&cli.db)?;
    store.migrate()?;
    let ruleset = resolve_ruleset(cli.ruleset.as_deref(), &store)?;
    run_command(cli.command, &mut store, &ruleset)
}

/// # Errors
/// Returns an error when the ledger cannot be read or the command input is invalid.
#[allow(clippy::too_many_lines)]
pub fn run_command(
    command: Command,
    store: &mut SqliteLedgerStore,
    ruleset: &StatsRuleset,
) -> Result<()> {
    match command {
        Command::Import(args) => {
            let raw = std::fs::read_to_string(&args.file)
                .with_context(|| format!("failed to read {}", args.file.display()))?;
            let snapshot: LedgerSnapshot = serde_json::from_str(&raw)
                .with_context(|| format!("invalid ledger snapshot in {}", args.file.display()))?;
            let report = store.import_snapshot(&snapshot)?;
            print_json(&report)
        }
        Command::Merge(args) => {
            let from = MemberId::new(args.from);
            let into = MemberId::new(args.into);
            store.record_merge(&from, &into)?;
            print_json(&json!({ "merged": from, "into": into }))
        }
        Command::Career(args) => {
            let report = load_report(store, &LedgerScope::AllSeasons, ruleset)?;
            let career = career_record(&report.index, &MemberId::new(args.member));
            if args.json {
                print_json(&career)
            } else {
                print_career(&career);
                Ok(())
            }
        }
        Command::H2h(args) => {
            let report = load_report(store, &LedgerScope::AllSeasons, ruleset)?;
            let member = report.index.resolve(&MemberId::new(args.member));
            let opponent = report.index.resolve(&MemberId::new(args.opponent));
            let pair = report.matrix.lookup(&member, &opponent);
            if args.json {
                print_json(&pair)
            } else {
                print_h2h(&pair);
                Ok(())
            }
        }
        Command::Matrix => {
            let report = load_report(store, &LedgerScope::AllSeasons, ruleset)?;
            print_json(&json!({
                "pairs": report.matrix.pairs(),
                "skipped_matches": report.index.skipped_count(),
            }))
        }
        Command::Rivalries(args) => {
            let report = load_report(store, &LedgerScope::AllSeasons, ruleset)?;
            let member = report.index.resolve(&MemberId::new(args.member));
            let rivalries = rivalries_for(&report.matrix, &member, &ruleset.rivalry);
            if args.json {
                print_json(&json!({
                    "member_id": member,
                    "rivalries": rivalries,
                    "top_nemesis": top_nemesis(&rivalries),
                    "top_victim": top_victim(&rivalries),
                }))
            } else {
                print_rivalries(&member, &rivalries);
                Ok(())
            }
        }
        Command::Standings(args) => {
            let season_id = SeasonId::new(args.season);
            let report = load_report(store, &LedgerScope::Season(season_id.clone()), ruleset)?;
            let season = report
                .index
                .season(&season_id)
                .ok_or_else(|| anyhow!("unknown season `{season_id}`"))?;
            let journey = season_journey(&report.index, season);
            if args.json {
                print_json(&journey)
            } else {
                print_standings(&journey);
                Ok(())
            }
        }
        Command::Records(args) => {
            let report = load_report(store, &LedgerScope::AllSeasons, ruleset)?;
            let records: Vec<&LeagueRecord> = match args.category {
                Some(category) => report.records.by_category(map_category(category)),
                None => report.records.all_records().iter().collect(),
            };
            if args.json {
                print_json(&json!({
                    "records": records,
                    "skipped_matches": report.records.skipped_matches(),
                }))
            } else {
                print_records(&records);
                Ok(())
            }
        }
        Command::RecordCheck(args) => {
            let record_type = parse_record_type(&args.record_type)?;
            let report = load_report(store, &LedgerScope::AllSeasons, ruleset)?;
            print_json(&report.records.is_record_breaking(record_type, args.value))
        }
        Command::Leaderboard(args) => {
            let report = load_report(store, &LedgerScope::AllSeasons, ruleset)?;
            let entries = leaderboard(&report.index, map_metric(args.metric), args.limit);
            if args.json {
                print_json(&entries)
            } else {
                print_leaderboard(&entries);
                Ok(())
            }
        }
        Command::Dashboard(args) => {
            let report = load_report(store, &LedgerScope::AllSeasons, ruleset)?;
            let dashboard = MemberDashboard::build(
                &report.index,
                &report.matrix,
                &report.records,
                &MemberId::new(args.member),
                &SeasonId::new(args.season),
                ruleset,
            )
            .context("failed to build member dashboard")?;
            print_json(&dashboard)
        }
        Command::Skipped => {
            let report = load_report(store, &LedgerScope::AllSeasons, ruleset)?;
            print_json(&json!({
                "skipped_matches": report.index.skipped_count(),
                "matches": report.index.skipped(),
            }))
        }
    }
}

fn resolve_ruleset(path: Option<&Path>, store: &SqliteLedgerStore) -> Result<StatsRuleset> {
    let Some(path) = path else {
        return store.latest_ruleset();
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read ruleset file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw).context("ruleset file is not valid JSON")?;
    let ruleset = StatsRuleset::from_json(&value)
        .map_err(|err| anyhow!("invalid ruleset in {}: {err}", path.display()))?;
    info!(
        ruleset_version = ruleset.ruleset_version,
        path = %path.display(),
        "using ruleset file"
    );
    Ok(ruleset)
}

fn load_report(
    store: &SqliteLedgerStore,
    scope: &LedgerScope,
    ruleset: &StatsRuleset,
) -> Result<LeagueReport> {
    LeagueReport::load(store, scope, ruleset).context("failed to load league ledger")
}

fn parse_record_type(raw: &str) -> Result<RecordType> {
    RecordType::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = RecordType::ALL.iter().map(|kind| kind.as_str()).collect();
        anyhow!("unknown record type `{raw}`; expected one of: {}", known.join(", "))
    })
}

fn map_category(value: CategoryArg) -> RecordCategory {
    match value {
        CategoryArg::SingleWeek => RecordCategory::SingleWeek,
        CategoryArg::Season => RecordCategory::Season,
        CategoryArg::Career => RecordCategory::Career,
        CategoryArg::Playoff => RecordCategory::Playoff,
        CategoryArg::Dubious => RecordCategory::Dubious,
    }
}

fn map_metric(value: MetricArg) -> LeaderboardMetric {
    match value {
        MetricArg::Wins => LeaderboardMetric::Wins,
        MetricArg::Points => LeaderboardMetric::Points,
        MetricArg::WinPercentage => LeaderboardMetric::WinPercentage,
        MetricArg::Championships => LeaderboardMetric::Championships,
        MetricArg::PlayoffAppearances => LeaderboardMetric::PlayoffAppearances,
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_career(career: &CareerRecord) {
    println!(
        "member={} seasons={} record={} pct={} pf={:.2} pa={:.2}",
        career.member_id,
        career.seasons_played,
        career.record,
        career.win_percentage_display,
        career.points_for,
        career.points_against
    );
    println!(
        "regular={} playoff={} championships={} playoff_appearances={} last_places={}",
        career.regular_season_record,
        career.playoff_record,
        career.championships,
        career.playoff_appearances,
        career.last_places
    );
}

fn print_h2h(pair: &H2hPairRecord) {
    println!(
        "{} vs {}: {} points={:.2}-{:.2} meetings={} playoff_meetings={} streak={:+} last={}",
        pair.member_a_id,
        pair.member_b_id,
        pair.a_record(),
        pair.a_points,
        pair.b_points,
        pair.total_matchups,
        pair.playoff_meetings,
        pair.a_streak,
        pair.last_meeting.as_ref().map_or_else(
            || "n/a".to_string(),
            |meeting| format!("{} week {}", meeting.season_year, meeting.week)
        )
    );
}

fn print_rivalries(member: &MemberId, rivalries: &[RivalryEntry]) {
    println!("rivalries for {member}");
    println!(
        "{:<20} {:<14} {:<10} {:<8} {:<10} {:<10}",
        "opponent", "label", "record", "streak", "pf", "pa"
    );
    println!("{}", "-".repeat(76));
    for entry in rivalries {
        println!(
            "{:<20} {:<14} {:<10} {:<+8} {:<10.2} {:<10.2}",
            entry.opponent_id.as_str(),
            entry.label.as_str(),
            format!("{}-{}-{}", entry.wins, entry.losses, entry.ties),
            entry.streak,
            entry.points_for,
            entry.points_against
        );
    }
    for (title, pick) in [
        ("top_nemesis", top_nemesis(rivalries)),
        ("top_victim", top_victim(rivalries)),
    ] {
        println!(
            "{title}={}",
            pick.map_or("none", |entry| entry.opponent_id.as_str())
        );
    }
}

fn print_standings(journey: &SeasonJourney) {
    println!(
        "season={} year={} weeks={} skipped_matches={}",
        journey.season_id, journey.year, journey.total_weeks, journey.skipped_matches
    );
    println!(
        "{:<4} {:<24} {:<16} {:<10} {:<6} {:<10} {:<10} flags",
        "pos", "team", "member", "record", "pct", "pf", "pa"
    );
    println!("{}", "-".repeat(96));
    for row in &journey.final_standings {
        let mut flags = Vec::new();
        if row.is_champion {
            flags.push("champion");
        }
        if row.made_playoffs {
            flags.push("playoffs");
        }
        if row.is_last_place {
            flags.push("last");
        }
        println!(
            "{:<4} {:<24} {:<16} {:<10} {:<6} {:<10.2} {:<10.2} {}",
            row.position,
            row.team_name,
            row.member_id.as_str(),
            row.record.to_string(),
            format_win_percentage(row.win_percentage),
            row.points_for,
            row.points_against,
            flags.join(",")
        );
    }
}

fn print_records(records: &[&LeagueRecord]) {
    println!(
        "{:<28} {:<12} {:<10} {:<16} {:<6} {:<5} opponent",
        "record", "category", "value", "holder", "season", "week"
    );
    println!("{}", "-".repeat(100));
    for record in records {
        println!(
            "{:<28} {:<12} {:<10.3} {:<16} {:<6} {:<5} {}",
            record.record_type.as_str(),
            record.category.as_str(),
            record.value,
            record.holder_member_id.as_str(),
            record
                .season_year
                .map_or_else(|| "-".to_string(), |year| year.to_string()),
            record
                .week
                .map_or_else(|| "-".to_string(), |week| week.to_string()),
            record
                .opponent_member_id
                .as_ref()
                .map_or("-", MemberId::as_str)
        );
    }
}

fn print_leaderboard(entries: &[LeaderboardEntry]) {
    println!(
        "{:<5} {:<16} {:<24} {:<10} record",
        "rank", "member", "name", "value"
    );
    println!("{}", "-".repeat(70));
    for entry in entries {
        println!(
            "{:<5} {:<16} {:<24} {:<10.3} {}",
            entry.rank,
            entry.member_id.as_str(),
            entry.display_name,
            entry.value,
            entry.record
        );
    }
}
