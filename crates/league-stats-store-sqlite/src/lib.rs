#![allow(clippy::missing_errors_doc)]

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use league_stats_core::{
    LedgerError, LedgerProvider, LedgerScope, LedgerSnapshot, Match, MatchId, MatchStatus, Member,
    MemberId, Season, SeasonId, StatsRuleset, Team, TeamId,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

const LEDGER_MIGRATION_VERSION: i64 = 1;

const SCHEMA_LEDGER_V1: &str = r"
CREATE TABLE IF NOT EXISTS stats_rulesets (
  ruleset_version INTEGER PRIMARY KEY,
  ruleset_json TEXT NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS seasons (
  season_id TEXT PRIMARY KEY,
  year INTEGER NOT NULL,
  regular_season_weeks INTEGER NOT NULL CHECK (regular_season_weeks >= 0)
);

CREATE TABLE IF NOT EXISTS members (
  member_id TEXT PRIMARY KEY,
  display_name TEXT NOT NULL,
  is_active INTEGER NOT NULL CHECK (is_active IN (0, 1)),
  merged_into TEXT
);

CREATE TABLE IF NOT EXISTS teams (
  team_id TEXT PRIMARY KEY,
  season_id TEXT NOT NULL,
  member_id TEXT NOT NULL,
  name TEXT NOT NULL,
  final_rank INTEGER CHECK (final_rank >= 1 OR final_rank IS NULL),
  wins INTEGER NOT NULL CHECK (wins >= 0),
  losses INTEGER NOT NULL CHECK (losses >= 0),
  ties INTEGER NOT NULL CHECK (ties >= 0),
  points_for REAL NOT NULL,
  points_against REAL NOT NULL,
  is_champion INTEGER NOT NULL CHECK (is_champion IN (0, 1)),
  is_last_place INTEGER NOT NULL CHECK (is_last_place IN (0, 1)),
  made_playoffs INTEGER NOT NULL CHECK (made_playoffs IN (0, 1)),
  FOREIGN KEY (season_id) REFERENCES seasons(season_id),
  FOREIGN KEY (member_id) REFERENCES members(member_id)
);

CREATE INDEX IF NOT EXISTS idx_teams_season ON teams(season_id);
CREATE INDEX IF NOT EXISTS idx_teams_member ON teams(member_id);

CREATE TABLE IF NOT EXISTS matches (
  match_id TEXT PRIMARY KEY,
  season_id TEXT NOT NULL,
  week INTEGER NOT NULL CHECK (week >= 0),
  home_team_id TEXT NOT NULL,
  away_team_id TEXT NOT NULL,
  home_score REAL,
  away_score REAL,
  winner_team_id TEXT,
  is_tie INTEGER NOT NULL CHECK (is_tie IN (0, 1)),
  is_playoff INTEGER NOT NULL CHECK (is_playoff IN (0, 1)),
  is_championship INTEGER NOT NULL CHECK (is_championship IN (0, 1)),
  status TEXT NOT NULL CHECK (status IN ('scheduled', 'final')),
  played_on TEXT
);

CREATE INDEX IF NOT EXISTS idx_matches_season_week ON matches(season_id, week, match_id);
";

/// SQLite-backed match ledger.
pub struct SqliteLedgerStore {
    conn: Connection,
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ImportReport {
    pub seasons: usize,
    pub members: usize,
    pub teams: usize,
    pub matches: usize,
}

impl SqliteLedgerStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS schema_migrations (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL
                );",
            )
            .context("failed to ensure schema_migrations exists")?;

        self.conn
            .execute_batch(SCHEMA_LEDGER_V1)
            .context("failed to apply ledger schema")?;

        let applied = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
                params![LEDGER_MIGRATION_VERSION, now_rfc3339()?],
            )
            .context("failed to register ledger schema migration")?;
        if applied > 0 {
            info!(version = LEDGER_MIGRATION_VERSION, "applied ledger schema migration");
        }

        self.upsert_ruleset(&StatsRuleset::v1())?;
        Ok(())
    }

    pub fn upsert_ruleset(&self, ruleset: &StatsRuleset) -> Result<()> {
        ruleset
            .validate()
            .map_err(|err| anyhow!("invalid ruleset configuration: {err}"))?;

        let payload = serde_json::to_string(ruleset).context("failed to serialize ruleset")?;
        self.conn
            .execute(
                "INSERT INTO stats_rulesets(ruleset_version, ruleset_json, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(ruleset_version) DO UPDATE SET
                   ruleset_json = excluded.ruleset_json,
                   created_at = excluded.created_at",
                params![i64::from(ruleset.ruleset_version), payload, now_rfc3339()?],
            )
            .context("failed to upsert ruleset")?;

        Ok(())
    }

    pub fn get_rulesets(&self) -> Result<BTreeMap<u32, StatsRuleset>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT ruleset_version, ruleset_json FROM stats_rulesets ORDER BY ruleset_version ASC",
            )
            .context("failed to prepare ruleset query")?;

        let mut rows = stmt.query([]).context("failed to query rulesets")?;
        let mut map = BTreeMap::new();

        while let Some(row) = rows.next()? {
            let version_i64: i64 = row.get(0)?;
            let version = u32::try_from(version_i64)
                .with_context(|| format!("invalid ruleset_version: {version_i64}"))?;
            let json: String = row.get(1)?;
            let value: Value =
                serde_json::from_str(&json).context("invalid stored ruleset JSON")?;
            let ruleset = StatsRuleset::from_json(&value)
                .map_err(|err| anyhow!("failed to parse ruleset {version}: {err}"))?;
            map.insert(version, ruleset);
        }

        Ok(map)
    }

    /// Highest stored ruleset version, or the built-in defaults when none is stored.
    pub fn latest_ruleset(&self) -> Result<StatsRuleset> {
        Ok(self
            .get_rulesets()?
            .into_values()
            .next_back()
            .unwrap_or_else(StatsRuleset::v1))
    }

    pub fn upsert_season(&self, season: &Season) -> Result<()> {
        upsert_season_on(&self.conn, season)
    }

    pub fn upsert_member(&self, member: &Member) -> Result<()> {
        upsert_member_on(&self.conn, member)
    }

    pub fn upsert_team(&self, team: &Team) -> Result<()> {
        upsert_team_on(&self.conn, team)
    }

    pub fn upsert_match(&self, game: &Match) -> Result<()> {
        upsert_match_on(&self.conn, game)
    }

    /// Marks `from` as merged into `into`. Both members must already exist.
    pub fn record_merge(&self, from: &MemberId, into: &MemberId) -> Result<()> {
        if from == into {
            return Err(anyhow!("cannot merge member {from} into itself"));
        }
        if !self.member_exists(into)? {
            return Err(anyhow!("merge target member {into} does not exist"));
        }

        let updated = self
            .conn
            .execute(
                "UPDATE members SET merged_into = ?2, is_active = 0 WHERE member_id = ?1",
                params![from.as_str(), into.as_str()],
            )
            .with_context(|| format!("failed to record merge of {from} into {into}"))?;
        if updated == 0 {
            return Err(anyhow!("merge source member {from} does not exist"));
        }

        info!(from = %from, into = %into, "recorded member merge");
        Ok(())
    }

    /// Writes every row of `snapshot` in one transaction.
    pub fn import_snapshot(&mut self, snapshot: &LedgerSnapshot) -> Result<ImportReport> {
        let tx = self
            .conn
            .transaction()
            .context("failed to start import transaction")?;

        for season in &snapshot.seasons {
            upsert_season_on(&tx, season)?;
        }
        for member in &snapshot.members {
            upsert_member_on(&tx, member)?;
        }
        for team in &snapshot.teams {
            upsert_team_on(&tx, team)?;
        }
        for game in &snapshot.matches {
            upsert_match_on(&tx, game)?;
        }

        tx.commit().context("failed to commit import transaction")?;

        let report = ImportReport {
            seasons: snapshot.seasons.len(),
            members: snapshot.members.len(),
            teams: snapshot.teams.len(),
            matches: snapshot.matches.len(),
        };
        info!(
            seasons = report.seasons,
            members = report.members,
            teams = report.teams,
            matches = report.matches,
            "imported ledger snapshot"
        );
        Ok(report)
    }

    /// Reads the raw ledger. A season scope narrows teams and matches only.
    pub fn read_snapshot(&self, scope: &LedgerScope) -> Result<LedgerSnapshot> {
        let season_filter = match scope {
            LedgerScope::AllSeasons => None,
            LedgerScope::Season(season_id) => Some(season_id.as_str()),
        };

        let mut stmt = self
            .conn
            .prepare(
                "SELECT season_id, year, regular_season_weeks
                 FROM seasons
                 WHERE ?1 IS NULL OR season_id = ?1
                 ORDER BY year ASC, season_id ASC",
            )
            .context("failed to prepare season query")?;
        let rows = stmt
            .query_map(params![season_filter], parse_season_row)
            .context("failed to query seasons")?;
        let seasons = collect_rows(rows)?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT member_id, display_name, is_active, merged_into
                 FROM members
                 ORDER BY member_id ASC",
            )
            .context("failed to prepare member query")?;
        let rows = stmt
            .query_map([], parse_member_row)
            .context("failed to query members")?;
        let members = collect_rows(rows)?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT team_id, season_id, member_id, name, final_rank, wins, losses, ties,
                        points_for, points_against, is_champion, is_last_place, made_playoffs
                 FROM teams
                 WHERE ?1 IS NULL OR season_id = ?1
                 ORDER BY team_id ASC",
            )
            .context("failed to prepare team query")?;
        let rows = stmt
            .query_map(params![season_filter], parse_team_row)
            .context("failed to query teams")?;
        let teams = collect_rows(rows)?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT match_id, season_id, week, home_team_id, away_team_id, home_score,
                        away_score, winner_team_id, is_tie, is_playoff, is_championship,
                        status, played_on
                 FROM matches
                 WHERE ?1 IS NULL OR season_id = ?1
                 ORDER BY season_id ASC, week ASC, match_id ASC",
            )
            .context("failed to prepare match query")?;
        let rows = stmt
            .query_map(params![season_filter], parse_match_row)
            .context("failed to query matches")?;
        let matches = collect_rows(rows)?;

        debug!(
            seasons = seasons.len(),
            members = members.len(),
            teams = teams.len(),
            matches = matches.len(),
            "loaded ledger snapshot"
        );

        Ok(LedgerSnapshot {
            seasons,
            members,
            teams,
            matches,
        })
    }

    fn member_exists(&self, member_id: &MemberId) -> Result<bool> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM members WHERE member_id = ?1 LIMIT 1",
                params![member_id.as_str()],
                |_| Ok(()),
            )
            .optional()
            .context("failed to query members")?
            .is_some();
        Ok(exists)
    }

    #[cfg(test)]
    fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl LedgerProvider for SqliteLedgerStore {
    fn load_snapshot(
        &self,
        scope: &LedgerScope,
    ) -> std::result::Result<LedgerSnapshot, LedgerError> {
        self.read_snapshot(scope).map_err(|err| classify_failure(&err))
    }
}

/// Undecodable stored values are corruption; anything else means the ledger could not be read.
fn classify_failure(err: &anyhow::Error) -> LedgerError {
    let message = format!("{err:#}");
    match err.downcast_ref::<rusqlite::Error>() {
        Some(
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..),
        ) => LedgerError::Corrupt(message),
        _ => LedgerError::Unavailable(message),
    }
}

fn upsert_season_on(conn: &Connection, season: &Season) -> Result<()> {
    conn.execute(
        "INSERT INTO seasons(season_id, year, regular_season_weeks)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(season_id) DO UPDATE SET
           year = excluded.year,
           regular_season_weeks = excluded.regular_season_weeks",
        params![
            season.id.as_str(),
            season.year,
            i64::from(season.regular_season_weeks)
        ],
    )
    .with_context(|| format!("failed to upsert season {}", season.id))?;
    Ok(())
}

fn upsert_member_on(conn: &Connection, member: &Member) -> Result<()> {
    conn.execute(
        "INSERT INTO members(member_id, display_name, is_active, merged_into)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(member_id) DO UPDATE SET
           display_name = excluded.display_name,
           is_active = excluded.is_active,
           merged_into = excluded.merged_into",
        params![
            member.id.as_str(),
            member.display_name,
            bool_to_sql(member.is_active),
            member.merged_into.as_ref().map(MemberId::as_str),
        ],
    )
    .with_context(|| format!("failed to upsert member {}", member.id))?;
    Ok(())
}

fn upsert_team_on(conn: &Connection, team: &Team) -> Result<()> {
    conn.execute(
        "INSERT INTO teams(
            team_id, season_id, member_id, name, final_rank, wins, losses, ties,
            points_for, points_against, is_champion, is_last_place, made_playoffs
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(team_id) DO UPDATE SET
           season_id = excluded.season_id,
           member_id = excluded.member_id,
           name = excluded.name,
           final_rank = excluded.final_rank,
           wins = excluded.wins,
           losses = excluded.losses,
           ties = excluded.ties,
           points_for = excluded.points_for,
           points_against = excluded.points_against,
           is_champion = excluded.is_champion,
           is_last_place = excluded.is_last_place,
           made_playoffs = excluded.made_playoffs",
        params![
            team.id.as_str(),
            team.season_id.as_str(),
            team.member_id.as_str(),
            team.name,
            team.final_rank.map(i64::from),
            i64::from(team.wins),
            i64::from(team.losses),
            i64::from(team.ties),
            team.points_for,
            team.points_against,
            bool_to_sql(team.is_champion),
            bool_to_sql(team.is_last_place),
            bool_to_sql(team.made_playoffs),
        ],
    )
    .with_context(|| format!("failed to upsert team {}", team.id))?;
    Ok(())
}

fn upsert_match_on(conn: &Connection, game: &Match) -> Result<()> {
    let played_on = game.played_on.map(format_date).transpose()?;
    conn.execute(
        "INSERT INTO matches(
            match_id, season_id, week, home_team_id, away_team_id, home_score, away_score,
            winner_team_id, is_tie, is_playoff, is_championship, status, played_on
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(match_id) DO UPDATE SET
           season_id = excluded.season_id,
           week = excluded.week,
           home_team_id = excluded.home_team_id,
           away_team_id = excluded.away_team_id,
           home_score = excluded.home_score,
           away_score = excluded.away_score,
           winner_team_id = excluded.winner_team_id,
           is_tie = excluded.is_tie,
           is_playoff = excluded.is_playoff,
           is_championship = excluded.is_championship,
           status = excluded.status,
           played_on = excluded.played_on",
        params![
            game.id.as_str(),
            game.season_id.as_str(),
            i64::from(game.week),
            game.home_team_id.as_str(),
            game.away_team_id.as_str(),
            game.home_score,
            game.away_score,
            game.winner_team_id.as_ref().map(TeamId::as_str),
            bool_to_sql(game.is_tie),
            bool_to_sql(game.is_playoff),
            bool_to_sql(game.is_championship),
            game.status.as_str(),
            played_on,
        ],
    )
    .with_context(|| format!("failed to upsert match {}", game.id))?;
    Ok(())
}

fn parse_season_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Season> {
    let year_i64: i64 = row.get(1)?;
    Ok(Season {
        id: SeasonId::new(row.get::<_, String>(0)?),
        year: i32::try_from(year_i64).map_err(|_| {
            invalid_data(1, rusqlite::types::Type::Integer, format!("invalid year: {year_i64}"))
        })?,
        regular_season_weeks: column_u32(row, 2, "regular_season_weeks")?,
    })
}

fn parse_member_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: MemberId::new(row.get::<_, String>(0)?),
        display_name: row.get(1)?,
        is_active: row.get::<_, i64>(2)? != 0,
        merged_into: row.get::<_, Option<String>>(3)?.map(MemberId::new),
    })
}

fn parse_team_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Team> {
    let final_rank = match row.get::<_, Option<i64>>(4)? {
        Some(raw) => Some(u32::try_from(raw).map_err(|_| {
            invalid_data(4, rusqlite::types::Type::Integer, format!("invalid final_rank: {raw}"))
        })?),
        None => None,
    };
    Ok(Team {
        id: TeamId::new(row.get::<_, String>(0)?),
        season_id: SeasonId::new(row.get::<_, String>(1)?),
        member_id: MemberId::new(row.get::<_, String>(2)?),
        name: row.get(3)?,
        final_rank,
        wins: column_u32(row, 5, "wins")?,
        losses: column_u32(row, 6, "losses")?,
        ties: column_u32(row, 7, "ties")?,
        points_for: row.get(8)?,
        points_against: row.get(9)?,
        is_champion: row.get::<_, i64>(10)? != 0,
        is_last_place: row.get::<_, i64>(11)? != 0,
        made_playoffs: row.get::<_, i64>(12)? != 0,
    })
}

fn parse_match_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Match> {
    let status_raw: String = row.get(11)?;
    let status = MatchStatus::parse(&status_raw).ok_or_else(|| {
        invalid_data(11, rusqlite::types::Type::Text, format!("invalid status: {status_raw}"))
    })?;
    let played_on = match row.get::<_, Option<String>>(12)? {
        Some(raw) => Some(parse_date(&raw).map_err(|_| {
            invalid_data(12, rusqlite::types::Type::Text, format!("invalid played_on: {raw}"))
        })?),
        None => None,
    };

    Ok(Match {
        id: MatchId::new(row.get::<_, String>(0)?),
        season_id: SeasonId::new(row.get::<_, String>(1)?),
        week: column_u32(row, 2, "week")?,
        home_team_id: TeamId::new(row.get::<_, String>(3)?),
        away_team_id: TeamId::new(row.get::<_, String>(4)?),
        home_score: row.get(5)?,
        away_score: row.get(6)?,
        winner_team_id: row.get::<_, Option<String>>(7)?.map(TeamId::new),
        is_tie: row.get::<_, i64>(8)? != 0,
        is_playoff: row.get::<_, i64>(9)? != 0,
        is_championship: row.get::<_, i64>(10)? != 0,
        status,
        played_on,
    })
}

fn column_u32(row: &rusqlite::Row<'_>, index: usize, name: &str) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(index)?;
    u32::try_from(raw).map_err(|_| {
        invalid_data(index, rusqlite::types::Type::Integer, format!("invalid {name}: {raw}"))
    })
}

fn invalid_data(index: usize, kind: rusqlite::types::Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        kind,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

fn format_date(date: Date) -> Result<String> {
    date.format(format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("failed to format date {date}"))
}

fn parse_date(raw: &str) -> Result<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid calendar date: {raw}"))
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format RFC3339 timestamp")
}

fn bool_to_sql(value: bool) -> i64 {
    i64::from(value)
}

fn collect_rows<T>(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>>,
) -> Result<Vec<T>> {
    let mut values = Vec::new();
    for row in rows {
        values.push(row?);
    }
    Ok(values)
}
