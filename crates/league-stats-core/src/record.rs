use serde::{Deserialize, Serialize};

use crate::ledger::{LeagueIndex, ScoredMatch};
use crate::model::{MemberId, Record, Team};

/// Sums wins, losses and ties across team-seasons.
#[must_use]
pub fn aggregate(teams: &[Team]) -> Record {
    teams
        .iter()
        .fold(Record::default(), |total, team| total + team.record())
}

/// `(wins + ties/2) / games`, or `0.0` with no games played.
#[must_use]
pub fn win_percentage(record: &Record) -> f64 {
    let games = record.games();
    if games == 0 {
        return 0.0;
    }
    (f64::from(record.wins) + 0.5 * f64::from(record.ties)) / f64::from(games)
}

/// Baseball-style percentage: `.714`, `.000`, `1.000`.
#[must_use]
pub fn format_win_percentage(pct: f64) -> String {
    let clamped = if pct.is_finite() { pct.clamp(0.0, 1.0) } else { 0.0 };
    let formatted = format!("{clamped:.3}");
    match formatted.strip_prefix('0') {
        Some(rest) => rest.to_string(),
        None => formatted,
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PointTotals {
    pub points_for: f64,
    pub points_against: f64,
}

/// Record built from the member's scored matches (regular season and playoffs).
#[must_use]
pub fn match_record(matches: &[ScoredMatch], member_id: &MemberId) -> Record {
    let mut record = Record::default();
    for outcome in matches
        .iter()
        .filter_map(|scored| scored.outcome_for(member_id))
    {
        record.push(outcome);
    }
    record
}

#[must_use]
pub fn point_totals(matches: &[ScoredMatch], member_id: &MemberId) -> PointTotals {
    matches
        .iter()
        .filter_map(|scored| scored.sides_for(member_id))
        .fold(PointTotals::default(), |mut totals, (own, opponent)| {
            totals.points_for += own.score;
            totals.points_against += opponent.score;
            totals
        })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareerRecord {
    pub member_id: MemberId,
    pub seasons_played: u32,
    /// Sum of the authoritative team-season records.
    pub record: Record,
    pub win_percentage: f64,
    pub win_percentage_display: String,
    pub points_for: f64,
    pub points_against: f64,
    pub regular_season_record: Record,
    pub playoff_record: Record,
    pub championships: u32,
    pub playoff_appearances: u32,
    pub last_places: u32,
}

/// Career totals for a member, merged identities included.
#[must_use]
pub fn career_record(index: &LeagueIndex, member_id: &MemberId) -> CareerRecord {
    let canonical = index.resolve(member_id);
    let team_entries = index.teams_for_member(&canonical);
    let teams: Vec<Team> = team_entries
        .iter()
        .map(|entry| entry.team.clone())
        .collect();

    let record = aggregate(&teams);
    let pct = win_percentage(&record);

    let (regular, playoff): (Vec<ScoredMatch>, Vec<ScoredMatch>) = index
        .matches()
        .iter()
        .filter(|scored| scored.involves(&canonical))
        .cloned()
        .partition(|scored| !scored.is_playoff);

    CareerRecord {
        seasons_played: count_u32(teams.len()),
        record,
        win_percentage: pct,
        win_percentage_display: format_win_percentage(pct),
        points_for: teams.iter().map(|team| team.points_for).sum(),
        points_against: teams.iter().map(|team| team.points_against).sum(),
        regular_season_record: match_record(&regular, &canonical),
        playoff_record: match_record(&playoff, &canonical),
        championships: count_u32(teams.iter().filter(|team| team.is_champion).count()),
        playoff_appearances: count_u32(teams.iter().filter(|team| team.made_playoffs).count()),
        last_places: count_u32(teams.iter().filter(|team| team.is_last_place).count()),
        member_id: canonical,
    }
}

pub(crate) fn count_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
