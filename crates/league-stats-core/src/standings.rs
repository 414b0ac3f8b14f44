use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ledger::{LeagueIndex, ScoredMatch};
use crate::model::{MemberId, Record, Season, SeasonId, Team, TeamId};
use crate::record::win_percentage;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeeklyPoint {
    pub week: u32,
    /// Points scored that week; `None` when the team had no regular-season result.
    pub week_points: Option<f64>,
    pub points_for: f64,
    pub points_against: f64,
    pub record: Record,
    /// Positional rank is not recomputed; standings use the final rank of the team.
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamWeeklySeries {
    pub team_id: TeamId,
    pub member_id: MemberId,
    pub team_name: String,
    pub final_rank: Option<u32>,
    pub weeks: Vec<WeeklyPoint>,
}

/// Week-by-week running record and points for each team, weeks `1..=total_weeks`.
///
/// Only final regular-season matches count. Weeks without a result carry the
/// previous totals forward.
#[must_use]
pub fn weekly_standings(
    teams: &[Team],
    matches: &[ScoredMatch],
    total_weeks: u32,
) -> Vec<TeamWeeklySeries> {
    let mut ordered_teams: Vec<&Team> = teams.iter().collect();
    ordered_teams.sort_by(|left, right| left.id.cmp(&right.id));

    ordered_teams
        .into_iter()
        .map(|team| team_series(team, matches, total_weeks))
        .collect()
}

fn team_series(team: &Team, matches: &[ScoredMatch], total_weeks: u32) -> TeamWeeklySeries {
    let mut regular: Vec<&ScoredMatch> = matches
        .iter()
        .filter(|scored| !scored.is_playoff)
        .filter(|scored| scored.home.team_id == team.id || scored.away.team_id == team.id)
        .collect();
    regular.sort_by(|left, right| left.chrono_key().cmp(&right.chrono_key()));

    let mut record = Record::default();
    let mut points_for = 0.0;
    let mut points_against = 0.0;
    let mut weeks = Vec::new();

    for week in 1..=total_weeks {
        let mut this_week = regular.iter().filter(|scored| scored.week == week);
        let result = this_week.next();
        let extra = this_week.count();
        if extra > 0 {
            debug!(team_id = %team.id, week, extra, "ignoring extra regular-season results");
        }

        let week_points = result.map(|scored| {
            let (own, opponent) = if scored.home.team_id == team.id {
                (&scored.home, &scored.away)
            } else {
                (&scored.away, &scored.home)
            };
            points_for += own.score;
            points_against += opponent.score;
            record.push(crate::ledger::outcome_of(own.score, opponent.score));
            own.score
        });

        weeks.push(WeeklyPoint {
            week,
            week_points,
            points_for,
            points_against,
            record,
            rank: None,
        });
    }

    TeamWeeklySeries {
        team_id: team.id.clone(),
        member_id: team.member_id.clone(),
        team_name: team.name.clone(),
        final_rank: team.final_rank,
        weeks,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandingRow {
    pub position: u32,
    pub team_id: TeamId,
    pub member_id: MemberId,
    pub team_name: String,
    pub final_rank: Option<u32>,
    pub record: Record,
    pub win_percentage: f64,
    pub points_for: f64,
    pub points_against: f64,
    pub is_champion: bool,
    pub made_playoffs: bool,
    pub is_last_place: bool,
}

/// Final table ordered by the recorded final rank.
///
/// Teams without a final rank follow, by win percentage, points for, then id.
#[must_use]
pub fn final_standings(teams: &[Team]) -> Vec<StandingRow> {
    let mut ordered: Vec<&Team> = teams.iter().collect();
    ordered.sort_by(|left, right| compare_for_table(left, right));

    ordered
        .into_iter()
        .zip(1_u32..)
        .map(|(team, position)| {
            let record = team.record();
            StandingRow {
                position,
                team_id: team.id.clone(),
                member_id: team.member_id.clone(),
                team_name: team.name.clone(),
                final_rank: team.final_rank,
                record,
                win_percentage: win_percentage(&record),
                points_for: team.points_for,
                points_against: team.points_against,
                is_champion: team.is_champion,
                made_playoffs: team.made_playoffs,
                is_last_place: team.is_last_place,
            }
        })
        .collect()
}

fn compare_for_table(left: &Team, right: &Team) -> Ordering {
    match (left.final_rank, right.final_rank) {
        (Some(lhs), Some(rhs)) => lhs.cmp(&rhs).then_with(|| left.id.cmp(&right.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => win_percentage(&right.record())
            .total_cmp(&win_percentage(&left.record()))
            .then_with(|| right.points_for.total_cmp(&left.points_for))
            .then_with(|| left.id.cmp(&right.id)),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonJourney {
    pub season_id: SeasonId,
    pub year: i32,
    pub total_weeks: u32,
    pub series: Vec<TeamWeeklySeries>,
    pub final_standings: Vec<StandingRow>,
    pub skipped_matches: usize,
}

/// Weekly series plus final table for one explicitly chosen season.
#[must_use]
pub fn season_journey(index: &LeagueIndex, season: &Season) -> SeasonJourney {
    let teams = index.teams_for_season(&season.id);
    let matches = index.matches_for_season(&season.id);
    SeasonJourney {
        season_id: season.id.clone(),
        year: season.year,
        total_weeks: season.regular_season_weeks,
        series: weekly_standings(&teams, &matches, season.regular_season_weeks),
        final_standings: final_standings(&teams),
        skipped_matches: index.skipped_count(),
    }
}
