use serde::{Deserialize, Serialize};

use crate::h2h::{H2hMatrix, H2hPairRecord};
use crate::ledger::LeagueIndex;
use crate::model::{MatchId, MemberId, SeasonId, Team, TeamId};
use crate::record::{career_record, count_u32, CareerRecord};
use crate::records::{LeagueRecord, RecordBook};
use crate::rivalry::{
    rivalries_for, rivalry_with, top_nemesis, top_victim, RivalryEntry, RivalryLabel,
};
use crate::ruleset::StatsRuleset;
use crate::streak::{current_streak, longest_streaks, LongestStreaks};
use crate::StatsError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpcomingMatchup {
    pub match_id: MatchId,
    pub week: u32,
    pub team_id: TeamId,
    pub opponent_team_id: TeamId,
    pub opponent_member_id: MemberId,
    pub is_home: bool,
    pub head_to_head: H2hPairRecord,
    pub label: RivalryLabel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrophyCase {
    pub championship_years: Vec<i32>,
    pub last_place_years: Vec<i32>,
    pub playoff_appearances: u32,
    pub records_held: Vec<LeagueRecord>,
}

/// Everything a member profile page shows, for one explicitly chosen season.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberDashboard {
    pub member_id: MemberId,
    pub display_name: String,
    pub season_id: SeasonId,
    pub career: CareerRecord,
    pub current_streak: i32,
    pub longest_streaks: LongestStreaks,
    pub rivalries: Vec<RivalryEntry>,
    pub top_nemesis: Option<RivalryEntry>,
    pub top_victim: Option<RivalryEntry>,
    pub upcoming: Option<UpcomingMatchup>,
    pub trophy_case: TrophyCase,
    pub skipped_matches: usize,
}

impl MemberDashboard {
    /// # Errors
    /// Returns [`StatsError::Validation`] when the member id is blank or the
    /// season is not part of the ledger.
    pub fn build(
        index: &LeagueIndex,
        matrix: &H2hMatrix,
        book: &RecordBook,
        member_id: &MemberId,
        season_id: &SeasonId,
        ruleset: &StatsRuleset,
    ) -> Result<Self, StatsError> {
        if member_id.as_str().trim().is_empty() {
            return Err(StatsError::Validation(
                "member_id MUST be non-empty".to_string(),
            ));
        }
        if index.season(season_id).is_none() {
            return Err(StatsError::Validation(format!(
                "unknown season `{season_id}`"
            )));
        }

        let canonical = index.resolve(member_id);
        let display_name = index
            .member(&canonical)
            .map_or_else(|| canonical.to_string(), |member| member.display_name.clone());

        let rivalries = rivalries_for(matrix, &canonical, &ruleset.rivalry);
        let nemesis = top_nemesis(&rivalries).cloned();
        let victim = top_victim(&rivalries).cloned();

        Ok(Self {
            display_name,
            season_id: season_id.clone(),
            career: career_record(index, &canonical),
            current_streak: current_streak(index.matches(), &canonical),
            longest_streaks: longest_streaks(index.matches(), &canonical),
            top_nemesis: nemesis,
            top_victim: victim,
            rivalries,
            upcoming: upcoming_matchup(index, matrix, &canonical, season_id, ruleset),
            trophy_case: trophy_case(index, book, &canonical),
            skipped_matches: index.skipped_count(),
            member_id: canonical,
        })
    }
}

/// Earliest scheduled match in `season_id` involving the member.
fn upcoming_matchup(
    index: &LeagueIndex,
    matrix: &H2hMatrix,
    member_id: &MemberId,
    season_id: &SeasonId,
    ruleset: &StatsRuleset,
) -> Option<UpcomingMatchup> {
    index
        .scheduled()
        .iter()
        .filter(|scheduled| &scheduled.season_id == season_id)
        .find_map(|scheduled| {
            let home = index.member_of_team(&scheduled.home_team_id)?;
            let away = index.member_of_team(&scheduled.away_team_id)?;
            let (is_home, team_id, opponent_team_id, opponent) = if home == member_id {
                (true, &scheduled.home_team_id, &scheduled.away_team_id, away)
            } else if away == member_id {
                (false, &scheduled.away_team_id, &scheduled.home_team_id, home)
            } else {
                return None;
            };
            let head_to_head = matrix.lookup(member_id, opponent);
            let label = rivalry_with(matrix, member_id, opponent, &ruleset.rivalry).label;
            Some(UpcomingMatchup {
                match_id: scheduled.id.clone(),
                week: scheduled.week,
                team_id: team_id.clone(),
                opponent_team_id: opponent_team_id.clone(),
                opponent_member_id: opponent.clone(),
                is_home,
                head_to_head,
                label,
            })
        })
}

fn trophy_case(index: &LeagueIndex, book: &RecordBook, member_id: &MemberId) -> TrophyCase {
    let entries = index.teams_for_member(member_id);
    let years_where = |flag: fn(&Team) -> bool| -> Vec<i32> {
        entries
            .iter()
            .filter(|entry| flag(&entry.team))
            .filter_map(|entry| entry.season_year)
            .collect()
    };

    TrophyCase {
        championship_years: years_where(|team| team.is_champion),
        last_place_years: years_where(|team| team.is_last_place),
        playoff_appearances: count_u32(
            entries
                .iter()
                .filter(|entry| entry.team.made_playoffs)
                .count(),
        ),
        records_held: book.held_by(member_id).into_iter().cloned().collect(),
    }
}
