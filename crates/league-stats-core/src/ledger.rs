use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::{debug, warn};

use crate::identity::MemberResolver;
use crate::model::{
    derive_winner, LedgerSnapshot, Match, MatchId, MatchStatus, Member, MemberId, Outcome, Season,
    SeasonId, Team, TeamId,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingScore,
    WinnerMismatch,
    TieMismatch,
    SelfMatch,
    UnknownTeam,
    SameMember,
    /// A later row reusing an id already seen; the first row wins.
    DuplicateId,
}

impl SkipReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingScore => "missing_score",
            Self::WinnerMismatch => "winner_mismatch",
            Self::TieMismatch => "tie_mismatch",
            Self::SelfMatch => "self_match",
            Self::UnknownTeam => "unknown_team",
            Self::SameMember => "same_member",
            Self::DuplicateId => "duplicate_id",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct SkippedMatch {
    pub match_id: MatchId,
    pub reason: SkipReason,
}

/// One side of a screened final match, resolved to its canonical member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Side {
    pub team_id: TeamId,
    pub member_id: MemberId,
    pub score: f64,
}

/// A final match that passed screening. Scores are present and consistent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredMatch {
    pub match_id: MatchId,
    pub season_id: SeasonId,
    pub season_year: i32,
    pub week: u32,
    pub home: Side,
    pub away: Side,
    pub is_playoff: bool,
    pub is_championship: bool,
    pub played_on: Option<Date>,
}

impl ScoredMatch {
    #[must_use]
    pub fn involves(&self, member_id: &MemberId) -> bool {
        &self.home.member_id == member_id || &self.away.member_id == member_id
    }

    /// `(own, opponent)` sides for `member_id`, if they played.
    #[must_use]
    pub fn sides_for(&self, member_id: &MemberId) -> Option<(&Side, &Side)> {
        if &self.home.member_id == member_id {
            Some((&self.home, &self.away))
        } else if &self.away.member_id == member_id {
            Some((&self.away, &self.home))
        } else {
            None
        }
    }

    #[must_use]
    pub fn outcome_for(&self, member_id: &MemberId) -> Option<Outcome> {
        let (own, opponent) = self.sides_for(member_id)?;
        Some(outcome_of(own.score, opponent.score))
    }

    #[must_use]
    pub fn margin(&self) -> f64 {
        (self.home.score - self.away.score).abs()
    }

    #[must_use]
    pub fn combined_score(&self) -> f64 {
        self.home.score + self.away.score
    }

    /// Sort key used for every chronological walk.
    #[must_use]
    pub fn chrono_key(&self) -> (i32, u32, &MatchId) {
        (self.season_year, self.week, &self.match_id)
    }
}

#[must_use]
pub fn outcome_of(own: f64, opponent: f64) -> Outcome {
    if own > opponent {
        Outcome::Win
    } else if own < opponent {
        Outcome::Loss
    } else {
        Outcome::Tie
    }
}

/// Checks the final-match invariant: scores present and winner/tie flags agree with them.
///
/// # Errors
/// Returns the [`SkipReason`] describing the first violated rule.
pub fn check_final_match(candidate: &Match) -> Result<(f64, f64), SkipReason> {
    if candidate.home_team_id == candidate.away_team_id {
        return Err(SkipReason::SelfMatch);
    }
    let (Some(home_score), Some(away_score)) = (candidate.home_score, candidate.away_score) else {
        return Err(SkipReason::MissingScore);
    };
    if !home_score.is_finite() || !away_score.is_finite() {
        return Err(SkipReason::MissingScore);
    }

    let (winner, is_tie) = derive_winner(
        &candidate.home_team_id,
        home_score,
        &candidate.away_team_id,
        away_score,
    );
    if candidate.is_tie != is_tie {
        return Err(SkipReason::TieMismatch);
    }
    if candidate.winner_team_id != winner {
        return Err(SkipReason::WinnerMismatch);
    }
    Ok((home_score, away_score))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamEntry {
    pub team: Team,
    pub canonical_member_id: MemberId,
    pub season_year: Option<i32>,
}

/// Screened, identity-resolved view of a ledger snapshot.
///
/// Built once per snapshot; every aggregate reads from it.
#[derive(Debug, Clone)]
pub struct LeagueIndex {
    resolver: MemberResolver,
    seasons: BTreeMap<SeasonId, Season>,
    members: BTreeMap<MemberId, Member>,
    teams: BTreeMap<TeamId, TeamEntry>,
    matches: Vec<ScoredMatch>,
    scheduled: Vec<Match>,
    skipped: Vec<SkippedMatch>,
}

impl LeagueIndex {
    #[must_use]
    pub fn build(snapshot: &LedgerSnapshot) -> Self {
        let resolver = MemberResolver::from_members(&snapshot.members);
        let seasons: BTreeMap<SeasonId, Season> = snapshot
            .seasons
            .iter()
            .map(|season| (season.id.clone(), season.clone()))
            .collect();
        let members: BTreeMap<MemberId, Member> = snapshot
            .members
            .iter()
            .map(|member| (member.id.clone(), member.clone()))
            .collect();
        let teams: BTreeMap<TeamId, TeamEntry> = snapshot
            .teams
            .iter()
            .map(|team| {
                let entry = TeamEntry {
                    canonical_member_id: resolver.resolve(&team.member_id),
                    season_year: seasons.get(&team.season_id).map(|season| season.year),
                    team: team.clone(),
                };
                (team.id.clone(), entry)
            })
            .collect();

        let mut index = Self {
            resolver,
            seasons,
            members,
            teams,
            matches: Vec::new(),
            scheduled: Vec::new(),
            skipped: Vec::new(),
        };

        let mut seen_ids = BTreeSet::new();
        for candidate in &snapshot.matches {
            if !seen_ids.insert(candidate.id.clone()) {
                warn!(match_id = %candidate.id, "skipping duplicate match id");
                index.skipped.push(SkippedMatch {
                    match_id: candidate.id.clone(),
                    reason: SkipReason::DuplicateId,
                });
                continue;
            }
            match candidate.status {
                MatchStatus::Scheduled => index.scheduled.push(candidate.clone()),
                MatchStatus::Final => match index.screen(candidate) {
                    Ok(scored) => index.matches.push(scored),
                    Err(reason) => {
                        warn!(
                            match_id = %candidate.id,
                            reason = reason.as_str(),
                            "skipping malformed final match"
                        );
                        index.skipped.push(SkippedMatch {
                            match_id: candidate.id.clone(),
                            reason,
                        });
                    }
                },
            }
        }

        index
            .matches
            .sort_by(|left, right| left.chrono_key().cmp(&right.chrono_key()));
        index.scheduled.sort_by(|left, right| {
            (left.week, &left.id).cmp(&(right.week, &right.id))
        });

        debug!(
            seasons = index.seasons.len(),
            members = index.members.len(),
            teams = index.teams.len(),
            scored_matches = index.matches.len(),
            scheduled_matches = index.scheduled.len(),
            skipped_matches = index.skipped.len(),
            merge_redirects = index.resolver.redirect_count(),
            "league index built"
        );
        index
    }

    fn screen(&self, candidate: &Match) -> Result<ScoredMatch, SkipReason> {
        let (home_score, away_score) = check_final_match(candidate)?;
        let home_team = self
            .teams
            .get(&candidate.home_team_id)
            .ok_or(SkipReason::UnknownTeam)?;
        let away_team = self
            .teams
            .get(&candidate.away_team_id)
            .ok_or(SkipReason::UnknownTeam)?;
        if home_team.canonical_member_id == away_team.canonical_member_id {
            return Err(SkipReason::SameMember);
        }

        let season_year = self
            .seasons
            .get(&candidate.season_id)
            .map(|season| season.year)
            .or(home_team.season_year)
            .unwrap_or_default();

        Ok(ScoredMatch {
            match_id: candidate.id.clone(),
            season_id: candidate.season_id.clone(),
            season_year,
            week: candidate.week,
            home: Side {
                team_id: candidate.home_team_id.clone(),
                member_id: home_team.canonical_member_id.clone(),
                score: home_score,
            },
            away: Side {
                team_id: candidate.away_team_id.clone(),
                member_id: away_team.canonical_member_id.clone(),
                score: away_score,
            },
            is_playoff: candidate.is_playoff,
            is_championship: candidate.is_championship,
            played_on: candidate.played_on,
        })
    }

    #[must_use]
    pub fn resolve(&self, member_id: &MemberId) -> MemberId {
        self.resolver.resolve(member_id)
    }

    /// Final matches that passed screening, oldest first.
    #[must_use]
    pub fn matches(&self) -> &[ScoredMatch] {
        &self.matches
    }

    #[must_use]
    pub fn matches_for_season(&self, season_id: &SeasonId) -> Vec<ScoredMatch> {
        self.matches
            .iter()
            .filter(|scored| &scored.season_id == season_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn scheduled(&self) -> &[Match] {
        &self.scheduled
    }

    #[must_use]
    pub fn skipped(&self) -> &[SkippedMatch] {
        &self.skipped
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    #[must_use]
    pub fn season(&self, season_id: &SeasonId) -> Option<&Season> {
        self.seasons.get(season_id)
    }

    pub fn seasons(&self) -> impl Iterator<Item = &Season> {
        self.seasons.values()
    }

    #[must_use]
    pub fn member(&self, member_id: &MemberId) -> Option<&Member> {
        self.members.get(member_id)
    }

    /// Members that have not been merged away, in id order.
    pub fn live_members(&self) -> impl Iterator<Item = &Member> {
        self.members
            .values()
            .filter(|member| !self.resolver.is_merged_away(&member.id))
    }

    #[must_use]
    pub fn team(&self, team_id: &TeamId) -> Option<&TeamEntry> {
        self.teams.get(team_id)
    }

    pub fn team_entries(&self) -> impl Iterator<Item = &TeamEntry> {
        self.teams.values()
    }

    /// Every team-season owned by `member_id` after merge resolution, oldest season first.
    #[must_use]
    pub fn teams_for_member(&self, member_id: &MemberId) -> Vec<&TeamEntry> {
        let canonical = self.resolve(member_id);
        let mut entries: Vec<&TeamEntry> = self
            .teams
            .values()
            .filter(|entry| entry.canonical_member_id == canonical)
            .collect();
        entries.sort_by(|left, right| {
            (left.season_year, &left.team.id).cmp(&(right.season_year, &right.team.id))
        });
        entries
    }

    #[must_use]
    pub fn teams_for_season(&self, season_id: &SeasonId) -> Vec<Team> {
        self.teams
            .values()
            .filter(|entry| &entry.team.season_id == season_id)
            .map(|entry| {
                let mut team = entry.team.clone();
                team.member_id = entry.canonical_member_id.clone();
                team
            })
            .collect()
    }

    /// Canonical member that owns `team_id`.
    #[must_use]
    pub fn member_of_team(&self, team_id: &TeamId) -> Option<&MemberId> {
        self.teams
            .get(team_id)
            .map(|entry| &entry.canonical_member_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{league_snapshot, member, team};

    #[test]
    fn malformed_final_matches_are_skipped_and_counted() {
        let mut snapshot = league_snapshot();
        let mut missing = Match::final_result("bad-1", "s2020", 3, ("t-alice-2020", 90.0), ("t-bob-2020", 80.0));
        missing.away_score = None;
        let mut wrong_winner = Match::final_result("bad-2", "s2020", 4, ("t-alice-2020", 90.0), ("t-bob-2020", 80.0));
        wrong_winner.winner_team_id = Some(TeamId::from("t-bob-2020"));
        let mut wrong_tie = Match::final_result("bad-3", "s2020", 5, ("t-alice-2020", 90.0), ("t-bob-2020", 80.0));
        wrong_tie.is_tie = true;
        let unknown = Match::final_result("bad-4", "s2020", 6, ("t-nobody", 90.0), ("t-bob-2020", 80.0));
        snapshot.matches.extend([missing, wrong_winner, wrong_tie, unknown]);

        let index = LeagueIndex::build(&snapshot);
        let reasons: Vec<SkipReason> = index.skipped().iter().map(|item| item.reason).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::MissingScore,
                SkipReason::WinnerMismatch,
                SkipReason::TieMismatch,
                SkipReason::UnknownTeam,
            ]
        );
        assert_eq!(index.skipped_count(), 4);
        assert_eq!(index.matches().len(), league_snapshot().matches.len() - 1);
    }

    #[test]
    fn duplicate_match_ids_keep_the_first_row_and_count_the_rest() {
        let mut snapshot = league_snapshot();
        snapshot.matches.push(Match::final_result(
            "m-2020-1",
            "s2020",
            1,
            ("t-bob-2020", 200.0),
            ("t-alice-2020", 10.0),
        ));

        let index = LeagueIndex::build(&snapshot);
        assert_eq!(
            index.skipped(),
            &[SkippedMatch {
                match_id: MatchId::from("m-2020-1"),
                reason: SkipReason::DuplicateId,
            }]
        );
        let kept: Vec<&ScoredMatch> = index
            .matches()
            .iter()
            .filter(|scored| scored.match_id == MatchId::from("m-2020-1"))
            .collect();
        assert_eq!(kept.len(), 1);
        assert!(kept
            .iter()
            .all(|scored| scored.outcome_for(&MemberId::from("alice")) == Some(Outcome::Win)));
    }

    #[test]
    fn scheduled_matches_are_kept_out_of_aggregation() {
        let snapshot = league_snapshot();
        let index = LeagueIndex::build(&snapshot);
        assert_eq!(index.scheduled().len(), 1);
        assert!(index
            .matches()
            .iter()
            .all(|scored| scored.match_id != MatchId::from("sched-1")));
    }

    #[test]
    fn matches_are_sorted_chronologically() {
        let index = LeagueIndex::build(&league_snapshot());
        let keys: Vec<(i32, u32)> = index
            .matches()
            .iter()
            .map(|scored| (scored.season_year, scored.week))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn merged_members_are_resolved_at_ingestion() {
        let mut snapshot = league_snapshot();
        snapshot.members.push(member("alice-dup", Some("alice")));
        snapshot
            .teams
            .push(team("t-alice-dup-2022", "s2022", "alice-dup", 9, 5, 0));
        snapshot.matches.push(Match::final_result(
            "dup-1",
            "s2022",
            1,
            ("t-alice-dup-2022", 101.0),
            ("t-bob-2022", 99.0),
        ));

        let index = LeagueIndex::build(&snapshot);
        let dup = index
            .matches()
            .iter()
            .find(|scored| scored.match_id == MatchId::from("dup-1"));
        assert_eq!(
            dup.map(|scored| scored.home.member_id.clone()),
            Some(MemberId::from("alice"))
        );
        assert!(index
            .live_members()
            .all(|live| live.id != MemberId::from("alice-dup")));
        assert_eq!(index.teams_for_member(&MemberId::from("alice-dup")).len(), 4);
    }

    #[test]
    fn two_teams_of_one_member_cannot_play_each_other() {
        let mut snapshot = league_snapshot();
        snapshot.members.push(member("alice-dup", Some("alice")));
        snapshot
            .teams
            .push(team("t-alice-dup-2022", "s2022", "alice-dup", 9, 5, 0));
        snapshot.matches.push(Match::final_result(
            "dup-2",
            "s2022",
            2,
            ("t-alice-dup-2022", 101.0),
            ("t-alice-2022", 99.0),
        ));
        let index = LeagueIndex::build(&snapshot);
        assert_eq!(
            index.skipped().last().map(|item| item.reason),
            Some(SkipReason::SameMember)
        );
    }
}
