use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ledger::{LeagueIndex, ScoredMatch, Side};
use crate::model::{MemberId, Record};
use crate::record::{career_record, win_percentage, CareerRecord};
use crate::ruleset::StatsRuleset;
use crate::streak::{longest_streaks, LongestStreaks};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    SingleWeek,
    Season,
    Career,
    Playoff,
    Dubious,
}

impl RecordCategory {
    pub const ALL: [Self; 5] = [
        Self::SingleWeek,
        Self::Season,
        Self::Career,
        Self::Playoff,
        Self::Dubious,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleWeek => "single_week",
            Self::Season => "season",
            Self::Career => "career",
            Self::Playoff => "playoff",
            Self::Dubious => "dubious",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

impl Polarity {
    /// Strict improvement; equal values never displace a holder.
    #[must_use]
    pub fn improves(self, candidate: f64, current: f64) -> bool {
        match self {
            Self::HigherIsBetter => candidate > current,
            Self::LowerIsBetter => candidate < current,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    HighestSingleWeekScore,
    LowestSingleWeekScore,
    BiggestBlowoutMargin,
    ClosestGameMargin,
    HighestCombinedScore,
    MostSeasonPoints,
    MostSeasonWins,
    BestSeasonRecord,
    MostCareerWins,
    MostCareerPoints,
    BestCareerWinPercentage,
    LongestWinStreak,
    MostChampionships,
    MostPlayoffAppearances,
    MostPlayoffWins,
    HighestPlayoffScore,
    WorstSeasonRecord,
    /// Lower is better: the holder is the member with the fewest last-place
    /// finishes, zero included.
    MostLastPlaces,
    MostSeasonPointsAgainst,
    LongestLosingStreak,
}

impl RecordType {
    pub const ALL: [Self; 20] = [
        Self::HighestSingleWeekScore,
        Self::LowestSingleWeekScore,
        Self::BiggestBlowoutMargin,
        Self::ClosestGameMargin,
        Self::HighestCombinedScore,
        Self::MostSeasonPoints,
        Self::MostSeasonWins,
        Self::BestSeasonRecord,
        Self::MostCareerWins,
        Self::MostCareerPoints,
        Self::BestCareerWinPercentage,
        Self::LongestWinStreak,
        Self::MostChampionships,
        Self::MostPlayoffAppearances,
        Self::MostPlayoffWins,
        Self::HighestPlayoffScore,
        Self::WorstSeasonRecord,
        Self::MostLastPlaces,
        Self::MostSeasonPointsAgainst,
        Self::LongestLosingStreak,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighestSingleWeekScore => "highest_single_week_score",
            Self::LowestSingleWeekScore => "lowest_single_week_score",
            Self::BiggestBlowoutMargin => "biggest_blowout_margin",
            Self::ClosestGameMargin => "closest_game_margin",
            Self::HighestCombinedScore => "highest_combined_score",
            Self::MostSeasonPoints => "most_season_points",
            Self::MostSeasonWins => "most_season_wins",
            Self::BestSeasonRecord => "best_season_record",
            Self::MostCareerWins => "most_career_wins",
            Self::MostCareerPoints => "most_career_points",
            Self::BestCareerWinPercentage => "best_career_win_percentage",
            Self::LongestWinStreak => "longest_win_streak",
            Self::MostChampionships => "most_championships",
            Self::MostPlayoffAppearances => "most_playoff_appearances",
            Self::MostPlayoffWins => "most_playoff_wins",
            Self::HighestPlayoffScore => "highest_playoff_score",
            Self::WorstSeasonRecord => "worst_season_record",
            Self::MostLastPlaces => "most_last_places",
            Self::MostSeasonPointsAgainst => "most_season_points_against",
            Self::LongestLosingStreak => "longest_losing_streak",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|record_type| record_type.as_str() == value)
    }

    #[must_use]
    pub fn category(self) -> RecordCategory {
        match self {
            Self::HighestSingleWeekScore
            | Self::LowestSingleWeekScore
            | Self::BiggestBlowoutMargin
            | Self::ClosestGameMargin
            | Self::HighestCombinedScore => RecordCategory::SingleWeek,
            Self::MostSeasonPoints | Self::MostSeasonWins | Self::BestSeasonRecord => {
                RecordCategory::Season
            }
            Self::MostCareerWins
            | Self::MostCareerPoints
            | Self::BestCareerWinPercentage
            | Self::LongestWinStreak => RecordCategory::Career,
            Self::MostChampionships
            | Self::MostPlayoffAppearances
            | Self::MostPlayoffWins
            | Self::HighestPlayoffScore => RecordCategory::Playoff,
            Self::WorstSeasonRecord
            | Self::MostLastPlaces
            | Self::MostSeasonPointsAgainst
            | Self::LongestLosingStreak => RecordCategory::Dubious,
        }
    }

    #[must_use]
    pub fn polarity(self) -> Polarity {
        match self {
            Self::LowestSingleWeekScore
            | Self::ClosestGameMargin
            | Self::WorstSeasonRecord
            | Self::MostLastPlaces => Polarity::LowerIsBetter,
            _ => Polarity::HigherIsBetter,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeagueRecord {
    pub record_type: RecordType,
    pub category: RecordCategory,
    pub value: f64,
    pub holder_member_id: MemberId,
    pub season_year: Option<i32>,
    pub week: Option<u32>,
    pub opponent_member_id: Option<MemberId>,
}

impl LeagueRecord {
    fn career(record_type: RecordType, holder: &MemberId, value: f64) -> Self {
        Self {
            record_type,
            category: record_type.category(),
            value,
            holder_member_id: holder.clone(),
            season_year: None,
            week: None,
            opponent_member_id: None,
        }
    }

    fn weekly(
        record_type: RecordType,
        scored: &ScoredMatch,
        holder: &Side,
        opponent: &Side,
        value: f64,
    ) -> Self {
        Self {
            record_type,
            category: record_type.category(),
            value,
            holder_member_id: holder.member_id.clone(),
            season_year: Some(scored.season_year),
            week: Some(scored.week),
            opponent_member_id: Some(opponent.member_id.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordCheck {
    pub record_type: RecordType,
    pub candidate: f64,
    pub is_record: bool,
    pub current_holder: Option<LeagueRecord>,
}

/// All-time league records, one holder per record type that has any candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordBook {
    records: Vec<LeagueRecord>,
    skipped_matches: usize,
}

impl RecordBook {
    #[must_use]
    pub fn compute(index: &LeagueIndex, ruleset: &StatsRuleset) -> Self {
        let mut tracker = Tracker::default();

        for scored in index.matches() {
            track_match(&mut tracker, scored);
        }

        let mut team_entries: Vec<_> = index.team_entries().collect();
        team_entries.sort_by(|left, right| {
            (left.season_year, &left.team.id).cmp(&(right.season_year, &right.team.id))
        });
        for entry in team_entries {
            let team = &entry.team;
            let record = team.record();
            let season_record = |record_type, value| LeagueRecord {
                record_type,
                category: RecordType::category(record_type),
                value,
                holder_member_id: entry.canonical_member_id.clone(),
                season_year: entry.season_year,
                week: None,
                opponent_member_id: None,
            };
            tracker.offer(season_record(RecordType::MostSeasonPoints, team.points_for));
            tracker.offer(season_record(RecordType::MostSeasonWins, f64::from(team.wins)));
            tracker.offer(season_record(
                RecordType::MostSeasonPointsAgainst,
                team.points_against,
            ));
            if record.games() > 0 {
                let pct = win_percentage(&record);
                tracker.offer(season_record(RecordType::BestSeasonRecord, pct));
                tracker.offer(season_record(RecordType::WorstSeasonRecord, pct));
            }
        }

        for member_id in career_candidates(index) {
            let career = career_record(index, &member_id);
            let streaks = longest_streaks(index.matches(), &member_id);
            track_career(&mut tracker, &career, streaks, ruleset);
        }

        let records: Vec<LeagueRecord> = RecordType::ALL
            .into_iter()
            .filter_map(|record_type| tracker.take(record_type))
            .collect();
        debug!(
            records = records.len(),
            skipped_matches = index.skipped_count(),
            "record book computed"
        );
        Self {
            records,
            skipped_matches: index.skipped_count(),
        }
    }

    #[must_use]
    pub fn all_records(&self) -> &[LeagueRecord] {
        &self.records
    }

    #[must_use]
    pub fn by_category(&self, category: RecordCategory) -> Vec<&LeagueRecord> {
        self.records
            .iter()
            .filter(|record| record.category == category)
            .collect()
    }

    #[must_use]
    pub fn get(&self, record_type: RecordType) -> Option<&LeagueRecord> {
        self.records
            .iter()
            .find(|record| record.record_type == record_type)
    }

    /// Records currently held by `member_id`.
    #[must_use]
    pub fn held_by(&self, member_id: &MemberId) -> Vec<&LeagueRecord> {
        self.records
            .iter()
            .filter(|record| &record.holder_member_id == member_id)
            .collect()
    }

    /// Whether `candidate` would set a new record. With no holder, any value does.
    #[must_use]
    pub fn is_record_breaking(&self, record_type: RecordType, candidate: f64) -> RecordCheck {
        let current_holder = self.get(record_type).cloned();
        let is_record = candidate.is_finite()
            && match &current_holder {
                Some(holder) => record_type.polarity().improves(candidate, holder.value),
                None => true,
            };
        RecordCheck {
            record_type,
            candidate,
            is_record,
            current_holder,
        }
    }

    #[must_use]
    pub fn skipped_matches(&self) -> usize {
        self.skipped_matches
    }
}

#[derive(Default)]
struct Tracker {
    best: Vec<LeagueRecord>,
}

impl Tracker {
    fn offer(&mut self, candidate: LeagueRecord) {
        let polarity = candidate.record_type.polarity();
        match self
            .best
            .iter_mut()
            .find(|held| held.record_type == candidate.record_type)
        {
            Some(held) => {
                if polarity.improves(candidate.value, held.value) {
                    *held = candidate;
                }
            }
            None => self.best.push(candidate),
        }
    }

    fn take(&mut self, record_type: RecordType) -> Option<LeagueRecord> {
        let position = self
            .best
            .iter()
            .position(|held| held.record_type == record_type)?;
        Some(self.best.swap_remove(position))
    }
}

fn track_match(tracker: &mut Tracker, scored: &ScoredMatch) {
    for (own, opponent) in [(&scored.home, &scored.away), (&scored.away, &scored.home)] {
        tracker.offer(LeagueRecord::weekly(
            RecordType::HighestSingleWeekScore,
            scored,
            own,
            opponent,
            own.score,
        ));
        tracker.offer(LeagueRecord::weekly(
            RecordType::LowestSingleWeekScore,
            scored,
            own,
            opponent,
            own.score,
        ));
        if scored.is_playoff {
            tracker.offer(LeagueRecord::weekly(
                RecordType::HighestPlayoffScore,
                scored,
                own,
                opponent,
                own.score,
            ));
        }
    }

    // Margin records belong to the winner; a tie is credited to the home side.
    let (winner, loser) = if scored.away.score > scored.home.score {
        (&scored.away, &scored.home)
    } else {
        (&scored.home, &scored.away)
    };
    let margin = scored.margin();
    tracker.offer(LeagueRecord::weekly(
        RecordType::BiggestBlowoutMargin,
        scored,
        winner,
        loser,
        margin,
    ));
    tracker.offer(LeagueRecord::weekly(
        RecordType::ClosestGameMargin,
        scored,
        winner,
        loser,
        margin,
    ));
    tracker.offer(LeagueRecord::weekly(
        RecordType::HighestCombinedScore,
        scored,
        winner,
        loser,
        scored.combined_score(),
    ));
}

fn track_career(
    tracker: &mut Tracker,
    career: &CareerRecord,
    streaks: LongestStreaks,
    ruleset: &StatsRuleset,
) {
    let holder = &career.member_id;
    let offer = |tracker: &mut Tracker, record_type, value| {
        tracker.offer(LeagueRecord::career(record_type, holder, value));
    };

    offer(tracker, RecordType::MostCareerWins, f64::from(career.record.wins));
    offer(tracker, RecordType::MostCareerPoints, career.points_for);
    if career.record.games() >= ruleset.records.min_career_games_for_percentage {
        offer(tracker, RecordType::BestCareerWinPercentage, career.win_percentage);
    }
    offer(tracker, RecordType::LongestWinStreak, f64::from(streaks.wins));
    offer(tracker, RecordType::MostChampionships, f64::from(career.championships));
    offer(
        tracker,
        RecordType::MostPlayoffAppearances,
        f64::from(career.playoff_appearances),
    );
    offer(tracker, RecordType::MostPlayoffWins, f64::from(career.playoff_record.wins));
    offer(tracker, RecordType::MostLastPlaces, f64::from(career.last_places));
    offer(tracker, RecordType::LongestLosingStreak, f64::from(streaks.losses));
}

/// Canonical members with at least one team-season or scored match, in id order.
fn career_candidates(index: &LeagueIndex) -> BTreeSet<MemberId> {
    let mut candidates: BTreeSet<MemberId> = index
        .team_entries()
        .map(|entry| entry.canonical_member_id.clone())
        .collect();
    for scored in index.matches() {
        candidates.insert(scored.home.member_id.clone());
        candidates.insert(scored.away.member_id.clone());
    }
    candidates
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardMetric {
    Wins,
    Points,
    WinPercentage,
    Championships,
    PlayoffAppearances,
}

impl LeaderboardMetric {
    pub const ALL: [Self; 5] = [
        Self::Wins,
        Self::Points,
        Self::WinPercentage,
        Self::Championships,
        Self::PlayoffAppearances,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wins => "wins",
            Self::Points => "points",
            Self::WinPercentage => "win_percentage",
            Self::Championships => "championships",
            Self::PlayoffAppearances => "playoff_appearances",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|metric| metric.as_str() == value)
    }

    fn value(self, career: &CareerRecord) -> f64 {
        match self {
            Self::Wins => f64::from(career.record.wins),
            Self::Points => career.points_for,
            Self::WinPercentage => career.win_percentage,
            Self::Championships => f64::from(career.championships),
            Self::PlayoffAppearances => f64::from(career.playoff_appearances),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    /// Competition rank: equal values share a rank and the next rank is skipped.
    pub rank: u32,
    pub member_id: MemberId,
    pub display_name: String,
    pub value: f64,
    pub record: Record,
}

/// Career leaderboard for `metric`, best first, at most `limit` rows.
#[must_use]
pub fn leaderboard(
    index: &LeagueIndex,
    metric: LeaderboardMetric,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<(MemberId, f64, Record)> = career_candidates(index)
        .into_iter()
        .map(|member_id| {
            let career = career_record(index, &member_id);
            (member_id, metric.value(&career), career.record)
        })
        .collect();
    rows.sort_by(|left, right| right.1.total_cmp(&left.1).then_with(|| left.0.cmp(&right.0)));

    let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(rows.len().min(limit));
    for (position, (member_id, value, record)) in (1_u32..).zip(rows) {
        if entries.len() == limit {
            break;
        }
        let rank = match entries.last() {
            Some(previous) if previous.value.total_cmp(&value).is_eq() => previous.rank,
            _ => position,
        };
        let display_name = index
            .member(&member_id)
            .map_or_else(|| member_id.to_string(), |member| member.display_name.clone());
        entries.push(LeaderboardEntry {
            rank,
            member_id,
            display_name,
            value,
            record,
        });
    }
    entries
}
