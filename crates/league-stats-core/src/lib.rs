//! Deterministic statistics engine for a long-running fantasy league.
//!
//! Every derived fact is a pure function of a [`LedgerSnapshot`]: build a
//! [`LeagueIndex`] once, then hand it to the aggregators.

pub mod dashboard;
pub mod h2h;
pub mod identity;
pub mod ledger;
pub mod model;
pub mod record;
pub mod records;
pub mod rivalry;
pub mod ruleset;
pub mod standings;
pub mod streak;

#[cfg(test)]
mod test_support;

pub use dashboard::{MemberDashboard, TrophyCase, UpcomingMatchup};
pub use h2h::{head_to_head, H2hMatrix, H2hPairRecord, MeetingRef};
pub use identity::MemberResolver;
pub use ledger::{LeagueIndex, ScoredMatch, Side, SkipReason, SkippedMatch};
pub use model::{
    LedgerSnapshot, Match, MatchId, MatchStatus, Member, MemberId, Outcome, Record, Season,
    SeasonId, Team, TeamId,
};
pub use record::{
    aggregate, career_record, format_win_percentage, match_record, point_totals, win_percentage,
    CareerRecord, PointTotals,
};
pub use records::{
    leaderboard, LeaderboardEntry, LeaderboardMetric, LeagueRecord, Polarity, RecordBook,
    RecordCategory, RecordCheck, RecordType,
};
pub use rivalry::{
    classify, rivalries_for, rivalry_with, top_nemesis, top_victim, RivalryEntry, RivalryLabel,
};
pub use ruleset::{RecordOptions, RivalryThresholds, StatsRuleset};
pub use standings::{
    final_standings, season_journey, weekly_standings, SeasonJourney, StandingRow,
    TeamWeeklySeries, WeeklyPoint,
};
pub use streak::{current_streak, longest_streaks, LongestStreaks};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum StatsError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Failure to hand over a snapshot. An empty ledger is not an error.
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
    #[error("ledger corrupt: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LedgerScope {
    AllSeasons,
    /// Teams and matches of one season; members are always loaded in full.
    Season(SeasonId),
}

/// Source of raw ledger facts.
pub trait LedgerProvider {
    /// # Errors
    /// Returns [`LedgerError::Unavailable`] when the backing store cannot be
    /// read and [`LedgerError::Corrupt`] when stored rows cannot be decoded.
    fn load_snapshot(&self, scope: &LedgerScope) -> Result<LedgerSnapshot, LedgerError>;
}

/// Everything the CLI reports on, derived from one snapshot.
#[derive(Debug, Clone)]
pub struct LeagueReport {
    pub index: LeagueIndex,
    pub matrix: H2hMatrix,
    pub records: RecordBook,
}

impl LeagueReport {
    #[must_use]
    pub fn build(snapshot: &LedgerSnapshot, ruleset: &StatsRuleset) -> Self {
        let index = LeagueIndex::build(snapshot);
        let matrix = H2hMatrix::build(index.matches());
        let records = RecordBook::compute(&index, ruleset);
        Self {
            index,
            matrix,
            records,
        }
    }

    /// # Errors
    /// Propagates [`LedgerError`] from the provider.
    pub fn load(
        provider: &impl LedgerProvider,
        scope: &LedgerScope,
        ruleset: &StatsRuleset,
    ) -> Result<Self, LedgerError> {
        let snapshot = provider.load_snapshot(scope)?;
        Ok(Self::build(&snapshot, ruleset))
    }
}
