use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::ledger::ScoredMatch;
use crate::model::{MatchId, MemberId, Outcome, Record};
use crate::record::count_u32;
use crate::streak::signed_run;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct MeetingRef {
    pub match_id: MatchId,
    pub season_year: i32,
    pub week: u32,
}

/// Head-to-head facts between two members, from `member_a_id`'s side.
///
/// Stored canonically with `member_a_id < member_b_id`; the opposite view is
/// produced by [`H2hPairRecord::swapped`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct H2hPairRecord {
    pub member_a_id: MemberId,
    pub member_b_id: MemberId,
    pub a_wins: u32,
    pub b_wins: u32,
    pub ties: u32,
    pub a_points: f64,
    pub b_points: f64,
    pub total_matchups: u32,
    pub playoff_meetings: u32,
    #[serde(default, with = "crate::model::calendar_date")]
    pub last_matchup_date: Option<Date>,
    pub last_meeting: Option<MeetingRef>,
    /// Positive while A is on a winning run against B, negative for B.
    pub a_streak: i32,
}

impl H2hPairRecord {
    /// Zero-valued record for a pair that never met.
    #[must_use]
    pub fn empty(member_a_id: MemberId, member_b_id: MemberId) -> Self {
        Self {
            member_a_id,
            member_b_id,
            a_wins: 0,
            b_wins: 0,
            ties: 0,
            a_points: 0.0,
            b_points: 0.0,
            total_matchups: 0,
            playoff_meetings: 0,
            last_matchup_date: None,
            last_meeting: None,
            a_streak: 0,
        }
    }

    #[must_use]
    pub fn has_met(&self) -> bool {
        self.total_matchups > 0
    }

    /// Same facts seen from B's side.
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            member_a_id: self.member_b_id.clone(),
            member_b_id: self.member_a_id.clone(),
            a_wins: self.b_wins,
            b_wins: self.a_wins,
            ties: self.ties,
            a_points: self.b_points,
            b_points: self.a_points,
            total_matchups: self.total_matchups,
            playoff_meetings: self.playoff_meetings,
            last_matchup_date: self.last_matchup_date,
            last_meeting: self.last_meeting.clone(),
            a_streak: -self.a_streak,
        }
    }

    /// The record from `member_id`'s side, or `None` if they are not in the pair.
    #[must_use]
    pub fn view_for(&self, member_id: &MemberId) -> Option<Self> {
        if &self.member_a_id == member_id {
            Some(self.clone())
        } else if &self.member_b_id == member_id {
            Some(self.swapped())
        } else {
            None
        }
    }

    /// A's record against B.
    #[must_use]
    pub fn a_record(&self) -> Record {
        Record::new(self.a_wins, self.b_wins, self.ties)
    }
}

/// Head-to-head between `member_a` and `member_b`, from `member_a`'s side.
///
/// Computed in canonical order and swapped on the way out, so
/// `head_to_head(m, a, b) == head_to_head(m, b, a).swapped()`.
#[must_use]
pub fn head_to_head(
    matches: &[ScoredMatch],
    member_a: &MemberId,
    member_b: &MemberId,
) -> H2hPairRecord {
    if member_a == member_b {
        return H2hPairRecord::empty(member_a.clone(), member_b.clone());
    }
    let (low, high) = canonical_pair(member_a, member_b);
    let meetings: Vec<&ScoredMatch> = matches
        .iter()
        .filter(|scored| pair_key(scored) == (low, high))
        .collect();
    let canonical = tally_pair(low, high, &meetings);
    if member_a == low {
        canonical
    } else {
        canonical.swapped()
    }
}

/// Sparse all-pairs head-to-head: one canonical record per pair that has met.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct H2hMatrix {
    records: Vec<H2hPairRecord>,
}

impl H2hMatrix {
    #[must_use]
    pub fn build(matches: &[ScoredMatch]) -> Self {
        let mut grouped: BTreeMap<(&MemberId, &MemberId), Vec<&ScoredMatch>> = BTreeMap::new();
        for scored in matches {
            grouped.entry(pair_key(scored)).or_default().push(scored);
        }
        let records = grouped
            .into_iter()
            .map(|((low, high), meetings)| tally_pair(low, high, &meetings))
            .collect();
        Self { records }
    }

    /// Canonical records ordered by `(member_a_id, member_b_id)`.
    #[must_use]
    pub fn pairs(&self) -> &[H2hPairRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pair record from `member_a`'s side, if the two have met.
    #[must_use]
    pub fn get(&self, member_a: &MemberId, member_b: &MemberId) -> Option<H2hPairRecord> {
        let (low, high) = canonical_pair(member_a, member_b);
        let position = self
            .records
            .binary_search_by(|record| {
                (&record.member_a_id, &record.member_b_id).cmp(&(low, high))
            })
            .ok()?;
        self.records
            .get(position)
            .and_then(|record| record.view_for(member_a))
    }

    /// Like [`H2hMatrix::get`] but returns a zero record for pairs that never met.
    #[must_use]
    pub fn lookup(&self, member_a: &MemberId, member_b: &MemberId) -> H2hPairRecord {
        self.get(member_a, member_b)
            .unwrap_or_else(|| H2hPairRecord::empty(member_a.clone(), member_b.clone()))
    }

    /// Every pair record involving `member_id`, from their side, by opponent id.
    #[must_use]
    pub fn opponents_of(&self, member_id: &MemberId) -> Vec<H2hPairRecord> {
        let mut views: Vec<H2hPairRecord> = self
            .records
            .iter()
            .filter_map(|record| record.view_for(member_id))
            .collect();
        views.sort_by(|left, right| left.member_b_id.cmp(&right.member_b_id));
        views
    }
}

fn canonical_pair<'a>(left: &'a MemberId, right: &'a MemberId) -> (&'a MemberId, &'a MemberId) {
    if left <= right {
        (left, right)
    } else {
        (right, left)
    }
}

fn pair_key(scored: &ScoredMatch) -> (&MemberId, &MemberId) {
    canonical_pair(&scored.home.member_id, &scored.away.member_id)
}

fn tally_pair(low: &MemberId, high: &MemberId, meetings: &[&ScoredMatch]) -> H2hPairRecord {
    let mut record = H2hPairRecord::empty(low.clone(), high.clone());
    let mut ordered: Vec<&ScoredMatch> = meetings.to_vec();
    ordered.sort_by(|left, right| right.chrono_key().cmp(&left.chrono_key()));

    for scored in &ordered {
        let Some((own, opponent)) = scored.sides_for(low) else {
            continue;
        };
        record.a_points += own.score;
        record.b_points += opponent.score;
        match scored.outcome_for(low) {
            Some(Outcome::Win) => record.a_wins += 1,
            Some(Outcome::Loss) => record.b_wins += 1,
            Some(Outcome::Tie) => record.ties += 1,
            None => {}
        }
        if scored.is_playoff {
            record.playoff_meetings += 1;
        }
        record.last_matchup_date = record.last_matchup_date.max(scored.played_on);
    }

    record.total_matchups = count_u32(ordered.len());
    record.last_meeting = ordered.first().map(|scored| MeetingRef {
        match_id: scored.match_id.clone(),
        season_year: scored.season_year,
        week: scored.week,
    });
    record.a_streak = signed_run(
        ordered
            .iter()
            .filter_map(|scored| scored.outcome_for(low)),
    );
    record
}
