use serde::{Deserialize, Serialize};

use crate::ledger::ScoredMatch;
use crate::model::{MemberId, Outcome};

/// Signed length of the member's current run: positive for wins, negative
/// for losses, `0` with no games or a tie as the latest result.
///
/// Input order does not matter; matches are walked newest first by
/// `(season year, week)`.
#[must_use]
pub fn current_streak(matches: &[ScoredMatch], member_id: &MemberId) -> i32 {
    let mut played: Vec<&ScoredMatch> = matches
        .iter()
        .filter(|scored| scored.involves(member_id))
        .collect();
    played.sort_by(|left, right| right.chrono_key().cmp(&left.chrono_key()));
    signed_run(played.iter().filter_map(|scored| scored.outcome_for(member_id)))
}

/// Length of the leading same-result run of `outcomes`, signed by result.
pub(crate) fn signed_run(outcomes: impl IntoIterator<Item = Outcome>) -> i32 {
    let mut outcomes = outcomes.into_iter();
    let Some(first) = outcomes.next() else {
        return 0;
    };
    let sign = match first {
        Outcome::Win => 1,
        Outcome::Loss => -1,
        Outcome::Tie => return 0,
    };
    let mut length = 1_i32;
    for outcome in outcomes {
        if outcome != first {
            break;
        }
        length = length.saturating_add(1);
    }
    sign * length
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct LongestStreaks {
    pub wins: u32,
    pub losses: u32,
}

/// Longest win and loss runs across the member's whole history. Ties break runs.
#[must_use]
pub fn longest_streaks(matches: &[ScoredMatch], member_id: &MemberId) -> LongestStreaks {
    let mut played: Vec<&ScoredMatch> = matches
        .iter()
        .filter(|scored| scored.involves(member_id))
        .collect();
    played.sort_by(|left, right| left.chrono_key().cmp(&right.chrono_key()));

    let mut longest = LongestStreaks::default();
    let mut run: Option<(Outcome, u32)> = None;
    for outcome in played.iter().filter_map(|scored| scored.outcome_for(member_id)) {
        let length = match run {
            Some((previous, length)) if previous == outcome => length + 1,
            _ => 1,
        };
        run = Some((outcome, length));
        match outcome {
            Outcome::Win => longest.wins = longest.wins.max(length),
            Outcome::Loss => longest.losses = longest.losses.max(length),
            Outcome::Tie => {}
        }
    }
    longest
}
