use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::h2h::{H2hMatrix, H2hPairRecord};
use crate::model::MemberId;
use crate::ruleset::RivalryThresholds;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RivalryLabel {
    /// The opponent dominates the perspective member.
    Nemesis,
    /// The perspective member dominates the opponent.
    Victim,
    Rival,
    Even,
    FirstMeeting,
}

impl RivalryLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nemesis => "nemesis",
            Self::Victim => "victim",
            Self::Rival => "rival",
            Self::Even => "even",
            Self::FirstMeeting => "first_meeting",
        }
    }
}

/// Labels the relationship of `perspective` to the other member of `h2h`.
///
/// Rules, first match wins:
/// 1. no decided games: first meeting
/// 2. absolute win margin of at least `dominance_margin`: victim / nemesis
/// 3. win share of at least `dominance_ratio` with margin of at least
///    `ratio_min_margin`: victim / nemesis
/// 4. margin within `rival_max_margin` over at least `rival_min_matchups`
///    meetings: rival
/// 5. otherwise even
#[must_use]
pub fn classify(
    h2h: &H2hPairRecord,
    perspective: &MemberId,
    thresholds: &RivalryThresholds,
) -> RivalryLabel {
    let Some(view) = h2h.view_for(perspective) else {
        return RivalryLabel::FirstMeeting;
    };
    let wins = view.a_wins;
    let losses = view.b_wins;
    let decided = wins + losses;
    if decided == 0 {
        return RivalryLabel::FirstMeeting;
    }

    let margin = wins.abs_diff(losses);
    let leading = wins.cmp(&losses);

    if margin >= thresholds.dominance_margin {
        return dominance_label(leading);
    }

    let leader_wins = wins.max(losses);
    let share = f64::from(leader_wins) / f64::from(decided);
    if margin >= thresholds.ratio_min_margin && share >= thresholds.dominance_ratio {
        return dominance_label(leading);
    }

    if margin <= thresholds.rival_max_margin && view.total_matchups >= thresholds.rival_min_matchups
    {
        return RivalryLabel::Rival;
    }

    RivalryLabel::Even
}

fn dominance_label(leading: Ordering) -> RivalryLabel {
    match leading {
        Ordering::Greater => RivalryLabel::Victim,
        Ordering::Less => RivalryLabel::Nemesis,
        Ordering::Equal => RivalryLabel::Even,
    }
}

/// One opponent of a member, with the classified relationship.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RivalryEntry {
    pub opponent_id: MemberId,
    pub label: RivalryLabel,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub total_matchups: u32,
    pub points_for: f64,
    pub points_against: f64,
    pub streak: i32,
}

impl RivalryEntry {
    #[must_use]
    pub fn from_view(view: &H2hPairRecord, label: RivalryLabel) -> Self {
        Self {
            opponent_id: view.member_b_id.clone(),
            label,
            wins: view.a_wins,
            losses: view.b_wins,
            ties: view.ties,
            total_matchups: view.total_matchups,
            points_for: view.a_points,
            points_against: view.b_points,
            streak: view.a_streak,
        }
    }

    fn margin(&self) -> i64 {
        i64::from(self.wins) - i64::from(self.losses)
    }
}

/// Classified relationship with `opponent`; `first_meeting` if they never met.
#[must_use]
pub fn rivalry_with(
    matrix: &H2hMatrix,
    member_id: &MemberId,
    opponent_id: &MemberId,
    thresholds: &RivalryThresholds,
) -> RivalryEntry {
    let view = matrix.lookup(member_id, opponent_id);
    let label = classify(&view, member_id, thresholds);
    RivalryEntry::from_view(&view, label)
}

/// Every opponent the member has met, ordered by opponent id.
#[must_use]
pub fn rivalries_for(
    matrix: &H2hMatrix,
    member_id: &MemberId,
    thresholds: &RivalryThresholds,
) -> Vec<RivalryEntry> {
    matrix
        .opponents_of(member_id)
        .iter()
        .map(|view| RivalryEntry::from_view(view, classify(view, member_id, thresholds)))
        .collect()
}

/// Nemesis with the worst margin; ties go to most meetings, then smallest opponent id.
#[must_use]
pub fn top_nemesis(entries: &[RivalryEntry]) -> Option<&RivalryEntry> {
    pick_extreme(entries, RivalryLabel::Nemesis, |entry| -entry.margin())
}

/// Victim with the best margin; ties go to most meetings, then smallest opponent id.
#[must_use]
pub fn top_victim(entries: &[RivalryEntry]) -> Option<&RivalryEntry> {
    pick_extreme(entries, RivalryLabel::Victim, RivalryEntry::margin)
}

fn pick_extreme(
    entries: &[RivalryEntry],
    label: RivalryLabel,
    score: impl Fn(&RivalryEntry) -> i64,
) -> Option<&RivalryEntry> {
    entries
        .iter()
        .filter(|entry| entry.label == label)
        .min_by(|left, right| {
            score(right)
                .cmp(&score(left))
                .then_with(|| right.total_matchups.cmp(&left.total_matchups))
                .then_with(|| left.opponent_id.cmp(&right.opponent_id))
        })
}
