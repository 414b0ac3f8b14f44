use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use time::Date;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Season-independent competitor identity. Lexical order is the canonical pair order.
    MemberId
);
string_id!(TeamId);
string_id!(SeasonId);
string_id!(MatchId);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Final,
}

impl MatchStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Final => "final",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "final" => Some(Self::Final),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Season {
    pub id: SeasonId,
    pub year: i32,
    pub regular_season_weeks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    pub id: MatchId,
    pub season_id: SeasonId,
    pub week: u32,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_score: Option<f64>,
    pub away_score: Option<f64>,
    pub winner_team_id: Option<TeamId>,
    pub is_tie: bool,
    pub is_playoff: bool,
    pub is_championship: bool,
    pub status: MatchStatus,
    #[serde(default, with = "calendar_date")]
    pub played_on: Option<Date>,
}

impl Match {
    /// Builds a final regular-season match whose winner and tie flag are derived from the scores.
    #[must_use]
    pub fn final_result(
        id: impl Into<String>,
        season_id: impl Into<String>,
        week: u32,
        home: (impl Into<String>, f64),
        away: (impl Into<String>, f64),
    ) -> Self {
        let home_team_id = TeamId::new(home.0);
        let away_team_id = TeamId::new(away.0);
        let (winner_team_id, is_tie) = derive_winner(&home_team_id, home.1, &away_team_id, away.1);
        Self {
            id: MatchId::new(id),
            season_id: SeasonId::new(season_id),
            week,
            home_team_id,
            away_team_id,
            home_score: Some(home.1),
            away_score: Some(away.1),
            winner_team_id,
            is_tie,
            is_playoff: false,
            is_championship: false,
            status: MatchStatus::Final,
            played_on: None,
        }
    }

    #[must_use]
    pub fn scheduled(
        id: impl Into<String>,
        season_id: impl Into<String>,
        week: u32,
        home_team_id: impl Into<String>,
        away_team_id: impl Into<String>,
    ) -> Self {
        Self {
            id: MatchId::new(id),
            season_id: SeasonId::new(season_id),
            week,
            home_team_id: TeamId::new(home_team_id),
            away_team_id: TeamId::new(away_team_id),
            home_score: None,
            away_score: None,
            winner_team_id: None,
            is_tie: false,
            is_playoff: false,
            is_championship: false,
            status: MatchStatus::Scheduled,
            played_on: None,
        }
    }

    #[must_use]
    pub fn in_playoffs(mut self, is_championship: bool) -> Self {
        self.is_playoff = true;
        self.is_championship = is_championship;
        self
    }

    #[must_use]
    pub fn on_date(mut self, date: Date) -> Self {
        self.played_on = Some(date);
        self
    }
}

/// `YYYY-MM-DD` serde representation for optional calendar dates.
pub mod calendar_date {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::macros::format_description;
    use time::Date;

    /// # Errors
    /// Fails when the date cannot be formatted.
    pub fn serialize<S: Serializer>(
        value: &Option<Date>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => {
                let text = date
                    .format(format_description!("[year]-[month]-[day]"))
                    .map_err(S::Error::custom)?;
                serializer.serialize_some(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    /// # Errors
    /// Fails when the text is not a valid `YYYY-MM-DD` date.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Date>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| {
                Date::parse(&text, format_description!("[year]-[month]-[day]"))
                    .map_err(D::Error::custom)
            })
            .transpose()
    }
}

/// Winner/tie pair implied by a scoreline.
#[must_use]
pub fn derive_winner(
    home_team_id: &TeamId,
    home_score: f64,
    away_team_id: &TeamId,
    away_score: f64,
) -> (Option<TeamId>, bool) {
    if home_score > away_score {
        (Some(home_team_id.clone()), false)
    } else if away_score > home_score {
        (Some(away_team_id.clone()), false)
    } else {
        (None, true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub id: TeamId,
    pub season_id: SeasonId,
    pub member_id: MemberId,
    pub name: String,
    pub final_rank: Option<u32>,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub points_for: f64,
    pub points_against: f64,
    pub is_champion: bool,
    pub is_last_place: bool,
    pub made_playoffs: bool,
}

impl Team {
    #[must_use]
    pub fn record(&self) -> Record {
        Record::new(self.wins, self.losses, self.ties)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Member {
    pub id: MemberId,
    pub display_name: String,
    pub is_active: bool,
    pub merged_into: Option<MemberId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl Record {
    #[must_use]
    pub const fn new(wins: u32, losses: u32, ties: u32) -> Self {
        Self { wins, losses, ties }
    }

    /// Counts saturate at `u32::MAX`; imported team rows are not range-checked.
    #[must_use]
    pub const fn games(&self) -> u32 {
        self.wins.saturating_add(self.losses).saturating_add(self.ties)
    }

    #[must_use]
    pub const fn decided(&self) -> u32 {
        self.wins.saturating_add(self.losses)
    }

    pub fn push(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins = self.wins.saturating_add(1),
            Outcome::Loss => self.losses = self.losses.saturating_add(1),
            Outcome::Tie => self.ties = self.ties.saturating_add(1),
        }
    }
}

impl Add for Record {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            wins: self.wins.saturating_add(rhs.wins),
            losses: self.losses.saturating_add(rhs.losses),
            ties: self.ties.saturating_add(rhs.ties),
        }
    }
}

impl AddAssign for Record {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.wins, self.losses, self.ties)
    }
}

/// Raw ledger facts as handed over by a ledger provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LedgerSnapshot {
    pub seasons: Vec<Season>,
    pub members: Vec<Member>,
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
}

impl LedgerSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
            && self.members.is_empty()
            && self.teams.is_empty()
            && self.matches.is_empty()
    }
}
