//! Three-member, three-season fixture league shared by unit tests.
//!
//! | season | week | home (score)   | away (score)  |
//! |--------|------|----------------|---------------|
//! | 2020   | 1    | alice 110      | bob 100       |
//! | 2020   | 2    | alice 95       | carol 120     |
//! | 2020   | 3    | bob 130        | carol 90      |
//! | 2021   | 1    | bob 105        | alice 99      |
//! | 2021   | 2    | carol 100      | alice 100     |
//! | 2021   | 3    | bob 88         | carol 140     |
//! | 2022   | 1    | alice 150      | bob 70        |
//! | 2022   | 2    | carol 101      | bob 100.5     |
//! | 2022   | 3    | alice 120      | carol 110 (championship) |
//! | 2022   | 4    | alice vs bob, scheduled                  |

use time::macros::date;

use crate::model::{LedgerSnapshot, Match, Member, MemberId, Season, SeasonId, Team, TeamId};

pub(crate) fn must_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("expected Ok(..), got Err({err:?})"),
    }
}

pub(crate) fn must_some<T>(value: Option<T>) -> T {
    match value {
        Some(inner) => inner,
        None => panic!("expected Some(..), got None"),
    }
}

pub(crate) fn member(id: &str, merged_into: Option<&str>) -> Member {
    Member {
        id: MemberId::from(id),
        display_name: capitalize(id),
        is_active: merged_into.is_none(),
        merged_into: merged_into.map(MemberId::from),
    }
}

pub(crate) fn team(id: &str, season: &str, member: &str, wins: u32, losses: u32, ties: u32) -> Team {
    Team {
        id: TeamId::from(id),
        season_id: SeasonId::from(season),
        member_id: MemberId::from(member),
        name: format!("{} {season}", capitalize(member)),
        final_rank: None,
        wins,
        losses,
        ties,
        points_for: 0.0,
        points_against: 0.0,
        is_champion: false,
        is_last_place: false,
        made_playoffs: false,
    }
}

#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
fn season_team(
    member: &str,
    year: i32,
    record: (u32, u32, u32),
    points: (f64, f64),
    final_rank: u32,
    is_champion: bool,
    is_last_place: bool,
    made_playoffs: bool,
) -> Team {
    let mut built = team(
        &format!("t-{member}-{year}"),
        &format!("s{year}"),
        member,
        record.0,
        record.1,
        record.2,
    );
    built.points_for = points.0;
    built.points_against = points.1;
    built.final_rank = Some(final_rank);
    built.is_champion = is_champion;
    built.is_last_place = is_last_place;
    built.made_playoffs = made_playoffs;
    built
}

fn game(id: &str, year: i32, week: u32, home: (&str, f64), away: (&str, f64)) -> Match {
    Match::final_result(
        id,
        format!("s{year}"),
        week,
        (format!("t-{}-{year}", home.0), home.1),
        (format!("t-{}-{year}", away.0), away.1),
    )
}

pub(crate) fn league_snapshot() -> LedgerSnapshot {
    let seasons = [2020, 2021, 2022]
        .into_iter()
        .map(|year| Season {
            id: SeasonId::new(format!("s{year}")),
            year,
            regular_season_weeks: 3,
        })
        .collect();

    let members = vec![
        member("alice", None),
        member("bob", None),
        member("carol", None),
    ];

    let teams = vec![
        season_team("alice", 2020, (1, 1, 0), (205.0, 220.0), 3, false, true, false),
        season_team("bob", 2020, (1, 1, 0), (230.0, 200.0), 1, true, false, true),
        season_team("carol", 2020, (1, 1, 0), (210.0, 225.0), 2, false, false, true),
        season_team("alice", 2021, (0, 1, 1), (199.0, 205.0), 3, false, true, false),
        season_team("bob", 2021, (1, 1, 0), (193.0, 239.0), 2, false, false, true),
        season_team("carol", 2021, (1, 0, 1), (240.0, 188.0), 1, true, false, true),
        season_team("alice", 2022, (1, 0, 0), (150.0, 70.0), 1, true, false, true),
        season_team("bob", 2022, (0, 2, 0), (170.5, 251.0), 3, false, true, false),
        season_team("carol", 2022, (1, 0, 0), (101.0, 100.5), 2, false, false, true),
    ];

    let matches = vec![
        game("m-2020-1", 2020, 1, ("alice", 110.0), ("bob", 100.0)).on_date(date!(2020 - 09 - 13)),
        game("m-2020-2", 2020, 2, ("alice", 95.0), ("carol", 120.0)).on_date(date!(2020 - 09 - 20)),
        game("m-2020-3", 2020, 3, ("bob", 130.0), ("carol", 90.0)).on_date(date!(2020 - 09 - 27)),
        game("m-2021-1", 2021, 1, ("bob", 105.0), ("alice", 99.0)).on_date(date!(2021 - 09 - 12)),
        game("m-2021-2", 2021, 2, ("carol", 100.0), ("alice", 100.0)).on_date(date!(2021 - 09 - 19)),
        game("m-2021-3", 2021, 3, ("bob", 88.0), ("carol", 140.0)).on_date(date!(2021 - 09 - 26)),
        game("m-2022-1", 2022, 1, ("alice", 150.0), ("bob", 70.0)).on_date(date!(2022 - 09 - 11)),
        game("m-2022-2", 2022, 2, ("carol", 101.0), ("bob", 100.5)).on_date(date!(2022 - 09 - 18)),
        game("m-2022-3", 2022, 3, ("alice", 120.0), ("carol", 110.0))
            .in_playoffs(true)
            .on_date(date!(2022 - 09 - 25)),
        Match::scheduled("sched-1", "s2022", 4, "t-alice-2022", "t-bob-2022"),
    ];

    LedgerSnapshot {
        seasons,
        members,
        teams,
        matches,
    }
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
