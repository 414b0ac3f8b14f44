#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rusqlite::Connection;
use serde_json::{json, Value};
use ulid::Ulid;

fn lgs_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_lgs"))
}

fn temp_path(label: &str, extension: &str) -> PathBuf {
    std::env::temp_dir().join(format!("lgs-{label}-{}.{extension}", Ulid::new()))
}

fn lgs_output(db_path: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(lgs_binary_path());
    command.arg("--db").arg(db_path);
    for arg in args {
        command.arg(arg);
    }

    match command.output() {
        Ok(output) => output,
        Err(err) => panic!("failed to run lgs command {:?}: {err}", args),
    }
}

fn lgs_success(db_path: &Path, args: &[&str]) -> Output {
    let output = lgs_output(db_path, args);
    assert!(
        output.status.success(),
        "lgs {:?} failed: stderr={}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn stdout_json(output: &Output) -> Value {
    match serde_json::from_slice::<Value>(&output.stdout) {
        Ok(value) => value,
        Err(err) => panic!(
            "failed to parse stdout as JSON: {err}\nstdout={}\nstderr={}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ),
    }
}

fn write_json_file(label: &str, value: &Value) -> PathBuf {
    let path = temp_path(label, "json");
    let raw = match serde_json::to_string_pretty(value) {
        Ok(raw) => raw,
        Err(err) => panic!("failed to encode fixture: {err}"),
    };
    if let Err(err) = std::fs::write(&path, raw) {
        panic!("failed to write fixture {}: {err}", path.display());
    }
    path
}

fn team(id: &str, season: &str, member: &str, name: &str, shape: (u32, u32, u32)) -> Value {
    let (rank, wins, losses) = shape;
    json!({
        "id": id,
        "season_id": season,
        "member_id": member,
        "name": name,
        "final_rank": rank,
        "wins": wins,
        "losses": losses,
        "ties": 0,
        "points_for": 100.0 * f64::from(wins) + 50.0,
        "points_against": 100.0 * f64::from(losses) + 50.0,
        "is_champion": rank == 1,
        "is_last_place": rank == 3,
        "made_playoffs": rank <= 2,
    })
}

fn final_match(id: &str, week: u32, home: (&str, f64), away: (&str, f64)) -> Value {
    let winner = if home.1 > away.1 { home.0 } else { away.0 };
    json!({
        "id": id,
        "season_id": "s2023",
        "week": week,
        "home_team_id": home.0,
        "away_team_id": away.0,
        "home_score": home.1,
        "away_score": away.1,
        "winner_team_id": winner,
        "is_tie": false,
        "is_playoff": false,
        "is_championship": false,
        "status": "final",
        "played_on": format!("2023-09-{:02}", 3 + week * 7),
    })
}

fn fixture_snapshot() -> Value {
    json!({
        "seasons": [
            { "id": "s2023", "year": 2023, "regular_season_weeks": 3 }
        ],
        "members": [
            { "id": "alice", "display_name": "Alice", "is_active": true },
            { "id": "bob", "display_name": "Bob", "is_active": true },
            { "id": "carol", "display_name": "Carol", "is_active": true }
        ],
        "teams": [
            team("a23", "s2023", "alice", "Alpha", (1, 2, 1)),
            team("b23", "s2023", "bob", "Bravo", (2, 2, 1)),
            team("c23", "s2023", "carol", "Charlie", (3, 0, 3))
        ],
        "matches": [
            final_match("m1", 1, ("a23", 120.5), ("b23", 100.0)),
            final_match("m2", 2, ("b23", 105.0), ("c23", 95.0)),
            final_match("m3", 3, ("c23", 80.0), ("a23", 110.0)),
            final_match("m4-unknown", 1, ("c23", 90.0), ("x99", 85.0)),
            {
                "id": "m5-missing",
                "season_id": "s2023",
                "week": 2,
                "home_team_id": "a23",
                "away_team_id": "c23",
                "home_score": null,
                "away_score": 88.0,
                "winner_team_id": null,
                "is_tie": false,
                "is_playoff": false,
                "is_championship": false,
                "status": "final"
            },
            {
                "id": "sched-1",
                "season_id": "s2023",
                "week": 4,
                "home_team_id": "b23",
                "away_team_id": "a23",
                "home_score": null,
                "away_score": null,
                "winner_team_id": null,
                "is_tie": false,
                "is_playoff": false,
                "is_championship": false,
                "status": "scheduled"
            }
        ]
    })
}

fn imported_db(label: &str) -> PathBuf {
    let db_path = temp_path(label, "sqlite3");
    let snapshot_path = write_json_file(label, &fixture_snapshot());
    let output = lgs_success(
        &db_path,
        &["import", "--file", &snapshot_path.to_string_lossy()],
    );
    let report = stdout_json(&output);
    assert_eq!(report["seasons"], 1);
    assert_eq!(report["members"], 3);
    assert_eq!(report["teams"], 3);
    assert_eq!(report["matches"], 6);
    db_path
}

#[test]
fn help_lists_every_report_command() {
    let output = match Command::new(lgs_binary_path()).arg("--help").output() {
        Ok(value) => value,
        Err(err) => panic!("failed to run help command: {err}"),
    };

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for required in [
        "import",
        "merge",
        "career",
        "h2h",
        "matrix",
        "rivalries",
        "standings",
        "records",
        "record-check",
        "leaderboard",
        "dashboard",
        "skipped",
    ] {
        assert!(
            stdout.contains(required),
            "expected help output to contain subcommand {required}; output={stdout}"
        );
    }
}

#[test]
fn career_json_reports_team_totals() {
    let db_path = imported_db("career");
    let career = stdout_json(&lgs_success(
        &db_path,
        &["career", "--member", "alice", "--json"],
    ));

    assert_eq!(career["member_id"], "alice");
    assert_eq!(career["seasons_played"], 1);
    assert_eq!(career["record"], json!({ "wins": 2, "losses": 1, "ties": 0 }));
    assert_eq!(career["win_percentage_display"], ".667");
    assert_eq!(career["championships"], 1);
    assert_eq!(
        career["regular_season_record"],
        json!({ "wins": 2, "losses": 0, "ties": 0 })
    );
}

#[test]
fn career_text_output_is_a_summary_line() {
    let db_path = imported_db("career-text");
    let output = lgs_success(&db_path, &["career", "--member", "carol"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("member=carol"), "stdout={stdout}");
    assert!(stdout.contains("record=0-3-0"), "stdout={stdout}");
    assert!(stdout.contains("last_places=1"), "stdout={stdout}");
}

#[test]
fn h2h_is_reported_from_the_requested_perspective() {
    let db_path = imported_db("h2h");
    let forward = stdout_json(&lgs_success(
        &db_path,
        &["h2h", "--member", "alice", "--opponent", "bob", "--json"],
    ));
    assert_eq!(forward["member_a_id"], "alice");
    assert_eq!(forward["a_wins"], 1);
    assert_eq!(forward["b_wins"], 0);
    assert_eq!(forward["a_points"], 120.5);
    assert_eq!(forward["last_matchup_date"], "2023-09-10");

    let backward = stdout_json(&lgs_success(
        &db_path,
        &["h2h", "--member", "bob", "--opponent", "alice", "--json"],
    ));
    assert_eq!(backward["member_a_id"], "bob");
    assert_eq!(backward["a_wins"], 0);
    assert_eq!(backward["b_wins"], 1);
    assert_eq!(backward["a_streak"], -1);
}

#[test]
fn matrix_holds_one_entry_per_pair_that_met() {
    let db_path = imported_db("matrix");
    let matrix = stdout_json(&lgs_success(&db_path, &["matrix"]));
    let pairs = match matrix["pairs"].as_array() {
        Some(pairs) => pairs.clone(),
        None => panic!("expected pairs array: {matrix}"),
    };
    assert_eq!(pairs.len(), 3);
    assert_eq!(matrix["skipped_matches"], 2);
}

#[test]
fn skipped_lists_malformed_final_matches() {
    let db_path = imported_db("skipped");
    let skipped = stdout_json(&lgs_success(&db_path, &["skipped"]));
    assert_eq!(skipped["skipped_matches"], 2);

    let reasons: Vec<(String, String)> = match skipped["matches"].as_array() {
        Some(items) => items
            .iter()
            .map(|item| {
                (
                    item["match_id"].as_str().unwrap_or_default().to_string(),
                    item["reason"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        None => panic!("expected matches array: {skipped}"),
    };
    assert!(reasons.contains(&("m4-unknown".to_string(), "unknown_team".to_string())));
    assert!(reasons.contains(&("m5-missing".to_string(), "missing_score".to_string())));
}

#[test]
fn standings_follow_final_rank_and_reject_unknown_seasons() {
    let db_path = imported_db("standings");
    let journey = stdout_json(&lgs_success(
        &db_path,
        &["standings", "--season", "s2023", "--json"],
    ));
    assert_eq!(journey["year"], 2023);
    assert_eq!(journey["total_weeks"], 3);
    assert_eq!(journey["final_standings"][0]["member_id"], "alice");
    assert_eq!(journey["final_standings"][0]["is_champion"], true);
    assert_eq!(journey["final_standings"][2]["member_id"], "carol");
    assert_eq!(journey["final_standings"][2]["is_last_place"], true);

    let missing = lgs_output(&db_path, &["standings", "--season", "s1999"]);
    assert!(!missing.status.success());
    let stderr = String::from_utf8_lossy(&missing.stderr);
    assert!(stderr.contains("unknown season"), "stderr={stderr}");
}

#[test]
fn records_filter_by_category() {
    let db_path = imported_db("records");
    let single_week = stdout_json(&lgs_success(
        &db_path,
        &["records", "--category", "single_week", "--json"],
    ));
    let records = match single_week["records"].as_array() {
        Some(records) => records.clone(),
        None => panic!("expected records array: {single_week}"),
    };
    assert!(records
        .iter()
        .all(|record| record["category"] == "single_week"));

    let highest = records
        .iter()
        .find(|record| record["record_type"] == "highest_single_week_score");
    let highest = match highest {
        Some(record) => record.clone(),
        None => panic!("expected highest_single_week_score in {single_week}"),
    };
    assert_eq!(highest["value"], 120.5);
    assert_eq!(highest["holder_member_id"], "alice");
    assert_eq!(highest["opponent_member_id"], "bob");
    assert_eq!(highest["week"], 1);
    assert_eq!(single_week["skipped_matches"], 2);
}

#[test]
fn record_check_compares_against_the_current_holder() {
    let db_path = imported_db("record-check");
    let breaking = stdout_json(&lgs_success(
        &db_path,
        &[
            "record-check",
            "--record-type",
            "highest_single_week_score",
            "--value",
            "130",
        ],
    ));
    assert_eq!(breaking["is_record"], true);
    assert_eq!(breaking["current_holder"]["holder_member_id"], "alice");

    let equal = stdout_json(&lgs_success(
        &db_path,
        &[
            "record-check",
            "--record-type",
            "highest_single_week_score",
            "--value",
            "120.5",
        ],
    ));
    assert_eq!(equal["is_record"], false);

    let lower_is_better = stdout_json(&lgs_success(
        &db_path,
        &[
            "record-check",
            "--record-type",
            "lowest_single_week_score",
            "--value",
            "75",
        ],
    ));
    assert_eq!(lower_is_better["is_record"], true);
}

#[test]
fn unknown_record_type_fails_with_the_known_names() {
    let db_path = imported_db("record-type");
    let output = lgs_output(
        &db_path,
        &["record-check", "--record-type", "most_trades", "--value", "3"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown record type"), "stderr={stderr}");
    assert!(stderr.contains("most_career_wins"), "stderr={stderr}");
}

#[test]
fn leaderboard_shares_ranks_between_ties() {
    let db_path = imported_db("leaderboard");
    let entries = stdout_json(&lgs_success(
        &db_path,
        &["leaderboard", "--metric", "wins", "--json"],
    ));
    let ranked: Vec<(u64, String)> = match entries.as_array() {
        Some(items) => items
            .iter()
            .map(|entry| {
                (
                    entry["rank"].as_u64().unwrap_or_default(),
                    entry["member_id"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        None => panic!("expected leaderboard array: {entries}"),
    };
    assert_eq!(
        ranked,
        vec![
            (1, "alice".to_string()),
            (1, "bob".to_string()),
            (3, "carol".to_string())
        ]
    );

    let limited = stdout_json(&lgs_success(
        &db_path,
        &["leaderboard", "--metric", "wins", "--limit", "1", "--json"],
    ));
    assert_eq!(limited.as_array().map(Vec::len), Some(1));
}

#[test]
fn rivalries_honor_a_ruleset_file() {
    let db_path = imported_db("rivalries");
    let default_view = stdout_json(&lgs_success(
        &db_path,
        &["rivalries", "--member", "alice", "--json"],
    ));
    assert_eq!(default_view["rivalries"][0]["opponent_id"], "bob");
    assert_eq!(default_view["rivalries"][0]["label"], "even");
    assert_eq!(default_view["top_nemesis"], Value::Null);

    let ruleset_path = write_json_file(
        "ruleset",
        &json!({
            "ruleset_version": 2,
            "rivalry": {
                "dominance_margin": 5,
                "dominance_ratio": 0.7,
                "ratio_min_margin": 2,
                "rival_max_margin": 1,
                "rival_min_matchups": 1
            },
            "records": { "min_career_games_for_percentage": 10 }
        }),
    );
    let mut command = Command::new(lgs_binary_path());
    command
        .arg("--db")
        .arg(&db_path)
        .arg("--ruleset")
        .arg(&ruleset_path)
        .args(["rivalries", "--member", "alice", "--json"]);
    let output = match command.output() {
        Ok(output) => output,
        Err(err) => panic!("failed to run rivalries with ruleset: {err}"),
    };
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let custom_view = stdout_json(&output);
    assert_eq!(custom_view["rivalries"][0]["label"], "rival");
}

#[test]
fn invalid_ruleset_file_is_rejected() {
    let db_path = imported_db("bad-ruleset");
    let ruleset_path = write_json_file(
        "bad-ruleset",
        &json!({
            "ruleset_version": 2,
            "rivalry": {
                "dominance_margin": 5,
                "dominance_ratio": 1.5,
                "ratio_min_margin": 2,
                "rival_max_margin": 1,
                "rival_min_matchups": 5
            },
            "records": { "min_career_games_for_percentage": 10 }
        }),
    );
    let output = match Command::new(lgs_binary_path())
        .arg("--db")
        .arg(&db_path)
        .arg("--ruleset")
        .arg(&ruleset_path)
        .arg("matrix")
        .output()
    {
        Ok(output) => output,
        Err(err) => panic!("failed to run matrix with ruleset: {err}"),
    };
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid ruleset"), "stderr={stderr}");
}

#[test]
fn dashboard_shows_upcoming_matchup_and_trophies() {
    let db_path = imported_db("dashboard");
    let dashboard = stdout_json(&lgs_success(
        &db_path,
        &["dashboard", "--member", "alice", "--season", "s2023"],
    ));
    assert_eq!(dashboard["member_id"], "alice");
    assert_eq!(dashboard["display_name"], "Alice");
    assert_eq!(dashboard["current_streak"], 2);
    assert_eq!(dashboard["upcoming"]["match_id"], "sched-1");
    assert_eq!(dashboard["upcoming"]["opponent_member_id"], "bob");
    assert_eq!(dashboard["upcoming"]["is_home"], false);
    assert_eq!(dashboard["upcoming"]["label"], "even");
    assert_eq!(dashboard["trophy_case"]["championship_years"], json!([2023]));
    assert_eq!(dashboard["skipped_matches"], 2);

    let unknown = lgs_output(&db_path, &["dashboard", "--member", "alice", "--season", "s1999"]);
    assert!(!unknown.status.success());
}

#[test]
fn merge_folds_history_into_the_surviving_member() {
    let db_path = imported_db("merge");
    let extra_path = write_json_file(
        "merge-extra",
        &json!({
            "seasons": [{ "id": "s2022", "year": 2022, "regular_season_weeks": 3 }],
            "members": [{ "id": "ally", "display_name": "Ally", "is_active": false }],
            "teams": [team("al22", "s2022", "ally", "Old Alpha", (2, 3, 0))],
            "matches": []
        }),
    );
    lgs_success(&db_path, &["import", "--file", &extra_path.to_string_lossy()]);

    let before = stdout_json(&lgs_success(
        &db_path,
        &["career", "--member", "alice", "--json"],
    ));
    assert_eq!(before["seasons_played"], 1);

    let merged = stdout_json(&lgs_success(
        &db_path,
        &["merge", "--from", "ally", "--into", "alice"],
    ));
    assert_eq!(merged, json!({ "merged": "ally", "into": "alice" }));

    let after = stdout_json(&lgs_success(
        &db_path,
        &["career", "--member", "ally", "--json"],
    ));
    assert_eq!(after["member_id"], "alice");
    assert_eq!(after["seasons_played"], 2);
    assert_eq!(after["record"], json!({ "wins": 5, "losses": 1, "ties": 0 }));

    let self_merge = lgs_output(&db_path, &["merge", "--from", "bob", "--into", "bob"]);
    assert!(!self_merge.status.success());
}

#[test]
fn corrupt_rows_surface_as_a_failure() {
    let db_path = imported_db("corrupt");
    let conn = match Connection::open(&db_path) {
        Ok(conn) => conn,
        Err(err) => panic!("failed to open db: {err}"),
    };
    if let Err(err) = conn.execute(
        "UPDATE matches SET played_on = 'not-a-date' WHERE match_id = 'm1'",
        [],
    ) {
        panic!("failed to corrupt row: {err}");
    }
    drop(conn);

    let output = lgs_output(&db_path, &["career", "--member", "alice"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ledger corrupt"), "stderr={stderr}");
}
