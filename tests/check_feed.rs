use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const FEED: &str = "\
reels:
  - videoSource: https://example.com/a.mp4
    username: ana
    caption: Sunrise
    likeCount: 12
  - video: https://example.com/b.mp4
    username: bo
    isFollowed: true
";

#[test]
fn valid_feed_reports_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("feed.yaml");
    fs::write(&path, FEED).unwrap();

    Command::cargo_bin("reels-tui")
        .unwrap()
        .arg("--check-feed")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Feed OK: 2 reels"));
}

#[test]
fn json_feed_is_accepted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("feed.json");
    fs::write(
        &path,
        r#"[{"videoSource": "a.mp4", "username": "ana", "likeCount": 1}]"#,
    )
    .unwrap();

    Command::cargo_bin("reels-tui")
        .unwrap()
        .arg("--check-feed")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Feed OK: 1 reels"));
}

#[test]
fn feed_without_reels_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("feed.yaml");
    fs::write(&path, "title: nothing here\n").unwrap();

    Command::cargo_bin("reels-tui")
        .unwrap()
        .arg("--check-feed")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("reels list not found"));
}

#[test]
fn reels_must_be_a_sequence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("feed.yaml");
    fs::write(&path, "reels: 3\n").unwrap();

    Command::cargo_bin("reels-tui")
        .unwrap()
        .arg("--check-feed")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ordered sequence"));
}

#[test]
fn missing_file_fails() {
    Command::cargo_bin("reels-tui")
        .unwrap()
        .args(["--check-feed", "/nonexistent/reels/feed.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read feed file"));
}

#[test]
fn dump_feed_prints_camel_case_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("feed.yaml");
    fs::write(&path, FEED).unwrap();

    Command::cargo_bin("reels-tui")
        .unwrap()
        .arg("--dump-feed")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"videoSource\": \"https://example.com/b.mp4\""))
        .stdout(predicate::str::contains("\"isFollowed\": true"))
        .stdout(predicate::str::contains("\"likeCount\": 12"));
}

#[test]
fn path_flags_without_value_exit_with_usage_error() {
    for flag in ["--feed", "--check-feed", "--dump-feed"] {
        Command::cargo_bin("reels-tui")
            .unwrap()
            .arg(flag)
            .assert()
            .code(2)
            .stderr(predicate::str::contains(format!("{flag} needs a file path")));
    }
}
