use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn get_soldlist_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("soldlist")
}

#[test]
fn test_harvest_command_help() {
    let mut cmd = Command::new(get_soldlist_bin());
    cmd.arg("harvest").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Harvest every listing on a search page"))
        .stdout(predicate::str::contains("--limit"))
        .stdout(predicate::str::contains("--no-wait"))
        .stdout(predicate::str::contains("--headless"))
        .stdout(predicate::str::contains("--profile-path"))
        .stdout(predicate::str::contains("--keep-open"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_harvest_command_with_missing_chrome() {
    let mut cmd = Command::new(get_soldlist_bin());
    cmd.arg("harvest")
        .arg("https://www.mercari.com/jp/search/?keyword=shoes")
        .arg("--chrome-path")
        .arg("/nonexistent/chrome");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Chrome not found"));
}

#[test]
fn test_harvest_command_rejects_invalid_search_url() {
    let mut cmd = Command::new(get_soldlist_bin());
    cmd.arg("harvest")
        .arg("not a url")
        .arg("--chrome-path")
        .arg("/nonexistent/chrome");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid search URL"));
}

#[test]
fn test_harvest_command_rejects_bad_utc_offset() {
    let mut cmd = Command::new(get_soldlist_bin());
    cmd.arg("harvest").arg("--utc-offset").arg("JST");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid UTC offset"));
}

#[test]
fn test_harvest_command_rejects_conflicting_profiles() {
    let mut cmd = Command::new(get_soldlist_bin());
    cmd.arg("harvest")
        .arg("--profile")
        .arg("work")
        .arg("--profile-path")
        .arg("/tmp/soldlist-profile");

    cmd.assert().failure().stderr(predicate::str::contains("cannot be used with"));
}
