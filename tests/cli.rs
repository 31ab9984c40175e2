use std::collections::BTreeMap;
use std::path::Path;

use assert_cmd::Command;
use chrono::{Duration, Local, TimeZone};

use typecoach::{ProgressStore, TypingSession};

fn finished(text: &str, lesson: Option<&str>, secs: i64, errors: &[(char, u64)]) -> TypingSession {
    let start = Local.with_ymd_and_hms(2024, 5, 2, 18, 30, 0).unwrap();
    let key_errors: BTreeMap<char, u64> = errors.iter().copied().collect();
    let error_count = key_errors.values().sum::<u64>();
    let len = text.chars().count() as u64;

    let mut s = TypingSession::new(text.to_string(), lesson.map(str::to_string), false);
    s.started_at = Some(start);
    s.finished_at = Some(start + Duration::seconds(secs));
    s.typed_count = len;
    s.error_count = error_count;
    s.correct_count = len - error_count;
    s.key_errors = key_errors;
    s
}

fn populate(path: &Path) {
    let mut store = ProgressStore::load(path).unwrap();
    store
        .append(finished("the quick brown fox", Some("sentences"), 6, &[('e', 2)]))
        .unwrap();
    store
        .append(finished("asdf jkl", Some("home-row"), 3, &[('a', 1)]))
        .unwrap();
    store.append(finished("hello", None, 2, &[])).unwrap();
}

// Keep config lookups away from the real home directory
fn typecoach(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("typecoach").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn stats_reports_populated_history() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("progress.json");
    populate(&data);

    let out = typecoach(dir.path())
        .arg("--data")
        .arg(&data)
        .arg("stats")
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let sessions = stdout.lines().find(|l| l.starts_with("Sessions:")).unwrap();
    assert_eq!(sessions.split_whitespace().last(), Some("3"));
    assert!(stdout.contains("Problem keys:"), "{stdout}");
    assert!(stdout.contains("Adjusted:"), "{stdout}");
    assert!(stdout.contains("sentences"), "{stdout}");
    assert!(stdout.contains("free practice"), "{stdout}");
}

#[test]
fn stats_on_missing_file_reports_empty_history() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("nothing-here.json");

    let out = typecoach(dir.path())
        .arg("--data")
        .arg(&data)
        .arg("stats")
        .output()
        .unwrap();

    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("No sessions recorded yet."));
    assert!(!data.exists());
}

#[test]
fn stats_on_corrupt_file_fails_without_touching_it() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("progress.json");
    std::fs::write(&data, "{ not json").unwrap();

    let out = typecoach(dir.path())
        .arg("--data")
        .arg(&data)
        .arg("stats")
        .output()
        .unwrap();

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("corrupt"));
    assert_eq!(std::fs::read_to_string(&data).unwrap(), "{ not json");
}

#[test]
fn export_writes_one_row_per_session() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("progress.json");
    let csv_path = dir.path().join("history.csv");
    populate(&data);

    let out = typecoach(dir.path())
        .arg("--data")
        .arg(&data)
        .arg("export")
        .arg(&csv_path)
        .output()
        .unwrap();

    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("Exported 3 sessions"));

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("date,lesson,wpm,accuracy"));
    assert!(lines[3].contains("free practice"));
}

#[test]
fn lessons_lists_builtin_ids() {
    let dir = tempfile::tempdir().unwrap();

    let out = typecoach(dir.path()).arg("lessons").output().unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("home-row"));
    assert!(stdout.contains("sentences"));
}
