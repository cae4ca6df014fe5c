//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn grade_foo(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("grade-foo").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("GRADEFORGE_REPORT_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn submission(dir: &Path, name: &str) -> PathBuf {
    let sub = dir.join("submissions").join(name);
    std::fs::create_dir_all(&sub).unwrap();
    let file = sub.join("foo.rs");
    std::fs::write(&file, "// submitted\r\n").unwrap();
    file
}

#[test]
fn list_shows_registered_tests() {
    let dir = TempDir::new().unwrap();
    grade_foo(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("6 test function(s)"))
        .stdout(predicate::str::contains("test_add_two tests: add_two depends: add_one"))
        .stdout(predicate::str::contains("test_coverage (manual)"));
}

#[test]
fn correct_submission_writes_clean_report() {
    let dir = TempDir::new().unwrap();
    let file = submission(dir.path(), "ab12");

    grade_foo(dir.path())
        .arg("grade")
        .arg(&file)
        .arg("--report-dir")
        .arg("out")
        .assert()
        .success()
        .stderr(predicate::str::contains("Graded 1 of 1 submission(s)"))
        .stderr(predicate::str::contains("Batch report saved to"));

    let report = std::fs::read_to_string(dir.path().join("out").join("ab12_foo_feedback.txt")).unwrap();
    assert!(report.contains("Automated testing for"));
    assert!(report.contains("All checks passed."));
    assert!(report.contains("Every symbol in the assignment is defined."));
    assert!(!report.contains("should be"));

    // The setup hook normalized the file and left its marker.
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "// submitted\n");
    assert!(dir.path().join("submissions/ab12/.gradeforge-setup").exists());
}

#[test]
fn buggy_submission_gets_ecf_feedback_on_stdout() {
    let dir = TempDir::new().unwrap();
    let file = submission(dir.path(), "flc37");

    grade_foo(dir.path())
        .arg("grade")
        .arg(&file)
        .arg("--stdout")
        .assert()
        .success()
        .stdout(predicate::str::contains("add_one(big) should be 101, but it is '!?!?!'"))
        .stdout(predicate::str::contains("add_one('takes one to know')"))
        .stdout(predicate::str::contains("This is not an edge case."))
        .stdout(predicate::str::contains("Fatal exception in student code; test aborted."))
        .stdout(predicate::str::contains("ZeroDivisionError"))
        .stdout(predicate::str::contains("Trying again with helper functions corrected."))
        .stdout(predicate::str::contains("Problem solved!"));

    assert!(!dir.path().join("feedback").exists());
}

#[test]
fn incomplete_submission_reports_missing_symbols() {
    let dir = TempDir::new().unwrap();
    let file = submission(dir.path(), "zz99");

    grade_foo(dir.path())
        .args(["grade", "--stdout", "--test", "test_add_two", "--test", "test_coverage"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("does not define 'add_two'"))
        .stdout(predicate::str::contains("Not defined:"))
        .stdout(predicate::str::contains("test_add_one").not());
}

#[test]
fn missing_and_unregistered_submissions_are_skipped() {
    let dir = TempDir::new().unwrap();
    let stranger = submission(dir.path(), "nobody");

    grade_foo(dir.path())
        .arg("grade")
        .arg("submissions/ghost/foo.rs")
        .arg(&stranger)
        .assert()
        .success()
        .stderr(predicate::str::contains("Skipped submissions/ghost/foo.rs"))
        .stderr(predicate::str::contains("Graded 0 of 2 submission(s)"));
}

#[test]
fn unknown_test_function_is_an_error() {
    let dir = TempDir::new().unwrap();
    let file = submission(dir.path(), "ab12");

    grade_foo(dir.path())
        .args(["grade", "--test", "test_nope"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("test_nope"));
}

#[test]
fn summary_reads_saved_batch() {
    let dir = TempDir::new().unwrap();
    let good = submission(dir.path(), "ab12");
    let bad = submission(dir.path(), "flc37");

    grade_foo(dir.path())
        .arg("grade")
        .arg(&good)
        .arg(&bad)
        .args(["--parallelism", "2", "--json", "batch.json"])
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("batch.json")).unwrap()).unwrap();
    assert_eq!(json["records"].as_array().unwrap().len(), 2);
    assert_eq!(json["records"][0]["status"]["kind"], "graded");

    grade_foo(dir.path())
        .args(["summary", "batch.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 submission(s), 2 graded"))
        .stdout(predicate::str::contains("flc37"))
        .stdout(predicate::str::contains("add_one"));
}

#[test]
fn config_file_supplies_defaults() {
    let dir = TempDir::new().unwrap();
    let file = submission(dir.path(), "ab12");
    std::fs::write(dir.path().join("gradeforge.toml"), "report_dir = \"graded\"\n").unwrap();

    grade_foo(dir.path()).arg("grade").arg(&file).assert().success();

    assert!(dir.path().join("graded").join("ab12_foo_feedback.txt").exists());
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    grade_foo(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created gradeforge.toml"));
    assert!(dir.path().join("gradeforge.toml").exists());

    grade_foo(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists, skipping."));
}
