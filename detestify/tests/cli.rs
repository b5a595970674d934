use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{read_to_string, write};
use tempfile::tempdir;

const SOURCE: &str = "\
package example

import (
	\"testing\"

	\"github.com/stretchr/testify/assert\"
)

func TestExample(t *testing.T) {
	assert.Equal(t, 1, x)
}
";

fn detestify() -> Command {
    Command::cargo_bin("detestify").unwrap()
}

#[test]
fn version() {
    detestify().arg("--version").assert().success();
}

#[test]
fn unknown_flags_exit_with_code_one() {
    detestify().arg("--bogus").assert().code(1);
}

#[test]
fn default_action_prints_to_stdout() {
    let tempdir = tempdir().unwrap();
    let path = tempdir.path().join("example_test.go");
    write(&path, SOURCE).unwrap();

    detestify()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("t.Errorf(\"got %v, want %v\", got, 1)"));

    // Without --write the file is untouched.
    assert_eq!(SOURCE, read_to_string(&path).unwrap());
}

#[test]
fn write_rewrites_in_place() {
    let tempdir = tempdir().unwrap();
    let path = tempdir.path().join("example_test.go");
    write(&path, SOURCE).unwrap();

    detestify().arg("--write").arg(&path).assert().success();

    let contents = read_to_string(&path).unwrap();
    assert!(contents.contains("t.Errorf"), "{contents}");
    assert!(!contents.contains("testify"), "{contents}");
}

#[test]
fn dry_run_lists_changed_files_under_a_directory() {
    let tempdir = tempdir().unwrap();
    let path = tempdir.path().join("example_test.go");
    write(&path, SOURCE).unwrap();
    // Non-test files are not considered during discovery.
    write(tempdir.path().join("example.go"), SOURCE).unwrap();

    detestify()
        .arg("--dry-run")
        .arg(tempdir.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("example_test.go")
                .and(predicate::str::contains("example.go\n").not()),
        );

    assert_eq!(SOURCE, read_to_string(&path).unwrap());
}

#[test]
fn parse_errors_exit_with_code_two() {
    let tempdir = tempdir().unwrap();
    let path = tempdir.path().join("broken_test.go");
    write(&path, "package example\n\nfunc broken( {\n").unwrap();

    detestify().arg(&path).assert().code(2);
}
