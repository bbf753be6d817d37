//! End-to-end CLI tests.
//!
//! Each test drives the `loxvm` binary the way a user would and checks the
//! full observable contract: stdout, stderr, and the exit code.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write as _;
use tempfile::NamedTempFile;

fn loxvm() -> Command {
    Command::cargo_bin("loxvm").expect("binary should build")
}

/// Writes a script to a temp file and returns the handle (dropping it
/// deletes the file).
fn script(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(source.as_bytes()).expect("write script");
    file
}

#[test]
fn test_arithmetic_precedence() {
    let file = script("print 1 + 2 * 3;");
    loxvm()
        .arg(file.path())
        .assert()
        .success()
        .stdout("7\n")
        .stderr("");
}

#[test]
fn test_string_interning_pointer_equality() {
    let file = script("var a = \"foo\"; var b = \"foo\"; print a == b;");
    loxvm().arg(file.path()).assert().success().stdout("true\n");
}

#[test]
fn test_block_shadowing() {
    let file = script("{ var x = 1; { var x = 2; print x; } print x; }");
    loxvm()
        .arg(file.path())
        .assert()
        .success()
        .stdout("2\n1\n");
}

#[test]
fn test_while_loop() {
    let file = script("var i = 0; while (i < 3) { print i; i = i + 1; }");
    loxvm()
        .arg(file.path())
        .assert()
        .success()
        .stdout("0\n1\n2\n");
}

#[test]
fn test_unicode_escape() {
    let file = script("print \"caf\\u00e9;\";");
    loxvm()
        .arg(file.path())
        .assert()
        .success()
        .stdout("café\n");
}

#[test]
fn test_undefined_variable_runtime_error() {
    let file = script("print undefined_name;");
    loxvm()
        .arg(file.path())
        .assert()
        .code(70)
        .stdout("")
        .stderr("1: error: Runtime Error: Undefined variable 'undefined_name'\n");
}

#[test]
fn test_mixed_add_runtime_error() {
    let file = script("print 1 + \"x\";");
    loxvm()
        .arg(file.path())
        .assert()
        .code(70)
        .stderr("1: error: Runtime Error: Operands must both be numbers.\n");
}

#[test]
fn test_empty_input() {
    let file = script("");
    loxvm()
        .arg(file.path())
        .assert()
        .success()
        .stdout("")
        .stderr("");
}

#[test]
fn test_compile_error_exit_code() {
    let file = script("print ;");
    loxvm()
        .arg(file.path())
        .assert()
        .code(65)
        .stdout("")
        .stderr(predicate::str::contains("Expected expression."));
}

#[test]
fn test_compile_error_reports_location() {
    let file = script("var = 1;");
    loxvm()
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicate::str::contains("at '='"));
}

#[test]
fn test_missing_file() {
    loxvm()
        .arg("definitely_missing.lox")
        .assert()
        .code(66)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn test_extra_arguments_are_usage_error() {
    loxvm().args(["one.lox", "two.lox"]).assert().code(64);
}

#[test]
fn test_help_exits_cleanly() {
    loxvm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("loxvm"));
}

#[test]
fn test_repl_evaluates_lines() {
    loxvm()
        .write_stdin("print 1 + 1;\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("2"));
}

#[test]
fn test_repl_state_persists_between_lines() {
    loxvm()
        .write_stdin("var a = \"x\";\nprint a == \"x\";\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("true"));
}

#[test]
fn test_repl_survives_errors() {
    loxvm()
        .write_stdin("print missing;\nprint 3;\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("3"))
        .stderr(predicate::str::contains("Undefined variable 'missing'"));
}

#[test]
fn test_dump_bytecode_listing() {
    let file = script("print 1;");
    loxvm()
        .arg("--dump-bytecode")
        .arg(file.path())
        .assert()
        .success()
        .stdout("1\n")
        .stderr(predicate::str::contains("Constant").and(predicate::str::contains("Return")));
}

#[test]
fn test_runtime_error_line_number() {
    let file = script("var a = 1;\nprint a;\nprint ghost;\n");
    loxvm()
        .arg(file.path())
        .assert()
        .code(70)
        .stdout("1\n")
        .stderr(predicate::str::contains("3: error: Runtime Error:"));
}
