use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tally(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.env("HOME", home.path())
        .env_remove("ANTHROPIC_API_KEY")
        .env("RUST_LOG", "off");
    cmd
}

fn initialized() -> TempDir {
    let home = tempfile::tempdir().unwrap();
    let data_dir = home.path().join("data");
    tally(&home)
        .args(["init", "--data-dir", data_dir.to_str().unwrap(), "--user", "Sam"])
        .assert()
        .success()
        .stdout(predicate::str::contains("My Budget"));
    home
}

#[test]
fn init_creates_budget_and_status_reports_it() {
    let home = initialized();
    tally(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Budget:      My Budget"))
        .stdout(predicate::str::contains("Voice entry: off"));
    tally(&home)
        .args(["categories", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Groceries"));
}

#[test]
fn commands_before_init_point_at_init() {
    let home = tempfile::tempdir().unwrap();
    tally(&home)
        .args(["accounts", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tally init"));
}

#[test]
fn parse_requires_ai_enabled() {
    let home = initialized();
    tally(&home)
        .args(["parse", "Spent $5 on coffee"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not enabled"));
}

#[test]
fn parse_without_api_key_reports_generic_error() {
    let home = initialized();
    tally(&home).args(["ai", "on"]).assert().success();
    tally(&home)
        .args(["parse", "Spent $5 on coffee", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""status": "error""#))
        .stdout(predicate::str::contains("Please try again"));
}

#[test]
fn parse_rejects_blank_transcript() {
    let home = initialized();
    tally(&home).args(["ai", "on"]).assert().success();
    tally(&home)
        .args(["parse", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing was said"));
}

#[test]
fn clarify_refuses_forged_token() {
    let home = initialized();
    tally(&home).args(["ai", "on"]).assert().success();
    tally(&home)
        .args(["clarify", "--session", "v1.e30.AAAA", "--answer", "0:category_id:1", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("no longer valid"));
}

#[test]
fn clarify_rejects_malformed_answer() {
    let home = initialized();
    tally(&home).args(["ai", "on"]).assert().success();
    tally(&home)
        .args(["clarify", "--session", "whatever", "--answer", "first:category:groceries"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("INDEX:FIELD:ID"));
}

#[test]
fn undo_unknown_batch_deletes_nothing() {
    let home = initialized();
    tally(&home).args(["ai", "on"]).assert().success();
    tally(&home)
        .args(["undo", "no-such-batch", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""deleted": 0"#));
}

#[test]
fn undo_requires_ai_enabled() {
    let home = initialized();
    tally(&home)
        .args(["undo", "no-such-batch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not enabled"));
}

#[test]
fn speak_categories_requires_ai_enabled() {
    let home = initialized();
    tally(&home)
        .args(["categories", "speak", "add pet food under pets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not enabled"));
}

#[test]
fn speak_categories_without_api_key_creates_nothing() {
    let home = initialized();
    tally(&home).args(["ai", "on"]).assert().success();
    tally(&home)
        .args(["categories", "speak", "add pet food under pets", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""status": "error""#))
        .stdout(predicate::str::contains("Please try again"));
    tally(&home)
        .args(["categories", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pet Food").not());
}

#[test]
fn demo_switches_to_demo_budget() {
    let home = initialized();
    tally(&home).arg("demo").assert().success();
    tally(&home)
        .args(["accounts", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Main Checking"))
        .stdout(predicate::str::contains("Cash Wallet"));
    tally(&home)
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("already loaded"));
    tally(&home)
        .args(["budget", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Personal Budget"));
}

#[test]
fn payee_default_category_must_exist() {
    let home = initialized();
    tally(&home)
        .args(["payees", "add", "Costco", "--category", "groceries"])
        .assert()
        .success();
    tally(&home)
        .args(["payees", "add", "Joe's", "--category", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown category"));
    tally(&home)
        .args(["payees", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Costco"));
}
