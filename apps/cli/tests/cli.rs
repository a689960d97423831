use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const MASTER: &str = "correct horse battery staple";

fn passio(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_passio"));
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env("PASSIO__STORAGE__ROOT", dir.join("data"))
        .env("PASSIO__VAULT__ITERATIONS", "10")
        .env("PASSIO_USER", "homer")
        .env("PASSIO_MASTER_PASSWORD", MASTER);
    cmd
}

#[test]
fn generate_works_without_a_vault() {
    let dir = TempDir::new().unwrap();
    passio(dir.path())
        .env_remove("PASSIO_MASTER_PASSWORD")
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[a-zA-Z0-9_\-=.]{15}\n$").unwrap());
    assert!(!dir.path().join("data").exists());
}

#[test]
fn entries_persist_between_invocations() {
    let dir = TempDir::new().unwrap();
    passio(dir.path())
        .args(["add", "-d", "Amazon", "--url", "https://www.amazon.com/"])
        .assert()
        .success()
        .stdout("Added entry 1\n");
    passio(dir.path())
        .args(["add", "-n", "homer_simpson", "-p", "donuts"])
        .assert()
        .success()
        .stdout("Added entry 2\n");

    passio(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout("1\tAmazon\thttps://www.amazon.com/\t\n2\t\t\thomer_simpson\n");
    passio(dir.path())
        .args(["search", "hom"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("2\t3\tusername\t[hom]er_simpson\n"));
    passio(dir.path())
        .args(["show", "2", "--reveal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("password:    donuts"));
}

#[test]
fn undo_survives_restarts() {
    let dir = TempDir::new().unwrap();
    passio(dir.path()).args(["add", "-d", "Mail"]).assert().success();
    passio(dir.path()).args(["remove", "1"]).assert().success();
    passio(dir.path()).arg("list").assert().success().stdout("");

    passio(dir.path()).arg("undo").assert().success().stdout("Undid last change\n");
    passio(dir.path()).arg("list").assert().success().stdout(predicate::str::starts_with("1\tMail"));
}

#[test]
fn master_password_can_come_from_stdin() {
    let dir = TempDir::new().unwrap();
    passio(dir.path()).args(["add", "-d", "Mail"]).assert().success();

    passio(dir.path())
        .env_remove("PASSIO_MASTER_PASSWORD")
        .arg("list")
        .write_stdin(format!("{MASTER}\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Mail"));
}

#[test]
fn wrong_master_password_is_reported() {
    let dir = TempDir::new().unwrap();
    passio(dir.path()).arg("list").assert().success();

    passio(dir.path())
        .env("PASSIO_MASTER_PASSWORD", "wrong")
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open the vault of homer"));
}

#[test]
fn unknown_entry_fails() {
    let dir = TempDir::new().unwrap();
    passio(dir.path())
        .args(["show", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No entry with id 42"));
}

#[test]
fn config_file_in_working_directory_is_used() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("passio.toml"), "[storage]\nroot = \"vaults\"\n").unwrap();

    passio(dir.path())
        .env_remove("PASSIO__STORAGE__ROOT")
        .args(["add", "-d", "Mail"])
        .assert()
        .success();
    assert!(dir.path().join("vaults").join("records").is_dir());
}

#[test]
fn missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    passio(dir.path())
        .args(["--config", "absent.toml", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration is malformed"));
}
