use assert_cmd::Command;
use predicates::str::contains;

fn libris() -> Command {
    let mut cmd = Command::cargo_bin("libris").unwrap();
    cmd.env("LIBRIS_ENV", "local")
        .env("LIBRIS_CONFIG_DIR", env!("CARGO_MANIFEST_DIR"))
        .env("LIBRIS_DATABASE__URL", "sqlite::memory:")
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn help_lists_subcommands() {
    libris()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("load-data"))
        .stdout(contains("serve"));
}

#[test]
fn load_data_fails_for_missing_archive() {
    let dir = tempfile::tempdir().unwrap();
    libris()
        .arg("load-data")
        .arg(dir.path().join("absent.zip"))
        .assert()
        .failure()
        .stderr(contains("failed to load"));
}

#[test]
fn unknown_environment_is_rejected() {
    libris()
        .env("LIBRIS_ENV", "moon")
        .arg("migrate")
        .assert()
        .failure()
        .stderr(contains("unsupported environment"));
}
