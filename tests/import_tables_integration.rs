#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output};

use muport::db::Network;
use tempfile::tempdir;

/// Stand-in for wp-cli: appends its arguments to a log and exits with a
/// scripted status.
fn write_stub_wp(dir: &Path) {
    let path = dir.join("wp-stub.sh");
    fs::write(
        &path,
        "#!/bin/sh\necho \"$@\" >> \"$MUPORT_TEST_LOG\"\nexit \"${MUPORT_TEST_STATUS:-0}\"\n",
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn seed_network(dir: &Path) {
    let mut net = Network::open(&dir.join("net.db"), "wp_").unwrap();
    net.install(&[1, 2]).unwrap();
    let guard = net.switch_to_blog(2).unwrap();
    guard.set_option("srcwp_user_roles", "roles-blob").unwrap();
}

fn run_muport(dir: &Path, envs: &[(&str, &str)], args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_muport"));
    cmd.current_dir(dir).env("NO_COLOR", "1").args(args);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.output().expect("command should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn log_lines(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("wp.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn tables_import_runs_load_rewrites_and_rename() {
    let dir = tempdir().unwrap();
    seed_network(dir.path());
    write_stub_wp(dir.path());
    fs::write(dir.path().join("dump.sql"), "-- sql").unwrap();
    let log = dir.path().join("wp.log");

    let output = run_muport(
        dir.path(),
        &[("MUPORT_TEST_LOG", log.to_str().unwrap())],
        &[
            "--db",
            "net.db",
            "--wp-bin",
            "./wp-stub.sh",
            "import",
            "tables",
            "dump.sql",
            "--blog-id",
            "2",
            "--old-prefix",
            "srcwp_",
            "--old-url",
            "http://old.example",
            "--new-url",
            "http://new.example",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Database imported"));
    assert!(out.contains("Running search-replace"));
    assert!(out.contains(
        "Search and Replace has been successfully executed (scoped to http://new.example)"
    ));
    assert!(out.contains("Uploads paths have been successfully executed"));

    assert_eq!(
        log_lines(dir.path()),
        vec![
            "db import dump.sql".to_string(),
            "search-replace http://old.example http://new.example --url=http://new.example"
                .to_string(),
            "search-replace wp-content/uploads wp-content/uploads/sites/2 --url=http://new.example"
                .to_string(),
        ]
    );

    let mut net = Network::open(&dir.path().join("net.db"), "wp_").unwrap();
    let guard = net.switch_to_blog(2).unwrap();
    assert_eq!(
        guard.get_option("wp_2_user_roles").unwrap().as_deref(),
        Some("roles-blob")
    );
    assert!(guard.get_option("srcwp_user_roles").unwrap().is_none());
}

#[test]
fn tables_import_fails_when_the_load_fails() {
    let dir = tempdir().unwrap();
    seed_network(dir.path());
    write_stub_wp(dir.path());
    fs::write(dir.path().join("dump.sql"), "-- sql").unwrap();
    let log = dir.path().join("wp.log");

    let output = run_muport(
        dir.path(),
        &[
            ("MUPORT_TEST_LOG", log.to_str().unwrap()),
            ("MUPORT_TEST_STATUS", "3"),
        ],
        &[
            "--db",
            "net.db",
            "--wp-bin",
            "./wp-stub.sh",
            "import",
            "tables",
            "dump.sql",
            "--blog-id",
            "2",
            "--old-prefix",
            "srcwp_",
            "--old-url",
            "http://old.example",
            "--new-url",
            "http://new.example",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error: database import exited with status 3"));

    // Nothing past the failed load ran.
    assert_eq!(log_lines(dir.path()), vec!["db import dump.sql".to_string()]);

    let mut net = Network::open(&dir.path().join("net.db"), "wp_").unwrap();
    let guard = net.switch_to_blog(2).unwrap();
    assert!(guard.get_option("srcwp_user_roles").unwrap().is_some());
}

#[test]
fn tables_import_without_urls_skips_rewrites() {
    let dir = tempdir().unwrap();
    seed_network(dir.path());
    write_stub_wp(dir.path());
    fs::write(dir.path().join("dump.sql"), "-- sql").unwrap();
    let log = dir.path().join("wp.log");

    let output = run_muport(
        dir.path(),
        &[("MUPORT_TEST_LOG", log.to_str().unwrap())],
        &[
            "--db",
            "net.db",
            "--wp-bin",
            "./wp-stub.sh",
            "import",
            "tables",
            "dump.sql",
            "--blog-id",
            "2",
            "--old-prefix",
            "srcwp_",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(!stdout(&output).contains("Running search-replace"));
    assert_eq!(log_lines(dir.path()), vec!["db import dump.sql".to_string()]);

    let mut net = Network::open(&dir.path().join("net.db"), "wp_").unwrap();
    let guard = net.switch_to_blog(2).unwrap();
    assert_eq!(
        guard.get_option("wp_2_user_roles").unwrap().as_deref(),
        Some("roles-blob")
    );
}
