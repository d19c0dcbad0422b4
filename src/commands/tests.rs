//! Tests for command implementations.

use super::file::{cmd_hold, copy_to, create_with, update_with};
use super::lock::cmd_lock_clear;
use super::resolve_config;
use crate::cli::{Cli, HoldArgs, LockClearArgs, ModeArg};
use clap::Parser;
use ftx::config::Config;
use ftx::context::FileAccess;
use ftx::error::FileError;
use std::fs;
use tempfile::TempDir;

fn quick_access() -> FileAccess {
    FileAccess::new(Config {
        wait_timeout_secs: 0.2,
        retry_interval_ms: 10,
        ..Config::default()
    })
    .unwrap()
}

#[test]
fn flags_override_config_file() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("ftx.yaml");
    fs::write(&config_path, "wait_timeout_secs: 7\nretry_interval_ms: 30\n").unwrap();

    let cli = Cli::try_parse_from([
        "ftx",
        "--config",
        config_path.to_str().unwrap(),
        "--wait-timeout",
        "1",
        "cat",
        "x",
    ])
    .unwrap();
    let config = resolve_config(&cli).unwrap();

    assert_eq!(config.wait_timeout_secs, 1.0);
    assert_eq!(config.retry_interval_ms, 30);
}

#[test]
fn invalid_override_is_rejected() {
    let cli = Cli::try_parse_from(["ftx", "--retry-interval", "0", "cat", "x"]).unwrap();
    let err = resolve_config(&cli).unwrap_err();
    assert!(matches!(err, FileError::Config(_)));
}

#[test]
fn oversized_wait_timeout_flag_is_rejected() {
    let cli = Cli::try_parse_from(["ftx", "--wait-timeout", "1e30", "cat", "x"]).unwrap();
    let err = resolve_config(&cli).unwrap_err();
    assert!(matches!(err, FileError::Config(_)));
}

#[test]
fn hold_rejects_oversized_duration() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("held.txt");
    fs::write(&path, "data").unwrap();
    let access = quick_access();

    let args = HoldArgs {
        path: path.clone(),
        mode: ModeArg::Update,
        seconds: 1e30,
        commit: false,
    };
    let err = cmd_hold(&access, args).unwrap_err();

    assert!(matches!(err, FileError::Config(_)));
    assert_eq!(access.open_count(), 0);
    assert!(!temp.path().join(".held.txt.lock").exists());
}

#[test]
fn create_then_cat() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("notes.txt");
    let access = quick_access();

    create_with(&access, &path, b"hello\n").unwrap();

    let mut out = Vec::new();
    assert_eq!(copy_to(&access, &path, &mut out).unwrap(), 6);
    assert_eq!(out, b"hello\n");
    assert_eq!(access.open_count(), 0);
}

#[test]
fn create_existing_file_fails() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("notes.txt");
    fs::write(&path, "keep").unwrap();

    let err = create_with(&quick_access(), &path, b"x").unwrap_err();

    assert!(matches!(err, FileError::Io(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), "keep");
}

#[test]
fn update_replaces_content() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("notes.txt");
    fs::write(&path, "old content").unwrap();

    let written = update_with(&quick_access(), &path, b"new", false).unwrap();

    assert_eq!(written, 3);
    assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    assert!(!temp.path().join(".notes.txt.temp").exists());
    assert!(!temp.path().join(".notes.txt.lock").exists());
}

#[test]
fn update_appends_content() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("notes.txt");
    fs::write(&path, "line 1\n").unwrap();

    let written = update_with(&quick_access(), &path, b"line 2\n", true).unwrap();

    assert_eq!(written, 14);
    assert_eq!(fs::read_to_string(&path).unwrap(), "line 1\nline 2\n");
}

#[test]
fn cat_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let mut out = Vec::new();
    let err = copy_to(&quick_access(), &temp.path().join("missing"), &mut out).unwrap_err();
    assert!(matches!(err, FileError::Io(_)));
}

#[test]
fn lock_clear_requires_force() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("notes.txt");
    fs::write(temp.path().join(".notes.txt.lock"), "").unwrap();

    let err = cmd_lock_clear(
        LockClearArgs {
            path: path.clone(),
            force: false,
        },
        &Config::default(),
    )
    .unwrap_err();

    assert!(err.to_string().contains("--force"));
    assert!(temp.path().join(".notes.txt.lock").exists());
}
