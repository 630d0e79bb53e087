//! Run settings validation tests for rule-convert-config.
// crates/rule-convert-config/tests/settings_validation.rs
// =============================================================================
// Module: Run Settings Validation Tests
// Description: Validate worker bounds, directory checks, and endpoint rules.
// Purpose: Ensure invalid runs fail closed before any remote activity.
// =============================================================================

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "Test helpers are self-describing."
)]

use std::fs;
use std::path::PathBuf;

use rule_convert_config::ConfigError;
use rule_convert_config::DEFAULT_ENDPOINT;
use rule_convert_config::DEFAULT_WORKERS;
use rule_convert_config::RunSettings;
use rule_convert_config::WorkerCount;
use rule_convert_config::resolve_user_path_with;
use rule_convert_config::validate_endpoint;

type TestResult = Result<(), String>;

fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn worker_count_accepts_bounds() -> TestResult {
    for value in [1, 10, 50] {
        let count = WorkerCount::new(value).map_err(|err| err.to_string())?;
        if i64::try_from(count.get()).map_err(|err| err.to_string())? != value {
            return Err(format!("worker count {value} not preserved"));
        }
    }
    if WorkerCount::default().get() != DEFAULT_WORKERS {
        return Err("default worker count changed".to_string());
    }
    Ok(())
}

#[test]
fn worker_count_rejects_out_of_range() -> TestResult {
    assert_invalid(WorkerCount::new(0), "between 1 and 50 (got 0)")?;
    assert_invalid(WorkerCount::new(51), "between 1 and 50 (got 51)")?;
    assert_invalid(WorkerCount::new(-3), "(got -3)")?;
    Ok(())
}

#[test]
fn settings_default_output_dir_inside_rules_dir() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let settings = RunSettings::new(
        "okta",
        dir.path().to_path_buf(),
        None,
        WorkerCount::default(),
        DEFAULT_ENDPOINT,
    )
    .map_err(|err| err.to_string())?;
    if settings.output_dir != dir.path().join("output") {
        return Err(format!("unexpected output dir {}", settings.output_dir.display()));
    }
    Ok(())
}

#[test]
fn settings_reject_missing_directory() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let missing = dir.path().join("nope");
    assert_invalid(
        RunSettings::new("okta", missing, None, WorkerCount::default(), DEFAULT_ENDPOINT),
        "directory not found",
    )
}

#[test]
fn settings_reject_file_as_directory() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let file = dir.path().join("rule.yml");
    fs::write(&file, "x").map_err(|err| err.to_string())?;
    assert_invalid(
        RunSettings::new("okta", file, None, WorkerCount::default(), DEFAULT_ENDPOINT),
        "not a directory",
    )
}

#[test]
fn settings_reject_blank_platform_before_directory_checks() -> TestResult {
    assert_invalid(
        RunSettings::new(
            "  ",
            PathBuf::from("/definitely/not/here"),
            None,
            WorkerCount::default(),
            DEFAULT_ENDPOINT,
        ),
        "platform",
    )
}

#[test]
fn endpoint_must_be_http() -> TestResult {
    assert_invalid(validate_endpoint("ftp://example.com"), "http(s) url")?;
    assert_invalid(validate_endpoint(""), "endpoint")?;
    let ok = validate_endpoint(" https://example.com/mcp ").map_err(|err| err.to_string())?;
    if ok != "https://example.com/mcp" {
        return Err(format!("endpoint not trimmed: {ok}"));
    }
    Ok(())
}

#[test]
fn typed_path_expands_home_prefix() -> TestResult {
    let home = tempfile::tempdir().map_err(|err| err.to_string())?;
    let rules = home.path().join("rules");
    fs::create_dir(&rules).map_err(|err| err.to_string())?;
    let canonical = fs::canonicalize(&rules).map_err(|err| err.to_string())?;

    let resolved = resolve_user_path_with("~/rules", Some(home.path()));
    if resolved != canonical {
        return Err(format!("expected {}, got {}", canonical.display(), resolved.display()));
    }
    let bare = resolve_user_path_with("~", Some(home.path()));
    if bare != fs::canonicalize(home.path()).map_err(|err| err.to_string())? {
        return Err(format!("bare ~ resolved to {}", bare.display()));
    }
    Ok(())
}

#[test]
fn typed_path_leaves_other_forms_alone() -> TestResult {
    let home = tempfile::tempdir().map_err(|err| err.to_string())?;
    let cases = [
        ("~other/rules", PathBuf::from("~other/rules")),
        ("./missing-rules-dir", PathBuf::from("./missing-rules-dir")),
    ];
    for (answer, expected) in cases {
        let resolved = resolve_user_path_with(answer, Some(home.path()));
        if resolved != expected {
            return Err(format!("{answer} resolved to {}", resolved.display()));
        }
    }
    let missing_home = resolve_user_path_with("~/rules", None);
    if missing_home != PathBuf::from("~/rules") {
        return Err(format!("no home resolved to {}", missing_home.display()));
    }
    Ok(())
}
