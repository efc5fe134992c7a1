//! End-to-end tests for the `build` command.
//!
//! These tests invoke the actual CLI binary and validate the behavior of the
//! `build` subcommand from a user's perspective.

mod common;

use common::prelude::*;

/// Test that build --help flag shows help information
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_build_help() {
    let mut cmd = cargo_bin_cmd!("hconf");

    cmd.arg("build")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Load, sort and merge all modules below a directory",
        ));
}

/// Test that build lists modules in merge order
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_build_lists_module_order() {
    let fixture = TestFixture::new()
        .with_core_modules()
        .with_intranet_site();

    fixture
        .command("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. platform/core/base"))
        .stdout(predicate::str::contains("2. project/website/overlay"))
        .stdout(predicate::str::contains(
            "3. project/website/intranet (site intranet)",
        ))
        .stdout(predicate::str::contains("site intranet: /hst:intranet"));
}

/// Test that an empty directory builds an empty model
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_build_empty_directory() {
    let fixture = TestFixture::new();

    fixture
        .command("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("nodes:               1"));
}

/// Test that a missing root is reported
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_build_missing_root() {
    let mut cmd = cargo_bin_cmd!("hconf");

    cmd.arg("build")
        .arg("/nonexistent/hconf/modules")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}

/// Test that a dependency cycle between modules fails the build
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_build_dependency_cycle() {
    let fixture = TestFixture::new()
        .with_module(
            "a",
            "group: g\nproject: p\nmodule:\n  name: a\n  after: b\n",
        )
        .with_module(
            "b",
            "group: g\nproject: p\nmodule:\n  name: b\n  after: a\n",
        );

    fixture
        .command("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency"));
}

/// Test that a malformed fragment names the offending file
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_build_reports_parse_errors() {
    let fixture = TestFixture::new()
        .with_module("base", descriptors::BASE)
        .with_file("base/hcm-config/broken.yaml", "definitions:\n  bogus: {}\n");

    fixture
        .command("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.yaml"))
        .stderr(predicate::str::contains("unknown definition type 'bogus'"));
}
