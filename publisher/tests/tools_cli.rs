//! Tests for the `run-tests` and `build-image` binaries.

mod common;

use common::TestProject;
use predicates::prelude::*;
use std::fs;

/// # Test Contract
/// By default discovery targets the client suite under `resht/tests` with the
/// project root importable, so `resht/tests/test_client.py` is found.
#[test]
fn run_tests_dry_run_prints_discovery_command() {
    let project = TestProject::new();
    project
        .cmd("run-tests")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[dry-run] python3 -m unittest discover -s resht/tests -p test_*.py -t .\n",
        ));
}

#[test]
fn run_tests_flags_override_configured_discovery() {
    let project = TestProject::new();
    project.write_config("[tests]\nstart_dir = \"tests\"\npattern = \"test_*.py\"\n");
    project
        .cmd("run-tests")
        .args(["-d", "-v", "-p", "test_client.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "python3 -m unittest discover -s tests -p test_client.py -t . -v",
        ));
}

#[cfg(unix)]
#[test]
fn run_tests_failure_exits_one() {
    let project = TestProject::new();
    let runner = project.script("fake-python", "[ \"$1\" = \"--version\" ] && exit 0\nexit 1");
    project.write_config(&format!(
        "[tests.runner]\nprogram = \"{}\"\nargs = [\"-m\", \"unittest\", \"discover\"]\nprobe = [\"--version\"]\n",
        runner.display()
    ));

    project
        .cmd("run-tests")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Tests failed (exit status 1)"));
}

#[test]
fn run_tests_help_exits_zero() {
    let project = TestProject::new();
    project
        .cmd("run-tests")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--start-dir"));
}

/// # Test Contract
/// The default image installs the package from the test index without
/// dependencies and runs the installed command.
#[test]
fn render_default_containerfile() {
    let project = TestProject::new();
    project
        .cmd("build-image")
        .arg("render")
        .assert()
        .success()
        .stdout(
            "FROM python:3\n\
             RUN pip install --no-cache-dir --index-url https://test.pypi.org/simple/ --no-deps resht\n\
             ENTRYPOINT [\"resht\"]\n",
        );
}

#[test]
fn render_with_overrides_to_file() {
    let project = TestProject::new();
    let output = project.join("Containerfile");
    project
        .cmd("build-image")
        .args([
            "render",
            "--index",
            "live",
            "--package-version",
            "0.4.1",
            "--with-deps",
            "-o",
        ])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let contents = fs::read_to_string(output).unwrap();
    assert!(contents.contains("--index-url https://pypi.org/simple/ resht==0.4.1"));
    assert!(!contents.contains("--no-deps"));
}

#[test]
fn render_reads_image_section_from_config() {
    let project = TestProject::new();
    project.write_config("[image]\nbase_image = \"python:3.12-slim\"\nentrypoint = \"resht-shell\"\n");
    project
        .cmd("build-image")
        .arg("render")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("FROM python:3.12-slim\n"))
        .stdout(predicate::str::ends_with("ENTRYPOINT [\"resht-shell\"]\n"));
}

#[test]
fn render_rejects_invalid_definition() {
    let project = TestProject::new();
    project
        .cmd("build-image")
        .args(["render", "--package-version", "1.0 beta"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid image definition"));
}

#[test]
fn render_rejects_entrypoint_breaking_exec_form() {
    let project = TestProject::new();
    project
        .cmd("build-image")
        .args(["render", "--entrypoint", "resht\", \"--debug"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid entrypoint"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn build_dry_run_prints_runtime_command() {
    let project = TestProject::new();
    project
        .cmd("build-image")
        .args(["build", "--runtime", "docker", "-t", "resht:dev", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run] Containerfile: FROM python:3"))
        .stdout(predicate::str::contains(
            "[dry-run] docker build -t resht:dev -f build-context/Containerfile build-context",
        ));
}

#[test]
fn build_dry_run_defaults_tag_from_package() {
    let project = TestProject::new();
    project
        .cmd("build-image")
        .args(["build", "--runtime", "podman", "--package-version", "0.4.1", "-d"])
        .assert()
        .success()
        .stdout(predicate::str::contains("podman build -t resht:0.4.1"));
}

#[test]
fn build_with_uninstalled_runtime_names_remediation() {
    let project = TestProject::new();
    project
        .cmd("build-image")
        .env("PATH", project.join("no-such-bin"))
        .args(["build", "--runtime", "docker", "-t", "resht:dev"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Install Podman or Docker"))
        .stderr(predicate::str::contains("Failed to start").not());
}
