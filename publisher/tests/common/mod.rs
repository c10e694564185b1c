//! Shared fixtures for the binary tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway project directory with optional stand-in tools
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp project"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Command for `bin` running against this project, isolated from the
    /// caller's `PUBLISH_CONFIG` and `RUST_LOG`
    pub fn cmd(&self, bin: &str) -> Command {
        let mut cmd = Command::cargo_bin(bin).expect("binary is built");
        cmd.env_remove("PUBLISH_CONFIG")
            .env_remove("RUST_LOG")
            .arg("-C")
            .arg(self.path());
        cmd
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.join("publish.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    /// Write an executable shell script under `bin/`
    #[cfg(unix)]
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let bin = self.join("bin");
        fs::create_dir_all(&bin).expect("create bin dir");
        let path = bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
        path
    }

    /// Stand-in build tool writing a wheel and an sdist into `--outdir`
    #[cfg(unix)]
    pub fn fake_build_tool(&self, exit_code: i32) -> PathBuf {
        self.script(
            "fake-build",
            &format!(
                r#"[ "$1" = "--version" ] && exit 0
echo "build $@" >> "$(dirname "$0")/calls.log"
mkdir -p "$2"
touch "$2/resht-0.1.0-py3-none-any.whl" "$2/resht-0.1.0.tar.gz"
exit {exit_code}"#
            ),
        )
    }

    /// Stand-in upload tool recording its arguments
    #[cfg(unix)]
    pub fn fake_upload_tool(&self, exit_code: i32) -> PathBuf {
        self.script(
            "fake-upload",
            &format!(
                r#"[ "$1" = "--version" ] && exit 0
echo "upload $@" >> "$(dirname "$0")/calls.log"
exit {exit_code}"#
            ),
        )
    }

    /// Point the config at the stand-in tools
    #[cfg(unix)]
    pub fn use_fake_tools(&self, build_exit: i32, upload_exit: i32) {
        let build = self.fake_build_tool(build_exit);
        let upload = self.fake_upload_tool(upload_exit);
        self.write_config(&format!(
            "[build]\nprogram = \"{}\"\n\n[upload]\nprogram = \"{}\"\n",
            build.display(),
            upload.display()
        ));
    }

    /// Lines the stand-in tools logged, in call order
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.join("bin/calls.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
