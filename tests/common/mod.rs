//! Common test utilities for wsgipack integration tests.
//!
//! Provides `TestEnv`: an isolated service root in a temp directory plus
//! helpers to run the wsgipack binary and to plant fake interpreter
//! scripts in place of Python.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Result of running a wsgipack CLI command
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    /// Combine stdout and stderr
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Isolated service root with CLI execution helpers
pub struct TestEnv {
    pub service_root: TempDir,
    bin: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            service_root: TempDir::new().expect("create temp service root"),
            bin: PathBuf::from(env!("CARGO_BIN_EXE_wsgipack")),
        }
    }

    /// Path relative to the service root
    pub fn path(&self, relative: &str) -> PathBuf {
        self.service_root.path().join(relative)
    }

    /// Write serverless.yml into the service root
    pub fn write_service(&self, yaml: &str) {
        fs::write(self.path("serverless.yml"), yaml).expect("write serverless.yml");
    }

    /// Write an arbitrary file under the service root
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, content).expect("write file");
    }

    /// Plant an executable shell script standing in for the Python
    /// interpreter; returns its absolute path for `pythonBin`.
    #[cfg(unix)]
    pub fn fake_python(&self, script: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = self.path("fake-python");
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write fake python");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("chmod fake python");
        path.display().to_string()
    }

    /// Plant an executable shell script under `bin/` so it wins PATH
    /// lookup when running through [`TestEnv::run_with_path`].
    #[cfg(unix)]
    pub fn fake_tool(&self, name: &str, script: &str) {
        use std::os::unix::fs::PermissionsExt;
        let dir = self.path("bin");
        fs::create_dir_all(&dir).expect("create bin dir");
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write fake tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("chmod fake tool");
    }

    /// Run wsgipack against this service root
    pub fn run(&self, args: &[&str]) -> TestResult {
        self.exec(args, false)
    }

    /// Run wsgipack with the service root's `bin/` prepended to PATH
    #[cfg(unix)]
    pub fn run_with_path(&self, args: &[&str]) -> TestResult {
        self.exec(args, true)
    }

    fn exec(&self, args: &[&str], prepend_bin: bool) -> TestResult {
        let mut command = Command::new(&self.bin);
        command
            .args(args)
            .arg("--service-root")
            .arg(self.service_root.path())
            .current_dir(self.service_root.path());

        if prepend_bin {
            let path = std::env::var_os("PATH").unwrap_or_default();
            let mut entries = vec![self.path("bin")];
            entries.extend(std::env::split_paths(&path));
            command.env("PATH", std::env::join_paths(entries).expect("join PATH"));
        }

        let output = command.output().expect("run wsgipack binary");

        TestResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Assert a service-root entry is a symlink pointing into the staging
    /// tree
    pub fn assert_linked(&self, name: &str, staging_dir: &str) {
        let link = self.path(name);
        let meta = link
            .symlink_metadata()
            .unwrap_or_else(|_| panic!("expected link for '{name}'"));
        assert!(meta.file_type().is_symlink(), "'{name}' is not a symlink");
        assert_eq!(
            fs::read_link(&link).expect("read link"),
            self.path(staging_dir).join(name)
        );
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for entries existing (following symlinks not required)
pub fn entry_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
