use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway project directory for CLI tests: a configuration file, a
/// migrations directory and, on demand, stub executables standing in for the
/// migration engine or a worker runtime.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp project"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) {
        fs::write(self.root().join("flyrun.conf"), contents).expect("failed to write config");
    }

    pub fn add_migration(&self, name: &str, sql: &str) {
        let dir = self.root().join("migrations");
        fs::create_dir_all(&dir).expect("failed to create migrations dir");
        fs::write(dir.join(name), sql).expect("failed to write migration");
    }

    /// A stub engine executable that records each invocation's argv and then
    /// prints the canned JSON report.
    #[cfg(unix)]
    pub fn stub_engine(&self, report: &str) -> PathBuf {
        let script = format!(
            "#!/bin/sh\necho \"$@\" >> \"{}\"\ncat <<'EOF'\n{}\nEOF\n",
            self.engine_log_path().display(),
            report
        );
        self.write_script("fake-flyway", &script)
    }

    /// A stub engine that records its argv, then fails loudly.
    #[cfg(unix)]
    pub fn broken_stub(&self, name: &str, stderr: &str, code: i32) -> PathBuf {
        let script = format!("#!/bin/sh\necho \"{}\" >&2\nexit {}\n", stderr, code);
        self.write_script(name, &script)
    }

    #[cfg(unix)]
    pub fn write_script(&self, name: &str, contents: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root().join(name);
        fs::write(&path, contents).expect("failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("failed to mark script executable");
        path
    }

    /// A byte-identical copy of the flyrun binary at a different path. It is
    /// not the currently running runtime, so dispatch must go out of process.
    #[cfg(unix)]
    pub fn worker_runtime(&self) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let source = env!("CARGO_BIN_EXE_flyrun");
        let target = self.root().join("flyrun-worker");
        fs::copy(source, &target).expect("failed to copy flyrun binary");
        fs::set_permissions(&target, fs::Permissions::from_mode(0o755))
            .expect("failed to mark worker runtime executable");
        target
    }

    pub fn engine_log_path(&self) -> PathBuf {
        self.root().join("engine-calls.log")
    }

    pub fn engine_was_invoked(&self) -> bool {
        self.engine_log_path().exists()
    }

    pub fn engine_calls(&self) -> Vec<String> {
        match fs::read_to_string(self.engine_log_path()) {
            Ok(contents) => contents.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// A flyrun command rooted at the project, with the ambient FLYRUN_
    /// namespace scrubbed so only the test's own layers apply.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("flyrun").expect("flyrun binary");
        cmd.current_dir(self.root());
        for (name, _) in std::env::vars() {
            if name.starts_with("FLYRUN_") {
                cmd.env_remove(&name);
            }
        }
        cmd
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
