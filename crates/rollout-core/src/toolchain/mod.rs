//! External collaborators the action variants delegate to.
//!
//! Each collaborator is a narrow trait so tests can substitute spies. The
//! shipped implementations live in `process` (shell execution) and
//! `platform` (script/data/publish commands rendered from config templates).

pub mod platform;
pub mod process;

pub use platform::PlatformToolchain;
pub use process::ShellExecutor;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

/// Combined output is capped to this many bytes, keeping the tail.
pub const MAX_OUTPUT: usize = 10 * 1024;

// ---------------------------------------------------------------------------
// ProcessOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// A process that never produced output, e.g. one that failed to spawn.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(-1, String::new(), message)
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout and stderr joined, trimmed, and capped to `MAX_OUTPUT`.
    pub fn combined(&self) -> String {
        let output = if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        };
        cap_output(output.trim())
    }
}

fn cap_output(text: &str) -> String {
    if text.len() <= MAX_OUTPUT {
        return text.to_string();
    }
    let mut start = text.len() - MAX_OUTPUT;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Runs a raw shell command. Never fails: spawn errors and non-zero exits are
/// both reported through `ProcessOutput`.
pub trait ProcessExecutor {
    fn exec(&self, command: &str) -> ProcessOutput;
}

pub trait ScriptRunner {
    fn run_script(&self, path: &Path, target: Option<&str>) -> ProcessOutput;
}

pub trait WorkspaceResolver {
    fn find_workspace_by_name(&self, name: &str) -> Option<PathBuf>;
}

/// Loads a data workspace into the target. Transport problems surface as `Err`.
pub trait DataImporter {
    fn import_data(&self, workspace: &Path, target: Option<&str>) -> Result<ProcessOutput>;
}

pub trait ContentPublisher {
    fn publish(&self, content_name: &str, target: Option<&str>) -> ProcessOutput;
}

// ---------------------------------------------------------------------------
// Toolchain
// ---------------------------------------------------------------------------

/// The full set of collaborators handed to the orchestrator.
#[derive(Clone)]
pub struct Toolchain {
    pub executor: Arc<dyn ProcessExecutor>,
    pub scripts: Arc<dyn ScriptRunner>,
    pub workspaces: Arc<dyn WorkspaceResolver>,
    pub importer: Arc<dyn DataImporter>,
    pub publisher: Arc<dyn ContentPublisher>,
}

impl Toolchain {
    /// Use one value for every collaborator role.
    pub fn uniform<T>(all: Arc<T>) -> Self
    where
        T: ProcessExecutor
            + ScriptRunner
            + WorkspaceResolver
            + DataImporter
            + ContentPublisher
            + 'static,
    {
        Self {
            executor: all.clone(),
            scripts: all.clone(),
            workspaces: all.clone(),
            importer: all.clone(),
            publisher: all,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording collaborator used across the crate's unit tests.

    use super::*;
    use crate::error::RolloutError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct SpyToolchain {
        pub calls: Mutex<Vec<String>>,
        /// Exit codes keyed by command text, script path, workspace path or
        /// content name; anything else exits 0.
        pub exit_codes: HashMap<String, i32>,
        pub workspaces: HashMap<String, PathBuf>,
        pub import_error: Option<String>,
    }

    impl SpyToolchain {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_matching(&self, prefix: &str) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn reply(&self, key: &str, stdout: &str) -> ProcessOutput {
            match self.exit_codes.get(key).copied().unwrap_or(0) {
                0 => ProcessOutput::new(0, stdout, ""),
                code => ProcessOutput::new(code, "", format!("{key} failed with {code}")),
            }
        }
    }

    impl ProcessExecutor for SpyToolchain {
        fn exec(&self, command: &str) -> ProcessOutput {
            self.record(format!("exec:{command}"));
            let code = self.exit_codes.get(command).copied().unwrap_or(0);
            ProcessOutput::new(code, format!("ran {command}"), "")
        }
    }

    impl ScriptRunner for SpyToolchain {
        fn run_script(&self, path: &Path, target: Option<&str>) -> ProcessOutput {
            self.record(format!(
                "script:{}@{}",
                path.display(),
                target.unwrap_or("-")
            ));
            self.reply(&path.display().to_string(), "script ok")
        }
    }

    impl WorkspaceResolver for SpyToolchain {
        fn find_workspace_by_name(&self, name: &str) -> Option<PathBuf> {
            self.workspaces.get(name).cloned()
        }
    }

    impl DataImporter for SpyToolchain {
        fn import_data(&self, workspace: &Path, target: Option<&str>) -> Result<ProcessOutput> {
            self.record(format!(
                "import:{}@{}",
                workspace.display(),
                target.unwrap_or("-")
            ));
            match &self.import_error {
                Some(msg) => Err(RolloutError::Collaborator(msg.clone())),
                None => Ok(self.reply(&workspace.display().to_string(), "imported")),
            }
        }
    }

    impl ContentPublisher for SpyToolchain {
        fn publish(&self, content_name: &str, target: Option<&str>) -> ProcessOutput {
            self.record(format!("publish:{content_name}@{}", target.unwrap_or("-")));
            self.reply(content_name, "published")
        }
    }
}
