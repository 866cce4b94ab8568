use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use super::{ProcessExecutor, ProcessOutput};

const DEFAULT_SHELL: &str = "sh";

/// How long to wait for a killed process to go away before giving up on it.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Runs commands through `<shell> -c` in a fixed working directory.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
    cwd: PathBuf,
    timeout: Option<Duration>,
}

impl ShellExecutor {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            cwd: cwd.into(),
            timeout: None,
        }
    }

    /// Prefer `shell` when it is on PATH; otherwise keep `sh`.
    pub fn with_shell(mut self, shell: Option<&str>) -> Self {
        if let Some(preferred) = shell.filter(|s| !s.trim().is_empty()) {
            match which::which(preferred) {
                Ok(path) => self.shell = path.to_string_lossy().into_owned(),
                Err(_) => warn!(shell = preferred, "configured shell not found, using sh"),
            }
        }
        self
    }

    /// `0` means wait indefinitely.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Like `exec`, but a spawn failure is returned as `Err` so callers that
    /// distinguish transport errors can see it.
    pub fn try_exec(&self, command: &str) -> std::io::Result<ProcessOutput> {
        debug!(shell = %self.shell, command, "spawning");
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let child_pid = child.id();

        // Read stdout/stderr in dedicated threads to avoid pipe-buffer deadlocks
        let (stdout_buf, stdout_thread) = spawn_reader(child.stdout.take());
        let (stderr_buf, stderr_thread) = spawn_reader(child.stderr.take());

        let status = match self.timeout {
            None => child.wait()?,
            Some(timeout) => {
                let (tx, rx) = std::sync::mpsc::channel();
                std::thread::spawn(move || {
                    let _ = tx.send(child.wait());
                });
                match rx.recv_timeout(timeout) {
                    Ok(result) => result?,
                    Err(_) => {
                        kill_process(child_pid);
                        // Readers are not joined: a grandchild may still hold
                        // the pipes open. Take what arrived within the grace.
                        let _ = rx.recv_timeout(KILL_GRACE);
                        let mut stderr = take_buffer(&stderr_buf);
                        if !stderr.is_empty() && !stderr.ends_with('\n') {
                            stderr.push('\n');
                        }
                        stderr.push_str(&format!("timed out after {}s", timeout.as_secs()));
                        return Ok(ProcessOutput::new(-1, take_buffer(&stdout_buf), stderr));
                    }
                }
            }
        };

        let _ = stdout_thread.join();
        let _ = stderr_thread.join();
        Ok(ProcessOutput::new(
            status.code().unwrap_or(-1),
            take_buffer(&stdout_buf),
            take_buffer(&stderr_buf),
        ))
    }
}

type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// Drain `source` into a shared buffer chunk by chunk, so whatever arrived
/// is still readable if the process has to be killed.
fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> (SharedBuffer, JoinHandle<()>) {
    let buf = SharedBuffer::default();
    let sink = Arc::clone(&buf);
    let handle = std::thread::spawn(move || {
        let Some(mut reader) = source else { return };
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => match sink.lock() {
                    Ok(mut b) => b.extend_from_slice(&chunk[..n]),
                    Err(_) => break,
                },
            }
        }
    });
    (buf, handle)
}

fn take_buffer(buf: &SharedBuffer) -> String {
    buf.lock()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default()
}

impl ProcessExecutor for ShellExecutor {
    fn exec(&self, command: &str) -> ProcessOutput {
        self.try_exec(command)
            .unwrap_or_else(|e| ProcessOutput::failure(format!("failed to spawn: {e}")))
    }
}

/// Terminate a process by PID using SIGKILL. Best-effort.
fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> ShellExecutor {
        ShellExecutor::new(std::env::temp_dir())
    }

    #[test]
    fn exec_captures_stdout() {
        let out = executor().exec("echo hello");
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn exec_reports_non_zero_exit() {
        let out = executor().exec("echo boom >&2; exit 3");
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.combined(), "boom");
    }

    #[test]
    fn exec_times_out() {
        let out = executor().with_timeout_secs(1).exec("sleep 5");
        assert!(!out.success());
        assert!(out.combined().contains("timed out after 1s"));
    }

    #[test]
    fn exec_timeout_keeps_partial_output() {
        let out = executor()
            .with_timeout_secs(1)
            .exec("echo started; echo warming up >&2; sleep 5");
        assert_eq!(out.exit_code, -1);
        let combined = out.combined();
        assert!(combined.contains("started"), "{combined}");
        assert!(combined.contains("warming up"), "{combined}");
        assert!(combined.ends_with("timed out after 1s"), "{combined}");
    }

    #[test]
    fn exec_runs_in_working_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let out = ShellExecutor::new(dir.path()).exec("cat marker.txt");
        assert_eq!(out.stdout, "here");
    }

    #[test]
    fn missing_shell_falls_back_to_sh() {
        let exec = executor().with_shell(Some("definitely-not-a-shell-xyz"));
        assert!(exec.exec("true").success());
    }

    #[test]
    fn spawn_failure_is_an_error_for_try_exec() {
        let exec = ShellExecutor::new("/definitely/not/a/dir");
        assert!(exec.try_exec("true").is_err());
        assert_eq!(exec.exec("true").exit_code, -1);
    }
}
