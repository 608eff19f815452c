//! PowerShell execution.
//!
//! All collaborator calls (Chocolatey, installer scripts, desktop helpers)
//! end up as a PowerShell statement run through a [`Shell`]. Production code
//! uses [`PowerShellHost`]; tests substitute a recording fake.
//!
//! # Architecture Rule
//!
//! Installers never spawn `powershell.exe` themselves. They build a
//! [`ModuleCall`] (or a script invocation) and hand it to
//! [`run_module_call`] / [`run_script_function`], which take care of
//! importing the helper module and quoting paths.

use crate::module_call::{ModuleCall, ps_quote};
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Output from one PowerShell invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    /// Exit code (None if killed or terminated abnormally)
    pub exit_code: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// The call hit its timeout and was killed
    pub timed_out: bool,
}

impl ShellOutput {
    /// Successful exit with no output
    pub fn ok() -> Self {
        Self {
            exit_code: Some(0),
            ..Default::default()
        }
    }

    /// Failed exit with the given code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stderr: stderr.into(),
            ..Default::default()
        }
    }

    /// Exit code 0 and not timed out
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Exit code for messages (-1 when there is none)
    pub fn code(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }

    /// Trimmed stderr, as quoted in warnings
    pub fn error_text(&self) -> &str {
        self.stderr.trim()
    }
}

/// Something that can run a PowerShell statement.
pub trait Shell: Send + Sync {
    /// Run `code`, optionally inside `cwd`. `Err` means the shell itself
    /// could not be used; a failing statement is an `Ok` with a non-zero code.
    fn run(&self, code: &str, cwd: Option<&Path>) -> Result<ShellOutput>;
}

/// `powershell.exe -NoProfile -ExecutionPolicy Bypass -Command ...`
#[derive(Debug, Clone)]
pub struct PowerShellHost {
    executable: String,
    timeout: Option<Duration>,
}

impl Default for PowerShellHost {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerShellHost {
    pub fn new() -> Self {
        Self {
            executable: "powershell.exe".to_string(),
            timeout: None,
        }
    }

    /// Kill calls that run longer than `timeout` (treated as a failure)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a different PowerShell binary (e.g. `pwsh`)
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long output is still collected once the child is gone. Grandchildren
/// that inherited the pipes may keep them open indefinitely.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let Some(mut reader) = reader else {
            return;
        };
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// Everything received before the pipe closes or `deadline` passes.
fn collect(rx: &Receiver<Vec<u8>>, deadline: Instant) -> String {
    let mut buf = Vec::new();
    while let Ok(chunk) = rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Kill `child` and everything it started.
fn kill_tree(child: &mut Child) {
    let pid = child.id().to_string();
    #[cfg(windows)]
    let _ = Command::new("taskkill")
        .args(["/PID", &pid, "/T", "/F"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    // spawned as a process group leader, so the group id is its pid
    #[cfg(unix)]
    let _ = Command::new("kill")
        .args(["-KILL", "--", &format!("-{}", pid)])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    let _ = child.kill();
    let _ = child.wait();
}

impl Shell for PowerShellHost {
    fn run(&self, code: &str, cwd: Option<&Path>) -> Result<ShellOutput> {
        let command = format!("$ErrorActionPreference='Stop'; {}", code);
        debug!("powershell: {}", command);

        let mut cmd = Command::new(&self.executable);
        cmd.args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", &command])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.executable))?;

        // Drain pipes on their own threads so a chatty child cannot block
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let mut timed_out = false;
        let status = loop {
            if let Some(status) = child.try_wait().context("Failed waiting for PowerShell")? {
                break Some(status);
            }
            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    info!("PowerShell call exceeded {:?}; killing it", limit);
                    kill_tree(&mut child);
                    timed_out = true;
                    break None;
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let deadline = Instant::now() + OUTPUT_GRACE;
        let stdout = collect(&stdout, deadline);
        let mut stderr = collect(&stderr, deadline);
        if timed_out {
            if let Some(limit) = self.timeout {
                stderr.push_str(&format!("timed out after {}s", limit.as_secs()));
            }
        }

        Ok(ShellOutput {
            exit_code: status.and_then(|s| s.code()),
            stdout,
            stderr,
            timed_out,
        })
    }
}

/// Prefix `inner` with an import of the helper module.
pub fn import_common_module_and(inner: &str, module_path: &Path) -> String {
    format!(
        "Import-Module {} -Force -DisableNameChecking; {}",
        ps_quote(&module_path.to_string_lossy()),
        inner
    )
}

/// Dot-source `script` and then run `call`.
pub fn dot_source_and(script: &Path, call: &str) -> String {
    format!(". {}; {}", ps_quote(&script.to_string_lossy()), call)
}

/// Run a typed module call.
pub fn run_module_call<T: ModuleCall + ?Sized>(
    shell: &dyn Shell,
    module_path: &Path,
    call: &T,
    cwd: Option<&Path>,
) -> Result<ShellOutput> {
    let statement = call.to_command();
    info!("run_module_call: {}", statement);
    let code = if call.needs_module() {
        import_common_module_and(&statement, module_path)
    } else {
        statement
    };
    shell.run(&code, cwd)
}

/// Import the helper module, dot-source an installer script, call a function.
pub fn run_script_function(
    shell: &dyn Shell,
    module_path: &Path,
    script: &Path,
    function: &str,
    args: &str,
    cwd: Option<&Path>,
) -> Result<ShellOutput> {
    let call = if args.trim().is_empty() {
        function.to_string()
    } else {
        format!("{} {}", function, args.trim())
    };
    info!("run_script_function: {} -> {}", script.display(), call);
    let code = import_common_module_and(&dot_source_and(script, &call), module_path);
    shell.run(&code, cwd)
}
