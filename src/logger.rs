//! Run log.
//!
//! Every component logs through a shared [`Logger`]. Each call produces one
//! line in the form
//!
//! ```text
//! [HH:MM:SS.mmm][LEVEL][Step Name] message
//! ```
//!
//! (the step tag is omitted outside a step). The line is appended to the
//! per-run log file under a lock, forwarded to the attached observer as a
//! [`UiEvent::Log`], and mirrored to `tracing` for the console.

use crate::catalog::{Diagnostic, ReportSink, Severity};
use crate::error::Result;
use crate::events::{Observer, UiEvent};
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use strum::Display;

/// Log levels understood by the log file and front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

enum LogSink {
    File(File),
    Memory(Vec<String>),
}

/// Thread-safe, leveled run log.
pub struct Logger {
    sink: Mutex<LogSink>,
    path: Option<PathBuf>,
    current_step: Mutex<Option<String>>,
    observer: RwLock<Option<Arc<dyn Observer>>>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").field("path", &self.path).finish()
    }
}

/// Default log directory for this platform.
///
/// Windows: `%ProgramData%\HolmesVM\Logs`. Elsewhere the local data dir.
pub fn default_log_dir() -> PathBuf {
    if cfg!(windows) {
        let program_data =
            std::env::var_os("ProgramData").unwrap_or_else(|| "C:\\ProgramData".into());
        return PathBuf::from(program_data).join("HolmesVM").join("Logs");
    }
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("HolmesVM")
        .join("Logs")
}

/// Format one log line (including the trailing newline).
pub fn format_line(timestamp: &str, level: LogLevel, step: Option<&str>, msg: &str) -> String {
    match step {
        Some(step) => format!("[{}][{}][{}] {}\n", timestamp, level, step, msg),
        None => format!("[{}][{}] {}\n", timestamp, level, msg),
    }
}

impl Logger {
    /// Create a fresh timestamped log file inside `log_dir`.
    pub fn create(log_dir: impl AsRef<Path>) -> Result<Self> {
        let log_dir = log_dir.as_ref();
        std::fs::create_dir_all(log_dir)?;
        let file_name = format!(
            "HolmesVM-setup-{}.log",
            Local::now().format("%Y%m%d-%H%M%S")
        );
        Self::to_file(log_dir.join(file_name))
    }

    /// Append to a specific file.
    pub fn to_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            sink: Mutex::new(LogSink::File(file)),
            path: Some(path.to_path_buf()),
            current_step: Mutex::new(None),
            observer: RwLock::new(None),
        })
    }

    /// Keep lines in memory (tests, dry previews).
    pub fn in_memory() -> Self {
        Self {
            sink: Mutex::new(LogSink::Memory(Vec::new())),
            path: None,
            current_step: Mutex::new(None),
            observer: RwLock::new(None),
        }
    }

    /// Log file path, if file-backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Forward every subsequent line to `observer` as well.
    pub fn attach_observer(&self, observer: Arc<dyn Observer>) {
        *self
            .observer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(observer);
    }

    pub fn detach_observer(&self) {
        *self
            .observer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Tag subsequent lines with a step name.
    pub fn set_current_step(&self, step: impl Into<String>) {
        *self
            .current_step
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(step.into());
    }

    pub fn clear_current_step(&self) {
        *self
            .current_step
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    pub fn current_step(&self) -> Option<String> {
        self.current_step
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Write one line at `level`. Never fails; a broken log file is ignored.
    pub fn log(&self, level: LogLevel, msg: &str) {
        let ts = Local::now().format("%H:%M:%S%.3f").to_string();
        let step = self.current_step();
        let line = format_line(&ts, level, step.as_deref(), msg);

        {
            let mut sink = self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match &mut *sink {
                LogSink::File(file) => {
                    let _ = file.write_all(line.as_bytes());
                }
                LogSink::Memory(lines) => lines.push(line.trim_end().to_string()),
            }
        }

        if let Some(observer) = self
            .observer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
        {
            observer.enqueue(UiEvent::Log {
                level,
                line: line.clone(),
            });
        }

        let step = step.as_deref().unwrap_or("-");
        match level {
            LogLevel::Info => tracing::info!(step, "{}", msg),
            LogLevel::Success => tracing::info!(step, success = true, "{}", msg),
            LogLevel::Warn => tracing::warn!(step, "{}", msg),
            LogLevel::Error => tracing::error!(step, "{}", msg),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Info, msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Warn, msg.as_ref());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Error, msg.as_ref());
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Success, msg.as_ref());
    }

    /// Lines captured by an in-memory logger (empty for file loggers)
    pub fn lines(&self) -> Vec<String> {
        match &*self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) {
            LogSink::Memory(lines) => lines.clone(),
            LogSink::File(_) => Vec::new(),
        }
    }

    /// Captured lines at one level
    pub fn lines_at(&self, level: LogLevel) -> Vec<String> {
        let tag = format!("][{}]", level);
        self.lines()
            .into_iter()
            .filter(|l| l.contains(&tag))
            .collect()
    }
}

impl ReportSink for &Logger {
    fn report(&mut self, diagnostic: Diagnostic) {
        let msg = format!("{}: {}", diagnostic.location, diagnostic.message);
        match diagnostic.severity {
            Severity::Warning => self.warn(msg),
            Severity::Error => self.error(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingObserver;

    #[test]
    fn test_format_line_with_and_without_step() {
        assert_eq!(
            format_line("12:00:01.042", LogLevel::Warn, Some("Install Nmap"), "retrying"),
            "[12:00:01.042][WARN][Install Nmap] retrying\n"
        );
        assert_eq!(
            format_line("12:00:01.042", LogLevel::Success, None, "Setup finished."),
            "[12:00:01.042][SUCCESS] Setup finished.\n"
        );
    }

    #[test]
    fn test_step_context_tags_lines() {
        let logger = Logger::in_memory();
        logger.info("before");
        logger.set_current_step("Install Wireshark");
        logger.info("during");
        logger.clear_current_step();
        logger.info("after");

        let lines = logger.lines();
        assert!(!lines[0].contains("[Install Wireshark]"));
        assert!(lines[1].ends_with("[INFO][Install Wireshark] during"));
        assert!(!lines[2].contains("[Install Wireshark]"));
    }

    #[test]
    fn test_lines_at_filters_by_level() {
        let logger = Logger::in_memory();
        logger.warn("one");
        logger.error("two");
        logger.warn("three");
        assert_eq!(logger.lines_at(LogLevel::Warn).len(), 2);
        assert_eq!(logger.lines_at(LogLevel::Error).len(), 1);
    }

    #[test]
    fn test_observer_receives_log_events() {
        let logger = Logger::in_memory();
        let observer = Arc::new(RecordingObserver::new());
        logger.attach_observer(observer.clone());
        logger.success("done");

        let events = observer.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            UiEvent::Log { level: LogLevel::Success, line } if line.contains("done")
        ));
    }

    #[test]
    fn test_create_writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::create(dir.path().join("Logs")).unwrap();
        logger.info("hello");

        let path = logger.path().unwrap().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("HolmesVM-setup-") && name.ends_with(".log"));

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("[INFO] hello"));
    }

    #[test]
    fn test_report_sink_maps_severity() {
        let logger = Logger::in_memory();
        let mut sink = &logger;
        sink.report(Diagnostic {
            severity: Severity::Error,
            location: "categories[0].items[0]".into(),
            message: "chocolatey tool is missing 'package_name'".into(),
        });
        assert_eq!(logger.lines_at(LogLevel::Error).len(), 1);
    }
}
