//! Live progress view.
//!
//! The run executes on a worker thread and talks to this view only through
//! the event queue. The main thread wakes every [`POLL_INTERVAL`], drains
//! whatever arrived and renders it. Nothing here ever blocks the run.

use super::Palette;
use crate::events::{CancelFlag, Observer, UiEvent, event_queue};
use crate::orchestrator::{Orchestrator, RunReport, Step};
use anyhow::{Context, Result, anyhow};
use crossterm::style::{Color, Stylize, style};
use std::io::Write;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

/// How often the queue is drained.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const BAR_WIDTH: usize = 30;

/// `42s`, `3m 07s`, `1h 02m`
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

/// Renders queued [`UiEvent`]s as terminal lines.
pub struct ProgressView<W: Write> {
    out: W,
    styled: bool,
    progress: u8,
    eta: Option<Duration>,
    status: String,
    bar_pending: bool,
    closed: bool,
}

impl<W: Write> ProgressView<W> {
    /// Colored output
    pub fn new(out: W) -> Self {
        Self {
            out,
            styled: true,
            progress: 0,
            eta: None,
            status: String::new(),
            bar_pending: false,
            closed: false,
        }
    }

    /// No escape sequences (redirected output, tests)
    pub fn plain(out: W) -> Self {
        Self {
            styled: false,
            ..Self::new(out)
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn eta(&self) -> Option<Duration> {
        self.eta
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// `EnableClose` has been received
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.styled && color != Color::Reset {
            style(text).with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bar(&self) -> String {
        let filled = BAR_WIDTH * self.progress as usize / 100;
        let mut line = format!(
            "[{}{}] {:>3}%",
            "#".repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
            self.progress
        );
        if let Some(eta) = self.eta {
            line.push_str(&format!("  ETA {}", format_eta(eta)));
        }
        line
    }

    /// Render one event.
    pub fn handle(&mut self, event: UiEvent) -> std::io::Result<()> {
        match event {
            UiEvent::Log { level, line } => {
                let text = self.paint(line.trim_end(), Palette::log(level));
                writeln!(self.out, "{}", text)?;
            }
            UiEvent::Status(status) => {
                if status != self.status {
                    if status != "Working" {
                        let text = self.paint(&format!("Status: {}", status), Palette::MUTED);
                        writeln!(self.out, "{}", text)?;
                    }
                    self.status = status;
                }
            }
            UiEvent::ProgressTo(value) => {
                self.progress = value.min(100);
                if self.bar_pending {
                    let text = self.paint(&self.bar(), Palette::BAR);
                    writeln!(self.out, "{}", text)?;
                    self.bar_pending = false;
                }
            }
            UiEvent::StepHeader { index, total, name } => {
                let text = self.paint(&format!("==> [{}/{}] {}", index, total, name), Palette::HEADER);
                writeln!(self.out, "{}", text)?;
            }
            UiEvent::StepResult { index, success } => {
                let (mark, color) = if success {
                    ("ok", Palette::OK)
                } else {
                    ("FAILED", Palette::FAIL)
                };
                let text = self.paint(&format!("    step {} {}", index, mark), color);
                writeln!(self.out, "{}", text)?;
                self.bar_pending = true;
            }
            UiEvent::Eta(eta) => self.eta = eta,
            UiEvent::EnableClose => self.closed = true,
        }
        self.out.flush()
    }

    /// Render everything currently queued. Returns `true` once the run is
    /// over (close enabled, or the sending side is gone).
    pub fn drain(&mut self, rx: &Receiver<UiEvent>) -> std::io::Result<bool> {
        loop {
            match rx.try_recv() {
                Ok(event) => self.handle(event)?,
                Err(TryRecvError::Empty) => return Ok(self.closed),
                Err(TryRecvError::Disconnected) => return Ok(true),
            }
        }
    }
}

/// Run `steps` on a worker thread while this thread renders progress.
///
/// Log lines are forwarded to the view for the duration of the run.
pub fn run_with_progress<W: Write>(
    orchestrator: Arc<Orchestrator>,
    steps: Vec<Step>,
    cancel: CancelFlag,
    out: W,
    styled: bool,
) -> Result<RunReport> {
    let (tx, rx) = event_queue();

    let worker = thread::Builder::new()
        .name("holmes-run".to_string())
        .spawn(move || {
            let logger = Arc::clone(&orchestrator.context().logger);
            logger.attach_observer(Arc::new(tx.clone()));
            let report = orchestrator.run_steps(steps, &tx, &cancel);
            logger.detach_observer();
            tx.enqueue(UiEvent::EnableClose);
            report
        })
        .context("Failed to start the run thread")?;

    let mut view = if styled {
        ProgressView::new(out)
    } else {
        ProgressView::plain(out)
    };
    loop {
        thread::sleep(POLL_INTERVAL);
        if view.drain(&rx).context("Failed to render progress")? {
            break;
        }
    }

    worker
        .join()
        .map_err(|_| anyhow!("The run thread panicked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;

    fn render(events: Vec<UiEvent>) -> (String, u8) {
        let mut view = ProgressView::plain(Vec::new());
        for event in events {
            view.handle(event).unwrap();
        }
        let progress = view.progress();
        (String::from_utf8(view.into_inner()).unwrap(), progress)
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(Duration::from_secs(42)), "42s");
        assert_eq!(format_eta(Duration::from_secs(187)), "3m 07s");
        assert_eq!(format_eta(Duration::from_secs(3720)), "1h 02m");
    }

    #[test]
    fn test_step_rendering() {
        let (text, progress) = render(vec![
            UiEvent::StepHeader {
                index: 1,
                total: 2,
                name: "Install Wireshark".into(),
            },
            UiEvent::ProgressTo(0),
            UiEvent::Log {
                level: LogLevel::Success,
                line: "[10:00:00.000][SUCCESS][Install Wireshark] Install Wireshark completed.\n"
                    .into(),
            },
            UiEvent::StepResult {
                index: 1,
                success: true,
            },
            UiEvent::Eta(Some(Duration::from_secs(5))),
            UiEvent::ProgressTo(50),
        ]);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "==> [1/2] Install Wireshark");
        assert!(lines[1].ends_with("Install Wireshark completed."));
        assert_eq!(lines[2], "    step 1 ok");
        assert!(lines[3].contains(" 50%"));
        assert!(lines[3].ends_with("ETA 5s"));
        assert_eq!(lines.len(), 4);
        assert_eq!(progress, 50);
    }

    #[test]
    fn test_drain_stops_on_enable_close() {
        let (tx, rx) = event_queue();
        tx.enqueue(UiEvent::Status("Working".into()));
        tx.enqueue(UiEvent::EnableClose);

        let mut view = ProgressView::plain(Vec::new());
        assert!(view.drain(&rx).unwrap());
        assert!(view.is_closed());
    }

    #[test]
    fn test_drain_reports_disconnect() {
        let (tx, rx) = event_queue();
        drop(tx);
        let mut view = ProgressView::plain(Vec::new());
        assert!(view.drain(&rx).unwrap());
    }
}
