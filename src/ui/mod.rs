//! Front ends
//!
//! - `progress` - live view fed from the run's event queue (default)
//! - plain console output is just the logger mirrored through `tracing`,
//!   see [`crate::orchestrator::Orchestrator::run_steps_console`]

pub mod progress;

pub use progress::{POLL_INTERVAL, ProgressView, format_eta, run_with_progress};

use crate::logger::LogLevel;
use crossterm::style::Color;

/// Colors used by the terminal front end.
pub struct Palette;

impl Palette {
    pub const HEADER: Color = Color::Cyan;
    pub const OK: Color = Color::Green;
    pub const FAIL: Color = Color::Red;
    pub const MUTED: Color = Color::DarkGrey;
    pub const BAR: Color = Color::Blue;

    /// Color for a log line of `level`
    pub fn log(level: LogLevel) -> Color {
        match level {
            LogLevel::Info => Color::Reset,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
            LogLevel::Success => Color::Green,
        }
    }
}
