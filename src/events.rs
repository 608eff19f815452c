//! Run events and the run/UI thread boundary.
//!
//! The run thread never touches a front end directly. Everything it wants
//! to show goes through an [`Observer`], which for real front ends is the
//! sending half of an `mpsc` channel: a FIFO the UI thread polls on its own
//! schedule. The only other cross-thread state is the [`CancelFlag`].

use crate::logger::LogLevel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Tagged event pushed from the run thread to a front end.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A formatted log line
    Log { level: LogLevel, line: String },
    /// Short status text ("Working", "Done")
    Status(String),
    /// Animate the progress bar toward this percentage (0-100)
    ProgressTo(u8),
    /// A step is about to start
    StepHeader {
        index: usize,
        total: usize,
        name: String,
    },
    /// A step finished
    StepResult { index: usize, success: bool },
    /// Linear estimate of the remaining time, `None` when unknown
    Eta(Option<Duration>),
    /// The run is over; the front end may allow closing
    EnableClose,
}

/// Receiver of run events.
///
/// Implementations must not block the caller for long; the run thread calls
/// this between (and inside) steps.
pub trait Observer: Send + Sync {
    fn enqueue(&self, event: UiEvent);
}

impl Observer for Sender<UiEvent> {
    fn enqueue(&self, event: UiEvent) {
        // Receiver gone means the front end already shut down
        let _ = self.send(event);
    }
}

/// Create the order-preserving event queue shared by a run and its front end.
pub fn event_queue() -> (Sender<UiEvent>, Receiver<UiEvent>) {
    mpsc::channel()
}

/// Observer that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far
    pub fn events(&self) -> Vec<UiEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Every `ProgressTo` value, in order
    pub fn progress_values(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::ProgressTo(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

impl Observer for RecordingObserver {
    fn enqueue(&self, event: UiEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Cooperative cancellation flag, checked by the runner between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect before the next step starts.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
