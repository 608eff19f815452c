//! Holmes VM Setup Library
//!
//! Provisioning engine for the Holmes VM forensics workstation: the tool
//! catalog, the installer registry and variants, and the step builder and
//! runner with progress, ETA and cancellation.

pub mod calls;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod desktop;
pub mod error;
pub mod events;
pub mod installers;
pub mod logger;
pub mod module_call;
pub mod network;
pub mod orchestrator;
pub mod ps_runner;
pub mod shortcuts;
pub mod system;
pub mod ui;

// Re-export main types for convenience
pub use catalog::{
    Category, Diagnostic, InstallerType, ReportSink, Severity, ToolCatalog, ToolManifest, ToolSpec,
};
pub use config::{RunOptions, SetupPaths};
pub use error::HolmesError;
pub use events::{CancelFlag, Observer, RecordingObserver, UiEvent, event_queue};
pub use installers::registry::InstallerRegistry;
pub use installers::{InstallContext, Installer};
pub use logger::{LogLevel, Logger};
pub use module_call::ModuleCall;
pub use network::{HttpProbe, Reachability, ReachabilityProbe};
pub use orchestrator::{Orchestrator, RunReport, RunState, RunStatus, Step, StepOutcome};
pub use ps_runner::{PowerShellHost, Shell, ShellOutput};

// Desktop grouping
pub use desktop::{GroupIndex, tokenize, tool_tokens};
