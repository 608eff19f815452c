use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::RunOptions;
use crate::logger::default_log_dir;

/// Holmes VM Setup - provision a Windows forensics workstation
#[derive(Parser, Debug)]
#[command(name = "holmes-setup")]
#[command(about = "Installs and arranges the Holmes VM forensic toolset")]
#[command(version)]
pub struct Cli {
    /// Plain console output instead of the live progress view
    #[arg(long, global = true)]
    pub no_gui: bool,

    /// Dry-run mode: pass -WhatIf to every installer and skip local changes.
    ///
    /// Network probing still happens so the preview is realistic.
    #[arg(long, global = true)]
    pub what_if: bool,

    /// Reinstall packages even if already present
    #[arg(long, global = true)]
    pub force_reinstall: bool,

    /// Directory for the run log (default: %ProgramData%\HolmesVM\Logs)
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Tool manifest (default: <repo>/config/tools.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Holmes VM repository root (default: $HOLMES_REPO_DIR, then the
    /// executable's directory, then the current directory)
    #[arg(long, global = true)]
    pub repo_dir: Option<PathBuf>,

    /// Desktop folder to organize (default: the user's desktop)
    #[arg(long, global = true)]
    pub desktop_dir: Option<PathBuf>,

    /// Tool ids to install, comma separated (default: the manifest defaults)
    #[arg(long, global = true, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Kill any single installer call running longer than this
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Install the selected tools (default)
    Run,
    /// Validate the tool manifest and exit
    Validate,
    /// List categories and tools
    List,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Subcommand, defaulting to `run`
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            what_if: self.what_if,
            force_reinstall: self.force_reinstall,
            log_dir: self.log_dir.clone().unwrap_or_else(default_log_dir),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Explicit selection, if any
    pub fn selection(&self) -> Option<Vec<String>> {
        let ids: Vec<String> = self
            .select
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        (!ids.is_empty()).then_some(ids)
    }
}
