//! Holmes VM Setup - entry point
//!
//! Loads the tool manifest, builds the step list for the selected tools and
//! runs it behind either the live progress view or plain console output.
//!
//! Exit codes: 0 when the run completes (individual step failures included),
//! 2 when the manifest fails validation, 1 for any other startup error.

use anyhow::{Context, Result};
use holmes_setup::catalog::{Diagnostic, ToolCatalog};
use holmes_setup::cli::{Cli, Commands};
use holmes_setup::config::SetupPaths;
use holmes_setup::error::HolmesError;
use holmes_setup::events::CancelFlag;
use holmes_setup::installers::InstallContext;
use holmes_setup::logger::Logger;
use holmes_setup::network::HttpProbe;
use holmes_setup::orchestrator::{Orchestrator, RunStatus};
use holmes_setup::ps_runner::PowerShellHost;
use holmes_setup::{system, ui};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_STARTUP: u8 = 1;
const EXIT_INVALID_MANIFEST: u8 = 2;

/// Initialize tracing. `RUST_LOG` overrides the default filter.
///
/// In console mode the run log is mirrored here at `info`. The progress view
/// renders log lines itself, so tracing stays quiet there.
fn init_tracing(cli: &Cli) {
    let default = if cli.no_gui || cli.command() != Commands::Run {
        "info"
    } else {
        "off"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(&cli);
    debug!("CLI arguments parsed: {:?}", cli);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("✗ {:#}", e);
            ExitCode::from(EXIT_STARTUP)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let mut paths = SetupPaths::discover(cli.repo_dir.as_deref())?;
    if let Some(ref manifest) = cli.config {
        paths = paths.with_manifest(manifest);
    }
    if let Some(ref desktop) = cli.desktop_dir {
        paths = paths.with_desktop(desktop);
    }
    debug!("Using paths: {:?}", paths);

    let catalog = match ToolCatalog::load_or_empty(&paths.manifest_path) {
        Ok(catalog) => catalog,
        Err(e @ HolmesError::Parse(_)) => {
            eprintln!("✗ {}", e);
            return Ok(ExitCode::from(EXIT_INVALID_MANIFEST));
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to load tool manifest")),
    };

    match cli.command() {
        Commands::List => {
            list_catalog(&catalog);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => Ok(validate_catalog(&catalog, &paths)),
        Commands::Run => run_setup(cli, paths, catalog),
    }
}

fn list_catalog(catalog: &ToolCatalog) {
    for category in catalog.categories() {
        println!("{}", category.display_name());
        for tool in &category.items {
            let marker = if tool.default { "*" } else { " " };
            println!("  [{}] {:<20} {}", marker, tool.id, tool.display_name());
        }
    }
    println!();
    println!("* = installed when no --select is given");
}

fn validate_catalog(catalog: &ToolCatalog, paths: &SetupPaths) -> ExitCode {
    info!("Validating tool manifest: {}", paths.manifest_path.display());
    let mut findings: Vec<Diagnostic> = Vec::new();
    let outcome = catalog.ensure_valid(&mut findings);
    for finding in &findings {
        println!("{}", finding);
    }
    match outcome {
        Ok(()) => {
            println!(
                "✓ Tool manifest is valid ({} tools, {} warnings)",
                catalog.tools().count(),
                findings.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            ExitCode::from(EXIT_INVALID_MANIFEST)
        }
    }
}

fn run_setup(cli: &Cli, paths: SetupPaths, catalog: ToolCatalog) -> Result<ExitCode> {
    let options = cli.run_options();
    let shell = Arc::new(PowerShellHost::new().with_timeout(options.timeout));

    if options.what_if {
        info!("What-if mode: skipping the Windows/Administrator check");
    } else {
        system::assert_platform(shell.as_ref())?;
    }

    let logger = Arc::new(
        Logger::create(&options.log_dir)
            .with_context(|| format!("Cannot create log in {}", options.log_dir.display()))?,
    );
    if let Some(path) = logger.path() {
        logger.info(format!("Logging to {}", path.display()));
    }

    let mut sink: &Logger = &logger;
    if let Err(e) = catalog.ensure_valid(&mut sink) {
        logger.error(format!("{}; nothing was installed.", e));
        return Ok(ExitCode::from(EXIT_INVALID_MANIFEST));
    }

    let selection = cli.selection().unwrap_or_else(|| catalog.default_ids());
    logger.info(format!("Selected: {}", selection.join(", ")));

    let ctx = InstallContext {
        catalog: Arc::new(catalog),
        paths: Arc::new(paths),
        options,
        logger: Arc::clone(&logger),
        shell,
        probe: Arc::new(HttpProbe::new()),
    };
    let orchestrator = Arc::new(Orchestrator::with_builtin(ctx));
    let steps = orchestrator.build_steps_from_selection(selection.as_slice());

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    let report = if cli.no_gui {
        orchestrator.run_steps_console(steps, Some(&cancel))
    } else {
        let stdout = std::io::stdout();
        let styled = stdout.is_terminal();
        ui::run_with_progress(Arc::clone(&orchestrator), steps, cancel, stdout, styled)?
    };

    let verdict = match report.status {
        RunStatus::Cancelled => "cancelled",
        _ => "finished",
    };
    println!(
        "Setup {}: {} succeeded, {} failed.",
        verdict,
        report.succeeded(),
        report.failed()
    );
    if let Some(path) = logger.path() {
        println!("Log: {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}
