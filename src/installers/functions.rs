//! Function installers: self-contained actions that are neither a
//! Chocolatey package nor an installer script.

use super::{InstallContext, Installer};
use crate::calls::choco::EnsureChocolateyArgs;
use crate::calls::desktop::{
    PinTaskbarItemArgs, SetWallpaperArgs, SetWindowsAppearanceArgs, WallpaperStyle,
};
use crate::calls::python::PipUpgradeArgs;
use crate::catalog::ToolSpec;
use crate::desktop::{self, GroupIndex};
use crate::module_call::ModuleCall;
use crate::network::PROBE_URLS;
use crate::shortcuts::ShortcutMaker;
use crate::system::expand_path;
use std::path::PathBuf;

// ============================================================================
// network_check
// ============================================================================

pub struct NetworkCheckInstaller {
    ctx: InstallContext,
}

impl NetworkCheckInstaller {
    pub fn new(ctx: &InstallContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl Installer for NetworkCheckInstaller {
    fn display_name(&self) -> String {
        "Network connectivity".to_string()
    }

    fn install(&self) -> bool {
        let logger = &self.ctx.logger;
        logger.info("Checking network connectivity...");

        let mut reachable = 0;
        for url in PROBE_URLS {
            let result = self.ctx.probe.probe(url);
            if result.is_reachable() {
                reachable += 1;
                logger.success(format!("Reachable: {}", url));
            } else {
                logger.warn(format!("Not reachable: {} ({})", url, result));
            }
        }

        logger.info(format!(
            "Network connectivity summary: {}/{} reachable",
            reachable,
            PROBE_URLS.len()
        ));
        reachable > 0
    }
}

// ============================================================================
// ensure_choco
// ============================================================================

pub struct EnsureChocoInstaller {
    ctx: InstallContext,
}

impl EnsureChocoInstaller {
    pub fn new(ctx: &InstallContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl Installer for EnsureChocoInstaller {
    fn display_name(&self) -> String {
        "Ensure Chocolatey".to_string()
    }

    fn install(&self) -> bool {
        self.ctx.logger.info("Ensuring Chocolatey...");
        if self.ctx.what_if() {
            self.ctx
                .logger
                .info(format!("What-if: would run {}", EnsureChocolateyArgs.to_command()));
            return true;
        }
        self.ctx.checked_call(
            &EnsureChocolateyArgs,
            "Chocolatey setup",
            "Chocolatey is ready.",
        )
    }
}

// ============================================================================
// upgrade_pip
// ============================================================================

pub struct UpgradePipInstaller {
    ctx: InstallContext,
}

impl UpgradePipInstaller {
    pub fn new(ctx: &InstallContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl Installer for UpgradePipInstaller {
    fn display_name(&self) -> String {
        "Upgrade pip/setuptools/wheel".to_string()
    }

    /// Best effort: non-zero exits are warnings, only an unusable shell fails.
    fn install(&self) -> bool {
        let logger = &self.ctx.logger;
        logger.info("Upgrading pip and core tools...");

        for call in [PipUpgradeArgs::core(), PipUpgradeArgs::environment_tools()] {
            if self.ctx.what_if() {
                logger.info(format!("What-if: would run {}", call.to_command()));
                continue;
            }
            match self.ctx.module_call(&call) {
                Ok(out) if out.success() => {}
                Ok(out) => logger.warn(format!(
                    "{} returned {}: {}",
                    call.to_command(),
                    out.code(),
                    out.error_text()
                )),
                Err(e) => {
                    logger.warn(format!("pip upgrade failed: {:#}", e));
                    return false;
                }
            }
        }

        logger.success("Pip and core tools upgraded.");
        true
    }
}

// ============================================================================
// install_wallpaper
// ============================================================================

pub struct WallpaperInstaller {
    ctx: InstallContext,
}

impl WallpaperInstaller {
    pub fn new(ctx: &InstallContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl Installer for WallpaperInstaller {
    fn display_name(&self) -> String {
        "Copy and apply wallpaper".to_string()
    }

    fn install(&self) -> bool {
        let logger = &self.ctx.logger;
        let src = self.ctx.paths.wallpaper_asset();
        if !src.is_file() {
            logger.warn("Wallpaper not found in assets; skipping.");
            return false;
        }

        let dest = self.ctx.paths.wallpaper_dest();
        let call = SetWallpaperArgs {
            image_path: dest.clone(),
            style: WallpaperStyle::Fill,
        };

        if self.ctx.what_if() {
            logger.info(format!(
                "What-if: would copy {} to {} and run {}",
                src.display(),
                dest.display(),
                call.to_command()
            ));
            return true;
        }

        let copied = std::fs::create_dir_all(&self.ctx.paths.wallpaper_dir)
            .and_then(|_| std::fs::copy(&src, &dest));
        if let Err(e) = copied {
            logger.warn(format!("Failed to copy wallpaper: {}", e));
            return false;
        }
        logger.success(format!("Wallpaper copied to {}", dest.display()));

        logger.info("Applying wallpaper...");
        self.ctx
            .checked_call(&call, "Apply wallpaper", "Wallpaper applied.")
    }
}

// ============================================================================
// set_appearance
// ============================================================================

pub struct AppearanceInstaller {
    ctx: InstallContext,
}

impl AppearanceInstaller {
    pub fn new(ctx: &InstallContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl Installer for AppearanceInstaller {
    fn display_name(&self) -> String {
        "Apply Windows appearance".to_string()
    }

    fn install(&self) -> bool {
        self.ctx.logger.info("Applying Windows appearance...");
        let call = SetWindowsAppearanceArgs::default();
        if self.ctx.what_if() {
            self.ctx
                .logger
                .info(format!("What-if: would run {}", call.to_command()));
            return true;
        }
        self.ctx
            .checked_call(&call, "Appearance setup", "Windows appearance applied.")
    }
}

// ============================================================================
// pin_taskbar
// ============================================================================

/// Pins one executable. Several candidate paths may be given; the pin
/// succeeds if any of them does.
pub struct PinTaskbarInstaller {
    ctx: InstallContext,
    tool_name: String,
    paths: Vec<PathBuf>,
    attempt: bool,
}

impl PinTaskbarInstaller {
    /// Pin `path` (environment variables expanded) for `tool_name`.
    pub fn new(ctx: &InstallContext, tool_name: &str, path: &str) -> Self {
        Self {
            ctx: ctx.clone(),
            tool_name: tool_name.to_string(),
            paths: vec![expand_path(path)],
            attempt: false,
        }
    }

    /// One of several candidates for the same tool
    pub fn attempt(mut self) -> Self {
        self.attempt = true;
        self
    }

    /// Every pin target declared by a tool's `post_install` entries
    pub fn from_spec(ctx: &InstallContext, spec: &ToolSpec) -> Self {
        Self {
            ctx: ctx.clone(),
            tool_name: spec.display_name().to_string(),
            paths: spec
                .post_install
                .iter()
                .flat_map(|a| a.targets())
                .map(expand_path)
                .collect(),
            attempt: false,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Installer for PinTaskbarInstaller {
    fn display_name(&self) -> String {
        if self.attempt {
            format!("Pin {} (attempt)", self.tool_name)
        } else {
            format!("Pin {}", self.tool_name)
        }
    }

    fn install(&self) -> bool {
        let logger = &self.ctx.logger;
        logger.info(format!("Pinning {} to taskbar...", self.tool_name));

        for path in &self.paths {
            let call = PinTaskbarItemArgs { path: path.clone() };
            if self.ctx.what_if() {
                logger.info(format!("What-if: would run {}", call.to_command()));
                return true;
            }
            match self.ctx.module_call(&call) {
                Ok(out) if out.success() => {
                    logger.success(format!("{} pinned (or already pinned).", self.tool_name));
                    return true;
                }
                Ok(out) => logger.info(format!(
                    "Pin-TaskbarItem returned {} for {}",
                    out.code(),
                    path.display()
                )),
                Err(e) => logger.info(format!("Pin-TaskbarItem could not run: {:#}", e)),
            }
        }

        logger.warn(format!("Failed to pin {}.", self.tool_name));
        false
    }
}

// ============================================================================
// prepare_desktop_groups / organize_desktop
// ============================================================================

pub struct PrepareDesktopGroupsInstaller {
    ctx: InstallContext,
}

impl PrepareDesktopGroupsInstaller {
    pub fn new(ctx: &InstallContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl Installer for PrepareDesktopGroupsInstaller {
    fn display_name(&self) -> String {
        "Prepare desktop groups".to_string()
    }

    fn install(&self) -> bool {
        let logger = &self.ctx.logger;
        let index = GroupIndex::from_catalog(&self.ctx.catalog);
        match desktop::prepare_groups(
            &self.ctx.paths.desktop_dir,
            &index,
            self.ctx.what_if(),
            logger,
        ) {
            Ok(created) => {
                logger.success(format!("Desktop groups ready ({} new).", created));
                true
            }
            Err(e) => {
                logger.warn(format!("Could not prepare desktop groups: {}", e));
                false
            }
        }
    }
}

pub struct OrganizeDesktopInstaller {
    ctx: InstallContext,
}

impl OrganizeDesktopInstaller {
    pub fn new(ctx: &InstallContext) -> Self {
        Self { ctx: ctx.clone() }
    }
}

impl Installer for OrganizeDesktopInstaller {
    fn display_name(&self) -> String {
        "Organize desktop".to_string()
    }

    fn install(&self) -> bool {
        let logger = &self.ctx.logger;
        let desktop_dir = &self.ctx.paths.desktop_dir;
        if !desktop_dir.is_dir() {
            logger.warn(format!(
                "Desktop folder {} not found; skipping.",
                desktop_dir.display()
            ));
            return true;
        }

        let index = GroupIndex::from_catalog(&self.ctx.catalog);
        match desktop::organize(desktop_dir, &index, self.ctx.what_if(), logger) {
            Ok(summary) => {
                if summary.failed > 0 {
                    logger.warn(format!("{} desktop entries could not be moved.", summary.failed));
                }
                logger.success(format!(
                    "Desktop organized: {} moved, {} left in place, {} unmatched.",
                    summary.moved.len(),
                    summary.conflicts,
                    summary.unmatched
                ));
                true
            }
            Err(e) => {
                logger.warn(format!("Desktop organization stopped: {}", e));
                false
            }
        }
    }
}

// ============================================================================
// create_shortcut
// ============================================================================

pub struct CreateShortcutInstaller {
    ctx: InstallContext,
    tool: ToolSpec,
}

impl CreateShortcutInstaller {
    pub fn new(ctx: &InstallContext, tool: &ToolSpec) -> Self {
        Self {
            ctx: ctx.clone(),
            tool: tool.clone(),
        }
    }
}

impl Installer for CreateShortcutInstaller {
    fn display_name(&self) -> String {
        format!("Create shortcuts for {}", self.tool.display_name())
    }

    fn install(&self) -> bool {
        ShortcutMaker::new(&self.ctx, &self.tool).create()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installers::test_support::{ScriptedShell, context};
    use crate::logger::LogLevel;
    use crate::network::{Reachability, StaticProbe};
    use crate::ps_runner::ShellOutput;
    use std::sync::Arc;

    #[test]
    fn test_network_check_all_down() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(Arc::new(ScriptedShell::default()), dir.path());
        ctx.probe = Arc::new(StaticProbe(Reachability::Unreachable("timed out".into())));

        assert!(!NetworkCheckInstaller::new(&ctx).install());
        assert_eq!(ctx.logger.lines_at(LogLevel::Warn).len(), PROBE_URLS.len());
    }

    #[test]
    fn test_network_check_probes_even_in_what_if() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(Arc::new(ScriptedShell::default()), dir.path());
        ctx.options.what_if = true;
        assert!(NetworkCheckInstaller::new(&ctx).install());
        assert_eq!(ctx.logger.lines_at(LogLevel::Success).len(), PROBE_URLS.len());
    }

    #[test]
    fn test_ensure_choco_failure_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(ScriptedShell::replying(vec![ShellOutput::failed(5, "denied")]));
        let ctx = context(shell.clone(), dir.path());

        assert!(!EnsureChocoInstaller::new(&ctx).install());
        assert_eq!(ctx.logger.lines_at(LogLevel::Warn).len(), 1);
        assert!(shell.statements()[0].ends_with("Ensure-Chocolatey"));
    }

    #[test]
    fn test_upgrade_pip_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(ScriptedShell::replying(vec![
            ShellOutput::failed(1, "no python"),
            ShellOutput::ok(),
        ]));
        let ctx = context(shell.clone(), dir.path());

        assert!(UpgradePipInstaller::new(&ctx).install());
        let statements = shell.statements();
        assert_eq!(statements[0], "python -m pip install -U pip setuptools wheel");
        assert_eq!(statements[1], "python -m pip install -U pipx virtualenv");
    }

    #[test]
    fn test_wallpaper_missing_asset_skips() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(ScriptedShell::default());
        let ctx = context(shell.clone(), dir.path());

        assert!(!WallpaperInstaller::new(&ctx).install());
        assert!(shell.statements().is_empty());
    }

    #[test]
    fn test_wallpaper_copies_then_applies() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(ScriptedShell::default());
        let ctx = context(shell.clone(), dir.path());
        std::fs::create_dir_all(&ctx.paths.assets_dir).unwrap();
        std::fs::write(ctx.paths.wallpaper_asset(), b"jpeg").unwrap();

        assert!(WallpaperInstaller::new(&ctx).install());
        assert!(ctx.paths.wallpaper_dest().is_file());
        assert!(shell.statements()[0].contains("Set-Wallpaper -ImagePath"));
        assert!(shell.statements()[0].ends_with("-Style Fill"));
    }

    #[test]
    fn test_pin_any_candidate_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(ScriptedShell::replying(vec![
            ShellOutput::failed(1, "not found"),
            ShellOutput::ok(),
        ]));
        let ctx = context(shell.clone(), dir.path());
        let tool = ToolSpec {
            id: "sqlitebrowser".into(),
            name: "DB Browser".into(),
            post_install: vec![crate::catalog::PostInstallAction {
                kind: "pin_taskbar_multi".into(),
                path: None,
                paths: vec!["C:\\a\\db.exe".into(), "C:\\b\\db.exe".into()],
            }],
            ..Default::default()
        };

        let pin = PinTaskbarInstaller::from_spec(&ctx, &tool);
        assert_eq!(pin.paths().len(), 2);
        assert_eq!(pin.display_name(), "Pin DB Browser");
        assert!(pin.install());
        assert_eq!(shell.statements().len(), 2);
    }

    #[test]
    fn test_pin_failure_is_one_warning() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(ScriptedShell::replying(vec![ShellOutput::failed(1, "")]));
        let ctx = context(shell, dir.path());
        let pin = PinTaskbarInstaller::new(&ctx, "VS Code", "C:\\Code.exe").attempt();

        assert_eq!(pin.display_name(), "Pin VS Code (attempt)");
        assert!(!pin.install());
        assert_eq!(ctx.logger.lines_at(LogLevel::Warn).len(), 1);
    }

    #[test]
    fn test_appearance_what_if_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(ScriptedShell::default());
        let mut ctx = context(shell.clone(), dir.path());
        ctx.options.what_if = true;

        assert!(AppearanceInstaller::new(&ctx).install());
        assert!(shell.statements().is_empty());
    }
}
