//! Function installer registry.
//!
//! Maps installer ids (the `installer` field of function tools) to
//! factories. Registration happens once at startup; the last registration
//! for an id wins.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InstallerRegistry::with_builtin();
//! let installer = registry.resolve("network_check", &ctx, &tool)?;
//! ```

use super::functions::{
    AppearanceInstaller, CreateShortcutInstaller, EnsureChocoInstaller, NetworkCheckInstaller,
    OrganizeDesktopInstaller, PinTaskbarInstaller, PrepareDesktopGroupsInstaller,
    UpgradePipInstaller, WallpaperInstaller,
};
use super::{InstallContext, Installer};
use crate::catalog::ToolSpec;
use std::collections::BTreeMap;
use std::fmt;

/// Builds an installer for one tool.
pub type InstallerFactory =
    Box<dyn Fn(&InstallContext, &ToolSpec) -> Box<dyn Installer> + Send + Sync>;

/// Registered ids of the built-in function installers.
pub mod ids {
    pub const NETWORK_CHECK: &str = "network_check";
    pub const ENSURE_CHOCO: &str = "ensure_choco";
    pub const UPGRADE_PIP: &str = "upgrade_pip";
    pub const INSTALL_WALLPAPER: &str = "install_wallpaper";
    pub const SET_APPEARANCE: &str = "set_appearance";
    pub const PIN_TASKBAR: &str = "pin_taskbar";
    pub const ORGANIZE_DESKTOP: &str = "organize_desktop";
    pub const PREPARE_DESKTOP_GROUPS: &str = "prepare_desktop_groups";
    pub const CREATE_SHORTCUT: &str = "create_shortcut";
}

#[derive(Default)]
pub struct InstallerRegistry {
    factories: BTreeMap<String, InstallerFactory>,
}

impl fmt::Debug for InstallerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallerRegistry")
            .field("installers", &self.list_installers())
            .finish()
    }
}

impl InstallerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; replaces any earlier one for `id`
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn(&InstallContext, &ToolSpec) -> Box<dyn Installer> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
    }

    /// Construct the installer registered as `id`
    pub fn resolve(
        &self,
        id: &str,
        ctx: &InstallContext,
        tool: &ToolSpec,
    ) -> Option<Box<dyn Installer>> {
        self.factories.get(id).map(|factory| factory(ctx, tool))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn list_installers(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Registry with every built-in function installer
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();

        registry.register(ids::NETWORK_CHECK, |ctx, _| {
            Box::new(NetworkCheckInstaller::new(ctx))
        });
        registry.register(ids::ENSURE_CHOCO, |ctx, _| {
            Box::new(EnsureChocoInstaller::new(ctx))
        });
        registry.register(ids::UPGRADE_PIP, |ctx, _| {
            Box::new(UpgradePipInstaller::new(ctx))
        });
        registry.register(ids::INSTALL_WALLPAPER, |ctx, _| {
            Box::new(WallpaperInstaller::new(ctx))
        });
        registry.register(ids::SET_APPEARANCE, |ctx, _| {
            Box::new(AppearanceInstaller::new(ctx))
        });
        registry.register(ids::PIN_TASKBAR, |ctx, tool| {
            Box::new(PinTaskbarInstaller::from_spec(ctx, tool))
        });
        registry.register(ids::ORGANIZE_DESKTOP, |ctx, _| {
            Box::new(OrganizeDesktopInstaller::new(ctx))
        });
        registry.register(ids::PREPARE_DESKTOP_GROUPS, |ctx, _| {
            Box::new(PrepareDesktopGroupsInstaller::new(ctx))
        });
        registry.register(ids::CREATE_SHORTCUT, |ctx, tool| {
            Box::new(CreateShortcutInstaller::new(ctx, tool))
        });

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installers::test_support::{ScriptedShell, context};
    use std::sync::Arc;

    struct Fixed(&'static str);

    impl Installer for Fixed {
        fn display_name(&self) -> String {
            self.0.to_string()
        }

        fn install(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_builtin_ids() {
        let registry = InstallerRegistry::with_builtin();
        assert_eq!(
            registry.list_installers(),
            vec![
                "create_shortcut",
                "ensure_choco",
                "install_wallpaper",
                "network_check",
                "organize_desktop",
                "pin_taskbar",
                "prepare_desktop_groups",
                "set_appearance",
                "upgrade_pip",
            ]
        );
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(Arc::new(ScriptedShell::default()), dir.path());
        let registry = InstallerRegistry::with_builtin();
        assert!(registry.resolve("defrag", &ctx, &ToolSpec::default()).is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(Arc::new(ScriptedShell::default()), dir.path());
        let mut registry = InstallerRegistry::new();
        registry.register("x", |_, _| Box::new(Fixed("first")));
        registry.register("x", |_, _| Box::new(Fixed("second")));

        let installer = registry.resolve("x", &ctx, &ToolSpec::default()).unwrap();
        assert_eq!(installer.display_name(), "second");
        assert_eq!(registry.list_installers().len(), 1);
    }

    #[test]
    fn test_resolved_names() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(Arc::new(ScriptedShell::default()), dir.path());
        let registry = InstallerRegistry::with_builtin();
        let tool = ToolSpec {
            name: "Nmap".into(),
            ..Default::default()
        };
        let name = |id: &str| registry.resolve(id, &ctx, &tool).unwrap().display_name();

        assert_eq!(name(ids::NETWORK_CHECK), "Network connectivity");
        assert_eq!(name(ids::ENSURE_CHOCO), "Ensure Chocolatey");
        assert_eq!(name(ids::UPGRADE_PIP), "Upgrade pip/setuptools/wheel");
        assert_eq!(name(ids::INSTALL_WALLPAPER), "Copy and apply wallpaper");
        assert_eq!(name(ids::SET_APPEARANCE), "Apply Windows appearance");
        assert_eq!(name(ids::PIN_TASKBAR), "Pin Nmap");
        assert_eq!(name(ids::CREATE_SHORTCUT), "Create shortcuts for Nmap");
    }
}
