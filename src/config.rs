//! Configuration management module
//!
//! Filesystem locations the engine works against and the run-wide options
//! propagated into every installer.

use crate::error::{HolmesError, Result};
use crate::logger::default_log_dir;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment override for the repository root.
pub const REPO_DIR_ENV: &str = "HOLMES_REPO_DIR";

/// Where the wallpaper asset is copied before being applied.
pub const WALLPAPER_DIR: &str = "C:\\Tools\\Wallpapers";

/// Filesystem layout of a Holmes VM checkout plus the user's desktop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupPaths {
    /// Repository root; installer scripts resolve relative to it
    pub repo_dir: PathBuf,
    /// Tool manifest (`config/tools.json`)
    pub manifest_path: PathBuf,
    /// Shared PowerShell helper module
    pub module_path: PathBuf,
    /// Bundled assets (wallpaper)
    pub assets_dir: PathBuf,
    /// User desktop; desktop groups live directly beneath it
    pub desktop_dir: PathBuf,
    /// Wallpaper copy destination directory
    pub wallpaper_dir: PathBuf,
}

impl SetupPaths {
    /// Standard layout below `repo_dir`, using the platform desktop.
    pub fn for_repo(repo_dir: impl Into<PathBuf>) -> Self {
        let repo_dir = repo_dir.into();
        let desktop_dir = dirs::desktop_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join("Desktop")))
            .unwrap_or_else(|| PathBuf::from("Desktop"));
        Self {
            manifest_path: repo_dir.join("config").join("tools.json"),
            module_path: repo_dir.join("modules").join("Holmes.Common.psm1"),
            assets_dir: repo_dir.join("assets"),
            desktop_dir,
            wallpaper_dir: PathBuf::from(WALLPAPER_DIR),
            repo_dir,
        }
    }

    /// Resolve the repository root.
    ///
    /// Order: explicit value, `HOLMES_REPO_DIR`, the directory holding the
    /// executable (if it contains `config/tools.json`), the current directory.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(dir) = explicit {
            return Ok(Self::for_repo(dir));
        }
        if let Some(dir) = std::env::var_os(REPO_DIR_ENV) {
            return Ok(Self::for_repo(PathBuf::from(dir)));
        }
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
        {
            if exe_dir.join("config").join("tools.json").exists() {
                return Ok(Self::for_repo(exe_dir));
            }
        }
        let cwd = std::env::current_dir()
            .map_err(|e| HolmesError::config(format!("cannot determine working directory: {}", e)))?;
        Ok(Self::for_repo(cwd))
    }

    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest_path = manifest.into();
        self
    }

    pub fn with_desktop(mut self, desktop: impl Into<PathBuf>) -> Self {
        self.desktop_dir = desktop.into();
        self
    }

    pub fn with_wallpaper_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.wallpaper_dir = dir.into();
        self
    }

    /// Bundled wallpaper image
    pub fn wallpaper_asset(&self) -> PathBuf {
        self.assets_dir.join("wallpaper.jpg")
    }

    /// Installed wallpaper location
    pub fn wallpaper_dest(&self) -> PathBuf {
        self.wallpaper_dir.join("holmes-wallpaper.jpg")
    }

    /// Installer script path, relative paths resolved against the repo root
    pub fn resolve_script(&self, script_path: &str) -> PathBuf {
        let p = Path::new(script_path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.repo_dir.join(p)
        }
    }
}

/// Run-wide options (from the command line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Dry run: pass `-WhatIf` to collaborators, skip local mutations
    pub what_if: bool,
    /// Reinstall packages even if present
    pub force_reinstall: bool,
    /// Log directory (also handed to the EZ Tools installer)
    pub log_dir: PathBuf,
    /// Upper bound for each collaborator call
    pub timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            what_if: false,
            force_reinstall: false,
            log_dir: default_log_dir(),
            timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout() {
        let paths = SetupPaths::for_repo("/opt/holmes");
        assert_eq!(paths.manifest_path, PathBuf::from("/opt/holmes/config/tools.json"));
        assert_eq!(
            paths.module_path,
            PathBuf::from("/opt/holmes/modules/Holmes.Common.psm1")
        );
        assert_eq!(
            paths.wallpaper_asset(),
            PathBuf::from("/opt/holmes/assets/wallpaper.jpg")
        );
    }

    #[test]
    fn test_resolve_script_relative_to_repo() {
        let paths = SetupPaths::for_repo("/opt/holmes");
        assert_eq!(
            paths.resolve_script("installers/install-eztools.ps1"),
            PathBuf::from("/opt/holmes/installers/install-eztools.ps1")
        );
    }

    #[test]
    fn test_explicit_repo_dir_wins() {
        let paths = SetupPaths::discover(Some(Path::new("/srv/holmes"))).unwrap();
        assert_eq!(paths.repo_dir, PathBuf::from("/srv/holmes"));
    }

    #[test]
    fn test_builder_overrides() {
        let paths = SetupPaths::for_repo("/r")
            .with_desktop("/home/u/Desktop")
            .with_manifest("/etc/tools.json");
        assert_eq!(paths.desktop_dir, PathBuf::from("/home/u/Desktop"));
        assert_eq!(paths.manifest_path, PathBuf::from("/etc/tools.json"));
    }
}
