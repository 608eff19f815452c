//! Chocolatey calls: `Install-ChocoPackage` and `Ensure-Chocolatey`.

use crate::module_call::{ModuleCall, ps_param};

/// Arguments for `Install-ChocoPackage`.
///
/// `install_args` and `suppress_default_args` are mutually exclusive;
/// explicit install arguments take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallChocoPackageArgs {
    /// Chocolatey package id
    pub name: String,
    /// Pinned version
    pub version: Option<String>,
    /// Reinstall even if present
    pub force_reinstall: bool,
    /// Dry run
    pub what_if: bool,
    /// Raw installer arguments passed through to the package
    pub install_args: Option<String>,
    /// Drop the module's default installer arguments
    pub suppress_default_args: bool,
}

impl ModuleCall for InstallChocoPackageArgs {
    fn function_name(&self) -> &'static str {
        "Install-ChocoPackage"
    }

    fn to_ps_args(&self) -> Vec<String> {
        let mut args = vec![ps_param("Name", &self.name)];
        if let Some(ref version) = self.version {
            args.push(ps_param("Version", version));
        }
        if self.force_reinstall {
            args.push("-ForceReinstall".to_string());
        }
        if self.what_if {
            args.push("-WhatIf".to_string());
        }
        match self.install_args.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => args.push(ps_param("InstallArgs", extra)),
            _ if self.suppress_default_args => args.push("-SuppressDefaultArgs".to_string()),
            _ => {}
        }
        args
    }

    // Pipe away the package object so only errors reach stderr
    fn to_command(&self) -> String {
        format!("{} {} | Out-Null", self.function_name(), self.to_ps_args().join(" "))
    }
}

/// Arguments for `Ensure-Chocolatey` (bootstraps the package manager).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnsureChocolateyArgs;

impl ModuleCall for EnsureChocolateyArgs {
    fn function_name(&self) -> &'static str {
        "Ensure-Chocolatey"
    }

    fn to_ps_args(&self) -> Vec<String> {
        vec![]
    }
}
