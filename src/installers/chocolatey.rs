//! Chocolatey package installer.

use super::{InstallContext, Installer};
use crate::calls::choco::InstallChocoPackageArgs;
use crate::catalog::ToolSpec;

pub struct ChocolateyInstaller {
    ctx: InstallContext,
    tool_name: String,
    call: InstallChocoPackageArgs,
}

impl ChocolateyInstaller {
    /// Build from a manifest entry. Version comes from the tool itself or
    /// the manifest-level `versions` map; force/what-if from run options.
    pub fn from_spec(ctx: &InstallContext, spec: &ToolSpec) -> Self {
        let call = InstallChocoPackageArgs {
            name: spec.package_name.clone().unwrap_or_else(|| spec.id.clone()),
            version: ctx.catalog.get_version(&spec.id).map(str::to_string),
            force_reinstall: ctx.options.force_reinstall,
            what_if: ctx.what_if(),
            install_args: spec.install_args.clone(),
            suppress_default_args: spec.suppress_default_args,
        };
        Self {
            ctx: ctx.clone(),
            tool_name: spec.display_name().to_string(),
            call,
        }
    }

    /// The exact call this installer will make
    pub fn call(&self) -> &InstallChocoPackageArgs {
        &self.call
    }
}

impl Installer for ChocolateyInstaller {
    fn display_name(&self) -> String {
        format!("Install {}", self.tool_name)
    }

    fn install(&self) -> bool {
        self.ctx
            .logger
            .info(format!("Installing {} via Chocolatey...", self.tool_name));
        self.ctx.checked_call(
            &self.call,
            &format!("{} install", self.tool_name),
            &format!("{} installed (or already present).", self.tool_name),
        )
    }
}
