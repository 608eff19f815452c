//! Installer abstraction.
//!
//! Three variants share one contract:
//!
//! - [`chocolatey::ChocolateyInstaller`]: a Chocolatey package
//! - [`powershell::PowerShellInstaller`]: a dot-sourced installer script
//! - function installers ([`functions`]), resolved by id through the
//!   [`registry::InstallerRegistry`]
//!
//! `install()` never panics and never returns an error: every fallible path
//! is logged and folded into the boolean result.

pub mod chocolatey;
pub mod functions;
pub mod powershell;
pub mod registry;

use crate::catalog::ToolCatalog;
use crate::config::{RunOptions, SetupPaths};
use crate::logger::Logger;
use crate::module_call::ModuleCall;
use crate::network::ReachabilityProbe;
use crate::ps_runner::{Shell, ShellOutput, run_module_call};
use std::fmt;
use std::sync::Arc;

/// Common installer contract.
pub trait Installer: Send {
    /// Step label, e.g. `Install Wireshark`
    fn display_name(&self) -> String;

    /// Perform the action. `true` on success, `false` on a handled failure.
    fn install(&self) -> bool;
}

/// Everything an installer may need, shared by every step of a run.
#[derive(Clone)]
pub struct InstallContext {
    pub catalog: Arc<ToolCatalog>,
    pub paths: Arc<SetupPaths>,
    pub options: RunOptions,
    pub logger: Arc<Logger>,
    pub shell: Arc<dyn Shell>,
    pub probe: Arc<dyn ReachabilityProbe>,
}

impl fmt::Debug for InstallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallContext")
            .field("paths", &self.paths)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl InstallContext {
    pub fn what_if(&self) -> bool {
        self.options.what_if
    }

    /// Run a helper-module call with the module imported.
    pub fn module_call<T: ModuleCall + ?Sized>(&self, call: &T) -> anyhow::Result<ShellOutput> {
        run_module_call(self.shell.as_ref(), &self.paths.module_path, call, None)
    }

    /// Run a module call and fold the outcome into a boolean.
    ///
    /// Non-zero exits and shell failures are logged as warnings prefixed
    /// with `what`; success logs `done` at SUCCESS level.
    pub fn checked_call<T: ModuleCall + ?Sized>(&self, call: &T, what: &str, done: &str) -> bool {
        match self.module_call(call) {
            Ok(out) if out.success() => {
                self.logger.success(done);
                true
            }
            Ok(out) => {
                self.logger
                    .warn(format!("{} returned {}: {}", what, out.code(), out.error_text()));
                false
            }
            Err(e) => {
                self.logger.warn(format!("{} could not run: {:#}", what, e));
                false
            }
        }
    }
}
