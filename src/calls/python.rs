//! Python packaging toolchain calls.

use crate::module_call::ModuleCall;

/// `python -m pip install -U <packages>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipUpgradeArgs {
    pub packages: Vec<String>,
}

impl PipUpgradeArgs {
    /// pip itself plus the build basics
    pub fn core() -> Self {
        Self::of(&["pip", "setuptools", "wheel"])
    }

    /// Environment managers used by the Python-based tools
    pub fn environment_tools() -> Self {
        Self::of(&["pipx", "virtualenv"])
    }

    fn of(packages: &[&str]) -> Self {
        Self {
            packages: packages.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ModuleCall for PipUpgradeArgs {
    fn function_name(&self) -> &'static str {
        "python"
    }

    fn to_ps_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-m", "pip", "install", "-U"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(self.packages.iter().cloned());
        args
    }

    fn needs_module(&self) -> bool {
        false
    }
}
