//! Type-safe PowerShell module call contracts.
//!
//! Every interaction with the shared helper module (`Holmes.Common.psm1`)
//! goes through a struct implementing [`ModuleCall`]. The struct is the
//! contract: its fields map one-to-one onto the function's parameters, so a
//! renamed flag is a compile error instead of a silent no-op on the VM.
//!
//! # Example
//!
//! ```
//! use holmes_setup::calls::choco::InstallChocoPackageArgs;
//! use holmes_setup::module_call::ModuleCall;
//!
//! let call = InstallChocoPackageArgs {
//!     name: "wireshark".into(),
//!     version: None,
//!     force_reinstall: true,
//!     what_if: false,
//!     install_args: None,
//!     suppress_default_args: false,
//! };
//! assert_eq!(call.to_ps_args(), vec!["-Name 'wireshark'", "-ForceReinstall"]);
//! ```

/// Trait for typed module function invocations.
///
/// # Contract
///
/// - `function_name()`: the exported function (e.g. `Pin-TaskbarItem`).
/// - `to_ps_args()`: arguments exactly as the function's `param()` block
///   expects them, already quoted.
/// - `to_command()`: the full statement handed to PowerShell.
pub trait ModuleCall {
    /// Exported function name.
    fn function_name(&self) -> &'static str;

    /// Arguments in PowerShell syntax (`-Name 'x'`, `-Force`).
    fn to_ps_args(&self) -> Vec<String>;

    /// Statement text. Calls that are not plain function invocations
    /// override this.
    fn to_command(&self) -> String {
        let args = self.to_ps_args();
        if args.is_empty() {
            self.function_name().to_string()
        } else {
            format!("{} {}", self.function_name(), args.join(" "))
        }
    }

    /// Whether the helper module must be imported first.
    fn needs_module(&self) -> bool {
        true
    }
}

/// Quote a value as a PowerShell single-quoted literal.
///
/// Only single quotes need escaping (doubled); everything else, backticks
/// and `$` included, is literal inside single quotes.
pub fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `-Name 'value'`
pub fn ps_param(name: &str, value: &str) -> String {
    format!("-{} {}", name, ps_quote(value))
}
