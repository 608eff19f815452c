//! Host environment checks and path helpers.

use crate::error::{HolmesError, Result};
use crate::ps_runner::Shell;
use std::path::PathBuf;

/// Running on Windows
pub fn is_windows() -> bool {
    cfg!(windows)
}

const ADMIN_PROBE: &str = "$p = New-Object Security.Principal.WindowsPrincipal(\
[Security.Principal.WindowsIdentity]::GetCurrent()); \
if ($p.IsInRole([Security.Principal.WindowsBuiltInRole]::Administrator)) { exit 0 } else { exit 1 }";

/// Whether the current process is elevated.
///
/// Asks PowerShell for the Administrator role; any failure counts as "no".
pub fn is_admin(shell: &dyn Shell) -> bool {
    match shell.run(ADMIN_PROBE, None) {
        Ok(out) => out.success(),
        Err(e) => {
            tracing::debug!("admin probe failed: {:#}", e);
            false
        }
    }
}

/// Fail unless running elevated on Windows.
pub fn assert_platform(shell: &dyn Shell) -> Result<()> {
    if !is_windows() {
        return Err(HolmesError::platform(
            "Holmes VM setup must run on Windows (use --what-if to preview elsewhere)",
        ));
    }
    if !is_admin(shell) {
        return Err(HolmesError::platform("Run as Administrator"));
    }
    Ok(())
}

/// Expand `%NAME%` references from the process environment.
///
/// Unknown variables are left as written, and so is a lone `%`.
pub fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// [`expand_env_vars`] with an explicit lookup.
pub fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                let value = if name.is_empty() || name.contains(char::is_whitespace) {
                    None
                } else {
                    lookup(name)
                };
                match value {
                    Some(value) => {
                        out.push_str(&value);
                        rest = &after[end + 1..];
                    }
                    None => {
                        // Keep the first '%' and rescan from the second one
                        out.push('%');
                        rest = after;
                    }
                }
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// `%VAR%`-expanded path
pub fn expand_path(input: &str) -> PathBuf {
    PathBuf::from(expand_env_vars(input))
}
