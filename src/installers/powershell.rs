//! PowerShell script installer.
//!
//! Imports the helper module, dot-sources the tool's installer script and
//! calls its entry function with the manifest's flag string plus the
//! arguments injected here (`-LogDir`, `-ShortcutCategory`, `-WhatIf`).

use super::{InstallContext, Installer};
use crate::catalog::ToolSpec;
use crate::config::RunOptions;
use crate::module_call::ps_param;
use crate::ps_runner::run_script_function;
use std::path::PathBuf;

/// Tool id of the Eric Zimmerman tools bundle, which takes a log directory.
pub const EZTOOLS_ID: &str = "eztools";

/// Desktop group whose tools each get their own subfolder.
pub const BUNDLES_GROUP: &str = "Bundles";

pub struct PowerShellInstaller {
    ctx: InstallContext,
    tool_name: String,
    script: PathBuf,
    function: String,
    args: String,
}

// PowerShell parameters are case-insensitive; `-WhatIf:$true` counts too
fn has_flag(args: &str, flag: &str) -> bool {
    let with_value = format!("{}:", flag.to_ascii_lowercase());
    args.split_whitespace().any(|token| {
        token.eq_ignore_ascii_case(flag) || token.to_ascii_lowercase().starts_with(&with_value)
    })
}

fn push_arg(args: &mut String, arg: &str) {
    if !args.is_empty() {
        args.push(' ');
    }
    args.push_str(arg);
}

/// Final flag string handed to the installer function.
pub fn compose_script_args(spec: &ToolSpec, options: &RunOptions) -> String {
    let mut args = spec.args.as_deref().unwrap_or("").trim().to_string();

    if spec.id == EZTOOLS_ID && !has_flag(&args, "-LogDir") {
        push_arg(
            &mut args,
            &ps_param("LogDir", &options.log_dir.to_string_lossy()),
        );
    }

    if let Some(group) = spec.shortcut_group() {
        if !has_flag(&args, "-ShortcutCategory") {
            let category = if group.eq_ignore_ascii_case(BUNDLES_GROUP) {
                format!("{}\\{}", BUNDLES_GROUP, spec.display_name())
            } else {
                group.to_string()
            };
            push_arg(&mut args, &ps_param("ShortcutCategory", &category));
        }
    }

    if options.what_if && !has_flag(&args, "-WhatIf") {
        push_arg(&mut args, "-WhatIf");
    }

    args
}

impl PowerShellInstaller {
    pub fn from_spec(ctx: &InstallContext, spec: &ToolSpec) -> Self {
        Self {
            ctx: ctx.clone(),
            tool_name: spec.display_name().to_string(),
            script: ctx
                .paths
                .resolve_script(spec.script_path.as_deref().unwrap_or_default()),
            function: spec.function_name.clone().unwrap_or_default(),
            args: compose_script_args(spec, &ctx.options),
        }
    }

    pub fn script(&self) -> &std::path::Path {
        &self.script
    }

    pub fn args(&self) -> &str {
        &self.args
    }
}

impl Installer for PowerShellInstaller {
    fn display_name(&self) -> String {
        format!("Install {}", self.tool_name)
    }

    fn install(&self) -> bool {
        let logger = &self.ctx.logger;
        logger.info(format!("Installing {}...", self.tool_name));

        if !self.script.is_file() {
            logger.error(format!("Script not found: {}", self.script.display()));
            return false;
        }

        let result = run_script_function(
            self.ctx.shell.as_ref(),
            &self.ctx.paths.module_path,
            &self.script,
            &self.function,
            &self.args,
            Some(&self.ctx.paths.repo_dir),
        );

        match result {
            Ok(out) if out.success() => {
                logger.success(format!("{} completed.", self.tool_name));
                true
            }
            Ok(out) => {
                logger.warn(format!(
                    "{} returned {}: {}",
                    self.function,
                    out.code(),
                    out.error_text()
                ));
                false
            }
            Err(e) => {
                logger.warn(format!("{} could not run: {:#}", self.function, e));
                false
            }
        }
    }
}
