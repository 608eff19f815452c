//! Desktop shortcut creation.
//!
//! A tool's `shortcut` metadata picks one of four target strategies:
//!
//! | mode             | targets                                                 |
//! |------------------|---------------------------------------------------------|
//! | `exe_candidates` | first existing path from `candidates`                   |
//! | `search_exe`     | first `exe_name` found walking `search_root`            |
//! | `folder_all`     | delegated to `New-ShortcutsFromFolder` for `folder`     |
//! | `eztools`        | every `.exe` across ranked `subfolders` of `root`, first |
//! |                  | occurrence of each file name wins                       |
//!
//! Shortcuts land in the tool's desktop group folder. A missing target is
//! not a failure: the tool may not be installed (yet).

use crate::calls::desktop::{NewShortcutArgs, NewShortcutsFromFolderArgs};
use crate::catalog::{ShortcutMode, ShortcutSpec, ToolSpec};
use crate::desktop::group_dir;
use crate::installers::InstallContext;
use crate::module_call::ModuleCall;
use crate::system::expand_path;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default walk depth for `search_exe`.
pub const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Default walk depth inside each `eztools` subfolder.
pub const DEFAULT_EZTOOLS_DEPTH: usize = 1;

/// First candidate that exists as a file.
pub fn first_existing(candidates: &[String]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|c| expand_path(c))
        .find(|p| p.is_file())
}

/// Walk `root` (up to `max_depth`) for a file named `exe_name`,
/// case-insensitively. Shallower matches win, then file-name order.
pub fn search_exe(root: &Path, exe_name: &str, max_depth: usize) -> Option<PathBuf> {
    WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().eq_ignore_ascii_case(exe_name))
        .min_by_key(|e| e.depth())
        .map(|e| e.into_path())
}

fn is_exe(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("exe"))
}

/// Executables across ranked subfolders of `root`, de-duplicated by
/// lower-cased file name (the highest-ranked subfolder keeps it).
pub fn ranked_executables(root: &Path, subfolders: &[String], max_depth: usize) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    let ranked: Vec<PathBuf> = if subfolders.is_empty() {
        vec![root.to_path_buf()]
    } else {
        subfolders
            .iter()
            .map(|s| match s.trim() {
                "" | "." => root.to_path_buf(),
                sub => root.join(sub),
            })
            .collect()
    };

    for dir in ranked {
        if !dir.is_dir() {
            continue;
        }
        let walker = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(max_depth.max(1))
            .sort_by_file_name();
        for entry in walker.into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() || !is_exe(entry.path()) {
                continue;
            }
            let key = entry.file_name().to_string_lossy().to_lowercase();
            if seen.insert(key) {
                found.push(entry.into_path());
            }
        }
    }
    found
}

fn shortcut_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.lnk", name))
}

/// Creates the shortcuts described by one tool's metadata.
pub struct ShortcutMaker<'a> {
    ctx: &'a InstallContext,
    tool: &'a ToolSpec,
}

impl<'a> ShortcutMaker<'a> {
    pub fn new(ctx: &'a InstallContext, tool: &'a ToolSpec) -> Self {
        Self { ctx, tool }
    }

    /// Create every shortcut for the tool. `false` only when a shortcut
    /// could not be written.
    pub fn create(&self) -> bool {
        let logger = &self.ctx.logger;
        let name = self.tool.display_name();

        let Some(spec) = self.tool.shortcut.as_ref() else {
            logger.info(format!("{} has no shortcut metadata; skipping.", name));
            return true;
        };
        let Some(dest) = group_dir(&self.ctx.paths.desktop_dir, self.tool) else {
            logger.info(format!("{} has no desktop group; skipping shortcuts.", name));
            return true;
        };
        let Some(mode) = spec.mode() else {
            logger.warn(format!("Unknown shortcut mode '{}' for {}", spec.mode, name));
            return false;
        };

        match mode {
            ShortcutMode::ExeCandidates => match first_existing(&spec.candidates) {
                Some(target) => self.write_one(&dest, self.link_name(spec), &target),
                None => self.target_missing(),
            },
            ShortcutMode::SearchExe => {
                let (Some(root), Some(exe)) =
                    (spec.search_root.as_deref(), spec.exe_name.as_deref())
                else {
                    logger.warn(format!(
                        "search_exe shortcut for {} needs search_root and exe_name",
                        name
                    ));
                    return false;
                };
                let depth = spec.max_depth.unwrap_or(DEFAULT_SEARCH_DEPTH);
                match search_exe(&expand_path(root), exe, depth) {
                    Some(target) => self.write_one(&dest, self.link_name(spec), &target),
                    None => self.target_missing(),
                }
            }
            ShortcutMode::FolderAll => self.folder_all(spec, &dest),
            ShortcutMode::Eztools => {
                let Some(root) = spec.root.as_deref() else {
                    logger.warn(format!("eztools shortcut for {} needs root", name));
                    return false;
                };
                let depth = spec.max_depth.unwrap_or(DEFAULT_EZTOOLS_DEPTH);
                let targets = ranked_executables(&expand_path(root), &spec.subfolders, depth);
                if targets.is_empty() {
                    return self.target_missing();
                }
                let mut ok = true;
                for target in targets {
                    let stem = target
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_default();
                    ok &= self.write_one(&dest, stem, &target);
                }
                ok
            }
        }
    }

    fn link_name(&self, spec: &ShortcutSpec) -> String {
        spec.name
            .clone()
            .unwrap_or_else(|| self.tool.display_name().to_string())
    }

    fn target_missing(&self) -> bool {
        self.ctx.logger.info(format!(
            "No executable found for {}; shortcut not created (not installed yet?).",
            self.tool.display_name()
        ));
        true
    }

    fn write_one(&self, dir: &Path, name: String, target: &Path) -> bool {
        let logger = &self.ctx.logger;
        let link = shortcut_file(dir, &name);
        if link.exists() {
            logger.info(format!("Shortcut already present: {}", link.display()));
            return true;
        }
        if self.ctx.what_if() {
            logger.info(format!(
                "What-if: would create {} -> {}",
                link.display(),
                target.display()
            ));
            return true;
        }
        if let Err(e) = std::fs::create_dir_all(dir) {
            logger.warn(format!("Cannot create {}: {}", dir.display(), e));
            return false;
        }
        let call = NewShortcutArgs {
            shortcut_path: link,
            target_path: target.to_path_buf(),
        };
        self.ctx.checked_call(
            &call,
            &format!("Shortcut for {}", name),
            &format!("Shortcut created: {}", name),
        )
    }

    fn folder_all(&self, spec: &ShortcutSpec, dest: &Path) -> bool {
        let Some(folder) = spec.folder.as_deref().map(expand_path) else {
            self.ctx.logger.warn(format!(
                "folder_all shortcut for {} needs folder",
                self.tool.display_name()
            ));
            return false;
        };
        if !folder.is_dir() {
            return self.target_missing();
        }
        let call = NewShortcutsFromFolderArgs {
            folder,
            destination: dest.to_path_buf(),
            filter: spec.filter.clone(),
        };
        if self.ctx.what_if() {
            self.ctx.logger.info(format!("What-if: would run {}", call.to_command()));
            return true;
        }
        self.ctx.checked_call(
            &call,
            "New-ShortcutsFromFolder",
            &format!("Shortcuts created for {}", self.tool.display_name()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installers::test_support::{ScriptedShell, context};
    use std::fs;
    use std::sync::Arc;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"MZ").unwrap();
    }

    #[test]
    fn test_first_existing_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("b.exe");
        touch(&real);
        let candidates = vec![
            dir.path().join("a.exe").to_string_lossy().to_string(),
            real.to_string_lossy().to_string(),
        ];
        assert_eq!(first_existing(&candidates), Some(real));
    }

    #[test]
    fn test_search_exe_prefers_shallow_and_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("deep").join("x").join("Tool.exe"));
        touch(&dir.path().join("top").join("TOOL.EXE"));
        let found = search_exe(dir.path(), "tool.exe", 4).unwrap();
        assert!(found.ends_with("top/TOOL.EXE"));
        assert_eq!(search_exe(dir.path(), "tool.exe", 1), None);
    }

    #[test]
    fn test_ranked_executables_dedupe_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("net6").join("MFTECmd.exe"));
        touch(&root.join("MFTECmd.exe"));
        touch(&root.join("PECmd.exe"));
        touch(&root.join("readme.txt"));

        let subfolders = vec!["net6".to_string(), ".".to_string()];
        let found = ranked_executables(root, &subfolders, 1);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], root.join("net6").join("MFTECmd.exe"));
        assert_eq!(found[1], root.join("PECmd.exe"));
    }

    fn tool_with(shortcut: ShortcutSpec) -> ToolSpec {
        ToolSpec {
            id: "nmap".into(),
            name: "Nmap".into(),
            desktop_group: Some("Network".into()),
            shortcut: Some(shortcut),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_target_is_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let shell = Arc::new(ScriptedShell::default());
        let ctx = context(shell.clone(), dir.path());
        let tool = tool_with(ShortcutSpec {
            mode: "exe_candidates".into(),
            candidates: vec![dir.path().join("nope.exe").to_string_lossy().to_string()],
            ..Default::default()
        });
        assert!(ShortcutMaker::new(&ctx, &tool).create());
        assert!(shell.statements().is_empty());
    }

    #[test]
    fn test_exe_candidate_writes_link_in_group() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("Nmap").join("zenmap.exe");
        touch(&exe);
        let shell = Arc::new(ScriptedShell::default());
        let ctx = context(shell.clone(), dir.path());
        let tool = tool_with(ShortcutSpec {
            mode: "exe_candidates".into(),
            candidates: vec![exe.to_string_lossy().to_string()],
            ..Default::default()
        });

        assert!(ShortcutMaker::new(&ctx, &tool).create());
        let statements = shell.statements();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("WScript.Shell"));
        assert!(statements[0].contains("Nmap.lnk"));
        assert!(dir.path().join("Desktop").join("Network").is_dir());
    }

    #[test]
    fn test_what_if_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("zenmap.exe");
        touch(&exe);
        let shell = Arc::new(ScriptedShell::default());
        let mut ctx = context(shell.clone(), dir.path());
        ctx.options.what_if = true;
        let tool = tool_with(ShortcutSpec {
            mode: "exe_candidates".into(),
            candidates: vec![exe.to_string_lossy().to_string()],
            ..Default::default()
        });

        assert!(ShortcutMaker::new(&ctx, &tool).create());
        assert!(shell.statements().is_empty());
        assert!(!dir.path().join("Desktop").join("Network").exists());
    }

    #[test]
    fn test_unknown_mode_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(Arc::new(ScriptedShell::default()), dir.path());
        let tool = tool_with(ShortcutSpec {
            mode: "magic".into(),
            ..Default::default()
        });
        assert!(!ShortcutMaker::new(&ctx, &tool).create());
    }
}
