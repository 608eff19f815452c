//! Desktop grouping.
//!
//! Every tool with a desktop group contributes a token set (explicit
//! `desktop_keywords`, else words derived from its name and id). Tokens are
//! merged per group. A desktop entry belongs to the group whose tokens cover
//! the most characters of its lower-cased name, provided that score reaches
//! [`MATCH_THRESHOLD`]. Ties keep the group seen first.

use crate::catalog::{ToolCatalog, ToolSpec};
use crate::logger::Logger;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Words too generic to identify a tool.
pub const STOP_WORDS: &[&str] = &[
    "tool", "tools", "suite", "viewer", "browser", "runtime", "desktop", "for", "the", "and",
    "with", "app",
];

/// Shorter tokens are discarded.
pub const MIN_TOKEN_LEN: usize = 3;

/// Minimum score for an entry to be moved.
pub const MATCH_THRESHOLD: usize = 4;

/// Shortcut file extensions considered by the organizer.
pub const SHORTCUT_EXTENSIONS: &[&str] = &["lnk", "url"];

fn strip_parenthesized(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => {
                depth -= 1;
                // keep words on either side apart
                out.push(' ');
            }
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn push_unique(tokens: &mut Vec<String>, seen: &mut HashSet<String>, token: String) {
    if seen.insert(token.clone()) {
        tokens.push(token);
    }
}

/// Lower-cased word tokens of `text`, minus short words and stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut seen = HashSet::new();
    for word in strip_parenthesized(text).split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.chars().count() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(&word.as_str()) {
            push_unique(&mut tokens, &mut seen, word);
        }
    }
    tokens
}

/// Token set for one tool.
///
/// Explicit keywords are used as given (lower-cased, short ones dropped).
/// Otherwise name tokens come first, then id tokens.
pub fn tool_tokens(spec: &ToolSpec) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut seen = HashSet::new();

    if !spec.desktop_keywords.is_empty() {
        for keyword in &spec.desktop_keywords {
            let keyword = keyword.trim().to_lowercase();
            if keyword.chars().count() >= MIN_TOKEN_LEN {
                push_unique(&mut tokens, &mut seen, keyword);
            }
        }
        return tokens;
    }

    for token in tokenize(&spec.name).into_iter().chain(tokenize(&spec.id)) {
        push_unique(&mut tokens, &mut seen, token);
    }
    tokens
}

/// `.lnk` / `.url` file name
pub fn is_shortcut_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SHORTCUT_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
}

/// Lower-cased name an entry is scored on: the stem for shortcut files,
/// the full name for everything else.
pub fn match_key(name: &str, is_dir: bool) -> String {
    if !is_dir && is_shortcut_name(name) {
        if let Some(stem) = Path::new(name).file_stem() {
            return stem.to_string_lossy().to_lowercase();
        }
    }
    name.to_lowercase()
}

/// Groups and their merged tokens, in first-seen manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupIndex {
    groups: Vec<(String, Vec<String>)>,
}

impl GroupIndex {
    /// Every non-runtimes desktop group in the catalog
    pub fn from_catalog(catalog: &ToolCatalog) -> Self {
        Self::from_tools(catalog.tools())
    }

    pub fn from_tools<'a>(tools: impl IntoIterator<Item = &'a ToolSpec>) -> Self {
        let mut index = Self::default();
        for tool in tools {
            let Some(group) = tool.shortcut_group() else {
                continue;
            };
            let tokens = tool_tokens(tool);
            match index.groups.iter_mut().find(|(name, _)| name == group) {
                Some((_, existing)) => {
                    for token in tokens {
                        if !existing.contains(&token) {
                            existing.push(token);
                        }
                    }
                }
                None => index.groups.push((group.to_string(), tokens)),
            }
        }
        index
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    pub fn tokens(&self, group: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, tokens)| tokens.as_slice())
    }

    /// Whether `name` is one of the group folders (case-insensitive)
    pub fn is_group(&self, name: &str) -> bool {
        self.groups.iter().any(|(g, _)| g.eq_ignore_ascii_case(name))
    }

    /// Sum of the lengths of `group`'s tokens found in `key`
    pub fn score(tokens: &[String], key: &str) -> usize {
        tokens
            .iter()
            .filter(|t| key.contains(t.as_str()))
            .map(|t| t.chars().count())
            .sum()
    }

    /// Best group for an already lower-cased key, if it clears the threshold
    pub fn best_match(&self, key: &str) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (group, tokens) in &self.groups {
            let score = Self::score(tokens, key);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((group.as_str(), score));
            }
        }
        best.filter(|&(_, score)| score >= MATCH_THRESHOLD)
    }
}

/// Folder a tool's shortcuts go into; `Bundles` tools get a subfolder each.
pub fn group_dir(desktop: &Path, spec: &ToolSpec) -> Option<PathBuf> {
    let group = spec.shortcut_group()?;
    let dir = desktop.join(group);
    if group.eq_ignore_ascii_case(crate::installers::powershell::BUNDLES_GROUP) {
        Some(dir.join(spec.display_name()))
    } else {
        Some(dir)
    }
}

/// Create one folder per group. Returns how many were newly created.
pub fn prepare_groups(
    desktop: &Path,
    index: &GroupIndex,
    what_if: bool,
    logger: &Logger,
) -> io::Result<usize> {
    let mut created = 0;
    for group in index.group_names() {
        let dir = desktop.join(group);
        if dir.is_dir() {
            continue;
        }
        if what_if {
            logger.info(format!("What-if: would create {}", dir.display()));
        } else {
            std::fs::create_dir_all(&dir)?;
            logger.info(format!("Created desktop group {}", dir.display()));
        }
        created += 1;
    }
    Ok(created)
}

/// What one organize pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeSummary {
    /// (entry, group) pairs moved, in desktop listing order
    pub moved: Vec<(String, String)>,
    /// Entries matched but left alone because the target existed
    pub conflicts: usize,
    /// Entries with no group clearing the threshold
    pub unmatched: usize,
    /// Entries whose move failed (logged, pass continued)
    pub failed: usize,
}

/// Move top-level desktop folders and shortcuts into their best group.
///
/// Group folders themselves and plain files are never touched, and nothing
/// below the top level is examined. A failed move is logged and counted;
/// only an unreadable desktop ends the pass early.
pub fn organize(
    desktop: &Path,
    index: &GroupIndex,
    what_if: bool,
    logger: &Logger,
) -> io::Result<OrganizeSummary> {
    let mut summary = OrganizeSummary::default();
    if index.is_empty() {
        logger.info("No desktop groups defined; nothing to organize.");
        return Ok(summary);
    }

    let walker = WalkDir::new(desktop)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let name = entry.file_name().to_string_lossy().to_string();
        let is_dir = entry.file_type().is_dir();

        if is_dir && index.is_group(&name) {
            continue;
        }
        if !is_dir && !is_shortcut_name(&name) {
            continue;
        }

        let Some((group, score)) = index.best_match(&match_key(&name, is_dir)) else {
            summary.unmatched += 1;
            continue;
        };

        let target_dir = desktop.join(group);
        let target = target_dir.join(&name);
        if target.exists() {
            logger.info(format!("{} already exists in {}; leaving it", name, group));
            summary.conflicts += 1;
            continue;
        }

        if what_if {
            logger.info(format!("What-if: would move {} -> {} (score {})", name, group, score));
        } else if let Err(e) = std::fs::create_dir_all(&target_dir)
            .and_then(|()| std::fs::rename(entry.path(), &target))
        {
            logger.warn(format!("Could not move {} -> {}: {}", name, group, e));
            summary.failed += 1;
            continue;
        } else {
            logger.info(format!("Moved {} -> {} (score {})", name, group, score));
        }
        summary.moved.push((name, group.to_string()));
    }

    Ok(summary)
}
