//! Tool Catalog
//!
//! Loads the declarative tool manifest (`config/tools.json`) and answers
//! lookups against it. The manifest is read once at startup and is
//! read-only afterwards.
//!
//! # Manifest Format
//!
//! ```json
//! {
//!   "categories": [
//!     {
//!       "id": "network",
//!       "name": "Network Analysis",
//!       "items": [
//!         {
//!           "id": "wireshark",
//!           "name": "Wireshark",
//!           "installer_type": "chocolatey",
//!           "package_name": "wireshark",
//!           "default": true,
//!           "desktop_group": "Network Analysis",
//!           "shortcut": { "mode": "exe_candidates", "candidates": ["%ProgramFiles%\\Wireshark\\Wireshark.exe"] },
//!           "post_install": [ { "type": "pin_taskbar", "path": "%ProgramFiles%\\Wireshark\\Wireshark.exe" } ]
//!         }
//!       ]
//!     }
//!   ],
//!   "versions": { "wireshark": "4.2.5" }
//! }
//! ```
//!
//! Deserialization is deliberately lenient about required fields so that
//! `validate` can report every problem at once instead of failing on the
//! first missing key.

use crate::error::{HolmesError, Result};
use crate::installers::registry::InstallerRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

/// Desktop group that never gets shortcuts or a desktop folder.
pub const RUNTIMES_GROUP: &str = "runtimes";

/// How a tool gets installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum InstallerType {
    /// Chocolatey package via `Install-ChocoPackage`
    Chocolatey,
    /// Dot-sourced PowerShell installer script
    Powershell,
    /// Registered function installer
    Function,
}

/// Post-install action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PostInstallKind {
    /// Pin a single executable
    PinTaskbar,
    /// Try pinning each of several candidate paths
    PinTaskbarMulti,
}

/// Shortcut discovery strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ShortcutMode {
    /// First existing path from an explicit list
    ExeCandidates,
    /// Walk a directory for a named executable
    SearchExe,
    /// One shortcut per executable in a folder
    FolderAll,
    /// Ranked subfolders, de-duplicated by file name
    Eztools,
}

/// Root manifest document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolManifest {
    /// Categories in display order
    pub categories: Vec<Category>,

    /// Manifest-level pinned versions (tool id -> version)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub versions: BTreeMap<String, String>,
}

/// A display group of tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub items: Vec<ToolSpec>,
}

impl Category {
    /// Name for display, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("(unnamed category)")
    }
}

/// A single installable tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Raw installer type; see [`ToolSpec::kind`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_type: Option<String>,

    /// Preselected when no explicit selection is supplied
    #[serde(default)]
    pub default: bool,

    // Chocolatey
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_args: Option<String>,

    #[serde(default)]
    pub suppress_default_args: bool,

    // PowerShell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    /// Raw PowerShell flag string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,

    // Function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer: Option<String>,

    // Desktop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop_group: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub desktop_keywords: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<ShortcutSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_install: Vec<PostInstallAction>,
}

impl ToolSpec {
    /// Parsed installer type, `None` when missing or unknown
    pub fn kind(&self) -> Option<InstallerType> {
        self.installer_type.as_deref()?.parse().ok()
    }

    /// Name for display, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }

    /// Desktop group, unless the tool has none or lives in the runtimes bucket
    pub fn shortcut_group(&self) -> Option<&str> {
        self.desktop_group
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty() && !g.eq_ignore_ascii_case(RUNTIMES_GROUP))
    }
}

/// Shortcut-creation metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortcutSpec {
    /// Raw mode; see [`ShortcutSpec::mode`]
    #[serde(default)]
    pub mode: String,

    /// Shortcut file name (defaults to the tool name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `exe_candidates`: paths tried in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,

    /// `search_exe`: directory to walk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_root: Option<String>,

    /// `search_exe`: executable file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exe_name: Option<String>,

    /// `search_exe` / `eztools`: walk depth limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    /// `folder_all`: folder whose executables get shortcuts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,

    /// `folder_all`: file filter passed to the collaborator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// `eztools`: install root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// `eztools`: subfolders in priority order (`.` means the root itself)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subfolders: Vec<String>,
}

impl ShortcutSpec {
    pub fn mode(&self) -> Option<ShortcutMode> {
        self.mode.parse().ok()
    }
}

/// A post-install action entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostInstallAction {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

impl PostInstallAction {
    pub fn action(&self) -> Option<PostInstallKind> {
        self.kind.parse().ok()
    }

    /// Pin targets for this action, in declaration order
    pub fn targets(&self) -> Vec<&str> {
        match self.action() {
            Some(PostInstallKind::PinTaskbar) => self.path.as_deref().into_iter().collect(),
            Some(PostInstallKind::PinTaskbarMulti) => {
                self.paths.iter().map(String::as_str).collect()
            }
            None => Vec::new(),
        }
    }
}

// ============================================================================
// Validation diagnostics
// ============================================================================

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Severity {
    #[strum(serialize = "warning")]
    Warning,
    #[strum(serialize = "error")]
    Error,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Where in the manifest, e.g. `categories[1].items[0]`
    pub location: String,
    pub message: String,
}

impl Diagnostic {
    fn warning(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            location: location.into(),
            message: message.into(),
        }
    }

    fn error(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.severity, self.location, self.message)
    }
}

/// Receiver of validation diagnostics.
pub trait ReportSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

struct CountingSink<'a, S: ReportSink + ?Sized> {
    inner: &'a mut S,
    errors: usize,
}

impl<S: ReportSink + ?Sized> ReportSink for CountingSink<'_, S> {
    fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.errors += 1;
        }
        self.inner.report(diagnostic);
    }
}

impl ReportSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Read-only view over a loaded manifest.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    manifest: ToolManifest,
    /// tool id -> (category index, item index); first occurrence wins
    index: HashMap<String, (usize, usize)>,
    source: Option<PathBuf>,
}

impl ToolCatalog {
    /// Catalog with zero categories
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap an already-parsed manifest
    pub fn from_manifest(manifest: ToolManifest) -> Self {
        let mut index = HashMap::new();
        for (ci, category) in manifest.categories.iter().enumerate() {
            for (ii, item) in category.items.iter().enumerate() {
                if !item.id.is_empty() {
                    index.entry(item.id.clone()).or_insert((ci, ii));
                }
            }
        }
        Self {
            manifest,
            index,
            source: None,
        }
    }

    /// Parse a manifest from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: ToolManifest = serde_json::from_str(json)?;
        Ok(Self::from_manifest(manifest))
    }

    /// Load a manifest from disk.
    ///
    /// # Errors
    ///
    /// - `ConfigNotFound` if the file does not exist
    /// - `Parse` if it is not a valid manifest
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HolmesError::ConfigNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                HolmesError::Io(e)
            }
        })?;
        let mut catalog = Self::from_json(&content)?;
        catalog.source = Some(path.to_path_buf());
        Ok(catalog)
    }

    /// Load a manifest, treating a missing file as an empty catalog.
    /// Malformed manifests still fail.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Result<Self> {
        match Self::load(path.as_ref()) {
            Err(e) if e.is_not_found() => {
                tracing::warn!("{}; continuing with an empty catalog", e);
                Ok(Self::empty())
            }
            other => other,
        }
    }

    /// File the catalog was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn manifest(&self) -> &ToolManifest {
        &self.manifest
    }

    /// Categories in file order
    pub fn categories(&self) -> &[Category] {
        &self.manifest.categories
    }

    /// All tools in file order
    pub fn tools(&self) -> impl Iterator<Item = &ToolSpec> {
        self.manifest.categories.iter().flat_map(|c| c.items.iter())
    }

    pub fn get_tool(&self, id: &str) -> Option<&ToolSpec> {
        let &(ci, ii) = self.index.get(id)?;
        self.manifest.categories.get(ci)?.items.get(ii)
    }

    /// Ids of every tool marked `default`, in manifest order
    pub fn default_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tools()
            .filter(|t| t.default && !t.id.is_empty())
            .filter(|t| seen.insert(t.id.as_str()))
            .map(|t| t.id.clone())
            .collect()
    }

    /// Every tool id, in manifest order
    pub fn all_ids(&self) -> Vec<String> {
        self.tools()
            .filter(|t| !t.id.is_empty())
            .map(|t| t.id.clone())
            .collect()
    }

    /// Version for a tool: its own `version` field, else the manifest map
    pub fn get_version(&self, id: &str) -> Option<&str> {
        self.get_tool(id)
            .and_then(|t| t.version.as_deref())
            .or_else(|| self.manifest.versions.get(id).map(String::as_str))
            .filter(|v| !v.trim().is_empty())
    }

    /// Validate against the built-in installer registry.
    pub fn validate(&self, sink: &mut dyn ReportSink) -> bool {
        self.validate_with(&InstallerRegistry::with_builtin(), sink)
    }

    /// [`validate`](Self::validate) as a `Result`: `Validation` carries the
    /// error count. Findings still go to `sink`.
    pub fn ensure_valid(&self, sink: &mut dyn ReportSink) -> Result<()> {
        let mut counter = CountingSink { inner: sink, errors: 0 };
        if self.validate(&mut counter) {
            Ok(())
        } else {
            Err(HolmesError::validation(format!(
                "{} error(s) in tool manifest",
                counter.errors
            )))
        }
    }

    /// Walk every category and item, reporting each problem to `sink`.
    ///
    /// Returns `true` iff no errors were reported. Warnings (e.g. a category
    /// without a name) do not fail validation. Never aborts early.
    pub fn validate_with(&self, registry: &InstallerRegistry, sink: &mut dyn ReportSink) -> bool {
        let mut findings = Vec::new();
        let mut seen_ids: HashMap<&str, String> = HashMap::new();

        for (ci, category) in self.manifest.categories.iter().enumerate() {
            let cat_loc = format!("categories[{}]", ci);
            if category.id.as_deref().is_none_or(|s| s.trim().is_empty()) {
                findings.push(Diagnostic::warning(&cat_loc, "category is missing 'id'"));
            }
            if category.name.as_deref().is_none_or(|s| s.trim().is_empty()) {
                findings.push(Diagnostic::warning(&cat_loc, "category is missing 'name'"));
            }

            for (ii, item) in category.items.iter().enumerate() {
                let loc = format!("{}.items[{}]", cat_loc, ii);
                let label = if item.id.is_empty() {
                    loc.clone()
                } else {
                    format!("{} ({})", loc, item.id)
                };

                if item.id.trim().is_empty() {
                    findings.push(Diagnostic::error(&label, "tool is missing 'id'"));
                } else if let Some(first) = seen_ids.get(item.id.as_str()) {
                    findings.push(Diagnostic::error(
                        &label,
                        format!("duplicate tool id '{}' (first defined at {})", item.id, first),
                    ));
                } else {
                    seen_ids.insert(item.id.as_str(), loc.clone());
                }

                if item.name.trim().is_empty() {
                    findings.push(Diagnostic::error(&label, "tool is missing 'name'"));
                }

                findings.extend(validate_installer_fields(item, registry, &label));

                for (pi, action) in item.post_install.iter().enumerate() {
                    let ploc = format!("{}.post_install[{}]", label, pi);
                    findings.extend(validate_post_install(action, &ploc));
                }

                if let Some(ref shortcut) = item.shortcut {
                    findings.extend(validate_shortcut(shortcut, &format!("{}.shortcut", label)));
                }
            }
        }

        for id in self.manifest.versions.keys() {
            if !self.index.contains_key(id) {
                findings.push(Diagnostic::warning(
                    "versions",
                    format!("version pinned for unknown tool '{}'", id),
                ));
            }
        }

        let errors = findings.iter().filter(|d| d.is_error()).count();
        for finding in findings {
            sink.report(finding);
        }
        errors == 0
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|s| s.trim().is_empty())
}

fn validate_installer_fields(
    item: &ToolSpec,
    registry: &InstallerRegistry,
    loc: &str,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let Some(raw) = item.installer_type.as_deref() else {
        out.push(Diagnostic::error(loc, "tool is missing 'installer_type'"));
        return out;
    };

    match item.kind() {
        None => out.push(Diagnostic::error(
            loc,
            format!(
                "unknown installer_type '{}' (expected chocolatey, powershell or function)",
                raw
            ),
        )),
        Some(InstallerType::Chocolatey) => {
            if is_blank(&item.package_name) {
                out.push(Diagnostic::error(loc, "chocolatey tool is missing 'package_name'"));
            }
        }
        Some(InstallerType::Powershell) => {
            if is_blank(&item.script_path) {
                out.push(Diagnostic::error(loc, "powershell tool is missing 'script_path'"));
            }
            if is_blank(&item.function_name) {
                out.push(Diagnostic::error(loc, "powershell tool is missing 'function_name'"));
            }
        }
        Some(InstallerType::Function) => match item.installer.as_deref() {
            None | Some("") => {
                out.push(Diagnostic::error(loc, "function tool is missing 'installer'"))
            }
            Some(id) if !registry.contains(id) => out.push(Diagnostic::error(
                loc,
                format!("installer '{}' is not registered", id),
            )),
            Some(_) => {}
        },
    }
    out
}

fn validate_post_install(action: &PostInstallAction, loc: &str) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    match action.action() {
        None => out.push(Diagnostic::error(
            loc,
            format!("unknown post_install type '{}'", action.kind),
        )),
        Some(PostInstallKind::PinTaskbar) => {
            if is_blank(&action.path) {
                out.push(Diagnostic::error(loc, "pin_taskbar action is missing 'path'"));
            }
        }
        Some(PostInstallKind::PinTaskbarMulti) => {
            if action.paths.iter().all(|p| p.trim().is_empty()) {
                out.push(Diagnostic::error(loc, "pin_taskbar_multi action has no 'paths'"));
            }
        }
    }
    out
}

// Shortcut metadata only feeds the shortcut step, so problems are warnings.
fn validate_shortcut(shortcut: &ShortcutSpec, loc: &str) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let missing = |field: &str| Diagnostic::warning(loc, format!("shortcut is missing '{}'", field));
    match shortcut.mode() {
        None => out.push(Diagnostic::warning(
            loc,
            format!("unknown shortcut mode '{}'", shortcut.mode),
        )),
        Some(ShortcutMode::ExeCandidates) => {
            if shortcut.candidates.is_empty() {
                out.push(missing("candidates"));
            }
        }
        Some(ShortcutMode::SearchExe) => {
            if is_blank(&shortcut.search_root) {
                out.push(missing("search_root"));
            }
            if is_blank(&shortcut.exe_name) {
                out.push(missing("exe_name"));
            }
        }
        Some(ShortcutMode::FolderAll) => {
            if is_blank(&shortcut.folder) {
                out.push(missing("folder"));
            }
        }
        Some(ShortcutMode::Eztools) => {
            if is_blank(&shortcut.root) {
                out.push(missing("root"));
            }
        }
    }
    out
}
