//! Shared fixtures for integration tests.

#![allow(dead_code)]

use holmes_setup::network::StaticProbe;
use holmes_setup::{
    InstallContext, Logger, Reachability, RunOptions, SetupPaths, Shell, ShellOutput, ToolCatalog,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Shell that records every statement and replies from a queue
/// (exit 0 once the queue is empty).
#[derive(Default)]
pub struct MockShell {
    calls: Mutex<Vec<(String, Option<PathBuf>)>>,
    replies: Mutex<Vec<ShellOutput>>,
}

impl MockShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replying(replies: Vec<ShellOutput>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(replies),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }
}

impl Shell for MockShell {
    fn run(&self, code: &str, cwd: Option<&Path>) -> anyhow::Result<ShellOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((code.to_string(), cwd.map(Path::to_path_buf)));
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Ok(ShellOutput::ok())
        } else {
            Ok(replies.remove(0))
        }
    }
}

/// Write `json` as `config/tools.json` under `repo` and load it.
pub fn write_manifest(repo: &Path, json: &str) -> ToolCatalog {
    let path = repo.join("config").join("tools.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, json).unwrap();
    ToolCatalog::load(&path).unwrap()
}

/// Context rooted in a temp repo, with an in-memory logger.
pub fn context(repo: &Path, catalog: ToolCatalog, shell: Arc<MockShell>) -> InstallContext {
    InstallContext {
        catalog: Arc::new(catalog),
        paths: Arc::new(
            SetupPaths::for_repo(repo)
                .with_desktop(repo.join("Desktop"))
                .with_wallpaper_dir(repo.join("Wallpapers")),
        ),
        options: RunOptions {
            log_dir: repo.join("Logs"),
            ..RunOptions::default()
        },
        logger: Arc::new(Logger::in_memory()),
        shell,
        probe: Arc::new(StaticProbe(Reachability::Status(204))),
    }
}

pub const WIRESHARK_ONLY: &str = r#"{
  "categories": [
    {
      "id": "network",
      "name": "Network Analysis",
      "items": [
        { "id": "wireshark", "name": "Wireshark", "installer_type": "chocolatey",
          "package_name": "wireshark", "default": true }
      ]
    }
  ]
}"#;

pub const WORKSTATION: &str = r#"{
  "categories": [
    {
      "id": "setup",
      "name": "Setup",
      "items": [
        { "id": "network", "name": "Network check", "installer_type": "function",
          "installer": "network_check", "default": true },
        { "id": "desktop_prep", "name": "Desktop groups", "installer_type": "function",
          "installer": "prepare_desktop_groups", "default": true },
        { "id": "desktop_tidy", "name": "Desktop tidy", "installer_type": "function",
          "installer": "organize_desktop", "default": true }
      ]
    },
    {
      "id": "analysis",
      "name": "Analysis",
      "items": [
        { "id": "wireshark", "name": "Wireshark", "installer_type": "chocolatey",
          "package_name": "wireshark", "default": true, "desktop_group": "Network Analysis",
          "post_install": [ { "type": "pin_taskbar", "path": "C:\\Program Files\\Wireshark\\Wireshark.exe" } ] },
        { "id": "sqlitebrowser", "name": "DB Browser for SQLite", "installer_type": "chocolatey",
          "package_name": "sqlitebrowser", "desktop_group": "Databases",
          "post_install": [ { "type": "pin_taskbar_multi", "paths": [
            "C:\\Program Files\\DB Browser for SQLite\\DB Browser for SQLite.exe",
            "C:\\Program Files (x86)\\DB Browser for SQLite\\DB Browser for SQLite.exe" ] } ] },
        { "id": "eztools", "name": "Eric Zimmerman Tools (EZ Tools)", "installer_type": "powershell",
          "script_path": "installers/install-eztools.ps1", "function_name": "Install-EZTools",
          "default": true, "desktop_group": "Forensics" },
        { "id": "dotnet", "name": ".NET 6 Desktop Runtime", "installer_type": "chocolatey",
          "package_name": "dotnet-6.0-desktopruntime", "desktop_group": "Runtimes" }
      ]
    }
  ]
}"#;
