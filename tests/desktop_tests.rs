//! Desktop grouping against a real directory tree
//!
//! Builds a throwaway desktop with tempfile, runs the prepare and organize
//! steps through the orchestrator, and checks where every entry ended up.

mod common;

use common::MockShell;
use holmes_setup::desktop::{self, GroupIndex};
use holmes_setup::{LogLevel, Logger, Orchestrator, RunStatus, ToolCatalog};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"").unwrap();
}

// =============================================================================
// Group index
// =============================================================================

#[test]
fn test_runtimes_never_becomes_a_group() {
    let catalog = ToolCatalog::from_json(common::WORKSTATION).unwrap();
    let index = GroupIndex::from_catalog(&catalog);
    let groups: Vec<_> = index.group_names().collect();
    assert_eq!(groups, vec!["Network Analysis", "Databases", "Forensics"]);
    assert!(!index.is_group("Runtimes"));
}

#[test]
fn test_short_names_never_match() {
    let catalog = ToolCatalog::from_json(common::WORKSTATION).unwrap();
    let index = GroupIndex::from_catalog(&catalog);
    assert_eq!(index.best_match("db"), None);
    assert_eq!(index.best_match("wireshark"), Some(("Network Analysis", 9)));
}

// =============================================================================
// Organize
// =============================================================================

#[test]
fn test_organize_moves_top_level_entries() {
    let dir = tempfile::tempdir().unwrap();
    let desk = dir.path();
    let catalog = ToolCatalog::from_json(common::WORKSTATION).unwrap();
    let index = GroupIndex::from_catalog(&catalog);

    touch(&desk.join("Wireshark.lnk"));
    touch(&desk.join("DB Browser (SQLite).lnk"));
    touch(&desk.join("db.lnk"));
    touch(&desk.join("notes.txt"));
    touch(&desk.join("EricZimmerman").join("MFTECmd.exe"));
    touch(&desk.join("Forensics").join("Wireshark.lnk"));

    let logger = Logger::in_memory();
    let summary = desktop::organize(desk, &index, false, &logger).unwrap();

    assert!(desk.join("Network Analysis").join("Wireshark.lnk").exists());
    assert!(desk.join("Databases").join("DB Browser (SQLite).lnk").exists());
    assert!(desk.join("Forensics").join("EricZimmerman").join("MFTECmd.exe").exists());

    // untouched: unmatched shortcut, plain file, group folder contents
    assert!(desk.join("db.lnk").exists());
    assert!(desk.join("notes.txt").exists());
    assert!(desk.join("Forensics").join("Wireshark.lnk").exists());

    assert_eq!(summary.moved.len(), 3);
    assert_eq!(summary.unmatched, 1);
    assert_eq!(summary.conflicts, 0);
}

#[test]
fn test_existing_target_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let desk = dir.path();
    let catalog = ToolCatalog::from_json(common::WORKSTATION).unwrap();
    let index = GroupIndex::from_catalog(&catalog);

    touch(&desk.join("Wireshark.lnk"));
    touch(&desk.join("Network Analysis").join("Wireshark.lnk"));

    let logger = Logger::in_memory();
    let summary = desktop::organize(desk, &index, false, &logger).unwrap();
    assert_eq!(summary.conflicts, 1);
    assert!(summary.moved.is_empty());
    assert!(desk.join("Wireshark.lnk").exists());
}

#[test]
fn test_failed_move_does_not_stop_the_pass() {
    let dir = tempfile::tempdir().unwrap();
    let desk = dir.path();
    let catalog = ToolCatalog::from_json(common::WORKSTATION).unwrap();
    let index = GroupIndex::from_catalog(&catalog);

    // a plain file squatting on a group name blocks that group's folder
    touch(&desk.join("Network Analysis"));
    touch(&desk.join("Wireshark.lnk"));
    touch(&desk.join("DB Browser (SQLite).lnk"));

    let logger = Logger::in_memory();
    let summary = desktop::organize(desk, &index, false, &logger).unwrap();

    assert_eq!(summary.failed, 1);
    assert!(desk.join("Wireshark.lnk").exists());
    assert!(desk.join("Databases").join("DB Browser (SQLite).lnk").exists());
    assert_eq!(
        summary.moved,
        vec![("DB Browser (SQLite).lnk".to_string(), "Databases".to_string())]
    );
    let warns = logger.lines_at(LogLevel::Warn);
    assert_eq!(warns.len(), 1);
    assert!(warns[0].contains("Could not move Wireshark.lnk"));
}

#[test]
fn test_what_if_moves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let desk = dir.path();
    let catalog = ToolCatalog::from_json(common::WORKSTATION).unwrap();
    let index = GroupIndex::from_catalog(&catalog);
    touch(&desk.join("Wireshark.lnk"));

    let logger = Logger::in_memory();
    let summary = desktop::organize(desk, &index, true, &logger).unwrap();
    assert_eq!(summary.moved.len(), 1);
    assert!(desk.join("Wireshark.lnk").exists());
    assert!(!desk.join("Network Analysis").exists());
    assert!(logger.lines().iter().any(|l| l.contains("What-if: would move")));
}

// =============================================================================
// Through the runner
// =============================================================================

#[test]
fn test_prepare_then_organize_steps() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = common::write_manifest(dir.path(), common::WORKSTATION);
    let ctx = common::context(dir.path(), catalog, Arc::new(MockShell::new()));
    let desk = ctx.paths.desktop_dir.clone();
    touch(&desk.join("Wireshark.lnk"));
    touch(&desk.join("Eric Zimmerman Docs.url"));

    let orch = Orchestrator::with_builtin(ctx);
    let steps = orch.build_steps_from_selection(&["desktop_tidy", "desktop_prep"]);
    let report = orch.run_steps_console(steps, None);

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.ledger(), vec![true, true]);
    for group in ["Network Analysis", "Databases", "Forensics"] {
        assert!(desk.join(group).is_dir(), "{} missing", group);
    }
    assert!(!desk.join("Runtimes").exists());
    assert!(desk.join("Network Analysis").join("Wireshark.lnk").exists());
    assert!(desk.join("Forensics").join("Eric Zimmerman Docs.url").exists());
    assert!(orch.logger().lines_at(LogLevel::Error).is_empty());
}

#[test]
fn test_missing_desktop_is_not_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = common::write_manifest(dir.path(), common::WORKSTATION);
    let ctx = common::context(dir.path(), catalog, Arc::new(MockShell::new()));
    let orch = Orchestrator::with_builtin(ctx);

    let steps = orch.build_steps_from_selection(&["desktop_tidy"]);
    let report = orch.run_steps_console(steps, None);
    assert_eq!(report.ledger(), vec![true]);
    assert!(
        orch.logger()
            .lines_at(LogLevel::Warn)
            .iter()
            .any(|l| l.contains("not found"))
    );
}
