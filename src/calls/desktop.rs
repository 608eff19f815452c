//! Desktop and shell-appearance calls.
//!
//! - `PinTaskbarItemArgs` for `Pin-TaskbarItem`
//! - `SetWallpaperArgs` for `Set-Wallpaper`
//! - `SetWindowsAppearanceArgs` for `Set-WindowsAppearance`
//! - `NewShortcutsFromFolderArgs` for `New-ShortcutsFromFolder`
//! - `NewShortcutArgs`: a single `.lnk` written through `WScript.Shell`

use crate::module_call::{ModuleCall, ps_param, ps_quote};
use std::path::{Path, PathBuf};
use strum::Display;

// ============================================================================
// Pin-TaskbarItem
// ============================================================================

/// Arguments for `Pin-TaskbarItem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinTaskbarItemArgs {
    /// Executable to pin
    pub path: PathBuf,
}

impl ModuleCall for PinTaskbarItemArgs {
    fn function_name(&self) -> &'static str {
        "Pin-TaskbarItem"
    }

    fn to_ps_args(&self) -> Vec<String> {
        vec![ps_param("Path", &self.path.to_string_lossy())]
    }
}

// ============================================================================
// Set-Wallpaper
// ============================================================================

/// Wallpaper placement accepted by `Set-Wallpaper -Style`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum WallpaperStyle {
    #[default]
    Fill,
    Fit,
    Stretch,
    Center,
    Tile,
}

/// Arguments for `Set-Wallpaper`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetWallpaperArgs {
    pub image_path: PathBuf,
    pub style: WallpaperStyle,
}

impl ModuleCall for SetWallpaperArgs {
    fn function_name(&self) -> &'static str {
        "Set-Wallpaper"
    }

    fn to_ps_args(&self) -> Vec<String> {
        vec![
            ps_param("ImagePath", &self.image_path.to_string_lossy()),
            format!("-Style {}", self.style),
        ]
    }
}

// ============================================================================
// Set-WindowsAppearance
// ============================================================================

/// Arguments for `Set-WindowsAppearance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetWindowsAppearanceArgs {
    pub dark_mode: bool,
    /// `#RRGGBB`
    pub accent_hex: String,
    pub show_accent_on_taskbar: bool,
    pub enable_transparency: bool,
    pub apply_for_all_users: bool,
    pub restart_explorer: bool,
}

impl Default for SetWindowsAppearanceArgs {
    /// The Holmes VM look: dark, blue accent, transparency, every user.
    fn default() -> Self {
        Self {
            dark_mode: true,
            accent_hex: "#0078D7".to_string(),
            show_accent_on_taskbar: true,
            enable_transparency: true,
            apply_for_all_users: true,
            restart_explorer: true,
        }
    }
}

impl ModuleCall for SetWindowsAppearanceArgs {
    fn function_name(&self) -> &'static str {
        "Set-WindowsAppearance"
    }

    fn to_ps_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.dark_mode {
            args.push("-DarkMode".to_string());
        }
        args.push(ps_param("AccentHex", &self.accent_hex));
        if self.show_accent_on_taskbar {
            args.push("-ShowAccentOnTaskbar".to_string());
        }
        if self.enable_transparency {
            args.push("-EnableTransparency".to_string());
        }
        if self.apply_for_all_users {
            args.push("-ApplyForAllUsers".to_string());
        }
        if self.restart_explorer {
            args.push("-RestartExplorer".to_string());
        }
        args
    }
}

// ============================================================================
// New-ShortcutsFromFolder
// ============================================================================

/// Arguments for `New-ShortcutsFromFolder` (bulk shortcut creation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShortcutsFromFolderArgs {
    /// Folder scanned for executables
    pub folder: PathBuf,
    /// Where the shortcuts go
    pub destination: PathBuf,
    /// File filter, e.g. `*.exe`
    pub filter: Option<String>,
}

impl ModuleCall for NewShortcutsFromFolderArgs {
    fn function_name(&self) -> &'static str {
        "New-ShortcutsFromFolder"
    }

    fn to_ps_args(&self) -> Vec<String> {
        let mut args = vec![
            ps_param("Folder", &self.folder.to_string_lossy()),
            ps_param("Destination", &self.destination.to_string_lossy()),
        ];
        if let Some(ref filter) = self.filter {
            args.push(ps_param("Filter", filter));
        }
        args
    }
}

// ============================================================================
// Single shortcut
// ============================================================================

/// One `.lnk` file pointing at `target`. Written inline through the
/// `WScript.Shell` COM object; the helper module is not needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShortcutArgs {
    /// Full path of the `.lnk` file to write
    pub shortcut_path: PathBuf,
    /// Executable the shortcut launches
    pub target_path: PathBuf,
}

impl NewShortcutArgs {
    fn working_dir(&self) -> &Path {
        self.target_path.parent().unwrap_or(Path::new(""))
    }
}

impl ModuleCall for NewShortcutArgs {
    fn function_name(&self) -> &'static str {
        "WScript.Shell.CreateShortcut"
    }

    fn to_ps_args(&self) -> Vec<String> {
        vec![
            ps_quote(&self.shortcut_path.to_string_lossy()),
            ps_quote(&self.target_path.to_string_lossy()),
            ps_quote(&self.working_dir().to_string_lossy()),
        ]
    }

    fn to_command(&self) -> String {
        let args = self.to_ps_args();
        format!(
            "$s = (New-Object -ComObject WScript.Shell).CreateShortcut({}); \
             $s.TargetPath = {}; $s.WorkingDirectory = {}; $s.Save()",
            args[0], args[1], args[2]
        )
    }

    fn needs_module(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_taskbar_item() {
        let call = PinTaskbarItemArgs {
            path: PathBuf::from("C:\\Program Files\\Wireshark\\Wireshark.exe"),
        };
        assert_eq!(
            call.to_command(),
            "Pin-TaskbarItem -Path 'C:\\Program Files\\Wireshark\\Wireshark.exe'"
        );
    }

    #[test]
    fn test_set_wallpaper_fill() {
        let call = SetWallpaperArgs {
            image_path: PathBuf::from("C:\\Tools\\Wallpapers\\holmes-wallpaper.jpg"),
            style: WallpaperStyle::default(),
        };
        assert_eq!(
            call.to_command(),
            "Set-Wallpaper -ImagePath 'C:\\Tools\\Wallpapers\\holmes-wallpaper.jpg' -Style Fill"
        );
    }

    #[test]
    fn test_default_appearance() {
        assert_eq!(
            SetWindowsAppearanceArgs::default().to_command(),
            "Set-WindowsAppearance -DarkMode -AccentHex '#0078D7' -ShowAccentOnTaskbar \
             -EnableTransparency -ApplyForAllUsers -RestartExplorer"
        );
    }

    #[test]
    fn test_shortcuts_from_folder_with_filter() {
        let call = NewShortcutsFromFolderArgs {
            folder: PathBuf::from("C:\\Tools\\Sysinternals"),
            destination: PathBuf::from("C:\\Users\\a\\Desktop\\Sysinternals"),
            filter: Some("*.exe".into()),
        };
        let args = call.to_ps_args();
        assert_eq!(args.len(), 3);
        assert_eq!(args[2], "-Filter '*.exe'");
    }

    #[test]
    fn test_single_shortcut_is_inline() {
        let call = NewShortcutArgs {
            shortcut_path: PathBuf::from("D:\\Desk\\Nmap.lnk"),
            target_path: PathBuf::from("C:\\Nmap\\nmap.exe"),
        };
        assert!(!call.needs_module());
        let cmd = call.to_command();
        assert!(cmd.contains("CreateShortcut('D:\\Desk\\Nmap.lnk')"));
        assert!(cmd.contains("$s.TargetPath = 'C:\\Nmap\\nmap.exe'"));
        assert!(cmd.contains("$s.WorkingDirectory = 'C:\\Nmap'"));
    }
}
