//! Configuration file support for gwm.
//!
//! Loads settings from ~/.config/gwm/config.toml if it exists,
//! otherwise uses the built-in defaults. The per-task working directory map
//! can additionally be overridden from the `GWM_TASK_WORKDIRS` environment
//! variable.
//!
//! Also provides `LayoutConfig` - the runtime configuration struct with
//! resolved color values and layout parameters.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::keys::Action;
use crate::layout;

/// Environment variable holding `task:/dir,other:/dir` pairs
pub const ENV_TASK_WORKDIRS: &str = "GWM_TASK_WORKDIRS";

// =============================================================================
// Runtime Configuration (resolved values)
// =============================================================================

/// Runtime layout configuration with resolved color values.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Border width of tiled windows when more than one shares a screen
    pub border_width: u32,
    /// Border color for the focused window
    pub border_focused: u32,
    /// Border color for every other window
    pub border_unfocused: u32,
    /// Master factor given to freshly created workspaces
    pub master_factor: f64,
    /// Amount the grow/shrink bindings change the master factor by
    pub master_factor_step: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            border_width: 2,
            border_focused: 0xbbbbbb,
            border_unfocused: 0x222222,
            master_factor: 0.6,
            master_factor_step: 0.05,
        }
    }
}

// =============================================================================
// File-based Configuration (TOML parsing)
// =============================================================================

/// Top-level configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub appearance: AppearanceConfig,
    pub commands: CommandConfig,
    pub keybindings: KeybindingConfig,
    pub task_workdirs: TaskWorkdirConfig,
}

/// General settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Task created at startup
    pub default_task: String,
}

/// Appearance settings (borders, master area)
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    pub border_width: u32,
    pub border_focused: String,
    pub border_unfocused: String,
    pub master_factor: f64,
    pub master_factor_step: f64,
}

/// External programs the window manager launches
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommandConfig {
    pub terminal: String,
    pub launcher: String,
    /// Selector fed the task names on stdin (dmenu-compatible)
    pub menu: String,
    /// Helper that writes the selection to the root window name
    pub ctl: String,
}

/// Default working directory per task name
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TaskWorkdirConfig {
    #[serde(flatten)]
    pub dirs: HashMap<String, String>,
}

/// Keybinding configuration (strings like "Mod4+Return")
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeybindingConfig {
    pub quit: Option<String>,
    pub spawn_terminal: Option<String>,
    pub spawn_launcher: Option<String>,
    pub switch_task: Option<String>,
    pub move_window_to_task: Option<String>,
    pub promote_window: Option<String>,
    pub focus_window_next: Option<String>,
    pub focus_window_prev: Option<String>,
    pub focus_screen_next: Option<String>,
    pub focus_screen_prev: Option<String>,
    pub move_window_to_next_screen: Option<String>,
    pub move_window_to_prev_screen: Option<String>,
    pub master_grow: Option<String>,
    pub master_shrink: Option<String>,
    pub switch_workspace_1: Option<String>,
    pub switch_workspace_2: Option<String>,
    pub switch_workspace_3: Option<String>,
    pub switch_workspace_4: Option<String>,
    pub move_to_workspace_1: Option<String>,
    pub move_to_workspace_2: Option<String>,
    pub move_to_workspace_3: Option<String>,
    pub move_to_workspace_4: Option<String>,
}

/// Parsed keybinding (ready for X11 grab)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedBinding {
    pub keysym: u32,
    pub modifiers: u16,
}

impl Config {
    /// Load config from default path (~/.config/gwm/config.toml)
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gwm")
            .join("config.toml")
    }

    /// Load config from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Resolve colors and bounds into the runtime layout settings
    pub fn layout_config(&self) -> LayoutConfig {
        let defaults = LayoutConfig::default();
        let color = |s: &str, fallback: u32| {
            parse_color(s).unwrap_or_else(|| {
                log::warn!("Invalid color '{}', using #{:06x}", s, fallback);
                fallback
            })
        };
        LayoutConfig {
            border_width: self.appearance.border_width,
            border_focused: color(&self.appearance.border_focused, defaults.border_focused),
            border_unfocused: color(&self.appearance.border_unfocused, defaults.border_unfocused),
            master_factor: layout::clamp_master_factor(self.appearance.master_factor),
            master_factor_step: self.appearance.master_factor_step,
        }
    }

    /// Parse keybindings into (binding, action) pairs
    pub fn parse_keybindings(&self) -> Vec<(ParsedBinding, Action)> {
        let mut bindings = Vec::new();
        let k = &self.keybindings;

        let entries: [(Action, &Option<String>); 22] = [
            (Action::Quit, &k.quit),
            (Action::SpawnTerminal, &k.spawn_terminal),
            (Action::SpawnLauncher, &k.spawn_launcher),
            (Action::SwitchTaskMenu, &k.switch_task),
            (Action::MoveWindowToTaskMenu, &k.move_window_to_task),
            (Action::PromoteWindow, &k.promote_window),
            (Action::FocusWindow(1), &k.focus_window_next),
            (Action::FocusWindow(-1), &k.focus_window_prev),
            (Action::FocusScreen(1), &k.focus_screen_next),
            (Action::FocusScreen(-1), &k.focus_screen_prev),
            (Action::MoveWindowToScreen(1), &k.move_window_to_next_screen),
            (Action::MoveWindowToScreen(-1), &k.move_window_to_prev_screen),
            (Action::GrowMaster, &k.master_grow),
            (Action::ShrinkMaster, &k.master_shrink),
            (Action::SwitchWorkspace(0), &k.switch_workspace_1),
            (Action::SwitchWorkspace(1), &k.switch_workspace_2),
            (Action::SwitchWorkspace(2), &k.switch_workspace_3),
            (Action::SwitchWorkspace(3), &k.switch_workspace_4),
            (Action::MoveWindowToWorkspace(0), &k.move_to_workspace_1),
            (Action::MoveWindowToWorkspace(1), &k.move_to_workspace_2),
            (Action::MoveWindowToWorkspace(2), &k.move_to_workspace_3),
            (Action::MoveWindowToWorkspace(3), &k.move_to_workspace_4),
        ];

        for (action, key_str) in entries {
            if let Some(s) = key_str {
                match parse_key_binding(s) {
                    Some(parsed) => bindings.push((parsed, action)),
                    None => log::warn!("Failed to parse keybinding: {}", s),
                }
            }
        }

        bindings
    }

    /// Working directories per task: the `GWM_TASK_WORKDIRS` value when it
    /// parses, the `[task_workdirs]` table otherwise.
    pub fn task_workdirs(&self, env_value: Option<&str>) -> HashMap<String, PathBuf> {
        let raw = match env_value {
            Some(value) => match parse_task_workdirs(value) {
                Some(map) => map,
                None => {
                    log::warn!("Failed to parse {}: '{}'", ENV_TASK_WORKDIRS, value);
                    self.task_workdirs.dirs.clone()
                }
            },
            None => self.task_workdirs.dirs.clone(),
        };
        raw.into_iter()
            .map(|(task, dir)| (task, PathBuf::from(shellexpand::tilde(&dir).into_owned())))
            .collect()
    }
}

/// Parse `name:/path,other:/path`. Whitespace anywhere is dropped and
/// leading/trailing commas are tolerated; any malformed pair rejects the
/// whole value.
pub fn parse_task_workdirs(value: &str) -> Option<HashMap<String, String>> {
    let compact: String = value.split_whitespace().collect();
    compact
        .trim_matches(',')
        .split(',')
        .map(|pair| {
            let mut parts = pair.split(':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(task), Some(dir), None) => Some((task.to_string(), dir.to_string())),
                _ => None,
            }
        })
        .collect()
}

/// Parse a key binding string like "Mod4+Shift+h" into keysym and modifiers
pub fn parse_key_binding(s: &str) -> Option<ParsedBinding> {
    let parts: Vec<&str> = s.split('+').collect();
    let (key_part, modifier_parts) = parts.split_last()?;

    // X11 modifier masks
    const SHIFT_MASK: u16 = 1;
    const CONTROL_MASK: u16 = 4;
    const MOD1_MASK: u16 = 8; // Alt
    const MOD4_MASK: u16 = 64; // Super/Win

    let mut modifiers: u16 = 0;
    for part in modifier_parts {
        match part.to_lowercase().as_str() {
            "mod4" | "super" | "win" => modifiers |= MOD4_MASK,
            "shift" => modifiers |= SHIFT_MASK,
            "control" | "ctrl" => modifiers |= CONTROL_MASK,
            "mod1" | "alt" => modifiers |= MOD1_MASK,
            _ => {
                log::warn!("Unknown modifier: {}", part);
                return None;
            }
        }
    }

    let keysym = key_to_keysym(key_part)?;
    Some(ParsedBinding { keysym, modifiers })
}

/// Convert key name to X11 keysym
fn key_to_keysym(key: &str) -> Option<u32> {
    let lower = key.to_lowercase();

    // Latin-1 letters and digits map to their ASCII codes
    let mut chars = lower.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            return Some(c as u32);
        }
    }

    // F1..F12 are contiguous starting at 0xffbe
    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u32>().ok()) {
        if (1..=12).contains(&n) {
            return Some(0xffbe + n - 1);
        }
    }

    match lower.as_str() {
        "return" | "enter" => Some(0xff0d),
        "tab" => Some(0xff09),
        "escape" | "esc" => Some(0xff1b),
        "space" => Some(0x20),
        "backspace" => Some(0xff08),
        "delete" => Some(0xffff),
        "page_up" | "pageup" | "prior" => Some(0xff55),
        "page_down" | "pagedown" | "next" => Some(0xff56),
        "left" => Some(0xff51),
        "up" => Some(0xff52),
        "right" => Some(0xff53),
        "down" => Some(0xff54),
        "home" => Some(0xff50),
        "end" => Some(0xff57),
        _ => {
            log::warn!("Unknown key: {}", key);
            None
        }
    }
}

/// Parse hex color string (e.g., "#bbbbbb" or "bbbbbb") to u32
pub fn parse_color(s: &str) -> Option<u32> {
    let s = s.trim_start_matches('#');
    if s.len() != 6 {
        return None;
    }
    u32::from_str_radix(s, 16).ok()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_task: "default".to_string(),
        }
    }
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            border_width: 2,
            border_focused: "#bbbbbb".to_string(),
            border_unfocused: "#222222".to_string(),
            master_factor: 0.6,
            master_factor_step: 0.05,
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            terminal: "st".to_string(),
            launcher: "dmenu_run".to_string(),
            menu: "dmenu".to_string(),
            ctl: "gwmctl".to_string(),
        }
    }
}

impl CommandConfig {
    /// Every configured command line
    pub fn command_lines(&self) -> [&str; 4] {
        [
            self.terminal.as_str(),
            self.launcher.as_str(),
            self.menu.as_str(),
            self.ctl.as_str(),
        ]
    }
}

impl Default for TaskWorkdirConfig {
    fn default() -> Self {
        let mut dirs = HashMap::new();
        dirs.insert("opt".to_string(), "/opt".to_string());
        dirs.insert("tmp".to_string(), "/tmp".to_string());
        Self { dirs }
    }
}

impl Default for KeybindingConfig {
    fn default() -> Self {
        let key = |s: &str| Some(s.to_string());
        Self {
            quit: key("Mod4+Shift+F12"),
            spawn_terminal: key("Mod4+Return"),
            spawn_launcher: key("Mod4+d"),
            switch_task: key("Mod4+space"),
            move_window_to_task: key("Mod4+Shift+space"),
            promote_window: key("Mod4+Tab"),
            focus_window_next: key("Mod4+Left"),
            focus_window_prev: key("Mod4+Right"),
            focus_screen_next: key("Mod4+Page_Up"),
            focus_screen_prev: key("Mod4+Page_Down"),
            move_window_to_next_screen: key("Mod4+Shift+Page_Down"),
            move_window_to_prev_screen: key("Mod4+Shift+Page_Up"),
            master_grow: key("Mod4+Shift+Right"),
            master_shrink: key("Mod4+Shift+Left"),
            switch_workspace_1: key("Mod4+1"),
            switch_workspace_2: key("Mod4+2"),
            switch_workspace_3: key("Mod4+3"),
            switch_workspace_4: key("Mod4+4"),
            move_to_workspace_1: key("Mod4+Shift+1"),
            move_to_workspace_2: key("Mod4+Shift+2"),
            move_to_workspace_3: key("Mod4+Shift+3"),
            move_to_workspace_4: key("Mod4+Shift+4"),
        }
    }
}
