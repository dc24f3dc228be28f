//! Configuration file support for dvr-console.
//!
//! This module provides functionality for loading and saving user preferences
//! from a TOML configuration file.

use crate::error::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// User configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the DVR web server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// MAC address woken by the wake-on-LAN key
    #[serde(default)]
    pub wol_mac: Option<String>,

    /// Seconds between recording-progress polls in the console, 0 disables
    #[serde(default = "default_progress_interval")]
    pub progress_interval_secs: u64,

    /// Defaults for manual and scheduled recordings
    #[serde(default)]
    pub recording: RecordingDefaults,

    /// Console key bindings
    #[serde(default)]
    pub keybindings: Keybindings,
}

/// Encoder settings used when a recording command does not name its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDefaults {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_crf")]
    pub crf: u8,
    #[serde(default = "default_preset")]
    pub preset: String,
    /// Minutes
    #[serde(default = "default_duration")]
    pub duration: u32,
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            format: default_format(),
            crf: default_crf(),
            preset: default_preset(),
            duration: default_duration(),
        }
    }
}

/// Key names per console action.
///
/// A key name is a single character (`"a"`, `"?"`), one of `up`, `down`,
/// `left`, `right`, `enter`, `esc`, `tab`, `backspace`, `space`, optionally
/// prefixed with `ctrl+`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keybindings {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub select: Vec<String>,
    pub toggle: Vec<String>,
    pub select_all: Vec<String>,
    pub deselect_all: Vec<String>,
    pub bulk: Vec<String>,
    pub record_recurring: Vec<String>,
    pub command: Vec<String>,
    pub toggle_focus: Vec<String>,
    pub back: Vec<String>,
    pub help: Vec<String>,
    pub quit: Vec<String>,
    pub wake: Vec<String>,
    pub stop_recording: Vec<String>,
    pub categorize: Vec<String>,
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            up: keys(&["k", "up"]),
            down: keys(&["j", "down"]),
            select: keys(&["enter"]),
            toggle: keys(&["space"]),
            select_all: keys(&["a"]),
            deselect_all: keys(&["n"]),
            bulk: keys(&["b"]),
            record_recurring: keys(&["r"]),
            command: keys(&["/", ":"]),
            toggle_focus: keys(&["tab"]),
            back: keys(&["esc", "backspace"]),
            help: keys(&["?"]),
            quit: keys(&["q"]),
            wake: keys(&["w"]),
            stop_recording: keys(&["s"]),
            categorize: keys(&["c"]),
        }
    }
}

impl Keybindings {
    /// Check whether `key` is one of the names in `binding`.
    pub fn matches(&self, binding: &[String], key: &KeyEvent) -> bool {
        binding.iter().any(|name| key_matches(name, key))
    }
}

fn key_matches(name: &str, key: &KeyEvent) -> bool {
    let name = name.trim();
    let (ctrl, name) = match name.strip_prefix("ctrl+") {
        Some(rest) => (true, rest),
        None => (false, name),
    };
    if ctrl != key.modifiers.contains(KeyModifiers::CONTROL) {
        return false;
    }

    match key.code {
        KeyCode::Char(' ') => name.eq_ignore_ascii_case("space") || name == " ",
        KeyCode::Char(c) => {
            let mut chars = name.chars();
            chars.next() == Some(c) && chars.next().is_none()
        }
        KeyCode::Up => name.eq_ignore_ascii_case("up"),
        KeyCode::Down => name.eq_ignore_ascii_case("down"),
        KeyCode::Left => name.eq_ignore_ascii_case("left"),
        KeyCode::Right => name.eq_ignore_ascii_case("right"),
        KeyCode::Enter => name.eq_ignore_ascii_case("enter"),
        KeyCode::Esc => name.eq_ignore_ascii_case("esc"),
        KeyCode::Tab => name.eq_ignore_ascii_case("tab"),
        KeyCode::Backspace => name.eq_ignore_ascii_case("backspace"),
        _ => false,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn default_server_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_progress_interval() -> u64 {
    5
}

fn default_format() -> String {
    "mp4".to_string()
}

fn default_crf() -> u8 {
    23
}

fn default_preset() -> String {
    "fast".to_string()
}

fn default_duration() -> u32 {
    60
}

impl Config {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self {
            server_url: default_server_url(),
            wol_mac: None,
            progress_interval_secs: default_progress_interval(),
            recording: RecordingDefaults::default(),
            keybindings: Keybindings::default(),
        }
    }

    /// Get the path to the config file.
    ///
    /// Returns ~/.config/dvr-console/config.toml on Linux,
    /// or a platform-appropriate location on other systems.
    pub fn get_config_path() -> std::result::Result<PathBuf, io::Error> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "Could not find config directory")
            })?
            .join("dvr-console");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from the default location.
    ///
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::get_config_path()?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path, defaulting when it is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Create a default config file if one doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn create_default_if_missing() -> Result<PathBuf> {
        let path = Self::get_config_path()?;

        if !path.exists() {
            Self::new().save_to(&path)?;
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_new_config_has_defaults() {
        let config = Config::new();
        assert_eq!(config.server_url, "http://localhost:5000");
        assert!(config.wol_mac.is_none());
        assert_eq!(config.progress_interval_secs, 5);
        assert_eq!(config.recording.format, "mp4");
        assert_eq!(config.recording.crf, 23);
        assert_eq!(config.recording.preset, "fast");
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::new();
        config.server_url = "http://dvr.lan:8000".to_string();
        config.wol_mac = Some("00:11:22:33:44:55".to_string());

        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("server_url = \"http://dvr.lan:8000\""));
        assert!(toml_str.contains("wol_mac = \"00:11:22:33:44:55\""));
        assert!(toml_str.contains("[recording]"));
        assert!(toml_str.contains("[keybindings]"));
    }

    #[test]
    fn test_config_partial_deserialization() {
        let toml_str = r#"
            server_url = "http://10.0.0.5:5000"

            [recording]
            crf = 28

            [keybindings]
            bulk = ["d"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server_url, "http://10.0.0.5:5000");
        assert_eq!(config.recording.crf, 28);
        assert_eq!(config.recording.preset, "fast"); // default
        assert_eq!(config.keybindings.bulk, vec!["d".to_string()]);
        assert_eq!(config.keybindings.quit, vec!["q".to_string()]); // default
    }

    #[test]
    fn test_keybinding_named_and_char_keys() {
        let kb = Keybindings::default();
        assert!(kb.matches(&kb.toggle, &key(KeyCode::Char(' '))));
        assert!(kb.matches(&kb.down, &key(KeyCode::Char('j'))));
        assert!(kb.matches(&kb.down, &key(KeyCode::Down)));
        assert!(kb.matches(&kb.back, &key(KeyCode::Esc)));
        assert!(!kb.matches(&kb.down, &key(KeyCode::Char('k'))));
    }

    #[test]
    fn test_keybinding_ctrl_prefix() {
        let kb = Keybindings {
            quit: vec!["ctrl+x".to_string()],
            ..Keybindings::default()
        };
        let ctrl_x = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert!(kb.matches(&kb.quit, &ctrl_x));
        assert!(!kb.matches(&kb.quit, &key(KeyCode::Char('x'))));
    }

    #[test]
    fn test_load_from_missing_path_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/dvr-console/config.toml")).unwrap();
        assert_eq!(config.server_url, "http://localhost:5000");
    }
}
