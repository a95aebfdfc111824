//! Persisted client preferences (XDG config or ~/.config/blockfall-tui).
//!
//! Two keys survive restarts, mirroring what the web client kept in local
//! storage: the theme name and the speed multiplier. Missing or corrupt files
//! fall back to defaults; a broken prefs file must never block play.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::theme::ThemeName;

const FILENAME: &str = "prefs.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_speed")]
    pub speed: u32,
}

fn default_theme() -> String {
    ThemeName::default().as_str().to_string()
}

fn default_speed() -> u32 {
    1
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            speed: default_speed(),
        }
    }
}

impl Preferences {
    pub fn theme_name(&self) -> ThemeName {
        ThemeName::from_str(&self.theme).unwrap_or_default()
    }

    pub fn set_theme(&mut self, name: ThemeName) {
        self.theme = name.as_str().to_string();
    }
}

/// Preferences file path (config dir / blockfall-tui / prefs.json).
fn config_path() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join("blockfall-tui").join(FILENAME)
}

pub fn load() -> Preferences {
    load_from(&config_path())
}

pub fn save(prefs: &Preferences) -> Result<()> {
    save_to(&config_path(), prefs)
}

fn load_from(path: &Path) -> Preferences {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Preferences::default(),
    };
    match serde_json::from_str::<Preferences>(&content) {
        Ok(mut prefs) => {
            prefs.speed = prefs.speed.max(1);
            prefs
        }
        Err(err) => {
            eprintln!("[prefs] ignoring corrupt {}: {err}", path.display());
            Preferences::default()
        }
    }
}

fn save_to(path: &Path, prefs: &Preferences) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(prefs)?)?;
    Ok(())
}
