use crate::app::config::get_config_dir;
use crate::app::state::command_palette::MAX_RECENT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecentCommands {
    pub commands: Vec<String>,
}

pub fn get_recent_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("recent_commands.toml"))
}

/// Missing or unreadable history is treated as empty.
pub fn load_recent_commands(path: &Path) -> Vec<String> {
    if path.exists() {
        if let Ok(content) = std::fs::read_to_string(path) {
            match toml::from_str::<RecentCommands>(&content) {
                Ok(mut recent) => {
                    recent.commands.truncate(MAX_RECENT);
                    return recent.commands;
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring malformed history"),
            }
        }
    }
    Vec::new()
}

pub fn save_recent_commands(path: &Path, commands: &[String]) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let recent = RecentCommands {
        commands: commands.iter().take(MAX_RECENT).cloned().collect(),
    };

    if let Ok(content) = toml::to_string(&recent) {
        if let Err(e) = std::fs::write(path, content) {
            tracing::warn!(path = %path.display(), error = %e, "could not save history");
        }
    }
}
