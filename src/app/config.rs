use crate::app::error::RegistryError;
use crate::app::grammar::{CommandPattern, CommandRegistry, ParamKind, ParamSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// User-facing texts for every rejection. `{param}` is replaced with the
/// offending parameter name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Messages {
    pub empty_input: String,
    pub unmatched: String,
    pub ambiguous: String,
    pub unauthorized: String,
    pub action_fault: String,
    pub timeout: String,
    pub missing_param: String,
    pub invalid_param: String,
    pub closed: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            empty_input: "Bitte einen Befehl eingeben".to_string(),
            unmatched: "Unbekannter Befehl".to_string(),
            ambiguous: "Befehl ist mehrdeutig".to_string(),
            unauthorized: "Nicht erlaubt".to_string(),
            action_fault: "Der Befehl konnte nicht ausgeführt werden".to_string(),
            timeout: "Zeitüberschreitung".to_string(),
            missing_param: "Angabe '{param}' fehlt".to_string(),
            invalid_param: "Ungültiger Wert für '{param}'".to_string(),
            closed: "Die Befehlspalette ist geschlossen".to_string(),
        }
    }
}

impl Messages {
    #[must_use]
    pub fn english() -> Self {
        Self {
            empty_input: "Please enter a command".to_string(),
            unmatched: "Unknown command".to_string(),
            ambiguous: "Command is ambiguous".to_string(),
            unauthorized: "not permitted".to_string(),
            action_fault: "The command could not be completed".to_string(),
            timeout: "timeout".to_string(),
            missing_param: "Missing value for '{param}'".to_string(),
            invalid_param: "Invalid value for '{param}'".to_string(),
            closed: "The command palette is closed".to_string(),
        }
    }

    #[must_use]
    pub fn for_param(template: &str, param: &str) -> String {
        template.replace("{param}", param)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParamConfig {
    pub kind: ParamKind,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub values: Vec<String>,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandConfig {
    pub action: String,
    pub pattern: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamConfig>,
}

impl CommandConfig {
    fn to_pattern(&self) -> Result<CommandPattern, RegistryError> {
        let params = self
            .params
            .iter()
            .map(|(name, p)| {
                let spec = ParamSpec {
                    required: p.required,
                    kind: p.kind,
                    values: p.values.clone(),
                };
                (name.clone(), spec)
            })
            .collect();
        Ok(CommandPattern::parse(self.action.as_str(), &self.pattern, params)?
            .describe(self.description.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub poll_interval_secs: u64,
    pub execute_timeout_ms: u64,
    pub tick_millis: u64,
    pub messages: Messages,
    pub commands: Vec<CommandConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            execute_timeout_ms: 5_000,
            tick_millis: 1_000,
            messages: Messages::default(),
            commands: Vec::new(),
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    home::home_dir().map(|mut path| {
        path.push(".config");
        path.push("palette");
        path
    })
}

impl EngineConfig {
    /// Loads `~/.config/palette/config.toml`, or the defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        match get_config_dir().map(|dir| dir.join("config.toml")) {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), commands = config.commands.len(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Configured commands, or the built-in grammar when none are configured.
    pub fn build_registry(&self) -> Result<CommandRegistry, RegistryError> {
        if self.commands.is_empty() {
            return CommandRegistry::builtin();
        }
        let patterns = self
            .commands
            .iter()
            .map(CommandConfig::to_pattern)
            .collect::<Result<Vec<_>, _>>()?;
        CommandRegistry::from_patterns(patterns)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    #[must_use]
    pub fn execute_timeout(&self) -> Duration {
        Duration::from_millis(self.execute_timeout_ms.max(1))
    }

    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }
}
