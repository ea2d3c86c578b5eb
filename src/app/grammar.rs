use crate::app::error::RegistryError;
use crate::domain::models::ActionId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Identifier,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub required: bool,
    pub kind: ParamKind,
    // Canonical spellings, only meaningful for `ParamKind::Enum`.
    pub values: Vec<String>,
}

impl ParamSpec {
    #[must_use]
    pub fn string() -> Self {
        Self {
            required: true,
            kind: ParamKind::String,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn identifier() -> Self {
        Self {
            required: true,
            kind: ParamKind::Identifier,
            values: Vec::new(),
        }
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: true,
            kind: ParamKind::Enum,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Checks a complete slot value against the kind constraint and returns
    /// the value to store (enum values come back in canonical spelling).
    #[must_use]
    pub fn accept(&self, value: &str) -> Option<String> {
        if value.is_empty() {
            return None;
        }
        match self.kind {
            ParamKind::String => Some(value.to_string()),
            ParamKind::Identifier => is_identifier(value).then(|| value.to_string()),
            ParamKind::Enum => {
                let folded = value.to_lowercase();
                self.values
                    .iter()
                    .find(|v| v.to_lowercase() == folded)
                    .cloned()
            }
        }
    }
}

/// Conservative identifier charset: ASCII alphanumerics plus `-`, `_` and `.`.
#[must_use]
pub fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Stored case-folded.
    Literal(String),
    Slot(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPattern {
    pub action: ActionId,
    pub tokens: Vec<Token>,
    pub params: BTreeMap<String, ParamSpec>,
    pub description: String,
}

impl CommandPattern {
    pub fn new(
        action: ActionId,
        tokens: Vec<Token>,
        params: BTreeMap<String, ParamSpec>,
    ) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidPattern {
            action: action.clone(),
            reason: reason.to_string(),
        };

        if !tokens.iter().any(|t| matches!(t, Token::Literal(_))) {
            return Err(invalid("a pattern needs at least one keyword"));
        }
        if tokens
            .windows(2)
            .any(|w| matches!(w, [Token::Slot(_), Token::Slot(_)]))
        {
            return Err(invalid("two parameter slots cannot be adjacent"));
        }

        let mut slots = HashSet::new();
        for token in &tokens {
            match token {
                Token::Literal(word) if word.is_empty() || word.contains(char::is_whitespace) => {
                    return Err(invalid("keywords must be single non-empty words"));
                }
                Token::Literal(_) => {}
                Token::Slot(name) => {
                    if !slots.insert(name.as_str()) {
                        return Err(invalid("a slot name is used twice"));
                    }
                    if !params.contains_key(name) {
                        return Err(RegistryError::UnknownParam {
                            action: action.clone(),
                            param: name.clone(),
                        });
                    }
                }
            }
        }

        for (name, spec) in &params {
            if !slots.contains(name.as_str()) {
                return Err(RegistryError::UnknownParam {
                    action: action.clone(),
                    param: name.clone(),
                });
            }
            if spec.kind == ParamKind::Enum && spec.values.is_empty() {
                return Err(RegistryError::EmptyEnum {
                    action: action.clone(),
                    param: name.clone(),
                });
            }
        }

        Ok(Self {
            action,
            tokens,
            params,
            description: String::new(),
        })
    }

    /// Builds a pattern from its textual form, e.g. `"lege projekt {title} an"`.
    pub fn parse(
        action: impl Into<String>,
        text: &str,
        params: BTreeMap<String, ParamSpec>,
    ) -> Result<Self, RegistryError> {
        let action = ActionId::new(action);
        let mut tokens = Vec::new();
        for word in text.split_whitespace() {
            if let Some(inner) = word.strip_prefix('{') {
                let name = inner.strip_suffix('}').filter(|n| is_identifier(n)).ok_or_else(|| {
                    RegistryError::InvalidPattern {
                        action: action.clone(),
                        reason: format!("malformed slot `{word}`"),
                    }
                })?;
                tokens.push(Token::Slot(name.to_string()));
            } else {
                tokens.push(Token::Literal(word.to_lowercase()));
            }
        }
        Self::new(action, tokens, params)
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Literal(word) => Some(word.as_str()),
            Token::Slot(_) => None,
        })
    }

    /// Example phrase shown to users, slots rendered as `<name>`.
    #[must_use]
    pub fn phrase(&self) -> String {
        self.tokens
            .iter()
            .map(|t| match t {
                Token::Literal(word) => word.clone(),
                Token::Slot(name) => format!("<{name}>"),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Recognized commands in registration order. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    patterns: Vec<CommandPattern>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, pattern: CommandPattern) -> Result<(), RegistryError> {
        if self.get(&pattern.action).is_some() {
            return Err(RegistryError::DuplicateAction(pattern.action));
        }
        tracing::debug!(action = %pattern.action, pattern = %pattern.phrase(), "registered command");
        self.patterns.push(pattern);
        Ok(())
    }

    pub fn from_patterns<I>(patterns: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = CommandPattern>,
    {
        let mut registry = Self::new();
        for pattern in patterns {
            registry.register(pattern)?;
        }
        Ok(registry)
    }

    #[must_use]
    pub fn all(&self) -> &[CommandPattern] {
        &self.patterns
    }

    #[must_use]
    pub fn get(&self, action: &ActionId) -> Option<&CommandPattern> {
        self.patterns.iter().find(|p| &p.action == action)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The German grammar shipped with the application.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_patterns(builtin_patterns()?)
    }
}

fn params<const N: usize>(entries: [(&str, ParamSpec); N]) -> BTreeMap<String, ParamSpec> {
    entries
        .into_iter()
        .map(|(name, spec)| (name.to_string(), spec))
        .collect()
}

fn builtin_patterns() -> Result<Vec<CommandPattern>, RegistryError> {
    Ok(vec![
        CommandPattern::parse(
            "createProject",
            "lege projekt {title} an",
            params([("title", ParamSpec::string())]),
        )?
        .describe("Neues Projekt anlegen"),
        CommandPattern::parse(
            "openProject",
            "öffne projekt {slug}",
            params([("slug", ParamSpec::identifier())]),
        )?
        .describe("Projekt öffnen"),
        CommandPattern::parse(
            "deleteProject",
            "lösche projekt {slug}",
            params([("slug", ParamSpec::identifier())]),
        )?
        .describe("Projekt löschen"),
        CommandPattern::parse(
            "renameProject",
            "benenne projekt {slug} in {title} um",
            params([
                ("slug", ParamSpec::identifier()),
                ("title", ParamSpec::string()),
            ]),
        )?
        .describe("Projekt umbenennen"),
        CommandPattern::parse(
            "startTimer",
            "starte timer {minutes}",
            params([("minutes", ParamSpec::one_of(["15", "25", "45", "60"]))]),
        )?
        .describe("Fokus-Timer starten"),
        CommandPattern::parse("stopTimer", "stoppe timer", BTreeMap::new())?
            .describe("Laufenden Timer stoppen"),
        CommandPattern::parse(
            "navigate",
            "gehe zu {page}",
            params([(
                "page",
                ParamSpec::one_of(["dashboard", "projekte", "einstellungen"]),
            )]),
        )?
        .describe("Seite wechseln"),
    ])
}
