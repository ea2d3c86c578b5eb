use std::collections::BTreeMap;
use std::fmt;

/// Named action a command pattern triggers, e.g. `createProject`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extracted parameter values keyed by slot name.
pub type Params = BTreeMap<String, String>;

/// Who is asking. Opaque to the engine, interpreted by the authorizer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthContext {
    pub user_id: String,
    pub roles: Vec<String>,
}

impl AuthContext {
    pub fn new(user_id: impl Into<String>, roles: &[&str]) -> Self {
        Self {
            user_id: user_id.into(),
            roles: roles.iter().map(|r| (*r).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// What a dispatched action reports back on success.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionOutcome {
    pub message: String,
    pub navigate_to: Option<String>,
}

impl ActionOutcome {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            navigate_to: None,
        }
    }

    #[must_use]
    pub fn navigate(mut self, target: impl Into<String>) -> Self {
        self.navigate_to = Some(target.into());
        self
    }
}

/// Result of one palette submission, rendered by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub ok: bool,
    pub message: String,
    pub navigate: Option<String>,
    pub suggestions: Vec<String>,
}

impl ActionResult {
    pub fn success(outcome: ActionOutcome) -> Self {
        Self {
            ok: true,
            message: outcome.message,
            navigate: outcome.navigate_to,
            suggestions: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            navigate: None,
            suggestions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

/// Server-owned timer state as read by the sidebar widgets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimerSession {
    pub is_active: bool,
    pub remaining_minutes: f64,
}

impl TimerSession {
    #[must_use]
    pub fn running(remaining_minutes: f64) -> Self {
        Self {
            is_active: true,
            remaining_minutes,
        }
    }

    #[must_use]
    pub fn stopped() -> Self {
        Self::default()
    }
}

/// A timer session stamped with the order in which it was requested or
/// received. Higher sequence numbers supersede lower ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub seq: u64,
    pub session: TimerSession,
}
