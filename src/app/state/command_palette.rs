use crate::app::error::CommandError;
use crate::app::palette::Palette;
use crate::domain::models::{ActionResult, AuthContext};
use chrono::{DateTime, Local};

pub const MAX_RECENT: usize = 10;

/// Where a single submission currently is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Resolving,
    Executing,
    Rejected(CommandError),
    Completed,
}

/// What the rendering layer gets to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteView {
    pub input_text: String,
    pub last_result: Option<ActionResult>,
    pub is_open: bool,
}

/// Per-user palette state. Never shared between users; `execute` takes
/// `&mut self`, so one session cannot run two submissions at once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaletteSession {
    pub input_text: String,
    pub last_result: Option<ActionResult>,
    pub is_open: bool,
    pub phase: Phase,
    pub completed_at: Option<DateTime<Local>>,
    // Survives close/open.
    recent: Vec<String>,
}

impl PaletteSession {
    #[must_use]
    pub fn with_recent(recent: Vec<String>) -> Self {
        let mut state = Self::default();
        for input in recent.into_iter().rev() {
            state.remember(&input);
        }
        state
    }

    pub fn open(&mut self) {
        self.input_text.clear();
        self.last_result = None;
        self.is_open = true;
        self.phase = Phase::Idle;
    }

    pub fn update_input(&mut self, text: impl Into<String>) {
        self.input_text = text.into();
    }

    pub fn close(&mut self) {
        self.is_open = false;
        self.input_text.clear();
        self.last_result = None;
        self.phase = Phase::Idle;
    }

    /// Submits the current input. The result replaces any previous one.
    pub async fn execute(&mut self, palette: &Palette, auth: &AuthContext) -> ActionResult {
        if !self.is_open {
            tracing::debug!("submission on a closed palette ignored");
            return ActionResult::failure(palette.messages().closed.clone());
        }

        self.phase = Phase::Resolving;
        let input = self.input_text.clone();
        let result = match palette.resolve(&input) {
            Err(err) => {
                let result = palette.failure(&input, &err);
                self.phase = Phase::Rejected(err);
                result
            }
            Ok((pattern, params)) => {
                self.phase = Phase::Executing;
                let result = palette.execute(pattern, &params, auth).await;
                self.phase = Phase::Completed;
                if result.ok {
                    self.remember(&input);
                }
                result
            }
        };

        self.completed_at = Some(Local::now());
        self.last_result = Some(result.clone());
        result
    }

    #[must_use]
    pub fn view(&self) -> PaletteView {
        PaletteView {
            input_text: self.input_text.clone(),
            last_result: self.last_result.clone(),
            is_open: self.is_open,
        }
    }

    /// Most recent first.
    #[must_use]
    pub fn recent(&self) -> &[String] {
        &self.recent
    }

    /// Copies a recent command into the input. Returns false for a bad index.
    pub fn recall(&mut self, index: usize) -> bool {
        match self.recent.get(index) {
            Some(input) => {
                self.input_text = input.clone();
                true
            }
            None => false,
        }
    }

    fn remember(&mut self, input: &str) {
        let normalized = input.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return;
        }
        self.recent.retain(|r| !r.eq_ignore_ascii_case(&normalized));
        self.recent.insert(0, normalized);
        self.recent.truncate(MAX_RECENT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::grammar::CommandRegistry;
    use crate::domain::actions::{MockActionDispatcher, MockAuthorizer, Verdict};
    use crate::domain::models::ActionOutcome;
    use std::sync::Arc;

    fn palette() -> Palette {
        let mut dispatcher = MockActionDispatcher::new();
        dispatcher
            .expect_validate()
            .returning(|_, _| Ok(Verdict::Valid));
        dispatcher
            .expect_invoke()
            .returning(|_, _, _| Ok(ActionOutcome::new("Timer gestoppt.")));
        let mut authorizer = MockAuthorizer::new();
        authorizer.expect_can_perform().returning(|_, _, _| true);
        Palette::new(
            CommandRegistry::builtin().unwrap(),
            Arc::new(dispatcher),
            Arc::new(authorizer),
        )
    }

    #[test]
    fn test_open_resets_and_close_clears() {
        let mut state = PaletteSession::default();
        assert!(!state.is_open);

        state.open();
        state.update_input("stoppe timer");
        state.last_result = Some(ActionResult::failure("old"));
        state.open();
        assert_eq!(
            state.view(),
            PaletteView {
                input_text: String::new(),
                last_result: None,
                is_open: true
            }
        );

        state.update_input("stoppe timer");
        state.close();
        assert!(!state.is_open);
        assert!(state.input_text.is_empty());
        assert!(state.last_result.is_none());
    }

    #[tokio::test]
    async fn test_execute_success_is_stored_and_remembered() {
        let palette = palette();
        let mut state = PaletteSession::default();
        state.open();
        state.update_input("Stoppe   Timer");

        let result = state.execute(&palette, &AuthContext::default()).await;
        assert!(result.ok);
        assert_eq!(state.phase, Phase::Completed);
        assert!(state.is_open);
        assert_eq!(state.last_result, Some(result));
        assert_eq!(state.recent(), ["Stoppe Timer".to_string()]);
        assert!(state.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_rejected_input_synthesizes_failure() {
        let palette = palette();
        let mut state = PaletteSession::default();
        state.open();

        let result = state.execute(&palette, &AuthContext::default()).await;
        assert!(!result.ok);
        assert_eq!(state.phase, Phase::Rejected(CommandError::EmptyInput));

        state.update_input("lege irgendwas");
        let result = state.execute(&palette, &AuthContext::default()).await;
        assert_eq!(result.message, "Unbekannter Befehl");
        assert_eq!(result.suggestions, vec!["lege projekt <title> an".to_string()]);
        assert_eq!(state.phase, Phase::Rejected(CommandError::Unmatched));
        assert_eq!(state.last_result, Some(result));
        assert!(state.recent().is_empty());
    }

    #[tokio::test]
    async fn test_closed_palette_does_not_execute() {
        let palette = palette();
        let mut state = PaletteSession::default();
        state.update_input("stoppe timer");

        let result = state.execute(&palette, &AuthContext::default()).await;
        assert!(!result.ok);
        assert!(state.last_result.is_none());
        assert_eq!(state.phase, Phase::Idle);
    }

    #[test]
    fn test_recent_is_bounded_and_deduplicated() {
        let mut state = PaletteSession::default();
        for i in 0..(MAX_RECENT + 3) {
            state.remember(&format!("gehe zu {i}"));
        }
        state.remember("gehe zu 12");
        assert_eq!(state.recent().len(), MAX_RECENT);
        assert_eq!(state.recent()[0], "gehe zu 12");
        assert_eq!(state.recent().iter().filter(|r| *r == "gehe zu 12").count(), 1);

        assert!(state.recall(1));
        assert_eq!(state.input_text, "gehe zu 11");
        assert!(!state.recall(MAX_RECENT));
    }

    #[test]
    fn test_with_recent_keeps_order() {
        let state = PaletteSession::with_recent(vec!["a b".into(), "c".into()]);
        assert_eq!(state.recent(), ["a b".to_string(), "c".to_string()]);
        assert!(!state.is_open);
    }
}
