use crate::app::config::Messages;
use crate::app::error::CommandError;
use crate::app::grammar::CommandRegistry;

const MAX_SUGGESTIONS: usize = 3;

/// Text shown to the user for a failed submission. Unauthorized requests get
/// the same text regardless of the target.
#[must_use]
pub fn user_message(messages: &Messages, err: &CommandError) -> String {
    match err {
        CommandError::EmptyInput => messages.empty_input.clone(),
        CommandError::Unmatched => messages.unmatched.clone(),
        CommandError::Ambiguous { .. } => messages.ambiguous.clone(),
        CommandError::ValidationFailure(detail) => detail.clone(),
        CommandError::Unauthorized => messages.unauthorized.clone(),
        CommandError::ActionFault(_) => messages.action_fault.clone(),
        CommandError::Timeout => messages.timeout.clone(),
    }
}

/// Phrases to offer after a rejection.
#[must_use]
pub fn get_suggestions(registry: &CommandRegistry, input: &str, err: &CommandError) -> Vec<String> {
    match err {
        CommandError::Ambiguous { candidates } => candidates
            .iter()
            .filter_map(|action| registry.get(action))
            .map(|p| p.phrase())
            .collect(),
        CommandError::Unmatched => search_commands(registry, input),
        _ => Vec::new(),
    }
}

// Patterns sharing at least one keyword with the input, registration order.
fn search_commands(registry: &CommandRegistry, input: &str) -> Vec<String> {
    let words: Vec<String> = input.split_whitespace().map(str::to_lowercase).collect();
    if words.is_empty() {
        return Vec::new();
    }

    registry
        .all()
        .iter()
        .filter(|p| p.literals().any(|lit| words.iter().any(|w| w == lit)))
        .take(MAX_SUGGESTIONS)
        .map(|p| p.phrase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ActionId;

    #[test]
    fn test_suggestions_for_unmatched() {
        let registry = CommandRegistry::builtin().unwrap();
        let s = get_suggestions(&registry, "lege irgendwas", &CommandError::Unmatched);
        assert_eq!(s, vec!["lege projekt <title> an".to_string()]);

        let s = get_suggestions(&registry, "Projekt", &CommandError::Unmatched);
        assert_eq!(s.len(), MAX_SUGGESTIONS);
        assert!(s.iter().all(|p| p.contains("projekt")));

        let s = get_suggestions(&registry, "xyz", &CommandError::Unmatched);
        assert!(s.is_empty());
    }

    #[test]
    fn test_suggestions_for_ambiguous() {
        let registry = CommandRegistry::builtin().unwrap();
        let err = CommandError::Ambiguous {
            candidates: vec![ActionId::new("stopTimer"), ActionId::new("navigate")],
        };
        let s = get_suggestions(&registry, "", &err);
        assert_eq!(s, vec!["stoppe timer".to_string(), "gehe zu <page>".to_string()]);
    }

    #[test]
    fn test_messages() {
        let messages = Messages::default();
        assert_eq!(user_message(&messages, &CommandError::Unmatched), "Unbekannter Befehl");
        assert_eq!(
            user_message(&messages, &CommandError::ValidationFailure("kaputt".into())),
            "kaputt"
        );
        assert_eq!(
            user_message(&Messages::english(), &CommandError::Unauthorized),
            "not permitted"
        );
        assert_eq!(
            user_message(&Messages::english(), &CommandError::ActionFault("db down".into())),
            "The command could not be completed"
        );
    }
}
