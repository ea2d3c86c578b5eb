use crate::app::error::CommandError;
use crate::app::grammar::{CommandPattern, CommandRegistry, ParamKind, ParamSpec, Token};
use crate::domain::models::{ActionId, Params};

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand<'a> {
    Matched {
        pattern: &'a CommandPattern,
        params: Params,
    },
    Unmatched,
    Ambiguous {
        candidates: Vec<&'a CommandPattern>,
    },
}

impl<'a> ParsedCommand<'a> {
    /// Collapses the non-matching outcomes into the error taxonomy.
    pub fn into_match(self) -> Result<(&'a CommandPattern, Params), CommandError> {
        match self {
            Self::Matched { pattern, params } => Ok((pattern, params)),
            Self::Unmatched => Err(CommandError::Unmatched),
            Self::Ambiguous { candidates } => Err(CommandError::Ambiguous {
                candidates: candidates.iter().map(|p| p.action.clone()).collect(),
            }),
        }
    }
}

/// One input word, kept in its original spelling next to its folded form.
#[derive(Debug, Clone)]
struct Word<'s> {
    original: &'s str,
    folded: String,
}

fn normalize(input: &str) -> Vec<Word<'_>> {
    input
        .split_whitespace()
        .map(|w| Word {
            original: w,
            folded: w.to_lowercase(),
        })
        .collect()
}

/// Resolves a line of palette input against every registered pattern.
///
/// All patterns are tried; more than one full match is reported as
/// `Ambiguous` instead of picking one.
pub fn resolve<'a>(
    registry: &'a CommandRegistry,
    input: &str,
) -> Result<ParsedCommand<'a>, CommandError> {
    let words = normalize(input);
    if words.is_empty() {
        return Err(CommandError::EmptyInput);
    }

    let mut matches: Vec<(&CommandPattern, Params)> = registry
        .all()
        .iter()
        .filter_map(|pattern| match_pattern(pattern, &words).map(|params| (pattern, params)))
        .collect();

    let parsed = match matches.len() {
        0 => ParsedCommand::Unmatched,
        1 => {
            let (pattern, params) = matches.remove(0);
            ParsedCommand::Matched { pattern, params }
        }
        _ => ParsedCommand::Ambiguous {
            candidates: matches.into_iter().map(|(p, _)| p).collect(),
        },
    };

    match &parsed {
        ParsedCommand::Matched { pattern, .. } => {
            tracing::debug!(action = %pattern.action, "input resolved");
        }
        ParsedCommand::Unmatched => tracing::debug!("input matched no command"),
        ParsedCommand::Ambiguous { candidates } => {
            let actions: Vec<&ActionId> = candidates.iter().map(|p| &p.action).collect();
            tracing::debug!(?actions, "input is ambiguous");
        }
    }
    Ok(parsed)
}

fn match_pattern(pattern: &CommandPattern, words: &[Word<'_>]) -> Option<Params> {
    let mut params = Params::new();
    match_tokens(pattern, &pattern.tokens, words, &mut params).then_some(params)
}

// Slots are greedy: the longest acceptable run of words is tried first and
// shortened only if the rest of the pattern then fails to match.
fn match_tokens(
    pattern: &CommandPattern,
    tokens: &[Token],
    words: &[Word<'_>],
    params: &mut Params,
) -> bool {
    let Some((token, rest)) = tokens.split_first() else {
        return words.is_empty();
    };

    match token {
        Token::Literal(literal) => match words.split_first() {
            Some((word, remaining)) if word.folded == *literal => {
                match_tokens(pattern, rest, remaining, params)
            }
            _ => false,
        },
        Token::Slot(name) => {
            let Some(spec) = pattern.params.get(name) else {
                return false;
            };
            let min = usize::from(spec.required);
            for take in (min..=max_words(spec, words.len())).rev() {
                let (head, tail) = words.split_at(take);
                if take == 0 {
                    if match_tokens(pattern, rest, tail, params) {
                        return true;
                    }
                    continue;
                }
                let Some(value) = slot_value(spec, head) else {
                    continue;
                };
                params.insert(name.clone(), value);
                if match_tokens(pattern, rest, tail, params) {
                    return true;
                }
                params.remove(name);
            }
            false
        }
    }
}

fn max_words(spec: &ParamSpec, available: usize) -> usize {
    match spec.kind {
        ParamKind::Identifier => available.min(1),
        ParamKind::String | ParamKind::Enum => available,
    }
}

fn slot_value(spec: &ParamSpec, words: &[Word<'_>]) -> Option<String> {
    let joined = words
        .iter()
        .map(|w| w.original)
        .collect::<Vec<_>>()
        .join(" ");
    spec.accept(&joined)
}
