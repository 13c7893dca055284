//! Tokenization, verb matching, and scope/ambiguity-aware object resolution
//! (§4.5).
//!
//! The tokenizer (`tokenize.rs`) is a plain whitespace/punctuation split
//! plus article/noise-word removal -- one fixed grammar rule per verb
//! (command.rs's `pest` grammar) has no equivalent here, since verb syntax
//! is now a content-declared [`crate::vocab::SyntaxRule`] list that
//! [`rules`] walks against the word stream instead of a compiled grammar.
//! Object resolution itself -- adjectives, ambiguity, pronouns, "all" --
//! has no teacher equivalent beyond `entity_search.rs`'s flat name lookup
//! and is new code.

mod rules;
mod tokenize;

pub use rules::match_rules;
pub use tokenize::tokenize;

use crate::command::Command;
use crate::error::ParseError;
use crate::vocab::Vocabulary;
use crate::world::GameState;

/// Runs the full pipeline: tokenize, detect the verb, try its rules in
/// declared order, resolve objects. Returns the first fully resolved
/// command or the most specific `ParseError` encountered.
pub fn parse_command(input: &str, vocab: &Vocabulary, state: &GameState) -> Result<Command, ParseError> {
    let tokens = tokenize::tokenize(input, vocab);
    if tokens.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    if tokens[0] == "all" {
        return Err(ParseError::VerbUnknown("all".into()));
    }

    let verb_word = &tokens[0];
    let matches = vocab.verb_for_word(verb_word);
    match matches.len() {
        0 => Err(ParseError::VerbUnknown(verb_word.clone())),
        1 => rules::match_rules(&matches[0].verb, &matches[0].rules, &tokens[1..], state),
        _ => Err(ParseError::AmbiguousVerb(
            verb_word.clone(),
            matches.iter().map(|e| e.verb.0.clone()).collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::{ObjectCondition, SyntaxRule, TokenType, Verb, VerbEntry};
    use std::collections::HashSet;

    fn vocab_with_look() -> Vocabulary {
        Vocabulary {
            verbs: vec![VerbEntry {
                verb: Verb::new("look"),
                synonyms: HashSet::from(["l".to_string()]),
                rules: vec![SyntaxRule::new(vec![TokenType::Verb], ObjectCondition::empty(), ObjectCondition::empty(), None)],
            }],
            noise_words: HashSet::new(),
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        let vocab = vocab_with_look();
        let state = crate::world::tests_support::empty_state();
        assert_eq!(parse_command("   ", &vocab, &state), Err(ParseError::EmptyInput));
    }

    #[test]
    fn unknown_verb_reports_the_word() {
        let vocab = vocab_with_look();
        let state = crate::world::tests_support::empty_state();
        assert_eq!(
            parse_command("frobnicate", &vocab, &state),
            Err(ParseError::VerbUnknown("frobnicate".into()))
        );
    }

    #[test]
    fn bare_verb_with_no_args_resolves() {
        let vocab = vocab_with_look();
        let state = crate::world::tests_support::empty_state();
        let cmd = parse_command("look", &vocab, &state).unwrap();
        assert_eq!(cmd.verb.0, "look");
    }
}
