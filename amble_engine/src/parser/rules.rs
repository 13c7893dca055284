//! Steps 3-5 of §4.5: walking a `SyntaxRule`'s pattern against the token
//! stream, then resolving each noun phrase to candidate items.

use std::collections::HashSet;

use crate::command::{Command, ResolvedObject};
use crate::error::ParseError;
use crate::id::ItemId;
use crate::scope::reachable_items_by_player;
use crate::vocab::{Direction, ObjectCondition, Preposition, SyntaxRule, TokenType, Verb};
use crate::world::{GameState, Item, Parent};

const PRONOUNS: &[&str] = &["it", "them", "him", "her"];

/// Tries each of `verb`'s rules in declared order; returns the first full
/// match. If every rule fails, returns the most specific error seen
/// (falling back to `VerbSyntaxRulesAllFailed`).
pub fn match_rules(verb: &Verb, rules: &[SyntaxRule], tokens: &[String], state: &GameState) -> Result<Command, ParseError> {
    let mut last_err = None;
    for rule in rules {
        match match_one_rule(verb, rule, tokens, state) {
            Ok(command) => return Ok(command),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| ParseError::VerbSyntaxRulesAllFailed(verb.0.clone())))
}

fn preposition_word(word: &str) -> Option<Preposition> {
    Some(match word {
        "in" | "into" | "inside" => Preposition::In,
        "on" | "onto" => Preposition::On,
        "with" => Preposition::With,
        "under" => Preposition::Under,
        "behind" => Preposition::Behind,
        "to" => Preposition::To,
        "from" => Preposition::From,
        "at" => Preposition::At,
        "about" => Preposition::About,
        _ => return None,
    })
}

fn direction_word(word: &str) -> Option<Direction> {
    use Direction::*;
    for d in [North, South, East, West, NorthEast, NorthWest, SouthEast, SouthWest, Up, Down, In, Out] {
        if d.short_alias() == word || format!("{d:?}").to_lowercase() == word {
            return Some(d);
        }
    }
    None
}

fn match_one_rule(verb: &Verb, rule: &SyntaxRule, tokens: &[String], state: &GameState) -> Result<Command, ParseError> {
    let mut command = Command::new(verb.clone());
    let mut ti = 0usize;
    let pattern = &rule.pattern;

    for (pi, token_type) in pattern.iter().enumerate() {
        match token_type {
            TokenType::Verb => continue,
            TokenType::Direction => {
                let word = tokens.get(ti).ok_or(ParseError::ExpectedDirection)?;
                let dir = direction_word(word).ok_or(ParseError::ExpectedDirection)?;
                command.direction = Some(dir);
                ti += 1;
            }
            TokenType::Preposition => {
                let word = tokens.get(ti).ok_or_else(|| ParseError::ExpectedParticleButReachedEnd("preposition".into()))?;
                let prep = preposition_word(word)
                    .ok_or_else(|| ParseError::PrepositionMismatch {
                        verb: verb.0.clone(),
                        expected: format!("{:?}", rule.required_preposition),
                        found: word.clone(),
                    })?;
                if let Some(expected) = rule.required_preposition {
                    if expected != prep {
                        return Err(ParseError::PrepositionMismatch {
                            verb: verb.0.clone(),
                            expected: format!("{expected:?}"),
                            found: word.clone(),
                        });
                    }
                }
                command.preposition = Some(prep);
                ti += 1;
            }
            TokenType::Particle(expected) => {
                let word = tokens
                    .get(ti)
                    .ok_or_else(|| ParseError::ExpectedParticleButReachedEnd(expected.clone()))?;
                if word != expected {
                    return Err(ParseError::ExpectedParticleAfterVerb {
                        expected: expected.clone(),
                        verb: verb.0.clone(),
                        found: word.clone(),
                    });
                }
                ti += 1;
            }
            TokenType::DirectObject | TokenType::IndirectObject => {
                let is_last = pattern[pi + 1..].is_empty();
                let phrase_end = if is_last {
                    tokens.len()
                } else {
                    find_phrase_end(tokens, ti, &pattern[pi + 1..])
                };
                if phrase_end <= ti {
                    return Err(ParseError::VerbUnderstoodButSyntaxFailed(verb.0.clone()));
                }
                let phrase = &tokens[ti..phrase_end];
                let conditions = if matches!(token_type, TokenType::DirectObject) {
                    rule.direct_object_conditions
                } else {
                    rule.indirect_object_conditions
                };
                let resolved = resolve_noun_phrase(phrase, conditions, state)?;
                if matches!(token_type, TokenType::DirectObject) {
                    command.direct_object = Some(resolved);
                    command.modifiers = phrase[..phrase.len().saturating_sub(1)].to_vec();
                } else {
                    command.indirect_object = Some(resolved);
                }
                ti = phrase_end;
            }
        }
    }

    if ti < tokens.len() {
        return Err(ParseError::UnexpectedWordsAfterCommand(tokens[ti..].to_vec()));
    }

    Ok(command)
}

/// Scans forward from `start` looking for a token matching the next
/// literal requirement in the remaining pattern (a preposition word or an
/// exact particle), so the noun phrase consumes everything before it.
fn find_phrase_end(tokens: &[String], start: usize, remaining_pattern: &[TokenType]) -> usize {
    let next_particle = remaining_pattern.iter().find_map(|t| match t {
        TokenType::Particle(word) => Some(word.as_str()),
        _ => None,
    });
    let expects_preposition = remaining_pattern.iter().any(|t| matches!(t, TokenType::Preposition));

    if next_particle.is_none() && !expects_preposition {
        return tokens.len();
    }

    for (offset, word) in tokens[start..].iter().enumerate() {
        if Some(word.as_str()) == next_particle || (expects_preposition && preposition_word(word).is_some()) {
            return start + offset;
        }
    }
    tokens.len()
}

fn resolve_noun_phrase(phrase: &[String], conditions: ObjectCondition, state: &GameState) -> Result<ResolvedObject, ParseError> {
    let (adjectives, noun) = phrase.split_at(phrase.len() - 1);
    let noun = &noun[0];

    if noun == "all" {
        if !conditions.contains(ObjectCondition::ALLOWS_MULTIPLE) {
            return Err(ParseError::VerbDoesNotSupportMultipleObjects(noun.clone()));
        }
        let all = candidates(state, &[], conditions);
        if all.is_empty() {
            return Err(if conditions.contains(ObjectCondition::HELD) {
                ParseError::AllCommandNothingCarrying
            } else {
                ParseError::AllCommandNothingToTake
            });
        }
        return Ok(ResolvedObject::Multiple(all));
    }

    if PRONOUNS.contains(&noun.as_str()) {
        if !adjectives.is_empty() {
            return Err(ParseError::PronounCannotBeModified(noun.clone()));
        }
        let entities = state.pronouns.get(noun).ok_or_else(|| ParseError::PronounNotSet(noun.clone()))?;
        let item = entities.iter().find_map(|e| match e {
            crate::vocab::EntityReference::Item(id) => Some(*id),
            crate::vocab::EntityReference::Player => None,
        });
        return match item {
            Some(id) => Ok(ResolvedObject::Single(id)),
            None => Err(ParseError::PronounRefersToOutOfScopeItem(noun.clone())),
        };
    }

    if noun == "me" || noun == "myself" {
        if !adjectives.is_empty() {
            return Err(ParseError::PlayerReferenceCannotBeModified(noun.clone(), adjectives.to_vec()));
        }
        return Err(ParseError::ItemNotInScope(noun.clone()));
    }

    let matches = candidates(state, phrase, conditions);
    match matches.len() {
        0 => {
            if !adjectives.is_empty() {
                Err(ParseError::ModifierMismatch(noun.clone(), adjectives.to_vec()))
            } else if state.items.values().any(|i| i.matches_noun(noun)) {
                Err(ParseError::ItemNotInScope(noun.clone()))
            } else {
                Err(ParseError::VerbUnderstoodButSyntaxFailed(noun.clone()))
            }
        }
        1 => Ok(ResolvedObject::Single(*matches.iter().next().unwrap())),
        _ => {
            let mut names: Vec<String> = matches.iter().filter_map(|id| state.item(*id)).map(|i| i.name.clone()).collect();
            names.sort();
            Err(ParseError::AmbiguousObjectReference(noun.clone(), names))
        }
    }
}

fn candidates(state: &GameState, phrase: &[String], conditions: ObjectCondition) -> HashSet<ItemId> {
    let location = state.player.current_location_id;
    let in_scope = reachable_items_by_player(state, location);

    let (adjectives, noun) = if phrase.is_empty() { (&[][..], None) } else { (&phrase[..phrase.len() - 1], Some(&phrase[phrase.len() - 1])) };

    in_scope
        .into_iter()
        .filter_map(|id| state.item(id).map(|item| (id, item)))
        .filter(|(_, item)| noun.map(|n| item.matches_noun(n)).unwrap_or(true))
        .filter(|(_, item)| adjectives.iter().all(|a| item.has_adjective(a)))
        .filter(|(_, item)| object_conditions_satisfied(state, item, location, conditions))
        .map(|(id, _)| id)
        .collect()
}

fn object_conditions_satisfied(state: &GameState, item: &Item, location: crate::id::LocationId, conditions: ObjectCondition) -> bool {
    if conditions.contains(ObjectCondition::HELD) && item.parent != Parent::Player {
        return false;
    }
    if conditions.contains(ObjectCondition::ON_GROUND) && item.parent != Parent::Location(location) {
        return false;
    }
    if conditions.contains(ObjectCondition::CONTAINER) && !item.is_container {
        return false;
    }
    if conditions.contains(ObjectCondition::PERSON) && !item.is_person {
        return false;
    }
    if conditions.contains(ObjectCondition::WORN) && !item.is_worn {
        return false;
    }
    let _ = state;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::TokenType;
    use crate::world::tests_support::empty_state;

    #[test]
    fn bare_verb_pattern_matches_with_no_tokens() {
        let rule = SyntaxRule::new(vec![TokenType::Verb], ObjectCondition::empty(), ObjectCondition::empty(), None);
        let state = empty_state();
        let cmd = match_one_rule(&Verb::new("wait"), &rule, &[], &state).unwrap();
        assert_eq!(cmd.verb.0, "wait");
    }

    #[test]
    fn extra_words_after_pattern_is_an_error() {
        let rule = SyntaxRule::new(vec![TokenType::Verb], ObjectCondition::empty(), ObjectCondition::empty(), None);
        let state = empty_state();
        let tokens = vec!["now".to_string()];
        let err = match_one_rule(&Verb::new("wait"), &rule, &tokens, &state);
        assert!(matches!(err, Err(ParseError::UnexpectedWordsAfterCommand(_))));
    }

    #[test]
    fn direct_object_with_no_candidates_in_empty_world_is_not_in_scope_error() {
        let rule = SyntaxRule::new(
            vec![TokenType::Verb, TokenType::DirectObject],
            ObjectCondition::HELD,
            ObjectCondition::empty(),
            None,
        );
        let state = empty_state();
        let tokens = vec!["lamp".to_string()];
        let err = match_one_rule(&Verb::new("take"), &rule, &tokens, &state);
        assert!(matches!(err, Err(ParseError::VerbUnderstoodButSyntaxFailed(_))));
    }
}
