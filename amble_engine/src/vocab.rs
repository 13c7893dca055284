//! Vocabulary and grammar: verbs, directions, prepositions, particles, and
//! the `SyntaxRule`/`ObjectCondition` patterns a command must satisfy.
//!
//! Grounded in the teacher's `Command` enum (command.rs) for the verb/
//! direction/particle lexicon, generalized from one fixed grammar rule per
//! verb into a data-driven list of [`SyntaxRule`]s per verb, as required for
//! the adjective/ambiguity/pronoun-aware parser.

use std::collections::HashSet;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::id::ItemId;

/// A verb identity. Distinct verbs may share surface synonyms (resolved via
/// [`Vocabulary::verb_synonyms`]) but are never conflated once matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Verb(pub String);

impl Verb {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, variantly::Variantly)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    Up,
    Down,
    In,
    Out,
}

impl Direction {
    pub fn short_alias(&self) -> &'static str {
        match self {
            Self::North => "n",
            Self::South => "s",
            Self::East => "e",
            Self::West => "w",
            Self::NorthEast => "ne",
            Self::NorthWest => "nw",
            Self::SouthEast => "se",
            Self::SouthWest => "sw",
            Self::Up => "u",
            Self::Down => "d",
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
            Self::NorthEast => Self::SouthWest,
            Self::SouthWest => Self::NorthEast,
            Self::NorthWest => Self::SouthEast,
            Self::SouthEast => Self::NorthWest,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preposition {
    In,
    On,
    With,
    Under,
    Behind,
    To,
    From,
    At,
    About,
}

/// A token required by a [`SyntaxRule`] that carries no scoped meaning of
/// its own beyond matching a literal word (e.g. "up" in "pick up").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Particle(pub String);

/// A reference a pronoun or "me"/"myself" can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, variantly::Variantly)]
pub enum EntityReference {
    Item(ItemId),
    Player,
}

bitflags! {
    /// Scope restrictions a [`SyntaxRule`] places on a direct or indirect object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ObjectCondition: u8 {
        const HELD            = 0b0000_0001;
        const IN_ROOM         = 0b0000_0010;
        const ON_GROUND       = 0b0000_0100;
        const ALLOWS_MULTIPLE = 0b0000_1000;
        const PERSON          = 0b0001_0000;
        const CONTAINER       = 0b0010_0000;
        const WORN            = 0b0100_0000;
    }
}

/// One token slot in a [`SyntaxRule`]'s pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Verb,
    DirectObject,
    IndirectObject,
    Preposition,
    Direction,
    Particle(String),
}

/// A grammar pattern plus object-scope conditions a command must satisfy
/// for a given verb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxRule {
    pub pattern: Vec<TokenType>,
    pub direct_object_conditions: ObjectCondition,
    pub indirect_object_conditions: ObjectCondition,
    pub required_preposition: Option<Preposition>,
}

impl SyntaxRule {
    /// Panics in debug builds if the invariant "`required_preposition` is
    /// present iff the pattern contains `Preposition`" is violated; content
    /// authors are expected to fix the rule, not the engine.
    pub fn new(
        pattern: Vec<TokenType>,
        direct_object_conditions: ObjectCondition,
        indirect_object_conditions: ObjectCondition,
        required_preposition: Option<Preposition>,
    ) -> Self {
        let has_prep_token = pattern.iter().any(|t| matches!(t, TokenType::Preposition));
        debug_assert_eq!(
            has_prep_token,
            required_preposition.is_some(),
            "required_preposition must be set iff pattern contains a Preposition token"
        );
        Self { pattern, direct_object_conditions, indirect_object_conditions, required_preposition }
    }
}

/// A verb's surface forms and the ordered rules the parser tries against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerbEntry {
    pub verb: Verb,
    pub synonyms: HashSet<String>,
    pub rules: Vec<SyntaxRule>,
}

/// The full lexicon: verb synonyms/rules, direction aliases, prepositions,
/// particles, and noise words dropped during tokenization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    pub verbs: Vec<VerbEntry>,
    pub noise_words: HashSet<String>,
}

impl Vocabulary {
    pub fn verb_for_word(&self, word: &str) -> Vec<&VerbEntry> {
        self.verbs
            .iter()
            .filter(|e| e.verb.0 == word || e.synonyms.contains(word))
            .collect()
    }
}

/// Builds the stock English vocabulary for the built-in verb library in
/// [`crate::handlers`]. A deployment with its own verbs/synonyms builds its
/// own `Vocabulary` instead; this is the default a fresh `Engine` is wired
/// up with, grounded in the teacher's own fixed `Command` lexicon
/// (command.rs) but expressed as data rather than an enum.
pub fn stock_vocabulary() -> Vocabulary {
    fn entry(verb: &str, synonyms: &[&str], rules: Vec<SyntaxRule>) -> VerbEntry {
        VerbEntry {
            verb: Verb::new(verb),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            rules,
        }
    }
    fn bare() -> SyntaxRule {
        SyntaxRule::new(vec![TokenType::Verb], ObjectCondition::empty(), ObjectCondition::empty(), None)
    }
    fn with_direct_object(conditions: ObjectCondition) -> SyntaxRule {
        SyntaxRule::new(vec![TokenType::Verb, TokenType::DirectObject], conditions, ObjectCondition::empty(), None)
    }

    Vocabulary {
        verbs: vec![
            entry("look", &["l"], vec![bare()]),
            entry("inventory", &["i", "inv"], vec![bare()]),
            entry("wait", &["z"], vec![bare()]),
            entry("score", &[], vec![bare()]),
            entry("quit", &["q"], vec![bare()]),
            entry("take", &["get", "grab"], vec![with_direct_object(ObjectCondition::ALLOWS_MULTIPLE)]),
            entry("drop", &[], vec![with_direct_object(ObjectCondition::HELD | ObjectCondition::ALLOWS_MULTIPLE)]),
            entry("open", &[], vec![with_direct_object(ObjectCondition::empty())]),
            entry(
                "unlock",
                &[],
                vec![SyntaxRule::new(
                    vec![TokenType::Verb, TokenType::DirectObject, TokenType::Preposition, TokenType::IndirectObject],
                    ObjectCondition::empty(),
                    ObjectCondition::HELD,
                    Some(Preposition::With),
                )],
            ),
            entry(
                "turn",
                &[],
                vec![SyntaxRule::new(
                    vec![TokenType::Verb, TokenType::Particle("on".into()), TokenType::DirectObject],
                    ObjectCondition::empty(),
                    ObjectCondition::empty(),
                    None,
                )],
            ),
            entry(
                "attack",
                &["hit", "fight"],
                vec![bare(), with_direct_object(ObjectCondition::PERSON)],
            ),
            entry("defend", &["block"], vec![bare()]),
            entry(
                "flee",
                &["run"],
                vec![bare(), SyntaxRule::new(vec![TokenType::Verb, TokenType::Direction], ObjectCondition::empty(), ObjectCondition::empty(), None)],
            ),
            entry("talk", &["yield", "surrender"], vec![bare()]),
        ],
        noise_words: ["please", "now", "then"].into_iter().map(String::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_vocabulary_resolves_every_handler_verb_and_its_synonyms() {
        let vocab = stock_vocabulary();
        for (word, expected_verb) in [("look", "look"), ("l", "look"), ("get", "take"), ("q", "quit"), ("hit", "attack")] {
            let matches = vocab.verb_for_word(word);
            assert_eq!(matches.len(), 1, "expected exactly one match for {word:?}");
            assert_eq!(matches[0].verb.0, expected_verb);
        }
    }

    #[test]
    fn object_condition_bits_compose() {
        let c = ObjectCondition::HELD | ObjectCondition::CONTAINER;
        assert!(c.contains(ObjectCondition::HELD));
        assert!(c.contains(ObjectCondition::CONTAINER));
        assert!(!c.contains(ObjectCondition::WORN));
    }

    #[test]
    fn direction_opposite_is_involutive() {
        for d in [Direction::North, Direction::Up, Direction::In, Direction::NorthEast] {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn verb_lookup_matches_synonyms() {
        let vocab = Vocabulary {
            verbs: vec![VerbEntry {
                verb: Verb::new("take"),
                synonyms: ["get", "grab"].into_iter().map(String::from).collect(),
                rules: vec![],
            }],
            noise_words: HashSet::new(),
        };
        assert_eq!(vocab.verb_for_word("grab").len(), 1);
        assert_eq!(vocab.verb_for_word("nonsense").len(), 0);
    }
}
