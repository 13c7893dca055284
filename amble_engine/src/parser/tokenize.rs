//! Step 1 of §4.5: whitespace/punctuation tokenization, lowercasing, and
//! noise-word removal.

use crate::vocab::Vocabulary;

const ARTICLES: &[&str] = &["a", "an", "the"];

/// Splits on whitespace and punctuation, lowercases, and drops noise words
/// declared in the vocabulary. Articles are dropped too -- lexer lookup
/// tables for English articles are an external collaborator's concern
/// (§1), not the tokenizer's; by the time a caller reaches this engine, the
/// article has already served its only purpose (disambiguating that a noun
/// phrase follows) and carries no further grammatical weight here.
pub fn tokenize(input: &str, vocab: &Vocabulary) -> Vec<String> {
    input
        .split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '\''))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .filter(|word| !ARTICLES.contains(&word.as_str()))
        .filter(|word| !vocab.noise_words.contains(word))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn vocab() -> Vocabulary {
        Vocabulary { verbs: vec![], noise_words: HashSet::from(["please".to_string()]) }
    }

    #[test]
    fn drops_articles_and_noise_words() {
        let tokens = tokenize("please take the brass key", &vocab());
        assert_eq!(tokens, vec!["take", "brass", "key"]);
    }

    #[test]
    fn lowercases_and_splits_on_punctuation() {
        let tokens = tokenize("Open, the DOOR!", &vocab());
        assert_eq!(tokens, vec!["open", "door"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("   ", &vocab()).is_empty());
    }
}
