//! Matching-strategy seam.
//!
//! The crawler went through two matcher generations: an all-words-present
//! check and the compiled automaton. Both live behind one interface and the
//! choice is made once at composition time.

use crate::automaton::KeywordAutomaton;
use prospect_core::{KeywordEntry, MatchResult};
use std::collections::HashSet;

pub trait MatchStrategy: Send + Sync {
    /// Every (keyword, product) association the text matches, unique per
    /// pair within the call.
    fn scan(&self, text: &str) -> Vec<MatchResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    Automaton,
    AllWords,
}

pub fn build_strategy(kind: MatcherKind, keywords: &[KeywordEntry]) -> Box<dyn MatchStrategy> {
    match kind {
        MatcherKind::Automaton => Box::new(AutomatonMatcher::new(keywords)),
        MatcherKind::AllWords => Box::new(AllWordsMatcher::new(keywords)),
    }
}

pub struct AutomatonMatcher {
    automaton: KeywordAutomaton,
}

impl AutomatonMatcher {
    pub fn new(keywords: &[KeywordEntry]) -> Self {
        Self {
            automaton: KeywordAutomaton::build(keywords),
        }
    }
}

impl MatchStrategy for AutomatonMatcher {
    fn scan(&self, text: &str) -> Vec<MatchResult> {
        self.automaton.scan(text)
    }
}

/// Legacy matcher: fires when every whitespace-separated word of the keyword
/// occurs somewhere in the text, contiguous or not. Over-matches relative to
/// phrase matching; kept for comparison runs.
pub struct AllWordsMatcher {
    entries: Vec<(String, Vec<String>, i64)>,
}

impl AllWordsMatcher {
    pub fn new(keywords: &[KeywordEntry]) -> Self {
        let entries = keywords
            .iter()
            .filter_map(|entry| {
                let words: Vec<String> = entry
                    .keyword
                    .to_lowercase()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                if words.is_empty() {
                    None
                } else {
                    Some((entry.keyword.clone(), words, entry.product_id))
                }
            })
            .collect();
        Self { entries }
    }
}

impl MatchStrategy for AllWordsMatcher {
    fn scan(&self, text: &str) -> Vec<MatchResult> {
        let lowered = text.to_lowercase();
        let mut seen: HashSet<(i64, &str)> = HashSet::new();
        let mut results = Vec::new();

        for (keyword, words, product_id) in &self.entries {
            if words.iter().all(|word| lowered.contains(word))
                && seen.insert((*product_id, keyword.as_str()))
            {
                results.push(MatchResult {
                    keyword: keyword.clone(),
                    product_id: *product_id,
                });
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<KeywordEntry> {
        vec![
            KeywordEntry {
                keyword: "task management".to_string(),
                product_id: 1,
            },
            KeywordEntry {
                keyword: "management".to_string(),
                product_id: 2,
            },
        ]
    }

    #[test]
    fn test_strategies_agree_on_contiguous_phrases() {
        let text = "need task management now";
        for kind in [MatcherKind::Automaton, MatcherKind::AllWords] {
            let strategy = build_strategy(kind, &keywords());
            let results = strategy.scan(text);
            assert_eq!(results.len(), 2, "strategy {kind:?}");
        }
    }

    #[test]
    fn test_all_words_over_matches_split_phrases() {
        // "task ... management" non-contiguous: the phrase matcher stays
        // quiet, the legacy matcher fires.
        let text = "the task of project management";

        let automaton = build_strategy(MatcherKind::Automaton, &keywords());
        let automaton_results = automaton.scan(text);
        assert!(!automaton_results
            .iter()
            .any(|m| m.keyword == "task management"));

        let all_words = build_strategy(MatcherKind::AllWords, &keywords());
        let all_words_results = all_words.scan(text);
        assert!(all_words_results
            .iter()
            .any(|m| m.keyword == "task management"));
    }

    #[test]
    fn test_all_words_deduplicates_per_pair() {
        let entries = vec![
            KeywordEntry {
                keyword: "crm".to_string(),
                product_id: 1,
            },
            KeywordEntry {
                keyword: "crm".to_string(),
                product_id: 1,
            },
        ];
        let strategy = AllWordsMatcher::new(&entries);
        assert_eq!(strategy.scan("crm crm").len(), 1);
    }
}
