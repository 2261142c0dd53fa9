//! Multi-pattern keyword matcher.
//!
//! The keyword set is the union across every onboarded product and a cycle
//! may scan thousands of candidate texts, so each text must be scanned in a
//! single pass no matter how many keywords are configured. Classic
//! Aho-Corasick: a prefix tree with failure links, nodes held in an arena
//! and addressed by index so the back-pointer structure stays plain data.

use prospect_core::{KeywordEntry, MatchResult};
use std::collections::{HashMap, HashSet, VecDeque};

const ROOT: usize = 0;

#[derive(Debug, Default)]
struct Node {
    children: HashMap<char, usize>,
    fail: usize,
    /// Indices into `entries` for every keyword ending at this state,
    /// including those inherited from the failure chain.
    output: Vec<usize>,
}

#[derive(Debug)]
pub struct KeywordAutomaton {
    nodes: Vec<Node>,
    /// (keyword as configured, owning product id)
    entries: Vec<(String, i64)>,
}

impl KeywordAutomaton {
    /// Compile the current keyword set. The automaton is a read-only
    /// snapshot; a changed keyword set means building a fresh one.
    pub fn build(keywords: &[KeywordEntry]) -> Self {
        let mut nodes = vec![Node::default()];
        let mut entries = Vec::with_capacity(keywords.len());

        for entry in keywords {
            let lowered = entry.keyword.to_lowercase();
            if lowered.is_empty() {
                continue;
            }

            let mut state = ROOT;
            for character in lowered.chars() {
                let existing = nodes[state].children.get(&character).copied();
                state = match existing {
                    Some(next) => next,
                    None => {
                        nodes.push(Node::default());
                        let next = nodes.len() - 1;
                        nodes[state].children.insert(character, next);
                        next
                    }
                };
            }
            entries.push((entry.keyword.clone(), entry.product_id));
            let entry_index = entries.len() - 1;
            nodes[state].output.push(entry_index);
        }

        // Failure links, breadth-first from the root. A node reached via
        // `character` links to the deepest proper-suffix state reachable via
        // the same character from its parent's failure target. Output sets
        // are merged here so scans never chase failure links for output.
        let mut queue = VecDeque::new();
        let depth_one: Vec<usize> = nodes[ROOT].children.values().copied().collect();
        for state in depth_one {
            nodes[state].fail = ROOT;
            queue.push_back(state);
        }

        while let Some(current) = queue.pop_front() {
            let transitions: Vec<(char, usize)> = nodes[current]
                .children
                .iter()
                .map(|(&character, &child)| (character, child))
                .collect();

            for (character, child) in transitions {
                let mut fallback = nodes[current].fail;
                let target = loop {
                    if let Some(&next) = nodes[fallback].children.get(&character) {
                        break next;
                    }
                    if fallback == ROOT {
                        break ROOT;
                    }
                    fallback = nodes[fallback].fail;
                };

                nodes[child].fail = target;
                let inherited = nodes[target].output.clone();
                nodes[child].output.extend(inherited);
                queue.push_back(child);
            }
        }

        Self { nodes, entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pattern_count(&self) -> usize {
        self.entries.len()
    }

    /// One pass over the text; O(text length + matches) after construction.
    /// Results are unique per (product, keyword) and ordered by discovery.
    pub fn scan(&self, text: &str) -> Vec<MatchResult> {
        let lowered = text.to_lowercase();
        let mut state = ROOT;
        let mut seen: HashSet<(i64, &str)> = HashSet::new();
        let mut results = Vec::new();

        for character in lowered.chars() {
            while state != ROOT && !self.nodes[state].children.contains_key(&character) {
                state = self.nodes[state].fail;
            }
            if let Some(&next) = self.nodes[state].children.get(&character) {
                state = next;
            }

            for &entry_index in &self.nodes[state].output {
                let (keyword, product_id) = &self.entries[entry_index];
                if seen.insert((*product_id, keyword.as_str())) {
                    results.push(MatchResult {
                        keyword: keyword.clone(),
                        product_id: *product_id,
                    });
                }
            }
        }

        results
    }
}
