pub mod automaton;
pub mod matcher;
pub mod orchestrator;

pub use automaton::KeywordAutomaton;
pub use matcher::{build_strategy, AllWordsMatcher, AutomatonMatcher, MatchStrategy, MatcherKind};
pub use orchestrator::{
    run_discovery_cycle, Blocklist, CycleOptions, CycleSummary, DiscoveryStore, ItemSource,
};
