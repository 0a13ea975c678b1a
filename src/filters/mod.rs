pub mod engine;
pub mod rules;

pub use engine::{build_filter_engine, BlockedItem, FilterEngine, FilterStats, FilteredContent};
pub use rules::RuleEvaluator;
