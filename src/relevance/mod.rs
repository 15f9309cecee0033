pub mod engine;
pub mod local;
pub mod scorer;
pub mod vocabulary;

pub use engine::{PageOutcome, RelevanceEngine, VideoEvaluator};
pub use local::LocalHeuristicClassifier;
pub use scorer::RelevanceScorer;
