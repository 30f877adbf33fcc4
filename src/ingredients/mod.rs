pub mod aggregator;
pub mod canonicalizer;
pub mod normalizer;
pub mod similarity;
pub mod vocabulary;

pub use aggregator::{aggregate, aggregate_in, AggregatedIngredient, RawDetection, MIN_CONFIDENCE};
pub use canonicalizer::{best_match_in, CanonicalMatch, Canonicalizer};
pub use normalizer::{normalize_label, singularize};
pub use vocabulary::{Vocabulary, VocabularyStore};
