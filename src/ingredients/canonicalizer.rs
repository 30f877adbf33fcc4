use std::sync::Arc;

use tracing::{debug, warn};

use super::normalizer::normalize_label;
use super::similarity::weighted_ratio;
use super::vocabulary::{Vocabulary, VocabularyStore};

/// Maps noisy ingredient labels onto the canonical vocabulary.
///
/// The cutoff has no built-in default; callers pass the configured value.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    vocabulary: Arc<VocabularyStore>,
    score_cutoff: f64,
}

/// A vocabulary entry together with its similarity score (0-100).
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalMatch {
    pub name: String,
    pub score: f64,
}

impl Canonicalizer {
    pub fn new(vocabulary: Arc<VocabularyStore>, score_cutoff: f64) -> Self {
        Self {
            vocabulary,
            score_cutoff,
        }
    }

    pub fn score_cutoff(&self) -> f64 {
        self.score_cutoff
    }

    pub fn vocabulary(&self) -> &Arc<VocabularyStore> {
        &self.vocabulary
    }

    /// Canonical name for `label` using the configured cutoff.
    pub fn canonicalize(&self, label: &str) -> Option<String> {
        self.map_to_canonical(label, self.score_cutoff)
    }

    /// Like [`canonicalize`](Self::canonicalize), against a vocabulary snapshot the caller holds.
    pub fn canonicalize_in(&self, vocabulary: &Vocabulary, label: &str) -> Option<String> {
        best_match_in(vocabulary, label, self.score_cutoff).map(|m| m.name)
    }

    /// Canonical name for `label`, or `None` when nothing scores at least `score_cutoff`.
    pub fn map_to_canonical(&self, label: &str, score_cutoff: f64) -> Option<String> {
        self.best_match(label, score_cutoff).map(|m| m.name)
    }

    /// Best scoring entry of the current vocabulary at or above `score_cutoff`.
    pub fn best_match(&self, label: &str, score_cutoff: f64) -> Option<CanonicalMatch> {
        best_match_in(&self.vocabulary.get(), label, score_cutoff)
    }
}

/// Best scoring entry of `vocabulary` at or above `score_cutoff`.
///
/// Entries are scanned in sorted order and the first of equally scored entries wins.
/// A cutoff outside `[0, 100]` (NaN included) matches nothing.
pub fn best_match_in(vocabulary: &Vocabulary, label: &str, score_cutoff: f64) -> Option<CanonicalMatch> {
    if !(0.0..=100.0).contains(&score_cutoff) {
        warn!(label, score_cutoff, "Score cutoff out of range");
        return None;
    }
    let normalized = normalize_label(label);
    if normalized.is_empty() {
        return None;
    }

    let mut best: Option<CanonicalMatch> = None;
    for candidate in vocabulary.iter() {
        let score = weighted_ratio(&normalized, candidate);
        if score < score_cutoff {
            continue;
        }
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(CanonicalMatch {
                name: candidate.clone(),
                score,
            });
            if score >= 100.0 {
                break;
            }
        }
    }

    match &best {
        Some(m) => debug!(label, canonical = %m.name, score = m.score, "Label canonicalized"),
        None => debug!(label, normalized = %normalized, score_cutoff, "No canonical match"),
    }
    best
}
