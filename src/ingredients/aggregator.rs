use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::canonicalizer::Canonicalizer;
use super::vocabulary::Vocabulary;

/// Aggregated ingredients whose best confidence is below this are dropped.
pub const MIN_CONFIDENCE: f64 = 0.3;

/// One sighting of an ingredient, from a model or split free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub label: String,
    pub confidence: f64,
}

impl RawDetection {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Builds a detection with `confidence` forced into `[0, 1]` (NaN becomes 0).
    pub fn clamped(label: impl Into<String>, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self::new(label, confidence)
    }
}

/// One unique canonical ingredient in a request's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedIngredient {
    pub name: String,
    pub confidence: f64,
    pub raw_labels: Vec<String>,
}

struct Bucket {
    name: String,
    max_conf: f64,
    raw_labels: Vec<String>,
}

/// Fuses detections into one entry per canonical name.
///
/// One vocabulary snapshot serves the whole call, so a concurrent refresh never mixes
/// old and new names in a single result. See [`aggregate_in`].
pub fn aggregate(canonicalizer: &Canonicalizer, detections: &[RawDetection]) -> Vec<AggregatedIngredient> {
    let vocabulary = canonicalizer.vocabulary().get();
    aggregate_in(canonicalizer, &vocabulary, detections)
}

/// Fuses detections against the given vocabulary snapshot.
///
/// A bucket's confidence is the maximum over its detections: repeated sightings never
/// push confidence above the single most confident one. Raw labels are kept in arrival
/// order, duplicates included. Output is sorted by confidence descending; equal
/// confidences keep first-seen order.
pub fn aggregate_in(
    canonicalizer: &Canonicalizer,
    vocabulary: &Vocabulary,
    detections: &[RawDetection],
) -> Vec<AggregatedIngredient> {
    let canonical: Vec<Option<String>> = detections
        .par_iter()
        .map(|detection| canonicalizer.canonicalize_in(vocabulary, &detection.label))
        .collect();

    let mut buckets: Vec<Bucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (detection, canon) in detections.iter().zip(canonical) {
        let Some(canon) = canon else {
            debug!(label = %detection.label, "Dropping detection without canonical match");
            continue;
        };

        match index.get(&canon) {
            Some(&slot) => {
                let bucket = &mut buckets[slot];
                bucket.max_conf = bucket.max_conf.max(detection.confidence);
                bucket.raw_labels.push(detection.label.clone());
            }
            None => {
                index.insert(canon.clone(), buckets.len());
                buckets.push(Bucket {
                    name: canon,
                    max_conf: detection.confidence,
                    raw_labels: vec![detection.label.clone()],
                });
            }
        }
    }

    let mut results: Vec<AggregatedIngredient> = buckets
        .into_iter()
        .filter(|bucket| bucket.max_conf >= MIN_CONFIDENCE)
        .map(|bucket| AggregatedIngredient {
            name: bucket.name,
            confidence: bucket.max_conf,
            raw_labels: bucket.raw_labels,
        })
        .collect();

    // Stable sort: ties stay in first-seen order.
    results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    debug!(detections = detections.len(), ingredients = results.len(), "Detections aggregated");
    results
}
