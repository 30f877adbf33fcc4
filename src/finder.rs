//! Entry point for calling layers: one value wiring the corpus, the vocabulary and the
//! matching pipeline together.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use crate::corpus::{RecipeCorpus, RecipeDetails, RecipeId};
use crate::detection::DetectionSource;
use crate::error::{CorpusError, DetectionError, MeasurementError, VocabularyError};
use crate::ingredients::{
    aggregate, normalize_label, AggregatedIngredient, Canonicalizer, RawDetection, Vocabulary,
    VocabularyStore,
};
use crate::measurements::{IngredientMeasurement, MeasurementEstimator, UserProfile};
use crate::recommender::{recommend, RecommendationResult};

pub struct RecipeFinder {
    corpus: Arc<dyn RecipeCorpus>,
    canonicalizer: Canonicalizer,
}

impl RecipeFinder {
    /// Builds a finder without touching the corpus. The vocabulary starts empty.
    pub fn new(corpus: Arc<dyn RecipeCorpus>, score_cutoff: f64) -> Self {
        let vocabulary = Arc::new(VocabularyStore::new());
        Self {
            corpus,
            canonicalizer: Canonicalizer::new(vocabulary, score_cutoff),
        }
    }

    /// Builds a finder and populates the vocabulary; fails if it ends up empty.
    pub fn start(corpus: Arc<dyn RecipeCorpus>, score_cutoff: f64) -> Result<Self, VocabularyError> {
        let finder = Self::new(corpus, score_cutoff);
        let size = finder.canonicalizer.vocabulary().refresh_required(finder.corpus.as_ref())?;
        info!(size, score_cutoff, "Loaded canonical ingredients");
        Ok(finder)
    }

    pub fn score_cutoff(&self) -> f64 {
        self.canonicalizer.score_cutoff()
    }

    pub fn normalize(&self, label: &str) -> String {
        normalize_label(label)
    }

    pub fn canonicalize(&self, label: &str, score_cutoff: f64) -> Option<String> {
        self.canonicalizer.map_to_canonical(label, score_cutoff)
    }

    pub fn aggregate(&self, detections: &[RawDetection]) -> Vec<AggregatedIngredient> {
        aggregate(&self.canonicalizer, detections)
    }

    pub fn recommend(
        &self,
        ingredients: &BTreeSet<String>,
        max_missing: u32,
        limit: usize,
    ) -> Result<Vec<RecommendationResult>, CorpusError> {
        recommend(self.corpus.as_ref(), ingredients, max_missing, limit)
    }

    pub fn refresh_vocabulary(&self) -> Result<usize, VocabularyError> {
        self.canonicalizer.vocabulary().refresh(self.corpus.as_ref())
    }

    pub fn vocabulary(&self) -> Arc<Vocabulary> {
        self.canonicalizer.vocabulary().get()
    }

    pub fn recipe_details(&self, id: RecipeId) -> Result<Option<RecipeDetails>, CorpusError> {
        self.corpus.recipe_details(id)
    }

    /// Runs `source` and aggregates whatever it reports.
    pub async fn detect_and_aggregate<S>(&self, source: &S) -> Result<Vec<AggregatedIngredient>, DetectionError>
    where
        S: DetectionSource,
    {
        let detections = source.detect().await?;
        Ok(self.aggregate(&detections))
    }

    /// Per-serving amounts of recipe `id`'s ingredients for `user`.
    pub async fn estimate_measurements(
        &self,
        id: RecipeId,
        user: &UserProfile,
        estimator: &MeasurementEstimator,
    ) -> Result<Vec<IngredientMeasurement>, MeasurementError> {
        let details = self
            .recipe_details(id)?
            .ok_or(MeasurementError::RecipeNotFound(id))?;
        estimator.estimate(&details, user).await
    }
}

/// Canonical names of aggregated ingredients, ready for [`recommend`].
pub fn ingredient_names(ingredients: &[AggregatedIngredient]) -> BTreeSet<String> {
    ingredients.iter().map(|i| i.name.clone()).collect()
}
