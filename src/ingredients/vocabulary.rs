use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::corpus::RecipeCorpus;
use crate::error::VocabularyError;

/// An immutable snapshot of the canonical ingredient names.
pub type Vocabulary = BTreeSet<String>;

/// Process-wide set of canonical ingredient names derived from the recipe corpus.
///
/// Readers receive an `Arc` snapshot; a refresh builds the next set completely before
/// swapping it in, so a reader sees either the old set or the new one, never a mix.
#[derive(Debug, Default)]
pub struct VocabularyStore {
    current: RwLock<Arc<Vocabulary>>,
}

impl VocabularyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        store.replace(names.into_iter().map(Into::into).collect());
        store
    }

    /// Current snapshot. Cheap: clones the `Arc`, not the set.
    pub fn get(&self) -> Arc<Vocabulary> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Swaps in a whole new vocabulary. Empty names are dropped.
    pub fn replace(&self, mut names: Vocabulary) {
        names.retain(|name| !name.is_empty());
        let next = Arc::new(names);
        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = next;
    }

    /// Rebuilds the vocabulary from the corpus' distinct `ingredient_norm` values.
    ///
    /// On a corpus read failure the previous snapshot is kept and
    /// [`VocabularyError::Unavailable`] is returned.
    pub fn refresh(&self, corpus: &dyn RecipeCorpus) -> Result<usize, VocabularyError> {
        let names = corpus
            .distinct_ingredient_norms()
            .map_err(VocabularyError::Unavailable)?;
        debug!(candidates = names.len(), "Rebuilding canonical vocabulary");
        self.replace(names);
        let size = self.len();
        info!(size, "Canonical vocabulary refreshed");
        Ok(size)
    }

    /// Like [`refresh`](Self::refresh) but treats an empty result as fatal.
    pub fn refresh_required(&self, corpus: &dyn RecipeCorpus) -> Result<usize, VocabularyError> {
        match self.refresh(corpus)? {
            0 => Err(VocabularyError::Empty),
            size => Ok(size),
        }
    }

    pub fn len(&self) -> usize {
        self.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }
}
