pub mod data_loader;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::CorpusError;

pub use data_loader::load_food_com_csv;

pub type RecipeId = i64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub minutes: Option<u32>,
    pub calories: Option<f64>,
    pub fat_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub protein_g: Option<f64>,
    pub sat_fat_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub n_steps: Option<u32>,
    pub steps: Vec<String>,
    pub n_ingredients: Option<u32>,
}

impl Recipe {
    /// A recipe with only the fields the recommender needs; the rest left empty.
    pub fn new(id: RecipeId, title: impl Into<String>, n_ingredients: Option<u32>) -> Self {
        Self {
            id,
            title: title.into(),
            minutes: None,
            calories: None,
            fat_g: None,
            sugar_g: None,
            sodium_mg: None,
            protein_g: None,
            sat_fat_g: None,
            carbs_g: None,
            n_steps: None,
            steps: Vec::new(),
            n_ingredients,
        }
    }

    pub fn summary(&self) -> RecipeSummary {
        RecipeSummary {
            id: self.id,
            title: self.title.clone(),
            minutes: self.minutes,
            calories: self.calories,
            n_ingredients: self.n_ingredients,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipeIngredient {
    pub recipe_id: RecipeId,
    pub ingredient_raw: String,
    pub ingredient_norm: String,
}

impl RecipeIngredient {
    /// Row whose match key is the trimmed, lowercased raw text.
    pub fn new(recipe_id: RecipeId, ingredient_raw: &str) -> Self {
        let ingredient_raw = ingredient_raw.trim().to_string();
        Self {
            recipe_id,
            ingredient_norm: ingredient_raw.to_lowercase(),
            ingredient_raw,
        }
    }
}

/// The recipe columns a recommendation needs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub title: String,
    pub minutes: Option<u32>,
    pub calories: Option<f64>,
    pub n_ingredients: Option<u32>,
}

/// A recipe with at least one ingredient row matching a query.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeMatch {
    pub recipe: RecipeSummary,
    pub match_count: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IngredientLine {
    pub raw: String,
    pub norm: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipeDetails {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<IngredientLine>,
}

/// Read-only queries the matching core needs from recipe storage.
pub trait RecipeCorpus: Send + Sync {
    /// Distinct, non-empty `ingredient_norm` values across all recipes.
    fn distinct_ingredient_norms(&self) -> Result<BTreeSet<String>, CorpusError>;

    /// Every recipe with at least one ingredient row whose `ingredient_norm` is in
    /// `ingredients`, with the number of such rows (duplicate rows each count).
    fn match_counts(&self, ingredients: &BTreeSet<String>) -> Result<Vec<RecipeMatch>, CorpusError>;

    fn recipe_details(&self, id: RecipeId) -> Result<Option<RecipeDetails>, CorpusError>;
}

/// Serialized form of a corpus, written by the ETL step.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CorpusSnapshot {
    pub recipes: Vec<Recipe>,
    pub ingredients: Vec<RecipeIngredient>,
}

pub fn save_snapshot(snapshot: &CorpusSnapshot, path: &Path) -> Result<(), CorpusError> {
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, snapshot)?;
    info!(
        recipes = snapshot.recipes.len(),
        ingredients = snapshot.ingredients.len(),
        path = %path.display(),
        "Corpus snapshot written"
    );
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<CorpusSnapshot, CorpusError> {
    if !path.exists() {
        return Err(CorpusError::NotFound(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    let snapshot: CorpusSnapshot = bincode::deserialize_from(reader)?;
    Ok(snapshot)
}

/// Corpus held in memory, indexed by recipe id.
#[derive(Debug, Default)]
pub struct InMemoryCorpus {
    recipes: BTreeMap<RecipeId, Recipe>,
    ingredients: Vec<RecipeIngredient>,
}

impl InMemoryCorpus {
    /// Ingredient rows pointing at unknown recipes are discarded.
    ///
    /// Rows cannot be told apart between recipes sharing an id, so a duplicated id is
    /// dropped together with all of its rows.
    pub fn new(recipes: Vec<Recipe>, ingredients: Vec<RecipeIngredient>) -> Self {
        let mut by_id: BTreeMap<RecipeId, Recipe> = BTreeMap::new();
        let mut duplicated: BTreeSet<RecipeId> = BTreeSet::new();
        for recipe in recipes {
            let id = recipe.id;
            if by_id.insert(id, recipe).is_some() {
                duplicated.insert(id);
            }
        }
        for id in &duplicated {
            warn!(id, "Dropping recipe with duplicated id");
            by_id.remove(id);
        }

        let ingredients = ingredients
            .into_iter()
            .filter(|ing| by_id.contains_key(&ing.recipe_id))
            .collect();
        Self {
            recipes: by_id,
            ingredients,
        }
    }

    pub fn from_snapshot(snapshot: CorpusSnapshot) -> Self {
        Self::new(snapshot.recipes, snapshot.ingredients)
    }

    pub fn open(path: &Path) -> Result<Self, CorpusError> {
        let corpus = Self::from_snapshot(load_snapshot(path)?);
        info!(
            recipes = corpus.recipe_count(),
            ingredients = corpus.ingredients.len(),
            "Corpus loaded"
        );
        Ok(corpus)
    }

    pub fn to_snapshot(&self) -> CorpusSnapshot {
        CorpusSnapshot {
            recipes: self.recipes.values().cloned().collect(),
            ingredients: self.ingredients.clone(),
        }
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    /// Deletes a recipe and all of its ingredient rows.
    pub fn remove_recipe(&mut self, id: RecipeId) -> Option<Recipe> {
        let removed = self.recipes.remove(&id)?;
        self.ingredients.retain(|ing| ing.recipe_id != id);
        Some(removed)
    }
}

impl RecipeCorpus for InMemoryCorpus {
    fn distinct_ingredient_norms(&self) -> Result<BTreeSet<String>, CorpusError> {
        Ok(self
            .ingredients
            .iter()
            .filter(|ing| !ing.ingredient_norm.is_empty())
            .map(|ing| ing.ingredient_norm.clone())
            .collect())
    }

    fn match_counts(&self, ingredients: &BTreeSet<String>) -> Result<Vec<RecipeMatch>, CorpusError> {
        if ingredients.is_empty() {
            return Ok(Vec::new());
        }

        let counts: HashMap<RecipeId, u32> = self
            .ingredients
            .par_iter()
            .filter(|ing| ingredients.contains(&ing.ingredient_norm))
            .fold(HashMap::new, |mut acc, ing| {
                *acc.entry(ing.recipe_id).or_insert(0) += 1;
                acc
            })
            .reduce(HashMap::new, |mut left, right| {
                for (id, count) in right {
                    *left.entry(id).or_insert(0) += count;
                }
                left
            });

        let mut matches: Vec<RecipeMatch> = counts
            .into_iter()
            .filter_map(|(id, match_count)| {
                self.recipes.get(&id).map(|recipe| RecipeMatch {
                    recipe: recipe.summary(),
                    match_count,
                })
            })
            .collect();
        matches.sort_by_key(|m| m.recipe.id);
        Ok(matches)
    }

    fn recipe_details(&self, id: RecipeId) -> Result<Option<RecipeDetails>, CorpusError> {
        Ok(self.recipes.get(&id).map(|recipe| RecipeDetails {
            recipe: recipe.clone(),
            ingredients: self
                .ingredients
                .iter()
                .filter(|ing| ing.recipe_id == id)
                .map(|ing| IngredientLine {
                    raw: ing.ingredient_raw.clone(),
                    norm: ing.ingredient_norm.clone(),
                })
                .collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::NamedTempFile;

    fn sample_corpus() -> InMemoryCorpus {
        let recipes = vec![
            Recipe::new(1, "apple rice", Some(2)),
            Recipe::new(2, "apple pie", Some(4)),
            Recipe::new(3, "plain rice", Some(1)),
        ];
        let ingredients = vec![
            RecipeIngredient::new(1, "Apple"),
            RecipeIngredient::new(1, "rice"),
            RecipeIngredient::new(2, "apple"),
            RecipeIngredient::new(2, "apple"),
            RecipeIngredient::new(2, "flour"),
            RecipeIngredient::new(2, "sugar"),
            RecipeIngredient::new(3, "rice"),
            RecipeIngredient::new(99, "orphan"),
        ];
        InMemoryCorpus::new(recipes, ingredients)
    }

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ingredient_norm_is_lowercased_and_trimmed() {
        let ing = RecipeIngredient::new(7, "  Green Onions ");
        assert_eq!(ing.ingredient_raw, "Green Onions");
        assert_eq!(ing.ingredient_norm, "green onions");
    }

    #[test]
    fn test_distinct_norms_skip_orphans() -> Result<()> {
        let norms = sample_corpus().distinct_ingredient_norms()?;
        assert_eq!(norms, names(&["apple", "flour", "rice", "sugar"]));
        Ok(())
    }

    #[test]
    fn test_match_counts_per_row() -> Result<()> {
        let matches = sample_corpus().match_counts(&names(&["apple", "rice"]))?;
        let counts: Vec<(RecipeId, u32)> = matches.iter().map(|m| (m.recipe.id, m.match_count)).collect();
        assert_eq!(counts, vec![(1, 2), (2, 2), (3, 1)]);
        Ok(())
    }

    #[test]
    fn test_match_counts_empty_query() -> Result<()> {
        assert!(sample_corpus().match_counts(&BTreeSet::new())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_remove_recipe_cascades() -> Result<()> {
        let mut corpus = sample_corpus();
        assert!(corpus.remove_recipe(2).is_some());
        assert!(corpus.remove_recipe(2).is_none());
        let norms = corpus.distinct_ingredient_norms()?;
        assert!(!norms.contains("flour"));
        assert!(corpus.recipe_details(2)?.is_none());
        Ok(())
    }

    #[test]
    fn test_recipe_details_lists_rows() -> Result<()> {
        let details = sample_corpus().recipe_details(1)?.expect("recipe 1 exists");
        assert_eq!(details.recipe.title, "apple rice");
        assert_eq!(
            details.ingredients,
            vec![
                IngredientLine { raw: "Apple".into(), norm: "apple".into() },
                IngredientLine { raw: "rice".into(), norm: "rice".into() },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_snapshot_save_and_open() -> Result<()> {
        let file = NamedTempFile::new()?;
        let corpus = sample_corpus();
        save_snapshot(&corpus.to_snapshot(), file.path())?;
        let reopened = InMemoryCorpus::open(file.path())?;
        assert_eq!(reopened.recipe_count(), 3);
        assert_eq!(reopened.to_snapshot(), corpus.to_snapshot());
        Ok(())
    }

    #[test]
    fn test_open_missing_snapshot() {
        let err = InMemoryCorpus::open(Path::new("no_such_snapshot.bin")).unwrap_err();
        assert!(matches!(err, CorpusError::NotFound(_)));
    }

    #[test]
    fn test_duplicated_id_dropped_with_its_rows() -> Result<()> {
        let corpus = InMemoryCorpus::new(
            vec![
                Recipe::new(1, "toast", Some(1)),
                Recipe::new(7, "omelette", Some(2)),
                Recipe::new(7, "fried egg", Some(1)),
            ],
            vec![
                RecipeIngredient::new(1, "bread"),
                RecipeIngredient::new(7, "egg"),
                RecipeIngredient::new(7, "butter"),
                RecipeIngredient::new(7, "egg"),
            ],
        );
        assert_eq!(corpus.recipe_count(), 1);
        assert!(corpus.recipe_details(7)?.is_none());
        assert_eq!(corpus.distinct_ingredient_norms()?, names(&["bread"]));
        assert!(corpus.match_counts(&names(&["egg"]))?.is_empty());
        Ok(())
    }
}
