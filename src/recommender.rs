use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::corpus::{RecipeCorpus, RecipeId};
use crate::error::CorpusError;

/// Penalty per recipe ingredient the query does not cover.
pub const MISSING_PENALTY: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub id: RecipeId,
    pub title: String,
    pub minutes: Option<u32>,
    pub calories: Option<f64>,
    pub match_count: u32,
    pub missing_count: i64,
    pub score: f64,
}

/// Ranks recipes by how well `ingredients` covers them.
///
/// `score = match_count - 0.1 * missing_count`. Recipes with no matches, an unknown
/// ingredient count, or more than `max_missing` uncovered ingredients are left out.
/// Results are ordered by score descending, then recipe id ascending, and truncated
/// to `limit`. An empty query yields no results.
pub fn recommend<C>(
    corpus: &C,
    ingredients: &BTreeSet<String>,
    max_missing: u32,
    limit: usize,
) -> Result<Vec<RecommendationResult>, CorpusError>
where
    C: RecipeCorpus + ?Sized,
{
    if ingredients.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let matches = corpus.match_counts(ingredients)?;
    let candidates = matches.len();

    let mut results: Vec<RecommendationResult> = matches
        .into_iter()
        .filter(|m| m.match_count > 0)
        .filter_map(|m| {
            let n_ingredients = m.recipe.n_ingredients?;
            let missing_count = i64::from(n_ingredients) - i64::from(m.match_count);
            if missing_count > i64::from(max_missing) {
                return None;
            }
            let score = f64::from(m.match_count) - MISSING_PENALTY * missing_count as f64;
            Some(RecommendationResult {
                id: m.recipe.id,
                title: m.recipe.title,
                minutes: m.recipe.minutes,
                calories: m.recipe.calories,
                match_count: m.match_count,
                missing_count,
                score,
            })
        })
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
    results.truncate(limit);

    debug!(
        query = ingredients.len(),
        candidates,
        returned = results.len(),
        "Recommendations ranked"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{InMemoryCorpus, Recipe, RecipeIngredient};
    use anyhow::Result;
    use proptest::prelude::*;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn corpus(recipes: &[(RecipeId, Option<u32>, &[&str])]) -> InMemoryCorpus {
        let mut rows = Vec::new();
        let recipes = recipes
            .iter()
            .map(|(id, n, ingredients)| {
                rows.extend(ingredients.iter().map(|i| RecipeIngredient::new(*id, i)));
                Recipe::new(*id, format!("recipe {id}"), *n)
            })
            .collect();
        InMemoryCorpus::new(recipes, rows)
    }

    #[test]
    fn test_full_coverage_included_and_sparse_excluded() -> Result<()> {
        let corpus = corpus(&[
            (1, Some(2), &["apple", "rice"]),
            (2, Some(5), &["apple", "flour", "sugar", "butter", "egg"]),
        ]);
        let results = recommend(&corpus, &names(&["apple", "rice"]), 1, 10)?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
        assert_eq!(results[0].match_count, 2);
        assert_eq!(results[0].missing_count, 0);
        assert_eq!(results[0].score, 2.0);
        Ok(())
    }

    #[test]
    fn test_empty_query_returns_nothing() -> Result<()> {
        let corpus = corpus(&[(1, Some(1), &["apple"])]);
        assert!(recommend(&corpus, &BTreeSet::new(), 10, 10)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_zero_limit_returns_nothing() -> Result<()> {
        let corpus = corpus(&[(1, Some(1), &["apple"])]);
        assert!(recommend(&corpus, &names(&["apple"]), 10, 0)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_unknown_ingredient_count_excluded() -> Result<()> {
        let corpus = corpus(&[(1, None, &["apple"]), (2, Some(1), &["apple"])]);
        let ids: Vec<RecipeId> = recommend(&corpus, &names(&["apple"]), 3, 10)?
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![2]);
        Ok(())
    }

    #[test]
    fn test_duplicate_rows_count_twice() -> Result<()> {
        let corpus = corpus(&[(1, Some(3), &["apple", "apple", "flour"])]);
        let results = recommend(&corpus, &names(&["apple"]), 3, 10)?;
        assert_eq!(results[0].match_count, 2);
        assert_eq!(results[0].missing_count, 1);
        assert!((results[0].score - 1.9).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_ties_broken_by_id() -> Result<()> {
        let corpus = corpus(&[
            (30, Some(2), &["apple", "x"]),
            (10, Some(2), &["apple", "y"]),
            (20, Some(1), &["apple"]),
        ]);
        let ids: Vec<RecipeId> = recommend(&corpus, &names(&["apple"]), 3, 10)?
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![20, 10, 30]);
        Ok(())
    }

    #[test]
    fn test_limit_truncates() -> Result<()> {
        let corpus = corpus(&[
            (1, Some(1), &["apple"]),
            (2, Some(1), &["apple"]),
            (3, Some(1), &["apple"]),
        ]);
        assert_eq!(recommend(&corpus, &names(&["apple"]), 0, 2)?.len(), 2);
        assert_eq!(recommend(&corpus, &names(&["apple"]), 0, 50)?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_max_missing_boundary_inclusive() -> Result<()> {
        let corpus = corpus(&[(1, Some(4), &["apple", "a", "b", "c"])]);
        assert_eq!(recommend(&corpus, &names(&["apple"]), 3, 10)?.len(), 1);
        assert!(recommend(&corpus, &names(&["apple"]), 2, 10)?.is_empty());
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_scores_non_increasing(
            recipes in prop::collection::vec(
                (1u32..6, prop::collection::vec(0usize..6, 1..6)),
                0..25,
            ),
            query in prop::collection::btree_set(0usize..6, 0..4),
            max_missing in 0u32..5,
        ) {
            const POOL: [&str; 6] = ["apple", "rice", "egg", "milk", "flour", "salt"];
            let mut rows = Vec::new();
            let recipes: Vec<Recipe> = recipes
                .iter()
                .enumerate()
                .map(|(i, (n, picks))| {
                    let id = i as RecipeId;
                    rows.extend(picks.iter().map(|p| RecipeIngredient::new(id, POOL[*p])));
                    Recipe::new(id, "r", Some(*n))
                })
                .collect();
            let corpus = InMemoryCorpus::new(recipes, rows);
            let query: BTreeSet<String> = query.iter().map(|p| POOL[*p].to_string()).collect();

            let results = recommend(&corpus, &query, max_missing, 100).unwrap();
            for pair in results.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert!(pair[0].id < pair[1].id);
                }
            }
            for r in &results {
                prop_assert!(r.match_count > 0);
                prop_assert!(r.missing_count <= i64::from(max_missing));
            }
        }
    }
}
