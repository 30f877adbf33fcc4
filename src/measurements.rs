//! Per-serving ingredient amounts for a recipe, tailored to a user's body and goal.
//!
//! A chat model proposes the amounts; this module builds the request, parses the
//! reply and drops anything that is not one of the recipe's own ingredients.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::corpus::{Recipe, RecipeDetails};
use crate::detection::endpoints::{ChatCompletionRequest, ChatMessage, MessageContent, Provider};
use crate::detection::strip_code_fence;
use crate::error::{DetectionError, MeasurementError};

const MEASUREMENT_PROMPT: &str = "You are a nutrition-aware recipe assistant.
You receive a recipe (ingredient names, steps, baseline nutrition per serving) and a user
profile (height in cm, weight in kg, goal: lose_weight, maintain or gain_weight).

Give realistic amounts for ONE serving of the recipe, tailored to the user's goal.
Take the user's current needs as the median calorie intake for their height and weight.
- lose_weight: stay at or below current needs, favour protein, moderate carbs, little added oil or sugar.
- maintain: stay within 10% of current needs.
- gain_weight: up to about 20% above current needs, mostly from carbs and healthy fats.
Keep amounts within normal cooking ranges per serving:
- added oils and butter 0-20 g, never above 30 g
- salt 0-5 g, never above 6 g
- sugar 0-20 g, never above 30 g
- spices and dried herbs usually 0-5 g each
- garlic about 3-10 g per clove; a medium onion about 110 g
Stay close to the baseline nutrition, but the user's goal comes first.
Use ONLY the listed ingredients.

Respond ONLY with a JSON array, no explanations and no code fences:
[{\"ingredient\": \"chicken breast\", \"grams\": 150}, {\"ingredient\": \"broccoli\", \"grams\": 80}]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Goal {
    LoseWeight,
    Maintain,
    GainWeight,
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Goal::LoseWeight => "lose_weight",
            Goal::Maintain => "maintain",
            Goal::GainWeight => "gain_weight",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub height_cm: f64,
    pub weight_kg: f64,
    pub goal: Goal,
}

impl UserProfile {
    pub fn new(height_cm: f64, weight_kg: f64, goal: Goal) -> Result<Self, MeasurementError> {
        let profile = Self {
            height_cm,
            weight_kg,
            goal,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Height and weight must be positive, finite numbers.
    pub fn validate(&self) -> Result<(), MeasurementError> {
        for (name, value) in [("height_cm", self.height_cm), ("weight_kg", self.weight_kg)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MeasurementError::InvalidProfile(format!("{name} = {value}")));
            }
        }
        Ok(())
    }
}

/// One ingredient amount for a single serving.
///
/// Models answer with `grams`, or sometimes with a free-form `"measurement with units"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientMeasurement {
    pub ingredient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grams: Option<f64>,
    #[serde(
        default,
        rename = "measurement with units",
        skip_serializing_if = "Option::is_none"
    )]
    pub measurement: Option<String>,
}

#[derive(Debug, Serialize)]
struct NutritionPerServing {
    calories: Option<f64>,
    fat_g: Option<f64>,
    sugar_g: Option<f64>,
    sodium_mg: Option<f64>,
    protein_g: Option<f64>,
    sat_fat_g: Option<f64>,
    carbs_g: Option<f64>,
}

impl From<&Recipe> for NutritionPerServing {
    fn from(recipe: &Recipe) -> Self {
        Self {
            calories: recipe.calories,
            fat_g: recipe.fat_g,
            sugar_g: recipe.sugar_g,
            sodium_mg: recipe.sodium_mg,
            protein_g: recipe.protein_g,
            sat_fat_g: recipe.sat_fat_g,
            carbs_g: recipe.carbs_g,
        }
    }
}

/// Asks a chat model for per-serving amounts.
#[derive(Debug, Clone)]
pub struct MeasurementEstimator {
    provider: Provider,
    model: String,
}

impl MeasurementEstimator {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn build_request(
        &self,
        details: &RecipeDetails,
        user: &UserProfile,
    ) -> Result<ChatCompletionRequest, MeasurementError> {
        let ingredients: Vec<&str> = details.ingredients.iter().map(|line| line.raw.as_str()).collect();
        let nutrition = serde_json::to_string(&NutritionPerServing::from(&details.recipe))
            .map_err(DetectionError::from)?;
        let content = [
            format!("INGREDIENTS:\n{}", ingredients.join("\n")),
            format!("STEPS:\n{}", details.recipe.steps.join("\n")),
            format!("NUTRITION PER SERVING:\n{}", nutrition),
            format!("HEIGHT IN CM:\n{}", user.height_cm),
            format!("WEIGHT IN KG:\n{}", user.weight_kg),
            format!("GOAL:\n{}", user.goal),
        ]
        .join("\n\n");

        Ok(ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: MessageContent::Text(MEASUREMENT_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: MessageContent::Text(content),
                },
            ],
            temperature: Some(0.0),
            max_tokens: Some(1024),
        })
    }

    /// Amounts for one serving of `details`, restricted to the recipe's ingredients.
    pub async fn estimate(
        &self,
        details: &RecipeDetails,
        user: &UserProfile,
    ) -> Result<Vec<IngredientMeasurement>, MeasurementError> {
        user.validate()?;
        if details.ingredients.is_empty() {
            return Err(MeasurementError::NoIngredients(details.recipe.id));
        }

        let request = self.build_request(details, user)?;
        debug!(recipe_id = details.recipe.id, model = %self.model, "Requesting measurements");
        let response = self.provider.call_chat_completion(&request).await?;
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .ok_or(DetectionError::EmptyResponse)?;

        let measurements = keep_recipe_ingredients(details, parse_measurements(content)?);
        info!(
            recipe_id = details.recipe.id,
            count = measurements.len(),
            "Measurements estimated"
        );
        Ok(measurements)
    }
}

/// Parses a JSON array of measurements, optionally wrapped in a code fence.
pub fn parse_measurements(text: &str) -> Result<Vec<IngredientMeasurement>, MeasurementError> {
    serde_json::from_str(strip_code_fence(text.trim())).map_err(MeasurementError::Parse)
}

/// Drops entries naming an ingredient the recipe does not list.
pub fn keep_recipe_ingredients(
    details: &RecipeDetails,
    measurements: Vec<IngredientMeasurement>,
) -> Vec<IngredientMeasurement> {
    let known: HashSet<&str> = details.ingredients.iter().map(|line| line.norm.as_str()).collect();
    measurements
        .into_iter()
        .filter(|m| {
            let listed = known.contains(m.ingredient.trim().to_lowercase().as_str());
            if !listed {
                warn!(ingredient = %m.ingredient, "Model added an ingredient the recipe does not list");
            }
            listed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::IngredientLine;

    fn omelette() -> RecipeDetails {
        let mut recipe = Recipe::new(7, "omelette", Some(3));
        recipe.calories = Some(320.0);
        recipe.steps = vec!["whisk the eggs".to_string(), "fry in butter".to_string()];
        RecipeDetails {
            recipe,
            ingredients: ["Eggs", "butter", "salt"]
                .iter()
                .map(|raw| IngredientLine {
                    raw: raw.to_string(),
                    norm: raw.to_lowercase(),
                })
                .collect(),
        }
    }

    fn user() -> UserProfile {
        UserProfile::new(172.0, 68.5, Goal::LoseWeight).unwrap()
    }

    #[test]
    fn test_parse_grams_and_units() {
        let parsed = parse_measurements(
            "```json\n[{\"ingredient\": \"eggs\", \"grams\": 120}, {\"ingredient\": \"salt\", \"measurement with units\": \"1 g (a pinch)\"}]\n```",
        )
        .unwrap();
        assert_eq!(parsed[0].grams, Some(120.0));
        assert_eq!(parsed[0].measurement, None);
        assert_eq!(parsed[1].grams, None);
        assert_eq!(parsed[1].measurement.as_deref(), Some("1 g (a pinch)"));
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(matches!(
            parse_measurements("Here are your amounts: eggs 120 g"),
            Err(MeasurementError::Parse(_))
        ));
    }

    #[test]
    fn test_unlisted_ingredients_dropped() {
        let measurements = parse_measurements(
            r#"[{"ingredient": "Eggs", "grams": 120}, {"ingredient": "bacon", "grams": 40}, {"ingredient": "butter", "grams": 10}]"#,
        )
        .unwrap();
        let kept: Vec<String> = keep_recipe_ingredients(&omelette(), measurements)
            .into_iter()
            .map(|m| m.ingredient)
            .collect();
        assert_eq!(kept, vec!["Eggs", "butter"]);
    }

    #[test]
    fn test_profile_validation() {
        assert!(UserProfile::new(0.0, 70.0, Goal::Maintain).is_err());
        assert!(UserProfile::new(170.0, f64::NAN, Goal::Maintain).is_err());
        assert!(UserProfile::new(170.0, -1.0, Goal::GainWeight).is_err());
        assert!(UserProfile::new(170.0, 70.0, Goal::GainWeight).is_ok());
    }

    #[test]
    fn test_goal_wire_names() {
        assert_eq!(serde_json::to_string(&Goal::LoseWeight).unwrap(), "\"lose_weight\"");
        assert_eq!(Goal::GainWeight.to_string(), "gain_weight");
    }

    #[test]
    fn test_build_request_lists_recipe_and_user() {
        let estimator = MeasurementEstimator::new(Provider::openrouter("UNUSED_KEY"), "google/gemini-2.5-flash");
        let request = estimator.build_request(&omelette(), &user()).unwrap();
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.messages[0].role, "system");
        let MessageContent::Text(content) = &request.messages[1].content else {
            panic!("expected text content");
        };
        assert!(content.contains("INGREDIENTS:\nEggs\nbutter\nsalt"));
        assert!(content.contains("STEPS:\nwhisk the eggs\nfry in butter"));
        assert!(content.contains("\"calories\":320.0"));
        assert!(content.contains("HEIGHT IN CM:\n172"));
        assert!(content.contains("WEIGHT IN KG:\n68.5"));
        assert!(content.contains("GOAL:\nlose_weight"));
    }

    #[tokio::test]
    async fn test_estimate_needs_ingredients_before_calling_model() {
        let estimator = MeasurementEstimator::new(Provider::openrouter("THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ"), "m");
        let mut details = omelette();
        details.ingredients.clear();
        let result = estimator.estimate(&details, &user()).await;
        assert!(matches!(result, Err(MeasurementError::NoIngredients(7))));
    }

    #[tokio::test]
    async fn test_estimate_reports_missing_api_key() {
        let estimator = MeasurementEstimator::new(Provider::openrouter("THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_ABXYZ"), "m");
        let result = estimator.estimate(&omelette(), &user()).await;
        assert!(matches!(result, Err(MeasurementError::Model(DetectionError::MissingApiKey(_)))));
    }
}
