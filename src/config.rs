use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

pub const CORPUS_PATH_ENV_VAR: &str = "RECIPE_CORPUS_PATH";
pub const SCORE_CUTOFF_ENV_VAR: &str = "INGREDIENT_MATCH_CUTOFF";
pub const VISION_MODEL_ENV_VAR: &str = "VISION_MODEL";
pub const MEASUREMENT_MODEL_ENV_VAR: &str = "MEASUREMENT_MODEL";
pub const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

pub const DEFAULT_CORPUS_PATH: &str = "recipes.bin";
// Tuned for the corpus-derived vocabulary. A short hand-written vocabulary used 80.0.
pub const DEFAULT_SCORE_CUTOFF: f64 = 60.0;
pub const DEFAULT_VISION_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_MEASUREMENT_MODEL: &str = "google/gemini-2.5-flash";

pub const DEFAULT_MAX_MISSING: u32 = 3;
pub const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub corpus_path: PathBuf,
    pub score_cutoff: f64,
    pub vision_model: String,
    pub measurement_model: String,
    /// Name of the variable holding the model provider key.
    pub api_key_env_var: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from(DEFAULT_CORPUS_PATH),
            score_cutoff: DEFAULT_SCORE_CUTOFF,
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            measurement_model: DEFAULT_MEASUREMENT_MODEL.to_string(),
            api_key_env_var: API_KEY_ENV_VAR.to_string(),
        }
    }
}

impl Settings {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        if let Some(path) = lookup(CORPUS_PATH_ENV_VAR) {
            settings.corpus_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(SCORE_CUTOFF_ENV_VAR) {
            settings.score_cutoff = parse_cutoff(SCORE_CUTOFF_ENV_VAR, &raw)?;
        }
        if let Some(model) = lookup(VISION_MODEL_ENV_VAR) {
            settings.vision_model = model;
        }
        if let Some(model) = lookup(MEASUREMENT_MODEL_ENV_VAR) {
            settings.measurement_model = model;
        }
        Ok(settings)
    }
}

/// A similarity cutoff must be a number in `[0, 100]`.
pub fn parse_cutoff(key: &str, raw: &str) -> Result<f64, ConfigError> {
    let invalid = || ConfigError::Invalid {
        key: key.to_string(),
        value: raw.to_string(),
    };
    let value = raw.trim().parse::<f64>().map_err(|_| invalid())?;
    validate_cutoff(key, value).map_err(|_| invalid())
}

pub fn validate_cutoff(key: &str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.score_cutoff, 60.0);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (CORPUS_PATH_ENV_VAR, "/data/foodcom.bin"),
            (SCORE_CUTOFF_ENV_VAR, " 80 "),
            (VISION_MODEL_ENV_VAR, "other/model"),
            (MEASUREMENT_MODEL_ENV_VAR, "qwen/qwen3-32b"),
        ]))
        .unwrap();
        assert_eq!(settings.measurement_model, "qwen/qwen3-32b");
        assert_eq!(settings.corpus_path, PathBuf::from("/data/foodcom.bin"));
        assert_eq!(settings.score_cutoff, 80.0);
        assert_eq!(settings.vision_model, "other/model");
    }

    #[test]
    fn test_invalid_cutoff_rejected() {
        for bad in ["high", "-1", "100.5", "NaN"] {
            let err = Settings::from_lookup(lookup(&[(SCORE_CUTOFF_ENV_VAR, bad)])).unwrap_err();
            assert!(err.to_string().contains(SCORE_CUTOFF_ENV_VAR), "{bad}");
        }
    }
}
