use anyhow::{bail, Context, Result};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recipe_match::cli::{parse_args, Command};
use recipe_match::config::{validate_cutoff, Settings};
use recipe_match::corpus::{load_food_com_csv, save_snapshot, InMemoryCorpus};
use recipe_match::detection::{Provider, TextDetectionSource, VisionDetectionSource};
use recipe_match::finder::{ingredient_names, RecipeFinder};
use recipe_match::measurements::{MeasurementEstimator, UserProfile};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_match=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_finder(corpus_path: &Path, score_cutoff: f64) -> Result<RecipeFinder> {
    let corpus = InMemoryCorpus::open(corpus_path)
        .with_context(|| format!("Failed to open recipe corpus at {:?} (run `etl` first)", corpus_path))?;
    RecipeFinder::start(Arc::new(corpus), score_cutoff).context("Failed to load canonical ingredients")
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = parse_args();
    let mut settings = Settings::from_env().context("Invalid configuration")?;
    if let Some(path) = cli.corpus {
        settings.corpus_path = path;
    }
    if let Some(cutoff) = cli.cutoff {
        settings.score_cutoff = validate_cutoff("--cutoff", cutoff)?;
    }

    match cli.command {
        Command::Etl { csv, out } => {
            let out = out.unwrap_or_else(|| settings.corpus_path.clone());
            info!(csv = %csv.display(), "Loading recipe CSV");
            let snapshot = load_food_com_csv(&csv)
                .with_context(|| format!("Failed to load recipes from {:?}", csv))?;
            save_snapshot(&snapshot, &out)
                .with_context(|| format!("Failed to write corpus snapshot to {:?}", out))?;
            println!(
                "ETL completed: {} recipes, {} ingredient rows -> {}",
                snapshot.recipes.len(),
                snapshot.ingredients.len(),
                out.display()
            );
        }
        Command::Normalize { labels } => {
            for label in labels {
                println!("{}", recipe_match::ingredients::normalize_label(&label));
            }
        }
        Command::Canonicalize { labels } => {
            let finder = open_finder(&settings.corpus_path, settings.score_cutoff)?;
            for label in labels {
                match finder.canonicalize(&label, settings.score_cutoff) {
                    Some(canonical) => println!("{} -> {}", label, canonical),
                    None => println!("{} -> <none>", label),
                }
            }
        }
        Command::Vocab { list } => {
            let finder = open_finder(&settings.corpus_path, settings.score_cutoff)?;
            let vocabulary = finder.vocabulary();
            println!("{} canonical ingredients", vocabulary.len());
            if list {
                for name in vocabulary.iter() {
                    println!("{}", name);
                }
            }
        }
        Command::Recommend {
            ingredients,
            ranking,
            raw,
        } => {
            let finder = open_finder(&settings.corpus_path, settings.score_cutoff)?;
            let source = TextDetectionSource::new(ingredients);
            let (aggregated, names) = if raw {
                let names: BTreeSet<String> = source
                    .detections()
                    .into_iter()
                    .map(|d| d.label.to_lowercase())
                    .collect();
                (Vec::new(), names)
            } else {
                let aggregated = finder.aggregate(&source.detections());
                let names = ingredient_names(&aggregated);
                (aggregated, names)
            };
            if names.is_empty() {
                warn!("None of the given ingredients matched the vocabulary");
            }
            let results = finder
                .recommend(&names, ranking.max_missing, ranking.limit)
                .context("Failed to rank recipes")?;
            print_json(&json!({ "ingredients": aggregated, "results": results }))?;
        }
        Command::Detect {
            image,
            recommend,
            ranking,
        } => {
            let finder = open_finder(&settings.corpus_path, settings.score_cutoff)?;
            let source = VisionDetectionSource::new(
                Provider::openrouter(&settings.api_key_env_var),
                settings.vision_model.clone(),
                image,
            );
            let aggregated = finder
                .detect_and_aggregate(&source)
                .await
                .with_context(|| format!("Ingredient detection failed for {:?}", source.image_path()))?;
            if recommend {
                let results = finder
                    .recommend(&ingredient_names(&aggregated), ranking.max_missing, ranking.limit)
                    .context("Failed to rank recipes")?;
                print_json(&json!({ "ingredients": aggregated, "results": results }))?;
            } else {
                print_json(&json!({ "ingredients": aggregated }))?;
            }
        }
        Command::Show { id } => {
            let finder = open_finder(&settings.corpus_path, settings.score_cutoff)?;
            match finder.recipe_details(id)? {
                Some(details) => print_json(&details)?,
                None => bail!("Recipe not found: {}", id),
            }
        }
        Command::Measure {
            id,
            height_cm,
            weight_kg,
            goal,
        } => {
            let user = UserProfile::new(height_cm, weight_kg, goal)?;
            let finder = open_finder(&settings.corpus_path, settings.score_cutoff)?;
            let estimator = MeasurementEstimator::new(
                Provider::openrouter(&settings.api_key_env_var),
                settings.measurement_model.clone(),
            );
            let measurements = finder
                .estimate_measurements(id, &user, &estimator)
                .await
                .with_context(|| format!("Measurement estimate failed for recipe {}", id))?;
            print_json(&json!({ "recipe_id": id, "user": user, "measurements": measurements }))?;
        }
    }

    Ok(())
}
