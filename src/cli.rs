use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DEFAULT_LIMIT, DEFAULT_MAX_MISSING};
use crate::measurements::Goal;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recommend recipes from the ingredients you have", long_about = None)]
pub struct Cli {
    /// Corpus snapshot file (defaults to $RECIPE_CORPUS_PATH or recipes.bin)
    #[arg(long, global = true)]
    pub corpus: Option<PathBuf>,

    /// Fuzzy match cutoff, 0-100 (defaults to $INGREDIENT_MATCH_CUTOFF or 60)
    #[arg(long, global = true)]
    pub cutoff: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a corpus snapshot from the Food.com RAW_recipes.csv export
    Etl {
        #[arg(long)]
        csv: PathBuf,
        /// Output snapshot (defaults to the corpus path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print normalized labels
    Normalize {
        #[arg(required = true)]
        labels: Vec<String>,
    },
    /// Map labels onto the canonical vocabulary
    Canonicalize {
        #[arg(required = true)]
        labels: Vec<String>,
    },
    /// Show the canonical vocabulary
    Vocab {
        /// Print every name, not just the count
        #[arg(long)]
        list: bool,
    },
    /// Recommend recipes for a comma separated ingredient list
    Recommend {
        #[arg(short, long)]
        ingredients: String,
        #[command(flatten)]
        ranking: RankingArgs,
        /// Use the names as given (lowercased) instead of canonicalizing them
        #[arg(long)]
        raw: bool,
    },
    /// Detect ingredients in a JPEG/PNG photo
    Detect {
        #[arg(long)]
        image: PathBuf,
        /// Also recommend recipes for the detected ingredients
        #[arg(long)]
        recommend: bool,
        #[command(flatten)]
        ranking: RankingArgs,
    },
    /// Print one recipe with its ingredients
    Show { id: i64 },
    /// Estimate per-serving ingredient amounts of a recipe for a user
    Measure {
        id: i64,
        #[arg(long)]
        height_cm: f64,
        #[arg(long)]
        weight_kg: f64,
        #[arg(long, value_enum, default_value_t = Goal::Maintain)]
        goal: Goal,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct RankingArgs {
    /// How many recipe ingredients may be missing
    #[arg(long, default_value_t = DEFAULT_MAX_MISSING)]
    pub max_missing: u32,
    /// Maximum number of recipes returned
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommend_defaults() {
        let cli = Cli::try_parse_from(["recipe_match", "recommend", "-i", "apple, rice"]).unwrap();
        match cli.command {
            Command::Recommend { ingredients, ranking, raw } => {
                assert_eq!(ingredients, "apple, rice");
                assert_eq!(ranking.max_missing, 3);
                assert_eq!(ranking.limit, 20);
                assert!(!raw);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["recipe_match", "vocab", "--cutoff", "80", "--corpus", "x.bin"]).unwrap();
        assert_eq!(cli.cutoff, Some(80.0));
        assert_eq!(cli.corpus, Some(PathBuf::from("x.bin")));
    }

    #[test]
    fn test_measure_args() {
        let cli = Cli::try_parse_from([
            "recipe_match", "measure", "42", "--height-cm", "172", "--weight-kg", "68.5", "--goal", "lose_weight",
        ])
        .unwrap();
        match cli.command {
            Command::Measure { id, height_cm, weight_kg, goal } => {
                assert_eq!((id, height_cm, weight_kg, goal), (42, 172.0, 68.5, Goal::LoseWeight));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["recipe_match", "measure", "42", "--height-cm", "172"]).is_err());
    }

    #[test]
    fn test_normalize_requires_labels() {
        assert!(Cli::try_parse_from(["recipe_match", "normalize"]).is_err());
    }
}
