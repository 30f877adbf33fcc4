use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{CorpusSnapshot, Recipe, RecipeId, RecipeIngredient};
use crate::error::CorpusError;

// Food.com RAW_recipes.csv column headers
const NAME_COL: &str = "name";
const ID_COL: &str = "id";
const MINUTES_COL: &str = "minutes";
const NUTRITION_COL: &str = "nutrition";
const N_STEPS_COL: &str = "n_steps";
const STEPS_COL: &str = "steps";
const INGREDIENTS_COL: &str = "ingredients";
const N_INGREDIENTS_COL: &str = "n_ingredients";

/// Number of leading values in the `nutrition` column we map onto recipe fields.
const NUTRITION_FIELDS: usize = 7;

fn parse_optional<T: std::str::FromStr>(s: &str) -> Option<T> {
    s.trim().parse::<T>().ok()
}

/// `"[219.0, 10.0, ...]"` -> calories, fat, sugar, sodium, protein, saturated fat, carbs.
fn parse_nutrition(s: &str) -> [Option<f64>; NUTRITION_FIELDS] {
    let inner = s.trim();
    let Some(inner) = inner.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) else {
        return [None; NUTRITION_FIELDS];
    };
    let values: Option<Vec<f64>> = inner.split(',').map(|v| v.trim().parse::<f64>().ok()).collect();
    match values {
        Some(values) if values.len() >= NUTRITION_FIELDS => {
            let mut out = [None; NUTRITION_FIELDS];
            for (slot, value) in out.iter_mut().zip(values) {
                *slot = Some(value);
            }
            out
        }
        _ => [None; NUTRITION_FIELDS],
    }
}

/// Parses a Python-style list of quoted strings, e.g. `['a', "mom's"]`.
///
/// Returns `None` for anything that is not a well-formed list.
fn parse_quoted_list(s: &str) -> Option<Vec<String>> {
    let inner = s.trim().strip_prefix('[')?.strip_suffix(']')?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(quote) = chars.next() else { break };
        if quote != '\'' && quote != '"' {
            return None;
        }

        let mut item = String::new();
        loop {
            match chars.next()? {
                '\\' => item.push(unescape(&mut chars)?),
                c if c == quote => break,
                c => item.push(c),
            }
        }
        items.push(item.trim().to_string());

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }
    Some(items)
}

// Decodes the character after a backslash inside a quoted list item.
fn unescape(chars: &mut impl Iterator<Item = char>) -> Option<char> {
    match chars.next()? {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '0' => Some('\0'),
        'x' => hex_char(chars, 2),
        'u' => hex_char(chars, 4),
        other => Some(other),
    }
}

fn hex_char(chars: &mut impl Iterator<Item = char>, digits: usize) -> Option<char> {
    let code: String = chars.by_ref().take(digits).collect();
    if code.chars().count() != digits {
        return None;
    }
    u32::from_str_radix(&code, 16).ok().and_then(char::from_u32)
}

/// Loads the Food.com recipe export into a corpus snapshot.
pub fn load_food_com_csv(csv_path: &Path) -> Result<CorpusSnapshot, CorpusError> {
    if !csv_path.exists() {
        return Err(CorpusError::NotFound(csv_path.to_path_buf()));
    }

    let file = std::fs::File::open(csv_path)?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CorpusError::MissingColumn(name.to_string()))
    };

    let name_idx = column(NAME_COL)?;
    let id_idx = column(ID_COL)?;
    let minutes_idx = column(MINUTES_COL)?;
    let nutrition_idx = column(NUTRITION_COL)?;
    let n_steps_idx = column(N_STEPS_COL)?;
    let steps_idx = column(STEPS_COL)?;
    let ingredients_idx = column(INGREDIENTS_COL)?;
    let n_ingredients_idx = column(N_INGREDIENTS_COL)?;

    let mut snapshot = CorpusSnapshot::default();
    let mut seen_ids: HashSet<RecipeId> = HashSet::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record = result?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let title = field(name_idx).trim().to_string();
        if title.is_empty() {
            continue;
        }
        let Some(id) = parse_optional::<RecipeId>(field(id_idx)) else {
            debug!(row_index, "Skipping row without a numeric id");
            continue;
        };
        if !seen_ids.insert(id) {
            warn!(row_index, id, "Skipping row with an already loaded id");
            continue;
        }

        let [calories, fat_g, sugar_g, sodium_mg, protein_g, sat_fat_g, carbs_g] =
            parse_nutrition(field(nutrition_idx));

        let recipe = Recipe {
            id,
            title,
            minutes: parse_optional(field(minutes_idx)),
            calories,
            fat_g,
            sugar_g,
            sodium_mg,
            protein_g,
            sat_fat_g,
            carbs_g,
            n_steps: parse_optional(field(n_steps_idx)),
            steps: parse_quoted_list(field(steps_idx)).unwrap_or_default(),
            n_ingredients: parse_optional(field(n_ingredients_idx)),
        };

        let ingredients = parse_quoted_list(field(ingredients_idx)).unwrap_or_default();
        snapshot
            .ingredients
            .extend(ingredients.iter().map(|raw| RecipeIngredient::new(id, raw)));
        snapshot.recipes.push(recipe);

        if snapshot.recipes.len() % 5000 == 0 {
            info!(loaded = snapshot.recipes.len(), "Loading recipes...");
        }
    }

    if snapshot.recipes.is_empty() {
        return Err(CorpusError::Empty(csv_path.to_path_buf()));
    }

    info!(
        recipes = snapshot.recipes.len(),
        ingredients = snapshot.ingredients.len(),
        "Recipe CSV loaded"
    );
    Ok(snapshot)
}
