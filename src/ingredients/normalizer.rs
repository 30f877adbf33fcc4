//! Deterministic cleanup of a single ingredient label.

const STRIPPED_PUNCTUATION: &[char] = &[',', '.', '!', '?', ';', ':'];

// Plural -> singular forms that no suffix rule gets right.
const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("geese", "goose"),
    ("mice", "mouse"),
    ("leaves", "leaf"),
    ("loaves", "loaf"),
    ("halves", "half"),
    ("calves", "calf"),
    ("knives", "knife"),
    ("wives", "wife"),
    ("shelves", "shelf"),
    ("wolves", "wolf"),
    ("scarves", "scarf"),
];

// Words ending in "ies" whose singular keeps the "ie".
const IE_SINGULARS: &[&str] = &[
    "cookies", "pies", "brownies", "veggies", "smoothies", "movies", "calories", "ties",
    "birdies", "hoagies", "zombies",
];

// Words ending in "oes" whose singular keeps the "oe".
const OE_SINGULARS: &[&str] = &["shoes", "toes", "hoes", "floes", "canoes", "oboes"];

// Singular (or mass) nouns that look plural.
const UNCOUNTABLE: &[&str] = &[
    "series", "species", "news", "molasses", "grits", "swiss", "chassis", "gas", "yes",
];

/// Normalizes a free-text ingredient label.
///
/// Lowercases, turns `,.!?;:` into spaces, collapses whitespace and singularizes the
/// last word only. The result is empty when the label has no words.
///
/// ```
/// use recipe_match::ingredients::normalize_label;
///
/// assert_eq!(normalize_label("Apples!"), "apple");
/// assert_eq!(normalize_label("  Bell   Peppers "), "bell pepper");
/// ```
pub fn normalize_label(label: &str) -> String {
    let cleaned: String = label
        .to_lowercase()
        .chars()
        .map(|c| if STRIPPED_PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect();

    let mut words: Vec<String> = cleaned.split_whitespace().map(str::to_string).collect();
    if let Some(last) = words.last_mut() {
        if let Some(singular) = singularize(last) {
            *last = singular;
        }
    }
    words.join(" ")
}

/// Rule-based singular form of one lowercase word.
///
/// Returns `None` when the word already looks singular or no rule applies.
pub fn singularize(word: &str) -> Option<String> {
    if let Some((_, singular)) = IRREGULAR_PLURALS.iter().find(|(plural, _)| *plural == word) {
        return Some((*singular).to_string());
    }
    if UNCOUNTABLE.contains(&word) || word.len() < 3 {
        return None;
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return None;
    }
    if IE_SINGULARS.contains(&word) || OE_SINGULARS.contains(&word) {
        return Some(word[..word.len() - 1].to_string());
    }
    if word.ends_with("ies") && word.len() > 4 {
        return Some(format!("{}y", &word[..word.len() - 3]));
    }
    if word.ends_with("oes") && word.len() > 4 {
        return Some(word[..word.len() - 2].to_string());
    }
    if ["ches", "shes", "sses", "xes", "zzes"]
        .iter()
        .any(|suffix| word.ends_with(suffix))
    {
        return Some(word[..word.len() - 2].to_string());
    }
    if word.ends_with('s') {
        return Some(word[..word.len() - 1].to_string());
    }
    None
}
