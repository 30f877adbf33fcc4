//! String similarity on a 0-100 scale, tolerant of word order, extra words and substrings.
//!
//! Every score is built on insertion/deletion distance: two strings sharing a longest
//! common subsequence of `lcs` characters score `200 * lcs / (len_a + len_b)`.

use std::collections::{BTreeSet, HashSet};

// Token based scores are discounted slightly so an exact character match still wins.
const UNBASE_SCALE: f64 = 0.95;
// Substring scores are discounted further, more so when one string dwarfs the other.
const PARTIAL_SCALE: f64 = 0.9;
const LONG_PARTIAL_SCALE: f64 = 0.6;
// Length ratios at which substring alignment starts, and at which it gets the long discount.
const PARTIAL_LEN_RATIO: f64 = 1.5;
const LONG_LEN_RATIO: f64 = 8.0;

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diag = 0;
        for (j, &cb) in b.iter().enumerate() {
            let up = row[j + 1];
            row[j + 1] = if ca == cb { diag + 1 } else { up.max(row[j]) };
            diag = up;
        }
    }
    row[b.len()]
}

fn indel_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Normalized insertion/deletion similarity, 0-100.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    indel_ratio(&a, &b)
}

/// Best [`ratio`] of the shorter string against any window of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    match a.len().cmp(&b.len()) {
        std::cmp::Ordering::Less => best_window(&a, &b),
        std::cmp::Ordering::Greater => best_window(&b, &a),
        std::cmp::Ordering::Equal => best_window(&a, &b).max(best_window(&b, &a)),
    }
}

// Windows that start or end on a character absent from the needle can always be
// trimmed to a better one, so they are skipped.
fn best_window(needle: &[char], haystack: &[char]) -> f64 {
    let chars: HashSet<char> = needle.iter().copied().collect();
    let (n, m) = (needle.len(), haystack.len());
    let mut best = 0.0f64;

    for end in 1..n {
        if chars.contains(&haystack[end - 1]) {
            best = best.max(indel_ratio(needle, &haystack[..end]));
        }
    }
    for start in 0..(m - n) {
        if chars.contains(&haystack[start + n - 1]) {
            best = best.max(indel_ratio(needle, &haystack[start..start + n]));
            if best >= 100.0 {
                return best;
            }
        }
    }
    for start in (m - n)..m {
        if chars.contains(&haystack[start]) {
            best = best.max(indel_ratio(needle, &haystack[start..]));
        }
    }
    best
}

/// Similarity after sorting the words of both strings.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_words(a), &sorted_words(b))
}

/// Similarity over shared and leftover word sets.
///
/// When every word of one string appears in the other the score is 100.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let a_tokens: BTreeSet<&str> = a.split_whitespace().collect();
    let b_tokens: BTreeSet<&str> = b.split_whitespace().collect();
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }

    let shared = join_words(a_tokens.intersection(&b_tokens));
    let only_a = join_words(a_tokens.difference(&b_tokens));
    let only_b = join_words(b_tokens.difference(&a_tokens));

    if !shared.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    let with_a = join_nonempty(&shared, &only_a);
    let with_b = join_nonempty(&shared, &only_b);
    ratio(&shared, &with_a)
        .max(ratio(&shared, &with_b))
        .max(ratio(&with_a, &with_b))
}

/// Substring similarity over words. Any shared word scores 100.
pub fn partial_token_ratio(a: &str, b: &str) -> f64 {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    let a_tokens: BTreeSet<&str> = a_words.iter().copied().collect();
    let b_tokens: BTreeSet<&str> = b_words.iter().copied().collect();
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }
    if !a_tokens.is_disjoint(&b_tokens) {
        return 100.0;
    }

    let sorted = partial_ratio(&sorted_words(a), &sorted_words(b));
    if a_words.len() == a_tokens.len() && b_words.len() == b_tokens.len() {
        return sorted;
    }
    // Repeated words: also compare the deduplicated sets.
    sorted.max(partial_ratio(&join_words(a_tokens.iter()), &join_words(b_tokens.iter())))
}

/// Best of the character, token and substring scores.
///
/// Strings of similar length are compared whole; once one is at least half again as long
/// as the other, substring alignment is tried with a discount.
pub fn weighted_ratio(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }

    let plain = ratio(a, b);
    let len_ratio = len_a.max(len_b) as f64 / len_a.min(len_b) as f64;
    if len_ratio < PARTIAL_LEN_RATIO {
        let tokens = token_sort_ratio(a, b).max(token_set_ratio(a, b));
        return plain.max(tokens * UNBASE_SCALE);
    }

    let partial_scale = if len_ratio < LONG_LEN_RATIO {
        PARTIAL_SCALE
    } else {
        LONG_PARTIAL_SCALE
    };
    let partial = plain.max(partial_ratio(a, b) * partial_scale);
    partial.max(partial_token_ratio(a, b) * UNBASE_SCALE * partial_scale)
}

fn sorted_words(s: &str) -> String {
    let mut words: Vec<&str> = s.split_whitespace().collect();
    words.sort_unstable();
    words.join(" ")
}

fn join_words<'a, 'b: 'a>(words: impl Iterator<Item = &'a &'b str>) -> String {
    words.copied().collect::<Vec<_>>().join(" ")
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}
