//! Deterministic string similarity for the third scoring stage
//!
//! No I/O, no state. Comparison is case-insensitive over unicode
//! characters. Levenshtein uses the two-row formulation; Jaro-Winkler
//! applies the standard prefix bonus above the 0.7 threshold.

use intent_router_config::{CompareField, SimilarityAlgorithm, StringSimilarityConfig};
use intent_router_core::Template;

/// Edit distance between two strings, case-insensitive.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.to_lowercase().chars().collect();
    let s2_chars: Vec<char> = s2.to_lowercase().chars().collect();
    let len1 = s1_chars.len();
    let len2 = s2_chars.len();

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    // Two rows instead of the full matrix.
    let mut prev_row: Vec<usize> = (0..=len2).collect();
    let mut curr_row: Vec<usize> = vec![0; len2 + 1];

    for i in 1..=len1 {
        curr_row[0] = i;
        for j in 1..=len2 {
            let cost = usize::from(s1_chars[i - 1] != s2_chars[j - 1]);
            curr_row[j] = std::cmp::min(
                std::cmp::min(prev_row[j] + 1, curr_row[j - 1] + 1),
                prev_row[j - 1] + cost,
            );
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[len2]
}

/// Levenshtein similarity ratio in [0, 1].
pub fn levenshtein_ratio(s1: &str, s2: &str) -> f64 {
    let max_len = s1.chars().count().max(s2.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(s1, s2) as f64 / max_len as f64
}

fn jaro(s1: &[char], s2: &[char]) -> f64 {
    if s1.is_empty() && s2.is_empty() {
        return 1.0;
    }
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }

    let window = (s1.len().max(s2.len()) / 2).saturating_sub(1);
    let mut s1_matched = vec![false; s1.len()];
    let mut s2_matched = vec![false; s2.len()];
    let mut matches = 0usize;

    for (i, &c1) in s1.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(s2.len());
        for j in start..end {
            if !s2_matched[j] && s2[j] == c1 {
                s1_matched[i] = true;
                s2_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0usize;
    let mut j = 0usize;
    for (i, &c1) in s1.iter().enumerate() {
        if s1_matched[i] {
            while !s2_matched[j] {
                j += 1;
            }
            if c1 != s2[j] {
                transpositions += 1;
            }
            j += 1;
        }
    }

    let m = matches as f64;
    (m / s1.len() as f64 + m / s2.len() as f64 + (m - transpositions as f64 / 2.0) / m) / 3.0
}

/// Jaro-Winkler similarity in [0, 1], case-insensitive.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let s1: Vec<char> = a.to_lowercase().chars().collect();
    let s2: Vec<char> = b.to_lowercase().chars().collect();
    let jaro_score = jaro(&s1, &s2);
    if jaro_score <= 0.7 {
        return jaro_score;
    }
    let prefix = s1
        .iter()
        .zip(s2.iter())
        .take(4)
        .take_while(|(c1, c2)| c1 == c2)
        .count();
    jaro_score + prefix as f64 * 0.1 * (1.0 - jaro_score)
}

pub fn similarity(algorithm: SimilarityAlgorithm, a: &str, b: &str) -> f64 {
    match algorithm {
        SimilarityAlgorithm::JaroWinkler => jaro_winkler(a, b),
        SimilarityAlgorithm::Levenshtein => levenshtein_ratio(a, b),
    }
}

/// Best similarity between the query and the configured template
/// fields. `None` when no configured field has text to compare.
pub fn best_field_similarity(
    query: &str,
    template: &Template,
    config: &StringSimilarityConfig,
) -> Option<f64> {
    let mut best: Option<f64> = None;
    for field in &config.compare_fields {
        let text = match field {
            CompareField::Description => Some(template.description.as_str()),
            CompareField::BestExample => template.best_example(),
        };
        let Some(text) = text else { continue };
        if text.is_empty() {
            continue;
        }
        let score = similarity(config.algorithm, query, text);
        best = Some(best.map_or(score, |b: f64| b.max(score)));
    }
    best
}
