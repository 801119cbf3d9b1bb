//! Claim-bearing sentence reduction.
//!
//! Long content is reduced to the subset of sentences that carry marketing
//! or medical claims before it reaches the reasoner, capping token usage
//! while keeping everything an auditor needs to see.

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use regex::Regex;

/// Inputs at or below this length pass through untouched.
const REDUCTION_TRIGGER_CHARS: usize = 2_000;

/// Claim vocabulary: health-claim verbs, medical nouns, effectiveness
/// adjectives, and comparatives.
const CLAIM_TERMS: &[&str] = &[
    // health-claim verbs
    "cure", "treat", "heal", "prevent",
    // medical nouns
    "medicine", "drug", "treatment", "therapy",
    // effectiveness adjectives
    "effective", "works", "improves", "boosts",
    // comparatives
    "better", "best", "faster", "stronger",
];

static CLAIM_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(CLAIM_TERMS)
        .expect("static claim patterns")
});

static CLAIM_NUMBERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+\s*%|in\s+\d+\s+days").unwrap());

fn is_claim_bearing(sentence: &str) -> bool {
    CLAIM_MATCHER.is_match(sentence) || CLAIM_NUMBERS.is_match(sentence)
}

/// Split on sentence terminators, including the Devanagari danda, keeping
/// newline-separated fragments as their own sentences.
fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| matches!(c, '.' | '!' | '?' | '।' | '\n'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn cap_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// Fraction of sentences carrying claims. Used by the model router's
/// complexity predicate.
pub fn claim_density(text: &str) -> f64 {
    let mut total = 0usize;
    let mut claims = 0usize;
    for sentence in split_sentences(text) {
        total += 1;
        if is_claim_bearing(sentence) {
            claims += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        claims as f64 / total as f64
    }
}

/// Reduce `input` to its claim-bearing subset when it exceeds the trigger
/// length. When nothing matches, the capped prefix is returned instead so
/// the reasoner always receives content.
pub fn reduce(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= REDUCTION_TRIGGER_CHARS {
        return input.to_string();
    }

    let kept: Vec<&str> = split_sentences(input).filter(|s| is_claim_bearing(s)).collect();
    if kept.is_empty() {
        return cap_chars(input, max_chars);
    }

    cap_chars(&kept.join(". "), max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_passes_through() {
        let text = "This cures everything.";
        assert_eq!(reduce(text, 10_000), text);
    }

    #[test]
    fn keeps_only_claim_sentences() {
        let filler = "The weather in the city was pleasant throughout the spring festival season this year. ";
        let claim = "Our tonic cures joint pain in 7 days. ";
        let mut text = String::new();
        for _ in 0..40 {
            text.push_str(filler);
        }
        text.push_str(claim);
        for _ in 0..10 {
            text.push_str(filler);
        }
        assert!(text.chars().count() > REDUCTION_TRIGGER_CHARS);

        let reduced = reduce(&text, 10_000);
        assert!(reduced.contains("cures joint pain"));
        assert!(!reduced.contains("weather in the city"));
        // Target reduction: well under half of the original.
        assert!(reduced.chars().count() < text.chars().count() / 2);
    }

    #[test]
    fn numeric_claims_are_kept() {
        let filler = "Nothing remarkable is stated in this particular sentence about the brand story. ";
        let mut text = String::new();
        for _ in 0..40 {
            text.push_str(filler);
        }
        text.push_str("Results visible in 10 days for 95% of users. ");
        let reduced = reduce(&text, 10_000);
        assert!(reduced.contains("95%"));
        assert!(reduced.contains("in 10 days"));
    }

    #[test]
    fn no_match_falls_back_to_prefix() {
        let filler = "An unremarkable sentence describing the company history and its founders in detail. ";
        let mut text = String::new();
        for _ in 0..60 {
            text.push_str(filler);
        }
        let reduced = reduce(&text, 500);
        assert_eq!(reduced.chars().count(), 500);
        assert!(text.starts_with(&reduced));
    }

    #[test]
    fn claim_density_reflects_claim_share() {
        let dense = "This cures colds. It treats flu. Works in 3 days.";
        assert!(claim_density(dense) > 0.9);
        let sparse = "We opened a new office. The team grew. This tonic cures nothing.";
        let density = claim_density(sparse);
        assert!(density > 0.2 && density < 0.5);
        assert_eq!(claim_density(""), 0.0);
    }

    #[test]
    fn output_respects_cap() {
        let claim = "This medicine is the best and works faster than anything else on the market today. ";
        let mut text = String::new();
        for _ in 0..200 {
            text.push_str(claim);
        }
        let reduced = reduce(&text, 1_000);
        assert!(reduced.chars().count() <= 1_000);
    }
}
