//! Extracted-text sufficiency scoring and the content-loss guard.
//!
//! A failed verdict is a signal, not a fatal error: the strategy runner may
//! continue to the next extractor, or the pipeline may proceed on a
//! best-effort basis when nothing better is available.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::error::AuditError;

const MIN_VALID_CHARS: usize = 3_000;
const MIN_VALID_WORDS: usize = 450;
const MIN_HEADING_HEAVY_WORDS: usize = 900;

/// Maximum fraction of raw text the cleaner is allowed to discard.
const MAX_CLEANING_LOSS: f64 = 0.40;

static TRUNCATION_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)read more|continue reading|subscribe to read|view more").unwrap()
});

#[derive(Debug, Clone)]
pub struct TextStats {
    pub length: usize,
    pub word_count: usize,
    pub heading_heavy: bool,
    pub truncation_suspected: bool,
}

#[derive(Debug, Clone)]
pub struct Verdict {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub reasons: Vec<String>,
    pub stats: TextStats,
}

fn is_heading_like(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with('#') || trimmed.ends_with(':') {
        return true;
    }
    if trimmed.split_whitespace().count() <= 6 {
        return true;
    }
    let letters: Vec<char> = trimmed.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 6 && letters.iter().all(|c| c.is_uppercase())
}

pub fn stats(text: &str) -> TextStats {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let total = lines.len().max(1);

    let heading_like = lines.iter().filter(|l| is_heading_like(l)).count();
    let prose_lines = lines
        .iter()
        .filter(|l| l.split_whitespace().count() >= 12)
        .count();

    let heading_heavy = heading_like as f64 / total as f64 >= 0.70
        && (prose_lines as f64 / total as f64) < 0.25;

    let trimmed = text.trim_end();
    let truncation_suspected = trimmed.ends_with('…')
        || trimmed.ends_with("...")
        || TRUNCATION_MARKERS.is_match(text);

    TextStats {
        length: text.chars().count(),
        word_count: text.split_whitespace().count(),
        heading_heavy,
        truncation_suspected,
    }
}

/// Score `text` for audit sufficiency.
pub fn validate(text: &str) -> Verdict {
    let stats = stats(text);
    let mut warnings = Vec::new();
    let mut reasons = Vec::new();

    if stats.truncation_suspected {
        warnings.push("truncation_suspected".to_string());
    }
    if stats.heading_heavy {
        warnings.push("heading_heavy".to_string());
    }

    if stats.length < MIN_VALID_CHARS {
        reasons.push(format!("length {} below {MIN_VALID_CHARS}", stats.length));
    }
    if stats.word_count < MIN_VALID_WORDS {
        reasons.push(format!(
            "word count {} below {MIN_VALID_WORDS}",
            stats.word_count
        ));
    }
    if stats.heading_heavy && stats.word_count < MIN_HEADING_HEAVY_WORDS {
        reasons.push(format!(
            "heading-heavy with only {} words",
            stats.word_count
        ));
    }

    Verdict {
        is_valid: reasons.is_empty(),
        warnings,
        reasons,
        stats,
    }
}

/// The content-loss guard: cleaning may not discard more than 40% of the raw
/// text. Tripping it abandons the extractor attempt.
pub fn enforce_content_loss_guard(raw: &str, cleaned: &str) -> Result<(), AuditError> {
    let raw_len = raw.chars().count();
    if raw_len == 0 {
        return Ok(());
    }
    let cleaned_len = cleaned.chars().count();
    let lost = raw_len.saturating_sub(cleaned_len) as f64 / raw_len as f64;
    if lost > MAX_CLEANING_LOSS {
        return Err(AuditError::CleaningLoss {
            lost_pct: lost * 100.0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(words: usize) -> String {
        // Thirteen-word sentences so lines never register as heading-like.
        let sentence = "the advertised supplement was reviewed by independent auditors across several regions last year";
        let mut out = String::new();
        let mut count = 0;
        while count < words {
            out.push_str(sentence);
            out.push_str(".\n");
            count += 13;
        }
        out
    }

    #[test]
    fn long_prose_is_valid() {
        let verdict = validate(&prose(1_000));
        assert!(verdict.is_valid, "reasons: {:?}", verdict.reasons);
    }

    #[test]
    fn short_text_is_flagged() {
        let verdict = validate("too short");
        assert!(!verdict.is_valid);
        assert!(verdict.reasons.len() >= 2);
    }

    #[test]
    fn heading_heavy_detection() {
        let text = "INTRODUCTION\nOur Products:\n# Pricing\nFAQ\nCONTACT US NOW\nShipping:\nReturns policy:\nABOUT THE TEAM\n";
        let s = stats(text);
        assert!(s.heading_heavy);
    }

    #[test]
    fn prose_is_not_heading_heavy() {
        assert!(!stats(&prose(600)).heading_heavy);
    }

    #[test]
    fn truncation_markers_detected() {
        assert!(stats("some paragraph that ends abruptly...").truncation_suspected);
        assert!(stats("paragraph\nsubscribe to read the rest").truncation_suspected);
        assert!(!stats(&prose(100)).truncation_suspected);
    }

    #[test]
    fn loss_guard_trips_above_forty_percent() {
        let raw = "x".repeat(100);
        assert!(enforce_content_loss_guard(&raw, &"x".repeat(60)).is_ok());
        let err = enforce_content_loss_guard(&raw, &"x".repeat(59)).unwrap_err();
        assert!(matches!(err, AuditError::CleaningLoss { .. }));
    }

    #[test]
    fn loss_guard_ignores_empty_raw() {
        assert!(enforce_content_loss_guard("", "").is_ok());
    }
}
