//! Text cleaning: conservative noise removal that must never drop paragraphs.

use std::collections::HashSet;
use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use regex::Regex;

/// Navigation boilerplate markers. A short line containing any of these is
/// chrome, not content.
const NAV_TERMS: &[&str] = &[
    "home",
    "about",
    "contact",
    "privacy",
    "terms",
    "cookie",
    "subscribe",
    "newsletter",
    "sign in",
    "sign up",
    "login",
    "register",
    "follow",
    "share",
    "advert",
    "sponsored",
    "related posts",
    "comments",
    "categories",
    "tags",
    "sidebar",
];

const SIDEBAR_TERMS: &[&str] = &["popular", "recent", "recommended", "archive"];

/// Short lines matching these are dropped; lines at or above this length are
/// checked no further.
const SHORT_LINE_CHARS: usize = 90;

/// Lines at or above this length are never dropped, whatever they contain.
const LONG_LINE_CHARS: usize = 120;

static NAV_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    let patterns: Vec<&str> = NAV_TERMS.iter().chain(SIDEBAR_TERMS.iter()).copied().collect();
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(patterns)
        .expect("static nav-term patterns")
});

static INTRA_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());

/// Clean raw extracted text: normalize line endings, collapse intra-line
/// whitespace, drop empties, drop short navigation lines, and deduplicate
/// repeated short lines. Long lines are always preserved; the cleaner is
/// deliberately conservative so paragraphs survive.
pub fn clean(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut seen_short: HashSet<String> = HashSet::new();
    let mut kept: Vec<String> = Vec::new();

    for line in normalized.split('\n') {
        let line = INTRA_WS.replace_all(line.trim(), " ").into_owned();
        if line.is_empty() {
            continue;
        }

        let char_len = line.chars().count();
        if char_len >= LONG_LINE_CHARS {
            kept.push(line);
            continue;
        }

        if char_len < SHORT_LINE_CHARS {
            if NAV_MATCHER.is_match(&line) {
                continue;
            }
            if !seen_short.insert(line.to_lowercase()) {
                continue;
            }
        }

        kept.push(line);
    }

    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_whitespace_and_line_endings() {
        let cleaned = clean("first   line\r\nsecond\t\tline\r\n\r\n");
        assert_eq!(cleaned, "first line\nsecond line");
    }

    #[test]
    fn drops_short_nav_lines() {
        let raw = "Subscribe to our newsletter\nThis medicine claim is the actual paragraph body of the promotional copy under careful review by the auditors.\nSign in";
        let cleaned = clean(raw);
        assert!(!cleaned.to_lowercase().contains("subscribe"));
        assert!(!cleaned.to_lowercase().contains("sign in"));
        assert!(cleaned.contains("actual paragraph body"));
    }

    #[test]
    fn long_lines_never_dropped() {
        // A long line containing a nav term must survive.
        let long = format!(
            "Share this incredible story about how the product changed lives across the country, {}",
            "with testimonials gathered over many years of community outreach and care."
        );
        assert!(long.chars().count() >= 120);
        let cleaned = clean(&long);
        assert_eq!(cleaned, long);
    }

    #[test]
    fn deduplicates_short_lines_case_insensitively() {
        let raw = "Buy one get one free today only here\nBUY ONE GET ONE FREE TODAY ONLY HERE\nanother distinct short line of text";
        let cleaned = clean(raw);
        assert_eq!(cleaned.matches("one get one").count(), 1);
        assert!(cleaned.contains("another distinct"));
    }

    #[test]
    fn sidebar_pattern_lines_dropped() {
        let cleaned = clean("Popular this week\nRecommended for you\nA plain sentence that says nothing unusual at all.");
        assert!(!cleaned.contains("Popular"));
        assert!(!cleaned.contains("Recommended"));
        assert!(cleaned.contains("plain sentence"));
    }
}
