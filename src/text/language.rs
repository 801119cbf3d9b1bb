//! Language and script detection for extracted content.
//!
//! Script ratios decide the Hindi/mixed cases directly; everything else goes
//! through the statistical classifier on a bounded prefix.

use whatlang::detect;

use crate::core::types::{ContentFormat, ContentMetadata, Language, SourceType};

/// Below this many characters the classifier is too noisy to trust.
const MIN_DETECTABLE_CHARS: usize = 80;

/// Characters fed to the statistical classifier.
const CLASSIFIER_PREFIX_CHARS: usize = 6_000;

const DEVANAGARI_MIXED_RATIO: f64 = 0.15;
const LATIN_MIXED_RATIO: f64 = 0.15;
const DEVANAGARI_HINDI_RATIO: f64 = 0.20;

fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

/// Detect the dominant language of `text`.
pub fn detect_language(text: &str) -> Language {
    let mut devanagari = 0usize;
    let mut latin = 0usize;
    let mut non_whitespace = 0usize;
    let mut total = 0usize;

    for c in text.chars() {
        total += 1;
        if c.is_whitespace() {
            continue;
        }
        non_whitespace += 1;
        if is_devanagari(c) {
            devanagari += 1;
        } else if c.is_ascii_alphabetic() {
            latin += 1;
        }
    }

    if non_whitespace > 0 {
        let dev_ratio = devanagari as f64 / non_whitespace as f64;
        let latin_ratio = latin as f64 / non_whitespace as f64;
        if dev_ratio > DEVANAGARI_MIXED_RATIO && latin_ratio > LATIN_MIXED_RATIO {
            return Language::Mixed;
        }
        if dev_ratio > DEVANAGARI_HINDI_RATIO {
            return Language::Hi;
        }
    }

    if total < MIN_DETECTABLE_CHARS {
        return Language::Unknown;
    }

    let prefix: String = text.chars().take(CLASSIFIER_PREFIX_CHARS).collect();
    match detect(&prefix) {
        Some(info) => match info.lang().code() {
            "hin" => Language::Hi,
            "eng" => Language::En,
            "urd" => Language::Other("ur".to_string()),
            "pan" => Language::Other("pa".to_string()),
            "ben" => Language::Other("bn".to_string()),
            other => Language::Other(other.to_string()),
        },
        None => Language::Unknown,
    }
}

/// Build the metadata record handed to the reasoner prompt.
pub fn detect_metadata(
    cleaned: &str,
    source_type: SourceType,
    content_format: ContentFormat,
    extraction_method: &str,
) -> ContentMetadata {
    ContentMetadata {
        source_type,
        content_format,
        language: detect_language(cleaned),
        extraction_method: extraction_method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HINDI: &str = "यह दवा सभी बीमारियों का इलाज करती है और इसका असर सात दिनों में दिखता है। इसे आज ही खरीदें और स्वस्थ जीवन पाएं।";

    #[test]
    fn devanagari_dominant_is_hindi() {
        assert_eq!(detect_language(HINDI), Language::Hi);
    }

    #[test]
    fn mixed_script_is_mixed() {
        let text = "यह दवा cures all diseases बहुत asardar है really works well दवा अच्छी";
        assert_eq!(detect_language(text), Language::Mixed);
    }

    #[test]
    fn short_latin_text_is_unknown() {
        // 79 characters: below the classifier floor.
        let text: String = "yah dawa sab bimariyon ka ilaaj karti hai aur turant asar d"
            .chars()
            .chain("ikhata haii".chars())
            .collect();
        assert!(text.chars().count() < 80);
        assert_eq!(detect_language(&text), Language::Unknown);
    }

    #[test]
    fn english_prose_detected() {
        let text = "This medicine claims to cure all diseases within seven days, which is a prohibited health claim under advertising law in most jurisdictions.";
        assert_eq!(detect_language(text), Language::En);
    }

    #[test]
    fn detection_is_idempotent() {
        assert_eq!(detect_language(HINDI), detect_language(HINDI));
        let en = "An ordinary English sentence about regulated marketing claims and the supporting evidence required to publish them.";
        assert_eq!(detect_language(en), detect_language(en));
    }

    #[test]
    fn metadata_carries_detected_language() {
        let meta = detect_metadata(HINDI, SourceType::Blog, ContentFormat::Article, "readability");
        assert_eq!(meta.language, Language::Hi);
        assert_eq!(meta.extraction_method, "readability");
    }
}
