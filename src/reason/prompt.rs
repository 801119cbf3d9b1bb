//! Prompt templating for the compliance reasoner.
//!
//! The system part carries the auditor role, the jurisdiction, the loaded
//! rule pack, the mandatory output rules, and the exact JSON schema. The
//! user part is only ever the reduced (and possibly translated) content,
//! never the raw extraction.

use crate::core::types::{ContentMetadata, Jurisdiction, RulePack};

/// Rules listed in the system prompt, by ordinal.
const MAX_PROMPT_RULES: usize = 50;

const REPORT_SCHEMA: &str = r#"{
  "score": <integer 0-100, overall non-compliance risk>,
  "status": "Compliant" | "Needs Review" | "Non-Compliant",
  "summary": "<one-paragraph assessment>",
  "financialPenalty": { "riskLevel": "None" | "Low" | "Medium" | "High", "description": "<string>" },
  "ethicalMarketing": { "score": <integer 0-100>, "assessment": "<string>" },
  "violations": [
    {
      "severity": "CRITICAL" | "HIGH" | "MEDIUM" | "LOW",
      "regulation": "<regulation name, in English>",
      "violation_title": "<short title, source language>",
      "evidence": "<verbatim quote from the content, source language>",
      "translation": "<English rendering of the evidence>",
      "guidance": ["<actionable step>", "<actionable step>", ...],
      "fix": ["<complete compliant rewrite>", "<complete compliant rewrite>", ...],
      "risk_score": <integer 0-100>
    }
  ]
}"#;

/// The instruction appended on the fail-safe re-analysis pass.
pub const FAILSAFE_INSTRUCTION: &str =
    "Carefully analyze and detect ANY misleading or prohibited healthcare claims. \
     Do not give the content the benefit of the doubt; quote every suspect claim.";

fn jurisdiction_label(jurisdiction: &Jurisdiction) -> String {
    match &jurisdiction.region {
        Some(region) if !region.trim().is_empty() => {
            format!("{} ({})", jurisdiction.country, region)
        }
        _ => jurisdiction.country.clone(),
    }
}

/// Build the system instruction for one audit call.
pub fn system_prompt(
    pack: &RulePack,
    jurisdiction: &Jurisdiction,
    category: &str,
    analysis_mode: &str,
    metadata: &ContentMetadata,
    strict: bool,
) -> String {
    let mut prompt = String::with_capacity(4_096);

    prompt.push_str(&format!(
        "You are a regulatory compliance auditor for marketing and advertising \
         content in {jur}, industry category '{category}'. Analysis mode: {mode}.\n\
         The content below was extracted from a {source} ({format}, via {method}; \
         detected language: {lang}).\n\n",
        jur = jurisdiction_label(jurisdiction),
        category = category,
        mode = if analysis_mode.is_empty() { "standard" } else { analysis_mode },
        source = metadata.source_type.as_str(),
        format = metadata.content_format.as_str(),
        method = metadata.extraction_method,
        lang = metadata.language.code(),
    ));

    if pack.rules.is_empty() {
        prompt.push_str(
            "No jurisdiction-specific rule pack is loaded; audit against generally \
             accepted advertising standards for this jurisdiction.\n",
        );
    } else {
        prompt.push_str("Audit strictly against these rules:\n");
        for (ordinal, rule) in pack.rules.iter().take(MAX_PROMPT_RULES).enumerate() {
            match &rule.section {
                Some(section) => prompt.push_str(&format!(
                    "{}. [{}] {} — {} ({})\n",
                    ordinal + 1,
                    rule.id,
                    rule.regulation,
                    rule.title,
                    section
                )),
                None => prompt.push_str(&format!(
                    "{}. [{}] {} — {}\n",
                    ordinal + 1,
                    rule.id,
                    rule.regulation,
                    rule.title
                )),
            }
        }
    }

    prompt.push_str(
        "\nMandatory output rules:\n\
         - Every violation must cite the regulation by its English name.\n\
         - `evidence` must be a verbatim quote from the content, in its source language.\n\
         - Every violation needs at least 2 `guidance` entries and at least 2 complete \
           compliant rewrites in `fix`.\n\
         - All user-visible strings (violation_title, guidance, fix) must be written in \
           the content's source language; only regulation names stay in English.\n\
         - If the content is compliant, return an empty `violations` array.\n\n",
    );

    if strict {
        prompt.push_str(FAILSAFE_INSTRUCTION);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Respond with ONLY a JSON object matching exactly this schema:\n");
    prompt.push_str(REPORT_SCHEMA);
    prompt
}

/// Build the user part: the reduced content, nothing else.
pub fn user_prompt(reduced_content: &str) -> String {
    format!("Content to audit:\n\n{reduced_content}")
}

/// Prompt for the translator pass (Hindi / mixed-script content).
pub fn translation_prompt(language_code: &str) -> String {
    format!(
        "Translate the following {language_code} marketing content to English. \
         Preserve medical terms and the exact phrasing of claims. \
         Output plain text only — no commentary, no formatting."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ContentFormat, Language, Rule, SourceType};

    fn metadata() -> ContentMetadata {
        ContentMetadata {
            source_type: SourceType::Blog,
            content_format: ContentFormat::Article,
            language: Language::En,
            extraction_method: "readability".to_string(),
        }
    }

    fn pack(count: usize) -> RulePack {
        RulePack {
            country: "India".to_string(),
            region: None,
            category: "healthcare".to_string(),
            rules: (0..count)
                .map(|i| Rule {
                    id: format!("R-{i}"),
                    regulation: "Drugs and Magic Remedies Act 1954".to_string(),
                    section: None,
                    title: format!("Rule {i}"),
                    jurisdiction_path: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn lists_at_most_fifty_rules_by_ordinal() {
        let prompt = system_prompt(
            &pack(80),
            &Jurisdiction {
                country: "India".to_string(),
                region: None,
            },
            "healthcare",
            "standard",
            &metadata(),
            false,
        );
        assert!(prompt.contains("1. [R-0]"));
        assert!(prompt.contains("50. [R-49]"));
        assert!(!prompt.contains("[R-50]"));
    }

    #[test]
    fn strict_pass_adds_failsafe_instruction() {
        let relaxed = system_prompt(
            &pack(1),
            &Jurisdiction::default(),
            "healthcare",
            "",
            &metadata(),
            false,
        );
        let strict = system_prompt(
            &pack(1),
            &Jurisdiction::default(),
            "healthcare",
            "",
            &metadata(),
            true,
        );
        assert!(!relaxed.contains(FAILSAFE_INSTRUCTION));
        assert!(strict.contains(FAILSAFE_INSTRUCTION));
    }

    #[test]
    fn schema_and_output_rules_present() {
        let prompt = system_prompt(
            &pack(0),
            &Jurisdiction::default(),
            "general",
            "",
            &metadata(),
            false,
        );
        assert!(prompt.contains("at least 2 `guidance` entries"));
        assert!(prompt.contains("\"violations\""));
        assert!(prompt.contains("regulation names stay in English"));
    }

    #[test]
    fn region_appears_in_jurisdiction_label() {
        let prompt = system_prompt(
            &pack(0),
            &Jurisdiction {
                country: "GCC".to_string(),
                region: Some("UAE".to_string()),
            },
            "general",
            "",
            &metadata(),
            false,
        );
        assert!(prompt.contains("GCC (UAE)"));
    }
}
