//! Report normalization: turn arbitrary reasoner output into a valid report.
//!
//! Model output is treated as adversarial. Two-pass JSON recovery (fence
//! strip, then a string-escape-aware balanced-brace slice, then trailing
//! comma removal) is centralized here; nothing else in the crate repairs
//! JSON. Normalization is idempotent.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::core::error::AuditError;
use crate::core::types::{
    ComplianceStatus, EthicalMarketing, FinancialPenalty, Report, RiskLevel, Severity, Violation,
};

const DEFAULT_SUMMARY: &str = "Summary unavailable.";
const DEFAULT_PENALTY_DESCRIPTION: &str =
    "Financial exposure not assessed; review against the cited regulations.";
const DEFAULT_ETHICS_ASSESSMENT: &str = "Ethical marketing posture not assessed.";
const DEFAULT_REGULATION: &str = "General advertising standards";
const DEFAULT_VIOLATION_TITLE: &str = "Unspecified violation";
const DEFAULT_EVIDENCE: &str = "(evidence unavailable)";
const DEFAULT_TRANSLATION: &str = "(translation unavailable)";

/// Placeholder guidance entries are marked so reviewers can spot them.
const GUIDANCE_PLACEHOLDER: &str =
    "[Guidance placeholder — have a compliance reviewer expand this entry]";

/// Placeholder fixes are bracketed stubs, never silent filler.
const FIX_PLACEHOLDER: &str =
    "[COMPLIANT REWRITE REQUIRED — draft a full replacement for the flagged claim]";

static TRAILING_COMMAS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*([}\]])").unwrap());

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());

// ---------------------------------------------------------------------------
// JSON recovery
// ---------------------------------------------------------------------------

/// Slice the first balanced JSON object or array out of `text`, honoring
/// string literals and escapes.
fn balanced_slice(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let open = bytes[start] as char;
    let close = if open == '{' { '}' } else { ']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Recover a JSON value from raw model text: fence strip first, then the
/// balanced slice, then a trailing-comma cleanup pass.
pub fn extract_json(raw: &str) -> Result<Value, AuditError> {
    let candidate = CODE_FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .or_else(|| balanced_slice(raw))
        .unwrap_or(raw.trim());

    if let Ok(value) = serde_json::from_str(candidate) {
        return Ok(value);
    }

    let cleaned = TRAILING_COMMAS.replace_all(candidate, "$1");
    serde_json::from_str(&cleaned)
        .map_err(|e| AuditError::ReasonerInvalidJson(format!("{e}: {}", preview(raw))))
}

fn preview(raw: &str) -> String {
    raw.chars().take(120).collect()
}

// ---------------------------------------------------------------------------
// Field coercion
// ---------------------------------------------------------------------------

fn coerce_score(value: Option<&Value>) -> u8 {
    let Some(value) = value else { return 0 };
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(mut score) = number else { return 0 };
    // A fractional value in (0, 1) is a ratio, not a percentage.
    if score > 0.0 && score < 1.0 {
        score *= 100.0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

fn string_or<'a>(value: Option<&'a Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn extend_to_two(mut list: Vec<String>, placeholder: &str) -> Vec<String> {
    while list.len() < 2 {
        list.push(placeholder.to_string());
    }
    list
}

fn coerce_risk_level(value: Option<&Value>) -> RiskLevel {
    match value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("none") => RiskLevel::None,
        Some("medium") => RiskLevel::Medium,
        Some("high") => RiskLevel::High,
        _ => RiskLevel::Low,
    }
}

fn coerce_status(value: Option<&Value>) -> ComplianceStatus {
    match value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("compliant") => ComplianceStatus::Compliant,
        Some("non-compliant") | Some("non compliant") | Some("noncompliant") => {
            ComplianceStatus::NonCompliant
        }
        _ => ComplianceStatus::NeedsReview,
    }
}

fn normalize_violation(value: &Value) -> Violation {
    let severity = value
        .get("severity")
        .and_then(Value::as_str)
        .and_then(Severity::parse)
        .unwrap_or(Severity::Medium);

    let risk_score = match value.get("risk_score") {
        Some(Value::Number(n)) => n
            .as_f64()
            .map(|v| v.round().clamp(0.0, 100.0) as u8)
            .unwrap_or_else(|| severity.default_risk_score()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(|v| v.round().clamp(0.0, 100.0) as u8)
            .unwrap_or_else(|_| severity.default_risk_score()),
        _ => severity.default_risk_score(),
    };

    Violation {
        severity,
        regulation: string_or(value.get("regulation"), DEFAULT_REGULATION),
        violation_title: string_or(value.get("violation_title"), DEFAULT_VIOLATION_TITLE),
        evidence: string_or(value.get("evidence"), DEFAULT_EVIDENCE),
        translation: string_or(value.get("translation"), DEFAULT_TRANSLATION),
        guidance: extend_to_two(string_list(value.get("guidance")), GUIDANCE_PLACEHOLDER),
        fix: extend_to_two(string_list(value.get("fix")), FIX_PLACEHOLDER),
        risk_score,
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Turn parsed reasoner JSON into a valid report. Total: every shape of
/// input produces a report satisfying the invariants. Adapter-level fields
/// (`model_used`, `used_fallback`, `processing_time_ms`) are stamped by the
/// caller afterwards.
pub fn normalize(value: &Value) -> Report {
    let violations: Vec<Violation> = match value.get("violations") {
        Some(Value::Array(items)) => items.iter().map(normalize_violation).collect(),
        _ => Vec::new(),
    };

    let mut score = coerce_score(value.get("score"));
    let mut status = coerce_status(value.get("status"));

    // No violations means compliant by definition, with a zero risk score.
    if violations.is_empty() {
        status = ComplianceStatus::Compliant;
        score = 0;
    }

    let financial_penalty = match value.get("financialPenalty") {
        Some(fp) => FinancialPenalty {
            risk_level: coerce_risk_level(fp.get("riskLevel")),
            description: string_or(fp.get("description"), DEFAULT_PENALTY_DESCRIPTION),
        },
        None => FinancialPenalty {
            risk_level: RiskLevel::Low,
            description: DEFAULT_PENALTY_DESCRIPTION.to_string(),
        },
    };

    let ethical_marketing = match value.get("ethicalMarketing") {
        Some(em) => EthicalMarketing {
            score: coerce_score(em.get("score")),
            assessment: string_or(em.get("assessment"), DEFAULT_ETHICS_ASSESSMENT),
        },
        None => EthicalMarketing {
            score: 0,
            assessment: DEFAULT_ETHICS_ASSESSMENT.to_string(),
        },
    };

    Report {
        score,
        status,
        summary: string_or(value.get("summary"), DEFAULT_SUMMARY),
        transcription: string_or(value.get("transcription"), ""),
        financial_penalty,
        ethical_marketing,
        violations,
        model_used: string_or(value.get("modelUsed"), ""),
        used_fallback: value
            .get("usedFallback")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        processing_time_ms: value
            .get("processingTimeMs")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        error: None,
        message: None,
    }
}

/// Recover and normalize in one step.
pub fn normalize_str(raw: &str) -> Result<Report, AuditError> {
    Ok(normalize(&extract_json(raw)?))
}
