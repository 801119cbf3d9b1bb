//! One-shot reasoner invocation with timeout, single fallback, and the
//! fail-safe re-analysis pass.
//!
//! The adapter never panics and never propagates reasoner failures: when
//! even the fallback path fails, it answers with the structured shell
//! report. Only cancellation escapes as an error.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::error::AuditError;
use crate::core::services::{GenerationConfig, ReasonRequest, Services};
use crate::core::types::{ContentMetadata, Jurisdiction, Report, RulePack};
use crate::reason::normalize;
use crate::reason::prompt;
use crate::reason::router::ModelRouter;

/// Score at or above which an empty violation list looks suspicious enough
/// to warrant the fail-safe re-analysis.
const FAILSAFE_SCORE_FLOOR: u8 = 90;

pub struct AnalysisRequest<'a> {
    pub content: &'a str,
    pub pack: &'a RulePack,
    pub jurisdiction: &'a Jurisdiction,
    pub category: &'a str,
    pub analysis_mode: &'a str,
    pub metadata: &'a ContentMetadata,
}

fn router_for(services: &Services) -> ModelRouter {
    let config = &services.config;
    ModelRouter::new(
        config.models.clone(),
        config.short_threshold,
        config.long_threshold,
    )
}

/// One bounded call to the reasoner, returning recovered JSON.
async fn call_model(
    services: &Services,
    model: &str,
    system: &str,
    user: &str,
    generation: GenerationConfig,
    cancel: &CancellationToken,
) -> Result<Value, AuditError> {
    let _permit = services
        .outbound_limit
        .acquire()
        .await
        .map_err(|_| AuditError::Cancelled)?;

    let request = ReasonRequest {
        model: model.to_string(),
        system: system.to_string(),
        user: user.to_string(),
        config: generation,
    };

    let deadline = services.config.reasoner_timeout;
    let raw = tokio::select! {
        res = tokio::time::timeout(deadline, services.reasoner.generate(&request)) => match res {
            Ok(inner) => inner?,
            Err(_) => return Err(AuditError::ReasonerTimeout),
        },
        _ = cancel.cancelled() => return Err(AuditError::Cancelled),
    };

    normalize::extract_json(&raw)
}

// The normalizer zeroes the score when violations are empty; the fail-safe
// gate needs the score the model actually claimed.
fn claimed_score(value: &Value) -> u8 {
    value
        .get("score")
        .and_then(Value::as_f64)
        .map(|s| {
            let s = if s > 0.0 && s < 1.0 { s * 100.0 } else { s };
            s.round().clamp(0.0, 100.0) as u8
        })
        .unwrap_or(0)
}

fn has_violations(value: &Value) -> bool {
    value
        .get("violations")
        .and_then(Value::as_array)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

/// Run the audit analysis. Returns `Err` only on cancellation; every other
/// failure mode yields a report (possibly the error shell).
pub async fn analyze(
    services: &Services,
    request: &AnalysisRequest<'_>,
    cancel: &CancellationToken,
) -> Result<Report, AuditError> {
    let router = router_for(services);
    let routed = router.select(request.content);
    let system = prompt::system_prompt(
        request.pack,
        request.jurisdiction,
        request.category,
        request.analysis_mode,
        request.metadata,
        false,
    );
    let user = prompt::user_prompt(request.content);

    let first = call_model(
        services,
        &routed.model,
        &system,
        &user,
        routed.generation.clone(),
        cancel,
    )
    .await;

    let (mut value, model_used, used_fallback) = match first {
        Ok(value) => (value, routed.model.clone(), false),
        Err(AuditError::Cancelled) => return Err(AuditError::Cancelled),
        Err(e) => {
            warn!(model = %routed.model, error = %e, "primary reasoner call failed");
            let Some(fallback) = router.fallback_for(&routed.model) else {
                return Ok(Report::error_shell(
                    "reasoner_unrecoverable",
                    &format!("primary model failed with no fallback configured: {e}"),
                    0,
                ));
            };
            match call_model(
                services,
                &fallback,
                &system,
                &user,
                routed.generation.clone(),
                cancel,
            )
            .await
            {
                Ok(value) => {
                    info!(model = %fallback, "fallback reasoner call succeeded");
                    (value, fallback, true)
                }
                Err(AuditError::Cancelled) => return Err(AuditError::Cancelled),
                Err(fallback_err) => {
                    warn!(model = %fallback, error = %fallback_err, "fallback reasoner call failed");
                    return Ok(Report::error_shell(
                        "reasoner_unrecoverable",
                        &format!("primary: {e}; fallback: {fallback_err}"),
                        0,
                    ));
                }
            }
        }
    };

    // Fail-safe re-analysis: a clean bill of health with a suspiciously high
    // confidence gets one stricter second look.
    if services.config.enable_failsafe_reanalysis
        && !has_violations(&value)
        && claimed_score(&value) >= FAILSAFE_SCORE_FLOOR
    {
        info!(model = %model_used, "running fail-safe re-analysis");
        let strict_system = prompt::system_prompt(
            request.pack,
            request.jurisdiction,
            request.category,
            request.analysis_mode,
            request.metadata,
            true,
        );
        match call_model(
            services,
            &model_used,
            &strict_system,
            &user,
            routed.generation,
            cancel,
        )
        .await
        {
            Ok(rerun) if has_violations(&rerun) => {
                info!("fail-safe re-analysis found violations; superseding first pass");
                value = rerun;
            }
            Ok(_) => {}
            Err(AuditError::Cancelled) => return Err(AuditError::Cancelled),
            Err(e) => warn!("fail-safe re-analysis failed (keeping first pass): {e}"),
        }
    }

    let mut report = normalize::normalize(&value);
    report.model_used = model_used;
    report.used_fallback = used_fallback;
    Ok(report)
}
