//! Model routing: pick the reasoner model and generation parameters for a
//! given input. A single default model is always a valid deployment; light
//! and heavy variants refine cost when configured.

use crate::core::config::ModelConfig;
use crate::core::services::GenerationConfig;
use crate::text::claims;

/// Claim-sentence density above which an input counts as complex even when
/// short.
const COMPLEXITY_DENSITY: f64 = 0.30;

const LIGHT_MAX_TOKENS: u32 = 2_048;
const DEFAULT_MAX_TOKENS: u32 = 4_096;
const HEAVY_MAX_TOKENS: u32 = 8_192;

#[derive(Debug, Clone)]
pub struct RoutedModel {
    pub model: String,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone)]
pub struct ModelRouter {
    models: ModelConfig,
    short_threshold: usize,
    long_threshold: usize,
}

impl ModelRouter {
    pub fn new(models: ModelConfig, short_threshold: usize, long_threshold: usize) -> Self {
        Self {
            models,
            short_threshold,
            long_threshold,
        }
    }

    /// Select the model for `text`: light below the short threshold, heavy
    /// above the long threshold or on claim-dense content, default otherwise.
    pub fn select(&self, text: &str) -> RoutedModel {
        let len = text.chars().count();
        let complex = claims::claim_density(text) >= COMPLEXITY_DENSITY;

        let (model, max_tokens) = if len > self.long_threshold || complex {
            (
                self.models
                    .heavy_model
                    .as_ref()
                    .unwrap_or(&self.models.default_model),
                HEAVY_MAX_TOKENS,
            )
        } else if len < self.short_threshold {
            (
                self.models
                    .light_model
                    .as_ref()
                    .unwrap_or(&self.models.default_model),
                LIGHT_MAX_TOKENS,
            )
        } else {
            (&self.models.default_model, DEFAULT_MAX_TOKENS)
        };

        RoutedModel {
            model: model.clone(),
            generation: GenerationConfig::audit(max_tokens),
        }
    }

    /// The configured fallback model, when one exists and differs from
    /// `primary`.
    pub fn fallback_for(&self, primary: &str) -> Option<String> {
        self.models
            .fallback_model
            .as_ref()
            .filter(|m| m.as_str() != primary)
            .cloned()
    }

    pub fn translation_model(&self) -> String {
        self.models
            .light_model
            .clone()
            .unwrap_or_else(|| self.models.default_model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models() -> ModelConfig {
        ModelConfig {
            default_model: "default-model".to_string(),
            light_model: Some("light-model".to_string()),
            heavy_model: Some("heavy-model".to_string()),
            fallback_model: Some("fallback-model".to_string()),
        }
    }

    fn router() -> ModelRouter {
        ModelRouter::new(models(), 3_000, 10_000)
    }

    #[test]
    fn short_neutral_text_routes_light() {
        let routed = router().select("A short announcement about the store opening hours.");
        assert_eq!(routed.model, "light-model");
        assert_eq!(routed.generation.max_output_tokens, 2_048);
        assert_eq!(routed.generation.temperature, 0.0);
        assert!(routed.generation.json_response);
    }

    #[test]
    fn long_text_routes_heavy() {
        let filler = "An entirely unremarkable sentence describing seasonal decorations. ";
        let text = filler.repeat(200);
        assert!(text.chars().count() > 10_000);
        assert_eq!(router().select(&text).model, "heavy-model");
    }

    #[test]
    fn claim_dense_text_routes_heavy_even_when_short() {
        let text = "This drug cures arthritis. The treatment heals joints. It works faster than anything.";
        assert_eq!(router().select(text).model, "heavy-model");
    }

    #[test]
    fn single_model_deployment_always_works() {
        let single = ModelRouter::new(
            ModelConfig {
                default_model: "only-model".to_string(),
                light_model: None,
                heavy_model: None,
                fallback_model: None,
            },
            3_000,
            10_000,
        );
        assert_eq!(single.select("short text").model, "only-model");
        assert_eq!(single.fallback_for("only-model"), None);
    }

    #[test]
    fn fallback_excludes_primary() {
        let r = router();
        assert_eq!(r.fallback_for("heavy-model").as_deref(), Some("fallback-model"));
        assert_eq!(r.fallback_for("fallback-model"), None);
    }
}
