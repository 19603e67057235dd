use paperverify_common::config::{LlmRoleConfig, RetryConfig, WeightsConfig};

use super::loader::{ConfigError, EngineConfig};
use crate::oracle::REQUIRED_PROMPTS;

/// Tolerance when checking that component weights sum to 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Validate the complete engine configuration.
///
/// Weight problems are reported on their own as `InvalidWeights`; everything
/// else is collected and reported together.
pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    validate_weights(&config.system.weights)?;

    let mut errors: Vec<String> = Vec::new();

    validate_retrieval(config, &mut errors);
    validate_llm(config, &mut errors);
    validate_consistency(config, &mut errors);
    validate_oracle(config, &mut errors);
    validate_retry(config, &mut errors);
    validate_prompts(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.join("; ")))
    }
}

/// Each weight must be a finite number in [0, 1] and the three must sum to 1.
pub fn validate_weights(w: &WeightsConfig) -> Result<(), ConfigError> {
    let named = [
        ("citation", w.citation),
        ("llm", w.llm),
        ("consistency", w.consistency),
    ];

    let mut errors: Vec<String> = Vec::new();
    for (name, value) in named {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            errors.push(format!("weights.{} must be between 0.0 and 1.0, got {}", name, value));
        }
    }

    if errors.is_empty() {
        let sum = w.citation + w.llm + w.consistency;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            errors.push(format!("weights must sum to 1.0, got {}", sum));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::InvalidWeights(errors.join("; ")))
    }
}

fn validate_retrieval(config: &EngineConfig, errors: &mut Vec<String>) {
    if config.system.retrieval.depth == 0 {
        errors.push("retrieval.depth must be > 0".into());
    }
}

fn validate_llm(config: &EngineConfig, errors: &mut Vec<String>) {
    let validate_role = |role: &LlmRoleConfig, name: &str, errors: &mut Vec<String>| {
        if role.provider.is_empty() {
            errors.push(format!("llm.{}.provider must not be empty", name));
        } else if role.provider != "anthropic" && role.provider != "openai" {
            errors.push(format!(
                "llm.{}.provider must be \"anthropic\" or \"openai\", got \"{}\"",
                name, role.provider
            ));
        }
        if role.model.is_empty() {
            errors.push(format!("llm.{}.model must not be empty", name));
        }
        if role.max_tokens == 0 {
            errors.push(format!("llm.{}.max_tokens must be > 0", name));
        }
        if let Some(temp) = role.temperature {
            if !(0.0..=2.0).contains(&temp) {
                errors.push(format!(
                    "llm.{}.temperature must be between 0.0 and 2.0",
                    name
                ));
            }
        }
    };

    validate_role(&config.system.llm.verifier, "verifier", errors);
    validate_role(&config.system.llm.answer, "answer", errors);
}

fn validate_consistency(config: &EngineConfig, errors: &mut Vec<String>) {
    let c = &config.system.consistency;

    if !(0.0..=2.0).contains(&c.variant_temperature) {
        errors.push("consistency.variant_temperature must be between 0.0 and 2.0".into());
    }
}

fn validate_oracle(config: &EngineConfig, errors: &mut Vec<String>) {
    let o = &config.system.oracle;

    if o.timeout_seconds == 0 {
        errors.push("oracle.timeout_seconds must be > 0".into());
    }
    if o.request_timeout_seconds < o.timeout_seconds {
        errors.push("oracle.request_timeout_seconds must be >= oracle.timeout_seconds".into());
    }
}

fn validate_retry(config: &EngineConfig, errors: &mut Vec<String>) {
    let validate_one = |rc: &RetryConfig, name: &str, errors: &mut Vec<String>| {
        if rc.max_attempts == 0 {
            errors.push(format!("retry.{}.max_attempts must be > 0", name));
        }
        if rc.initial_backoff_ms == 0 {
            errors.push(format!("retry.{}.initial_backoff_ms must be > 0", name));
        }
        if rc.max_backoff_ms < rc.initial_backoff_ms {
            errors.push(format!(
                "retry.{}.max_backoff_ms must be >= initial_backoff_ms",
                name
            ));
        }
        if rc.backoff_multiplier < 1.0 {
            errors.push(format!("retry.{}.backoff_multiplier must be >= 1.0", name));
        }
    };

    validate_one(&config.system.retry.llm_api, "llm_api", errors);
}

fn validate_prompts(config: &EngineConfig, errors: &mut Vec<String>) {
    for (name, placeholders) in REQUIRED_PROMPTS {
        let Some(template) = config.prompts.get(*name) else {
            errors.push(format!("prompts/{}.md is missing", name));
            continue;
        };
        for placeholder in *placeholders {
            if !template.contains(&format!("{{{}}}", placeholder)) {
                errors.push(format!(
                    "prompts/{}.md must contain the {{{}}} placeholder",
                    name, placeholder
                ));
            }
        }
    }
}
