//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (batch sizes, delays, addresses)
//! - Detect conflicting aspects
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::{AgentConfig, TransformerVersion};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("transformer.version: unrecognized version '{0}' (expected v1, v2 or v3)")]
    UnknownTransformerVersion(String),

    #[error("plugins.archive_path: must not be empty")]
    EmptyArchivePath,

    #[error("plugins.aspects[{index}]: {field} must not be empty")]
    EmptyAspectField { index: usize, field: &'static str },

    #[error("plugins.aspects[{index}]: module '{module}' already has an aspect")]
    DuplicateAspect { index: usize, module: String },

    #[error("ignore.prefixes[{0}]: must not be empty")]
    EmptyIgnorePrefix(usize),

    #[error("trace.scope_name: must not be empty")]
    EmptyScopeName,

    #[error("trace.batch.{field}: must be greater than zero")]
    ZeroBatchSetting { field: &'static str },

    #[error("trace.batch.max_export_batch_size: {batch} exceeds max_queue_size {queue}")]
    BatchLargerThanQueue { batch: usize, queue: usize },

    #[error("logging.filter: invalid directive '{filter}': {reason}")]
    InvalidLogFilter { filter: String, reason: String },

    #[error("metrics.bind_address: invalid socket address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check `config`, reporting every problem found.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let TransformerVersion::Unknown(raw) = &config.transformer.version {
        errors.push(ValidationError::UnknownTransformerVersion(raw.clone()));
    }

    if config.plugins.archive_path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyArchivePath);
    }

    let mut seen = HashSet::new();
    for (index, aspect) in config.plugins.aspects.iter().enumerate() {
        if aspect.module.trim().is_empty() {
            errors.push(ValidationError::EmptyAspectField { index, field: "module" });
        }
        if aspect.enhancer.trim().is_empty() {
            errors.push(ValidationError::EmptyAspectField { index, field: "enhancer" });
        }
        if !aspect.module.is_empty() && !seen.insert(aspect.module.as_str()) {
            errors.push(ValidationError::DuplicateAspect {
                index,
                module: aspect.module.clone(),
            });
        }
    }

    for (index, prefix) in config.ignore.prefixes.iter().enumerate() {
        if prefix.is_empty() {
            errors.push(ValidationError::EmptyIgnorePrefix(index));
        }
    }

    if config.trace.scope_name.trim().is_empty() {
        errors.push(ValidationError::EmptyScopeName);
    }

    let batch = &config.trace.batch;
    if batch.max_queue_size == 0 {
        errors.push(ValidationError::ZeroBatchSetting { field: "max_queue_size" });
    }
    if batch.max_export_batch_size == 0 {
        errors.push(ValidationError::ZeroBatchSetting { field: "max_export_batch_size" });
    }
    if batch.scheduled_delay_ms == 0 {
        errors.push(ValidationError::ZeroBatchSetting { field: "scheduled_delay_ms" });
    }
    if batch.max_queue_size > 0 && batch.max_export_batch_size > batch.max_queue_size {
        errors.push(ValidationError::BatchLargerThanQueue {
            batch: batch.max_export_batch_size,
            queue: batch.max_queue_size,
        });
    }

    if let Err(e) = EnvFilter::try_new(&config.logging.filter) {
        errors.push(ValidationError::InvalidLogFilter {
            filter: config.logging.filter.clone(),
            reason: e.to_string(),
        });
    }

    if config.metrics.enabled && config.metrics.socket_addr().is_none() {
        errors.push(ValidationError::InvalidMetricsAddress(config.metrics.bind_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::AspectConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AgentConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = AgentConfig::default();
        config.transformer.version = TransformerVersion::from("v9".to_string());
        config.plugins.aspects.push(AspectConfig {
            module: "demo::HostValve".to_string(),
            enhancer: String::new(),
        });
        config.trace.batch.max_export_batch_size = 0;
        config.metrics.enabled = true;
        config.metrics.bind_address = "not an address".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::UnknownTransformerVersion("v9".to_string()),
                ValidationError::EmptyAspectField { index: 1, field: "enhancer" },
                ValidationError::DuplicateAspect {
                    index: 1,
                    module: "demo::HostValve".to_string()
                },
                ValidationError::ZeroBatchSetting { field: "max_export_batch_size" },
                ValidationError::InvalidMetricsAddress("not an address".to_string()),
            ]
        );
    }

    #[test]
    fn test_batch_larger_than_queue() {
        let mut config = AgentConfig::default();
        config.trace.batch.max_queue_size = 10;
        config.trace.batch.max_export_batch_size = 20;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::BatchLargerThanQueue { batch: 20, queue: 10 }]
        );
    }
}
