//! Configuration loading from disk or from a raw agent argument.

use std::fs;
use std::path::Path;

use crate::config::schema::AgentConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Deserialize a TOML string. No semantic validation; a blank string is the
/// default configuration.
pub fn parse_config(raw: &str) -> Result<AgentConfig, ConfigError> {
    toml::from_str(raw).map_err(ConfigError::Parse)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = parse_config(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogFormat, ProcessorKind, TransformerVersion};
    use std::io::Write;

    #[test]
    fn test_blank_is_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config.transformer.version, TransformerVersion::V1);
        assert_eq!(config.plugins.aspects.len(), 1);
        assert_eq!(config.trace.processor, ProcessorKind::Batch);
    }

    #[test]
    fn test_parse_sections() {
        let config = parse_config(
            r#"
            [transformer]
            version = "v3"

            [plugins]
            archive_path = "/opt/agent/plugins.toml"

            [[plugins.aspects]]
            module = "shop::Checkout"
            enhancer = "shop::CheckoutTracer"

            [trace]
            processor = "simple"
            propagator = "w3c"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.transformer.version, TransformerVersion::V3);
        assert_eq!(config.plugins.archive_path, Path::new("/opt/agent/plugins.toml"));
        assert_eq!(config.plugins.aspects[0].module, "shop::Checkout");
        assert_eq!(config.trace.processor, ProcessorKind::Simple);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.ignore.synthetic);
    }

    #[test]
    fn test_unknown_version_kept() {
        let config = parse_config("[transformer]\nversion = \"v7\"").unwrap();
        assert_eq!(config.transformer.version, TransformerVersion::Unknown("v7".to_string()));
    }

    #[test]
    fn test_load_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[trace]\nscope_name = \"\"\n").unwrap();

        match load_config(file.path()) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/agent.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
