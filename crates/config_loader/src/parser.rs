//! Configuration parsing
//!
//! Supports TOML (primary) and JSON.

use contracts::{ContractError, RelayBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<RelayBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<RelayBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<RelayBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::FormatterKind;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
endpoint = "https://app.overlays.uno/apiv2/controlapps/abc/api"

[field_mapping]
home = "SetHomeScore"
clock = "SetClock"

[field_formatters]
clock = "seconds"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.field_mapping.len(), 2);
        assert_eq!(bp.field_mapping["home"], "SetHomeScore");
        assert_eq!(bp.field_formatters.get("clock"), Some(&FormatterKind::Seconds));
        assert!(bp.settings_dir.is_none());
        assert!(bp.timeout_secs.is_none());
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "endpoint": "http://127.0.0.1:8080/api",
            "timeout_secs": 5,
            "field_mapping": { "home": "SetHomeScore" },
            "field_formatters": { "home": "json:{\"score\": {value_json}}" }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.timeout_secs, Some(5));
        assert_eq!(
            bp.field_formatters.get("home"),
            Some(&FormatterKind::JsonTemplate("{\"score\": {value_json}}".into()))
        );
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
