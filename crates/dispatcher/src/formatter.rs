//! Value formatter
//!
//! Turns a detected value into its outbound representation according to the field's
//! `FormatterKind`. JSON templates produce a complete payload override instead of a value.

use contracts::{DetectedValue, FieldFormatters, FormatterKind};
use serde_json::Value;
use tracing::error;

use crate::error::FormatError;

/// Formatter output for one field
#[derive(Debug, Clone, PartialEq)]
pub struct Formatted {
    /// Value placed in the default payload
    pub value: Value,

    /// Complete payload replacing the default one
    pub payload_override: Option<Value>,

    /// Formatting failed and the raw value is used instead
    pub fell_back: bool,
}

impl Formatted {
    fn value(value: Value) -> Self {
        Self {
            value,
            payload_override: None,
            fell_back: false,
        }
    }

    fn unformatted(value: &DetectedValue) -> Self {
        Self::value(value.to_json())
    }
}

/// Format a field value
///
/// Never fails: errors are logged and degrade to the unformatted value.
pub fn format_value(
    name: &str,
    value: &DetectedValue,
    command: &str,
    formatters: &FieldFormatters,
) -> Formatted {
    let Some(kind) = formatters.get(name) else {
        return Formatted::unformatted(value);
    };

    match try_format(kind, value, command) {
        Ok(formatted) => formatted,
        Err(e) => {
            error!(field = %name, formatter = kind.label(), error = %e, "Failed to format value");
            Formatted {
                fell_back: true,
                ..Formatted::unformatted(value)
            }
        }
    }
}

/// Apply one formatter kind
pub fn try_format(
    kind: &FormatterKind,
    value: &DetectedValue,
    command: &str,
) -> Result<Formatted, FormatError> {
    match kind {
        FormatterKind::None => Ok(Formatted::unformatted(value)),
        FormatterKind::Seconds => Ok(Formatted::value(Value::from(to_seconds(value)?))),
        FormatterKind::StringTemplate(template) => Ok(Formatted::value(Value::String(
            template.replace("{value}", &value.to_string()),
        ))),
        FormatterKind::JsonTemplate(template) => {
            let payload = render_json_template(template, value, command)?;
            Ok(Formatted {
                payload_override: Some(payload),
                ..Formatted::unformatted(value)
            })
        }
    }
}

/// Substitute placeholders into a JSON template and parse the result
///
/// Placeholders are replaced in order: `{value}`, `{value_seconds}`, `{value_json}`,
/// `{command}`.
pub fn render_json_template(
    template: &str,
    value: &DetectedValue,
    command: &str,
) -> Result<Value, FormatError> {
    let value_seconds = match to_seconds(value) {
        Ok(seconds) => seconds.to_string(),
        Err(e) => {
            error!(error = %e, "Using raw value for {{value_seconds}}");
            value.to_string()
        }
    };

    let replacements = [
        ("{value}", value.to_string()),
        ("{value_seconds}", value_seconds),
        ("{value_json}", value.to_json().to_string()),
        ("{command}", command.to_string()),
    ];

    let rendered = replacements
        .iter()
        .fold(template.to_string(), |acc, (placeholder, replacement)| {
            acc.replace(placeholder, replacement)
        });

    serde_json::from_str(&rendered).map_err(|source| FormatError::InvalidJson { rendered, source })
}

/// Normalize a duration to whole seconds
///
/// Numbers truncate. Text is `H:MM:SS`, `MM:SS` or a plain number.
pub fn to_seconds(value: &DetectedValue) -> Result<i64, FormatError> {
    match value {
        DetectedValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            n.as_f64()
                .and_then(truncate)
                .ok_or_else(|| FormatError::seconds(n))
        }
        DetectedValue::Text(text) => parse_duration(text).ok_or_else(|| FormatError::seconds(text)),
    }
}

fn parse_duration(text: &str) -> Option<i64> {
    let parts: Vec<&str> = text.split(':').collect();
    match parts.as_slice() {
        [hours, minutes, seconds] => {
            let total = parse_part(hours)?
                .checked_mul(3600)?
                .checked_add(parse_part(minutes)?.checked_mul(60)?)?;
            total.checked_add(parse_part(seconds)?)
        }
        [minutes, seconds] => parse_part(minutes)?
            .checked_mul(60)?
            .checked_add(parse_part(seconds)?),
        _ => truncate(text.trim().parse::<f64>().ok()?),
    }
}

fn parse_part(part: &str) -> Option<i64> {
    part.trim().parse().ok()
}

fn truncate(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let t = f.trunc();
    if t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return None;
    }
    Some(t as i64)
}
