//! Field mapping and per-field formatter configuration
//!
//! Formatter kinds are decided once, when configuration is set, from the operator's
//! formatter string.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Field name -> outbound command / field identifier
pub type FieldMapping = HashMap<String, String>;

const SECONDS_TOKEN: &str = "seconds";
const JSON_PREFIX: &str = "json:";

/// How a detected value is turned into its outbound representation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormatterKind {
    /// Pass the value through unchanged
    #[default]
    None,
    /// Normalize a duration to integer seconds
    Seconds,
    /// Substitute `{value}` into a literal string
    StringTemplate(String),
    /// Substitute placeholders into a JSON document that replaces the whole payload
    JsonTemplate(String),
}

impl FormatterKind {
    /// Classify an operator formatter string
    ///
    /// - blank -> `None`
    /// - `seconds` (trimmed, any case) -> `Seconds`
    /// - `json:` prefix (any case) or a `{...}` literal -> `JsonTemplate`
    /// - anything else -> `StringTemplate`, kept untrimmed
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Self::None;
        }
        if trimmed.eq_ignore_ascii_case(SECONDS_TOKEN) {
            return Self::Seconds;
        }
        if let Some(head) = trimmed.get(..JSON_PREFIX.len()) {
            if head.eq_ignore_ascii_case(JSON_PREFIX) {
                return Self::JsonTemplate(trimmed[JSON_PREFIX.len()..].trim().to_string());
            }
        }
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            return Self::JsonTemplate(trimmed.to_string());
        }
        Self::StringTemplate(source.to_string())
    }

    /// Short kind label for logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Seconds => "seconds",
            Self::StringTemplate(_) => "string_template",
            Self::JsonTemplate(_) => "json_template",
        }
    }
}

impl From<&str> for FormatterKind {
    fn from(source: &str) -> Self {
        Self::parse(source)
    }
}

impl From<String> for FormatterKind {
    fn from(source: String) -> Self {
        Self::parse(&source)
    }
}

impl From<FormatterKind> for String {
    fn from(kind: FormatterKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for FormatterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Seconds => f.write_str(SECONDS_TOKEN),
            Self::StringTemplate(text) => f.write_str(text),
            Self::JsonTemplate(text) => write!(f, "{}{}", JSON_PREFIX, text),
        }
    }
}

/// Field name -> formatter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldFormatters(HashMap<String, FormatterKind>);

impl FieldFormatters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter configured for a field, if any
    pub fn get(&self, name: &str) -> Option<&FormatterKind> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, kind: impl Into<FormatterKind>) {
        self.0.insert(name.into(), kind.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FormatterKind)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<FormatterKind>> FromIterator<(K, V)> for FieldFormatters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, kind)| (name.into(), kind.into()))
                .collect(),
        )
    }
}

impl From<HashMap<String, String>> for FieldFormatters {
    fn from(raw: HashMap<String, String>) -> Self {
        raw.into_iter().collect()
    }
}
