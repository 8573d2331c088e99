//! Typed heuristic configuration.
//!
//! On the wire a config is a `{type, config}` pair. Each `type` has its own
//! config shape; unknown fields are rejected and missing required fields fail
//! at parse time, so a [`HeuristicConfig`] value is always well-formed.
//! [`HeuristicConfig::validate`] additionally compiles regex patterns.

use crate::error::{EvalError, Result};
use crate::heuristics::compile_pattern;
use crate::metric::HeuristicKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_true() -> bool {
    true
}

/// Substring test. Case-insensitive unless `caseSensitive` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContainsConfig {
    /// Needle; falls back to the request reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
}

/// Exact equality. Case-sensitive unless `caseSensitive` is `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EqualsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

impl Default for EqualsConfig {
    fn default() -> Self {
        Self { value: None, case_sensitive: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegexConfig {
    pub pattern: String,
    /// Any of `i`, `m`, `s`, `x`.
    #[serde(default)]
    pub flags: String,
}

impl RegexConfig {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), flags: String::new() }
    }

    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = flags.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsJsonConfig {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LevenshteinConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Configuration for one heuristic, tagged by its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHeuristicConfig", into = "RawHeuristicConfig")]
pub enum HeuristicConfig {
    Contains(ContainsConfig),
    Equals(EqualsConfig),
    Regex(RegexConfig),
    IsJson(IsJsonConfig),
    Levenshtein(LevenshteinConfig),
}

/// Wire form: `{"type": "...", "config": {...}}`, where `config` may be omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawHeuristicConfig {
    #[serde(rename = "type")]
    kind: HeuristicKind,
    #[serde(default)]
    config: Value,
}

impl TryFrom<RawHeuristicConfig> for HeuristicConfig {
    type Error = EvalError;

    fn try_from(raw: RawHeuristicConfig) -> Result<Self> {
        HeuristicConfig::from_parts(raw.kind, raw.config)
    }
}

impl From<HeuristicConfig> for RawHeuristicConfig {
    fn from(config: HeuristicConfig) -> Self {
        let (kind, config) = config.to_parts();
        RawHeuristicConfig { kind, config }
    }
}

fn parse<T: DeserializeOwned>(kind: HeuristicKind, value: Value) -> Result<T> {
    let value = if value.is_null() { Value::Object(Default::default()) } else { value };
    serde_json::from_value(value)
        .map_err(|e| EvalError::InvalidConfig(format!("{kind} config: {e}")))
}

impl HeuristicConfig {
    /// Build a config from a type and its untyped config object. `null` means `{}`.
    pub fn from_parts(kind: HeuristicKind, config: Value) -> Result<Self> {
        Ok(match kind {
            HeuristicKind::Contains => HeuristicConfig::Contains(parse(kind, config)?),
            HeuristicKind::Equals => HeuristicConfig::Equals(parse(kind, config)?),
            HeuristicKind::Regex => HeuristicConfig::Regex(parse(kind, config)?),
            HeuristicKind::IsJson => HeuristicConfig::IsJson(parse(kind, config)?),
            HeuristicKind::Levenshtein => HeuristicConfig::Levenshtein(parse(kind, config)?),
        })
    }

    /// Default config for a type, if the type has no required fields.
    pub fn default_for(kind: HeuristicKind) -> Result<Self> {
        Self::from_parts(kind, Value::Null)
    }

    pub fn to_parts(&self) -> (HeuristicKind, Value) {
        let value = match self {
            HeuristicConfig::Contains(c) => serde_json::to_value(c),
            HeuristicConfig::Equals(c) => serde_json::to_value(c),
            HeuristicConfig::Regex(c) => serde_json::to_value(c),
            HeuristicConfig::IsJson(c) => serde_json::to_value(c),
            HeuristicConfig::Levenshtein(c) => serde_json::to_value(c),
        };
        // plain structs of strings and bools always serialize
        (self.kind(), value.unwrap_or(Value::Null))
    }

    pub fn kind(&self) -> HeuristicKind {
        match self {
            HeuristicConfig::Contains(_) => HeuristicKind::Contains,
            HeuristicConfig::Equals(_) => HeuristicKind::Equals,
            HeuristicConfig::Regex(_) => HeuristicKind::Regex,
            HeuristicConfig::IsJson(_) => HeuristicKind::IsJson,
            HeuristicConfig::Levenshtein(_) => HeuristicKind::Levenshtein,
        }
    }

    /// Checks that need more than the type system: regex flags and pattern compilation.
    pub fn validate(&self) -> Result<()> {
        if let HeuristicConfig::Regex(config) = self {
            compile_pattern(&config.pattern, &config.flags)?;
        }
        Ok(())
    }
}
