//! Admin-managed heuristic metric definitions.
//!
//! A definition names a heuristic config so it can be listed, toggled, and
//! scored by id. Definitions are never deleted by the evaluation path; an
//! inactive definition simply refuses to score.

#[cfg(feature = "sqlite")]
mod database;
mod inmemory;

#[cfg(feature = "sqlite")]
pub use database::DatabaseHeuristicStore;
pub use inmemory::InMemoryHeuristicStore;

use crate::config::HeuristicConfig;
use crate::error::{EvalError, FieldError, Result};
use crate::metric::HeuristicKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_NAME_LEN: usize = 255;

/// A stored heuristic metric.
///
/// Serializes with the config flattened in: `{id, name, description, type, config, isActive, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicMetricDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub config: HeuristicConfig,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HeuristicMetricDefinition {
    pub fn kind(&self) -> HeuristicKind {
        self.config.kind()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHeuristicMetric {
    pub name: String,
    pub description: Option<String>,
    pub config: HeuristicConfig,
}

impl NewHeuristicMetric {
    pub fn new(name: impl Into<String>, config: HeuristicConfig) -> Self {
        Self { name: name.into(), description: None, config }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the name and compile the config. Called by every store before writing.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        self.config.validate()
    }

    pub(crate) fn into_definition(self, now: DateTime<Utc>) -> HeuristicMetricDefinition {
        HeuristicMetricDefinition {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name.trim().to_string(),
            description: self.description,
            config: self.config,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeuristicMetricUpdate {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub config: Option<HeuristicConfig>,
}

impl HeuristicMetricUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.config.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(config) = &self.config {
            config.validate()?;
        }
        Ok(())
    }

    pub(crate) fn apply(self, definition: &mut HeuristicMetricDefinition, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            definition.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            definition.description = description;
        }
        if let Some(config) = self.config {
            definition.config = config;
        }
        definition.updated_at = now;
    }
}

fn validate_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EvalError::Validation(vec![FieldError::new("name", "must not be empty")]));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(EvalError::Validation(vec![FieldError::new(
            "name",
            format!("must be at most {MAX_NAME_LEN} characters"),
        )]));
    }
    Ok(())
}

/// List filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefinitionFilter {
    pub is_active: Option<bool>,
    pub kind: Option<HeuristicKind>,
}

impl DefinitionFilter {
    pub fn matches(&self, definition: &HeuristicMetricDefinition) -> bool {
        self.is_active.is_none_or(|active| definition.is_active == active)
            && self.kind.is_none_or(|kind| definition.kind() == kind)
    }
}

/// Storage for heuristic metric definitions.
///
/// Names are unique; creating or renaming onto an existing name is `Conflict`.
/// Unknown ids are `NotFound`.
#[async_trait]
pub trait HeuristicStore: Send + Sync {
    /// Definitions matching `filter`, oldest first.
    async fn list(&self, filter: &DefinitionFilter) -> Result<Vec<HeuristicMetricDefinition>>;

    async fn get(&self, id: &str) -> Result<HeuristicMetricDefinition>;

    async fn create(&self, new: NewHeuristicMetric) -> Result<HeuristicMetricDefinition>;

    async fn update(
        &self,
        id: &str,
        update: HeuristicMetricUpdate,
    ) -> Result<HeuristicMetricDefinition>;

    /// Flip `is_active` and return the new state.
    async fn toggle(&self, id: &str) -> Result<HeuristicMetricDefinition>;
}

pub(crate) fn not_found(id: &str) -> EvalError {
    EvalError::NotFound(format!("heuristic metric '{id}' not found"))
}

pub(crate) fn duplicate_name(name: &str) -> EvalError {
    EvalError::Conflict(format!("a heuristic metric named '{}' already exists", name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContainsConfig, RegexConfig};
    use serde_json::json;

    #[test]
    fn test_definition_wire_shape() {
        let now = Utc::now();
        let definition = NewHeuristicMetric::new(
            "mentions-paris",
            HeuristicConfig::Contains(ContainsConfig { value: Some("Paris".into()), case_sensitive: false }),
        )
        .into_definition(now);

        let value = serde_json::to_value(&definition).unwrap();
        assert_eq!(value["type"], "contains");
        assert_eq!(value["config"], json!({ "value": "Paris", "caseSensitive": false }));
        assert_eq!(value["isActive"], true);

        let back: HeuristicMetricDefinition = serde_json::from_value(value).unwrap();
        assert_eq!(back, definition);
    }

    #[test]
    fn test_validation() {
        let blank = NewHeuristicMetric::new("  ", HeuristicConfig::default_for(HeuristicKind::IsJson).unwrap());
        assert!(matches!(blank.validate(), Err(EvalError::Validation(_))));

        let bad_regex = NewHeuristicMetric::new("r", HeuristicConfig::Regex(RegexConfig::new("[")));
        assert!(matches!(bad_regex.validate(), Err(EvalError::InvalidPattern(_))));
    }

    #[test]
    fn test_update_sets_and_clears_description() {
        let now = Utc::now();
        let mut definition = NewHeuristicMetric::new(
            "json",
            HeuristicConfig::default_for(HeuristicKind::IsJson).unwrap(),
        )
        .with_description("old")
        .into_definition(now);

        HeuristicMetricUpdate::default().apply(&mut definition, now);
        assert_eq!(definition.description.as_deref(), Some("old"));

        let set = HeuristicMetricUpdate { description: Some(Some("new".into())), ..Default::default() };
        assert!(!set.is_empty());
        set.apply(&mut definition, now);
        assert_eq!(definition.description.as_deref(), Some("new"));

        let clear = HeuristicMetricUpdate { description: Some(None), ..Default::default() };
        assert!(!clear.is_empty());
        clear.apply(&mut definition, now);
        assert!(definition.description.is_none());
    }

    #[test]
    fn test_filter() {
        let mut definition = NewHeuristicMetric::new(
            "json",
            HeuristicConfig::default_for(HeuristicKind::IsJson).unwrap(),
        )
        .into_definition(Utc::now());

        assert!(DefinitionFilter::default().matches(&definition));
        assert!(DefinitionFilter { is_active: Some(true), kind: Some(HeuristicKind::IsJson) }.matches(&definition));

        definition.is_active = false;
        assert!(!DefinitionFilter { is_active: Some(true), kind: None }.matches(&definition));
        assert!(!DefinitionFilter { is_active: None, kind: Some(HeuristicKind::Regex) }.matches(&definition));
    }
}
