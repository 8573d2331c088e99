use super::{
    DefinitionFilter, HeuristicMetricDefinition, HeuristicMetricUpdate, HeuristicStore,
    NewHeuristicMetric, duplicate_name, not_found,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryHeuristicStore {
    definitions: RwLock<HashMap<String, HeuristicMetricDefinition>>,
}

impl InMemoryHeuristicStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn name_taken(
    definitions: &HashMap<String, HeuristicMetricDefinition>,
    name: &str,
    except_id: Option<&str>,
) -> bool {
    let name = name.trim();
    definitions.values().any(|d| d.name == name && Some(d.id.as_str()) != except_id)
}

#[async_trait]
impl HeuristicStore for InMemoryHeuristicStore {
    async fn list(&self, filter: &DefinitionFilter) -> Result<Vec<HeuristicMetricDefinition>> {
        let definitions = self.definitions.read().await;
        let mut matching: Vec<_> =
            definitions.values().filter(|d| filter.matches(d)).cloned().collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(matching)
    }

    async fn get(&self, id: &str) -> Result<HeuristicMetricDefinition> {
        self.definitions.read().await.get(id).cloned().ok_or_else(|| not_found(id))
    }

    async fn create(&self, new: NewHeuristicMetric) -> Result<HeuristicMetricDefinition> {
        new.validate()?;
        let mut definitions = self.definitions.write().await;
        if name_taken(&definitions, &new.name, None) {
            return Err(duplicate_name(&new.name));
        }
        let definition = new.into_definition(Utc::now());
        definitions.insert(definition.id.clone(), definition.clone());
        Ok(definition)
    }

    async fn update(
        &self,
        id: &str,
        update: HeuristicMetricUpdate,
    ) -> Result<HeuristicMetricDefinition> {
        update.validate()?;
        let mut definitions = self.definitions.write().await;
        if let Some(name) = &update.name {
            if name_taken(&definitions, name, Some(id)) {
                return Err(duplicate_name(name));
            }
        }
        let definition = definitions.get_mut(id).ok_or_else(|| not_found(id))?;
        update.apply(definition, Utc::now());
        Ok(definition.clone())
    }

    async fn toggle(&self, id: &str) -> Result<HeuristicMetricDefinition> {
        let mut definitions = self.definitions.write().await;
        let definition = definitions.get_mut(id).ok_or_else(|| not_found(id))?;
        definition.is_active = !definition.is_active;
        definition.updated_at = Utc::now();
        Ok(definition.clone())
    }
}
