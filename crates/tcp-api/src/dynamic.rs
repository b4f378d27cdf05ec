use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;

/// A record in the dynamic-component side API (spec §6's optional
/// collaborator). Unlike [`tcp_domain::CapabilityDeclaration`] this has no
/// tier, no provider, and no planning semantics — it is a flat bag of
/// properties a client can CRUD without going through the orchestration
/// pipeline at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicComponent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct DynamicComponentInput {
    pub name: String,
    #[serde(default)]
    pub properties: Value,
}

impl DynamicComponentInput {
    /// Fails with [`ApiError::unprocessable`] (422) on an empty name —
    /// the one validation rule this side API enforces.
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::unprocessable("component 'name' must not be empty"));
        }
        Ok(())
    }
}

/// In-memory backing store for the dynamic-component API, shaped like
/// [`tcp_store::InMemoryStore`]'s `RwLock<HashMap<..>>` interior but keyed
/// by a bare id rather than a context path since these records never
/// participate in tier resolution.
#[derive(Default)]
pub struct DynamicComponentStore {
    inner: RwLock<HashMap<String, DynamicComponent>>,
}

impl DynamicComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self) -> Vec<DynamicComponent> {
        let guard = self.inner.read().await;
        let mut items: Vec<_> = guard.values().cloned().collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        items
    }

    pub async fn get(&self, id: &str) -> Option<DynamicComponent> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn create(&self, input: DynamicComponentInput) -> Result<DynamicComponent, ApiError> {
        input.validate()?;
        let now = Utc::now();
        let component = DynamicComponent {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            properties: input.properties,
            created_at: now,
            updated_at: now,
        };
        self.inner.write().await.insert(component.id.clone(), component.clone());
        Ok(component)
    }

    pub async fn update(&self, id: &str, input: DynamicComponentInput) -> Result<DynamicComponent, ApiError> {
        input.validate()?;
        let mut guard = self.inner.write().await;
        let existing = guard
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(format!("dynamic component '{}' not found", id)))?;
        existing.name = input.name;
        existing.properties = input.properties;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let mut guard = self.inner.write().await;
        guard
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found(format!("dynamic component '{}' not found", id)))
    }
}
