use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tcp_domain::{DiffEntry, DomainError, PropertyValue, ResourceOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    pub fn unhealthy(message: impl Into<String>) -> Self {
        HealthCheckResult { status: HealthStatus::Unhealthy, message: message.into(), checked_at: Utc::now() }
    }

    pub fn healthy(message: impl Into<String>) -> Self {
        HealthCheckResult { status: HealthStatus::Healthy, message: message.into(), checked_at: Utc::now() }
    }
}

/// CRUD + health/scale/diff contract for one provider resource type (e.g.
/// `aws.rds`, `docker-compose.service`). One driver instance serves every
/// resource of its type across every context path.
#[async_trait]
pub trait ResourceDriver: Send + Sync {
    /// Stable identifier for the resource type this driver serves.
    fn resource_type(&self) -> &str;

    /// Must be idempotent on retry — implementations should read before
    /// creating so a retried call after a partial failure does not double
    /// provision.
    async fn create(&self, name: &str, properties: &BTreeMap<String, PropertyValue>) -> Result<ResourceOutput, DomainError>;

    /// Fails with [`DomainError::ResourceNotFound`] when the resource does
    /// not exist live.
    async fn read(&self, name: &str) -> Result<ResourceOutput, DomainError>;

    /// Applies only the fields that actually changed between `current` and
    /// `desired`.
    async fn update(
        &self,
        name: &str,
        current: &ResourceOutput,
        desired: &BTreeMap<String, PropertyValue>,
    ) -> Result<ResourceOutput, DomainError>;

    /// Idempotent: deleting an already-deleted (or never-created) resource
    /// succeeds.
    async fn delete(&self, name: &str) -> Result<(), DomainError>;

    /// Must never fail — transport errors are reported as
    /// [`HealthStatus::Unhealthy`], not propagated as an `Err`.
    async fn health_check(&self, name: &str) -> HealthCheckResult;

    /// Resources without a scaling axis return [`DomainError::NotScalable`];
    /// that is the default implementation.
    async fn scale(&self, name: &str, _params: &BTreeMap<String, PropertyValue>) -> Result<(), DomainError> {
        Err(DomainError::NotScalable { name: name.to_string(), provider_type: self.resource_type().to_string() })
    }

    /// Empty result means in sync. Comparison must be by stringified value
    /// so JSON numeric widening does not produce spurious diffs.
    async fn diff(&self, name: &str, desired: &BTreeMap<String, PropertyValue>) -> Result<Vec<DiffEntry>, DomainError>;
}

/// Diffs two property maps by stringified value, the comparison rule every
/// [`ResourceDriver::diff`] implementation in this crate shares.
pub fn diff_properties(
    current: &BTreeMap<String, PropertyValue>,
    desired: &BTreeMap<String, PropertyValue>,
) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    for (key, desired_value) in desired {
        match current.get(key) {
            Some(current_value) if current_value.stringify() == desired_value.stringify() => {}
            Some(current_value) => entries.push(DiffEntry {
                field: key.clone(),
                before: Some(current_value.clone()),
                after: Some(desired_value.clone()),
            }),
            None => entries.push(DiffEntry { field: key.clone(), before: None, after: Some(desired_value.clone()) }),
        }
    }
    for (key, current_value) in current {
        if !desired.contains_key(key) {
            entries.push(DiffEntry { field: key.clone(), before: Some(current_value.clone()), after: None });
        }
    }
    entries
}
