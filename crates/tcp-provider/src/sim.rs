use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tcp_domain::{DiffEntry, DomainError, PropertyValue, ResourceOutput, ResourceStatus};

use crate::driver::{diff_properties, HealthCheckResult, ResourceDriver};

/// One generic in-memory CRUD driver shared by every simulated provider
/// (`aws.rs`, `docker_compose.rs`): each instance serves a single resource
/// type, keeping synthetic state in a map rather than calling out to any
/// real API. Endpoints are synthesized from `endpoint_scheme` so a plan
/// applied against a simulated provider still produces plausible-looking
/// output for downstream tiers to read.
pub struct InMemoryResourceDriver {
    resource_type: String,
    endpoint_scheme: String,
    resources: RwLock<BTreeMap<String, ResourceOutput>>,
}

impl InMemoryResourceDriver {
    pub fn new(resource_type: impl Into<String>, endpoint_scheme: impl Into<String>) -> Self {
        InMemoryResourceDriver {
            resource_type: resource_type.into(),
            endpoint_scheme: endpoint_scheme.into(),
            resources: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl ResourceDriver for InMemoryResourceDriver {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    async fn create(&self, name: &str, properties: &BTreeMap<String, PropertyValue>) -> Result<ResourceOutput, DomainError> {
        let mut output = ResourceOutput::new(name, &self.resource_type, &self.resource_type, Utc::now());
        output.properties = properties.clone();
        output.endpoint = Some(format!("{}://{}", self.endpoint_scheme, name));
        output.status = ResourceStatus::Active;
        self.resources.write().expect("simulated driver lock poisoned").insert(name.to_string(), output.clone());
        Ok(output)
    }

    async fn read(&self, name: &str) -> Result<ResourceOutput, DomainError> {
        self.resources
            .read()
            .expect("simulated driver lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| DomainError::ResourceNotFound { context_path: self.resource_type.clone(), name: name.to_string() })
    }

    async fn update(&self, name: &str, current: &ResourceOutput, desired: &BTreeMap<String, PropertyValue>) -> Result<ResourceOutput, DomainError> {
        let mut updated = current.clone();
        updated.properties = desired.clone();
        updated.status = ResourceStatus::Active;
        updated.last_synced = Utc::now();
        self.resources.write().expect("simulated driver lock poisoned").insert(name.to_string(), updated.clone());
        Ok(updated)
    }

    async fn delete(&self, name: &str) -> Result<(), DomainError> {
        self.resources.write().expect("simulated driver lock poisoned").remove(name);
        Ok(())
    }

    async fn health_check(&self, name: &str) -> HealthCheckResult {
        match self.resources.read().expect("simulated driver lock poisoned").get(name) {
            Some(_) => HealthCheckResult::healthy("simulated resource present"),
            None => HealthCheckResult::unhealthy("simulated resource not found"),
        }
    }

    async fn diff(&self, name: &str, desired: &BTreeMap<String, PropertyValue>) -> Result<Vec<DiffEntry>, DomainError> {
        let current = self.read(name).await?;
        Ok(diff_properties(&current.properties, desired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let driver = InMemoryResourceDriver::new("aws.s3", "s3");
        let props = BTreeMap::new();
        let created = driver.create("bucket-1", &props).await.unwrap();
        assert_eq!(created.endpoint.as_deref(), Some("s3://bucket-1"));
        let read_back = driver.read("bucket-1").await.unwrap();
        assert_eq!(read_back.name, "bucket-1");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let driver = InMemoryResourceDriver::new("aws.s3", "s3");
        driver.delete("never-created").await.unwrap();
    }
}
