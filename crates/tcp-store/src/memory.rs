use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tcp_domain::{DependencyRef, DriftEntry, Plan, ResourceOutput};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{LockHandle, StateStore};

#[derive(Debug, Clone)]
struct LockState {
    holder_id: String,
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    resources: HashMap<(String, String), ResourceOutput>,
    plans: HashMap<Uuid, Plan>,
    dependencies: Vec<DependencyRef>,
    drift: Vec<DriftEntry>,
    locks: HashMap<String, LockState>,
}

/// In-memory implementation of [`StateStore`]. All data is lost on process
/// exit. Used for tests and as the backing store for the local provider.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove locks whose TTL has elapsed. Called before every acquisition
    /// attempt, mirroring the lazy-reaping rule in spec §4.2.
    async fn reap_expired_locks(&self) {
        let now = Utc::now();
        let mut guard = self.inner.write().await;
        let before = guard.locks.len();
        guard.locks.retain(|_, l| l.expires_at > now);
        let reaped = before - guard.locks.len();
        if reaped > 0 {
            debug!(reaped, "swept expired locks");
        }
    }
}

struct InMemoryLockHandle {
    inner: Arc<RwLock<Inner>>,
    context_path: String,
    holder_id: String,
}

#[async_trait]
impl LockHandle for InMemoryLockHandle {
    fn context_path(&self) -> &str {
        &self.context_path
    }

    fn holder_id(&self) -> &str {
        &self.holder_id
    }

    async fn unlock(&self) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if let Some(existing) = guard.locks.get(&self.context_path) {
            if existing.holder_id == self.holder_id {
                guard.locks.remove(&self.context_path);
            }
        }
        Ok(())
    }

    async fn refresh(&self, ttl: Duration) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        match guard.locks.get_mut(&self.context_path) {
            Some(existing) if existing.holder_id == self.holder_id => {
                existing.expires_at = Utc::now() + ttl;
                Ok(())
            }
            Some(existing) => Err(StoreError::LockNotOwned {
                context_path: self.context_path.clone(),
                holder: existing.holder_id.clone(),
            }),
            None => Err(StoreError::LockNotOwned {
                context_path: self.context_path.clone(),
                holder: self.holder_id.clone(),
            }),
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn save_resource(&self, context_path: &str, output: &ResourceOutput) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let mut output = output.clone();
        output.last_synced = Utc::now();
        guard
            .resources
            .insert((context_path.to_string(), output.name.clone()), output);
        Ok(())
    }

    async fn get_resource(&self, context_path: &str, name: &str) -> Result<ResourceOutput, StoreError> {
        let guard = self.inner.read().await;
        guard
            .resources
            .get(&(context_path.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::ResourceNotFound {
                context_path: context_path.to_string(),
                name: name.to_string(),
            })
    }

    async fn list_resources(&self, context_path: &str) -> Result<Vec<ResourceOutput>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .resources
            .iter()
            .filter(|((cp, _), _)| cp == context_path)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn delete_resource(&self, context_path: &str, name: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard
            .resources
            .remove(&(context_path.to_string(), name.to_string()))
            .ok_or_else(|| StoreError::ResourceNotFound {
                context_path: context_path.to_string(),
                name: name.to_string(),
            })?;
        debug!(context_path, name, "deleted resource");
        Ok(())
    }

    async fn save_plan(&self, plan: &Plan) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn get_plan(&self, id: Uuid) -> Result<Plan, StoreError> {
        let guard = self.inner.read().await;
        guard
            .plans
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::PlanNotFound(id.to_string()))
    }

    async fn list_plans(&self, context_path: &str, limit: u32) -> Result<Vec<Plan>, StoreError> {
        let guard = self.inner.read().await;
        let mut plans: Vec<Plan> = guard
            .plans
            .values()
            .filter(|p| p.context_path == context_path)
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        plans.truncate(limit as usize);
        Ok(plans)
    }

    async fn lock(&self, context_path: &str, holder_id: &str, ttl: Duration) -> Result<Box<dyn LockHandle>, StoreError> {
        self.reap_expired_locks().await;
        let mut guard = self.inner.write().await;
        if let Some(existing) = guard.locks.get(context_path) {
            warn!(context_path, holder = %existing.holder_id, "lock conflict");
            return Err(StoreError::LockConflict {
                context_path: context_path.to_string(),
                holder: existing.holder_id.clone(),
            });
        }
        let now = Utc::now();
        guard.locks.insert(
            context_path.to_string(),
            LockState {
                holder_id: holder_id.to_string(),
                acquired_at: now,
                expires_at: now + ttl,
            },
        );
        drop(guard);
        Ok(Box::new(InMemoryLockHandle {
            inner: self.inner.clone(),
            context_path: context_path.to_string(),
            holder_id: holder_id.to_string(),
        }))
    }

    async fn add_dependency(&self, dep: &DependencyRef) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if !guard.dependencies.iter().any(|d| d == dep) {
            guard.dependencies.push(dep.clone());
        }
        Ok(())
    }

    async fn dependencies(&self, context_path: &str, resource_name: &str) -> Result<Vec<DependencyRef>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .dependencies
            .iter()
            .filter(|d| d.source_context == context_path && d.source_resource == resource_name)
            .cloned()
            .collect())
    }

    async fn save_drift_report(&self, entry: &DriftEntry) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.drift.push(entry.clone());
        Ok(())
    }

    async fn list_drift_reports(&self, context_path: &str) -> Result<Vec<DriftEntry>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .drift
            .iter()
            .filter(|d| d.context_path == context_path)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcp_domain::Tier;

    fn resource(name: &str) -> ResourceOutput {
        ResourceOutput::new(name, "database", "aws.rds", Utc::now())
    }

    #[tokio::test]
    async fn save_and_get_resource() {
        let store = InMemoryStore::new();
        store.save_resource("acme/prod", &resource("db-1")).await.unwrap();
        let got = store.get_resource("acme/prod", "db-1").await.unwrap();
        assert_eq!(got.name, "db-1");
    }

    #[tokio::test]
    async fn get_missing_resource_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get_resource("acme/prod", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn delete_missing_resource_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.delete_resource("acme/prod", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn list_plans_newest_first() {
        let store = InMemoryStore::new();
        let mut p1 = Plan::new(Tier::Infrastructure, "acme/prod", "local", false, Utc::now());
        p1.created_at = Utc::now() - Duration::minutes(5);
        let p2 = Plan::new(Tier::Infrastructure, "acme/prod", "local", false, Utc::now());
        store.save_plan(&p1).await.unwrap();
        store.save_plan(&p2).await.unwrap();

        let plans = store.list_plans("acme/prod", 10).await.unwrap();
        assert_eq!(plans[0].id, p2.id);
        assert_eq!(plans[1].id, p1.id);
    }

    #[tokio::test]
    async fn concurrent_locks_exactly_one_succeeds() {
        let store = InMemoryStore::new();
        let l1 = store.lock("acme/prod", "worker-1", Duration::minutes(5)).await;
        let l2 = store.lock("acme/prod", "worker-2", Duration::minutes(5)).await;
        assert!(l1.is_ok());
        assert!(matches!(l2.unwrap_err(), StoreError::LockConflict { .. }));

        l1.unwrap().unlock().await.unwrap();
        let l3 = store.lock("acme/prod", "worker-3", Duration::minutes(5)).await;
        assert!(l3.is_ok());
    }

    #[tokio::test]
    async fn refresh_fails_after_unlock() {
        let store = InMemoryStore::new();
        let handle = store.lock("acme/prod", "worker-1", Duration::minutes(5)).await.unwrap();
        handle.unlock().await.unwrap();
        let err = handle.refresh(Duration::minutes(5)).await.unwrap_err();
        assert!(matches!(err, StoreError::LockNotOwned { .. }));
    }

    #[tokio::test]
    async fn expired_lock_is_reaped_on_next_acquisition() {
        let store = InMemoryStore::new();
        store
            .lock("acme/prod", "worker-1", Duration::milliseconds(-1))
            .await
            .unwrap();
        let second = store.lock("acme/prod", "worker-2", Duration::minutes(5)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn dependency_lookup_by_source() {
        let store = InMemoryStore::new();
        let dep = DependencyRef::hard("acme/prod/tier2", "shared-postgres", "acme/prod/web", "api-service");
        store.add_dependency(&dep).await.unwrap();
        let found = store.dependencies("acme/prod/tier2", "shared-postgres").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target_resource, "api-service");
    }
}
