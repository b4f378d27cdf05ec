use async_trait::async_trait;
use chrono::Duration;
use tcp_domain::{DependencyRef, DriftEntry, Plan, ResourceOutput};
use uuid::Uuid;

use crate::error::StoreError;

/// A held advisory lock on a context path. Dropping the handle does not
/// release the lock — callers must call [`LockHandle::unlock`] explicitly;
/// an unreleased lock is reclaimed once its TTL elapses.
#[async_trait]
pub trait LockHandle: Send + Sync {
    fn context_path(&self) -> &str;
    fn holder_id(&self) -> &str;

    /// Release the lock. Idempotent: calling this after the lock has already
    /// been released (by this handle or by TTL expiry) succeeds.
    async fn unlock(&self) -> Result<(), StoreError>;

    /// Extend the lock's TTL. Fails with [`StoreError::LockNotOwned`] if this
    /// holder no longer owns the lock (released, or reaped after expiry).
    async fn refresh(&self, ttl: Duration) -> Result<(), StoreError>;
}

/// Driver-agnostic persistence contract. Every concrete backend (in-memory,
/// embedded single-file, networked SQL) implements the same operations with
/// the same observable semantics — callers never branch on which backend is
/// in use.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Upsert keyed by `(contextPath, name)`. Bumps `last_synced` atomically.
    async fn save_resource(&self, context_path: &str, output: &ResourceOutput) -> Result<(), StoreError>;

    /// Fails with [`StoreError::ResourceNotFound`] when absent.
    async fn get_resource(&self, context_path: &str, name: &str) -> Result<ResourceOutput, StoreError>;

    async fn list_resources(&self, context_path: &str) -> Result<Vec<ResourceOutput>, StoreError>;

    /// Fails with [`StoreError::ResourceNotFound`] on an unknown resource —
    /// deletion of a resource that was never stored is not idempotent success
    /// at this layer (drivers, not the store, make delete idempotent).
    async fn delete_resource(&self, context_path: &str, name: &str) -> Result<(), StoreError>;

    async fn save_plan(&self, plan: &Plan) -> Result<(), StoreError>;

    /// Fails with [`StoreError::PlanNotFound`] when absent.
    async fn get_plan(&self, id: Uuid) -> Result<Plan, StoreError>;

    /// Newest-first by `createdAt`.
    async fn list_plans(&self, context_path: &str, limit: u32) -> Result<Vec<Plan>, StoreError>;

    /// Acquire the advisory lock on `context_path` for `ttl`. Sweeps expired
    /// locks before attempting acquisition. Fails with
    /// [`StoreError::LockConflict`] when a live holder already exists.
    async fn lock(&self, context_path: &str, holder_id: &str, ttl: Duration) -> Result<Box<dyn LockHandle>, StoreError>;

    async fn add_dependency(&self, dep: &DependencyRef) -> Result<(), StoreError>;

    /// Dependencies whose `sourceContext`/`sourceResource` match the given
    /// resource — i.e. "what is affected if this resource drifts".
    async fn dependencies(&self, context_path: &str, resource_name: &str) -> Result<Vec<DependencyRef>, StoreError>;

    async fn save_drift_report(&self, entry: &DriftEntry) -> Result<(), StoreError>;

    async fn list_drift_reports(&self, context_path: &str) -> Result<Vec<DriftEntry>, StoreError>;
}
