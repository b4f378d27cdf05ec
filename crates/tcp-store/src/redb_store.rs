use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tcp_domain::{DependencyRef, DriftEntry, Plan, ResourceOutput};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{LockHandle, StateStore};

const RESOURCES: TableDefinition<&str, &[u8]> = TableDefinition::new("resources");
const PLANS: TableDefinition<&str, &[u8]> = TableDefinition::new("plans");
const DEPENDENCIES: TableDefinition<u64, &[u8]> = TableDefinition::new("dependencies");
const DRIFT: TableDefinition<u64, &[u8]> = TableDefinition::new("drift");
const LOCKS: TableDefinition<&str, &[u8]> = TableDefinition::new("locks");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

fn err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Internal(e.to_string())
}

fn resource_key(context_path: &str, name: &str) -> String {
    format!("{context_path}\u{0}{name}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredLock {
    holder_id: String,
    acquired_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Persistent [`StateStore`] backed by a single redb database file. Suitable
/// for a single control-plane process (single writer, no network dependency).
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) a redb database at `path`. Parent directories are
    /// created automatically; tables are created on first open.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(err)?;
        }
        let db = Database::create(path).map_err(err)?;
        {
            let wtxn = db.begin_write().map_err(err)?;
            wtxn.open_table(RESOURCES).map_err(err)?;
            wtxn.open_table(PLANS).map_err(err)?;
            wtxn.open_table(DEPENDENCIES).map_err(err)?;
            wtxn.open_table(DRIFT).map_err(err)?;
            wtxn.open_table(LOCKS).map_err(err)?;
            wtxn.open_table(META).map_err(err)?;
            wtxn.commit().map_err(err)?;
        }
        Ok(Self { db: Arc::new(db) })
    }

    fn next_id(&self, counter: &str) -> Result<u64, StoreError> {
        let wtxn = self.db.begin_write().map_err(err)?;
        let next = {
            let mut table = wtxn.open_table(META).map_err(err)?;
            let current = table.get(counter).map_err(err)?.map(|g| g.value()).unwrap_or(0);
            table.insert(counter, current + 1).map_err(err)?;
            current + 1
        };
        wtxn.commit().map_err(err)?;
        Ok(next)
    }

    async fn reap_expired_locks(&self) -> Result<(), StoreError> {
        let now = Utc::now();
        let wtxn = self.db.begin_write().map_err(err)?;
        {
            let mut table = wtxn.open_table(LOCKS).map_err(err)?;
            let expired: Vec<String> = table
                .iter()
                .map_err(err)?
                .filter_map(|entry| {
                    let (k, v) = entry.ok()?;
                    let lock: StoredLock = serde_json::from_slice(v.value()).ok()?;
                    if lock.expires_at <= now {
                        Some(k.value().to_string())
                    } else {
                        None
                    }
                })
                .collect();
            if !expired.is_empty() {
                debug!(reaped = expired.len(), "swept expired locks");
            }
            for key in expired {
                table.remove(key.as_str()).map_err(err)?;
            }
        }
        wtxn.commit().map_err(err)?;
        Ok(())
    }
}

struct RedbLockHandle {
    db: Arc<Database>,
    context_path: String,
    holder_id: String,
}

#[async_trait]
impl LockHandle for RedbLockHandle {
    fn context_path(&self) -> &str {
        &self.context_path
    }

    fn holder_id(&self) -> &str {
        &self.holder_id
    }

    async fn unlock(&self) -> Result<(), StoreError> {
        let wtxn = self.db.begin_write().map_err(err)?;
        {
            let mut table = wtxn.open_table(LOCKS).map_err(err)?;
            let owned = match table.get(self.context_path.as_str()).map_err(err)? {
                Some(g) => {
                    let lock: StoredLock = serde_json::from_slice(g.value())?;
                    lock.holder_id == self.holder_id
                }
                None => false,
            };
            if owned {
                table.remove(self.context_path.as_str()).map_err(err)?;
            }
        }
        wtxn.commit().map_err(err)?;
        Ok(())
    }

    async fn refresh(&self, ttl: Duration) -> Result<(), StoreError> {
        let wtxn = self.db.begin_write().map_err(err)?;
        {
            let mut table = wtxn.open_table(LOCKS).map_err(err)?;
            let current = match table.get(self.context_path.as_str()).map_err(err)? {
                Some(g) => Some(serde_json::from_slice::<StoredLock>(g.value())?),
                None => None,
            };
            match current {
                Some(lock) if lock.holder_id == self.holder_id => {
                    let updated = StoredLock {
                        holder_id: self.holder_id.clone(),
                        acquired_at: lock.acquired_at,
                        expires_at: Utc::now() + ttl,
                    };
                    let bytes = serde_json::to_vec(&updated)?;
                    table.insert(self.context_path.as_str(), bytes.as_slice()).map_err(err)?;
                }
                Some(lock) => {
                    return Err(StoreError::LockNotOwned {
                        context_path: self.context_path.clone(),
                        holder: lock.holder_id,
                    });
                }
                None => {
                    return Err(StoreError::LockNotOwned {
                        context_path: self.context_path.clone(),
                        holder: self.holder_id.clone(),
                    });
                }
            }
        }
        wtxn.commit().map_err(err)?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for RedbStore {
    async fn save_resource(&self, context_path: &str, output: &ResourceOutput) -> Result<(), StoreError> {
        let mut output = output.clone();
        output.last_synced = Utc::now();
        let bytes = serde_json::to_vec(&output)?;
        let key = resource_key(context_path, &output.name);
        let wtxn = self.db.begin_write().map_err(err)?;
        {
            let mut table = wtxn.open_table(RESOURCES).map_err(err)?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(err)?;
        }
        wtxn.commit().map_err(err)?;
        Ok(())
    }

    async fn get_resource(&self, context_path: &str, name: &str) -> Result<ResourceOutput, StoreError> {
        let rtxn = self.db.begin_read().map_err(err)?;
        let table = rtxn.open_table(RESOURCES).map_err(err)?;
        let key = resource_key(context_path, name);
        match table.get(key.as_str()).map_err(err)? {
            Some(guard) => Ok(serde_json::from_slice(guard.value())?),
            None => Err(StoreError::ResourceNotFound {
                context_path: context_path.to_string(),
                name: name.to_string(),
            }),
        }
    }

    async fn list_resources(&self, context_path: &str) -> Result<Vec<ResourceOutput>, StoreError> {
        let prefix = format!("{context_path}\u{0}");
        let rtxn = self.db.begin_read().map_err(err)?;
        let table = rtxn.open_table(RESOURCES).map_err(err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(err)? {
            let (k, v) = entry.map_err(err)?;
            if k.value().starts_with(&prefix) {
                out.push(serde_json::from_slice(v.value())?);
            }
        }
        Ok(out)
    }

    async fn delete_resource(&self, context_path: &str, name: &str) -> Result<(), StoreError> {
        let key = resource_key(context_path, name);
        let wtxn = self.db.begin_write().map_err(err)?;
        let existed = {
            let mut table = wtxn.open_table(RESOURCES).map_err(err)?;
            table.remove(key.as_str()).map_err(err)?.is_some()
        };
        wtxn.commit().map_err(err)?;
        if existed {
            Ok(())
        } else {
            Err(StoreError::ResourceNotFound {
                context_path: context_path.to_string(),
                name: name.to_string(),
            })
        }
    }

    async fn save_plan(&self, plan: &Plan) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(plan)?;
        let key = plan.id.to_string();
        let wtxn = self.db.begin_write().map_err(err)?;
        {
            let mut table = wtxn.open_table(PLANS).map_err(err)?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(err)?;
        }
        wtxn.commit().map_err(err)?;
        Ok(())
    }

    async fn get_plan(&self, id: Uuid) -> Result<Plan, StoreError> {
        let rtxn = self.db.begin_read().map_err(err)?;
        let table = rtxn.open_table(PLANS).map_err(err)?;
        let key = id.to_string();
        match table.get(key.as_str()).map_err(err)? {
            Some(guard) => Ok(serde_json::from_slice(guard.value())?),
            None => Err(StoreError::PlanNotFound(id.to_string())),
        }
    }

    async fn list_plans(&self, context_path: &str, limit: u32) -> Result<Vec<Plan>, StoreError> {
        let rtxn = self.db.begin_read().map_err(err)?;
        let table = rtxn.open_table(PLANS).map_err(err)?;
        let mut plans = Vec::new();
        for entry in table.iter().map_err(err)? {
            let (_k, v) = entry.map_err(err)?;
            let plan: Plan = serde_json::from_slice(v.value())?;
            if plan.context_path == context_path {
                plans.push(plan);
            }
        }
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        plans.truncate(limit as usize);
        Ok(plans)
    }

    async fn lock(&self, context_path: &str, holder_id: &str, ttl: Duration) -> Result<Box<dyn LockHandle>, StoreError> {
        self.reap_expired_locks().await?;
        let wtxn = self.db.begin_write().map_err(err)?;
        {
            let mut table = wtxn.open_table(LOCKS).map_err(err)?;
            if let Some(existing) = table.get(context_path).map_err(err)? {
                let lock: StoredLock = serde_json::from_slice(existing.value())?;
                warn!(context_path, holder = %lock.holder_id, "lock conflict");
                return Err(StoreError::LockConflict {
                    context_path: context_path.to_string(),
                    holder: lock.holder_id,
                });
            }
            let now = Utc::now();
            let new_lock = StoredLock {
                holder_id: holder_id.to_string(),
                acquired_at: now,
                expires_at: now + ttl,
            };
            let bytes = serde_json::to_vec(&new_lock)?;
            table.insert(context_path, bytes.as_slice()).map_err(err)?;
        }
        wtxn.commit().map_err(err)?;
        Ok(Box::new(RedbLockHandle {
            db: self.db.clone(),
            context_path: context_path.to_string(),
            holder_id: holder_id.to_string(),
        }))
    }

    async fn add_dependency(&self, dep: &DependencyRef) -> Result<(), StoreError> {
        let existing = {
            let rtxn = self.db.begin_read().map_err(err)?;
            let table = rtxn.open_table(DEPENDENCIES).map_err(err)?;
            let mut found = false;
            for entry in table.iter().map_err(err)? {
                let (_k, v) = entry.map_err(err)?;
                let stored: DependencyRef = serde_json::from_slice(v.value())?;
                if &stored == dep {
                    found = true;
                    break;
                }
            }
            found
        };
        if existing {
            return Ok(());
        }
        let id = self.next_id("dependencies_next_id")?;
        let bytes = serde_json::to_vec(dep)?;
        let wtxn = self.db.begin_write().map_err(err)?;
        {
            let mut table = wtxn.open_table(DEPENDENCIES).map_err(err)?;
            table.insert(id, bytes.as_slice()).map_err(err)?;
        }
        wtxn.commit().map_err(err)?;
        Ok(())
    }

    async fn dependencies(&self, context_path: &str, resource_name: &str) -> Result<Vec<DependencyRef>, StoreError> {
        let rtxn = self.db.begin_read().map_err(err)?;
        let table = rtxn.open_table(DEPENDENCIES).map_err(err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(err)? {
            let (_k, v) = entry.map_err(err)?;
            let dep: DependencyRef = serde_json::from_slice(v.value())?;
            if dep.source_context == context_path && dep.source_resource == resource_name {
                out.push(dep);
            }
        }
        Ok(out)
    }

    async fn save_drift_report(&self, entry_val: &DriftEntry) -> Result<(), StoreError> {
        let id = self.next_id("drift_next_id")?;
        let bytes = serde_json::to_vec(entry_val)?;
        let wtxn = self.db.begin_write().map_err(err)?;
        {
            let mut table = wtxn.open_table(DRIFT).map_err(err)?;
            table.insert(id, bytes.as_slice()).map_err(err)?;
        }
        wtxn.commit().map_err(err)?;
        Ok(())
    }

    async fn list_drift_reports(&self, context_path: &str) -> Result<Vec<DriftEntry>, StoreError> {
        let rtxn = self.db.begin_read().map_err(err)?;
        let table = rtxn.open_table(DRIFT).map_err(err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(err)? {
            let (_k, v) = entry.map_err(err)?;
            let drift: DriftEntry = serde_json::from_slice(v.value())?;
            if drift.context_path == context_path {
                out.push(drift);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcp_domain::Tier;
    use tempfile::tempdir;

    fn open_store() -> (RedbStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(&dir.path().join("tcp.redb")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn save_and_get_resource_round_trips() {
        let (store, _dir) = open_store();
        let resource = ResourceOutput::new("db-1", "database", "aws.rds", Utc::now());
        store.save_resource("acme/prod", &resource).await.unwrap();
        let got = store.get_resource("acme/prod", "db-1").await.unwrap();
        assert_eq!(got.name, "db-1");
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tcp.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            let resource = ResourceOutput::new("db-1", "database", "aws.rds", Utc::now());
            store.save_resource("acme/prod", &resource).await.unwrap();
        }
        let reopened = RedbStore::open(&path).unwrap();
        let got = reopened.get_resource("acme/prod", "db-1").await.unwrap();
        assert_eq!(got.name, "db-1");
    }

    #[tokio::test]
    async fn concurrent_locks_exactly_one_succeeds() {
        let (store, _dir) = open_store();
        let l1 = store.lock("acme/prod", "worker-1", Duration::minutes(5)).await;
        let l2 = store.lock("acme/prod", "worker-2", Duration::minutes(5)).await;
        assert!(l1.is_ok());
        assert!(matches!(l2.unwrap_err(), StoreError::LockConflict { .. }));
    }

    #[tokio::test]
    async fn list_plans_filters_by_context_and_sorts() {
        let (store, _dir) = open_store();
        let p1 = Plan::new(Tier::Infrastructure, "acme/prod", "local", false, Utc::now() - Duration::minutes(5));
        let p2 = Plan::new(Tier::Infrastructure, "acme/prod", "local", false, Utc::now());
        let other = Plan::new(Tier::Infrastructure, "acme/dev", "local", false, Utc::now());
        store.save_plan(&p1).await.unwrap();
        store.save_plan(&p2).await.unwrap();
        store.save_plan(&other).await.unwrap();

        let plans = store.list_plans("acme/prod", 10).await.unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].id, p2.id);
    }
}
