use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::Utc;
use tcp_domain::{DomainError, DriftEntry, ResourceStatus};
use tcp_provider::Provider;
use tcp_store::StateStore;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::report::{CrossTierImpact, ReconcileResult};

/// Runs one reconciliation cycle over every resource stored at
/// `context_path` (spec §4.6): reads each resource's live state from its
/// provider-registered driver, diffs it against what was last persisted,
/// and assembles the cross-tier impact of anything found drifted.
///
/// Resources in a transient state (pending/creating/deleting/deleted) are
/// skipped — they are mid-transition and not yet a meaningful comparison
/// point. A resource whose provider type has no registered driver is logged
/// and skipped rather than aborting the whole cycle; one unreachable
/// resource should not block drift detection for the rest of the context.
pub async fn reconcile(
    context_path: &str,
    store: Arc<dyn StateStore>,
    provider: Arc<dyn Provider>,
) -> Result<ReconcileResult, ReconcileError> {
    let started = Instant::now();
    let now = Utc::now();

    let resources = store.list_resources(context_path).await?;
    let mut resources_checked = 0usize;
    let mut resources_skipped = 0usize;
    let mut drift = Vec::new();

    for resource in &resources {
        if matches!(
            resource.status,
            ResourceStatus::Pending | ResourceStatus::Creating | ResourceStatus::Deleting | ResourceStatus::Deleted
        ) {
            resources_skipped += 1;
            continue;
        }

        let driver = match provider.resource_driver(&resource.provider_type) {
            Ok(driver) => driver,
            Err(e) => {
                warn!(resource = %resource.name, provider_type = %resource.provider_type, error = %e, "no driver registered, skipping");
                resources_skipped += 1;
                continue;
            }
        };

        resources_checked += 1;

        match driver.read(&resource.name).await {
            Ok(live) => {
                let diff = driver.diff(&resource.name, &resource.properties).await?;
                if !diff.is_empty() {
                    debug!(resource = %resource.name, fields = diff.len(), "drift detected");
                    drift.push(DriftEntry::changed(
                        context_path,
                        &resource.name,
                        resource.properties.clone(),
                        live.properties.clone(),
                        diff,
                        now,
                    ));
                }
            }
            Err(DomainError::ResourceNotFound { .. }) => {
                debug!(resource = %resource.name, "resource missing live, recording as removed");
                drift.push(DriftEntry::removed(context_path, &resource.name, resource.properties.clone(), now));
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut impacts = Vec::with_capacity(drift.len());
    for entry in &drift {
        let affected = store.dependencies(context_path, &entry.resource_name).await?;
        if !affected.is_empty() {
            impacts.push(CrossTierImpact {
                context_path: context_path.to_string(),
                resource_name: entry.resource_name.clone(),
                affected,
            });
        }
    }

    for entry in &drift {
        store.save_drift_report(entry).await?;
    }

    let result = ReconcileResult {
        context_path: context_path.to_string(),
        checked_at: now,
        duration_ms: started.elapsed().as_millis() as i64,
        resources_checked,
        resources_skipped,
        drift,
        impacts,
    };

    info!(
        context_path,
        checked = result.resources_checked,
        skipped = result.resources_skipped,
        drift = result.drift.len(),
        impacts = result.impacts.len(),
        "reconcile cycle complete"
    );

    Ok(result)
}

/// Runs [`reconcile`] on a fixed interval until `shutdown` is signalled.
/// Errors from a single cycle are logged and do not stop the loop — the
/// next tick gets another chance, matching the spec's "loops every
/// configured interval" framing rather than treating one bad cycle as
/// fatal.
pub async fn run_loop(
    context_path: String,
    store: Arc<dyn StateStore>,
    provider: Arc<dyn Provider>,
    interval: StdDuration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // first tick fires immediately; consume it before the loop

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = reconcile(&context_path, store.clone(), provider.clone()).await {
                    warn!(context_path = %context_path, error = %e, "reconcile cycle failed");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!(context_path = %context_path, "reconcile loop shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tcp_domain::{DependencyRef, PropertyValue, ResourceOutput};
    use tcp_provider::LocalProvider;

    fn props(replicas: i64) -> BTreeMap<String, PropertyValue> {
        let mut m = BTreeMap::new();
        m.insert("replicas".to_string(), PropertyValue::Int(replicas));
        m
    }

    #[tokio::test]
    async fn clean_context_produces_no_drift() {
        let provider = Arc::new(LocalProvider::new());
        let store = provider.state_store();
        let result = reconcile("acme/prod/web", store, provider).await.unwrap();
        assert!(result.is_clean());
        assert_eq!(result.resources_checked, 0);
    }

    #[tokio::test]
    async fn removed_resource_is_reported() {
        let provider = Arc::new(LocalProvider::new());
        let store = provider.state_store();

        let mut output = ResourceOutput::new("api-service", "container_runtime", "local", Utc::now());
        output.status = ResourceStatus::Active;
        output.properties = props(3);
        store.save_resource("acme/prod/web", &output).await.unwrap();
        // never created via the driver, so driver.Read reports not-found

        let result = reconcile("acme/prod/web", store, provider).await.unwrap();
        assert_eq!(result.drift.len(), 1);
        assert_eq!(result.drift[0].kind, tcp_domain::DriftKind::Removed);
    }

    #[tokio::test]
    async fn changed_resource_with_dependency_produces_one_impact() {
        let provider = Arc::new(LocalProvider::new());
        let store = provider.state_store();
        let driver = provider.resource_driver("local").unwrap();

        driver.create("api-service", &props(3)).await.unwrap();
        let mut output = ResourceOutput::new("api-service", "container_runtime", "local", Utc::now());
        output.status = ResourceStatus::Active;
        output.properties = props(3);
        store.save_resource("acme/prod/web", &output).await.unwrap();

        driver.update("api-service", &driver.read("api-service").await.unwrap(), &props(2)).await.unwrap();

        store
            .add_dependency(&DependencyRef::hard("acme/prod/web", "api-service", "acme/prod/web", "shared-postgres"))
            .await
            .unwrap();

        let result = reconcile("acme/prod/web", store, provider).await.unwrap();
        assert_eq!(result.drift.len(), 1);
        assert_eq!(result.drift[0].kind, tcp_domain::DriftKind::Changed);
        assert_eq!(result.impacts.len(), 1);
        assert_eq!(result.impacts[0].resource_name, "api-service");
    }

    #[tokio::test]
    async fn pending_resource_is_skipped() {
        let provider = Arc::new(LocalProvider::new());
        let store = provider.state_store();

        let output = ResourceOutput::new("db-1", "database", "local", Utc::now());
        store.save_resource("acme/prod/web", &output).await.unwrap();

        let result = reconcile("acme/prod/web", store, provider).await.unwrap();
        assert_eq!(result.resources_checked, 0);
        assert_eq!(result.resources_skipped, 1);
        assert!(result.is_clean());
    }

    #[tokio::test]
    async fn unregistered_driver_is_skipped_not_fatal() {
        let provider = Arc::new(LocalProvider::new());
        let store = provider.state_store();

        let mut output = ResourceOutput::new("weird", "quantum", "nonexistent.driver", Utc::now());
        output.status = ResourceStatus::Active;
        store.save_resource("acme/prod/web", &output).await.unwrap();

        let result = reconcile("acme/prod/web", store, provider).await.unwrap();
        assert_eq!(result.resources_skipped, 1);
        assert!(result.is_clean());
    }
}
