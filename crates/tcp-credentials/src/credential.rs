use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tcp_domain::Tier;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::CredentialError;

/// Default lease when a caller requests `ttl == 0`.
const DEFAULT_TTL: Duration = Duration::hours(1);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub scope: Vec<String>,
    /// TTL in seconds; zero means "use the provider default".
    pub ttl_seconds: i64,
    pub renewable: bool,
}

impl IssueRequest {
    pub fn new(name: impl Into<String>, credential_type: impl Into<String>) -> Self {
        IssueRequest {
            name: name.into(),
            credential_type: credential_type.into(),
            scope: Vec::new(),
            ttl_seconds: 0,
            renewable: false,
        }
    }

    pub fn with_scope(mut self, scope: impl IntoIterator<Item = String>) -> Self {
        self.scope = scope.into_iter().collect();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_seconds = ttl.num_seconds();
        self
    }

    pub fn renewable(mut self) -> Self {
        self.renewable = true;
        self
    }
}

/// Opaque handle to a live credential. Contains everything needed to locate
/// and expire the credential, but never the secret material itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRef {
    pub id: String,
    pub backend_path: String,
    pub provider: String,
    pub tier: Tier,
    pub context_path: String,
    pub scope: Vec<String>,
    pub renewable: bool,
    pub expires_at: DateTime<Utc>,
}

impl CredentialRef {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

struct StoredCredential {
    value: String,
    reference: CredentialRef,
}

/// Issues, resolves, rotates, and revokes short-lived scoped credentials.
/// Implementations must never persist secret material anywhere but their
/// own backend — callers only ever hold a [`CredentialRef`].
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    async fn issue_credential(
        &self,
        tier: Tier,
        context_path: &str,
        request: IssueRequest,
    ) -> Result<CredentialRef, CredentialError>;

    async fn resolve_credential(&self, reference: &CredentialRef) -> Result<String, CredentialError>;

    async fn rotate_credential(&self, reference: &CredentialRef) -> Result<CredentialRef, CredentialError>;

    async fn revoke_credential(&self, reference: &CredentialRef) -> Result<(), CredentialError>;

    async fn list_credentials(&self, context_path: &str) -> Result<Vec<CredentialRef>, CredentialError>;
}

/// Reference implementation: keeps credential material in process memory,
/// shaped like a Vault/KMS-backed broker would be (a `backend_path`, a
/// provider name, an expiring lease) without an external dependency.
pub struct InMemoryCredentialBroker {
    provider: String,
    inner: Arc<RwLock<HashMap<String, StoredCredential>>>,
}

impl InMemoryCredentialBroker {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn materialize(&self, credential_type: &str) -> String {
        format!("{}-{}", credential_type, Uuid::new_v4())
    }
}

#[async_trait]
impl CredentialBroker for InMemoryCredentialBroker {
    async fn issue_credential(
        &self,
        tier: Tier,
        context_path: &str,
        request: IssueRequest,
    ) -> Result<CredentialRef, CredentialError> {
        let id = Uuid::new_v4().to_string();
        let ttl = if request.ttl_seconds <= 0 { DEFAULT_TTL } else { Duration::seconds(request.ttl_seconds) };
        let reference = CredentialRef {
            id: id.clone(),
            backend_path: format!("{}/{}/{}", self.provider, context_path, request.name),
            provider: self.provider.clone(),
            tier,
            context_path: context_path.to_string(),
            scope: request.scope.clone(),
            renewable: request.renewable,
            expires_at: Utc::now() + ttl,
        };
        let value = self.materialize(&request.credential_type);
        self.inner
            .write()
            .await
            .insert(id, StoredCredential { value, reference: reference.clone() });
        Ok(reference)
    }

    async fn resolve_credential(&self, reference: &CredentialRef) -> Result<String, CredentialError> {
        let guard = self.inner.read().await;
        let stored = guard.get(&reference.id).ok_or_else(|| CredentialError::NotFound(reference.id.clone()))?;
        if stored.reference.is_expired(Utc::now()) {
            return Err(CredentialError::Expired(reference.id.clone()));
        }
        Ok(stored.value.clone())
    }

    async fn rotate_credential(&self, reference: &CredentialRef) -> Result<CredentialRef, CredentialError> {
        let mut guard = self.inner.write().await;
        let stored = guard.get(&reference.id).ok_or_else(|| CredentialError::NotFound(reference.id.clone()))?;
        if !stored.reference.renewable {
            return Err(CredentialError::NotRenewable(reference.id.clone()));
        }
        let ttl = stored.reference.expires_at.signed_duration_since(Utc::now()).max(DEFAULT_TTL);
        let new_id = Uuid::new_v4().to_string();
        let mut new_ref = stored.reference.clone();
        new_ref.id = new_id.clone();
        new_ref.expires_at = Utc::now() + ttl;
        let value = self.materialize(&new_ref.provider);
        guard.remove(&reference.id);
        guard.insert(new_id, StoredCredential { value, reference: new_ref.clone() });
        Ok(new_ref)
    }

    async fn revoke_credential(&self, reference: &CredentialRef) -> Result<(), CredentialError> {
        self.inner.write().await.remove(&reference.id);
        Ok(())
    }

    async fn list_credentials(&self, context_path: &str) -> Result<Vec<CredentialRef>, CredentialError> {
        let guard = self.inner.read().await;
        Ok(guard
            .values()
            .map(|s| &s.reference)
            .filter(|r| r.context_path == context_path)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issue_and_resolve() {
        let broker = InMemoryCredentialBroker::new("aws");
        let req = IssueRequest::new("db-password", "password");
        let reference = broker.issue_credential(Tier::SharedPrimitive, "acme/prod", req).await.unwrap();
        assert!(!reference.backend_path.is_empty());

        let value = broker.resolve_credential(&reference).await.unwrap();
        assert!(!value.is_empty());
    }

    #[tokio::test]
    async fn zero_ttl_defaults_to_one_hour() {
        let broker = InMemoryCredentialBroker::new("aws");
        let req = IssueRequest::new("db-password", "password");
        let reference = broker.issue_credential(Tier::SharedPrimitive, "acme/prod", req).await.unwrap();
        let remaining = reference.expires_at.signed_duration_since(Utc::now());
        assert!(remaining > Duration::minutes(55) && remaining <= Duration::hours(1));
    }

    #[tokio::test]
    async fn revoke_then_resolve_fails() {
        let broker = InMemoryCredentialBroker::new("aws");
        let req = IssueRequest::new("db-password", "password");
        let reference = broker.issue_credential(Tier::SharedPrimitive, "acme/prod", req).await.unwrap();
        broker.revoke_credential(&reference).await.unwrap();
        let err = broker.resolve_credential(&reference).await.unwrap_err();
        assert!(matches!(err, CredentialError::NotFound(_)));
    }

    #[tokio::test]
    async fn rotate_requires_renewable() {
        let broker = InMemoryCredentialBroker::new("aws");
        let req = IssueRequest::new("db-password", "password");
        let reference = broker.issue_credential(Tier::SharedPrimitive, "acme/prod", req).await.unwrap();
        let err = broker.rotate_credential(&reference).await.unwrap_err();
        assert!(matches!(err, CredentialError::NotRenewable(_)));
    }

    #[tokio::test]
    async fn rotate_issues_new_id_and_revokes_old() {
        let broker = InMemoryCredentialBroker::new("aws");
        let req = IssueRequest::new("db-password", "password").renewable();
        let reference = broker.issue_credential(Tier::SharedPrimitive, "acme/prod", req).await.unwrap();
        let rotated = broker.rotate_credential(&reference).await.unwrap();
        assert_ne!(rotated.id, reference.id);
        assert!(broker.resolve_credential(&reference).await.is_err());
        assert!(broker.resolve_credential(&rotated).await.is_ok());
    }

    #[tokio::test]
    async fn list_credentials_filters_by_context() {
        let broker = InMemoryCredentialBroker::new("aws");
        broker
            .issue_credential(Tier::SharedPrimitive, "acme/prod", IssueRequest::new("a", "password"))
            .await
            .unwrap();
        broker
            .issue_credential(Tier::SharedPrimitive, "acme/dev", IssueRequest::new("b", "password"))
            .await
            .unwrap();
        let prod = broker.list_credentials("acme/prod").await.unwrap();
        assert_eq!(prod.len(), 1);
    }
}
