use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// At most one live holder per context path. Expired locks are reaped
/// lazily on the next acquisition attempt by the state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    pub context_path: String,
    pub holder_id: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Lock {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_check() {
        let now = Utc::now();
        let lock = Lock {
            context_path: "acme/prod".into(),
            holder_id: "worker-1".into(),
            acquired_at: now,
            expires_at: now + Duration::minutes(5),
        };
        assert!(!lock.is_expired(now));
        assert!(lock.is_expired(now + Duration::minutes(6)));
    }
}
