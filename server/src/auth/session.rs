use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

/// Opaque bearer tokens mapped to user ids. Only the user id is kept: the
/// role is re-read from the store on each request, so role changes take
/// effect immediately.
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

struct Session {
    user_id: i64,
    expires_at: Instant,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn issue(&self, user_id: i64) -> String {
        let token = Uuid::new_v4();
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(
            token,
            Session {
                user_id,
                expires_at: now + self.ttl,
            },
        );
        token.to_string()
    }

    pub async fn resolve(&self, token: &str) -> Option<i64> {
        let token = Uuid::parse_str(token).ok()?;
        let sessions = self.sessions.read().await;
        sessions
            .get(&token)
            .filter(|s| s.expires_at > Instant::now())
            .map(|s| s.user_id)
    }

    pub async fn revoke(&self, token: &str) -> bool {
        match Uuid::parse_str(token) {
            Ok(token) => self.sessions.write().await.remove(&token).is_some(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issued_token_resolves_to_user() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.issue(42).await;
        assert_eq!(store.resolve(&token).await, Some(42));
        assert_eq!(store.resolve("not-a-token").await, None);
    }

    #[tokio::test]
    async fn test_expired_and_revoked_tokens_do_not_resolve() {
        let expired = SessionStore::new(Duration::ZERO);
        let token = expired.issue(1).await;
        assert_eq!(expired.resolve(&token).await, None);

        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.issue(1).await;
        assert!(store.revoke(&token).await);
        assert_eq!(store.resolve(&token).await, None);
    }
}
