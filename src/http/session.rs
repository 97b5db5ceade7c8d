//! Bearer-style session tokens for the `X-Session-Token` header.
//!
//! Tokens are 32 random bytes from a ChaCha20 CSPRNG seeded from OS entropy,
//! URL-safe base64 without padding. Expiry is checked lazily on lookup.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tokio::sync::{Mutex, RwLock};

use crate::domain::AccountId;

pub const SESSION_HEADER: &str = "x-session-token";

const TOKEN_BYTES: usize = 32;

struct Session {
    account_id: AccountId,
    expires_at: Instant,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    rng: Mutex<ChaCha20Rng>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            rng: Mutex::new(ChaCha20Rng::from_entropy()),
            ttl,
        }
    }

    /// Open a session and return its token.
    pub async fn create(&self, account_id: AccountId) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.lock().await.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        sessions.retain(|_, session| session.expires_at > now);
        sessions.insert(
            token.clone(),
            Session {
                account_id,
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// The account behind a live token.
    pub async fn resolve(&self, token: &str) -> Option<AccountId> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                None => return None,
                Some(session) if session.expires_at > Instant::now() => {
                    return Some(session.account_id)
                }
                Some(_) => {}
            }
        }

        self.sessions.write().await.remove(token);
        tracing::debug!("Evicted expired session");
        None
    }

    /// Returns `false` if the token was unknown.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_resolve() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(AccountId(4)).await;

        assert_eq!(token.len(), 43);
        assert!(!token.contains('='));
        assert_eq!(store.resolve(&token).await, Some(AccountId(4)));
        assert_eq!(store.resolve("not-a-token").await, None);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = SessionStore::new(Duration::from_secs(60));
        let first = store.create(AccountId(1)).await;
        let second = store.create(AccountId(1)).await;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(AccountId(1)).await;

        assert!(store.revoke(&token).await);
        assert!(!store.revoke(&token).await);
        assert_eq!(store.resolve(&token).await, None);
    }

    #[tokio::test]
    async fn test_expired_session_is_evicted() {
        let store = SessionStore::new(Duration::ZERO);
        let token = store.create(AccountId(1)).await;

        assert_eq!(store.resolve(&token).await, None);
        assert!(!store.revoke(&token).await);
    }
}
