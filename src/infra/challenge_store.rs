//! Component A: the challenge/code record store and its typed `Cache<T>`
//! projections.
//!
//! One shared record is projected three ways — an `AuthorizationRequest`
//! parked mid-redirect, a pending `RegisterResponse`, a pending
//! `LoginResponse` — exactly the "one record, three typed projections"
//! pattern confirmed in `challenge/state.go` of the original implementation
//! this spec was distilled from (`RepoToAuthorizationState` /
//! `RepoToLoginState` / `RepoToRegisterState`). The underlying in-memory
//! store itself generalizes the teacher's `MemoryChallengeStore`
//! (DashMap + `Instant` expiry) from a single string value to a full record.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::time::{Duration, Instant};

use crate::domain::errors::ChallengeStoreError;
use crate::domain::models::{AuthorizationRequest, ChallengeRecord, LoginResponse, RegisterResponse};
use crate::domain::ports::{Cache, ChallengeRecordStore};

/// Random-key length for challenge slots (register/login/authorization),
/// matching `server/utils/in_memory_cache.go`'s `RandString(20)`.
pub const CHALLENGE_KEY_LENGTH: usize = 20;
/// Random-key length for authorization codes, matching `challenge/code.go`'s
/// `RandString(12)`.
pub const CODE_KEY_LENGTH: usize = 12;

/// Challenge slots live 10 minutes; codes are single-use and live 60 seconds
/// (SPEC_FULL.md §9).
pub const CHALLENGE_TTL: Duration = Duration::from_secs(600);
pub const CODE_TTL: Duration = Duration::from_secs(60);

fn random_key(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// In-memory `ChallengeRecordStore`. For production, this should be Redis or
/// another shared cache — a single process's DashMap does not survive a
/// restart or scale past one replica.
pub struct MemoryChallengeRecordStore {
    store: DashMap<String, (ChallengeRecord, Instant)>,
    key_length: usize,
    ttl: Duration,
}

impl MemoryChallengeRecordStore {
    pub fn new(key_length: usize, ttl: Duration) -> Self {
        Self {
            store: DashMap::new(),
            key_length,
            ttl,
        }
    }

    pub fn challenges() -> Self {
        Self::new(CHALLENGE_KEY_LENGTH, CHALLENGE_TTL)
    }

    pub fn codes() -> Self {
        Self::new(CODE_KEY_LENGTH, CODE_TTL)
    }
}

#[async_trait]
impl ChallengeRecordStore for MemoryChallengeRecordStore {
    async fn create_empty(&self) -> Result<ChallengeRecord, ChallengeStoreError> {
        let key = random_key(self.key_length);
        let record = ChallengeRecord::empty(key.clone());
        self.store.insert(key, (record.clone(), Instant::now() + self.ttl));
        Ok(record)
    }

    async fn find(&self, key: &str) -> Result<Option<ChallengeRecord>, ChallengeStoreError> {
        if let Some(entry) = self.store.get(key) {
            let (record, expires_at) = entry.value();
            if *expires_at > Instant::now() {
                return Ok(Some(record.clone()));
            }
            drop(entry);
            self.store.remove(key);
        }
        Ok(None)
    }

    async fn update(&self, record: ChallengeRecord) -> Result<(), ChallengeStoreError> {
        let expires_at = Instant::now() + self.ttl;
        self.store.insert(record.key.clone(), (record, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ChallengeStoreError> {
        self.store.remove(key);
        Ok(())
    }
}

/// `Cache<AuthorizationRequest>` over the pending-authorization slot of a
/// challenge record. Used both for the challenge parked at `/authorize` and,
/// over a separately-configured store, for authorization codes.
pub struct AuthorizationCache {
    store: Arc<dyn ChallengeRecordStore>,
}

impl AuthorizationCache {
    pub fn new(store: Arc<dyn ChallengeRecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Cache<AuthorizationRequest> for AuthorizationCache {
    async fn get(&self, key: &str) -> Result<Option<AuthorizationRequest>, ChallengeStoreError> {
        Ok(self.store.find(key).await?.and_then(|r| r.authorization))
    }

    async fn set_without_key(&self, value: AuthorizationRequest) -> Result<String, ChallengeStoreError> {
        let mut record = self.store.create_empty().await?;
        record.authorization = Some(value);
        let key = record.key.clone();
        self.store.update(record).await?;
        Ok(key)
    }

    async fn set(&self, key: &str, value: AuthorizationRequest) -> Result<(), ChallengeStoreError> {
        let mut record = self
            .store
            .find(key)
            .await?
            .unwrap_or_else(|| ChallengeRecord::empty(key));
        record.authorization = Some(value);
        self.store.update(record).await
    }

    async fn delete(&self, key: &str) -> Result<(), ChallengeStoreError> {
        self.store.delete(key).await
    }
}

/// `Cache<RegisterResponse>` over the pending-registration slot.
pub struct RegisterCache {
    store: Arc<dyn ChallengeRecordStore>,
}

impl RegisterCache {
    pub fn new(store: Arc<dyn ChallengeRecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Cache<RegisterResponse> for RegisterCache {
    async fn get(&self, key: &str) -> Result<Option<RegisterResponse>, ChallengeStoreError> {
        Ok(self.store.find(key).await?.and_then(|r| r.register))
    }

    async fn set_without_key(&self, value: RegisterResponse) -> Result<String, ChallengeStoreError> {
        let mut record = self.store.create_empty().await?;
        record.register = Some(value);
        let key = record.key.clone();
        self.store.update(record).await?;
        Ok(key)
    }

    async fn set(&self, key: &str, value: RegisterResponse) -> Result<(), ChallengeStoreError> {
        let mut record = self
            .store
            .find(key)
            .await?
            .unwrap_or_else(|| ChallengeRecord::empty(key));
        record.register = Some(value);
        self.store.update(record).await
    }

    async fn delete(&self, key: &str) -> Result<(), ChallengeStoreError> {
        self.store.delete(key).await
    }
}

/// `Cache<LoginResponse>` over the pending-login slot.
pub struct LoginCache {
    store: Arc<dyn ChallengeRecordStore>,
}

impl LoginCache {
    pub fn new(store: Arc<dyn ChallengeRecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Cache<LoginResponse> for LoginCache {
    async fn get(&self, key: &str) -> Result<Option<LoginResponse>, ChallengeStoreError> {
        Ok(self.store.find(key).await?.and_then(|r| r.login))
    }

    async fn set_without_key(&self, value: LoginResponse) -> Result<String, ChallengeStoreError> {
        let mut record = self.store.create_empty().await?;
        record.login = Some(value);
        let key = record.key.clone();
        self.store.update(record).await?;
        Ok(key)
    }

    async fn set(&self, key: &str, value: LoginResponse) -> Result<(), ChallengeStoreError> {
        let mut record = self
            .store
            .find(key)
            .await?
            .unwrap_or_else(|| ChallengeRecord::empty(key));
        record.login = Some(value);
        self.store.update(record).await
    }

    async fn delete(&self, key: &str) -> Result<(), ChallengeStoreError> {
        self.store.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ResponseType;

    fn sample_request() -> AuthorizationRequest {
        AuthorizationRequest {
            response_type: ResponseType::Code,
            client_id: "demo-client".to_string(),
            redirect_uri: None,
            scope: vec!["openid".to_string()],
            state: None,
        }
    }

    #[tokio::test]
    async fn authorization_cache_round_trips() {
        let store = Arc::new(MemoryChallengeRecordStore::challenges());
        let cache = AuthorizationCache::new(store);

        let key = cache.set_without_key(sample_request()).await.unwrap();
        let fetched = cache.get(&key).await.unwrap().unwrap();
        assert_eq!(fetched.client_id, "demo-client");

        cache.delete(&key).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keys_are_unique_across_many_draws() {
        let store = MemoryChallengeRecordStore::challenges();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            let record = store.create_empty().await.unwrap();
            assert_eq!(record.key.len(), CHALLENGE_KEY_LENGTH);
            assert!(seen.insert(record.key));
        }
    }

    #[tokio::test]
    async fn code_store_uses_short_keys() {
        let store = MemoryChallengeRecordStore::codes();
        let record = store.create_empty().await.unwrap();
        assert_eq!(record.key.len(), CODE_KEY_LENGTH);
    }
}
