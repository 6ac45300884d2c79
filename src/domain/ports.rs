use async_trait::async_trait;

use crate::domain::errors::{ChallengeStoreError, OAuth2Error, RepositoryError};
use crate::domain::models::*;

/// A read/write keyed data store, per SPEC_FULL.md §6. `ClientRepository` and
/// `UserRepository` are the two instantiations the core consumes. Mirrors
/// `core.Repository[id, value]`'s full interface, including `create_empty`
/// (insert a fresh zero-value entry, handed back for the caller to fill in
/// and `update`) and `delete` (remove by value, as opposed to `delete_by_id`'s
/// remove by key).
#[async_trait]
pub trait Repository<Id, T>: Send + Sync
where
    Id: Send + Sync,
    T: Send + Sync,
{
    async fn find_by_id(&self, id: &Id) -> Result<Option<T>, RepositoryError>;
    async fn create_empty(&self) -> Result<T, RepositoryError>;
    async fn create(&self, value: T) -> Result<T, RepositoryError>;
    async fn update(&self, value: T) -> Result<T, RepositoryError>;
    async fn delete(&self, value: T) -> Result<(), RepositoryError>;
    async fn delete_by_id(&self, id: &Id) -> Result<(), RepositoryError>;
}

pub type ClientRepository = dyn Repository<String, Client>;
pub type UserRepository = dyn Repository<String, User>;

/// Component A: the generic challenge/code store. `create_empty` allocates a
/// fresh record under a freshly generated random key; `find`/`update`/`delete`
/// operate on that key. Three typed `Cache<T>` projections (below) adapt it
/// to each of the three state slots without the caller knowing the record is
/// shared.
#[async_trait]
pub trait ChallengeRecordStore: Send + Sync {
    async fn create_empty(&self) -> Result<ChallengeRecord, ChallengeStoreError>;
    async fn find(&self, key: &str) -> Result<Option<ChallengeRecord>, ChallengeStoreError>;
    async fn update(&self, record: ChallengeRecord) -> Result<(), ChallengeStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ChallengeStoreError>;
}

/// A typed projection over the `ChallengeRecordStore`, SPEC_FULL.md §4.A / §9.
#[async_trait]
pub trait Cache<V>: Send + Sync
where
    V: Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<V>, ChallengeStoreError>;
    async fn set_without_key(&self, value: V) -> Result<String, ChallengeStoreError>;
    async fn set(&self, key: &str, value: V) -> Result<(), ChallengeStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ChallengeStoreError>;
}

/// Signs claims maps into opaque token bytes, wrapping either an HMAC secret
/// or an RSA keypair. SPEC_FULL.md §6.
#[async_trait]
pub trait JwtService: Send + Sync {
    async fn create(
        &self,
        claims: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, OAuth2Error>;

    /// Verifies a previously issued token, returning its claims on success.
    /// Used by the refresh-token grant (§4.F, §9 — the source leaves this as
    /// a TODO; this crate implements it).
    fn verify(
        &self,
        token: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, OAuth2Error>;
}

/// The callback the WebAuthn engine (D) invokes on the OAuth layer (E) after
/// a successful ceremony. Injected into D's constructor so D never imports
/// E's concrete controller. SPEC_FULL.md §9.
#[async_trait]
pub trait AuthorizationFinisher: Send + Sync {
    async fn finish_authorization(&self, challenge: &str) -> Result<RedirectOutcome, OAuth2Error>;
}
