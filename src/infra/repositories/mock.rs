//! In-memory `Repository<Id, T>` implementations for `Client` and `User`.
//!
//! Generalizes the teacher's `MockAuthRepository` (a `Mutex<HashMap<..>>`
//! guarded store) from a single bespoke trait per entity to the generic
//! `Repository<Id, T>` port, matching `core/repository.go`'s
//! `Repository[id, value]` contract from the original implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::errors::RepositoryError;
use crate::domain::models::{Client, ClientAuthenticationMethod, User};
use crate::domain::ports::Repository;

pub struct InMemoryClientRepository {
    clients: Mutex<HashMap<String, Client>>,
}

impl InMemoryClientRepository {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryClientRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository<String, Client> for InMemoryClientRepository {
    async fn find_by_id(&self, id: &String) -> Result<Option<Client>, RepositoryError> {
        let clients = self.clients.lock().unwrap();
        Ok(clients.get(id).cloned())
    }

    async fn create_empty(&self) -> Result<Client, RepositoryError> {
        let empty = Client {
            id: String::new(),
            name: String::new(),
            secret: None,
            authentication_method: ClientAuthenticationMethod::None,
            redirection_uris: Vec::new(),
            response_types: Vec::new(),
            grant_types: Vec::new(),
        };
        self.create(empty).await
    }

    async fn create(&self, value: Client) -> Result<Client, RepositoryError> {
        let mut clients = self.clients.lock().unwrap();
        if clients.contains_key(&value.id) {
            return Err(RepositoryError::DuplicateKey(value.id));
        }
        clients.insert(value.id.clone(), value.clone());
        Ok(value)
    }

    async fn update(&self, value: Client) -> Result<Client, RepositoryError> {
        let mut clients = self.clients.lock().unwrap();
        if !clients.contains_key(&value.id) {
            return Err(RepositoryError::NotFound(value.id));
        }
        clients.insert(value.id.clone(), value.clone());
        Ok(value)
    }

    async fn delete(&self, value: Client) -> Result<(), RepositoryError> {
        self.delete_by_id(&value.id).await
    }

    async fn delete_by_id(&self, id: &String) -> Result<(), RepositoryError> {
        let mut clients = self.clients.lock().unwrap();
        clients.remove(id);
        Ok(())
    }
}

pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository<String, User> for InMemoryUserRepository {
    async fn find_by_id(&self, id: &String) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(id).cloned())
    }

    async fn create_empty(&self) -> Result<User, RepositoryError> {
        self.create(User::new(String::new())).await
    }

    async fn create(&self, value: User) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&value.identifier) {
            return Err(RepositoryError::DuplicateKey(value.identifier));
        }
        users.insert(value.identifier.clone(), value.clone());
        Ok(value)
    }

    async fn update(&self, value: User) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&value.identifier) {
            return Err(RepositoryError::NotFound(value.identifier));
        }
        users.insert(value.identifier.clone(), value.clone());
        Ok(value)
    }

    async fn delete(&self, value: User) -> Result<(), RepositoryError> {
        self.delete_by_id(&value.identifier).await
    }

    async fn delete_by_id(&self, id: &String) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().unwrap();
        users.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ClientAuthenticationMethod, GrantType, ResponseType};

    fn sample_client() -> Client {
        Client {
            id: "demo-client".to_string(),
            name: "Demo".to_string(),
            secret: Some("demo-secret".to_string()),
            authentication_method: ClientAuthenticationMethod::ClientSecretBasic,
            redirection_uris: vec!["http://localhost:3000/callback".to_string()],
            response_types: vec![ResponseType::Code],
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
        }
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let repo = InMemoryClientRepository::new();
        let client = sample_client();
        repo.create(client.clone()).await.unwrap();

        let found = repo.find_by_id(&client.id).await.unwrap().unwrap();
        assert_eq!(found.id, client.id);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let repo = InMemoryClientRepository::new();
        repo.create(sample_client()).await.unwrap();
        assert!(matches!(
            repo.create(sample_client()).await,
            Err(RepositoryError::DuplicateKey(_))
        ));
    }

    #[tokio::test]
    async fn update_missing_user_is_rejected() {
        let repo = InMemoryUserRepository::new();
        let user = User::new("ghost");
        assert!(matches!(
            repo.update(user).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn create_empty_inserts_a_zero_value_entry() {
        let repo = InMemoryUserRepository::new();
        let empty = repo.create_empty().await.unwrap();
        assert_eq!(empty.identifier, "");
        assert!(repo.find_by_id(&String::new()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_removes_by_the_values_own_id() {
        let repo = InMemoryClientRepository::new();
        let client = sample_client();
        repo.create(client.clone()).await.unwrap();

        repo.delete(client.clone()).await.unwrap();
        assert!(repo.find_by_id(&client.id).await.unwrap().is_none());
    }
}
