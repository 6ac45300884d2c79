use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::http::app_state::AppState;
use crate::application::use_cases::authorize::AuthorizeUseCase;
use crate::application::use_cases::token::TokenUseCase;
use crate::application::use_cases::webauthn_engine::WebAuthnEngine;
use crate::domain::models::{Client, ClientAuthenticationMethod, GrantType, ResponseType};
use crate::domain::ports::AuthorizationFinisher;
use crate::infra::challenge_store::{AuthorizationCache, LoginCache, MemoryChallengeRecordStore, RegisterCache};
use crate::infra::config::AppConfig;
use crate::infra::jwt::{HmacJwtService, RsaJwtService};
use crate::infra::repositories::mock::{InMemoryClientRepository, InMemoryUserRepository};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    // Persistence (in-memory; SPEC_FULL.md treats storage as an abstract
    // external collaborator rather than core scope).
    let client_repo = Arc::new(InMemoryClientRepository::new());
    let user_repo = Arc::new(InMemoryUserRepository::new());

    client_repo
        .create(Client {
            id: config.seed_client_id.clone(),
            name: "Demo Client".to_string(),
            secret: Some(config.seed_client_secret.clone()),
            authentication_method: ClientAuthenticationMethod::ClientSecretBasic,
            redirection_uris: vec![config.seed_redirect_uri.clone()],
            response_types: vec![ResponseType::Code, ResponseType::Token],
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
        })
        .await?;

    // One shared backing store for the authorize/register/login projections
    // of a challenge record (server/webauthn/authentication_controller.go
    // looks up the same key across all three), and a separate, shorter-lived
    // store for single-use authorization codes.
    let challenge_store = Arc::new(MemoryChallengeRecordStore::challenges());
    let code_store = Arc::new(MemoryChallengeRecordStore::codes());

    let authorization_cache = Arc::new(AuthorizationCache::new(challenge_store.clone()));
    let register_cache = Arc::new(RegisterCache::new(challenge_store.clone()));
    let login_cache = Arc::new(LoginCache::new(challenge_store.clone()));
    let code_cache = Arc::new(AuthorizationCache::new(code_store));

    let access_token_service = Arc::new(RsaJwtService::generate()?);
    let refresh_token_service = Arc::new(HmacJwtService::generate());

    let authorize_use_case = Arc::new(AuthorizeUseCase::new(
        client_repo.clone(),
        authorization_cache,
        code_cache.clone(),
        access_token_service.clone(),
    ));

    let finisher: Arc<dyn AuthorizationFinisher> = authorize_use_case.clone();

    let webauthn_engine = Arc::new(WebAuthnEngine::new(
        user_repo,
        register_cache,
        login_cache,
        finisher,
        crate::domain::models::RelyingParty {
            id: config.rp_id.clone(),
            name: config.rp_name.clone(),
        },
    ));

    let token_use_case = Arc::new(TokenUseCase::new(
        client_repo,
        code_cache,
        access_token_service,
        refresh_token_service,
    ));

    Ok(AppState {
        config: Arc::new(config),
        authorize_use_case,
        token_use_case,
        webauthn_engine,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "auth_service=debug,tower_http=debug,axum=debug".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .pretty()
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(false)
                .with_target(true),
        )
        .init();
}
