use std::sync::Arc;

use crate::application::use_cases::authorize::AuthorizeUseCase;
use crate::application::use_cases::token::TokenUseCase;
use crate::application::use_cases::webauthn_engine::WebAuthnEngine;
use crate::infra::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub authorize_use_case: Arc<AuthorizeUseCase>,
    pub token_use_case: Arc<TokenUseCase>,
    pub webauthn_engine: Arc<WebAuthnEngine>,
}
