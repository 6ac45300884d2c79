//! HTTP adapter for component D (SPEC_FULL.md §6): the `/init`, `/register`,
//! and `/login` WebAuthn ceremony endpoints. On success these hand off to
//! the OAuth2 layer's `FinishAuthorization` through the `AuthorizationFinisher`
//! port the engine already holds, so the controller itself only ever renders
//! what the engine returns.

use axum::{
    extract::{Json, State},
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};

use crate::adapters::http::app_state::AppState;
use crate::application::app_error::AppError;
use crate::application::use_cases::webauthn_engine::InitOutcome;
use crate::domain::models::{FinishLoginRequest, FinishRegisterRequest};

const NEXT_STEP_HEADER: HeaderName = HeaderName::from_static("next-step");

/// `POST /api/webauthn/v1/init` body: the shared OAuth2/WebAuthn challenge
/// key parked by `StartAuthorization`, plus the user-supplied identifier
/// (email, username, …) that decides register-vs-login.
#[derive(Debug, Deserialize)]
pub struct InitRequest {
    pub challenge: String,
    pub identifier: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum InitResponseBody {
    Register(crate::domain::models::RegisterResponse),
    Login(crate::domain::models::LoginResponse),
}

/// `POST /api/webauthn/v1/init`: begins a registration or login ceremony
/// and tells the caller which one via the `Next-Step` header (SPEC_FULL.md
/// §6).
pub async fn init(State(state): State<AppState>, Json(request): Json<InitRequest>) -> Response {
    match state.webauthn_engine.init(&request.challenge, &request.identifier).await {
        Ok(InitOutcome::Register(response)) => {
            let mut resp = (StatusCode::OK, Json(InitResponseBody::Register(response))).into_response();
            resp.headers_mut()
                .insert(NEXT_STEP_HEADER, "register".parse().unwrap());
            resp
        }
        Ok(InitOutcome::Login(response)) => {
            let mut resp = (StatusCode::OK, Json(InitResponseBody::Login(response))).into_response();
            resp.headers_mut().insert(NEXT_STEP_HEADER, "login".parse().unwrap());
            resp
        }
        Err(err) => app_error_response(err),
    }
}

/// `POST /api/webauthn/v1/register`: finishes the attestation ceremony and,
/// on success, redirects exactly as `FinishAuthorization` (component E)
/// dictates.
pub async fn register(State(state): State<AppState>, Json(request): Json<FinishRegisterRequest>) -> Response {
    match state.webauthn_engine.finish_register(request).await {
        Ok(outcome) => Redirect::to(&outcome.redirect_uri).into_response(),
        Err(err) => app_error_response(err),
    }
}

/// `POST /api/webauthn/v1/login`: finishes the assertion ceremony and, on
/// success, redirects exactly as `FinishAuthorization` dictates.
pub async fn login(State(state): State<AppState>, Json(request): Json<FinishLoginRequest>) -> Response {
    match state.webauthn_engine.finish_login(request).await {
        Ok(outcome) => Redirect::to(&outcome.redirect_uri).into_response(),
        Err(err) => app_error_response(err),
    }
}

/// WebAuthn ceremony failures never ride a redirect (SPEC_FULL.md §7: they
/// are surfaced externally as `invalid_request`) since no client has been
/// resolved yet at this point in the flow.
fn app_error_response(err: AppError) -> Response {
    let oauth_error = err.as_oauth2_error();
    let status = StatusCode::from_u16(oauth_error.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::json!({
        "error": oauth_error.code(),
        "error_description": err.to_string(),
    });
    (status, Json(body)).into_response()
}
