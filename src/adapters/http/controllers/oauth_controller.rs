//! HTTP adapter for components E and F (SPEC_FULL.md §6): binds query
//! strings and form bodies into the domain request types, dispatches to the
//! use cases, and renders their outcomes as redirects or JSON error bodies.

use axum::{
    extract::{Form, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::adapters::http::app_state::AppState;
use crate::domain::errors::OAuth2Error;
use crate::domain::models::{AuthorizationRequest, ResponseType, TokenRequest};

/// The raw `GET/POST /api/oauth2/v1/authorize` query string. `scope` arrives
/// as the conventional space-separated string, not a repeated-key list.
#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub response_type: String,
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl AuthorizeQuery {
    fn into_domain(self) -> Result<AuthorizationRequest, OAuth2Error> {
        let response_type = match self.response_type.as_str() {
            "code" => ResponseType::Code,
            "token" => ResponseType::Token,
            _ => return Err(OAuth2Error::UnsupportedResponseType),
        };
        let scope = self
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Ok(AuthorizationRequest {
            response_type,
            client_id: self.client_id,
            redirect_uri: self.redirect_uri,
            scope,
            state: self.state,
        })
    }
}

/// `GET/POST /api/oauth2/v1/authorize`: parks the request under a fresh
/// challenge key and redirects the browser to the front-end that drives the
/// WebAuthn ceremony (SPEC_FULL.md §4.E `StartAuthorization`).
pub async fn authorize(State(state): State<AppState>, Query(query): Query<AuthorizeQuery>) -> Response {
    let echo_state = query.state.clone();
    let request = match query.into_domain() {
        Ok(request) => request,
        Err(error) => return oauth_json_error(error, echo_state),
    };

    match state.authorize_use_case.start_authorization(request).await {
        Ok(outcome) => Redirect::to(&format!("/?challenge={}", outcome.challenge)).into_response(),
        Err(err) => oauth_json_error(err.as_oauth2_error(), echo_state),
    }
}

/// The `POST /api/oauth2/v1/token` form body (`application/x-www-form-urlencoded`
/// per RFC 6749 §3.2).
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub grant_type: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl From<TokenForm> for TokenRequest {
    fn from(form: TokenForm) -> Self {
        TokenRequest {
            client_id: form.client_id,
            client_secret: form.client_secret,
            grant_type: form.grant_type,
            scope: form
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            code: form.code,
            redirect_uri: form.redirect_uri,
            refresh_token: form.refresh_token,
        }
    }
}

/// `POST /api/oauth2/v1/token`: authenticates the client, exchanges a code
/// or refresh token, and mints JWTs (SPEC_FULL.md §4.F).
pub async fn token(State(state): State<AppState>, headers: HeaderMap, Form(form): Form<TokenForm>) -> Response {
    let request: TokenRequest = form.into();
    let basic_auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.token_use_case.create_access_token(request, basic_auth_header).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => oauth_json_error(err.as_oauth2_error(), None),
    }
}

/// Renders an OAuth2 protocol error as the JSON body SPEC_FULL.md §6
/// specifies for the case no trustworthy redirect URI is known yet:
/// `{error, error_description, state?}`, with `WWW-Authenticate: Basic` on
/// `invalid_client` per RFC 6749 §5.2.
fn oauth_json_error(error: OAuth2Error, state: Option<String>) -> Response {
    let status = StatusCode::from_u16(error.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut body = json!({
        "error": error.code(),
        "error_description": error.to_string(),
    });
    if let Some(state) = state {
        body["state"] = json!(state);
    }

    let mut response = (status, Json(body)).into_response();
    if matches!(error, OAuth2Error::InvalidClient) {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, header::HeaderValue::from_static("Basic"));
    }
    response
}
