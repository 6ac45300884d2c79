use axum::{
    routing::post,
    Router,
};
use crate::adapters::http::app_state::AppState;
use crate::adapters::http::controllers::{oauth_controller, webauthn_controller};
use crate::adapters::http::security::apply_security_layers;

/// SPEC_FULL.md §6's core-owned HTTP surface: the OAuth2 authorize/token
/// pair and the WebAuthn init/register/login trio. `/authorize` is routed
/// on both methods since the spec table lists `GET, POST`.
pub fn api_router(state: AppState) -> Router {
    let oauth_routes = Router::new()
        .route(
            "/authorize",
            axum::routing::get(oauth_controller::authorize).post(oauth_controller::authorize),
        )
        .route("/token", post(oauth_controller::token));

    let webauthn_routes = Router::new()
        .route("/init", post(webauthn_controller::init))
        .route("/register", post(webauthn_controller::register))
        .route("/login", post(webauthn_controller::login));

    let rp_origin = state.config.rp_origin.clone();

    let api = Router::new()
        .nest("/api/oauth2/v1", oauth_routes)
        .nest("/api/webauthn/v1", webauthn_routes)
        .with_state(state);

    apply_security_layers(api, &rp_origin)
}
