//! End-to-end HTTP tests driving the router directly with `tower::ServiceExt::oneshot`,
//! exercising the scenarios SPEC_FULL.md §8 names (S1/S2/S6) plus the origin
//! and grant-type edge cases at the boundary where the controllers, use
//! cases, and codecs all have to agree on the wire format.

use axum::{
    body::{to_bytes, Body},
    http::{header, request::Builder, Request, StatusCode},
};
use base64::Engine;
use ciborium::value::Value as CborValue;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use serde_json::{json, Value as JsonValue};
use sha2::{Digest, Sha256};
use tower::ServiceExt;

use auth_service::adapters::http::router::api_router;
use auth_service::domain::models::{AttestationResponse, FinishRegisterRequest};
use auth_service::infra::setup::init_app_state;

const SEED_CLIENT_ID: &str = "demo-client";
const SEED_CLIENT_SECRET: &str = "demo-secret";
const SEED_REDIRECT_URI: &str = "http://localhost:3000/callback";
const RP_ID: &str = "localhost";
const RP_ORIGIN: &str = "http://localhost:3000";

async fn app() -> axum::Router {
    let state = init_app_state().await.expect("app state initializes");
    api_router(state)
}

/// A request builder that always carries an `X-Forwarded-For` header. The
/// rate limiter trusts forwarded-for headers (SPEC_FULL.md ambient stack),
/// which means it needs one to key by even in a `oneshot` test harness with
/// no real peer address.
fn request(method: &str, uri: impl AsRef<str>) -> Builder {
    Request::builder()
        .method(method)
        .uri(uri.as_ref())
        .header("x-forwarded-for", "127.0.0.1")
}

fn basic_auth(client_id: &str, secret: &str) -> String {
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!("{client_id}:{secret}"))
    )
}

fn query_param(uri: &str, key: &str) -> Option<String> {
    let query = uri.split('?').nth(1)?;
    query.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        let k = parts.next()?;
        let v = parts.next().unwrap_or("");
        (k == key).then(|| v.to_string())
    })
}

async fn body_json(response: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Builds a self-signed "packed" attestation for a fresh Ed25519 credential,
/// keyed to `challenge`, exactly as `navigator.credentials.create()` would
/// hand back to a front-end (SPEC_FULL.md §4.C/§4.D).
fn build_attestation(challenge: &str) -> FinishRegisterRequest {
    let mut csprng = OsRng;
    let signing_key = SigningKey::generate(&mut csprng);
    let credential_id = vec![1u8, 2, 3, 4];

    let rp_id_hash: [u8; 32] = Sha256::digest(RP_ID.as_bytes()).into();

    let cose_key = CborValue::Map(vec![
        (CborValue::Integer(1.into()), CborValue::Integer(1.into())), // kty=OKP
        (CborValue::Integer(3.into()), CborValue::Integer((-8).into())), // alg=EdDSA
        (CborValue::Integer((-1).into()), CborValue::Integer(6.into())), // crv=Ed25519
        (
            CborValue::Integer((-2).into()),
            CborValue::Bytes(signing_key.verifying_key().to_bytes().to_vec()),
        ),
    ]);
    let mut cose_key_bytes = Vec::new();
    ciborium::ser::into_writer(&cose_key, &mut cose_key_bytes).unwrap();

    let mut auth_data = Vec::new();
    auth_data.extend_from_slice(&rp_id_hash);
    auth_data.push(0x01 | 0x40); // user present, attested credential data
    auth_data.extend_from_slice(&0u32.to_be_bytes()); // signature counter
    auth_data.extend_from_slice(&[0u8; 16]); // aaguid
    auth_data.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
    auth_data.extend_from_slice(&credential_id);
    auth_data.extend_from_slice(&cose_key_bytes);

    let challenge_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(challenge.as_bytes());
    let client_data_json = serde_json::to_vec(&json!({
        "type": "webauthn.create",
        "challenge": challenge_b64,
        "origin": RP_ORIGIN,
    }))
    .unwrap();
    let client_data_hash: [u8; 32] = Sha256::digest(&client_data_json).into();

    let mut signed_message = auth_data.clone();
    signed_message.extend_from_slice(&client_data_hash);
    let signature = signing_key.sign(&signed_message).to_bytes().to_vec();

    let att_stmt = CborValue::Map(vec![
        (CborValue::Text("alg".to_string()), CborValue::Integer((-8).into())),
        (CborValue::Text("sig".to_string()), CborValue::Bytes(signature)),
    ]);
    let attestation_object = CborValue::Map(vec![
        (CborValue::Text("fmt".to_string()), CborValue::Text("packed".to_string())),
        (CborValue::Text("authData".to_string()), CborValue::Bytes(auth_data)),
        (CborValue::Text("attStmt".to_string()), att_stmt),
    ]);
    let mut attestation_object_bytes = Vec::new();
    ciborium::ser::into_writer(&attestation_object, &mut attestation_object_bytes).unwrap();

    FinishRegisterRequest {
        id: credential_id.clone(),
        raw_id: credential_id,
        response: AttestationResponse {
            client_data_json,
            attestation_object: attestation_object_bytes,
        },
    }
}

#[tokio::test]
async fn authorize_redirects_with_a_fresh_challenge() {
    let app = app().await;
    let response = app
        .oneshot(
            request(
                "GET",
                format!("/api/oauth2/v1/authorize?response_type=code&client_id={SEED_CLIENT_ID}&state=xyz"),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(query_param(&location, "challenge").is_some());
}

#[tokio::test]
async fn authorize_rejects_an_unregistered_redirect_uri_without_redirecting() {
    let app = app().await;
    let response = app
        .oneshot(
            request(
                "GET",
                format!(
                    "/api/oauth2/v1/authorize?response_type=code&client_id={SEED_CLIENT_ID}&redirect_uri=http://evil.example/x&state=xyz"
                ),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn authorize_rejects_an_unregistered_client() {
    let app = app().await;
    let response = app
        .oneshot(
            request("GET", "/api/oauth2/v1/authorize?response_type=code&client_id=ghost-client")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthorized_client");
}

#[tokio::test]
async fn token_endpoint_rejects_password_grant() {
    let app = app().await;
    let response = app
        .oneshot(
            request("POST", "/api/oauth2/v1/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::AUTHORIZATION, basic_auth(SEED_CLIENT_ID, SEED_CLIENT_SECRET))
                .body(Body::from("grant_type=password&username=alice&password=hunter2"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "unsupported_grant_type");
}

#[tokio::test]
async fn webauthn_init_begins_registration_for_a_new_identifier() {
    let app = app().await;
    let authorize_response = app
        .clone()
        .oneshot(
            request(
                "GET",
                format!("/api/oauth2/v1/authorize?response_type=code&client_id={SEED_CLIENT_ID}"),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    let location = authorize_response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let challenge = query_param(&location, "challenge").unwrap();

    let init_response = app
        .oneshot(
            request("POST", "/api/webauthn/v1/init")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({"challenge": challenge, "identifier": "brand-new-user"})).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(init_response.status(), StatusCode::OK);
    assert_eq!(
        init_response.headers().get("next-step").and_then(|v| v.to_str().ok()),
        Some("register")
    );
    let body = body_json(init_response).await;
    assert_eq!(body["challenge"], challenge);
    assert_eq!(body["user"]["id"], "brand-new-user");
}

/// SPEC_FULL.md §8, scenario S1: authorize, register a brand-new passkey
/// against the parked challenge, and redeem the resulting code for tokens.
#[tokio::test]
async fn code_flow_happy_path_register_then_exchange_for_tokens() {
    let app = app().await;

    let authorize_response = app
        .clone()
        .oneshot(
            request(
                "GET",
                format!("/api/oauth2/v1/authorize?response_type=code&client_id={SEED_CLIENT_ID}&state=xyz"),
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();
    assert!(authorize_response.status().is_redirection());
    let location = authorize_response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let challenge = query_param(&location, "challenge").unwrap();

    let init_response = app
        .clone()
        .oneshot(
            request("POST", "/api/webauthn/v1/init")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({"challenge": challenge, "identifier": "s1-user"})).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(init_response.status(), StatusCode::OK);

    let finish_request = build_attestation(&challenge);
    let register_response = app
        .clone()
        .oneshot(
            request("POST", "/api/webauthn/v1/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&finish_request).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(register_response.status().is_redirection());
    let redirect_location = register_response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(redirect_location.starts_with(SEED_REDIRECT_URI));
    assert_eq!(query_param(&redirect_location, "state").as_deref(), Some("xyz"));
    let code = query_param(&redirect_location, "code").expect("a code was issued");

    let token_response = app
        .oneshot(
            request("POST", "/api/oauth2/v1/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::AUTHORIZATION, basic_auth(SEED_CLIENT_ID, SEED_CLIENT_SECRET))
                .body(Body::from(format!(
                    "grant_type=authorization_code&code={code}&redirect_uri={SEED_REDIRECT_URI}"
                )))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(token_response.status(), StatusCode::OK);
    let body = body_json(token_response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    assert_eq!(body["state"], "xyz");
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
}
