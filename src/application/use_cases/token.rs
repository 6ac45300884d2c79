//! Component F: the OAuth2 `/token` use case.
//!
//! Grounded in `oauth2/token_controller.go`'s `TokenController`. Three bugs
//! in the original are fixed rather than carried over (SPEC_FULL.md §9):
//! the authorization code's `redirect_uri` is cross-checked against the one
//! presented here (the original left this commented out), refresh tokens are
//! actually verified before being honored (the original left two `TODO`s
//! where this check belonged), and client secrets are compared in constant
//! time rather than with `==`.

use std::sync::Arc;

use base64::Engine;
use subtle::ConstantTimeEq;

use crate::application::app_error::{AppError, AppResult};
use crate::domain::errors::OAuth2Error;
use crate::domain::models::*;
use crate::domain::ports::{Cache, JwtService, Repository};

pub struct TokenUseCase {
    client_repo: Arc<dyn Repository<String, Client>>,
    code_cache: Arc<dyn Cache<AuthorizationRequest>>,
    access_token_service: Arc<dyn JwtService>,
    refresh_token_service: Arc<dyn JwtService>,
}

impl TokenUseCase {
    pub fn new(
        client_repo: Arc<dyn Repository<String, Client>>,
        code_cache: Arc<dyn Cache<AuthorizationRequest>>,
        access_token_service: Arc<dyn JwtService>,
        refresh_token_service: Arc<dyn JwtService>,
    ) -> Self {
        Self {
            client_repo,
            code_cache,
            access_token_service,
            refresh_token_service,
        }
    }

    /// `POST /api/oauth2/v1/token`. `basic_auth_header` is the raw
    /// `Authorization` header value, if present, for `client_secret_basic`.
    pub async fn create_access_token(
        &self,
        request: TokenRequest,
        basic_auth_header: Option<&str>,
    ) -> AppResult<TokenResponse> {
        let client = self.authenticate(&request, basic_auth_header).await?;

        // "password" is parsed only far enough to be recognized and rejected;
        // this server never honors it for any client (SPEC_FULL.md §8, S6),
        // so it must not fall through to the unauthorized_client branch below.
        let grant_type = match request.grant_type.as_str() {
            "authorization_code" => GrantType::AuthorizationCode,
            "refresh_token" => GrantType::RefreshToken,
            _ => return Err(AppError::OAuth2(OAuth2Error::UnsupportedGrantType)),
        };

        if !client.allows_grant_type(grant_type) {
            return Err(AppError::OAuth2(OAuth2Error::UnauthorizedClient));
        }

        let mut state = None;

        match grant_type {
            GrantType::AuthorizationCode => {
                let code = request.code.as_deref().ok_or(OAuth2Error::InvalidRequest)?;
                let authorization = self
                    .code_cache
                    .get(code)
                    .await?
                    .ok_or(OAuth2Error::InvalidGrant)?;
                // Single-use: the code is consumed whether or not the rest of
                // this request turns out to be valid.
                self.code_cache.delete(code).await?;

                if authorization.client_id != client.id {
                    return Err(AppError::OAuth2(OAuth2Error::InvalidGrant));
                }

                let presented_redirect_uri = request.redirect_uri.as_deref();
                if authorization.redirect_uri.as_deref() != presented_redirect_uri {
                    return Err(AppError::OAuth2(OAuth2Error::InvalidGrant));
                }

                state = authorization.state;
            }
            GrantType::RefreshToken => {
                let refresh_token = request.refresh_token.as_deref().ok_or(OAuth2Error::InvalidRequest)?;
                let claims = self.refresh_token_service.verify(refresh_token)?;
                let issued_to = claims
                    .get("client_id")
                    .and_then(|v| v.as_str())
                    .ok_or(OAuth2Error::InvalidGrant)?;
                if issued_to != client.id {
                    return Err(AppError::OAuth2(OAuth2Error::InvalidGrant));
                }
            }
            GrantType::Password => unreachable!("rejected before grant_type dispatch"),
        }

        // Access JWT is minted over empty claims (SPEC_FULL.md §6/§9): nothing
        // names enriching it with `client_id` or anything else in scope. Only
        // the refresh token, whose grant depends on recovering the issuing
        // client, carries a claim.
        let access_token = self.access_token_service.create(serde_json::Map::new()).await?;

        let refresh_token = if grant_type != GrantType::RefreshToken {
            let mut refresh_claims = serde_json::Map::new();
            refresh_claims.insert("client_id".to_string(), serde_json::Value::String(client.id.clone()));
            Some(self.refresh_token_service.create(refresh_claims).await?)
        } else {
            None
        };

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: 60 * 60,
            scope: request.scope,
            state,
        })
    }

    /// Mirrors `oauth2/token_controller.go`'s `authenticate`: the client is
    /// resolved by id first — from the form, falling back to the `Basic`
    /// header's embedded id when the form carries none — then dispatched
    /// strictly on *that client's configured* `authentication_method`, never
    /// on which credentials happened to be present on the wire. A `Basic`
    /// header is only consulted for `client_secret_basic`; every other
    /// method (including `client_secret_post`, unsupported by the original)
    /// is rejected.
    async fn authenticate(&self, request: &TokenRequest, basic_auth_header: Option<&str>) -> AppResult<Client> {
        let basic = basic_auth_header.map(Self::parse_basic_auth).transpose()?;

        if let (Some(form_id), Some((basic_id, _))) = (&request.client_id, &basic) {
            if form_id != basic_id {
                return Err(AppError::OAuth2(OAuth2Error::InvalidClient));
            }
        }

        let client_id = request
            .client_id
            .clone()
            .or_else(|| basic.as_ref().map(|(id, _)| id.clone()))
            .ok_or(OAuth2Error::InvalidClient)?;

        let client = self.client_repo.find_by_id(&client_id).await?.ok_or(OAuth2Error::InvalidClient)?;

        match client.authentication_method {
            ClientAuthenticationMethod::None => Ok(client),
            ClientAuthenticationMethod::ClientSecretBasic => {
                let (_, basic_secret) = basic.ok_or(OAuth2Error::InvalidClient)?;
                let expected = client.secret.as_deref().unwrap_or("");
                if expected.as_bytes().ct_eq(basic_secret.as_bytes()).unwrap_u8() != 1 {
                    return Err(AppError::OAuth2(OAuth2Error::InvalidClient));
                }
                Ok(client)
            }
            ClientAuthenticationMethod::ClientSecretPost => Err(AppError::OAuth2(OAuth2Error::InvalidClient)),
        }
    }

    fn parse_basic_auth(header: &str) -> AppResult<(String, String)> {
        let encoded = header
            .strip_prefix("Basic ")
            .ok_or(OAuth2Error::InvalidClient)?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| OAuth2Error::InvalidClient)?;
        let decoded = String::from_utf8(decoded).map_err(|_| OAuth2Error::InvalidClient)?;
        let mut parts = decoded.splitn(2, ':');
        let id = parts.next().ok_or(OAuth2Error::InvalidClient)?.to_string();
        let secret = parts.next().ok_or(OAuth2Error::InvalidClient)?.to_string();
        Ok((id, secret))
    }
}
