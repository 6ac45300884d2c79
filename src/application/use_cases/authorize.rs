//! Component E: the OAuth2 `/authorize` use case.
//!
//! Grounded in `oauth2/authorize_controller.go`'s `AuthorizeController`:
//! `StartAuthorization` parks the bound request and redirects to the
//! authentication front-end with a `challenge` query param; `FinishAuthorization`
//! (the `AuthorizationFinisher` port, called back by the WebAuthn engine once a
//! ceremony succeeds) resolves the client, validates the redirect URI and
//! response type, and mints either a code or an implicit access token.
//!
//! Two bugs in the original are fixed here rather than carried over
//! (SPEC_FULL.md §9): the implicit grant's `scope` is joined with spaces, not
//! concatenated with no separator, and a `state` is always echoed back onto
//! the failure redirect as well as the success one.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::app_error::AppResult;
use crate::domain::errors::OAuth2Error;
use crate::domain::models::*;
use crate::domain::ports::{AuthorizationFinisher, Cache, JwtService, Repository};

/// Where the front-end sends the browser to begin a ceremony, and the
/// query parameters a failed authorization is rendered with.
pub struct AuthorizeOutcome {
    pub challenge: String,
}

pub struct AuthorizeUseCase {
    client_repo: Arc<dyn Repository<String, Client>>,
    challenge_cache: Arc<dyn Cache<AuthorizationRequest>>,
    code_cache: Arc<dyn Cache<AuthorizationRequest>>,
    access_token_service: Arc<dyn JwtService>,
}

impl AuthorizeUseCase {
    pub fn new(
        client_repo: Arc<dyn Repository<String, Client>>,
        challenge_cache: Arc<dyn Cache<AuthorizationRequest>>,
        code_cache: Arc<dyn Cache<AuthorizationRequest>>,
        access_token_service: Arc<dyn JwtService>,
    ) -> Self {
        Self {
            client_repo,
            challenge_cache,
            code_cache,
            access_token_service,
        }
    }

    /// `GET/POST /api/oauth2/v1/authorize`: parks the request and returns the
    /// challenge key the HTTP adapter redirects the browser to the
    /// authentication front-end with.
    ///
    /// The client and its redirect URI are checked here, not deferred to
    /// `finish_authorization`: an unrecognized `redirect_uri` means no
    /// trustworthy location exists to carry a failure back to, so it has to
    /// surface as a plain JSON error instead of a redirect (SPEC_FULL.md §8,
    /// invariant 5).
    pub async fn start_authorization(&self, request: AuthorizationRequest) -> AppResult<AuthorizeOutcome> {
        let client = self
            .client_repo
            .find_by_id(&request.client_id)
            .await?
            .ok_or(OAuth2Error::UnauthorizedClient)?;

        if let Some(uri) = &request.redirect_uri {
            if !client.allows_redirect_uri(uri) {
                return Err(OAuth2Error::InvalidRequest.into());
            }
        }

        let challenge = self.challenge_cache.set_without_key(request).await?;
        Ok(AuthorizeOutcome { challenge })
    }

    fn append_query(redirect_uri: &str, pairs: &[(&str, &str)]) -> String {
        let mut url = url::Url::parse(redirect_uri).unwrap_or_else(|_| {
            url::Url::parse("http://invalid.invalid").expect("fallback URL always parses")
        });
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key, value);
            }
        }
        url.to_string()
    }

    fn has_state(redirect_uri: &str) -> bool {
        url::Url::parse(redirect_uri)
            .map(|u| u.query_pairs().any(|(k, _)| k == "state"))
            .unwrap_or(false)
    }
}

#[async_trait]
impl AuthorizationFinisher for AuthorizeUseCase {
    /// Called back once a WebAuthn ceremony parked under `challenge` succeeds.
    async fn finish_authorization(&self, challenge: &str) -> Result<RedirectOutcome, OAuth2Error> {
        let request = self
            .challenge_cache
            .get(challenge)
            .await
            .map_err(|_| OAuth2Error::ServerError)?
            .ok_or(OAuth2Error::InvalidRequest)?;

        let client = self
            .client_repo
            .find_by_id(&request.client_id)
            .await
            .map_err(|_| OAuth2Error::ServerError)?
            .ok_or(OAuth2Error::UnauthorizedClient)?;

        let redirect_uri = match &request.redirect_uri {
            Some(uri) if client.allows_redirect_uri(uri) => uri.clone(),
            Some(_) => return Err(OAuth2Error::InvalidRequest),
            None => client
                .redirection_uris
                .first()
                .cloned()
                .ok_or(OAuth2Error::InvalidRequest)?,
        };

        let mut state_pair: Vec<(&str, &str)> = Vec::new();
        if let Some(state) = &request.state {
            if !Self::has_state(&redirect_uri) {
                state_pair.push(("state", state.as_str()));
            }
        }

        if !client.allows_response_type(request.response_type) {
            let mut pairs = vec![("error", OAuth2Error::InvalidRequest.code())];
            pairs.extend(state_pair);
            return Ok(RedirectOutcome {
                redirect_uri: Self::append_query(&redirect_uri, &pairs),
            });
        }

        let final_uri = match request.response_type {
            ResponseType::Code => {
                // Persist the *resolved* redirect_uri, not the possibly-absent
                // one on the original request: the token endpoint's
                // cross-check (§9) compares against whatever URI the client
                // actually used, defaulted or not.
                let mut parked = request.clone();
                parked.redirect_uri = Some(redirect_uri.clone());
                let code = self
                    .code_cache
                    .set_without_key(parked)
                    .await
                    .map_err(|_| OAuth2Error::ServerError)?;
                let mut pairs = vec![("code", code.as_str())];
                pairs.extend(state_pair);
                Self::append_query(&redirect_uri, &pairs)
            }
            ResponseType::Token => {
                let access_token = self
                    .access_token_service
                    .create(serde_json::Map::new())
                    .await?;
                let scope = request.scope.join(" ");
                let expires_in = (60 * 60).to_string();
                let mut pairs = vec![
                    ("access_token", access_token.as_str()),
                    ("token_type", "Bearer"),
                    ("expires_in", expires_in.as_str()),
                    ("scope", scope.as_str()),
                ];
                pairs.extend(state_pair);
                Self::append_query(&redirect_uri, &pairs)
            }
        };

        Ok(RedirectOutcome {
            redirect_uri: final_uri,
        })
    }
}
