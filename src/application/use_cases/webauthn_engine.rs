//! Component D: the WebAuthn ceremony engine.
//!
//! Generalizes the teacher's `PasskeyService` (constructor-injected
//! repository + challenge store + verifier, start/finish pairs for
//! registration and authentication) to the spec's single combined `init`
//! endpoint plus separate `register`/`login` finish endpoints — the shape
//! confirmed by `server/webauthn/authentication_controller.go`'s
//! `Authenticate`/`Register`/`Login` trio in the original implementation.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::application::app_error::{AppError, AppResult};
use crate::cose;
use crate::domain::errors::{CodecError, WebAuthnProtocolError};
use crate::domain::models::*;
use crate::domain::ports::{AuthorizationFinisher, Cache, Repository};
use crate::webauthn_codec::AttestationObject;

fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[derive(Debug, Clone)]
pub enum InitOutcome {
    Register(RegisterResponse),
    Login(LoginResponse),
}

pub struct WebAuthnEngine {
    user_repo: Arc<dyn Repository<String, User>>,
    register_cache: Arc<dyn Cache<RegisterResponse>>,
    login_cache: Arc<dyn Cache<LoginResponse>>,
    finisher: Arc<dyn AuthorizationFinisher>,
    rp: RelyingParty,
    credential_params: Vec<PubKeyCredParam>,
}

impl WebAuthnEngine {
    pub fn new(
        user_repo: Arc<dyn Repository<String, User>>,
        register_cache: Arc<dyn Cache<RegisterResponse>>,
        login_cache: Arc<dyn Cache<LoginResponse>>,
        finisher: Arc<dyn AuthorizationFinisher>,
        rp: RelyingParty,
    ) -> Self {
        Self {
            user_repo,
            register_cache,
            login_cache,
            finisher,
            rp,
            credential_params: default_credential_params(),
        }
    }

    /// `POST /api/webauthn/v1/init`: by identifier, begins either a
    /// registration or a login ceremony under the same challenge key the
    /// OAuth2 authorize flow parked the pending `AuthorizationRequest` at.
    pub async fn init(&self, challenge: &str, identifier: &str) -> AppResult<InitOutcome> {
        let existing = self.user_repo.find_by_id(&identifier.to_string()).await?;

        match existing {
            Some(user) => {
                let response = LoginResponse {
                    challenge: challenge.to_string(),
                    rp_id: self.rp.id.clone(),
                    allow_credentials: user
                        .credentials
                        .iter()
                        .map(|c| AllowCredential {
                            id: c.id.clone(),
                            credential_type: c.credential_type.clone(),
                            transports: c.transports.clone(),
                        })
                        .collect(),
                    timeout: 60_000,
                };
                self.login_cache.set(challenge, response.clone()).await?;
                Ok(InitOutcome::Login(response))
            }
            None => {
                let response = RegisterResponse {
                    challenge: challenge.to_string(),
                    rp: self.rp.clone(),
                    user: PublicKeyUser {
                        id: identifier.to_string(),
                        name: identifier.to_string(),
                        display_name: identifier.to_string(),
                    },
                    pub_key_cred_params: self.credential_params.clone(),
                    authenticator_selection: AuthenticatorSelection {
                        authenticator_attachment: None,
                    },
                    timeout: 60_000,
                    attestation: "direct".to_string(),
                };
                self.register_cache.set(challenge, response.clone()).await?;
                Ok(InitOutcome::Register(response))
            }
        }
    }

    /// `POST /api/webauthn/v1/register`: verifies the attestation, creates
    /// the user with its first credential, and hands the challenge key back
    /// to the OAuth2 layer to finish the parked authorization. The challenge
    /// key isn't carried anywhere else in the request — per SPEC_FULL.md
    /// §4.D step 1, it's recovered by base64url-decoding `clientData.challenge`,
    /// whose bytes are the ASCII of the key `begin_register` parked under.
    pub async fn finish_register(
        &self,
        request: FinishRegisterRequest,
    ) -> AppResult<RedirectOutcome> {
        let client_data: ClientData = serde_json::from_slice(&request.response.client_data_json)
            .map_err(|e| CodecError::JsonMalformed(e.to_string()))?;
        let challenge = decode_challenge(&client_data.challenge)?;

        let pending = self
            .register_cache
            .get(&challenge)
            .await?
            .ok_or(WebAuthnProtocolError::NoValidChallenge)?;

        if client_data.client_data_type != "webauthn.create" {
            return Err(WebAuthnProtocolError::WrongClientDataType.into());
        }
        if pending.challenge != challenge {
            return Err(WebAuthnProtocolError::NoValidChallenge.into());
        }
        if !client_data.origin.contains(&self.rp.id) {
            return Err(WebAuthnProtocolError::OriginNotAllowed.into());
        }

        let attestation = AttestationObject::unmarshal(&request.response.attestation_object)?;
        let rp_id_hash = sha256(self.rp.id.as_bytes());
        attestation
            .auth_data
            .verify(&rp_id_hash, false)
            .map_err(|_| WebAuthnProtocolError::UserNotPresent)?;

        let attested = attestation
            .auth_data
            .attested_credential_data
            .clone()
            .ok_or(WebAuthnProtocolError::UnknownCredential)?;

        // "packed" self-attestation: the statement signs over the same data
        // as a later assertion, using the credential's own key. No x5c trust
        // chain is checked — attestation trust is out of scope. Unconditional:
        // `AttestationObject::unmarshal` already rejects any fmt other than
        // "packed" and requires alg/sig, so this never has a branch to skip.
        if attestation.att_stmt_alg != attested.public_key.alg() {
            return Err(WebAuthnProtocolError::AlgorithmMismatch.into());
        }
        let client_data_hash = sha256(&request.response.client_data_json);
        let mut message = attestation.auth_data_raw.clone();
        message.extend_from_slice(&client_data_hash);
        if !cose::verify(&attested.public_key, &message, &attestation.att_stmt_signature)? {
            return Err(WebAuthnProtocolError::SignatureInvalid.into());
        }

        self.register_cache.delete(&challenge).await?;

        let mut user = User::new(pending.user.id.clone());
        user.credentials.push(Credential::new(attested.credential_id, attested.public_key));
        self.user_repo.create(user).await?;

        self.finisher
            .finish_authorization(&challenge)
            .await
            .map_err(AppError::from)
    }

    /// `POST /api/webauthn/v1/login`: verifies the assertion against the
    /// stored credential and hands the challenge key back to the OAuth2
    /// layer to finish the parked authorization. As in `finish_register`,
    /// the challenge key is recovered from `clientData.challenge`, not
    /// carried separately in the request.
    pub async fn finish_login(&self, request: FinishLoginRequest) -> AppResult<RedirectOutcome> {
        let client_data: ClientData = serde_json::from_slice(&request.response.client_data_json)
            .map_err(|e| CodecError::JsonMalformed(e.to_string()))?;
        let challenge = decode_challenge(&client_data.challenge)?;

        let pending = self
            .login_cache
            .get(&challenge)
            .await?
            .ok_or(WebAuthnProtocolError::NoValidChallenge)?;

        let user = self
            .user_repo
            .find_by_id(&request.response.user_handle)
            .await?
            .ok_or(WebAuthnProtocolError::UnknownCredential)?;
        let credential = user
            .find_credential(&request.raw_id)
            .ok_or(WebAuthnProtocolError::UnknownCredential)?
            .clone();

        if client_data.client_data_type != "webauthn.get" {
            return Err(WebAuthnProtocolError::WrongClientDataType.into());
        }
        if pending.challenge != challenge {
            return Err(WebAuthnProtocolError::NoValidChallenge.into());
        }
        if !client_data.origin.contains(&self.rp.id) {
            return Err(WebAuthnProtocolError::OriginNotAllowed.into());
        }

        let auth_data = crate::webauthn_codec::AuthenticatorData::unmarshal(&request.response.authenticator_data)?;
        let rp_id_hash = sha256(self.rp.id.as_bytes());
        auth_data
            .verify(&rp_id_hash, false)
            .map_err(|_| WebAuthnProtocolError::UserNotPresent)?;

        let client_data_hash = sha256(&request.response.client_data_json);
        let mut message = request.response.authenticator_data.clone();
        message.extend_from_slice(&client_data_hash);
        if !cose::verify(&credential.public_key, &message, &request.response.signature)? {
            return Err(WebAuthnProtocolError::SignatureInvalid.into());
        }

        self.login_cache.delete(&challenge).await?;

        self.finisher
            .finish_authorization(&challenge)
            .await
            .map_err(AppError::from)
    }
}

/// Recovers the challenge-store key from `clientData.challenge`: per
/// SPEC_FULL.md §3/§4.D, browsers base64url-encode the ASCII bytes of
/// whatever challenge string this server handed them, rather than raw
/// binary entropy, so decoding yields the key text directly.
fn decode_challenge(encoded: &str) -> Result<String, CodecError> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CodecError::Base64Malformed(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CodecError::Base64Malformed(e.to_string()))
}

fn default_credential_params() -> Vec<PubKeyCredParam> {
    [ALG_ES256, ALG_EDDSA, ALG_RS256]
        .into_iter()
        .map(|alg| PubKeyCredParam {
            credential_type: "public-key".to_string(),
            alg,
        })
        .collect()
}
