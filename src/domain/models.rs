use serde::{Deserialize, Serialize};

/// A COSE algorithm identifier, IANA-registered (e.g. -7 for ES256).
pub type CoseAlgorithmId = i64;

pub const ALG_ES256: CoseAlgorithmId = -7;
pub const ALG_EDDSA: CoseAlgorithmId = -8;
pub const ALG_ES384: CoseAlgorithmId = -35;
pub const ALG_ES512: CoseAlgorithmId = -36;
pub const ALG_PS256: CoseAlgorithmId = -37;
pub const ALG_PS384: CoseAlgorithmId = -38;
pub const ALG_PS512: CoseAlgorithmId = -39;
pub const ALG_RS256: CoseAlgorithmId = -257;
pub const ALG_RS384: CoseAlgorithmId = -258;
pub const ALG_RS512: CoseAlgorithmId = -259;
pub const ALG_RS1: CoseAlgorithmId = -65535;

/// A decoded COSE_Key, tagged by `kty`. See SPEC_FULL.md §4.B / §9: a tagged
/// sum with one `verify` operation, not a virtual-dispatch hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kty")]
pub enum CoseKey {
    /// kty=1, Octet Key Pair (Ed25519 only).
    Okp { alg: CoseAlgorithmId, crv: i64, x: Vec<u8> },
    /// kty=2, Elliptic Curve (P-256/384/521).
    Ec2 {
        alg: CoseAlgorithmId,
        crv: i64,
        x: Vec<u8>,
        y: Vec<u8>,
    },
    /// kty=3, RSA. `e` is the big-endian exponent (3 bytes in practice).
    Rsa {
        alg: CoseAlgorithmId,
        n: Vec<u8>,
        e: Vec<u8>,
    },
}

impl CoseKey {
    pub fn alg(&self) -> CoseAlgorithmId {
        match self {
            CoseKey::Okp { alg, .. } => *alg,
            CoseKey::Ec2 { alg, .. } => *alg,
            CoseKey::Rsa { alg, .. } => *alg,
        }
    }
}

/// A registered WebAuthn credential, owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    #[serde(with = "crate::domain::base64_bytes")]
    pub id: Vec<u8>,
    pub public_key: CoseKey,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub transports: Vec<String>,
}

impl Credential {
    pub fn new(id: Vec<u8>, public_key: CoseKey) -> Self {
        Self {
            id,
            public_key,
            credential_type: "public-key".to_string(),
            transports: vec!["platform".to_string()],
        }
    }
}

/// A registered user, identified by an external handle unique across the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub identifier: String,
    pub credentials: Vec<Credential>,
}

impl User {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            credentials: Vec::new(),
        }
    }

    pub fn find_credential(&self, id: &[u8]) -> Option<&Credential> {
        self.credentials.iter().find(|c| c.id == id)
    }
}

/// How a registered OAuth2 client proves its identity at the token endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthenticationMethod {
    ClientSecretBasic,
    ClientSecretPost,
    None,
}

/// The `response_type` values this server recognizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Code,
    Token,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Code => "code",
            ResponseType::Token => "token",
        }
    }
}

/// The `grant_type` values this server recognizes at the token endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
    Password,
}

/// A registered OAuth2 client. Seeded at boot; read-only at steady state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub secret: Option<String>,
    pub authentication_method: ClientAuthenticationMethod,
    pub redirection_uris: Vec<String>,
    pub response_types: Vec<ResponseType>,
    pub grant_types: Vec<GrantType>,
}

impl Client {
    pub fn allows_response_type(&self, rt: ResponseType) -> bool {
        self.response_types.contains(&rt)
    }

    pub fn allows_grant_type(&self, gt: GrantType) -> bool {
        self.grant_types.contains(&gt)
    }

    pub fn allows_redirect_uri(&self, uri: &str) -> bool {
        self.redirection_uris.iter().any(|u| u == uri)
    }
}

/// Bound from the query string of `GET/POST /api/oauth2/v1/authorize`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub response_type: ResponseType,
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Outcome of a successful `FinishAuthorization` call, rendered by the HTTP
/// adapter as a 302 redirect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedirectOutcome {
    pub redirect_uri: String,
}

/// Public-key credential creation options returned by `begin_register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterResponse {
    pub challenge: String,
    pub rp: RelyingParty,
    pub user: PublicKeyUser,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    pub authenticator_selection: AuthenticatorSelection,
    pub timeout: u32,
    pub attestation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelyingParty {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicKeyUser {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub alg: CoseAlgorithmId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthenticatorSelection {
    pub authenticator_attachment: Option<String>,
}

/// Public-key credential request options returned by `begin_login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub challenge: String,
    pub rp_id: String,
    pub allow_credentials: Vec<AllowCredential>,
    pub timeout: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowCredential {
    #[serde(with = "crate::domain::base64_bytes")]
    pub id: Vec<u8>,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub transports: Vec<String>,
}

/// The browser-assembled client data JSON, parsed per SPEC_FULL.md §3.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientData {
    #[serde(rename = "type")]
    pub client_data_type: String,
    pub challenge: String,
    pub origin: String,
}

/// The body of `POST /api/webauthn/v1/register`. Every byte field rides the
/// wire as base64url text, exactly as `navigator.credentials.create()`'s
/// `ArrayBuffer`s are serialized by a front-end before a `fetch()` POST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishRegisterRequest {
    #[serde(with = "crate::domain::base64_bytes")]
    pub id: Vec<u8>,
    #[serde(with = "crate::domain::base64_bytes")]
    pub raw_id: Vec<u8>,
    pub response: AttestationResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationResponse {
    #[serde(with = "crate::domain::base64_bytes")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "crate::domain::base64_bytes")]
    pub attestation_object: Vec<u8>,
}

/// The body of `POST /api/webauthn/v1/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishLoginRequest {
    #[serde(with = "crate::domain::base64_bytes")]
    pub id: Vec<u8>,
    #[serde(with = "crate::domain::base64_bytes")]
    pub raw_id: Vec<u8>,
    pub response: AssertionResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionResponse {
    #[serde(with = "crate::domain::base64_bytes")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "crate::domain::base64_bytes")]
    pub authenticator_data: Vec<u8>,
    #[serde(with = "crate::domain::base64_bytes")]
    pub signature: Vec<u8>,
    pub user_handle: String,
}

/// Bound from the query string of `POST /api/oauth2/v1/token`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRequest {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub grant_type: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// The three mutually-exclusive slots a single challenge record may hold.
/// SPEC_FULL.md §9: model as a tagged sum, not three independent stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub key: String,
    pub authorization: Option<AuthorizationRequest>,
    pub register: Option<RegisterResponse>,
    pub login: Option<LoginResponse>,
}

impl ChallengeRecord {
    pub fn empty(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }
}

/// An authorization code, stored as a consumed-once `AuthorizationRequest`
/// carried by its own challenge-record key (12-char alphabet draw).
pub type CodeRecord = ChallengeRecord;
