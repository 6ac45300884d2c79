use thiserror::Error;

/// Repository errors that can occur during data access operations.
/// These are translated from store-specific errors by the Infrastructure layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal repository error: {0}")]
    Internal(String),
}

/// Errors surfaced by the Challenge/Code Store (component A).
#[derive(Debug, Error)]
pub enum ChallengeStoreError {
    #[error("storage error: {0}")]
    StorageError(String),

    #[error("challenge not found")]
    NotFound,
}

/// Binary/CBOR/JSON parsing errors (components B and C). Surfaced externally as
/// `invalid_request`; logged with detail internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("authenticator data shorter than 37 bytes")]
    AuthDataShort,

    #[error("attested credential flag set but data is missing")]
    AttestedMissing,

    #[error("credential id length exceeds 1023 bytes")]
    CredIdTooLong,

    #[error("leftover bytes decoding authenticator data")]
    LeftoverBytes,

    #[error("unsupported COSE key type: {0}")]
    UnsupportedKey(i64),

    #[error("unsupported COSE algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    #[error("malformed CBOR: {0}")]
    CborMalformed(String),

    #[error("malformed JSON: {0}")]
    JsonMalformed(String),

    #[error("malformed base64: {0}")]
    Base64Malformed(String),
}

/// WebAuthn ceremony protocol errors (component D), distinct from the generic
/// OAuth2 protocol error family since they never ride a redirect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebAuthnProtocolError {
    #[error("no valid challenge for this key")]
    NoValidChallenge,

    #[error("client data has the wrong `type`")]
    WrongClientDataType,

    #[error("origin not allowed by relying party")]
    OriginNotAllowed,

    #[error("COSE key algorithm does not match attestation statement algorithm")]
    AlgorithmMismatch,

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("user presence flag not set")]
    UserNotPresent,

    #[error("user verification required but flag not set")]
    UserNotVerified,

    #[error("unknown credential id")]
    UnknownCredential,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// OAuth2 protocol error codes per RFC 6749 §4.1.2.1 / §5.2, extended with the
/// WebAuthn-coupled variants this server also redirects or renders as JSON.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OAuth2Error {
    #[error("invalid_request")]
    InvalidRequest,
    #[error("unauthorized_client")]
    UnauthorizedClient,
    #[error("access_denied")]
    AccessDenied,
    #[error("unsupported_response_type")]
    UnsupportedResponseType,
    #[error("invalid_scope")]
    InvalidScope,
    #[error("invalid_client")]
    InvalidClient,
    #[error("invalid_grant")]
    InvalidGrant,
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,
    #[error("server_error")]
    ServerError,
    #[error("temporarily_unavailable")]
    TemporarilyUnavailable,
}

impl OAuth2Error {
    /// The wire error code exactly as it appears in the `error` query/JSON field.
    pub fn code(self) -> &'static str {
        match self {
            OAuth2Error::InvalidRequest => "invalid_request",
            OAuth2Error::UnauthorizedClient => "unauthorized_client",
            OAuth2Error::AccessDenied => "access_denied",
            OAuth2Error::UnsupportedResponseType => "unsupported_response_type",
            OAuth2Error::InvalidScope => "invalid_scope",
            OAuth2Error::InvalidClient => "invalid_client",
            OAuth2Error::InvalidGrant => "invalid_grant",
            OAuth2Error::UnsupportedGrantType => "unsupported_grant_type",
            OAuth2Error::ServerError => "server_error",
            OAuth2Error::TemporarilyUnavailable => "temporarily_unavailable",
        }
    }

    /// HTTP status this error is rendered with when no redirect URI can carry it.
    pub fn status(self) -> u16 {
        match self {
            OAuth2Error::InvalidRequest => 400,
            OAuth2Error::UnauthorizedClient => 403,
            OAuth2Error::AccessDenied => 403,
            OAuth2Error::UnsupportedResponseType => 400,
            OAuth2Error::InvalidScope => 400,
            OAuth2Error::InvalidClient => 401,
            OAuth2Error::InvalidGrant => 403,
            OAuth2Error::UnsupportedGrantType => 403,
            OAuth2Error::ServerError => 500,
            OAuth2Error::TemporarilyUnavailable => 503,
        }
    }
}

impl From<WebAuthnProtocolError> for OAuth2Error {
    /// Every WebAuthn ceremony failure fails the coupled authorization attempt
    /// as an `invalid_request` — the WebAuthn error detail is logged, not echoed.
    fn from(_: WebAuthnProtocolError) -> Self {
        OAuth2Error::InvalidRequest
    }
}
