use thiserror::Error;

use crate::domain::errors::{CodecError, ChallengeStoreError, OAuth2Error, RepositoryError, WebAuthnProtocolError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    ChallengeStore(#[from] ChallengeStoreError),

    #[error(transparent)]
    WebAuthn(#[from] WebAuthnProtocolError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    OAuth2(#[from] OAuth2Error),
}

impl AppError {
    /// Maps any error this crate produces onto the OAuth2 wire vocabulary
    /// (SPEC_FULL.md §6/§7): repository and challenge-store failures are
    /// opaque server errors, WebAuthn/codec failures are the caller's fault.
    pub fn as_oauth2_error(&self) -> OAuth2Error {
        match self {
            AppError::OAuth2(e) => *e,
            AppError::WebAuthn(_) | AppError::Codec(_) => OAuth2Error::InvalidRequest,
            AppError::Repository(_) | AppError::ChallengeStore(_) | AppError::Internal(_) => {
                OAuth2Error::ServerError
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
