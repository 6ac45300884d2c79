//! Signs and verifies the OAuth2 access/refresh tokens minted by components E/F.
//!
//! Grounded in `server/jwt/jwt_service.go`: a `JwtService[SecretType]` that
//! type-switches its secret into either an RSA keypair or an HMAC string.
//! This crate keeps that split as two concrete types rather than one generic
//! over a secret enum, since Rust has no clean equivalent of the source's
//! runtime type switch on a generic parameter — access tokens always sign
//! with the RSA keypair (RS256), refresh tokens always sign with the HMAC
//! secret (HS256).

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::RsaPrivateKey;

use crate::domain::errors::OAuth2Error;
use crate::domain::ports::JwtService;

type Claims = serde_json::Map<String, serde_json::Value>;

/// Signs access tokens with a boot-generated RSA keypair (RS256), matching
/// the source's `KeyPair` secret variant.
pub struct RsaJwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl RsaJwtService {
    pub fn generate() -> Result<Self, OAuth2Error> {
        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048)
            .map_err(|_| OAuth2Error::ServerError)?;
        let public_key = private_key.to_public_key();

        let private_pem = private_key
            .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
            .map_err(|_| OAuth2Error::ServerError)?;
        let public_pem = public_key
            .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
            .map_err(|_| OAuth2Error::ServerError)?;

        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|_| OAuth2Error::ServerError)?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|_| OAuth2Error::ServerError)?;

        Ok(Self {
            encoding_key,
            decoding_key,
        })
    }
}

#[async_trait]
impl JwtService for RsaJwtService {
    async fn create(&self, claims: Claims) -> Result<String, OAuth2Error> {
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|_| OAuth2Error::ServerError)
    }

    fn verify(&self, token: &str) -> Result<Claims, OAuth2Error> {
        decode::<Claims>(token, &self.decoding_key, &no_required_claims(Algorithm::RS256))
            .map(|data| data.claims)
            .map_err(|_| OAuth2Error::InvalidGrant)
    }
}

/// Claims are an arbitrary map the caller populates (SPEC_FULL.md §6); this
/// server never puts `exp` in them, so the decoder must not demand one —
/// `Validation::new` otherwise requires `exp` and every `verify` call fails.
fn no_required_claims(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation
}

/// Signs refresh tokens with a boot-generated random HMAC secret (HS256),
/// matching the source's `SecretString` secret variant.
pub struct HmacJwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl HmacJwtService {
    pub fn generate() -> Self {
        let mut secret = [0u8; 64];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
        }
    }
}

#[async_trait]
impl JwtService for HmacJwtService {
    async fn create(&self, claims: Claims) -> Result<String, OAuth2Error> {
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| OAuth2Error::ServerError)
    }

    fn verify(&self, token: &str) -> Result<Claims, OAuth2Error> {
        decode::<Claims>(token, &self.decoding_key, &no_required_claims(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|_| OAuth2Error::InvalidGrant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims_with_exp() -> Claims {
        let mut map = serde_json::Map::new();
        map.insert("sub".to_string(), json!("user-1"));
        map.insert(
            "exp".to_string(),
            json!((std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_secs()
                + 3600)),
        );
        map
    }

    #[tokio::test]
    async fn rsa_round_trip() {
        let service = RsaJwtService::generate().unwrap();
        let token = service.create(claims_with_exp()).await.unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.get("sub").unwrap(), "user-1");
    }

    #[tokio::test]
    async fn hmac_round_trip() {
        let service = HmacJwtService::generate();
        let token = service.create(claims_with_exp()).await.unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.get("sub").unwrap(), "user-1");
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let service = HmacJwtService::generate();
        let mut token = service.create(claims_with_exp()).await.unwrap();
        token.push('x');
        assert!(service.verify(&token).is_err());
    }
}
