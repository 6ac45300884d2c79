//! Component C: Authenticator-Data & Attestation-Object Codec.
//!
//! Byte-for-byte port of the layout confirmed in
//! `server/authenticator_data.go` from the original implementation this spec
//! was distilled from: `rpIdHash(32) || flags(1) || counter(4) || [attested
//! credential data] || [extensions]`, with `attested credential data` itself
//! being `aaguid(16) || credIdLen(2) || credId(credIdLen) || credPublicKey`.
//!
//! SPEC_FULL.md §4.C.

use ciborium::value::Value;

use crate::cose;
use crate::domain::errors::CodecError;
use crate::domain::models::CoseKey;

const MIN_AUTH_DATA_LENGTH: usize = 37;
const MIN_ATTESTED_AUTH_LENGTH: usize = 55;
const MAX_CREDENTIAL_ID_LENGTH: usize = 1023;

const FLAG_USER_PRESENT: u8 = 1 << 0;
const FLAG_USER_VERIFIED: u8 = 1 << 2;
const FLAG_ATTESTED_DATA: u8 = 1 << 6;
const FLAG_EXTENSION_DATA: u8 = 1 << 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; 16],
    pub credential_id: Vec<u8>,
    pub public_key: CoseKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub user_present: bool,
    pub user_verified: bool,
    pub counter: u32,
    pub attested_credential_data: Option<AttestedCredentialData>,
    pub extensions: Vec<u8>,
}

impl AuthenticatorData {
    /// Parses the raw `authenticatorData` bytes per the exact layout above.
    /// Any leftover, unaccounted-for bytes are an error — the source treats
    /// this as corruption rather than a forward-compatible extension point.
    pub fn unmarshal(raw: &[u8]) -> Result<Self, CodecError> {
        if raw.len() < MIN_AUTH_DATA_LENGTH {
            return Err(CodecError::AuthDataShort);
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&raw[0..32]);

        let flags = raw[32];
        let counter = u32::from_be_bytes(raw[33..37].try_into().unwrap());

        let attested = flags & FLAG_ATTESTED_DATA != 0;
        let extension = flags & FLAG_EXTENSION_DATA != 0;

        let mut remaining = raw.len() - MIN_AUTH_DATA_LENGTH;
        let mut attested_credential_data = None;

        if attested {
            if raw.len() < MIN_ATTESTED_AUTH_LENGTH {
                return Err(CodecError::AttestedMissing);
            }

            let mut aaguid = [0u8; 16];
            aaguid.copy_from_slice(&raw[37..53]);

            let id_len = u16::from_be_bytes(raw[53..55].try_into().unwrap()) as usize;
            if id_len > MAX_CREDENTIAL_ID_LENGTH {
                return Err(CodecError::CredIdTooLong);
            }

            let id_start = 55;
            let id_end = id_start + id_len;
            if raw.len() < id_end {
                return Err(CodecError::AttestedMissing);
            }
            let credential_id = raw[id_start..id_end].to_vec();

            let key_bytes = &raw[id_end..];
            let (value, consumed) = cose::decode_one(key_bytes)?;
            let reencoded = cose::reencode(&value)?;
            let public_key = cose_key_from_value(value)?;

            remaining = remaining
                .checked_sub(16 + 2 + id_len + reencoded.len())
                .ok_or(CodecError::LeftoverBytes)?;
            let _ = consumed;

            attested_credential_data = Some(AttestedCredentialData {
                aaguid,
                credential_id,
                public_key,
            });
        }

        let extensions_start = raw.len() - remaining;
        let extensions = if extension {
            raw[extensions_start..].to_vec()
        } else {
            Vec::new()
        };

        if !extension && remaining != 0 {
            return Err(CodecError::LeftoverBytes);
        }

        Ok(Self {
            rp_id_hash,
            user_present: flags & FLAG_USER_PRESENT != 0,
            user_verified: flags & FLAG_USER_VERIFIED != 0,
            counter,
            attested_credential_data,
            extensions,
        })
    }

    /// Checks the two relying-party invariants SPEC_FULL.md §4.C requires
    /// before accepting any assertion or attestation: the RP ID hash must
    /// match, presence is always required, and verification only when asked.
    pub fn verify(&self, expected_rp_id_hash: &[u8; 32], user_verification_required: bool) -> Result<(), CodecError> {
        use subtle::ConstantTimeEq;
        if self.rp_id_hash.ct_eq(expected_rp_id_hash).unwrap_u8() != 1 {
            return Err(CodecError::CborMalformed("rpIdHash mismatch".to_string()));
        }
        if !self.user_present {
            return Err(CodecError::CborMalformed("user presence flag not set".to_string()));
        }
        if user_verification_required && !self.user_verified {
            return Err(CodecError::CborMalformed(
                "user verification required but flag not set".to_string(),
            ));
        }
        Ok(())
    }
}

fn cose_key_from_value(value: Value) -> Result<CoseKey, CodecError> {
    let bytes = cose::reencode(&value)?;
    cose::parse_cose_key(&bytes)
}

/// The CBOR-encoded `attestationObject` produced by
/// `navigator.credentials.create()`: `{fmt, authData, attStmt}`. This server
/// only supports the `"packed"` self-attestation statement format
/// (SPEC_FULL.md §4.C); any other `fmt` — including `"none"`, whose
/// `attStmt` is an empty map with no `alg`/`sig` to verify against — is
/// rejected outright rather than silently accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationObject {
    pub fmt: String,
    pub auth_data: AuthenticatorData,
    pub auth_data_raw: Vec<u8>,
    /// The `"packed"` statement's own `alg`/`sig` — the attesting
    /// authenticator signs over the same data as a later assertion
    /// signature, using the credential's own key (no `x5c` certificate
    /// chain, which is out of scope per SPEC_FULL.md's attestation-trust
    /// Non-goal). Mandatory: `unmarshal` fails if either is absent.
    pub att_stmt_alg: i64,
    pub att_stmt_signature: Vec<u8>,
}

impl AttestationObject {
    pub fn unmarshal(raw: &[u8]) -> Result<Self, CodecError> {
        let value: Value =
            ciborium::de::from_reader(raw).map_err(|e| CodecError::CborMalformed(e.to_string()))?;
        let map = value
            .as_map()
            .ok_or_else(|| CodecError::CborMalformed("attestationObject is not a CBOR map".to_string()))?;

        let fmt = map
            .iter()
            .find(|(k, _)| k.as_text() == Some("fmt"))
            .and_then(|(_, v)| v.as_text())
            .ok_or_else(|| CodecError::CborMalformed("attestationObject missing fmt".to_string()))?
            .to_string();

        if fmt != "packed" {
            return Err(CodecError::CborMalformed(format!(
                "unsupported attestation statement format: {fmt}"
            )));
        }

        let auth_data_raw = map
            .iter()
            .find(|(k, _)| k.as_text() == Some("authData"))
            .and_then(|(_, v)| v.as_bytes())
            .cloned()
            .ok_or_else(|| CodecError::CborMalformed("attestationObject missing authData".to_string()))?;

        let auth_data = AuthenticatorData::unmarshal(&auth_data_raw)?;

        let stmt = map
            .iter()
            .find(|(k, _)| k.as_text() == Some("attStmt"))
            .and_then(|(_, v)| v.as_map())
            .ok_or_else(|| CodecError::CborMalformed("attestationObject missing attStmt".to_string()))?;

        let att_stmt_alg = stmt
            .iter()
            .find(|(k, _)| k.as_text() == Some("alg"))
            .and_then(|(_, v)| v.as_integer())
            .and_then(|i| i128::try_from(i).ok())
            .map(|i| i as i64)
            .ok_or_else(|| CodecError::CborMalformed("packed attStmt missing alg".to_string()))?;

        let att_stmt_signature = stmt
            .iter()
            .find(|(k, _)| k.as_text() == Some("sig"))
            .and_then(|(_, v)| v.as_bytes())
            .cloned()
            .ok_or_else(|| CodecError::CborMalformed("packed attStmt missing sig".to_string()))?;

        Ok(Self {
            fmt,
            auth_data,
            auth_data_raw,
            att_stmt_alg,
            att_stmt_signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_auth_data(flags: u8) -> Vec<u8> {
        let mut buf = vec![0u8; 37];
        buf[32] = flags;
        buf
    }

    #[test]
    fn rejects_short_input() {
        let raw = vec![0u8; 36];
        assert_eq!(AuthenticatorData::unmarshal(&raw), Err(CodecError::AuthDataShort));
    }

    #[test]
    fn parses_minimal_no_attested_data() {
        let raw = minimal_auth_data(FLAG_USER_PRESENT);
        let parsed = AuthenticatorData::unmarshal(&raw).unwrap();
        assert!(parsed.user_present);
        assert!(!parsed.user_verified);
        assert!(parsed.attested_credential_data.is_none());
    }

    #[test]
    fn rejects_leftover_bytes() {
        let mut raw = minimal_auth_data(FLAG_USER_PRESENT);
        raw.push(0xff);
        assert_eq!(AuthenticatorData::unmarshal(&raw), Err(CodecError::LeftoverBytes));
    }

    #[test]
    fn parses_attested_credential_data() {
        use crate::domain::models::ALG_EDDSA;

        let mut raw = vec![0u8; 32];
        raw.push(FLAG_USER_PRESENT | FLAG_ATTESTED_DATA);
        raw.extend_from_slice(&0u32.to_be_bytes());
        raw.extend_from_slice(&[0xAA; 16]); // aaguid
        let cred_id = vec![1, 2, 3, 4];
        raw.extend_from_slice(&(cred_id.len() as u16).to_be_bytes());
        raw.extend_from_slice(&cred_id);

        let key = Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(1.into())), // kty=OKP
            (Value::Integer(3.into()), Value::Integer((-8).into())), // alg=EdDSA
            (Value::Integer((-1).into()), Value::Integer(6.into())), // crv
            (Value::Integer((-2).into()), Value::Bytes(vec![7u8; 32])), // x
        ]);
        let mut key_bytes = Vec::new();
        ciborium::ser::into_writer(&key, &mut key_bytes).unwrap();
        raw.extend_from_slice(&key_bytes);

        let parsed = AuthenticatorData::unmarshal(&raw).unwrap();
        let attested = parsed.attested_credential_data.unwrap();
        assert_eq!(attested.aaguid, [0xAA; 16]);
        assert_eq!(attested.credential_id, cred_id);
        assert_eq!(attested.public_key.alg(), ALG_EDDSA);
    }
}
