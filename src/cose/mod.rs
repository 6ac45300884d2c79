//! Component B: COSE Key Decoder & Verifier.
//!
//! Parses a CBOR-encoded COSE_Key into one of {EC2, RSA, OKP} and verifies a
//! signature over arbitrary message bytes. This is the single abstraction
//! WebAuthn verification runs through (SPEC_FULL.md §4.B).
//!
//! Grounded in `keys/public-key.go`, `keys/ecdsa.go`, `keys/rsa.go`, and
//! `server/keys/octet.go` from the original Go implementation this spec was
//! distilled from: a tagged key type dispatched on `kty`, each variant
//! carrying its own `Verify(data, sig)`.

use ciborium::value::Value;
use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{
    signature::Verifier as _, Signature as P256Signature, VerifyingKey as P256VerifyingKey,
};
use p384::ecdsa::{Signature as P384Signature, VerifyingKey as P384VerifyingKey};
use p521::ecdsa::{Signature as P521Signature, VerifyingKey as P521VerifyingKey};
use rsa::pss::Pss;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::domain::errors::CodecError;
use crate::domain::models::{
    CoseKey, ALG_EDDSA, ALG_ES256, ALG_ES384, ALG_ES512, ALG_PS256, ALG_PS384, ALG_PS512,
    ALG_RS256, ALG_RS384, ALG_RS512,
};

const KTY_OKP: i64 = 1;
const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;

/// Reads a COSE_Key from its CBOR encoding. Dispatches on `kty` (map key 1)
/// before decoding the algorithm-specific fields — never a virtual-dispatch
/// hierarchy (SPEC_FULL.md §9).
pub fn parse_cose_key(bytes: &[u8]) -> Result<CoseKey, CodecError> {
    let value: Value = ciborium::de::from_reader(bytes)
        .map_err(|e| CodecError::CborMalformed(e.to_string()))?;
    let map = as_int_map(&value)?;

    let kty = get_int(&map, KTY_KEY)?;
    let alg = get_int(&map, ALG_KEY)?;

    match kty {
        KTY_OKP => {
            let crv = get_int(&map, CRV_KEY).unwrap_or(6); // 6 = Ed25519
            if alg != ALG_EDDSA {
                return Err(CodecError::UnsupportedAlgorithm(alg));
            }
            let x = get_bytes(&map, X_KEY)?;
            Ok(CoseKey::Okp { alg, crv, x })
        }
        KTY_EC2 => {
            let crv = get_int(&map, CRV_KEY)?;
            let x = get_bytes(&map, X_KEY)?;
            let y = get_bytes(&map, Y_KEY)?;
            Ok(CoseKey::Ec2 { alg, crv, x, y })
        }
        KTY_RSA => {
            let n = get_bytes(&map, RSA_N_KEY)?;
            let e = get_bytes(&map, RSA_E_KEY)?;
            Ok(CoseKey::Rsa { alg, n, e })
        }
        other => Err(CodecError::UnsupportedKey(other)),
    }
}

/// Re-encodes a parsed `Value` back to its canonical CBOR form. Used by the
/// authenticator-data codec to normalize the trailing COSE key bytes after
/// determining their length (SPEC_FULL.md §4.C step 3).
pub fn reencode(value: &Value) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(|e| CodecError::CborMalformed(e.to_string()))?;
    Ok(buf)
}

/// Decodes one well-formed CBOR item from the front of `bytes`, returning the
/// parsed value and the number of bytes it consumed. Used to find where the
/// COSE key ends inside the trailing authenticator-data slice, since CBOR
/// items are self-delimiting but the slice may carry extra bytes after it.
pub fn decode_one(bytes: &[u8]) -> Result<(Value, usize), CodecError> {
    let mut cursor = std::io::Cursor::new(bytes);
    let value: Value = ciborium::de::from_reader(&mut cursor)
        .map_err(|e| CodecError::CborMalformed(e.to_string()))?;
    Ok((value, cursor.position() as usize))
}

const KTY_KEY: i64 = 1;
const ALG_KEY: i64 = 3;
const CRV_KEY: i64 = -1;
const X_KEY: i64 = -2;
const Y_KEY: i64 = -3;
const RSA_N_KEY: i64 = -1;
const RSA_E_KEY: i64 = -2;

fn as_int_map(value: &Value) -> Result<Vec<(i64, Value)>, CodecError> {
    let entries = value
        .as_map()
        .ok_or_else(|| CodecError::CborMalformed("COSE key is not a CBOR map".to_string()))?;
    entries
        .iter()
        .map(|(k, v)| {
            k.as_integer()
                .and_then(|i| i128::try_from(i).ok())
                .map(|i| (i as i64, v.clone()))
                .ok_or_else(|| CodecError::CborMalformed("non-integer COSE key field".to_string()))
        })
        .collect()
}

fn get_int(map: &[(i64, Value)], key: i64) -> Result<i64, CodecError> {
    map.iter()
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| v.as_integer())
        .and_then(|i| i128::try_from(i).ok())
        .map(|i| i as i64)
        .ok_or_else(|| CodecError::CborMalformed(format!("missing integer field {key}")))
}

fn get_bytes(map: &[(i64, Value)], key: i64) -> Result<Vec<u8>, CodecError> {
    map.iter()
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| v.as_bytes())
        .cloned()
        .ok_or_else(|| CodecError::CborMalformed(format!("missing byte-string field {key}")))
}

/// Verifies `signature` over `message` under this COSE key. This is the
/// single signature API all WebAuthn verification runs through
/// (SPEC_FULL.md §4.B).
pub fn verify(key: &CoseKey, message: &[u8], signature: &[u8]) -> Result<bool, CodecError> {
    match key {
        CoseKey::Okp { alg, x, .. } => verify_okp(*alg, x, message, signature),
        CoseKey::Ec2 { alg, x, y, .. } => verify_ec2(*alg, x, y, message, signature),
        CoseKey::Rsa { alg, n, e, .. } => verify_rsa(*alg, n, e, message, signature),
    }
}

fn verify_okp(alg: i64, x: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CodecError> {
    if alg != ALG_EDDSA {
        return Err(CodecError::UnsupportedAlgorithm(alg));
    }
    let x: [u8; 32] = x
        .try_into()
        .map_err(|_| CodecError::CborMalformed("OKP x coordinate must be 32 bytes".to_string()))?;
    let verifying_key = Ed25519VerifyingKey::from_bytes(&x)
        .map_err(|e| CodecError::CborMalformed(e.to_string()))?;
    let sig = Ed25519Signature::from_slice(signature)
        .map_err(|e| CodecError::CborMalformed(e.to_string()))?;
    Ok(verifying_key.verify(message, &sig).is_ok())
}

fn verify_ec2(
    alg: i64,
    x: &[u8],
    y: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool, CodecError> {
    // SEC1 uncompressed point encoding: 0x04 || x || y.
    let mut sec1 = Vec::with_capacity(1 + x.len() + y.len());
    sec1.push(0x04);
    sec1.extend_from_slice(x);
    sec1.extend_from_slice(y);

    match alg {
        ALG_ES256 => {
            let verifying_key = P256VerifyingKey::from_sec1_bytes(&sec1)
                .map_err(|e| CodecError::CborMalformed(e.to_string()))?;
            let sig = P256Signature::from_der(signature)
                .map_err(|e| CodecError::CborMalformed(e.to_string()))?;
            Ok(verifying_key.verify(message, &sig).is_ok())
        }
        ALG_ES384 => {
            let verifying_key = P384VerifyingKey::from_sec1_bytes(&sec1)
                .map_err(|e| CodecError::CborMalformed(e.to_string()))?;
            let sig = P384Signature::from_der(signature)
                .map_err(|e| CodecError::CborMalformed(e.to_string()))?;
            Ok(verifying_key.verify(message, &sig).is_ok())
        }
        ALG_ES512 => {
            let verifying_key = P521VerifyingKey::from_sec1_bytes(&sec1)
                .map_err(|e| CodecError::CborMalformed(e.to_string()))?;
            let sig = P521Signature::from_der(signature)
                .map_err(|e| CodecError::CborMalformed(e.to_string()))?;
            Ok(verifying_key.verify(message, &sig).is_ok())
        }
        other => Err(CodecError::UnsupportedAlgorithm(other)),
    }
}

fn verify_rsa(
    alg: i64,
    n: &[u8],
    e: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool, CodecError> {
    let n = rsa::BigUint::from_bytes_be(n);
    let e = rsa::BigUint::from_bytes_be(e);
    let public_key = RsaPublicKey::new(n, e).map_err(|err| CodecError::CborMalformed(err.to_string()))?;

    match alg {
        ALG_RS256 => verify_pkcs1::<Sha256>(&public_key, message, signature),
        ALG_RS384 => verify_pkcs1::<Sha384>(&public_key, message, signature),
        ALG_RS512 => verify_pkcs1::<Sha512>(&public_key, message, signature),
        ALG_PS256 => verify_pss::<Sha256>(&public_key, message, signature),
        ALG_PS384 => verify_pss::<Sha384>(&public_key, message, signature),
        ALG_PS512 => verify_pss::<Sha512>(&public_key, message, signature),
        other => Err(CodecError::UnsupportedAlgorithm(other)),
    }
}

fn verify_pkcs1<D>(public_key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> Result<bool, CodecError>
where
    D: Digest,
{
    let hashed = D::digest(message);
    Ok(public_key
        .verify(Pkcs1v15Sign::new::<D>(), &hashed, signature)
        .is_ok())
}

fn verify_pss<D>(public_key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> Result<bool, CodecError>
where
    D: Digest,
{
    let hashed = D::digest(message);
    Ok(public_key.verify(Pss::new::<D>(), &hashed, signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use p256::ecdsa::{signature::Signer as P256Signer, SigningKey as P256SigningKey};
    use p384::ecdsa::{signature::Signer as P384Signer, SigningKey as P384SigningKey};
    use p521::ecdsa::{signature::Signer as P521Signer, SigningKey as P521SigningKey};
    use rand::rngs::OsRng;
    use rsa::RsaPrivateKey;

    #[test]
    fn okp_eddsa_round_trip() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let message = b"authData || clientDataHash";
        let sig = signing_key.sign(message);

        let key = CoseKey::Okp {
            alg: ALG_EDDSA,
            crv: 6,
            x: signing_key.verifying_key().to_bytes().to_vec(),
        };

        assert!(verify(&key, message, &sig.to_bytes()).unwrap());

        let mut tampered = sig.to_bytes();
        tampered[0] ^= 0x01;
        assert!(!verify(&key, message, &tampered).unwrap());
    }

    #[test]
    fn ec2_es256_round_trip() {
        let signing_key = P256SigningKey::random(&mut rand::rngs::OsRng);
        let message = b"authData || clientDataHash";
        let sig: P256Signature = P256Signer::sign(&signing_key, message);

        let point = signing_key.verifying_key().to_encoded_point(false);
        let key = CoseKey::Ec2 {
            alg: ALG_ES256,
            crv: 1,
            x: point.x().unwrap().to_vec(),
            y: point.y().unwrap().to_vec(),
        };

        assert!(verify(&key, message, &sig.to_der().as_bytes()).unwrap());

        let mut tampered = message.to_vec();
        tampered[0] ^= 0x01;
        assert!(!verify(&key, &tampered, sig.to_der().as_bytes()).unwrap());
    }

    #[test]
    fn ec2_es384_round_trip() {
        let signing_key = P384SigningKey::random(&mut rand::rngs::OsRng);
        let message = b"authData || clientDataHash";
        let sig: P384Signature = P384Signer::sign(&signing_key, message);

        let point = signing_key.verifying_key().to_encoded_point(false);
        let key = CoseKey::Ec2 {
            alg: ALG_ES384,
            crv: 2,
            x: point.x().unwrap().to_vec(),
            y: point.y().unwrap().to_vec(),
        };

        assert!(verify(&key, message, sig.to_der().as_bytes()).unwrap());

        let mut tampered = message.to_vec();
        tampered[0] ^= 0x01;
        assert!(!verify(&key, &tampered, sig.to_der().as_bytes()).unwrap());
    }

    #[test]
    fn ec2_es512_round_trip() {
        let signing_key = P521SigningKey::random(&mut rand::rngs::OsRng);
        let message = b"authData || clientDataHash";
        let sig: P521Signature = P521Signer::sign(&signing_key, message);

        let point = signing_key.verifying_key().to_encoded_point(false);
        let key = CoseKey::Ec2 {
            alg: ALG_ES512,
            crv: 3,
            x: point.x().unwrap().to_vec(),
            y: point.y().unwrap().to_vec(),
        };

        assert!(verify(&key, message, sig.to_der().as_bytes()).unwrap());

        let mut tampered = message.to_vec();
        tampered[0] ^= 0x01;
        assert!(!verify(&key, &tampered, sig.to_der().as_bytes()).unwrap());
    }

    #[test]
    fn rsa_rs256_and_ps256_round_trip() {
        let mut csprng = OsRng;
        let private_key = RsaPrivateKey::new(&mut csprng, 2048).unwrap();
        let public_key = private_key.to_public_key();
        let message = b"authData || clientDataHash";
        let hashed = Sha256::digest(message);

        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        for alg in [ALG_RS256, ALG_PS256] {
            let key = CoseKey::Rsa { alg, n: n.clone(), e: e.clone() };
            let sig = if alg == ALG_RS256 {
                private_key.sign(Pkcs1v15Sign::new::<Sha256>(), &hashed).unwrap()
            } else {
                private_key
                    .sign_with_rng(&mut csprng, Pss::new::<Sha256>(), &hashed)
                    .unwrap()
            };
            assert!(verify(&key, message, &sig).unwrap());

            let mut tampered = sig.clone();
            tampered[0] ^= 0x01;
            assert!(!verify(&key, message, &tampered).unwrap());
        }
    }

    #[test]
    fn unknown_kty_is_rejected() {
        // kty=4, an unassigned COSE key type.
        let raw = {
            let mut buf = Vec::new();
            let value = Value::Map(vec![(Value::Integer(1.into()), Value::Integer(4.into()))]);
            ciborium::ser::into_writer(&value, &mut buf).unwrap();
            buf
        };
        assert!(matches!(parse_cose_key(&raw), Err(CodecError::UnsupportedKey(4))));
    }
}
