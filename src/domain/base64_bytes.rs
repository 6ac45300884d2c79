//! A `serde_with`-style helper for encoding `Vec<u8>` fields as base64url
//! (no padding) over JSON, matching how a browser's WebAuthn API hands back
//! `ArrayBuffer`s to a `fetch()` body: hex/raw JSON number arrays are never
//! what ships over this wire, base64url text is (SPEC_FULL.md §6).

use base64::Engine;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);
    serializer.serialize_str(&encoded)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(text.as_bytes())
        .map_err(serde::de::Error::custom)
}
