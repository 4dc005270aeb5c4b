//! Conversion between stored blobs and in-memory documents.
//!
//! A stored blob is base64 text wrapping a UTF-8 JSON document. The codec does
//! not care about the document's shape; callers pick the type to decode into.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// Decode a base64-wrapped JSON blob.
///
/// Line breaks inside the base64 text are ignored; the contents API wraps its
/// output every 60 characters.
pub fn decode<D: DeserializeOwned>(blob: &[u8]) -> Result<D, StoreError> {
    let compact: Vec<u8> = blob
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    let json = BASE64
        .decode(&compact)
        .map_err(|e| StoreError::Codec(format!("Invalid base64 content: {}", e)))?;

    serde_json::from_slice(&json)
        .map_err(|e| StoreError::Codec(format!("Invalid JSON document: {}", e)))
}

/// Encode a document as indented JSON, then base64.
pub fn encode<D: Serialize + ?Sized>(document: &D) -> Result<Vec<u8>, StoreError> {
    let json = serde_json::to_vec_pretty(document)
        .map_err(|e| StoreError::Codec(format!("Failed to serialize document: {}", e)))?;
    Ok(BASE64.encode(json).into_bytes())
}
