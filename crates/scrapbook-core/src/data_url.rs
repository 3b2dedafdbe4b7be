//! Base64 data URI encoding for preview images.

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors decoding a data URI back into bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DataUrlError {
    /// Missing `data:` scheme or `,` separator.
    #[error("not a data URI")]
    NotDataUrl,

    /// Header does not declare base64 encoding.
    #[error("data URI is not base64 encoded")]
    NotBase64,

    /// Payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    Payload(String),
}

/// A data URI split into its MIME type and decoded bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedDataUrl {
    pub mime_type: SmolStr,
    pub bytes: Bytes,
}

/// Encode bytes as `data:<mime>;base64,<payload>`.
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Decode a base64 data URI.
pub fn decode(data_url: &str) -> Result<DecodedDataUrl, DataUrlError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or(DataUrlError::NotDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::NotDataUrl)?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or(DataUrlError::NotBase64)?;

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| DataUrlError::Payload(e.to_string()))?;

    Ok(DecodedDataUrl {
        mime_type: SmolStr::new(mime_type),
        bytes: Bytes::from(bytes),
    })
}
