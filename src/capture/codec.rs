//! Body codec for captured payloads.
//!
//! Two detection paths exist: bodies about to be stored trust the backend's
//! declared `Content-Encoding`, while bodies already in the database carry no
//! encoding flag and are sniffed by their gzip signature. Neither path ever touches the bytes sent back to the caller.

use std::borrow::Cow;
use std::io::{Read, Write};

use axum::http::HeaderValue;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Leading bytes of a gzip member with no flags and no mtime.
pub const GZIP_SIGNATURE: [u8; 8] = [0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Shown in place of bodies that are not valid UTF-8.
pub const INVALID_UTF8_MARKER: &str = "(invalid utf8)";

/// Decompression failed.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("gzip decode failed: {0}")]
    Gzip(#[from] std::io::Error),
}

/// Whether a declared `Content-Encoding` names gzip.
pub fn declares_gzip(content_encoding: Option<&HeaderValue>) -> bool {
    content_encoding
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("gzip"))
}

/// Normalize a backend body for storage.
///
/// Decompresses only when the backend declared gzip. Anything else is
/// returned borrowed and byte-exact, even if it happens to look compressed.
pub fn decode_for_storage<'a>(
    body: &'a [u8],
    content_encoding: Option<&HeaderValue>,
) -> Result<Cow<'a, [u8]>, DecodeError> {
    if !declares_gzip(content_encoding) || body.is_empty() {
        return Ok(Cow::Borrowed(body));
    }
    gunzip(body).map(Cow::Owned)
}

/// Whether a stored body starts with the gzip signature.
pub fn looks_gzipped(body: &[u8]) -> bool {
    body.starts_with(&GZIP_SIGNATURE)
}

/// Normalize a stored body for display, sniffing for gzip.
pub fn decode_for_display(body: &[u8]) -> Result<Cow<'_, [u8]>, DecodeError> {
    if looks_gzipped(body) {
        gunzip(body).map(Cow::Owned)
    } else {
        Ok(Cow::Borrowed(body))
    }
}

/// Text for display, or [`INVALID_UTF8_MARKER`].
pub fn display_text(body: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(body) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Borrowed(INVALID_UTF8_MARKER),
    }
}

/// Decompress every gzip member in `body`.
pub fn gunzip(body: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoded = Vec::with_capacity(body.len().saturating_mul(4));
    MultiGzDecoder::new(body).read_to_end(&mut decoded)?;
    Ok(decoded)
}

/// Compress `body` as a single gzip member.
pub fn gzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}
