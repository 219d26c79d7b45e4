// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Base64 and `data:` URL encoding for binary payloads handed to script code.
//
// Media and files travel as `data:<mime>;base64,<payload>`; audio travels as
// bare base64. Standard alphabet, padded, no line wrapping.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use portico_core::error::{PorticoError, Result};

/// Fallback when the content provider reports no MIME type.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Encode bytes as unwrapped standard base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64, ignoring surrounding whitespace.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(encoded.trim())?)
}

/// Build a `data:<mime>;base64,<payload>` URL.
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    let mime = if mime_type.trim().is_empty() {
        DEFAULT_MIME_TYPE
    } else {
        mime_type.trim()
    };
    format!("data:{mime};base64,{}", encode_base64(bytes))
}

/// Parse a base64 `data:` URL back into its MIME type and bytes.
pub fn decode_data_url(url: &str) -> Result<DataUrl> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| PorticoError::InvalidDataUrl("missing `data:` scheme".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| PorticoError::InvalidDataUrl("missing `,` separator".into()))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| PorticoError::InvalidDataUrl("only base64 data URLs are supported".into()))?;

    Ok(DataUrl {
        mime_type: if mime_type.is_empty() {
            DEFAULT_MIME_TYPE.to_string()
        } else {
            mime_type.to_string()
        },
        bytes: decode_base64(payload)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_round_trips_binary() {
        let bytes: Vec<u8> = (0..=255).chain([0xff, 0x00, 0xd8]).collect();
        let url = encode_data_url("image/jpeg", &bytes);
        assert!(url.starts_with("data:image/jpeg;base64,"));

        let decoded = decode_data_url(&url).expect("decode");
        assert_eq!(decoded.mime_type, "image/jpeg");
        assert_eq!(decoded.bytes, bytes);
    }

    #[test]
    fn empty_mime_uses_octet_stream() {
        let url = encode_data_url("", b"abc");
        assert_eq!(url, "data:application/octet-stream;base64,YWJj");
    }

    #[test]
    fn base64_is_unwrapped() {
        let encoded = encode_base64(&[7u8; 300]);
        assert!(!encoded.contains('\n'));
        assert_eq!(decode_base64(&encoded).expect("decode"), vec![7u8; 300]);
    }

    #[test]
    fn malformed_data_urls_are_rejected() {
        assert!(matches!(
            decode_data_url("image/png;base64,AAAA"),
            Err(PorticoError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            decode_data_url("data:text/plain,hello"),
            Err(PorticoError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,@@@"),
            Err(PorticoError::Base64(_))
        ));
    }
}
