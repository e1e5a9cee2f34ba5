//! S/MIME to DER conversion for detached PKCS#7 signatures.
//!
//! `openssl smime -sign` and friends emit a detached signature as a
//! multipart MIME message. The signature part looks like:
//!
//! ```text
//! ------3F2A...
//! Content-Type: application/x-pkcs7-signature; name="smime.p7s"
//! Content-Transfer-Encoding: base64
//! Content-Disposition: attachment; filename="smime.p7s"
//!
//! MIIGOQYJKoZIhvcNAQcCoIIGKjCCBiYCAQExCzAJBgUrDgMCGgUAMAsGCSqGSIb3
//! ...
//!
//! ------3F2A...--
//! ```
//!
//! The pass archive stores the raw DER bytes, so the base64 body between the
//! `filename="smime.p7s"` marker and the next boundary is decoded here.

use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const START_MARKER: &str = "filename=\"smime.p7s\"";
const BOUNDARY_MARKER: &str = "------";

/// Extract the DER signature from S/MIME text.
///
/// # Errors
///
/// Returns [`Error::Credential`] if the start marker or the closing boundary
/// is missing, if the body between them is empty, or if it is not valid
/// base64. Truncated output is never returned.
pub fn smime_to_der(smime: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(smime)
        .map_err(|_| Error::credential("S/MIME signature is not valid UTF-8"))?;

    let start = text
        .find(START_MARKER)
        .map(|pos| pos + START_MARKER.len())
        .ok_or_else(|| Error::credential("S/MIME signature has no smime.p7s part"))?;

    let rest = &text[start..];
    let end = rest
        .find(BOUNDARY_MARKER)
        .ok_or_else(|| Error::credential("S/MIME signature part has no closing boundary"))?;

    let body: String = rest[..end]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if body.is_empty() {
        return Err(Error::credential("S/MIME signature part is empty"));
    }

    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| Error::credential(format!("S/MIME signature is not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            "MIME-Version: 1.0\n\
             Content-Type: multipart/signed; protocol=\"application/x-pkcs7-signature\"; micalg=\"sha-256\"; boundary=\"----ABC\"\n\
             \n\
             This is an S/MIME signed message\n\
             \n\
             ------ABC\n\
             {{}}\n\
             ------ABC\n\
             Content-Type: application/x-pkcs7-signature; name=\"smime.p7s\"\n\
             Content-Transfer-Encoding: base64\n\
             Content-Disposition: attachment; filename=\"smime.p7s\"\n\
             \n\
             {body}\n\
             \n\
             ------ABC--\n"
        )
    }

    #[test]
    fn test_extracts_multiline_body() {
        let der = vec![0x30u8, 0x82, 0x01, 0x00, 0xde, 0xad, 0xbe, 0xef];
        let encoded = STANDARD.encode(&der);
        let (a, b) = encoded.split_at(4);
        let text = wrap(&format!("{a}\r\n{b}"));

        assert_eq!(smime_to_der(text.as_bytes()).unwrap(), der);
    }

    #[test]
    fn test_missing_start_marker() {
        let err = smime_to_der(b"------ABC\nMIIB\n------ABC--").unwrap_err();
        assert!(matches!(err, Error::Credential(_)));
    }

    #[test]
    fn test_missing_boundary() {
        let text = "Content-Disposition: attachment; filename=\"smime.p7s\"\n\nMIIB";
        assert!(smime_to_der(text.as_bytes()).is_err());
    }

    #[test]
    fn test_empty_body() {
        let text = wrap("");
        let err = smime_to_der(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_invalid_base64() {
        let text = wrap("not*base64!");
        assert!(smime_to_der(text.as_bytes()).is_err());
    }
}
