// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The quoted-printable / charset bridge (component B of the design).
//! The reader and writer never perform QP decoding or charset
//! transcoding themselves; they call out to a [`QuotedPrintableCodec`].
//! [`StdQuotedPrintableCodec`] is the default, real-crate-backed
//! implementation, wired to the `quoted_printable` and `encoding_rs`
//! crates; callers with different needs (streaming decode, a different
//! charset table) can supply their own.

use crate::error::WriteError;

/// The external collaborator responsible for quoted-printable decoding
/// on read and encoding on write, including any charset transcoding
/// implied by a `CHARSET` parameter.
pub trait QuotedPrintableCodec {
    /// Decodes a quoted-printable-encoded value. `charset`, if present,
    /// names the `CHARSET` parameter accompanying the property; the
    /// decoded bytes are transcoded from that charset into UTF-8. With
    /// no charset, the decoded bytes are interpreted as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the failure (soft-decode
    /// failure or unresolvable charset label); callers typically surface
    /// this as a [`crate::error::Warning::QuotedPrintableError`] or
    /// [`crate::error::Warning::UnknownCharset`] and fall back to the raw
    /// value.
    fn decode(&self, encoded: &str, charset: Option<&str>) -> Result<String, String>;

    /// Encodes `decoded` as quoted-printable text, first transcoding into
    /// `charset` if given.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::UnknownCharset`] if `charset` cannot be
    /// resolved.
    fn encode(&self, decoded: &str, charset: Option<&str>) -> Result<String, WriteError>;
}

/// Default [`QuotedPrintableCodec`] backed by the `quoted_printable` and
/// `encoding_rs` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdQuotedPrintableCodec;

impl QuotedPrintableCodec for StdQuotedPrintableCodec {
    fn decode(&self, encoded: &str, charset: Option<&str>) -> Result<String, String> {
        let bytes = quoted_printable::decode(encoded.as_bytes(), quoted_printable::ParseMode::Robust)
            .map_err(|e| e.to_string())?;
        match charset {
            Some(label) => {
                let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| format!("unknown charset {label:?}"))?;
                let (text, _, _had_errors) = encoding.decode(&bytes);
                Ok(text.into_owned())
            }
            None => String::from_utf8(bytes).map_err(|e| e.to_string()),
        }
    }

    fn encode(&self, decoded: &str, charset: Option<&str>) -> Result<String, WriteError> {
        let bytes: Vec<u8> = match charset {
            Some(label) => {
                let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| WriteError::UnknownCharset(label.to_string()))?;
                let (bytes, _, _) = encoding.encode(decoded);
                bytes.into_owned()
            }
            None => decoded.as_bytes().to_vec(),
        };
        let encoded = quoted_printable::encode(&bytes);
        Ok(String::from_utf8_lossy(&encoded).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ascii_through_qp() {
        let codec = StdQuotedPrintableCodec;
        let encoded = codec.encode("hello=world\r\n", None).unwrap();
        let decoded = codec.decode(&encoded, None).unwrap();
        assert_eq!(decoded, "hello=world\r\n");
    }

    #[test]
    fn unknown_charset_on_decode_is_reported() {
        let codec = StdQuotedPrintableCodec;
        let result = codec.decode("abc", Some("not-a-real-charset"));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_charset_on_encode_is_reported() {
        let codec = StdQuotedPrintableCodec;
        let result = codec.encode("abc", Some("not-a-real-charset"));
        assert!(matches!(result, Err(WriteError::UnknownCharset(_))));
    }
}
