//! Charset resolution and whole-body transcoding.
//!
//! Decoding only ever runs on the complete body, so multi-byte sequences split
//! across chunk boundaries are never seen in isolation.

use encoding_rs::Encoding;

use crate::error::FetchError;

/// Codec used when the declared charset is absent or unsupported
pub fn default_encoding() -> &'static Encoding {
    encoding_rs::UTF_8
}

/// Extract the `charset` parameter of a content-type value, lower-cased
///
/// Parameter names match case-insensitively and quoted values are unquoted.
pub fn charset_param(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').trim().to_lowercase())
        .filter(|value| !value.is_empty())
}

/// Pick the codec for a declared content type
///
/// Unknown labels, a missing parameter and the `replacement` pseudo-encoding
/// all yield [`default_encoding`] without error.
pub fn resolve(content_type: Option<&str>) -> &'static Encoding {
    let Some(label) = content_type.and_then(charset_param) else {
        return default_encoding();
    };

    match Encoding::for_label(label.as_bytes()) {
        Some(encoding) if encoding != encoding_rs::REPLACEMENT => encoding,
        _ => {
            tracing::debug!(
                charset = %label,
                fallback = default_encoding().name(),
                "Unsupported charset, decoding with default"
            );
            default_encoding()
        }
    }
}

/// Decode a complete body
///
/// A leading BOM for `encoding` is stripped. Invalid sequences become U+FFFD,
/// or fail with [`FetchError::Decode`] when `strict` is set.
pub fn decode(body: &[u8], encoding: &'static Encoding, strict: bool) -> Result<String, FetchError> {
    let (text, had_errors) = encoding.decode_with_bom_removal(body);
    if had_errors {
        if strict {
            return Err(FetchError::Decode {
                encoding: encoding.name().to_string(),
            });
        }
        tracing::warn!(
            encoding = encoding.name(),
            bytes = body.len(),
            "Body contains invalid sequences, replaced with U+FFFD"
        );
    }
    Ok(text.into_owned())
}
