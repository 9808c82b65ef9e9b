//! Wire encoding for client-carried state
//!
//! Values that round-trip through the browser (`contextEnc`, and a builder
//! step's `columns` and `layout`) are serialized as JSON and then
//! percent-encoded with the same character set as JavaScript's
//! `encodeURIComponent`, so a page script can produce and consume them
//! with `encodeURIComponent(JSON.stringify(v))` / `JSON.parse(decodeURIComponent(s))`.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use thiserror::Error;

use crate::context::Context;

/// Characters `encodeURIComponent` leaves unescaped, besides alphanumerics
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Errors decoding a client-carried value
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A `%` not followed by two hex digits, at the given byte offset
    #[error("malformed percent escape at offset {0}")]
    MalformedEscape(usize),

    /// Percent-decoded bytes are not UTF-8
    #[error("invalid percent-encoding: {0}")]
    Percent(#[from] std::str::Utf8Error),

    /// Decoded text is not JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Decoded JSON is not an object
    #[error("expected a JSON object")]
    NotAnObject,

    /// Value is absent from the submission
    #[error("missing value")]
    Missing,

    /// Value is present but not a string
    #[error("expected an encoded string")]
    NotAString,
}

/// Percent-encode a string like `encodeURIComponent`
pub fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}

/// Percent-decode a string like `decodeURIComponent`
///
/// Unlike `percent_decode_str`, which passes invalid escapes through as
/// literal text, a `%` without two hex digits after it is an error.
pub fn decode_component(encoded: &str) -> Result<String, DecodeError> {
    check_escapes(encoded)?;
    Ok(percent_decode_str(encoded).decode_utf8()?.into_owned())
}

fn check_escapes(encoded: &str) -> Result<(), DecodeError> {
    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        let hex = bytes
            .get(i + 1..i + 3)
            .is_some_and(|digits| digits.iter().all(u8::is_ascii_hexdigit));
        if !hex {
            return Err(DecodeError::MalformedEscape(i));
        }
        i += 3;
    }
    Ok(())
}

/// Encode any JSON value for the wire
pub fn encode_value(value: &Value) -> Result<String, serde_json::Error> {
    Ok(encode_component(&serde_json::to_string(value)?))
}

/// Decode a wire string into a JSON value
pub fn decode_value(encoded: &str) -> Result<Value, DecodeError> {
    let json = decode_component(encoded)?;
    Ok(serde_json::from_str(&json)?)
}

/// Encode a context as the `contextEnc` string
pub fn encode_context(context: &Context) -> Result<String, serde_json::Error> {
    Ok(encode_component(&serde_json::to_string(context)?))
}

/// Decode a `contextEnc` string
///
/// The decoded JSON must be an object; anything else is rejected here,
/// at the point where untyped client data enters the engine.
pub fn decode_context(encoded: &str) -> Result<Context, DecodeError> {
    match decode_value(encoded)? {
        Value::Object(map) => Ok(Context::from(map)),
        _ => Err(DecodeError::NotAnObject),
    }
}

/// Decode an encoded field from a submitted body
pub fn decode_field(value: Option<&Value>) -> Result<Value, DecodeError> {
    match value {
        None | Some(Value::Null) => Err(DecodeError::Missing),
        Some(Value::String(encoded)) => decode_value(encoded),
        Some(_) => Err(DecodeError::NotAString),
    }
}
