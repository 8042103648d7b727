//! Plugin wire protocol.
//!
//! A plugin receives exactly one [`Request`] frame on stdin and answers with
//! exactly one [`Response`] frame on stdout. A frame is a 4-byte big-endian
//! length followed by that many bytes of JSON.

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::ast::Document;
use crate::error::ProtocolError;

/// Largest payload accepted in a single frame (256 MiB).
pub const MAX_FRAME_LEN: u32 = 256 * 1024 * 1024;

/// One generation unit: a plugin run against a set of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Names of the documents the plugin should produce output for.
    #[serde(default)]
    pub files_to_generate: Vec<String>,
    /// Generator options, JSON encoded.
    #[serde(default)]
    pub parameter: String,
    /// Every document the plugin may need, checked and resolved.
    #[serde(default)]
    pub documents: Vec<Document>,
}

/// Outcome of one generation unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Non-empty when the plugin reports a generation failure.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, alias = "file")]
    pub files: Vec<ResponseFile>,
}

impl Response {
    /// A response carrying only an error message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            files: Vec::new(),
        }
    }
}

/// A file produced by a plugin, relative to its output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFile {
    pub name: String,
    #[serde(default, with = "base64_bytes")]
    pub content: Vec<u8>,
}

impl ResponseFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

/// Writes `payload` as one length-prefixed frame.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or(ProtocolError::FrameTooLarge {
            len: payload.len() as u64,
            max: MAX_FRAME_LEN as u64,
        })?;
    writer.write_u32::<BigEndian>(len)?;
    writer.write_all(payload)?;
    Ok(())
}

/// Reads one length-prefixed frame and returns its payload.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let len = reader.read_u32::<BigEndian>()?;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: len as u64,
            max: MAX_FRAME_LEN as u64,
        });
    }

    let expected = len as usize;
    let mut payload = Vec::with_capacity(expected);
    reader.take(len as u64).read_to_end(&mut payload)?;
    if payload.len() != expected {
        return Err(ProtocolError::Truncated {
            expected,
            actual: payload.len(),
        });
    }
    Ok(payload)
}

/// Decodes a buffer that must hold exactly one frame.
fn decode_single<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, ProtocolError> {
    let mut cursor = bytes;
    let payload = read_frame(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(ProtocolError::TrailingBytes(cursor.len()));
    }
    Ok(serde_json::from_slice(&payload)?)
}

fn encode_single<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(message)?;
    let mut out = Vec::with_capacity(payload.len() + 4);
    write_frame(&mut out, &payload)?;
    Ok(out)
}

pub fn encode_request(request: &Request) -> Result<Vec<u8>, ProtocolError> {
    encode_single(request)
}

pub fn decode_request(bytes: &[u8]) -> Result<Request, ProtocolError> {
    decode_single(bytes)
}

pub fn encode_response(response: &Response) -> Result<Vec<u8>, ProtocolError> {
    encode_single(response)
}

pub fn decode_response(bytes: &[u8]) -> Result<Response, ProtocolError> {
    decode_single(bytes)
}

/// Checks that a plugin-supplied file name stays inside its output directory.
///
/// Names must be relative and `/`-separated, with no empty, `.` or `..`
/// segments. On failure the reason is returned.
pub fn validate_file_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("file name is empty".to_string());
    }
    if name.starts_with('/') {
        return Err("absolute paths are not allowed".to_string());
    }
    if name.contains('\\') {
        return Err("backslashes are not allowed; use '/'".to_string());
    }

    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err("drive-letter paths are not allowed".to_string());
    }

    for segment in name.split('/') {
        match segment {
            "" => return Err("empty path segments are not allowed".to_string()),
            "." | ".." => {
                return Err(format!("'{}' path segments are not allowed", segment));
            }
            _ => {}
        }
    }
    Ok(())
}
