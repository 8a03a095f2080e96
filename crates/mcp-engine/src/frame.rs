//! Frame reader
//!
//! Pulls one JSON-RPC message per line off the input stream. Decoding never
//! fails the stream: bad lines come back as [`Frame::Malformed`] so the server
//! loop can answer or drop them and move on.

use std::io;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::error::McpError;
use crate::protocol::{Request, RequestId, Response, JSONRPC_VERSION};

/// One unit read from the input stream.
#[derive(Debug)]
pub enum Frame {
    Request(Request),
    Malformed(FramingError),
    EndOfStream,
}

/// A line that could not be turned into a request.
#[derive(Debug)]
pub struct FramingError {
    pub raw_line: String,
    /// Id recovered from the line, if any. Only then is the client answered.
    pub id: Option<RequestId>,
    pub cause: McpError,
}

impl FramingError {
    pub fn into_response(self) -> Option<Response> {
        let id = self.id?;
        Some(self.cause.into_response(id))
    }
}

pub struct FrameReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Read the next non-blank line. A zero-byte read is end of stream.
    pub async fn next_frame(&mut self) -> io::Result<Frame> {
        loop {
            self.buf.clear();
            let bytes_read = self.reader.read_until(b'\n', &mut self.buf).await?;

            if bytes_read == 0 {
                return Ok(Frame::EndOfStream);
            }

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    return Ok(Frame::Malformed(FramingError {
                        raw_line: String::from_utf8_lossy(&self.buf).trim().to_string(),
                        id: None,
                        cause: McpError::Parse(format!("invalid UTF-8: {}", e)),
                    }));
                }
            };

            if line.is_empty() {
                continue;
            }

            debug!("Received: {}", line);
            return Ok(decode(line));
        }
    }
}

/// Decode a single trimmed line.
pub fn decode(line: &str) -> Frame {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            return Frame::Malformed(FramingError {
                raw_line: line.to_string(),
                id: salvage_id(line),
                cause: McpError::Parse(e.to_string()),
            });
        }
    };

    match parse_request(value) {
        Ok(request) => Frame::Request(request),
        Err((id, reason)) => Frame::Malformed(FramingError {
            raw_line: line.to_string(),
            id,
            cause: McpError::InvalidRequest(reason.to_string()),
        }),
    }
}

fn parse_request(value: Value) -> Result<Request, (Option<RequestId>, &'static str)> {
    let Value::Object(mut object) = value else {
        return Err((None, "expected a JSON object"));
    };

    let id = match object.remove("id") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<RequestId>(raw) {
            Ok(id) => Some(id),
            Err(_) => return Err((None, "id must be a string or a number")),
        },
    };

    match object.get("jsonrpc") {
        None => {}
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        Some(_) => return Err((id, "jsonrpc must be \"2.0\"")),
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) if !method.trim().is_empty() => method,
        _ => return Err((id, "method must be a non-empty string")),
    };

    let params = match object.remove("params") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(params)) => params,
        Some(_) => return Err((id, "params must be an object")),
    };

    Ok(Request { id, method, params })
}

/// Best-effort recovery of the top-level `"id"` member from text that is not
/// valid JSON. Members of nested objects such as `params` are never used.
fn salvage_id(raw: &str) -> Option<RequestId> {
    static ID_VALUE: OnceLock<Regex> = OnceLock::new();
    let value = ID_VALUE.get_or_init(|| {
        Regex::new(r#"^\s*:\s*(-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|"(?:[^"\\]|\\.)*")"#)
            .expect("id pattern is valid")
    });

    if !raw.trim_start().starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut chars = raw.char_indices();
    while let Some((start, c)) = chars.next() {
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => depth = depth.saturating_sub(1),
            '"' => {
                let end = string_end(&mut chars)?;
                if depth == 1 && &raw[start..=end] == r#""id""# {
                    if let Some(captures) = value.captures(&raw[end + 1..]) {
                        return serde_json::from_str(captures.get(1)?.as_str()).ok();
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Consume a string body up to its closing quote and return the quote's index.
fn string_end(chars: &mut std::str::CharIndices<'_>) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in chars {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}
