//! Line-delimited JSON request loop.
//!
//! Each stdin line is one [`RpcRequest`]; each answer is one [`RpcResponse`] line
//! on stdout. A malformed line gets an error response and the loop keeps going.

use crate::core::error::TutorError;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

/// Standard RPC request envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcRequest {
    /// Operation to perform
    pub op: String,
    #[serde(default)]
    pub params: serde_json::Value,
    /// Request ID for correlation
    #[serde(default = "default_request_id")]
    pub id: String,
}

pub fn default_request_id() -> String {
    ulid::Ulid::new().to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcError {
    pub code: String,
    pub message: String,
}

/// Standard RPC response envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcResponse {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(id: String, result: serde_json::Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: String, err: &TutorError) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(RpcError {
                code: err.code().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

/// Pull a required string parameter out of `params`.
pub fn str_param<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, TutorError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| TutorError::ValidationError(format!("missing string param '{}'", key)))
}

/// Answer requests until `reader` is exhausted. Returns how many were handled.
///
/// Lines are read as raw bytes, so one line that is not UTF-8 is answered with an
/// error like any other malformed request.
pub fn serve<R, W, F>(mut reader: R, mut writer: W, mut handle: F) -> Result<usize, TutorError>
where
    R: BufRead,
    W: Write,
    F: FnMut(&RpcRequest) -> Result<serde_json::Value, TutorError>,
{
    let mut handled = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let response = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => match serde_json::from_str::<RpcRequest>(line) {
                Ok(req) => {
                    tracing::debug!(op = %req.op, id = %req.id, "rpc request");
                    match handle(&req) {
                        Ok(result) => RpcResponse::ok(req.id, result),
                        Err(err) => RpcResponse::err(req.id, &err),
                    }
                }
                Err(err) => RpcResponse::err(default_request_id(), &TutorError::JsonError(err)),
            },
            Err(err) => {
                tracing::warn!(bytes = buf.len(), "rpc line is not utf-8");
                RpcResponse::err(
                    default_request_id(),
                    &TutorError::ValidationError(format!("request line is not valid UTF-8: {}", err)),
                )
            }
        };
        writeln!(writer, "{}", serde_json::to_string(&response)?)?;
        writer.flush()?;
        handled += 1;
    }
    Ok(handled)
}
