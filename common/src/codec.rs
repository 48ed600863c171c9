//! Wire codec.
//!
//! Requests are line oriented:
//!
//! ```text
//! <dbKind>: <method>
//! <body line 1>
//! <body line 2>
//! ```
//!
//! Replies are single JSON objects terminated by `\n`. JSON string escaping
//! keeps newlines inside `body` from breaking the reply framing.

use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::{Reply, Request, Row};

/// Decodes one request from a raw buffer.
///
/// The first line is the header, split on its first colon into `dbKind` and
/// `method`. The remaining lines, joined and trimmed, form the body.
pub fn decode(bytes: &[u8]) -> AppResult<Request> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| AppError::MalformedRequest("request is not valid UTF-8".into()))?;

    let mut lines = text.split('\n');
    let header = lines.next().unwrap_or_default();
    let rest: Vec<&str> = lines.collect();
    if rest.is_empty() {
        return Err(AppError::MalformedRequest(
            "expected a header line followed by a body".into(),
        ));
    }

    let (db_kind, method) = header
        .split_once(':')
        .ok_or_else(|| AppError::MalformedRequest("header must be <dbKind>: <method>".into()))?;

    let request = Request {
        db_kind: db_kind.trim().to_string(),
        method: method.trim().to_string(),
        body: rest.join("\n").trim().to_string(),
    };
    request
        .validate()
        .map_err(|e| AppError::MalformedRequest(e.to_string()))?;

    Ok(request)
}

/// Extracts the data source from a `connection` body of the form `key=value`.
///
/// Only the part after the first `=` is used; the key is not checked.
pub fn decode_dsn(body: &str) -> AppResult<String> {
    body.split_once('=')
        .map(|(_, dsn)| dsn.to_string())
        .ok_or_else(|| AppError::MalformedDsn(format!("expected key=value, got {:?}", body)))
}

/// Encodes a reply, newline terminated.
pub fn encode(reply: &Reply) -> AppResult<Vec<u8>> {
    let mut out = serde_json::to_vec(reply)?;
    out.push(b'\n');
    Ok(out)
}

/// Encodes query rows into a reply body.
pub fn encode_rows(rows: &[Row]) -> AppResult<String> {
    Ok(serde_json::to_string(rows)?)
}
