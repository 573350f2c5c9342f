use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

use crate::errors::RequestFailure;

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Bytes(Bytes),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Success {
    pub data: ResponseBody,
    pub status_code: u16,
    pub headers: HeaderMap,
}

pub type RequestOutcome = Result<Success, RequestFailure>;

/// Raw payload handed back by a download, with the server's suggested name.
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Bytes,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub status_code: u16,
}

pub(crate) fn is_json_media_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("json"))
        .unwrap_or(false)
}

/// Decodes a body according to the declared media type. Decode errors are
/// returned as a status-0 failure.
pub(crate) fn decode_body(headers: &HeaderMap, body: &[u8]) -> Result<ResponseBody, RequestFailure> {
    if is_json_media_type(headers) {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ResponseBody::Json(Value::Null));
        }
        serde_json::from_slice(body)
            .map(ResponseBody::Json)
            .map_err(|e| RequestFailure::transport(format!("Failed to decode JSON response: {}", e)))
    } else {
        String::from_utf8(body.to_vec())
            .map(ResponseBody::Text)
            .map_err(|e| RequestFailure::transport(format!("Failed to decode text response: {}", e)))
    }
}

/// Picks the message a failed response should surface: the payload's own
/// message when it has one, otherwise `HTTP <code>: <reason>`.
pub(crate) fn failure_message(status: StatusCode, payload: &ResponseBody) -> String {
    let from_payload = payload.as_json().and_then(|v| {
        non_blank(v.get("message"))
            .or_else(|| non_blank(v.pointer("/error/message")))
            .or_else(|| non_blank(v.get("detail")))
    });

    match from_payload {
        Some(message) => message.to_string(),
        None => format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        ),
    }
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|m| !m.trim().is_empty())
}

/// `filename*` wins over `filename`; parameter names are case-insensitive.
pub(crate) fn content_disposition_filename(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let mut plain = None;
    for part in value.split(';') {
        let Some((key, raw)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                if let Some(name) = extended_filename(raw.trim()) {
                    return Some(name);
                }
            }
            "filename" if plain.is_none() => {
                let name = raw.trim().trim_matches('"');
                if !name.is_empty() {
                    plain = Some(name.to_string());
                }
            }
            _ => {}
        }
    }
    plain
}

// charset'language'percent-encoded, UTF-8 or ASCII only
fn extended_filename(raw: &str) -> Option<String> {
    let mut pieces = raw.trim_matches('"').splitn(3, '\'');
    let charset = pieces.next()?;
    let _language = pieces.next()?;
    let encoded = pieces.next()?;
    if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("us-ascii") {
        return None;
    }
    let name = urlencoding::decode(encoded).ok()?;
    if name.is_empty() {
        None
    } else {
        Some(name.into_owned())
    }
}
