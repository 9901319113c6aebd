use serde::Serialize;
use worker::{Response, Result};

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-Requested-With, Accept";

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

pub fn add_cors_headers(mut resp: Response) -> Result<Response> {
    let headers = resp.headers_mut();
    headers.set("Access-Control-Allow-Origin", "*")?;
    headers.set("Access-Control-Allow-Methods", ALLOWED_METHODS)?;
    headers.set("Access-Control-Allow-Headers", ALLOWED_HEADERS)?;
    Ok(resp)
}

/// CORS for routes that hand out session tokens: the origin is echoed only
/// when it is on the allow-list, and credentials are allowed.
pub fn add_credentialed_cors_headers(mut resp: Response, origin: Option<&str>) -> Result<Response> {
    let headers = resp.headers_mut();
    headers.set("Access-Control-Allow-Origin", origin.unwrap_or(""))?;
    headers.set("Access-Control-Allow-Credentials", "true")?;
    headers.set("Access-Control-Allow-Methods", "POST, OPTIONS")?;
    headers.set("Access-Control-Allow-Headers", ALLOWED_HEADERS)?;
    headers.set("Vary", "Origin")?;
    Ok(resp)
}

pub fn handle_options_request() -> Result<Response> {
    let resp = Response::empty()?.with_status(204);
    let mut resp = add_cors_headers(resp)?;
    resp.headers_mut().set("Access-Control-Max-Age", "86400")?; // Cache preflight response for 1 day
    Ok(resp)
}

/// `{ "error": ... }` with the given status and CORS headers.
pub fn json_error(message: &str, status: u16) -> Result<Response> {
    json_error_with_details(message, None, status)
}

pub fn json_error_with_details(message: &str, details: Option<&str>, status: u16) -> Result<Response> {
    let body = ErrorBody { error: message, details };
    let resp = Response::from_json(&body)?.with_status(status);
    add_cors_headers(resp)
}

/// JSON success response that must never be cached.
pub fn no_store_json<T: Serialize>(value: &T) -> Result<Response> {
    let mut resp = Response::from_json(value)?;
    resp.headers_mut().set("Cache-Control", "no-store")?;
    add_cors_headers(resp)
}

/// First `max_chars` characters, for echoing upstream bodies into errors.
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
