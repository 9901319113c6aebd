use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use worker::*;

use crate::config::PortalConfig;
use crate::fetch::send_upstream;
use crate::lms::{decode_lms_json, lms_url};
use crate::utils::add_credentialed_cors_headers;

const DASHBOARD_REDIRECT: &str = "/TimetrackForms/Dashboard/Index";
const USERNAME_FIELD: &str = "UserIdentification.Username";
const PASSWORD_FIELD: &str = "Password";

lazy_static! {
    static ref TRINITY_AUTH_REGEX: Regex =
        Regex::new(r"(?i)\.TrinityAuth=([A-F0-9]+)(?:;|,|\s|$)").unwrap();
}

#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub success: bool,
    pub trinity_success: bool,
    pub lms_success: bool,
    pub trinity_auth: Option<String>,
    #[serde(rename = "LMStoken")]
    pub lms_token: Option<String>,
    #[serde(rename = "LMSdata")]
    pub lms_data: Option<Value>,
}

/// The session token from a portal `Set-Cookie` header.
pub fn extract_trinity_auth(set_cookie: &str) -> Option<String> {
    TRINITY_AUTH_REGEX
        .captures(set_cookie)
        .map(|caps| caps[1].to_string())
}

/// The portal answers a good login with JSON redirecting to its dashboard,
/// and a bad one with the same JSON pointing elsewhere.
pub fn portal_login_succeeded(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("RedirectUrl")
                .and_then(Value::as_str)
                .map(|url| url.contains(DASHBOARD_REDIRECT))
        })
        .unwrap_or(false)
}

pub fn trinity_session(body: &str, set_cookie: &str) -> Option<String> {
    if portal_login_succeeded(body) {
        extract_trinity_auth(set_cookie)
    } else {
        None
    }
}

/// Token and employee data from an LMS authentication response.
pub fn lms_session(raw: &str) -> Option<(String, Option<Value>)> {
    let json = decode_lms_json(raw).ok()?;
    let token = json.get("Token").and_then(Value::as_str)?.to_string();
    let data = json.get("Data").filter(|d| !d.is_null()).cloned();
    Some((token, data))
}

/// Username and password from the url-encoded login form.
pub fn form_credentials(form: &str) -> (Option<String>, Option<String>) {
    let mut username = None;
    let mut password = None;
    for (key, value) in url::form_urlencoded::parse(form.as_bytes()) {
        match key.as_ref() {
            USERNAME_FIELD => username = Some(value.into_owned()),
            PASSWORD_FIELD => password = Some(value.into_owned()),
            _ => {}
        }
    }
    (
        username.filter(|u| !u.is_empty()),
        password.filter(|p| !p.is_empty()),
    )
}

pub async fn handle_login_request(mut req: Request, config: &PortalConfig) -> worker::Result<Response> {
    let origin = req
        .headers()
        .get("Origin")?
        .filter(|o| config.is_allowed_origin(o));
    let form = req.text().await?;

    let mut result = LoginResult::default();

    match portal_login(&form, config).await {
        Ok(Some(token)) => {
            result.trinity_success = true;
            result.trinity_auth = Some(token);
        }
        Ok(None) => console_log!("Portal login rejected"),
        Err(e) => console_error!("Portal login failed: {}", e),
    }

    if let (Some(username), Some(password)) = form_credentials(&form) {
        match lms_login(&username, &password, config).await {
            Ok(Some((token, data))) => {
                result.lms_success = true;
                result.lms_token = Some(token);
                result.lms_data = data;
            }
            Ok(None) => console_log!("LMS login rejected for {}", username),
            Err(e) => console_error!("LMS login failed for {}: {}", username, e),
        }
    }

    result.success = result.trinity_success || result.lms_success;
    let resp = Response::from_json(&result)?;
    add_credentialed_cors_headers(resp, origin.as_deref())
}

pub fn handle_login_preflight(req: &Request, config: &PortalConfig) -> worker::Result<Response> {
    let origin = req
        .headers()
        .get("Origin")?
        .filter(|o| config.is_allowed_origin(o));
    let resp = Response::empty()?.with_status(204);
    add_credentialed_cors_headers(resp, origin.as_deref())
}

async fn portal_login(form: &str, config: &PortalConfig) -> worker::Result<Option<String>> {
    let mut headers = Headers::new();
    headers.set("Content-Type", "application/x-www-form-urlencoded")?;
    headers.set("X-Requested-With", "XMLHttpRequest")?;
    headers.set("Accept", "application/json, text/javascript, */*; q=0.01")?;

    let upstream = send_upstream(&config.login_url(), Method::Put, headers, Some(form.to_string())).await?;
    Ok(trinity_session(&upstream.body, &upstream.set_cookie))
}

async fn lms_login(
    username: &str,
    password: &str,
    config: &PortalConfig,
) -> worker::Result<Option<(String, Option<Value>)>> {
    let credentials = format!("{},{}", username, password);
    let url = lms_url(
        &config.lms_base_url,
        &["api", "employee", "getAuthenticate", credentials.as_str()],
    )
    .ok_or_else(|| worker::Error::RustError("Invalid LMS base URL".to_string()))?;

    let mut headers = Headers::new();
    headers.set("Accept", "application/json")?;

    let upstream = send_upstream(url.as_str(), Method::Get, headers, None).await?;
    if !upstream.is_success() {
        console_warn!("LMS authentication returned status {}", upstream.status);
        return Ok(None);
    }
    Ok(lms_session(&upstream.body))
}
