use serde::Serialize;
use serde_json::Value;
use url::Url;
use worker::*;

use crate::config::{LmsDashboardRequest, PortalConfig};
use crate::fetch::send_upstream;
use crate::utils::{add_cors_headers, json_error, json_error_with_details, no_store_json, snippet};

/// Error body for an LMS answer that is not JSON. The whole upstream body is
/// passed back under `raw`.
#[derive(Debug, Serialize)]
pub struct InvalidLmsResponse<'a> {
    pub error: &'a str,
    pub raw: &'a str,
}

/// The LMS sometimes answers with a JSON string that itself holds the JSON
/// document. Both shapes decode to the same value.
pub fn decode_lms_json(raw: &str) -> serde_json::Result<Value> {
    match serde_json::from_str::<Value>(raw)? {
        Value::String(inner) => serde_json::from_str(&inner),
        value => Ok(value),
    }
}

/// `<base>/<segments...>` with each segment percent-encoded.
pub fn lms_url(base: &str, segments: &[&str]) -> Option<Url> {
    let mut url = Url::parse(base).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments.iter().copied());
    Some(url)
}

pub async fn handle_lms_dashboard_request(mut req: Request, config: &PortalConfig) -> worker::Result<Response> {
    let request: LmsDashboardRequest = match req.json().await {
        Ok(req_data) => req_data,
        Err(e) => {
            console_error!("JSON parsing error: {:?}", e);
            return json_error(&format!("Invalid request format: {}", e), 400);
        }
    };

    let (Some(emp_id), Some(token)) = (request.emp_id(), request.token()) else {
        return json_error("empId and token required", 400);
    };

    let Some(url) = lms_url(&config.lms_base_url, &["api", "leave", "getDashboard", emp_id.as_str()]) else {
        return json_error("Invalid LMS base URL", 500);
    };

    let mut headers = Headers::new();
    headers.set("Authorization", &format!("Bearer {}", token))?;
    headers.set("Origin", &config.lms_origin)?;
    headers.set("Accept", "application/json")?;

    console_log!("Fetching LMS dashboard for employee {}", emp_id);
    let upstream = send_upstream(url.as_str(), Method::Get, headers, None).await?;
    if !upstream.is_success() {
        console_error!("LMS dashboard returned status {}", upstream.status);
        return json_error_with_details(
            &format!("LMS returned {}", upstream.status),
            Some(&snippet(&upstream.body, 500)),
            upstream.status,
        );
    }

    match decode_lms_json(&upstream.body) {
        Ok(json) => no_store_json(&json),
        Err(e) => {
            console_error!("LMS JSON parse failed: {}", e);
            let body = InvalidLmsResponse {
                error: "Invalid LMS response",
                raw: &upstream.body,
            };
            add_cors_headers(Response::from_json(&body)?.with_status(500))
        }
    }
}
