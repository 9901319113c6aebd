use url::Url;
use worker::wasm_bindgen::JsValue;
use worker::*;

/// What came back from the portal or the LMS, read to completion.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
    pub set_cookie: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One request, no retries. Redirects are not followed so that login
/// cookies on a 302 are still visible.
pub async fn send_upstream(
    url: &str,
    method: Method,
    headers: Headers,
    body: Option<String>,
) -> worker::Result<UpstreamResponse> {
    // The LMS takes credentials in the path, so only the host is logged.
    console_log!("{:?} upstream {}", method, log_target(url));

    let mut opts = RequestInit::new();
    opts.method = method;
    opts.headers = headers;
    opts.redirect = RequestRedirect::Manual;
    opts.body = body.map(|b| JsValue::from_str(&b));

    let request = Request::new_with_init(url, &opts)?;
    let mut response = Fetch::Request(request).send().await?;
    let status = response.status_code();
    let set_cookie = response.headers().get("set-cookie")?.unwrap_or_default();

    match response.text().await {
        Ok(body) => Ok(UpstreamResponse { status, body, set_cookie }),
        Err(e) => {
            console_error!("Text extraction error for {}: {:?}", log_target(url), e);
            Err(worker::Error::RustError(format!(
                "Text extraction failed for {}: {}",
                log_target(url),
                e
            )))
        }
    }
}

/// Headers shared by every portal request.
pub fn portal_headers(trinity_auth: &str, user_agent: &str) -> worker::Result<Headers> {
    let mut headers = Headers::new();
    headers.set("Cookie", &format!(".TrinityAuth={}", trinity_auth))?;
    headers.set("User-Agent", user_agent)?;
    Ok(headers)
}

fn log_target(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "<invalid url>".to_string())
}
