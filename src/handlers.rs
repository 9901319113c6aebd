use url::Url;
use worker::*;

use crate::config::{DashboardRequest, PortalConfig, TimesheetRequest};
use crate::dates;
use crate::fetch::{portal_headers, send_upstream, UpstreamResponse};
use crate::timesheet;
use crate::utils::{add_cors_headers, json_error, json_error_with_details, no_store_json, snippet};

pub async fn handle_timesheet_request(mut req: Request, config: &PortalConfig) -> worker::Result<Response> {
    let request = if req.method() == Method::Post {
        match req.json::<TimesheetRequest>().await {
            Ok(req_data) => req_data,
            Err(e) => {
                console_error!("JSON parsing error: {:?}", e);
                return json_error(&format!("Invalid request format: {}", e), 400);
            }
        }
    } else {
        TimesheetRequest::from_query(&req.url()?)
    };
    handle_timesheet(request, config).await
}

pub async fn handle_timesheet(request: TimesheetRequest, config: &PortalConfig) -> worker::Result<Response> {
    let Some(trinity_auth) = request.auth() else {
        return json_error("Missing trinityAuth", 400);
    };
    let Some(week_ending_raw) = request.week_ending() else {
        return json_error("Missing weekEndingDay (e.g. 1/16/2026)", 400);
    };
    let options = request.options();

    let week_ending = match dates::normalize(week_ending_raw, options.date_order) {
        Ok(date) => date,
        Err(e) => return json_error(&e.to_string(), e.status_code()),
    };

    let target = Url::parse_with_params(
        &config.timesheet_entry_url(),
        &[("dt", dates::portal_format(week_ending))],
    )
    .map_err(|e| worker::Error::RustError(format!("Invalid portal URL: {}", e)))?;

    console_log!("Fetching timesheet for week ending {}", week_ending);
    let headers = portal_headers(trinity_auth, &config.user_agent)?;
    let upstream = send_upstream(target.as_str(), Method::Get, headers, None).await?;
    if let Some(resp) = reject_upstream(&upstream)? {
        return Ok(resp);
    }

    match timesheet::parse_week(&upstream.body, week_ending, options.total_policy) {
        Ok(extraction) => {
            for skipped in &extraction.skipped {
                console_warn!(
                    "Skipped timesheet row {} ({}): {}",
                    skipped.index,
                    skipped.category,
                    skipped.reason
                );
            }
            console_log!(
                "Parsed {} projects, {} hours logged",
                extraction.timesheet.projects.len(),
                extraction.timesheet.header.total_hours_logged
            );
            no_store_json(&extraction.timesheet)
        }
        Err(e) => {
            console_error!("Timesheet parsing error: {}", e);
            json_error(&e.to_string(), e.status_code())
        }
    }
}

pub async fn handle_dashboard_request(mut req: Request, config: &PortalConfig) -> worker::Result<Response> {
    let request = if req.method() == Method::Post {
        match req.json::<DashboardRequest>().await {
            Ok(req_data) => req_data,
            Err(e) => {
                console_error!("JSON parsing error: {:?}", e);
                return json_error(&format!("Invalid request format: {}", e), 400);
            }
        }
    } else {
        DashboardRequest::from_query(&req.url()?)
    };

    let Some(trinity_auth) = request.auth() else {
        return json_error("Missing trinityAuth token", 400);
    };

    let mut headers = portal_headers(trinity_auth, &config.user_agent)?;
    headers.set("X-Requested-With", "XMLHttpRequest")?;
    headers.set("Accept", "*/*")?;

    let upstream = send_upstream(&config.dashboard_url(), Method::Get, headers, None).await?;
    if let Some(resp) = reject_upstream(&upstream)? {
        return Ok(resp);
    }

    let mut resp = Response::from_html(upstream.body)?;
    resp.headers_mut().set("Cache-Control", "no-store")?;
    add_cors_headers(resp)
}

/// Error response for anything but a 2xx from the portal. A redirect means
/// the portal bounced the session to its login page.
fn reject_upstream(upstream: &UpstreamResponse) -> worker::Result<Option<Response>> {
    if upstream.is_success() {
        return Ok(None);
    }

    console_error!("Portal returned status {}", upstream.status);
    let resp = if (300..400).contains(&upstream.status) {
        json_error("Trinity session rejected", 401)?
    } else {
        json_error_with_details(
            &format!("Target server returned {}", upstream.status),
            Some(&snippet(&upstream.body, 500)),
            upstream.status,
        )?
    };
    Ok(Some(resp))
}
