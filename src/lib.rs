#![recursion_limit = "512"]

pub mod config;
pub mod dates;
pub mod dom;
pub mod error;
mod fetch;
mod handlers;
pub mod hidden_fields;
mod lms;
mod login;
pub mod model;
pub mod rows;
pub mod timesheet;
mod utils;

use worker::*;
use worker_macros::event;
use console_error_panic_hook;

use crate::config::PortalConfig;
use crate::handlers::{handle_dashboard_request, handle_timesheet_request};
use crate::lms::handle_lms_dashboard_request;
use crate::login::{handle_login_preflight, handle_login_request};

pub use crate::config::{DateOrder, ExtractOptions, TotalPolicy};
pub use crate::error::ExtractError;
pub use crate::model::{Extraction, Timesheet};
pub use crate::timesheet::parse;

#[event(fetch)]
pub async fn main(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    // It's crucial to set the panic hook, otherwise panics might silently fail
    console_error_panic_hook::set_once();

    let config = PortalConfig::from_env(&env);
    let url = req.url()?;
    let path = url.path().trim_end_matches('/').to_string();

    if req.method() == Method::Options {
        if path == "/api/login" {
            return handle_login_preflight(&req, &config);
        }
        return utils::handle_options_request();
    }

    match (req.method(), path.as_str()) {
        (Method::Get, "/api/timesheet") | (Method::Post, "/api/timesheet") => {
            handle_timesheet_request(req, &config).await
        }
        (Method::Get, "/api/analytics") | (Method::Post, "/api/analytics") => {
            handle_dashboard_request(req, &config).await
        }
        (Method::Post, "/api/login") => handle_login_request(req, &config).await,
        (Method::Post, "/api/lms/dashboard") => handle_lms_dashboard_request(req, &config).await,
        (method, _) => {
            console_warn!("No route for {:?} {}", method, path);
            utils::json_error("Not Found", 404)
        }
    }
}
