use serde::{Deserialize, Serialize};
use url::Url;
use worker::Env;

pub const DEFAULT_PORTAL_BASE_URL: &str = "https://portal.ubtiinc.com";
pub const DEFAULT_LMS_BASE_URL: &str = "https://uiaplmsapi.azurewebsites.net";
pub const DEFAULT_LMS_ORIGIN: &str = "https://lms.ubtiinc.com";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,https://sigmaunlimited.netlify.app";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// How to read a date whose first component is a plausible day or month.
#[derive(Debug, Deserialize, Serialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DateOrder {
    /// `M/D/YYYY`, the portal's own format.
    #[default]
    MonthFirst,
    DayFirst,
}

/// Which value wins when a row shows its own total next to the daily cells.
#[derive(Debug, Deserialize, Serialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TotalPolicy {
    #[default]
    PreferDisplayed,
    Computed,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    #[serde(default)]
    pub date_order: DateOrder,
    #[serde(default)]
    pub total_policy: TotalPolicy,
}

/// Body of `/api/timesheet`. The portal cookie name and the upstream `dt`
/// parameter are accepted as aliases.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetRequest {
    #[serde(default)]
    pub trinity_auth: Option<String>,
    #[serde(default, rename = ".TrinityAuth")]
    pub trinity_auth_cookie: Option<String>,
    #[serde(default)]
    pub week_ending_day: Option<String>,
    #[serde(default)]
    pub dt: Option<String>,
    #[serde(default)]
    pub date_order: Option<DateOrder>,
    #[serde(default)]
    pub total_policy: Option<TotalPolicy>,
}

impl TimesheetRequest {
    pub fn from_query(url: &Url) -> Self {
        let mut request = TimesheetRequest::default();
        for (key, value) in url.query_pairs() {
            let value = value.into_owned();
            match key.as_ref() {
                "trinityAuth" => request.trinity_auth = Some(value),
                ".TrinityAuth" => request.trinity_auth_cookie = Some(value),
                "weekEndingDay" => request.week_ending_day = Some(value),
                "dt" => request.dt = Some(value),
                "dateOrder" => request.date_order = parse_date_order(&value),
                "totalPolicy" => request.total_policy = parse_total_policy(&value),
                _ => {}
            }
        }
        request
    }

    pub fn auth(&self) -> Option<&str> {
        first_non_empty(&self.trinity_auth, &self.trinity_auth_cookie)
    }

    pub fn week_ending(&self) -> Option<&str> {
        first_non_empty(&self.week_ending_day, &self.dt)
    }

    pub fn options(&self) -> ExtractOptions {
        ExtractOptions {
            date_order: self.date_order.unwrap_or_default(),
            total_policy: self.total_policy.unwrap_or_default(),
        }
    }
}

/// Body of `/api/analytics`.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRequest {
    #[serde(default)]
    pub trinity_auth: Option<String>,
    #[serde(default, rename = ".TrinityAuth")]
    pub trinity_auth_cookie: Option<String>,
}

impl DashboardRequest {
    pub fn from_query(url: &Url) -> Self {
        let mut request = DashboardRequest::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "trinityAuth" => request.trinity_auth = Some(value.into_owned()),
                ".TrinityAuth" => request.trinity_auth_cookie = Some(value.into_owned()),
                _ => {}
            }
        }
        request
    }

    pub fn auth(&self) -> Option<&str> {
        first_non_empty(&self.trinity_auth, &self.trinity_auth_cookie)
    }
}

/// Body of `/api/lms/dashboard`. The LMS hands out numeric employee ids but
/// some clients send them as strings.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LmsDashboardRequest {
    #[serde(default)]
    pub emp_id: serde_json::Value,
    #[serde(default)]
    pub token: Option<String>,
}

impl LmsDashboardRequest {
    pub fn emp_id(&self) -> Option<String> {
        match &self.emp_id {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Deployment settings, read from worker vars with compiled-in fallbacks.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub portal_base_url: String,
    pub lms_base_url: String,
    pub lms_origin: String,
    pub allowed_origins: Vec<String>,
    pub user_agent: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            portal_base_url: DEFAULT_PORTAL_BASE_URL.to_string(),
            lms_base_url: DEFAULT_LMS_BASE_URL.to_string(),
            lms_origin: DEFAULT_LMS_ORIGIN.to_string(),
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl PortalConfig {
    pub fn from_env(env: &Env) -> Self {
        let var = |name: &str, fallback: &str| {
            env.var(name)
                .map(|v| v.to_string())
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };

        Self {
            portal_base_url: var("PORTAL_BASE_URL", DEFAULT_PORTAL_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            lms_base_url: var("LMS_BASE_URL", DEFAULT_LMS_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            lms_origin: var("LMS_ORIGIN", DEFAULT_LMS_ORIGIN),
            allowed_origins: split_origins(&var("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)),
            user_agent: var("USER_AGENT", DEFAULT_USER_AGENT),
        }
    }

    pub fn timesheet_entry_url(&self) -> String {
        format!("{}/TimetrackForms/TimeTrack/TimeTrackEntry", self.portal_base_url)
    }

    pub fn dashboard_url(&self) -> String {
        format!("{}/TimetrackForms/dashboard/index", self.portal_base_url)
    }

    pub fn login_url(&self) -> String {
        format!("{}/TimetrackForms/Login/UsernamePassword", self.portal_base_url)
    }

    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

fn first_non_empty<'a>(primary: &'a Option<String>, fallback: &'a Option<String>) -> Option<&'a str> {
    primary
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| fallback.as_deref().filter(|s| !s.trim().is_empty()))
}

fn parse_date_order(raw: &str) -> Option<DateOrder> {
    match raw {
        "monthFirst" => Some(DateOrder::MonthFirst),
        "dayFirst" => Some(DateOrder::DayFirst),
        _ => None,
    }
}

fn parse_total_policy(raw: &str) -> Option<TotalPolicy> {
    match raw {
        "preferDisplayed" => Some(TotalPolicy::PreferDisplayed),
        "computed" => Some(TotalPolicy::Computed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_aliases_fall_back_when_primary_is_empty() {
        let request: TimesheetRequest = serde_json::from_str(
            r#"{"trinityAuth": "", ".TrinityAuth": "ABC123", "dt": "1/16/2026"}"#,
        )
        .unwrap();

        assert_eq!(request.auth(), Some("ABC123"));
        assert_eq!(request.week_ending(), Some("1/16/2026"));
        assert_eq!(request.options(), ExtractOptions::default());
    }

    #[test]
    fn query_parameters_fill_the_request() {
        let url = Url::parse(
            "https://worker.dev/api/timesheet?trinityAuth=FF00&weekEndingDay=16-01-2026&dateOrder=dayFirst&totalPolicy=computed",
        )
        .unwrap();
        let request = TimesheetRequest::from_query(&url);

        assert_eq!(request.auth(), Some("FF00"));
        assert_eq!(request.week_ending(), Some("16-01-2026"));
        assert_eq!(request.options().date_order, DateOrder::DayFirst);
        assert_eq!(request.options().total_policy, TotalPolicy::Computed);
    }

    #[test]
    fn lms_employee_id_accepts_numbers_and_strings() {
        let numeric: LmsDashboardRequest =
            serde_json::from_str(r#"{"empId": 1641, "token": "t"}"#).unwrap();
        let text: LmsDashboardRequest =
            serde_json::from_str(r#"{"empId": " 1641 ", "token": ""}"#).unwrap();

        assert_eq!(numeric.emp_id().as_deref(), Some("1641"));
        assert_eq!(numeric.token(), Some("t"));
        assert_eq!(text.emp_id().as_deref(), Some("1641"));
        assert_eq!(text.token(), None);
    }

    #[test]
    fn default_config_allows_known_origins() {
        let config = PortalConfig::default();
        assert!(config.is_allowed_origin("http://localhost:5173"));
        assert!(!config.is_allowed_origin("https://evil.example"));
        assert_eq!(
            config.timesheet_entry_url(),
            "https://portal.ubtiinc.com/TimetrackForms/TimeTrack/TimeTrackEntry"
        );
    }
}
