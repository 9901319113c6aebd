use chrono::NaiveDate;
use lazy_static::lazy_static;
use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::config::{ExtractOptions, TotalPolicy};
use crate::dates;
use crate::dom;
use crate::error::{ExtractError, ExtractResult};
use crate::hidden_fields::{parse_flag, HiddenFieldIndex};
use crate::model::{Extraction, ProjectEntry, Timesheet, TimesheetHeader};
use crate::rows;

const GRID_ID: &str = "ttTable";
const UNKNOWN: &str = "Unknown";

lazy_static! {
    static ref MEMBER_PREFIX_REGEX: Regex = Regex::new(r"^Member\s*:\s*").unwrap();
}

/// Total hours across all rows, in row order.
pub fn total_hours(projects: &[ProjectEntry]) -> f64 {
    projects.iter().map(|p| p.row_total).sum()
}

/// Turns a TimeTrack entry page into a [`Timesheet`].
///
/// The week is taken from `requested_week_ending`, not from the page. Fails
/// only when the date cannot be read or the page has no timesheet grid;
/// missing page-level controls fall back to defaults and malformed rows are
/// reported in [`Extraction::skipped`].
pub fn parse(
    markup: &str,
    requested_week_ending: &str,
    options: ExtractOptions,
) -> ExtractResult<Extraction> {
    let week_ending = dates::normalize(requested_week_ending, options.date_order)?;
    parse_week(markup, week_ending, options.total_policy)
}

/// [`parse`] for a week-ending date the caller has already normalized.
pub fn parse_week(
    markup: &str,
    week_ending: NaiveDate,
    total_policy: TotalPolicy,
) -> ExtractResult<Extraction> {
    let dom = dom::load(markup)?;
    let grid = dom::find_by_id(&dom.document, GRID_ID).ok_or_else(|| {
        ExtractError::ParseFailure(format!("no #{} grid in document", GRID_ID))
    })?;

    let index = HiddenFieldIndex::build(&dom.document);
    let (projects, skipped) = rows::extract_rows(&grid_rows(&grid), &index, total_policy);
    let header = read_header(&dom.document, &index, week_ending, total_hours(&projects));

    Ok(Extraction {
        timesheet: Timesheet {
            header,
            week_days: dates::week_of(week_ending),
            projects,
        },
        skipped,
    })
}

/// Body rows of the grid, in order. Header and footer rows are left out.
fn grid_rows(grid: &Handle) -> Vec<Handle> {
    dom::children_named(grid, "tbody")
        .iter()
        .flat_map(|body| dom::children_named(body, "tr"))
        .collect()
}

fn read_header(
    document: &Handle,
    index: &HiddenFieldIndex,
    week_ending: NaiveDate,
    total_hours_logged: f64,
) -> TimesheetHeader {
    let member = dom::find_by_id(document, "filter")
        .and_then(|filter| {
            dom::find_first(&filter, |h| dom::is_tag(h, "td") && dom::has_class(h, "labelleft"))
        })
        .map(|cell| MEMBER_PREFIX_REGEX.replace(&dom::text(&cell), "").trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let member_id = page_value(document, "AppUserID")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or_else(|| index.integer(0, "AppUserID"));

    TimesheetHeader {
        member,
        member_id,
        week_ending,
        start_date: dates::week_start(week_ending),
        end_date: week_ending,
        is_submitted: page_flag(document, "IsSubmitted"),
        is_approved: page_flag(document, "IsApproved"),
        is_first_week: page_flag(document, "IsFirstWeek"),
        is_last_week: page_flag(document, "IsLastWeek"),
        is_partial: page_flag(document, "IsPartial"),
        is_uiap_full_time_employee: page_flag(document, "IsUIAPFullTimeEmployee"),
        is_full_time_employee: page_flag(document, "IsFullTimeEmployee"),
        user_type: page_value(document, "UserType").unwrap_or_else(|| UNKNOWN.to_string()),
        tt_header_id: page_value(document, "TTHeaderID")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0),
        total_hours_logged,
    }
}

fn page_value(document: &Handle, id: &str) -> Option<String> {
    dom::find_by_id(document, id)
        .map(|control| dom::control_value(&control).trim().to_string())
        .filter(|v| !v.is_empty())
}

fn page_flag(document: &Handle, id: &str) -> bool {
    page_value(document, id)
        .and_then(|v| parse_flag(&v))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_GRID: &str = r#"<html><body><table id="ttTable"><thead><tr class="gridHeader"><th>Project</th></tr></thead><tbody></tbody></table></body></html>"#;

    #[test]
    fn empty_project_list_totals_zero() {
        assert_eq!(total_hours(&[]), 0.0);
    }

    #[test]
    fn bad_date_fails_before_markup_is_read() {
        let result = parse("", "35/1/2025", ExtractOptions::default());
        assert!(matches!(result, Err(ExtractError::InvalidDateFormat(_))));
    }

    #[test]
    fn page_without_grid_is_a_parse_failure() {
        let result = parse(
            "<html><body><form id=\"login\"></form></body></html>",
            "1/16/2026",
            ExtractOptions::default(),
        );
        assert!(matches!(result, Err(ExtractError::ParseFailure(_))));
    }

    #[test]
    fn normalized_week_gives_the_same_result_as_raw_text() {
        let week_ending = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        let from_date = parse_week(EMPTY_GRID, week_ending, TotalPolicy::PreferDisplayed).unwrap();
        let from_text = parse(EMPTY_GRID, "1/16/2026", ExtractOptions::default()).unwrap();

        assert_eq!(from_date, from_text);
        assert_eq!(from_date.timesheet.header.week_ending, week_ending);
    }

    #[test]
    fn missing_page_controls_fall_back_to_defaults() {
        let extraction = parse(EMPTY_GRID, "1/16/2026", ExtractOptions::default()).unwrap();
        let header = &extraction.timesheet.header;

        assert_eq!(header.member, "Unknown");
        assert_eq!(header.member_id, 0);
        assert_eq!(header.user_type, "Unknown");
        assert!(!header.is_submitted);
        assert!(!header.is_approved);
        assert_eq!(header.tt_header_id, 0);
        assert_eq!(header.total_hours_logged, 0.0);
        assert_eq!(header.week_ending, NaiveDate::from_ymd_opt(2026, 1, 16).unwrap());
        assert_eq!(header.start_date, NaiveDate::from_ymd_opt(2026, 1, 10).unwrap());
        assert_eq!(header.end_date, header.week_ending);
        assert_eq!(extraction.timesheet.week_days.len(), 7);
        assert!(extraction.timesheet.projects.is_empty());
    }

    #[test]
    fn page_controls_fill_the_header() {
        let markup = EMPTY_GRID.replace(
            "<body>",
            r#"<body>
                <table id="filter"><tr><td class="labelleft">Member : Priya Nair</td></tr></table>
                <input type="hidden" id="AppUserID" value="1641">
                <input type="hidden" id="IsSubmitted" value="True">
                <input type="hidden" id="IsApproved" value="False">
                <input type="hidden" id="IsFullTimeEmployee" value="True">
                <input type="hidden" id="UserType" value="FTEMP">
                <input type="hidden" id="TTHeaderID" value="64289">"#,
        );
        let header = parse(&markup, "2026-01-16", ExtractOptions::default())
            .unwrap()
            .timesheet
            .header;

        assert_eq!(header.member, "Priya Nair");
        assert_eq!(header.member_id, 1641);
        assert!(header.is_submitted);
        assert!(!header.is_approved);
        assert!(header.is_full_time_employee);
        assert!(!header.is_partial);
        assert_eq!(header.user_type, "FTEMP");
        assert_eq!(header.tt_header_id, 64289);
    }
}
