use lazy_static::lazy_static;
use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::config::TotalPolicy;
use crate::dom;
use crate::hidden_fields::HiddenFieldIndex;
use crate::model::{DailyHours, ProjectEntry, SkipReason, SkippedRow, DAYS_PER_WEEK};

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Name cell plus the four fixed trailing columns (status, approver, notes,
/// hide toggle).
pub const MIN_ROW_CELLS: usize = 5;

const APPROVER_OFFSET_FROM_END: usize = 3;
const STATUS_OFFSET_FROM_END: usize = 4;

const SECTION_CLASSES: &[&str] = &["Direct", "In-Direct", "OverHead"];
const SECTION_ID_PREFIX: &str = "billingType-";
const DATA_ROW_CLASS: &str = "timeTrackEntryRow";

lazy_static! {
    static ref NON_NUMERIC_REGEX: Regex = Regex::new(r"[^0-9.]").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    Section(String),
    Data,
    Other,
}

/// Classifies a grid row by its markup, never by what the cells say.
pub fn classify(row: &Handle) -> RowKind {
    let is_section = SECTION_CLASSES.iter().any(|c| dom::has_class(row, c))
        || dom::attr(row, "id")
            .map(|id| id.starts_with(SECTION_ID_PREFIX))
            .unwrap_or(false);

    if is_section {
        let label = dom::find_first(row, |h| dom::is_tag(h, "td") || dom::is_tag(h, "th"))
            .map(|cell| dom::text(&cell))
            .unwrap_or_default();
        return RowKind::Section(label);
    }

    if dom::has_class(row, DATA_ROW_CLASS) {
        RowKind::Data
    } else {
        RowKind::Other
    }
}

struct RowFold {
    category: String,
    position: usize,
    projects: Vec<ProjectEntry>,
    skipped: Vec<SkippedRow>,
}

/// One pass over the grid body. Section rows switch the category carried in
/// the accumulator; every data row after them inherits it.
pub fn extract_rows(
    rows: &[Handle],
    index: &HiddenFieldIndex,
    policy: TotalPolicy,
) -> (Vec<ProjectEntry>, Vec<SkippedRow>) {
    let init = RowFold {
        category: UNCATEGORIZED.to_string(),
        position: 0,
        projects: Vec::with_capacity(rows.len()),
        skipped: Vec::new(),
    };

    let done = rows.iter().fold(init, |mut acc, row| {
        match classify(row) {
            RowKind::Section(label) => {
                acc.category = if label.is_empty() {
                    UNCATEGORIZED.to_string()
                } else {
                    label
                };
            }
            RowKind::Data => {
                let row_index = row_index(row, acc.position);
                acc.position += 1;
                match extract_row(row, row_index, &acc.category, index, policy) {
                    Ok(entry) => acc.projects.push(entry),
                    Err(reason) => acc.skipped.push(SkippedRow {
                        index: row_index,
                        category: acc.category.clone(),
                        reason,
                    }),
                }
            }
            RowKind::Other => {}
        }
        acc
    });

    (done.projects, done.skipped)
}

/// The portal numbers data rows through their `id`; position among data rows
/// is the fallback.
fn row_index(row: &Handle, position: usize) -> usize {
    dom::attr(row, "id")
        .and_then(|id| id.trim().parse::<usize>().ok())
        .unwrap_or(position)
}

pub fn extract_row(
    row: &Handle,
    row_index: usize,
    category: &str,
    index: &HiddenFieldIndex,
    policy: TotalPolicy,
) -> Result<ProjectEntry, SkipReason> {
    let cells = dom::children_named(row, "td");
    if cells.len() < MIN_ROW_CELLS {
        return Err(SkipReason::TooFewCells {
            found: cells.len(),
            required: MIN_ROW_CELLS,
        });
    }

    let project_name = strip_category(&dom::text(&cells[0]), category);

    let used_assigned_display = cells[1..]
        .iter()
        .map(dom::text)
        .find(|t| t.contains('/'))
        .unwrap_or_default();
    let (used_hours, assigned_hours) = split_used_assigned(&used_assigned_display);

    let available_hours = cells
        .iter()
        .find(|c| dom::has_class(c, "ttAvailableHrs"))
        .and_then(|c| parse_number(&dom::text(c)))
        .unwrap_or_else(|| (assigned_hours - used_hours).max(0.0));

    let approver = dom::text(&cells[cells.len() - APPROVER_OFFSET_FROM_END]);
    let status = dom::text(&cells[cells.len() - STATUS_OFFSET_FROM_END]);

    let daily_hours = read_daily_hours(row, row_index, index);
    let displayed_total = cells
        .iter()
        .find(|c| dom::has_class(c, "ttTotalHrs"))
        .and_then(|c| parse_number(&dom::text(c)))
        .filter(|v| *v >= 0.0);
    let row_total = match (policy, displayed_total) {
        (TotalPolicy::PreferDisplayed, Some(total)) => total,
        _ => daily_hours.total(),
    };

    let mark_as_hidden_id = dom::find_first(row, |h| {
        dom::is_tag(h, "input") && dom::has_class(h, "ttMarkAsHiddenCheckbox")
    })
    .and_then(|h| dom::attr(&h, "id"))
    .unwrap_or_default();

    let hourly_type_name = index.text(row_index, "HourlyTypeName");

    Ok(ProjectEntry {
        index: row_index,
        category: category.to_string(),
        project_name,
        project_id: index.integer(row_index, "ProjectID"),
        budget_id: index.integer(row_index, "BudgetID"),
        budget_assignment_id: index.integer(row_index, "TTBudgetAssignmentID"),
        billing_type: hourly_type_name.clone(),
        hourly_type_name,
        available_hours,
        used_hours,
        assigned_hours,
        used_assigned_display,
        approver,
        mark_as_hidden_id,
        is_submitted: index.flag(row_index, "IsSubmitted"),
        is_approved: status.contains("Approved") || index.flag(row_index, "IsApproved"),
        monthly_used: index.decimal(row_index, "MonthlyUsed"),
        max_hrs: index.decimal(row_index, "MaxHrs"),
        daily_hours,
        row_total,
    })
}

fn read_daily_hours(row: &Handle, row_index: usize, index: &HiddenFieldIndex) -> DailyHours {
    let inputs = dom::find_all(row, |h| dom::is_tag(h, "input"));
    let mut daily = DailyHours::default();

    for slot in 0..DAYS_PER_WEEK {
        let day = slot + 1;
        let id_suffix = format!("__D{}", day);
        let name_suffix = format!(".D{}", day);

        let input = inputs
            .iter()
            .find(|h| dom::attr(h, "id").map(|id| id.ends_with(&id_suffix)).unwrap_or(false))
            .or_else(|| {
                inputs.iter().find(|h| {
                    dom::attr(h, "name")
                        .map(|name| name.ends_with(&name_suffix))
                        .unwrap_or(false)
                })
            });

        daily.hours[slot] = input
            .and_then(|h| dom::attr(h, "value"))
            .and_then(|v| parse_number(&v))
            .map(|v| v.max(0.0))
            .unwrap_or(0.0);
        daily.ids[slot] = index.integer(row_index, &format!("D{}ID", day)).max(0) as u64;
    }
    daily
}

/// Some markup repeats the section label in front of the project name.
fn strip_category(name: &str, category: &str) -> String {
    if category.is_empty() {
        return name.to_string();
    }
    match name.strip_prefix(category) {
        Some(rest) => {
            let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ':' | '|'));
            if rest.is_empty() {
                name.to_string()
            } else {
                rest.to_string()
            }
        }
        None => name.to_string(),
    }
}

/// `"12.5 / 40"` into `(12.5, 40.0)`. Unparseable sides count as zero.
fn split_used_assigned(display: &str) -> (f64, f64) {
    let mut sides = display.splitn(2, '/');
    let used = sides.next().map(strip_to_number).unwrap_or(0.0);
    let assigned = sides.next().map(strip_to_number).unwrap_or(0.0);
    (used, assigned)
}

fn strip_to_number(raw: &str) -> f64 {
    parse_number(&NON_NUMERIC_REGEX.replace_all(raw, "")).unwrap_or(0.0)
}

/// Plain decimal, or a decimal comma (`7,5`) as some locales type it.
/// Anything else, thousands separators included, does not parse.
fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let normalized = match raw.matches(',').count() {
        0 => raw.to_string(),
        1 if !raw.contains('.') => raw.replacen(',', ".", 1),
        _ => return None,
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
