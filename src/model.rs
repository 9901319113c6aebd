use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekDay {
    pub date: NaiveDate,
    pub label: String,
    pub day_number: u32,
}

/// Hours per day slot (`D1`..`D7`) and the portal's cell id for each slot
/// (`D1ID`..`D7ID`). Serialized as one flat object with all 14 keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyHours {
    pub hours: [f64; DAYS_PER_WEEK],
    pub ids: [u64; DAYS_PER_WEEK],
}

impl DailyHours {
    pub fn total(&self) -> f64 {
        self.hours.iter().sum()
    }
}

impl Serialize for DailyHours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(DAYS_PER_WEEK * 2))?;
        for (slot, (hours, id)) in self.hours.iter().zip(self.ids.iter()).enumerate() {
            map.serialize_entry(&format!("D{}", slot + 1), hours)?;
            map.serialize_entry(&format!("D{}ID", slot + 1), id)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntry {
    pub index: usize,
    pub category: String,
    pub project_name: String,
    pub project_id: i64,
    pub budget_id: i64,
    pub budget_assignment_id: i64,
    pub billing_type: String,
    pub hourly_type_name: String,
    pub available_hours: f64,
    pub used_hours: f64,
    pub assigned_hours: f64,
    pub used_assigned_display: String,
    pub approver: String,
    pub mark_as_hidden_id: String,
    pub is_submitted: bool,
    pub is_approved: bool,
    pub monthly_used: f64,
    pub max_hrs: f64,
    pub daily_hours: DailyHours,
    pub row_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetHeader {
    pub member: String,
    pub member_id: i64,
    pub week_ending: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_submitted: bool,
    pub is_approved: bool,
    pub is_first_week: bool,
    pub is_last_week: bool,
    pub is_partial: bool,
    #[serde(rename = "isUIAPFullTimeEmployee")]
    pub is_uiap_full_time_employee: bool,
    pub is_full_time_employee: bool,
    pub user_type: String,
    pub tt_header_id: i64,
    pub total_hours_logged: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timesheet {
    pub header: TimesheetHeader,
    pub week_days: Vec<WeekDay>,
    pub projects: Vec<ProjectEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooFewCells { found: usize, required: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TooFewCells { found, required } => {
                write!(f, "row has {} cells, at least {} required", found, required)
            }
        }
    }
}

/// A grid row that was dropped instead of being emitted half-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub index: usize,
    pub category: String,
    pub reason: SkipReason,
}

/// Everything one extraction produced: the timesheet returned to the caller
/// and the rows that were left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub timesheet: Timesheet,
    pub skipped: Vec<SkippedRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_hours_serialize_as_fourteen_flat_keys() {
        let daily = DailyHours {
            hours: [8.0, 7.5, 0.0, 0.0, 0.0, 0.0, 0.0],
            ids: [101, 102, 0, 0, 0, 0, 0],
        };
        let value = serde_json::to_value(&daily).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 14);
        for slot in 1..=7 {
            assert!(object.contains_key(&format!("D{slot}")));
            assert!(object.contains_key(&format!("D{slot}ID")));
        }
        assert_eq!(object["D2"], 7.5);
        assert_eq!(object["D2ID"], 102);
        assert_eq!(daily.total(), 15.5);
    }
}
