use std::collections::HashMap;

use lazy_static::lazy_static;
use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::dom;

lazy_static! {
    static ref ROW_FIELD_REGEX: Regex =
        Regex::new(r"^[A-Za-z_]\w*\[(?P<index>\d+)\]\.(?P<field>\w+)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Decimal,
    Flag,
    Text,
}

/// Types of the per-row hidden fields the portal posts back. Anything not
/// listed here is kept as text.
const FIELD_SCHEMA: &[(&str, FieldKind)] = &[
    ("AppUserID", FieldKind::Integer),
    ("ProjectID", FieldKind::Integer),
    ("BudgetID", FieldKind::Integer),
    ("TTBudgetAssignmentID", FieldKind::Integer),
    ("TTHeaderID", FieldKind::Integer),
    ("D1ID", FieldKind::Integer),
    ("D2ID", FieldKind::Integer),
    ("D3ID", FieldKind::Integer),
    ("D4ID", FieldKind::Integer),
    ("D5ID", FieldKind::Integer),
    ("D6ID", FieldKind::Integer),
    ("D7ID", FieldKind::Integer),
    ("D1", FieldKind::Decimal),
    ("D2", FieldKind::Decimal),
    ("D3", FieldKind::Decimal),
    ("D4", FieldKind::Decimal),
    ("D5", FieldKind::Decimal),
    ("D6", FieldKind::Decimal),
    ("D7", FieldKind::Decimal),
    ("MonthlyUsed", FieldKind::Decimal),
    ("MaxHrs", FieldKind::Decimal),
    ("IsApproved", FieldKind::Flag),
    ("IsSubmitted", FieldKind::Flag),
    ("IsHidden", FieldKind::Flag),
    ("HourlyTypeName", FieldKind::Text),
];

pub fn field_kind(field: &str) -> FieldKind {
    FIELD_SCHEMA
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, kind)| *kind)
        .unwrap_or(FieldKind::Text)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Decimal(f64),
    Flag(bool),
    Text(String),
}

impl FieldValue {
    /// Coerces a raw attribute value per the schema. `None` when the value
    /// does not fit the field's type.
    pub fn coerce(kind: FieldKind, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match kind {
            FieldKind::Integer => raw.parse::<i64>().ok().map(FieldValue::Integer),
            FieldKind::Decimal => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(FieldValue::Decimal),
            FieldKind::Flag => parse_flag(raw).map(FieldValue::Flag),
            FieldKind::Text => Some(FieldValue::Text(raw.to_string())),
        }
    }
}

/// The portal writes booleans as `True` / `False`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Hidden inputs named `<list>[<row>].<field>`, grouped by row index. Only
/// the values actually present are stored; lookups supply the defaults.
#[derive(Debug, Clone, Default)]
pub struct HiddenFieldIndex {
    rows: HashMap<usize, HashMap<String, FieldValue>>,
}

impl HiddenFieldIndex {
    pub fn build(document: &Handle) -> Self {
        let mut index = HiddenFieldIndex::default();
        let hidden_inputs = dom::find_all(document, |h| {
            dom::is_tag(h, "input")
                && dom::attr(h, "type")
                    .map(|t| t.eq_ignore_ascii_case("hidden"))
                    .unwrap_or(false)
        });

        for input in hidden_inputs {
            let Some(name) = dom::attr(&input, "name") else {
                continue;
            };
            let value = dom::attr(&input, "value").unwrap_or_default();
            index.insert(&name, &value);
        }
        index
    }

    /// Records one field by its full input name. Names that do not encode a
    /// row, and values that do not coerce, are ignored.
    pub fn insert(&mut self, input_name: &str, raw_value: &str) {
        let Some(caps) = ROW_FIELD_REGEX.captures(input_name.trim()) else {
            return;
        };
        let Ok(row) = caps["index"].parse::<usize>() else {
            return;
        };
        let field = &caps["field"];

        if let Some(value) = FieldValue::coerce(field_kind(field), raw_value) {
            self.rows
                .entry(row)
                .or_default()
                .insert(field.to_string(), value);
        }
    }

    pub fn get(&self, row: usize, field: &str) -> Option<&FieldValue> {
        self.rows.get(&row).and_then(|fields| fields.get(field))
    }

    pub fn integer(&self, row: usize, field: &str) -> i64 {
        match self.get(row, field) {
            Some(FieldValue::Integer(v)) => *v,
            _ => 0,
        }
    }

    pub fn decimal(&self, row: usize, field: &str) -> f64 {
        match self.get(row, field) {
            Some(FieldValue::Decimal(v)) => *v,
            Some(FieldValue::Integer(v)) => *v as f64,
            _ => 0.0,
        }
    }

    pub fn flag(&self, row: usize, field: &str) -> bool {
        matches!(self.get(row, field), Some(FieldValue::Flag(true)))
    }

    pub fn text(&self, row: usize, field: &str) -> String {
        match self.get(row, field) {
            Some(FieldValue::Text(v)) => v.clone(),
            _ => String::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_drives_coercion() {
        let mut index = HiddenFieldIndex::default();
        index.insert("ProjectTimeSheetList[2].ProjectID", "4417");
        index.insert("ProjectTimeSheetList[2].MaxHrs", "40.00");
        index.insert("ProjectTimeSheetList[2].IsSubmitted", "True");
        index.insert("ProjectTimeSheetList[2].IsApproved", "False");
        index.insert("ProjectTimeSheetList[2].HourlyTypeName", " Weekly ");
        index.insert("ProjectTimeSheetList[2].D3ID", "98812");

        assert_eq!(index.integer(2, "ProjectID"), 4417);
        assert_eq!(index.decimal(2, "MaxHrs"), 40.0);
        assert!(index.flag(2, "IsSubmitted"));
        assert_eq!(index.get(2, "IsApproved"), Some(&FieldValue::Flag(false)));
        assert_eq!(index.text(2, "HourlyTypeName"), "Weekly");
        assert_eq!(index.integer(2, "D3ID"), 98812);
    }

    #[test]
    fn missing_values_default_only_at_lookup() {
        let mut index = HiddenFieldIndex::default();
        index.insert("ProjectTimeSheetList[0].BudgetID", "");
        index.insert("ProjectTimeSheetList[0].IsApproved", "maybe");
        index.insert("WeekEndingDay", "1/16/2026");

        assert_eq!(index.get(0, "BudgetID"), None);
        assert_eq!(index.get(0, "IsApproved"), None);
        assert_eq!(index.row_count(), 0);
        assert_eq!(index.integer(0, "BudgetID"), 0);
        assert!(!index.flag(0, "IsApproved"));
        assert_eq!(index.text(7, "HourlyTypeName"), "");
    }

    #[test]
    fn unknown_fields_stay_text() {
        assert_eq!(field_kind("Comment"), FieldKind::Text);
        let mut index = HiddenFieldIndex::default();
        index.insert("Rows[1].Comment", "42");
        assert_eq!(index.get(1, "Comment"), Some(&FieldValue::Text("42".to_string())));
    }

    #[test]
    fn builds_from_hidden_inputs_only() {
        let dom = dom::load(
            r#"<form>
                <input type="hidden" name="ProjectTimeSheetList[0].ProjectID" value="10">
                <input type="HIDDEN" name="ProjectTimeSheetList[1].ProjectID" value="11">
                <input type="text" name="ProjectTimeSheetList[0].D1" value="8">
                <input type="hidden" name="AppUserID" value="1641">
            </form>"#,
        )
        .unwrap();
        let index = HiddenFieldIndex::build(&dom.document);

        assert_eq!(index.row_count(), 2);
        assert_eq!(index.integer(0, "ProjectID"), 10);
        assert_eq!(index.integer(1, "ProjectID"), 11);
        assert_eq!(index.get(0, "D1"), None);
    }
}
