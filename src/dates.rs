use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::config::DateOrder;
use crate::error::{ExtractError, ExtractResult};
use crate::model::WeekDay;

const DATE_SEPARATORS: [char; 3] = ['-', '.', '/'];

/// Parses a loosely formatted date such as `1/16/2026`, `16.01.2026` or
/// `2026-01-16`.
///
/// A first component above 31 can only be a year, so the date is read
/// year-first. Otherwise `order` decides between month-first and day-first;
/// both readings are valid for dates like `3/4/2025`, so the caller has to
/// say which one it means.
pub fn normalize(raw: &str, order: DateOrder) -> ExtractResult<NaiveDate> {
    let invalid = || ExtractError::InvalidDateFormat(raw.trim().to_string());

    let parts = raw
        .trim()
        .split(&DATE_SEPARATORS[..])
        .map(|part| {
            let part = part.trim();
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            part.parse::<u32>().ok()
        })
        .collect::<Option<Vec<u32>>>()
        .ok_or_else(invalid)?;

    let &[first, second, third] = parts.as_slice() else {
        return Err(invalid());
    };

    let (year, month, day) = if first > 31 {
        (first, second, third)
    } else {
        match order {
            DateOrder::MonthFirst => (third, first, second),
            DateOrder::DayFirst => (third, second, first),
        }
    };

    let year = i32::try_from(year).map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Renders a date the way the portal expects it in its `dt` parameter.
pub fn portal_format(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.month(), date.day(), date.year())
}

/// The seven days ending on `week_ending`, oldest first.
pub fn week_of(week_ending: NaiveDate) -> Vec<WeekDay> {
    let start = week_start(week_ending);
    (0..7)
        .map(|offset| {
            let date = start + Duration::days(offset);
            WeekDay {
                date,
                label: short_weekday(date.weekday()).to_string(),
                day_number: date.day(),
            }
        })
        .collect()
}

pub fn week_start(week_ending: NaiveDate) -> NaiveDate {
    week_ending - Duration::days(6)
}

fn short_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accepts_every_separator() {
        assert_eq!(normalize("1/16/2026", DateOrder::MonthFirst), Ok(ymd(2026, 1, 16)));
        assert_eq!(normalize("1-16-2026", DateOrder::MonthFirst), Ok(ymd(2026, 1, 16)));
        assert_eq!(normalize(" 16.1.2026 ", DateOrder::DayFirst), Ok(ymd(2026, 1, 16)));
    }

    #[test]
    fn year_first_input_is_read_reversed() {
        assert_eq!(normalize("2026-01-16", DateOrder::MonthFirst), Ok(ymd(2026, 1, 16)));
        assert_eq!(normalize("2026-01-16", DateOrder::DayFirst), Ok(ymd(2026, 1, 16)));
    }

    #[test]
    fn first_component_above_31_that_is_not_a_year_is_rejected() {
        assert!(matches!(
            normalize("35/1/2025", DateOrder::DayFirst),
            Err(ExtractError::InvalidDateFormat(_))
        ));
    }

    #[test]
    fn plausible_first_component_is_not_swapped() {
        assert_eq!(normalize("12-25-2025", DateOrder::MonthFirst), Ok(ymd(2025, 12, 25)));
        // day-first reading of the same text has month 25
        assert!(normalize("12-25-2025", DateOrder::DayFirst).is_err());
    }

    #[test]
    fn ambiguous_dates_follow_the_requested_order() {
        assert_eq!(normalize("3/4/2025", DateOrder::MonthFirst), Ok(ymd(2025, 3, 4)));
        assert_eq!(normalize("3/4/2025", DateOrder::DayFirst), Ok(ymd(2025, 4, 3)));
    }

    #[test]
    fn wrong_component_count_is_invalid() {
        for raw in ["", "1/16", "1/16/2026/1", "1//2026", "Jan/16/2026", "1/16/20x6"] {
            assert!(
                matches!(normalize(raw, DateOrder::MonthFirst), Err(ExtractError::InvalidDateFormat(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn portal_format_drops_leading_zeros() {
        assert_eq!(portal_format(ymd(2026, 1, 6)), "1/6/2026");
    }

    #[test]
    fn week_is_seven_consecutive_days_ending_on_the_date() {
        let days = week_of(ymd(2026, 1, 2));

        assert_eq!(days.len(), 7);
        for (i, day) in days.iter().enumerate() {
            assert_eq!(day.date, days[0].date + Duration::days(i as i64));
        }
        assert_eq!(days[0].date, ymd(2025, 12, 27));
        assert_eq!(days[0].label, "Sat");
        assert_eq!(days[0].day_number, 27);
        assert_eq!(days[6].label, "Fri");
        assert_eq!(days[6].day_number, 2);
    }
}
