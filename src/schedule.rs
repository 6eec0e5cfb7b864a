use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use thiserror::Error;

/// Wire format for every date crossing the API or the database, e.g. `20240115`.
pub const DATE_FORMAT: &str = "%Y%m%d";

// Largest interval accepted by a daily rule
const MAX_DAY_INTERVAL: u32 = 400;

// Last year that still fits in eight digits
const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RepeatError {
    #[error("repeat rule not specified")]
    RepeatRuleMissing,
    #[error("invalid date format")]
    InvalidDateFormat,
    #[error("invalid daily repeat format")]
    InvalidDailyRuleArity,
    #[error("invalid day count")]
    InvalidDayCount,
    #[error("invalid yearly repeat format")]
    InvalidYearlyRuleArity,
    #[error("unsupported repeat format")]
    UnsupportedRepeatKind,
}

/// Parse a `YYYYMMDD` string. Only exactly eight digits naming a real
/// calendar day are accepted.
pub fn parse_date(s: &str) -> Result<NaiveDate, RepeatError> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RepeatError::InvalidDateFormat);
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| RepeatError::InvalidDateFormat)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// A repeat expression with no tokens means "one-off".
pub fn is_blank(repeat: &str) -> bool {
    repeat.trim().is_empty()
}

// A parsed repeat expression, e.g. "d 7" or "y"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatRule {
    // Every N calendar days
    Daily(u32),
    // Same month and day every year
    Yearly,
}

impl FromStr for RepeatRule {
    type Err = RepeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();

        match parts.as_slice() {
            [] => Err(RepeatError::RepeatRuleMissing),
            ["d", days] => {
                let days: u32 = days.parse().map_err(|_| RepeatError::InvalidDayCount)?;
                if (1..=MAX_DAY_INTERVAL).contains(&days) {
                    Ok(RepeatRule::Daily(days))
                } else {
                    Err(RepeatError::InvalidDayCount)
                }
            }
            ["d", ..] => Err(RepeatError::InvalidDailyRuleArity),
            ["y"] => Ok(RepeatRule::Yearly),
            ["y", ..] => Err(RepeatError::InvalidYearlyRuleArity),
            _ => Err(RepeatError::UnsupportedRepeatKind),
        }
    }
}

impl RepeatRule {
    /// Apply the rule to `stored` at least once, then keep applying it while
    /// the candidate is still before `reference`.
    ///
    /// `Daily(1)` is the exception: it always yields `stored + 1 day`, even
    /// when that is still in the past.
    ///
    /// Returns `None` if the result falls off the calendar.
    pub fn advance(self, stored: NaiveDate, reference: NaiveDate) -> Option<NaiveDate> {
        match self {
            RepeatRule::Daily(1) => stored.checked_add_days(Days::new(1)),
            RepeatRule::Daily(interval) => {
                let interval = u64::from(interval);
                let first = stored.checked_add_days(Days::new(interval))?;
                if first >= reference {
                    return Some(first);
                }

                // Jump straight to the first step landing on or after the reference
                let behind = reference.signed_duration_since(first).num_days().unsigned_abs();
                let steps = behind.div_ceil(interval);
                first.checked_add_days(Days::new(steps * interval))
            }
            RepeatRule::Yearly => {
                let mut next = add_year(stored)?;
                while next < reference {
                    next = add_year(next)?;
                }
                Some(next)
            }
        }
    }
}

fn add_year(date: NaiveDate) -> Option<NaiveDate> {
    let year = date.year().checked_add(1)?;
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        // 29 February overflows into 1 March
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
}

/// Compute the next due date for a task stored on `stored` with the given
/// repeat expression, relative to `reference` ("today").
///
/// Checks run in a fixed order: missing rule, stored date, then the rule
/// itself. An empty rule is always an error here; callers handle one-off
/// tasks themselves.
pub fn next_date(reference: NaiveDate, stored: &str, repeat: &str) -> Result<String, RepeatError> {
    if is_blank(repeat) {
        return Err(RepeatError::RepeatRuleMissing);
    }

    let stored = parse_date(stored)?;
    let rule: RepeatRule = repeat.parse()?;

    rule.advance(stored, reference)
        .filter(|next| next.year() <= MAX_YEAR)
        .map(format_date)
        .ok_or(RepeatError::InvalidDateFormat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_lands_on_reference() {
        let result = next_date(date(2024, 1, 15), "20240110", "d 5").unwrap();
        assert_eq!(result, "20240115");
    }

    #[test]
    fn test_daily_one_never_catches_up() {
        let result = next_date(date(2024, 1, 15), "20240110", "d 1").unwrap();
        assert_eq!(result, "20240111");

        let result = next_date(date(2024, 1, 15), "19991231", "d 1").unwrap();
        assert_eq!(result, "20000101");
    }

    #[test]
    fn test_yearly_already_at_reference() {
        let result = next_date(date(2024, 1, 15), "20230115", "y").unwrap();
        assert_eq!(result, "20240115");
    }

    #[test]
    fn test_daily_rejects_zero() {
        let result = next_date(date(2024, 1, 15), "20240110", "d 0");
        assert_eq!(result, Err(RepeatError::InvalidDayCount));
    }

    #[test]
    fn test_day_count_bounds() {
        let reference = date(2024, 1, 26);

        for bad in ["d 401", "d -3", "d abc", "d 1.5", "d 100000000000"] {
            assert_eq!(
                next_date(reference, "20240101", bad),
                Err(RepeatError::InvalidDayCount),
                "{bad}"
            );
        }

        assert_eq!(next_date(reference, "20240101", "d 400").unwrap(), "20250204");
    }

    #[test]
    fn test_rule_arity() {
        let reference = date(2024, 1, 26);

        assert_eq!(next_date(reference, "20240101", "d"), Err(RepeatError::InvalidDailyRuleArity));
        assert_eq!(next_date(reference, "20240101", "d 1 2"), Err(RepeatError::InvalidDailyRuleArity));
        assert_eq!(next_date(reference, "20240101", "y 1"), Err(RepeatError::InvalidYearlyRuleArity));
    }

    #[test]
    fn test_unsupported_kinds() {
        let reference = date(2024, 1, 26);

        for rule in ["w 1", "m 13", "x", "D 5", "Y"] {
            assert_eq!(
                next_date(reference, "20240101", rule),
                Err(RepeatError::UnsupportedRepeatKind),
                "{rule}"
            );
        }
    }

    #[test]
    fn test_missing_rule_checked_before_date() {
        let reference = date(2024, 1, 26);

        assert_eq!(next_date(reference, "20240101", ""), Err(RepeatError::RepeatRuleMissing));
        assert_eq!(next_date(reference, "garbage", ""), Err(RepeatError::RepeatRuleMissing));
        assert_eq!(next_date(reference, "20240101", "   "), Err(RepeatError::RepeatRuleMissing));
    }

    #[test]
    fn test_date_checked_before_rule() {
        let result = next_date(date(2024, 1, 26), "2024-01-01", "m 13");
        assert_eq!(result, Err(RepeatError::InvalidDateFormat));
    }

    #[test]
    fn test_invalid_dates() {
        for bad in ["", "2024011", "202401155", "2024-1-15", "20241301", "20240230", "+2024011", "２０２４０１１５"] {
            assert_eq!(parse_date(bad), Err(RepeatError::InvalidDateFormat), "{bad}");
        }
        assert_eq!(parse_date("20240229").unwrap(), date(2024, 2, 29));
    }

    #[test]
    fn test_known_vectors() {
        let reference = date(2024, 1, 26);
        let cases = [
            ("20240126", "y", "20250126"),
            ("20240113", "d 7", "20240127"),
            ("20240120", "d 20", "20240209"),
            ("20240202", "d 30", "20240303"),
            ("20231225", "y", "20241225"),
            ("16890220", "y", "20240220"),
            ("20250701", "y", "20260701"),
            ("20240126", "d 1", "20240127"),
        ];

        for (stored, rule, expected) in cases {
            assert_eq!(next_date(reference, stored, rule).unwrap(), expected, "{stored} {rule}");
        }
    }

    #[test]
    fn test_future_date_still_advances_once() {
        let result = next_date(date(2024, 1, 15), "20240301", "d 7").unwrap();
        assert_eq!(result, "20240308");

        let result = next_date(date(2024, 1, 15), "20240301", "y").unwrap();
        assert_eq!(result, "20250301");
    }

    #[test]
    fn test_daily_result_is_first_step_on_or_after_reference() {
        let stored = date(2023, 3, 17);
        let references = [date(2023, 3, 18), date(2024, 1, 15), date(2026, 12, 31)];

        for reference in references {
            for n in (2..=400).step_by(7) {
                let result = next_date(reference, "20230317", &format!("d {n}")).unwrap();
                let result = parse_date(&result).unwrap();
                let elapsed = result.signed_duration_since(stored).num_days();

                assert!(result >= reference, "d {n} from {reference}");
                assert_eq!(elapsed % i64::from(n), 0, "d {n} from {reference}");
                assert!(elapsed > 0);
                // Never overshoots by a whole interval unless the first step already does
                if elapsed > i64::from(n) {
                    assert!(result - chrono::Duration::days(i64::from(n)) < reference);
                }
            }
        }
    }

    #[test]
    fn test_yearly_keeps_month_and_day() {
        let reference = date(2024, 1, 15);

        for stored in ["19990704", "20231231", "20240115", "20240116", "20000101"] {
            let stored_date = parse_date(stored).unwrap();
            let result = parse_date(&next_date(reference, stored, "y").unwrap()).unwrap();

            assert!(result >= reference);
            assert!(result.year() > stored_date.year());
            assert_eq!(result.month(), stored_date.month());
            assert_eq!(result.day(), stored_date.day());
        }
    }

    #[test]
    fn test_yearly_leap_day_rolls_into_march() {
        assert_eq!(next_date(date(2021, 1, 1), "20200229", "y").unwrap(), "20210301");
        assert_eq!(next_date(date(2024, 6, 1), "20200229", "y").unwrap(), "20250301");
    }

    #[test]
    fn test_result_must_fit_wire_format() {
        let result = next_date(date(9999, 12, 31), "99991231", "y");
        assert_eq!(result, Err(RepeatError::InvalidDateFormat));
    }

    #[test]
    fn test_rule_parsing() {
        assert_eq!("d 7".parse::<RepeatRule>(), Ok(RepeatRule::Daily(7)));
        assert_eq!("  d   12 ".parse::<RepeatRule>(), Ok(RepeatRule::Daily(12)));
        assert_eq!("y".parse::<RepeatRule>(), Ok(RepeatRule::Yearly));
        assert_eq!("".parse::<RepeatRule>(), Err(RepeatError::RepeatRuleMissing));
    }
}
