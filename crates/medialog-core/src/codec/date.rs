//! Conversion between stored dates and their spreadsheet form
//!
//! Records keep dates as `YYYY-MM-DD` strings, with the empty string meaning
//! "no date". Spreadsheets show `MM-DD-YYYY`, with `N/A` meaning "no date".

use chrono::NaiveDate;

/// Placeholder written into a cell that has no value
pub const ABSENT: &str = "N/A";

const INTERNAL_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_FORMAT: &str = "%m-%d-%Y";

/// Parse a stored date, ignoring empty or malformed values
pub fn parse_internal(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(date, INTERNAL_FORMAT).ok()
}

/// `2020-05-01` -> `05-01-2020`; empty or malformed -> `N/A`
pub fn to_display(date: &str) -> String {
    match parse_internal(date) {
        Some(d) => d.format(DISPLAY_FORMAT).to_string(),
        None => ABSENT.to_string(),
    }
}

/// `05-01-2020` -> `2020-05-01`; `N/A` or empty -> empty.
///
/// Already-normalized `YYYY-MM-DD` input is accepted as well.
pub fn to_internal(display: &str) -> String {
    let value = display.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ABSENT) {
        return String::new();
    }

    NaiveDate::parse_from_str(value, DISPLAY_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, INTERNAL_FORMAT))
        .map(|d| d.format(INTERNAL_FORMAT).to_string())
        .unwrap_or_else(|_| {
            tracing::debug!("Unrecognized date '{}', treating as absent", value);
            String::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_display() {
        assert_eq!(to_display("2020-05-01"), "05-01-2020");
        assert_eq!(to_display("1999-12-31"), "12-31-1999");
        assert_eq!(to_display(""), "N/A");
        assert_eq!(to_display("not a date"), "N/A");
    }

    #[test]
    fn test_to_internal() {
        assert_eq!(to_internal("05-01-2020"), "2020-05-01");
        assert_eq!(to_internal(" 12-31-1999 "), "1999-12-31");
        assert_eq!(to_internal("N/A"), "");
        assert_eq!(to_internal("n/a"), "");
        assert_eq!(to_internal(""), "");
        assert_eq!(to_internal("2019-11-03"), "2019-11-03");
        assert_eq!(to_internal("13-45-2020"), "");
        assert_eq!(to_internal("sometime in 2020"), "");
    }

    #[test]
    fn test_display_then_internal() {
        for date in ["2019-11-03", "2001-01-01", "2024-02-29"] {
            assert_eq!(to_internal(&to_display(date)), date);
        }
    }
}
