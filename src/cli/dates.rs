use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use chrono_english::parse_date_string;
use clap::CommandFactory;

use crate::config::DateStyle;

use super::Args;

/// Example inputs shown in `--help`.
pub const DATE_EXAMPLES: &str =
    "Examples are \"9:00\", \"yesterday 14:30\", \"1 hour ago\", \"15/03/2025 12:00\"";

/// Parses a human readable moment relative to `now`, e.g. "9:30" or "yesterday 14:00".
pub fn parse_moment(
    value: &str,
    date_style: DateStyle,
    now: DateTime<Local>,
) -> Result<DateTime<Utc>> {
    match parse_date_string(value, now, date_style.into()) {
        Ok(v) => Ok(v.with_timezone(&Utc)),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {value:?}: {e}"),
            )
            .into()),
    }
}

/// Like [parse_moment] but [None] means `now`.
pub fn parse_reference(
    value: Option<&str>,
    date_style: DateStyle,
    now: DateTime<Local>,
) -> Result<DateTime<Utc>> {
    match value {
        Some(v) => parse_moment(v, date_style, now),
        None => Ok(now.with_timezone(&Utc)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Local, TimeZone, Utc};

    use crate::config::DateStyle;

    use super::{parse_moment, parse_reference};

    #[test]
    fn parses_relative_and_absolute_dates() {
        let now = Local.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap();

        let ago = parse_moment("1 hour ago", DateStyle::Uk, now).unwrap();
        assert_eq!(ago, now.with_timezone(&Utc) - Duration::hours(1));

        let uk = parse_moment("05/03/2025", DateStyle::Uk, now).unwrap();
        let us = parse_moment("03/05/2025", DateStyle::Us, now).unwrap();
        assert_eq!(uk, us);

        assert!(parse_moment("not a date at all", DateStyle::Uk, now).is_err());
    }

    #[test]
    fn missing_reference_is_now() {
        let now = Local.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(
            parse_reference(None, DateStyle::Uk, now).unwrap(),
            now.with_timezone(&Utc)
        );
    }
}
