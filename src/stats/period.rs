use std::fmt::Display;

use anyhow::{anyhow, Result};
use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc, Weekday,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::overlap::Interval;

#[derive(
    Debug, Clone, Copy, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Daily,
        Period::Weekly,
        Period::Monthly,
        Period::Yearly,
    ];
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Daily => write!(f, "daily"),
            Period::Weekly => write!(f, "weekly"),
            Period::Monthly => write!(f, "monthly"),
            Period::Yearly => write!(f, "yearly"),
        }
    }
}

/// First day of the week. Stands in for the locale's calendar rules.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
    Saturday,
}

impl From<WeekStart> for Weekday {
    fn from(value: WeekStart) -> Self {
        match value {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Saturday => Weekday::Sat,
        }
    }
}

impl Display for WeekStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeekStart::Monday => write!(f, "monday"),
            WeekStart::Sunday => write!(f, "sunday"),
            WeekStart::Saturday => write!(f, "saturday"),
        }
    }
}

/// The range of time a period covers around a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub period: Period,
    /// Local calendar date the bucket starts on.
    pub start_date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Bucket {
    pub fn contains(&self, moment: DateTime<Utc>) -> bool {
        self.interval().contains(moment)
    }

    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }
}

/// Calendar rules used to cut time into buckets: which time zone days are counted in and which
/// day weeks start on.
#[derive(Debug, Clone)]
pub struct Calendar<Tz: TimeZone> {
    timezone: Tz,
    week_start: Weekday,
}

impl<Tz: TimeZone> Calendar<Tz> {
    pub fn new(timezone: Tz, week_start: impl Into<Weekday>) -> Self {
        Self {
            timezone,
            week_start: week_start.into(),
        }
    }

    /// Local calendar date of `moment`.
    pub fn local_date(&self, moment: DateTime<Utc>) -> NaiveDate {
        moment.with_timezone(&self.timezone).date_naive()
    }

    /// Bucket of `period` that contains `reference`.
    pub fn bucket(&self, period: Period, reference: DateTime<Utc>) -> Result<Bucket> {
        self.bucket_for_date(period, self.local_date(reference))
    }

    pub fn bucket_for_date(&self, period: Period, date: NaiveDate) -> Result<Bucket> {
        let start_date = match period {
            Period::Daily => Some(date),
            Period::Weekly => {
                let since_start = (date.weekday().num_days_from_monday() + 7
                    - self.week_start.num_days_from_monday())
                    % 7;
                date.checked_sub_signed(Duration::days(since_start.into()))
            }
            Period::Monthly => date.with_day(1),
            Period::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        };
        let start_date =
            start_date.ok_or_else(|| anyhow!("Can't find {period} bucket start for {date}"))?;

        let end_date = match period {
            Period::Daily => start_date.succ_opt(),
            Period::Weekly => start_date.checked_add_signed(Duration::days(7)),
            Period::Monthly => start_date.checked_add_months(Months::new(1)),
            Period::Yearly => start_date.checked_add_months(Months::new(12)),
        };
        let end_date =
            end_date.ok_or_else(|| anyhow!("Can't find {period} bucket end for {date}"))?;

        Ok(Bucket {
            period,
            start_date,
            start: self.day_start(start_date)?,
            end: self.day_start(end_date)?,
        })
    }

    /// First instant of a local day. Some zones skip midnight when switching to summer time, in
    /// which case the day starts at 01:00.
    pub fn day_start(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        [NaiveTime::MIN, NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN)]
            .into_iter()
            .find_map(|time| {
                self.timezone
                    .from_local_datetime(&date.and_time(time))
                    .earliest()
            })
            .map(|v| v.with_timezone(&Utc))
            .ok_or_else(|| anyhow!("{date} has no valid start in the configured time zone"))
    }
}
