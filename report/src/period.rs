//! Reporting period: a closed range of UTC calendar days.
//!
//! Bounds are inclusive. The period covers `start 00:00:00.000Z` through
//! `end 23:59:59.999Z`, and the report's `generated_at` is pinned to the last
//! instant of the period so that no wall-clock value ever reaches the body.

use aer_kernel::schema::is_date;
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};

/// Error validating period labels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    /// A bound is not a real `YYYY-MM-DD` date.
    #[error("period {field} is not a YYYY-MM-DD date: {value:?}")]
    InvalidDate { field: &'static str, value: String },
    /// `start` is after `end`.
    #[error("period start {start} is after end {end}")]
    Inverted { start: String, end: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_bound(field: &'static str, value: &str) -> Result<NaiveDate, PeriodError> {
    let invalid = || PeriodError::InvalidDate {
        field,
        value: value.to_string(),
    };
    if !is_date(value) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())
}

impl ReportPeriod {
    /// Validate and build a period from `YYYY-MM-DD` labels.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError`] if either label is not a date or if the range
    /// is inverted.
    pub fn parse(start: &str, end: &str) -> Result<Self, PeriodError> {
        let start_date = parse_bound("start", start)?;
        let end_date = parse_bound("end", end)?;
        if start_date > end_date {
            return Err(PeriodError::Inverted {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            start: start_date,
            end: end_date,
        })
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn start_label(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    #[must_use]
    pub fn end_label(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }

    /// First instant of the period (`start 00:00:00.000Z`).
    #[must_use]
    pub fn first_instant(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.start.and_time(NaiveTime::MIN))
    }

    /// Last instant of the period (`end 23:59:59.999Z`).
    #[must_use]
    pub fn last_instant(&self) -> DateTime<Utc> {
        let end_of_day =
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        Utc.from_utc_datetime(&self.end.and_time(end_of_day))
    }

    /// `true` if `ts` falls inside the period, bounds included.
    #[must_use]
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.first_instant() && *ts <= self.last_instant()
    }

    /// The report's `generated_at` value, derived from the period end.
    #[must_use]
    pub fn generated_at(&self) -> String {
        format_instant(&self.last_instant())
    }
}

/// Render an instant in the report's one timestamp form:
/// `YYYY-MM-DDTHH:MM:SS.mmmZ`.
#[must_use]
pub fn format_instant(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
