use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, EngineError, ResultEngine};

/// Monthly revenue of one service: sum of confirmed reservation costs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub service_name: String,
    pub total_cost: Amount,
}

/// Returns the half-open UTC range `[first day of month, first day of next month)`.
pub fn month_bounds(year: i32, month: u32) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
    if !(1..=12).contains(&month) {
        return Err(EngineError::InvalidRequest(format!(
            "month must be in 1..=12, got {month}"
        )));
    }
    let (next_year, next_month) = if month == 12 {
        let next_year = year
            .checked_add(1)
            .ok_or_else(|| EngineError::InvalidRequest(format!("year {year} is out of range")))?;
        (next_year, 1)
    } else {
        (year, month + 1)
    };
    let start = first_day(year, month)?;
    let end = first_day(next_year, next_month)?;
    Ok((start, end))
}

fn first_day(year: i32, month: u32) -> ResultEngine<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| EngineError::InvalidRequest(format!("invalid report period {year}-{month}")))
}
