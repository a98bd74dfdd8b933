//! Chart axis labels for each reporting granularity

use crate::models::Granularity;
use chrono::{Datelike, NaiveDate};

/// Clock-hour labels for the daily chart, 2 hours apart
pub const DAILY_LABELS: [&str; 7] = ["8AM", "10AM", "12PM", "2PM", "4PM", "6PM", "8PM"];

/// Weekday labels used when the granularity is not recognized
pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Month abbreviations, January first
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// The weekly axis never has fewer points than this
pub const MIN_WEEKLY_POINTS: usize = 4;

/// Number of months shown on the monthly axis
pub const MONTHLY_POINTS: usize = 6;

/// Week of the month containing `date`, starting at 1 (`ceil(day / 7)`)
pub fn week_of_month(date: NaiveDate) -> usize {
    (date.day() as usize).div_ceil(7)
}

/// Axis labels for a granularity, anchored at `reference`
pub fn labels_for(granularity: Granularity, reference: NaiveDate) -> Vec<String> {
    match granularity {
        Granularity::Daily => DAILY_LABELS.iter().map(|s| s.to_string()).collect(),
        Granularity::Weekly => {
            let weeks = week_of_month(reference).max(MIN_WEEKLY_POINTS);
            (1..=weeks).map(|week| format!("Week {}", week)).collect()
        }
        Granularity::Monthly => {
            let current = reference.month0() as usize;
            (0..MONTHLY_POINTS)
                .rev()
                .map(|back| MONTH_LABELS[(current + 12 - back) % 12].to_string())
                .collect()
        }
    }
}

/// Axis labels for a tab name as stored by the front-end
///
/// Unknown tab names fall back to the seven weekday labels.
pub fn labels_for_tab(tab: &str, reference: NaiveDate) -> Vec<String> {
    match tab.parse::<Granularity>() {
        Ok(granularity) => labels_for(granularity, reference),
        Err(_) => WEEKDAY_LABELS.iter().map(|s| s.to_string()).collect(),
    }
}
