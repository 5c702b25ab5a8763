//! Month grid rendering for the `month` subcommand.

use chrono::{Datelike as _, NaiveDate};
use precinct_map_schedule::{ScheduleDefinition, ScheduleError, compute_month, month_summary};

/// Renders a Sunday-first month grid. Off days are bracketed.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidMonth`] for an invalid year/month.
pub fn render_month(
    year: i32,
    month: u32,
    schedule: &ScheduleDefinition,
) -> Result<String, ScheduleError> {
    let days = compute_month(year, month, schedule)?;
    let summary = month_summary(year, month, schedule)?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(ScheduleError::InvalidMonth { year, month })?;

    let mut out = format!("{} {year}-{month:02}\n", schedule.group_id());
    out.push_str(" Sun  Mon  Tue  Wed  Thu  Fri  Sat\n");

    let lead = first.weekday().num_days_from_sunday() as usize;
    out.push_str(&"     ".repeat(lead));

    for (column, (day, off)) in (lead..).zip(&days) {
        out.push_str(&if *off {
            format!("[{day:>2}]")
        } else {
            format!(" {day:>2} ")
        });
        out.push(if column % 7 == 6 { '\n' } else { ' ' });
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }

    out.push_str(&format!(
        "{} duty, {} off\n",
        summary.duty_days, summary.off_days
    ));

    Ok(out)
}
