//! Day-by-day reservation view for the `calendar` command.
//!
//! Days are UTC. A reservation appears on every day its half-open
//! `[start, end)` interval touches.

#[cfg(test)]
#[path = "calendar_test.rs"]
mod calendar_test;

use std::fmt::Write as _;

use scheduler_client::net::types::{Reservation, ReservationStatus};
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("time formatting failed: {0}")]
    Format(#[from] time::error::Format),
    #[error("text write failed: {0}")]
    Write(#[from] std::fmt::Error),
}

pub struct CalendarDay<'a> {
    pub date: Date,
    pub entries: Vec<&'a Reservation>,
}

/// Parse a `YYYY-MM-DD` day.
pub fn parse_day(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
}

fn day_bounds(date: Date) -> Option<(OffsetDateTime, OffsetDateTime)> {
    let start = date.midnight().assume_utc();
    let end = start.checked_add(Duration::days(1))?;
    Some((start, end))
}

/// Bucket reservations into `days` consecutive days starting at `from`.
/// Cancelled reservations are dropped unless `include_cancelled` is set.
pub fn group_by_day(reservations: &[Reservation], from: Date, days: u16, include_cancelled: bool) -> Vec<CalendarDay<'_>> {
    (0..days)
        .filter_map(|offset| from.checked_add(Duration::days(i64::from(offset))))
        .filter_map(|date| {
            let (start, end) = day_bounds(date)?;
            let mut entries: Vec<&Reservation> = reservations
                .iter()
                .filter(|r| include_cancelled || r.status != ReservationStatus::Cancelled)
                .filter(|r| r.overlaps(start, end))
                .collect();
            entries.sort_by_key(|r| (r.start_time, r.id));
            Some(CalendarDay { date, entries })
        })
        .collect()
}

/// Render grouped days as plain text.
pub fn render(days: &[CalendarDay<'_>]) -> Result<String, RenderError> {
    let mut out = String::new();
    for day in days {
        let heading = day.date.format(format_description!("[year]-[month]-[day]"))?;
        writeln!(out, "{heading} {}", day.date.weekday())?;
        if day.entries.is_empty() {
            out.push_str("  (no reservations)\n");
            continue;
        }
        for r in &day.entries {
            let start = format_bound(r.start_time, day.date)?;
            let end = format_bound(r.end_time, day.date)?;
            let server = r.server_name.clone().unwrap_or_else(|| format!("server {}", r.server_id));
            let who = r.username.clone().unwrap_or_else(|| format!("user {}", r.user_id));
            writeln!(out, "  {start}-{end}  {server}  #{} {who} {}", r.id, status_label(r.status))?;
        }
    }
    Ok(out)
}

/// `HH:MM` on the same day, otherwise `MM-DD HH:MM`.
fn format_bound(at: OffsetDateTime, day: Date) -> Result<String, time::error::Format> {
    let at = at.to_offset(UtcOffset::UTC);
    if at.date() == day {
        at.format(format_description!("[hour]:[minute]"))
    } else {
        at.format(format_description!("[month]-[day] [hour]:[minute]"))
    }
}

fn status_label(status: ReservationStatus) -> &'static str {
    match status {
        ReservationStatus::Active => "active",
        ReservationStatus::Cancelled => "cancelled",
        ReservationStatus::Completed => "completed",
        ReservationStatus::Expired => "expired",
        ReservationStatus::Unknown => "unknown",
    }
}
