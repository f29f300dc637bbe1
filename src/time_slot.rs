//! Time bucketing for sale records.
//!
//! Slots are one hour wide and labelled `HH:00-HH:00`. The end hour wraps
//! modulo 24, so the last slot of the day is `23:00-00:00`.

use chrono::{
    DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};

use crate::error::{Result, SalesError};

const DATE_FORMAT: &str = "%Y-%m-%d";
const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
/// Upper bound on how far a DST gap can push a wall-clock time.
const MAX_GAP_MINUTES: i64 = 180;

/// Label for the slot starting at `start_hour`.
pub fn slot_label(start_hour: u32) -> String {
    let start = start_hour % 24;
    format!("{:02}:00-{:02}:00", start, (start + 1) % 24)
}

/// Slot containing `instant`, evaluated in the instant's own time zone.
pub fn time_slot_of<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    slot_label(instant.hour())
}

/// Slot containing `instant` on the local wall clock.
pub fn local_time_slot(instant: &DateTime<Utc>) -> String {
    time_slot_of(&instant.with_timezone(&Local))
}

/// Inclusive `[00:00:00.000, 23:59:59.999]` range of `date` in `tz`.
pub fn day_bounds_in<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> (DateTime<Tz>, DateTime<Tz>) {
    let midnight = date.and_time(NaiveTime::MIN);
    let last_ms = midnight + Duration::milliseconds(MS_PER_DAY - 1);
    (
        resolve_wall_clock(tz, midnight, true),
        resolve_wall_clock(tz, last_ms, false),
    )
}

/// Inclusive local-midnight-to-midnight range of `date`.
pub fn day_bounds_of(date: NaiveDate) -> (DateTime<Local>, DateTime<Local>) {
    day_bounds_in(date, &Local)
}

/// Map a wall-clock time to an instant. Ambiguous times take the earliest
/// (start of day) or latest (end of day) mapping; times inside a DST gap
/// move toward the inside of the day until they exist.
fn resolve_wall_clock<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime, earliest: bool) -> DateTime<Tz> {
    let step = if earliest {
        Duration::minutes(1)
    } else {
        Duration::minutes(-1)
    };
    let mut candidate = naive;
    for _ in 0..=MAX_GAP_MINUTES {
        let mapped = tz.from_local_datetime(&candidate);
        let resolved = if earliest {
            mapped.earliest()
        } else {
            mapped.latest()
        };
        if let Some(instant) = resolved {
            return instant;
        }
        candidate += step;
    }
    tz.from_utc_datetime(&naive)
}

/// `YYYY-MM-DD`, zero padded.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| SalesError::Validation(format!("날짜 형식이 올바르지 않습니다: {raw}")))
}

/// Today's calendar date on the local wall clock.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Fixed business-hour slots `[open_hour, close_hour)` used by the
/// printable report so empty hours stay visible.
pub fn business_slots(open_hour: u32, close_hour: u32) -> Vec<String> {
    (open_hour..close_hour).map(slot_label).collect()
}
