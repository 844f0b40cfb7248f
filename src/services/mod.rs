//! Business services: the orchestration core, the per-entity planning rules
//! and the adapters around external collaborators.

pub mod account;
pub mod broadcaster;
pub mod coj;
pub mod forms;
pub mod gmc;
pub mod history;
pub mod ltft;
pub mod messaging;
pub mod notification;
pub mod placement;
pub mod programme;
pub mod reference;
pub mod user_directory;

use chrono::{ DateTime, NaiveDate, NaiveTime, TimeZone, Utc };
use chrono_tz::Tz;

/// Milestone fire time: local start-of-day of `start - days_before`, in UTC.
///
/// The offset is applied to the calendar date before localization so the
/// result is always a true local midnight, whatever DST did in between.
pub fn milestone_fire_at(start: NaiveDate, days_before: i64, timezone: Tz) -> DateTime<Utc> {
    let date = start - chrono::Duration::days(days_before);
    let midnight = date.and_time(NaiveTime::MIN);

    timezone
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| timezone.from_utc_datetime(&midnight))
        .with_timezone(&Utc)
}
