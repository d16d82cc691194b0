//! Policy Resolver: turns an organization's configured thresholds into a
//! lateness/earliness verdict for a concrete instant. Pure functions, no I/O.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::engine::AttendanceEvent;
use crate::model::settings::OrganizationSettings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verdict {
    pub is_late: bool,
    pub is_early: bool,
}

/// Parse the configured IANA zone, failing closed to UTC. A tenant with a
/// broken timezone gets UTC comparisons and a warning in the log; the
/// check-in flow itself must never crash over configuration.
pub fn resolve_zone(settings: &OrganizationSettings) -> Tz {
    match settings.timezone.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(
                tenant_id = settings.tenant_id,
                timezone = %settings.timezone,
                "unrecognized timezone, falling back to UTC"
            );
            Tz::UTC
        }
    }
}

/// The wall-clock time of `at` in the organization's zone.
pub fn local_time(settings: &OrganizationSettings, at: DateTime<Utc>) -> NaiveTime {
    at.with_timezone(&resolve_zone(settings)).time()
}

/// The calendar day of `at` in the organization's zone. This is the day key
/// for every session decision; kiosks and staff phones may sit in other
/// zones.
pub fn local_day(settings: &OrganizationSettings, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&resolve_zone(settings)).date_naive()
}

/// Evaluate the lateness/earliness thresholds for one event at one instant.
///
/// Check-in at exactly `lateness_time` is on time (strict `>`); check-out at
/// exactly `early_departure_time` is a full day (strict `<`). The verdict is
/// stamped onto the record at write time and never recomputed when settings
/// change.
pub fn verdict(
    settings: &OrganizationSettings,
    at: DateTime<Utc>,
    event: AttendanceEvent,
) -> Verdict {
    let t = local_time(settings, at);
    match event {
        AttendanceEvent::CheckIn => Verdict {
            is_late: t > settings.lateness_time,
            is_early: false,
        },
        AttendanceEvent::CheckOut => Verdict {
            is_late: false,
            is_early: t < settings.early_departure_time,
        },
    }
}
