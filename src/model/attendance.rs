use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// How the staff member identified themselves at the kiosk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CheckInMethod {
    Manual,
    Qr,
    Face,
    Fingerprint,
}

/// One attendance row per `(tenant_id, staff_id, date)`. `date` is the
/// calendar day in the organization's timezone, not the UTC day. The row is
/// created at check-in and mutated exactly once to add the check-out fields.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub tenant_id: u64,

    #[schema(example = "EMP-001")]
    pub staff_id: String,

    #[schema(example = "2026-08-24", value_type = String, format = "date")]
    pub date: NaiveDate,

    pub check_in_time: DateTime<Utc>,
    pub check_out_time: Option<DateTime<Utc>>,

    /// Stamped from the settings snapshot at write time; never recomputed
    /// when settings change later.
    pub is_late: bool,
    pub is_early: bool,

    pub check_in_method: CheckInMethod,
    pub check_out_method: Option<CheckInMethod>,

    /// Opaque photo references, subject to the retention purge job.
    #[schema(nullable = true)]
    pub check_in_photo: Option<String>,
    #[schema(nullable = true)]
    pub check_out_photo: Option<String>,
}

/// The action that is legal next for a staff member on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    CheckIn,
    CheckOut,
    DayClosed,
}

/// Read-time projection of the current record for a staff/day combination.
/// Derived, never persisted. "No record yet" is the normal pre-check-in state
/// and is represented here, not as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceStatus {
    #[schema(example = "2026-08-24", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub has_checked_in: bool,
    pub has_checked_out: bool,
    pub is_late: bool,
    pub is_early: bool,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
}

impl AttendanceStatus {
    pub fn from_record(record: Option<&AttendanceRecord>, date: NaiveDate) -> Self {
        match record {
            None => Self {
                date,
                has_checked_in: false,
                has_checked_out: false,
                is_late: false,
                is_early: false,
                check_in_time: None,
                check_out_time: None,
            },
            Some(r) => Self {
                date,
                has_checked_in: true,
                has_checked_out: r.check_out_time.is_some(),
                is_late: r.is_late,
                is_early: r.is_early,
                check_in_time: Some(r.check_in_time),
                check_out_time: r.check_out_time,
            },
        }
    }

    pub fn next_action(&self) -> NextAction {
        match (self.has_checked_in, self.has_checked_out) {
            (false, _) => NextAction::CheckIn,
            (true, false) => NextAction::CheckOut,
            (true, true) => NextAction::DayClosed,
        }
    }
}
