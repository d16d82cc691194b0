//! Attendance Recorder: the single write path. Every check-in method
//! (manual, qr, face, fingerprint) funnels through [`AttendanceRecorder::commit`];
//! no method has a private write path, so no method can diverge on business
//! rules.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::engine::error::EngineError;
use crate::engine::policy;
use crate::engine::AttendanceEvent;
use crate::model::attendance::{AttendanceRecord, CheckInMethod};
use crate::model::settings::OrganizationSettings;
use crate::store::{AttendanceStore, CheckOutUpdate, NewCheckIn, StaffDirectory};

/// What the caller needs to render a confirmation, decoupled from
/// persistence details.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommitReceipt {
    #[schema(example = "John Doe")]
    pub staff_name: String,
    pub is_late: Option<bool>,
    pub is_early: Option<bool>,
    pub record: AttendanceRecord,
}

pub struct AttendanceRecorder {
    store: Arc<dyn AttendanceStore>,
    staff: Arc<dyn StaffDirectory>,
}

impl AttendanceRecorder {
    pub fn new(store: Arc<dyn AttendanceStore>, staff: Arc<dyn StaffDirectory>) -> Self {
        Self { store, staff }
    }

    /// Commit one attendance event. The session-state preconditions
    /// (`AlreadyCheckedIn`, `NoCheckInRecord`, `AlreadyCheckedOut`) are
    /// enforced by the store atomically at write time, not against whatever
    /// status the client read earlier; that closes the double-tap race.
    pub async fn commit(
        &self,
        tenant_id: u64,
        staff_id: &str,
        event: AttendanceEvent,
        method: CheckInMethod,
        photo: Option<String>,
        settings: &OrganizationSettings,
        now: DateTime<Utc>,
    ) -> Result<CommitReceipt, EngineError> {
        let staff = self
            .staff
            .resolve(tenant_id, staff_id)
            .await?
            .ok_or(EngineError::StaffNotFound)?;
        if !staff.is_active {
            return Err(EngineError::StaffInactive);
        }

        let date = policy::local_day(settings, now);
        let verdict = policy::verdict(settings, now, event);

        let record = match event {
            AttendanceEvent::CheckIn => {
                self.store
                    .insert_check_in(NewCheckIn {
                        tenant_id,
                        staff_id: staff_id.to_string(),
                        date,
                        at: now,
                        is_late: verdict.is_late,
                        method,
                        photo,
                    })
                    .await?
            }
            AttendanceEvent::CheckOut => {
                self.store
                    .apply_check_out(CheckOutUpdate {
                        tenant_id,
                        staff_id: staff_id.to_string(),
                        date,
                        at: now,
                        is_early: verdict.is_early,
                        method,
                        photo,
                    })
                    .await?
            }
        };

        info!(
            tenant_id,
            staff_id,
            event = ?event,
            method = %method,
            is_late = record.is_late,
            is_early = record.is_early,
            "attendance committed"
        );

        Ok(match event {
            AttendanceEvent::CheckIn => CommitReceipt {
                staff_name: staff.name,
                is_late: Some(record.is_late),
                is_early: None,
                record,
            },
            AttendanceEvent::CheckOut => CommitReceipt {
                staff_name: staff.name,
                is_late: None,
                is_early: Some(record.is_early),
                record,
            },
        })
    }
}
