//! Session Tracker: the read side of the engine. Projects today's record
//! (or its absence) into an [`AttendanceStatus`] so every check-in UI can
//! decide which action is legal next.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::engine::error::EngineError;
use crate::engine::policy;
use crate::model::attendance::AttendanceStatus;
use crate::model::settings::OrganizationSettings;
use crate::store::AttendanceStore;

pub struct SessionTracker {
    store: Arc<dyn AttendanceStore>,
}

impl SessionTracker {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    /// Status for the staff member's current day. "Current day" is the
    /// calendar day in the organization's timezone; the kiosk's own clock
    /// never decides the day boundary. A missing record is the normal
    /// about-to-check-in state, not an error.
    pub async fn status(
        &self,
        settings: &OrganizationSettings,
        tenant_id: u64,
        staff_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AttendanceStatus, EngineError> {
        let date = policy::local_day(settings, now);
        let record = self.store.find(tenant_id, staff_id, date).await?;
        Ok(AttendanceStatus::from_record(record.as_ref(), date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{CheckInMethod, NextAction};
    use crate::store::NewCheckIn;
    use crate::store::memory::MemoryAttendanceStore;
    use chrono::TimeZone;

    fn tracker() -> (SessionTracker, Arc<MemoryAttendanceStore>) {
        let store = Arc::new(MemoryAttendanceStore::default());
        (SessionTracker::new(store.clone()), store)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 24, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn missing_record_is_a_status_not_an_error() {
        let (tracker, _) = tracker();
        let settings = OrganizationSettings::defaults_for(1);
        let status = tracker.status(&settings, 1, "EMP-001", now()).await.unwrap();
        assert!(!status.has_checked_in);
        assert_eq!(status.next_action(), NextAction::CheckIn);
    }

    #[tokio::test]
    async fn open_session_allows_only_check_out() {
        let (tracker, store) = tracker();
        let settings = OrganizationSettings::defaults_for(1);
        store
            .insert_check_in(NewCheckIn {
                tenant_id: 1,
                staff_id: "EMP-001".to_string(),
                date: policy::local_day(&settings, now()),
                at: now(),
                is_late: true,
                method: CheckInMethod::Qr,
                photo: None,
            })
            .await
            .unwrap();

        let status = tracker.status(&settings, 1, "EMP-001", now()).await.unwrap();
        assert!(status.has_checked_in);
        assert!(!status.has_checked_out);
        assert!(status.is_late);
        assert_eq!(status.next_action(), NextAction::CheckOut);
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let (tracker, _) = tracker();
        let settings = OrganizationSettings::defaults_for(1);
        let first = tracker.status(&settings, 1, "EMP-001", now()).await.unwrap();
        for _ in 0..5 {
            let again = tracker.status(&settings, 1, "EMP-001", now()).await.unwrap();
            assert_eq!(first, again);
        }
    }
}
