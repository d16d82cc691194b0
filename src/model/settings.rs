use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-organization work-hour policy. All time-of-day thresholds are local to
/// `timezone`; comparisons never happen in server UTC or the kiosk's clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "tenant_id": 1,
        "work_start_time": "09:00:00",
        "work_end_time": "17:00:00",
        "lateness_time": "09:00:00",
        "early_departure_time": "17:00:00",
        "timezone": "Africa/Lagos",
        "capture_photos": false,
        "fingerprint_enabled": false,
        "qr_code_enabled": true,
        "manual_entry_enabled": true,
        "face_recognition_enabled": false,
        "photo_retention_days": 30
    })
)]
pub struct OrganizationSettings {
    #[schema(example = 1)]
    pub tenant_id: u64,

    #[schema(example = "09:00:00", value_type = String, format = "time")]
    pub work_start_time: NaiveTime,

    #[schema(example = "17:00:00", value_type = String, format = "time")]
    pub work_end_time: NaiveTime,

    /// Check-in cutoff. Independent of `work_start_time` by design; the two
    /// are not cross-validated.
    #[schema(example = "09:00:00", value_type = String, format = "time")]
    pub lateness_time: NaiveTime,

    #[schema(example = "17:00:00", value_type = String, format = "time")]
    pub early_departure_time: NaiveTime,

    /// IANA zone name. A malformed value falls back to UTC at evaluation
    /// time, it never aborts a check-in.
    #[schema(example = "Africa/Lagos")]
    pub timezone: String,

    #[schema(example = false)]
    pub capture_photos: bool,

    #[schema(example = false)]
    pub fingerprint_enabled: bool,

    #[schema(example = true)]
    pub qr_code_enabled: bool,

    #[schema(example = true)]
    pub manual_entry_enabled: bool,

    #[schema(example = false)]
    pub face_recognition_enabled: bool,

    #[schema(example = 30)]
    pub photo_retention_days: u32,
}

impl Default for OrganizationSettings {
    fn default() -> Self {
        Self {
            tenant_id: 0,
            work_start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            work_end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            lateness_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            early_departure_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            timezone: "UTC".to_string(),
            capture_photos: false,
            fingerprint_enabled: false,
            qr_code_enabled: true,
            manual_entry_enabled: true,
            face_recognition_enabled: false,
            photo_retention_days: 30,
        }
    }
}

impl OrganizationSettings {
    /// Defaults for a tenant that has never saved settings.
    pub fn defaults_for(tenant_id: u64) -> Self {
        Self {
            tenant_id,
            ..Self::default()
        }
    }

    /// At least one of the primary check-in methods (qr / manual / face) must
    /// stay enabled at all times.
    pub fn any_method_enabled(&self) -> bool {
        self.qr_code_enabled || self.manual_entry_enabled || self.face_recognition_enabled
    }
}
