//! Boundaries the engine depends on: attendance persistence plus the
//! settings / staff / billing / credential lookups. Production bindings live
//! in [`mysql`]; [`memory`] backs the test suite and local development.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::engine::error::EngineError;
use crate::model::attendance::{AttendanceRecord, CheckInMethod};
use crate::model::settings::OrganizationSettings;
use crate::model::staff::Staff;
use crate::model::subscription::Subscription;

/// Everything needed to open a session. The store assigns the row id.
#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub tenant_id: u64,
    pub staff_id: String,
    pub date: NaiveDate,
    pub at: DateTime<Utc>,
    pub is_late: bool,
    pub method: CheckInMethod,
    pub photo: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckOutUpdate {
    pub tenant_id: u64,
    pub staff_id: String,
    pub date: NaiveDate,
    pub at: DateTime<Utc>,
    pub is_early: bool,
    pub method: CheckInMethod,
    pub photo: Option<String>,
}

/// Attendance persistence. Implementations must make both write operations
/// atomic per `(tenant_id, staff_id, date)`: two simultaneous check-ins for
/// the same key yield exactly one row and one `AlreadyCheckedIn`.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find(
        &self,
        tenant_id: u64,
        staff_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, EngineError>;

    /// Insert the day's record. Fails with `AlreadyCheckedIn` when a record
    /// for the key already exists; the conflict check and the insert are one
    /// atomic step, not read-then-write.
    async fn insert_check_in(&self, new: NewCheckIn) -> Result<AttendanceRecord, EngineError>;

    /// Close the day's open session. Fails with `NoCheckInRecord` when no
    /// record exists and `AlreadyCheckedOut` when the session is already
    /// closed, via a conditional update rather than a prior read.
    async fn apply_check_out(&self, upd: CheckOutUpdate) -> Result<AttendanceRecord, EngineError>;
}

/// Current settings for a tenant. Tenants that never saved settings get
/// [`OrganizationSettings::defaults_for`]; a missing row is not an error.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn settings(&self, tenant_id: u64) -> Result<OrganizationSettings, EngineError>;

    /// Persist new settings. Fails with `ConfigurationInvalid` when the
    /// update would disable every primary check-in method.
    async fn update_settings(
        &self,
        settings: OrganizationSettings,
    ) -> Result<OrganizationSettings, EngineError>;
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// `Ok(None)` means the staff id does not exist for this tenant; the
    /// caller turns that into `StaffNotFound`.
    async fn resolve(&self, tenant_id: u64, staff_id: &str)
        -> Result<Option<Staff>, EngineError>;

    async fn create(&self, staff: Staff) -> Result<Staff, EngineError>;

    async fn list(&self, tenant_id: u64) -> Result<Vec<Staff>, EngineError>;

    async fn set_active(
        &self,
        tenant_id: u64,
        staff_id: &str,
        is_active: bool,
    ) -> Result<(), EngineError>;
}

#[async_trait]
pub trait EntitlementProvider: Send + Sync {
    async fn subscription(&self, tenant_id: u64) -> Result<Subscription, EngineError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn has_credential(&self, tenant_id: u64, staff_id: &str) -> Result<bool, EngineError>;
}
