//! In-memory bindings for the store traits. The attendance map's mutex gives
//! the same per-key atomicity the MySQL unique key provides, so the engine's
//! concurrency invariants hold here too. Used by the test suite and by
//! local development without a database.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::engine::error::EngineError;
use crate::model::attendance::AttendanceRecord;
use crate::model::settings::OrganizationSettings;
use crate::model::staff::Staff;
use crate::model::subscription::{PlanTier, Subscription};
use crate::store::{
    AttendanceStore, CheckOutUpdate, CredentialStore, EntitlementProvider, NewCheckIn,
    SettingsProvider, StaffDirectory,
};

type DayKey = (u64, String, NaiveDate);

#[derive(Default)]
pub struct MemoryAttendanceStore {
    records: Mutex<HashMap<DayKey, AttendanceRecord>>,
    next_id: AtomicU64,
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    async fn find(
        &self,
        tenant_id: u64,
        staff_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, EngineError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .get(&(tenant_id, staff_id.to_string(), date))
            .cloned())
    }

    async fn insert_check_in(&self, new: NewCheckIn) -> Result<AttendanceRecord, EngineError> {
        let mut records = self.records.lock().unwrap();
        let key = (new.tenant_id, new.staff_id.clone(), new.date);
        if records.contains_key(&key) {
            return Err(EngineError::AlreadyCheckedIn);
        }
        let record = AttendanceRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            tenant_id: new.tenant_id,
            staff_id: new.staff_id,
            date: new.date,
            check_in_time: new.at,
            check_out_time: None,
            is_late: new.is_late,
            is_early: false,
            check_in_method: new.method,
            check_out_method: None,
            check_in_photo: new.photo,
            check_out_photo: None,
        };
        records.insert(key, record.clone());
        Ok(record)
    }

    async fn apply_check_out(&self, upd: CheckOutUpdate) -> Result<AttendanceRecord, EngineError> {
        let mut records = self.records.lock().unwrap();
        let key = (upd.tenant_id, upd.staff_id.clone(), upd.date);
        let record = records.get_mut(&key).ok_or(EngineError::NoCheckInRecord)?;
        if record.check_out_time.is_some() {
            return Err(EngineError::AlreadyCheckedOut);
        }
        record.check_out_time = Some(upd.at);
        record.is_early = upd.is_early;
        record.check_out_method = Some(upd.method);
        record.check_out_photo = upd.photo;
        Ok(record.clone())
    }
}

#[derive(Default)]
pub struct MemorySettingsProvider {
    settings: Mutex<HashMap<u64, OrganizationSettings>>,
}

impl MemorySettingsProvider {
    pub fn with(settings: OrganizationSettings) -> Self {
        let provider = Self::default();
        provider
            .settings
            .lock()
            .unwrap()
            .insert(settings.tenant_id, settings);
        provider
    }
}

#[async_trait]
impl SettingsProvider for MemorySettingsProvider {
    async fn settings(&self, tenant_id: u64) -> Result<OrganizationSettings, EngineError> {
        let settings = self.settings.lock().unwrap();
        Ok(settings
            .get(&tenant_id)
            .cloned()
            .unwrap_or_else(|| OrganizationSettings::defaults_for(tenant_id)))
    }

    async fn update_settings(
        &self,
        settings: OrganizationSettings,
    ) -> Result<OrganizationSettings, EngineError> {
        if !settings.any_method_enabled() {
            return Err(EngineError::ConfigurationInvalid(
                "at least one check-in method must remain enabled".to_string(),
            ));
        }
        self.settings
            .lock()
            .unwrap()
            .insert(settings.tenant_id, settings.clone());
        Ok(settings)
    }
}

#[derive(Default)]
pub struct MemoryStaffDirectory {
    staff: Mutex<HashMap<(u64, String), Staff>>,
    next_id: AtomicU64,
}

#[async_trait]
impl StaffDirectory for MemoryStaffDirectory {
    async fn resolve(
        &self,
        tenant_id: u64,
        staff_id: &str,
    ) -> Result<Option<Staff>, EngineError> {
        let staff = self.staff.lock().unwrap();
        Ok(staff.get(&(tenant_id, staff_id.to_string())).cloned())
    }

    async fn create(&self, mut staff: Staff) -> Result<Staff, EngineError> {
        staff.id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.staff
            .lock()
            .unwrap()
            .insert((staff.tenant_id, staff.staff_id.clone()), staff.clone());
        Ok(staff)
    }

    async fn list(&self, tenant_id: u64) -> Result<Vec<Staff>, EngineError> {
        let staff = self.staff.lock().unwrap();
        let mut out: Vec<Staff> = staff
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.id);
        Ok(out)
    }

    async fn set_active(
        &self,
        tenant_id: u64,
        staff_id: &str,
        is_active: bool,
    ) -> Result<(), EngineError> {
        let mut staff = self.staff.lock().unwrap();
        let entry = staff
            .get_mut(&(tenant_id, staff_id.to_string()))
            .ok_or(EngineError::StaffNotFound)?;
        entry.is_active = is_active;
        Ok(())
    }
}

/// Fixed-answer entitlement provider.
pub struct MemoryEntitlements {
    pub subscription: Subscription,
}

impl Default for MemoryEntitlements {
    fn default() -> Self {
        Self {
            subscription: Subscription {
                tier: PlanTier::Starter,
                on_trial: true,
            },
        }
    }
}

#[async_trait]
impl EntitlementProvider for MemoryEntitlements {
    async fn subscription(&self, _tenant_id: u64) -> Result<Subscription, EngineError> {
        Ok(self.subscription)
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    registered: Mutex<HashSet<(u64, String)>>,
}

impl MemoryCredentialStore {
    pub fn register(&self, tenant_id: u64, staff_id: &str) {
        self.registered
            .lock()
            .unwrap()
            .insert((tenant_id, staff_id.to_string()));
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn has_credential(&self, tenant_id: u64, staff_id: &str) -> Result<bool, EngineError> {
        Ok(self
            .registered
            .lock()
            .unwrap()
            .contains(&(tenant_id, staff_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_tenant_gets_documented_defaults() {
        let provider = MemorySettingsProvider::default();
        let settings = provider.settings(42).await.unwrap();
        assert_eq!(settings, OrganizationSettings::defaults_for(42));
        assert_eq!(settings.timezone, "UTC");
        assert!(settings.qr_code_enabled);
        assert!(settings.manual_entry_enabled);
        assert!(!settings.face_recognition_enabled);
    }

    #[tokio::test]
    async fn saved_settings_come_back_on_the_next_read() {
        let provider = MemorySettingsProvider::with(OrganizationSettings {
            timezone: "Africa/Lagos".to_string(),
            ..OrganizationSettings::defaults_for(7)
        });

        let updated = OrganizationSettings {
            capture_photos: true,
            ..provider.settings(7).await.unwrap()
        };
        provider.update_settings(updated.clone()).await.unwrap();

        assert_eq!(provider.settings(7).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn update_disabling_every_method_is_rejected_and_not_persisted() {
        let provider = MemorySettingsProvider::with(OrganizationSettings::defaults_for(7));

        let err = provider
            .update_settings(OrganizationSettings {
                qr_code_enabled: false,
                manual_entry_enabled: false,
                face_recognition_enabled: false,
                ..OrganizationSettings::defaults_for(7)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ConfigurationInvalid(_)));

        // The stored settings still allow check-ins.
        assert!(provider.settings(7).await.unwrap().any_method_enabled());
    }
}
