//! MySQL bindings for the store traits. Check-in atomicity rides on the
//! `uniq_tenant_staff_date` unique key (duplicate-key error 23000 maps to
//! `AlreadyCheckedIn`); check-out uses a conditional update guarded on
//! `check_out_time IS NULL`. See `schema.sql`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlPool;
use tracing::error;

use crate::engine::error::EngineError;
use crate::model::attendance::AttendanceRecord;
use crate::model::settings::OrganizationSettings;
use crate::model::staff::Staff;
use crate::model::subscription::{PlanTier, Subscription};
use crate::store::{
    AttendanceStore, CheckOutUpdate, CredentialStore, EntitlementProvider, NewCheckIn,
    SettingsProvider, StaffDirectory,
};
use crate::utils::settings_cache;

const MYSQL_DUP_KEY: &str = "23000";

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch(
        &self,
        tenant_id: u64,
        staff_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, EngineError> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, tenant_id, staff_id, date, check_in_time, check_out_time,
                   is_late, is_early, check_in_method, check_out_method,
                   check_in_photo, check_out_photo
            FROM attendance
            WHERE tenant_id = ? AND staff_id = ? AND date = ?
            "#,
        )
        .bind(tenant_id)
        .bind(staff_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn find(
        &self,
        tenant_id: u64,
        staff_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, EngineError> {
        self.fetch(tenant_id, staff_id, date).await
    }

    async fn insert_check_in(&self, new: NewCheckIn) -> Result<AttendanceRecord, EngineError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
            (tenant_id, staff_id, date, check_in_time, is_late, check_in_method, check_in_photo)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.tenant_id)
        .bind(&new.staff_id)
        .bind(new.date)
        .bind(new.at)
        .bind(new.is_late)
        .bind(new.method)
        .bind(&new.photo)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => self
                .fetch(new.tenant_id, &new.staff_id, new.date)
                .await?
                .ok_or_else(|| EngineError::Store(anyhow::anyhow!("inserted row vanished"))),
            Err(e) => {
                // Duplicate day key: someone else's check-in won the race.
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some(MYSQL_DUP_KEY) {
                        return Err(EngineError::AlreadyCheckedIn);
                    }
                }
                error!(error = %e, tenant_id = new.tenant_id, staff_id = %new.staff_id, "check-in insert failed");
                Err(e.into())
            }
        }
    }

    async fn apply_check_out(&self, upd: CheckOutUpdate) -> Result<AttendanceRecord, EngineError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = ?, is_early = ?, check_out_method = ?, check_out_photo = ?
            WHERE tenant_id = ? AND staff_id = ? AND date = ?
            AND check_out_time IS NULL
            "#,
        )
        .bind(upd.at)
        .bind(upd.is_early)
        .bind(upd.method)
        .bind(&upd.photo)
        .bind(upd.tenant_id)
        .bind(&upd.staff_id)
        .bind(upd.date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Classify the refusal: no row at all vs session already closed.
            return match self.fetch(upd.tenant_id, &upd.staff_id, upd.date).await? {
                None => Err(EngineError::NoCheckInRecord),
                Some(_) => Err(EngineError::AlreadyCheckedOut),
            };
        }

        self.fetch(upd.tenant_id, &upd.staff_id, upd.date)
            .await?
            .ok_or_else(|| EngineError::Store(anyhow::anyhow!("updated row vanished")))
    }
}

pub struct MySqlSettingsProvider {
    pool: MySqlPool,
}

impl MySqlSettingsProvider {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsProvider for MySqlSettingsProvider {
    async fn settings(&self, tenant_id: u64) -> Result<OrganizationSettings, EngineError> {
        if let Some(cached) = settings_cache::get(tenant_id).await {
            return Ok(cached);
        }

        let row = sqlx::query_as::<_, OrganizationSettings>(
            r#"
            SELECT tenant_id, work_start_time, work_end_time, lateness_time,
                   early_departure_time, timezone, capture_photos, fingerprint_enabled,
                   qr_code_enabled, manual_entry_enabled, face_recognition_enabled,
                   photo_retention_days
            FROM organization_settings
            WHERE tenant_id = ?
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        let settings = row.unwrap_or_else(|| OrganizationSettings::defaults_for(tenant_id));
        settings_cache::put(settings.clone()).await;
        Ok(settings)
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

        sqlx::query(
            r#"
            INSERT INTO organization_settings
            (tenant_id, work_start_time, work_end_time, lateness_time, early_departure_time,
             timezone, capture_photos, fingerprint_enabled, qr_code_enabled,
             manual_entry_enabled, face_recognition_enabled, photo_retention_days)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
             work_start_time = VALUES(work_start_time),
             work_end_time = VALUES(work_end_time),
             lateness_time = VALUES(lateness_time),
             early_departure_time = VALUES(early_departure_time),
             timezone = VALUES(timezone),
             capture_photos = VALUES(capture_photos),
             fingerprint_enabled = VALUES(fingerprint_enabled),
             qr_code_enabled = VALUES(qr_code_enabled),
             manual_entry_enabled = VALUES(manual_entry_enabled),
             face_recognition_enabled = VALUES(face_recognition_enabled),
             photo_retention_days = VALUES(photo_retention_days)
            "#,
        )
        .bind(settings.tenant_id)
        .bind(settings.work_start_time)
        .bind(settings.work_end_time)
        .bind(settings.lateness_time)
        .bind(settings.early_departure_time)
        .bind(&settings.timezone)
        .bind(settings.capture_photos)
        .bind(settings.fingerprint_enabled)
        .bind(settings.qr_code_enabled)
        .bind(settings.manual_entry_enabled)
        .bind(settings.face_recognition_enabled)
        .bind(settings.photo_retention_days)
        .execute(&self.pool)
        .await?;

        // Stamped records keep their old flags; only future evaluations see
        // the new thresholds.
        settings_cache::invalidate(settings.tenant_id).await;
        Ok(settings)
    }
}

pub struct MySqlStaffDirectory {
    pool: MySqlPool,
}

impl MySqlStaffDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StaffDirectory for MySqlStaffDirectory {
    async fn resolve(
        &self,
        tenant_id: u64,
        staff_id: &str,
    ) -> Result<Option<Staff>, EngineError> {
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            SELECT id, tenant_id, staff_id, name, department, is_active
            FROM staff
            WHERE tenant_id = ? AND staff_id = ?
            "#,
        )
        .bind(tenant_id)
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(staff)
    }

    async fn create(&self, staff: Staff) -> Result<Staff, EngineError> {
        let result = sqlx::query(
            r#"
            INSERT INTO staff (tenant_id, staff_id, name, department, is_active)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(staff.tenant_id)
        .bind(&staff.staff_id)
        .bind(&staff.name)
        .bind(&staff.department)
        .bind(staff.is_active)
        .execute(&self.pool)
        .await?;

        Ok(Staff {
            id: result.last_insert_id(),
            ..staff
        })
    }

    async fn list(&self, tenant_id: u64) -> Result<Vec<Staff>, EngineError> {
        let staff = sqlx::query_as::<_, Staff>(
            r#"
            SELECT id, tenant_id, staff_id, name, department, is_active
            FROM staff
            WHERE tenant_id = ?
            ORDER BY id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(staff)
    }

    async fn set_active(
        &self,
        tenant_id: u64,
        staff_id: &str,
        is_active: bool,
    ) -> Result<(), EngineError> {
        let result = sqlx::query(
            r#"UPDATE staff SET is_active = ? WHERE tenant_id = ? AND staff_id = ?"#,
        )
        .bind(is_active)
        .bind(tenant_id)
        .bind(staff_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::StaffNotFound);
        }
        Ok(())
    }
}

pub struct MySqlEntitlementProvider {
    pool: MySqlPool,
}

impl MySqlEntitlementProvider {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementProvider for MySqlEntitlementProvider {
    async fn subscription(&self, tenant_id: u64) -> Result<Subscription, EngineError> {
        let row = sqlx::query_as::<_, (PlanTier, Option<DateTime<Utc>>)>(
            r#"SELECT tier, trial_ends_at FROM subscriptions WHERE tenant_id = ?"#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        // No subscription row means the bottom tier with no trial: the gate
        // then refuses photo/biometric features instead of skipping them.
        Ok(match row {
            Some((tier, trial_ends_at)) => Subscription {
                tier,
                on_trial: trial_ends_at.is_some_and(|end| end > Utc::now()),
            },
            None => Subscription {
                tier: PlanTier::Starter,
                on_trial: false,
            },
        })
    }
}

pub struct MySqlCredentialStore {
    pool: MySqlPool,
}

impl MySqlCredentialStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for MySqlCredentialStore {
    async fn has_credential(&self, tenant_id: u64, staff_id: &str) -> Result<bool, EngineError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM biometric_credentials WHERE tenant_id = ? AND staff_id = ?"#,
        )
        .bind(tenant_id)
        .bind(staff_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}
