use std::sync::Arc;
use std::time::Duration;

use sqlx::MySqlPool;

use crate::config::Config;
use crate::engine::flow::CheckInFlow;
use crate::engine::gate::{BiometricAuthenticator, VerificationGate};
use crate::engine::recorder::AttendanceRecorder;
use crate::engine::session::SessionTracker;
use crate::store::mysql::{
    MySqlAttendanceStore, MySqlCredentialStore, MySqlEntitlementProvider, MySqlSettingsProvider,
    MySqlStaffDirectory,
};
use crate::store::{
    AttendanceStore, CredentialStore, EntitlementProvider, SettingsProvider, StaffDirectory,
};

/// Shared service handles behind the engine's trait boundaries. Handlers
/// build a fresh [`SessionTracker`] or [`CheckInFlow`] per request from
/// these; the flow's state channel is per-attempt.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<dyn SettingsProvider>,
    pub staff: Arc<dyn StaffDirectory>,
    pub attendance: Arc<dyn AttendanceStore>,
    pub entitlements: Arc<dyn EntitlementProvider>,
    pub credentials: Arc<dyn CredentialStore>,
    gate_settle: Duration,
    gate_frame_timeout: Duration,
}

impl AppState {
    pub fn mysql(pool: MySqlPool, config: &Config) -> Self {
        Self {
            settings: Arc::new(MySqlSettingsProvider::new(pool.clone())),
            staff: Arc::new(MySqlStaffDirectory::new(pool.clone())),
            attendance: Arc::new(MySqlAttendanceStore::new(pool.clone())),
            entitlements: Arc::new(MySqlEntitlementProvider::new(pool.clone())),
            credentials: Arc::new(MySqlCredentialStore::new(pool)),
            gate_settle: Duration::from_millis(config.photo_settle_ms),
            gate_frame_timeout: Duration::from_millis(config.photo_frame_timeout_ms),
        }
    }

    pub fn tracker(&self) -> SessionTracker {
        SessionTracker::new(self.attendance.clone())
    }

    pub fn flow(&self, biometric: Arc<dyn BiometricAuthenticator>) -> CheckInFlow {
        let gate = VerificationGate::new(
            self.entitlements.clone(),
            self.credentials.clone(),
            biometric,
        )
        .with_timing(self.gate_settle, self.gate_frame_timeout);
        let recorder = AttendanceRecorder::new(self.attendance.clone(), self.staff.clone());
        CheckInFlow::new(gate, recorder)
    }
}
