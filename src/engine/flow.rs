//! The check-in flow state machine. One attempt walks
//! `Idle -> [CapturingPhoto] -> [AwaitingBiometric] -> Committing -> Succeeded | Failed`
//! with a cancellation edge out of every in-flight state. Explicit states
//! (rather than ad-hoc flags) make it impossible for two steps to race, e.g.
//! a scanner reopening while a commit is in flight.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::engine::error::EngineError;
use crate::engine::gate::{Camera, VerificationGate};
use crate::engine::recorder::{AttendanceRecorder, CommitReceipt};
use crate::engine::{AttendanceEvent, CancelToken};
use crate::model::attendance::CheckInMethod;
use crate::model::settings::OrganizationSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    CapturingPhoto,
    AwaitingBiometric,
    Committing,
    Succeeded,
    Failed,
}

/// One attendance attempt. Everything the engine needs arrives explicitly;
/// there is no ambient tenant or settings state.
pub struct FlowRequest<'a> {
    pub tenant_id: u64,
    pub staff_id: &'a str,
    pub event: AttendanceEvent,
    pub method: CheckInMethod,
    pub settings: &'a OrganizationSettings,
    /// Frame source for the photo step; required when `capture_photos` is
    /// enabled.
    pub camera: Option<&'a dyn Camera>,
    pub cancel: &'a CancelToken,
    pub now: DateTime<Utc>,
}

/// Drives one attempt through the gate steps and into the recorder. Built
/// per attempt; observers subscribe to the state channel for live progress.
pub struct CheckInFlow {
    gate: VerificationGate,
    recorder: AttendanceRecorder,
    state_tx: watch::Sender<FlowState>,
}

impl CheckInFlow {
    pub fn new(gate: VerificationGate, recorder: AttendanceRecorder) -> Self {
        let (state_tx, _) = watch::channel(FlowState::Idle);
        Self {
            gate,
            recorder,
            state_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> FlowState {
        *self.state_tx.borrow()
    }

    fn transition(&self, state: FlowState) {
        debug!(state = ?state, "flow transition");
        // send_replace: the transition must land even with no subscribers.
        self.state_tx.send_replace(state);
    }

    /// Run the attempt to completion. Any gate block, store conflict or
    /// cancellation lands in `Failed` with zero persisted records; only a
    /// committed record reaches `Succeeded`.
    pub async fn run(&self, req: FlowRequest<'_>) -> Result<CommitReceipt, EngineError> {
        let outcome = self.drive(req).await;
        match outcome {
            Ok(receipt) => {
                self.transition(FlowState::Succeeded);
                Ok(receipt)
            }
            Err(e) => {
                self.transition(FlowState::Failed);
                Err(e)
            }
        }
    }

    async fn drive(&self, req: FlowRequest<'_>) -> Result<CommitReceipt, EngineError> {
        req.cancel.ensure_active()?;

        // Entitlements come first so a downgraded plan blocks before any
        // camera or authenticator is touched.
        self.gate
            .check_entitlements(req.tenant_id, req.settings)
            .await?;

        let photo = if req.settings.capture_photos {
            self.transition(FlowState::CapturingPhoto);
            let camera = req.camera.ok_or_else(|| {
                EngineError::CaptureFailed("photo required but no frame supplied".to_string())
            })?;
            let jpeg = self.gate.capture_photo(camera, req.cancel).await?;
            Some(format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg)))
        } else {
            None
        };

        if req.settings.fingerprint_enabled {
            self.transition(FlowState::AwaitingBiometric);
            self.gate
                .verify_biometric(req.tenant_id, req.staff_id, req.cancel)
                .await?;
        }

        self.transition(FlowState::Committing);
        req.cancel.ensure_active()?;
        self.recorder
            .commit(
                req.tenant_id,
                req.staff_id,
                req.event,
                req.method,
                photo,
                req.settings,
                req.now,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gate::{BiometricAuthenticator, Camera, CameraHandle};
    use crate::engine::photo::RawFrame;
    use crate::model::settings::OrganizationSettings;
    use crate::model::staff::Staff;
    use crate::model::subscription::{PlanTier, Subscription};
    use crate::store::memory::{
        MemoryAttendanceStore, MemoryCredentialStore, MemoryEntitlements, MemoryStaffDirectory,
    };
    use crate::store::{AttendanceStore, StaffDirectory};
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    struct MockCamera {
        log: CallLog,
        released: Arc<AtomicBool>,
        hang: bool,
    }

    #[async_trait]
    impl Camera for MockCamera {
        async fn acquire(&self) -> Result<Box<dyn CameraHandle>, EngineError> {
            Ok(Box::new(MockHandle {
                log: self.log.clone(),
                released: self.released.clone(),
                hang: self.hang,
            }))
        }
    }

    struct MockHandle {
        log: CallLog,
        released: Arc<AtomicBool>,
        hang: bool,
    }

    #[async_trait]
    impl CameraHandle for MockHandle {
        async fn frame(&mut self) -> Result<RawFrame, EngineError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.log.lock().unwrap().push("photo");
            Ok(RawFrame {
                width: 2,
                height: 2,
                rgb: vec![128; 2 * 2 * 3],
            })
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    impl Drop for MockHandle {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    struct MockBiometric {
        log: CallLog,
        hang: Arc<AtomicBool>,
    }

    #[async_trait]
    impl BiometricAuthenticator for MockBiometric {
        async fn challenge(&self, _tenant_id: u64, _staff_id: &str) -> Result<(), EngineError> {
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.log.lock().unwrap().push("biometric");
            Ok(())
        }
    }

    struct Harness {
        flow: CheckInFlow,
        store: Arc<MemoryAttendanceStore>,
        credentials: Arc<MemoryCredentialStore>,
        log: CallLog,
        released: Arc<AtomicBool>,
        bio_hang: Arc<AtomicBool>,
        camera: MockCamera,
    }

    async fn harness(subscription: Subscription) -> Harness {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let released = Arc::new(AtomicBool::new(false));
        let bio_hang = Arc::new(AtomicBool::new(false));
        let store = Arc::new(MemoryAttendanceStore::default());
        let staff = Arc::new(MemoryStaffDirectory::default());
        staff
            .create(Staff {
                id: 0,
                tenant_id: 1,
                staff_id: "S1".to_string(),
                name: "Ada".to_string(),
                department: None,
                is_active: true,
            })
            .await
            .unwrap();
        let credentials = Arc::new(MemoryCredentialStore::default());

        let gate = VerificationGate::new(
            Arc::new(MemoryEntitlements { subscription }),
            credentials.clone(),
            Arc::new(MockBiometric {
                log: log.clone(),
                hang: bio_hang.clone(),
            }),
        )
        .with_timing(Duration::ZERO, Duration::from_millis(100));
        let recorder = AttendanceRecorder::new(store.clone(), staff);

        Harness {
            flow: CheckInFlow::new(gate, recorder),
            store,
            credentials,
            log: log.clone(),
            released: released.clone(),
            bio_hang,
            camera: MockCamera {
                log,
                released,
                hang: false,
            },
        }
    }

    fn full_verification_settings() -> OrganizationSettings {
        OrganizationSettings {
            capture_photos: true,
            fingerprint_enabled: true,
            ..OrganizationSettings::defaults_for(1)
        }
    }

    fn trial() -> Subscription {
        Subscription {
            tier: PlanTier::Starter,
            on_trial: true,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 24, 8, 0, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
    }

    fn request<'a>(
        h: &'a Harness,
        settings: &'a OrganizationSettings,
        cancel: &'a CancelToken,
    ) -> FlowRequest<'a> {
        FlowRequest {
            tenant_id: 1,
            staff_id: "S1",
            event: AttendanceEvent::CheckIn,
            method: CheckInMethod::Qr,
            settings,
            camera: Some(&h.camera),
            cancel,
            now: now(),
        }
    }

    #[tokio::test]
    async fn photo_runs_before_biometric_and_commit_stores_both() {
        let h = harness(trial()).await;
        h.credentials.register(1, "S1");
        let settings = full_verification_settings();
        let cancel = CancelToken::new();

        let receipt = h.flow.run(request(&h, &settings, &cancel)).await.unwrap();

        assert_eq!(*h.log.lock().unwrap(), vec!["photo", "biometric"]);
        assert!(receipt.record.check_in_photo.is_some());
        assert_eq!(h.flow.state(), FlowState::Succeeded);
        assert!(h.released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unentitled_photo_feature_blocks_before_touching_the_camera() {
        let h = harness(Subscription {
            tier: PlanTier::Starter,
            on_trial: false,
        })
        .await;
        let settings = OrganizationSettings {
            capture_photos: true,
            ..OrganizationSettings::defaults_for(1)
        };
        let cancel = CancelToken::new();

        let err = h.flow.run(request(&h, &settings, &cancel)).await.unwrap_err();
        assert!(matches!(err, EngineError::EntitlementRequired { .. }));
        assert!(h.log.lock().unwrap().is_empty());
        assert!(h.store.find(1, "S1", day()).await.unwrap().is_none());
        assert_eq!(h.flow.state(), FlowState::Failed);
    }

    #[tokio::test]
    async fn missing_credential_blocks_every_method_with_zero_records() {
        for method in [CheckInMethod::Manual, CheckInMethod::Qr, CheckInMethod::Face] {
            let h = harness(trial()).await;
            // fingerprint on, nothing registered for S1
            let settings = OrganizationSettings {
                fingerprint_enabled: true,
                ..OrganizationSettings::defaults_for(1)
            };
            let cancel = CancelToken::new();
            let mut req = request(&h, &settings, &cancel);
            req.method = method;

            let err = h.flow.run(req).await.unwrap_err();
            assert!(matches!(err, EngineError::BiometricNotRegistered));
            assert!(h.store.find(1, "S1", day()).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn pre_cancelled_attempt_commits_nothing() {
        let h = harness(trial()).await;
        h.credentials.register(1, "S1");
        let settings = full_verification_settings();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = h.flow.run(request(&h, &settings, &cancel)).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert!(h.store.find(1, "S1", day()).await.unwrap().is_none());
        assert_eq!(h.flow.state(), FlowState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_capture_aborts_and_releases_the_camera() {
        let mut h = harness(trial()).await;
        h.camera.hang = true;
        h.credentials.register(1, "S1");
        let settings = full_verification_settings();
        let cancel = CancelToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = h.flow.run(request(&h, &settings, &cancel)).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert!(h.released.load(Ordering::SeqCst));
        assert!(h.store.find(1, "S1", day()).await.unwrap().is_none());
        assert!(h.log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_biometric_challenge_commits_nothing() {
        let h = harness(trial()).await;
        h.bio_hang.store(true, Ordering::SeqCst);
        h.credentials.register(1, "S1");
        let settings = full_verification_settings();
        let cancel = CancelToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = h.flow.run(request(&h, &settings, &cancel)).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert!(h.store.find(1, "S1", day()).await.unwrap().is_none());
        // the photo step finished; the hung challenge never passed
        assert_eq!(*h.log.lock().unwrap(), vec!["photo"]);
        assert_eq!(h.flow.state(), FlowState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn frame_timeout_is_a_retriable_capture_failure() {
        let mut h = harness(trial()).await;
        h.camera.hang = true;
        let settings = OrganizationSettings {
            capture_photos: true,
            ..OrganizationSettings::defaults_for(1)
        };
        let cancel = CancelToken::new();

        let err = h.flow.run(request(&h, &settings, &cancel)).await.unwrap_err();
        assert!(matches!(err, EngineError::CaptureFailed(_)));
        assert!(err.is_retriable());
        assert!(h.released.load(Ordering::SeqCst));
        assert!(h.store.find(1, "S1", day()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn photo_required_but_no_frame_supplied_blocks() {
        let h = harness(trial()).await;
        let settings = OrganizationSettings {
            capture_photos: true,
            ..OrganizationSettings::defaults_for(1)
        };
        let cancel = CancelToken::new();
        let mut req = request(&h, &settings, &cancel);
        req.camera = None;

        let err = h.flow.run(req).await.unwrap_err();
        assert!(matches!(err, EngineError::CaptureFailed(_)));
        assert!(h.store.find(1, "S1", day()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn plain_check_in_skips_both_gate_steps() {
        let h = harness(Subscription {
            tier: PlanTier::Starter,
            on_trial: false,
        })
        .await;
        let settings = OrganizationSettings::defaults_for(1);
        let cancel = CancelToken::new();

        let receipt = h.flow.run(request(&h, &settings, &cancel)).await.unwrap();
        assert!(h.log.lock().unwrap().is_empty());
        assert!(receipt.record.check_in_photo.is_none());
        assert_eq!(h.flow.state(), FlowState::Succeeded);
    }
}
