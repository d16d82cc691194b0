//! Verification Gate: the optional pre-commit steps between "staff pressed
//! the button" and the attendance recorder. Step order is fixed: entitlement
//! check, then photo capture, then biometric challenge. A step either passes
//! or blocks the whole attempt; nothing is ever silently skipped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::engine::error::EngineError;
use crate::engine::photo::{self, RawFrame};
use crate::engine::CancelToken;
use crate::model::settings::OrganizationSettings;
use crate::store::{CredentialStore, EntitlementProvider};

pub const DEFAULT_SETTLE: Duration = Duration::from_millis(3500);
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(10);

/// A source of camera frames. Production requests carry the kiosk's frame in
/// the request body ([`UploadedFrame`]); tests plug in mock cameras.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn CameraHandle>, EngineError>;
}

/// An acquired camera. Implementations must release the underlying device in
/// `Drop` as well; `release` is idempotent. The gate releases explicitly on
/// every exit path, and `Drop` covers anything it missed.
#[async_trait]
pub trait CameraHandle: Send {
    async fn frame(&mut self) -> Result<RawFrame, EngineError>;
    fn release(&mut self);
}

/// The biometric (WebAuthn) challenge against an already-registered
/// credential. A transient failure surfaces as retriable `CaptureFailed`;
/// the missing-credential case never reaches this trait.
#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    async fn challenge(&self, tenant_id: u64, staff_id: &str) -> Result<(), EngineError>;
}

/// Frame posted by the kiosk alongside the commit request. "Acquisition" is
/// instant; decode failures surface as retriable capture errors.
pub struct UploadedFrame {
    bytes: Vec<u8>,
}

impl UploadedFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl Camera for UploadedFrame {
    async fn acquire(&self) -> Result<Box<dyn CameraHandle>, EngineError> {
        Ok(Box::new(UploadedFrameHandle {
            bytes: Some(self.bytes.clone()),
        }))
    }
}

struct UploadedFrameHandle {
    bytes: Option<Vec<u8>>,
}

#[async_trait]
impl CameraHandle for UploadedFrameHandle {
    async fn frame(&mut self) -> Result<RawFrame, EngineError> {
        let bytes = self
            .bytes
            .take()
            .ok_or_else(|| EngineError::CaptureFailed("frame already consumed".to_string()))?;
        RawFrame::decode(&bytes)
    }

    fn release(&mut self) {
        self.bytes = None;
    }
}

/// Biometric proof carried on the commit request. The WebAuthn ceremony
/// (challenge issue, signature verification) happens at the identity
/// boundary before the request reaches the engine; an absent assertion here
/// is a transient capture failure the kiosk may retry.
pub struct RequestAssertion {
    assertion: Option<String>,
}

impl RequestAssertion {
    pub fn new(assertion: Option<String>) -> Self {
        Self { assertion }
    }
}

#[async_trait]
impl BiometricAuthenticator for RequestAssertion {
    async fn challenge(&self, _tenant_id: u64, _staff_id: &str) -> Result<(), EngineError> {
        match &self.assertion {
            Some(a) if !a.is_empty() => Ok(()),
            _ => Err(EngineError::CaptureFailed(
                "biometric assertion missing from request".to_string(),
            )),
        }
    }
}

pub struct VerificationGate {
    entitlements: Arc<dyn EntitlementProvider>,
    credentials: Arc<dyn CredentialStore>,
    biometric: Arc<dyn BiometricAuthenticator>,
    settle: Duration,
    frame_timeout: Duration,
}

impl VerificationGate {
    pub fn new(
        entitlements: Arc<dyn EntitlementProvider>,
        credentials: Arc<dyn CredentialStore>,
        biometric: Arc<dyn BiometricAuthenticator>,
    ) -> Self {
        Self {
            entitlements,
            credentials,
            biometric,
            settle: DEFAULT_SETTLE,
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
        }
    }

    pub fn with_timing(mut self, settle: Duration, frame_timeout: Duration) -> Self {
        self.settle = settle;
        self.frame_timeout = frame_timeout;
        self
    }

    /// First gate step. A feature that is enabled in settings but not
    /// covered by the current plan blocks with `EntitlementRequired`; this
    /// surfaces billing mismatches after a downgrade instead of quietly
    /// dropping a verification the admin believes is on.
    pub async fn check_entitlements(
        &self,
        tenant_id: u64,
        settings: &OrganizationSettings,
    ) -> Result<(), EngineError> {
        if !settings.capture_photos && !settings.fingerprint_enabled {
            return Ok(());
        }

        let subscription = self.entitlements.subscription(tenant_id).await?;

        if settings.capture_photos && !subscription.allows_photos() {
            warn!(tenant_id, "photo verification enabled but not entitled");
            return Err(EngineError::EntitlementRequired {
                feature: "photo verification",
            });
        }
        if settings.fingerprint_enabled && !subscription.allows_biometric() {
            warn!(tenant_id, "biometric verification enabled but not entitled");
            return Err(EngineError::EntitlementRequired {
                feature: "biometric verification",
            });
        }
        Ok(())
    }

    /// Second gate step. Waits out the exposure settle delay, takes one
    /// frame within a bounded timeout, enhances it and returns JPEG bytes.
    /// The handle is released on success, failure, timeout and cancel.
    pub async fn capture_photo(
        &self,
        camera: &dyn Camera,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, EngineError> {
        cancel.ensure_active()?;
        let mut handle = camera.acquire().await?;

        let result = self.capture_inner(handle.as_mut(), cancel).await;
        handle.release();
        result
    }

    async fn capture_inner(
        &self,
        handle: &mut dyn CameraHandle,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, EngineError> {
        // Let exposure adjust before snapshotting.
        tokio::select! {
            _ = tokio::time::sleep(self.settle) => {}
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
        }

        let frame = tokio::select! {
            taken = tokio::time::timeout(self.frame_timeout, handle.frame()) => {
                taken.map_err(|_| {
                    EngineError::CaptureFailed("camera produced no frame within timeout".to_string())
                })??
            }
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
        };

        photo::process(frame)
    }

    /// Third gate step. A staff member without a registered credential is
    /// blocked outright: falling back to an unverified check-in would defeat
    /// the anti-buddy-punching purpose of the feature.
    pub async fn verify_biometric(
        &self,
        tenant_id: u64,
        staff_id: &str,
        cancel: &CancelToken,
    ) -> Result<(), EngineError> {
        cancel.ensure_active()?;

        if !self.credentials.has_credential(tenant_id, staff_id).await? {
            return Err(EngineError::BiometricNotRegistered);
        }

        tokio::select! {
            outcome = self.biometric.challenge(tenant_id, staff_id) => outcome,
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
        }
    }
}
