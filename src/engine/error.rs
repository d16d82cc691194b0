use actix_web::{HttpResponse, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Every failure the attendance engine can produce. The wire `code` is
/// stable so all four check-in UIs can render consistent messages no matter
/// which method triggered the error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("staff id not found for this organization")]
    StaffNotFound,

    #[error("staff member is deactivated; contact an administrator")]
    StaffInactive,

    #[error("already checked in today; you can now check out")]
    AlreadyCheckedIn,

    #[error("already checked out today")]
    AlreadyCheckedOut,

    #[error("no check-in record for today; check in first")]
    NoCheckInRecord,

    #[error("{feature} is not included in the current plan")]
    EntitlementRequired { feature: &'static str },

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("no biometric credential registered for this staff member")]
    BiometricNotRegistered,

    #[error("check-in cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// Storage or transport failure. Kept distinct from the business errors
    /// above so a network timeout is never reported as a session conflict.
    #[error("storage error: {0}")]
    Store(#[source] anyhow::Error),
}

impl EngineError {
    /// Stable machine-readable code carried in every error response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StaffNotFound => "staff_not_found",
            Self::StaffInactive => "staff_inactive",
            Self::AlreadyCheckedIn => "already_checked_in",
            Self::AlreadyCheckedOut => "already_checked_out",
            Self::NoCheckInRecord => "no_check_in_record",
            Self::EntitlementRequired { .. } => "entitlement_required",
            Self::CaptureFailed(_) => "capture_failed",
            Self::BiometricNotRegistered => "biometric_not_registered",
            Self::Cancelled => "cancelled",
            Self::ConfigurationInvalid(_) => "configuration_invalid",
            Self::Store(_) => "storage_error",
        }
    }

    /// Whether the caller may retry the same request unchanged. Session
    /// conflicts are deliberately not retriable: the client should refresh
    /// the attendance status instead of retrying blindly.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::CaptureFailed(_) | Self::Store(_))
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(e.into())
    }
}

impl actix_web::ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::StaffNotFound => StatusCode::NOT_FOUND,
            Self::StaffInactive => StatusCode::FORBIDDEN,
            Self::AlreadyCheckedIn | Self::AlreadyCheckedOut | Self::NoCheckInRecord => {
                StatusCode::CONFLICT
            }
            Self::EntitlementRequired { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::CaptureFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BiometricNotRegistered => StatusCode::FORBIDDEN,
            Self::Cancelled => StatusCode::BAD_REQUEST,
            Self::ConfigurationInvalid(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "code": self.code(),
            "message": self.to_string(),
            "retriable": self.is_retriable(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_conflicts_are_not_retriable() {
        assert!(!EngineError::AlreadyCheckedIn.is_retriable());
        assert!(!EngineError::AlreadyCheckedOut.is_retriable());
        assert!(!EngineError::NoCheckInRecord.is_retriable());
        assert!(!EngineError::BiometricNotRegistered.is_retriable());
    }

    #[test]
    fn transient_failures_are_retriable() {
        assert!(EngineError::CaptureFailed("no frame".into()).is_retriable());
        assert!(EngineError::Store(anyhow::anyhow!("timeout")).is_retriable());
    }
}
