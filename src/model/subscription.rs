use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PlanTier {
    Starter,
    Growth,
    Scale,
}

/// Current billing state for a tenant, consumed only by the verification
/// gate's entitlement step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    pub tier: PlanTier,
    pub on_trial: bool,
}

impl Subscription {
    /// Photo verification is included from the Growth tier up, or during a
    /// trial.
    pub fn allows_photos(&self) -> bool {
        self.on_trial || self.tier >= PlanTier::Growth
    }

    /// Biometric verification is a top-tier feature, or trial.
    pub fn allows_biometric(&self) -> bool {
        self.on_trial || self.tier == PlanTier::Scale
    }
}
