use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "tenant_id": 1,
        "staff_id": "EMP-001",
        "name": "John Doe",
        "department": "Engineering",
        "is_active": true
    })
)]
pub struct Staff {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 1)]
    pub tenant_id: u64,

    /// Tenant-scoped unique identifier; this is what staff type or what the
    /// QR code encodes.
    #[schema(example = "EMP-001")]
    pub staff_id: String,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,

    /// Inactive staff cannot produce attendance events.
    #[schema(example = true)]
    pub is_active: bool,
}
