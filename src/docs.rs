use crate::api::attendance::{CommitRequest, CommitResponse, StatusQuery, StatusResponse};
use crate::api::settings::UpdateSettings;
use crate::api::staff::{CreateStaff, SetActive};
use crate::engine::recorder::CommitReceipt;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, CheckInMethod, NextAction};
use crate::model::settings::OrganizationSettings;
use crate::model::staff::Staff;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TimeWise Attendance API",
        version = "1.0.0",
        description = r#"
## TimeWise — multi-tenant staff attendance

Organizations configure work-hour policies and let staff check in and out by
QR code, manual id entry, face recognition or biometric verification.

### Key Features
- **Attendance**
  - Per-day check-in / check-out with lateness and early-departure flags
  - One open session per staff member per day, enforced atomically
  - Optional photo capture and biometric verification before commit
- **Settings**
  - Work hours, lateness cutoff, timezone, check-in method toggles
- **Staff**
  - Tenant-scoped staff registry with activation state

### Response Format
- JSON-based RESTful responses
- Errors carry a stable `code` plus a `retriable` hint

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::status,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,

        crate::api::settings::get_settings,
        crate::api::settings::update_settings,

        crate::api::staff::create_staff,
        crate::api::staff::list_staff,
        crate::api::staff::get_staff,
        crate::api::staff::set_active
    ),
    components(
        schemas(
            StatusQuery,
            StatusResponse,
            CommitRequest,
            CommitResponse,
            CommitReceipt,
            AttendanceRecord,
            AttendanceStatus,
            CheckInMethod,
            NextAction,
            OrganizationSettings,
            UpdateSettings,
            Staff,
            CreateStaff,
            SetActive
        )
    ),
    tags(
        (name = "Attendance", description = "Check-in / check-out and status APIs"),
        (name = "Settings", description = "Organization policy APIs"),
        (name = "Staff", description = "Staff registry APIs"),
    )
)]
pub struct ApiDoc;
