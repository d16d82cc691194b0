use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::engine::error::EngineError;
use crate::model::settings::OrganizationSettings;
use crate::state::AppState;

/// Admin settings payload. Times arrive as `HH:MM`; omitted fields keep
/// their current value.
#[derive(Deserialize, ToSchema)]
pub struct UpdateSettings {
    #[schema(example = "09:00")]
    pub work_start_time: Option<String>,
    #[schema(example = "17:00")]
    pub work_end_time: Option<String>,
    #[schema(example = "09:15")]
    pub lateness_time: Option<String>,
    #[schema(example = "16:30")]
    pub early_departure_time: Option<String>,
    #[schema(example = "Africa/Lagos")]
    pub timezone: Option<String>,
    pub capture_photos: Option<bool>,
    pub fingerprint_enabled: Option<bool>,
    pub qr_code_enabled: Option<bool>,
    pub manual_entry_enabled: Option<bool>,
    pub face_recognition_enabled: Option<bool>,
    pub photo_retention_days: Option<u32>,
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, EngineError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| {
            EngineError::ConfigurationInvalid(format!("{field} must be HH:MM, got '{value}'"))
        })
}

/// Merge the payload onto current settings and validate. The timezone is
/// accepted even when unrecognized (evaluation falls back to UTC), but the
/// at-least-one-method invariant is enforced here, before anything persists.
pub fn apply_update(
    mut current: OrganizationSettings,
    update: &UpdateSettings,
) -> Result<OrganizationSettings, EngineError> {
    if let Some(v) = &update.work_start_time {
        current.work_start_time = parse_time("work_start_time", v)?;
    }
    if let Some(v) = &update.work_end_time {
        current.work_end_time = parse_time("work_end_time", v)?;
    }
    if let Some(v) = &update.lateness_time {
        current.lateness_time = parse_time("lateness_time", v)?;
    }
    if let Some(v) = &update.early_departure_time {
        current.early_departure_time = parse_time("early_departure_time", v)?;
    }
    if let Some(v) = &update.timezone {
        if v.parse::<Tz>().is_err() {
            warn!(
                tenant_id = current.tenant_id,
                timezone = %v,
                "saving unrecognized timezone; threshold checks will use UTC"
            );
        }
        current.timezone = v.clone();
    }
    if let Some(v) = update.capture_photos {
        current.capture_photos = v;
    }
    if let Some(v) = update.fingerprint_enabled {
        current.fingerprint_enabled = v;
    }
    if let Some(v) = update.qr_code_enabled {
        current.qr_code_enabled = v;
    }
    if let Some(v) = update.manual_entry_enabled {
        current.manual_entry_enabled = v;
    }
    if let Some(v) = update.face_recognition_enabled {
        current.face_recognition_enabled = v;
    }
    if let Some(v) = update.photo_retention_days {
        current.photo_retention_days = v;
    }

    if !current.any_method_enabled() {
        return Err(EngineError::ConfigurationInvalid(
            "at least one check-in method must remain enabled".to_string(),
        ));
    }

    Ok(current)
}

/// Get organization settings
#[utoipa::path(
    get,
    path = "/api/v1/orgs/{tenant_id}/settings",
    params(("tenant_id", Path, description = "Organization id")),
    responses(
        (status = 200, description = "Current settings (defaults when never saved)", body = OrganizationSettings),
        (status = 500, description = "Internal server error")
    ),
    tag = "Settings"
)]
pub async fn get_settings(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder, EngineError> {
    let settings = state.settings.settings(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(settings))
}

/// Update organization settings
#[utoipa::path(
    put,
    path = "/api/v1/orgs/{tenant_id}/settings",
    params(("tenant_id", Path, description = "Organization id")),
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Settings saved", body = OrganizationSettings),
        (status = 400, description = "Invalid time format, or all check-in methods disabled"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Settings"
)]
pub async fn update_settings(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateSettings>,
) -> actix_web::Result<impl Responder, EngineError> {
    let tenant_id = path.into_inner();
    let current = state.settings.settings(tenant_id).await?;
    let merged = apply_update(current, &payload)?;
    let saved = state.settings.update_settings(merged).await?;
    Ok(HttpResponse::Ok().json(saved))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_change() -> UpdateSettings {
        UpdateSettings {
            work_start_time: None,
            work_end_time: None,
            lateness_time: None,
            early_departure_time: None,
            timezone: None,
            capture_photos: None,
            fingerprint_enabled: None,
            qr_code_enabled: None,
            manual_entry_enabled: None,
            face_recognition_enabled: None,
            photo_retention_days: None,
        }
    }

    #[test]
    fn disabling_the_last_method_is_rejected() {
        // qr only; turning it off must fail.
        let current = OrganizationSettings {
            manual_entry_enabled: false,
            face_recognition_enabled: false,
            ..OrganizationSettings::defaults_for(1)
        };
        let update = UpdateSettings {
            qr_code_enabled: Some(false),
            ..no_change()
        };
        assert!(matches!(
            apply_update(current, &update),
            Err(EngineError::ConfigurationInvalid(_))
        ));
    }

    #[test]
    fn swapping_methods_in_one_update_is_fine() {
        let current = OrganizationSettings {
            manual_entry_enabled: false,
            face_recognition_enabled: false,
            ..OrganizationSettings::defaults_for(1)
        };
        let update = UpdateSettings {
            qr_code_enabled: Some(false),
            manual_entry_enabled: Some(true),
            ..no_change()
        };
        let merged = apply_update(current, &update).unwrap();
        assert!(merged.manual_entry_enabled);
        assert!(!merged.qr_code_enabled);
    }

    #[test]
    fn short_time_format_parses() {
        let update = UpdateSettings {
            lateness_time: Some("09:15".to_string()),
            ..no_change()
        };
        let merged = apply_update(OrganizationSettings::defaults_for(1), &update).unwrap();
        assert_eq!(merged.lateness_time, NaiveTime::from_hms_opt(9, 15, 0).unwrap());
    }

    #[test]
    fn garbage_time_is_a_configuration_error() {
        let update = UpdateSettings {
            lateness_time: Some("quarter past nine".to_string()),
            ..no_change()
        };
        assert!(matches!(
            apply_update(OrganizationSettings::defaults_for(1), &update),
            Err(EngineError::ConfigurationInvalid(_))
        ));
    }

    #[test]
    fn unrecognized_timezone_is_accepted_but_kept_verbatim() {
        let update = UpdateSettings {
            timezone: Some("Mars/OlympusMons".to_string()),
            ..no_change()
        };
        let merged = apply_update(OrganizationSettings::defaults_for(1), &update).unwrap();
        assert_eq!(merged.timezone, "Mars/OlympusMons");
    }
}
