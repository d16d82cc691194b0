use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::info;

use crate::model::settings::OrganizationSettings;

/// Settings older than this are considered stale and re-read from the
/// database; thresholds edited by an admin take effect within this window.
const SETTINGS_TTL_SECS: u64 = 300;

static SETTINGS_CACHE: Lazy<Cache<u64, OrganizationSettings>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(SETTINGS_TTL_SECS))
        .build()
});

pub async fn get(tenant_id: u64) -> Option<OrganizationSettings> {
    SETTINGS_CACHE.get(&tenant_id).await
}

pub async fn put(settings: OrganizationSettings) {
    SETTINGS_CACHE.insert(settings.tenant_id, settings).await;
}

/// Drop the cached entry after an admin edit so the next read sees the new
/// thresholds immediately instead of after TTL expiry.
pub async fn invalidate(tenant_id: u64) {
    SETTINGS_CACHE.invalidate(&tenant_id).await;
}

/// Preload every tenant's settings at startup (batched stream) so the first
/// kiosk request of the day does not pay the database round trip.
pub async fn warmup_settings_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, OrganizationSettings>(
        r#"
        SELECT tenant_id, work_start_time, work_end_time, lateness_time,
               early_departure_time, timezone, capture_photos, fingerprint_enabled,
               qr_code_enabled, manual_entry_enabled, face_recognition_enabled,
               photo_retention_days
        FROM organization_settings
        "#,
    )
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let settings: OrganizationSettings = row?;
        batch.push(settings);
        total_count += 1;

        if batch.len() >= batch_size {
            flush(&mut batch).await;
        }
    }

    if !batch.is_empty() {
        flush(&mut batch).await;
    }

    info!("Settings cache warmup complete: {} tenants", total_count);

    Ok(())
}

async fn flush(batch: &mut Vec<OrganizationSettings>) {
    let inserts: Vec<_> = batch.drain(..).map(put).collect();
    futures::future::join_all(inserts).await;
}
