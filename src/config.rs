use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_status_per_min: u32,
    pub rate_commit_per_min: u32,
    pub rate_admin_per_min: u32,

    // Photo capture timing (UX tunable, must stay bounded)
    pub photo_settle_ms: u64,
    pub photo_frame_timeout_ms: u64,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),

            rate_status_per_min: env::var("RATE_STATUS_PER_MIN")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap(),
            rate_commit_per_min: env::var("RATE_COMMIT_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap(),
            rate_admin_per_min: env::var("RATE_ADMIN_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),

            photo_settle_ms: env::var("PHOTO_SETTLE_MS")
                .unwrap_or_else(|_| "3500".to_string())
                .parse()
                .unwrap(),
            photo_frame_timeout_ms: env::var("PHOTO_FRAME_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
        }
    }
}
