use crate::{
    api::{attendance, settings, staff},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let status_limiter = Arc::new(build_limiter(config.rate_status_per_min));
    let commit_limiter = Arc::new(build_limiter(config.rate_commit_per_min));
    let admin_limiter = Arc::new(build_limiter(config.rate_admin_per_min));

    cfg.service(
        web::scope(&config.api_prefix).service(
            web::scope("/orgs/{tenant_id}")
                // Kiosk endpoints: status polling and the single commit path
                .service(
                    web::scope("/attendance")
                        .service(
                            web::resource("/status")
                                .wrap(status_limiter.clone())
                                .route(web::get().to(attendance::status)),
                        )
                        .service(
                            web::resource("/check-in")
                                .wrap(commit_limiter.clone())
                                .route(web::post().to(attendance::check_in)),
                        )
                        .service(
                            web::resource("/check-out")
                                .wrap(commit_limiter.clone())
                                .route(web::post().to(attendance::check_out)),
                        ),
                )
                // Admin endpoints
                .service(
                    web::resource("/settings")
                        .wrap(admin_limiter.clone())
                        .route(web::get().to(settings::get_settings))
                        .route(web::put().to(settings::update_settings)),
                )
                .service(
                    web::scope("/staff")
                        .service(
                            web::resource("")
                                .wrap(admin_limiter.clone())
                                .route(web::post().to(staff::create_staff))
                                .route(web::get().to(staff::list_staff)),
                        )
                        .service(
                            web::resource("/{staff_id}")
                                .wrap(admin_limiter.clone())
                                .route(web::get().to(staff::get_staff)),
                        )
                        .service(
                            web::resource("/{staff_id}/active")
                                .wrap(admin_limiter.clone())
                                .route(web::put().to(staff::set_active)),
                        ),
                ),
        ),
    );
}
