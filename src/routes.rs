use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

use crate::api::{admin, ics, leaves, settings};
use crate::config::Config;

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
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

    let feed_limiter = build_limiter(config.rate_feed_per_min);

    // Bearer-authenticated API (auth happens in the AuthUser extractor)
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/leaves")
                    .route(web::get().to(leaves::list_leaves))
                    .route(web::post().to(leaves::create_leave)),
            )
            .service(web::resource("/leaves/{id}").route(web::delete().to(leaves::delete_leave)))
            .service(
                web::resource("/ics/token")
                    .route(web::get().to(ics::get_feed_token))
                    .route(web::post().to(ics::rotate_feed_token)),
            )
            .service(
                web::scope("/admin")
                    .service(web::resource("/leaves").route(web::get().to(admin::list_all_leaves)))
                    .service(
                        web::resource("/leaves/{id}/status")
                            .route(web::post().to(admin::set_leave_status)),
                    )
                    .service(
                        web::resource("/settings/group")
                            .route(web::get().to(settings::get_admin_group))
                            .route(web::post().to(settings::set_admin_group)),
                    )
                    .service(
                        web::resource("/settings/groups")
                            .route(web::get().to(settings::list_groups)),
                    )
                    .service(
                        web::resource("/settings/group/members")
                            .route(web::get().to(settings::group_members)),
                    )
                    .service(
                        web::resource("/settings/talk")
                            .route(web::get().to(settings::get_talk_enabled))
                            .route(web::post().to(settings::set_talk_enabled)),
                    )
                    .service(
                        web::resource("/settings/talk/channels")
                            .route(web::get().to(settings::list_channels)),
                    )
                    .service(
                        web::resource("/settings/talk/channel")
                            .route(web::get().to(settings::get_channel))
                            .route(web::post().to(settings::set_channel)),
                    )
                    .service(web::resource("/test/talk").route(web::post().to(admin::test_talk))),
            ),
    );

    // Public, token-gated calendar feed
    cfg.service(
        web::resource("/ics/{uid}/{token}")
            .wrap(feed_limiter)
            .route(web::get().to(ics::serve_feed)),
    );
}
