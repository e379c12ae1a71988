use crate::{
    api::{reimbursement, user},
    auth::handlers,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter config
    fn build_limiter(requests_per_min: u32) -> GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap()
    }

    let login_limiter = build_limiter(config.rate_login_per_min);
    let register_limiter = build_limiter(config.rate_register_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("")
                    .wrap(Governor::new(&login_limiter))
                    .route(web::post().to(handlers::login)),
            )
            .service(web::resource("/session").route(web::get().to(handlers::session)))
            .service(web::resource("/logout").route(web::post().to(handlers::logout))),
    );

    cfg.service(
        web::scope("/users")
            .service(
                web::resource("")
                    .wrap(Governor::new(&register_limiter))
                    .route(web::post().to(user::register)),
            )
            .service(
                web::resource("/all")
                    .wrap(Governor::new(&protected_limiter))
                    .route(web::get().to(user::list_users)),
            )
            .service(
                web::resource("/{user_id}/role")
                    .wrap(Governor::new(&protected_limiter))
                    .route(web::patch().to(user::update_role)),
            )
            .service(
                web::resource("/{user_id}")
                    .wrap(Governor::new(&protected_limiter))
                    .route(web::delete().to(user::delete_user)),
            ),
    );

    cfg.service(
        web::scope("/reimbursements")
            .wrap(Governor::new(&protected_limiter))
            // fixed segments before the {id} catch-alls
            .service(
                web::resource("/user/self")
                    .route(web::post().to(reimbursement::create_for_self))
                    .route(web::get().to(reimbursement::list_own)),
            )
            .service(web::resource("/all").route(web::get().to(reimbursement::list_all)))
            .service(web::resource("/pending").route(web::get().to(reimbursement::list_pending)))
            .service(
                web::resource("/user/{user_id}/pending")
                    .route(web::get().to(reimbursement::list_user_pending)),
            )
            .service(
                web::resource("/user/{user_id}")
                    .route(web::get().to(reimbursement::list_for_user)),
            )
            .service(
                web::resource("/{id}/resolve").route(web::patch().to(reimbursement::resolve)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::post().to(reimbursement::create_for_user))
                    .route(web::patch().to(reimbursement::update)),
            ),
    );
}
