use crate::{
    api::{attendance, changes, employee, request, settings, shift, statistics},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub type Limiter = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-route rate limits. Built once so every worker shares the same
/// buckets.
#[derive(Clone)]
pub struct RateLimits {
    pub login: Limiter,
    pub refresh: Limiter,
    pub protected: Limiter,
}

fn build_limiter(requests_per_min: u32) -> Option<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / u64::from(requests_per_min)).max(1)
    };

    GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let limiter = |rate: u32, name: &str| {
            build_limiter(rate).ok_or_else(|| anyhow::anyhow!("Invalid {name} rate limit: {rate}"))
        };

        Ok(Self {
            login: limiter(config.rate_login_per_min, "login")?,
            refresh: limiter(config.rate_refresh_per_min, "refresh")?,
            protected: limiter(config.rate_protected_per_min, "protected")?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&limits.login))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Governor::new(&limits.refresh))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Governor::new(&limits.login))
                    .route(web::post().to(handlers::logout)),
            )
            .service(
                web::resource("/bootstrap")
                    .wrap(Governor::new(&limits.login))
                    .route(web::post().to(handlers::bootstrap)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(&limits.protected)) // rate limiting
            .service(
                web::scope("/attendance")
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(web::resource("/bulk").route(web::post().to(attendance::bulk)))
                    // /attendance/{employee_id}/{year}/{month}
                    .service(
                        web::resource("/{employee_id}/{year}/{month}")
                            .route(web::get().to(attendance::month_calendar)),
                    )
                    // /attendance/{employee_id}/{year}/{month}/{day}
                    .service(
                        web::resource("/{employee_id}/{year}/{month}/{day}")
                            .route(web::put().to(attendance::set_day)),
                    ),
            )
            .service(
                web::scope("/statistics")
                    .service(web::resource("").route(web::get().to(statistics::organization)))
                    .service(web::resource("/summary").route(web::get().to(statistics::summary))),
            )
            .service(web::resource("/timeline").route(web::get().to(statistics::timeline)))
            .service(
                web::scope("/requests")
                    .service(
                        web::resource("")
                            .route(web::get().to(request::list_requests))
                            .route(web::post().to(request::create_request)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(request::approve_request)),
                    )
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(request::reject_request)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::resource("/profile/password").route(web::put().to(handlers::change_password)),
            )
            .service(
                web::resource("/settings")
                    .route(web::get().to(settings::get_settings))
                    .route(web::put().to(settings::update_settings)),
            )
            .service(web::resource("/shifts").route(web::get().to(shift::list_shifts)))
            .service(
                web::resource("/schedules")
                    .route(web::get().to(shift::list_schedules))
                    .route(web::put().to(shift::assign_shift)),
            )
            .service(web::resource("/changes").route(web::get().to(changes::changes))),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token + rotated refresh_token

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_accepts_configured_rates() {
        assert!(build_limiter(60).is_some());
        assert!(build_limiter(1000).is_some());
        assert!(build_limiter(0).is_some());
    }
}
