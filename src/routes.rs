use crate::{
    api::{attendance, dashboard, department, employee, leave_request},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(GovernorConfig::default);
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/attendance")
                    .route("/check-in", web::post().to(attendance::check_in))
                    .route("/check-out", web::post().to(attendance::check_out))
                    .route("/today", web::get().to(attendance::today))
                    .route("/history", web::get().to(attendance::history))
                    .route("/history/{username}", web::get().to(attendance::history_for))
                    .route("/stats", web::get().to(attendance::stats)),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // before /{username}
                    .service(
                        web::resource("/managers")
                            .route(web::get().to(employee::list_manager_candidates)),
                    )
                    .service(
                        web::resource("/{username}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::deactivate_employee)),
                    )
                    .service(
                        web::resource("/{username}/password")
                            .route(web::put().to(employee::reset_password)),
                    ),
            )
            .service(
                web::scope("/departments")
                    .service(
                        web::resource("")
                            .route(web::get().to(department::list_departments))
                            .route(web::post().to(department::create_department)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(department::update_department))
                            .route(web::delete().to(department::delete_department)),
                    ),
            )
            .service(
                web::scope("/leave")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::my_leave))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    .service(web::resource("/pending").route(web::get().to(leave_request::pending_leave)))
                    .service(web::resource("/all").route(web::get().to(leave_request::leave_list)))
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            )
            .service(
                web::scope("/dashboard")
                    .route("/admin", web::get().to(dashboard::admin_stats))
                    .route("/department", web::get().to(dashboard::department_overview))
                    .route("/analytics", web::get().to(dashboard::analytics))
                    .route("/summary", web::get().to(dashboard::daily_summary)),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair, the old refresh token is revoked

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::db::init_db;
    use crate::geo::resolver::tests::StaticResolver;
    use crate::model::role::Role;
    use crate::service::clock::manual::ManualClock;
    use crate::state::AppState;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use chrono::NaiveDate;
    use serde_json::{Value, json};
    use std::net::SocketAddr;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn setup() -> (AppState, Config) {
        let config = Config::for_tests();
        let today = NaiveDate::from_ymd_opt(2026, 3, 18).unwrap();
        let db = init_db(&config, today).await.unwrap();
        let clock = Arc::new(ManualClock::at(today.and_hms_opt(9, 10, 0).unwrap()));
        let state = AppState::new(
            config.clone(),
            db,
            Arc::new(StaticResolver::new("Office Road")),
            clock,
        );
        (state, config)
    }

    macro_rules! app {
        () => {{
            let (state, config) = setup().await;
            test::init_service(
                App::new()
                    .configure(|cfg| state.register(cfg))
                    .configure(|cfg| configure(cfg, &config)),
            )
            .await
        }};
    }

    fn bearer(username: &str, role: Role) -> (&'static str, String) {
        let token = generate_access_token(username, role, "test-secret", 900).unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    fn punch(latitude: f64, longitude: f64) -> Value {
        json!({
            "latitude": latitude,
            "longitude": longitude,
            "accuracy": 8.0,
            "image": "data:image/jpeg;base64,AAAA"
        })
    }

    fn office() -> Value {
        punch(26.73208, 68.071982)
    }

    #[actix_web::test]
    async fn login_issues_usable_tokens() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .peer_addr(peer())
            .set_json(json!({ "username": "john.doe", "password": "password" }))
            .to_request();
        let tokens: Value = test::call_and_read_body_json(&app, req).await;
        let access = tokens["access_token"].as_str().unwrap();

        let req = test::TestRequest::get()
            .uri("/api/attendance/today")
            .peer_addr(peer())
            .insert_header(("Authorization", format!("Bearer {access}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn wrong_password_is_unauthorized() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .peer_addr(peer())
            .set_json(json!({ "username": "john.doe", "password": "nope" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid username or password");
    }

    #[actix_web::test]
    async fn protected_routes_require_a_token() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/attendance/today")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn refresh_token_cannot_call_the_api() {
        let app = app!();
        let (token, _) =
            crate::auth::jwt::generate_refresh_token("john.doe", Role::Employee, "test-secret", 900)
                .unwrap();
        let req = test::TestRequest::get()
            .uri("/api/attendance/today")
            .peer_addr(peer())
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn check_in_then_today_then_duplicate() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .peer_addr(peer())
            .insert_header(bearer("john.doe", Role::Employee))
            .set_json(office())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/attendance/today")
            .peer_addr(peer())
            .insert_header(bearer("john.doe", Role::Employee))
            .to_request();
        let today: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(today["has_checked_in"], true);
        assert_eq!(today["has_checked_out"], false);
        assert_eq!(today["location"], "Office Road");

        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .peer_addr(peer())
            .insert_header(bearer("john.doe", Role::Employee))
            .set_json(office())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn out_of_range_check_in_reports_distance() {
        let app = app!();

        // 0.002 degrees north of the office, roughly 222 m
        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .peer_addr(peer())
            .insert_header(bearer("peter.jones", Role::Employee))
            .set_json(punch(26.73408, 68.071982))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["radius_m"], 200.0);
        let distance = body["distance_m"].as_f64().unwrap();
        assert!((210.0..=235.0).contains(&distance), "{distance}");
    }

    #[actix_web::test]
    async fn invalid_coordinates_are_a_bad_request() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/api/attendance/check-in")
            .peer_addr(peer())
            .insert_header(bearer("peter.jones", Role::Employee))
            .set_json(punch(153.26792, 248.071982))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn check_out_without_check_in_conflicts() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/api/attendance/check-out")
            .peer_addr(peer())
            .insert_header(bearer("susan.baker", Role::Employee))
            .set_json(office())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "You haven't checked in today.");
    }

    #[actix_web::test]
    async fn employees_cannot_read_other_histories() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri("/api/attendance/history/peter.jones")
            .peer_addr(peer())
            .insert_header(bearer("john.doe", Role::Employee))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/api/attendance/history/peter.jones")
            .peer_addr(peer())
            .insert_header(bearer("jane.smith", Role::Manager))
            .to_request();
        let records: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(records.len(), 4);
    }

    #[actix_web::test]
    async fn refresh_rotates_and_revokes() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .peer_addr(peer())
            .set_json(json!({ "username": "admin", "password": "password" }))
            .to_request();
        let tokens: Value = test::call_and_read_body_json(&app, req).await;
        let refresh = tokens["refresh_token"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .peer_addr(peer())
            .set_json(json!({ "refresh_token": refresh }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/auth/refresh")
            .peer_addr(peer())
            .set_json(json!({ "refresh_token": refresh }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn admin_dashboard_and_employee_guard() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri("/api/dashboard/admin")
            .peer_addr(peer())
            .insert_header(bearer("admin", Role::Admin))
            .to_request();
        let stats: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["total_employees"], 5);
        assert_eq!(stats["present_today"], 0);

        let req = test::TestRequest::get()
            .uri("/api/employees")
            .peer_addr(peer())
            .insert_header(bearer("john.doe", Role::Employee))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn manager_candidates_route_is_not_a_username() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/employees/managers")
            .peer_addr(peer())
            .insert_header(bearer("admin", Role::Admin))
            .to_request();
        let candidates: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(candidates.len(), 4);
    }

    #[actix_web::test]
    async fn manager_processes_own_department_leave() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/api/leave")
            .peer_addr(peer())
            .insert_header(bearer("john.doe", Role::Employee))
            .set_json(json!({
                "leave_type": "annual",
                "from_date": "2026-03-20",
                "to_date": "2026-03-21",
                "reason": "Family event"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let leave: Value = test::read_body_json(resp).await;
        let id = leave["id"].as_str().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/api/leave/{id}/approve"))
            .peer_addr(peer())
            .insert_header(bearer("jane.smith", Role::Manager))
            .to_request();
        let approved: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(approved["status"], "approved");
        assert_eq!(approved["processed_by"], "jane.smith");

        // susan.baker is in Finance
        let req = test::TestRequest::put()
            .uri("/api/leave/L123/reject")
            .peer_addr(peer())
            .insert_header(bearer("jane.smith", Role::Manager))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }
}
