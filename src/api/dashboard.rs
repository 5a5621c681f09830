use crate::auth::auth::AuthUser;
use crate::service::stats::{AdminStats, Analytics, DailySummary, MemberStatus, StatsService};
use actix_web::{HttpResponse, web};

#[utoipa::path(
    get,
    path = "/api/dashboard/admin",
    responses(
        (status = 200, description = "Headcount for today", body = AdminStats),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn admin_stats(
    auth: AuthUser,
    stats: web::Data<StatsService>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(stats.admin_stats().await?))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/department",
    responses(
        (status = 200, description = "Today's status of the manager's department", body = [MemberStatus]),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn department_overview(
    auth: AuthUser,
    stats: web::Data<StatsService>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager()?;
    Ok(HttpResponse::Ok().json(stats.department_overview(&auth.username).await?))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/analytics",
    responses(
        (status = 200, description = "Weekly trend and leave breakdown", body = Analytics),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn analytics(
    auth: AuthUser,
    stats: web::Data<StatsService>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(stats.analytics().await?))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    responses(
        (status = 200, description = "Today's attendance summary", body = DailySummary),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn daily_summary(
    auth: AuthUser,
    stats: web::Data<StatsService>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(stats.daily_summary().await?))
}
