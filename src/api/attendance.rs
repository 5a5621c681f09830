use crate::auth::auth::AuthUser;
use crate::model::attendance::{AttendanceRecord, TodayStatus};
use crate::service::attendance::{AttendanceRecorder, PunchInput};
use crate::service::stats::{EmployeeStats, StatsService};
use actix_web::{HttpResponse, web};

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = PunchInput,
    responses(
        (status = 200, description = "Checked in successfully", body = AttendanceRecord),
        (status = 400, description = "Latitude or longitude out of range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee account is inactive"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "message": "You have already checked in today."
        })),
        (status = 422, description = "Outside the office geofence", body = Object, example = json!({
            "message": "Check-in failed. You must be within 200 meters of the office. You are currently about 220 meters away.",
            "distance_m": 220.0,
            "radius_m": 200.0
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    recorder: web::Data<AttendanceRecorder>,
    payload: web::Json<PunchInput>,
) -> actix_web::Result<HttpResponse> {
    let record = recorder.check_in(&auth.username, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = PunchInput,
    responses(
        (status = 200, description = "Checked out successfully", body = AttendanceRecord),
        (status = 400, description = "Latitude or longitude out of range"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Not checked in, or already checked out", body = Object, example = json!({
            "message": "You haven't checked in today."
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    recorder: web::Data<AttendanceRecorder>,
    payload: web::Json<PunchInput>,
) -> actix_web::Result<HttpResponse> {
    let record = recorder.check_out(&auth.username, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Caller's attendance for today", body = TodayStatus),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    recorder: web::Data<AttendanceRecorder>,
) -> actix_web::Result<HttpResponse> {
    let status = recorder.today_status(&auth.username).await?;
    Ok(HttpResponse::Ok().json(status))
}

#[utoipa::path(
    get,
    path = "/api/attendance/history",
    responses(
        (status = 200, description = "Caller's records, newest first", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    recorder: web::Data<AttendanceRecorder>,
) -> actix_web::Result<HttpResponse> {
    let records = recorder.history(&auth.username).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/attendance/history/{username}",
    params(
        ("username" = String, Path, description = "Employee username")
    ),
    responses(
        (status = 200, description = "Employee's records, newest first", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Manager/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history_for(
    auth: AuthUser,
    recorder: web::Data<AttendanceRecorder>,
    path: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager_or_admin()?;
    let records = recorder.history(&path).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/attendance/stats",
    responses(
        (status = 200, description = "Caller's figures for the current month", body = EmployeeStats),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn stats(
    auth: AuthUser,
    stats: web::Data<StatsService>,
) -> actix_web::Result<HttpResponse> {
    let stats = stats.employee_stats(&auth.username).await?;
    Ok(HttpResponse::Ok().json(stats))
}
