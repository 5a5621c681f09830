use crate::auth::auth::AuthUser;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeave};
use crate::model::role::Role;
use crate::service::leave::LeaveService;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaveFilter {
    /// pending | approved | rejected
    pub status: Option<LeaveStatus>,
}

#[utoipa::path(
    get,
    path = "/api/leave",
    responses(
        (status = 200, description = "Caller's leave requests, newest first", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leave(auth: AuthUser, leaves: web::Data<LeaveService>) -> HttpResponse {
    HttpResponse::Ok().json(leaves.list_for_employee(&auth.username).await)
}

#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = NewLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "from_date after to_date", body = Object, example = json!({
            "message": "from_date cannot be after to_date"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    leaves: web::Data<LeaveService>,
    payload: web::Json<NewLeave>,
) -> actix_web::Result<HttpResponse> {
    let request = leaves.submit(&auth.username, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(request))
}

/// Pending requests: everything for admins, own department for managers
#[utoipa::path(
    get,
    path = "/api/leave/pending",
    responses(
        (status = 200, description = "Pending leave requests", body = [LeaveRequest]),
        (status = 403, description = "Manager/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn pending_leave(
    auth: AuthUser,
    leaves: web::Data<LeaveService>,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager_or_admin()?;
    let pending = match auth.role {
        Role::Admin => leaves.list_pending().await,
        _ => leaves.list_pending_for_department(&auth.username).await?,
    };
    Ok(HttpResponse::Ok().json(pending))
}

#[utoipa::path(
    get,
    path = "/api/leave/all",
    params(LeaveFilter),
    responses(
        (status = 200, description = "All leave requests", body = [LeaveRequest]),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    leaves: web::Data<LeaveService>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    let mut requests = leaves.list_all().await;
    if let Some(status) = query.status {
        requests.retain(|l| l.status == status);
    }
    Ok(HttpResponse::Ok().json(requests))
}

async fn decide(
    auth: AuthUser,
    leaves: web::Data<LeaveService>,
    leave_id: String,
    decision: LeaveStatus,
) -> actix_web::Result<HttpResponse> {
    auth.require_manager_or_admin()?;
    let request = leaves
        .decide(&leave_id, decision, &auth.username, auth.role)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 403, description = "Not allowed to process this request"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already processed", body = Object, example = json!({
            "message": "Leave request has already been processed"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    leaves: web::Data<LeaveService>,
    path: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    decide(auth, leaves, path.into_inner(), LeaveStatus::Approved).await
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 403, description = "Not allowed to process this request"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Already processed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    leaves: web::Data<LeaveService>,
    path: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    decide(auth, leaves, path.into_inner(), LeaveStatus::Rejected).await
}
