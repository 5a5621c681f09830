use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::employee::{Employee, EmployeeUpdate, NewEmployee};
use crate::service::directory::EmployeeDirectory;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct ResetPassword {
    #[schema(example = "n3w-pass")]
    pub new_password: String,
}

/// List employees, inactive included
#[utoipa::path(
    get,
    path = "/api/employees",
    responses(
        (status = 200, description = "All employees", body = [Employee]),
        (status = 403, description = "Admin only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(directory.list_all().await))
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = NewEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Username or password empty"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Username already exists", body = Object, example = json!({
            "message": "Username already exists"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    payload: web::Json<NewEmployee>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    let employee = directory.add(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(employee))
}

/// Employee profile. Employees may read their own.
#[utoipa::path(
    get,
    path = "/api/employees/{username}",
    params(
        ("username" = String, Path, description = "Employee username")
    ),
    responses(
        (status = 200, description = "Employee", body = Employee),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    path: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    let username = path.into_inner();
    if auth.username != username {
        auth.require_admin()?;
    }
    let employee = directory
        .find(&username)
        .await
        .ok_or(ApiError::NotFound("Employee"))?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{username}",
    params(
        ("username" = String, Path, description = "Employee username")
    ),
    request_body = EmployeeUpdate,
    responses(
        (status = 200, description = "Updated employee", body = Employee),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    path: web::Path<String>,
    payload: web::Json<EmployeeUpdate>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    let employee = directory.update(&path, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Deactivate Employee (soft delete)
#[utoipa::path(
    delete,
    path = "/api/employees/{username}",
    params(
        ("username" = String, Path, description = "Employee username")
    ),
    responses(
        (status = 200, description = "Employee deactivated", body = Object, example = json!({
            "message": "Employee deactivated"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn deactivate_employee(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    path: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    directory.deactivate(&path).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deactivated" })))
}

#[utoipa::path(
    put,
    path = "/api/employees/{username}/password",
    params(
        ("username" = String, Path, description = "Employee username")
    ),
    request_body = ResetPassword,
    responses(
        (status = 200, description = "Password reset", body = Object, example = json!({
            "message": "Password reset"
        })),
        (status = 400, description = "Empty password"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn reset_password(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
    path: web::Path<String>,
    payload: web::Json<ResetPassword>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    directory.reset_password(&path, &payload.new_password).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Password reset" })))
}

/// Active employees and managers eligible to manage a department
#[utoipa::path(
    get,
    path = "/api/employees/managers",
    responses(
        (status = 200, description = "Manager candidates", body = [Employee]),
        (status = 403, description = "Admin only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_manager_candidates(
    auth: AuthUser,
    directory: web::Data<EmployeeDirectory>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(directory.manager_candidates().await))
}
