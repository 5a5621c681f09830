use crate::auth::auth::AuthUser;
use crate::model::department::{Department, DepartmentInput};
use crate::service::department::DepartmentService;
use actix_web::{HttpResponse, web};

#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "All departments", body = [Department])
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_departments(
    _auth: AuthUser,
    departments: web::Data<DepartmentService>,
) -> HttpResponse {
    HttpResponse::Ok().json(departments.list().await)
}

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = DepartmentInput,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Empty name"),
        (status = 403, description = "Admin only")
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_department(
    auth: AuthUser,
    departments: web::Data<DepartmentService>,
    payload: web::Json<DepartmentInput>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    let department = departments.add(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(department))
}

#[utoipa::path(
    put,
    path = "/api/departments/{id}",
    params(
        ("id" = String, Path, description = "Department id")
    ),
    request_body = DepartmentInput,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_department(
    auth: AuthUser,
    departments: web::Data<DepartmentService>,
    path: web::Path<String>,
    payload: web::Json<DepartmentInput>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    let department = departments.update(&path, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    params(
        ("id" = String, Path, description = "Department id")
    ),
    responses(
        (status = 204, description = "Department deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_department(
    auth: AuthUser,
    departments: web::Data<DepartmentService>,
    path: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    departments.delete(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
