use crate::{
    auth::jwt::{generate_access_token, generate_refresh_token, verify_token},
    config::Config,
    db::{MemoryDb, RefreshTokenEntry},
    error::ApiError,
    model::employee::Employee,
    models::{LoginReqDto, RefreshReqDto, TokenPair, TokenType},
    service::directory::EmployeeDirectory,
};
use actix_web::{HttpResponse, web};
use tracing::{debug, info, instrument};

/// Issues an access/refresh pair and records the refresh token's jti.
async fn issue_tokens(
    employee: &Employee,
    db: &MemoryDb,
    config: &Config,
) -> Result<TokenPair, ApiError> {
    let access_token = generate_access_token(
        &employee.username,
        employee.role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| ApiError::internal("Failed to sign access token", e))?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        &employee.username,
        employee.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| ApiError::internal("Failed to sign refresh token", e))?;

    debug!(jti = %refresh_claims.jti, "Storing refresh token");
    db.refresh_tokens.write().await.insert(
        refresh_claims.jti,
        RefreshTokenEntry {
            username: employee.username.clone(),
            expires_at: refresh_claims.exp,
            revoked: false,
        },
    );

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = TokenPair),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid username or password", body = Object, example = json!({
            "message": "Invalid username or password"
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip_all, fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    directory: web::Data<EmployeeDirectory>,
    db: web::Data<MemoryDb>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ApiError::BadRequest("Username or password required".to_string()).into());
    }

    let employee = directory.authenticate(&user.username, &user.password).await?;
    let tokens = issue_tokens(&employee, &db, &config).await?;

    info!(role = %employee.role, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshReqDto,
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Invalid, expired or revoked refresh token")
    ),
    tag = "Auth"
)]
pub async fn refresh_token(
    body: web::Json<RefreshReqDto>,
    directory: web::Data<EmployeeDirectory>,
    db: web::Data<MemoryDb>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    let claims = match verify_token(&body.refresh_token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return Ok(HttpResponse::Unauthorized().finish()),
    };

    // revoke old refresh token
    {
        let mut tokens = db.refresh_tokens.write().await;
        match tokens.get_mut(&claims.jti) {
            Some(entry) if !entry.revoked => entry.revoked = true,
            _ => return Ok(HttpResponse::Unauthorized().finish()),
        }
    }

    // role and status may have changed since the token was issued
    let Some(employee) = directory.find(&claims.sub).await.filter(Employee::is_active) else {
        return Ok(HttpResponse::Unauthorized().finish());
    };

    let tokens = issue_tokens(&employee, &db, &config).await?;
    info!(username = %employee.username, "Refresh token rotated");
    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = RefreshReqDto,
    responses(
        (status = 204, description = "Refresh token revoked (also returned for unknown tokens)")
    ),
    tag = "Auth"
)]
pub async fn logout(
    body: web::Json<RefreshReqDto>,
    db: web::Data<MemoryDb>,
    config: web::Data<Config>,
) -> HttpResponse {
    let claims = match verify_token(&body.refresh_token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Some(entry) = db.refresh_tokens.write().await.get_mut(&claims.jti) {
        entry.revoked = true;
    }

    HttpResponse::NoContent().finish()
}
