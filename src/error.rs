use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Rejections raised by check-in/check-out. All but `Storage` are user-correctable.
#[derive(Debug, Display)]
pub enum AttendanceError {
    #[display(fmt = "You have already checked in today.")]
    AlreadyCheckedIn,

    #[display(fmt = "You have already checked out today.")]
    AlreadyCheckedOut,

    #[display(fmt = "You haven't checked in today.")]
    NotCheckedIn,

    #[display(
        fmt = "Check-in failed. You must be within {:.0} meters of the office. You are currently about {:.0} meters away.",
        radius_m,
        distance_m
    )]
    OutOfRange { distance_m: f64, radius_m: f64 },

    #[display(fmt = "Invalid location: latitude must be within [-90, 90] and longitude within [-180, 180].")]
    InvalidCoordinates,

    #[display(fmt = "Employee not found")]
    EmployeeNotFound,

    #[display(fmt = "Employee account is inactive")]
    Inactive,

    #[display(fmt = "Internal Server Error")]
    Storage(anyhow::Error),
}

impl std::error::Error for AttendanceError {}

impl From<anyhow::Error> for AttendanceError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!(error = %e, "Attendance storage failure");
        AttendanceError::Storage(e)
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::AlreadyCheckedIn
            | AttendanceError::AlreadyCheckedOut
            | AttendanceError::NotCheckedIn => StatusCode::CONFLICT,
            AttendanceError::InvalidCoordinates => StatusCode::BAD_REQUEST,
            AttendanceError::OutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AttendanceError::EmployeeNotFound => StatusCode::NOT_FOUND,
            AttendanceError::Inactive => StatusCode::FORBIDDEN,
            AttendanceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({ "message": self.to_string() });
        if let AttendanceError::OutOfRange {
            distance_m,
            radius_m,
        } = self
        {
            body["distance_m"] = json!(distance_m.round());
            body["radius_m"] = json!(radius_m);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Errors for the directory, department, leave and auth endpoints.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),

    #[display(fmt = "Username already exists")]
    UsernameTaken,

    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "Leave request has already been processed")]
    AlreadyProcessed,

    #[display(fmt = "{}", _0)]
    Forbidden(&'static str),

    #[display(fmt = "Invalid username or password")]
    InvalidCredentials,

    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Logs the underlying failure and hides it from the caller.
    pub fn internal(context: &str, e: impl std::fmt::Display) -> Self {
        tracing::error!(error = %e, "{}", context);
        ApiError::Internal
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::internal("Storage failure", e)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UsernameTaken | ApiError::AlreadyProcessed => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "message": self.to_string() }))
    }
}
