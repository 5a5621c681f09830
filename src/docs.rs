use crate::api::employee::ResetPassword;
use crate::geo::Coordinates;
use crate::model::attendance::{AttendanceRecord, Capture, Punch, TodayStatus};
use crate::model::department::{Department, DepartmentInput};
use crate::model::employee::{Employee, EmployeeStatus, EmployeeUpdate, NewEmployee};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType, NewLeave};
use crate::model::role::Role;
use crate::models::{LoginReqDto, RefreshReqDto, TokenPair};
use crate::service::attendance::PunchInput;
use crate::service::stats::{
    AdminStats, Analytics, DailySummary, EmployeeStats, LeaveStatusCount, LeaveTypeCount,
    MemberStatus, PresenceStatus, TrendPoint,
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geo Attendance API",
        version = "1.0.0",
        description = r#"
## Geofenced Attendance System

Employees check in and out with a geolocated selfie. A check-in is only
accepted within the configured radius of the office.

### Key Features
- **Attendance**
  - One record per employee per day, check-in then check-out
  - Automatic check-out 12 hours after check-in when the employee forgets
  - Reverse-geocoded addresses for every punch
- **Leave Management**
  - Apply for leave, manager/admin approval
- **Dashboards**
  - Monthly employee figures, daily headcount, weekly trend, department view

### Security
Endpoints under `/api` require a **JWT Bearer** access token from `/auth/login`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::history,
        crate::api::attendance::history_for,
        crate::api::attendance::stats,

        crate::api::employee::list_employees,
        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::deactivate_employee,
        crate::api::employee::reset_password,
        crate::api::employee::list_manager_candidates,

        crate::api::department::list_departments,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::leave_request::my_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::pending_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::dashboard::admin_stats,
        crate::api::dashboard::department_overview,
        crate::api::dashboard::analytics,
        crate::api::dashboard::daily_summary
    ),
    components(
        schemas(
            LoginReqDto,
            RefreshReqDto,
            TokenPair,
            Coordinates,
            PunchInput,
            Capture,
            Punch,
            AttendanceRecord,
            TodayStatus,
            Role,
            Employee,
            EmployeeStatus,
            NewEmployee,
            EmployeeUpdate,
            ResetPassword,
            Department,
            DepartmentInput,
            LeaveType,
            LeaveStatus,
            LeaveRequest,
            NewLeave,
            EmployeeStats,
            AdminStats,
            PresenceStatus,
            MemberStatus,
            TrendPoint,
            LeaveTypeCount,
            LeaveStatusCount,
            Analytics,
            DailySummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Attendance", description = "Geofenced check-in/check-out"),
        (name = "Employee", description = "Employee directory (admin)"),
        (name = "Department", description = "Department management"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Dashboard", description = "Dashboards and analytics"),
    )
)]
pub struct ApiDoc;
