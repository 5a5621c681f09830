use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::role::Role;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, EnumString, AsRefStr, Display, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmployeeStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(
    example = json!({
        "username": "john.doe",
        "full_name": "John Doe",
        "department": "IT Department",
        "position": "Frontend Developer",
        "role": "employee",
        "status": "active",
        "profile_photo": null
    })
)]
pub struct Employee {
    #[schema(example = "john.doe")]
    pub username: String,

    #[schema(example = "John Doe")]
    pub full_name: String,

    #[schema(example = "IT Department")]
    pub department: String,

    #[schema(example = "Frontend Developer")]
    pub position: String,

    pub role: Role,

    pub status: EmployeeStatus,

    /// base64 data URI
    #[schema(nullable = true)]
    pub profile_photo: Option<String>,

    #[serde(skip)]
    pub password_hash: String,
}

impl Employee {
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewEmployee {
    #[schema(example = "mary.khan")]
    pub username: String,
    #[schema(example = "Mary Khan")]
    pub full_name: String,
    #[schema(example = "Finance")]
    pub department: String,
    #[schema(example = "Accountant")]
    pub position: String,
    pub role: Role,
    #[schema(example = "changeme")]
    pub password: String,
    pub profile_photo: Option<String>,
}

/// Partial update, absent fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EmployeeUpdate {
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub role: Option<Role>,
    pub status: Option<EmployeeStatus>,
    pub profile_photo: Option<String>,
    /// Re-hashed when non-empty
    pub password: Option<String>,
}
