use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "DEPT003",
    "name": "IT Department",
    "description": "Information Technology Department",
    "manager": "jane.smith",
    "created_at": "2023-01-01T00:00:00Z"
}))]
pub struct Department {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Username of the department manager, empty when unassigned
    pub manager: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DepartmentInput {
    #[schema(example = "Marketing")]
    pub name: String,
    #[schema(example = "Marketing and Communications")]
    pub description: String,
    #[schema(example = "")]
    pub manager: String,
}
