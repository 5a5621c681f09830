use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::db::MemoryDb;
use crate::error::ApiError;
use crate::model::department::{Department, DepartmentInput};

pub struct DepartmentService {
    db: Arc<MemoryDb>,
}

impl DepartmentService {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Vec<Department> {
        self.db.departments.read().await.clone()
    }

    pub async fn add(&self, input: DepartmentInput) -> Result<Department, ApiError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ApiError::BadRequest("Department name must not be empty".to_string()));
        }

        let now = Utc::now();
        let mut departments = self.db.departments.write().await;
        let mut id = format!("DEPT{}", now.timestamp_millis());
        // two adds within the same millisecond
        while departments.iter().any(|d| d.id == id) {
            id.push('x');
        }

        let department = Department {
            id,
            name: name.to_string(),
            description: input.description,
            manager: input.manager,
            created_at: now,
        };
        departments.push(department.clone());

        info!(id = %department.id, name = %department.name, "Department added");
        Ok(department)
    }

    pub async fn update(&self, id: &str, input: DepartmentInput) -> Result<Department, ApiError> {
        let mut departments = self.db.departments.write().await;
        let department = departments
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(ApiError::NotFound("Department"))?;

        department.name = input.name;
        department.description = input.description;
        department.manager = input.manager;

        info!(id, "Department updated");
        Ok(department.clone())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let mut departments = self.db.departments.write().await;
        let before = departments.len();
        departments.retain(|d| d.id != id);
        if departments.len() == before {
            return Err(ApiError::NotFound("Department"));
        }
        info!(id, "Department deleted");
        Ok(())
    }
}
