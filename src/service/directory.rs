use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::auth::password::{hash_password, verify_password};
use crate::db::MemoryDb;
use crate::error::ApiError;
use crate::model::employee::{Employee, EmployeeStatus, EmployeeUpdate, NewEmployee};
use crate::model::role::Role;

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeLookup {
    pub active: bool,
    pub department: String,
}

/// Employee/department membership as seen by attendance, leave and dashboards.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn lookup_employee(&self, username: &str) -> anyhow::Result<Option<EmployeeLookup>>;

    /// Active members only.
    async fn list_department_members(&self, department: &str) -> anyhow::Result<Vec<String>>;
}

pub struct EmployeeDirectory {
    db: Arc<MemoryDb>,
}

impl EmployeeDirectory {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }

    pub async fn find(&self, username: &str) -> Option<Employee> {
        self.db
            .employees
            .read()
            .await
            .iter()
            .find(|e| e.username == username)
            .cloned()
    }

    /// Includes inactive employees.
    pub async fn list_all(&self) -> Vec<Employee> {
        self.db.employees.read().await.clone()
    }

    pub async fn list_active(&self) -> Vec<Employee> {
        self.db
            .employees
            .read()
            .await
            .iter()
            .filter(|e| e.is_active())
            .cloned()
            .collect()
    }

    /// Active employees and managers that may be put in charge of a department.
    pub async fn manager_candidates(&self) -> Vec<Employee> {
        self.db
            .employees
            .read()
            .await
            .iter()
            .filter(|e| e.is_active() && matches!(e.role, Role::Employee | Role::Manager))
            .cloned()
            .collect()
    }

    pub async fn add(&self, new: NewEmployee) -> Result<Employee, ApiError> {
        let username = new.username.trim().to_string();
        if username.is_empty() || new.password.is_empty() {
            return Err(ApiError::BadRequest(
                "Username and password must not be empty".to_string(),
            ));
        }

        let password_hash =
            hash_password(&new.password).map_err(|e| ApiError::internal("Failed to hash password", e))?;

        let mut employees = self.db.employees.write().await;
        if employees.iter().any(|e| e.username == username) {
            return Err(ApiError::UsernameTaken);
        }

        let employee = Employee {
            username,
            full_name: new.full_name,
            department: new.department,
            position: new.position,
            role: new.role,
            status: EmployeeStatus::Active,
            profile_photo: new.profile_photo,
            password_hash,
        };
        employees.push(employee.clone());

        info!(username = %employee.username, role = %employee.role, "Employee added");
        Ok(employee)
    }

    pub async fn update(&self, username: &str, update: EmployeeUpdate) -> Result<Employee, ApiError> {
        let password_hash = match update.password.as_deref() {
            Some(p) if !p.is_empty() => {
                Some(hash_password(p).map_err(|e| ApiError::internal("Failed to hash password", e))?)
            }
            _ => None,
        };

        let mut employees = self.db.employees.write().await;
        let employee = employees
            .iter_mut()
            .find(|e| e.username == username)
            .ok_or(ApiError::NotFound("Employee"))?;

        if let Some(v) = update.full_name {
            employee.full_name = v;
        }
        if let Some(v) = update.department {
            employee.department = v;
        }
        if let Some(v) = update.position {
            employee.position = v;
        }
        if let Some(v) = update.role {
            employee.role = v;
        }
        if let Some(v) = update.status {
            employee.status = v;
        }
        if let Some(v) = update.profile_photo {
            employee.profile_photo = Some(v);
        }
        if let Some(hash) = password_hash {
            info!(username, "Password updated");
            employee.password_hash = hash;
        }

        Ok(employee.clone())
    }

    /// Soft delete: the employee stays listed but can no longer log in or check in.
    pub async fn deactivate(&self, username: &str) -> Result<(), ApiError> {
        let mut employees = self.db.employees.write().await;
        let employee = employees
            .iter_mut()
            .find(|e| e.username == username)
            .ok_or(ApiError::NotFound("Employee"))?;
        employee.status = EmployeeStatus::Inactive;
        info!(username, "Employee deactivated");
        Ok(())
    }

    pub async fn reset_password(&self, username: &str, new_password: &str) -> Result<(), ApiError> {
        if new_password.is_empty() {
            return Err(ApiError::BadRequest("Password must not be empty".to_string()));
        }
        self.update(
            username,
            EmployeeUpdate {
                password: Some(new_password.to_string()),
                ..Default::default()
            },
        )
        .await
        .map(|_| ())
    }

    /// Unknown user, inactive user and wrong password are indistinguishable to the caller.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Employee, ApiError> {
        let employee = self
            .find(username.trim())
            .await
            .filter(Employee::is_active)
            .ok_or(ApiError::InvalidCredentials)?;

        verify_password(password, &employee.password_hash)
            .map_err(|_| ApiError::InvalidCredentials)?;

        Ok(employee)
    }
}

#[async_trait]
impl Directory for EmployeeDirectory {
    async fn lookup_employee(&self, username: &str) -> anyhow::Result<Option<EmployeeLookup>> {
        Ok(self.find(username).await.map(|e| EmployeeLookup {
            active: e.is_active(),
            department: e.department,
        }))
    }

    async fn list_department_members(&self, department: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .db
            .employees
            .read()
            .await
            .iter()
            .filter(|e| e.is_active() && e.department == department)
            .map(|e| e.username.clone())
            .collect())
    }
}
