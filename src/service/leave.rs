use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::db::MemoryDb;
use crate::error::ApiError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeave};
use crate::model::role::Role;
use crate::service::clock::Clock;
use crate::service::directory::Directory;

pub struct LeaveService {
    db: Arc<MemoryDb>,
    directory: Arc<dyn Directory>,
    clock: Arc<dyn Clock>,
}

impl LeaveService {
    pub fn new(db: Arc<MemoryDb>, directory: Arc<dyn Directory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            directory,
            clock,
        }
    }

    pub async fn submit(&self, username: &str, new: NewLeave) -> Result<LeaveRequest, ApiError> {
        if new.from_date > new.to_date {
            return Err(ApiError::BadRequest(
                "from_date cannot be after to_date".to_string(),
            ));
        }

        let request = LeaveRequest {
            id: format!("L-{}", Uuid::new_v4()),
            username: username.to_string(),
            full_name: None,
            leave_type: new.leave_type,
            from_date: new.from_date,
            to_date: new.to_date,
            reason: new.reason,
            status: LeaveStatus::Pending,
            applied_date: self.clock.today(),
            processed_by: None,
            processed_at: None,
        };
        self.db.leave_requests.write().await.push(request.clone());

        info!(leave_id = %request.id, username, leave_type = %request.leave_type, "Leave request submitted");
        Ok(request)
    }

    /// Newest application first.
    pub async fn list_for_employee(&self, username: &str) -> Vec<LeaveRequest> {
        let mut requests: Vec<_> = self
            .db
            .leave_requests
            .read()
            .await
            .iter()
            .filter(|l| l.username == username)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.applied_date.cmp(&a.applied_date));
        requests
    }

    async fn with_full_names(&self, mut requests: Vec<LeaveRequest>) -> Vec<LeaveRequest> {
        let names: HashMap<String, String> = self
            .db
            .employees
            .read()
            .await
            .iter()
            .map(|e| (e.username.clone(), e.full_name.clone()))
            .collect();

        for request in &mut requests {
            request.full_name = Some(
                names
                    .get(&request.username)
                    .cloned()
                    .unwrap_or_else(|| request.username.clone()),
            );
        }
        requests
    }

    pub async fn list_all(&self) -> Vec<LeaveRequest> {
        let requests = self.db.leave_requests.read().await.clone();
        self.with_full_names(requests).await
    }

    pub async fn list_pending(&self) -> Vec<LeaveRequest> {
        let requests = self
            .db
            .leave_requests
            .read()
            .await
            .iter()
            .filter(|l| l.status == LeaveStatus::Pending)
            .cloned()
            .collect();
        self.with_full_names(requests).await
    }

    async fn department_of(&self, username: &str) -> Result<Option<String>, ApiError> {
        Ok(self
            .directory
            .lookup_employee(username)
            .await?
            .map(|lookup| lookup.department))
    }

    /// Pending requests from the active members of the manager's department.
    pub async fn list_pending_for_department(
        &self,
        manager: &str,
    ) -> Result<Vec<LeaveRequest>, ApiError> {
        let Some(department) = self.department_of(manager).await? else {
            return Ok(Vec::new());
        };
        let members: HashSet<String> = self
            .directory
            .list_department_members(&department)
            .await?
            .into_iter()
            .collect();

        let requests = self
            .db
            .leave_requests
            .read()
            .await
            .iter()
            .filter(|l| l.status == LeaveStatus::Pending && members.contains(&l.username))
            .cloned()
            .collect();
        Ok(self.with_full_names(requests).await)
    }

    /// Approves or rejects a pending request.
    ///
    /// Managers may only process requests from their own department.
    pub async fn decide(
        &self,
        leave_id: &str,
        decision: LeaveStatus,
        actor: &str,
        actor_role: Role,
    ) -> Result<LeaveRequest, ApiError> {
        if decision == LeaveStatus::Pending {
            return Err(ApiError::BadRequest("Decision must be approve or reject".to_string()));
        }
        if !actor_role.can_review() {
            return Err(ApiError::Forbidden("Manager/Admin only"));
        }

        let requester = self
            .db
            .leave_requests
            .read()
            .await
            .iter()
            .find(|l| l.id == leave_id)
            .map(|l| l.username.clone())
            .ok_or(ApiError::NotFound("Leave request"))?;

        if actor_role == Role::Manager {
            let own = self.department_of(actor).await?;
            if own.is_none() || own != self.department_of(&requester).await? {
                return Err(ApiError::Forbidden("Leave request is outside your department"));
            }
        }

        let mut requests = self.db.leave_requests.write().await;
        let request = requests
            .iter_mut()
            .find(|l| l.id == leave_id)
            .ok_or(ApiError::NotFound("Leave request"))?;
        if request.status != LeaveStatus::Pending {
            return Err(ApiError::AlreadyProcessed);
        }

        request.status = decision;
        request.processed_by = Some(actor.to_string());
        request.processed_at = Some(Utc::now());

        info!(leave_id, actor, status = %decision, "Leave request processed");
        Ok(request.clone())
    }

    /// Usernames with approved leave covering `date`.
    pub async fn on_leave(&self, date: NaiveDate) -> HashSet<String> {
        self.db
            .leave_requests
            .read()
            .await
            .iter()
            .filter(|l| l.status == LeaveStatus::Approved && l.covers(date))
            .map(|l| l.username.clone())
            .collect()
    }

    pub async fn approved_for(&self, username: &str) -> Vec<LeaveRequest> {
        self.db
            .leave_requests
            .read()
            .await
            .iter()
            .filter(|l| l.username == username && l.status == LeaveStatus::Approved)
            .cloned()
            .collect()
    }
}
