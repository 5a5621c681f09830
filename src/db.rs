//! In-memory tables standing in for a database.
//!
//! Every table sits behind its own async `RwLock`; services never hold two
//! table locks at once.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::auth::password::hash_password;
use crate::config::Config;
use crate::model::attendance::{AttendanceKey, AttendanceRecord, Capture, Punch};
use crate::model::department::Department;
use crate::model::employee::{Employee, EmployeeStatus};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::role::Role;

/// Issued refresh token, revoked on rotation or logout.
#[derive(Debug, Clone)]
pub struct RefreshTokenEntry {
    pub username: String,
    pub expires_at: usize,
    pub revoked: bool,
}

#[derive(Default)]
pub struct MemoryDb {
    pub employees: RwLock<Vec<Employee>>,
    pub departments: RwLock<Vec<Department>>,
    pub leave_requests: RwLock<Vec<LeaveRequest>>,
    pub attendance: RwLock<HashMap<AttendanceKey, AttendanceRecord>>,
    /// keyed by jti
    pub refresh_tokens: RwLock<HashMap<String, RefreshTokenEntry>>,
}

pub async fn init_db(config: &Config, today: NaiveDate) -> Result<Arc<MemoryDb>> {
    let db = Arc::new(MemoryDb::default());
    if config.seed_demo_data {
        seed_demo_data(&db, &config.demo_password, today).await?;
    }
    Ok(db)
}

fn employee(
    username: &str,
    full_name: &str,
    department: &str,
    position: &str,
    role: Role,
    password_hash: &str,
) -> Employee {
    Employee {
        username: username.to_string(),
        full_name: full_name.to_string(),
        department: department.to_string(),
        position: position.to_string(),
        role,
        status: EmployeeStatus::Active,
        profile_photo: None,
        password_hash: password_hash.to_string(),
    }
}

fn department(id: &str, name: &str, description: &str, manager: &str) -> Department {
    Department {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        manager: manager.to_string(),
        created_at: Utc
            .with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default(),
    }
}

fn leave(
    id: &str,
    username: &str,
    leave_type: LeaveType,
    from: NaiveDate,
    to: NaiveDate,
    reason: &str,
    status: LeaveStatus,
    applied: NaiveDate,
) -> LeaveRequest {
    LeaveRequest {
        id: id.to_string(),
        username: username.to_string(),
        full_name: None,
        leave_type,
        from_date: from,
        to_date: to,
        reason: reason.to_string(),
        status,
        applied_date: applied,
        processed_by: None,
        processed_at: None,
    }
}

fn seeded_punch(date: NaiveDate, hms: (u32, u32, u32), address: Option<&str>) -> Punch {
    let time = date.and_time(NaiveTime::from_hms_opt(hms.0, hms.1, hms.2).unwrap_or(NaiveTime::MIN));
    Punch {
        time,
        capture: address.map(|address| Capture {
            coords: crate::geo::Coordinates::new(26.73208, 68.071982),
            image: String::new(),
            address: address.to_string(),
            uri: None,
        }),
    }
}

/// Demo users, departments, leave and the past week of attendance.
///
/// Today is left empty so every demo account can check in.
async fn seed_demo_data(db: &MemoryDb, password: &str, today: NaiveDate) -> Result<()> {
    let hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("hash demo password")?;
    let d = |days: u64| today.checked_sub_days(Days::new(days)).unwrap_or(today);

    *db.employees.write().await = vec![
        employee("admin", "System Administrator", "Administration", "Admin", Role::Admin, &hash),
        employee("john.doe", "John Doe", "IT Department", "Frontend Developer", Role::Employee, &hash),
        employee("jane.smith", "Jane Smith", "IT Department", "Project Manager", Role::Manager, &hash),
        employee("peter.jones", "Peter Jones", "Human Resources", "HR Specialist", Role::Employee, &hash),
        employee("susan.baker", "Susan Baker", "Finance", "Accountant", Role::Employee, &hash),
    ];

    *db.departments.write().await = vec![
        department("DEPT001", "Administration", "System Administration Department", "admin"),
        department("DEPT002", "Human Resources", "Human Resources Department", ""),
        department("DEPT003", "IT Department", "Information Technology Department", "jane.smith"),
        department("DEPT004", "Finance", "Finance and Accounting Department", ""),
    ];

    *db.leave_requests.write().await = vec![
        leave("L123", "susan.baker", LeaveType::Sick, d(0), d(0), "Feeling unwell", LeaveStatus::Pending, d(0)),
        leave("L125", "peter.jones", LeaveType::Sick, d(2), d(2), "Doctors Appointment", LeaveStatus::Approved, d(3)),
        leave("L126", "john.doe", LeaveType::Unpaid, d(8), d(8), "Personal emergency", LeaveStatus::Rejected, d(9)),
        leave("L127", "susan.baker", LeaveType::Annual, d(15), d(12), "Holiday trip", LeaveStatus::Approved, d(20)),
        leave("L128", "peter.jones", LeaveType::Sick, d(1), d(1), "Migraine", LeaveStatus::Pending, d(1)),
        leave("L129", "jane.smith", LeaveType::Annual, d(30), d(25), "Family visit", LeaveStatus::Approved, d(40)),
    ];

    let history: &[(u64, &str, (u32, u32, u32), (u32, u32, u32))] = &[
        (1, "john.doe", (9, 0, 10), (17, 35, 0)),
        (1, "jane.smith", (8, 50, 10), (17, 45, 0)),
        (1, "peter.jones", (9, 10, 10), (17, 55, 0)),
        (1, "susan.baker", (9, 10, 10), (17, 45, 0)),
        (2, "john.doe", (9, 15, 0), (17, 30, 0)),
        (2, "peter.jones", (9, 5, 0), (17, 50, 0)),
        (3, "john.doe", (9, 2, 0), (17, 30, 0)),
        (3, "jane.smith", (8, 58, 0), (18, 0, 0)),
        (3, "peter.jones", (9, 8, 0), (17, 40, 0)),
        (3, "susan.baker", (9, 12, 0), (17, 48, 0)),
        (4, "jane.smith", (9, 0, 0), (18, 10, 0)),
        (4, "susan.baker", (9, 20, 0), (17, 30, 0)),
        (5, "john.doe", (9, 0, 0), (17, 30, 0)),
        (5, "jane.smith", (8, 55, 0), (18, 0, 0)),
        (5, "peter.jones", (9, 5, 0), (17, 50, 0)),
        (5, "susan.baker", (9, 15, 0), (17, 45, 0)),
        (6, "john.doe", (9, 10, 0), (17, 30, 0)),
        (6, "jane.smith", (8, 50, 0), (18, 5, 0)),
        (6, "susan.baker", (9, 5, 0), (17, 40, 0)),
    ];

    let mut attendance = db.attendance.write().await;
    for &(days_ago, username, check_in, check_out) in history {
        let date = d(days_ago);
        let mut record = AttendanceRecord::new(username, date);
        record.check_in = Some(seeded_punch(date, check_in, Some("Office Location")));
        record.check_out = Some(seeded_punch(date, check_out, Some("Office Location")));
        attendance.insert(record.key(), record);
    }

    info!(
        employees = 5,
        attendance_records = attendance.len(),
        "Seeded demo data"
    );

    Ok(())
}
