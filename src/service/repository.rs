use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::MemoryDb;
use crate::model::attendance::{AttendanceKey, AttendanceRecord};

/// Storage seam for attendance records. One record per (employee, date).
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn get_record(&self, key: &AttendanceKey) -> Result<Option<AttendanceRecord>>;

    /// Inserts or replaces the record stored under `record.key()`.
    async fn upsert_record(&self, record: AttendanceRecord) -> Result<()>;

    /// Newest date first.
    async fn list_for_employee(&self, username: &str) -> Result<Vec<AttendanceRecord>>;

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>>;

    async fn list_all(&self) -> Result<Vec<AttendanceRecord>>;
}

pub struct MemoryAttendanceRepository {
    db: Arc<MemoryDb>,
}

impl MemoryAttendanceRepository {
    pub fn new(db: Arc<MemoryDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AttendanceRepository for MemoryAttendanceRepository {
    async fn get_record(&self, key: &AttendanceKey) -> Result<Option<AttendanceRecord>> {
        Ok(self.db.attendance.read().await.get(key).cloned())
    }

    async fn upsert_record(&self, record: AttendanceRecord) -> Result<()> {
        self.db
            .attendance
            .write()
            .await
            .insert(record.key(), record);
        Ok(())
    }

    async fn list_for_employee(&self, username: &str) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<_> = self
            .db
            .attendance
            .read()
            .await
            .values()
            .filter(|r| r.username == username)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<_> = self
            .db
            .attendance
            .read()
            .await
            .values()
            .filter(|r| r.date == date)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(records)
    }

    async fn list_all(&self) -> Result<Vec<AttendanceRecord>> {
        let mut records: Vec<_> = self.db.attendance.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.username.cmp(&b.username)));
        Ok(records)
    }
}
