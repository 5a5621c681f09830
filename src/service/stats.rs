//! Dashboard figures derived from attendance records and leave requests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::MemoryDb;
use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, AttendanceState};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::service::attendance::AttendanceRecorder;
use crate::service::clock::Clock;
use crate::service::directory::Directory;
use crate::service::leave::LeaveService;
use crate::service::repository::AttendanceRepository;

const TREND_DAYS: u64 = 7;

/// Check-ins strictly after this time count as late.
fn late_after() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeStats {
    /// Days this month with a check-in
    pub present: u32,
    /// Working days this month before today with no check-in and no approved leave
    pub absent: u32,
    /// Sundays this month up to today
    pub sundays: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AdminStats {
    pub total_employees: usize,
    pub present_today: usize,
    pub on_leave_today: usize,
    pub absent_today: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    NotChecked,
    CheckedIn,
    CheckedOut,
}

impl From<Option<&AttendanceRecord>> for PresenceStatus {
    fn from(record: Option<&AttendanceRecord>) -> Self {
        match record.map(AttendanceRecord::state) {
            Some(AttendanceState::CheckedIn) => PresenceStatus::CheckedIn,
            Some(AttendanceState::CheckedOut) => PresenceStatus::CheckedOut,
            _ => PresenceStatus::NotChecked,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MemberStatus {
    #[schema(example = "john.doe")]
    pub username: String,
    #[schema(example = "John Doe")]
    pub name: String,
    pub position: String,
    pub status: PresenceStatus,
    /// Check-out time, else check-in time
    #[schema(format = "date-time", value_type = Option<String>)]
    pub last_activity: Option<NaiveDateTime>,
    pub check_in_address: Option<String>,
    pub check_in_uri: Option<String>,
    pub check_out_address: Option<String>,
    pub check_out_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrendPoint {
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    pub present: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaveTypeCount {
    pub leave_type: LeaveType,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LeaveStatusCount {
    pub status: LeaveStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Analytics {
    /// Oldest day first
    pub attendance_trend: Vec<TrendPoint>,
    pub leave_types: Vec<LeaveTypeCount>,
    pub leave_statuses: Vec<LeaveStatusCount>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailySummary {
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    pub total_employees: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    /// Percentage of active employees present
    pub attendance_rate: f64,
    /// Markdown rendering of the figures above
    pub text: String,
}

fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

fn sundays_through(today: NaiveDate) -> u32 {
    month_start(today)
        .iter_days()
        .take_while(|d| *d <= today)
        .filter(|d| d.weekday() == Weekday::Sun)
        .count() as u32
}

fn employee_stats_from(
    records: &[AttendanceRecord],
    approved: &[LeaveRequest],
    today: NaiveDate,
) -> EmployeeStats {
    let start = month_start(today);
    let present_days: HashSet<NaiveDate> = records
        .iter()
        .filter(|r| r.check_in.is_some() && r.date >= start && r.date <= today)
        .map(|r| r.date)
        .collect();

    let absent = start
        .iter_days()
        .take_while(|d| *d < today)
        .filter(|d| d.weekday() != Weekday::Sun)
        .filter(|d| !present_days.contains(d))
        .filter(|d| !approved.iter().any(|l| l.covers(*d)))
        .count() as u32;

    EmployeeStats {
        present: present_days.len() as u32,
        absent,
        sundays: sundays_through(today),
    }
}

fn present_usernames(records: &[AttendanceRecord]) -> HashSet<&str> {
    records
        .iter()
        .filter(|r| r.check_in.is_some())
        .map(|r| r.username.as_str())
        .collect()
}

fn count_leaves(requests: &[LeaveRequest]) -> (Vec<LeaveTypeCount>, Vec<LeaveStatusCount>) {
    let mut by_type: BTreeMap<&str, (LeaveType, usize)> = BTreeMap::new();
    for request in requests {
        by_type
            .entry(request.leave_type.as_ref())
            .or_insert((request.leave_type, 0))
            .1 += 1;
    }
    let types = by_type
        .into_values()
        .map(|(leave_type, count)| LeaveTypeCount { leave_type, count })
        .collect();

    let statuses = [LeaveStatus::Approved, LeaveStatus::Rejected, LeaveStatus::Pending]
        .into_iter()
        .map(|status| LeaveStatusCount {
            status,
            count: requests.iter().filter(|r| r.status == status).count(),
        })
        .collect();

    (types, statuses)
}

fn summarize(date: NaiveDate, total_employees: usize, today: &[AttendanceRecord]) -> DailySummary {
    let present = present_usernames(today).len();
    let absent = total_employees.saturating_sub(present);
    let late = today
        .iter()
        .filter_map(AttendanceRecord::check_in_time)
        .filter(|t| t.time() > late_after())
        .count();
    let attendance_rate = if total_employees == 0 {
        0.0
    } else {
        present as f64 * 100.0 / total_employees as f64
    };

    let mut text = format!(
        "### Daily Attendance Summary\n\n\
         - Date: {date}\n\
         - Total Employees: {total_employees}\n\
         - Present: {present}\n\
         - Absent: {absent}\n\
         - Late Arrivals (after 9:30 AM): {late}\n\
         - Attendance Rate: {attendance_rate:.1}%\n"
    );
    if late > 0 || absent > present {
        text.push_str("\nConsider a short follow-up with late or absent employees.\n");
    }

    DailySummary {
        date,
        total_employees,
        present,
        absent,
        late,
        attendance_rate,
        text,
    }
}

pub struct StatsService {
    db: Arc<MemoryDb>,
    directory: Arc<dyn Directory>,
    repo: Arc<dyn AttendanceRepository>,
    recorder: AttendanceRecorder,
    leaves: Arc<LeaveService>,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(
        db: Arc<MemoryDb>,
        directory: Arc<dyn Directory>,
        repo: Arc<dyn AttendanceRepository>,
        recorder: AttendanceRecorder,
        leaves: Arc<LeaveService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            directory,
            repo,
            recorder,
            leaves,
            clock,
        }
    }

    async fn active_count(&self) -> usize {
        self.db
            .employees
            .read()
            .await
            .iter()
            .filter(|e| e.is_active())
            .count()
    }

    pub async fn employee_stats(&self, username: &str) -> Result<EmployeeStats, ApiError> {
        let records = self.repo.list_for_employee(username).await?;
        let approved = self.leaves.approved_for(username).await;
        Ok(employee_stats_from(&records, &approved, self.clock.today()))
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
        let today = self.clock.today();
        let records = self.repo.list_for_date(today).await?;
        let total_employees = self.active_count().await;
        let present_today = present_usernames(&records).len();
        let on_leave_today = self.leaves.on_leave(today).await.len();

        Ok(AdminStats {
            total_employees,
            present_today,
            on_leave_today,
            absent_today: total_employees.saturating_sub(present_today + on_leave_today),
        })
    }

    /// Today's status for every active member of the manager's department.
    pub async fn department_overview(&self, manager: &str) -> Result<Vec<MemberStatus>, ApiError> {
        let Some(lookup) = self.directory.lookup_employee(manager).await? else {
            return Ok(Vec::new());
        };
        let usernames: HashSet<String> = self
            .directory
            .list_department_members(&lookup.department)
            .await?
            .into_iter()
            .collect();
        let members: Vec<_> = self
            .db
            .employees
            .read()
            .await
            .iter()
            .filter(|e| usernames.contains(&e.username))
            .cloned()
            .collect();

        let mut overview = Vec::with_capacity(members.len());
        for member in members {
            let record = self
                .recorder
                .today_record(&member.username)
                .await
                .map_err(|e| ApiError::internal("Failed to read today's attendance", e))?;
            let record = record.as_ref();
            let check_in = record.and_then(AttendanceRecord::check_in_capture);
            let check_out = record.and_then(AttendanceRecord::check_out_capture);

            overview.push(MemberStatus {
                status: PresenceStatus::from(record),
                last_activity: record.and_then(|r| r.check_out_time().or(r.check_in_time())),
                check_in_address: check_in.map(|c| c.address.clone()),
                check_in_uri: check_in.and_then(|c| c.uri.clone()),
                check_out_address: check_out.map(|c| c.address.clone()),
                check_out_uri: check_out.and_then(|c| c.uri.clone()),
                username: member.username,
                name: member.full_name,
                position: member.position,
            });
        }
        Ok(overview)
    }

    pub async fn analytics(&self) -> Result<Analytics, ApiError> {
        let today = self.clock.today();
        let mut attendance_trend = Vec::with_capacity(TREND_DAYS as usize);
        for days_ago in (0..TREND_DAYS).rev() {
            let Some(date) = today.checked_sub_days(Days::new(days_ago)) else {
                continue;
            };
            let records = self.repo.list_for_date(date).await?;
            attendance_trend.push(TrendPoint {
                date,
                present: present_usernames(&records).len(),
            });
        }

        let requests = self.db.leave_requests.read().await.clone();
        let (leave_types, leave_statuses) = count_leaves(&requests);

        Ok(Analytics {
            attendance_trend,
            leave_types,
            leave_statuses,
        })
    }

    pub async fn daily_summary(&self) -> Result<DailySummary, ApiError> {
        let today = self.clock.today();
        let records = self.repo.list_for_date(today).await?;
        Ok(summarize(today, self.active_count().await, &records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::init_db;
    use crate::geo::resolver::tests::StaticResolver;
    use crate::geo::{AddressLookup, Coordinates, Geofence};
    use crate::model::role::Role;
    use crate::service::attendance::PunchInput;
    use crate::service::clock::manual::ManualClock;
    use crate::service::directory::EmployeeDirectory;
    use crate::service::repository::MemoryAttendanceRepository;
    use std::time::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 18).unwrap()
    }

    struct Fixture {
        stats: StatsService,
        recorder: AttendanceRecorder,
        leaves: Arc<LeaveService>,
        directory: Arc<EmployeeDirectory>,
    }

    async fn fixture() -> Fixture {
        let config = Config::for_tests();
        let db = init_db(&config, today()).await.unwrap();
        let clock = Arc::new(ManualClock::at(today().and_hms_opt(9, 45, 0).unwrap()));
        let repo = Arc::new(MemoryAttendanceRepository::new(db.clone()));
        let recorder = AttendanceRecorder::new(
            repo.clone(),
            Arc::new(EmployeeDirectory::new(db.clone())),
            Arc::new(AddressLookup::new(
                Arc::new(StaticResolver::new("Office Road")),
                Duration::from_secs(1),
            )),
            clock.clone(),
            Geofence::new(Coordinates::new(26.73208, 68.071982), 200.0),
            chrono::Duration::hours(12),
        );
        let directory = Arc::new(EmployeeDirectory::new(db.clone()));
        let leaves = Arc::new(LeaveService::new(db.clone(), directory.clone(), clock.clone()));
        let stats = StatsService::new(
            db,
            directory.clone(),
            repo,
            recorder.clone(),
            leaves.clone(),
            clock,
        );
        Fixture {
            stats,
            recorder,
            leaves,
            directory,
        }
    }

    fn office() -> PunchInput {
        PunchInput {
            latitude: 26.73208,
            longitude: 68.071982,
            accuracy: 5.0,
            image: "data:image/jpeg;base64,AAAA".to_string(),
        }
    }

    #[test]
    fn sundays_are_counted_through_today() {
        // 2026-03-01 is a Sunday
        assert_eq!(sundays_through(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()), 1);
        assert_eq!(sundays_through(today()), 3);
        assert_eq!(sundays_through(NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()), 1);
    }

    #[test]
    fn approved_leave_is_not_absence() {
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        let wednesday = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();

        let mut record = AttendanceRecord::new("john.doe", monday);
        record.check_in = Some(crate::model::attendance::Punch {
            time: monday.and_hms_opt(9, 0, 0).unwrap(),
            capture: None,
        });
        let leave = LeaveRequest {
            id: "L1".to_string(),
            username: "john.doe".to_string(),
            full_name: None,
            leave_type: LeaveType::Sick,
            from_date: tuesday,
            to_date: tuesday,
            reason: String::new(),
            status: LeaveStatus::Approved,
            applied_date: monday,
            processed_by: None,
            processed_at: None,
        };

        // Sunday 1st skipped, Monday present, Tuesday on leave, today not counted
        let stats = employee_stats_from(&[record], &[leave], wednesday);
        assert_eq!(
            stats,
            EmployeeStats {
                present: 1,
                absent: 0,
                sundays: 1
            }
        );
    }

    #[test]
    fn summary_counts_late_arrivals_strictly_after_half_past_nine() {
        let mut on_time = AttendanceRecord::new("a", today());
        on_time.check_in = Some(crate::model::attendance::Punch {
            time: today().and_hms_opt(9, 30, 0).unwrap(),
            capture: None,
        });
        let mut late = AttendanceRecord::new("b", today());
        late.check_in = Some(crate::model::attendance::Punch {
            time: today().and_hms_opt(9, 30, 1).unwrap(),
            capture: None,
        });

        let summary = summarize(today(), 4, &[on_time, late]);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.absent, 2);
        assert_eq!(summary.late, 1);
        assert_eq!(summary.attendance_rate, 50.0);
        assert!(summary.text.contains("Attendance Rate: 50.0%"));
    }

    #[test]
    fn summary_with_no_employees_has_zero_rate() {
        let summary = summarize(today(), 0, &[]);
        assert_eq!(summary.attendance_rate, 0.0);
        assert_eq!(summary.absent, 0);
    }

    #[tokio::test]
    async fn employee_stats_for_seeded_month() {
        let f = fixture().await;
        let stats = f.stats.employee_stats("john.doe").await.unwrap();
        assert_eq!(
            stats,
            EmployeeStats {
                present: 5,
                absent: 10,
                sundays: 3
            }
        );
    }

    #[tokio::test]
    async fn admin_stats_reflect_check_ins_and_leave() {
        let f = fixture().await;
        let initial = f.stats.admin_stats().await.unwrap();
        assert_eq!(initial.total_employees, 5);
        assert_eq!(initial.present_today, 0);
        assert_eq!(initial.absent_today, 5);

        f.recorder.check_in("john.doe", office()).await.unwrap();
        f.leaves
            .decide("L123", LeaveStatus::Approved, "admin", Role::Admin)
            .await
            .unwrap();

        let stats = f.stats.admin_stats().await.unwrap();
        assert_eq!(stats.present_today, 1);
        assert_eq!(stats.on_leave_today, 1);
        assert_eq!(stats.absent_today, 3);
    }

    #[tokio::test]
    async fn department_overview_shows_today_status() {
        let f = fixture().await;
        f.recorder.check_in("john.doe", office()).await.unwrap();

        let overview = f.stats.department_overview("jane.smith").await.unwrap();
        assert_eq!(overview.len(), 2);

        let john = overview.iter().find(|m| m.username == "john.doe").unwrap();
        assert_eq!(john.status, PresenceStatus::CheckedIn);
        assert_eq!(john.check_in_address.as_deref(), Some("Office Road"));
        assert_eq!(john.last_activity, Some(today().and_hms_opt(9, 45, 0).unwrap()));

        let jane = overview.iter().find(|m| m.username == "jane.smith").unwrap();
        assert_eq!(jane.status, PresenceStatus::NotChecked);
        assert!(jane.last_activity.is_none());

        assert!(f.stats.department_overview("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deactivated_member_leaves_both_department_views() {
        let f = fixture().await;
        let sick = crate::model::leave_request::NewLeave {
            leave_type: LeaveType::Sick,
            from_date: today(),
            to_date: today(),
            reason: "Flu".to_string(),
        };
        f.leaves.submit("john.doe", sick).await.unwrap();
        f.directory.deactivate("john.doe").await.unwrap();

        let pending = f.leaves.list_pending_for_department("jane.smith").await.unwrap();
        assert!(pending.iter().all(|l| l.username != "john.doe"));

        let overview = f.stats.department_overview("jane.smith").await.unwrap();
        let members: Vec<_> = overview.iter().map(|m| m.username.as_str()).collect();
        assert_eq!(members, vec!["jane.smith"]);

        // admins still see it in the company-wide queue
        assert!(f.leaves.list_pending().await.iter().any(|l| l.username == "john.doe"));
    }

    #[tokio::test]
    async fn analytics_cover_the_last_week_and_all_leave() {
        let f = fixture().await;
        let analytics = f.stats.analytics().await.unwrap();

        let trend: Vec<usize> = analytics.attendance_trend.iter().map(|p| p.present).collect();
        assert_eq!(trend, vec![3, 4, 2, 4, 2, 4, 0]);
        assert_eq!(analytics.attendance_trend.last().unwrap().date, today());

        let count = |t: LeaveType| {
            analytics
                .leave_types
                .iter()
                .find(|c| c.leave_type == t)
                .map(|c| c.count)
        };
        assert_eq!(count(LeaveType::Sick), Some(3));
        assert_eq!(count(LeaveType::Annual), Some(2));
        assert_eq!(count(LeaveType::Unpaid), Some(1));

        let statuses: Vec<(LeaveStatus, usize)> = analytics
            .leave_statuses
            .iter()
            .map(|c| (c.status, c.count))
            .collect();
        assert_eq!(
            statuses,
            vec![
                (LeaveStatus::Approved, 3),
                (LeaveStatus::Rejected, 1),
                (LeaveStatus::Pending, 2)
            ]
        );
    }

    #[tokio::test]
    async fn daily_summary_flags_late_check_in() {
        let f = fixture().await;
        f.recorder.check_in("john.doe", office()).await.unwrap();

        let summary = f.stats.daily_summary().await.unwrap();
        assert_eq!(summary.present, 1);
        assert_eq!(summary.late, 1);
        assert_eq!(summary.absent, 4);
    }
}
