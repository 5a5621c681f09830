//! Daily check-in/check-out recording.
//!
//! Each (employee, date) record moves `Empty -> CheckedIn -> CheckedOut` and
//! is terminal once checked out, whether by the employee or by the
//! auto-checkout fallback.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::AttendanceError;
use crate::geo::{AddressLookup, Coordinates, Geofence, ResolvedAddress};
use crate::model::attendance::{
    AttendanceKey, AttendanceRecord, AttendanceState, Capture, Punch, TodayStatus,
};
use crate::service::auto_checkout::{AutoCheckoutScheduler, KeyLocks};
use crate::service::clock::Clock;
use crate::service::directory::Directory;
use crate::service::repository::AttendanceRepository;

/// Geolocated selfie submitted with a check-in or check-out.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PunchInput {
    #[schema(example = 26.73208)]
    pub latitude: f64,
    #[schema(example = 68.071982)]
    pub longitude: f64,
    /// Reported GPS accuracy in metres, informational only
    #[schema(example = 12.5)]
    pub accuracy: f64,
    /// Captured photo, base64 data URI
    #[schema(example = "data:image/jpeg;base64,/9j/4AAQ...")]
    pub image: String,
}

impl PunchInput {
    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    fn validated(self) -> Result<Self, AttendanceError> {
        if self.coords().is_valid() {
            Ok(self)
        } else {
            Err(AttendanceError::InvalidCoordinates)
        }
    }
}

#[derive(Clone)]
pub struct AttendanceRecorder {
    repo: Arc<dyn AttendanceRepository>,
    directory: Arc<dyn Directory>,
    addresses: Arc<AddressLookup>,
    clock: Arc<dyn Clock>,
    geofence: Geofence,
    auto_checkout_after: chrono::Duration,
    locks: Arc<KeyLocks>,
    scheduler: Arc<AutoCheckoutScheduler>,
}

impl AttendanceRecorder {
    pub fn new(
        repo: Arc<dyn AttendanceRepository>,
        directory: Arc<dyn Directory>,
        addresses: Arc<AddressLookup>,
        clock: Arc<dyn Clock>,
        geofence: Geofence,
        auto_checkout_after: chrono::Duration,
    ) -> Self {
        Self {
            repo,
            directory,
            addresses,
            clock,
            geofence,
            auto_checkout_after,
            locks: Arc::new(KeyLocks::default()),
            scheduler: Arc::new(AutoCheckoutScheduler::default()),
        }
    }

    async fn ensure_active(&self, username: &str) -> Result<(), AttendanceError> {
        match self.directory.lookup_employee(username).await? {
            None => Err(AttendanceError::EmployeeNotFound),
            Some(lookup) if !lookup.active => Err(AttendanceError::Inactive),
            Some(_) => Ok(()),
        }
    }

    fn capture(input: PunchInput, resolved: ResolvedAddress) -> Capture {
        Capture {
            coords: input.coords(),
            image: input.image,
            address: resolved.address,
            uri: resolved.map_uri,
        }
    }

    #[instrument(name = "attendance_check_in", skip_all, fields(username = %username))]
    pub async fn check_in(
        &self,
        username: &str,
        input: PunchInput,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let input = input.validated()?;
        self.ensure_active(username).await?;

        let now = self.clock.now();
        let key = AttendanceKey::new(username, now.date());
        let _guard = self.locks.lock(&key).await;

        let existing = self.repo.get_record(&key).await?;
        if existing.as_ref().is_some_and(|r| r.check_in.is_some()) {
            info!("Rejected check-in: already checked in");
            return Err(AttendanceError::AlreadyCheckedIn);
        }

        if let Err(distance_m) = self.geofence.check(input.coords()) {
            info!(distance_m, radius_m = self.geofence.radius_m, "Rejected check-in: out of range");
            return Err(AttendanceError::OutOfRange {
                distance_m,
                radius_m: self.geofence.radius_m,
            });
        }

        let resolved = self.addresses.resolve(input.coords()).await;

        let mut record = existing.unwrap_or_else(|| AttendanceRecord::new(username, key.date));
        record.check_in = Some(Punch {
            time: now,
            capture: Some(Self::capture(input, resolved)),
        });
        self.repo.upsert_record(record.clone()).await?;

        self.schedule_auto_checkout(key, now);
        info!(time = %now, "Checked in");

        Ok(record)
    }

    #[instrument(name = "attendance_check_out", skip_all, fields(username = %username))]
    pub async fn check_out(
        &self,
        username: &str,
        input: PunchInput,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let input = input.validated()?;
        self.ensure_active(username).await?;

        let now = self.clock.now();
        let key = AttendanceKey::new(username, now.date());
        let _guard = self.locks.lock(&key).await;

        let mut record = match self.repo.get_record(&key).await? {
            Some(record) => record,
            None => return Err(AttendanceError::NotCheckedIn),
        };
        match record.state() {
            AttendanceState::Empty => return Err(AttendanceError::NotCheckedIn),
            AttendanceState::CheckedOut => return Err(AttendanceError::AlreadyCheckedOut),
            AttendanceState::CheckedIn => {}
        }

        let resolved = self.addresses.resolve(input.coords()).await;

        record.check_out = Some(Punch {
            time: now,
            capture: Some(Self::capture(input, resolved)),
        });
        self.repo.upsert_record(record.clone()).await?;

        self.scheduler.cancel(&key);
        info!(time = %now, "Checked out");

        Ok(record)
    }

    fn schedule_auto_checkout(&self, key: AttendanceKey, checked_in_at: NaiveDateTime) {
        let due = checked_in_at + self.auto_checkout_after;
        let delay = (due - self.clock.now()).to_std().unwrap_or(Duration::ZERO);

        let recorder = self.clone();
        let task_key = key.clone();
        self.scheduler.schedule(key, delay, async move {
            recorder.scheduler.mark_fired(&task_key);
            if let Err(e) = recorder.apply_auto_checkout(&task_key).await {
                warn!(error = %e, username = %task_key.username, "Auto-checkout failed");
            }
        });
    }

    /// Closes a still-open record at check-in time + the auto-checkout window.
    ///
    /// A record that is already checked out is left untouched.
    pub async fn apply_auto_checkout(
        &self,
        key: &AttendanceKey,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let _guard = self.locks.lock(key).await;

        let Some(mut record) = self.repo.get_record(key).await? else {
            return Ok(None);
        };
        let Some(checked_in_at) = record.check_in_time() else {
            return Ok(None);
        };
        if record.check_out.is_some() {
            return Ok(None);
        }

        let checked_out_at = checked_in_at + self.auto_checkout_after;
        record.check_out = Some(Punch {
            time: checked_out_at,
            capture: None,
        });
        record.is_auto_checkout = true;
        self.repo.upsert_record(record.clone()).await?;

        info!(username = %key.username, date = %key.date, time = %checked_out_at, "Auto-checked out");
        Ok(Some(record))
    }

    /// Applies any auto-checkout whose window elapsed without the timer firing,
    /// e.g. across a restart.
    async fn settle_overdue(&self, record: AttendanceRecord) -> Result<AttendanceRecord, AttendanceError> {
        let overdue = record.state() == AttendanceState::CheckedIn
            && record
                .check_in_time()
                .is_some_and(|t| t + self.auto_checkout_after <= self.clock.now());

        if !overdue {
            return Ok(record);
        }

        let key = record.key();
        self.scheduler.cancel(&key);
        match self.apply_auto_checkout(&key).await? {
            Some(settled) => Ok(settled),
            None => Ok(self.repo.get_record(&key).await?.unwrap_or(record)),
        }
    }

    pub async fn today_record(
        &self,
        username: &str,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let key = AttendanceKey::new(username, self.clock.today());
        match self.repo.get_record(&key).await? {
            Some(record) => Ok(Some(self.settle_overdue(record).await?)),
            None => Ok(None),
        }
    }

    pub async fn today_status(&self, username: &str) -> Result<TodayStatus, AttendanceError> {
        let record = self.today_record(username).await?;
        Ok(TodayStatus::from(record.as_ref()))
    }

    /// All of the employee's records, newest date first.
    pub async fn history(&self, username: &str) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let records = self.repo.list_for_employee(username).await?;
        let mut settled = Vec::with_capacity(records.len());
        for record in records {
            settled.push(self.settle_overdue(record).await?);
        }
        Ok(settled)
    }

    #[cfg(test)]
    pub fn is_auto_checkout_pending(&self, key: &AttendanceKey) -> bool {
        self.scheduler.is_pending(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::geo::resolver::tests::{FailingResolver, StaticResolver};
    use crate::model::employee::{Employee, EmployeeStatus};
    use crate::model::role::Role;
    use crate::service::clock::manual::ManualClock;
    use crate::service::directory::EmployeeDirectory;
    use crate::service::repository::MemoryAttendanceRepository;
    use chrono::NaiveDate;

    const OFFICE: (f64, f64) = (26.73208, 68.071982);

    struct Fixture {
        recorder: AttendanceRecorder,
        clock: Arc<ManualClock>,
        repo: Arc<MemoryAttendanceRepository>,
    }

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 18)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn employee(username: &str, status: EmployeeStatus) -> Employee {
        Employee {
            username: username.to_string(),
            full_name: username.to_string(),
            department: "IT Department".to_string(),
            position: "Developer".to_string(),
            role: Role::Employee,
            status,
            profile_photo: None,
            password_hash: String::new(),
        }
    }

    async fn fixture_with(resolver: Arc<dyn crate::geo::GeoResolver>) -> Fixture {
        let db = Arc::new(MemoryDb::default());
        *db.employees.write().await = vec![
            employee("john.doe", EmployeeStatus::Active),
            employee("gone.away", EmployeeStatus::Inactive),
        ];
        let clock = Arc::new(ManualClock::at(start()));
        let repo = Arc::new(MemoryAttendanceRepository::new(db.clone()));
        let recorder = AttendanceRecorder::new(
            repo.clone(),
            Arc::new(EmployeeDirectory::new(db)),
            Arc::new(AddressLookup::new(resolver, Duration::from_secs(1))),
            clock.clone(),
            Geofence::new(Coordinates::new(OFFICE.0, OFFICE.1), 200.0),
            chrono::Duration::hours(12),
        );
        Fixture {
            recorder,
            clock,
            repo,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(StaticResolver::new("Office Road"))).await
    }

    fn at(latitude: f64, longitude: f64) -> PunchInput {
        PunchInput {
            latitude,
            longitude,
            accuracy: 10.0,
            image: "data:image/jpeg;base64,AAAA".to_string(),
        }
    }

    fn office() -> PunchInput {
        at(OFFICE.0, OFFICE.1)
    }

    #[tokio::test]
    async fn check_in_at_office_records_capture() {
        let f = fixture().await;
        let record = f.recorder.check_in("john.doe", office()).await.unwrap();

        assert_eq!(record.state(), AttendanceState::CheckedIn);
        assert_eq!(record.check_in_time(), Some(start()));
        let capture = record.check_in_capture().unwrap();
        assert_eq!(capture.address, "Office Road");
        assert!(capture.uri.is_some());
        assert_eq!(capture.image, "data:image/jpeg;base64,AAAA");
        assert!(!record.is_auto_checkout);
    }

    #[tokio::test]
    async fn check_in_out_of_range_reports_distance_and_stores_nothing() {
        let f = fixture().await;
        let err = f
            .recorder
            .check_in("john.doe", at(26.7340, 68.0719))
            .await
            .unwrap_err();

        match err {
            AttendanceError::OutOfRange {
                distance_m,
                radius_m,
            } => {
                assert!((distance_m - 220.0).abs() <= 10.0, "distance was {distance_m}");
                assert_eq!(radius_m, 200.0);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(f.repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_rejected_before_the_geofence() {
        let f = fixture().await;
        // wraps around onto the office point under haversine
        let err = f
            .recorder
            .check_in("john.doe", at(153.26792, 248.071982))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidCoordinates));
        assert!(f.repo.list_all().await.unwrap().is_empty());

        f.recorder.check_in("john.doe", office()).await.unwrap();
        assert!(matches!(
            f.recorder.check_out("john.doe", at(f64::NAN, 0.0)).await,
            Err(AttendanceError::InvalidCoordinates)
        ));
    }

    #[tokio::test]
    async fn second_check_in_is_rejected_and_record_unchanged() {
        let f = fixture().await;
        let first = f.recorder.check_in("john.doe", office()).await.unwrap();

        f.clock.advance(chrono::Duration::minutes(5));
        let err = f.recorder.check_in("john.doe", office()).await.unwrap_err();

        assert!(matches!(err, AttendanceError::AlreadyCheckedIn));
        let stored = f.repo.get_record(&first.key()).await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn check_out_without_check_in_is_rejected() {
        let f = fixture().await;
        let err = f.recorder.check_out("john.doe", office()).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NotCheckedIn));
    }

    #[tokio::test]
    async fn second_check_out_is_rejected() {
        let f = fixture().await;
        f.recorder.check_in("john.doe", office()).await.unwrap();
        f.clock.advance(chrono::Duration::hours(8));
        let record = f.recorder.check_out("john.doe", office()).await.unwrap();
        assert_eq!(record.state(), AttendanceState::CheckedOut);

        let err = f.recorder.check_out("john.doe", office()).await.unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyCheckedOut));

        let err = f.recorder.check_in("john.doe", office()).await.unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyCheckedIn));
    }

    #[tokio::test]
    async fn check_out_is_not_geofenced() {
        let f = fixture().await;
        f.recorder.check_in("john.doe", office()).await.unwrap();
        let record = f
            .recorder
            .check_out("john.doe", at(26.80, 68.10))
            .await
            .unwrap();
        assert_eq!(record.check_out_capture().unwrap().coords.latitude, 26.80);
    }

    #[tokio::test]
    async fn unknown_and_inactive_employees_are_rejected() {
        let f = fixture().await;
        assert!(matches!(
            f.recorder.check_in("nobody", office()).await,
            Err(AttendanceError::EmployeeNotFound)
        ));
        assert!(matches!(
            f.recorder.check_in("gone.away", office()).await,
            Err(AttendanceError::Inactive)
        ));
    }

    #[tokio::test]
    async fn resolver_failure_falls_back_to_coordinates() {
        let f = fixture_with(Arc::new(FailingResolver)).await;
        let record = f.recorder.check_in("john.doe", office()).await.unwrap();
        let capture = record.check_in_capture().unwrap();
        assert_eq!(capture.address, "Coords: (26.7321, 68.0720)");
        assert!(capture.uri.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn auto_checkout_fires_after_window() {
        let f = fixture().await;
        let record = f.recorder.check_in("john.doe", office()).await.unwrap();
        assert!(f.recorder.is_auto_checkout_pending(&record.key()));

        tokio::time::sleep(Duration::from_secs(12 * 3600 + 1)).await;

        let stored = f.repo.get_record(&record.key()).await.unwrap().unwrap();
        assert_eq!(stored.check_out_time(), Some(start() + chrono::Duration::hours(12)));
        assert!(stored.is_auto_checkout);
        assert!(stored.check_out.as_ref().unwrap().capture.is_none());
        assert!(!f.recorder.is_auto_checkout_pending(&record.key()));

        let err = f.recorder.check_out("john.doe", office()).await.unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyCheckedOut));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_check_out_cancels_auto_checkout() {
        let f = fixture().await;
        let record = f.recorder.check_in("john.doe", office()).await.unwrap();

        f.clock.advance(chrono::Duration::hours(2));
        f.recorder.check_out("john.doe", office()).await.unwrap();
        assert!(!f.recorder.is_auto_checkout_pending(&record.key()));

        tokio::time::sleep(Duration::from_secs(13 * 3600)).await;

        let stored = f.repo.get_record(&record.key()).await.unwrap().unwrap();
        assert_eq!(stored.check_out_time(), Some(start() + chrono::Duration::hours(2)));
        assert!(!stored.is_auto_checkout);
    }

    #[tokio::test]
    async fn auto_checkout_on_closed_record_is_a_no_op() {
        let f = fixture().await;
        let record = f.recorder.check_in("john.doe", office()).await.unwrap();
        f.clock.advance(chrono::Duration::hours(1));
        let closed = f.recorder.check_out("john.doe", office()).await.unwrap();

        assert!(f.recorder.apply_auto_checkout(&record.key()).await.unwrap().is_none());
        let stored = f.repo.get_record(&record.key()).await.unwrap().unwrap();
        assert_eq!(stored, closed);
    }

    #[tokio::test]
    async fn overdue_record_is_settled_on_read() {
        let f = fixture().await;
        f.recorder.check_in("john.doe", office()).await.unwrap();
        // simulate a lost timer
        f.recorder.scheduler.cancel(&AttendanceKey::new("john.doe", start().date()));

        f.clock.advance(chrono::Duration::hours(12));
        let status = f.recorder.today_status("john.doe").await.unwrap();

        assert!(status.has_checked_out);
        assert!(status.is_auto_checkout);
        assert_eq!(status.check_out_time, Some(start() + chrono::Duration::hours(12)));
    }

    #[tokio::test]
    async fn today_status_is_stable_between_writes() {
        let f = fixture().await;
        let empty = f.recorder.today_status("john.doe").await.unwrap();
        assert!(!empty.has_checked_in);

        f.recorder.check_in("john.doe", office()).await.unwrap();
        let first = f.recorder.today_status("john.doe").await.unwrap();
        let second = f.recorder.today_status("john.doe").await.unwrap();

        assert_eq!(first, second);
        assert!(first.has_checked_in);
        assert!(!first.has_checked_out);
        assert_eq!(first.location.as_deref(), Some("Office Road"));
        assert_eq!(first.check_in_coords, Some(Coordinates::new(OFFICE.0, OFFICE.1)));
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let f = fixture().await;
        f.recorder.check_in("john.doe", office()).await.unwrap();
        f.clock.advance(chrono::Duration::hours(1));
        f.recorder.check_out("john.doe", office()).await.unwrap();

        f.clock.advance(chrono::Duration::days(1));
        f.recorder.check_in("john.doe", office()).await.unwrap();

        let history = f.recorder.history("john.doe").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].date > history[1].date);
    }

    #[tokio::test]
    async fn concurrent_check_ins_create_one_record() {
        let f = fixture().await;
        let (a, b) = tokio::join!(
            f.recorder.check_in("john.doe", office()),
            f.recorder.check_in("john.doe", office())
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(f.repo.list_all().await.unwrap().len(), 1);
    }
}
