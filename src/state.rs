use std::sync::Arc;
use std::time::Duration;

use actix_web::web::{self, Data};
use tracing::info;

use crate::config::Config;
use crate::db::MemoryDb;
use crate::geo::resolver::{CachedResolver, DisabledResolver, GeoError, NominatimResolver};
use crate::geo::{AddressLookup, GeoResolver};
use crate::service::attendance::AttendanceRecorder;
use crate::service::clock::Clock;
use crate::service::department::DepartmentService;
use crate::service::directory::EmployeeDirectory;
use crate::service::leave::LeaveService;
use crate::service::repository::MemoryAttendanceRepository;
use crate::service::stats::StatsService;

/// Reverse geocoder from config; an empty `GEOCODER_URL` disables lookups.
pub fn build_resolver(config: &Config) -> Result<Arc<dyn GeoResolver>, GeoError> {
    if config.geocoder_url.trim().is_empty() {
        info!("Reverse geocoding disabled");
        return Ok(Arc::new(DisabledResolver));
    }

    let nominatim = NominatimResolver::new(&config.geocoder_url, config.geocoder_timeout())?;
    info!(url = %config.geocoder_url, "Reverse geocoding enabled");
    Ok(Arc::new(CachedResolver::new(
        Arc::new(nominatim),
        Duration::from_secs(config.geocoder_cache_ttl_secs),
    )))
}

/// Shared services handed to every worker as `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub config: Data<Config>,
    pub db: Data<MemoryDb>,
    pub directory: Data<EmployeeDirectory>,
    pub departments: Data<DepartmentService>,
    pub leaves: Data<LeaveService>,
    pub recorder: Data<AttendanceRecorder>,
    pub stats: Data<StatsService>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<MemoryDb>,
        resolver: Arc<dyn GeoResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let repo = Arc::new(MemoryAttendanceRepository::new(db.clone()));
        let directory = Arc::new(EmployeeDirectory::new(db.clone()));
        let leaves = Arc::new(LeaveService::new(db.clone(), directory.clone(), clock.clone()));

        let recorder = AttendanceRecorder::new(
            repo.clone(),
            directory.clone(),
            Arc::new(AddressLookup::new(resolver, config.geocoder_timeout())),
            clock.clone(),
            config.geofence(),
            config.auto_checkout_after(),
        );
        let stats = StatsService::new(
            db.clone(),
            directory.clone(),
            repo,
            recorder.clone(),
            leaves.clone(),
            clock,
        );

        Self {
            departments: Data::new(DepartmentService::new(db.clone())),
            config: Data::new(config),
            db: Data::from(db),
            directory: Data::from(directory),
            leaves: Data::from(leaves),
            recorder: Data::new(recorder),
            stats: Data::new(stats),
        }
    }

    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.config.clone())
            .app_data(self.db.clone())
            .app_data(self.directory.clone())
            .app_data(self.departments.clone())
            .app_data(self.leaves.clone())
            .app_data(self.recorder.clone())
            .app_data(self.stats.clone());
    }
}
