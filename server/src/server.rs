//! Attendance Server
//!
//! Bundles the user directory, the auth gate and the attendance store for the request handlers.

use anyhow::Context as _;

use std::sync::Arc;

use crate::{
    attendance::AttendanceStore,
    authentication::{AuthenticationService, HashError},
    config::StorageConfig,
    metrics::Metrics,
    static_data::StaticUserDatabase,
    storage::JsonFile,
    user_management::{NaiveUserManager, UserManaging},
};

#[derive(Clone)]
pub struct AttendanceServer {
    pub users: Arc<dyn UserManaging>,
    pub auth: Arc<AuthenticationService>,
    pub store: AttendanceStore,
    pub metrics: Metrics,
}

impl AttendanceServer {
    pub fn new(users: Arc<dyn UserManaging>, store: AttendanceStore, metrics: Metrics) -> Result<Self, HashError> {
        Ok(AttendanceServer {
            auth: Arc::new(AuthenticationService::new(users.clone())?),
            users,
            store,
            metrics,
        })
    }

    /// Loads (or seeds) the user directory and opens the attendance records.
    pub async fn open(storage: &StorageConfig) -> anyhow::Result<Self> {
        let users_file = JsonFile::new(storage.users_file());
        let database = StaticUserDatabase::load_or_seed(&users_file)
            .with_context(|| format!("cannot load users from {}", users_file.path().display()))?;
        let users = Arc::new(NaiveUserManager::from_database(database).context("cannot prepare user directory")?);

        let store = AttendanceStore::open(storage.attendance_file(), storage.io_timeout())
            .await
            .context("cannot open attendance records")?;

        let metrics = Metrics::new().context("cannot register metrics")?;

        Self::new(users, store, metrics).context("cannot prepare the auth gate")
    }
}
