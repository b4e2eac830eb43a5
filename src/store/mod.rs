pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub users: sled::Tree,
    pub sessions: sled::Tree,
    pub companies: sled::Tree,
    pub contacts: sled::Tree,
    pub leads: sled::Tree,
    pub deals: sled::Tree,
    pub activities: sled::Tree,
    pub activity_ids: sled::Tree,
    pub comments: sled::Tree,
    pub kpi_targets: sled::Tree,
    pub kpi_daily: sled::Tree,
    pub kpi_monthly: sled::Tree,
    pub meta: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("reply nesting exceeds {limit} levels")]
    MaxDepthExceeded { limit: u8 },
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let users = db.open_tree(trees::USERS)?;
        let sessions = db.open_tree(trees::SESSIONS)?;
        let companies = db.open_tree(trees::COMPANIES)?;
        let contacts = db.open_tree(trees::CONTACTS)?;
        let leads = db.open_tree(trees::LEADS)?;
        let deals = db.open_tree(trees::DEALS)?;
        let activities = db.open_tree(trees::ACTIVITIES)?;
        let activity_ids = db.open_tree(trees::ACTIVITY_IDS)?;
        let comments = db.open_tree(trees::COMMENTS)?;
        let kpi_targets = db.open_tree(trees::KPI_TARGETS)?;
        let kpi_daily = db.open_tree(trees::KPI_DAILY)?;
        let kpi_monthly = db.open_tree(trees::KPI_MONTHLY)?;
        let meta = db.open_tree(trees::META)?;

        Ok(Self {
            db,
            users,
            sessions,
            companies,
            contacts,
            leads,
            deals,
            activities,
            activity_ids,
            comments,
            kpi_targets,
            kpi_daily,
            kpi_monthly,
            meta,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
