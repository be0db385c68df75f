use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::migrate::record::MigrationKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedMigration {
    pub key: MigrationKey,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    pub applied: Vec<MigrationKey>,
    pub skipped: Vec<MigrationKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    Applied,
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    pub key: MigrationKey,
    pub status: PlanStatus,
}
