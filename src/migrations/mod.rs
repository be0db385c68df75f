//! Built-in migration chain of the `osrd_infra` app, oldest first.

use crate::common::schema::{ColumnKind, ColumnState};
use crate::migrate::record::MigrationRecord;

pub mod m0001_initial;
pub mod m0002_tracksectionlayer;
pub mod m0003_tracklinklayer;
pub mod m0004_add_loading_gauges;

pub const APP_LABEL: &str = "osrd_infra";

pub fn all() -> Vec<MigrationRecord> {
    vec![
        m0001_initial::migration(),
        m0002_tracksectionlayer::migration(),
        m0003_tracklinklayer::migration(),
        m0004_add_loading_gauges::migration(),
    ]
}

/// Columns shared by the map layer tables.
pub(crate) fn layer_columns() -> Vec<ColumnState> {
    vec![
        ColumnState::char("obj_id", 255),
        ColumnState::new("infra_id", ColumnKind::Integer),
        ColumnState::new("geographic", ColumnKind::Json),
        ColumnState::new("schematic", ColumnKind::Json),
    ]
}
