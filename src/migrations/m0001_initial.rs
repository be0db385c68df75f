use serde_json::json;

use crate::common::schema::{ColumnKind, ColumnState};
use crate::migrate::operation::Operation;
use crate::migrate::record::MigrationRecord;
use crate::migrations::APP_LABEL;
use crate::schemas::infra::track_section_schema_v1;

pub fn migration() -> MigrationRecord {
    MigrationRecord::new(APP_LABEL, "0001_initial")
        .add_operation(Operation::CreateTable {
            table: "infra".to_string(),
            columns: vec![
                ColumnState::char("name", 128),
                ColumnState::char("railjson_version", 16)
                    .with_default(json!("2.2.1"))
                    .non_editable(),
            ],
        })
        .add_operation(Operation::CreateTable {
            table: "rollingstock".to_string(),
            columns: vec![
                ColumnState::char("name", 255),
                ColumnState::char("version", 255),
            ],
        })
        .add_operation(Operation::CreateTable {
            table: "tracksectionmodel".to_string(),
            columns: vec![
                ColumnState::char("obj_id", 255),
                ColumnState::new("infra_id", ColumnKind::Integer),
                ColumnState::new("data", ColumnKind::Json),
            ],
        })
        .add_operation(Operation::ReplaceValidator {
            table: "tracksectionmodel".to_string(),
            column_name: "data".to_string(),
            validator_spec: track_section_schema_v1(),
        })
}
