//! Loading gauges: rolling stocks get a mandatory gauge category, track
//! sections may carry per-range gauge limits, and new infras default to
//! railjson 2.2.2.

use serde_json::json;

use crate::migrate::operation::Operation;
use crate::migrate::record::MigrationRecord;
use crate::migrations::APP_LABEL;
use crate::schemas::infra::{track_section_schema, LoadingGaugeType, RAILJSON_VERSION};

/// Value given to rolling stocks that predate the column.
pub const LOADING_GAUGE_BACKFILL: LoadingGaugeType = LoadingGaugeType::G1;

pub fn migration() -> MigrationRecord {
    MigrationRecord::new(APP_LABEL, "0004_add_loading_gauges")
        .depends_on(APP_LABEL, "0003_tracklinklayer")
        .add_operation(Operation::AddColumn {
            table: "rollingstock".to_string(),
            column_name: "loading_gauge".to_string(),
            value_domain: LoadingGaugeType::domain(),
            default: Some(json!(LOADING_GAUGE_BACKFILL.as_str())),
            preserve_default: false,
            max_length: 16,
        })
        .add_operation(Operation::AlterColumn {
            table: "infra".to_string(),
            column_name: "railjson_version".to_string(),
            new_default: Some(json!(RAILJSON_VERSION)),
            editable: false,
            max_length: 16,
        })
        .add_operation(Operation::ReplaceValidator {
            table: "tracksectionmodel".to_string(),
            column_name: "data".to_string(),
            validator_spec: track_section_schema(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_shape() {
        let record = migration();
        assert_eq!(record.id(), "osrd_infra.0004_add_loading_gauges");
        assert_eq!(
            record.depends_on.as_ref().map(ToString::to_string),
            Some("osrd_infra.0003_tracklinklayer".to_string())
        );

        let tables: Vec<_> = record.operations.iter().map(Operation::table).collect();
        assert_eq!(tables, vec!["rollingstock", "infra", "tracksectionmodel"]);
    }

    #[test]
    fn test_loading_gauge_column_is_mandatory_with_explicit_backfill() {
        match &migration().operations[0] {
            Operation::AddColumn {
                value_domain,
                default,
                preserve_default,
                ..
            } => {
                assert_eq!(value_domain.len(), 7);
                assert_eq!(default, &Some(json!("G1")));
                assert!(!preserve_default);
            }
            other => panic!("unexpected first operation: {}", other),
        }
    }
}
