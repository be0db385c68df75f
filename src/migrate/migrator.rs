use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::error::{MigrationError, MigrationResult};
use crate::migrate::migration_options::MigrationOptions;
use crate::migrate::migration_report::{AppliedMigration, MigrationReport, PlanEntry, PlanStatus};
use crate::migrate::record::MigrationRecord;
use crate::state::SchemaState;

/// Applies one record to `state` and returns the resulting state.
///
/// The input is never modified: when any operation fails the whole record
/// is abandoned and the caller still holds the previous state.
pub fn apply(state: &SchemaState, record: &MigrationRecord) -> MigrationResult<SchemaState> {
    apply_at(state, record, Utc::now())
}

pub fn apply_at(
    state: &SchemaState,
    record: &MigrationRecord,
    applied_at: DateTime<Utc>,
) -> MigrationResult<SchemaState> {
    if state.is_applied(&record.key) {
        return Err(MigrationError::DuplicateApplication(record.key.clone()));
    }

    if let Some(dependency) = &record.depends_on {
        if !state.is_applied(dependency) {
            return Err(MigrationError::DependencyNotApplied {
                migration: record.key.clone(),
                dependency: dependency.clone(),
            });
        }
    }

    let mut next = state.clone();

    for (index, operation) in record.operations.iter().enumerate() {
        debug!("{} [{}/{}] {}", record.key, index + 1, record.operations.len(), operation);

        if let Err(err) = operation.apply(&mut next) {
            warn!(
                "{} aborted at operation {} ({}): {}",
                record.key,
                index + 1,
                operation,
                err
            );
            return Err(err);
        }
    }

    next.version += 1;
    next.applied.push(AppliedMigration {
        key: record.key.clone(),
        applied_at,
    });

    Ok(next)
}

pub struct SchemaMigrator {
    records: Vec<MigrationRecord>,
    options: MigrationOptions,
}

impl SchemaMigrator {
    pub fn new(records: Vec<MigrationRecord>, options: MigrationOptions) -> Self {
        SchemaMigrator { records, options }
    }

    pub fn plan(&self, state: &SchemaState) -> Vec<PlanEntry> {
        self.records
            .iter()
            .map(|record| PlanEntry {
                key: record.key.clone(),
                status: if state.is_applied(&record.key) {
                    PlanStatus::Applied
                } else {
                    PlanStatus::Pending
                },
            })
            .collect()
    }

    /// Applies every pending record, in the order given, up to the target.
    ///
    /// Records are never re-ordered; a record whose dependency is neither
    /// applied nor earlier in the list fails with `DependencyNotApplied`.
    pub fn run(&self, state: &SchemaState) -> MigrationResult<(SchemaState, MigrationReport)> {
        info!("Running schema migrator");

        let start_time = Instant::now();
        let records = self.records_up_to_target()?;

        let mut current = state.clone();
        let mut report = MigrationReport::default();

        for record in records {
            if current.is_applied(&record.key) {
                debug!("{} already applied, skipping", record.key);
                report.skipped.push(record.key.clone());
                continue;
            }

            info!("Applying {}", record.id());
            current = apply(&current, record)?;
            report.applied.push(record.key.clone());
        }

        let end_time = Instant::now();

        info!(
            "Migration finished, applied: {}, skipped: {}, schema version: {}, took: {}s",
            report.applied.len(),
            report.skipped.len(),
            current.version,
            end_time.saturating_duration_since(start_time).as_secs_f32()
        );

        Ok((current, report))
    }

    fn records_up_to_target(&self) -> MigrationResult<&[MigrationRecord]> {
        let target = match &self.options.target {
            Some(target) => target,
            None => return Ok(&self.records),
        };

        let position = self
            .records
            .iter()
            .position(|record| record.key.matches(target))
            .ok_or_else(|| MigrationError::UnknownMigration(target.clone()))?;

        Ok(&self.records[..=position])
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::{json, Value};

    use super::*;
    use crate::common::schema::Row;
    use crate::migrate::record::MigrationKey;
    use crate::migrations;
    use crate::migrations::m0004_add_loading_gauges;
    use crate::schemas::infra::LoadingGaugeType;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn migrator(target: Option<&str>) -> SchemaMigrator {
        SchemaMigrator::new(
            migrations::all(),
            MigrationOptions {
                target: target.map(str::to_string),
            },
        )
    }

    fn track_section(id: &str) -> Value {
        json!({
            "id": id,
            "length": 1200.0,
            "line_code": 1,
            "line_name": "Line",
            "track_number": 1,
            "track_name": "V1",
            "slopes": [],
            "curves": [],
            "geo": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]},
            "sch": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}
        })
    }

    /// State right before the loading gauge migration, with some data.
    fn populated_state() -> SchemaState {
        let (state, _) = migrator(Some("0003_tracklinklayer"))
            .run(&SchemaState::default())
            .unwrap();

        state
            .insert_row("rollingstock", row(json!({"name": "BB 7200", "version": "1"})))
            .unwrap()
            .insert_row("rollingstock", row(json!({"name": "TGV", "version": "2"})))
            .unwrap()
            .insert_row("infra", row(json!({"name": "small_infra"})))
            .unwrap()
            .insert_row(
                "tracksectionmodel",
                row(json!({"obj_id": "TA0", "infra_id": 1, "data": track_section("TA0")})),
            )
            .unwrap()
    }

    #[test]
    fn test_apply_without_dependency_fails() {
        let (state, _) = migrator(Some("0002_tracksectionlayer"))
            .run(&SchemaState::default())
            .unwrap();

        let err = apply(&state, &m0004_add_loading_gauges::migration()).unwrap_err();
        assert_eq!(
            err,
            MigrationError::DependencyNotApplied {
                migration: MigrationKey::new("osrd_infra", "0004_add_loading_gauges"),
                dependency: MigrationKey::new("osrd_infra", "0003_tracklinklayer"),
            }
        );
    }

    #[test]
    fn test_apply_twice_fails_with_duplicate_application() {
        let record = m0004_add_loading_gauges::migration();
        let once = apply(&populated_state(), &record).unwrap();

        let err = apply(&once, &record).unwrap_err();
        assert_eq!(err, MigrationError::DuplicateApplication(record.key.clone()));
    }

    #[test]
    fn test_apply_is_pure_and_versioned() {
        let before = populated_state();
        let applied_at = Utc.with_ymd_and_hms(2022, 4, 27, 14, 55, 0).unwrap();
        let after = apply_at(&before, &m0004_add_loading_gauges::migration(), applied_at).unwrap();

        assert_eq!(before.version, 3);
        assert_eq!(after.version, 4);
        assert!(before.table("rollingstock").unwrap().column("loading_gauge").is_none());
        assert_eq!(after.applied.last().map(|applied| applied.applied_at), Some(applied_at));
    }

    #[test]
    fn test_every_rolling_stock_gets_a_gauge_from_the_domain() {
        let after = apply(&populated_state(), &m0004_add_loading_gauges::migration()).unwrap();
        let domain = LoadingGaugeType::domain();

        let rows = after.rows("rollingstock").unwrap();
        assert_eq!(rows.len(), 2);
        for row in rows {
            let gauge = row["loading_gauge"].as_str().unwrap();
            assert!(domain.iter().any(|value| value == gauge));
        }
    }

    #[test]
    fn test_new_rolling_stock_must_name_a_gauge() {
        let after = apply(&populated_state(), &m0004_add_loading_gauges::migration()).unwrap();

        let err = after
            .insert_row("rollingstock", row(json!({"name": "Z2", "version": "1"})))
            .unwrap_err();
        assert!(matches!(
            err,
            MigrationError::ConstraintViolation { ref column, .. } if column == "loading_gauge"
        ));

        let err = after
            .insert_row(
                "rollingstock",
                row(json!({"name": "Z2", "version": "1", "loading_gauge": "G3"})),
            )
            .unwrap_err();
        assert!(matches!(err, MigrationError::ConstraintViolation { .. }));

        assert!(after
            .insert_row(
                "rollingstock",
                row(json!({"name": "Z2", "version": "1", "loading_gauge": "FR3.3"})),
            )
            .is_ok());
    }

    #[test]
    fn test_new_infras_default_to_current_railjson_version() {
        let after = apply(&populated_state(), &m0004_add_loading_gauges::migration()).unwrap();

        let after = after
            .insert_row("infra", row(json!({"name": "large_infra"})))
            .unwrap();
        let rows = after.rows("infra").unwrap();
        assert_eq!(rows[0]["railjson_version"], json!("2.2.1"));
        assert_eq!(rows[1]["railjson_version"], json!("2.2.2"));
    }

    #[test]
    fn test_old_track_section_documents_are_rejected_on_next_write() {
        let before = populated_state();
        let after = apply(&before, &m0004_add_loading_gauges::migration()).unwrap();

        // Stored rows are left as they were.
        assert_eq!(
            after.rows("tracksectionmodel").unwrap(),
            before.rows("tracksectionmodel").unwrap()
        );

        let old_document = row(json!({"obj_id": "TA1", "infra_id": 1, "data": track_section("TA1")}));
        assert!(before.insert_row("tracksectionmodel", old_document.clone()).is_ok());

        let err = after
            .insert_row("tracksectionmodel", old_document)
            .unwrap_err();
        match err {
            MigrationError::ConstraintViolation { column, reason, .. } => {
                assert_eq!(column, "data");
                assert!(reason.contains("'navigability'"));
            }
            other => panic!("unexpected error: {}", other),
        }

        let mut new_document = track_section("TA1");
        new_document["navigability"] = json!("BOTH");
        assert!(after
            .insert_row(
                "tracksectionmodel",
                row(json!({"obj_id": "TA1", "infra_id": 1, "data": new_document})),
            )
            .is_ok());
    }

    #[test]
    fn test_failed_operation_aborts_whole_record() {
        let state = populated_state();
        let mut record = m0004_add_loading_gauges::migration();
        record.operations.push(crate::migrate::operation::Operation::AlterColumn {
            table: "rollingstock".to_string(),
            column_name: "name".to_string(),
            new_default: None,
            editable: true,
            max_length: 3,
        });

        let err = apply(&state, &record).unwrap_err();
        assert!(matches!(err, MigrationError::ConstraintViolation { .. }));
        assert!(!state.is_applied(&record.key));
        assert!(state.table("rollingstock").unwrap().column("loading_gauge").is_none());
    }

    #[test]
    fn test_run_skips_applied_records() {
        let migrator = migrator(None);
        let (state, report) = migrator.run(&populated_state()).unwrap();

        assert_eq!(report.skipped.len(), 3);
        assert_eq!(
            report.applied,
            vec![MigrationKey::new("osrd_infra", "0004_add_loading_gauges")]
        );

        let (again, report) = migrator.run(&state).unwrap();
        assert!(report.applied.is_empty());
        assert_eq!(again, state);
    }

    #[test]
    fn test_plan_and_unknown_target() {
        let state = populated_state();
        let plan = migrator(None).plan(&state);
        let statuses: Vec<_> = plan.iter().map(|entry| entry.status).collect();
        assert_eq!(
            statuses,
            vec![
                PlanStatus::Applied,
                PlanStatus::Applied,
                PlanStatus::Applied,
                PlanStatus::Pending
            ]
        );

        let err = migrator(Some("0009_missing")).run(&state).unwrap_err();
        assert_eq!(err, MigrationError::UnknownMigration("0009_missing".to_string()));
    }
}
