use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::spawn;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::common::schema::TableState;
use crate::state::SchemaState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowViolation {
    pub row: usize,
    pub column: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub rows_checked: usize,
    pub violations: Vec<RowViolation>,
}

impl TableReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Re-checks stored rows against the current column rules.
///
/// Validator replacements only govern later writes, so rows stored under an
/// older rule can fall out of line; this reports them without touching them.
pub struct SchemaVerifier {
    max_concurrent_tasks: usize,
}

impl SchemaVerifier {
    pub fn new(max_concurrent_tasks: usize) -> Self {
        SchemaVerifier {
            max_concurrent_tasks: max_concurrent_tasks.max(1),
        }
    }

    pub async fn run(&self, state: Arc<SchemaState>) -> Result<Vec<TableReport>> {
        let start_time = Instant::now();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_tasks));
        let mut verify_tasks = Vec::new();

        for table in state.tables.keys().cloned() {
            let semaphore_clone = Arc::clone(&semaphore);
            let state = Arc::clone(&state);

            let task = spawn(async move {
                let _permit = semaphore_clone.acquire_owned().await?;

                let table_state = state.table(&table)?;
                let report = verify_table(&table, table_state);

                debug!(
                    "Verified table {}, rows: {}, violations: {}",
                    table,
                    report.rows_checked,
                    report.violations.len()
                );

                anyhow::Ok(report)
            });

            verify_tasks.push(task);
        }

        let mut reports = Vec::with_capacity(verify_tasks.len());
        for joined in join_all(verify_tasks).await {
            let report = joined.context("Verification task panicked")??;
            reports.push(report);
        }

        let end_time = Instant::now();
        info!(
            "Verification finished, tables: {}, took: {}s",
            reports.len(),
            end_time.saturating_duration_since(start_time).as_secs_f32()
        );

        Ok(reports)
    }
}

fn verify_table(table: &str, table_state: &TableState) -> TableReport {
    let mut violations = Vec::new();

    for (row_index, row) in table_state.rows.iter().enumerate() {
        for column in &table_state.columns {
            let value = row.get(&column.name).unwrap_or(&serde_json::Value::Null);
            if let Err(reason) = column.check_value(value) {
                violations.push(RowViolation {
                    row: row_index,
                    column: column.name.clone(),
                    reason,
                });
            }
        }
    }

    TableReport {
        table: table.to_string(),
        rows_checked: table_state.rows.len(),
        violations,
    }
}
