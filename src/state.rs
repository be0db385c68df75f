//! Versioned schema state.
//!
//! A [`SchemaState`] is a value: migrations and writes return a new state
//! and leave their input untouched, so every step of a migration chain can
//! be kept, compared and replayed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::helpers::preview_value;
use crate::common::schema::{Row, TableState};
use crate::error::{MigrationError, MigrationResult};
use crate::migrate::migration_report::AppliedMigration;
use crate::migrate::record::MigrationKey;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaState {
    pub version: u64,
    pub applied: Vec<AppliedMigration>,
    pub tables: BTreeMap<String, TableState>,
}

impl SchemaState {
    pub fn is_applied(&self, key: &MigrationKey) -> bool {
        self.applied.iter().any(|applied| &applied.key == key)
    }

    pub fn table(&self, name: &str) -> MigrationResult<&TableState> {
        self.tables
            .get(name)
            .ok_or_else(|| MigrationError::UnknownTable(name.to_string()))
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> MigrationResult<&mut TableState> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| MigrationError::UnknownTable(name.to_string()))
    }

    pub fn rows(&self, table: &str) -> MigrationResult<&[Row]> {
        Ok(&self.table(table)?.rows)
    }

    /// Writes a new row, filling absent columns with their defaults.
    pub fn insert_row(&self, table_name: &str, row: Row) -> MigrationResult<SchemaState> {
        let table = self.table(table_name)?;

        if let Some(unknown) = row.keys().find(|name| table.column(name).is_none()) {
            return Err(MigrationError::unknown_column(table_name, unknown));
        }

        let mut complete = Row::new();
        for column in &table.columns {
            let value = match row.get(&column.name) {
                Some(value) => value.clone(),
                None => match (&column.default, column.nullable) {
                    (Some(default), _) => default.clone(),
                    (None, true) => Value::Null,
                    (None, false) => {
                        return Err(MigrationError::constraint(
                            table_name,
                            &column.name,
                            "a value is required and the column has no default",
                        ))
                    }
                },
            };

            column
                .check_value(&value)
                .map_err(|reason| MigrationError::constraint(table_name, &column.name, reason))?;
            complete.insert(column.name.clone(), value);
        }

        let mut next = self.clone();
        next.table_mut(table_name)?.rows.push(complete);

        debug!(
            "Inserted row into {}: {}",
            table_name,
            preview_value(&Value::Object(row), 80)
        );

        Ok(next)
    }

    /// Rewrites the given columns of an existing row.
    pub fn update_row(
        &self,
        table_name: &str,
        index: usize,
        changes: Row,
    ) -> MigrationResult<SchemaState> {
        let table = self.table(table_name)?;

        if index >= table.rows.len() {
            return Err(MigrationError::UnknownRow {
                table: table_name.to_string(),
                index,
            });
        }

        for (name, value) in &changes {
            let column = table
                .column(name)
                .ok_or_else(|| MigrationError::unknown_column(table_name, name))?;

            if !column.editable {
                return Err(MigrationError::constraint(
                    table_name,
                    name,
                    "column is not editable",
                ));
            }

            column
                .check_value(value)
                .map_err(|reason| MigrationError::constraint(table_name, name, reason))?;
        }

        let mut next = self.clone();
        let row = &mut next.table_mut(table_name)?.rows[index];
        for (name, value) in changes {
            row.insert(name, value);
        }

        Ok(next)
    }
}
