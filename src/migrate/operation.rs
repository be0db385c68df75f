use std::fmt;

use serde_json::Value;

use crate::common::constraints::Constraint;
use crate::common::helpers::preview_value;
use crate::common::schema::{ColumnKind, ColumnState, TableState};
use crate::error::{MigrationError, MigrationResult};
use crate::state::SchemaState;
use crate::validator::JsonSchema;

/// One declarative schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    CreateTable {
        table: String,
        columns: Vec<ColumnState>,
    },
    /// Adds a string column restricted to a closed set of values.
    ///
    /// Existing rows receive `default`. With `preserve_default` unset the
    /// default only serves that backfill and the column is left without
    /// one, so later writes must name a value.
    AddColumn {
        table: String,
        column_name: String,
        value_domain: Vec<String>,
        default: Option<Value>,
        preserve_default: bool,
        max_length: usize,
    },
    AlterColumn {
        table: String,
        column_name: String,
        new_default: Option<Value>,
        editable: bool,
        max_length: usize,
    },
    /// Swaps the validator of a JSON column. Stored rows are not re-checked.
    ReplaceValidator {
        table: String,
        column_name: String,
        validator_spec: Value,
    },
}

impl Operation {
    pub fn table(&self) -> &str {
        match self {
            Operation::CreateTable { table, .. }
            | Operation::AddColumn { table, .. }
            | Operation::AlterColumn { table, .. }
            | Operation::ReplaceValidator { table, .. } => table,
        }
    }

    pub(crate) fn apply(&self, state: &mut SchemaState) -> MigrationResult<()> {
        match self {
            Operation::CreateTable { table, columns } => create_table(state, table, columns),
            Operation::AddColumn {
                table,
                column_name,
                value_domain,
                default,
                preserve_default,
                max_length,
            } => {
                check_domain_default(table, column_name, value_domain, default, *max_length)?;
                add_column(
                    state.table_mut(table)?,
                    table,
                    column_name,
                    value_domain,
                    default,
                    *preserve_default,
                    *max_length,
                )
            }
            Operation::AlterColumn {
                table,
                column_name,
                new_default,
                editable,
                max_length,
            } => alter_column(
                state.table_mut(table)?,
                table,
                column_name,
                new_default,
                *editable,
                *max_length,
            ),
            Operation::ReplaceValidator {
                table,
                column_name,
                validator_spec,
            } => replace_validator(state.table_mut(table)?, table, column_name, validator_spec),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::CreateTable { table, columns } => {
                write!(f, "Create table {} ({} columns)", table, columns.len())
            }
            Operation::AddColumn {
                table,
                column_name,
                value_domain,
                ..
            } => write!(
                f,
                "Add column {} to {} ({} choices)",
                column_name,
                table,
                value_domain.len()
            ),
            Operation::AlterColumn {
                table, column_name, ..
            } => write!(f, "Alter column {} on {}", column_name, table),
            Operation::ReplaceValidator {
                table, column_name, ..
            } => write!(f, "Replace validator of {} on {}", column_name, table),
        }
    }
}

fn create_table(state: &mut SchemaState, table: &str, columns: &[ColumnState]) -> MigrationResult<()> {
    if state.tables.contains_key(table) {
        return Err(MigrationError::DuplicateTable(table.to_string()));
    }

    for (index, column) in columns.iter().enumerate() {
        if columns[..index].iter().any(|other| other.name == column.name) {
            return Err(MigrationError::DuplicateColumn {
                table: table.to_string(),
                column: column.name.clone(),
            });
        }
    }

    state
        .tables
        .insert(table.to_string(), TableState::new(columns.to_vec()));

    Ok(())
}

fn check_domain_default(
    table: &str,
    column_name: &str,
    value_domain: &[String],
    default: &Option<Value>,
    max_length: usize,
) -> MigrationResult<()> {
    if value_domain.is_empty() {
        return Err(MigrationError::invalid(
            table,
            column_name,
            "the value domain is empty",
        ));
    }

    if let Some(too_long) = value_domain
        .iter()
        .find(|value| value.chars().count() > max_length)
    {
        return Err(MigrationError::invalid(
            table,
            column_name,
            format!("choice {} is longer than {} characters", too_long, max_length),
        ));
    }

    match default {
        None => Ok(()),
        Some(Value::String(value)) if value_domain.contains(value) => Ok(()),
        Some(Value::String(value)) => Err(MigrationError::invalid(
            table,
            column_name,
            format!("default '{}' is not a member of the value domain", value),
        )),
        Some(other) => Err(MigrationError::invalid(
            table,
            column_name,
            format!("default {} is not a string", preview_value(other, 40)),
        )),
    }
}

fn add_column(
    table_state: &mut TableState,
    table: &str,
    column_name: &str,
    value_domain: &[String],
    default: &Option<Value>,
    preserve_default: bool,
    max_length: usize,
) -> MigrationResult<()> {
    if table_state.column(column_name).is_some() {
        return Err(MigrationError::DuplicateColumn {
            table: table.to_string(),
            column: column_name.to_string(),
        });
    }

    let backfill = match default {
        Some(value) => value.clone(),
        None if table_state.rows.is_empty() => Value::Null,
        None => {
            return Err(MigrationError::constraint(
                table,
                column_name,
                format!(
                    "{} existing rows need a value but no backfill default was given",
                    table_state.rows.len()
                ),
            ))
        }
    };

    for row in table_state.rows.iter_mut() {
        row.insert(column_name.to_string(), backfill.clone());
    }

    debug!(
        "Backfilled {} rows of {} with {}.{} = {}",
        table_state.rows.len(),
        table,
        table,
        column_name,
        preview_value(&backfill, 40)
    );

    let mut column = ColumnState::char(column_name, max_length)
        .with_constraint(Constraint::choices(value_domain.iter().cloned()));
    if preserve_default {
        column.default = default.clone();
    }

    table_state.columns.push(column);

    Ok(())
}

fn alter_column(
    table_state: &mut TableState,
    table: &str,
    column_name: &str,
    new_default: &Option<Value>,
    editable: bool,
    max_length: usize,
) -> MigrationResult<()> {
    let limit = Constraint::MaxLength { max_length };

    let mut altered = table_state
        .column(column_name)
        .ok_or_else(|| MigrationError::unknown_column(table, column_name))?
        .clone();
    altered.default = new_default.clone();
    altered.editable = editable;
    altered.replace_constraint(limit.clone());

    if let Some(default) = new_default {
        altered.check_value(default).map_err(|reason| {
            MigrationError::invalid(
                table,
                column_name,
                format!("default {} rejected: {}", preview_value(default, 40), reason),
            )
        })?;
    }

    for (index, row) in table_state.rows.iter().enumerate() {
        if let Some(value) = row.get(column_name).filter(|value| !value.is_null()) {
            limit.check(value).map_err(|reason| {
                MigrationError::constraint(table, column_name, format!("row {}: {}", index, reason))
            })?;
        }
    }

    let column = table_state
        .column_mut(column_name)
        .ok_or_else(|| MigrationError::unknown_column(table, column_name))?;
    *column = altered;

    Ok(())
}

fn replace_validator(
    table_state: &mut TableState,
    table: &str,
    column_name: &str,
    validator_spec: &Value,
) -> MigrationResult<()> {
    let schema = JsonSchema::new(validator_spec.clone())
        .map_err(|err| MigrationError::invalid(table, column_name, err.to_string()))?;

    let column = table_state
        .column_mut(column_name)
        .ok_or_else(|| MigrationError::unknown_column(table, column_name))?;

    if column.kind != ColumnKind::Json {
        return Err(MigrationError::invalid(
            table,
            column_name,
            "validators can only be attached to JSON columns",
        ));
    }

    column.replace_constraint(Constraint::Validator { schema });

    Ok(())
}
