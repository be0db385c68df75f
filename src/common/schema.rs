use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::constraints::Constraint;
use crate::validator::json_schema::is_integer;

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Char,
    Integer,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnState {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub default: Option<Value>,
    pub editable: bool,
    pub constraints: Vec<Constraint>,
}

impl ColumnState {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        ColumnState {
            name: name.to_string(),
            kind,
            nullable: false,
            default: None,
            editable: true,
            constraints: Vec::new(),
        }
    }

    pub fn char(name: &str, max_length: usize) -> Self {
        ColumnState::new(name, ColumnKind::Char)
            .with_constraint(Constraint::MaxLength { max_length })
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn non_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn max_length(&self) -> Option<usize> {
        self.constraints.iter().find_map(|constraint| match constraint {
            Constraint::MaxLength { max_length } => Some(*max_length),
            _ => None,
        })
    }

    /// Replaces every constraint of the same kind as `constraint`.
    pub fn replace_constraint(&mut self, constraint: Constraint) {
        let kind = std::mem::discriminant(&constraint);
        self.constraints
            .retain(|existing| std::mem::discriminant(existing) != kind);
        self.constraints.push(constraint);
    }

    pub fn check_value(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return if self.nullable {
                Ok(())
            } else {
                Err("value may not be null".to_string())
            };
        }

        let kind_matches = match self.kind {
            ColumnKind::Char => value.is_string(),
            ColumnKind::Integer => is_integer(value),
            ColumnKind::Json => true,
        };
        if !kind_matches {
            return Err(format!("{} is not a valid {:?} value", value, self.kind));
        }

        self.constraints
            .iter()
            .try_for_each(|constraint| constraint.check(value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    pub columns: Vec<ColumnState>,
    pub rows: Vec<Row>,
}

impl TableState {
    pub fn new(columns: Vec<ColumnState>) -> Self {
        TableState {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnState> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnState> {
        self.columns.iter_mut().find(|column| column.name == name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_check_value_rejects_null_unless_nullable() {
        let column = ColumnState::char("name", 255);
        assert!(column.check_value(&Value::Null).is_err());
        assert!(column.clone().nullable().check_value(&Value::Null).is_ok());
    }

    #[test]
    fn test_check_value_enforces_kind() {
        assert!(ColumnState::char("name", 8).check_value(&json!(1)).is_err());
        assert!(ColumnState::new("line_code", ColumnKind::Integer)
            .check_value(&json!("1"))
            .is_err());
        assert!(ColumnState::new("line_code", ColumnKind::Integer)
            .check_value(&json!(3.0))
            .is_ok());
        assert!(ColumnState::new("line_code", ColumnKind::Integer)
            .check_value(&json!(3.5))
            .is_err());
        assert!(ColumnState::new("data", ColumnKind::Json)
            .check_value(&json!({"any": ["thing"]}))
            .is_ok());
    }

    #[test]
    fn test_replace_constraint_keeps_other_kinds() {
        let mut column = ColumnState::char("loading_gauge", 16)
            .with_constraint(Constraint::choices(["G1", "G2"]));

        column.replace_constraint(Constraint::MaxLength { max_length: 2 });

        assert_eq!(column.max_length(), Some(2));
        assert_eq!(column.constraints.len(), 2);
        assert!(column.check_value(&json!("G1")).is_ok());
    }
}
