use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validator::JsonSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    Choices { values: Vec<String> },
    MaxLength { max_length: usize },
    Validator { schema: JsonSchema },
}

impl Constraint {
    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Constraint::Choices {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks a non-null value. Nullability is the column's concern.
    pub(crate) fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Constraint::Choices { values } => match value.as_str() {
                Some(text) if values.iter().any(|allowed| allowed == text) => Ok(()),
                _ => Err(format!(
                    "{} is not a valid choice, expected one of: {}",
                    value,
                    values.join(", ")
                )),
            },
            Constraint::MaxLength { max_length } => match value.as_str() {
                Some(text) if text.chars().count() > *max_length => Err(format!(
                    "value has {} characters, at most {} allowed",
                    text.chars().count(),
                    max_length
                )),
                _ => Ok(()),
            },
            Constraint::Validator { schema } => schema
                .validate(value)
                .map_err(|violation| format!("document rejected by validator: {}", violation)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_choices_accept_only_listed_strings() {
        let constraint = Constraint::choices(["G1", "GB"]);
        assert!(constraint.check(&json!("GB")).is_ok());
        assert!(constraint.check(&json!("GX")).is_err());
        assert!(constraint.check(&json!([])).is_err());
    }

    #[test]
    fn test_max_length_counts_characters() {
        let constraint = Constraint::MaxLength { max_length: 3 };
        assert!(constraint.check(&json!("FR3")).is_ok());
        assert!(constraint.check(&json!("FR3.3")).is_err());
        assert!(constraint.check(&json!(12345)).is_ok());
    }

    #[test]
    fn test_validator_reports_violation_path() {
        let schema = JsonSchema::new(json!({"required": ["id"], "type": "object"})).unwrap();
        let constraint = Constraint::Validator { schema };
        let reason = constraint.check(&json!({})).unwrap_err();
        assert!(reason.contains("missing required property 'id'"));
    }
}
