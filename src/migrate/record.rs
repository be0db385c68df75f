use std::fmt;

use serde::{Deserialize, Serialize};

use crate::migrate::operation::Operation;

/// Identifier of a migration record: the owning app plus the record name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MigrationKey {
    pub app_label: String,
    pub name: String,
}

impl MigrationKey {
    pub fn new(app_label: &str, name: &str) -> Self {
        MigrationKey {
            app_label: app_label.to_string(),
            name: name.to_string(),
        }
    }

    /// Matches either the bare record name or the full `app.name` id.
    pub fn matches(&self, target: &str) -> bool {
        self.name == target || self.to_string() == target
    }
}

impl fmt::Display for MigrationKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.name)
    }
}

/// A named, ordered list of schema operations applied at most once.
///
/// Operations run in declaration order; a later operation may rely on the
/// effects of an earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationRecord {
    pub key: MigrationKey,
    pub depends_on: Option<MigrationKey>,
    pub operations: Vec<Operation>,
}

impl MigrationRecord {
    pub fn new(app_label: &str, name: &str) -> Self {
        MigrationRecord {
            key: MigrationKey::new(app_label, name),
            depends_on: None,
            operations: Vec::new(),
        }
    }

    pub fn depends_on(mut self, app_label: &str, name: &str) -> Self {
        self.depends_on = Some(MigrationKey::new(app_label, name));
        self
    }

    pub fn add_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn id(&self) -> String {
        self.key.to_string()
    }
}
