use crate::migrate::operation::Operation;
use crate::migrate::record::MigrationRecord;
use crate::migrations::{layer_columns, APP_LABEL};

pub fn migration() -> MigrationRecord {
    MigrationRecord::new(APP_LABEL, "0002_tracksectionlayer")
        .depends_on(APP_LABEL, "0001_initial")
        .add_operation(Operation::CreateTable {
            table: "tracksectionlayer".to_string(),
            columns: layer_columns(),
        })
}
