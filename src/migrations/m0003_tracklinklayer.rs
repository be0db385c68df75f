use crate::migrate::operation::Operation;
use crate::migrate::record::MigrationRecord;
use crate::migrations::{layer_columns, APP_LABEL};

pub fn migration() -> MigrationRecord {
    MigrationRecord::new(APP_LABEL, "0003_tracklinklayer")
        .depends_on(APP_LABEL, "0002_tracksectionlayer")
        .add_operation(Operation::CreateTable {
            table: "tracklinklayer".to_string(),
            columns: layer_columns(),
        })
}
