pub mod migration_options;
pub mod migration_report;
pub mod migrator;
pub mod operation;
pub mod record;
pub mod verifier;
