#[derive(Debug, Clone, Default)]
pub struct MigrationOptions {
    /// Last record to apply, by name or full id. `None` applies everything.
    pub(crate) target: Option<String>,
}
