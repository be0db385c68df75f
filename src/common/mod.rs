pub mod constraints;
pub mod helpers;
pub mod schema;
