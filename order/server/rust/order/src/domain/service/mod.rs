pub mod import_job_registry;
pub mod order_row_parser;

pub use import_job_registry::{ImportJobRegistry, JobRegistryError};
pub use order_row_parser::RowError;
