pub mod get_import_job;
pub mod import_orders;
pub mod regenerate_stamp;
pub mod run_import_job;

pub use get_import_job::{GetImportJobError, GetImportJobUseCase, ImportJobSnapshot};
pub use import_orders::{ImportError, ImportOrdersUseCase, NoopProgressReporter, ProgressReporter};
pub use regenerate_stamp::{RegenerateStampError, RegenerateStampUseCase};
pub use run_import_job::RunImportJobUseCase;
