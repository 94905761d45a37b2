pub mod dataset;
pub mod import_job;
pub mod import_outcome;
pub mod order;

pub use dataset::{DatasetError, DatasetFormat, DatasetRow, UploadedDataset};
pub use import_job::{ImportJob, ImportJobStatus, JobTransitionError, JobUpdate};
pub use import_outcome::{FailedRow, ImportOutcome, SkippedRow, StampEntry};
pub use order::{NaturalKey, NewOrder, Order, StampStatus};
