pub mod import_job_store;
pub mod order_repository;

pub use import_job_store::ImportJobStore;
pub use order_repository::OrderRepository;
