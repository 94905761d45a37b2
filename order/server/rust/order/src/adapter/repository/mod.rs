pub mod import_job_in_memory;
pub mod order_in_memory;
pub mod order_postgres;
