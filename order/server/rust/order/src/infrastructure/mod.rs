pub mod config;
pub mod logger;
pub mod metrics;
pub mod spreadsheet;
pub mod stamp_renderer;
