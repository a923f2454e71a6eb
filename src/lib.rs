pub mod http;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use report::emit_all;
pub use runner::run_tests;
