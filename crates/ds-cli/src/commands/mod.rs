//! Command implementations.

pub mod config;
pub mod run;
pub mod search;

pub use config::run_config;
pub use run::run_params;
pub use search::run_search;
