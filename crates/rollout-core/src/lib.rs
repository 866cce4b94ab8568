pub mod actions;
pub mod cache;
pub mod config;
pub mod error;
pub mod io;
pub mod orchestrator;
pub mod paths;
pub mod report;
pub mod run_once;
pub mod toolchain;

pub use error::{Result, RolloutError};
