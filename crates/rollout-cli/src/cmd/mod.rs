pub mod actions;
pub mod cache;
pub mod config;
pub mod init;
