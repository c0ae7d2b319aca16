pub mod common;
pub mod completions;
pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod replay;
