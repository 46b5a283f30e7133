pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod util;
