#![forbid(unsafe_code)]

pub mod browser;
pub mod chapter;
pub mod clean;
pub mod cli;
pub mod fetcher;
pub mod logging;
pub mod output_log;
pub mod pull;
pub mod source;
