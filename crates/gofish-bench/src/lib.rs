pub mod analytics;
pub mod config;
pub mod logging;
pub mod protocol;
pub mod report;
pub mod tournament;
