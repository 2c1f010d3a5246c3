pub mod config;
pub mod fetcher;
pub mod github;
pub mod refresh;
pub mod report;
pub mod staleness;
pub mod store;
