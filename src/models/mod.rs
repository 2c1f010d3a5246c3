pub mod github;
pub mod metrics;
