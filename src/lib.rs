pub mod cmd;
pub mod error;
pub mod fake;
pub mod iostream;
pub mod provider;
pub mod query;
pub mod strategy;
