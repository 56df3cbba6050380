pub mod api;
pub mod config;
pub mod export;
pub mod parser;
pub mod percent;
pub mod query;
pub mod runner;
pub mod schedule;
pub mod schema;
