pub mod agent;
pub mod aggregator;
pub mod commands;
pub mod context;
pub mod errors;
pub mod files;
pub mod formatter;
pub mod history;
pub mod ingest;
pub mod prompt;
pub mod providers;
pub mod render;
pub mod tools;
