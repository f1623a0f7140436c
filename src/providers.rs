pub mod base;
pub mod configs;
pub mod deepseek;
pub mod types;
pub mod utils;

#[cfg(test)]
pub mod mock;
