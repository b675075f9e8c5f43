pub mod cache;
pub mod cli;
pub mod config;
pub mod listener;
pub mod transaction;
pub mod types;

#[cfg(test)]
pub mod testing;
