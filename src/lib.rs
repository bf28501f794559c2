// Core infrastructure modules
pub mod core;

// Supporting modules
pub mod config;
pub mod models;

#[cfg(test)]
mod test_utils;
