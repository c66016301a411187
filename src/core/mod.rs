pub mod config;
pub mod defaults;
pub mod options;
pub mod paths;

#[cfg(test)]
mod config_test;

pub use config::*;
pub use options::OptionParser;
