//! Configuration module for Comicer
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use comicer::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! for source in &config.sources {
//!     println!("{} -> {}", source.name, source.start_url);
//! }
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{expand_home, Config, DriverConfig, LedgerPolicy, Secret, SourceConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, default_config_path, load_config, load_config_with_hash, parse_config,
    render_config,
};
