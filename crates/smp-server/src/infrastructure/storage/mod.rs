//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the server's TOML configuration from an
//! explicit path or the platform-appropriate directory, writes it back, and
//! falls back to defaults when no file exists yet (first run).

pub mod config;
