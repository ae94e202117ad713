//! Configuration parsing for padkill
//!
//! This crate handles parsing KDL configuration files and generating
//! default configuration documents. It also owns the controller and button
//! numbering that config files refer to.

pub mod buttons;
mod error;
mod model;
mod parser;
mod generator;

pub use error::ConfigError;
pub use model::*;
pub use parser::{parse_config, parse_config_or_default, parse_config_str};
pub use generator::{generate_config, generate_trigger_block};
