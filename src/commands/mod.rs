//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `hconf`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `hconf` library.

pub mod build;
pub mod digest;
pub mod tree;

use std::path::Path;

use anyhow::{Context, Result};
use hconf::loader;
use hconf::model::ConfigurationModel;

/// Load and build the model of every module below `root`.
pub(crate) fn load(root: &Path) -> Result<ConfigurationModel> {
    if !root.is_dir() {
        anyhow::bail!("Module root {} is not a directory", root.display());
    }
    loader::load_model(root)
        .with_context(|| format!("Failed to build configuration from {}", root.display()))
}
