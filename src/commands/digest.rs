//! # Digest Command Implementation
//!
//! This module implements the `digest` subcommand. Without options it prints
//! one digest per scope (`core` and every site). With `--site` it prints the
//! manifest of that scope followed by its digest. `--json` prints the
//! per-scope digests as a JSON object for scripting.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use hconf::manifest::Scope;

/// Print the digest of the core scope and of every site
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Directory to search for module descriptors.
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Show the manifest and digest of a single scope (`core` or a site name).
    #[arg(long, value_name = "NAME")]
    pub site: Option<String>,

    /// Print the digests as JSON.
    #[arg(long, conflicts_with = "site")]
    pub json: bool,
}

/// Execute the `digest` command.
pub fn execute(args: DigestArgs) -> Result<()> {
    let model = super::load(&args.root)?;

    if let Some(site) = &args.site {
        let scope = Scope::from_name(site);
        let manifest = model
            .manifest(&scope)
            .with_context(|| format!("Failed to compute the manifest of {}", scope))?;
        print!("{}", manifest);
        println!("digest: {}", manifest.digest());
        return Ok(());
    }

    let digests = model.digests().context("Failed to compute digests")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&digests)?);
    } else {
        for (scope, digest) in &digests {
            println!("{}: {}", scope, digest);
        }
    }
    Ok(())
}
