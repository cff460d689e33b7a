//! standin: inspect the proxies the engine builds for a descriptor manifest
//!
//! ## Commands
//!
//! - **list**: Registered types and functions, host builtins included
//! - **describe**: Proxy type name, type closure and forwarded members of a target
//! - **resolve**: Resolved signature of a single member
//!
//! ## Example Usage
//!
//! ```bash
//! # List everything a manifest registers
//! standin list --manifest media.json
//!
//! # Describe the proxy of a class, as JSON
//! standin describe --manifest media.json media::Player --json
//!
//! # Resolve one member with a custom type name prefix
//! standin resolve --manifest media.json --config engine.json media::Player play
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use tracing::debug;

use standin::report::{ListReport, MemberReport, TargetReport};
use standin::{Engine, EngineConfig};

#[derive(Parser)]
#[command(
    name = "standin",
    author,
    version,
    about = "Inspect synthesized test-double proxies",
    long_about = "Loads a JSON descriptor manifest and reports what the proxy engine \
                  synthesizes for its types and functions."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Descriptor manifest (JSON with `types` and `functions`)
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered types and functions
    List,

    /// Describe the proxy synthesized for a type or function
    Describe {
        /// Fully qualified type or function name
        target: String,
    },

    /// Resolve the signature of one member of a type
    Resolve {
        /// Fully qualified type name
        target: String,
        /// Member name
        member: String,
    },
}

fn build_engine(manifest: Option<&PathBuf>, config: Option<&PathBuf>) -> Result<Engine> {
    let config = match config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::with_config(config);
    if let Some(path) = manifest {
        let count = engine
            .registry()
            .load_manifest(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        debug!(path = %path.display(), count, "manifest loaded");
    }
    Ok(engine)
}

fn print<T: Serialize + Display>(report: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

fn main() -> Result<()> {
    let Cli {
        command,
        manifest,
        config,
        json,
    } = Cli::parse();

    let engine = build_engine(manifest.as_ref(), config.as_ref())?;

    match command {
        Commands::List => print(&ListReport::from_engine(&engine), json),
        Commands::Describe { target } => print(&TargetReport::describe(&engine, &target)?, json),
        Commands::Resolve { target, member } => {
            let report = MemberReport::resolve(&engine, &target, &member)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
            Ok(())
        }
    }
}
