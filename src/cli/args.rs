//! CLI argument definitions using clap
//!
//! Commands:
//! - typea validate --expr <file|name> [--data <file>] [--mode <mode>] [--config <path>]
//! - typea check-expr --expr <file|name> [--config <path>]
//! - typea types [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::observability::Severity;
use crate::schema::Mode;

/// typea - validate and coerce JSON data against expressions
#[derive(Parser, Debug)]
#[command(name = "typea")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Minimum log severity written to stderr (trace, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<Severity>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a JSON document against an expression
    Validate {
        /// Expression file, or the name of an expression in `expressions_dir`
        #[arg(long)]
        expr: String,

        /// Data file (reads stdin when omitted)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Validation mode (default, strict, loose); overrides the config file
        #[arg(long)]
        mode: Option<Mode>,

        /// Fail positional arrays that carry more elements than the expression
        #[arg(long)]
        reject_extra_elements: bool,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Parse an expression and report types the registry does not know
    CheckExpr {
        /// Expression file, or the name of an expression in `expressions_dir`
        #[arg(long)]
        expr: String,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List registered types and loaded expressions
    Types {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
