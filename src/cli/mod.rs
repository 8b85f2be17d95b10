//! CLI module for typea
//!
//! Provides command-line interface for:
//! - validate: validate a JSON document against an expression
//! - check-expr: report unknown types in an expression
//! - types: list registered types and loaded expressions

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    check_expr, execute, resolve_expression, run, run_command, types, validate, Config, Report,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_input, write_error, write_response};
