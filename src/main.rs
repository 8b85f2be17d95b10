//! typea CLI entry point
//!
//! Parses arguments and dispatches via `cli::run`. Validation failures
//! are reported on stdout by the command itself; anything that escapes
//! here is printed to stderr and exits non-zero.

use typea::cli;

fn main() {
    match cli::run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    }
}
