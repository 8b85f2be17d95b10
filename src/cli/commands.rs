//! CLI command implementations
//!
//! Every command produces a single [`Report`]; `run_command` writes it to
//! stdout and maps it to the process exit code.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::observability::{log_event_with_fields, Event, Logger};
use crate::schema::{
    read_expression, unknown_types, Expression, ExpressionLoader, Extend, Mode, TypeRegistry,
    Validator, ValidatorOptions,
};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{error_body, ok_body, read_input, write_error, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Validation mode (optional, default "default")
    #[serde(default)]
    pub mode: Mode,

    /// Fail positional arrays longer than their expression (default: false)
    #[serde(default)]
    pub reject_extra_elements: bool,

    /// Directory of named `*.json` expressions (optional)
    #[serde(default)]
    pub expressions_dir: Option<String>,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        let display = path.display().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("mode", config.mode.as_str()), ("path", display.as_str())],
        );

        Ok(config)
    }

    /// Loads `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> CliResult<()> {
        if matches!(&self.expressions_dir, Some(dir) if dir.trim().is_empty()) {
            return Err(CliError::config_error("expressions_dir must not be empty"));
        }
        Ok(())
    }

    /// Validator options after command-line overrides
    pub fn options(&self, mode: Option<Mode>, reject_extra_elements: bool) -> ValidatorOptions {
        ValidatorOptions {
            mode: mode.unwrap_or(self.mode),
            reject_extra_elements: reject_extra_elements || self.reject_extra_elements,
        }
    }

    /// Loader over `expressions_dir`, with every file loaded
    pub fn loader(&self) -> CliResult<Option<ExpressionLoader>> {
        let Some(dir) = &self.expressions_dir else {
            return Ok(None);
        };
        let mut loader = ExpressionLoader::new(PathBuf::from(dir));
        loader.load_all()?;
        Ok(Some(loader))
    }
}

/// Outcome of one command
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Command succeeded; `data` is the payload
    Ok(Value),
    /// Input was rejected (validation failure, unknown types)
    Failed { code: String, message: String },
}

impl Report {
    fn failed(code: &str, message: impl Into<String>) -> Self {
        Report::Failed {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            Report::Ok(_) => 0,
            Report::Failed { .. } => 1,
        }
    }

    /// JSON envelope written to stdout
    pub fn to_json(&self) -> Value {
        match self {
            Report::Ok(data) => ok_body(data.clone()),
            Report::Failed { code, message } => error_body(code, message),
        }
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<i32> {
    let cli = Cli::parse_args();
    if let Some(level) = cli.log_level {
        Logger::set_min_severity(level);
    }
    run_command(cli.command)
}

/// Run a command, write its report and return the exit code
pub fn run_command(cmd: Command) -> CliResult<i32> {
    let report = execute(cmd)?;
    match &report {
        Report::Ok(data) => write_response(data.clone())?,
        Report::Failed { code, message } => write_error(code, message)?,
    }
    Ok(report.exit_code())
}

/// Run a command without writing anything
pub fn execute(cmd: Command) -> CliResult<Report> {
    match cmd {
        Command::Validate {
            expr,
            data,
            mode,
            reject_extra_elements,
            config,
        } => {
            let config = Config::load_or_default(config.as_deref())?;
            let expression = resolve_expression(&expr, &config)?;
            let input = read_input(data.as_deref())?;
            let options = config.options(mode, reject_extra_elements);
            Ok(validate(&expression, &input, options))
        }
        Command::CheckExpr { expr, config } => {
            let config = Config::load_or_default(config.as_deref())?;
            let expression = resolve_expression(&expr, &config)?;
            Ok(check_expr(&expression, TypeRegistry::global()))
        }
        Command::Types { config } => {
            let config = Config::load_or_default(config.as_deref())?;
            types(&config, TypeRegistry::global())
        }
    }
}

/// Validate one document
pub fn validate(expr: &Expression, data: &Value, options: ValidatorOptions) -> Report {
    match Validator::global().verify(expr, Some(data), &Extend::new(), options) {
        Ok(value) => Report::Ok(value),
        Err(e) => Report::failed(e.code(), e.to_string()),
    }
}

/// Report unknown type references without touching data
pub fn check_expr(expr: &Expression, registry: &TypeRegistry) -> Report {
    let missing = unknown_types(expr, registry);
    if missing.is_empty() {
        return Report::Ok(json!({"valid": true}));
    }
    Report::failed(
        "TYPEA_CONFIGURATION",
        format!("unsupported type(s): {}", missing.join(", ")),
    )
}

/// List registered types and, when configured, loaded expressions
pub fn types(config: &Config, registry: &TypeRegistry) -> CliResult<Report> {
    let expressions: Vec<String> = match config.loader()? {
        Some(loader) => loader.names().map(str::to_string).collect(),
        None => Vec::new(),
    };
    Ok(Report::Ok(json!({
        "types": registry.names(),
        "expressions": expressions,
    })))
}

/// `expr` is a file path, or failing that a name in `expressions_dir`
pub fn resolve_expression(expr: &str, config: &Config) -> CliResult<Expression> {
    let path = Path::new(expr);
    if path.is_file() {
        return Ok(read_expression(path)?);
    }

    let loaded = config
        .loader()?
        .and_then(|loader| loader.get(expr))
        .ok_or_else(|| CliError::expression_not_found(expr))?;
    Ok(Expression::clone(&loaded))
}
