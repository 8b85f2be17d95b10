//! Runtime validation of untyped JSON data
//!
//! An [`Expression`] describes the expected shape of a value. Evaluating
//! it against input data either produces a cleaned, coerced copy of the
//! data or a single [`ValidationError`] naming the first failing path.
//!
//! # Design Principles
//!
//! - Expressions are built once and reused
//! - Output keys follow the expression; unknown input keys are dropped
//! - Three modes only change how empty values are treated
//! - Types are open: `register_type` extends or mints types at runtime
//! - One error channel, first failure wins

mod checks;
mod errors;
mod filter;
mod loader;
mod registry;
mod types;
mod validator;

pub use checks::common as common_checks;
pub use errors::{
    CheckError, ErrorKind, ErrorPath, LoaderError, LoaderResult, PathSegment, ValidationError,
    ValidationResult,
};
pub use filter::filter_null;
pub use loader::{parse_expression, read_expression, unknown_types, ExpressionLoader};
pub use registry::{
    builtin, CheckFn, Checks, RegisteredType, TypeIdent, TypeKey, TypeRegistry, TYPE_CHECK,
};
pub use types::{
    is_default_empty, Expression, FieldType, Mode, TypedField, ValidatorOptions, RESERVED_KEYS,
};
pub use validator::{Evaluator, Extend, ExtendValue, Key, Schema, Validator};

use serde_json::Value;

/// Validates `data` in default mode against the process-scope registry
pub fn validate(expr: &Expression, data: &Value) -> ValidationResult {
    Validator::global().validate(expr, data)
}

/// Validates `data` in strict mode against the process-scope registry
pub fn validate_strict(expr: &Expression, data: &Value) -> ValidationResult {
    Validator::global().validate_strict(expr, data)
}

/// Validates `data` in loose mode against the process-scope registry
pub fn validate_loose(expr: &Expression, data: &Value) -> ValidationResult {
    Validator::global().validate_loose(expr, data)
}

/// Registers or extends a type in the process-scope registry.
///
/// Returns `None` when `ident` is empty or names an unknown key.
pub fn register_type(ident: impl Into<TypeIdent>, checks: Checks) -> Option<TypeKey> {
    TypeRegistry::global().register(ident, checks)
}
