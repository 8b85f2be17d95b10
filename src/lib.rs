//! typea - runtime validation and coercion of untyped JSON data
//!
//! Expressions describe the expected shape of a value; validating data
//! against one yields a cleaned, coerced copy or a path-qualified error.

pub mod cli;
pub mod observability;
pub mod schema;

/// Handles of the built-in types (`types::STRING`, `types::NUMBER`, ...)
pub use schema::builtin as types;
pub use schema::{
    register_type, validate, validate_loose, validate_strict, Checks, Expression, Extend, Mode,
    Schema, TypedField, ValidationError, ValidationResult, Validator, ValidatorOptions,
};
