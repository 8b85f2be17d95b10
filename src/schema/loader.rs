//! Expression loader
//!
//! Turns JSON documents into expressions and keeps named expressions
//! loaded from disk.
//!
//! JSON dialect:
//! - object with a `"type"` key: typed field
//! - any other object: field map (key order preserved)
//! - array: wildcard (one element) or positional array
//! - `"$Name"`: bare reference to a registered type
//! - `"$$..."`: literal string starting with a single `$`
//! - everything else: literal

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::errors::{LoaderError, LoaderResult};
use super::registry::{TypeIdent, TypeRegistry};
use super::types::{Expression, FieldType, TypedField};
use crate::observability::{log_event_with_fields, Event};

const TYPE_SIGIL: char = '$';

/// Parses a JSON value into an expression.
pub fn parse_expression(value: &Value) -> LoaderResult<Expression> {
    parse_at(value, "value")
}

fn parse_at(value: &Value, at: &str) -> LoaderResult<Expression> {
    match value {
        Value::Object(map) if map.contains_key("type") => {
            parse_typed_field(map, at).map(Expression::field)
        }
        Value::Object(map) => {
            let mut fields = Vec::with_capacity(map.len());
            for (name, sub) in map {
                fields.push((name.clone(), parse_at(sub, &child(at, name))?));
            }
            Ok(Expression::Object(fields))
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, sub)| parse_at(sub, &format!("{}[{}]", at, i)))
            .collect::<LoaderResult<Vec<_>>>()
            .map(Expression::Array),
        Value::String(s) => Ok(parse_string(s)),
        other => Ok(Expression::Literal(other.clone())),
    }
}

fn parse_string(s: &str) -> Expression {
    match s.strip_prefix(TYPE_SIGIL) {
        Some(rest) if rest.starts_with(TYPE_SIGIL) => Expression::literal(rest),
        Some(name) if !name.is_empty() => Expression::ty(name),
        _ => Expression::literal(s),
    }
}

fn parse_typed_field(map: &Map<String, Value>, at: &str) -> LoaderResult<TypedField> {
    let mut field = match map.get("type") {
        Some(Value::String(name)) => {
            let name = name.strip_prefix(TYPE_SIGIL).unwrap_or(name);
            if name.is_empty() {
                return Err(LoaderError::malformed(at, "type name is empty"));
            }
            TypedField::new(name)
        }
        Some(shape @ (Value::Object(_) | Value::Array(_))) => {
            TypedField::shape(parse_at(shape, at)?)
        }
        _ => {
            return Err(LoaderError::malformed(
                at,
                "type must be a type name, an object or an array",
            ))
        }
    };

    for (key, option) in map {
        match key.as_str() {
            "type" => {}
            "default" => field.default = Some(option.clone()),
            "allowNull" => {
                let allow = option
                    .as_bool()
                    .ok_or_else(|| LoaderError::malformed(at, "allowNull must be a boolean"))?;
                field.allow_null = Some(allow);
            }
            "ignore" => {
                let values = option
                    .as_array()
                    .ok_or_else(|| LoaderError::malformed(at, "ignore must be an array"))?;
                field.ignore = Some(values.clone());
            }
            "name" => {
                let alias = option
                    .as_str()
                    .ok_or_else(|| LoaderError::malformed(at, "name must be a string"))?;
                field.name = Some(alias.to_string());
            }
            _ => field = field.check(key.as_str(), option.clone()),
        }
    }

    Ok(field)
}

fn child(at: &str, name: &str) -> String {
    if at == "value" {
        name.to_string()
    } else {
        format!("{}.{}", at, name)
    }
}

/// Names of types referenced by `expr` that `registry` cannot resolve,
/// sorted and deduplicated.
pub fn unknown_types(expr: &Expression, registry: &TypeRegistry) -> Vec<String> {
    let mut missing = Vec::new();
    collect_unknown(expr, registry, &mut missing);
    missing.sort();
    missing.dedup();
    missing
}

fn collect_unknown(expr: &Expression, registry: &TypeRegistry, out: &mut Vec<String>) {
    let check = |ident: &TypeIdent, out: &mut Vec<String>| {
        if registry.resolve(ident).is_none() {
            out.push(ident.to_string());
        }
    };

    match expr {
        Expression::Literal(_) => {}
        Expression::Type(ident) => check(ident, out),
        Expression::Field(field) => match &field.ty {
            FieldType::Registered(ident) => check(ident, out),
            FieldType::Shape(shape) => collect_unknown(shape, registry, out),
        },
        Expression::Object(fields) => {
            for (_, sub) in fields {
                collect_unknown(sub, registry, out);
            }
        }
        Expression::Array(items) => {
            for sub in items {
                collect_unknown(sub, registry, out);
            }
        }
    }
}

/// Reads expression files from a directory and keeps them by name.
///
/// An expression's name is its file stem: `user.json` is `user`.
pub struct ExpressionLoader {
    /// Directory containing expression files
    dir: PathBuf,
    /// Loaded expressions by name
    expressions: BTreeMap<String, Arc<Expression>>,
}

impl ExpressionLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            expressions: BTreeMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads every `*.json` file in the directory.
    ///
    /// A missing directory loads nothing. Any unreadable or malformed file
    /// fails the whole load.
    pub fn load_all(&mut self) -> LoaderResult<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&self.dir, e))?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        // Deterministic load order
        paths.sort();

        for path in &paths {
            self.load_file(path)?;
        }

        Ok(paths.len())
    }

    /// Loads a single file and registers it under its file stem.
    pub fn load_file(&mut self, path: &Path) -> LoaderResult<Arc<Expression>> {
        let expr = read_expression(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let display = path.display().to_string();
        log_event_with_fields(
            Event::ExpressionLoaded,
            &[("name", name.as_str()), ("path", display.as_str())],
        );

        self.register(name, expr)
    }

    /// Registers an expression directly. Names are write-once.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        expr: Expression,
    ) -> LoaderResult<Arc<Expression>> {
        let name = name.into();
        if self.expressions.contains_key(&name) {
            return Err(LoaderError::Duplicate(name));
        }
        let expr = Arc::new(expr);
        self.expressions.insert(name, Arc::clone(&expr));
        Ok(expr)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Expression>> {
        self.expressions.get(name).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.expressions.contains_key(name)
    }

    /// Loaded names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.expressions.keys().map(String::as_str)
    }

    pub fn count(&self) -> usize {
        self.expressions.len()
    }
}

/// Reads and parses one expression file.
pub fn read_expression(path: &Path) -> LoaderResult<Expression> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let value: Value = serde_json::from_str(&content).map_err(|source| LoaderError::Json {
        path: display.clone(),
        source,
    })?;

    parse_expression(&value).map_err(|e| match e {
        LoaderError::Malformed { at, reason } => {
            LoaderError::malformed(format!("{}:{}", display, at), reason)
        }
        other => other,
    })
}

fn io_error(path: &Path, source: std::io::Error) -> LoaderError {
    LoaderError::Io {
        path: path.display().to_string(),
        source,
    }
}
