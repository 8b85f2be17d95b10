//! Expression evaluator and validation entry points
//!
//! Dispatch order for one expression node:
//! 1. typed field, array or field map (compound expressions)
//! 2. bare registered type
//! 3. exact-value literal
//!
//! The first failure aborts the whole call. No partial result is returned.
//!
//! Evaluation is a pure function of (expression, data, options) plus the
//! registry snapshot; it never mutates either.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::checks::strict_equals;
use super::errors::{PathSegment, ValidationError, ValidationResult};
use super::filter::filter_null;
use super::registry::{TypeIdent, TypeRegistry};
use super::types::{
    is_default_empty, Expression, FieldType, Mode, TypedField, ValidatorOptions, RESERVED_KEYS,
};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Structural key of the value being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'k> {
    Root,
    Field(&'k str),
    Index(usize),
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Root => write!(f, "value"),
            Key::Field(name) => write!(f, "{}", name),
            Key::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Recursive-descent evaluator bound to one validation call
pub struct Evaluator<'a> {
    registry: &'a TypeRegistry,
    options: ValidatorOptions,
    origin: &'a Value,
}

impl<'a> Evaluator<'a> {
    /// `origin` is the root input, handed to every check.
    pub fn new(registry: &'a TypeRegistry, options: ValidatorOptions, origin: &'a Value) -> Self {
        Self {
            registry,
            options,
            origin,
        }
    }

    /// Evaluates `expr` against `data`. `None` data means absent; an
    /// `Ok(None)` result means the value produces no output.
    pub fn evaluate(
        &self,
        expr: &Expression,
        data: Option<&Value>,
        key: Key<'_>,
    ) -> ValidationResult<Option<Value>> {
        match expr {
            Expression::Field(field) => self.typed_field(field, data, key),
            Expression::Array(items) => self.array(items, data),
            Expression::Object(fields) => self.object(fields, data),
            Expression::Type(ident) => self.bare_type(ident, data),
            Expression::Literal(expected) => match data {
                Some(value) if strict_equals(value, expected) => Ok(Some(value.clone())),
                _ => Err(ValidationError::literal_mismatch(expected)),
            },
        }
    }

    fn bare_type(
        &self,
        ident: &TypeIdent,
        data: Option<&Value>,
    ) -> ValidationResult<Option<Value>> {
        let ty = self
            .registry
            .resolve(ident)
            .ok_or_else(|| ValidationError::unsupported_type("value", &ident.to_string()))?;

        let value = match data {
            Some(value) if !is_default_empty(Some(value)) => value,
            _ if self.options.mode == Mode::Strict => {
                return Err(ValidationError::forbidden_empty())
            }
            _ => return Ok(None),
        };

        ty.coerce(value.clone(), self.origin)
            .map(Some)
            .map_err(|e| ValidationError::new(e.kind(), format!("value {}", e.message())))
    }

    fn object(
        &self,
        fields: &[(String, Expression)],
        data: Option<&Value>,
    ) -> ValidationResult<Option<Value>> {
        let map = match data {
            Some(Value::Object(map)) => map,
            _ if self.skips_empty_structure(data) => return Ok(None),
            _ => return Err(ValidationError::not_an_object()),
        };

        let mut out = Map::new();
        for (name, sub) in fields {
            let value = self
                .evaluate(sub, map.get(name), Key::Field(name))
                .map_err(|e| e.within(PathSegment::Field(name.clone())))?;
            if let Some(value) = value {
                out.insert(name.clone(), value);
            }
        }

        Ok(Some(Value::Object(out)))
    }

    fn array(&self, items: &[Expression], data: Option<&Value>) -> ValidationResult<Option<Value>> {
        let elements = match data {
            Some(Value::Array(elements)) => elements,
            _ if self.skips_empty_structure(data) => return Ok(None),
            _ => return Err(ValidationError::not_an_array()),
        };

        let mut out = Vec::new();

        if let [wildcard] = items {
            for (index, element) in elements.iter().enumerate() {
                let value = self
                    .evaluate(wildcard, Some(element), Key::Index(index))
                    .map_err(|e| e.within(PathSegment::Index(index)))?;
                out.extend(value);
            }
        } else {
            // One output slot per expression; slots without data hold null
            for (index, sub) in items.iter().enumerate() {
                let value = self
                    .evaluate(sub, elements.get(index), Key::Index(index))
                    .map_err(|e| e.within(PathSegment::Index(index)))?;
                out.push(value.unwrap_or(Value::Null));
            }

            if self.options.reject_extra_elements && elements.len() > items.len() {
                return Err(ValidationError::unexpected_element()
                    .within(PathSegment::Index(items.len())));
            }
        }

        Ok(Some(Value::Array(out)))
    }

    fn typed_field(
        &self,
        field: &TypedField,
        data: Option<&Value>,
        key: Key<'_>,
    ) -> ValidationResult<Option<Value>> {
        let value = match data {
            Some(value) if !field.is_empty(Some(value)) => value,
            _ => match self.empty_field(field)? {
                Some(default) => default,
                None => return Ok(None),
            },
        };

        let ident = match &field.ty {
            FieldType::Shape(expr) => return self.evaluate(expr, Some(value), key),
            FieldType::Registered(ident) => ident,
        };

        let ty = self.registry.resolve(ident).ok_or_else(|| {
            let label = field.name.clone().unwrap_or_else(|| key.to_string());
            ValidationError::unsupported_type(&label, &ident.to_string())
        })?;

        let mut current = ty.coerce(value.clone(), self.origin)?;
        for (name, option) in &field.checks {
            if RESERVED_KEYS.contains(&name.as_str()) {
                continue;
            }
            if let Some(check) = ty.check(name) {
                current = check(current, option, self.origin)?;
            }
        }

        Ok(Some(current))
    }

    /// Empty-value policy for typed fields, in priority order:
    /// default, `allowNull: false`, `allowNull: true`, strict mode, omit.
    fn empty_field<'f>(&self, field: &'f TypedField) -> ValidationResult<Option<&'f Value>> {
        if let Some(default) = field.default.as_ref().filter(|d| !d.is_null()) {
            return Ok(Some(default));
        }
        match field.allow_null {
            Some(false) => Err(ValidationError::forbidden_empty()),
            Some(true) => Ok(None),
            None if self.options.mode == Mode::Strict => Err(ValidationError::forbidden_empty()),
            None => Ok(None),
        }
    }

    fn skips_empty_structure(&self, data: Option<&Value>) -> bool {
        self.options.mode == Mode::Loose && is_default_empty(data)
    }
}

/// A computed or literal field appended to a successful result
#[derive(Clone)]
pub enum ExtendValue {
    Literal(Value),
    Computed(Arc<dyn Fn(&Value) -> Value + Send + Sync>),
}

impl fmt::Debug for ExtendValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtendValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            ExtendValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Post-validation data extension
#[derive(Debug, Clone, Default)]
pub struct Extend {
    entries: Vec<(String, ExtendValue)>,
}

impl Extend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries
            .push((name.into(), ExtendValue::Literal(value.into())));
        self
    }

    /// Adds a field computed from the validated data (including fields
    /// appended by earlier entries)
    pub fn computed<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.entries
            .push((name.into(), ExtendValue::Computed(Arc::new(f))));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends every entry to `root` in order. Non-object roots are left
    /// untouched.
    pub fn apply(&self, root: &mut Value) {
        for (name, entry) in &self.entries {
            let value = match entry {
                ExtendValue::Literal(value) => value.clone(),
                ExtendValue::Computed(f) => f(root),
            };
            if let Value::Object(map) = root {
                map.insert(name.clone(), value);
            }
        }
    }
}

/// Validation entry point bound to a registry
#[derive(Debug, Clone)]
pub struct Validator {
    registry: Arc<TypeRegistry>,
}

impl Validator {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// Validator backed by the process-scope registry
    pub fn global() -> Self {
        Self::new(Arc::clone(TypeRegistry::global()))
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn validate(&self, expr: &Expression, data: &Value) -> ValidationResult {
        self.verify(expr, Some(data), &Extend::new(), ValidatorOptions::default())
    }

    pub fn validate_strict(&self, expr: &Expression, data: &Value) -> ValidationResult {
        self.verify(
            expr,
            Some(data),
            &Extend::new(),
            ValidatorOptions::with_mode(Mode::Strict),
        )
    }

    pub fn validate_loose(&self, expr: &Expression, data: &Value) -> ValidationResult {
        self.verify(
            expr,
            Some(data),
            &Extend::new(),
            ValidatorOptions::with_mode(Mode::Loose),
        )
    }

    /// Runs the evaluator over the root, then applies `extend` and null
    /// filtering on success.
    pub fn verify(
        &self,
        expr: &Expression,
        data: Option<&Value>,
        extend: &Extend,
        options: ValidatorOptions,
    ) -> ValidationResult {
        let origin = data.unwrap_or(&Value::Null);
        let evaluator = Evaluator::new(&self.registry, options, origin);

        let produced = match evaluator.evaluate(expr, data, Key::Root) {
            Ok(produced) => produced,
            Err(err) => {
                if Logger::enabled(Severity::Trace) {
                    let path = err.path().to_string();
                    log_event_with_fields(
                        Event::ValidationFailed,
                        &[
                            ("code", err.code()),
                            ("mode", options.mode.as_str()),
                            ("path", path.as_str()),
                        ],
                    );
                }
                return Err(err);
            }
        };

        let mut root = match (produced, expr) {
            (Some(value), _) => value,
            (None, Expression::Object(_)) => Value::Object(Map::new()),
            (None, _) => Value::Null,
        };

        extend.apply(&mut root);
        filter_null(&mut root);

        if Logger::enabled(Severity::Trace) {
            log_event_with_fields(
                Event::ValidationSucceeded,
                &[("mode", options.mode.as_str())],
            );
        }

        Ok(root)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::global()
    }
}

/// A compiled, reusable expression with its extension set
#[derive(Debug, Clone)]
pub struct Schema {
    expression: Arc<Expression>,
    extend: Extend,
    validator: Validator,
}

impl Schema {
    /// Schema bound to the process-scope registry
    pub fn new(expression: Expression) -> Self {
        Self::with_validator(expression, Validator::global())
    }

    pub fn with_validator(expression: Expression, validator: Validator) -> Self {
        Self {
            expression: Arc::new(expression),
            extend: Extend::new(),
            validator,
        }
    }

    pub fn extend(mut self, extend: Extend) -> Self {
        self.extend = extend;
        self
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn verify(&self, data: &Value) -> ValidationResult {
        self.run(data, Mode::Default)
    }

    pub fn strict_verify(&self, data: &Value) -> ValidationResult {
        self.run(data, Mode::Strict)
    }

    pub fn loose_verify(&self, data: &Value) -> ValidationResult {
        self.run(data, Mode::Loose)
    }

    /// Verifies with explicit options
    pub fn verify_with(&self, data: &Value, options: ValidatorOptions) -> ValidationResult {
        self.validator
            .verify(&self.expression, Some(data), &self.extend, options)
    }

    fn run(&self, data: &Value, mode: Mode) -> ValidationResult {
        self.verify_with(data, ValidatorOptions::with_mode(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::errors::{CheckError, ErrorKind};
    use crate::schema::registry::{builtin, Checks};
    use serde_json::json;

    fn validator() -> Validator {
        Validator::new(Arc::new(TypeRegistry::with_builtins()))
    }

    fn typed(key: crate::schema::registry::TypeKey) -> TypedField {
        TypedField::new(key)
    }

    #[test]
    fn test_literal_match() {
        let v = validator();
        let expr = Expression::literal("on");
        assert_eq!(v.validate(&expr, &json!("on")).unwrap(), json!("on"));

        let err = v.validate(&expr, &json!("off")).unwrap_err();
        assert_eq!(err.to_string(), "value must equal \"on\"");
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_bare_type_coerces() {
        let v = validator();
        let expr = Expression::object([("n", Expression::ty(builtin::NUMBER))]);
        assert_eq!(v.validate(&expr, &json!({"n": "12"})).unwrap(), json!({"n": 12}));

        let err = v.validate(&expr, &json!({"n": "x"})).unwrap_err();
        assert_eq!(err.to_string(), "n: value must be a number");
    }

    #[test]
    fn test_bare_type_empty_handling() {
        let v = validator();
        let expr = Expression::object([("n", Expression::ty(builtin::NUMBER))]);

        assert_eq!(v.validate(&expr, &json!({"n": null})).unwrap(), json!({}));
        assert_eq!(v.validate_loose(&expr, &json!({})).unwrap(), json!({}));

        let err = v.validate_strict(&expr, &json!({"n": ""})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ForbiddenEmpty);
        assert_eq!(err.to_string(), "n: value not allowed to be empty");
    }

    #[test]
    fn test_object_requires_object_data() {
        let v = validator();
        let expr = Expression::object([(
            "c",
            Expression::object([("d", Expression::ty(builtin::NUMBER))]),
        )]);

        let err = v.validate(&expr, &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "c: value must be an object");

        let err = v.validate(&expr, &json!({"c": [1]})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);

        assert_eq!(v.validate_loose(&expr, &json!({"c": null})).unwrap(), json!({}));
    }

    #[test]
    fn test_object_preserves_expression_order_and_drops_unknown_keys() {
        let v = validator();
        let expr = Expression::object([
            ("z", Expression::ty(builtin::ANY)),
            ("a", Expression::ty(builtin::ANY)),
        ]);

        let out = v
            .validate(&expr, &json!({"a": 1, "extra": true, "z": 2}))
            .unwrap();
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_nested_error_path() {
        let v = validator();
        let expr = Expression::object([(
            "c",
            Expression::object([(
                "list",
                Expression::array([Expression::object([(
                    "id",
                    Expression::ty(builtin::INTEGER),
                )])]),
            )]),
        )]);

        let err = v
            .validate(&expr, &json!({"c": {"list": [{"id": 1}, {"id": "x"}]}}))
            .unwrap_err();
        assert_eq!(err.path().to_string(), "c.list[1].id");
        assert_eq!(err.message(), "value must be an integer");
    }

    #[test]
    fn test_wildcard_array() {
        let v = validator();
        let expr = Expression::array([Expression::ty(builtin::STRING)]);

        assert_eq!(v.validate(&expr, &json!([])).unwrap(), json!([]));
        assert_eq!(v.validate(&expr, &json!(["x", "y"])).unwrap(), json!(["x", "y"]));

        let err = v.validate(&expr, &json!(["x", 1])).unwrap_err();
        assert_eq!(err.to_string(), "[1]: value must be a string");

        let err = v.validate(&expr, &json!("x")).unwrap_err();
        assert_eq!(err.to_string(), "value must be an array");
    }

    #[test]
    fn test_positional_array() {
        let v = validator();
        let expr = Expression::array([
            Expression::ty(builtin::STRING),
            Expression::ty(builtin::NUMBER),
        ]);

        assert_eq!(v.validate(&expr, &json!(["a"])).unwrap(), json!(["a", null]));
        assert_eq!(
            v.validate(&expr, &json!(["a", "2", "ignored"])).unwrap(),
            json!(["a", 2])
        );

        let err = v.validate(&expr, &json!([1])).unwrap_err();
        assert_eq!(err.path().to_string(), "[0]");
    }

    #[test]
    fn test_positional_output_keeps_every_slot() {
        let v = validator();
        let expr = Expression::array([
            Expression::ty(builtin::NUMBER),
            Expression::ty(builtin::STRING),
        ]);

        let out = v.validate(&expr, &json!([null, "x"])).unwrap();
        assert_eq!(out, json!([null, "x"]));
        assert_eq!(v.validate(&expr, &out).unwrap(), out);

        assert_eq!(v.validate(&expr, &json!([])).unwrap(), json!([null, null]));
    }

    #[test]
    fn test_positional_array_rejects_extra_when_asked() {
        let v = validator();
        let expr = Expression::array([
            Expression::ty(builtin::STRING),
            Expression::ty(builtin::NUMBER),
        ]);
        let options = ValidatorOptions {
            reject_extra_elements: true,
            ..Default::default()
        };

        let err = v
            .verify(&expr, Some(&json!(["a", 1, 2])), &Extend::new(), options)
            .unwrap_err();
        assert_eq!(err.to_string(), "[2]: unexpected element");

        assert!(v
            .verify(&expr, Some(&json!(["a", 1])), &Extend::new(), options)
            .is_ok());
    }

    #[test]
    fn test_typed_field_priorities() {
        let v = validator();

        let with_default = Expression::object([(
            "a",
            typed(builtin::STRING).default("x").allow_null(false).into(),
        )]);
        assert_eq!(v.validate_strict(&with_default, &json!({})).unwrap(), json!({"a": "x"}));

        let forbid = Expression::object([("a", typed(builtin::STRING).allow_null(false).into())]);
        let err = v.validate_loose(&forbid, &json!({"a": ""})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ForbiddenEmpty);

        let permit = Expression::object([("a", typed(builtin::STRING).allow_null(true).into())]);
        assert_eq!(v.validate_strict(&permit, &json!({"a": null})).unwrap(), json!({}));

        let plain = Expression::object([("a", typed(builtin::STRING).into())]);
        assert!(v.validate_strict(&plain, &json!({})).is_err());
        assert_eq!(v.validate(&plain, &json!({})).unwrap(), json!({}));
    }

    #[test]
    fn test_default_goes_through_checks() {
        let v = validator();
        let expr = Expression::object([(
            "n",
            typed(builtin::NUMBER).default("7").check("max", 5).into(),
        )]);
        let err = v.validate(&expr, &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "n: must be at most 5");
    }

    #[test]
    fn test_checks_run_in_declaration_order() {
        let v = validator();
        let expr = Expression::object([(
            "s",
            typed(builtin::STRING)
                .check("trim", true)
                .check("minLength", 3)
                .into(),
        )]);
        let err = v.validate(&expr, &json!({"s": "  ab  "})).unwrap_err();
        assert_eq!(err.to_string(), "s: length must be at least 3");

        let expr = Expression::object([(
            "s",
            typed(builtin::STRING)
                .check("minLength", 3)
                .check("trim", true)
                .into(),
        )]);
        assert_eq!(v.validate(&expr, &json!({"s": "  ab  "})).unwrap(), json!({"s": "ab"}));
    }

    #[test]
    fn test_unknown_type_reports_alias() {
        let v = validator();
        let expr = Expression::object([("a", TypedField::new("Missing").into())]);
        let err = v.validate(&expr, &json!({"a": 1})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "a: a configuration error, unsupported type Missing");

        let expr = Expression::object([("a", TypedField::new("Missing").name("Age").into())]);
        let err = v.validate(&expr, &json!({"a": 1})).unwrap_err();
        assert!(err.message().starts_with("Age configuration error"));
    }

    #[test]
    fn test_unknown_check_options_ignored() {
        let v = validator();
        let expr = Expression::object([(
            "a",
            typed(builtin::BOOLEAN).check("label", "Enabled").into(),
        )]);
        assert_eq!(v.validate(&expr, &json!({"a": "true"})).unwrap(), json!({"a": true}));
    }

    #[test]
    fn test_typed_field_with_shape() {
        let v = validator();
        let expr = Expression::object([(
            "tags",
            TypedField::shape(Expression::array([Expression::ty(builtin::STRING)]))
                .allow_null(false)
                .into(),
        )]);

        assert_eq!(
            v.validate(&expr, &json!({"tags": ["a"]})).unwrap(),
            json!({"tags": ["a"]})
        );
        let err = v.validate(&expr, &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "tags: value not allowed to be empty");
        let err = v.validate(&expr, &json!({"tags": [3]})).unwrap_err();
        assert_eq!(err.to_string(), "tags[0]: value must be a string");
    }

    #[test]
    fn test_checks_receive_origin() {
        let registry = Arc::new(TypeRegistry::with_builtins());
        registry.register(
            "Confirm",
            Checks::new().with("same", |data, option, origin| {
                let other = option.as_str().and_then(|k| origin.get(k));
                if other == Some(&data) {
                    Ok(data)
                } else {
                    Err(CheckError::new("must match"))
                }
            }),
        );
        let v = Validator::new(registry);
        let expr = Expression::object([
            ("password", Expression::ty(builtin::STRING)),
            ("confirm", TypedField::new("Confirm").check("same", "password").into()),
        ]);

        assert!(v.validate(&expr, &json!({"password": "pw", "confirm": "pw"})).is_ok());
        let err = v
            .validate(&expr, &json!({"password": "pw", "confirm": "px"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "confirm: must match");
    }

    #[test]
    fn test_extend_and_null_filtering() {
        let v = validator();
        let expr = Expression::object([
            ("first", Expression::ty(builtin::STRING)),
            ("last", Expression::ty(builtin::STRING)),
        ]);
        let extend = Extend::new()
            .literal("source", "api")
            .literal("dropped", Value::Null)
            .computed("full", |data| {
                let first = data["first"].as_str().unwrap_or_default();
                let last = data["last"].as_str().unwrap_or_default();
                json!(format!("{} {}", first, last))
            });

        let out = v
            .verify(
                &expr,
                Some(&json!({"first": "Ada", "last": "Lovelace"})),
                &extend,
                ValidatorOptions::default(),
            )
            .unwrap();
        assert_eq!(
            out,
            json!({"first": "Ada", "last": "Lovelace", "source": "api", "full": "Ada Lovelace"})
        );
    }

    #[test]
    fn test_extend_not_applied_on_failure() {
        let v = validator();
        let expr = Expression::object([("n", typed(builtin::NUMBER).allow_null(false).into())]);
        let extend = Extend::new().literal("x", 1);
        assert!(v
            .verify(&expr, Some(&json!({})), &extend, ValidatorOptions::default())
            .is_err());
    }

    #[test]
    fn test_schema_reuse() {
        let v = validator();
        let schema = Schema::with_validator(
            Expression::object([("a", typed(builtin::NUMBER).into())]),
            v,
        )
        .extend(Extend::new().literal("ok", true));

        assert_eq!(schema.verify(&json!({})).unwrap(), json!({"ok": true}));
        assert!(schema.strict_verify(&json!({})).is_err());
        assert_eq!(schema.loose_verify(&json!({"a": "3"})).unwrap(), json!({"a": 3, "ok": true}));
    }

    #[test]
    fn test_loose_root_absent() {
        let v = validator();
        let expr = Expression::object([("a", Expression::ty(builtin::STRING))]);
        assert_eq!(v.validate_loose(&expr, &Value::Null).unwrap(), json!({}));
        assert!(v.validate(&expr, &Value::Null).is_err());
    }
}
