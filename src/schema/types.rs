//! Expression tree and validator options
//!
//! Expressions are built once and reused across many validation calls:
//! - `Literal`: exact-value match
//! - `Type`: bare reference to a registered type
//! - `Field`: typed-field expression (type + checks + empty handling)
//! - `Object`: field map, declaration order preserved
//! - `Array`: one element = wildcard, otherwise positional

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::registry::TypeIdent;

/// Reserved typed-field keys that never dispatch as checks
pub const RESERVED_KEYS: [&str; 5] = ["type", "default", "allowNull", "ignore", "name"];

/// Validation mode. Only changes how empty values without an explicit
/// `allowNull` are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Empty fields are omitted, empty nested structures are shape errors
    #[default]
    Default,
    /// Every empty field fails unless `allowNull`/`default` says otherwise
    Strict,
    /// Empty nested structures are accepted outright
    Loose,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Default => "default",
            Mode::Strict => "strict",
            Mode::Loose => "loose",
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Mode::Default),
            "strict" => Ok(Mode::Strict),
            "loose" => Ok(Mode::Loose),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Options threaded through one validation call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Emptiness policy
    pub mode: Mode,
    /// Fail positional arrays whose data is longer than the expression
    pub reject_extra_elements: bool,
}

impl ValidatorOptions {
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }
}

/// Schema fragment describing the expected shape of a data value
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Matches only an identical value
    Literal(Value),
    /// Bare registered type, coerced through its `type` check
    Type(TypeIdent),
    /// Typed-field expression
    Field(Box<TypedField>),
    /// Field map
    Object(Vec<(String, Expression)>),
    /// Wildcard (one element) or positional array
    Array(Vec<Expression>),
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn ty(ident: impl Into<TypeIdent>) -> Self {
        Expression::Type(ident.into())
    }

    pub fn field(field: TypedField) -> Self {
        Expression::Field(Box::new(field))
    }

    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Expression)>,
    {
        Expression::Object(fields.into_iter().map(|(k, e)| (k.into(), e)).collect())
    }

    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Expression>,
    {
        Expression::Array(items.into_iter().collect())
    }

    /// Short name of the variant, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::Literal(_) => "literal",
            Expression::Type(_) => "type",
            Expression::Field(_) => "field",
            Expression::Object(_) => "object",
            Expression::Array(_) => "array",
        }
    }
}

impl From<TypedField> for Expression {
    fn from(field: TypedField) -> Self {
        Expression::field(field)
    }
}

/// What a typed field's `type` key points at
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// A registered type
    Registered(TypeIdent),
    /// A nested object or array structure
    Shape(Box<Expression>),
}

/// Typed-field expression: `{ type, <checks...>, default, allowNull, ignore, name }`
#[derive(Debug, Clone, PartialEq)]
pub struct TypedField {
    pub ty: FieldType,
    /// Check options in declaration order
    pub checks: Vec<(String, Value)>,
    /// Substituted when the input is empty
    pub default: Option<Value>,
    /// `Some(false)` forbids empty input, `Some(true)` permits it, `None`
    /// defers to the mode
    pub allow_null: Option<bool>,
    /// Replaces the default empty set `{null, ""}` for this field
    pub ignore: Option<Vec<Value>>,
    /// Alias used in configuration errors
    pub name: Option<String>,
}

impl TypedField {
    pub fn new(ident: impl Into<TypeIdent>) -> Self {
        Self::with_type(FieldType::Registered(ident.into()))
    }

    /// Typed field wrapping a nested structure
    pub fn shape(expr: Expression) -> Self {
        Self::with_type(FieldType::Shape(Box::new(expr)))
    }

    fn with_type(ty: FieldType) -> Self {
        Self {
            ty,
            checks: Vec::new(),
            default: None,
            allow_null: None,
            ignore: None,
            name: None,
        }
    }

    /// Adds a check option. Later options with the same name replace
    /// earlier ones in place.
    pub fn check(mut self, name: impl Into<String>, option: impl Into<Value>) -> Self {
        let name = name.into();
        let option = option.into();
        match self.checks.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = option,
            None => self.checks.push((name, option)),
        }
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn allow_null(mut self, allow: bool) -> Self {
        self.allow_null = Some(allow);
        self
    }

    pub fn ignore<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.ignore = Some(values.into_iter().collect());
        self
    }

    pub fn name(mut self, alias: impl Into<String>) -> Self {
        self.name = Some(alias.into());
        self
    }

    /// Whether `data` counts as empty for this field.
    ///
    /// Absence is always empty; a custom `ignore` list replaces the
    /// default `{null, ""}` set for present values.
    pub fn is_empty(&self, data: Option<&Value>) -> bool {
        match (data, &self.ignore) {
            (None, _) => true,
            (Some(value), Some(ignore)) => ignore.contains(value),
            (Some(value), None) => is_default_empty(Some(value)),
        }
    }
}

/// Default empty set: absent, `null` and the empty string
pub fn is_default_empty(data: Option<&Value>) -> bool {
    match data {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
