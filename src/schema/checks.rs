//! Built-in check library
//!
//! Every check follows the registry contract: it receives the current
//! data, the option value from the typed field and the root input, and
//! returns the (possibly coerced) data or a `CheckError`.

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use regex::Regex;
use serde_json::{Number, Value};

use super::errors::CheckError;
use super::registry::{builtin, Checks, TypeRegistry, TYPE_CHECK};

/// Installs the built-in types under their reserved keys
pub fn install_builtins(registry: &TypeRegistry) {
    registry.define(builtin::STRING, "String", string_checks());
    registry.define(builtin::NUMBER, "Number", number_checks());
    registry.define(builtin::INTEGER, "Integer", integer_checks());
    registry.define(builtin::BOOLEAN, "Boolean", boolean_checks());
    registry.define(builtin::DATE, "Date", date_checks());
    registry.define(builtin::OBJECT, "Object", object_checks());
    registry.define(builtin::ARRAY, "Array", array_checks());
    registry.define(builtin::ANY, "Any", common());
}

/// Baseline bundle every extension-created type starts from
pub fn common() -> Checks {
    Checks::new()
        .with(TYPE_CHECK, |data, _, _| Ok(data))
        .with("enum", check_enum)
        .with("value", check_value)
}

fn string_checks() -> Checks {
    common()
        .with(TYPE_CHECK, |data, _, _| match data {
            Value::String(_) => Ok(data),
            _ => Err(CheckError::new("must be a string")),
        })
        .with("minLength", |data, option, _| {
            let min = option_usize("minLength", option)?;
            if char_len(&data) < min {
                return Err(CheckError::new(format!(
                    "length must be at least {}",
                    min
                )));
            }
            Ok(data)
        })
        .with("maxLength", |data, option, _| {
            let max = option_usize("maxLength", option)?;
            if char_len(&data) > max {
                return Err(CheckError::new(format!("length must be at most {}", max)));
            }
            Ok(data)
        })
        .with("reg", |data, option, _| {
            let pattern = option
                .as_str()
                .ok_or_else(|| CheckError::bad_option("reg", "expected a pattern string"))?;
            let re = compiled_pattern(pattern).map_err(|e| CheckError::bad_option("reg", e))?;
            match data.as_str() {
                Some(s) if re.is_match(s) => Ok(data),
                _ => Err(CheckError::new(format!("must match pattern {}", pattern))),
            }
        })
        .with("trim", |data, option, _| {
            let enabled = option
                .as_bool()
                .ok_or_else(|| CheckError::bad_option("trim", "expected a boolean"))?;
            match data {
                Value::String(s) if enabled => Ok(Value::String(s.trim().to_string())),
                other => Ok(other),
            }
        })
}

/// `reg` patterns compiled so far, keyed by their source
fn pattern_cache() -> &'static RwLock<HashMap<String, Regex>> {
    static CACHE: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

fn compiled_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let cache = pattern_cache();
    if let Some(re) = cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(pattern)
    {
        return Ok(re.clone());
    }

    // Invalid patterns are not cached; they fail again on the next call
    let re = Regex::new(pattern)?;
    cache
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(pattern.to_string(), re.clone());
    Ok(re)
}

fn number_checks() -> Checks {
    common()
        .with(TYPE_CHECK, |data, _, _| match data {
            Value::Number(_) => Ok(data),
            Value::String(ref s) => parse_number(s.trim())
                .ok_or_else(|| CheckError::new("must be a number")),
            _ => Err(CheckError::new("must be a number")),
        })
        .with("min", check_min)
        .with("max", check_max)
}

fn integer_checks() -> Checks {
    common()
        .with(TYPE_CHECK, |data, _, _| {
            let coerced = match &data {
                Value::Number(n) if n.is_i64() || n.is_u64() => Some(data.clone()),
                Value::Number(n) => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| Value::from(f as i64)),
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
                _ => None,
            };
            coerced.ok_or_else(|| CheckError::new("must be an integer"))
        })
        .with("min", check_min)
        .with("max", check_max)
}

fn boolean_checks() -> Checks {
    common().with(TYPE_CHECK, |data, _, _| match data {
        Value::Bool(_) => Ok(data),
        Value::String(ref s) if s == "true" => Ok(Value::Bool(true)),
        Value::String(ref s) if s == "false" => Ok(Value::Bool(false)),
        _ => Err(CheckError::new("must be a boolean")),
    })
}

fn date_checks() -> Checks {
    Checks::new()
        .with(TYPE_CHECK, |data, _, _| {
            let date = data
                .as_str()
                .and_then(parse_date)
                .ok_or_else(|| CheckError::new("must be a date"))?;
            Ok(Value::String(date.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
        })
        .with("min", |data, option, _| {
            let (date, bound) = date_and_bound("min", &data, option)?;
            if date < bound {
                return Err(CheckError::new(format!(
                    "must not be earlier than {}",
                    option_display(option)
                )));
            }
            Ok(data)
        })
        .with("max", |data, option, _| {
            let (date, bound) = date_and_bound("max", &data, option)?;
            if date > bound {
                return Err(CheckError::new(format!(
                    "must not be later than {}",
                    option_display(option)
                )));
            }
            Ok(data)
        })
}

fn object_checks() -> Checks {
    Checks::new().with(TYPE_CHECK, |data, _, _| match data {
        Value::Object(_) => Ok(data),
        _ => Err(CheckError::new("must be an object")),
    })
}

fn array_checks() -> Checks {
    Checks::new()
        .with(TYPE_CHECK, |data, _, _| match data {
            Value::Array(_) => Ok(data),
            _ => Err(CheckError::new("must be an array")),
        })
        .with("minLength", |data, option, _| {
            let min = option_usize("minLength", option)?;
            if data.as_array().map_or(0, Vec::len) < min {
                return Err(CheckError::new(format!(
                    "must contain at least {} elements",
                    min
                )));
            }
            Ok(data)
        })
        .with("maxLength", |data, option, _| {
            let max = option_usize("maxLength", option)?;
            if data.as_array().map_or(0, Vec::len) > max {
                return Err(CheckError::new(format!(
                    "must contain at most {} elements",
                    max
                )));
            }
            Ok(data)
        })
}

fn check_enum(data: Value, option: &Value, _origin: &Value) -> Result<Value, CheckError> {
    let allowed = option
        .as_array()
        .ok_or_else(|| CheckError::bad_option("enum", "expected an array"))?;
    if allowed.iter().any(|candidate| strict_equals(candidate, &data)) {
        Ok(data)
    } else {
        Err(CheckError::new(format!("must be one of {}", option)))
    }
}

fn check_value(data: Value, option: &Value, _origin: &Value) -> Result<Value, CheckError> {
    if strict_equals(option, &data) {
        Ok(data)
    } else {
        Err(CheckError::new(format!("must equal {}", option)))
    }
}

fn check_min(data: Value, option: &Value, _origin: &Value) -> Result<Value, CheckError> {
    let min = option
        .as_f64()
        .ok_or_else(|| CheckError::bad_option("min", "expected a number"))?;
    match data.as_f64() {
        Some(n) if n >= min => Ok(data),
        _ => Err(CheckError::new(format!("must be at least {}", option))),
    }
}

fn check_max(data: Value, option: &Value, _origin: &Value) -> Result<Value, CheckError> {
    let max = option
        .as_f64()
        .ok_or_else(|| CheckError::bad_option("max", "expected a number"))?;
    match data.as_f64() {
        Some(n) if n <= max => Ok(data),
        _ => Err(CheckError::new(format!("must be at most {}", option))),
    }
}

/// Identity comparison used by exact-value expressions, `enum` and `value`.
///
/// Numbers compare by value so `1` and `1.0` are the same number.
pub(crate) fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Parses a numeric string, keeping integers integral
fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    let f = s.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date);
    }
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(day.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset())
}

fn date_and_bound(
    check: &str,
    data: &Value,
    option: &Value,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), CheckError> {
    let bound = option
        .as_str()
        .and_then(parse_date)
        .ok_or_else(|| CheckError::bad_option(check, "expected a date string"))?;
    let date = data
        .as_str()
        .and_then(parse_date)
        .ok_or_else(|| CheckError::new("must be a date"))?;
    Ok((date, bound))
}

fn option_usize(check: &str, option: &Value) -> Result<usize, CheckError> {
    option
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| CheckError::bad_option(check, "expected a non-negative integer"))
}

fn option_display(option: &Value) -> String {
    match option {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn char_len(data: &Value) -> usize {
    data.as_str().map_or(0, |s| s.chars().count())
}
