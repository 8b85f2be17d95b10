//! Idempotence Property Tests
//!
//! Re-validating a successful output yields the output unchanged, in
//! every mode, for generated expressions and data.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::Value;
use typea::schema::{is_default_empty, Extend, TypeRegistry};
use typea::{types, Expression, Mode, TypedField, Validator, ValidatorOptions};

fn leaf_expression() -> impl Strategy<Value = Expression> {
    prop_oneof![
        Just(Expression::ty(types::STRING)),
        Just(Expression::ty(types::NUMBER)),
        Just(Expression::ty(types::INTEGER)),
        Just(Expression::ty(types::BOOLEAN)),
        Just(Expression::ty(types::OBJECT)),
        Just(Expression::ty(types::ANY)),
        Just(Expression::literal(1)),
        Just(TypedField::new(types::STRING).default("x").into()),
        Just(TypedField::new(types::NUMBER).check("min", 0).into()),
        Just(TypedField::new(types::INTEGER).allow_null(true).into()),
    ]
}

fn expression() -> impl Strategy<Value = Expression> {
    leaf_expression().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            // Wildcard arrays
            inner.clone().prop_map(|e| Expression::array([e])),
            // Positional arrays
            prop::collection::vec(inner.clone(), 2..4).prop_map(Expression::Array),
            // Field maps
            prop::collection::btree_map("[a-c]", inner, 0..4).prop_map(Expression::object),
        ]
    })
}

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        Just(Value::from("")),
        Just(Value::from("true")),
        any::<bool>().prop_map(Value::Bool),
        (-5i64..100).prop_map(Value::from),
        "[0-9]{1,3}".prop_map(Value::String),
        "[a-z]{1,6}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::btree_map("[a-c]", inner, 0..4).prop_map(|m| {
                let map: serde_json::Map<String, Value> = m.into_iter().collect();
                Value::Object(map)
            }),
        ]
    })
}

fn validator() -> Validator {
    Validator::new(Arc::new(TypeRegistry::with_builtins()))
}

proptest! {
    /// Successful output is a fixed point of validation.
    #[test]
    fn validation_is_idempotent(expr in expression(), data in json_value()) {
        // An empty loose root is accepted without evaluating its fields
        prop_assume!(!is_default_empty(Some(&data)));

        let validator = validator();
        for mode in [Mode::Default, Mode::Strict, Mode::Loose] {
            let options = ValidatorOptions::with_mode(mode);
            if let Ok(first) = validator.verify(&expr, Some(&data), &Extend::new(), options) {
                let second = validator
                    .verify(&expr, Some(&first), &Extend::new(), options)
                    .map_err(|e| TestCaseError::fail(format!("{:?}: {}", mode, e)))?;
                prop_assert_eq!(&second, &first);
            }
        }
    }

    /// Validation never panics, whatever the input.
    #[test]
    fn validation_never_panics(expr in expression(), data in json_value()) {
        let validator = validator();
        let _ = validator.validate(&expr, &data);
        let _ = validator.validate_strict(&expr, &data);
        let _ = validator.validate_loose(&expr, &data);
    }
}
