//! JSON value to RDF term conversion

use crate::term::Term;
use fluree_vocab::{media_types, xsd};
use serde_json::{Number, Value};

/// Convert a matched JSON value to a term
///
/// | JSON      | Term                                            |
/// |-----------|-------------------------------------------------|
/// | object    | JSON-typed literal of the compact serialization |
/// | array     | JSON-typed literal of the compact serialization |
/// | string    | `xsd:string`                                    |
/// | integer   | `xsd:integer`                                   |
/// | number    | `xsd:double`                                    |
/// | boolean   | `xsd:boolean`                                   |
/// | null      | JSON-typed literal `null`                       |
pub fn value_to_term(value: &Value) -> Term {
    match value {
        Value::Object(_) => object_term(value),
        Value::Array(_) => array_term(value),
        Value::String(s) => string_term(s),
        Value::Number(n) => number_term(n),
        Value::Bool(b) => bool_term(*b),
        Value::Null => null_term(),
    }
}

fn json_literal(serialized: String) -> Term {
    Term::typed(serialized, media_types::APPLICATION_JSON_IRI)
}

fn object_term(object: &Value) -> Term {
    json_literal(object.to_string())
}

fn array_term(array: &Value) -> Term {
    json_literal(array.to_string())
}

fn string_term(s: &str) -> Term {
    Term::string(s)
}

/// The lexical form is the number exactly as written in the document
fn number_term(n: &Number) -> Term {
    let lexical = n.to_string();
    if is_integer_lexical(&lexical) {
        Term::typed(lexical, xsd::INTEGER)
    } else {
        Term::typed(lexical, xsd::DOUBLE)
    }
}

fn is_integer_lexical(lexical: &str) -> bool {
    let digits = lexical.strip_prefix('-').unwrap_or(lexical);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn bool_term(b: bool) -> Term {
    Term::boolean(b)
}

fn null_term() -> Term {
    json_literal("null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(value_to_term(&json!("x")), Term::string("x"));
        assert_eq!(value_to_term(&json!(42)), Term::integer(42));
        assert_eq!(
            value_to_term(&json!(u64::MAX)),
            Term::typed(u64::MAX.to_string(), xsd::INTEGER)
        );
        assert_eq!(value_to_term(&json!(1.5)), Term::typed("1.5", xsd::DOUBLE));
        assert_eq!(value_to_term(&json!(true)), Term::boolean(true));
    }

    #[test]
    fn test_structured_values_are_json_literals() {
        let term = value_to_term(&json!({"a": 1, "b": [true, null]}));
        assert_eq!(term.lexical(), Some(r#"{"a":1,"b":[true,null]}"#));
        assert_eq!(term.datatype(), Some(media_types::APPLICATION_JSON_IRI));
        assert!(term.is_document());

        let term = value_to_term(&json!([1, "x"]));
        assert_eq!(term.lexical(), Some(r#"[1,"x"]"#));

        let null = value_to_term(&Value::Null);
        assert_eq!(null.lexical(), Some("null"));
        assert_eq!(null.datatype(), Some(media_types::APPLICATION_JSON_IRI));
    }

    #[test]
    fn test_numbers_keep_their_lexical_form() {
        let big: Value = serde_json::from_str("12345678901234567890123").unwrap();
        assert_eq!(
            value_to_term(&big),
            Term::typed("12345678901234567890123", xsd::INTEGER)
        );

        let negative: Value = serde_json::from_str("-98765432109876543210").unwrap();
        assert_eq!(
            value_to_term(&negative),
            Term::typed("-98765432109876543210", xsd::INTEGER)
        );

        let precise: Value = serde_json::from_str("0.10000000000000000000001").unwrap();
        assert_eq!(
            value_to_term(&precise),
            Term::typed("0.10000000000000000000001", xsd::DOUBLE)
        );

        let exponent: Value = serde_json::from_str("1e400").unwrap();
        assert_eq!(value_to_term(&exponent).datatype(), Some(xsd::DOUBLE));
    }

    #[test]
    fn test_nested_numbers_are_exact() {
        let doc: Value =
            serde_json::from_str(r#"{"id":12345678901234567890123,"ratio":[0.10000000000000000000001]}"#)
                .unwrap();
        assert_eq!(
            value_to_term(&doc).lexical(),
            Some(r#"{"id":12345678901234567890123,"ratio":[0.10000000000000000000001]}"#)
        );
    }
}
