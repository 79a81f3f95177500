//! Single-pass streaming scan of a JSON document
//!
//! The document is deserialized with `DeserializeSeed` visitors that carry
//! the live path states of the node being read. Sub-trees with no live state
//! are skipped with `IgnoredAny`, and only matched values are materialized.

use super::path::{JsonPath, States, Step};
use crate::error::Result;
use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::io::{BufReader, Read};
use std::ops::ControlFlow;

/// How a scan ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanEnd {
    /// Whole document read
    Exhausted,
    /// The match callback asked to stop
    Stopped,
}

const STOPPED: &str = "scan stopped by consumer";

/// Map key under which serde_json (with `arbitrary_precision`) hands a
/// number to `deserialize_any`
const NUMBER_TOKEN: &str = "$serde_json::private::Number";

/// Scan `reader`, calling `on_match` for every match of `path` in document
/// pre-order
///
/// Returns `ScanEnd::Stopped` as soon as `on_match` breaks. Syntax errors,
/// trailing data and I/O errors are reported as `GenerateError::Json`.
pub(crate) fn scan<R: Read>(
    reader: R,
    path: &JsonPath,
    on_match: &mut dyn FnMut(Value) -> ControlFlow<()>,
) -> Result<ScanEnd> {
    let mut de = serde_json::Deserializer::from_reader(BufReader::new(reader));
    let mut scanner = Scanner {
        path,
        on_match,
        stopped: false,
    };
    let result = NodeSeed {
        scanner: &mut scanner,
        states: path.initial_states(),
    }
    .deserialize(&mut de);

    if scanner.stopped {
        return Ok(ScanEnd::Stopped);
    }
    result?;
    de.end()?;
    Ok(ScanEnd::Exhausted)
}

struct Scanner<'p, 'f> {
    path: &'p JsonPath,
    on_match: &'f mut dyn FnMut(Value) -> ControlFlow<()>,
    stopped: bool,
}

impl Scanner<'_, '_> {
    /// Report a matched value, then any matches nested inside it
    fn emit(&mut self, value: Value, states: &[usize]) -> ControlFlow<()> {
        let live = self.path.live(states);
        if live.is_empty() {
            return (self.on_match)(value);
        }
        (self.on_match)(value.clone())?;
        let on_match = &mut *self.on_match;
        self.path
            .walk(&value, &live, &mut |nested| on_match(nested.clone()))
    }

    fn stop<E: de::Error>(&mut self) -> E {
        self.stopped = true;
        E::custom(STOPPED)
    }
}

struct NodeSeed<'s, 'p, 'f> {
    scanner: &'s mut Scanner<'p, 'f>,
    states: States,
}

impl<'de> DeserializeSeed<'de> for NodeSeed<'_, '_, '_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        if self.states.is_empty() {
            IgnoredAny::deserialize(deserializer)?;
            return Ok(());
        }
        if self.scanner.path.is_match(&self.states) {
            let value = Value::deserialize(deserializer)?;
            return match self.scanner.emit(value, &self.states) {
                ControlFlow::Continue(()) => Ok(()),
                ControlFlow::Break(()) => Err(self.scanner.stop()),
            };
        }
        deserializer.deserialize_any(NodeVisitor {
            scanner: self.scanner,
            states: self.states,
        })
    }
}

/// Walks into a node that has live states but is not itself a match
struct NodeVisitor<'s, 'p, 'f> {
    scanner: &'s mut Scanner<'p, 'f>,
    states: States,
}

impl<'de> Visitor<'de> for NodeVisitor<'_, '_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, _v: i64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, _v: u64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, _v: f64) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_str<E: de::Error>(self, _v: &str) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        let path = self.scanner.path;
        while let Some(key) = map.next_key::<String>()? {
            if key == NUMBER_TOKEN {
                map.next_value::<IgnoredAny>()?;
                continue;
            }
            let states = path.advance(&self.states, Step::Field(&key));
            map.next_value_seed(NodeSeed {
                scanner: &mut *self.scanner,
                states,
            })?;
        }
        Ok(())
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        let path = self.scanner.path;
        let mut index = 0;
        loop {
            let states = path.advance(&self.states, Step::Index { index, len: None });
            let seed = NodeSeed {
                scanner: &mut *self.scanner,
                states,
            };
            if seq.next_element_seed(seed)?.is_none() {
                return Ok(());
            }
            index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerateError;
    use serde_json::json;

    fn scan_all(doc: &str, path: &str) -> Result<Vec<Value>> {
        let path = JsonPath::compile_streaming(path)?;
        let mut out = Vec::new();
        scan(doc.as_bytes(), &path, &mut |v| {
            out.push(v);
            ControlFlow::Continue(())
        })?;
        Ok(out)
    }

    #[test]
    fn test_scan_matches_in_memory_select() {
        let doc = r#"{"a":{"a":1,"b":{"a":2}},"c":[{"a":3},{"d":[{"a":4}]}]}"#;
        let value: Value = serde_json::from_str(doc).unwrap();
        for path in ["$", "$..a", "$.c[*]", "$.c[1].d[0].a", "$..*", "$.c[0:1]", "$['a','c']"] {
            let compiled = JsonPath::compile(path).unwrap();
            let expected: Vec<Value> = compiled.select(&value).into_iter().cloned().collect();
            assert_eq!(scan_all(doc, path).unwrap(), expected, "path {path}");
        }
    }

    #[test]
    fn test_scan_array_elements() {
        let out = scan_all(r#"[{"a":1},{"a":2},{"a":3}]"#, "$[*]").unwrap();
        assert_eq!(out, vec![json!({"a":1}), json!({"a":2}), json!({"a":3})]);
    }

    #[test]
    fn test_scan_no_match() {
        assert!(scan_all(r#"{"x": [1, 2]}"#, "$.y[*]").unwrap().is_empty());
    }

    #[test]
    fn test_scan_stop() {
        let path = JsonPath::compile("$[*]").unwrap();
        let mut seen = 0;
        let end = scan("[1,2,3,4]".as_bytes(), &path, &mut |_| {
            seen += 1;
            if seen == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
        assert_eq!(end, ScanEnd::Stopped);
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_scan_stop_on_nested_match() {
        let path = JsonPath::compile("$..a").unwrap();
        let mut seen = Vec::new();
        let end = scan(r#"{"a":{"a":{"a":1}}}"#.as_bytes(), &path, &mut |v| {
            seen.push(v);
            if seen.len() == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
        assert_eq!(end, ScanEnd::Stopped);
        assert_eq!(seen, vec![json!({"a":{"a":1}}), json!({"a":1})]);
    }

    #[test]
    fn test_scan_malformed() {
        let err = scan_all(r#"[{"a":1},{"a":"#, "$[*]").unwrap_err();
        assert!(matches!(err, GenerateError::Json(_)));
        assert!(err.is_recoverable());

        let trailing = scan_all(r#"[1] [2]"#, "$[*]").unwrap_err();
        assert!(matches!(trailing, GenerateError::Json(_)));
    }

    #[test]
    fn test_matches_before_error_are_reported() {
        let path = JsonPath::compile("$[*]").unwrap();
        let mut seen = Vec::new();
        let result = scan(r#"[1,2,oops]"#.as_bytes(), &path, &mut |v| {
            seen.push(v);
            ControlFlow::Continue(())
        });
        assert!(result.is_err());
        assert_eq!(seen, vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_numbers_are_leaves() {
        let out = scan_all(r#"{"x":5,"y":{"z":6},"w":[7.5]}"#, "$.*.*").unwrap();
        assert_eq!(out, vec![json!(6), json!(7.5)]);
    }

    #[test]
    fn test_scan_keeps_large_numbers_exact() {
        let doc = r#"[{"id":12345678901234567890123},{"id":-1}]"#;
        let out = scan_all(doc, "$[*].id").unwrap();
        let lexical: Vec<String> = out.iter().map(Value::to_string).collect();
        assert_eq!(lexical, vec!["12345678901234567890123", "-1"]);
    }
}
