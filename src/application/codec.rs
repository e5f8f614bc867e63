//! Generic payload codec for node trees.
//!
//! Payloads are `serde_json::Value`s. Leaves read and write their scalar
//! value (or a structured map of their configuration), composites walk
//! their static schema and groups walk their children by name.
//!
//! Text handed to a non-leaf node is parsed first as a single CSV record,
//! then as JSON; text that is neither leaves the node untouched. Text a
//! numeric leaf cannot parse is skipped the same way.

use serde_json::{Map, Number, Value};
use tracing::{debug, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::leaf::{coerce_bool, Leaf};
use crate::domain::{DomainError, DomainResult, Graph, NodeBody, NodeId, Scalar};

/// Characters that mark a payload as structured text rather than a CSV record.
const STRUCTURAL_CHARS: &[char] = &['{', '}', '[', ']', ':', '"'];

/// Result of a deserialize call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The payload was unparseable text; nothing changed.
    Ignored,
}

// ------------------------------------------------------------
// Serialize
// ------------------------------------------------------------

/// Snapshot of a node as a payload.
///
/// Leaves emit their effective value (`null` when undefined). Composites and
/// groups emit a map keyed by child name, omitting undefined children.
///
/// Round trips hold by numeric value, not by JSON representation: a whole
/// float such as `2.0` comes back as the integer `2` (see [`number_to_json`]).
pub fn serialize(graph: &Graph, id: NodeId) -> DomainResult<Value> {
    let node = graph.node(id)?;
    match node.body() {
        NodeBody::Leaf(leaf) => Ok(leaf.value().map(scalar_to_json).unwrap_or(Value::Null)),
        NodeBody::Composite { schema, .. } => {
            let mut map = Map::new();
            for field in schema.fields {
                let child = graph.child(id, field.name)?;
                if !graph.is_undefined(child)? {
                    map.insert(field.name.to_string(), serialize(graph, child)?);
                }
            }
            Ok(Value::Object(map))
        }
        NodeBody::Group => {
            let mut map = Map::new();
            for child in node.children().iter() {
                if graph.is_undefined(child)? {
                    continue;
                }
                let name = graph.node(child)?.name().to_string();
                if !map.contains_key(&name) {
                    map.insert(name, serialize(graph, child)?);
                }
            }
            Ok(Value::Object(map))
        }
    }
}

/// Integral floats become JSON integers; non-finite numbers become `null`.
///
/// `2.0` and `2` are the same number here, so compare serialized numbers
/// with `as_f64` rather than by JSON token.
pub fn number_to_json(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < 9.007_199_254_740_992e15 {
        Value::Number(Number::from(v as i64))
    } else {
        Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn scalar_to_json(scalar: Scalar) -> Value {
    match scalar {
        Scalar::Number(v) => number_to_json(v),
        Scalar::Text(v) => Value::String(v),
        Scalar::Boolean(v) => Value::Bool(v),
    }
}

// ------------------------------------------------------------
// Deserialize
// ------------------------------------------------------------

/// Applies a payload to a node.
///
/// * Leaves: `null` resets, a scalar is coerced to the leaf kind, a map
///   configures the leaf (`unit`, `min`, `max`, `pattern`, `validValues`,
///   `defaultValue`, `value`, applied in that order).
/// * Other nodes: a sequence assigns children by position (too many entries
///   is rejected before anything changes), a map assigns children by name
///   (unknown names and `null` entries are skipped), text is parsed with
///   [`parse_text`] first.
///
/// Unparseable text is logged and skipped: on a node as a whole it yields
/// [`Outcome::Ignored`]. Validation failures are returned as errors;
/// entries applied before the failing one stay applied.
#[instrument(level = "debug", skip(graph, payload))]
pub fn deserialize(graph: &mut Graph, id: NodeId, payload: &Value) -> ApplicationResult<Outcome> {
    if graph.node(id)?.leaf().is_some() {
        return deserialize_leaf(graph, id, payload);
    }

    match payload {
        Value::Null => Ok(Outcome::Ignored),
        Value::String(text) => match parse_text(text) {
            Some(parsed) => deserialize(graph, id, &parsed),
            None => {
                warn!(
                    "ignoring unparseable payload for '{}': {:?}",
                    graph.node(id)?.name(),
                    text
                );
                Ok(Outcome::Ignored)
            }
        },
        Value::Array(items) => {
            let children = graph.node(id)?.children().snapshot();
            if items.len() > children.len() {
                return Err(ApplicationError::payload(
                    graph.node(id)?.name(),
                    format!(
                        "sequence of {} entries for {} children",
                        items.len(),
                        children.len()
                    ),
                ));
            }
            for (child, item) in children.into_iter().zip(items) {
                if !item.is_null() {
                    deserialize(graph, child, item)?;
                }
            }
            Ok(Outcome::Applied)
        }
        Value::Object(entries) => {
            for (key, item) in entries {
                if item.is_null() {
                    continue;
                }
                match graph.child(id, key) {
                    Ok(child) => {
                        deserialize(graph, child, item)?;
                    }
                    Err(DomainError::ChildNotFound { .. }) => {
                        debug!("skipping unknown key '{}'", key);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(Outcome::Applied)
        }
        Value::Bool(_) | Value::Number(_) => Err(ApplicationError::payload(
            graph.node(id)?.name(),
            format!("cannot assign {} to a structured node", payload),
        )),
    }
}

/// Parses text as a single CSV record, else as JSON.
///
/// A CSV record qualifies when the text holds exactly one record and no
/// structural JSON characters. Its fields become numbers, booleans, strings,
/// or `null` when empty.
pub fn parse_text(text: &str) -> Option<Value> {
    parse_csv_record(text).or_else(|| serde_json::from_str(text).ok())
}

fn parse_csv_record(text: &str) -> Option<Value> {
    if text.trim().is_empty() || text.contains(STRUCTURAL_CHARS) {
        return None;
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let mut records = reader.records();
    let record = records.next()?.ok()?;
    if records.next().is_some() {
        return None;
    }
    Some(Value::Array(record.iter().map(csv_field).collect()))
}

fn csv_field(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    match field {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => field
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(number_to_json)
            .unwrap_or_else(|| Value::String(field.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafKind {
    Numeric,
    Text,
    Boolean,
}

/// Why a payload value did not become a scalar.
#[derive(Debug, Clone, PartialEq)]
enum Conversion {
    /// Text that does not parse as the leaf kind. Skipped, like unparseable text on a group.
    Unparseable(String),
    /// A value of the wrong shape. Rejected.
    Mismatch(String),
}

impl LeafKind {
    fn of(leaf: &Leaf) -> Self {
        match leaf {
            Leaf::Number(_) | Leaf::Measure(_) => LeafKind::Numeric,
            Leaf::Text(_) => LeafKind::Text,
            Leaf::Boolean(_) => LeafKind::Boolean,
        }
    }

    /// Converts a payload value into a scalar of this kind.
    fn scalar(self, value: &Value) -> Result<Option<Scalar>, Conversion> {
        match (self, value) {
            (_, Value::Null) => Ok(None),
            (_, Value::Array(_) | Value::Object(_)) => Err(Conversion::Mismatch(format!(
                "expected a scalar, got {}",
                value
            ))),
            (LeafKind::Numeric, Value::Number(n)) => n
                .as_f64()
                .map(|v| Some(Scalar::Number(v)))
                .ok_or_else(|| Conversion::Mismatch(format!("{} is not representable", n))),
            (LeafKind::Numeric, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(|v| Some(Scalar::Number(v)))
                .map_err(|_| Conversion::Unparseable(format!("'{}' is not a number", s))),
            (LeafKind::Numeric, Value::Bool(b)) => {
                Err(Conversion::Mismatch(format!("expected a number, got {}", b)))
            }
            (LeafKind::Text, Value::String(s)) => Ok(Some(Scalar::Text(s.clone()))),
            (LeafKind::Text, other) => Ok(Some(Scalar::Text(other.to_string()))),
            (LeafKind::Boolean, Value::Bool(b)) => Ok(Some(Scalar::Boolean(*b))),
            (LeafKind::Boolean, Value::Number(n)) => Ok(Some(Scalar::Boolean(coerce_bool(
                &Scalar::Number(n.as_f64().unwrap_or(1.0)),
            )))),
            (LeafKind::Boolean, Value::String(s)) => Ok(Some(Scalar::Boolean(coerce_bool(
                &Scalar::Text(s.clone()),
            )))),
        }
    }

    /// Like [`LeafKind::scalar`], with mismatches as payload errors.
    /// `Ok(None)` means unparseable text: logged, nothing to apply.
    fn convert(
        self,
        node: &str,
        key: &str,
        value: &Value,
    ) -> ApplicationResult<Option<Option<Scalar>>> {
        match self.scalar(value) {
            Ok(scalar) => Ok(Some(scalar)),
            Err(Conversion::Unparseable(reason)) => {
                warn!("ignoring {} for '{}': {}", key, node, reason);
                Ok(None)
            }
            Err(Conversion::Mismatch(reason)) => Err(ApplicationError::payload(node, reason)),
        }
    }
}

fn deserialize_leaf(graph: &mut Graph, id: NodeId, payload: &Value) -> ApplicationResult<Outcome> {
    let kind = LeafKind::of(graph.leaf(id)?);
    let name = graph.node(id)?.name().to_string();

    let Value::Object(config) = payload else {
        let Some(value) = kind.convert(&name, "value", payload)? else {
            return Ok(Outcome::Ignored);
        };
        match value {
            None => graph.reset(id)?,
            value => graph.set_value(id, value)?,
        };
        return Ok(Outcome::Applied);
    };

    if let Some(unit) = config.get("unit").and_then(Value::as_str) {
        graph.select_unit(id, unit)?;
    }
    for key in ["min", "max"] {
        let Some(bound) = config.get(key) else {
            continue;
        };
        let Some(bound) = LeafKind::Numeric.convert(&name, key, bound)? else {
            continue;
        };
        let bound = bound.and_then(|s| s.as_number());
        if key == "min" {
            graph.set_min(id, bound)?;
        } else {
            graph.set_max(id, bound)?;
        }
    }
    if let Some(pattern) = config.get("pattern") {
        graph.set_pattern(id, pattern.as_str())?;
    }
    if let Some(valid) = config.get("validValues") {
        let list = match valid {
            Value::Null => None,
            Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(Some(scalar)) = kind.convert(&name, "validValues entry", item)? {
                        list.push(scalar);
                    }
                }
                Some(list)
            }
            other => {
                return Err(ApplicationError::payload(
                    &name,
                    format!("validValues must be a sequence, got {}", other),
                ))
            }
        };
        graph.set_valid_values(id, list)?;
    }
    if let Some(default) = config.get("defaultValue") {
        if let Some(default) = kind.convert(&name, "defaultValue", default)? {
            graph.set_default(id, default)?;
        }
    }
    if let Some(value) = config.get("value") {
        if let Some(value) = kind.convert(&name, "value", value)? {
            graph.set_value(id, value)?;
        }
    }
    Ok(Outcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::names;
    use serde_json::json;

    #[test]
    fn given_plain_tokens_when_parsing_text_then_csv_record() {
        assert_eq!(parse_text("1, 2.5 ,abc"), Some(json!([1, 2.5, "abc"])));
        assert_eq!(parse_text("true,,0"), Some(json!([true, null, 0])));
    }

    #[test]
    fn given_structured_text_when_parsing_then_json() {
        assert_eq!(parse_text(r#"{"x": 1}"#), Some(json!({"x": 1})));
        assert_eq!(parse_text("[1,2]"), Some(json!([1, 2])));
    }

    #[test]
    fn given_garbage_when_parsing_then_none() {
        assert_eq!(parse_text("{not json"), None);
        assert_eq!(parse_text("1,2\n3,4"), None);
        assert_eq!(parse_text("   "), None);
    }

    #[test]
    fn given_integral_float_when_serializing_then_integer() {
        assert_eq!(number_to_json(3.0), json!(3));
        assert_eq!(number_to_json(-0.5), json!(-0.5));
        assert_eq!(number_to_json(f64::NAN), Value::Null);
    }

    #[test]
    fn given_unparseable_text_when_deserializing_group_then_ignored() {
        let mut graph = Graph::new();
        let v = graph.create(names::VECTOR, "v").unwrap();

        let outcome = deserialize(&mut graph, v, &json!("{broken")).unwrap();

        assert_eq!(outcome, Outcome::Ignored);
        assert!(graph.is_undefined(v).unwrap());
    }

    #[test]
    fn given_long_sequence_when_deserializing_then_rejected_without_mutation() {
        let mut graph = Graph::new();
        let v = graph.create(names::VECTOR, "v").unwrap();

        let result = deserialize(&mut graph, v, &json!([1, 2, 3, 4]));

        assert!(matches!(result, Err(ApplicationError::Payload { .. })));
        assert!(graph.is_undefined(v).unwrap());
    }

    #[test]
    fn given_structured_leaf_payload_then_applied_in_order() {
        let mut graph = Graph::new();
        let n = graph.create(names::NUMBER, "n").unwrap();

        deserialize(
            &mut graph,
            n,
            &json!({"value": 7, "defaultValue": 3, "max": 10, "min": 0}),
        )
        .unwrap();

        let leaf = graph.leaf(n).unwrap();
        assert_eq!(leaf.value(), Some(Scalar::Number(7.0)));
        assert_eq!(leaf.default_value(), Some(Scalar::Number(3.0)));
        assert_eq!(leaf.numeric().unwrap().max(), Some(10.0));
    }

    #[test]
    fn given_boolean_leaf_then_coerces_text_and_numbers() {
        let mut graph = Graph::new();
        let b = graph.create(names::BOOLEAN, "b").unwrap();

        deserialize(&mut graph, b, &json!("false")).unwrap();
        assert_eq!(graph.boolean(b).unwrap(), Some(false));
        deserialize(&mut graph, b, &json!("yes")).unwrap();
        assert_eq!(graph.boolean(b).unwrap(), Some(true));
        deserialize(&mut graph, b, &json!(0)).unwrap();
        assert_eq!(graph.boolean(b).unwrap(), Some(false));
    }

    #[test]
    fn given_measure_payload_with_unit_then_label_changes_value_kept() {
        let mut graph = Graph::new();
        let a = graph.create(names::ANGLE, "a").unwrap();

        deserialize(&mut graph, a, &json!({"unit": "rad", "value": 1.5})).unwrap();

        assert_eq!(graph.unit(a).unwrap().id, "radians");
        assert_eq!(graph.number(a).unwrap(), Some(1.5));
    }

    #[test]
    fn given_unparseable_text_on_number_leaf_then_ignored_and_value_kept() {
        let mut graph = Graph::new();
        let n = graph.create(names::NUMBER, "n").unwrap();
        graph.set_value(n, Some(Scalar::Number(4.0))).unwrap();

        let outcome = deserialize(&mut graph, n, &json!("abc")).unwrap();

        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(graph.number(n).unwrap(), Some(4.0));
    }

    #[test]
    fn given_unparseable_entry_in_leaf_config_then_only_that_entry_skipped() {
        let mut graph = Graph::new();
        let n = graph.create(names::NUMBER, "n").unwrap();

        deserialize(&mut graph, n, &json!({"max": "lots", "value": 12})).unwrap();

        assert_eq!(graph.leaf(n).unwrap().numeric().unwrap().max(), None);
        assert_eq!(graph.number(n).unwrap(), Some(12.0));
    }

    #[test]
    fn given_wrong_shape_on_number_leaf_then_payload_error() {
        let mut graph = Graph::new();
        let n = graph.create(names::NUMBER, "n").unwrap();

        assert!(matches!(
            deserialize(&mut graph, n, &json!(true)),
            Err(ApplicationError::Payload { .. })
        ));
        assert!(matches!(
            deserialize(&mut graph, n, &json!([1])),
            Err(ApplicationError::Payload { .. })
        ));
    }

    #[test]
    fn given_null_on_leaf_then_reset_to_default() {
        let mut graph = Graph::new();
        let q = graph.create(names::QUATERNION, "q").unwrap();
        let w = graph.child(q, "w").unwrap();
        graph.set_value(w, Some(Scalar::Number(0.0))).unwrap();

        deserialize(&mut graph, w, &Value::Null).unwrap();

        assert_eq!(graph.number(w).unwrap(), Some(1.0));
        assert!(graph.is_default(q).unwrap());
    }
}
