//! Structural diffing of entity snapshots
//!
//! Computes a change-set between a "before" and an "after" value. Dispatch is
//! on the runtime shape of the two values, decided once at the top level:
//!
//! - objects (structs and key/value maps) are compared key by key
//! - arrays are compared index by index
//! - anything else is compared as a whole and reported under `"value"`
//!
//! In [`DiffDepth::Shallow`] mode a changed field is reported with its whole
//! old and new value even if it is itself an object or array. In
//! [`DiffDepth::Deep`] mode changed nested containers of matching shape are
//! descended into, and leaf paths such as `address.city` or `lines[2]` are
//! reported instead.
//!
//! Values whose top-level shapes differ produce an empty change-set rather
//! than an error. Nothing here holds state, so every function is safe to call
//! from any thread.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AuditError, AuditResult};

/// How far the diff descends into nested values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffDepth {
    /// One level: changed fields are reported whole
    #[default]
    Shallow,
    /// Recurse into changed objects and arrays of matching shape
    Deep,
}

impl DiffDepth {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "shallow" => Some(Self::Shallow),
            "deep" => Some(Self::Deep),
            _ => None,
        }
    }
}

/// Old and new value of one changed path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Mapping of changed path to its old and new value
///
/// Paths are field or key names, `prefix.name` under a prefix, `[i]` for
/// array positions, or `value` for a changed scalar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeMap<String, FieldChange>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, path: &str) -> Option<&FieldChange> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldChange)> {
        self.0.iter()
    }

    /// Changed paths in sorted order
    pub fn paths(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    fn record(&mut self, path: String, old: Value, new: Value) {
        self.0.insert(path, FieldChange { old, new });
    }

    /// Render as `path: old -> new` pairs separated by commas
    ///
    /// Returns `None` when nothing changed.
    pub fn summary(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(path, change)| {
                format!(
                    "{}: {} -> {}",
                    path,
                    format_value(&change.old),
                    format_value(&change.new)
                )
            })
            .collect();

        Some(parts.join(", "))
    }
}

impl IntoIterator for ChangeSet {
    type Item = (String, FieldChange);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Shape category of a value, used for top-level dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Object,
    Sequence,
    Null,
    Bool,
    Number,
    Text,
}

fn shape_of(value: &Value) -> Shape {
    match value {
        Value::Object(_) => Shape::Object,
        Value::Array(_) => Shape::Sequence,
        Value::Null => Shape::Null,
        Value::Bool(_) => Shape::Bool,
        Value::Number(_) => Shape::Number,
        Value::String(_) => Shape::Text,
    }
}

/// Shallow diff with no path prefix
pub fn diff(before: &Value, after: &Value) -> ChangeSet {
    diff_with_depth(before, after, "", DiffDepth::Shallow)
}

/// Shallow diff with every emitted path placed under `prefix`
pub fn diff_with_prefix(before: &Value, after: &Value, prefix: &str) -> ChangeSet {
    diff_with_depth(before, after, prefix, DiffDepth::Shallow)
}

/// Diff two values at the given depth
pub fn diff_with_depth(before: &Value, after: &Value, prefix: &str, depth: DiffDepth) -> ChangeSet {
    let mut changes = ChangeSet::new();

    if shape_of(before) != shape_of(after) {
        return changes;
    }

    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            diff_objects(old, new, prefix, depth, &mut changes);
        }
        (Value::Array(old), Value::Array(new)) => {
            diff_sequences(old, new, prefix, depth, &mut changes);
        }
        _ => {
            if before != after {
                changes.record("value".to_string(), before.clone(), after.clone());
            }
        }
    }

    changes
}

/// Diff two serializable entities of the same type
///
/// The fields that take part are exactly the ones serde serializes.
pub fn diff_entities<T>(before: &T, after: &T, depth: DiffDepth) -> AuditResult<ChangeSet>
where
    T: Serialize + ?Sized,
{
    let before = serde_json::to_value(before)
        .map_err(|e| AuditError::Json(format!("Failed to serialize before state: {}", e)))?;
    let after = serde_json::to_value(after)
        .map_err(|e| AuditError::Json(format!("Failed to serialize after state: {}", e)))?;

    Ok(diff_with_depth(&before, &after, "", depth))
}

fn diff_objects(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    prefix: &str,
    depth: DiffDepth,
    changes: &mut ChangeSet,
) {
    for (key, old_val) in old {
        let path = field_path(prefix, key);
        match new.get(key) {
            Some(new_val) if old_val == new_val => {}
            Some(new_val) => diff_nested(old_val, new_val, path, depth, changes),
            None => changes.record(path, old_val.clone(), Value::Null),
        }
    }

    for (key, new_val) in new {
        if !old.contains_key(key) {
            changes.record(field_path(prefix, key), Value::Null, new_val.clone());
        }
    }
}

fn diff_sequences(
    old: &[Value],
    new: &[Value],
    prefix: &str,
    depth: DiffDepth,
    changes: &mut ChangeSet,
) {
    for index in 0..old.len().max(new.len()) {
        let path = index_path(prefix, index);
        match (old.get(index), new.get(index)) {
            (Some(old_val), Some(new_val)) if old_val == new_val => {}
            (Some(old_val), Some(new_val)) => diff_nested(old_val, new_val, path, depth, changes),
            (Some(old_val), None) => changes.record(path, old_val.clone(), Value::Null),
            (None, Some(new_val)) => changes.record(path, Value::Null, new_val.clone()),
            (None, None) => {}
        }
    }
}

/// Report one unequal pair, descending only in deep mode
fn diff_nested(old: &Value, new: &Value, path: String, depth: DiffDepth, changes: &mut ChangeSet) {
    if depth == DiffDepth::Deep {
        match (old, new) {
            (Value::Object(old), Value::Object(new)) => {
                return diff_objects(old, new, &path, depth, changes);
            }
            (Value::Array(old), Value::Array(new)) => {
                return diff_sequences(old, new, &path, depth, changes);
            }
            _ => {}
        }
    }
    changes.record(path, old.clone(), new.clone());
}

fn field_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn index_path(prefix: &str, index: usize) -> String {
    format!("{}[{}]", prefix, index)
}

/// Format a JSON value for human-readable display
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if s.chars().count() > 50 {
                let head: String = s.chars().take(47).collect();
                format!("\"{}...\"", head)
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct Person {
        name: String,
        age: u32,
    }

    #[derive(Serialize)]
    struct Invoice {
        number: String,
        customer: Customer,
        #[serde(skip)]
        _cache: u32,
    }

    #[derive(Serialize)]
    struct Customer {
        name: String,
        city: String,
    }

    #[test]
    fn test_identical_structs_have_no_changes() {
        let a = Person { name: "A".into(), age: 30 };
        let b = Person { name: "A".into(), age: 30 };

        let changes = diff_entities(&a, &b, DiffDepth::Shallow).unwrap();
        assert!(changes.is_empty());
        assert_eq!(changes.summary(), None);
    }

    #[test]
    fn test_struct_single_field_change() {
        let a = Person { name: "A".into(), age: 30 };
        let b = Person { name: "B".into(), age: 30 };

        let changes = diff_entities(&a, &b, DiffDepth::Shallow).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes.get("Name"),
            Some(&FieldChange { old: json!("A"), new: json!("B") })
        );
    }

    #[test]
    fn test_nested_struct_reported_whole_when_shallow() {
        let a = Invoice {
            number: "INV-1".into(),
            customer: Customer { name: "Acme".into(), city: "Oslo".into() },
            _cache: 1,
        };
        let b = Invoice {
            number: "INV-1".into(),
            customer: Customer { name: "Acme".into(), city: "Bergen".into() },
            _cache: 2,
        };

        let changes = diff_entities(&a, &b, DiffDepth::Shallow).unwrap();
        assert_eq!(changes.paths(), vec!["customer"]);
        let change = changes.get("customer").unwrap();
        assert_eq!(change.old, json!({"name": "Acme", "city": "Oslo"}));
        assert_eq!(change.new, json!({"name": "Acme", "city": "Bergen"}));
    }

    #[test]
    fn test_nested_struct_descended_when_deep() {
        let before = json!({"number": "INV-1", "customer": {"name": "Acme", "city": "Oslo"}});
        let after = json!({"number": "INV-1", "customer": {"name": "Acme", "city": "Bergen"}});

        let changes = diff_with_depth(&before, &after, "", DiffDepth::Deep);
        assert_eq!(changes.paths(), vec!["customer.city"]);
        assert_eq!(changes.get("customer.city").unwrap().new, json!("Bergen"));
    }

    #[test]
    fn test_map_added_key() {
        let changes = diff(&json!({"x": 1}), &json!({"x": 1, "y": 2}));
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes.get("y"),
            Some(&FieldChange { old: Value::Null, new: json!(2) })
        );
    }

    #[test]
    fn test_map_removed_and_modified_keys() {
        let changes = diff(&json!({"a": 1, "b": 2, "c": 3}), &json!({"a": 10, "c": 3}));
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get("a").unwrap().new, json!(10));
        assert_eq!(
            changes.get("b"),
            Some(&FieldChange { old: json!(2), new: Value::Null })
        );
        assert!(!changes.contains("c"));
    }

    #[test]
    fn test_sequence_growth() {
        let changes = diff(&json!([1, 2]), &json!([1, 2, 3, 4]));
        assert_eq!(changes.paths(), vec!["[2]", "[3]"]);
        assert_eq!(
            changes.get("[3]"),
            Some(&FieldChange { old: Value::Null, new: json!(4) })
        );
    }

    #[test]
    fn test_sequence_shrink_and_modify() {
        let changes = diff(&json!(["a", "b", "c"]), &json!(["a", "x"]));
        assert_eq!(changes.get("[1]").unwrap().old, json!("b"));
        assert_eq!(changes.get("[1]").unwrap().new, json!("x"));
        assert_eq!(changes.get("[2]").unwrap().new, Value::Null);
        assert!(!changes.contains("[0]"));
    }

    #[test]
    fn test_prefix_applies_to_fields_and_indices() {
        let fields = diff_with_prefix(&json!({"qty": 1}), &json!({"qty": 2}), "line");
        assert!(fields.contains("line.qty"));

        let indices = diff_with_prefix(&json!([1]), &json!([2]), "lines");
        assert!(indices.contains("lines[0]"));
    }

    #[test]
    fn test_scalar_change_keyed_value() {
        let changes = diff(&json!(1), &json!(2));
        assert_eq!(
            changes.get("value"),
            Some(&FieldChange { old: json!(1), new: json!(2) })
        );
        assert!(diff(&json!("same"), &json!("same")).is_empty());
    }

    #[test]
    fn test_mismatched_shapes_are_empty() {
        assert!(diff(&json!({"a": 1}), &json!([1])).is_empty());
        assert!(diff(&json!(1), &json!("1")).is_empty());
        assert!(diff(&Value::Null, &json!({"a": 1})).is_empty());
        assert!(diff(&json!([1]), &json!(true)).is_empty());
    }

    #[test]
    fn test_deep_mode_keeps_mismatched_nested_whole() {
        let before = json!({"tags": ["a"], "meta": {"k": 1}});
        let after = json!({"tags": "a", "meta": {"k": 1}});

        let changes = diff_with_depth(&before, &after, "", DiffDepth::Deep);
        assert_eq!(changes.paths(), vec!["tags"]);
        assert_eq!(changes.get("tags").unwrap().new, json!("a"));
    }

    #[test]
    fn test_deep_mode_sequences_of_objects() {
        let before = json!({"lines": [{"sku": "A", "qty": 1}]});
        let after = json!({"lines": [{"sku": "A", "qty": 5}, {"sku": "B", "qty": 1}]});

        let changes = diff_with_depth(&before, &after, "", DiffDepth::Deep);
        assert_eq!(changes.paths(), vec!["lines[0].qty", "lines[1]"]);
    }

    #[test]
    fn test_inputs_not_mutated() {
        let before = json!({"a": [1, 2]});
        let after = json!({"a": [1, 3]});
        let (before_copy, after_copy) = (before.clone(), after.clone());

        let _ = diff_with_depth(&before, &after, "", DiffDepth::Deep);
        assert_eq!(before, before_copy);
        assert_eq!(after, after_copy);
    }

    #[test]
    fn test_summary_format() {
        let changes = diff(
            &json!({"name": "Old Name", "active": true, "items": [1, 2, 3]}),
            &json!({"name": "New Name", "active": false, "items": [1, 2, 3, 4, 5]}),
        );

        let summary = changes.summary().unwrap();
        assert!(summary.contains("active: true -> false"));
        assert!(summary.contains("items: [3 items] -> [5 items]"));
        assert!(summary.contains("name: \"Old Name\" -> \"New Name\""));
    }

    #[test]
    fn test_long_string_truncation() {
        let long_string = "é".repeat(100);
        let changes = diff(&json!({"memo": long_string}), &json!({"memo": "short"}));
        assert!(changes.summary().unwrap().contains("...\""));
    }

    #[test]
    fn test_change_set_serializes_as_map() {
        let changes = diff(&json!({"x": 1}), &json!({"x": 2}));
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            json!({"x": {"old": 1, "new": 2}})
        );
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!(null)), "null");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!("test")), "\"test\"");
        assert_eq!(format_value(&json!({"a": 1, "b": 2})), "{2 fields}");
    }

    #[test]
    fn test_diff_depth_parse() {
        assert_eq!(DiffDepth::parse("Deep"), Some(DiffDepth::Deep));
        assert_eq!(DiffDepth::parse("shallow"), Some(DiffDepth::Shallow));
        assert_eq!(DiffDepth::parse("recursive"), None);
    }
}
