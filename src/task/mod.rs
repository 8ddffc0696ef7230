//! Tasks and plans produced by the planning pipeline

pub mod validate;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use validate::{required_parameters, validate_and_filter, validate_task};

/// A parameter value in the reasoning service's JSON-like grammar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Coerce a JSON value, recursively. `null` has no counterpart.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(ParamValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(ParamValue::Number),
            Value::String(s) => Some(ParamValue::String(s.clone())),
            Value::Array(items) => Some(ParamValue::List(
                items.iter().filter_map(ParamValue::from_json).collect(),
            )),
            Value::Object(obj) => Some(ParamValue::Map(
                obj.iter()
                    .filter_map(|(k, v)| ParamValue::from_json(v).map(|pv| (k.clone(), pv)))
                    .collect(),
            )),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n.round() as i64)
    }

    /// Integer value clamped into `i32` range
    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64()
            .map(|n| n.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ParamValue>> {
        match self {
            ParamValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Number(n)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Number(n as f64)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        ParamValue::Number(n as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

/// One unit of work: an action kind plus its parameters
///
/// Tasks are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    action: String,
    parameters: BTreeMap<String, ParamValue>,
}

impl Task {
    pub fn new(action: impl Into<String>, parameters: BTreeMap<String, ParamValue>) -> Self {
        Self {
            action: action.into(),
            parameters,
        }
    }

    /// Builder used by tests and structure templates
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn parameters(&self) -> &BTreeMap<String, ParamValue> {
        &self.parameters
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.get(key)
    }

    pub fn has_parameters(&self, keys: &[&str]) -> bool {
        keys.iter().all(|k| self.parameters.contains_key(*k))
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(ParamValue::as_i64).unwrap_or(default)
    }

    /// A quantity of at least one, saturating at `u32::MAX`
    pub fn get_count(&self, key: &str) -> u32 {
        u32::try_from(self.get_int(key, 1).max(1)).unwrap_or(u32::MAX)
    }

    /// A block coordinate, clamped into `i32` range
    pub fn get_coord(&self, key: &str) -> i32 {
        self.get(key).and_then(ParamValue::as_i32).unwrap_or(0)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    pub fn get_str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_str(key).unwrap_or(default)
    }

    pub fn get_list(&self, key: &str) -> Option<&[ParamValue]> {
        match self.get(key) {
            Some(ParamValue::List(items)) => Some(items),
            _ => None,
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.action)?;
        for (i, (k, v)) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match v {
                ParamValue::List(items) => write!(f, "{}=[{} items]", k, items.len())?,
                ParamValue::Map(_) => write!(f, "{}={{..}}", k)?,
                ParamValue::String(s) => write!(f, "{}={}", k, s)?,
                ParamValue::Number(n) => write!(f, "{}={}", k, n)?,
                ParamValue::Bool(b) => write!(f, "{}={}", k, b)?,
            }
        }
        write!(f, ")")
    }
}

/// Result of one planning round
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    /// The model's brief chain of thought
    pub reasoning: String,
    /// Human-readable goal description (the wire `plan` field)
    pub goal: String,
    pub tasks: Vec<Task>,
}

impl Plan {
    pub fn new(reasoning: impl Into<String>, goal: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            reasoning: reasoning.into(),
            goal: goal.into(),
            tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_preserves_nested_maps() {
        let value = json!({"blocks": [{"x": 1, "y": 0, "z": 2, "name": "minecraft:stone"}]});
        let pv = ParamValue::from_json(&value).unwrap();
        let map = pv.as_map().unwrap();
        let ParamValue::List(blocks) = &map["blocks"] else {
            panic!("expected list");
        };
        let cell = blocks[0].as_map().unwrap();
        assert_eq!(cell["x"], ParamValue::Number(1.0));
        assert_eq!(cell["name"].as_str(), Some("minecraft:stone"));
    }

    #[test]
    fn test_from_json_skips_null() {
        assert!(ParamValue::from_json(&json!(null)).is_none());
        let pv = ParamValue::from_json(&json!({"a": null, "b": true})).unwrap();
        assert_eq!(pv.as_map().unwrap().len(), 1);
    }

    #[test]
    fn test_task_accessors() {
        let task = Task::new("mine", BTreeMap::new())
            .with_param("block", "iron_ore")
            .with_param("quantity", 8);
        assert!(task.has_parameters(&["block", "quantity"]));
        assert!(!task.has_parameters(&["block", "x"]));
        assert_eq!(task.get_int("quantity", 1), 8);
        assert_eq!(task.get_int("missing", 1), 1);
        assert_eq!(task.get_str("block"), Some("iron_ore"));
        assert_eq!(task.get_str_or("type", "feed"), "feed");
    }

    #[test]
    fn test_counts_and_coords_saturate() {
        let task = Task::new("mine", BTreeMap::new())
            .with_param("quantity", 1e12)
            .with_param("x", -1e12)
            .with_param("y", 64)
            .with_param("z", 5e10);
        assert_eq!(task.get_count("quantity"), u32::MAX);
        assert_eq!(task.get_coord("x"), i32::MIN);
        assert_eq!(task.get_coord("y"), 64);
        assert_eq!(task.get_coord("z"), i32::MAX);
        assert_eq!(task.get_coord("missing"), 0);

        let task = Task::new("mine", BTreeMap::new()).with_param("quantity", -3);
        assert_eq!(task.get_count("quantity"), 1);
        assert_eq!(task.get_count("missing"), 1);
    }

    #[test]
    fn test_numeric_strings_coerce_to_int() {
        let task = Task::new("pathfind", BTreeMap::new()).with_param("x", "12");
        assert_eq!(task.get_int("x", 0), 12);
    }

    #[test]
    fn test_task_serde_roundtrip_keeps_value_kinds() {
        let task = Task::new("follow", BTreeMap::new())
            .with_param("player", "Alex")
            .with_param("sprint", true);
        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }
}
