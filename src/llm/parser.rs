//! Fault-tolerant parsing of model output into a [`Plan`]
//!
//! Models wrap their JSON in code fences, chatter around it, break lines
//! mid-object and forget commas between adjacent objects or arrays. The
//! repairs here are a heuristic, not a grammar: a string literal that
//! itself contains `} {` gets a comma inserted, and missing commas between
//! scalar tokens are never fixed. Anything that still fails to parse
//! yields `None` for the whole response.

use crate::task::{ParamValue, Plan, Task};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, error, warn};

struct Repairs {
    line_breaks: Regex,
    missing_commas: Regex,
}

static REPAIRS: OnceLock<Option<Repairs>> = OnceLock::new();

fn repairs() -> Option<&'static Repairs> {
    REPAIRS
        .get_or_init(|| {
            Some(Repairs {
                line_breaks: Regex::new(r"\r?\n\s*").ok()?,
                missing_commas: Regex::new(r"([}\]])\s*([{\[])").ok()?,
            })
        })
        .as_ref()
}

/// Strip fences and surrounding prose, then apply the textual repairs
pub fn extract_json(raw: &str) -> Option<String> {
    let mut cleaned = raw.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    let cleaned = cleaned.trim();

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }
    let object = &cleaned[start..=end];

    let repairs = repairs()?;
    let flattened = repairs.line_breaks.replace_all(object, " ");
    let repaired = repairs
        .missing_commas
        .replace_all(&flattened, "${1},${2}");
    Some(repaired.into_owned())
}

fn text_field(object: &serde_json::Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn parse_task(value: &Value) -> Option<Task> {
    let object = value.as_object()?;
    let action = object.get("action")?.as_str()?;
    let parameters: BTreeMap<String, ParamValue> = match object.get("parameters") {
        Some(Value::Object(params)) => params
            .iter()
            .filter_map(|(k, v)| ParamValue::from_json(v).map(|pv| (k.clone(), pv)))
            .collect(),
        _ => BTreeMap::new(),
    };
    Some(Task::new(action, parameters))
}

/// Parse raw model output; `None` on any unrecoverable problem
pub fn parse_response(raw: &str) -> Option<Plan> {
    if raw.trim().is_empty() {
        return None;
    }
    let Some(json) = extract_json(raw) else {
        error!("No JSON object in response: {}", raw);
        return None;
    };
    let value: Value = match serde_json::from_str(&json) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to parse response ({}): {}", e, raw);
            return None;
        }
    };
    let Some(object) = value.as_object() else {
        error!("Response is not a JSON object: {}", raw);
        return None;
    };

    let mut tasks = Vec::new();
    if let Some(Value::Array(entries)) = object.get("tasks") {
        for entry in entries {
            match parse_task(entry) {
                Some(task) => tasks.push(task),
                None => warn!("Dropping task entry without an action: {}", entry),
            }
        }
    }

    let plan = Plan::new(text_field(object, "reasoning"), text_field(object, "plan"), tasks);
    debug!("Parsed plan '{}' with {} tasks", plan.goal, plan.tasks.len());
    Some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_response_with_prose() {
        let raw = "Sure! ```json\n{\"reasoning\":\"go\",\"plan\":\"move\",\"tasks\":[{\"action\":\"pathfind\",\"parameters\":{\"x\":5,\"y\":64,\"z\":5}}]}\n```";
        let plan = parse_response(raw).unwrap();
        assert_eq!(plan.reasoning, "go");
        assert_eq!(plan.goal, "move");
        assert_eq!(plan.tasks.len(), 1);
        let task = &plan.tasks[0];
        assert_eq!(task.action(), "pathfind");
        assert_eq!(task.parameters().len(), 3);
        assert_eq!(task.get_int("x", 0), 5);
        assert_eq!(task.get_int("y", 0), 64);
        assert_eq!(task.get_int("z", 0), 5);
    }

    #[test]
    fn test_missing_commas_between_objects_repaired() {
        let raw = r#"{"plan": "build", "tasks": [
            {"action": "build", "parameters": {"blocks": [
                {"x": 0, "y": 0, "z": 0, "name": "stone"}
                {"x": 1, "y": 0, "z": 0, "name": "stone"}
            ]}}
            {"action": "follow", "parameters": {"player": "Alex"}}
        ]}"#;
        let plan = parse_response(raw).unwrap();
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[0].get_list("blocks").unwrap().len(), 2);
        assert_eq!(plan.reasoning, "");
    }

    #[test]
    fn test_entries_without_action_dropped() {
        let raw = r#"{"reasoning": "r", "plan": "p", "tasks": [
            {"parameters": {"x": 1}}, 7, {"action": "attack", "parameters": {"target": "zombie"}}
        ]}"#;
        let plan = parse_response(raw).unwrap();
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].get_str("target"), Some("zombie"));
    }

    #[test]
    fn test_null_parameters_skipped() {
        let raw = r#"{"tasks": [{"action": "follow", "parameters": {"player": "Alex", "speed": null}}]}"#;
        let plan = parse_response(raw).unwrap();
        assert_eq!(plan.tasks[0].parameters().len(), 1);
    }

    #[test]
    fn test_unrecoverable_input() {
        assert!(parse_response("").is_none());
        assert!(parse_response("I cannot help with that.").is_none());
        assert!(parse_response("{\"tasks\": [").is_none());
    }

    #[test]
    fn test_empty_task_list() {
        let plan = parse_response(r#"{"reasoning": "stop", "plan": "Stop", "tasks": []}"#).unwrap();
        assert!(plan.tasks.is_empty());
        assert_eq!(plan.goal, "Stop");
    }

    #[test]
    fn test_blind_spot_braces_inside_string_are_rewritten() {
        let raw = r#"{"reasoning": "a } { b", "plan": "p", "tasks": []}"#;
        let plan = parse_response(raw).unwrap();
        assert_eq!(plan.reasoning, "a },{ b");
    }

    #[test]
    fn test_blind_spot_missing_scalar_comma_not_repaired() {
        let raw = r#"{"reasoning": "r" "plan": "p", "tasks": []}"#;
        assert!(parse_response(raw).is_none());
    }
}
