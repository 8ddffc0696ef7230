//! Property tests for reply parsing and task validation

use craftmind::actions::catalog::{create_action, ActionKind};
use craftmind::llm::parser::{extract_json, parse_response};
use craftmind::task::validate::{required_parameters, validate_and_filter, validate_task};
use craftmind::task::{ParamValue, Task};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn arb_kind() -> impl Strategy<Value = ActionKind> {
    (0..ActionKind::ALL.len()).prop_map(|i| ActionKind::ALL[i])
}

fn arb_value() -> impl Strategy<Value = ParamValue> {
    prop_oneof![
        (1i64..64).prop_map(ParamValue::from),
        "[a-z_]{1,12}".prop_map(ParamValue::from),
    ]
}

/// A task carrying every key of one alternative set for its kind
fn arb_complete_task() -> impl Strategy<Value = Task> {
    (arb_kind(), any::<prop::sample::Index>(), arb_value()).prop_map(|(kind, pick, value)| {
        let sets = required_parameters(kind);
        let set = sets[pick.index(sets.len())];
        let params: BTreeMap<String, ParamValue> = set
            .iter()
            .map(|key| (key.to_string(), value.clone()))
            .collect();
        Task::new(kind.tag(), params)
    })
}

fn wire(goal: &str, tasks: &[Task]) -> String {
    let tasks: Vec<serde_json::Value> = tasks
        .iter()
        .map(|t| serde_json::json!({ "action": t.action(), "parameters": t.parameters() }))
        .collect();
    serde_json::json!({ "reasoning": "because", "plan": goal, "tasks": tasks }).to_string()
}

proptest! {
    #[test]
    fn parsing_is_deterministic(raw in ".{0,200}") {
        prop_assert_eq!(parse_response(&raw), parse_response(&raw));
    }

    #[test]
    fn complete_tasks_always_validate(tasks in prop::collection::vec(arb_complete_task(), 0..8)) {
        for task in &tasks {
            prop_assert!(validate_task(task), "{} rejected", task);
            prop_assert!(create_action(task).is_some());
        }
        prop_assert_eq!(validate_and_filter(tasks.clone()), tasks);
    }

    #[test]
    fn fences_do_not_change_the_plan(
        goal in "[A-Za-z ]{1,24}",
        tasks in prop::collection::vec(arb_complete_task(), 1..5),
    ) {
        let raw = wire(&goal, &tasks);
        let fenced = format!("```json\n{}\n```", raw);
        let plan = parse_response(&raw);
        prop_assert!(plan.is_some());
        prop_assert_eq!(plan, parse_response(&fenced));
    }

    #[test]
    fn pretty_printed_replies_parse_like_compact_ones(
        goal in "[A-Za-z]{1,16}",
        tasks in prop::collection::vec(arb_complete_task(), 1..4),
    ) {
        let compact = wire(&goal, &tasks);
        let value: serde_json::Value = serde_json::from_str(&compact).unwrap();
        let pretty = serde_json::to_string_pretty(&value).unwrap();
        prop_assert_eq!(parse_response(&compact), parse_response(&pretty));
    }

    #[test]
    fn extraction_output_has_no_newlines(raw in "[{}\\[\\]a-z\n :,\"]{0,80}") {
        if let Some(json) = extract_json(&raw) {
            prop_assert!(!json.contains('\n'));
        }
    }
}
