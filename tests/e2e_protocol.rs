//! End-to-end tests for the line-delimited JSON host loop.

use serde_json::{Value, json};
use spelltree::protocol::{READY_ID, Response, serve};
use spelltree::{Forest, Plugins};

fn session(lines: &[Value]) -> Vec<Response> {
    let input: String = lines.iter().map(|l| format!("{l}\n")).collect();
    let mut output = Vec::new();
    serve(input.as_bytes(), &mut output, &Plugins::builtin()).unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_build_tree_round_trip() {
    let responses = session(&[json!({
        "id": "req_1",
        "command": "build_tree",
        "data": {
            "spells": [
                {"formId": "0x0001", "name": "Flames", "school": "Destruction", "skillLevel": "Novice", "theme": "fire"},
                {"formId": "0x0002", "name": "Frostbite", "school": "Destruction", "skillLevel": "Novice", "theme": "frost"},
                {"formId": "0x0003", "name": "Firebolt", "school": "Destruction", "skillLevel": "Apprentice", "theme": "fire"},
                {"formId": "0x0004", "name": "Healing", "school": "Restoration", "skillLevel": "Novice"}
            ],
            "config": {"shape": "linear", "seed": 9}
        }
    })]);

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].id, READY_ID);
    let reply = &responses[1];
    assert_eq!(reply.id, "req_1");
    assert!(reply.success, "{:?}", reply.error);

    let forest: Forest = serde_json::from_value(reply.result.clone().unwrap()).unwrap();
    assert_eq!(forest.version, "1.0");
    assert_eq!(forest.buckets.len(), 2);
    let destruction = &forest.buckets["Destruction"];
    assert_eq!(destruction.root, "0x0001");
    assert_eq!(destruction.layout_style, "linear");
    assert_eq!(destruction.node("0x0003").unwrap().name, "Firebolt");
    assert_eq!(forest.buckets["Restoration"].nodes.len(), 1);
}

#[test]
fn test_invalid_config_fails_only_that_request() {
    let responses = session(&[
        json!({"id": "bad", "command": "build_tree", "data": {"items": [], "config": {"shape": "spiral"}}}),
        json!({"id": "good", "command": "build_tree", "data": {"items": [
            {"id": "a", "tier": "Novice", "bucket": "Alteration"}
        ]}}),
        json!({"id": "bye", "command": "shutdown"}),
    ]);

    let ids: Vec<&str> = responses.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![READY_ID, "bad", "good", "bye"]);
    assert!(!responses[1].success);
    assert!(responses[1].error.as_deref().unwrap().contains("Unknown shape 'spiral'"));
    assert!(responses[2].success);
    assert_eq!(
        responses[3].result.as_ref().unwrap()["status"],
        json!("shutting_down")
    );
}
