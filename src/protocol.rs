//! Line-delimited JSON request loop for hosting the builder in a child
//! process.
//!
//! ```text
//! host -> builder:  {"id":"req_1","command":"build_tree","data":{"items":[...],"config":{...}}}
//! builder -> host:  {"id":"req_1","success":true,"result":{...}}
//! ```
//!
//! The first line written is always `{"id":"__ready__","success":true,...}`.
//! Request ids may be any JSON value; replies echo them back as strings.
//! Requests are answered strictly in order. A bad request gets a
//! `success:false` reply and the loop keeps reading; only `shutdown`, end of
//! input, or an I/O failure ends it.

use std::io::{BufRead, Write};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::builder::TreeBuilder;
use crate::config::BuilderConfig;
use crate::model::ItemRecord;
use crate::registry::Plugins;
use crate::{Error, Result};

pub const READY_ID: &str = "__ready__";

const UNKNOWN_ID: &str = "unknown";

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default = "unknown_id", deserialize_with = "id_string")]
    id: String,
    #[serde(default)]
    command: String,
    #[serde(default)]
    data: Value,
}

fn unknown_id() -> String {
    UNKNOWN_ID.to_string()
}

/// Strings pass through, `null` becomes `"unknown"`, anything else is
/// echoed as its JSON text.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => id,
        Value::Null => unknown_id(),
        other => other.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct BuildRequest {
    #[serde(alias = "spells")]
    items: Vec<ItemRecord>,
    #[serde(default)]
    config: BuilderConfig,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn ok(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    fn fail(id: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Serve requests from `reader` until `shutdown` or end of input.
pub fn serve(reader: impl BufRead, mut writer: impl Write, plugins: &Plugins) -> Result<()> {
    send(&mut writer, &Response::ok(READY_ID, json!({ "pid": std::process::id() })))?;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (response, flow) = match serde_json::from_str::<Request>(line) {
            Ok(request) => handle(request, plugins),
            Err(err) => {
                tracing::warn!(%err, "malformed request line");
                (Response::fail(UNKNOWN_ID, format!("Invalid JSON: {err}")), Flow::Continue)
            }
        };
        send(&mut writer, &response)?;
        if let Flow::Stop = flow {
            tracing::info!("shutdown requested");
            break;
        }
    }
    Ok(())
}

fn handle(request: Request, plugins: &Plugins) -> (Response, Flow) {
    tracing::debug!(id = %request.id, command = %request.command, "request");
    match request.command.as_str() {
        "shutdown" => (
            Response::ok(request.id, json!({ "status": "shutting_down" })),
            Flow::Stop,
        ),
        "ping" => (
            Response::ok(request.id, json!({ "status": "alive", "pid": std::process::id() })),
            Flow::Continue,
        ),
        "build_tree" => {
            let response = match build_tree(request.data, plugins) {
                Ok(result) => Response::ok(request.id, result),
                Err(err) => {
                    tracing::warn!(id = %request.id, %err, "build_tree failed");
                    Response::fail(request.id, err)
                }
            };
            (response, Flow::Continue)
        }
        other => {
            let err = Error::Protocol(format!("Unknown command: {other}"));
            (Response::fail(request.id, err), Flow::Continue)
        }
    }
}

fn build_tree(data: Value, plugins: &Plugins) -> Result<Value> {
    let request: BuildRequest = serde_json::from_value(data)?;
    let builder = TreeBuilder::with_plugins(request.config, plugins.clone())?;
    let forest = builder.build_forest(&request.items)?;
    Ok(serde_json::to_value(forest)?)
}

fn send(writer: &mut impl Write, response: &Response) -> Result<()> {
    serde_json::to_writer(&mut *writer, response)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> Vec<Response> {
        let mut out = Vec::new();
        serve(input.as_bytes(), &mut out, &Plugins::builtin()).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_ready_then_ping_then_shutdown() {
        let responses = run(concat!(
            "{\"id\":\"1\",\"command\":\"ping\"}\n",
            "\n",
            "{\"id\":\"2\",\"command\":\"shutdown\"}\n",
            "{\"id\":\"3\",\"command\":\"ping\"}\n",
        ));
        let ids: Vec<&str> = responses.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![READY_ID, "1", "2"]);
        assert!(responses.iter().all(|r| r.success));
        assert_eq!(responses[1].result.as_ref().unwrap()["status"], "alive");
    }

    #[test]
    fn test_bad_lines_do_not_stop_the_loop() {
        let responses = run(concat!(
            "not json\n",
            "{\"id\":\"a\",\"command\":\"dance\"}\n",
            "{\"id\":\"b\",\"command\":\"build_tree\",\"data\":{}}\n",
            "{\"id\":\"c\",\"command\":\"ping\"}\n",
        ));
        assert_eq!(responses.len(), 5);
        assert_eq!(responses[1].id, UNKNOWN_ID);
        assert!(!responses[1].success);
        assert_eq!(responses[2].error.as_deref(), Some("Protocol error: Unknown command: dance"));
        assert!(!responses[3].success);
        assert!(responses[4].success);
    }

    #[test]
    fn test_non_string_ids_are_echoed_as_text() {
        let responses = run(concat!(
            "{\"id\":7,\"command\":\"ping\"}\n",
            "{\"id\":null,\"command\":\"ping\"}\n",
            "{\"id\":{\"seq\":2},\"command\":\"ping\"}\n",
            "{\"command\":\"shutdown\"}\n",
        ));
        let ids: Vec<&str> = responses.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![READY_ID, "7", UNKNOWN_ID, "{\"seq\":2}", UNKNOWN_ID]);
        assert!(responses.iter().all(|r| r.success));
        assert_eq!(responses[1].result.as_ref().unwrap()["status"], "alive");
    }
}
