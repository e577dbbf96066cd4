//! Maps agent stream-JSON stdout lines (cursor-agent, claude, codex, gemini)
//! into task events.
//!
//! Best-effort: non-JSON lines pass through as info logs; unknown JSON shapes
//! are dropped.

use serde_json::Value;
use testgen_core::events::{LogLevel, TaskEventKind};

const WRITE_TOOLS: &[&str] = &["write", "edit", "multiedit", "write_file", "replace", "edit_file"];

fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(Value::as_str)
}

fn info(message: impl Into<String>) -> TaskEventKind {
    TaskEventKind::Log {
        level: LogLevel::Info,
        message: message.into(),
    }
}

fn error(message: impl Into<String>) -> TaskEventKind {
    TaskEventKind::Log {
        level: LogLevel::Error,
        message: message.into(),
    }
}

fn tool_phase(name: &str) -> TaskEventKind {
    TaskEventKind::Phase {
        phase: "tool".to_string(),
        phase_label: format!("Running {name}"),
    }
}

fn file_write(path: &str, content: Option<&str>) -> TaskEventKind {
    TaskEventKind::FileWrite {
        path: path.to_string(),
        lines_created: content.map(|c| c.lines().count() as u64),
        bytes_written: content.map(|c| c.len() as u64),
    }
}

/// File path and new content of a write-like tool call, if it is one.
fn write_target<'a>(tool: &str, input: &'a Value) -> Option<(&'a str, Option<&'a str>)> {
    if !WRITE_TOOLS.contains(&tool.to_ascii_lowercase().as_str()) {
        return None;
    }
    let path = str_field(input, "file_path")
        .or_else(|| str_field(input, "path"))
        .or_else(|| str_field(input, "absolute_path"))?;
    let content = str_field(input, "content").or_else(|| str_field(input, "fileText"));
    Some((path, content))
}

fn tool_call_events(tool: &str, input: &Value) -> TaskEventKind {
    match write_target(tool, input) {
        Some((path, content)) => file_write(path, content),
        None => tool_phase(tool),
    }
}

#[derive(Default)]
pub struct StreamJsonEventMapper {
    // Gemini streams assistant text in deltas; joined before emitting so a
    // JSON payload split across chunks stays intact.
    pending_delta: String,
}

impl StreamJsonEventMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_line(&mut self, line: &str) -> Vec<TaskEventKind> {
        let s = line.trim();
        if s.is_empty() {
            return Vec::new();
        }

        let parsed = if s.starts_with('{') {
            serde_json::from_str::<Value>(s).ok()
        } else {
            None
        };
        let Some(v) = parsed else {
            let mut out = self.flush();
            out.push(info(line.trim_end()));
            return out;
        };

        if str_field(&v, "type") == Some("message")
            && str_field(&v, "role") == Some("assistant")
            && v.get("delta").and_then(Value::as_bool) == Some(true)
        {
            if let Some(text) = str_field(&v, "content") {
                self.pending_delta.push_str(text);
            }
            return Vec::new();
        }

        let mut out = self.flush();
        out.extend(self.map_value(&v));
        out
    }

    /// Emits any buffered delta text. Call once the stream ends.
    pub fn flush(&mut self) -> Vec<TaskEventKind> {
        if self.pending_delta.is_empty() {
            return Vec::new();
        }
        vec![info(std::mem::take(&mut self.pending_delta))]
    }

    fn map_value(&mut self, v: &Value) -> Vec<TaskEventKind> {
        let ty = str_field(v, "type").unwrap_or_default();
        match ty {
            // claude / cursor-agent
            // {"type":"assistant","message":{"content":[{"type":"text","text":"..."},{"type":"tool_use",...}]}}
            "assistant" => {
                let Some(items) = v
                    .get("message")
                    .and_then(|m| m.get("content"))
                    .and_then(Value::as_array)
                else {
                    return Vec::new();
                };
                items
                    .iter()
                    .filter_map(|item| match str_field(item, "type")? {
                        "text" | "output_text" => {
                            str_field(item, "text").filter(|t| !t.is_empty()).map(info)
                        }
                        "tool_use" => {
                            let name = str_field(item, "name").unwrap_or("tool");
                            let input = item.get("input").unwrap_or(&Value::Null);
                            Some(tool_call_events(name, input))
                        }
                        _ => None,
                    })
                    .collect()
            }
            // cursor-agent tool calls:
            // {"type":"tool_call","subtype":"started","tool_call":{"writeToolCall":{"args":{"path":..,"fileText":..}}}}
            "tool_call" if str_field(v, "subtype") == Some("started") => {
                let Some(call) = v.get("tool_call").and_then(Value::as_object) else {
                    return Vec::new();
                };
                call.iter()
                    .map(|(key, body)| {
                        let args = body.get("args").unwrap_or(&Value::Null);
                        let name = key.trim_end_matches("ToolCall");
                        tool_call_events(name, args)
                    })
                    .collect()
            }
            // gemini: {"type":"tool_use","tool_name":"write_file","parameters":{...}}
            "tool_use" => {
                let name = str_field(v, "tool_name").unwrap_or("tool");
                let params = v.get("parameters").unwrap_or(&Value::Null);
                vec![tool_call_events(name, params)]
            }
            // gemini non-delta assistant message
            "message" if str_field(v, "role") == Some("assistant") => str_field(v, "content")
                .filter(|t| !t.is_empty())
                .map(|t| vec![info(t)])
                .unwrap_or_default(),
            // codex: {"type":"item.completed","item":{"type":"agent_message","text":"..."}}
            "item.started" | "item.completed" => {
                let Some(item) = v.get("item") else {
                    return Vec::new();
                };
                let completed = ty == "item.completed";
                match str_field(item, "type").unwrap_or_default() {
                    "agent_message" if completed => str_field(item, "text")
                        .filter(|t| !t.is_empty())
                        .map(|t| vec![info(t)])
                        .unwrap_or_default(),
                    "command_execution" if !completed => vec![tool_phase("command")],
                    "file_change" if completed => item
                        .get("changes")
                        .and_then(Value::as_array)
                        .map(|changes| {
                            changes
                                .iter()
                                .filter_map(|c| str_field(c, "path"))
                                .map(|p| file_write(p, None))
                                .collect()
                        })
                        .unwrap_or_default(),
                    _ => Vec::new(),
                }
            }
            // Final summaries repeat the assistant text; only errors are kept.
            "result" => {
                let is_error = v.get("is_error").and_then(Value::as_bool) == Some(true)
                    || str_field(v, "status") == Some("error");
                if !is_error {
                    return Vec::new();
                }
                let msg = str_field(v, "result")
                    .or_else(|| v.get("error").and_then(|e| str_field(e, "message")))
                    .unwrap_or("agent reported an error");
                vec![error(msg)]
            }
            "error" | "turn.failed" => {
                let msg = str_field(v, "message")
                    .or_else(|| v.get("error").and_then(|e| str_field(e, "message")))
                    .unwrap_or("agent reported an error");
                vec![error(msg)]
            }
            _ => {
                tracing::trace!(line_type = ty, "ignored stream-json line");
                Vec::new()
            }
        }
    }
}
