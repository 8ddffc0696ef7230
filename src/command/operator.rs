//! Operator command surface
//!
//! `spawn <name>`, `remove <name>`, `list`, `stop <name>`,
//! `tell <name> <command...>` and `glow <name>`. Names may be quoted to
//! include spaces. An optional leading `/agent` or `agent` is ignored.

use crate::core::error::{AgentError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Spawn { name: String },
    Remove { name: String },
    List,
    Stop { name: String },
    Tell { name: String, command: String },
    Glow { name: String },
}

/// Split off the first word, honouring double quotes
fn take_word(input: &str) -> Option<(String, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    if let Some(rest) = input.strip_prefix('"') {
        let end = rest.find('"')?;
        let word = &rest[..end];
        if word.trim().is_empty() {
            return None;
        }
        return Some((word.to_string(), &rest[end + 1..]));
    }
    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    Some((input[..end].to_string(), &input[end..]))
}

fn required<'a>(args: &'a str, usage: &str) -> Result<(String, &'a str)> {
    take_word(args).ok_or_else(|| AgentError::InvalidCommand(format!("usage: {}", usage)))
}

impl OperatorCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let mut rest = line.trim();
        for prefix in ["/agent ", "agent "] {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped;
            }
        }
        let (verb, args) =
            take_word(rest).ok_or_else(|| AgentError::InvalidCommand("empty command".into()))?;
        let verb = verb.to_ascii_lowercase();

        let name_arg = |usage: &str| required(args, usage);

        let command = match verb.as_str() {
            "list" => OperatorCommand::List,
            "spawn" => OperatorCommand::Spawn {
                name: name_arg("spawn <name>")?.0,
            },
            "remove" => OperatorCommand::Remove {
                name: name_arg("remove <name>")?.0,
            },
            "stop" => OperatorCommand::Stop {
                name: name_arg("stop <name>")?.0,
            },
            "glow" => OperatorCommand::Glow {
                name: name_arg("glow <name>")?.0,
            },
            "tell" => {
                let (name, text) = name_arg("tell <name> <command>")?;
                let command = text.trim();
                if command.is_empty() {
                    return Err(AgentError::InvalidCommand(
                        "usage: tell <name> <command>".into(),
                    ));
                }
                OperatorCommand::Tell {
                    name,
                    command: command.to_string(),
                }
            }
            other => {
                return Err(AgentError::InvalidCommand(format!(
                    "unknown command '{}'",
                    other
                )))
            }
        };
        Ok(command)
    }
}
