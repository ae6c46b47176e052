//! Line-oriented editing scripts.
//!
//! ```text
//! # a document, then edits against it
//! block hello world
//! block second line
//! caret s1 5
//! type ,
//! key Enter
//! compose 日本
//! dump
//! ```

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append a block holding one plain span (document setup only)
    Block(String),
    Caret {
        span: String,
        offset: usize,
    },
    Select {
        start: String,
        start_offset: usize,
        end: String,
        end_offset: usize,
    },
    /// Let the surface insert text at the caret
    Type(String),
    /// Insert text through an input method composition
    Compose(String),
    Key(String),
    Paste,
    Dump,
}

pub fn parse_script(source: &str) -> Result<Vec<Command>> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|(index, line)| parse_line(line).with_context(|| format!("line {}: {line}", index + 1)))
        .collect()
}

fn parse_line(line: &str) -> Result<Command> {
    let line = line.trim_start();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let args: Vec<&str> = rest.split_whitespace().collect();
    let command = match (word, args.as_slice()) {
        ("block", _) => Command::Block(rest.to_string()),
        ("type", _) if !rest.is_empty() => Command::Type(rest.to_string()),
        ("compose", _) if !rest.is_empty() => Command::Compose(rest.to_string()),
        ("caret", [span, offset]) => Command::Caret {
            span: span.to_string(),
            offset: parse_offset(offset)?,
        },
        ("select", [start, start_offset, end, end_offset]) => Command::Select {
            start: start.to_string(),
            start_offset: parse_offset(start_offset)?,
            end: end.to_string(),
            end_offset: parse_offset(end_offset)?,
        },
        ("key", [name]) => Command::Key(name.to_string()),
        ("enter", []) => Command::Key("Enter".to_string()),
        ("backspace", []) => Command::Key("Backspace".to_string()),
        ("paste", []) => Command::Paste,
        ("dump", []) => Command::Dump,
        _ => bail!("unrecognised command"),
    };
    Ok(command)
}

fn parse_offset(raw: &str) -> Result<usize> {
    raw.parse()
        .with_context(|| format!("offset must be a number, got {raw:?}"))
}
