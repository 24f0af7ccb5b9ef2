//! Parsers for `crm` output.
//!
//! `crm` may print debug lines before the value and mixes `true`/`off`
//! spellings, so every parser trims, reads the last non-empty line and
//! matches explicitly.

use crate::error::Result;
use regex::Regex;
use std::sync::LazyLock;

static NODE_ATTRIBUTE_VALUE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"value=(\S+)"));

/// Last non-empty, trimmed line of `output`.
pub fn last_line(output: &str) -> &str {
    output
        .trim()
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

/// Boolean spellings accepted by `crm` property output.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Boolean carried on the last line of `output`.
pub fn parse_last_line_bool(output: &str) -> Option<bool> {
    parse_bool(last_line(output))
}

/// `value=<x>` from `crm node attribute <node> show <name>` output.
pub fn node_attribute_value(output: &str) -> Result<Option<&str>> {
    let pattern = NODE_ATTRIBUTE_VALUE.as_ref().map_err(Clone::clone)?;
    Ok(pattern
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str()))
}
