//! SMS command grammar.
//!
//! An inbound SMS body is expected to be exactly `<type> <label> <action>`.
//! The action payload is normalized case-insensitively, then validated
//! against the allow-list of the target element type. Violations reject the
//! command; there is no partial or best-effort parse.

use crate::error::{GsmError, Result};
use crate::types::{Command, ElementType};

const ZONE_ACTIONS: &[&str] = &["bypass", "clear_bypass"];
const PARTITION_ACTIONS: &[&str] = &["arm", "disarm", "arm_stay", "arm_sleep"];
const OUTPUT_ACTIONS: &[&str] = &["on", "off", "pulse"];

const PASSTHROUGH_ACTIONS: &[&str] = &[
    "pulse",
    "arm",
    "disarm",
    "arm_stay",
    "arm_sleep",
    "bypass",
    "clear_bypass",
];

/// Normalize an action payload.
///
/// Boolean spellings collapse to `on`/`off`; known alarm verbs pass through
/// unchanged; anything else is unrecognized.
pub fn normalize_payload(payload: &str) -> Option<String> {
    let payload = payload.trim().to_lowercase();

    if ["true", "on", "1", "enable"].contains(&payload.as_str()) {
        Some("on".to_string())
    } else if ["false", "off", "0", "disable"].contains(&payload.as_str()) {
        Some("off".to_string())
    } else if PASSTHROUGH_ACTIONS.contains(&payload.as_str()) {
        Some(payload)
    } else {
        None
    }
}

/// Allowed actions for an element type.
pub fn allowed_actions(element_type: ElementType) -> &'static [&'static str] {
    match element_type {
        ElementType::Zone => ZONE_ACTIONS,
        ElementType::Partition => PARTITION_ACTIONS,
        ElementType::Output => OUTPUT_ACTIONS,
    }
}

/// Parse and validate an SMS command body.
pub fn parse_command(body: &str) -> Result<Command> {
    let tokens: Vec<&str> = body.split(' ').collect();

    if tokens.len() != 3 {
        return Err(GsmError::command(format!(
            "Invalid message format, expected 3 tokens, got {}",
            tokens.len()
        )));
    }

    let element_type = ElementType::parse(&tokens[0].to_lowercase())
        .ok_or_else(|| GsmError::command(format!("Invalid element type: {}", tokens[0])))?;

    let label = tokens[1].to_string();

    let action = normalize_payload(tokens[2])
        .ok_or_else(|| GsmError::command(format!("Unrecognized action: {}", tokens[2])))?;

    if !allowed_actions(element_type).contains(&action.as_str()) {
        return Err(GsmError::command(format!(
            "Invalid action for {element_type}: {action}"
        )));
    }

    Ok(Command {
        element_type,
        label,
        action,
    })
}
