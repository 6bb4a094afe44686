use super::load_spec;
use crate::parameter::Which;
use crate::resolve::ResolveContext;
use crate::validate::{validate_slot, Validation};

pub fn cmd_validate(args: &[String], ctx: &ResolveContext) -> Result<String, String> {
    let spec = load_spec(args, "validate <spec>")?;
    let mut lines = Vec::new();

    for (slot, which) in [("value", Which::Value), ("default", Which::Default)] {
        for (check, result) in validate_slot(&spec, which, ctx) {
            lines.push(format_check(slot, check, &result));
        }
    }
    Ok(lines.join("\n"))
}

fn format_check(slot: &str, check: &str, result: &Validation) -> String {
    match result.message() {
        Some(message) => format!(
            "slot={slot} check={check} status={} message={}",
            result.status(),
            message.trim()
        ),
        None => format!("slot={slot} check={check} status={}", result.status()),
    }
}
