use super::load_spec;
use crate::parameter::Which;
use crate::resolve::{resolve, ResolveContext};
use crate::selection::{create_value_from_json, create_value_from_request};
use serde_json::Value;

const NONE_MARKER: &str = "<none>";

pub fn cmd_resolve(args: &[String], ctx: &ResolveContext) -> Result<String, String> {
    let spec = load_spec(args, "resolve <spec> [--default]")?;
    let which = match args.get(1).map(String::as_str) {
        None => Which::Value,
        Some("--default") => Which::Default,
        Some(other) => return Err(format!("unknown resolve option `{other}`")),
    };
    let source = spec
        .sources(which)
        .active()
        .map_or(NONE_MARKER, |source| source.kind());
    let resolved = resolve(&spec, which, ctx).map_err(|err| err.to_string())?;

    let slot = match which {
        Which::Value => "value",
        Which::Default => "default",
    };
    let effective = resolved.map(|raw| spec.quote(raw));
    Ok([
        format!("parameter={}", spec.name),
        format!("slot={slot}"),
        format!("source={source}"),
        format!(
            "effective={}",
            effective.as_deref().unwrap_or(NONE_MARKER)
        ),
    ]
    .join("\n"))
}

pub fn cmd_request(args: &[String], ctx: &ResolveContext) -> Result<String, String> {
    let spec = load_spec(args, "request <spec> [values...]")?;
    let submitted = &args[1..];
    let value = create_value_from_request(&spec, ctx, submitted).map_err(|err| err.to_string())?;
    Ok(match value {
        Some(value) => format!("parameter={}\nvalue={}", value.name, value.value),
        None => format!("parameter={}\nvalue={NONE_MARKER}", spec.name),
    })
}

pub fn cmd_encode(args: &[String]) -> Result<String, String> {
    let spec = load_spec(args, "encode <spec> <json>")?;
    let raw = args
        .get(1)
        .ok_or_else(|| "usage: choiceparam encode <spec> <json>".to_string())?;
    let submission: Value =
        serde_json::from_str(raw).map_err(|err| format!("invalid json submission: {err}"))?;
    let value = create_value_from_json(&spec, &submission);
    Ok(format!("parameter={}\nvalue={}", value.name, value.value))
}
