use super::load_spec;
use crate::hierarchy::build_choice_hierarchy;

pub fn cmd_hierarchy(args: &[String]) -> Result<String, String> {
    let spec = load_spec(args, "hierarchy <spec> [--ids|--collapsed]")?;
    let hierarchy = build_choice_hierarchy(&spec).map_err(|err| err.to_string())?;

    match args.get(1).map(String::as_str) {
        Some("--ids") => Ok(hierarchy.dropdown_ids()),
        Some("--collapsed") => Ok(hierarchy
            .collapsed()
            .iter()
            .map(|(id, choices)| format!("{id}={choices}"))
            .collect::<Vec<_>>()
            .join("\n")),
        None => serde_json::to_string_pretty(hierarchy.choices())
            .map_err(|err| format!("failed to encode hierarchy: {err}")),
        Some(other) => Err(format!("unknown hierarchy option `{other}`")),
    }
}
