#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Resolve,
    Request,
    Encode,
    Hierarchy,
    Validate,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "resolve" => CliVerb::Resolve,
        "request" => CliVerb::Request,
        "encode" => CliVerb::Encode,
        "hierarchy" => CliVerb::Hierarchy,
        "validate" => CliVerb::Validate,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Usage: choiceparam <command> <parameter.yaml> [args]".to_string(),
        String::new(),
        "Commands:".to_string(),
        "  resolve <spec> [--default]           Print the effective value (or default)"
            .to_string(),
        "  request <spec> [values...]           Build the value from plain submitted values"
            .to_string(),
        "  encode <spec> <json>                 Encode a JSON submission (string or array)"
            .to_string(),
        "  hierarchy <spec> [--ids|--collapsed] Print the multi-level dropdown choices"
            .to_string(),
        "  validate <spec>                      Run configuration checks for value and default"
            .to_string(),
        "  help                                 Show this help".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
