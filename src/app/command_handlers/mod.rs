use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use crate::parameter::ParameterSpec;
use crate::resolve::ResolveContext;
use std::path::Path;

pub mod hierarchy;
pub mod parameter;
pub mod validate;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    run_cli_with_context(args, &ResolveContext::default())
}

pub fn run_cli_with_context(args: Vec<String>, ctx: &ResolveContext) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Resolve => parameter::cmd_resolve(&args[1..], ctx),
        CliVerb::Request => parameter::cmd_request(&args[1..], ctx),
        CliVerb::Encode => parameter::cmd_encode(&args[1..]),
        CliVerb::Hierarchy => hierarchy::cmd_hierarchy(&args[1..]),
        CliVerb::Validate => validate::cmd_validate(&args[1..], ctx),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}

pub(crate) fn load_spec(args: &[String], usage: &str) -> Result<ParameterSpec, String> {
    let path = args
        .first()
        .ok_or_else(|| format!("usage: choiceparam {usage}"))?;
    ParameterSpec::from_path(Path::new(path)).map_err(|err| err.to_string())
}
