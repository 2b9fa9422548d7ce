//! `movetpl rename`: rename identifiers in a module.

use super::{read_module, write_module};
use anyhow::Context;
use movetpl_bytecode::update_identifiers;
use std::path::Path;

/// Parse an `Old=New` rename argument.
pub fn parse_mapping(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((old, new)) if !old.is_empty() && !new.is_empty() => {
            Ok((old.to_string(), new.to_string()))
        }
        _ => Err(format!("expected OLD=NEW, got '{arg}'")),
    }
}

pub fn execute(input: &Path, output: &Path, mappings: &[(String, String)]) -> anyhow::Result<()> {
    let bytes = read_module(input)?;
    let pairs = mappings.iter().map(|(old, new)| (old.as_str(), new.as_str()));
    let renamed = update_identifiers(&bytes, pairs)
        .with_context(|| format!("Failed to rename identifiers in {}", input.display()))?;
    write_module(output, &renamed)?;
    println!("Renamed {} identifier(s) -> {}", mappings.len(), output.display());
    Ok(())
}
