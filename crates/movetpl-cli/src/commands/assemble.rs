//! `movetpl assemble`: rebuild a compiled module from its JSON dump.

use super::write_module;
use anyhow::Context;
use movetpl_bytecode::{serialize, Module};
use std::path::Path;

pub fn execute(input: &Path, output: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let module: Module = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse module JSON {}", input.display()))?;
    let bytes = serialize(&module).context("Module JSON describes an invalid module")?;
    write_module(output, &bytes)?;
    println!("Assembled {} bytes -> {}", bytes.len(), output.display());
    Ok(())
}
