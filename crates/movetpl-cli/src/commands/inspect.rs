//! `movetpl inspect`: summarize a compiled module or dump it as JSON.

use super::read_module;
use crate::output::StyledOutput;
use anyhow::Context;
use movetpl_bytecode::{deserialize, Module};
use sha2::{Digest, Sha256};
use std::path::Path;
use termcolor::ColorChoice;

const WIDTH: usize = 14;

pub fn execute(path: &Path, json: bool, color: ColorChoice) -> anyhow::Result<()> {
    let bytes = read_module(path)?;
    let module =
        deserialize(&bytes).with_context(|| format!("Failed to decode {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&module)?);
        return Ok(());
    }

    let mut out = StyledOutput::new(color);
    print_summary(&mut out, &module, &bytes);
    out.flush();
    Ok(())
}

fn print_summary(out: &mut StyledOutput, module: &Module, bytes: &[u8]) {
    let name = module.name().map_or("<unnamed>", |n| n.as_str());
    let address = module
        .address()
        .map_or_else(|| "<none>".to_string(), |a| a.to_string());

    out.field("Module", name, WIDTH);
    out.field("Address", &address, WIDTH);
    out.field("Version", &module.version.to_string(), WIDTH);
    out.field("Size", &format!("{} bytes", bytes.len()), WIDTH);
    out.field("SHA-256", &hex::encode(Sha256::digest(bytes)), WIDTH);
    out.newline();

    out.heading("Tables");
    for entry in module.table_layout() {
        out.plain(&format!(
            "  {:<24} offset {:>6}  length {:>6}  entries {:>4}",
            entry.kind.name(),
            entry.offset,
            entry.length,
            module.table_len(entry.kind)
        ));
        out.newline();
    }
    out.newline();

    out.heading("Definitions");
    for def in &module.struct_defs {
        let handle = &module.struct_handles[def.struct_handle.into_index()];
        let name = module.identifier_at(handle.name).map_or("?", |n| n.as_str());
        out.info("  struct ");
        out.plain(&format!("{name} ({} fields)", def.fields().len()));
        out.newline();
    }
    for def in &module.function_defs {
        let handle = &module.function_handles[def.function.into_index()];
        let name = module.identifier_at(handle.name).map_or("?", |n| n.as_str());
        out.info("  fun ");
        out.plain(name);
        if def.is_native() {
            out.plain(" (native)");
        }
        out.newline();
    }
}
