//! `movetpl constants`: list the constant pool.

use super::read_module;
use crate::output::StyledOutput;
use anyhow::Context;
use movetpl_bytecode::get_constants;
use std::path::Path;
use termcolor::ColorChoice;

pub fn execute(path: &Path, json: bool, color: ColorChoice) -> anyhow::Result<()> {
    let bytes = read_module(path)?;
    let constants =
        get_constants(&bytes).with_context(|| format!("Failed to decode {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&constants)?);
        return Ok(());
    }

    let mut out = StyledOutput::new(color);
    for (index, constant) in constants.iter().enumerate() {
        out.plain(&format!("{index:>3}  "));
        out.info(&format!("{:<12}", constant.type_tag.to_string()));
        out.plain(&format!(" {:<32}", hex::encode(&constant.value)));
        if let Ok(value) = constant.decode_value() {
            out.plain(&format!(" {value}"));
        }
        out.newline();
    }
    out.flush();
    Ok(())
}
