//! `movetpl patch-constant`: swap one constant value.

use super::{read_module, write_module};
use anyhow::Context;
use movetpl_bytecode::update_constants;
use std::path::Path;

/// Constant value bytes given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

/// Parse a hex byte string, with or without a `0x` prefix.
pub fn parse_hex(arg: &str) -> Result<HexBytes, String> {
    let digits = arg
        .strip_prefix("0x")
        .or_else(|| arg.strip_prefix("0X"))
        .unwrap_or(arg);
    hex::decode(digits)
        .map(HexBytes)
        .map_err(|e| format!("invalid hex '{arg}': {e}"))
}

pub fn execute(
    input: &Path,
    output: &Path,
    type_tag: &str,
    expected: &[u8],
    new: &[u8],
) -> anyhow::Result<()> {
    let bytes = read_module(input)?;
    let patched = update_constants(&bytes, new, expected, type_tag)
        .with_context(|| format!("Failed to patch constant in {}", input.display()))?;
    write_module(output, &patched)?;
    println!(
        "Patched {type_tag} constant 0x{} -> 0x{} -> {}",
        hex::encode(expected),
        hex::encode(new),
        output.display()
    );
    Ok(())
}
