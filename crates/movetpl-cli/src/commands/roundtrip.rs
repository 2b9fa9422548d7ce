//! `movetpl roundtrip`: check that decoding then encoding reproduces the input.

use super::read_module;
use crate::output::StyledOutput;
use anyhow::{bail, Context};
use movetpl_bytecode::{deserialize, serialize};
use std::path::Path;
use termcolor::ColorChoice;

pub fn execute(path: &Path, color: ColorChoice) -> anyhow::Result<()> {
    let bytes = read_module(path)?;
    let module =
        deserialize(&bytes).with_context(|| format!("Failed to decode {}", path.display()))?;
    let reencoded = serialize(&module)?;

    let mut out = StyledOutput::new(color);
    if reencoded == bytes {
        out.success("ok");
        out.plain(&format!(" {} ({} bytes)", path.display(), bytes.len()));
        out.newline();
        out.flush();
        return Ok(());
    }

    let first_difference = bytes
        .iter()
        .zip(&reencoded)
        .position(|(a, b)| a != b)
        .unwrap_or(bytes.len().min(reencoded.len()));
    out.error("mismatch");
    out.plain(&format!(" {}", path.display()));
    out.newline();
    out.flush();
    bail!(
        "re-encoded module differs at byte {} ({} bytes in, {} bytes out)",
        first_difference,
        bytes.len(),
        reencoded.len()
    )
}
