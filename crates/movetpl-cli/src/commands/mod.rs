//! Subcommand implementations.

pub mod apply;
pub mod assemble;
pub mod constants;
pub mod inspect;
pub mod patch_constant;
pub mod rename;
pub mod roundtrip;
pub mod version;

use anyhow::Context;
use std::path::Path;
use tracing::info;

/// Read a compiled module from disk.
pub fn read_module(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read module {}", path.display()))
}

/// Write a patched module to disk.
pub fn write_module(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write module {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote module");
    Ok(())
}
