//! `movetpl apply`: run a TOML patch plan against a template module.
//!
//! Renames run first, then constant patches in plan order. Everything is
//! applied to the decoded module in memory and the output file is only
//! written when every step succeeded.

use super::{read_module, write_module};
use crate::plan::PatchPlan;
use anyhow::Context;
use movetpl_bytecode::{deserialize, rename_identifiers, replace_constant, serialize};
use std::path::Path;
use tracing::info;

pub fn execute(input: &Path, plan_path: &Path, output: &Path) -> anyhow::Result<()> {
    let plan = PatchPlan::from_file(plan_path)
        .with_context(|| format!("Failed to load plan {}", plan_path.display()))?;
    let bytes = read_module(input)?;
    let mut module =
        deserialize(&bytes).with_context(|| format!("Failed to decode {}", input.display()))?;

    if !plan.renames.is_empty() {
        module = rename_identifiers(&module, &plan.renames).context("Rename step failed")?;
        info!(count = plan.renames.len(), "applied renames");
    }

    for (step, patch) in plan.constants.iter().enumerate() {
        let constant_type = patch.constant_type()?;
        let (patched, index) =
            replace_constant(&module, &patch.new, &patch.expected, &constant_type)
                .with_context(|| format!("Constant patch {step} failed"))?;
        info!(step, index, type_tag = %constant_type, "applied constant patch");
        module = patched;
    }

    let patched = serialize(&module)?;
    write_module(output, &patched)?;
    println!(
        "Applied {} rename(s) and {} constant patch(es) -> {}",
        plan.renames.len(),
        plan.constants.len(),
        output.display()
    );
    Ok(())
}
