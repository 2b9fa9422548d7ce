//! `movetpl version`: print the bytecode library version.

pub fn execute() -> anyhow::Result<()> {
    println!("movetpl-bytecode {}", movetpl_bytecode::version());
    Ok(())
}
