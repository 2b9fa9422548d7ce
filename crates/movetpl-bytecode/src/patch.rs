//! Constant compare-and-swap

use crate::constants::{ConstantError, ConstantType};
use crate::module::Module;
use thiserror::Error;
use tracing::debug;

/// Constant patching errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// No pool entry has the expected type and value
    #[error("No {type_tag} constant with value 0x{expected}")]
    ConstantNotFound {
        /// Expected type
        type_tag: ConstantType,
        /// Expected value, hex encoded
        expected: String,
    },

    /// Replacement value or type tag rejected
    #[error(transparent)]
    Constant(#[from] ConstantError),
}

/// Replace the value of the first constant matching `expected_type` and
/// `expected_value`
///
/// Returns the patched module and the pool position that changed. The type
/// tag of the entry is kept; the new value may have a different length.
pub fn replace_constant(
    module: &Module,
    new_value: &[u8],
    expected_value: &[u8],
    expected_type: &ConstantType,
) -> Result<(Module, usize), PatchError> {
    let position = module
        .constant_pool
        .iter()
        .position(|c| &c.type_tag == expected_type && c.value == expected_value)
        .ok_or_else(|| PatchError::ConstantNotFound {
            type_tag: expected_type.clone(),
            expected: hex::encode(expected_value),
        })?;

    expected_type.check_value(new_value)?;

    let mut patched = module.clone();
    patched.constant_pool[position].value = new_value.to_vec();
    debug!(
        index = position,
        type_tag = %expected_type,
        old = %hex::encode(expected_value),
        new = %hex::encode(new_value),
        "replaced constant"
    );
    Ok((patched, position))
}
