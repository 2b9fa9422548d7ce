//! Byte-level template operations
//!
//! Each operation decodes its input, optionally transforms the module and
//! re-encodes it. Modules are verified on the way in and on the way out, so
//! no operation returns bytes that would fail to decode.

use crate::constants::{Constant, ConstantType};
use crate::module::{Module, ModuleError};
use crate::patch::{replace_constant, PatchError};
use crate::rename::{rename_identifiers, RenameError};
use crate::verify::{verify_module, VerifyError};
use thiserror::Error;
use tracing::debug;

/// Errors returned by the template operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Input is not a well-formed module
    #[error(transparent)]
    Format(#[from] ModuleError),

    /// Module violates a structural invariant
    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// Identifier rename rejected
    #[error(transparent)]
    Rename(#[from] RenameError),

    /// Constant patch rejected
    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Version of this library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Decode and verify a module
pub fn deserialize(bytes: &[u8]) -> Result<Module, TemplateError> {
    let module = Module::decode(bytes)?;
    verify_module(&module)?;
    debug!(
        version = module.version,
        tables = module.table_order.len(),
        bytes = bytes.len(),
        "decoded module"
    );
    Ok(module)
}

/// Verify and encode a module
pub fn serialize(module: &Module) -> Result<Vec<u8>, TemplateError> {
    verify_module(module)?;
    Ok(module.encode())
}

/// Rename identifiers in an encoded module
///
/// See [`rename_identifiers`] for the mapping semantics.
pub fn update_identifiers<I, K, V>(bytes: &[u8], mapping: I) -> Result<Vec<u8>, TemplateError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let module = deserialize(bytes)?;
    let renamed = rename_identifiers(&module, mapping)?;
    serialize(&renamed)
}

/// List the constant pool of an encoded module
pub fn get_constants(bytes: &[u8]) -> Result<Vec<Constant>, TemplateError> {
    Ok(deserialize(bytes)?.constant_pool)
}

/// Replace one constant in an encoded module
///
/// `expected_type_tag` uses the textual form of [`ConstantType`], such as
/// `U8` or `Vector(U8)`. See [`replace_constant`] for the matching rules.
pub fn update_constants(
    bytes: &[u8],
    new_value: &[u8],
    expected_value: &[u8],
    expected_type_tag: &str,
) -> Result<Vec<u8>, TemplateError> {
    let expected_type: ConstantType = expected_type_tag.parse().map_err(PatchError::from)?;
    let module = deserialize(bytes)?;
    let (patched, _) = replace_constant(&module, new_value, expected_value, &expected_type)?;
    serialize(&patched)
}
