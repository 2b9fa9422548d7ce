//! Move bytecode module codec and patcher
//!
//! This crate reads and writes compiled Move modules with a byte-exact
//! round trip, and patches them structurally: renaming identifiers and
//! swapping constant values without recompiling.
//!
//! ```no_run
//! # fn main() -> Result<(), movetpl_bytecode::TemplateError> {
//! let template = std::fs::read("coin_template.mv").unwrap();
//! let renamed = movetpl_bytecode::update_identifiers(&template, [("TMPL", "MCN")])?;
//! let patched = movetpl_bytecode::update_constants(&renamed, &[3], &[6], "U8")?;
//! # let _ = patched;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod constants;
pub mod encoder;
pub mod identifier;
pub mod index;
pub mod module;
pub mod opcode;
pub mod patch;
pub mod rename;
pub mod signature;
pub mod template;
pub mod verify;

pub use constants::{Constant, ConstantError, ConstantType, ConstantValue};
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use identifier::{is_valid_identifier, Identifier, InvalidIdentifier};
pub use module::{Module, ModuleError, TableEntry, TableKind};
pub use opcode::{Bytecode, Opcode};
pub use patch::{replace_constant, PatchError};
pub use rename::{rename_identifiers, RenameError};
pub use signature::{AbilitySet, Signature, SignatureToken};
pub use template::{
    deserialize, get_constants, serialize, update_constants, update_identifiers, version,
    TemplateError,
};
pub use verify::{verify_module, VerifyError};
