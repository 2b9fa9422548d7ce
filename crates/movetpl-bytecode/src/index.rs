//! Typed table indices
//!
//! Every cross-table reference in a module is a 16-bit position into one
//! specific pool. Each pool gets its own index newtype so a function handle
//! index cannot be passed where an identifier index is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_index {
    ($(#[$doc:meta])* $name:ident => $kind:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u16);

        impl $name {
            /// Create an index from its raw position
            pub const fn new(index: u16) -> Self {
                Self(index)
            }

            /// Position as a `usize`, for slice access
            pub fn into_index(self) -> usize {
                usize::from(self.0)
            }

            /// The pool this index points into
            pub const fn kind() -> IndexKind {
                IndexKind::$kind
            }
        }

        impl From<u16> for $name {
            fn from(index: u16) -> Self {
                Self(index)
            }
        }

        impl From<$name> for u16 {
            fn from(index: $name) -> Self {
                index.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_index!(
    /// Index into the module handle table
    ModuleHandleIndex => ModuleHandle
);
define_index!(
    /// Index into the struct handle table
    StructHandleIndex => StructHandle
);
define_index!(
    /// Index into the function handle table
    FunctionHandleIndex => FunctionHandle
);
define_index!(
    /// Index into the field handle table
    FieldHandleIndex => FieldHandle
);
define_index!(
    /// Index into the struct definition instantiation table
    StructDefInstantiationIndex => StructDefInstantiation
);
define_index!(
    /// Index into the function instantiation table
    FunctionInstantiationIndex => FunctionInstantiation
);
define_index!(
    /// Index into the field instantiation table
    FieldInstantiationIndex => FieldInstantiation
);
define_index!(
    /// Index into the identifier pool
    IdentifierIndex => Identifier
);
define_index!(
    /// Index into the address identifier pool
    AddressIdentifierIndex => AddressIdentifier
);
define_index!(
    /// Index into the constant pool
    ConstantPoolIndex => ConstantPool
);
define_index!(
    /// Index into the signature pool
    SignatureIndex => Signature
);
define_index!(
    /// Index into the struct definition table
    StructDefinitionIndex => StructDefinition
);

/// Instruction position inside a code unit
pub type CodeOffset = u16;
/// Local variable slot (parameters first, then declared locals)
pub type LocalIndex = u8;
/// Position of a type parameter in its enclosing generic declaration
pub type TypeParameterIndex = u16;
/// Field position inside a struct definition
pub type MemberCount = u16;

/// Names the pool an index refers to, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// Module handle table
    ModuleHandle,
    /// Struct handle table
    StructHandle,
    /// Function handle table
    FunctionHandle,
    /// Field handle table
    FieldHandle,
    /// Struct definition instantiation table
    StructDefInstantiation,
    /// Function instantiation table
    FunctionInstantiation,
    /// Field instantiation table
    FieldInstantiation,
    /// Identifier pool
    Identifier,
    /// Address identifier pool
    AddressIdentifier,
    /// Constant pool
    ConstantPool,
    /// Signature pool
    Signature,
    /// Struct definition table
    StructDefinition,
    /// Fields of a struct definition
    MemberCount,
    /// Instructions of a code unit
    CodeOffset,
    /// Parameters and locals of a function
    LocalPool,
    /// Generic parameters of the enclosing struct or function
    TypeParameter,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexKind::ModuleHandle => "module handle",
            IndexKind::StructHandle => "struct handle",
            IndexKind::FunctionHandle => "function handle",
            IndexKind::FieldHandle => "field handle",
            IndexKind::StructDefInstantiation => "struct instantiation",
            IndexKind::FunctionInstantiation => "function instantiation",
            IndexKind::FieldInstantiation => "field instantiation",
            IndexKind::Identifier => "identifier",
            IndexKind::AddressIdentifier => "address identifier",
            IndexKind::ConstantPool => "constant",
            IndexKind::Signature => "signature",
            IndexKind::StructDefinition => "struct definition",
            IndexKind::MemberCount => "field",
            IndexKind::CodeOffset => "code offset",
            IndexKind::LocalPool => "local",
            IndexKind::TypeParameter => "type parameter",
        };
        f.write_str(name)
    }
}
