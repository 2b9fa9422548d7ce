//! Bytecode module format
//!
//! A module file is a header followed by a table directory and the table
//! bodies:
//!
//! ```text
//! magic        4 bytes    a1 1c eb 0b
//! version      u32 LE
//! table count  ULEB128
//! directory    (kind: u8, offset: ULEB128, length: ULEB128) per table
//! bodies       concatenated in directory order, offsets relative to the first body
//! self index   ULEB128 module handle index of the module itself
//! ```
//!
//! Table bodies carry no element count; a body is decoded element by element
//! until its byte range is used up.

use crate::constants::{Constant, ADDRESS_LENGTH};
use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use crate::identifier::Identifier;
use crate::index::{
    AddressIdentifierIndex, FieldHandleIndex, FunctionHandleIndex, IdentifierIndex, MemberCount,
    ModuleHandleIndex, SignatureIndex, StructDefinitionIndex, StructHandleIndex,
};
use crate::opcode::Bytecode;
use crate::signature::{AbilitySet, Signature, SignatureToken};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// Magic number for Move bytecode files
pub const MAGIC: [u8; 4] = [0xA1, 0x1C, 0xEB, 0x0B];

/// Bytecode version 5
pub const VERSION_5: u32 = 5;
/// Bytecode version 6: adds `u16`, `u32` and `u256`
pub const VERSION_6: u32 = 6;
/// Oldest supported version
pub const VERSION_MIN: u32 = VERSION_5;
/// Newest supported version
pub const VERSION_MAX: u32 = VERSION_6;

/// Module encoding/decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    /// Decode error
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected a11ceb0b, got {}", hex::encode(.0))]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported version: {0} (supported: {VERSION_MIN}..={VERSION_MAX})")]
    UnsupportedVersion(u32),

    /// Directory entry with an unknown table kind
    #[error("Unknown table kind {kind:#04x} at offset {offset}")]
    UnknownTableKind {
        /// The rejected kind byte
        kind: u8,
        /// Offset of the directory entry
        offset: usize,
    },

    /// Same table kind listed twice
    #[error("Duplicate table: {0}")]
    DuplicateTable(TableKind),

    /// Table body that does not start where the previous one ended
    #[error("Table {kind} should start at {expected}, directory says {offset}")]
    NonContiguousTable {
        /// The misplaced table
        kind: TableKind,
        /// Where the table must start
        expected: u64,
        /// Where the directory says it starts
        offset: u64,
    },

    /// Table body that extends past the end of the input
    #[error("Table {kind} at {offset}+{length} extends past the end of the module")]
    TableOutOfBounds {
        /// The offending table
        kind: TableKind,
        /// Body offset, relative to the first body
        offset: u64,
        /// Body length
        length: u64,
    },

    /// Bytes after the self module handle index
    #[error("Trailing bytes after module end at offset {0}")]
    TrailingBytes(usize),
}

/// Kind of a table, as tagged in the directory
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableKind {
    /// Module handles
    ModuleHandles = 0x01,
    /// Struct handles
    StructHandles = 0x02,
    /// Function handles
    FunctionHandles = 0x03,
    /// Function instantiations
    FunctionInstantiations = 0x04,
    /// Signatures
    Signatures = 0x05,
    /// Constant pool
    ConstantPool = 0x06,
    /// Identifiers
    Identifiers = 0x07,
    /// Address identifiers
    AddressIdentifiers = 0x08,
    /// Struct definitions
    StructDefinitions = 0x0A,
    /// Struct definition instantiations
    StructDefInstantiations = 0x0B,
    /// Function definitions
    FunctionDefinitions = 0x0C,
    /// Field handles
    FieldHandles = 0x0D,
    /// Field instantiations
    FieldInstantiations = 0x0E,
    /// Friend declarations
    FriendDecls = 0x0F,
    /// Metadata entries
    Metadata = 0x10,
}

impl TableKind {
    /// Order the writer uses for tables that have no recorded directory slot
    pub const CANONICAL_ORDER: [TableKind; 15] = [
        TableKind::ModuleHandles,
        TableKind::StructHandles,
        TableKind::FunctionHandles,
        TableKind::FunctionInstantiations,
        TableKind::Signatures,
        TableKind::Identifiers,
        TableKind::AddressIdentifiers,
        TableKind::ConstantPool,
        TableKind::Metadata,
        TableKind::StructDefinitions,
        TableKind::StructDefInstantiations,
        TableKind::FunctionDefinitions,
        TableKind::FieldHandles,
        TableKind::FieldInstantiations,
        TableKind::FriendDecls,
    ];

    /// Convert a directory byte to a table kind
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::CANONICAL_ORDER
            .iter()
            .copied()
            .find(|kind| *kind as u8 == byte)
    }

    /// Human-readable table name
    pub fn name(self) -> &'static str {
        match self {
            TableKind::ModuleHandles => "module handles",
            TableKind::StructHandles => "struct handles",
            TableKind::FunctionHandles => "function handles",
            TableKind::FunctionInstantiations => "function instantiations",
            TableKind::Signatures => "signatures",
            TableKind::ConstantPool => "constant pool",
            TableKind::Identifiers => "identifiers",
            TableKind::AddressIdentifiers => "address identifiers",
            TableKind::StructDefinitions => "struct definitions",
            TableKind::StructDefInstantiations => "struct instantiations",
            TableKind::FunctionDefinitions => "function definitions",
            TableKind::FieldHandles => "field handles",
            TableKind::FieldInstantiations => "field instantiations",
            TableKind::FriendDecls => "friend declarations",
            TableKind::Metadata => "metadata",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Table kind
    pub kind: TableKind,
    /// Body offset, relative to the first body
    pub offset: u32,
    /// Body length in bytes
    pub length: u32,
}

/// A 32-byte account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountAddress(#[serde(with = "hex::serde")] pub [u8; ADDRESS_LENGTH]);

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Reference to a module: its address and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleHandle {
    /// Address the module is published at
    pub address: AddressIdentifierIndex,
    /// Module name
    pub name: IdentifierIndex,
}

impl ModuleHandle {
    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            address: AddressIdentifierIndex(reader.read_index()?),
            name: IdentifierIndex(reader.read_index()?),
        })
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_uleb128(u64::from(self.address.0));
        writer.emit_uleb128(u64::from(self.name.0));
    }
}

/// Type parameter of a struct handle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructTypeParameter {
    /// Abilities required of the type argument
    pub constraints: AbilitySet,
    /// Parameter is only used in phantom positions
    pub is_phantom: bool,
}

/// Reference to a struct declared in this or another module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructHandle {
    /// Declaring module
    pub module: ModuleHandleIndex,
    /// Struct name
    pub name: IdentifierIndex,
    /// Abilities of the struct
    pub abilities: AbilitySet,
    /// Generic parameters
    pub type_parameters: Vec<StructTypeParameter>,
}

impl StructHandle {
    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let module = ModuleHandleIndex(reader.read_index()?);
        let name = IdentifierIndex(reader.read_index()?);
        let abilities = AbilitySet::decode(reader)?;
        let count = reader.read_count()?;
        let mut type_parameters = Vec::with_capacity(count);
        for _ in 0..count {
            type_parameters.push(StructTypeParameter {
                constraints: AbilitySet::decode(reader)?,
                is_phantom: reader.read_bool("phantom flag")?,
            });
        }
        Ok(Self {
            module,
            name,
            abilities,
            type_parameters,
        })
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_uleb128(u64::from(self.module.0));
        writer.emit_uleb128(u64::from(self.name.0));
        writer.emit_u8(self.abilities.into_u8());
        writer.emit_len(self.type_parameters.len());
        for param in &self.type_parameters {
            writer.emit_u8(param.constraints.into_u8());
            writer.emit_u8(u8::from(param.is_phantom));
        }
    }
}

/// Reference to a function declared in this or another module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionHandle {
    /// Declaring module
    pub module: ModuleHandleIndex,
    /// Function name
    pub name: IdentifierIndex,
    /// Parameter types
    pub parameters: SignatureIndex,
    /// Return types
    #[serde(rename = "return")]
    pub return_: SignatureIndex,
    /// Ability constraints of the generic parameters
    pub type_parameters: Vec<AbilitySet>,
}

impl FunctionHandle {
    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let module = ModuleHandleIndex(reader.read_index()?);
        let name = IdentifierIndex(reader.read_index()?);
        let parameters = SignatureIndex(reader.read_index()?);
        let return_ = SignatureIndex(reader.read_index()?);
        let count = reader.read_count()?;
        let mut type_parameters = Vec::with_capacity(count);
        for _ in 0..count {
            type_parameters.push(AbilitySet::decode(reader)?);
        }
        Ok(Self {
            module,
            name,
            parameters,
            return_,
            type_parameters,
        })
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_uleb128(u64::from(self.module.0));
        writer.emit_uleb128(u64::from(self.name.0));
        writer.emit_uleb128(u64::from(self.parameters.0));
        writer.emit_uleb128(u64::from(self.return_.0));
        writer.emit_len(self.type_parameters.len());
        for abilities in &self.type_parameters {
            writer.emit_u8(abilities.into_u8());
        }
    }
}

/// A field of a struct definition, addressed by position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldHandle {
    /// Struct definition holding the field
    pub owner: StructDefinitionIndex,
    /// Position of the field in the struct
    pub field: MemberCount,
}

impl FieldHandle {
    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            owner: StructDefinitionIndex(reader.read_index()?),
            field: reader.read_index()?,
        })
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_uleb128(u64::from(self.owner.0));
        writer.emit_uleb128(u64::from(self.field));
    }
}

/// A generic handle paired with the signature of its type arguments
///
/// Used for struct definition, function and field instantiations, which all
/// share this layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instantiation<I> {
    /// The generic item
    pub handle: I,
    /// Type arguments
    pub type_parameters: SignatureIndex,
}

/// Generic struct definition applied to type arguments
pub type StructDefInstantiation = Instantiation<StructDefinitionIndex>;
/// Generic function applied to type arguments
pub type FunctionInstantiation = Instantiation<FunctionHandleIndex>;
/// Field of a generic struct applied to type arguments
pub type FieldInstantiation = Instantiation<FieldHandleIndex>;

impl<I: From<u16> + Copy + Into<u16>> Instantiation<I> {
    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            handle: I::from(reader.read_index()?),
            type_parameters: SignatureIndex(reader.read_index()?),
        })
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_uleb128(u64::from(self.handle.into()));
        writer.emit_uleb128(u64::from(self.type_parameters.0));
    }
}

/// A declared field: name and type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name
    pub name: IdentifierIndex,
    /// Field type
    pub signature: SignatureToken,
}

/// Field layout of a struct definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructFieldInformation {
    /// Fields provided by the runtime
    Native,
    /// Fields declared in the module
    Declared(Vec<FieldDefinition>),
}

/// Struct field-information tags
mod field_info {
    pub const NATIVE: u8 = 0x01;
    pub const DECLARED: u8 = 0x02;
}

/// A struct declared in this module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructDefinition {
    /// Handle naming the struct
    pub struct_handle: StructHandleIndex,
    /// Field layout
    pub field_information: StructFieldInformation,
}

impl StructDefinition {
    /// Declared fields, empty for native structs
    pub fn fields(&self) -> &[FieldDefinition] {
        match &self.field_information {
            StructFieldInformation::Native => &[],
            StructFieldInformation::Declared(fields) => fields,
        }
    }

    fn decode(reader: &mut BytecodeReader<'_>, version: u32) -> Result<Self, DecodeError> {
        let struct_handle = StructHandleIndex(reader.read_index()?);
        let offset = reader.offset();
        let field_information = match reader.read_u8()? {
            field_info::NATIVE => StructFieldInformation::Native,
            field_info::DECLARED => {
                let count = reader.read_count()?;
                let mut fields = Vec::with_capacity(count);
                for _ in 0..count {
                    fields.push(FieldDefinition {
                        name: IdentifierIndex(reader.read_index()?),
                        signature: SignatureToken::decode(reader, version)?,
                    });
                }
                StructFieldInformation::Declared(fields)
            }
            value => {
                return Err(DecodeError::InvalidTag {
                    what: "struct field information",
                    value,
                    offset,
                })
            }
        };
        Ok(Self {
            struct_handle,
            field_information,
        })
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_uleb128(u64::from(self.struct_handle.0));
        match &self.field_information {
            StructFieldInformation::Native => writer.emit_u8(field_info::NATIVE),
            StructFieldInformation::Declared(fields) => {
                writer.emit_u8(field_info::DECLARED);
                writer.emit_len(fields.len());
                for field in fields {
                    writer.emit_uleb128(u64::from(field.name.0));
                    field.signature.encode(writer);
                }
            }
        }
    }
}

/// Function visibility
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Callable only from the declaring module
    Private = 0x00,
    /// Callable from any module
    Public = 0x01,
    /// Callable from friend modules
    Friend = 0x03,
}

impl Visibility {
    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let offset = reader.offset();
        match reader.read_u8()? {
            0x00 => Ok(Visibility::Private),
            0x01 => Ok(Visibility::Public),
            0x03 => Ok(Visibility::Friend),
            value => Err(DecodeError::InvalidTag {
                what: "visibility",
                value,
                offset,
            }),
        }
    }
}

/// Function definition flags
pub mod function_flags {
    /// Function has no body
    pub const NATIVE: u8 = 0x2;
    /// Function can be called as a transaction entry point
    pub const ENTRY: u8 = 0x4;
}

/// Body of a non-native function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeUnit {
    /// Signature of the locals declared after the parameters
    pub locals: SignatureIndex,
    /// Instruction stream
    pub code: Vec<Bytecode>,
}

/// A function declared in this module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Handle naming the function
    pub function: FunctionHandleIndex,
    /// Who may call the function
    pub visibility: Visibility,
    /// Transaction entry point
    pub is_entry: bool,
    /// Resources the function accesses in global storage
    pub acquires_global_resources: Vec<StructDefinitionIndex>,
    /// `None` for native functions
    pub code: Option<CodeUnit>,
}

impl FunctionDefinition {
    /// Whether the function has no body
    pub fn is_native(&self) -> bool {
        self.code.is_none()
    }

    fn decode(reader: &mut BytecodeReader<'_>, version: u32) -> Result<Self, DecodeError> {
        let function = FunctionHandleIndex(reader.read_index()?);
        let visibility = Visibility::decode(reader)?;

        let offset = reader.offset();
        let flags = reader.read_u8()?;
        if flags & !(function_flags::NATIVE | function_flags::ENTRY) != 0 {
            return Err(DecodeError::InvalidTag {
                what: "function flags",
                value: flags,
                offset,
            });
        }

        let count = reader.read_count()?;
        let mut acquires_global_resources = Vec::with_capacity(count);
        for _ in 0..count {
            acquires_global_resources.push(StructDefinitionIndex(reader.read_index()?));
        }

        let code = if flags & function_flags::NATIVE != 0 {
            None
        } else {
            let locals = SignatureIndex(reader.read_index()?);
            let count = reader.read_count()?;
            let mut code = Vec::with_capacity(count);
            for _ in 0..count {
                code.push(Bytecode::decode(reader, version)?);
            }
            Some(CodeUnit { locals, code })
        };

        Ok(Self {
            function,
            visibility,
            is_entry: flags & function_flags::ENTRY != 0,
            acquires_global_resources,
            code,
        })
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_uleb128(u64::from(self.function.0));
        writer.emit_u8(self.visibility as u8);

        let mut flags = 0;
        if self.is_native() {
            flags |= function_flags::NATIVE;
        }
        if self.is_entry {
            flags |= function_flags::ENTRY;
        }
        writer.emit_u8(flags);

        writer.emit_len(self.acquires_global_resources.len());
        for def in &self.acquires_global_resources {
            writer.emit_uleb128(u64::from(def.0));
        }

        if let Some(unit) = &self.code {
            writer.emit_uleb128(u64::from(unit.locals.0));
            writer.emit_len(unit.code.len());
            for instr in &unit.code {
                instr.encode(writer);
            }
        }
    }
}

/// Key/value metadata attached to a module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    /// Entry key
    #[serde(with = "hex::serde")]
    pub key: Vec<u8>,
    /// Entry value
    #[serde(with = "hex::serde")]
    pub value: Vec<u8>,
}

impl Metadata {
    fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            key: reader.read_byte_string()?,
            value: reader.read_byte_string()?,
        })
    }

    fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_byte_string(&self.key);
        writer.emit_byte_string(&self.value);
    }
}

/// A compiled Move module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Magic number (must be [`MAGIC`])
    #[serde(with = "hex::serde")]
    pub magic: [u8; 4],
    /// Bytecode version
    pub version: u32,
    /// Directory order of the decoded tables
    #[serde(default)]
    pub table_order: Vec<TableKind>,
    /// Module handles
    #[serde(default)]
    pub module_handles: Vec<ModuleHandle>,
    /// Struct handles
    #[serde(default)]
    pub struct_handles: Vec<StructHandle>,
    /// Function handles
    #[serde(default)]
    pub function_handles: Vec<FunctionHandle>,
    /// Field handles
    #[serde(default)]
    pub field_handles: Vec<FieldHandle>,
    /// Friend declarations
    #[serde(default)]
    pub friend_decls: Vec<ModuleHandle>,
    /// Struct definition instantiations
    #[serde(default)]
    pub struct_def_instantiations: Vec<StructDefInstantiation>,
    /// Function instantiations
    #[serde(default)]
    pub function_instantiations: Vec<FunctionInstantiation>,
    /// Field instantiations
    #[serde(default)]
    pub field_instantiations: Vec<FieldInstantiation>,
    /// Signature pool
    #[serde(default)]
    pub signatures: Vec<Signature>,
    /// Identifier pool
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
    /// Address pool
    #[serde(default)]
    pub address_identifiers: Vec<AccountAddress>,
    /// Constant pool
    #[serde(default)]
    pub constant_pool: Vec<Constant>,
    /// Metadata entries
    #[serde(default)]
    pub metadata: Vec<Metadata>,
    /// Struct definitions
    #[serde(default)]
    pub struct_defs: Vec<StructDefinition>,
    /// Function definitions
    #[serde(default)]
    pub function_defs: Vec<FunctionDefinition>,
    /// Module handle naming this module
    pub self_module_handle_idx: ModuleHandleIndex,
}

impl Module {
    /// Create a new empty module
    pub fn new(version: u32) -> Self {
        Self {
            magic: MAGIC,
            version,
            table_order: Vec::new(),
            module_handles: Vec::new(),
            struct_handles: Vec::new(),
            function_handles: Vec::new(),
            field_handles: Vec::new(),
            friend_decls: Vec::new(),
            struct_def_instantiations: Vec::new(),
            function_instantiations: Vec::new(),
            field_instantiations: Vec::new(),
            signatures: Vec::new(),
            identifiers: Vec::new(),
            address_identifiers: Vec::new(),
            constant_pool: Vec::new(),
            metadata: Vec::new(),
            struct_defs: Vec::new(),
            function_defs: Vec::new(),
            self_module_handle_idx: ModuleHandleIndex(0),
        }
    }

    /// Look up an identifier by index
    pub fn identifier_at(&self, idx: IdentifierIndex) -> Option<&Identifier> {
        self.identifiers.get(idx.into_index())
    }

    /// Name of this module, if the self handle resolves
    pub fn name(&self) -> Option<&Identifier> {
        let handle = self
            .module_handles
            .get(self.self_module_handle_idx.into_index())?;
        self.identifier_at(handle.name)
    }

    /// Address of this module, if the self handle resolves
    pub fn address(&self) -> Option<&AccountAddress> {
        let handle = self
            .module_handles
            .get(self.self_module_handle_idx.into_index())?;
        self.address_identifiers.get(handle.address.into_index())
    }

    /// Number of elements in a table
    pub fn table_len(&self, kind: TableKind) -> usize {
        match kind {
            TableKind::ModuleHandles => self.module_handles.len(),
            TableKind::StructHandles => self.struct_handles.len(),
            TableKind::FunctionHandles => self.function_handles.len(),
            TableKind::FunctionInstantiations => self.function_instantiations.len(),
            TableKind::Signatures => self.signatures.len(),
            TableKind::ConstantPool => self.constant_pool.len(),
            TableKind::Identifiers => self.identifiers.len(),
            TableKind::AddressIdentifiers => self.address_identifiers.len(),
            TableKind::StructDefinitions => self.struct_defs.len(),
            TableKind::StructDefInstantiations => self.struct_def_instantiations.len(),
            TableKind::FunctionDefinitions => self.function_defs.len(),
            TableKind::FieldHandles => self.field_handles.len(),
            TableKind::FieldInstantiations => self.field_instantiations.len(),
            TableKind::FriendDecls => self.friend_decls.len(),
            TableKind::Metadata => self.metadata.len(),
        }
    }

    /// Tables in the order the writer emits them
    ///
    /// Recorded directory order first, then any non-empty table without a
    /// recorded slot in canonical order.
    pub fn emission_order(&self) -> Vec<TableKind> {
        let mut order: Vec<TableKind> = Vec::with_capacity(TableKind::CANONICAL_ORDER.len());
        for kind in &self.table_order {
            if !order.contains(kind) {
                order.push(*kind);
            }
        }
        for kind in TableKind::CANONICAL_ORDER {
            if !order.contains(&kind) && self.table_len(kind) > 0 {
                order.push(kind);
            }
        }
        order
    }

    /// The directory the writer would emit for the current content
    pub fn table_layout(&self) -> Vec<TableEntry> {
        let mut offset = 0u32;
        self.encode_tables()
            .into_iter()
            .map(|(kind, body)| {
                let entry = TableEntry {
                    kind,
                    offset,
                    length: body.len() as u32,
                };
                offset += entry.length;
                entry
            })
            .collect()
    }

    fn encode_tables(&self) -> Vec<(TableKind, Vec<u8>)> {
        self.emission_order()
            .into_iter()
            .map(|kind| {
                let mut writer = BytecodeWriter::new();
                self.encode_table(kind, &mut writer);
                (kind, writer.into_bytes())
            })
            .collect()
    }

    fn encode_table(&self, kind: TableKind, writer: &mut BytecodeWriter) {
        match kind {
            TableKind::ModuleHandles => self.module_handles.iter().for_each(|h| h.encode(writer)),
            TableKind::StructHandles => self.struct_handles.iter().for_each(|h| h.encode(writer)),
            TableKind::FunctionHandles => {
                self.function_handles.iter().for_each(|h| h.encode(writer))
            }
            TableKind::FunctionInstantiations => self
                .function_instantiations
                .iter()
                .for_each(|i| i.encode(writer)),
            TableKind::Signatures => self.signatures.iter().for_each(|s| s.encode(writer)),
            TableKind::ConstantPool => self.constant_pool.iter().for_each(|c| c.encode(writer)),
            TableKind::Identifiers => self
                .identifiers
                .iter()
                .for_each(|ident| writer.emit_byte_string(ident.as_str().as_bytes())),
            TableKind::AddressIdentifiers => self
                .address_identifiers
                .iter()
                .for_each(|addr| writer.emit_bytes(&addr.0)),
            TableKind::StructDefinitions => self.struct_defs.iter().for_each(|d| d.encode(writer)),
            TableKind::StructDefInstantiations => self
                .struct_def_instantiations
                .iter()
                .for_each(|i| i.encode(writer)),
            TableKind::FunctionDefinitions => {
                self.function_defs.iter().for_each(|d| d.encode(writer))
            }
            TableKind::FieldHandles => self.field_handles.iter().for_each(|h| h.encode(writer)),
            TableKind::FieldInstantiations => self
                .field_instantiations
                .iter()
                .for_each(|i| i.encode(writer)),
            TableKind::FriendDecls => self.friend_decls.iter().for_each(|h| h.encode(writer)),
            TableKind::Metadata => self.metadata.iter().for_each(|m| m.encode(writer)),
        }
    }

    /// Encode module to binary format
    ///
    /// Directory offsets and lengths are recomputed from the current table
    /// content.
    pub fn encode(&self) -> Vec<u8> {
        let bodies = self.encode_tables();
        let body_len: usize = bodies.iter().map(|(_, body)| body.len()).sum();
        let mut writer = BytecodeWriter::with_capacity(body_len + 64);

        // Header
        writer.emit_bytes(&self.magic);
        writer.emit_u32(self.version);

        // Directory
        writer.emit_len(bodies.len());
        let mut offset = 0;
        for (kind, body) in &bodies {
            writer.emit_u8(*kind as u8);
            writer.emit_len(offset);
            writer.emit_len(body.len());
            offset += body.len();
        }

        // Bodies
        for (_, body) in &bodies {
            writer.emit_bytes(body);
        }

        writer.emit_uleb128(u64::from(self.self_module_handle_idx.0));
        writer.into_bytes()
    }

    /// Decode a module from binary format
    pub fn decode(data: &[u8]) -> Result<Self, ModuleError> {
        let mut reader = BytecodeReader::new(data);

        // Read header
        let magic: [u8; 4] = reader.read_array()?;
        if magic != MAGIC {
            return Err(ModuleError::InvalidMagic(magic));
        }

        let version = reader.read_u32()?;
        if !(VERSION_MIN..=VERSION_MAX).contains(&version) {
            return Err(ModuleError::UnsupportedVersion(version));
        }

        // Read directory
        let table_count = reader.read_count()?;
        let mut directory = Vec::with_capacity(table_count);
        let mut seen = HashSet::new();
        let mut expected_offset = 0u64;
        for _ in 0..table_count {
            let entry_offset = reader.offset();
            let byte = reader.read_u8()?;
            let kind = TableKind::from_u8(byte).ok_or(ModuleError::UnknownTableKind {
                kind: byte,
                offset: entry_offset,
            })?;
            if !seen.insert(kind) {
                return Err(ModuleError::DuplicateTable(kind));
            }
            let offset = reader.read_uleb128_bounded(u64::from(u32::MAX))?;
            let length = reader.read_uleb128_bounded(u64::from(u32::MAX))?;
            if offset != expected_offset {
                return Err(ModuleError::NonContiguousTable {
                    kind,
                    expected: expected_offset,
                    offset,
                });
            }
            expected_offset = offset + length;
            directory.push((kind, offset, length));
        }

        // Read table bodies
        let content_start = reader.position();
        let mut module = Module::new(version);
        module.magic = magic;
        for &(kind, offset, length) in &directory {
            let start = content_start as u64 + offset;
            let end = start + length;
            if end > data.len() as u64 {
                return Err(ModuleError::TableOutOfBounds {
                    kind,
                    offset,
                    length,
                });
            }
            trace!(table = %kind, offset, length, "decoding table");
            let body = &data[start as usize..end as usize];
            let mut table = BytecodeReader::with_base(body, start as usize);
            module.decode_table(kind, &mut table, version)?;
            module.table_order.push(kind);
        }

        // Self module handle follows the last body
        reader.seek(content_start + expected_offset as usize);
        module.self_module_handle_idx = ModuleHandleIndex(reader.read_index()?);
        if reader.has_more() {
            return Err(ModuleError::TrailingBytes(reader.offset()));
        }

        Ok(module)
    }

    fn decode_table(
        &mut self,
        kind: TableKind,
        reader: &mut BytecodeReader<'_>,
        version: u32,
    ) -> Result<(), DecodeError> {
        match kind {
            TableKind::ModuleHandles => self.module_handles = decode_all(reader, ModuleHandle::decode)?,
            TableKind::StructHandles => self.struct_handles = decode_all(reader, StructHandle::decode)?,
            TableKind::FunctionHandles => {
                self.function_handles = decode_all(reader, FunctionHandle::decode)?
            }
            TableKind::FunctionInstantiations => {
                self.function_instantiations = decode_all(reader, Instantiation::decode)?
            }
            TableKind::Signatures => {
                self.signatures = decode_all(reader, |r| Signature::decode(r, version))?
            }
            TableKind::ConstantPool => {
                self.constant_pool = decode_all(reader, |r| Constant::decode(r, version))?
            }
            TableKind::Identifiers => self.identifiers = decode_all(reader, decode_identifier)?,
            TableKind::AddressIdentifiers => {
                self.address_identifiers =
                    decode_all(reader, |r| Ok(AccountAddress(r.read_array()?)))?
            }
            TableKind::StructDefinitions => {
                self.struct_defs = decode_all(reader, |r| StructDefinition::decode(r, version))?
            }
            TableKind::StructDefInstantiations => {
                self.struct_def_instantiations = decode_all(reader, Instantiation::decode)?
            }
            TableKind::FunctionDefinitions => {
                self.function_defs = decode_all(reader, |r| FunctionDefinition::decode(r, version))?
            }
            TableKind::FieldHandles => self.field_handles = decode_all(reader, FieldHandle::decode)?,
            TableKind::FieldInstantiations => {
                self.field_instantiations = decode_all(reader, Instantiation::decode)?
            }
            TableKind::FriendDecls => self.friend_decls = decode_all(reader, ModuleHandle::decode)?,
            TableKind::Metadata => self.metadata = decode_all(reader, Metadata::decode)?,
        }
        Ok(())
    }
}

/// Decode elements until the table body is used up
fn decode_all<'a, T>(
    reader: &mut BytecodeReader<'a>,
    mut decode: impl FnMut(&mut BytecodeReader<'a>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let mut items = Vec::new();
    while reader.has_more() {
        items.push(decode(reader)?);
    }
    Ok(items)
}

fn decode_identifier(reader: &mut BytecodeReader<'_>) -> Result<Identifier, DecodeError> {
    let offset = reader.offset();
    let name = reader.read_string()?;
    Identifier::new(name).map_err(|err| DecodeError::InvalidIdentifier {
        name: err.0,
        offset,
    })
}
