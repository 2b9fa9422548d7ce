//! Move bytecode instruction set
//!
//! [`Opcode`] is the one-byte instruction tag. [`Bytecode`] is a decoded
//! instruction together with its operands. Operand encodings:
//!
//! - local slots are a raw `u8`
//! - integer immediates are fixed-width little-endian
//! - table indices and branch targets are ULEB128
//! - `VecPack` / `VecUnpack` carry a signature index and a ULEB128 element count

use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use crate::index::{
    CodeOffset, ConstantPoolIndex, FieldHandleIndex, FieldInstantiationIndex, FunctionHandleIndex,
    FunctionInstantiationIndex, LocalIndex, SignatureIndex, StructDefInstantiationIndex,
    StructDefinitionIndex,
};
use crate::module::VERSION_6;
use serde::{Deserialize, Serialize};

macro_rules! opcodes {
    ($($(#[$doc:meta])* $variant:ident = $byte:literal => $name:literal,)*) => {
        /// Bytecode opcode enumeration
        ///
        /// Every instruction starts with one of these bytes; operands, if any,
        /// follow it in the code stream.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($(#[$doc])* $variant = $byte,)*
        }

        impl Opcode {
            /// Convert byte to opcode
            ///
            /// Returns None if the byte does not correspond to a valid opcode.
            pub fn from_u8(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Get the mnemonic of this opcode
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

opcodes! {
    /// Discard the top of the stack
    Pop = 0x01 => "POP",
    /// Return from the current function
    Ret = 0x02 => "RET",
    /// Branch if true (operand: code offset)
    BrTrue = 0x03 => "BR_TRUE",
    /// Branch if false (operand: code offset)
    BrFalse = 0x04 => "BR_FALSE",
    /// Unconditional branch (operand: code offset)
    Branch = 0x05 => "BRANCH",
    /// Push a u64 (operand: 8 bytes)
    LdU64 = 0x06 => "LD_U64",
    /// Push a constant (operand: constant index)
    LdConst = 0x07 => "LD_CONST",
    /// Push true
    LdTrue = 0x08 => "LD_TRUE",
    /// Push false
    LdFalse = 0x09 => "LD_FALSE",
    /// Copy a local (operand: u8 slot)
    CopyLoc = 0x0A => "COPY_LOC",
    /// Move a local (operand: u8 slot)
    MoveLoc = 0x0B => "MOVE_LOC",
    /// Store into a local (operand: u8 slot)
    StLoc = 0x0C => "ST_LOC",
    /// Mutable borrow of a local (operand: u8 slot)
    MutBorrowLoc = 0x0D => "MUT_BORROW_LOC",
    /// Immutable borrow of a local (operand: u8 slot)
    ImmBorrowLoc = 0x0E => "IMM_BORROW_LOC",
    /// Mutable borrow of a field (operand: field handle index)
    MutBorrowField = 0x0F => "MUT_BORROW_FIELD",
    /// Immutable borrow of a field (operand: field handle index)
    ImmBorrowField = 0x10 => "IMM_BORROW_FIELD",
    /// Call a function (operand: function handle index)
    Call = 0x11 => "CALL",
    /// Construct a struct (operand: struct definition index)
    Pack = 0x12 => "PACK",
    /// Destructure a struct (operand: struct definition index)
    Unpack = 0x13 => "UNPACK",
    /// Read through a reference
    ReadRef = 0x14 => "READ_REF",
    /// Write through a reference
    WriteRef = 0x15 => "WRITE_REF",
    /// Integer addition
    Add = 0x16 => "ADD",
    /// Integer subtraction
    Sub = 0x17 => "SUB",
    /// Integer multiplication
    Mul = 0x18 => "MUL",
    /// Integer remainder
    Mod = 0x19 => "MOD",
    /// Integer division
    Div = 0x1A => "DIV",
    /// Bitwise or
    BitOr = 0x1B => "BIT_OR",
    /// Bitwise and
    BitAnd = 0x1C => "BIT_AND",
    /// Bitwise xor
    Xor = 0x1D => "XOR",
    /// Boolean or
    Or = 0x1E => "OR",
    /// Boolean and
    And = 0x1F => "AND",
    /// Boolean not
    Not = 0x20 => "NOT",
    /// Equality
    Eq = 0x21 => "EQ",
    /// Inequality
    Neq = 0x22 => "NEQ",
    /// Less than
    Lt = 0x23 => "LT",
    /// Greater than
    Gt = 0x24 => "GT",
    /// Less or equal
    Le = 0x25 => "LE",
    /// Greater or equal
    Ge = 0x26 => "GE",
    /// Abort with the code on the stack
    Abort = 0x27 => "ABORT",
    /// No operation
    Nop = 0x28 => "NOP",
    /// Test for a global resource (operand: struct definition index)
    Exists = 0x29 => "EXISTS",
    /// Mutable borrow of a global (operand: struct definition index)
    MutBorrowGlobal = 0x2A => "MUT_BORROW_GLOBAL",
    /// Immutable borrow of a global (operand: struct definition index)
    ImmBorrowGlobal = 0x2B => "IMM_BORROW_GLOBAL",
    /// Move a resource out of global storage (operand: struct definition index)
    MoveFrom = 0x2C => "MOVE_FROM",
    /// Move a resource into global storage (operand: struct definition index)
    MoveTo = 0x2D => "MOVE_TO",
    /// Convert a mutable reference to an immutable one
    FreezeRef = 0x2E => "FREEZE_REF",
    /// Shift left
    Shl = 0x2F => "SHL",
    /// Shift right
    Shr = 0x30 => "SHR",
    /// Push a u8 (operand: 1 byte)
    LdU8 = 0x31 => "LD_U8",
    /// Push a u128 (operand: 16 bytes)
    LdU128 = 0x32 => "LD_U128",
    /// Cast to u8
    CastU8 = 0x33 => "CAST_U8",
    /// Cast to u64
    CastU64 = 0x34 => "CAST_U64",
    /// Cast to u128
    CastU128 = 0x35 => "CAST_U128",
    /// Generic mutable field borrow (operand: field instantiation index)
    MutBorrowFieldGeneric = 0x36 => "MUT_BORROW_FIELD_GENERIC",
    /// Generic immutable field borrow (operand: field instantiation index)
    ImmBorrowFieldGeneric = 0x37 => "IMM_BORROW_FIELD_GENERIC",
    /// Generic call (operand: function instantiation index)
    CallGeneric = 0x38 => "CALL_GENERIC",
    /// Generic pack (operand: struct instantiation index)
    PackGeneric = 0x39 => "PACK_GENERIC",
    /// Generic unpack (operand: struct instantiation index)
    UnpackGeneric = 0x3A => "UNPACK_GENERIC",
    /// Generic exists (operand: struct instantiation index)
    ExistsGeneric = 0x3B => "EXISTS_GENERIC",
    /// Generic mutable global borrow (operand: struct instantiation index)
    MutBorrowGlobalGeneric = 0x3C => "MUT_BORROW_GLOBAL_GENERIC",
    /// Generic immutable global borrow (operand: struct instantiation index)
    ImmBorrowGlobalGeneric = 0x3D => "IMM_BORROW_GLOBAL_GENERIC",
    /// Generic move from (operand: struct instantiation index)
    MoveFromGeneric = 0x3E => "MOVE_FROM_GENERIC",
    /// Generic move to (operand: struct instantiation index)
    MoveToGeneric = 0x3F => "MOVE_TO_GENERIC",
    /// Build a vector (operands: signature index, element count)
    VecPack = 0x40 => "VEC_PACK",
    /// Vector length (operand: signature index)
    VecLen = 0x41 => "VEC_LEN",
    /// Immutable element borrow (operand: signature index)
    VecImmBorrow = 0x42 => "VEC_IMM_BORROW",
    /// Mutable element borrow (operand: signature index)
    VecMutBorrow = 0x43 => "VEC_MUT_BORROW",
    /// Append an element (operand: signature index)
    VecPushBack = 0x44 => "VEC_PUSH_BACK",
    /// Remove the last element (operand: signature index)
    VecPopBack = 0x45 => "VEC_POP_BACK",
    /// Destructure a vector (operands: signature index, element count)
    VecUnpack = 0x46 => "VEC_UNPACK",
    /// Swap two elements (operand: signature index)
    VecSwap = 0x47 => "VEC_SWAP",
    /// Push a u16 (operand: 2 bytes)
    LdU16 = 0x48 => "LD_U16",
    /// Push a u32 (operand: 4 bytes)
    LdU32 = 0x49 => "LD_U32",
    /// Push a u256 (operand: 32 bytes)
    LdU256 = 0x4A => "LD_U256",
    /// Cast to u16
    CastU16 = 0x4B => "CAST_U16",
    /// Cast to u32
    CastU32 = 0x4C => "CAST_U32",
    /// Cast to u256
    CastU256 = 0x4D => "CAST_U256",
}

impl Opcode {
    /// Convert opcode to byte
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Check if this opcode was introduced in bytecode version 6
    pub fn is_v6_only(self) -> bool {
        matches!(
            self,
            Self::LdU16
                | Self::LdU32
                | Self::LdU256
                | Self::CastU16
                | Self::CastU32
                | Self::CastU256
        )
    }
}

/// A decoded instruction with its operands
///
/// Variants mirror [`Opcode`]; see there for operand meanings.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bytecode {
    Pop,
    Ret,
    BrTrue(CodeOffset),
    BrFalse(CodeOffset),
    Branch(CodeOffset),
    LdU8(u8),
    LdU16(u16),
    LdU32(u32),
    LdU64(u64),
    LdU128(u128),
    /// Little-endian bytes
    LdU256([u8; 32]),
    CastU8,
    CastU16,
    CastU32,
    CastU64,
    CastU128,
    CastU256,
    LdConst(ConstantPoolIndex),
    LdTrue,
    LdFalse,
    CopyLoc(LocalIndex),
    MoveLoc(LocalIndex),
    StLoc(LocalIndex),
    Call(FunctionHandleIndex),
    CallGeneric(FunctionInstantiationIndex),
    Pack(StructDefinitionIndex),
    PackGeneric(StructDefInstantiationIndex),
    Unpack(StructDefinitionIndex),
    UnpackGeneric(StructDefInstantiationIndex),
    ReadRef,
    WriteRef,
    FreezeRef,
    MutBorrowLoc(LocalIndex),
    ImmBorrowLoc(LocalIndex),
    MutBorrowField(FieldHandleIndex),
    MutBorrowFieldGeneric(FieldInstantiationIndex),
    ImmBorrowField(FieldHandleIndex),
    ImmBorrowFieldGeneric(FieldInstantiationIndex),
    MutBorrowGlobal(StructDefinitionIndex),
    MutBorrowGlobalGeneric(StructDefInstantiationIndex),
    ImmBorrowGlobal(StructDefinitionIndex),
    ImmBorrowGlobalGeneric(StructDefInstantiationIndex),
    Add,
    Sub,
    Mul,
    Mod,
    Div,
    BitOr,
    BitAnd,
    Xor,
    Or,
    And,
    Not,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    Abort,
    Nop,
    Exists(StructDefinitionIndex),
    ExistsGeneric(StructDefInstantiationIndex),
    MoveFrom(StructDefinitionIndex),
    MoveFromGeneric(StructDefInstantiationIndex),
    MoveTo(StructDefinitionIndex),
    MoveToGeneric(StructDefInstantiationIndex),
    Shl,
    Shr,
    VecPack(SignatureIndex, u64),
    VecLen(SignatureIndex),
    VecImmBorrow(SignatureIndex),
    VecMutBorrow(SignatureIndex),
    VecPushBack(SignatureIndex),
    VecPopBack(SignatureIndex),
    VecUnpack(SignatureIndex, u64),
    VecSwap(SignatureIndex),
}

impl Bytecode {
    /// The opcode of this instruction
    pub fn opcode(&self) -> Opcode {
        use Bytecode as B;
        match self {
            B::Pop => Opcode::Pop,
            B::Ret => Opcode::Ret,
            B::BrTrue(_) => Opcode::BrTrue,
            B::BrFalse(_) => Opcode::BrFalse,
            B::Branch(_) => Opcode::Branch,
            B::LdU8(_) => Opcode::LdU8,
            B::LdU16(_) => Opcode::LdU16,
            B::LdU32(_) => Opcode::LdU32,
            B::LdU64(_) => Opcode::LdU64,
            B::LdU128(_) => Opcode::LdU128,
            B::LdU256(_) => Opcode::LdU256,
            B::CastU8 => Opcode::CastU8,
            B::CastU16 => Opcode::CastU16,
            B::CastU32 => Opcode::CastU32,
            B::CastU64 => Opcode::CastU64,
            B::CastU128 => Opcode::CastU128,
            B::CastU256 => Opcode::CastU256,
            B::LdConst(_) => Opcode::LdConst,
            B::LdTrue => Opcode::LdTrue,
            B::LdFalse => Opcode::LdFalse,
            B::CopyLoc(_) => Opcode::CopyLoc,
            B::MoveLoc(_) => Opcode::MoveLoc,
            B::StLoc(_) => Opcode::StLoc,
            B::Call(_) => Opcode::Call,
            B::CallGeneric(_) => Opcode::CallGeneric,
            B::Pack(_) => Opcode::Pack,
            B::PackGeneric(_) => Opcode::PackGeneric,
            B::Unpack(_) => Opcode::Unpack,
            B::UnpackGeneric(_) => Opcode::UnpackGeneric,
            B::ReadRef => Opcode::ReadRef,
            B::WriteRef => Opcode::WriteRef,
            B::FreezeRef => Opcode::FreezeRef,
            B::MutBorrowLoc(_) => Opcode::MutBorrowLoc,
            B::ImmBorrowLoc(_) => Opcode::ImmBorrowLoc,
            B::MutBorrowField(_) => Opcode::MutBorrowField,
            B::MutBorrowFieldGeneric(_) => Opcode::MutBorrowFieldGeneric,
            B::ImmBorrowField(_) => Opcode::ImmBorrowField,
            B::ImmBorrowFieldGeneric(_) => Opcode::ImmBorrowFieldGeneric,
            B::MutBorrowGlobal(_) => Opcode::MutBorrowGlobal,
            B::MutBorrowGlobalGeneric(_) => Opcode::MutBorrowGlobalGeneric,
            B::ImmBorrowGlobal(_) => Opcode::ImmBorrowGlobal,
            B::ImmBorrowGlobalGeneric(_) => Opcode::ImmBorrowGlobalGeneric,
            B::Add => Opcode::Add,
            B::Sub => Opcode::Sub,
            B::Mul => Opcode::Mul,
            B::Mod => Opcode::Mod,
            B::Div => Opcode::Div,
            B::BitOr => Opcode::BitOr,
            B::BitAnd => Opcode::BitAnd,
            B::Xor => Opcode::Xor,
            B::Or => Opcode::Or,
            B::And => Opcode::And,
            B::Not => Opcode::Not,
            B::Eq => Opcode::Eq,
            B::Neq => Opcode::Neq,
            B::Lt => Opcode::Lt,
            B::Gt => Opcode::Gt,
            B::Le => Opcode::Le,
            B::Ge => Opcode::Ge,
            B::Abort => Opcode::Abort,
            B::Nop => Opcode::Nop,
            B::Exists(_) => Opcode::Exists,
            B::ExistsGeneric(_) => Opcode::ExistsGeneric,
            B::MoveFrom(_) => Opcode::MoveFrom,
            B::MoveFromGeneric(_) => Opcode::MoveFromGeneric,
            B::MoveTo(_) => Opcode::MoveTo,
            B::MoveToGeneric(_) => Opcode::MoveToGeneric,
            B::Shl => Opcode::Shl,
            B::Shr => Opcode::Shr,
            B::VecPack(..) => Opcode::VecPack,
            B::VecLen(_) => Opcode::VecLen,
            B::VecImmBorrow(_) => Opcode::VecImmBorrow,
            B::VecMutBorrow(_) => Opcode::VecMutBorrow,
            B::VecPushBack(_) => Opcode::VecPushBack,
            B::VecPopBack(_) => Opcode::VecPopBack,
            B::VecUnpack(..) => Opcode::VecUnpack,
            B::VecSwap(_) => Opcode::VecSwap,
        }
    }

    /// Branch target, if this is a branch instruction
    pub fn branch_target(&self) -> Option<CodeOffset> {
        match self {
            Bytecode::BrTrue(offset) | Bytecode::BrFalse(offset) | Bytecode::Branch(offset) => {
                Some(*offset)
            }
            _ => None,
        }
    }

    /// Local slot, if this instruction addresses one
    pub fn local(&self) -> Option<LocalIndex> {
        match self {
            Bytecode::CopyLoc(idx)
            | Bytecode::MoveLoc(idx)
            | Bytecode::StLoc(idx)
            | Bytecode::MutBorrowLoc(idx)
            | Bytecode::ImmBorrowLoc(idx) => Some(*idx),
            _ => None,
        }
    }

    /// Decode one instruction
    pub fn decode(reader: &mut BytecodeReader<'_>, version: u32) -> Result<Self, DecodeError> {
        use Bytecode as B;
        let offset = reader.offset();
        let byte = reader.read_u8()?;
        let opcode = Opcode::from_u8(byte).ok_or(DecodeError::InvalidOpcode(byte, offset))?;
        if opcode.is_v6_only() && version < VERSION_6 {
            return Err(DecodeError::UnsupportedInVersion {
                what: opcode.name(),
                version,
                offset,
            });
        }

        let instr = match opcode {
            Opcode::Pop => B::Pop,
            Opcode::Ret => B::Ret,
            Opcode::BrTrue => B::BrTrue(reader.read_index()?),
            Opcode::BrFalse => B::BrFalse(reader.read_index()?),
            Opcode::Branch => B::Branch(reader.read_index()?),
            Opcode::LdU8 => B::LdU8(reader.read_u8()?),
            Opcode::LdU16 => B::LdU16(reader.read_u16()?),
            Opcode::LdU32 => B::LdU32(reader.read_u32()?),
            Opcode::LdU64 => B::LdU64(reader.read_u64()?),
            Opcode::LdU128 => B::LdU128(reader.read_u128()?),
            Opcode::LdU256 => B::LdU256(reader.read_array()?),
            Opcode::CastU8 => B::CastU8,
            Opcode::CastU16 => B::CastU16,
            Opcode::CastU32 => B::CastU32,
            Opcode::CastU64 => B::CastU64,
            Opcode::CastU128 => B::CastU128,
            Opcode::CastU256 => B::CastU256,
            Opcode::LdConst => B::LdConst(ConstantPoolIndex(reader.read_index()?)),
            Opcode::LdTrue => B::LdTrue,
            Opcode::LdFalse => B::LdFalse,
            Opcode::CopyLoc => B::CopyLoc(reader.read_u8()?),
            Opcode::MoveLoc => B::MoveLoc(reader.read_u8()?),
            Opcode::StLoc => B::StLoc(reader.read_u8()?),
            Opcode::MutBorrowLoc => B::MutBorrowLoc(reader.read_u8()?),
            Opcode::ImmBorrowLoc => B::ImmBorrowLoc(reader.read_u8()?),
            Opcode::Call => B::Call(FunctionHandleIndex(reader.read_index()?)),
            Opcode::CallGeneric => B::CallGeneric(FunctionInstantiationIndex(reader.read_index()?)),
            Opcode::Pack => B::Pack(StructDefinitionIndex(reader.read_index()?)),
            Opcode::PackGeneric => B::PackGeneric(StructDefInstantiationIndex(reader.read_index()?)),
            Opcode::Unpack => B::Unpack(StructDefinitionIndex(reader.read_index()?)),
            Opcode::UnpackGeneric => {
                B::UnpackGeneric(StructDefInstantiationIndex(reader.read_index()?))
            }
            Opcode::ReadRef => B::ReadRef,
            Opcode::WriteRef => B::WriteRef,
            Opcode::FreezeRef => B::FreezeRef,
            Opcode::MutBorrowField => B::MutBorrowField(FieldHandleIndex(reader.read_index()?)),
            Opcode::ImmBorrowField => B::ImmBorrowField(FieldHandleIndex(reader.read_index()?)),
            Opcode::MutBorrowFieldGeneric => {
                B::MutBorrowFieldGeneric(FieldInstantiationIndex(reader.read_index()?))
            }
            Opcode::ImmBorrowFieldGeneric => {
                B::ImmBorrowFieldGeneric(FieldInstantiationIndex(reader.read_index()?))
            }
            Opcode::MutBorrowGlobal => {
                B::MutBorrowGlobal(StructDefinitionIndex(reader.read_index()?))
            }
            Opcode::ImmBorrowGlobal => {
                B::ImmBorrowGlobal(StructDefinitionIndex(reader.read_index()?))
            }
            Opcode::MutBorrowGlobalGeneric => {
                B::MutBorrowGlobalGeneric(StructDefInstantiationIndex(reader.read_index()?))
            }
            Opcode::ImmBorrowGlobalGeneric => {
                B::ImmBorrowGlobalGeneric(StructDefInstantiationIndex(reader.read_index()?))
            }
            Opcode::Add => B::Add,
            Opcode::Sub => B::Sub,
            Opcode::Mul => B::Mul,
            Opcode::Mod => B::Mod,
            Opcode::Div => B::Div,
            Opcode::BitOr => B::BitOr,
            Opcode::BitAnd => B::BitAnd,
            Opcode::Xor => B::Xor,
            Opcode::Or => B::Or,
            Opcode::And => B::And,
            Opcode::Not => B::Not,
            Opcode::Eq => B::Eq,
            Opcode::Neq => B::Neq,
            Opcode::Lt => B::Lt,
            Opcode::Gt => B::Gt,
            Opcode::Le => B::Le,
            Opcode::Ge => B::Ge,
            Opcode::Abort => B::Abort,
            Opcode::Nop => B::Nop,
            Opcode::Exists => B::Exists(StructDefinitionIndex(reader.read_index()?)),
            Opcode::ExistsGeneric => {
                B::ExistsGeneric(StructDefInstantiationIndex(reader.read_index()?))
            }
            Opcode::MoveFrom => B::MoveFrom(StructDefinitionIndex(reader.read_index()?)),
            Opcode::MoveFromGeneric => {
                B::MoveFromGeneric(StructDefInstantiationIndex(reader.read_index()?))
            }
            Opcode::MoveTo => B::MoveTo(StructDefinitionIndex(reader.read_index()?)),
            Opcode::MoveToGeneric => {
                B::MoveToGeneric(StructDefInstantiationIndex(reader.read_index()?))
            }
            Opcode::Shl => B::Shl,
            Opcode::Shr => B::Shr,
            Opcode::VecPack => {
                B::VecPack(SignatureIndex(reader.read_index()?), reader.read_uleb128()?)
            }
            Opcode::VecLen => B::VecLen(SignatureIndex(reader.read_index()?)),
            Opcode::VecImmBorrow => B::VecImmBorrow(SignatureIndex(reader.read_index()?)),
            Opcode::VecMutBorrow => B::VecMutBorrow(SignatureIndex(reader.read_index()?)),
            Opcode::VecPushBack => B::VecPushBack(SignatureIndex(reader.read_index()?)),
            Opcode::VecPopBack => B::VecPopBack(SignatureIndex(reader.read_index()?)),
            Opcode::VecUnpack => {
                B::VecUnpack(SignatureIndex(reader.read_index()?), reader.read_uleb128()?)
            }
            Opcode::VecSwap => B::VecSwap(SignatureIndex(reader.read_index()?)),
        };
        Ok(instr)
    }

    /// Encode this instruction
    pub fn encode(&self, writer: &mut BytecodeWriter) {
        use Bytecode as B;
        writer.emit_u8(self.opcode().to_u8());
        match self {
            B::BrTrue(offset) | B::BrFalse(offset) | B::Branch(offset) => {
                writer.emit_uleb128(u64::from(*offset))
            }
            B::LdU8(v) => writer.emit_u8(*v),
            B::LdU16(v) => writer.emit_u16(*v),
            B::LdU32(v) => writer.emit_u32(*v),
            B::LdU64(v) => writer.emit_u64(*v),
            B::LdU128(v) => writer.emit_u128(*v),
            B::LdU256(bytes) => writer.emit_bytes(bytes),
            B::LdConst(idx) => writer.emit_uleb128(u64::from(idx.0)),
            B::CopyLoc(idx)
            | B::MoveLoc(idx)
            | B::StLoc(idx)
            | B::MutBorrowLoc(idx)
            | B::ImmBorrowLoc(idx) => writer.emit_u8(*idx),
            B::Call(idx) => writer.emit_uleb128(u64::from(idx.0)),
            B::CallGeneric(idx) => writer.emit_uleb128(u64::from(idx.0)),
            B::Pack(idx)
            | B::Unpack(idx)
            | B::MutBorrowGlobal(idx)
            | B::ImmBorrowGlobal(idx)
            | B::Exists(idx)
            | B::MoveFrom(idx)
            | B::MoveTo(idx) => writer.emit_uleb128(u64::from(idx.0)),
            B::PackGeneric(idx)
            | B::UnpackGeneric(idx)
            | B::MutBorrowGlobalGeneric(idx)
            | B::ImmBorrowGlobalGeneric(idx)
            | B::ExistsGeneric(idx)
            | B::MoveFromGeneric(idx)
            | B::MoveToGeneric(idx) => writer.emit_uleb128(u64::from(idx.0)),
            B::MutBorrowField(idx) | B::ImmBorrowField(idx) => {
                writer.emit_uleb128(u64::from(idx.0))
            }
            B::MutBorrowFieldGeneric(idx) | B::ImmBorrowFieldGeneric(idx) => {
                writer.emit_uleb128(u64::from(idx.0))
            }
            B::VecPack(sig, count) | B::VecUnpack(sig, count) => {
                writer.emit_uleb128(u64::from(sig.0));
                writer.emit_uleb128(*count);
            }
            B::VecLen(sig)
            | B::VecImmBorrow(sig)
            | B::VecMutBorrow(sig)
            | B::VecPushBack(sig)
            | B::VecPopBack(sig)
            | B::VecSwap(sig) => writer.emit_uleb128(u64::from(sig.0)),
            B::Pop
            | B::Ret
            | B::CastU8
            | B::CastU16
            | B::CastU32
            | B::CastU64
            | B::CastU128
            | B::CastU256
            | B::LdTrue
            | B::LdFalse
            | B::ReadRef
            | B::WriteRef
            | B::FreezeRef
            | B::Add
            | B::Sub
            | B::Mul
            | B::Mod
            | B::Div
            | B::BitOr
            | B::BitAnd
            | B::Xor
            | B::Or
            | B::And
            | B::Not
            | B::Eq
            | B::Neq
            | B::Lt
            | B::Gt
            | B::Le
            | B::Ge
            | B::Abort
            | B::Nop
            | B::Shl
            | B::Shr => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::VERSION_5;

    fn roundtrip(instr: Bytecode) -> Vec<u8> {
        let mut writer = BytecodeWriter::new();
        instr.encode(&mut writer);
        let bytes = writer.into_bytes();
        let mut reader = BytecodeReader::new(&bytes);
        assert_eq!(Bytecode::decode(&mut reader, VERSION_6).unwrap(), instr);
        assert!(!reader.has_more());
        bytes
    }

    #[test]
    fn test_opcode_from_u8() {
        for byte in 0x01..=0x4D {
            let opcode = Opcode::from_u8(byte).unwrap();
            assert_eq!(opcode.to_u8(), byte);
        }
        assert_eq!(Opcode::from_u8(0x00), None);
        assert_eq!(Opcode::from_u8(0x4E), None);
        assert_eq!(Opcode::from_u8(0xFF), None);
    }

    #[test]
    fn test_opcode_names() {
        assert_eq!(Opcode::LdConst.name(), "LD_CONST");
        assert_eq!(Opcode::VecPushBack.name(), "VEC_PUSH_BACK");
    }

    #[test]
    fn test_operand_layouts() {
        assert_eq!(roundtrip(Bytecode::CopyLoc(3)), vec![0x0A, 0x03]);
        assert_eq!(roundtrip(Bytecode::LdU8(217)), vec![0x31, 0xD9]);
        assert_eq!(roundtrip(Bytecode::Branch(200)), vec![0x05, 0xC8, 0x01]);
        assert_eq!(
            roundtrip(Bytecode::LdConst(ConstantPoolIndex(1))),
            vec![0x07, 0x01]
        );
        assert_eq!(
            roundtrip(Bytecode::VecPack(SignatureIndex(2), 300)),
            vec![0x40, 0x02, 0xAC, 0x02]
        );
        assert_eq!(
            roundtrip(Bytecode::LdU64(1)),
            vec![0x06, 1, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(roundtrip(Bytecode::LdU256([7; 32])).len(), 33);
        assert_eq!(roundtrip(Bytecode::Ret), vec![0x02]);
    }

    #[test]
    fn test_invalid_opcode() {
        let mut reader = BytecodeReader::new(&[0x02, 0x99]);
        assert_eq!(Bytecode::decode(&mut reader, VERSION_6), Ok(Bytecode::Ret));
        assert_eq!(
            Bytecode::decode(&mut reader, VERSION_6),
            Err(DecodeError::InvalidOpcode(0x99, 1))
        );
    }

    #[test]
    fn test_v6_opcodes_rejected_in_v5() {
        let mut reader = BytecodeReader::new(&[0x4B]);
        assert!(matches!(
            Bytecode::decode(&mut reader, VERSION_5),
            Err(DecodeError::UnsupportedInVersion { what: "CAST_U16", .. })
        ));
    }

    #[test]
    fn test_branch_and_local_accessors() {
        assert_eq!(Bytecode::BrFalse(9).branch_target(), Some(9));
        assert_eq!(Bytecode::Add.branch_target(), None);
        assert_eq!(Bytecode::StLoc(4).local(), Some(4));
    }
}
