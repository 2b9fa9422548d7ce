//! Signature tokens and ability sets
//!
//! A signature is a list of type tokens. Tokens nest (vectors, references and
//! generic struct instantiations) up to [`SIGNATURE_TOKEN_DEPTH_MAX`].

use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use crate::index::{StructHandleIndex, TypeParameterIndex};
use crate::module::VERSION_6;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum nesting depth of a signature token
pub const SIGNATURE_TOKEN_DEPTH_MAX: usize = 256;

/// One-byte tags of signature tokens
pub mod tags {
    /// `bool`
    pub const BOOL: u8 = 0x01;
    /// `u8`
    pub const U8: u8 = 0x02;
    /// `u64`
    pub const U64: u8 = 0x03;
    /// `u128`
    pub const U128: u8 = 0x04;
    /// `address`
    pub const ADDRESS: u8 = 0x05;
    /// `&T`
    pub const REFERENCE: u8 = 0x06;
    /// `&mut T`
    pub const MUTABLE_REFERENCE: u8 = 0x07;
    /// Non-generic struct
    pub const STRUCT: u8 = 0x08;
    /// Type parameter
    pub const TYPE_PARAMETER: u8 = 0x09;
    /// `vector<T>`
    pub const VECTOR: u8 = 0x0A;
    /// Generic struct instantiation
    pub const STRUCT_INST: u8 = 0x0B;
    /// `signer`
    pub const SIGNER: u8 = 0x0C;
    /// `u16` (version 6)
    pub const U16: u8 = 0x0D;
    /// `u32` (version 6)
    pub const U32: u8 = 0x0E;
    /// `u256` (version 6)
    pub const U256: u8 = 0x0F;
}

/// A type appearing in a signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureToken {
    /// `bool`
    Bool,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `u128`
    U128,
    /// `u256`
    U256,
    /// `address`
    Address,
    /// `signer`
    Signer,
    /// `vector<T>`
    Vector(Box<SignatureToken>),
    /// Non-generic struct type
    Struct(StructHandleIndex),
    /// Generic struct type with its type arguments
    StructInstantiation(StructHandleIndex, Vec<SignatureToken>),
    /// `&T`
    Reference(Box<SignatureToken>),
    /// `&mut T`
    MutableReference(Box<SignatureToken>),
    /// Type parameter of the enclosing declaration
    TypeParameter(TypeParameterIndex),
}

impl SignatureToken {
    /// Decode one token
    pub fn decode(reader: &mut BytecodeReader<'_>, version: u32) -> Result<Self, DecodeError> {
        Self::decode_at_depth(reader, version, 1)
    }

    fn decode_at_depth(
        reader: &mut BytecodeReader<'_>,
        version: u32,
        depth: usize,
    ) -> Result<Self, DecodeError> {
        let offset = reader.offset();
        if depth > SIGNATURE_TOKEN_DEPTH_MAX {
            return Err(DecodeError::SignatureTooDeep {
                max: SIGNATURE_TOKEN_DEPTH_MAX,
                offset,
            });
        }
        let tag = reader.read_u8()?;
        if matches!(tag, tags::U16 | tags::U32 | tags::U256) && version < VERSION_6 {
            return Err(DecodeError::UnsupportedInVersion {
                what: "u16/u32/u256 type",
                version,
                offset,
            });
        }
        let inner = |reader: &mut BytecodeReader<'_>| {
            Self::decode_at_depth(reader, version, depth + 1).map(Box::new)
        };
        let token = match tag {
            tags::BOOL => SignatureToken::Bool,
            tags::U8 => SignatureToken::U8,
            tags::U16 => SignatureToken::U16,
            tags::U32 => SignatureToken::U32,
            tags::U64 => SignatureToken::U64,
            tags::U128 => SignatureToken::U128,
            tags::U256 => SignatureToken::U256,
            tags::ADDRESS => SignatureToken::Address,
            tags::SIGNER => SignatureToken::Signer,
            tags::VECTOR => SignatureToken::Vector(inner(reader)?),
            tags::REFERENCE => SignatureToken::Reference(inner(reader)?),
            tags::MUTABLE_REFERENCE => SignatureToken::MutableReference(inner(reader)?),
            tags::STRUCT => SignatureToken::Struct(StructHandleIndex(reader.read_index()?)),
            tags::STRUCT_INST => {
                let handle = StructHandleIndex(reader.read_index()?);
                let count = reader.read_count()?;
                let mut args = Vec::with_capacity(count);
                for _ in 0..count {
                    args.push(Self::decode_at_depth(reader, version, depth + 1)?);
                }
                SignatureToken::StructInstantiation(handle, args)
            }
            tags::TYPE_PARAMETER => SignatureToken::TypeParameter(reader.read_index()?),
            other => return Err(DecodeError::InvalidSignatureToken(other, offset)),
        };
        Ok(token)
    }

    /// Encode this token
    pub fn encode(&self, writer: &mut BytecodeWriter) {
        match self {
            SignatureToken::Bool => writer.emit_u8(tags::BOOL),
            SignatureToken::U8 => writer.emit_u8(tags::U8),
            SignatureToken::U16 => writer.emit_u8(tags::U16),
            SignatureToken::U32 => writer.emit_u8(tags::U32),
            SignatureToken::U64 => writer.emit_u8(tags::U64),
            SignatureToken::U128 => writer.emit_u8(tags::U128),
            SignatureToken::U256 => writer.emit_u8(tags::U256),
            SignatureToken::Address => writer.emit_u8(tags::ADDRESS),
            SignatureToken::Signer => writer.emit_u8(tags::SIGNER),
            SignatureToken::Vector(inner) => {
                writer.emit_u8(tags::VECTOR);
                inner.encode(writer);
            }
            SignatureToken::Reference(inner) => {
                writer.emit_u8(tags::REFERENCE);
                inner.encode(writer);
            }
            SignatureToken::MutableReference(inner) => {
                writer.emit_u8(tags::MUTABLE_REFERENCE);
                inner.encode(writer);
            }
            SignatureToken::Struct(handle) => {
                writer.emit_u8(tags::STRUCT);
                writer.emit_uleb128(u64::from(handle.0));
            }
            SignatureToken::StructInstantiation(handle, args) => {
                writer.emit_u8(tags::STRUCT_INST);
                writer.emit_uleb128(u64::from(handle.0));
                writer.emit_len(args.len());
                for arg in args {
                    arg.encode(writer);
                }
            }
            SignatureToken::TypeParameter(index) => {
                writer.emit_u8(tags::TYPE_PARAMETER);
                writer.emit_uleb128(u64::from(*index));
            }
        }
    }

    /// Iterate over this token and every token nested inside it
    pub fn preorder(&self) -> Vec<&SignatureToken> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(token) = stack.pop() {
            out.push(token);
            match token {
                SignatureToken::Vector(inner)
                | SignatureToken::Reference(inner)
                | SignatureToken::MutableReference(inner) => stack.push(inner),
                SignatureToken::StructInstantiation(_, args) => stack.extend(args.iter().rev()),
                _ => {}
            }
        }
        out
    }
}

/// An ordered list of type tokens
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(pub Vec<SignatureToken>);

impl Signature {
    /// Number of tokens
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the signature has no tokens
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode a token count followed by the tokens
    pub fn decode(reader: &mut BytecodeReader<'_>, version: u32) -> Result<Self, DecodeError> {
        let count = reader.read_count()?;
        let mut tokens = Vec::with_capacity(count);
        for _ in 0..count {
            tokens.push(SignatureToken::decode(reader, version)?);
        }
        Ok(Self(tokens))
    }

    /// Encode the token count followed by the tokens
    pub fn encode(&self, writer: &mut BytecodeWriter) {
        writer.emit_len(self.0.len());
        for token in &self.0 {
            token.encode(writer);
        }
    }
}

/// Set of abilities (`copy`, `drop`, `store`, `key`) stored as a bit mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilitySet(u8);

impl AbilitySet {
    /// Values may be copied
    pub const COPY: u8 = 0x1;
    /// Values may be dropped
    pub const DROP: u8 = 0x2;
    /// Values may be stored in global storage
    pub const STORE: u8 = 0x4;
    /// Values may be used as a storage key
    pub const KEY: u8 = 0x8;

    const ALL: u8 = Self::COPY | Self::DROP | Self::STORE | Self::KEY;

    /// The empty set
    pub const EMPTY: AbilitySet = AbilitySet(0);

    /// Build a set from a mask, rejecting unknown bits
    pub fn from_u8(bits: u8) -> Option<Self> {
        (bits & !Self::ALL == 0).then_some(Self(bits))
    }

    /// The raw bit mask
    pub fn into_u8(self) -> u8 {
        self.0
    }

    /// Whether every bit of `ability` is set
    pub fn has(self, ability: u8) -> bool {
        self.0 & ability == ability
    }

    pub(crate) fn decode(reader: &mut BytecodeReader<'_>) -> Result<Self, DecodeError> {
        let offset = reader.offset();
        let value = reader.read_u8()?;
        Self::from_u8(value).ok_or(DecodeError::InvalidTag {
            what: "ability set",
            value,
            offset,
        })
    }
}

impl fmt::Display for AbilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::COPY, "copy"),
            (Self::DROP, "drop"),
            (Self::STORE, "store"),
            (Self::KEY, "key"),
        ];
        let mut first = true;
        for (bit, name) in names {
            if self.has(bit) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::VERSION_5;

    fn encode(token: &SignatureToken) -> Vec<u8> {
        let mut writer = BytecodeWriter::new();
        token.encode(&mut writer);
        writer.into_bytes()
    }

    #[test]
    fn test_nested_token_encoding() {
        let token = SignatureToken::MutableReference(Box::new(SignatureToken::Vector(Box::new(
            SignatureToken::StructInstantiation(StructHandleIndex(1), vec![SignatureToken::U8]),
        ))));
        let bytes = encode(&token);
        assert_eq!(bytes, vec![0x07, 0x0A, 0x0B, 0x01, 0x01, 0x02]);

        let mut reader = BytecodeReader::new(&bytes);
        assert_eq!(SignatureToken::decode(&mut reader, VERSION_6).unwrap(), token);
        assert!(!reader.has_more());
    }

    #[test]
    fn test_invalid_token() {
        let mut reader = BytecodeReader::new(&[0x10]);
        assert_eq!(
            SignatureToken::decode(&mut reader, VERSION_6),
            Err(DecodeError::InvalidSignatureToken(0x10, 0))
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut bytes = vec![tags::VECTOR; SIGNATURE_TOKEN_DEPTH_MAX];
        bytes.push(tags::U8);
        let mut reader = BytecodeReader::new(&bytes);
        assert!(matches!(
            SignatureToken::decode(&mut reader, VERSION_6),
            Err(DecodeError::SignatureTooDeep { .. })
        ));

        let bytes = [vec![tags::VECTOR; SIGNATURE_TOKEN_DEPTH_MAX - 1], vec![tags::U8]].concat();
        let mut reader = BytecodeReader::new(&bytes);
        assert!(SignatureToken::decode(&mut reader, VERSION_6).is_ok());
    }

    #[test]
    fn test_v6_tokens_rejected_in_v5() {
        let mut reader = BytecodeReader::new(&[tags::U256]);
        assert!(matches!(
            SignatureToken::decode(&mut reader, VERSION_5),
            Err(DecodeError::UnsupportedInVersion { version: 5, .. })
        ));
    }

    #[test]
    fn test_signature_roundtrip() {
        let sig = Signature(vec![SignatureToken::Address, SignatureToken::TypeParameter(2)]);
        let mut writer = BytecodeWriter::new();
        sig.encode(&mut writer);
        assert_eq!(writer.buffer(), &[0x02, 0x05, 0x09, 0x02]);

        let bytes = writer.into_bytes();
        let mut reader = BytecodeReader::new(&bytes);
        assert_eq!(Signature::decode(&mut reader, VERSION_6).unwrap(), sig);
    }

    #[test]
    fn test_preorder_visits_nested() {
        let token = SignatureToken::StructInstantiation(
            StructHandleIndex(0),
            vec![SignatureToken::Struct(StructHandleIndex(3)), SignatureToken::U8],
        );
        assert_eq!(token.preorder().len(), 3);
    }

    #[test]
    fn test_ability_set() {
        let abilities = AbilitySet::from_u8(0x6).unwrap();
        assert!(abilities.has(AbilitySet::DROP));
        assert!(!abilities.has(AbilitySet::KEY));
        assert_eq!(abilities.to_string(), "drop, store");
        assert!(AbilitySet::from_u8(0x10).is_none());
    }
}
