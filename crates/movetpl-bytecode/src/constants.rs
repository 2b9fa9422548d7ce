//! Constant pool entries
//!
//! A constant is a type tag plus the serialized value bytes. The value
//! encoding is fixed by the type: little-endian integers of the type's width,
//! a single `0`/`1` byte for booleans, 32 raw bytes for addresses, and for
//! vectors a ULEB128 element count followed by the elements.

use crate::encoder::{BytecodeReader, BytecodeWriter, DecodeError};
use crate::module::VERSION_6;
use crate::signature::{tags, SIGNATURE_TOKEN_DEPTH_MAX};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of an account address in bytes
pub const ADDRESS_LENGTH: usize = 32;

/// Errors about constant values and type tags
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstantError {
    /// Fixed-width value with the wrong number of bytes
    #[error("{type_tag} constant must be {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Type the value was checked against
        type_tag: ConstantType,
        /// Width the type requires
        expected: usize,
        /// Width of the supplied value
        actual: usize,
    },

    /// Variable-width value that does not parse as its type
    #[error("Malformed {type_tag} constant: {source}")]
    Malformed {
        /// Type the value was checked against
        type_tag: ConstantType,
        /// Underlying decode failure
        #[source]
        source: DecodeError,
    },

    /// Value with bytes left over after a complete element
    #[error("{count} trailing bytes after {type_tag} constant")]
    TrailingBytes {
        /// Type the value was checked against
        type_tag: ConstantType,
        /// Number of unconsumed bytes
        count: usize,
    },

    /// Text that names no constant type
    #[error("Unknown constant type tag {0:?}")]
    UnknownTypeTag(String),
}

/// Type of a constant pool entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstantType {
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
    /// `vector<T>`
    Vector(Box<ConstantType>),
}

impl ConstantType {
    /// Encoded width of a value of this type, if fixed
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            ConstantType::Bool | ConstantType::U8 => Some(1),
            ConstantType::U16 => Some(2),
            ConstantType::U32 => Some(4),
            ConstantType::U64 => Some(8),
            ConstantType::U128 => Some(16),
            ConstantType::U256 | ConstantType::Address => Some(32),
            ConstantType::Vector(_) => None,
        }
    }

    /// Decode a type token restricted to constant types
    pub fn decode(reader: &mut BytecodeReader<'_>, version: u32) -> Result<Self, DecodeError> {
        let mut depth = 0;
        let mut leaf = loop {
            let offset = reader.offset();
            depth += 1;
            if depth > SIGNATURE_TOKEN_DEPTH_MAX {
                return Err(DecodeError::SignatureTooDeep {
                    max: SIGNATURE_TOKEN_DEPTH_MAX,
                    offset,
                });
            }
            let tag = reader.read_u8()?;
            if matches!(tag, tags::U16 | tags::U32 | tags::U256) && version < VERSION_6 {
                return Err(DecodeError::UnsupportedInVersion {
                    what: "u16/u32/u256 constant",
                    version,
                    offset,
                });
            }
            break match tag {
                tags::BOOL => ConstantType::Bool,
                tags::U8 => ConstantType::U8,
                tags::U16 => ConstantType::U16,
                tags::U32 => ConstantType::U32,
                tags::U64 => ConstantType::U64,
                tags::U128 => ConstantType::U128,
                tags::U256 => ConstantType::U256,
                tags::ADDRESS => ConstantType::Address,
                tags::VECTOR => continue,
                other => {
                    return Err(DecodeError::InvalidTag {
                        what: "constant type",
                        value: other,
                        offset,
                    })
                }
            };
        };
        for _ in 1..depth {
            leaf = ConstantType::Vector(Box::new(leaf));
        }
        Ok(leaf)
    }

    /// Encode as a type token
    pub fn encode(&self, writer: &mut BytecodeWriter) {
        let tag = match self {
            ConstantType::Bool => tags::BOOL,
            ConstantType::U8 => tags::U8,
            ConstantType::U16 => tags::U16,
            ConstantType::U32 => tags::U32,
            ConstantType::U64 => tags::U64,
            ConstantType::U128 => tags::U128,
            ConstantType::U256 => tags::U256,
            ConstantType::Address => tags::ADDRESS,
            ConstantType::Vector(inner) => {
                writer.emit_u8(tags::VECTOR);
                return inner.encode(writer);
            }
        };
        writer.emit_u8(tag);
    }

    /// Check that `value` is a well-formed encoding of this type
    pub fn check_value(&self, value: &[u8]) -> Result<(), ConstantError> {
        ConstantValue::decode(self, value).map(|_| ())
    }
}

impl fmt::Display for ConstantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantType::Bool => f.write_str("Bool"),
            ConstantType::U8 => f.write_str("U8"),
            ConstantType::U16 => f.write_str("U16"),
            ConstantType::U32 => f.write_str("U32"),
            ConstantType::U64 => f.write_str("U64"),
            ConstantType::U128 => f.write_str("U128"),
            ConstantType::U256 => f.write_str("U256"),
            ConstantType::Address => f.write_str("Address"),
            ConstantType::Vector(inner) => write!(f, "Vector({inner})"),
        }
    }
}

impl FromStr for ConstantType {
    type Err = ConstantError;

    /// Parse `U8`, `Vector(U8)` and the Move spellings `u8`, `vector<u8>`
    ///
    /// Tags nested deeper than a decoded constant type may be, that is more
    /// than [`SIGNATURE_TOKEN_DEPTH_MAX`] tokens in all, are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ConstantError::UnknownTypeTag(s.to_string());

        let mut text = s.trim();
        let mut depth = 0usize;
        while let Some(inner) = strip_vector(text) {
            depth += 1;
            if depth >= SIGNATURE_TOKEN_DEPTH_MAX {
                return Err(unknown());
            }
            text = inner.trim();
        }

        let mut ty = match text {
            "Bool" | "bool" => ConstantType::Bool,
            "U8" | "u8" => ConstantType::U8,
            "U16" | "u16" => ConstantType::U16,
            "U32" | "u32" => ConstantType::U32,
            "U64" | "u64" => ConstantType::U64,
            "U128" | "u128" => ConstantType::U128,
            "U256" | "u256" => ConstantType::U256,
            "Address" | "address" => ConstantType::Address,
            _ => return Err(unknown()),
        };
        for _ in 0..depth {
            ty = ConstantType::Vector(Box::new(ty));
        }
        Ok(ty)
    }
}

fn strip_vector(text: &str) -> Option<&str> {
    text.strip_prefix("Vector(")
        .and_then(|rest| rest.strip_suffix(')'))
        .or_else(|| {
            text.strip_prefix("vector<")
                .and_then(|rest| rest.strip_suffix('>'))
        })
}

/// A constant pool entry: type tag and serialized value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constant {
    /// Type of the value
    pub type_tag: ConstantType,
    /// Serialized value bytes
    #[serde(with = "hex::serde")]
    pub value: Vec<u8>,
}

impl Constant {
    /// Decode a type token followed by the length-prefixed value
    pub fn decode(reader: &mut BytecodeReader<'_>, version: u32) -> Result<Self, DecodeError> {
        let type_tag = ConstantType::decode(reader, version)?;
        let value = reader.read_byte_string()?;
        Ok(Self { type_tag, value })
    }

    /// Encode the type token and the length-prefixed value
    pub fn encode(&self, writer: &mut BytecodeWriter) {
        self.type_tag.encode(writer);
        writer.emit_byte_string(&self.value);
    }

    /// Parse the value bytes according to the type tag
    pub fn decode_value(&self) -> Result<ConstantValue, ConstantError> {
        ConstantValue::decode(&self.type_tag, &self.value)
    }
}

/// A parsed constant value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstantValue {
    /// `bool`
    Bool(bool),
    /// `u8`
    U8(u8),
    /// `u16`
    U16(u16),
    /// `u32`
    U32(u32),
    /// `u64`
    U64(u64),
    /// `u128`
    U128(u128),
    /// `u256`, little-endian bytes
    U256([u8; 32]),
    /// `address`
    Address([u8; ADDRESS_LENGTH]),
    /// `vector<T>`
    Vector(Vec<ConstantValue>),
}

impl ConstantValue {
    /// Parse `bytes` as a complete value of type `type_tag`
    pub fn decode(type_tag: &ConstantType, bytes: &[u8]) -> Result<Self, ConstantError> {
        if let Some(expected) = type_tag.fixed_size() {
            if bytes.len() != expected {
                return Err(ConstantError::LengthMismatch {
                    type_tag: type_tag.clone(),
                    expected,
                    actual: bytes.len(),
                });
            }
        }
        let mut reader = BytecodeReader::new(bytes);
        let value = Self::decode_from(type_tag, &mut reader).map_err(|source| {
            ConstantError::Malformed {
                type_tag: type_tag.clone(),
                source,
            }
        })?;
        if reader.has_more() {
            return Err(ConstantError::TrailingBytes {
                type_tag: type_tag.clone(),
                count: reader.remaining(),
            });
        }
        Ok(value)
    }

    fn decode_from(
        type_tag: &ConstantType,
        reader: &mut BytecodeReader<'_>,
    ) -> Result<Self, DecodeError> {
        Ok(match type_tag {
            ConstantType::Bool => ConstantValue::Bool(reader.read_bool("bool constant")?),
            ConstantType::U8 => ConstantValue::U8(reader.read_u8()?),
            ConstantType::U16 => ConstantValue::U16(reader.read_u16()?),
            ConstantType::U32 => ConstantValue::U32(reader.read_u32()?),
            ConstantType::U64 => ConstantValue::U64(reader.read_u64()?),
            ConstantType::U128 => ConstantValue::U128(reader.read_u128()?),
            ConstantType::U256 => ConstantValue::U256(reader.read_array()?),
            ConstantType::Address => ConstantValue::Address(reader.read_array()?),
            ConstantType::Vector(inner) => {
                let count = reader.read_count()?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(Self::decode_from(inner, reader)?);
                }
                ConstantValue::Vector(items)
            }
        })
    }

    /// Serialize into value bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BytecodeWriter::new();
        self.encode_into(&mut writer);
        writer.into_bytes()
    }

    fn encode_into(&self, writer: &mut BytecodeWriter) {
        match self {
            ConstantValue::Bool(b) => writer.emit_u8(u8::from(*b)),
            ConstantValue::U8(v) => writer.emit_u8(*v),
            ConstantValue::U16(v) => writer.emit_u16(*v),
            ConstantValue::U32(v) => writer.emit_u32(*v),
            ConstantValue::U64(v) => writer.emit_u64(*v),
            ConstantValue::U128(v) => writer.emit_u128(*v),
            ConstantValue::U256(bytes) | ConstantValue::Address(bytes) => writer.emit_bytes(bytes),
            ConstantValue::Vector(items) => {
                writer.emit_len(items.len());
                for item in items {
                    item.encode_into(writer);
                }
            }
        }
    }

    fn as_byte_string(items: &[ConstantValue]) -> Option<Vec<u8>> {
        items
            .iter()
            .map(|item| match item {
                ConstantValue::U8(b) if (0x20..0x7f).contains(b) => Some(*b),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Bool(b) => write!(f, "{b}"),
            ConstantValue::U8(v) => write!(f, "{v}"),
            ConstantValue::U16(v) => write!(f, "{v}"),
            ConstantValue::U32(v) => write!(f, "{v}"),
            ConstantValue::U64(v) => write!(f, "{v}"),
            ConstantValue::U128(v) => write!(f, "{v}"),
            ConstantValue::U256(le) => {
                let mut be = *le;
                be.reverse();
                write!(f, "0x{}", hex::encode(be))
            }
            ConstantValue::Address(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            ConstantValue::Vector(items) => {
                if let Some(text) = Self::as_byte_string(items).filter(|t| !t.is_empty()) {
                    f.write_str("b\"")?;
                    for byte in text {
                        match byte {
                            b'"' | b'\\' => write!(f, "\\{}", char::from(byte))?,
                            _ => write!(f, "{}", char::from(byte))?,
                        }
                    }
                    return f.write_str("\"");
                }
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector_u8() -> ConstantType {
        ConstantType::Vector(Box::new(ConstantType::U8))
    }

    #[test]
    fn test_type_tag_parsing() {
        assert_eq!("U8".parse::<ConstantType>().unwrap(), ConstantType::U8);
        assert_eq!("Vector(U8)".parse::<ConstantType>().unwrap(), vector_u8());
        assert_eq!("vector<u8>".parse::<ConstantType>().unwrap(), vector_u8());
        assert_eq!(
            "Vector(Vector(Address))".parse::<ConstantType>().unwrap(),
            ConstantType::Vector(Box::new(ConstantType::Vector(Box::new(
                ConstantType::Address
            ))))
        );
        assert_eq!(
            "U9".parse::<ConstantType>(),
            Err(ConstantError::UnknownTypeTag("U9".to_string()))
        );
        assert!("Vector(U8".parse::<ConstantType>().is_err());
        assert!("Signer".parse::<ConstantType>().is_err());
    }

    #[test]
    fn test_type_tag_display() {
        assert_eq!(vector_u8().to_string(), "Vector(U8)");
        assert_eq!(ConstantType::U256.to_string(), "U256");
    }

    #[test]
    fn test_type_tag_nesting_limit() {
        let nested = |depth: usize| format!("{}U8{}", "Vector(".repeat(depth), ")".repeat(depth));

        let deepest = nested(SIGNATURE_TOKEN_DEPTH_MAX - 1);
        let ty = deepest.parse::<ConstantType>().unwrap();
        let mut writer = BytecodeWriter::new();
        ty.encode(&mut writer);
        let mut reader = BytecodeReader::new(writer.buffer());
        assert_eq!(ConstantType::decode(&mut reader, VERSION_6).unwrap(), ty);

        let too_deep = nested(SIGNATURE_TOKEN_DEPTH_MAX);
        assert_eq!(
            too_deep.parse::<ConstantType>(),
            Err(ConstantError::UnknownTypeTag(too_deep.clone()))
        );

        let huge = nested(200_000);
        assert!(matches!(
            huge.parse::<ConstantType>(),
            Err(ConstantError::UnknownTypeTag(_))
        ));
    }

    #[test]
    fn test_type_token_roundtrip() {
        let mut writer = BytecodeWriter::new();
        vector_u8().encode(&mut writer);
        assert_eq!(writer.buffer(), &[0x0A, 0x02]);

        let bytes = writer.into_bytes();
        let mut reader = BytecodeReader::new(&bytes);
        assert_eq!(ConstantType::decode(&mut reader, VERSION_6).unwrap(), vector_u8());
    }

    #[test]
    fn test_non_constant_token_rejected() {
        let mut reader = BytecodeReader::new(&[tags::SIGNER]);
        assert!(matches!(
            ConstantType::decode(&mut reader, VERSION_6),
            Err(DecodeError::InvalidTag { value: 0x0C, .. })
        ));
    }

    #[test]
    fn test_fixed_width_check() {
        assert!(ConstantType::U8.check_value(&[6]).is_ok());
        assert_eq!(
            ConstantType::U64.check_value(&[1, 2, 3]),
            Err(ConstantError::LengthMismatch {
                type_tag: ConstantType::U64,
                expected: 8,
                actual: 3,
            })
        );
        assert!(matches!(
            ConstantType::Bool.check_value(&[2]),
            Err(ConstantError::Malformed { .. })
        ));
    }

    #[test]
    fn test_vector_check() {
        assert!(vector_u8().check_value(&[4, b'T', b'M', b'P', b'L']).is_ok());
        assert!(vector_u8().check_value(&[0]).is_ok());
        assert!(matches!(
            vector_u8().check_value(&[3, b'M', b'C']),
            Err(ConstantError::Malformed { .. })
        ));
        assert_eq!(
            vector_u8().check_value(&[1, b'M', b'C']),
            Err(ConstantError::TrailingBytes {
                type_tag: vector_u8(),
                count: 1,
            })
        );
    }

    #[test]
    fn test_value_rendering() {
        let tmpl = ConstantValue::decode(&vector_u8(), &[4, b'T', b'M', b'P', b'L']).unwrap();
        assert_eq!(tmpl.to_string(), "b\"TMPL\"");

        let raw = ConstantValue::decode(&vector_u8(), &[2, 0, 1]).unwrap();
        assert_eq!(raw.to_string(), "[0, 1]");

        let n = ConstantValue::decode(&ConstantType::U64, &7u64.to_le_bytes()).unwrap();
        assert_eq!(n.to_string(), "7");

        let mut one = [0u8; 32];
        one[0] = 1;
        let big = ConstantValue::decode(&ConstantType::U256, &one).unwrap();
        assert!(big.to_string().ends_with("01"));
    }

    #[test]
    fn test_value_encode() {
        let value = ConstantValue::Vector(vec![
            ConstantValue::U8(b'M'),
            ConstantValue::U8(b'C'),
            ConstantValue::U8(b'N'),
        ]);
        assert_eq!(value.encode(), vec![3, b'M', b'C', b'N']);
        assert_eq!(ConstantValue::U16(0x0102).encode(), vec![0x02, 0x01]);
    }

    #[test]
    fn test_constant_json_uses_hex() {
        let constant = Constant {
            type_tag: ConstantType::U8,
            value: vec![6],
        };
        let json = serde_json::to_string(&constant).unwrap();
        assert_eq!(json, r#"{"type_tag":"U8","value":"06"}"#);
        assert_eq!(serde_json::from_str::<Constant>(&json).unwrap(), constant);
    }
}
