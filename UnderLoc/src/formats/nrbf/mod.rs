//! MS-NRBF record stream
//!
//! The payload of a UDLG container is a .NET binary serialization stream: a
//! flat sequence of records where class and array records carry their member
//! values inline. Every record is kept with all of its fields so the stream
//! can be written back byte for byte.

mod reader;
mod writer;

pub use reader::{RecordReader, parse_records};
pub use writer::{RecordWriter, write_records};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Record type discriminators
pub mod record_type {
    pub const SERIALIZED_STREAM_HEADER: u8 = 0;
    pub const CLASS_WITH_ID: u8 = 1;
    pub const SYSTEM_CLASS_WITH_MEMBERS: u8 = 2;
    pub const CLASS_WITH_MEMBERS: u8 = 3;
    pub const SYSTEM_CLASS_WITH_MEMBERS_AND_TYPES: u8 = 4;
    pub const CLASS_WITH_MEMBERS_AND_TYPES: u8 = 5;
    pub const BINARY_OBJECT_STRING: u8 = 6;
    pub const BINARY_ARRAY: u8 = 7;
    pub const MEMBER_PRIMITIVE_TYPED: u8 = 8;
    pub const MEMBER_REFERENCE: u8 = 9;
    pub const OBJECT_NULL: u8 = 10;
    pub const MESSAGE_END: u8 = 11;
    pub const BINARY_LIBRARY: u8 = 12;
    pub const OBJECT_NULL_MULTIPLE_256: u8 = 13;
    pub const OBJECT_NULL_MULTIPLE: u8 = 14;
    pub const ARRAY_SINGLE_PRIMITIVE: u8 = 15;
    pub const ARRAY_SINGLE_OBJECT: u8 = 16;
    pub const ARRAY_SINGLE_STRING: u8 = 17;
}

/// Primitive type enumeration (MS-NRBF 2.1.2.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Decimal,
    Double,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    TimeSpan,
    DateTime,
    UInt16,
    UInt32,
    UInt64,
    Null,
    String,
}

impl PrimitiveType {
    /// Decode the enumeration byte
    ///
    /// # Errors
    /// Returns [`Error::InvalidEnumValue`] for unassigned values.
    pub fn from_byte(value: u8) -> Result<Self> {
        Ok(match value {
            1 => Self::Boolean,
            2 => Self::Byte,
            3 => Self::Char,
            5 => Self::Decimal,
            6 => Self::Double,
            7 => Self::Int16,
            8 => Self::Int32,
            9 => Self::Int64,
            10 => Self::SByte,
            11 => Self::Single,
            12 => Self::TimeSpan,
            13 => Self::DateTime,
            14 => Self::UInt16,
            15 => Self::UInt32,
            16 => Self::UInt64,
            17 => Self::Null,
            18 => Self::String,
            _ => {
                return Err(Error::InvalidEnumValue {
                    kind: "PrimitiveType",
                    value,
                });
            }
        })
    }

    /// Encode the enumeration byte
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Boolean => 1,
            Self::Byte => 2,
            Self::Char => 3,
            Self::Decimal => 5,
            Self::Double => 6,
            Self::Int16 => 7,
            Self::Int32 => 8,
            Self::Int64 => 9,
            Self::SByte => 10,
            Self::Single => 11,
            Self::TimeSpan => 12,
            Self::DateTime => 13,
            Self::UInt16 => 14,
            Self::UInt32 => 15,
            Self::UInt64 => 16,
            Self::Null => 17,
            Self::String => 18,
        }
    }
}

/// A primitive value. Carries its own type so it can be written without
/// consulting member metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Primitive {
    Boolean(bool),
    Byte(u8),
    Char(char),
    /// Decimal is serialized as its invariant-culture string form.
    Decimal(String),
    Double(#[serde(with = "float_repr::double")] f64),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    SByte(i8),
    Single(#[serde(with = "float_repr::single")] f32),
    TimeSpan(i64),
    /// Raw 64-bit value: ticks plus the two `DateTimeKind` bits.
    DateTime(u64),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Null,
    String(String),
}

impl Primitive {
    /// The primitive type tag of this value
    #[must_use]
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Self::Boolean(_) => PrimitiveType::Boolean,
            Self::Byte(_) => PrimitiveType::Byte,
            Self::Char(_) => PrimitiveType::Char,
            Self::Decimal(_) => PrimitiveType::Decimal,
            Self::Double(_) => PrimitiveType::Double,
            Self::Int16(_) => PrimitiveType::Int16,
            Self::Int32(_) => PrimitiveType::Int32,
            Self::Int64(_) => PrimitiveType::Int64,
            Self::SByte(_) => PrimitiveType::SByte,
            Self::Single(_) => PrimitiveType::Single,
            Self::TimeSpan(_) => PrimitiveType::TimeSpan,
            Self::DateTime(_) => PrimitiveType::DateTime,
            Self::UInt16(_) => PrimitiveType::UInt16,
            Self::UInt32(_) => PrimitiveType::UInt32,
            Self::UInt64(_) => PrimitiveType::UInt64,
            Self::Null => PrimitiveType::Null,
            Self::String(_) => PrimitiveType::String,
        }
    }
}

/// Binary type enumeration plus its additional type info (MS-NRBF 2.1.2.2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "binary_type", content = "info")]
pub enum MemberType {
    Primitive(PrimitiveType),
    String,
    Object,
    SystemClass(String),
    Class(ClassTypeInfo),
    ObjectArray,
    StringArray,
    PrimitiveArray(PrimitiveType),
}

impl MemberType {
    pub(crate) fn binary_type_byte(&self) -> u8 {
        match self {
            Self::Primitive(_) => 0,
            Self::String => 1,
            Self::Object => 2,
            Self::SystemClass(_) => 3,
            Self::Class(_) => 4,
            Self::ObjectArray => 5,
            Self::StringArray => 6,
            Self::PrimitiveArray(_) => 7,
        }
    }

    /// Primitive members are stored inline without a record header.
    pub(crate) fn inline_primitive(&self) -> Option<PrimitiveType> {
        match self {
            Self::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Type name and library of a user class member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTypeInfo {
    pub type_name: String,
    pub library_id: i32,
}

/// Name, id and member names of a class record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub object_id: i32,
    pub name: String,
    pub member_names: Vec<String>,
}

/// Array shape (MS-NRBF 2.4.1.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryArrayType {
    Single,
    Jagged,
    Rectangular,
    SingleOffset,
    JaggedOffset,
    RectangularOffset,
}

impl BinaryArrayType {
    /// Decode the enumeration byte
    ///
    /// # Errors
    /// Returns [`Error::InvalidEnumValue`] for unassigned values.
    pub fn from_byte(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::Single,
            1 => Self::Jagged,
            2 => Self::Rectangular,
            3 => Self::SingleOffset,
            4 => Self::JaggedOffset,
            5 => Self::RectangularOffset,
            _ => {
                return Err(Error::InvalidEnumValue {
                    kind: "BinaryArrayType",
                    value,
                });
            }
        })
    }

    /// Encode the enumeration byte
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Single => 0,
            Self::Jagged => 1,
            Self::Rectangular => 2,
            Self::SingleOffset => 3,
            Self::JaggedOffset => 4,
            Self::RectangularOffset => 5,
        }
    }

    /// Whether lower bounds follow the lengths
    #[must_use]
    pub fn has_lower_bounds(self) -> bool {
        matches!(
            self,
            Self::SingleOffset | Self::JaggedOffset | Self::RectangularOffset
        )
    }
}

/// A member or element value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A nested record (string, reference, null, class, array, library)
    Record(Box<Record>),
    /// An inline primitive of a typed member or primitive array
    Primitive(Primitive),
}

impl Value {
    /// The nested record, if this value is one
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Primitive(_) => None,
        }
    }

    /// Number of member/element slots this value fills.
    ///
    /// A `BinaryLibrary` fills none, null runs fill their count.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        match self {
            Self::Primitive(_) => 1,
            Self::Record(record) => match record.as_ref() {
                Record::BinaryLibrary { .. } => 0,
                Record::ObjectNullMultiple256 { null_count } => usize::from(*null_count),
                Record::ObjectNullMultiple { null_count } => {
                    usize::try_from(*null_count).unwrap_or(0)
                }
                _ => 1,
            },
        }
    }
}

/// Header fields of the `SerializedStreamHeader` record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHeader {
    pub root_id: i32,
    pub header_id: i32,
    pub major_version: i32,
    pub minor_version: i32,
}

/// One MS-NRBF record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record")]
pub enum Record {
    SerializedStreamHeader(StreamHeader),
    ClassWithId {
        object_id: i32,
        metadata_id: i32,
        values: Vec<Value>,
    },
    SystemClassWithMembers {
        class_info: ClassInfo,
        values: Vec<Value>,
    },
    ClassWithMembers {
        class_info: ClassInfo,
        library_id: i32,
        values: Vec<Value>,
    },
    SystemClassWithMembersAndTypes {
        class_info: ClassInfo,
        member_types: Vec<MemberType>,
        values: Vec<Value>,
    },
    ClassWithMembersAndTypes {
        class_info: ClassInfo,
        member_types: Vec<MemberType>,
        library_id: i32,
        values: Vec<Value>,
    },
    BinaryObjectString {
        object_id: i32,
        value: String,
    },
    BinaryArray {
        object_id: i32,
        array_type: BinaryArrayType,
        lengths: Vec<i32>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        lower_bounds: Vec<i32>,
        item_type: MemberType,
        values: Vec<Value>,
    },
    MemberPrimitiveTyped {
        value: Primitive,
    },
    MemberReference {
        id_ref: i32,
    },
    ObjectNull,
    MessageEnd,
    BinaryLibrary {
        library_id: i32,
        library_name: String,
    },
    ObjectNullMultiple256 {
        null_count: u8,
    },
    ObjectNullMultiple {
        null_count: i32,
    },
    ArraySinglePrimitive {
        object_id: i32,
        primitive_type: PrimitiveType,
        values: Vec<Primitive>,
    },
    ArraySingleObject {
        object_id: i32,
        length: i32,
        values: Vec<Value>,
    },
    ArraySingleString {
        object_id: i32,
        length: i32,
        values: Vec<Value>,
    },
}

impl Record {
    /// The record type byte
    #[must_use]
    pub fn type_byte(&self) -> u8 {
        use record_type as rt;
        match self {
            Self::SerializedStreamHeader(_) => rt::SERIALIZED_STREAM_HEADER,
            Self::ClassWithId { .. } => rt::CLASS_WITH_ID,
            Self::SystemClassWithMembers { .. } => rt::SYSTEM_CLASS_WITH_MEMBERS,
            Self::ClassWithMembers { .. } => rt::CLASS_WITH_MEMBERS,
            Self::SystemClassWithMembersAndTypes { .. } => rt::SYSTEM_CLASS_WITH_MEMBERS_AND_TYPES,
            Self::ClassWithMembersAndTypes { .. } => rt::CLASS_WITH_MEMBERS_AND_TYPES,
            Self::BinaryObjectString { .. } => rt::BINARY_OBJECT_STRING,
            Self::BinaryArray { .. } => rt::BINARY_ARRAY,
            Self::MemberPrimitiveTyped { .. } => rt::MEMBER_PRIMITIVE_TYPED,
            Self::MemberReference { .. } => rt::MEMBER_REFERENCE,
            Self::ObjectNull => rt::OBJECT_NULL,
            Self::MessageEnd => rt::MESSAGE_END,
            Self::BinaryLibrary { .. } => rt::BINARY_LIBRARY,
            Self::ObjectNullMultiple256 { .. } => rt::OBJECT_NULL_MULTIPLE_256,
            Self::ObjectNullMultiple { .. } => rt::OBJECT_NULL_MULTIPLE,
            Self::ArraySinglePrimitive { .. } => rt::ARRAY_SINGLE_PRIMITIVE,
            Self::ArraySingleObject { .. } => rt::ARRAY_SINGLE_OBJECT,
            Self::ArraySingleString { .. } => rt::ARRAY_SINGLE_STRING,
        }
    }

    /// Class info for records that define a class layout
    #[must_use]
    pub fn class_info(&self) -> Option<&ClassInfo> {
        match self {
            Self::SystemClassWithMembers { class_info, .. }
            | Self::ClassWithMembers { class_info, .. }
            | Self::SystemClassWithMembersAndTypes { class_info, .. }
            | Self::ClassWithMembersAndTypes { class_info, .. } => Some(class_info),
            _ => None,
        }
    }

    /// Member or element values owned by this record
    #[must_use]
    pub fn values(&self) -> Option<&[Value]> {
        match self {
            Self::ClassWithId { values, .. }
            | Self::SystemClassWithMembers { values, .. }
            | Self::ClassWithMembers { values, .. }
            | Self::SystemClassWithMembersAndTypes { values, .. }
            | Self::ClassWithMembersAndTypes { values, .. }
            | Self::BinaryArray { values, .. }
            | Self::ArraySingleObject { values, .. }
            | Self::ArraySingleString { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Mutable member or element values owned by this record
    pub fn values_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Self::ClassWithId { values, .. }
            | Self::SystemClassWithMembers { values, .. }
            | Self::ClassWithMembers { values, .. }
            | Self::SystemClassWithMembersAndTypes { values, .. }
            | Self::ClassWithMembersAndTypes { values, .. }
            | Self::BinaryArray { values, .. }
            | Self::ArraySingleObject { values, .. }
            | Self::ArraySingleString { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Whether this record is a class instance (its values are members)
    #[must_use]
    pub fn is_class(&self) -> bool {
        matches!(self, Self::ClassWithId { .. }) || self.class_info().is_some()
    }

    /// Object id of the class layout this record's members follow
    #[must_use]
    pub fn layout_id(&self) -> Option<i32> {
        match self {
            Self::ClassWithId { metadata_id, .. } => Some(*metadata_id),
            _ => self.class_info().map(|info| info.object_id),
        }
    }
}

/// Serde helpers for floats: finite values are JSON numbers, NaN and the
/// infinities (which JSON cannot hold) are hex bit patterns.
mod float_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Bits(String),
    }

    fn parse_bits<E: serde::de::Error>(text: &str) -> Result<u64, E> {
        let digits = text.strip_prefix("0x").unwrap_or(text);
        u64::from_str_radix(digits, 16).map_err(E::custom)
    }

    pub mod double {
        use super::{Deserialize, Deserializer, Repr, Serializer, parse_bits};

        pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
            if value.is_finite() {
                serializer.serialize_f64(*value)
            } else {
                serializer.serialize_str(&format!("{:#018x}", value.to_bits()))
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
            match Repr::deserialize(deserializer)? {
                Repr::Number(value) => Ok(value),
                Repr::Bits(text) => parse_bits::<D::Error>(&text).map(f64::from_bits),
            }
        }
    }

    pub mod single {
        use super::{Deserialize, Deserializer, Repr, Serializer, parse_bits};

        // Written through f64 so the decimal form parses back to the same f32.
        pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
            if value.is_finite() {
                serializer.serialize_f64(f64::from(*value))
            } else {
                serializer.serialize_str(&format!("{:#010x}", value.to_bits()))
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
            match Repr::deserialize(deserializer)? {
                Repr::Number(value) => Ok(value as f32),
                Repr::Bits(text) => {
                    let bits = parse_bits::<D::Error>(&text)?;
                    u32::try_from(bits)
                        .map(f32::from_bits)
                        .map_err(serde::de::Error::custom)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_type_bytes() {
        for byte in [1u8, 2, 3, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18] {
            let kind = PrimitiveType::from_byte(byte).unwrap();
            assert_eq!(kind.to_byte(), byte);
        }
        assert!(PrimitiveType::from_byte(4).is_err());
        assert!(PrimitiveType::from_byte(19).is_err());
    }

    #[test]
    fn test_slot_count() {
        let lib = Value::Record(Box::new(Record::BinaryLibrary {
            library_id: 2,
            library_name: "Assembly".to_string(),
        }));
        let nulls = Value::Record(Box::new(Record::ObjectNullMultiple256 { null_count: 5 }));
        assert_eq!(lib.slot_count(), 0);
        assert_eq!(nulls.slot_count(), 5);
        assert_eq!(Value::Primitive(Primitive::Int32(3)).slot_count(), 1);
    }

    #[test]
    fn test_non_finite_floats_survive_json() {
        let values = vec![
            Primitive::Double(f64::NAN),
            Primitive::Single(f32::INFINITY),
            Primitive::Single(0.1),
            Primitive::Double(-0.0),
        ];
        let json = serde_json::to_string(&values).unwrap();
        let back: Vec<Primitive> = serde_json::from_str(&json).unwrap();

        match (&back[0], &back[1], &back[2], &back[3]) {
            (
                Primitive::Double(a),
                Primitive::Single(b),
                Primitive::Single(c),
                Primitive::Double(d),
            ) => {
                assert_eq!(a.to_bits(), f64::NAN.to_bits());
                assert_eq!(b.to_bits(), f32::INFINITY.to_bits());
                assert_eq!(c.to_bits(), 0.1f32.to_bits());
                assert_eq!(d.to_bits(), (-0.0f64).to_bits());
            }
            other => panic!("unexpected values: {other:?}"),
        }
    }
}
