//! MS-NRBF record stream reading

use std::collections::HashMap;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use super::{
    BinaryArrayType, ClassInfo, ClassTypeInfo, MemberType, Primitive, PrimitiveType, Record,
    StreamHeader, Value, record_type as rt,
};
use crate::error::{Error, Result};

/// Upper bound on speculative allocations driven by length fields.
const MAX_PREALLOC: usize = 4096;

/// Deepest record nesting accepted before giving up.
pub const MAX_NESTING: usize = 512;

/// Member layout remembered for `ClassWithId` records.
#[derive(Debug, Clone)]
struct ClassLayout {
    member_count: usize,
    member_types: Option<Vec<MemberType>>,
}

/// Streaming record reader.
///
/// Class layouts are registered by object id as class records are read, so
/// later `ClassWithId` records can be decoded against them.
pub struct RecordReader<R> {
    reader: R,
    layouts: HashMap<i32, ClassLayout>,
    depth: usize,
}

/// Parse records from `data` up to and including `MessageEnd`.
///
/// Returns the records and the number of bytes they occupied; anything after
/// that offset is left to the caller.
///
/// # Errors
/// Returns an error if the stream is truncated or contains an unsupported
/// or malformed record.
pub fn parse_records(data: &[u8]) -> Result<(Vec<Record>, usize)> {
    let mut reader = RecordReader::new(Cursor::new(data));
    let records = reader.read_stream()?;
    let consumed = reader.into_inner().position() as usize;
    Ok((records, consumed))
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            layouts: HashMap::new(),
            depth: 0,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read top-level records until `MessageEnd`, which is kept as the last record.
    ///
    /// # Errors
    /// Returns an error on truncation or malformed records.
    pub fn read_stream(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        loop {
            let record = self.read_record()?;
            let end = matches!(record, Record::MessageEnd);
            records.push(record);
            if end {
                return Ok(records);
            }
        }
    }

    /// Read one record with everything nested inside it.
    ///
    /// # Errors
    /// Returns an error on truncation or malformed records.
    pub fn read_record(&mut self) -> Result<Record> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(Error::NestingTooDeep { limit: MAX_NESTING });
        }
        let record = self.read_record_body();
        self.depth -= 1;
        record
    }

    fn read_record_body(&mut self) -> Result<Record> {
        let kind = self.reader.read_u8()?;

        let record = match kind {
            rt::SERIALIZED_STREAM_HEADER => Record::SerializedStreamHeader(StreamHeader {
                root_id: self.read_i32()?,
                header_id: self.read_i32()?,
                major_version: self.read_i32()?,
                minor_version: self.read_i32()?,
            }),
            rt::CLASS_WITH_ID => {
                let object_id = self.read_i32()?;
                let metadata_id = self.read_i32()?;
                let layout = self
                    .layouts
                    .get(&metadata_id)
                    .cloned()
                    .ok_or(Error::UnknownMetadataId(metadata_id))?;
                let values =
                    self.read_values(layout.member_count, layout.member_types.as_deref())?;
                Record::ClassWithId {
                    object_id,
                    metadata_id,
                    values,
                }
            }
            rt::SYSTEM_CLASS_WITH_MEMBERS => {
                let class_info = self.read_class_info()?;
                let values = self.register_and_read(&class_info, None)?;
                Record::SystemClassWithMembers { class_info, values }
            }
            rt::CLASS_WITH_MEMBERS => {
                let class_info = self.read_class_info()?;
                let library_id = self.read_i32()?;
                let values = self.register_and_read(&class_info, None)?;
                Record::ClassWithMembers {
                    class_info,
                    library_id,
                    values,
                }
            }
            rt::SYSTEM_CLASS_WITH_MEMBERS_AND_TYPES => {
                let class_info = self.read_class_info()?;
                let member_types = self.read_member_types(class_info.member_names.len())?;
                let values = self.register_and_read(&class_info, Some(&member_types))?;
                Record::SystemClassWithMembersAndTypes {
                    class_info,
                    member_types,
                    values,
                }
            }
            rt::CLASS_WITH_MEMBERS_AND_TYPES => {
                let class_info = self.read_class_info()?;
                let member_types = self.read_member_types(class_info.member_names.len())?;
                let library_id = self.read_i32()?;
                let values = self.register_and_read(&class_info, Some(&member_types))?;
                Record::ClassWithMembersAndTypes {
                    class_info,
                    member_types,
                    library_id,
                    values,
                }
            }
            rt::BINARY_OBJECT_STRING => Record::BinaryObjectString {
                object_id: self.read_i32()?,
                value: self.read_string()?,
            },
            rt::BINARY_ARRAY => self.read_binary_array()?,
            rt::MEMBER_PRIMITIVE_TYPED => {
                let primitive_type = PrimitiveType::from_byte(self.reader.read_u8()?)?;
                Record::MemberPrimitiveTyped {
                    value: self.read_primitive(primitive_type)?,
                }
            }
            rt::MEMBER_REFERENCE => Record::MemberReference {
                id_ref: self.read_i32()?,
            },
            rt::OBJECT_NULL => Record::ObjectNull,
            rt::MESSAGE_END => Record::MessageEnd,
            rt::BINARY_LIBRARY => Record::BinaryLibrary {
                library_id: self.read_i32()?,
                library_name: self.read_string()?,
            },
            rt::OBJECT_NULL_MULTIPLE_256 => Record::ObjectNullMultiple256 {
                null_count: self.reader.read_u8()?,
            },
            rt::OBJECT_NULL_MULTIPLE => {
                let null_count = self.read_i32()?;
                if null_count < 0 {
                    return Err(Error::InvalidLength(i64::from(null_count)));
                }
                Record::ObjectNullMultiple { null_count }
            }
            rt::ARRAY_SINGLE_PRIMITIVE => {
                let object_id = self.read_i32()?;
                let length = self.read_length()?;
                let primitive_type = PrimitiveType::from_byte(self.reader.read_u8()?)?;
                let values = self.read_primitives(length, primitive_type)?;
                Record::ArraySinglePrimitive {
                    object_id,
                    primitive_type,
                    values,
                }
            }
            rt::ARRAY_SINGLE_OBJECT | rt::ARRAY_SINGLE_STRING => {
                let object_id = self.read_i32()?;
                let length = self.read_i32()?;
                let count = usize::try_from(length)
                    .map_err(|_| Error::InvalidLength(i64::from(length)))?;
                let values = self.read_values(count, None)?;
                if kind == rt::ARRAY_SINGLE_OBJECT {
                    Record::ArraySingleObject {
                        object_id,
                        length,
                        values,
                    }
                } else {
                    Record::ArraySingleString {
                        object_id,
                        length,
                        values,
                    }
                }
            }
            // MethodCall/MethodReturn and anything unassigned
            other => return Err(Error::UnsupportedRecordType(other)),
        };

        Ok(record)
    }

    fn register_and_read(
        &mut self,
        class_info: &ClassInfo,
        member_types: Option<&[MemberType]>,
    ) -> Result<Vec<Value>> {
        let member_count = class_info.member_names.len();
        self.layouts.insert(
            class_info.object_id,
            ClassLayout {
                member_count,
                member_types: member_types.map(<[MemberType]>::to_vec),
            },
        );
        self.read_values(member_count, member_types)
    }

    /// Read `count` member or element slots.
    ///
    /// Slots typed as primitives are read inline, everything else is a record.
    /// Libraries interleaved with the values fill no slot; null runs fill several.
    fn read_values(
        &mut self,
        count: usize,
        member_types: Option<&[MemberType]>,
    ) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(count.min(MAX_PREALLOC));
        let mut filled = 0;

        while filled < count {
            let inline = member_types
                .and_then(|types| types.get(filled))
                .and_then(MemberType::inline_primitive);
            let value = match inline {
                Some(kind) => Value::Primitive(self.read_primitive(kind)?),
                None => Value::Record(Box::new(self.read_record()?)),
            };
            filled += value.slot_count();
            values.push(value);
        }

        if filled > count {
            return Err(Error::ArrayOverflow {
                declared: count,
                found: filled,
            });
        }
        Ok(values)
    }

    fn read_binary_array(&mut self) -> Result<Record> {
        let object_id = self.read_i32()?;
        let array_type = BinaryArrayType::from_byte(self.reader.read_u8()?)?;
        let rank = self.read_length()?;

        let mut lengths = Vec::with_capacity(rank.min(MAX_PREALLOC));
        for _ in 0..rank {
            lengths.push(self.read_i32()?);
        }
        let mut lower_bounds = Vec::new();
        if array_type.has_lower_bounds() {
            for _ in 0..rank {
                lower_bounds.push(self.read_i32()?);
            }
        }

        let item_type = self.read_member_types(1)?.remove(0);
        let count = element_count(&lengths)?;
        let values = match item_type.inline_primitive() {
            Some(kind) => self
                .read_primitives(count, kind)?
                .into_iter()
                .map(Value::Primitive)
                .collect(),
            None => self.read_values(count, None)?,
        };

        Ok(Record::BinaryArray {
            object_id,
            array_type,
            lengths,
            lower_bounds,
            item_type,
            values,
        })
    }

    fn read_class_info(&mut self) -> Result<ClassInfo> {
        let object_id = self.read_i32()?;
        let name = self.read_string()?;
        let member_count = self.read_length()?;
        let mut member_names = Vec::with_capacity(member_count.min(MAX_PREALLOC));
        for _ in 0..member_count {
            member_names.push(self.read_string()?);
        }
        Ok(ClassInfo {
            object_id,
            name,
            member_names,
        })
    }

    /// `MemberTypeInfo`: all binary type bytes first, then the additional infos.
    fn read_member_types(&mut self, count: usize) -> Result<Vec<MemberType>> {
        let mut binary_types = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            binary_types.push(self.reader.read_u8()?);
        }

        binary_types
            .into_iter()
            .map(|binary_type| {
                Ok(match binary_type {
                    0 => MemberType::Primitive(self.read_primitive_type()?),
                    1 => MemberType::String,
                    2 => MemberType::Object,
                    3 => MemberType::SystemClass(self.read_string()?),
                    4 => MemberType::Class(ClassTypeInfo {
                        type_name: self.read_string()?,
                        library_id: self.read_i32()?,
                    }),
                    5 => MemberType::ObjectArray,
                    6 => MemberType::StringArray,
                    7 => MemberType::PrimitiveArray(self.read_primitive_type()?),
                    value => {
                        return Err(Error::InvalidEnumValue {
                            kind: "BinaryType",
                            value,
                        });
                    }
                })
            })
            .collect()
    }

    fn read_primitive_type(&mut self) -> Result<PrimitiveType> {
        PrimitiveType::from_byte(self.reader.read_u8()?)
    }

    /// Elements of a primitive array. Null and String have no fixed width
    /// and are not valid element types.
    fn read_primitives(&mut self, count: usize, kind: PrimitiveType) -> Result<Vec<Primitive>> {
        if matches!(kind, PrimitiveType::Null | PrimitiveType::String) {
            return Err(Error::InvalidEnumValue {
                kind: "array PrimitiveType",
                value: kind.to_byte(),
            });
        }
        let mut values = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            values.push(self.read_primitive(kind)?);
        }
        Ok(values)
    }

    fn read_primitive(&mut self, kind: PrimitiveType) -> Result<Primitive> {
        Ok(match kind {
            PrimitiveType::Boolean => match self.reader.read_u8()? {
                0 => Primitive::Boolean(false),
                1 => Primitive::Boolean(true),
                other => return Err(Error::InvalidBoolean(other)),
            },
            PrimitiveType::Byte => Primitive::Byte(self.reader.read_u8()?),
            PrimitiveType::Char => Primitive::Char(self.read_char()?),
            PrimitiveType::Decimal => Primitive::Decimal(self.read_string()?),
            PrimitiveType::Double => Primitive::Double(self.reader.read_f64::<LittleEndian>()?),
            PrimitiveType::Int16 => Primitive::Int16(self.reader.read_i16::<LittleEndian>()?),
            PrimitiveType::Int32 => Primitive::Int32(self.reader.read_i32::<LittleEndian>()?),
            PrimitiveType::Int64 => Primitive::Int64(self.reader.read_i64::<LittleEndian>()?),
            PrimitiveType::SByte => Primitive::SByte(self.reader.read_i8()?),
            PrimitiveType::Single => Primitive::Single(self.reader.read_f32::<LittleEndian>()?),
            PrimitiveType::TimeSpan => Primitive::TimeSpan(self.reader.read_i64::<LittleEndian>()?),
            PrimitiveType::DateTime => Primitive::DateTime(self.reader.read_u64::<LittleEndian>()?),
            PrimitiveType::UInt16 => Primitive::UInt16(self.reader.read_u16::<LittleEndian>()?),
            PrimitiveType::UInt32 => Primitive::UInt32(self.reader.read_u32::<LittleEndian>()?),
            PrimitiveType::UInt64 => Primitive::UInt64(self.reader.read_u64::<LittleEndian>()?),
            PrimitiveType::Null => Primitive::Null,
            PrimitiveType::String => Primitive::String(self.read_string()?),
        })
    }

    /// A char is one UTF-8 encoded scalar with no length prefix.
    fn read_char(&mut self) -> Result<char> {
        let lead = self.reader.read_u8()?;
        let width = match lead {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Err(Error::InvalidChar),
        };
        let mut buf = [lead, 0, 0, 0];
        self.reader.read_exact(&mut buf[1..width])?;
        std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or(Error::InvalidChar)
    }

    /// Length-prefixed UTF-8 string with a 7-bit encoded length.
    fn read_string(&mut self) -> Result<String> {
        let len = read_var_len(&mut self.reader)?;
        let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOC));
        let read = (&mut self.reader).take(len as u64).read_to_end(&mut bytes)?;
        if read != len {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("string of {len} bytes truncated after {read}"),
            )));
        }
        Ok(String::from_utf8(bytes)?)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.reader.read_i32::<LittleEndian>()?)
    }

    /// A non-negative i32 count.
    fn read_length(&mut self) -> Result<usize> {
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| Error::InvalidLength(i64::from(value)))
    }
}

/// Read a 7-bit encoded length of at most five bytes.
fn read_var_len<R: Read>(reader: &mut R) -> Result<usize> {
    let mut value: u32 = 0;
    for index in 0..5 {
        let byte = reader.read_u8()?;
        if index == 4 && byte > 0x0F {
            return Err(Error::InvalidVarInt);
        }
        value |= u32::from(byte & 0x7F) << (7 * index);
        if byte & 0x80 == 0 {
            return i32::try_from(value)
                .map(|v| v as usize)
                .map_err(|_| Error::InvalidLength(i64::from(value)));
        }
    }
    Err(Error::InvalidVarInt)
}

/// Product of all dimension lengths.
fn element_count(lengths: &[i32]) -> Result<usize> {
    lengths.iter().try_fold(1usize, |total, &length| {
        let length =
            usize::try_from(length).map_err(|_| Error::InvalidLength(i64::from(length)))?;
        total
            .checked_mul(length)
            .ok_or_else(|| Error::UnsupportedArray(format!("element count overflows: {lengths:?}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes() -> Vec<u8> {
        let mut bytes = vec![0u8];
        for v in [1i32, -1, 1, 0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_var_len() {
        assert_eq!(read_var_len(&mut Cursor::new([0x05u8])).unwrap(), 5);
        assert_eq!(read_var_len(&mut Cursor::new([0x80u8, 0x01])).unwrap(), 128);
        assert!(matches!(
            read_var_len(&mut Cursor::new([0xFFu8, 0xFF, 0xFF, 0xFF, 0xFF, 0x01])),
            Err(Error::InvalidVarInt)
        ));
        assert!(matches!(
            read_var_len(&mut Cursor::new([0xFFu8, 0xFF, 0xFF, 0xFF, 0x0F])),
            Err(Error::InvalidLength(_))
        ));
    }

    #[test]
    fn test_reads_until_message_end_and_reports_consumed() {
        let mut data = header_bytes();
        data.extend_from_slice(&[6, 2, 0, 0, 0, 3, b'a', b'b', b'c']);
        data.push(11);
        let stream_len = data.len();
        data.extend_from_slice(b"TRAILER");

        let (records, consumed) = parse_records(&data).unwrap();
        assert_eq!(consumed, stream_len);
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[1],
            Record::BinaryObjectString {
                object_id: 2,
                value: "abc".to_string()
            }
        );
        assert_eq!(records[2], Record::MessageEnd);
    }

    #[test]
    fn test_truncated_string() {
        let mut data = header_bytes();
        data.extend_from_slice(&[6, 2, 0, 0, 0, 10, b'a']);
        assert!(matches!(parse_records(&data), Err(Error::Io(_))));
    }

    #[test]
    fn test_unsupported_record_type() {
        let mut data = header_bytes();
        data.push(21);
        assert!(matches!(
            parse_records(&data),
            Err(Error::UnsupportedRecordType(21))
        ));
    }

    #[test]
    fn test_class_with_id_requires_known_metadata() {
        let mut data = header_bytes();
        data.push(1);
        data.extend_from_slice(&5i32.to_le_bytes());
        data.extend_from_slice(&99i32.to_le_bytes());
        assert!(matches!(
            parse_records(&data),
            Err(Error::UnknownMetadataId(99))
        ));
    }

    #[test]
    fn test_null_run_overflowing_array() {
        let mut data = header_bytes();
        // ArraySingleObject id 3, length 2, then a run of 3 nulls
        data.push(16);
        data.extend_from_slice(&3i32.to_le_bytes());
        data.extend_from_slice(&2i32.to_le_bytes());
        data.extend_from_slice(&[13, 3]);
        assert!(matches!(
            parse_records(&data),
            Err(Error::ArrayOverflow {
                declared: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn test_library_does_not_fill_a_slot() {
        let mut data = header_bytes();
        data.push(16);
        data.extend_from_slice(&3i32.to_le_bytes());
        data.extend_from_slice(&1i32.to_le_bytes());
        data.push(12);
        data.extend_from_slice(&2i32.to_le_bytes());
        data.extend_from_slice(&[3, b'L', b'i', b'b']);
        data.push(10);
        data.push(11);

        let (records, _) = parse_records(&data).unwrap();
        let values = records[1].values().unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].as_record(), Some(&Record::ObjectNull));
    }

    #[test]
    fn test_zero_width_array_elements_rejected() {
        // ArraySinglePrimitive id 4, ten million Null elements
        let mut single = header_bytes();
        single.push(15);
        single.extend_from_slice(&4i32.to_le_bytes());
        single.extend_from_slice(&10_000_000i32.to_le_bytes());
        single.push(17);

        // BinaryArray id 4, rank 1, same length, item type Primitive(String)
        let mut binary = header_bytes();
        binary.push(7);
        binary.extend_from_slice(&4i32.to_le_bytes());
        binary.push(0);
        binary.extend_from_slice(&1i32.to_le_bytes());
        binary.extend_from_slice(&10_000_000i32.to_le_bytes());
        binary.extend_from_slice(&[0, 18]);

        for (data, byte) in [(single, 17), (binary, 18)] {
            assert!(matches!(
                parse_records(&data),
                Err(Error::InvalidEnumValue { value, .. }) if value == byte
            ));
        }
    }

    #[test]
    fn test_element_count_overflow() {
        assert!(element_count(&[i32::MAX, i32::MAX, i32::MAX]).is_err());
        assert!(element_count(&[-1]).is_err());
        assert_eq!(element_count(&[2, 3]).unwrap(), 6);
    }

    #[test]
    fn test_char_primitive() {
        let mut data = header_bytes();
        data.extend_from_slice(&[8, 3]);
        data.extend_from_slice("é".as_bytes());
        data.push(11);
        let (records, _) = parse_records(&data).unwrap();
        assert_eq!(
            records[1],
            Record::MemberPrimitiveTyped {
                value: Primitive::Char('é')
            }
        );
    }
}
