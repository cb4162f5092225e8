//! MS-NRBF record stream writing
//!
//! Strings are written with the shortest 7-bit length prefix, so a stream
//! read from disk is reproduced exactly when its lengths were canonical.

#![allow(clippy::cast_possible_truncation)]

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use super::{ClassInfo, MemberType, Primitive, Record, Value};
use crate::error::{Error, Result};

/// Streaming record writer
pub struct RecordWriter<W> {
    writer: W,
}

/// Serialize a record list into a byte vector.
///
/// # Errors
/// Returns an error if a length does not fit the format.
pub fn write_records(records: &[Record]) -> Result<Vec<u8>> {
    let mut writer = RecordWriter::new(Vec::new());
    for record in records {
        writer.write_record(record)?;
    }
    Ok(writer.into_inner())
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write one record and everything nested inside it.
    ///
    /// # Errors
    /// Returns an error on I/O failure or a length that does not fit.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.writer.write_u8(record.type_byte())?;

        match record {
            Record::SerializedStreamHeader(header) => {
                self.write_i32(header.root_id)?;
                self.write_i32(header.header_id)?;
                self.write_i32(header.major_version)?;
                self.write_i32(header.minor_version)?;
            }
            Record::ClassWithId {
                object_id,
                metadata_id,
                values,
            } => {
                self.write_i32(*object_id)?;
                self.write_i32(*metadata_id)?;
                self.write_values(values)?;
            }
            Record::SystemClassWithMembers { class_info, values } => {
                self.write_class_info(class_info)?;
                self.write_values(values)?;
            }
            Record::ClassWithMembers {
                class_info,
                library_id,
                values,
            } => {
                self.write_class_info(class_info)?;
                self.write_i32(*library_id)?;
                self.write_values(values)?;
            }
            Record::SystemClassWithMembersAndTypes {
                class_info,
                member_types,
                values,
            } => {
                self.write_class_info(class_info)?;
                self.write_member_types(member_types)?;
                self.write_values(values)?;
            }
            Record::ClassWithMembersAndTypes {
                class_info,
                member_types,
                library_id,
                values,
            } => {
                self.write_class_info(class_info)?;
                self.write_member_types(member_types)?;
                self.write_i32(*library_id)?;
                self.write_values(values)?;
            }
            Record::BinaryObjectString { object_id, value } => {
                self.write_i32(*object_id)?;
                self.write_string(value)?;
            }
            Record::BinaryArray {
                object_id,
                array_type,
                lengths,
                lower_bounds,
                item_type,
                values,
            } => {
                self.write_i32(*object_id)?;
                self.writer.write_u8(array_type.to_byte())?;
                self.write_count(lengths.len())?;
                for length in lengths {
                    self.write_i32(*length)?;
                }
                if array_type.has_lower_bounds() {
                    if lower_bounds.len() != lengths.len() {
                        return Err(Error::UnsupportedArray(format!(
                            "{} lower bounds for rank {}",
                            lower_bounds.len(),
                            lengths.len()
                        )));
                    }
                    for bound in lower_bounds {
                        self.write_i32(*bound)?;
                    }
                }
                self.write_member_types(std::slice::from_ref(item_type))?;
                self.write_values(values)?;
            }
            Record::MemberPrimitiveTyped { value } => {
                self.writer.write_u8(value.primitive_type().to_byte())?;
                self.write_primitive(value)?;
            }
            Record::MemberReference { id_ref } => self.write_i32(*id_ref)?,
            Record::ObjectNull | Record::MessageEnd => {}
            Record::BinaryLibrary {
                library_id,
                library_name,
            } => {
                self.write_i32(*library_id)?;
                self.write_string(library_name)?;
            }
            Record::ObjectNullMultiple256 { null_count } => self.writer.write_u8(*null_count)?,
            Record::ObjectNullMultiple { null_count } => self.write_i32(*null_count)?,
            Record::ArraySinglePrimitive {
                object_id,
                primitive_type,
                values,
            } => {
                self.write_i32(*object_id)?;
                self.write_count(values.len())?;
                self.writer.write_u8(primitive_type.to_byte())?;
                for value in values {
                    self.write_primitive(value)?;
                }
            }
            Record::ArraySingleObject {
                object_id,
                length,
                values,
            }
            | Record::ArraySingleString {
                object_id,
                length,
                values,
            } => {
                self.write_i32(*object_id)?;
                self.write_i32(*length)?;
                self.write_values(values)?;
            }
        }

        Ok(())
    }

    /// Primitives are written bare; records carry their own header.
    fn write_values(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            match value {
                Value::Primitive(primitive) => self.write_primitive(primitive)?,
                Value::Record(record) => self.write_record(record)?,
            }
        }
        Ok(())
    }

    fn write_class_info(&mut self, class_info: &ClassInfo) -> Result<()> {
        self.write_i32(class_info.object_id)?;
        self.write_string(&class_info.name)?;
        self.write_count(class_info.member_names.len())?;
        for name in &class_info.member_names {
            self.write_string(name)?;
        }
        Ok(())
    }

    fn write_member_types(&mut self, member_types: &[MemberType]) -> Result<()> {
        for member_type in member_types {
            self.writer.write_u8(member_type.binary_type_byte())?;
        }
        for member_type in member_types {
            match member_type {
                MemberType::Primitive(kind) | MemberType::PrimitiveArray(kind) => {
                    self.writer.write_u8(kind.to_byte())?;
                }
                MemberType::SystemClass(name) => self.write_string(name)?,
                MemberType::Class(info) => {
                    self.write_string(&info.type_name)?;
                    self.write_i32(info.library_id)?;
                }
                MemberType::String
                | MemberType::Object
                | MemberType::ObjectArray
                | MemberType::StringArray => {}
            }
        }
        Ok(())
    }

    fn write_primitive(&mut self, value: &Primitive) -> Result<()> {
        match value {
            Primitive::Boolean(v) => self.writer.write_u8(u8::from(*v))?,
            Primitive::Byte(v) => self.writer.write_u8(*v)?,
            Primitive::Char(c) => {
                let mut buf = [0u8; 4];
                self.writer.write_all(c.encode_utf8(&mut buf).as_bytes())?;
            }
            Primitive::Decimal(text) | Primitive::String(text) => self.write_string(text)?,
            Primitive::Double(v) => self.writer.write_f64::<LittleEndian>(*v)?,
            Primitive::Int16(v) => self.writer.write_i16::<LittleEndian>(*v)?,
            Primitive::Int32(v) => self.writer.write_i32::<LittleEndian>(*v)?,
            Primitive::Int64(v) | Primitive::TimeSpan(v) => self.writer.write_i64::<LittleEndian>(*v)?,
            Primitive::SByte(v) => self.writer.write_i8(*v)?,
            Primitive::Single(v) => self.writer.write_f32::<LittleEndian>(*v)?,
            Primitive::DateTime(v) | Primitive::UInt64(v) => self.writer.write_u64::<LittleEndian>(*v)?,
            Primitive::UInt16(v) => self.writer.write_u16::<LittleEndian>(*v)?,
            Primitive::UInt32(v) => self.writer.write_u32::<LittleEndian>(*v)?,
            Primitive::Null => {}
        }
        Ok(())
    }

    fn write_string(&mut self, text: &str) -> Result<()> {
        let len = u32::try_from(text.len())
            .ok()
            .filter(|len| i32::try_from(*len).is_ok())
            .ok_or(Error::InvalidLength(text.len() as i64))?;
        write_var_len(&mut self.writer, len)?;
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn write_count(&mut self, count: usize) -> Result<()> {
        let count = i32::try_from(count).map_err(|_| Error::InvalidLength(count as i64))?;
        self.write_i32(count)
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.writer.write_i32::<LittleEndian>(value)?;
        Ok(())
    }
}

/// Shortest 7-bit encoding of `value`.
fn write_var_len<W: Write>(writer: &mut W, mut value: u32) -> Result<()> {
    while value >= 0x80 {
        writer.write_u8((value as u8) | 0x80)?;
        value >>= 7;
    }
    writer.write_u8(value as u8)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::{BinaryArrayType, ClassTypeInfo, PrimitiveType, StreamHeader, parse_records};
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_stream() -> Vec<Record> {
        vec![
            Record::SerializedStreamHeader(StreamHeader {
                root_id: 1,
                header_id: -1,
                major_version: 1,
                minor_version: 0,
            }),
            Record::BinaryLibrary {
                library_id: 2,
                library_name: "Game, Version=1.0.0.0".to_string(),
            },
            Record::ClassWithMembersAndTypes {
                class_info: ClassInfo {
                    object_id: 1,
                    name: "Dialog".to_string(),
                    member_names: vec!["text".into(), "count".into(), "next".into()],
                },
                member_types: vec![
                    MemberType::String,
                    MemberType::Primitive(PrimitiveType::Int32),
                    MemberType::Class(ClassTypeInfo {
                        type_name: "Node".to_string(),
                        library_id: 2,
                    }),
                ],
                library_id: 2,
                values: vec![
                    Value::Record(Box::new(Record::BinaryObjectString {
                        object_id: 3,
                        value: "x".repeat(200),
                    })),
                    Value::Primitive(Primitive::Int32(7)),
                    Value::Record(Box::new(Record::MemberReference { id_ref: 4 })),
                ],
            },
            Record::ClassWithId {
                object_id: 4,
                metadata_id: 1,
                values: vec![
                    Value::Record(Box::new(Record::ObjectNull)),
                    Value::Primitive(Primitive::Int32(-1)),
                    Value::Record(Box::new(Record::ObjectNull)),
                ],
            },
            Record::ArraySinglePrimitive {
                object_id: 5,
                primitive_type: PrimitiveType::Double,
                values: vec![Primitive::Double(0.5), Primitive::Double(f64::NAN)],
            },
            Record::BinaryArray {
                object_id: 6,
                array_type: BinaryArrayType::RectangularOffset,
                lengths: vec![2, 1],
                lower_bounds: vec![0, 5],
                item_type: MemberType::Primitive(PrimitiveType::Char),
                values: vec![
                    Value::Primitive(Primitive::Char('a')),
                    Value::Primitive(Primitive::Char('€')),
                ],
            },
            Record::ArraySingleString {
                object_id: 7,
                length: 4,
                values: vec![
                    Value::Record(Box::new(Record::ObjectNullMultiple256 { null_count: 3 })),
                    Value::Record(Box::new(Record::BinaryObjectString {
                        object_id: 8,
                        value: String::new(),
                    })),
                ],
            },
            Record::MessageEnd,
        ]
    }

    #[test]
    fn test_var_len_is_shortest() {
        let mut out = Vec::new();
        write_var_len(&mut out, 127).unwrap();
        write_var_len(&mut out, 128).unwrap();
        write_var_len(&mut out, 16_384).unwrap();
        assert_eq!(out, vec![0x7F, 0x80, 0x01, 0x80, 0x80, 0x01]);
    }

    #[test]
    fn test_stream_is_reproduced_byte_for_byte() {
        let bytes = write_records(&sample_stream()).unwrap();
        let (records, consumed) = parse_records(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(write_records(&records).unwrap(), bytes);
        assert_eq!(records.len(), sample_stream().len());
    }

    #[test]
    fn test_offset_array_requires_bounds() {
        let record = Record::BinaryArray {
            object_id: 1,
            array_type: BinaryArrayType::SingleOffset,
            lengths: vec![1],
            lower_bounds: Vec::new(),
            item_type: MemberType::Object,
            values: vec![Value::Record(Box::new(Record::ObjectNull))],
        };
        assert!(write_records(&[record]).is_err());
    }
}
