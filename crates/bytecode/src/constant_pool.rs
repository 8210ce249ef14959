use crate::error::{DecodeError, Result};
use crate::reader::Reader;

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Slot 0 and the upper half of Long/Double entries.
    Unusable,
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
}

impl Constant {
    pub fn kind(&self) -> &'static str {
        match self {
            Constant::Unusable => "Unusable",
            Constant::Utf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class { .. } => "Class",
            Constant::String { .. } => "String",
            Constant::FieldRef { .. } => "Fieldref",
            Constant::MethodRef { .. } => "Methodref",
            Constant::InterfaceMethodRef { .. } => "InterfaceMethodref",
            Constant::NameAndType { .. } => "NameAndType",
            Constant::MethodHandle { .. } => "MethodHandle",
            Constant::MethodType { .. } => "MethodType",
            Constant::Dynamic { .. } => "Dynamic",
            Constant::InvokeDynamic { .. } => "InvokeDynamic",
            Constant::Module { .. } => "Module",
            Constant::Package { .. } => "Package",
        }
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            Constant::Unusable => 0,
            Constant::Utf8(_) => 1,
            Constant::Integer(_) => 3,
            Constant::Float(_) => 4,
            Constant::Long(_) => 5,
            Constant::Double(_) => 6,
            Constant::Class { .. } => 7,
            Constant::String { .. } => 8,
            Constant::FieldRef { .. } => 9,
            Constant::MethodRef { .. } => 10,
            Constant::InterfaceMethodRef { .. } => 11,
            Constant::NameAndType { .. } => 12,
            Constant::MethodHandle { .. } => 15,
            Constant::MethodType { .. } => 16,
            Constant::Dynamic { .. } => 17,
            Constant::InvokeDynamic { .. } => 18,
            Constant::Module { .. } => 19,
            Constant::Package { .. } => 20,
        }
    }

    /// Long and Double occupy two pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRefKind {
    Field,
    Method,
    InterfaceMethod,
}

/// A field or method reference with its class and name-and-type resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub kind: MemberRefKind,
    /// Internal name of the owning class (`java/lang/String`), or an array descriptor.
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

/// A constant that `ldc` can push.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadableConstant {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Class(String),
    MethodType(String),
    MethodHandle { reference_kind: u8, target: MemberRef },
    Dynamic { name: String, descriptor: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub(crate) fn from_entries(entries: Vec<Constant>) -> Self {
        Self { entries }
    }

    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let count = reader.read_u2("constant_pool_count")?;
        let mut entries = Vec::with_capacity(count as usize);
        entries.push(Constant::Unusable);

        let mut index: u16 = 1;
        while index < count {
            let tag = reader.read_u1("cp_info tag")?;
            let entry = match tag {
                1 => {
                    let len = reader.read_u2("CONSTANT_Utf8 length")? as usize;
                    let bytes = reader.read_bytes(len, "CONSTANT_Utf8 bytes")?;
                    Constant::Utf8(
                        decode_modified_utf8(bytes).ok_or(DecodeError::BadModifiedUtf8(index))?,
                    )
                }
                3 => Constant::Integer(reader.read_i4("CONSTANT_Integer")?),
                4 => Constant::Float(f32::from_bits(reader.read_u4("CONSTANT_Float")?)),
                5 => {
                    let hi = reader.read_u4("CONSTANT_Long")? as u64;
                    let lo = reader.read_u4("CONSTANT_Long")? as u64;
                    Constant::Long(((hi << 32) | lo) as i64)
                }
                6 => {
                    let hi = reader.read_u4("CONSTANT_Double")? as u64;
                    let lo = reader.read_u4("CONSTANT_Double")? as u64;
                    Constant::Double(f64::from_bits((hi << 32) | lo))
                }
                7 => Constant::Class {
                    name_index: reader.read_u2("CONSTANT_Class")?,
                },
                8 => Constant::String {
                    string_index: reader.read_u2("CONSTANT_String")?,
                },
                9 | 10 | 11 => {
                    let class_index = reader.read_u2("CONSTANT_Fieldref/Methodref")?;
                    let name_and_type_index = reader.read_u2("CONSTANT_Fieldref/Methodref")?;
                    match tag {
                        9 => Constant::FieldRef {
                            class_index,
                            name_and_type_index,
                        },
                        10 => Constant::MethodRef {
                            class_index,
                            name_and_type_index,
                        },
                        _ => Constant::InterfaceMethodRef {
                            class_index,
                            name_and_type_index,
                        },
                    }
                }
                12 => Constant::NameAndType {
                    name_index: reader.read_u2("CONSTANT_NameAndType")?,
                    descriptor_index: reader.read_u2("CONSTANT_NameAndType")?,
                },
                15 => Constant::MethodHandle {
                    reference_kind: reader.read_u1("CONSTANT_MethodHandle")?,
                    reference_index: reader.read_u2("CONSTANT_MethodHandle")?,
                },
                16 => Constant::MethodType {
                    descriptor_index: reader.read_u2("CONSTANT_MethodType")?,
                },
                17 | 18 => {
                    let bootstrap_method_attr_index = reader.read_u2("CONSTANT_Dynamic")?;
                    let name_and_type_index = reader.read_u2("CONSTANT_Dynamic")?;
                    if tag == 17 {
                        Constant::Dynamic {
                            bootstrap_method_attr_index,
                            name_and_type_index,
                        }
                    } else {
                        Constant::InvokeDynamic {
                            bootstrap_method_attr_index,
                            name_and_type_index,
                        }
                    }
                }
                19 => Constant::Module {
                    name_index: reader.read_u2("CONSTANT_Module")?,
                },
                20 => Constant::Package {
                    name_index: reader.read_u2("CONSTANT_Package")?,
                },
                other => return Err(DecodeError::BadConstantTag { index, tag: other }),
            };

            let wide = entry.is_wide();
            entries.push(entry);
            index += 1;
            if wide {
                if index >= count {
                    return Err(DecodeError::BadConstantIndex(index));
                }
                entries.push(Constant::Unusable);
                index += 1;
            }
        }

        let pool = Self { entries };
        pool.validate()?;
        Ok(pool)
    }

    /// Checks that every cross-reference inside the pool points at an entry of
    /// the right kind, so later lookups can trust the pool's shape.
    fn validate(&self) -> Result<()> {
        for (i, entry) in self.entries.iter().enumerate() {
            let index = i as u16;
            let malformed = |reason: String| DecodeError::MalformedConstant { index, reason };
            match entry {
                Constant::Class { name_index }
                | Constant::Module { name_index }
                | Constant::Package { name_index } => {
                    self.utf8(*name_index)?;
                }
                Constant::String { string_index } => {
                    self.utf8(*string_index)?;
                }
                Constant::MethodType { descriptor_index } => {
                    self.utf8(*descriptor_index)?;
                }
                Constant::FieldRef {
                    class_index,
                    name_and_type_index,
                }
                | Constant::MethodRef {
                    class_index,
                    name_and_type_index,
                }
                | Constant::InterfaceMethodRef {
                    class_index,
                    name_and_type_index,
                } => {
                    self.class_name(*class_index)?;
                    self.name_and_type(*name_and_type_index)?;
                }
                Constant::NameAndType {
                    name_index,
                    descriptor_index,
                } => {
                    self.utf8(*name_index)?;
                    self.utf8(*descriptor_index)?;
                }
                Constant::Dynamic {
                    name_and_type_index,
                    ..
                }
                | Constant::InvokeDynamic {
                    name_and_type_index,
                    ..
                } => {
                    self.name_and_type(*name_and_type_index)?;
                }
                Constant::MethodHandle {
                    reference_kind,
                    reference_index,
                } => {
                    let target = self.get(*reference_index)?;
                    let ok = match reference_kind {
                        1..=4 => matches!(target, Constant::FieldRef { .. }),
                        5 | 8 => matches!(target, Constant::MethodRef { .. }),
                        6 | 7 => matches!(
                            target,
                            Constant::MethodRef { .. } | Constant::InterfaceMethodRef { .. }
                        ),
                        9 => matches!(target, Constant::InterfaceMethodRef { .. }),
                        _ => false,
                    };
                    if !ok {
                        return Err(malformed(format!(
                            "MethodHandle kind {reference_kind} -> {}",
                            target.kind()
                        )));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn entries(&self) -> &[Constant] {
        &self.entries
    }

    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(DecodeError::BadConstantIndex(index)),
            Some(entry) => Ok(entry),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            other => Err(mismatch(index, "Utf8", other)),
        }
    }

    /// Internal name of a `CONSTANT_Class` entry.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            other => Err(mismatch(index, "Class", other)),
        }
    }

    pub fn module_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Module { name_index } => self.utf8(*name_index),
            other => Err(mismatch(index, "Module", other)),
        }
    }

    /// Internal name of a `CONSTANT_Package` entry, e.g. `java/util`.
    pub fn package_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Package { name_index } => self.utf8(*name_index),
            other => Err(mismatch(index, "Package", other)),
        }
    }

    pub fn optional_class_name(&self, index: u16) -> Result<Option<&str>> {
        if index == 0 {
            Ok(None)
        } else {
            self.class_name(index).map(Some)
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            other => Err(mismatch(index, "NameAndType", other)),
        }
    }

    pub fn member_ref(&self, index: u16) -> Result<MemberRef> {
        let (kind, class_index, nat) = match self.get(index)? {
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            } => (MemberRefKind::Field, class_index, name_and_type_index),
            Constant::MethodRef {
                class_index,
                name_and_type_index,
            } => (MemberRefKind::Method, class_index, name_and_type_index),
            Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => (MemberRefKind::InterfaceMethod, class_index, name_and_type_index),
            other => return Err(mismatch(index, "Fieldref/Methodref", other)),
        };
        let (name, descriptor) = self.name_and_type(*nat)?;
        Ok(MemberRef {
            kind,
            owner: self.class_name(*class_index)?.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    pub fn string_constant(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::String { string_index } => self.utf8(*string_index),
            other => Err(mismatch(index, "String", other)),
        }
    }

    pub fn loadable(&self, index: u16) -> Result<LoadableConstant> {
        Ok(match self.get(index)? {
            Constant::Integer(v) => LoadableConstant::Integer(*v),
            Constant::Float(v) => LoadableConstant::Float(*v),
            Constant::Long(v) => LoadableConstant::Long(*v),
            Constant::Double(v) => LoadableConstant::Double(*v),
            Constant::String { string_index } => {
                LoadableConstant::String(self.utf8(*string_index)?.to_string())
            }
            Constant::Class { name_index } => {
                LoadableConstant::Class(self.utf8(*name_index)?.to_string())
            }
            Constant::MethodType { descriptor_index } => {
                LoadableConstant::MethodType(self.utf8(*descriptor_index)?.to_string())
            }
            Constant::MethodHandle {
                reference_kind,
                reference_index,
            } => LoadableConstant::MethodHandle {
                reference_kind: *reference_kind,
                target: self.member_ref(*reference_index)?,
            },
            Constant::Dynamic {
                name_and_type_index,
                ..
            } => {
                let (name, descriptor) = self.name_and_type(*name_and_type_index)?;
                LoadableConstant::Dynamic {
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                }
            }
            other => return Err(mismatch(index, "loadable constant", other)),
        })
    }
}

fn mismatch(index: u16, expected: &'static str, found: &Constant) -> DecodeError {
    DecodeError::ConstantKindMismatch {
        index,
        expected,
        found: found.kind(),
    }
}

/// Decodes the class-file flavour of UTF-8: `0xC0 0x80` for NUL and
/// surrogate pairs encoded as two three-byte sequences.
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    if bytes.iter().all(|b| *b != 0 && *b < 0x80) {
        return std::str::from_utf8(bytes).ok().map(str::to_string);
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 == 0 {
            return None;
        } else if b0 < 0x80 {
            units.push(b0 as u16);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = *bytes.get(i + 1)?;
            if b1 & 0xC0 != 0x80 {
                return None;
            }
            units.push((((b0 & 0x1F) as u16) << 6) | (b1 & 0x3F) as u16);
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = *bytes.get(i + 1)?;
            let b2 = *bytes.get(i + 2)?;
            if b1 & 0xC0 != 0x80 || b2 & 0xC0 != 0x80 {
                return None;
            }
            units.push(
                (((b0 & 0x0F) as u16) << 12) | (((b1 & 0x3F) as u16) << 6) | (b2 & 0x3F) as u16,
            );
            i += 3;
        } else {
            return None;
        }
    }
    String::from_utf16(&units).ok()
}

pub fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modified_utf8_handles_nul_and_supplementary_characters() {
        let text = "a\u{0}é😀";
        let encoded = encode_modified_utf8(text);
        assert!(!encoded.contains(&0));
        // Supplementary characters take six bytes (two surrogates).
        assert_eq!(encoded.len(), 1 + 2 + 2 + 6);
        assert_eq!(decode_modified_utf8(&encoded).as_deref(), Some(text));
    }

    #[test]
    fn raw_nul_byte_is_rejected() {
        assert_eq!(decode_modified_utf8(&[b'a', 0, b'b']), None);
    }

    #[test]
    fn long_entries_take_two_slots() {
        // count = 4: #1 Long (two slots), #3 Utf8 "x"
        let bytes = [
            0x00, 0x04, 5, 0, 0, 0, 1, 0, 0, 0, 2, 1, 0x00, 0x01, b'x',
        ];
        let mut reader = Reader::new(&bytes);
        let pool = ConstantPool::parse(&mut reader).unwrap();
        assert_eq!(pool.get(1).unwrap(), &Constant::Long((1 << 32) | 2));
        assert!(matches!(pool.get(2), Err(DecodeError::BadConstantIndex(2))));
        assert_eq!(pool.utf8(3).unwrap(), "x");
    }

    #[test]
    fn dangling_class_reference_fails_validation() {
        // #1 Class -> #2, #2 Integer
        let bytes = [0x00, 0x03, 7, 0x00, 0x02, 3, 0, 0, 0, 7];
        let mut reader = Reader::new(&bytes);
        let err = ConstantPool::parse(&mut reader).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::ConstantKindMismatch {
                index: 2,
                expected: "Utf8",
                found: "Integer"
            }
        ));
    }
}
