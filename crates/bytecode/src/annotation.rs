use crate::constant_pool::{Constant, ConstantPool};
use crate::error::{DecodeError, Result};
use crate::reader::Reader;

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation type, e.g. `Ljava/lang/Deprecated;`.
    pub type_descriptor: String,
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    pub(crate) fn parse(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Self> {
        let type_descriptor = cp.utf8(reader.read_u2("annotation type_index")?)?.to_string();
        let pairs = reader.read_u2("num_element_value_pairs")? as usize;
        let mut elements = Vec::with_capacity(pairs);
        for _ in 0..pairs {
            let name = cp.utf8(reader.read_u2("element_name_index")?)?.to_string();
            let value = ElementValue::parse(reader, cp)?;
            elements.push((name, value));
        }
        Ok(Self {
            type_descriptor,
            elements,
        })
    }

    /// Internal name of the annotation type.
    pub fn type_internal_name(&self) -> Option<&str> {
        descriptor_to_internal_name(&self.type_descriptor)
    }

    pub fn element(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Const(ConstValue),
    Enum {
        type_descriptor: String,
        const_name: String,
    },
    /// Return descriptor of a class literal, e.g. `Ljava/lang/String;` or `V`.
    Class(String),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
}

impl ElementValue {
    pub(crate) fn parse(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Self> {
        let tag = reader.read_u1("element_value tag")? as char;
        match tag {
            'B' | 'C' | 'I' | 'S' | 'Z' => {
                let idx = reader.read_u2("const_value_index")?;
                let value = match cp.get(idx)? {
                    Constant::Integer(v) => *v,
                    other => return Err(kind_mismatch(idx, "Integer", other)),
                };
                Ok(ElementValue::Const(match tag {
                    'B' => ConstValue::Byte(value as i8),
                    'C' => ConstValue::Char(
                        char::from_u32(value as u32).ok_or_else(|| malformed("bad char constant"))?,
                    ),
                    'S' => ConstValue::Short(value as i16),
                    'Z' => ConstValue::Boolean(value != 0),
                    _ => ConstValue::Int(value),
                }))
            }
            'J' => {
                let idx = reader.read_u2("const_value_index")?;
                match cp.get(idx)? {
                    Constant::Long(v) => Ok(ElementValue::Const(ConstValue::Long(*v))),
                    other => Err(kind_mismatch(idx, "Long", other)),
                }
            }
            'F' => {
                let idx = reader.read_u2("const_value_index")?;
                match cp.get(idx)? {
                    Constant::Float(v) => Ok(ElementValue::Const(ConstValue::Float(*v))),
                    other => Err(kind_mismatch(idx, "Float", other)),
                }
            }
            'D' => {
                let idx = reader.read_u2("const_value_index")?;
                match cp.get(idx)? {
                    Constant::Double(v) => Ok(ElementValue::Const(ConstValue::Double(*v))),
                    other => Err(kind_mismatch(idx, "Double", other)),
                }
            }
            's' => {
                let idx = reader.read_u2("const_value_index")?;
                Ok(ElementValue::Const(ConstValue::String(
                    cp.utf8(idx)?.to_string(),
                )))
            }
            'e' => {
                let type_name_index = reader.read_u2("enum type_name_index")?;
                let const_name_index = reader.read_u2("enum const_name_index")?;
                Ok(ElementValue::Enum {
                    type_descriptor: cp.utf8(type_name_index)?.to_string(),
                    const_name: cp.utf8(const_name_index)?.to_string(),
                })
            }
            'c' => {
                let idx = reader.read_u2("class_info_index")?;
                Ok(ElementValue::Class(cp.utf8(idx)?.to_string()))
            }
            '@' => Ok(ElementValue::Annotation(Box::new(Annotation::parse(
                reader, cp,
            )?))),
            '[' => {
                let count = reader.read_u2("num_values")? as usize;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(ElementValue::parse(reader, cp)?);
                }
                Ok(ElementValue::Array(values))
            }
            other => Err(malformed(&format!("unknown element_value tag `{other}`"))),
        }
    }
}

fn kind_mismatch(index: u16, expected: &'static str, found: &Constant) -> DecodeError {
    DecodeError::ConstantKindMismatch {
        index,
        expected,
        found: found.kind(),
    }
}

fn malformed(reason: &str) -> DecodeError {
    DecodeError::MalformedAttribute {
        attribute: "annotations",
        reason: reason.to_string(),
    }
}

pub fn descriptor_to_internal_name(desc: &str) -> Option<&str> {
    desc.strip_prefix('L').and_then(|rest| rest.strip_suffix(';'))
}
