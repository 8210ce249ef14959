use crate::annotation::{Annotation, ElementValue};
use crate::constant_pool::{Constant, ConstantPool};
use crate::error::{DecodeError, Result};
use crate::reader::Reader;
use tracing::trace;

pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;
/// JDK 1.1.
pub const MIN_MAJOR_VERSION: u16 = 45;
/// Java 25.
pub const DEFAULT_MAX_MAJOR_VERSION: u16 = 69;

pub mod access {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_PROTECTED: u16 = 0x0004;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_SUPER: u16 = 0x0020;
    pub const ACC_SYNCHRONIZED: u16 = 0x0020;
    pub const ACC_VOLATILE: u16 = 0x0040;
    pub const ACC_BRIDGE: u16 = 0x0040;
    pub const ACC_TRANSIENT: u16 = 0x0080;
    pub const ACC_VARARGS: u16 = 0x0080;
    pub const ACC_NATIVE: u16 = 0x0100;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_STRICT: u16 = 0x0800;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
    pub const ACC_ANNOTATION: u16 = 0x2000;
    pub const ACC_ENUM: u16 = 0x4000;
    pub const ACC_MANDATED: u16 = 0x8000;
    pub const ACC_MODULE: u16 = 0x8000;
    /// `module` flag and `requires` flag; the two share a bit.
    pub const ACC_OPEN: u16 = 0x0020;
    pub const ACC_TRANSITIVE: u16 = 0x0020;
    pub const ACC_STATIC_PHASE: u16 = 0x0040;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub max_major_version: u16,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_major_version: DEFAULT_MAX_MAJOR_VERSION,
        }
    }
}

/// An attribute kept verbatim because the reader does not interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassInfo {
    pub inner_class: String,
    pub outer_class: Option<String>,
    pub inner_name: Option<String>,
    pub access_flags: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub class: String,
    /// Name and descriptor, absent for classes declared in initializers.
    pub method: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParameter {
    pub name: Option<String>,
    pub access_flags: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordComponent {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
}

/// `requires` entry of a `Module` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequires {
    pub module: String,
    pub flags: u16,
    pub version: Option<String>,
}

/// `exports` or `opens` entry. `to` is empty when the package is unqualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePackage {
    /// Internal name, e.g. `com/acme/api`.
    pub package: String,
    pub flags: u16,
    pub to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProvides {
    pub service: String,
    pub with: Vec<String>,
}

/// The `Module` attribute of a `module-info.class`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleAttribute {
    pub name: String,
    pub flags: u16,
    pub version: Option<String>,
    pub requires: Vec<ModuleRequires>,
    pub exports: Vec<ModulePackage>,
    pub opens: Vec<ModulePackage>,
    /// Internal names of service interfaces.
    pub uses: Vec<String>,
    pub provides: Vec<ModuleProvides>,
}

impl ModuleAttribute {
    pub fn is_open(&self) -> bool {
        self.flags & access::ACC_OPEN != 0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotations {
    pub visible: Vec<Annotation>,
    pub invisible: Vec<Annotation>,
}

impl Annotations {
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.visible.iter().chain(self.invisible.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.invisible.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub constant_value: Option<ConstantValue>,
    pub annotations: Annotations,
    pub deprecated: bool,
    pub unknown: Vec<RawAttribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub exceptions: Vec<String>,
    pub parameters: Vec<MethodParameter>,
    pub annotations: Annotations,
    pub annotation_default: Option<ElementValue>,
    /// Body of the `Code` attribute, decoded only on request.
    pub code: Option<Vec<u8>>,
    pub deprecated: bool,
    pub unknown: Vec<RawAttribute>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassAttributes {
    pub signature: Option<String>,
    pub source_file: Option<String>,
    pub inner_classes: Vec<InnerClassInfo>,
    pub enclosing_method: Option<EnclosingMethod>,
    pub record_components: Option<Vec<RecordComponent>>,
    pub permitted_subclasses: Vec<String>,
    pub module: Option<ModuleAttribute>,
    pub annotations: Annotations,
    pub deprecated: bool,
    pub unknown: Vec<RawAttribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    /// Internal name, e.g. `java/util/Map$Entry`.
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldEntry>,
    pub methods: Vec<MethodEntry>,
    pub attributes: ClassAttributes,
}

impl ClassFile {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_with(bytes, &DecodeOptions::default())
    }

    pub fn decode_with(bytes: &[u8], options: &DecodeOptions) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4("magic")?;
        if magic != CLASS_MAGIC {
            return Err(DecodeError::BadMagic(magic));
        }

        let minor_version = reader.read_u2("minor_version")?;
        let major_version = reader.read_u2("major_version")?;
        if !(MIN_MAJOR_VERSION..=options.max_major_version).contains(&major_version) {
            return Err(DecodeError::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let cp = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.read_u2("access_flags")?;
        let this_class = cp.class_name(reader.read_u2("this_class")?)?.to_string();
        let super_class = cp
            .optional_class_name(reader.read_u2("super_class")?)?
            .map(str::to_string);

        let interfaces_count = reader.read_u2("interfaces_count")? as usize;
        let mut interfaces = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            interfaces.push(cp.class_name(reader.read_u2("interfaces")?)?.to_string());
        }

        let fields_count = reader.read_u2("fields_count")? as usize;
        let mut fields = Vec::with_capacity(fields_count);
        for _ in 0..fields_count {
            fields.push(parse_field(&mut reader, &cp)?);
        }

        let methods_count = reader.read_u2("methods_count")? as usize;
        let mut methods = Vec::with_capacity(methods_count);
        for _ in 0..methods_count {
            methods.push(parse_method(&mut reader, &cp)?);
        }

        let attrs = parse_attributes(&mut reader, &cp, AttributeTarget::Class)?;
        reader.ensure_empty("class file")?;

        trace!(
            class = %this_class,
            fields = fields.len(),
            methods = methods.len(),
            "decoded class file"
        );

        Ok(Self {
            minor_version,
            major_version,
            constant_pool: cp,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes: ClassAttributes {
                signature: attrs.signature,
                source_file: attrs.source_file,
                inner_classes: attrs.inner_classes,
                enclosing_method: attrs.enclosing_method,
                record_components: attrs.record_components,
                permitted_subclasses: attrs.permitted_subclasses,
                module: attrs.module,
                annotations: attrs.annotations,
                deprecated: attrs.deprecated,
                unknown: attrs.unknown,
            },
        })
    }

    /// Dotted binary name, e.g. `java.util.Map$Entry`.
    pub fn binary_name(&self) -> String {
        self.this_class.replace('/', ".")
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & access::ACC_INTERFACE != 0
    }

    /// `module-info.class`, which declares a module instead of a type.
    pub fn is_module(&self) -> bool {
        self.access_flags & access::ACC_MODULE != 0
    }

    /// The InnerClasses entry describing this class itself, if it is nested.
    pub fn own_inner_class_entry(&self) -> Option<&InnerClassInfo> {
        self.attributes
            .inner_classes
            .iter()
            .find(|ic| ic.inner_class == self.this_class)
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodEntry> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }
}

fn parse_field(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<FieldEntry> {
    let access_flags = reader.read_u2("field_info access_flags")?;
    let name = cp.utf8(reader.read_u2("field_info name_index")?)?.to_string();
    let descriptor = cp
        .utf8(reader.read_u2("field_info descriptor_index")?)?
        .to_string();
    let attrs = parse_attributes(reader, cp, AttributeTarget::Field)?;
    Ok(FieldEntry {
        access_flags,
        name,
        descriptor,
        signature: attrs.signature,
        constant_value: attrs.constant_value,
        annotations: attrs.annotations,
        deprecated: attrs.deprecated,
        unknown: attrs.unknown,
    })
}

fn parse_method(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<MethodEntry> {
    let access_flags = reader.read_u2("method_info access_flags")?;
    let name = cp.utf8(reader.read_u2("method_info name_index")?)?.to_string();
    let descriptor = cp
        .utf8(reader.read_u2("method_info descriptor_index")?)?
        .to_string();
    let attrs = parse_attributes(reader, cp, AttributeTarget::Method)?;
    Ok(MethodEntry {
        access_flags,
        name,
        descriptor,
        signature: attrs.signature,
        exceptions: attrs.exceptions,
        parameters: attrs.method_parameters,
        annotations: attrs.annotations,
        annotation_default: attrs.annotation_default,
        code: attrs.code,
        deprecated: attrs.deprecated,
        unknown: attrs.unknown,
    })
}

#[derive(Default)]
struct ParsedAttributes {
    signature: Option<String>,
    source_file: Option<String>,
    inner_classes: Vec<InnerClassInfo>,
    enclosing_method: Option<EnclosingMethod>,
    record_components: Option<Vec<RecordComponent>>,
    permitted_subclasses: Vec<String>,
    module: Option<ModuleAttribute>,
    constant_value: Option<ConstantValue>,
    exceptions: Vec<String>,
    method_parameters: Vec<MethodParameter>,
    annotation_default: Option<ElementValue>,
    code: Option<Vec<u8>>,
    annotations: Annotations,
    deprecated: bool,
    unknown: Vec<RawAttribute>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum AttributeTarget {
    Class,
    Field,
    Method,
    RecordComponent,
}

use AttributeTarget as T;

fn parse_attributes(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    target: AttributeTarget,
) -> Result<ParsedAttributes> {
    let count = reader.read_u2("attributes_count")? as usize;
    let mut parsed = ParsedAttributes::default();
    for _ in 0..count {
        let name_index = reader.read_u2("attribute_name_index")?;
        let length = reader.read_u4("attribute_length")? as usize;
        let info = reader.read_bytes(length, "attribute_info")?;
        let name = cp.utf8(name_index)?;

        let mut sub = Reader::new(info);
        match (name, target) {
            ("Signature", _) => {
                parsed.signature = Some(cp.utf8(sub.read_u2("Signature")?)?.to_string());
                sub.ensure_empty("Signature attribute")?;
            }
            ("RuntimeVisibleAnnotations", _) => {
                parsed.annotations.visible.extend(parse_annotations(&mut sub, cp)?);
                sub.ensure_empty("RuntimeVisibleAnnotations attribute")?;
            }
            ("RuntimeInvisibleAnnotations", _) => {
                parsed.annotations.invisible.extend(parse_annotations(&mut sub, cp)?);
                sub.ensure_empty("RuntimeInvisibleAnnotations attribute")?;
            }
            ("Deprecated", T::Class | T::Field | T::Method) => parsed.deprecated = true,
            ("SourceFile", T::Class) => {
                parsed.source_file = Some(cp.utf8(sub.read_u2("SourceFile")?)?.to_string());
                sub.ensure_empty("SourceFile attribute")?;
            }
            ("InnerClasses", T::Class) => {
                let n = sub.read_u2("InnerClasses number_of_classes")? as usize;
                for _ in 0..n {
                    let inner = sub.read_u2("inner_class_info_index")?;
                    let outer = sub.read_u2("outer_class_info_index")?;
                    let inner_name = sub.read_u2("inner_name_index")?;
                    let access_flags = sub.read_u2("inner_class_access_flags")?;
                    parsed.inner_classes.push(InnerClassInfo {
                        inner_class: cp.class_name(inner)?.to_string(),
                        outer_class: cp.optional_class_name(outer)?.map(str::to_string),
                        inner_name: if inner_name == 0 {
                            None
                        } else {
                            Some(cp.utf8(inner_name)?.to_string())
                        },
                        access_flags,
                    });
                }
                sub.ensure_empty("InnerClasses attribute")?;
            }
            ("EnclosingMethod", T::Class) => {
                let class = cp.class_name(sub.read_u2("EnclosingMethod class_index")?)?;
                let method_index = sub.read_u2("EnclosingMethod method_index")?;
                let method = if method_index == 0 {
                    None
                } else {
                    let (n, d) = cp.name_and_type(method_index)?;
                    Some((n.to_string(), d.to_string()))
                };
                parsed.enclosing_method = Some(EnclosingMethod {
                    class: class.to_string(),
                    method,
                });
                sub.ensure_empty("EnclosingMethod attribute")?;
            }
            ("Record", T::Class) => {
                let n = sub.read_u2("Record components_count")? as usize;
                let mut components = Vec::with_capacity(n);
                for _ in 0..n {
                    let name = cp.utf8(sub.read_u2("record_component name_index")?)?;
                    let descriptor = cp.utf8(sub.read_u2("record_component descriptor_index")?)?;
                    let attrs = parse_attributes(&mut sub, cp, T::RecordComponent)?;
                    components.push(RecordComponent {
                        name: name.to_string(),
                        descriptor: descriptor.to_string(),
                        signature: attrs.signature,
                    });
                }
                parsed.record_components = Some(components);
                sub.ensure_empty("Record attribute")?;
            }
            ("PermittedSubclasses", T::Class) => {
                let n = sub.read_u2("PermittedSubclasses number_of_classes")? as usize;
                for _ in 0..n {
                    let idx = sub.read_u2("PermittedSubclasses classes")?;
                    parsed.permitted_subclasses.push(cp.class_name(idx)?.to_string());
                }
                sub.ensure_empty("PermittedSubclasses attribute")?;
            }
            ("Module", T::Class) => {
                parsed.module = Some(parse_module(&mut sub, cp)?);
                sub.ensure_empty("Module attribute")?;
            }
            ("ConstantValue", T::Field) => {
                let idx = sub.read_u2("ConstantValue")?;
                parsed.constant_value = Some(match cp.get(idx)? {
                    Constant::Integer(v) => ConstantValue::Int(*v),
                    Constant::Long(v) => ConstantValue::Long(*v),
                    Constant::Float(v) => ConstantValue::Float(*v),
                    Constant::Double(v) => ConstantValue::Double(*v),
                    Constant::String { string_index } => {
                        ConstantValue::String(cp.utf8(*string_index)?.to_string())
                    }
                    other => {
                        return Err(DecodeError::ConstantKindMismatch {
                            index: idx,
                            expected: "constant value",
                            found: other.kind(),
                        });
                    }
                });
                sub.ensure_empty("ConstantValue attribute")?;
            }
            ("Code", T::Method) => {
                parsed.code = Some(info.to_vec());
            }
            ("Exceptions", T::Method) => {
                let n = sub.read_u2("Exceptions number_of_exceptions")? as usize;
                for _ in 0..n {
                    let idx = sub.read_u2("exception_index_table")?;
                    parsed.exceptions.push(cp.class_name(idx)?.to_string());
                }
                sub.ensure_empty("Exceptions attribute")?;
            }
            ("MethodParameters", T::Method) => {
                let n = sub.read_u1("MethodParameters parameters_count")? as usize;
                for _ in 0..n {
                    let name_index = sub.read_u2("MethodParameters name_index")?;
                    let access_flags = sub.read_u2("MethodParameters access_flags")?;
                    parsed.method_parameters.push(MethodParameter {
                        name: if name_index == 0 {
                            None
                        } else {
                            Some(cp.utf8(name_index)?.to_string())
                        },
                        access_flags,
                    });
                }
                sub.ensure_empty("MethodParameters attribute")?;
            }
            ("AnnotationDefault", T::Method) => {
                parsed.annotation_default = Some(ElementValue::parse(&mut sub, cp)?);
                sub.ensure_empty("AnnotationDefault attribute")?;
            }
            _ => {
                parsed.unknown.push(RawAttribute {
                    name: name.to_string(),
                    data: info.to_vec(),
                });
            }
        }
    }
    Ok(parsed)
}

fn optional_utf8(cp: &ConstantPool, index: u16) -> Result<Option<String>> {
    if index == 0 {
        Ok(None)
    } else {
        cp.utf8(index).map(|s| Some(s.to_string()))
    }
}

fn parse_module_packages(reader: &mut Reader<'_>, cp: &ConstantPool, what: &'static str) -> Result<Vec<ModulePackage>> {
    let n = reader.read_u2(what)? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let package = cp.package_name(reader.read_u2(what)?)?.to_string();
        let flags = reader.read_u2(what)?;
        let to_count = reader.read_u2(what)? as usize;
        let mut to = Vec::with_capacity(to_count);
        for _ in 0..to_count {
            to.push(cp.module_name(reader.read_u2(what)?)?.to_string());
        }
        out.push(ModulePackage { package, flags, to });
    }
    Ok(out)
}

fn parse_module(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<ModuleAttribute> {
    let name = cp.module_name(reader.read_u2("Module module_name_index")?)?.to_string();
    let flags = reader.read_u2("Module module_flags")?;
    let version = optional_utf8(cp, reader.read_u2("Module module_version_index")?)?;

    let n = reader.read_u2("Module requires_count")? as usize;
    let mut requires = Vec::with_capacity(n);
    for _ in 0..n {
        let module = cp.module_name(reader.read_u2("requires_index")?)?.to_string();
        let flags = reader.read_u2("requires_flags")?;
        let version = optional_utf8(cp, reader.read_u2("requires_version_index")?)?;
        requires.push(ModuleRequires { module, flags, version });
    }
    let exports = parse_module_packages(reader, cp, "Module exports")?;
    let opens = parse_module_packages(reader, cp, "Module opens")?;

    let n = reader.read_u2("Module uses_count")? as usize;
    let mut uses = Vec::with_capacity(n);
    for _ in 0..n {
        uses.push(cp.class_name(reader.read_u2("uses_index")?)?.to_string());
    }

    let n = reader.read_u2("Module provides_count")? as usize;
    let mut provides = Vec::with_capacity(n);
    for _ in 0..n {
        let service = cp.class_name(reader.read_u2("provides_index")?)?.to_string();
        let with_count = reader.read_u2("provides_with_count")? as usize;
        let mut with = Vec::with_capacity(with_count);
        for _ in 0..with_count {
            with.push(cp.class_name(reader.read_u2("provides_with_index")?)?.to_string());
        }
        provides.push(ModuleProvides { service, with });
    }

    Ok(ModuleAttribute {
        name,
        flags,
        version,
        requires,
        exports,
        opens,
        uses,
        provides,
    })
}

fn parse_annotations(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Vec<Annotation>> {
    let n = reader.read_u2("num_annotations")? as usize;
    let mut anns = Vec::with_capacity(n);
    for _ in 0..n {
        anns.push(Annotation::parse(reader, cp)?);
    }
    Ok(anns)
}
