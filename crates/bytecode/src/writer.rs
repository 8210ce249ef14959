//! Class-file encoder.
//!
//! Emits the declaration shape of a class (flags, hierarchy, members and the
//! attributes the reader understands). Unknown attributes are written back
//! verbatim; when starting from a decoded class the original constant pool is
//! kept as a prefix so their embedded indices stay valid.

use crate::annotation::{Annotation, ConstValue, ElementValue};
use crate::classfile::{
    Annotations, ClassAttributes, ClassFile, ConstantValue, FieldEntry, InnerClassInfo,
    MethodEntry, ModuleAttribute, ModulePackage, RawAttribute, access,
};
use crate::constant_pool::{Constant, ConstantPool, encode_modified_utf8};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    Module(u16),
    Package(u16),
    String(u16),
    NameAndType(u16, u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
}

impl PoolKey {
    fn of(c: &Constant) -> Option<Self> {
        Some(match c {
            Constant::Utf8(s) => PoolKey::Utf8(s.clone()),
            Constant::Integer(v) => PoolKey::Integer(*v),
            Constant::Float(v) => PoolKey::Float(v.to_bits()),
            Constant::Long(v) => PoolKey::Long(*v),
            Constant::Double(v) => PoolKey::Double(v.to_bits()),
            Constant::Class { name_index } => PoolKey::Class(*name_index),
            Constant::Module { name_index } => PoolKey::Module(*name_index),
            Constant::Package { name_index } => PoolKey::Package(*name_index),
            Constant::String { string_index } => PoolKey::String(*string_index),
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => PoolKey::NameAndType(*name_index, *descriptor_index),
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            } => PoolKey::FieldRef(*class_index, *name_and_type_index),
            Constant::MethodRef {
                class_index,
                name_and_type_index,
            } => PoolKey::MethodRef(*class_index, *name_and_type_index),
            Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => PoolKey::InterfaceMethodRef(*class_index, *name_and_type_index),
            _ => return None,
        })
    }
}

/// Deduplicating constant pool under construction.
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    entries: Vec<Constant>,
    lookup: HashMap<PoolKey, u16>,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self {
            entries: vec![Constant::Unusable],
            lookup: HashMap::new(),
        }
    }

    pub fn from_pool(pool: &ConstantPool) -> Self {
        let mut builder = Self {
            entries: pool.entries().to_vec(),
            lookup: HashMap::new(),
        };
        if builder.entries.is_empty() {
            builder.entries.push(Constant::Unusable);
        }
        for (i, c) in builder.entries.iter().enumerate() {
            if let Some(key) = PoolKey::of(c) {
                builder.lookup.entry(key).or_insert(i as u16);
            }
        }
        builder
    }

    fn intern(&mut self, constant: Constant) -> u16 {
        if let Some(key) = PoolKey::of(&constant) {
            if let Some(idx) = self.lookup.get(&key) {
                return *idx;
            }
            let idx = self.push(constant);
            self.lookup.insert(key, idx);
            idx
        } else {
            self.push(constant)
        }
    }

    fn push(&mut self, constant: Constant) -> u16 {
        let idx = self.entries.len() as u16;
        let wide = constant.is_wide();
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        idx
    }

    pub fn utf8(&mut self, s: &str) -> u16 {
        self.intern(Constant::Utf8(s.to_string()))
    }

    pub fn class(&mut self, internal_name: &str) -> u16 {
        let name_index = self.utf8(internal_name);
        self.intern(Constant::Class { name_index })
    }

    pub fn module(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.intern(Constant::Module { name_index })
    }

    pub fn package(&mut self, internal_name: &str) -> u16 {
        let name_index = self.utf8(internal_name);
        self.intern(Constant::Package { name_index })
    }

    pub fn string(&mut self, s: &str) -> u16 {
        let string_index = self.utf8(s);
        self.intern(Constant::String { string_index })
    }

    pub fn integer(&mut self, v: i32) -> u16 {
        self.intern(Constant::Integer(v))
    }

    pub fn long(&mut self, v: i64) -> u16 {
        self.intern(Constant::Long(v))
    }

    pub fn float(&mut self, v: f32) -> u16 {
        self.intern(Constant::Float(v))
    }

    pub fn double(&mut self, v: f64) -> u16 {
        self.intern(Constant::Double(v))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.intern(Constant::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.intern(Constant::FieldRef {
            class_index,
            name_and_type_index,
        })
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.intern(Constant::MethodRef {
            class_index,
            name_and_type_index,
        })
    }

    pub fn interface_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.intern(Constant::InterfaceMethodRef {
            class_index,
            name_and_type_index,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u2(out, self.entries.len() as u16);
        for c in self.entries.iter().skip(1) {
            if matches!(c, Constant::Unusable) {
                continue;
            }
            out.push(c.tag());
            match c {
                Constant::Unusable => {}
                Constant::Utf8(s) => {
                    let bytes = encode_modified_utf8(s);
                    put_u2(out, bytes.len() as u16);
                    out.extend_from_slice(&bytes);
                }
                Constant::Integer(v) => out.extend_from_slice(&v.to_be_bytes()),
                Constant::Float(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
                Constant::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
                Constant::Double(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
                Constant::Class { name_index }
                | Constant::Module { name_index }
                | Constant::Package { name_index } => put_u2(out, *name_index),
                Constant::String { string_index } => put_u2(out, *string_index),
                Constant::MethodType { descriptor_index } => put_u2(out, *descriptor_index),
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
                    put_u2(out, *class_index);
                    put_u2(out, *name_and_type_index);
                }
                Constant::NameAndType {
                    name_index,
                    descriptor_index,
                } => {
                    put_u2(out, *name_index);
                    put_u2(out, *descriptor_index);
                }
                Constant::MethodHandle {
                    reference_kind,
                    reference_index,
                } => {
                    out.push(*reference_kind);
                    put_u2(out, *reference_index);
                }
                Constant::Dynamic {
                    bootstrap_method_attr_index,
                    name_and_type_index,
                }
                | Constant::InvokeDynamic {
                    bootstrap_method_attr_index,
                    name_and_type_index,
                } => {
                    put_u2(out, *bootstrap_method_attr_index);
                    put_u2(out, *name_and_type_index);
                }
            }
        }
    }
}

impl FieldEntry {
    pub fn new(access_flags: u16, name: &str, descriptor: &str) -> Self {
        Self {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            constant_value: None,
            annotations: Annotations::default(),
            deprecated: false,
            unknown: vec![],
        }
    }

    pub fn with_signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }
}

impl MethodEntry {
    pub fn new(access_flags: u16, name: &str, descriptor: &str) -> Self {
        Self {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            exceptions: vec![],
            parameters: vec![],
            annotations: Annotations::default(),
            annotation_default: None,
            code: None,
            deprecated: false,
            unknown: vec![],
        }
    }

    pub fn with_signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn with_code(mut self, code_attribute: Vec<u8>) -> Self {
        self.code = Some(code_attribute);
        self
    }
}

/// Body of a `Code` attribute with no handlers and no nested attributes.
pub fn code_attribute(max_stack: u16, max_locals: u16, code: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(code.len() + 12);
    put_u2(&mut out, max_stack);
    put_u2(&mut out, max_locals);
    put_u4(&mut out, code.len() as u32);
    out.extend_from_slice(code);
    put_u2(&mut out, 0);
    put_u2(&mut out, 0);
    out
}

#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    pool: PoolBuilder,
    minor_version: u16,
    major_version: u16,
    access_flags: u16,
    this_class: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<FieldEntry>,
    methods: Vec<MethodEntry>,
    attributes: ClassAttributes,
}

impl ClassFileBuilder {
    /// A public class extending `java/lang/Object`, Java 17 format.
    pub fn new(this_class: &str) -> Self {
        Self {
            pool: PoolBuilder::new(),
            minor_version: 0,
            major_version: 61,
            access_flags: access::ACC_PUBLIC | access::ACC_SUPER,
            this_class: this_class.to_string(),
            super_class: Some("java/lang/Object".to_string()),
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: ClassAttributes::default(),
        }
    }

    pub fn from_class_file(class: &ClassFile) -> Self {
        Self {
            pool: PoolBuilder::from_pool(&class.constant_pool),
            minor_version: class.minor_version,
            major_version: class.major_version,
            access_flags: class.access_flags,
            this_class: class.this_class.clone(),
            super_class: class.super_class.clone(),
            interfaces: class.interfaces.clone(),
            fields: class.fields.clone(),
            methods: class.methods.clone(),
            attributes: class.attributes.clone(),
        }
    }

    pub fn version(mut self, major: u16, minor: u16) -> Self {
        self.major_version = major;
        self.minor_version = minor;
        self
    }

    pub fn access(mut self, flags: u16) -> Self {
        self.access_flags = flags;
        self
    }

    pub fn super_class(mut self, name: Option<&str>) -> Self {
        self.super_class = name.map(str::to_string);
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    pub fn signature(mut self, signature: &str) -> Self {
        self.attributes.signature = Some(signature.to_string());
        self
    }

    pub fn source_file(mut self, name: &str) -> Self {
        self.attributes.source_file = Some(name.to_string());
        self
    }

    pub fn inner_class(mut self, info: InnerClassInfo) -> Self {
        self.attributes.inner_classes.push(info);
        self
    }

    pub fn annotation(mut self, annotation: Annotation, visible: bool) -> Self {
        if visible {
            self.attributes.annotations.visible.push(annotation);
        } else {
            self.attributes.annotations.invisible.push(annotation);
        }
        self
    }

    /// Turns the class into `module-info`: `ACC_MODULE`, no superclass.
    pub fn module(mut self, module: ModuleAttribute) -> Self {
        self.access_flags = access::ACC_MODULE;
        self.super_class = None;
        self.attributes.module = Some(module);
        self
    }

    pub fn raw_attribute(mut self, name: &str, data: Vec<u8>) -> Self {
        self.attributes.unknown.push(RawAttribute {
            name: name.to_string(),
            data,
        });
        self
    }

    pub fn field(mut self, field: FieldEntry) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodEntry) -> Self {
        self.methods.push(method);
        self
    }

    /// Pool access for assembling method code that references constants.
    pub fn pool_mut(&mut self) -> &mut PoolBuilder {
        &mut self.pool
    }

    pub fn build(mut self) -> Vec<u8> {
        let mut body = Vec::new();
        let pool = &mut self.pool;

        put_u2(&mut body, self.access_flags);
        let this_index = pool.class(&self.this_class);
        put_u2(&mut body, this_index);
        let super_index = match &self.super_class {
            Some(name) => pool.class(name),
            None => 0,
        };
        put_u2(&mut body, super_index);
        put_u2(&mut body, self.interfaces.len() as u16);
        for i in &self.interfaces {
            let idx = pool.class(i);
            put_u2(&mut body, idx);
        }

        put_u2(&mut body, self.fields.len() as u16);
        for f in &self.fields {
            write_field(&mut body, pool, f);
        }
        put_u2(&mut body, self.methods.len() as u16);
        for m in &self.methods {
            write_method(&mut body, pool, m);
        }
        write_class_attributes(&mut body, pool, &self.attributes);

        let mut out = Vec::with_capacity(body.len() + 64);
        put_u4(&mut out, crate::classfile::CLASS_MAGIC);
        put_u2(&mut out, self.minor_version);
        put_u2(&mut out, self.major_version);
        pool.write(&mut out);
        out.extend_from_slice(&body);
        out
    }
}

fn write_field(out: &mut Vec<u8>, pool: &mut PoolBuilder, f: &FieldEntry) {
    put_u2(out, f.access_flags);
    let n = pool.utf8(&f.name);
    let d = pool.utf8(&f.descriptor);
    put_u2(out, n);
    put_u2(out, d);

    let mut attrs = AttributeWriter::default();
    if let Some(sig) = &f.signature {
        attrs.u2_attribute(pool, "Signature", |p| p.utf8(sig));
    }
    if let Some(cv) = &f.constant_value {
        attrs.u2_attribute(pool, "ConstantValue", |p| match cv {
            ConstantValue::Int(v) => p.integer(*v),
            ConstantValue::Long(v) => p.long(*v),
            ConstantValue::Float(v) => p.float(*v),
            ConstantValue::Double(v) => p.double(*v),
            ConstantValue::String(s) => p.string(s),
        });
    }
    if f.deprecated {
        attrs.push(pool, "Deprecated", vec![]);
    }
    attrs.annotations(pool, &f.annotations);
    attrs.raw(pool, &f.unknown);
    attrs.finish(out);
}

fn write_method(out: &mut Vec<u8>, pool: &mut PoolBuilder, m: &MethodEntry) {
    put_u2(out, m.access_flags);
    let n = pool.utf8(&m.name);
    let d = pool.utf8(&m.descriptor);
    put_u2(out, n);
    put_u2(out, d);

    let mut attrs = AttributeWriter::default();
    if let Some(code) = &m.code {
        attrs.push(pool, "Code", code.clone());
    }
    if !m.exceptions.is_empty() {
        let mut data = Vec::new();
        put_u2(&mut data, m.exceptions.len() as u16);
        for e in &m.exceptions {
            let idx = pool.class(e);
            put_u2(&mut data, idx);
        }
        attrs.push(pool, "Exceptions", data);
    }
    if let Some(sig) = &m.signature {
        attrs.u2_attribute(pool, "Signature", |p| p.utf8(sig));
    }
    if !m.parameters.is_empty() {
        let mut data = vec![m.parameters.len() as u8];
        for p in &m.parameters {
            let idx = p.name.as_deref().map(|n| pool.utf8(n)).unwrap_or(0);
            put_u2(&mut data, idx);
            put_u2(&mut data, p.access_flags);
        }
        attrs.push(pool, "MethodParameters", data);
    }
    if let Some(default) = &m.annotation_default {
        let mut data = Vec::new();
        write_element_value(&mut data, pool, default);
        attrs.push(pool, "AnnotationDefault", data);
    }
    if m.deprecated {
        attrs.push(pool, "Deprecated", vec![]);
    }
    attrs.annotations(pool, &m.annotations);
    attrs.raw(pool, &m.unknown);
    attrs.finish(out);
}

fn write_class_attributes(out: &mut Vec<u8>, pool: &mut PoolBuilder, a: &ClassAttributes) {
    let mut attrs = AttributeWriter::default();
    if let Some(sig) = &a.signature {
        attrs.u2_attribute(pool, "Signature", |p| p.utf8(sig));
    }
    if let Some(sf) = &a.source_file {
        attrs.u2_attribute(pool, "SourceFile", |p| p.utf8(sf));
    }
    if !a.inner_classes.is_empty() {
        let mut data = Vec::new();
        put_u2(&mut data, a.inner_classes.len() as u16);
        for ic in &a.inner_classes {
            let inner = pool.class(&ic.inner_class);
            let outer = ic.outer_class.as_deref().map(|o| pool.class(o)).unwrap_or(0);
            let name = ic.inner_name.as_deref().map(|n| pool.utf8(n)).unwrap_or(0);
            put_u2(&mut data, inner);
            put_u2(&mut data, outer);
            put_u2(&mut data, name);
            put_u2(&mut data, ic.access_flags);
        }
        attrs.push(pool, "InnerClasses", data);
    }
    if let Some(em) = &a.enclosing_method {
        let mut data = Vec::new();
        let class = pool.class(&em.class);
        let method = em
            .method
            .as_ref()
            .map(|(n, d)| pool.name_and_type(n, d))
            .unwrap_or(0);
        put_u2(&mut data, class);
        put_u2(&mut data, method);
        attrs.push(pool, "EnclosingMethod", data);
    }
    if let Some(components) = &a.record_components {
        let mut data = Vec::new();
        put_u2(&mut data, components.len() as u16);
        for c in components {
            let n = pool.utf8(&c.name);
            let d = pool.utf8(&c.descriptor);
            put_u2(&mut data, n);
            put_u2(&mut data, d);
            let mut nested = AttributeWriter::default();
            if let Some(sig) = &c.signature {
                nested.u2_attribute(pool, "Signature", |p| p.utf8(sig));
            }
            nested.finish(&mut data);
        }
        attrs.push(pool, "Record", data);
    }
    if !a.permitted_subclasses.is_empty() {
        let mut data = Vec::new();
        put_u2(&mut data, a.permitted_subclasses.len() as u16);
        for s in &a.permitted_subclasses {
            let idx = pool.class(s);
            put_u2(&mut data, idx);
        }
        attrs.push(pool, "PermittedSubclasses", data);
    }
    if let Some(module) = &a.module {
        let data = write_module(pool, module);
        attrs.push(pool, "Module", data);
    }
    if a.deprecated {
        attrs.push(pool, "Deprecated", vec![]);
    }
    attrs.annotations(pool, &a.annotations);
    attrs.raw(pool, &a.unknown);
    attrs.finish(out);
}

fn write_module_packages(data: &mut Vec<u8>, pool: &mut PoolBuilder, packages: &[ModulePackage]) {
    put_u2(data, packages.len() as u16);
    for p in packages {
        let idx = pool.package(&p.package);
        put_u2(data, idx);
        put_u2(data, p.flags);
        put_u2(data, p.to.len() as u16);
        for m in &p.to {
            let idx = pool.module(m);
            put_u2(data, idx);
        }
    }
}

fn write_module(pool: &mut PoolBuilder, m: &ModuleAttribute) -> Vec<u8> {
    let mut data = Vec::new();
    let name = pool.module(&m.name);
    put_u2(&mut data, name);
    put_u2(&mut data, m.flags);
    let version = m.version.as_deref().map(|v| pool.utf8(v)).unwrap_or(0);
    put_u2(&mut data, version);
    put_u2(&mut data, m.requires.len() as u16);
    for r in &m.requires {
        let module = pool.module(&r.module);
        let version = r.version.as_deref().map(|v| pool.utf8(v)).unwrap_or(0);
        put_u2(&mut data, module);
        put_u2(&mut data, r.flags);
        put_u2(&mut data, version);
    }
    write_module_packages(&mut data, pool, &m.exports);
    write_module_packages(&mut data, pool, &m.opens);
    put_u2(&mut data, m.uses.len() as u16);
    for u in &m.uses {
        let idx = pool.class(u);
        put_u2(&mut data, idx);
    }
    put_u2(&mut data, m.provides.len() as u16);
    for p in &m.provides {
        let service = pool.class(&p.service);
        put_u2(&mut data, service);
        put_u2(&mut data, p.with.len() as u16);
        for w in &p.with {
            let idx = pool.class(w);
            put_u2(&mut data, idx);
        }
    }
    data
}

#[derive(Default)]
struct AttributeWriter {
    count: u16,
    data: Vec<u8>,
}

impl AttributeWriter {
    fn push(&mut self, pool: &mut PoolBuilder, name: &str, info: Vec<u8>) {
        let idx = pool.utf8(name);
        put_u2(&mut self.data, idx);
        put_u4(&mut self.data, info.len() as u32);
        self.data.extend_from_slice(&info);
        self.count += 1;
    }

    fn u2_attribute(
        &mut self,
        pool: &mut PoolBuilder,
        name: &str,
        value: impl FnOnce(&mut PoolBuilder) -> u16,
    ) {
        let idx = value(pool);
        self.push(pool, name, idx.to_be_bytes().to_vec());
    }

    fn annotations(&mut self, pool: &mut PoolBuilder, anns: &Annotations) {
        for (name, list) in [
            ("RuntimeVisibleAnnotations", &anns.visible),
            ("RuntimeInvisibleAnnotations", &anns.invisible),
        ] {
            if list.is_empty() {
                continue;
            }
            let mut data = Vec::new();
            put_u2(&mut data, list.len() as u16);
            for a in list {
                write_annotation(&mut data, pool, a);
            }
            self.push(pool, name, data);
        }
    }

    fn raw(&mut self, pool: &mut PoolBuilder, raw: &[RawAttribute]) {
        for r in raw {
            self.push(pool, &r.name, r.data.clone());
        }
    }

    fn finish(self, out: &mut Vec<u8>) {
        put_u2(out, self.count);
        out.extend_from_slice(&self.data);
    }
}

fn write_annotation(out: &mut Vec<u8>, pool: &mut PoolBuilder, a: &Annotation) {
    let t = pool.utf8(&a.type_descriptor);
    put_u2(out, t);
    put_u2(out, a.elements.len() as u16);
    for (name, value) in &a.elements {
        let n = pool.utf8(name);
        put_u2(out, n);
        write_element_value(out, pool, value);
    }
}

fn write_element_value(out: &mut Vec<u8>, pool: &mut PoolBuilder, v: &ElementValue) {
    match v {
        ElementValue::Const(c) => {
            let (tag, idx) = match c {
                ConstValue::Byte(x) => ('B', pool.integer(*x as i32)),
                ConstValue::Char(x) => ('C', pool.integer(*x as i32)),
                ConstValue::Short(x) => ('S', pool.integer(*x as i32)),
                ConstValue::Int(x) => ('I', pool.integer(*x)),
                ConstValue::Boolean(x) => ('Z', pool.integer(*x as i32)),
                ConstValue::Long(x) => ('J', pool.long(*x)),
                ConstValue::Float(x) => ('F', pool.float(*x)),
                ConstValue::Double(x) => ('D', pool.double(*x)),
                ConstValue::String(s) => ('s', pool.utf8(s)),
            };
            out.push(tag as u8);
            put_u2(out, idx);
        }
        ElementValue::Enum {
            type_descriptor,
            const_name,
        } => {
            out.push(b'e');
            let t = pool.utf8(type_descriptor);
            let c = pool.utf8(const_name);
            put_u2(out, t);
            put_u2(out, c);
        }
        ElementValue::Class(desc) => {
            out.push(b'c');
            let idx = pool.utf8(desc);
            put_u2(out, idx);
        }
        ElementValue::Annotation(a) => {
            out.push(b'@');
            write_annotation(out, pool, a);
        }
        ElementValue::Array(values) => {
            out.push(b'[');
            put_u2(out, values.len() as u16);
            for v in values {
                write_element_value(out, pool, v);
            }
        }
    }
}

fn put_u2(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put_u4(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_builder_deduplicates_and_reserves_wide_slots() {
        let mut pool = PoolBuilder::new();
        let a = pool.class("p/A");
        let b = pool.class("p/A");
        assert_eq!(a, b);
        let long = pool.long(42);
        let next = pool.utf8("after");
        assert_eq!(next, long + 2);
    }

    #[test]
    fn from_pool_keeps_original_indices() {
        let mut pool = PoolBuilder::new();
        let idx = pool.utf8("Keep");
        let frozen = ConstantPool::from_entries(pool.entries.clone());
        let mut again = PoolBuilder::from_pool(&frozen);
        assert_eq!(again.utf8("Keep"), idx);
    }
}
