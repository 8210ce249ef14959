use anyhow::Context;
use jinspect_bytecode::access::*;
use jinspect_bytecode::{ClassFile, ConstantValue, ModuleAttribute};
use std::io::Write;
use std::path::Path;

const CLASS_FLAGS: [(u16, &str); 8] = [
    (ACC_PUBLIC, "public"),
    (ACC_FINAL, "final"),
    (ACC_INTERFACE, "interface"),
    (ACC_ABSTRACT, "abstract"),
    (ACC_SYNTHETIC, "synthetic"),
    (ACC_ANNOTATION, "annotation"),
    (ACC_ENUM, "enum"),
    (ACC_MODULE, "module"),
];

const FIELD_FLAGS: [(u16, &str); 9] = [
    (ACC_PUBLIC, "public"),
    (ACC_PRIVATE, "private"),
    (ACC_PROTECTED, "protected"),
    (ACC_STATIC, "static"),
    (ACC_FINAL, "final"),
    (ACC_VOLATILE, "volatile"),
    (ACC_TRANSIENT, "transient"),
    (ACC_SYNTHETIC, "synthetic"),
    (ACC_ENUM, "enum"),
];

const METHOD_FLAGS: [(u16, &str); 12] = [
    (ACC_PUBLIC, "public"),
    (ACC_PRIVATE, "private"),
    (ACC_PROTECTED, "protected"),
    (ACC_STATIC, "static"),
    (ACC_FINAL, "final"),
    (ACC_SYNCHRONIZED, "synchronized"),
    (ACC_BRIDGE, "bridge"),
    (ACC_VARARGS, "varargs"),
    (ACC_NATIVE, "native"),
    (ACC_ABSTRACT, "abstract"),
    (ACC_STRICT, "strictfp"),
    (ACC_SYNTHETIC, "synthetic"),
];

fn flag_words(flags: u16, table: &[(u16, &'static str)]) -> String {
    table
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, word)| *word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn constant(value: &ConstantValue) -> String {
    match value {
        ConstantValue::Int(v) => v.to_string(),
        ConstantValue::Long(v) => format!("{v}L"),
        ConstantValue::Float(v) => format!("{v}f"),
        ConstantValue::Double(v) => v.to_string(),
        ConstantValue::String(s) => format!("{s:?}"),
    }
}

fn render_module(module: &ModuleAttribute) -> String {
    let open = if module.is_open() { " open" } else { "" };
    let mut text = format!("  module: {}{open}\n", module.name);
    for r in &module.requires {
        let mut words = vec![];
        if r.flags & ACC_TRANSITIVE != 0 {
            words.push("transitive");
        }
        if r.flags & ACC_STATIC_PHASE != 0 {
            words.push("static");
        }
        words.push(r.module.as_str());
        text.push_str(&format!("    requires {}\n", words.join(" ")));
    }
    for (keyword, grants) in [("exports", &module.exports), ("opens", &module.opens)] {
        for g in grants {
            text.push_str(&format!("    {keyword} {}", g.package));
            if !g.to.is_empty() {
                text.push_str(&format!(" to {}", g.to.join(", ")));
            }
            text.push('\n');
        }
    }
    for u in &module.uses {
        text.push_str(&format!("    uses {u}\n"));
    }
    for p in &module.provides {
        text.push_str(&format!("    provides {} with {}\n", p.service, p.with.join(", ")));
    }
    text
}

pub(crate) fn render_class(class: &ClassFile) -> String {
    let mut text = format!(
        "{} (version {}.{})\n",
        class.this_class, class.major_version, class.minor_version
    );
    text.push_str(&format!(
        "  flags: 0x{:04x} {}\n",
        class.access_flags,
        flag_words(class.access_flags, &CLASS_FLAGS)
    ));
    if let Some(superclass) = &class.super_class {
        text.push_str(&format!("  extends: {superclass}\n"));
    }
    if !class.interfaces.is_empty() {
        text.push_str(&format!("  implements: {}\n", class.interfaces.join(", ")));
    }
    let attributes = &class.attributes;
    if let Some(signature) = &attributes.signature {
        text.push_str(&format!("  signature: {signature}\n"));
    }
    if let Some(source) = &attributes.source_file {
        text.push_str(&format!("  source: {source}\n"));
    }
    for annotation in attributes.annotations.iter() {
        text.push_str(&format!("  annotation: {}\n", annotation.type_descriptor));
    }
    if let Some(module) = &attributes.module {
        text.push_str(&render_module(module));
    }
    for inner in &attributes.inner_classes {
        text.push_str(&format!(
            "  inner: {} outer={} name={}\n",
            inner.inner_class,
            inner.outer_class.as_deref().unwrap_or("-"),
            inner.inner_name.as_deref().unwrap_or("-")
        ));
    }

    for field in &class.fields {
        let flags = flag_words(field.access_flags, &FIELD_FLAGS);
        text.push_str(&format!("  field {} {} [{flags}]", field.name, field.descriptor));
        if let Some(value) = &field.constant_value {
            text.push_str(&format!(" = {}", constant(value)));
        }
        text.push('\n');
        if let Some(signature) = &field.signature {
            text.push_str(&format!("    signature: {signature}\n"));
        }
    }
    for method in &class.methods {
        let flags = flag_words(method.access_flags, &METHOD_FLAGS);
        text.push_str(&format!("  method {}{} [{flags}]", method.name, method.descriptor));
        if let Some(code) = &method.code {
            text.push_str(&format!(" code={} bytes", code.len()));
        }
        text.push('\n');
        if let Some(signature) = &method.signature {
            text.push_str(&format!("    signature: {signature}\n"));
        }
        if !method.exceptions.is_empty() {
            text.push_str(&format!("    throws: {}\n", method.exceptions.join(", ")));
        }
    }
    text
}

pub(crate) fn dump_class(out: &mut impl Write, file: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let class = ClassFile::decode(&bytes).with_context(|| format!("decoding {}", file.display()))?;
    write!(out, "{}", render_class(&class))?;
    Ok(())
}
