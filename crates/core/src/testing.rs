//! Fixtures shared by unit tests: a small JDK built with `ClassFileBuilder`.

use crate::classpath::ClasspathEntry;
use crate::config::SessionConfig;
use crate::index::UnitContext;
use crate::program::Program;
use jinspect_bytecode::access::*;
use jinspect_bytecode::{ClassFileBuilder, FieldEntry, InnerClassInfo, MethodEntry, code_attribute};
use jinspect_java::JavaParser;
use std::sync::Arc;

const IFACE: u16 = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
const ABSTRACT: u16 = ACC_PUBLIC | ACC_ABSTRACT;
const STATIC: u16 = ACC_PUBLIC | ACC_STATIC;

fn m(flags: u16, name: &str, desc: &str) -> MethodEntry {
    MethodEntry::new(flags, name, desc)
}

fn g(flags: u16, name: &str, desc: &str, sig: &str) -> MethodEntry {
    MethodEntry::new(flags, name, desc).with_signature(sig)
}

fn class(name: &str) -> ClassFileBuilder {
    ClassFileBuilder::new(name)
}

fn iface(name: &str) -> ClassFileBuilder {
    ClassFileBuilder::new(name).access(IFACE)
}

fn boxed(name: &str, prim: &str) -> ClassFileBuilder {
    let internal = format!("java/lang/{name}");
    class(&internal)
        .access(ACC_PUBLIC | ACC_FINAL)
        .super_class(Some("java/lang/Number"))
        .interface("java/lang/Comparable")
        .signature(&format!(
            "Ljava/lang/Number;Ljava/lang/Comparable<L{internal};>;"
        ))
        .method(m(STATIC, "valueOf", &format!("({prim})L{internal};")))
}

/// Class files of the JDK subset the tests rely on.
pub(crate) fn mini_jdk() -> Vec<(String, Vec<u8>)> {
    let classes = vec![
        class("java/lang/Object")
            .super_class(None)
            .method(m(ACC_PUBLIC, "<init>", "()V"))
            .method(m(ACC_PUBLIC, "toString", "()Ljava/lang/String;"))
            .method(m(ACC_PUBLIC, "equals", "(Ljava/lang/Object;)Z"))
            .method(m(ACC_PUBLIC, "hashCode", "()I"))
            .method(g(
                ACC_PUBLIC | ACC_FINAL,
                "getClass",
                "()Ljava/lang/Class;",
                "()Ljava/lang/Class<*>;",
            )),
        class("java/lang/String")
            .access(ACC_PUBLIC | ACC_FINAL)
            .interface("java/lang/CharSequence")
            .interface("java/lang/Comparable")
            .signature("Ljava/lang/Object;Ljava/lang/CharSequence;Ljava/lang/Comparable<Ljava/lang/String;>;")
            .method(m(ACC_PUBLIC, "<init>", "()V"))
            .method(m(ACC_PUBLIC, "length", "()I"))
            .method(m(ACC_PUBLIC, "isEmpty", "()Z"))
            .method(m(ACC_PUBLIC, "charAt", "(I)C"))
            .method(m(ACC_PUBLIC, "concat", "(Ljava/lang/String;)Ljava/lang/String;"))
            .method(m(ACC_PUBLIC, "compareTo", "(Ljava/lang/String;)I"))
            .method(m(STATIC, "valueOf", "(Ljava/lang/Object;)Ljava/lang/String;"))
            .method(m(STATIC, "valueOf", "(I)Ljava/lang/String;")),
        iface("java/lang/CharSequence").method(m(ABSTRACT, "length", "()I")),
        iface("java/lang/Comparable")
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
            .method(g(ABSTRACT, "compareTo", "(Ljava/lang/Object;)I", "(TT;)I")),
        class("java/lang/Number")
            .access(ABSTRACT)
            .method(m(ABSTRACT, "intValue", "()I")),
        boxed("Integer", "I").method(m(ACC_PUBLIC, "intValue", "()I")),
        boxed("Long", "J"),
        boxed("Double", "D"),
        boxed("Float", "F"),
        boxed("Short", "S"),
        boxed("Byte", "B"),
        class("java/lang/Boolean")
            .access(ACC_PUBLIC | ACC_FINAL)
            .method(m(STATIC, "valueOf", "(Z)Ljava/lang/Boolean;")),
        class("java/lang/Character")
            .access(ACC_PUBLIC | ACC_FINAL)
            .method(m(STATIC, "valueOf", "(C)Ljava/lang/Character;")),
        class("java/lang/Enum")
            .access(ABSTRACT)
            .interface("java/lang/Comparable")
            .signature("<E:Ljava/lang/Enum<TE;>;>Ljava/lang/Object;Ljava/lang/Comparable<TE;>;")
            .method(m(ACC_PUBLIC | ACC_FINAL, "name", "()Ljava/lang/String;"))
            .method(m(ACC_PUBLIC | ACC_FINAL, "ordinal", "()I")),
        class("java/lang/Record").access(ABSTRACT),
        class("java/lang/Class")
            .access(ACC_PUBLIC | ACC_FINAL)
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
            .method(m(ACC_PUBLIC, "getName", "()Ljava/lang/String;")),
        class("java/lang/Throwable")
            .method(m(ACC_PUBLIC, "<init>", "()V"))
            .method(m(ACC_PUBLIC, "<init>", "(Ljava/lang/String;)V"))
            .method(m(ACC_PUBLIC, "getMessage", "()Ljava/lang/String;")),
        class("java/lang/Exception")
            .super_class(Some("java/lang/Throwable"))
            .method(m(ACC_PUBLIC, "<init>", "()V"))
            .method(m(ACC_PUBLIC, "<init>", "(Ljava/lang/String;)V")),
        class("java/lang/RuntimeException")
            .super_class(Some("java/lang/Exception"))
            .method(m(ACC_PUBLIC, "<init>", "()V"))
            .method(m(ACC_PUBLIC, "<init>", "(Ljava/lang/String;)V")),
        class("java/lang/IllegalStateException")
            .super_class(Some("java/lang/RuntimeException"))
            .method(m(ACC_PUBLIC, "<init>", "(Ljava/lang/String;)V")),
        class("java/io/IOException")
            .super_class(Some("java/lang/Exception"))
            .method(m(ACC_PUBLIC, "<init>", "()V")),
        iface("java/lang/Runnable").method(m(ABSTRACT, "run", "()V")),
        iface("java/lang/AutoCloseable").method(m(ABSTRACT, "close", "()V")),
        iface("java/lang/Cloneable"),
        iface("java/io/Serializable"),
        iface("java/lang/annotation/Annotation"),
        iface("java/lang/Override")
            .access(IFACE | ACC_ANNOTATION)
            .interface("java/lang/annotation/Annotation"),
        iface("java/lang/Iterable")
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
            .method(g(
                ABSTRACT,
                "iterator",
                "()Ljava/util/Iterator;",
                "()Ljava/util/Iterator<TT;>;",
            )),
        iface("java/util/Iterator")
            .signature("<E:Ljava/lang/Object;>Ljava/lang/Object;")
            .method(m(ABSTRACT, "hasNext", "()Z"))
            .method(g(ABSTRACT, "next", "()Ljava/lang/Object;", "()TE;")),
        iface("java/util/Collection")
            .interface("java/lang/Iterable")
            .signature("<E:Ljava/lang/Object;>Ljava/lang/Object;Ljava/lang/Iterable<TE;>;")
            .method(m(ABSTRACT, "size", "()I"))
            .method(g(ABSTRACT, "add", "(Ljava/lang/Object;)Z", "(TE;)Z")),
        iface("java/util/List")
            .interface("java/util/Collection")
            .signature("<E:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/Collection<TE;>;")
            .method(g(ABSTRACT, "get", "(I)Ljava/lang/Object;", "(I)TE;"))
            .method(g(
                STATIC | ACC_VARARGS,
                "of",
                "([Ljava/lang/Object;)Ljava/util/List;",
                "<E:Ljava/lang/Object;>([TE;)Ljava/util/List<TE;>;",
            )),
        iface("java/util/Set")
            .interface("java/util/Collection")
            .signature("<E:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/Collection<TE;>;"),
        class("java/util/ArrayList")
            .interface("java/util/List")
            .signature("<E:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/List<TE;>;")
            .method(m(ACC_PUBLIC, "<init>", "()V"))
            .method(m(ACC_PUBLIC, "<init>", "(I)V"))
            .method(m(ACC_PUBLIC, "size", "()I"))
            .method(g(ACC_PUBLIC, "get", "(I)Ljava/lang/Object;", "(I)TE;"))
            .method(g(ACC_PUBLIC, "add", "(Ljava/lang/Object;)Z", "(TE;)Z"))
            .method(g(
                ACC_PUBLIC,
                "iterator",
                "()Ljava/util/Iterator;",
                "()Ljava/util/Iterator<TE;>;",
            )),
        iface("java/util/Map")
            .signature("<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;")
            .inner_class(entry_inner())
            .method(g(ABSTRACT, "get", "(Ljava/lang/Object;)Ljava/lang/Object;", "(Ljava/lang/Object;)TV;"))
            .method(g(
                ABSTRACT,
                "put",
                "(Ljava/lang/Object;Ljava/lang/Object;)Ljava/lang/Object;",
                "(TK;TV;)TV;",
            ))
            .method(g(
                ABSTRACT,
                "entrySet",
                "()Ljava/util/Set;",
                "()Ljava/util/Set<Ljava/util/Map$Entry<TK;TV;>;>;",
            )),
        iface("java/util/Map$Entry")
            .signature("<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;")
            .inner_class(entry_inner())
            .method(g(ABSTRACT, "getKey", "()Ljava/lang/Object;", "()TK;"))
            .method(g(ABSTRACT, "getValue", "()Ljava/lang/Object;", "()TV;")),
        iface("java/util/function/Function")
            .signature("<T:Ljava/lang/Object;R:Ljava/lang/Object;>Ljava/lang/Object;")
            .method(g(
                ABSTRACT,
                "apply",
                "(Ljava/lang/Object;)Ljava/lang/Object;",
                "(TT;)TR;",
            )),
        iface("java/util/function/Supplier")
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
            .method(g(ABSTRACT, "get", "()Ljava/lang/Object;", "()TT;")),
        class("java/lang/System")
            .access(ACC_PUBLIC | ACC_FINAL)
            .field(FieldEntry::new(STATIC | ACC_FINAL, "out", "Ljava/io/PrintStream;")),
        class("java/io/PrintStream")
            .method(m(ACC_PUBLIC, "println", "(Ljava/lang/String;)V"))
            .method(m(ACC_PUBLIC, "println", "(I)V"))
            .method(m(ACC_PUBLIC, "println", "(Ljava/lang/Object;)V")),
        class("java/lang/Math")
            .access(ACC_PUBLIC | ACC_FINAL)
            .method(m(STATIC, "max", "(II)I"))
            .method(m(STATIC, "max", "(JJ)J"))
            .method(m(STATIC, "max", "(DD)D")),
        class("java/lang/StringBuilder")
            .access(ACC_PUBLIC | ACC_FINAL)
            .method(m(ACC_PUBLIC, "<init>", "()V"))
            .method(m(ACC_PUBLIC, "append", "(Ljava/lang/String;)Ljava/lang/StringBuilder;"))
            .method(m(ACC_PUBLIC, "append", "(I)Ljava/lang/StringBuilder;"))
            .method(m(ACC_PUBLIC, "append", "(Ljava/lang/Object;)Ljava/lang/StringBuilder;")),
    ];
    classes
        .into_iter()
        .map(|b| {
            let bytes = b.build();
            let name = jinspect_bytecode::ClassFile::decode(&bytes)
                .map(|c| c.this_class)
                .unwrap_or_default();
            (name, bytes)
        })
        .collect()
}

fn entry_inner() -> InnerClassInfo {
    InnerClassInfo {
        inner_class: "java/util/Map$Entry".to_string(),
        outer_class: Some("java/util/Map".to_string()),
        inner_name: Some("Entry".to_string()),
        access_flags: IFACE | ACC_STATIC,
    }
}

/// A class whose single static method `run()` calls `String.valueOf(Object)`
/// and `Missing.gone()`.
pub(crate) fn class_with_code() -> (String, Vec<u8>) {
    let mut b = class("lib/Calls");
    let value_of = b.pool_mut().method_ref(
        "java/lang/String",
        "valueOf",
        "(Ljava/lang/Object;)Ljava/lang/String;",
    );
    let gone = b.pool_mut().method_ref("lib/Missing", "gone", "()V");
    let [v1, v2] = value_of.to_be_bytes();
    let [g1, g2] = gone.to_be_bytes();
    // aconst_null; invokestatic valueOf; pop; invokestatic gone; return
    let code = [0x01, 0xb8, v1, v2, 0x57, 0xb8, g1, g2, 0xb1];
    let bytes = b
        .method(m(STATIC, "run", "()V").with_code(code_attribute(1, 0, &code)))
        .build();
    ("lib/Calls".to_string(), bytes)
}

/// A program over the mini JDK plus the given `(path, text)` sources.
pub(crate) fn program(sources: &[(&str, &str)]) -> Program {
    program_with(SessionConfig::default(), sources)
}

pub(crate) fn program_with(config: SessionConfig, sources: &[(&str, &str)]) -> Program {
    let program = Program::new(config);
    let mut classes = mini_jdk();
    classes.push(class_with_code());
    program
        .index
        .register_bytecode_source(0, Arc::new(ClasspathEntry::memory("jdk", classes)));
    let parser = JavaParser::new().unwrap();
    for (seq, (path, text)) in sources.iter().enumerate() {
        let unit = parser.parse(*path, text).unwrap();
        program
            .index
            .register_source(Arc::new(UnitContext::new(unit, seq)), &program.diagnostics);
    }
    program
}
