//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use jinspect_bytecode::access::*;
use jinspect_bytecode::{ClassFileBuilder, MethodEntry};
use jinspect_core::{ClasspathEntry, Session, SessionConfig};
use std::io::Write;
use std::path::Path;

const IFACE: u16 = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
const ABSTRACT: u16 = ACC_PUBLIC | ACC_ABSTRACT;
const STATIC: u16 = ACC_PUBLIC | ACC_STATIC;

pub fn method(flags: u16, name: &str, desc: &str) -> MethodEntry {
    MethodEntry::new(flags, name, desc)
}

pub fn generic(flags: u16, name: &str, desc: &str, sig: &str) -> MethodEntry {
    MethodEntry::new(flags, name, desc).with_signature(sig)
}

fn built(builders: Vec<ClassFileBuilder>) -> Vec<(String, Vec<u8>)> {
    builders
        .into_iter()
        .map(|b| {
            let bytes = b.build();
            let name = jinspect_bytecode::ClassFile::decode(&bytes)
                .map(|c| c.this_class)
                .unwrap();
            (name, bytes)
        })
        .collect()
}

/// `java.lang` and `java.util` types the tests refer to.
pub fn jdk() -> Vec<(String, Vec<u8>)> {
    built(vec![
        ClassFileBuilder::new("java/lang/Object")
            .super_class(None)
            .method(method(ACC_PUBLIC, "<init>", "()V"))
            .method(method(ACC_PUBLIC, "toString", "()Ljava/lang/String;"))
            .method(method(ACC_PUBLIC, "equals", "(Ljava/lang/Object;)Z"))
            .method(method(ACC_PUBLIC, "hashCode", "()I")),
        ClassFileBuilder::new("java/lang/String")
            .access(ACC_PUBLIC | ACC_FINAL)
            .interface("java/lang/CharSequence")
            .interface("java/lang/Comparable")
            .signature("Ljava/lang/Object;Ljava/lang/CharSequence;Ljava/lang/Comparable<Ljava/lang/String;>;")
            .method(method(ACC_PUBLIC, "length", "()I"))
            .method(method(ACC_PUBLIC, "compareTo", "(Ljava/lang/String;)I"))
            .method(method(STATIC, "valueOf", "(Ljava/lang/Object;)Ljava/lang/String;")),
        ClassFileBuilder::new("java/lang/CharSequence")
            .access(IFACE)
            .method(method(ABSTRACT, "length", "()I")),
        ClassFileBuilder::new("java/lang/Comparable")
            .access(IFACE)
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
            .method(generic(ABSTRACT, "compareTo", "(Ljava/lang/Object;)I", "(TT;)I")),
        ClassFileBuilder::new("java/lang/Number")
            .access(ABSTRACT)
            .method(method(ABSTRACT, "intValue", "()I")),
        ClassFileBuilder::new("java/lang/Integer")
            .access(ACC_PUBLIC | ACC_FINAL)
            .super_class(Some("java/lang/Number"))
            .method(method(ACC_PUBLIC, "intValue", "()I"))
            .method(method(STATIC, "valueOf", "(I)Ljava/lang/Integer;")),
        ClassFileBuilder::new("java/lang/Enum")
            .access(ABSTRACT)
            .interface("java/lang/Comparable")
            .signature("<E:Ljava/lang/Enum<TE;>;>Ljava/lang/Object;Ljava/lang/Comparable<TE;>;")
            .method(method(ACC_PUBLIC | ACC_FINAL, "name", "()Ljava/lang/String;"))
            .method(method(ACC_PUBLIC | ACC_FINAL, "ordinal", "()I")),
        ClassFileBuilder::new("java/lang/Record").access(ABSTRACT),
        ClassFileBuilder::new("java/lang/Throwable")
            .method(method(ACC_PUBLIC, "<init>", "()V"))
            .method(method(ACC_PUBLIC, "getMessage", "()Ljava/lang/String;")),
        ClassFileBuilder::new("java/lang/Exception")
            .super_class(Some("java/lang/Throwable"))
            .method(method(ACC_PUBLIC, "<init>", "()V")),
        ClassFileBuilder::new("java/lang/Runnable")
            .access(IFACE)
            .method(method(ABSTRACT, "run", "()V")),
        ClassFileBuilder::new("java/lang/Iterable")
            .access(IFACE)
            .signature("<T:Ljava/lang/Object;>Ljava/lang/Object;")
            .method(generic(ABSTRACT, "iterator", "()Ljava/util/Iterator;", "()Ljava/util/Iterator<TT;>;")),
        ClassFileBuilder::new("java/util/Iterator")
            .access(IFACE)
            .signature("<E:Ljava/lang/Object;>Ljava/lang/Object;")
            .method(method(ABSTRACT, "hasNext", "()Z"))
            .method(generic(ABSTRACT, "next", "()Ljava/lang/Object;", "()TE;")),
        ClassFileBuilder::new("java/util/List")
            .access(IFACE)
            .interface("java/lang/Iterable")
            .signature("<E:Ljava/lang/Object;>Ljava/lang/Object;Ljava/lang/Iterable<TE;>;")
            .method(method(ABSTRACT, "size", "()I"))
            .method(generic(ABSTRACT, "get", "(I)Ljava/lang/Object;", "(I)TE;"))
            .method(generic(ABSTRACT, "add", "(Ljava/lang/Object;)Z", "(TE;)Z")),
        ClassFileBuilder::new("java/util/ArrayList")
            .interface("java/util/List")
            .signature("<E:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/List<TE;>;")
            .method(method(ACC_PUBLIC, "<init>", "()V"))
            .method(method(ACC_PUBLIC, "size", "()I"))
            .method(generic(ACC_PUBLIC, "get", "(I)Ljava/lang/Object;", "(I)TE;"))
            .method(generic(ACC_PUBLIC, "add", "(Ljava/lang/Object;)Z", "(TE;)Z"))
            .method(generic(ACC_PUBLIC, "iterator", "()Ljava/util/Iterator;", "()Ljava/util/Iterator<TE;>;")),
        ClassFileBuilder::new("java/util/function/Function")
            .access(IFACE)
            .signature("<T:Ljava/lang/Object;R:Ljava/lang/Object;>Ljava/lang/Object;")
            .method(generic(ABSTRACT, "apply", "(Ljava/lang/Object;)Ljava/lang/Object;", "(TT;)TR;")),
    ])
}

/// A library class `name` with one public no-arg method `marker()` returning
/// `marker_type`, used to tell classpath entries apart.
pub fn marked_class(name: &str, marker_type: &str) -> (String, Vec<u8>) {
    let bytes = ClassFileBuilder::new(name)
        .method(method(ACC_PUBLIC, "<init>", "()V"))
        .method(method(ACC_PUBLIC, "marker", &format!("(){marker_type}")))
        .build();
    (name.to_string(), bytes)
}

pub fn session() -> Session {
    session_with(SessionConfig::default())
}

pub fn session_with(config: SessionConfig) -> Session {
    let session = Session::new(config).unwrap();
    session.add_classpath_entry(ClasspathEntry::memory("jdk", jdk()));
    session
}

/// Session over the fixture JDK plus `sources`, every unit expected to parse.
pub fn session_with_sources(sources: &[(&str, &str)]) -> Session {
    let session = session();
    for (unit, text) in sources {
        session.add_source(*unit, text).unwrap();
    }
    session
}

/// Writes `classes` into a jar at `path`.
pub fn write_jar(path: &Path, classes: &[(String, Vec<u8>)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, bytes) in classes {
        zip.start_file(format!("{name}.class"), options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

/// Writes `classes` as `.class` files under `dir`.
pub fn write_class_dir(dir: &Path, classes: &[(String, Vec<u8>)]) {
    for (name, bytes) in classes {
        let path = dir.join(format!("{name}.class"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }
}
