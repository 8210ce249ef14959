mod common;

use jinspect_api::models::{DiagnosticKind, OriginKind};
use jinspect_bytecode::{ClassFileBuilder, ModuleAttribute, ModulePackage};
use jinspect_core::{ClasspathEntry, CoreError, ModuleOrigin};

fn marker_return(session: &jinspect_core::Session, name: &str) -> String {
    let model = session.resolve();
    let id = session.materialize(name).unwrap();
    let view = model.type_view(id).unwrap();
    let marker = view.methods().into_iter().find(|m| m.name() == "marker").unwrap();
    model.render_type(marker.return_type())
}

#[test]
fn source_declarations_shadow_classpath_ones() {
    let session = common::session();
    session.add_classpath_entry(ClasspathEntry::memory(
        "lib",
        [common::marked_class("p/Foo", "Ljava/lang/String;")],
    ));
    session
        .add_source("p/Foo.java", "package p; public class Foo { public int size() { return 0; } }")
        .unwrap();

    let model = session.resolve();
    let foo = model.type_named("p.Foo").unwrap();
    assert_eq!(foo.origin(), OriginKind::Source);
    assert!(foo.methods().iter().any(|m| m.name() == "size"));
    assert!(foo.methods().iter().all(|m| m.name() != "marker"));

    let shadowed = model.shadowed();
    assert_eq!(shadowed.len(), 1);
    assert_eq!(shadowed[0].name, "p.Foo");
    assert_eq!(shadowed[0].entry, "lib");
}

#[test]
fn source_wins_regardless_of_registration_order() {
    let session = common::session();
    session
        .add_source("p/Foo.java", "package p; public class Foo {}")
        .unwrap();
    session.add_classpath_entry(ClasspathEntry::memory(
        "late",
        [common::marked_class("p/Foo", "Ljava/lang/String;")],
    ));
    let model = session.resolve();
    assert_eq!(model.type_named("p.Foo").unwrap().origin(), OriginKind::Source);
}

#[test]
fn earlier_classpath_entries_win_between_archives() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.jar");
    let second = dir.path().join("second.jar");
    common::write_jar(&first, &[common::marked_class("lib/Bar", "Ljava/lang/String;")]);
    common::write_jar(&second, &[common::marked_class("lib/Bar", "Ljava/lang/Integer;")]);

    let session = common::session();
    let reports = session.add_classpath([
        ClasspathEntry::from_path(&first),
        ClasspathEntry::from_path(&second),
    ]);
    assert!(reports.iter().all(|r| r.registered == 1));
    assert_eq!(marker_return(&session, "lib.Bar"), "java.lang.String");

    let shadowed = session.resolve().shadowed();
    assert_eq!(shadowed.len(), 1);
    assert!(shadowed[0].entry.ends_with("second.jar"));
}

#[test]
fn class_directories_are_read_like_archives() {
    let dir = tempfile::tempdir().unwrap();
    common::write_class_dir(dir.path(), &[common::marked_class("lib/deep/Baz", "I")]);

    let session = common::session();
    let report = session.add_classpath_entry(ClasspathEntry::from_path(dir.path()));
    assert_eq!(report.registered, 1);
    assert_eq!(marker_return(&session, "lib.deep.Baz"), "int");
}

#[test]
fn concurrent_materialization_builds_one_type() {
    let session = common::session_with_sources(&[(
        "com/example/Foo.java",
        "package com.example; public class Foo<T> extends java.util.ArrayList<T> { T first() { return get(0); } }",
    )]);
    let ids: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| session.materialize("com.example.Foo").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(ids.windows(2).all(|w| w[0] == w[1]));

    let model = session.resolve();
    let first = model.type_view(ids[0]).unwrap();
    let a = first.info() as *const _;
    let b = model.type_view(ids[0]).unwrap().info() as *const _;
    assert_eq!(a, b);
    assert!(model.diagnostics().is_empty());
}

#[test]
fn truncated_class_files_fail_alone() {
    let (name, bytes) = common::marked_class("lib/Broken", "V");
    let truncated = bytes[..bytes.len() / 2].to_vec();
    let session = common::session();
    session.add_classpath_entry(ClasspathEntry::memory(
        "lib",
        [(name, truncated), common::marked_class("lib/Fine", "V")],
    ));

    let err = session.materialize("lib.Broken").unwrap_err();
    assert!(matches!(err, CoreError::Decode(_)), "got {err}");
    assert!(err.to_string().contains("truncated"));
    // Reported once, remembered afterwards.
    assert!(matches!(
        session.materialize("lib.Broken"),
        Err(CoreError::Undecodable { .. })
    ));
    assert!(session.materialize("lib.Fine").is_ok());

    let failures: Vec<_> = session
        .diagnostics()
        .into_iter()
        .filter(|d| d.kind == DiagnosticKind::DecodeFailure)
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].subject, "lib.Broken");
}

#[test]
fn unsupported_versions_are_rejected() {
    let bytes = jinspect_bytecode::ClassFileBuilder::new("lib/Future").version(99, 0).build();
    let session = common::session();
    session.add_classpath_entry(ClasspathEntry::memory("lib", [("lib/Future", bytes)]));
    let err = session.materialize("lib.Future").unwrap_err();
    assert!(err.to_string().contains("unsupported bytecode version 99.0"));
}

#[test]
fn nested_and_anonymous_types_get_javac_names() {
    let session = common::session_with_sources(&[(
        "p/Outer.java",
        "package p; public class Outer { \
           static class Inner {} \
           Runnable r = new Runnable() { public void run() {} }; \
           void f() { class Local {} new Local(); } }",
    )]);
    let model = session.resolve();
    let inner = model.type_named("p.Outer.Inner").unwrap();
    assert_eq!(inner.binary_name(), "p.Outer$Inner");
    assert_eq!(inner.outer().unwrap().name(), "p.Outer");
    assert_eq!(model.find_type("p.Outer$Inner"), Some(inner.id()));

    let outer = model.type_named("p.Outer").unwrap();
    assert_eq!(outer.member_types().len(), 1);
    let r = outer.fields().into_iter().find(|f| f.name() == "r").unwrap();
    r.initializer().unwrap();
    let anonymous = model.type_named("p.Outer$1").unwrap();
    assert!(anonymous.info().is_anonymous());
    assert_eq!(anonymous.interfaces().len(), 1);
    assert!(model.type_named("p.Outer$1Local").is_some());
}

/// A `module-info.class` exporting `package` to everyone.
fn module_descriptor(name: &str, package: &str) -> (String, Vec<u8>) {
    let bytes = ClassFileBuilder::new("module-info")
        .module(ModuleAttribute {
            name: name.to_string(),
            exports: vec![ModulePackage {
                package: package.to_string(),
                flags: 0,
                to: vec![],
            }],
            ..Default::default()
        })
        .build();
    ("module-info".to_string(), bytes)
}

#[test]
fn modules_come_from_descriptors_and_sources() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("core.jar");
    common::write_jar(
        &jar,
        &[
            module_descriptor("com.acme.core", "com/acme/core"),
            common::marked_class("com/acme/core/Util", "I"),
        ],
    );

    let session = common::session();
    let report = session.add_classpath_entry(ClasspathEntry::from_path(&jar));
    assert_eq!(report.registered, 1);
    assert_eq!(report.module.as_deref(), Some("com.acme.core"));
    let declared = session
        .add_source(
            "src/module-info.java",
            "module com.acme.app { requires transitive com.acme.core; exports com.acme.app; }",
        )
        .unwrap();
    assert!(declared.is_empty());
    session
        .add_source("src/com/acme/app/Main.java", "package com.acme.app; public class Main {}")
        .unwrap();

    let model = session.resolve();
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let names: Vec<String> = model.modules().into_iter().map(|m| m.info.name).collect();
    assert_eq!(names, vec!["com.acme.app", "com.acme.core"]);

    let app = model.module("com.acme.app").unwrap();
    assert!(matches!(app.origin, ModuleOrigin::Source { .. }));
    assert!(app.info.requires("com.acme.core").unwrap().transitive);
    let core = model.module("com.acme.core").unwrap();
    assert!(matches!(&core.origin, ModuleOrigin::Bytecode { entry, .. } if entry.ends_with("core.jar")));
    assert!(core.info.exports_to("com.acme.core", "com.acme.app"));
}

#[test]
fn source_modules_win_and_duplicates_are_reported() {
    let session = common::session();
    session.add_classpath_entry(ClasspathEntry::memory(
        "app.jar",
        [module_descriptor("com.acme.app", "com/acme/old")],
    ));
    session
        .add_source("a/module-info.java", "module com.acme.app { exports com.acme.a; }")
        .unwrap();
    session
        .add_source("b/module-info.java", "module com.acme.app { exports com.acme.b; }")
        .unwrap();

    let model = session.resolve();
    let app = model.module("com.acme.app").unwrap();
    assert!(matches!(&app.origin, ModuleOrigin::Source { unit, .. } if &**unit == "a/module-info.java"));
    assert_eq!(app.info.exports[0].package, "com.acme.a");

    let diagnostics = model.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::DuplicateDeclaration);
    assert_eq!(
        diagnostics[0].location.as_ref().map(|l| &*l.unit),
        Some("b/module-info.java")
    );
}
