use crate::Inputs;
use anyhow::{Context, bail};
use jinspect_api::models::{Diagnostic, ModuleInfo};
use jinspect_api::{CodeInspector, TypeSummary};
use jinspect_core::{ClasspathEntry, CodeModel, Session, SessionConfig};
use serde::Serialize;
use std::io::Write;
use tracing::info;

#[derive(Serialize)]
struct Report {
    modules: Vec<ModuleInfo>,
    types: Vec<TypeSummary>,
    diagnostics: Vec<Diagnostic>,
}

pub(crate) fn load(config: SessionConfig, inputs: &Inputs) -> anyhow::Result<CodeModel> {
    let session = Session::new(config)?;
    let reports = session.add_classpath(inputs.classpath.iter().map(ClasspathEntry::from_path));
    let classes: usize = reports.iter().map(|r| r.registered).sum();
    info!(entries = reports.len(), classes, "classpath registered");

    for dir in &inputs.sources {
        let names = session
            .add_source_dir(dir)
            .with_context(|| format!("reading sources from {}", dir.display()))?;
        info!(root = %dir.display(), types = names.len(), "sources registered");
    }
    Ok(session.resolve())
}

pub(crate) fn inspect(
    out: &mut impl Write,
    config: SessionConfig,
    inputs: &Inputs,
    type_name: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let model = load(config, inputs)?;
    let types = match type_name {
        Some(name) => {
            let Some(id) = model.find_type(name) else {
                bail!("type {name} not found");
            };
            vec![model.type_summary(id)?]
        }
        None => model.types().map(|t| t.summary()).collect(),
    };
    let report = Report {
        modules: model.modules().into_iter().map(|m| m.info).collect(),
        types,
        diagnostics: model.diagnostics(),
    };

    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }
    for module in &report.modules {
        writeln!(out, "{module}")?;
        writeln!(out)?;
    }
    for summary in &report.types {
        write!(out, "{}", render_summary(summary))?;
        writeln!(out)?;
    }
    write_diagnostics(out, &report.diagnostics)
}

pub(crate) fn diagnostics(
    out: &mut impl Write,
    config: SessionConfig,
    inputs: &Inputs,
    json: bool,
) -> anyhow::Result<()> {
    let model = load(config, inputs)?;
    let diagnostics = model.diagnostics();
    if json {
        serde_json::to_writer_pretty(&mut *out, &diagnostics)?;
        writeln!(out)?;
        Ok(())
    } else {
        write_diagnostics(out, &diagnostics)
    }
}

fn write_diagnostics(out: &mut impl Write, diagnostics: &[Diagnostic]) -> anyhow::Result<()> {
    writeln!(out, "diagnostics: {}", diagnostics.len())?;
    for d in diagnostics {
        writeln!(out, "  {d}")?;
    }
    Ok(())
}

fn with_modifiers(modifiers: &[String], rest: &str) -> String {
    if modifiers.is_empty() {
        rest.to_string()
    } else {
        format!("{} {rest}", modifiers.join(" "))
    }
}

/// Java-like outline of one type.
pub(crate) fn render_summary(summary: &TypeSummary) -> String {
    let mut head = format!("{} {}", summary.kind, summary.fqn);
    if !summary.type_parameters.is_empty() {
        head.push_str(&format!("<{}>", summary.type_parameters.join(", ")));
    }
    if let Some(superclass) = &summary.superclass {
        head.push_str(&format!(" extends {superclass}"));
    }
    if !summary.interfaces.is_empty() {
        let keyword = if summary.kind.is_interface_like() { "extends" } else { "implements" };
        head.push_str(&format!(" {keyword} {}", summary.interfaces.join(", ")));
    }

    let mut text = format!("{} {{\n", with_modifiers(&summary.modifiers, &head));
    for field in &summary.fields {
        let decl = format!("{} {}", field.ty, field.name);
        text.push_str(&format!("    {};\n", with_modifiers(&field.modifiers, &decl)));
    }
    for method in &summary.methods {
        let terminator = if method.has_body { "" } else { ";" };
        text.push_str(&format!(
            "    {}{terminator}\n",
            with_modifiers(&method.modifiers, &method.signature)
        ));
    }
    text.push_str("}\n");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use jinspect_api::models::{MethodKind, OriginKind, TypeKind};
    use jinspect_api::{FieldSummary, MethodSummary};
    use std::path::Path;

    #[test]
    fn summaries_render_as_java_outlines() {
        let summary = TypeSummary {
            fqn: "p.Box".to_string(),
            kind: TypeKind::Class,
            origin: OriginKind::Source,
            modifiers: vec!["public".to_string(), "final".to_string()],
            type_parameters: vec!["T extends java.lang.Number".to_string()],
            superclass: Some("java.lang.Object".to_string()),
            interfaces: vec!["java.lang.Runnable".to_string()],
            fields: vec![FieldSummary {
                name: "value".to_string(),
                modifiers: vec!["private".to_string()],
                ty: "T".to_string(),
                origin: OriginKind::Source,
            }],
            methods: vec![
                MethodSummary {
                    name: "run".to_string(),
                    kind: MethodKind::Method,
                    modifiers: vec!["public".to_string()],
                    signature: "void run()".to_string(),
                    origin: OriginKind::Source,
                    has_body: true,
                },
                MethodSummary {
                    name: "get".to_string(),
                    kind: MethodKind::Method,
                    modifiers: vec![],
                    signature: "T get()".to_string(),
                    origin: OriginKind::Source,
                    has_body: false,
                },
            ],
        };
        assert_eq!(
            render_summary(&summary),
            "public final class p.Box<T extends java.lang.Number> extends java.lang.Object implements java.lang.Runnable {\n\
             \x20   private T value;\n\
             \x20   public void run()\n\
             \x20   T get();\n\
             }\n"
        );
    }

    fn write_source(root: &Path, path: &str, text: &str) {
        let file = root.join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, text).unwrap();
    }

    #[test]
    fn source_directories_are_inspected_as_json() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "p/A.java", "package p; public class A { int x; int get() { return x; } }");
        write_source(dir.path(), "p/notes.txt", "not java");
        write_source(dir.path(), "module-info.java", "module app { exports p; }");
        let inputs = Inputs {
            classpath: vec![],
            sources: vec![dir.path().to_path_buf()],
        };

        let mut out = Vec::new();
        inspect(&mut out, SessionConfig::default(), &inputs, Some("p.A"), true).unwrap();
        let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(report["types"][0]["fqn"], "p.A");
        let methods = report["types"][0]["methods"].as_array().unwrap();
        assert!(methods.iter().any(|m| m["signature"] == "int get()"));
        assert_eq!(report["modules"][0]["name"], "app");
        assert_eq!(report["modules"][0]["exports"][0]["package"], "p");

        let mut out = Vec::new();
        inspect(&mut out, SessionConfig::default(), &inputs, Some("p.A"), false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("module app {\n    exports p;\n}\n\n"));

        let mut out = Vec::new();
        let err = inspect(&mut out, SessionConfig::default(), &inputs, Some("p.Missing"), false);
        assert!(err.is_err());
    }

    #[test]
    fn syntax_errors_show_up_in_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "p/Bad.java", "package p; class Bad { void f( }");
        let inputs = Inputs {
            classpath: vec![],
            sources: vec![dir.path().to_path_buf()],
        };
        let mut out = Vec::new();
        diagnostics(&mut out, SessionConfig::default(), &inputs, true).unwrap();
        let diagnostics: Vec<Diagnostic> = serde_json::from_slice(&out).unwrap();
        assert!(
            diagnostics
                .iter()
                .any(|d| d.kind == jinspect_api::models::DiagnosticKind::SyntaxError)
        );
    }

    #[test]
    fn missing_source_roots_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = Inputs {
            classpath: vec![],
            sources: vec![dir.path().join("nope")],
        };
        let mut out = Vec::new();
        assert!(diagnostics(&mut out, SessionConfig::default(), &inputs, false).is_err());
    }
}
