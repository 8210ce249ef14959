use jinspect_api::models::{Modifiers, TypeKind, TypeRef};
use jinspect_java::JavaParser;
use jinspect_java::ast::*;

fn parse(src: &str) -> CompilationUnit {
    JavaParser::new()
        .unwrap()
        .parse("Test.java", src)
        .unwrap_or_else(|e| panic!("unexpected syntax error: {e}"))
}

fn method_body<'a>(unit: &'a CompilationUnit, name: &str) -> &'a Block {
    unit.types[0]
        .methods()
        .find(|m| m.name == name)
        .and_then(|m| m.body.as_ref())
        .unwrap_or_else(|| panic!("no body for {name}"))
}

#[test]
fn syntax_error_reports_unit_and_line() {
    let err = JavaParser::new()
        .unwrap()
        .parse("Broken.java", "class A {\n  void m() {\n    int x = ;\n  }\n}\n")
        .unwrap_err();
    assert_eq!(&*err.unit, "Broken.java");
    assert_eq!(err.line, 3);
    assert!(err.column >= 5, "column {} should point into line 3", err.column);
    assert!(err.to_string().starts_with("Broken.java:3:"));
}

#[test]
fn syntax_error_in_one_unit_leaves_parser_usable() {
    let parser = JavaParser::new().unwrap();
    assert!(parser.parse("Bad.java", "class {").is_err());
    let unit = parser.parse("Good.java", "class Good {}").unwrap();
    assert_eq!(unit.types[0].name, "Good");
}

#[test]
fn nested_local_and_anonymous_types() {
    let unit = parse(
        r#"
        package p;
        public class Outer<T extends Comparable<T>> {
            static class Nested { interface Deep {} }
            void run() {
                class Local {}
                Runnable r = new Runnable() { public void run() {} };
            }
        }
        "#,
    );
    let mut seen = Vec::new();
    unit.visit_types(|path, decl| {
        let mut name: Vec<&str> = path.iter().map(|d| d.name.as_str()).collect();
        name.push(&decl.name);
        seen.push(name.join("."));
    });
    assert_eq!(seen, vec!["Outer", "Outer.Nested", "Outer.Nested.Deep"]);

    let outer = &unit.types[0];
    assert!(outer.modifiers.contains(Modifiers::PUBLIC));
    assert_eq!(outer.type_params[0].name, "T");
    assert_eq!(
        outer.type_params[0].bounds,
        vec![TypeRef::Generic {
            base: Box::new(TypeRef::raw("Comparable")),
            args: vec![TypeRef::raw("T")]
        }]
    );

    let body = method_body(&unit, "run");
    assert!(matches!(&body.stmts[0].kind, StmtKind::LocalClass(decl) if decl.name == "Local"));
    let StmtKind::LocalVar(local) = &body.stmts[1].kind else {
        panic!("expected local variable");
    };
    let init = local.declarators[0].init.as_ref().unwrap();
    let ExprKind::New { body: Some(anon), .. } = &init.kind else {
        panic!("expected anonymous class");
    };
    assert!(anon.name.is_empty());
    assert_eq!(anon.methods().count(), 1);
}

#[test]
fn modification_shapes_in_method_bodies() {
    let unit = parse(
        r#"
        import java.util.*;
        class C {
            private final List<String> items = new ArrayList<>();
            int count;
            void mutate(String[] args) {
                count += args.length;
                items.add(args[0]);
                this.count++;
                items.forEach(s -> System.out.println(s));
                try (var in = new java.io.StringReader("x")) {
                    in.read();
                } catch (java.io.IOException | RuntimeException e) {
                    throw new IllegalStateException(e);
                }
                Object o = items;
                if (o instanceof List<?> l && !l.isEmpty()) {
                    count = l.size();
                }
            }
        }
        "#,
    );
    let body = method_body(&unit, "mutate");
    assert_eq!(body.stmts.len(), 6);
    assert!(matches!(
        &body.stmts[0].kind,
        StmtKind::Expr(Expr { kind: ExprKind::Assign { op: AssignOp(Some(BinaryOp::Add)), .. }, .. })
    ));
    assert!(matches!(
        &body.stmts[2].kind,
        StmtKind::Expr(Expr { kind: ExprKind::Unary { op: UnaryOp::PostInc, .. }, .. })
    ));
    let StmtKind::Expr(call) = &body.stmts[3].kind else {
        panic!("expected call");
    };
    let ExprKind::MethodCall { args, .. } = &call.kind else {
        panic!("expected call");
    };
    assert!(matches!(args[0].kind, ExprKind::Lambda { .. }));

    let StmtKind::Try { resources, catches, .. } = &body.stmts[4].kind else {
        panic!("expected try-with-resources");
    };
    assert!(matches!(&resources[0], Resource::Decl { ty: None, name, .. } if name == "in"));
    assert_eq!(catches[0].types.len(), 2);

    let StmtKind::If { cond, .. } = &body.stmts[5].kind else {
        panic!("expected if");
    };
    assert!(matches!(cond.kind, ExprKind::Binary { op: BinaryOp::And, .. }));
}

#[test]
fn switch_expression_with_patterns_and_guards() {
    let unit = parse(
        r#"
        class S {
            String describe(Object o) {
                return switch (o) {
                    case Integer i when i > 0 -> "positive";
                    case String s -> { yield s; }
                    case null, default -> "other";
                };
            }
        }
        "#,
    );
    let body = method_body(&unit, "describe");
    let StmtKind::Return(Some(Expr { kind: ExprKind::Switch(switch), .. })) = &body.stmts[0].kind
    else {
        panic!("expected switch expression");
    };
    assert!(switch.arrow);
    assert_eq!(switch.cases.len(), 3);
    assert!(switch.cases[0].guard.is_some());
    assert!(matches!(&switch.cases[0].labels[0], CaseLabel::Pattern(p) if p.ty() == &TypeRef::raw("Integer")));
    assert!(switch.cases[2].labels.contains(&CaseLabel::Default));
}

#[test]
fn records_enums_and_text_blocks() {
    let unit = parse(
        "record Point(int x, int y) {\n    Point {\n        if (x < 0) throw new IllegalArgumentException();\n    }\n    static final String DOC = \"\"\"\n        point\n          record\n        \"\"\";\n}\nenum Color { RED, GREEN { @Override public String toString() { return \"g\"; } } }\n",
    );
    let point = &unit.types[0];
    assert_eq!(point.kind, TypeKind::Record);
    assert_eq!(point.record_components.len(), 2);
    assert!(
        point
            .methods()
            .any(|m| m.kind == MethodDeclKind::CompactConstructor)
    );
    let doc = point.fields().next().unwrap();
    assert_eq!(
        doc.declarators[0].init.as_ref().map(|e| &e.kind),
        Some(&ExprKind::Literal(Literal::String("point\n  record\n".into())))
    );

    let color = &unit.types[1];
    assert_eq!(color.kind, TypeKind::Enum);
    assert_eq!(color.enum_constants.len(), 2);
    assert!(color.enum_constants[1].body.is_some());
}
