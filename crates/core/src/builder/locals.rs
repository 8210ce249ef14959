//! Binary names for local and anonymous classes.
//!
//! Names follow javac: anonymous classes are `Enclosing$N` and local classes
//! `Enclosing$NName`, counted per innermost enclosing class in source order.
//! They are assigned once per unit, before any body is built, so the same
//! class gets the same name no matter which thread builds it first.

use jinspect_api::models::Range;
use jinspect_java::ast::{
    CompilationUnit, Expr, ExprKind, LambdaBody, MemberDecl, MethodRefTarget,
    Resource, Stmt, StmtKind, SwitchBody, TypeDecl,
};
use std::collections::HashMap;

pub(crate) fn assign_local_names(unit: &CompilationUnit) -> HashMap<Range, String> {
    let mut names = HashMap::new();
    let package = unit.package.as_deref().unwrap_or("");
    for decl in &unit.types {
        let binary = if package.is_empty() {
            decl.name.clone()
        } else {
            format!("{package}.{}", decl.name)
        };
        name_class(decl, &binary, &mut names);
    }
    names
}

/// A class declared inside code.
pub(crate) enum BodyClass<'a> {
    Anonymous(&'a TypeDecl),
    Local(&'a TypeDecl),
}

fn name_class(decl: &TypeDecl, binary: &str, names: &mut HashMap<Range, String>) {
    let mut found = Vec::new();
    for constant in &decl.enum_constants {
        constant.arguments.iter().for_each(|e| classes_in_expr(e, &mut found));
        if let Some(body) = &constant.body {
            found.push(BodyClass::Anonymous(body));
        }
    }
    for member in &decl.members {
        match member {
            MemberDecl::Field(f) => f
                .declarators
                .iter()
                .filter_map(|d| d.init.as_ref())
                .for_each(|e| classes_in_expr(e, &mut found)),
            MemberDecl::Method(m) => {
                if let Some(body) = &m.body {
                    classes_in_stmts(&body.stmts, &mut found);
                }
            }
            MemberDecl::Initializer(i) => classes_in_stmts(&i.body.stmts, &mut found),
            MemberDecl::Type(_) => {}
        }
    }

    let mut anonymous = 0usize;
    let mut local: HashMap<&str, usize> = HashMap::new();
    for class in found {
        let (decl, name) = match class {
            BodyClass::Anonymous(d) => {
                anonymous += 1;
                (d, format!("{binary}${anonymous}"))
            }
            BodyClass::Local(d) => {
                let n = local.entry(d.name.as_str()).or_insert(0);
                *n += 1;
                (d, format!("{binary}${n}{}", d.name))
            }
        };
        name_class(decl, &name, names);
        names.insert(decl.range, name);
    }
    for nested in decl.member_types() {
        name_class(nested, &format!("{binary}${}", nested.name), names);
    }
}

/// Classes declared directly in `stmts`, in source order. Classes nested in
/// those classes are not included.
pub(crate) fn classes_in_stmts<'a>(stmts: &'a [Stmt], out: &mut Vec<BodyClass<'a>>) {
    stmts.iter().for_each(|s| classes_in_stmt(s, out));
}

fn classes_in_stmt<'a>(stmt: &'a Stmt, out: &mut Vec<BodyClass<'a>>) {
    match &stmt.kind {
        StmtKind::Empty | StmtKind::Break(_) | StmtKind::Continue(_) => {}
        StmtKind::Block(b) => classes_in_stmts(&b.stmts, out),
        StmtKind::LocalVar(decl) => decl
            .declarators
            .iter()
            .filter_map(|d| d.init.as_ref())
            .for_each(|e| classes_in_expr(e, out)),
        StmtKind::LocalClass(decl) => out.push(BodyClass::Local(decl)),
        StmtKind::Expr(e) | StmtKind::Throw(e) | StmtKind::Yield(e) => classes_in_expr(e, out),
        StmtKind::Return(e) => {
            if let Some(e) = e {
                classes_in_expr(e, out);
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            classes_in_expr(cond, out);
            classes_in_stmt(then_branch, out);
            if let Some(e) = else_branch {
                classes_in_stmt(e, out);
            }
        }
        StmtKind::While { cond, body } => {
            classes_in_expr(cond, out);
            classes_in_stmt(body, out);
        }
        StmtKind::DoWhile { body, cond } => {
            classes_in_stmt(body, out);
            classes_in_expr(cond, out);
        }
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => {
            classes_in_stmts(init, out);
            if let Some(c) = cond {
                classes_in_expr(c, out);
            }
            update.iter().for_each(|e| classes_in_expr(e, out));
            classes_in_stmt(body, out);
        }
        StmtKind::ForEach { iterable, body, .. } => {
            classes_in_expr(iterable, out);
            classes_in_stmt(body, out);
        }
        StmtKind::Try {
            resources,
            body,
            catches,
            finally,
        } => {
            for r in resources {
                match r {
                    Resource::Decl { init, .. } => classes_in_expr(init, out),
                    Resource::Expr(e) => classes_in_expr(e, out),
                }
            }
            classes_in_stmts(&body.stmts, out);
            for c in catches {
                classes_in_stmts(&c.body.stmts, out);
            }
            if let Some(f) = finally {
                classes_in_stmts(&f.stmts, out);
            }
        }
        StmtKind::Switch(sw) => classes_in_switch(sw, out),
        StmtKind::Synchronized { lock, body } => {
            classes_in_expr(lock, out);
            classes_in_stmts(&body.stmts, out);
        }
        StmtKind::Labeled { body, .. } => classes_in_stmt(body, out),
        StmtKind::Assert { cond, message } => {
            classes_in_expr(cond, out);
            if let Some(m) = message {
                classes_in_expr(m, out);
            }
        }
        StmtKind::ConstructorCall {
            qualifier, args, ..
        } => {
            if let Some(q) = qualifier {
                classes_in_expr(q, out);
            }
            args.iter().for_each(|e| classes_in_expr(e, out));
        }
    }
}

fn classes_in_switch<'a>(sw: &'a SwitchBody, out: &mut Vec<BodyClass<'a>>) {
    classes_in_expr(&sw.selector, out);
    for case in &sw.cases {
        if let Some(g) = &case.guard {
            classes_in_expr(g, out);
        }
        classes_in_stmts(&case.body, out);
    }
}

pub(crate) fn classes_in_expr<'a>(expr: &'a Expr, out: &mut Vec<BodyClass<'a>>) {
    match &expr.kind {
        ExprKind::Literal(_)
        | ExprKind::Name(_)
        | ExprKind::This { .. }
        | ExprKind::Super { .. }
        | ExprKind::ClassLiteral(_)
        | ExprKind::Unsupported(_) => {}
        ExprKind::FieldAccess { target, .. } => classes_in_expr(target, out),
        ExprKind::MethodCall { target, args, .. } => {
            if let Some(t) = target {
                classes_in_expr(t, out);
            }
            args.iter().for_each(|e| classes_in_expr(e, out));
        }
        ExprKind::New {
            outer, args, body, ..
        } => {
            if let Some(o) = outer {
                classes_in_expr(o, out);
            }
            args.iter().for_each(|e| classes_in_expr(e, out));
            if let Some(b) = body {
                out.push(BodyClass::Anonymous(b));
            }
        }
        ExprKind::NewArray { dims, init, .. } => {
            dims.iter().for_each(|e| classes_in_expr(e, out));
            if let Some(items) = init {
                items.iter().for_each(|e| classes_in_expr(e, out));
            }
        }
        ExprKind::ArrayInit(items) => items.iter().for_each(|e| classes_in_expr(e, out)),
        ExprKind::ArrayAccess { array, index } => {
            classes_in_expr(array, out);
            classes_in_expr(index, out);
        }
        ExprKind::Assign { target, value, .. } => {
            classes_in_expr(target, out);
            classes_in_expr(value, out);
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            classes_in_expr(lhs, out);
            classes_in_expr(rhs, out);
        }
        ExprKind::Unary { operand, .. } => classes_in_expr(operand, out),
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            classes_in_expr(cond, out);
            classes_in_expr(then_expr, out);
            classes_in_expr(else_expr, out);
        }
        ExprKind::Cast { expr, .. } | ExprKind::InstanceOf { expr, .. } => {
            classes_in_expr(expr, out)
        }
        ExprKind::Lambda { body, .. } => match body {
            LambdaBody::Expr(e) => classes_in_expr(e, out),
            LambdaBody::Block(b) => classes_in_stmts(&b.stmts, out),
        },
        ExprKind::MethodRef { target, .. } => {
            if let MethodRefTarget::Expr(e) = target {
                classes_in_expr(e, out);
            }
        }
        ExprKind::Switch(sw) => classes_in_switch(sw, out),
        ExprKind::Parens(e) => classes_in_expr(e, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jinspect_java::JavaParser;

    fn names_of(src: &str) -> Vec<String> {
        let unit = JavaParser::new().unwrap().parse("T.java", src).unwrap();
        let mut names: Vec<String> = assign_local_names(&unit).into_values().collect();
        names.sort();
        names
    }

    #[test]
    fn anonymous_and_local_classes_follow_javac_numbering() {
        let names = names_of(
            r#"
            package p;
            class Outer {
                Runnable r = new Runnable() { public void run() {} };
                void m() {
                    class Helper {}
                    Object o = new Object() {
                        void inner() { new Object() {}; }
                    };
                }
                void n() { class Helper {} }
                static class Nested { Object x = new Object() {}; }
            }
            "#,
        );
        assert_eq!(
            names,
            vec![
                "p.Outer$1",
                "p.Outer$1Helper",
                "p.Outer$2",
                "p.Outer$2$1",
                "p.Outer$2Helper",
                "p.Outer$Nested$1",
            ]
        );
    }

    #[test]
    fn enum_constant_bodies_are_anonymous() {
        let names = names_of("enum Op { PLUS { int apply() { return 1; } }, MINUS; }");
        assert_eq!(names, vec!["Op$1"]);
    }
}
