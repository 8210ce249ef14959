use super::decl::is_type_declaration;
use super::{Lower, range_of};
use crate::ast::*;
use crate::error::Result;
use tracing::debug;
use tree_sitter::Node;

impl<'s> Lower<'s> {
    pub(crate) fn block(&self, node: Node) -> Result<Block> {
        Ok(Block {
            stmts: self
                .named(node)
                .into_iter()
                .map(|s| self.stmt(s))
                .collect::<Result<_>>()?,
            range: range_of(node),
        })
    }

    fn boxed_stmt(&self, node: Node, field: &str) -> Result<Box<Stmt>> {
        Ok(Box::new(self.stmt(self.required(node, field)?)?))
    }

    pub(crate) fn stmt(&self, node: Node) -> Result<Stmt> {
        let kind = match node.kind() {
            ";" => StmtKind::Empty,
            "block" => StmtKind::Block(self.block(node)?),
            "local_variable_declaration" => StmtKind::LocalVar(self.local_var(node)?),
            k if is_type_declaration(k) => StmtKind::LocalClass(Box::new(self.type_decl(node)?)),
            "expression_statement" => match self.named(node).first() {
                Some(e) => StmtKind::Expr(self.expr(*e)?),
                None => StmtKind::Empty,
            },
            "if_statement" => StmtKind::If {
                cond: self.condition(node)?,
                then_branch: self.boxed_stmt(node, "consequence")?,
                else_branch: match node.child_by_field_name("alternative") {
                    Some(a) => Some(Box::new(self.stmt(a)?)),
                    None => None,
                },
            },
            "while_statement" => StmtKind::While {
                cond: self.condition(node)?,
                body: self.boxed_stmt(node, "body")?,
            },
            "do_statement" => StmtKind::DoWhile {
                body: self.boxed_stmt(node, "body")?,
                cond: self.condition(node)?,
            },
            "for_statement" => {
                let mut init = Vec::new();
                for i in self.field(node, "init") {
                    init.push(if i.kind() == "local_variable_declaration" {
                        Stmt {
                            kind: StmtKind::LocalVar(self.local_var(i)?),
                            range: range_of(i),
                        }
                    } else {
                        let e = self.expr(i)?;
                        Stmt {
                            range: e.range,
                            kind: StmtKind::Expr(e),
                        }
                    });
                }
                let cond = match node.child_by_field_name("condition") {
                    Some(c) => Some(self.expr(c)?),
                    None => None,
                };
                let update = self
                    .field(node, "update")
                    .into_iter()
                    .map(|u| self.expr(u))
                    .collect::<Result<_>>()?;
                StmtKind::For {
                    init,
                    cond,
                    update,
                    body: self.boxed_stmt(node, "body")?,
                }
            }
            "enhanced_for_statement" => {
                let (modifiers, _) = self.modifiers(node)?;
                let dims = self.dims(node.child_by_field_name("dimensions"));
                StmtKind::ForEach {
                    modifiers,
                    ty: self
                        .local_type(self.required(node, "type")?)
                        .map(|t| t.array_of(dims)),
                    name: self.text(self.required(node, "name")?).to_string(),
                    iterable: self.expr(self.required(node, "value")?)?,
                    body: self.boxed_stmt(node, "body")?,
                }
            }
            "return_statement" => StmtKind::Return(match self.named(node).first() {
                Some(e) => Some(self.expr(*e)?),
                None => None,
            }),
            "throw_statement" => StmtKind::Throw(self.first_expr(node)?),
            "yield_statement" => StmtKind::Yield(self.first_expr(node)?),
            "break_statement" => {
                StmtKind::Break(self.named(node).first().map(|l| self.text(*l).to_string()))
            }
            "continue_statement" => {
                StmtKind::Continue(self.named(node).first().map(|l| self.text(*l).to_string()))
            }
            "try_statement" | "try_with_resources_statement" => self.try_stmt(node)?,
            "switch_expression" | "switch_statement" => {
                StmtKind::Switch(Box::new(self.switch_body(node)?))
            }
            "synchronized_statement" => {
                let lock = self
                    .child_of_kind(node, "parenthesized_expression")
                    .ok_or_else(|| self.error_at(node, "a lock expression"))?;
                StmtKind::Synchronized {
                    lock: self.unparenthesized(lock)?,
                    body: self.block(self.required(node, "body")?)?,
                }
            }
            "labeled_statement" => {
                let children = self.named(node);
                let (Some(label), Some(body)) = (children.first(), children.last()) else {
                    return Err(self.error_at(node, "a labeled statement"));
                };
                StmtKind::Labeled {
                    label: self.text(*label).to_string(),
                    body: Box::new(self.stmt(*body)?),
                }
            }
            "assert_statement" => {
                let children = self.named(node);
                let cond = match children.first() {
                    Some(c) => self.expr(*c)?,
                    None => return Err(self.error_at(node, "an assertion condition")),
                };
                let message = match children.get(1) {
                    Some(m) => Some(self.expr(*m)?),
                    None => None,
                };
                StmtKind::Assert { cond, message }
            }
            "explicit_constructor_invocation" => {
                let args = node
                    .child_by_field_name("arguments")
                    .or_else(|| self.child_of_kind(node, "argument_list"))
                    .ok_or_else(|| self.error_at(node, "constructor arguments"))?;
                let qualifier = match node.child_by_field_name("object") {
                    Some(o) => Some(self.expr(o)?),
                    None => None,
                };
                StmtKind::ConstructorCall {
                    is_super: self.child_of_kind(node, "super").is_some(),
                    qualifier,
                    type_args: node
                        .child_by_field_name("type_arguments")
                        .map(|t| self.type_arguments(t))
                        .unwrap_or_default(),
                    args: self.arguments(args)?,
                }
            }
            other => {
                debug!(kind = other, "statement kind not modelled");
                StmtKind::Empty
            }
        };
        Ok(Stmt {
            kind,
            range: range_of(node),
        })
    }

    fn first_expr(&self, node: Node) -> Result<Expr> {
        match self.named(node).first() {
            Some(e) => self.expr(*e),
            None => Err(self.error_at(node, "an expression")),
        }
    }

    /// The `condition` field, without its parentheses.
    fn condition(&self, node: Node) -> Result<Expr> {
        self.unparenthesized(self.required(node, "condition")?)
    }

    pub(crate) fn unparenthesized(&self, node: Node) -> Result<Expr> {
        if node.kind() == "parenthesized_expression" {
            self.first_expr(node)
        } else {
            self.expr(node)
        }
    }

    fn local_var(&self, node: Node) -> Result<LocalVarDecl> {
        let (modifiers, annotations) = self.modifiers(node)?;
        Ok(LocalVarDecl {
            modifiers,
            annotations,
            ty: self.local_type(self.required(node, "type")?),
            declarators: self.declarators(node)?,
        })
    }

    fn try_stmt(&self, node: Node) -> Result<StmtKind> {
        let mut resources = Vec::new();
        if let Some(spec) = node.child_by_field_name("resources") {
            for r in self.named(spec) {
                if r.kind() != "resource" {
                    continue;
                }
                resources.push(match r.child_by_field_name("type") {
                    Some(t) => {
                        let (modifiers, _) = self.modifiers(r)?;
                        Resource::Decl {
                            modifiers,
                            ty: self.local_type(t),
                            name: self.text(self.required(r, "name")?).to_string(),
                            init: self.expr(self.required(r, "value")?)?,
                            range: range_of(r),
                        }
                    }
                    None => Resource::Expr(self.first_expr(r)?),
                });
            }
        }
        let body = self.block(self.required(node, "body")?)?;
        let mut catches = Vec::new();
        let mut finally = None;
        for child in self.named(node) {
            match child.kind() {
                "catch_clause" => catches.push(self.catch_clause(child)?),
                "finally_clause" => {
                    if let Some(b) = self.child_of_kind(child, "block") {
                        finally = Some(self.block(b)?);
                    }
                }
                _ => {}
            }
        }
        Ok(StmtKind::Try {
            resources,
            body,
            catches,
            finally,
        })
    }

    fn catch_clause(&self, node: Node) -> Result<CatchClause> {
        let param = self
            .child_of_kind(node, "catch_formal_parameter")
            .ok_or_else(|| self.error_at(node, "a catch parameter"))?;
        let (modifiers, _) = self.modifiers(param)?;
        let types = self
            .child_of_kind(param, "catch_type")
            .map(|t| {
                self.named(t)
                    .into_iter()
                    .map(|ty| self.type_ref(ty))
                    .collect()
            })
            .unwrap_or_default();
        Ok(CatchClause {
            modifiers,
            types,
            name: self.text(self.required(param, "name")?).to_string(),
            body: self.block(self.required(node, "body")?)?,
            range: range_of(node),
        })
    }

    pub(crate) fn switch_body(&self, node: Node) -> Result<SwitchBody> {
        let selector = self.condition(node)?;
        let block = self.required(node, "body")?;
        let mut cases = Vec::new();
        let mut arrow = false;
        for group in self.named(block) {
            match group.kind() {
                kind @ ("switch_block_statement_group" | "switch_rule") => {
                    arrow |= kind == "switch_rule";
                    let mut labels = Vec::new();
                    let mut guard = None;
                    let mut body = Vec::new();
                    for child in self.named(group) {
                        if child.kind() == "switch_label" {
                            self.switch_label(child, &mut labels, &mut guard)?;
                        } else {
                            body.push(self.stmt(child)?);
                        }
                    }
                    cases.push(SwitchCase {
                        labels,
                        guard,
                        body,
                        range: range_of(group),
                    });
                }
                _ => {}
            }
        }
        Ok(SwitchBody {
            selector,
            arrow,
            cases,
        })
    }

    fn switch_label(
        &self,
        node: Node,
        labels: &mut Vec<CaseLabel>,
        guard: &mut Option<Expr>,
    ) -> Result<()> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.is_extra() {
                continue;
            }
            match child.kind() {
                "default" => labels.push(CaseLabel::Default),
                "pattern" | "type_pattern" | "record_pattern" => {
                    labels.push(CaseLabel::Pattern(self.pattern(child)?))
                }
                "guard" => *guard = Some(self.first_expr(child)?),
                _ if child.is_named() => labels.push(CaseLabel::Expr(self.expr(child)?)),
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn pattern(&self, node: Node) -> Result<Pattern> {
        match node.kind() {
            "pattern" => match self.named(node).first() {
                Some(inner) => self.pattern(*inner),
                None => Err(self.error_at(node, "a pattern")),
            },
            "record_pattern" => {
                let children = self.named(node);
                let ty = children
                    .iter()
                    .find(|c| c.kind() != "record_pattern_body")
                    .map(|t| self.type_ref(*t))
                    .unwrap_or_default();
                let mut components = Vec::new();
                if let Some(body) = children.iter().find(|c| c.kind() == "record_pattern_body") {
                    for c in self.named(*body) {
                        components.push(self.pattern(c)?);
                    }
                }
                Ok(Pattern::Record {
                    ty,
                    components,
                    range: range_of(node),
                })
            }
            "underscore_pattern" => Ok(Pattern::Type {
                ty: Default::default(),
                name: None,
                range: range_of(node),
            }),
            // type_pattern and record_pattern_component: a type then a name.
            _ => {
                let children: Vec<_> = self
                    .named(node)
                    .into_iter()
                    .filter(|c| c.kind() != "modifiers")
                    .collect();
                if let [single] = children.as_slice() {
                    if single.kind() == "underscore_pattern" {
                        return self.pattern(*single);
                    }
                }
                let (Some(ty), Some(name)) = (children.first(), children.last()) else {
                    return Err(self.error_at(node, "a type pattern"));
                };
                Ok(Pattern::Type {
                    ty: self.type_ref(*ty),
                    name: Some(self.text(*name).to_string()),
                    range: range_of(node),
                })
            }
        }
    }
}
