use super::types::is_annotation;
use super::{Lower, literal, range_of};
use crate::ast::*;
use crate::error::Result;
use tracing::debug;
use tree_sitter::Node;

fn is_type_node(kind: &str) -> bool {
    matches!(
        kind,
        "generic_type"
            | "array_type"
            | "integral_type"
            | "floating_point_type"
            | "boolean_type"
            | "void_type"
            | "type_identifier"
            | "scoped_type_identifier"
            | "annotated_type"
    )
}

impl<'s> Lower<'s> {
    fn boxed(&self, node: Node, field: &str) -> Result<Box<Expr>> {
        Ok(Box::new(self.expr(self.required(node, field)?)?))
    }

    pub(crate) fn arguments(&self, node: Node) -> Result<Vec<Expr>> {
        self.named(node).into_iter().map(|a| self.expr(a)).collect()
    }

    fn literal(&self, node: Node, parse: fn(&str) -> std::result::Result<Literal, String>) -> Result<ExprKind> {
        parse(self.text(node))
            .map(ExprKind::Literal)
            .map_err(|reason| self.error_at(node, &reason))
    }

    /// A `super` child that is not the `object` field marks `Outer.super.x`.
    fn qualified_super(&self, node: Node, object: Option<Node>) -> bool {
        let mut cursor = node.walk();
        let found = node
            .children(&mut cursor)
            .any(|c| c.kind() == "super" && Some(c.id()) != object.map(|o| o.id()));
        found
    }

    pub(crate) fn expr(&self, node: Node) -> Result<Expr> {
        let kind = match node.kind() {
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal" => self.literal(node, literal::integer)?,
            "decimal_floating_point_literal" | "hex_floating_point_literal" => {
                self.literal(node, literal::floating)?
            }
            "character_literal" => self.literal(node, literal::character)?,
            "string_literal" => self.literal(node, literal::string)?,
            "true" => ExprKind::Literal(Literal::Bool(true)),
            "false" => ExprKind::Literal(Literal::Bool(false)),
            "null_literal" => ExprKind::Literal(Literal::Null),
            "identifier" => ExprKind::Name(self.text(node).to_string()),
            "this" => ExprKind::This { qualifier: None },
            "super" => ExprKind::Super { qualifier: None },
            "parenthesized_expression" => match self.named(node).first() {
                Some(inner) => ExprKind::Parens(Box::new(self.expr(*inner)?)),
                None => return Err(self.error_at(node, "an expression")),
            },
            "field_access" => {
                let object = self.required(node, "object")?;
                let field = self.required(node, "field")?;
                let qualifier = self.text(object).chars().filter(|c| !c.is_whitespace()).collect();
                let target = if self.qualified_super(node, Some(object)) {
                    Expr {
                        kind: ExprKind::Super {
                            qualifier: Some(qualifier),
                        },
                        range: range_of(object),
                    }
                } else if field.kind() == "this" {
                    return Ok(Expr {
                        kind: ExprKind::This {
                            qualifier: Some(qualifier),
                        },
                        range: range_of(node),
                    });
                } else {
                    self.expr(object)?
                };
                ExprKind::FieldAccess {
                    target: Box::new(target),
                    name: self.text(field).to_string(),
                }
            }
            "array_access" => ExprKind::ArrayAccess {
                array: self.boxed(node, "array")?,
                index: self.boxed(node, "index")?,
            },
            "method_invocation" => {
                let object = node.child_by_field_name("object");
                let target = match object {
                    Some(o) if self.qualified_super(node, Some(o)) => Some(Box::new(Expr {
                        kind: ExprKind::Super {
                            qualifier: Some(self.text(o).to_string()),
                        },
                        range: range_of(o),
                    })),
                    Some(o) => Some(Box::new(self.expr(o)?)),
                    None => None,
                };
                ExprKind::MethodCall {
                    target,
                    type_args: node
                        .child_by_field_name("type_arguments")
                        .map(|t| self.type_arguments(t))
                        .unwrap_or_default(),
                    name: self.text(self.required(node, "name")?).to_string(),
                    args: self.arguments(self.required(node, "arguments")?)?,
                }
            }
            "object_creation_expression" => self.object_creation(node)?,
            "array_creation_expression" => {
                let element = self.type_ref(self.required(node, "type")?);
                let mut dims = Vec::new();
                let mut extra_dims = 0;
                for d in self.field(node, "dimensions") {
                    match d.kind() {
                        "dimensions_expr" => match self.named(d).into_iter().rfind(|c| !is_annotation(*c)) {
                            Some(e) => dims.push(self.expr(e)?),
                            None => return Err(self.error_at(d, "an array length")),
                        },
                        _ => extra_dims += self.dims(Some(d)),
                    }
                }
                let init = match node.child_by_field_name("value") {
                    Some(v) => Some(self.arguments(v)?),
                    None => None,
                };
                ExprKind::NewArray {
                    element,
                    dims,
                    extra_dims,
                    init,
                }
            }
            "array_initializer" => ExprKind::ArrayInit(self.arguments(node)?),
            "assignment_expression" => {
                let op_node = self.required(node, "operator")?;
                let op = AssignOp::from_token(op_node.kind())
                    .ok_or_else(|| self.error_at(op_node, "an assignment operator"))?;
                ExprKind::Assign {
                    op,
                    target: self.boxed(node, "left")?,
                    value: self.boxed(node, "right")?,
                }
            }
            "binary_expression" => {
                let op_node = self.required(node, "operator")?;
                let op = BinaryOp::from_token(op_node.kind())
                    .ok_or_else(|| self.error_at(op_node, "a binary operator"))?;
                ExprKind::Binary {
                    op,
                    lhs: self.boxed(node, "left")?,
                    rhs: self.boxed(node, "right")?,
                }
            }
            "unary_expression" => {
                let op_node = self.required(node, "operator")?;
                let op = match op_node.kind() {
                    "+" => UnaryOp::Plus,
                    "-" => UnaryOp::Minus,
                    "!" => UnaryOp::Not,
                    "~" => UnaryOp::BitNot,
                    _ => return Err(self.error_at(op_node, "a unary operator")),
                };
                ExprKind::Unary {
                    op,
                    operand: self.boxed(node, "operand")?,
                }
            }
            "update_expression" => {
                let mut cursor = node.walk();
                let children: Vec<_> = node.children(&mut cursor).filter(|c| !c.is_extra()).collect();
                let (op, operand) = match children.as_slice() {
                    [op, operand] if !op.is_named() => (
                        if op.kind() == "++" { UnaryOp::PreInc } else { UnaryOp::PreDec },
                        *operand,
                    ),
                    [operand, op] => (
                        if op.kind() == "++" { UnaryOp::PostInc } else { UnaryOp::PostDec },
                        *operand,
                    ),
                    _ => return Err(self.error_at(node, "an increment or decrement")),
                };
                ExprKind::Unary {
                    op,
                    operand: Box::new(self.expr(operand)?),
                }
            }
            "ternary_expression" => ExprKind::Conditional {
                cond: self.boxed(node, "condition")?,
                then_expr: self.boxed(node, "consequence")?,
                else_expr: self.boxed(node, "alternative")?,
            },
            "cast_expression" => {
                let mut types = self.field(node, "type").into_iter().map(|t| self.type_ref(t));
                let ty = types.next().unwrap_or_default();
                ExprKind::Cast {
                    ty,
                    extra_bounds: types.collect(),
                    expr: self.boxed(node, "value")?,
                }
            }
            "instanceof_expression" => {
                let expr = self.boxed(node, "left")?;
                let pattern = if let Some(p) = node.child_by_field_name("pattern") {
                    self.pattern(p)?
                } else {
                    let right = self.required(node, "right")?;
                    if matches!(right.kind(), "type_pattern" | "record_pattern" | "pattern") {
                        self.pattern(right)?
                    } else {
                        Pattern::Type {
                            ty: self.type_ref(right),
                            name: node
                                .child_by_field_name("name")
                                .map(|n| self.text(n).to_string()),
                            range: range_of(right),
                        }
                    }
                };
                ExprKind::InstanceOf { expr, pattern }
            }
            "lambda_expression" => self.lambda(node)?,
            "method_reference" => self.method_reference(node)?,
            "class_literal" => match self.named(node).first() {
                Some(t) => ExprKind::ClassLiteral(self.type_ref(*t)),
                None => return Err(self.error_at(node, "a type")),
            },
            "switch_expression" => ExprKind::Switch(Box::new(self.switch_body(node)?)),
            // Qualified names in expression position (annotation values, case labels).
            "scoped_identifier" => {
                let scope = self.required(node, "scope")?;
                let name = self.required(node, "name")?;
                ExprKind::FieldAccess {
                    target: Box::new(self.expr(scope)?),
                    name: self.text(name).to_string(),
                }
            }
            other => {
                debug!(kind = other, "expression kind not modelled");
                ExprKind::Unsupported(other.to_string())
            }
        };
        Ok(Expr {
            kind,
            range: range_of(node),
        })
    }

    fn object_creation(&self, node: Node) -> Result<ExprKind> {
        let ty_node = self.required(node, "type")?;
        let type_args_node = node.child_by_field_name("type_arguments");
        // `outer.new Inner()`: the leading primary expression carries no field.
        let outer = match node.named_child(0) {
            Some(first)
                if first.id() != ty_node.id()
                    && Some(first.id()) != type_args_node.map(|t| t.id())
                    && !is_annotation(first)
                    && !first.is_extra() =>
            {
                Some(Box::new(self.expr(first)?))
            }
            _ => None,
        };
        let body = match self.child_of_kind(node, "class_body") {
            Some(b) => Some(Box::new(self.anonymous_body(b)?)),
            None => None,
        };
        Ok(ExprKind::New {
            outer,
            ty: self.type_ref(ty_node),
            type_args: type_args_node
                .map(|t| self.type_arguments(t))
                .unwrap_or_default(),
            args: self.arguments(self.required(node, "arguments")?)?,
            body,
        })
    }

    fn lambda(&self, node: Node) -> Result<ExprKind> {
        let params_node = self.required(node, "parameters")?;
        let params = match params_node.kind() {
            "identifier" => vec![LambdaParam {
                name: self.text(params_node).to_string(),
                ty: None,
                range: range_of(params_node),
            }],
            "inferred_parameters" => self
                .named(params_node)
                .into_iter()
                .map(|p| LambdaParam {
                    name: self.text(p).to_string(),
                    ty: None,
                    range: range_of(p),
                })
                .collect(),
            _ => self
                .formal_parameters(params_node)?
                .into_iter()
                .map(|p| LambdaParam {
                    ty: match &p.ty {
                        jinspect_api::models::TypeRef::Raw(t) if t == "var" => None,
                        _ => Some(p.ty),
                    },
                    name: p.name,
                    range: p.range,
                })
                .collect(),
        };
        let body_node = self.required(node, "body")?;
        let body = if body_node.kind() == "block" {
            LambdaBody::Block(self.block(body_node)?)
        } else {
            LambdaBody::Expr(Box::new(self.expr(body_node)?))
        };
        Ok(ExprKind::Lambda { params, body })
    }

    fn method_reference(&self, node: Node) -> Result<ExprKind> {
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).filter(|c| !c.is_extra()).collect();
        let Some(first) = children.first().copied() else {
            return Err(self.error_at(node, "a method reference target"));
        };
        let target = if first.kind() == "super" {
            MethodRefTarget::Super { qualifier: None }
        } else if first.kind() == "field_access"
            && first.child_by_field_name("field").is_some_and(|f| f.kind() == "super")
        {
            MethodRefTarget::Super {
                qualifier: first
                    .child_by_field_name("object")
                    .map(|o| self.text(o).to_string()),
            }
        } else if is_type_node(first.kind()) {
            MethodRefTarget::Type(self.type_ref(first))
        } else {
            MethodRefTarget::Expr(Box::new(self.expr(first)?))
        };
        let type_args = children
            .iter()
            .find(|c| c.kind() == "type_arguments")
            .map(|t| self.type_arguments(*t))
            .unwrap_or_default();
        let name = match children.last() {
            Some(last) if last.kind() == "new" => "new".to_string(),
            Some(last) if last.kind() == "identifier" => self.text(*last).to_string(),
            _ => return Err(self.error_at(node, "a method name or `new`")),
        };
        Ok(ExprKind::MethodRef {
            target,
            type_args,
            name,
        })
    }
}
