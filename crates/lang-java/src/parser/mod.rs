use crate::ast::{CompilationUnit, Import};
use crate::error::{ParserError, Result, SyntaxError};
use jinspect_api::models::Range;
use std::sync::Arc;
use tracing::debug;
use tree_sitter::{Node, Query, QueryCursor, StreamingIterator, Tree};

mod decl;
mod errors;
mod expr;
mod literal;
mod stmt;
mod types;

const HEADER_QUERY: &str = r#"
(package_declaration [(identifier) (scoped_identifier)] @package)
(import_declaration) @import
"#;

/// Capture indices of [`HEADER_QUERY`].
#[derive(Debug, Clone, Copy)]
struct HeaderIndices {
    package: u32,
    import: u32,
}

impl HeaderIndices {
    fn new(query: &Query) -> std::result::Result<Self, ParserError> {
        let idx = |name: &'static str| {
            query
                .capture_index_for_name(name)
                .ok_or(ParserError::MissingCapture(name))
        };
        Ok(Self {
            package: idx("package")?,
            import: idx("import")?,
        })
    }
}

/// Grammar-driven Java front end.
///
/// Holds the compiled grammar and header query; a fresh tree-sitter parser is
/// created per unit so one `JavaParser` can be shared across worker threads.
pub struct JavaParser {
    language: tree_sitter::Language,
    header_query: Arc<Query>,
    indices: HeaderIndices,
}

impl Clone for JavaParser {
    fn clone(&self) -> Self {
        Self {
            language: self.language.clone(),
            header_query: Arc::clone(&self.header_query),
            indices: self.indices,
        }
    }
}

impl JavaParser {
    pub fn new() -> std::result::Result<Self, ParserError> {
        let language: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();
        // Fails early on an ABI mismatch instead of on the first unit.
        tree_sitter::Parser::new().set_language(&language)?;
        let header_query = Query::new(&language, HEADER_QUERY)?;
        let indices = HeaderIndices::new(&header_query)?;
        Ok(Self {
            language,
            header_query: Arc::new(header_query),
            indices,
        })
    }

    /// Parses one compilation unit. `unit` names it in positions and errors.
    pub fn parse(&self, unit: impl Into<Arc<str>>, source: &str) -> Result<CompilationUnit> {
        let unit = unit.into();
        let mut parser = tree_sitter::Parser::new();
        let tree = parser
            .set_language(&self.language)
            .ok()
            .and_then(|_| parser.parse(source, None))
            .ok_or_else(|| SyntaxError {
                unit: unit.clone(),
                line: 1,
                column: 1,
                expected: "a compilation unit".into(),
                found: "input the parser could not process".into(),
            })?;

        let root = tree.root_node();
        if root.has_error() {
            if let Some(err) = errors::first_syntax_error(root, source, &unit) {
                debug!(unit = %unit, line = err.line, column = err.column, "syntax error");
                return Err(err);
            }
        }

        let (package, imports) = self.extract_package_and_imports(&tree, source);
        let lower = Lower {
            src: source,
            unit: unit.clone(),
        };
        let types = lower.top_level_types(root)?;
        let module = lower.module_decl(root)?;
        debug!(unit = %unit, types = types.len(), module = module.is_some(), "parsed compilation unit");
        Ok(CompilationUnit {
            unit,
            package,
            imports,
            types,
            module,
        })
    }

    pub fn extract_package_and_imports(
        &self,
        tree: &Tree,
        source: &str,
    ) -> (Option<String>, Vec<Import>) {
        let mut package = None;
        let mut imports = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.header_query, tree.root_node(), source.as_bytes());
        while let Some(mat) = matches.next() {
            for cap in mat.captures {
                if cap.index == self.indices.package {
                    package = cap
                        .node
                        .utf8_text(source.as_bytes())
                        .ok()
                        .map(strip_whitespace);
                } else if cap.index == self.indices.import {
                    if let Some(import) = import_declaration(cap.node, source) {
                        imports.push(import);
                    }
                }
            }
        }
        (package, imports)
    }
}

fn import_declaration(node: Node, source: &str) -> Option<Import> {
    let mut name = None;
    let mut is_static = false;
    let mut on_demand = false;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "static" => is_static = true,
            "asterisk" | "*" => on_demand = true,
            "identifier" | "scoped_identifier" => {
                name = child.utf8_text(source.as_bytes()).ok().map(strip_whitespace);
            }
            _ => {}
        }
    }
    Some(Import {
        name: name?,
        is_static,
        on_demand,
        range: range_of(node),
    })
}

/// Qualified names may be split over lines or carry comments between dots.
fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

pub(crate) fn range_of(node: Node) -> Range {
    let start = node.start_position();
    let end = node.end_position();
    Range::new(start.row, start.column, end.row, end.column)
}

/// Lowers a checked tree into the owned syntax tree of [`crate::ast`].
pub(crate) struct Lower<'s> {
    pub(crate) src: &'s str,
    pub(crate) unit: Arc<str>,
}

impl<'s> Lower<'s> {
    pub(crate) fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.src.as_bytes()).unwrap_or_default()
    }

    /// Named children minus comments.
    pub(crate) fn named<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .filter(|c| !c.is_extra())
            .collect()
    }

    pub(crate) fn child_of_kind<'t>(&self, node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        let mut cursor = node.walk();
        node.children(&mut cursor).find(|c| c.kind() == kind)
    }

    pub(crate) fn field<'t>(&self, node: Node<'t>, name: &str) -> Vec<Node<'t>> {
        let mut cursor = node.walk();
        node.children_by_field_name(name, &mut cursor).collect()
    }

    pub(crate) fn error_at(&self, node: Node, expected: &str) -> SyntaxError {
        let pos = node.start_position();
        SyntaxError {
            unit: self.unit.clone(),
            line: pos.row + 1,
            column: pos.column + 1,
            expected: expected.to_string(),
            found: errors::excerpt(self.text(node)),
        }
    }

    /// A required field; its absence means the tree is not what the grammar promises.
    pub(crate) fn required<'t>(&self, node: Node<'t>, name: &str) -> Result<Node<'t>> {
        node.child_by_field_name(name)
            .ok_or_else(|| self.error_at(node, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_collects_package_and_import_forms() {
        let parser = JavaParser::new().unwrap();
        let unit = parser
            .parse(
                "A.java",
                "package com.example;\nimport java.util.List;\nimport java.util.*;\nimport static java.lang.Math.max;\nimport static java.util.Collections.*;\nclass A {}\n",
            )
            .unwrap();
        assert_eq!(unit.package.as_deref(), Some("com.example"));
        let forms: Vec<_> = unit
            .imports
            .iter()
            .map(|i| (i.name.as_str(), i.is_static, i.on_demand))
            .collect();
        assert_eq!(
            forms,
            vec![
                ("java.util.List", false, false),
                ("java.util", false, true),
                ("java.lang.Math.max", true, false),
                ("java.util.Collections", true, true),
            ]
        );
    }

    #[test]
    fn default_package_has_no_name() {
        let parser = JavaParser::new().unwrap();
        let unit = parser.parse("A.java", "class A {}").unwrap();
        assert!(unit.package.is_none());
        assert_eq!(unit.types.len(), 1);
    }
}
