use crate::error::SyntaxError;
use std::sync::Arc;
use tree_sitter::Node;

const EXCERPT_LEN: usize = 24;

/// Finds the first ERROR or MISSING node in document order.
pub(crate) fn first_syntax_error(root: Node, source: &str, unit: &Arc<str>) -> Option<SyntaxError> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_missing() {
            let pos = node.start_position();
            return Some(SyntaxError {
                unit: unit.clone(),
                line: pos.row + 1,
                column: pos.column + 1,
                expected: format!("`{}`", node.kind()),
                found: following_token(node, source),
            });
        }
        if node.is_error() {
            let pos = node.start_position();
            let expected = node
                .parent()
                .map(|p| describe(p.kind()))
                .unwrap_or_else(|| describe("program"));
            return Some(SyntaxError {
                unit: unit.clone(),
                line: pos.row + 1,
                column: pos.column + 1,
                expected,
                found: excerpt(node.utf8_text(source.as_bytes()).unwrap_or_default()),
            });
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn following_token(node: Node, source: &str) -> String {
    let mut next = node.next_sibling();
    while let Some(n) = next {
        if n.end_byte() > n.start_byte() {
            let text = n.utf8_text(source.as_bytes()).unwrap_or_default();
            return excerpt(text);
        }
        next = n.next_sibling();
    }
    "end of input".to_string()
}

/// First line of `text`, shortened.
pub(crate) fn excerpt(text: &str) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return "end of input".to_string();
    }
    let mut out: String = line.chars().take(EXCERPT_LEN).collect();
    if line.chars().count() > EXCERPT_LEN {
        out.push_str("...");
    }
    format!("`{out}`")
}

fn describe(context: &str) -> String {
    match context {
        "program" => "a package, import or type declaration".into(),
        "class_body" | "interface_body" | "enum_body" | "enum_body_declarations" => {
            "a member declaration".into()
        }
        "block" | "constructor_body" | "switch_block_statement_group" => "a statement".into(),
        "formal_parameters" => "a parameter declaration".into(),
        "argument_list" => "an argument expression".into(),
        "type_arguments" | "type_parameters" => "a type".into(),
        other => format!("valid `{}` syntax", other.replace('_', " ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_quotes_and_shortens() {
        assert_eq!(excerpt("int x"), "`int x`");
        assert_eq!(excerpt(""), "end of input");
        assert!(excerpt("abcdefghijklmnopqrstuvwxyz0123").ends_with("...`"));
    }
}
