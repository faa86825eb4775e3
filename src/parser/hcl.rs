//! Shared tree-sitter helpers for HCL documents

use std::path::Path;

use tracing::warn;

use crate::parser::traits::ParseError;

/// Parse HCL content into a syntax tree
pub(crate) fn parse_tree(content: &str, file: &Path) -> Result<tree_sitter::Tree, ParseError> {
    let mut parser = tree_sitter::Parser::new();
    let language = tree_sitter_hcl::LANGUAGE;
    parser.set_language(&language.into()).map_err(|e| {
        warn!("Failed to set HCL language for tree-sitter: {}", e);
        ParseError::TreeSitter(e.to_string())
    })?;

    let tree = parser.parse(content, None).ok_or_else(|| {
        warn!("Failed to parse HCL content of {:?}", file);
        ParseError::ParseFailed {
            path: file.to_path_buf(),
            message: "Failed to parse HCL".to_string(),
        }
    })?;

    if tree.root_node().has_error() {
        // Partially invalid files still yield the blocks that parsed cleanly
        warn!("Syntax errors in {:?}; reading recoverable blocks only", file);
    }

    Ok(tree)
}

/// Blocks declared directly in the document body
pub(crate) fn top_level_blocks(root: tree_sitter::Node) -> Vec<tree_sitter::Node> {
    let mut blocks = Vec::new();
    let mut cursor = root.walk();

    for child in root.children(&mut cursor) {
        if child.kind() == "body" {
            let mut body_cursor = child.walk();
            blocks.extend(
                child
                    .children(&mut body_cursor)
                    .filter(|node| node.kind() == "block"),
            );
        }
    }

    blocks
}

/// Type identifier of a block (`module`, `terraform`, ...)
pub(crate) fn block_type<'a>(block: tree_sitter::Node, content: &'a str) -> Option<&'a str> {
    let first = block.child(0)?;
    (first.kind() == "identifier").then(|| &content[first.byte_range()])
}

/// Labels following the block type, unquoted
pub(crate) fn block_labels(block: tree_sitter::Node, content: &str) -> Vec<String> {
    let mut labels = Vec::new();
    let mut cursor = block.walk();

    for child in block.children(&mut cursor).skip(1) {
        match child.kind() {
            "string_lit" => labels.push(unquote(&content[child.byte_range()])),
            "identifier" => labels.push(content[child.byte_range()].to_string()),
            "block_start" => break,
            _ => {}
        }
    }

    labels
}

/// Attributes of a block body as `(key, expression)` pairs
pub(crate) fn block_attributes<'a, 'tree>(
    block: tree_sitter::Node<'tree>,
    content: &'a str,
) -> Vec<(&'a str, tree_sitter::Node<'tree>)> {
    let mut attributes = Vec::new();
    let mut cursor = block.walk();

    let Some(body) = block
        .children(&mut cursor)
        .find(|node| node.kind() == "body")
    else {
        return attributes;
    };

    let mut body_cursor = body.walk();
    for attribute in body
        .children(&mut body_cursor)
        .filter(|node| node.kind() == "attribute")
    {
        let mut attr_cursor = attribute.walk();
        let mut key: Option<&str> = None;
        let mut expression: Option<tree_sitter::Node> = None;

        for child in attribute.children(&mut attr_cursor) {
            match child.kind() {
                "identifier" if key.is_none() => key = Some(&content[child.byte_range()]),
                "expression" => expression = Some(child),
                _ => {}
            }
        }

        if let (Some(key), Some(expression)) = (key, expression) {
            attributes.push((key, expression));
        }
    }

    attributes
}

/// Value of an expression that is exactly one string literal without interpolation
pub(crate) fn string_literal(expression: tree_sitter::Node, content: &str) -> Option<String> {
    let literal = find_descendant(expression, "string_lit")?;
    let expression_text = content[expression.byte_range()].trim();
    let literal_text = &content[literal.byte_range()];

    (expression_text == literal_text).then(|| unquote(literal_text))
}

fn find_descendant<'tree>(
    node: tree_sitter::Node<'tree>,
    kind: &str,
) -> Option<tree_sitter::Node<'tree>> {
    if node.kind() == kind {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(|child| find_descendant(child, kind))
}

/// Strip surrounding quotes and resolve the simple escapes HCL allows in literals
fn unquote(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(text);

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}
