//! Helper functions for tree-sitter AST navigation and token normalization.

use tree_sitter::{Node, TreeCursor};
use xxhash_rust::xxh3::xxh3_64;

/// Node kinds whose text is kept as one token even when the grammar gives them children.
const ATOMIC_KINDS: &[&str] = &[
    "string",
    "string_literal",
    "hex_string_literal",
    "unicode_string_literal",
];

/// Get the text content of a node.
pub fn get_node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    let start = node.start_byte();
    let end = node.end_byte();
    if start < source.len() && end <= source.len() && start < end {
        &source[start..end]
    } else {
        ""
    }
}

/// Find the first child of a specific type.
pub fn find_child_by_type<'a>(node: &Node<'a>, type_name: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == type_name);
    found
}

/// Find the first child whose type is one of `type_names`.
pub fn find_child_by_types<'a>(node: &Node<'a>, type_names: &[&str]) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .find(|c| type_names.contains(&c.kind()));
    found
}

/// Get line number (1-indexed) from a node.
pub fn get_start_line(node: &Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Get end line number (1-indexed) from a node.
pub fn get_end_line(node: &Node) -> u32 {
    node.end_position().row as u32 + 1
}

/// Push the leaf tokens under `node` in source order, skipping comments and the
/// subtree rooted at `skip`.
///
/// Walks with a cursor instead of recursing: left-associative expressions nest
/// as deep as they are long.
pub fn collect_tokens<'a>(node: &Node, source: &'a str, skip: Option<&Node>, out: &mut Vec<&'a str>) {
    let skip_id = skip.map(|s| s.id());
    let mut cursor = node.walk();

    loop {
        let current = cursor.node();
        let descend = if current.kind() == "comment" || Some(current.id()) == skip_id {
            false
        } else if current.child_count() == 0 || ATOMIC_KINDS.contains(&current.kind()) {
            let text = get_node_text(&current, source).trim();
            if !text.is_empty() {
                out.push(text);
            }
            false
        } else {
            true
        };

        if descend && cursor.goto_first_child() {
            continue;
        }
        if !advance(&mut cursor, node.id()) {
            return;
        }
    }
}

/// Move to the next node in pre-order that is not below the current one.
/// Returns false once the walk is back at `root_id`.
fn advance(cursor: &mut TreeCursor, root_id: usize) -> bool {
    loop {
        if cursor.node().id() == root_id {
            return false;
        }
        if cursor.goto_next_sibling() {
            return true;
        }
        if !cursor.goto_parent() {
            return false;
        }
    }
}

/// Tokens of `node` joined by single spaces. Layout and comments do not affect the result.
pub fn normalized_text(node: &Node, source: &str, skip: Option<&Node>) -> String {
    let mut tokens = Vec::new();
    collect_tokens(node, source, skip, &mut tokens);
    tokens.join(" ")
}

/// Hash of already normalized text.
pub fn hash_normalized(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// First ERROR or MISSING node in document order.
pub fn first_error<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    let mut cursor = node.walk();

    loop {
        let current = cursor.node();
        if current.is_error() || current.is_missing() {
            return Some(current);
        }
        if current.has_error() && cursor.goto_first_child() {
            continue;
        }
        if !advance(&mut cursor, node.id()) {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_solidity::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn test_normalized_text_ignores_layout_and_comments() {
        let a = "contract A { function f(uint a) public { return; } }";
        let b = "contract A {\n  // note\n  function f( uint a )\n    public /* x */ {\n    return;\n  }\n}";

        let ta = parse(a);
        let tb = parse(b);
        assert_eq!(
            normalized_text(&ta.root_node(), a, None),
            normalized_text(&tb.root_node(), b, None)
        );
    }

    #[test]
    fn test_string_literals_keep_inner_spacing() {
        let a = "contract A { string s = \"a b\"; }";
        let b = "contract A { string s = \"a  b\"; }";

        let ta = parse(a);
        let tb = parse(b);
        assert_ne!(
            normalized_text(&ta.root_node(), a, None),
            normalized_text(&tb.root_node(), b, None)
        );
    }

    #[test]
    fn test_first_error_none_for_valid_source() {
        let source = "contract A {}";
        let tree = parse(source);
        assert!(first_error(&tree.root_node()).is_none());
    }

    #[test]
    fn test_first_error_found_for_broken_source() {
        let source = "contract A {\n  function f( {\n}";
        let tree = parse(source);
        let node = first_error(&tree.root_node()).unwrap();
        assert!(get_start_line(&node) >= 1);
    }

    #[test]
    fn test_skip_excludes_subtree() {
        let source = "contract A { function f(uint a) public { return; } }";
        let tree = parse(source);
        let root = tree.root_node();
        let body = find_child_by_type(&root.child(0).unwrap(), "contract_body").unwrap();

        assert_eq!(normalized_text(&root, source, Some(&body)), "contract A");
    }

    #[test]
    fn test_first_error_skips_clean_siblings() {
        let source = "contract A {}\ncontract B { function g( }\n";
        let tree = parse(source);
        let node = first_error(&tree.root_node()).unwrap();
        assert_eq!(get_start_line(&node), 2);
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_normalized("a b"), hash_normalized("a b"));
        assert_ne!(hash_normalized("a b"), hash_normalized("a c"));
    }
}
