//! Solidity declaration extractor using tree-sitter.

use std::collections::HashMap;
use tree_sitter::{LanguageError, Node, Parser};

use super::helpers::{
    find_child_by_type, find_child_by_types, first_error, get_end_line, get_node_text,
    get_start_line, hash_normalized, normalized_text,
};
use crate::error::ParseFailure;
use crate::types::{Ambiguity, DeclId, DeclKind, Declaration, DeclarationTree, Span};

const BODY_KINDS: &[&str] = &["contract_body", "function_body", "struct_body", "enum_body"];

/// A parser loaded with the Solidity grammar.
///
/// Fails when the grammar's ABI version is outside what the tree-sitter runtime accepts.
pub fn new_parser() -> Result<Parser, LanguageError> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_solidity::LANGUAGE.into())?;
    Ok(parser)
}

/// Parse Solidity source into a declaration tree.
pub fn parse(source: &str, file_path: &str) -> Result<DeclarationTree, ParseFailure> {
    let mut parser = new_parser().map_err(|e| {
        ParseFailure::new(file_path, 1, 1, format!("Failed to set Solidity language: {}", e))
    })?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseFailure::new(file_path, 1, 1, "Failed to parse Solidity source"))?;
    let root = tree.root_node();

    if root.has_error() {
        let node = first_error(&root).unwrap_or(root);
        return Err(failure_at(&node, source, file_path));
    }

    let mut decls = DeclarationTree::new();
    let mut scope = ScopeNames::new(None);

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if let Some(id) = extract_declaration(&child, source, &mut decls) {
            scope.check(id, &mut decls);
            decls.push_root(id);
        }
    }

    Ok(decls)
}

/// Extract one declaration node, recursing into container bodies.
fn extract_declaration(node: &Node, source: &str, decls: &mut DeclarationTree) -> Option<DeclId> {
    match node.kind() {
        "contract_declaration" => extract_container(node, source, DeclKind::Contract, decls),
        "interface_declaration" => extract_container(node, source, DeclKind::Interface, decls),
        "library_declaration" => extract_container(node, source, DeclKind::Library, decls),
        "struct_declaration" => extract_whole(node, source, DeclKind::Struct, decls),
        "enum_declaration" => extract_whole(node, source, DeclKind::Enum, decls),
        "event_definition" => extract_whole(node, source, DeclKind::Event, decls),
        "function_definition" => {
            let name = declared_name(node, source)?;
            Some(extract_callable(node, source, DeclKind::Function, name, decls))
        }
        "modifier_definition" => {
            let name = declared_name(node, source)?;
            Some(extract_callable(node, source, DeclKind::Modifier, name, decls))
        }
        "constructor_definition" => Some(extract_callable(
            node,
            source,
            DeclKind::Function,
            "constructor".to_string(),
            decls,
        )),
        "fallback_receive_definition" => {
            let name = special_function_name(node);
            Some(extract_callable(node, source, DeclKind::Function, name, decls))
        }
        _ => None,
    }
}

/// Contracts, interfaces and libraries. Member declarations become children; every
/// other body item (state variables, errors, using directives) feeds the body hash.
fn extract_container(
    node: &Node,
    source: &str,
    kind: DeclKind,
    decls: &mut DeclarationTree,
) -> Option<DeclId> {
    let name = declared_name(node, source)?;
    let body = body_of(node);

    let mut members = Vec::new();
    let mut body_items = Vec::new();
    let mut scope = ScopeNames::new(Some(name.clone()));

    if let Some(body) = &body {
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            match extract_declaration(&child, source, decls) {
                Some(id) => {
                    scope.check(id, decls);
                    members.push(id);
                }
                None => {
                    if child.is_named() && child.kind() != "comment" {
                        body_items.push(normalized_text(&child, source, None));
                    }
                }
            }
        }
    }

    let signature = normalized_text(node, source, body.as_ref());
    let body_hash = hash_normalized(&body_items.join(" "));

    Some(decls.alloc(Declaration {
        kind,
        name,
        signature,
        body_hash: Some(body_hash),
        span: span_of(node),
        members,
    }))
}

/// Functions and modifiers: header forms the signature, the body is hashed apart.
fn extract_callable(
    node: &Node,
    source: &str,
    kind: DeclKind,
    name: String,
    decls: &mut DeclarationTree,
) -> DeclId {
    let body = body_of(node);
    let signature = normalized_text(node, source, body.as_ref());
    let body_hash = body
        .as_ref()
        .map(|b| hash_normalized(&normalized_text(b, source, None)));

    decls.alloc(Declaration {
        kind,
        name,
        signature,
        body_hash,
        span: span_of(node),
        members: Vec::new(),
    })
}

/// Structs, enums and events: the full declaration is the signature.
fn extract_whole(
    node: &Node,
    source: &str,
    kind: DeclKind,
    decls: &mut DeclarationTree,
) -> Option<DeclId> {
    let name = declared_name(node, source)?;
    Some(decls.alloc(Declaration {
        kind,
        name,
        signature: normalized_text(node, source, None),
        body_hash: None,
        span: span_of(node),
        members: Vec::new(),
    }))
}

fn declared_name(node: &Node, source: &str) -> Option<String> {
    let ident = node
        .child_by_field_name("name")
        .or_else(|| find_child_by_type(node, "identifier"))?;
    let name = get_node_text(&ident, source).trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn special_function_name(node: &Node) -> String {
    let mut cursor = node.walk();
    let is_receive = node.children(&mut cursor).any(|c| c.kind() == "receive");
    if is_receive {
        "receive".to_string()
    } else {
        "fallback".to_string()
    }
}

fn body_of<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    node.child_by_field_name("body")
        .filter(|b| BODY_KINDS.contains(&b.kind()))
        .or_else(|| find_child_by_types(node, BODY_KINDS))
}

fn span_of(node: &Node) -> Span {
    Span {
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        start_line: get_start_line(node),
        end_line: get_end_line(node),
    }
}

fn failure_at(node: &Node, source: &str, file_path: &str) -> ParseFailure {
    let position = node.start_position();
    let message = if node.is_missing() {
        format!("missing {}", node.kind())
    } else {
        let snippet: String = get_node_text(node, source)
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(40)
            .collect();
        if snippet.trim().is_empty() {
            "syntax error".to_string()
        } else {
            format!("syntax error near '{}'", snippet.trim())
        }
    };

    ParseFailure::new(
        file_path,
        position.row as u32 + 1,
        position.column as u32 + 1,
        message,
    )
}

/// Tracks (kind, name) identities within one sibling scope.
struct ScopeNames {
    scope: Option<String>,
    seen: HashMap<(DeclKind, String), u32>,
}

impl ScopeNames {
    fn new(scope: Option<String>) -> Self {
        Self {
            scope,
            seen: HashMap::new(),
        }
    }

    fn check(&mut self, id: DeclId, decls: &mut DeclarationTree) {
        let decl = decls.get(id);
        let key = (decl.kind, decl.name.clone());
        let line = decl.span.start_line;

        match self.seen.get(&key) {
            Some(&first_line) => {
                tracing::warn!(
                    "Duplicate {} '{}' in {} (lines {} and {}), matching by position",
                    key.0.as_str(),
                    key.1,
                    self.scope.as_deref().unwrap_or("file scope"),
                    first_line,
                    line
                );
                decls.record_ambiguity(Ambiguity {
                    kind: key.0,
                    name: key.1,
                    scope: self.scope.clone(),
                    first_line,
                    duplicate_line: line,
                });
            }
            None => {
                self.seen.insert(key, line);
            }
        }
    }
}
