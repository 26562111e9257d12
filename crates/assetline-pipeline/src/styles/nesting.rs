//! Nested rule flattening.
//!
//! Rules nested inside rules are hoisted to the top level with their
//! selectors resolved against the parent: `&` is replaced by the parent
//! selector, otherwise the child becomes a descendant. Conditional group
//! rules (`@media`, `@supports`, ...) bubble out of the rule and wrap a copy
//! of the parent selector.
//!
//! Other at-rules inside a rule (such as `@mixin` calls) stay where they are.
//! Top-level `@define-mixin` bodies are left untouched for the mixin pass.

use super::StyleError;
use super::tree::{self, Node, split_top_level};

/// At-rules that bubble out of a rule.
const BUBBLE: &[&str] = &["media", "supports", "container", "layer", "document"];

pub(crate) fn run(css: &str) -> Result<String, StyleError> {
    Ok(tree::print(&flatten(tree::parse(css)?)))
}

/// Flatten a node list whose parent context is the stylesheet itself.
pub(crate) fn flatten(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Rule { selector, children } => flatten_rule(&selector, children, &mut out),
            Node::AtRule {
                name,
                prelude,
                block: Some(children),
            } if bubbles(&name) => out.push(Node::AtRule {
                name,
                prelude,
                block: Some(flatten(children)),
            }),
            other => out.push(other),
        }
    }
    out
}

fn bubbles(name: &str) -> bool {
    BUBBLE.iter().any(|b| name.eq_ignore_ascii_case(b))
}

/// Emit `selector { own declarations }` followed by every hoisted child.
fn flatten_rule(selector: &str, children: Vec<Node>, out: &mut Vec<Node>) {
    let mut own = Vec::new();
    let mut hoisted = Vec::new();

    for child in children {
        match child {
            Node::Rule {
                selector: nested,
                children,
            } => flatten_rule(&resolve_selector(selector, &nested), children, &mut hoisted),
            Node::AtRule {
                name,
                prelude,
                block: Some(inner),
            } if bubbles(&name) => {
                let mut wrapped = Vec::new();
                flatten_rule(selector, inner, &mut wrapped);
                hoisted.push(Node::AtRule {
                    name,
                    prelude,
                    block: Some(wrapped),
                });
            }
            other => own.push(other),
        }
    }

    if !own.is_empty() {
        out.push(Node::rule(selector, own));
    }
    out.extend(hoisted);
}

/// Resolve a nested selector list against its parent selector list.
///
/// Both lists expand as a cross-product.
pub(crate) fn resolve_selector(parent: &str, nested: &str) -> String {
    let parents = split_top_level(parent, ',');
    let mut resolved = Vec::new();
    for child in split_top_level(nested, ',') {
        for p in &parents {
            if child.contains('&') {
                resolved.push(child.replace('&', p));
            } else {
                resolved.push(format!("{p} {child}"));
            }
        }
    }
    resolved.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_selector() {
        assert_eq!(resolve_selector(".a", "&:hover"), ".a:hover");
        assert_eq!(resolve_selector(".a", ".b"), ".a .b");
        assert_eq!(resolve_selector(".a", "& + &"), ".a + .a");
        assert_eq!(resolve_selector(".a, .b", "&-x, .y"), ".a-x, .b-x, .a .y, .b .y");
    }

    #[test]
    fn test_flatten_nested_rules() {
        let out = run(".card { padding: 1rem; &:hover { color: red; } .title { margin: 0; } }")
            .unwrap();

        assert_eq!(
            out,
            ".card {\n  padding: 1rem;\n}\n\n.card:hover {\n  color: red;\n}\n\n.card .title {\n  margin: 0;\n}\n"
        );
    }

    #[test]
    fn test_media_bubbles_with_parent_selector() {
        let out = run(".a { color: red; @media (min-width: 640px) { color: blue; & b { x: y; } } }")
            .unwrap();

        assert_eq!(
            out,
            ".a {\n  color: red;\n}\n\n@media (min-width: 640px) {\n  .a {\n    color: blue;\n  }\n  .a b {\n    x: y;\n  }\n}\n"
        );
    }

    #[test]
    fn test_deep_nesting() {
        let out = run("a { b { c { d: e; } } }").unwrap();

        assert_eq!(out, "a b c {\n  d: e;\n}\n");
    }

    #[test]
    fn test_define_mixin_and_mixin_calls_untouched() {
        let source = "@define-mixin btn $c {\n  &:hover {\n    color: $c;\n  }\n}\n\n.x {\n  @mixin btn red;\n}\n";

        assert_eq!(run(source).unwrap(), source);
    }
}
