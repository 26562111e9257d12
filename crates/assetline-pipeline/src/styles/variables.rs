//! `$variable` definitions and substitution.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::StyleError;
use super::tree::{self, Node};

/// `$name` or `$(name)`.
static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\(([A-Za-z_][\w-]*)\)|\$([A-Za-z_][\w-]*)").expect("valid regex")
});

pub(crate) fn run(css: &str) -> Result<String, StyleError> {
    let mut scopes = vec![HashMap::new()];
    let nodes = substitute_block(tree::parse(css)?, &mut scopes)?;
    Ok(tree::print(&nodes))
}

type Scopes = Vec<HashMap<String, String>>;

fn substitute_block(nodes: Vec<Node>, scopes: &mut Scopes) -> Result<Vec<Node>, StyleError> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Decl { property, value } => {
                let value = substitute(&value, scopes)?;
                if let Some(name) = property.strip_prefix('$') {
                    if let Some(scope) = scopes.last_mut() {
                        scope.insert(name.to_owned(), value);
                    }
                    continue;
                }
                out.push(Node::Decl {
                    property: substitute(&property, scopes)?,
                    value,
                });
            }
            Node::Rule { selector, children } => {
                let selector = substitute(&selector, scopes)?;
                scopes.push(HashMap::new());
                let children = substitute_block(children, scopes);
                scopes.pop();
                out.push(Node::Rule {
                    selector,
                    children: children?,
                });
            }
            Node::AtRule { ref name, .. } if name == "define-mixin" => out.push(node),
            Node::AtRule {
                name,
                prelude,
                block,
            } => {
                let prelude = substitute(&prelude, scopes)?;
                let block = match block {
                    Some(children) => {
                        scopes.push(HashMap::new());
                        let children = substitute_block(children, scopes);
                        scopes.pop();
                        Some(children?)
                    }
                    None => None,
                };
                out.push(Node::AtRule {
                    name,
                    prelude,
                    block,
                });
            }
            Node::Comment(_) => out.push(node),
        }
    }
    Ok(out)
}

/// Replace every variable reference in `text` with its innermost definition.
fn substitute(text: &str, scopes: &Scopes) -> Result<String, StyleError> {
    if !text.contains('$') {
        return Ok(text.to_owned());
    }

    let mut missing = None;
    let replaced = VARIABLE.replace_all(text, |caps: &Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        if let Some(value) = scopes.iter().rev().find_map(|scope| scope.get(name)) {
            value.clone()
        } else {
            missing.get_or_insert_with(|| name.to_owned());
            caps[0].to_owned()
        }
    });

    match missing {
        Some(name) => Err(StyleError::UndefinedVariable(name)),
        None => Ok(replaced.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_substitutes_values_selectors_and_preludes() {
        let out = run(
            "$brand: #0af;\n$bp: 640px;\n$name: card;\n.$(name) { color: $brand; }\n@media (min-width: $bp) { a { b: c; } }",
        )
        .unwrap();

        assert_eq!(
            out,
            ".card {\n  color: #0af;\n}\n\n@media (min-width: 640px) {\n  a {\n    b: c;\n  }\n}\n"
        );
    }

    #[test]
    fn test_later_definition_wins() {
        let out = run("$c: red;\n$c: blue;\na { color: $c; }").unwrap();

        assert!(out.contains("color: blue;"));
    }

    #[test]
    fn test_block_scope() {
        let out = run("$c: red;\na { $c: blue; color: $c; }\nb { color: $c; }").unwrap();

        assert!(out.contains("a {\n  color: blue;"));
        assert!(out.contains("b {\n  color: red;"));
    }

    #[test]
    fn test_variable_defined_from_variable() {
        let out = run("$base: 4px;\n$gap: $base;\na { gap: $gap; }").unwrap();

        assert!(out.contains("gap: 4px;"));
    }

    #[test]
    fn test_undefined_variable_is_error() {
        let err = run("a { color: $missing; }").unwrap_err();

        assert_eq!(err.to_string(), "undefined variable $missing");
    }

    #[test]
    fn test_define_mixin_body_left_alone() {
        let source = "@define-mixin m $x {\n  color: $x;\n}\n";

        assert_eq!(run(source).unwrap(), source);
    }
}
