//! `@define-mixin` / `@mixin` expansion.
//!
//! ```css
//! @define-mixin button $bg, $fg: white {
//!   background: $bg;
//!   color: $fg;
//!   &:hover { @mixin-content; }
//! }
//!
//! .cta { @mixin button #0af { opacity: 0.9; } }
//! ```
//!
//! Expanded bodies go through `resolve()` evaluation and rule flattening
//! again, since they may contain both.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::StyleError;
use super::tree::{self, Node, split_top_level};
use super::{math, nesting};

/// Nested expansion limit; deeper chains are reported as recursion.
const MAX_DEPTH: usize = 32;

static PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\(([A-Za-z_][\w-]*)\)|\$([A-Za-z_][\w-]*)").expect("valid regex")
});

#[derive(Debug)]
struct Mixin {
    params: Vec<(String, Option<String>)>,
    body: Vec<Node>,
}

pub(crate) fn run(css: &str) -> Result<String, StyleError> {
    let mut mixins = HashMap::new();
    let mut rest = Vec::new();
    for node in tree::parse(css)? {
        match node {
            Node::AtRule {
                name,
                prelude,
                block,
            } if name == "define-mixin" => {
                let (mixin_name, mixin) = define(&prelude, block.unwrap_or_default())?;
                mixins.insert(mixin_name, mixin);
            }
            other => rest.push(other),
        }
    }

    let mut expanded = expand_nodes(rest, &mixins, None, 0)?;
    math::resolve_nodes(&mut expanded)?;
    Ok(tree::print(&nesting::flatten(expanded)))
}

/// Parse `name $a, $b: default` into a mixin definition.
fn define(prelude: &str, body: Vec<Node>) -> Result<(String, Mixin), StyleError> {
    let (name, params) = prelude
        .split_once(char::is_whitespace)
        .unwrap_or((prelude, ""));
    if name.is_empty() {
        return Err(StyleError::Mixin {
            name: String::new(),
            message: "missing mixin name".to_owned(),
        });
    }

    let mut parsed = Vec::new();
    for param in split_top_level(params, ',') {
        let (param_name, default) = match param.split_once(':') {
            Some((n, d)) => (n.trim(), Some(d.trim().to_owned())),
            None => (param.as_str(), None),
        };
        let Some(param_name) = param_name.strip_prefix('$') else {
            return Err(StyleError::Mixin {
                name: name.to_owned(),
                message: format!("parameter `{param_name}` must start with `$`"),
            });
        };
        parsed.push((param_name.to_owned(), default));
    }

    Ok((
        name.to_owned(),
        Mixin {
            params: parsed,
            body,
        },
    ))
}

fn expand_nodes(
    nodes: Vec<Node>,
    mixins: &HashMap<String, Mixin>,
    content: Option<&[Node]>,
    depth: usize,
) -> Result<Vec<Node>, StyleError> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::AtRule {
                name,
                prelude,
                block,
            } if name == "mixin" => {
                let expanded = call(&prelude, block, mixins, depth)?;
                out.extend(expanded);
            }
            Node::AtRule { name, .. } if name == "mixin-content" => {
                if let Some(content) = content {
                    out.extend(content.iter().cloned());
                }
            }
            Node::Rule { selector, children } => out.push(Node::Rule {
                selector,
                children: expand_nodes(children, mixins, content, depth)?,
            }),
            Node::AtRule {
                name,
                prelude,
                block: Some(children),
            } => out.push(Node::AtRule {
                name,
                prelude,
                block: Some(expand_nodes(children, mixins, content, depth)?),
            }),
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Expand one `@mixin name args` call.
fn call(
    prelude: &str,
    block: Option<Vec<Node>>,
    mixins: &HashMap<String, Mixin>,
    depth: usize,
) -> Result<Vec<Node>, StyleError> {
    let (name, args) = prelude
        .split_once(char::is_whitespace)
        .unwrap_or((prelude, ""));
    let mixin = mixins
        .get(name)
        .ok_or_else(|| StyleError::UnknownMixin(name.to_owned()))?;
    if depth >= MAX_DEPTH {
        return Err(StyleError::Mixin {
            name: name.to_owned(),
            message: "expansion nested too deeply".to_owned(),
        });
    }

    let args = split_top_level(args, ',');
    if args.len() > mixin.params.len() {
        return Err(StyleError::Mixin {
            name: name.to_owned(),
            message: format!(
                "expects at most {} arguments, got {}",
                mixin.params.len(),
                args.len()
            ),
        });
    }

    let mut bindings = HashMap::new();
    for (i, (param, default)) in mixin.params.iter().enumerate() {
        let value = args
            .get(i)
            .cloned()
            .or_else(|| default.clone())
            .ok_or_else(|| StyleError::Mixin {
                name: name.to_owned(),
                message: format!("missing argument ${param}"),
            })?;
        bindings.insert(param.as_str(), value);
    }

    let body: Vec<Node> = mixin
        .body
        .iter()
        .map(|node| bind(node, &bindings))
        .collect();
    let content = match block {
        Some(children) => Some(expand_nodes(children, mixins, None, depth + 1)?),
        None => None,
    };
    expand_nodes(body, mixins, content.as_deref(), depth + 1)
}

/// Copy of `node` with mixin parameters substituted.
fn bind(node: &Node, bindings: &HashMap<&str, String>) -> Node {
    let sub = |text: &str| {
        PARAM
            .replace_all(text, |caps: &Captures<'_>| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map_or("", |m| m.as_str());
                bindings
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_owned())
            })
            .into_owned()
    };

    match node {
        Node::Decl { property, value } => Node::decl(sub(property), sub(value)),
        Node::Rule { selector, children } => Node::rule(
            sub(selector),
            children.iter().map(|c| bind(c, bindings)).collect(),
        ),
        Node::AtRule {
            name,
            prelude,
            block,
        } => Node::AtRule {
            name: name.clone(),
            prelude: sub(prelude),
            block: block
                .as_ref()
                .map(|children| children.iter().map(|c| bind(c, bindings)).collect()),
        },
        Node::Comment(text) => Node::Comment(text.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expand_with_arguments_and_defaults() {
        let out = run(
            "@define-mixin button $bg, $fg: white {\n  background: $bg;\n  color: $fg;\n}\n.cta {\n  @mixin button #0af;\n  margin: 0;\n}",
        )
        .unwrap();

        assert_eq!(
            out,
            ".cta {\n  background: #0af;\n  color: white;\n  margin: 0;\n}\n"
        );
    }

    #[test]
    fn test_nested_rules_in_mixin_are_flattened() {
        let out = run(
            "@define-mixin hover $c {\n  &:hover {\n    color: $c;\n  }\n}\na {\n  @mixin hover red;\n}",
        )
        .unwrap();

        assert_eq!(out, "a:hover {\n  color: red;\n}\n");
    }

    #[test]
    fn test_mixin_content_receives_block() {
        let out = run(
            "@define-mixin desktop {\n  @media (min-width: 1024px) {\n    @mixin-content;\n  }\n}\n.nav {\n  @mixin desktop {\n    display: flex;\n  }\n}",
        )
        .unwrap();

        assert_eq!(
            out,
            "@media (min-width: 1024px) {\n  .nav {\n    display: flex;\n  }\n}\n"
        );
    }

    #[test]
    fn test_math_after_substitution() {
        let out = run(
            "@define-mixin gap $n {\n  gap: resolve($n * 4px);\n}\na {\n  @mixin gap 3;\n}",
        )
        .unwrap();

        assert!(out.contains("gap: 12px;"));
    }

    #[test]
    fn test_mixin_calling_mixin() {
        let out = run(
            "@define-mixin inner $v {\n  x: $v;\n}\n@define-mixin outer $v {\n  @mixin inner $v;\n  y: 1;\n}\na {\n  @mixin outer 2;\n}",
        )
        .unwrap();

        assert_eq!(out, "a {\n  x: 2;\n  y: 1;\n}\n");
    }

    #[test]
    fn test_unknown_mixin_is_error() {
        let err = run("a { @mixin nope; }").unwrap_err();

        assert!(matches!(err, StyleError::UnknownMixin(ref name) if name == "nope"));
    }

    #[test]
    fn test_missing_argument_is_error() {
        let err = run("@define-mixin m $a { x: $a; }\na { @mixin m; }").unwrap_err();

        assert!(err.to_string().contains("missing argument $a"));
    }

    #[test]
    fn test_recursive_mixin_is_error() {
        let err = run("@define-mixin loop { @mixin loop; }\na { @mixin loop; }").unwrap_err();

        assert!(err.to_string().contains("nested too deeply"));
    }
}
