//! Utility-class generation.
//!
//! Class candidates are scanned from the content globs (templates and
//! scripts). Every candidate that names a known utility compiles to one rule;
//! unknown candidates are ignored. The generated rules replace
//! `@tailwind utilities;`. `@tailwind base`, `components` and `variants` are
//! accepted and produce nothing.
//!
//! A candidate is `variant:variant:utility`. Responsive variants (`sm`, `md`,
//! `lg`, `xl`, `2xl`) wrap the rule in a min-width media query; state
//! variants (`hover`, `focus`, `active`, `disabled`, ...) append a
//! pseudo-class. A leading `!` on the utility marks declarations
//! `!important`.
//!
//! `@apply utility ...;` inside a rule inlines the declarations of
//! variant-free utilities.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::StyleError;
use super::tree::{self, Node};
use crate::error::PipelineError;
use crate::sources;

/// Breakpoints in ascending order.
const SCREENS: [(&str, &str); 5] = [
    ("sm", "(min-width: 640px)"),
    ("md", "(min-width: 768px)"),
    ("lg", "(min-width: 1024px)"),
    ("xl", "(min-width: 1280px)"),
    ("2xl", "(min-width: 1536px)"),
];

static CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^\s"'`<>{}=;]+"#).expect("valid regex"));

/// Collect class candidates from every file matched by `patterns`.
///
/// Files that are not valid UTF-8 are skipped.
pub(crate) fn scan(root: &Path, patterns: &[String]) -> Result<BTreeSet<String>, PipelineError> {
    let mut candidates = BTreeSet::new();
    for file in sources::expand(root, patterns)? {
        let text = match std::fs::read_to_string(&file.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::debug!(path = %file.path.display(), "Skipping non-UTF-8 content file");
                continue;
            }
            Err(e) => return Err(PipelineError::io(&file.path)(e)),
        };
        candidates.extend(extract(&text));
    }
    Ok(candidates)
}

/// Candidate tokens in `text`.
pub(crate) fn extract(text: &str) -> impl Iterator<Item = String> + '_ {
    CANDIDATE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches([',', '.']).to_owned())
        .filter(|token| !token.is_empty() && token.len() <= 120)
}

pub(crate) fn run(css: &str, candidates: &BTreeSet<String>) -> Result<String, StyleError> {
    let mut out = Vec::new();
    for node in tree::parse(css)? {
        match node {
            Node::AtRule { name, prelude, .. } if name == "tailwind" => {
                if prelude.trim() == "utilities" {
                    out.extend(generate(candidates));
                }
            }
            other => out.push(other),
        }
    }
    apply(&mut out)?;
    Ok(tree::print(&out))
}

/// Rules for every compilable candidate: base rules first, then one media
/// block per breakpoint in ascending order.
pub(crate) fn generate(candidates: &BTreeSet<String>) -> Vec<Node> {
    let mut base = Vec::new();
    let mut screens: Vec<Vec<Node>> = vec![Vec::new(); SCREENS.len()];

    for candidate in candidates {
        let Some(compiled) = compile(candidate) else {
            continue;
        };
        match compiled.screen {
            Some(i) => screens[i].push(compiled.rule),
            None => base.push(compiled.rule),
        }
    }

    let mut nodes = base;
    for (i, rules) in screens.into_iter().enumerate() {
        if !rules.is_empty() {
            nodes.push(Node::AtRule {
                name: "media".to_owned(),
                prelude: SCREENS[i].1.to_owned(),
                block: Some(rules),
            });
        }
    }
    nodes
}

/// Expand `@apply` inside rules.
fn apply(nodes: &mut [Node]) -> Result<(), StyleError> {
    for node in nodes {
        match node {
            Node::Rule { children, .. } => {
                let mut expanded = Vec::with_capacity(children.len());
                for child in std::mem::take(children) {
                    match child {
                        Node::AtRule { name, prelude, .. } if name == "apply" => {
                            for token in prelude.split_whitespace() {
                                expanded.extend(applied_declarations(token)?);
                            }
                        }
                        other => expanded.push(other),
                    }
                }
                *children = expanded;
            }
            Node::AtRule {
                block: Some(children),
                ..
            } => apply(children)?,
            _ => {}
        }
    }
    Ok(())
}

fn applied_declarations(token: &str) -> Result<Vec<Node>, StyleError> {
    let unknown = || StyleError::UnknownUtility(token.to_owned());
    let (variants, utility) = split_variants(token).ok_or_else(unknown)?;
    if !variants.is_empty() {
        return Err(unknown());
    }
    let (important, utility) = match utility.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, utility.as_str()),
    };
    let rule = utility_rule(utility).ok_or_else(unknown)?;
    if rule.child.is_some() {
        return Err(unknown());
    }
    Ok(declarations(rule.decls, important))
}

struct Compiled {
    screen: Option<usize>,
    rule: Node,
}

/// Compile one candidate into a rule.
fn compile(token: &str) -> Option<Compiled> {
    let (variants, raw_utility) = split_variants(token)?;
    let (important, utility) = match raw_utility.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, raw_utility.as_str()),
    };
    let rule = utility_rule(utility)?;

    let mut selector = format!(".{}", escape_class_selector(token));
    let mut screen = None;
    for variant in &variants {
        if let Some(i) = SCREENS.iter().position(|(name, _)| name == variant) {
            if screen.is_some() {
                return None;
            }
            screen = Some(i);
        } else if let Some(pseudo) = variant_pseudo(variant) {
            selector.push_str(pseudo);
        } else {
            return None;
        }
    }
    if let Some(child) = rule.child {
        selector.push_str(child);
    }

    Some(Compiled {
        screen,
        rule: Node::rule(selector, declarations(rule.decls, important)),
    })
}

fn declarations(decls: Vec<(&'static str, String)>, important: bool) -> Vec<Node> {
    decls
        .into_iter()
        .map(|(property, value)| {
            if important {
                Node::decl(property, format!("{value} !important"))
            } else {
                Node::decl(property, value)
            }
        })
        .collect()
}

/// Split a token into `(variants, utility)`, ignoring `:` inside brackets.
fn split_variants(token: &str) -> Option<(Vec<String>, String)> {
    let mut parts: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut depth = 0usize;

    for ch in token.chars() {
        match ch {
            '[' => {
                depth += 1;
                buf.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                buf.push(ch);
            }
            ':' if depth == 0 => {
                if buf.is_empty() {
                    return None;
                }
                parts.push(std::mem::take(&mut buf));
            }
            _ => buf.push(ch),
        }
    }

    if buf.is_empty() {
        return None;
    }
    Some((parts, buf))
}

fn variant_pseudo(v: &str) -> Option<&'static str> {
    match v {
        "hover" => Some(":hover"),
        "focus" => Some(":focus"),
        "focus-visible" => Some(":focus-visible"),
        "focus-within" => Some(":focus-within"),
        "active" => Some(":active"),
        "disabled" => Some(":disabled"),
        "visited" => Some(":visited"),
        "first" => Some(":first-child"),
        "last" => Some(":last-child"),
        "odd" => Some(":nth-child(odd)"),
        "even" => Some(":nth-child(even)"),
        _ => None,
    }
}

struct UtilityRule {
    /// Selector suffix for utilities that target children.
    child: Option<&'static str>,
    decls: Vec<(&'static str, String)>,
}

fn rule(decls: Vec<(&'static str, String)>) -> Option<UtilityRule> {
    Some(UtilityRule { child: None, decls })
}

fn one(property: &'static str, value: impl Into<String>) -> Option<UtilityRule> {
    rule(vec![(property, value.into())])
}

/// Resolve a utility name (without variants) to declarations.
///
/// Prefixed families are tried before exact names so that, for example,
/// `text-center` is matched as alignment before falling back to a color.
fn utility_rule(utility: &str) -> Option<UtilityRule> {
    if let Some(negated) = utility.strip_prefix('-') {
        return negative_rule(negated);
    }
    if let Some(found) = exact_rule(utility) {
        return Some(found);
    }

    if let Some(v) = utility.strip_prefix("space-y-") {
        return Some(UtilityRule {
            child: Some(" > :not([hidden]) ~ :not([hidden])"),
            decls: vec![("margin-top", spacing_value(v)?)],
        });
    }
    if let Some(v) = utility.strip_prefix("space-x-") {
        return Some(UtilityRule {
            child: Some(" > :not([hidden]) ~ :not([hidden])"),
            decls: vec![("margin-left", spacing_value(v)?)],
        });
    }
    if let Some(found) = box_rule(utility, "p", "padding", spacing_value) {
        return found;
    }
    if let Some(found) = box_rule(utility, "m", "margin", margin_value) {
        return found;
    }
    if let Some(v) = utility.strip_prefix("gap-x-") {
        return one("column-gap", spacing_value(v)?);
    }
    if let Some(v) = utility.strip_prefix("gap-y-") {
        return one("row-gap", spacing_value(v)?);
    }
    if let Some(v) = utility.strip_prefix("gap-") {
        return one("gap", spacing_value(v)?);
    }
    if let Some(v) = utility.strip_prefix("inset-") {
        return one("inset", inset_value(v)?);
    }
    for side in ["top", "right", "bottom", "left"] {
        if let Some(v) = utility.strip_prefix(side).and_then(|r| r.strip_prefix('-')) {
            return one(side, inset_value(v)?);
        }
    }
    if let Some(v) = utility.strip_prefix("min-w-") {
        return one("min-width", minmax_size_value(v, SizeAxis::Width)?);
    }
    if let Some(v) = utility.strip_prefix("min-h-") {
        return one("min-height", minmax_size_value(v, SizeAxis::Height)?);
    }
    if let Some(v) = utility.strip_prefix("max-w-") {
        return one("max-width", max_width_value(v)?);
    }
    if let Some(v) = utility.strip_prefix("max-h-") {
        return one("max-height", minmax_size_value(v, SizeAxis::Height)?);
    }
    if let Some(v) = utility.strip_prefix("w-") {
        return one("width", size_value(v, SizeAxis::Width)?);
    }
    if let Some(v) = utility.strip_prefix("h-") {
        return one("height", size_value(v, SizeAxis::Height)?);
    }
    if let Some(v) = utility.strip_prefix("z-") {
        if v == "auto" || v.parse::<u16>().is_ok() {
            return one("z-index", v);
        }
        return None;
    }
    if let Some(v) = utility.strip_prefix("opacity-") {
        let n = v.parse::<u32>().ok().filter(|n| *n <= 100)?;
        return one("opacity", format_number(f64::from(n) / 100.0));
    }
    if let Some(v) = utility.strip_prefix("grid-cols-") {
        let n = v.parse::<u32>().ok().filter(|n| *n > 0)?;
        return one(
            "grid-template-columns",
            format!("repeat({n}, minmax(0, 1fr))"),
        );
    }
    if let Some(v) = utility.strip_prefix("col-span-") {
        if v == "full" {
            return one("grid-column", "1 / -1");
        }
        let n = v.parse::<u32>().ok().filter(|n| *n > 0)?;
        return one("grid-column", format!("span {n} / span {n}"));
    }
    if let Some(v) = utility.strip_prefix("duration-") {
        let ms = v.parse::<u32>().ok()?;
        return one("transition-duration", format!("{ms}ms"));
    }
    if let Some(v) = utility.strip_prefix("text-") {
        if let Some((size, line_height)) = text_size_value(v) {
            return rule(vec![
                ("font-size", size.to_owned()),
                ("line-height", line_height.to_owned()),
            ]);
        }
        return one("color", color_value(v)?);
    }
    if let Some(v) = utility.strip_prefix("bg-") {
        return one("background-color", color_value(v)?);
    }
    if let Some(v) = utility.strip_prefix("rounded-") {
        return one("border-radius", radius_value(v)?);
    }
    if let Some(v) = utility.strip_prefix("border-") {
        return border_rule(v);
    }
    None
}

/// `-m*-`, `-top-` and friends.
fn negative_rule(utility: &str) -> Option<UtilityRule> {
    let found = utility_rule(utility)?;
    let negatable = found.decls.iter().all(|(property, _)| {
        property.starts_with("margin")
            || matches!(*property, "top" | "right" | "bottom" | "left" | "inset")
    });
    if !negatable || found.child.is_some() {
        return None;
    }
    rule(
        found
            .decls
            .into_iter()
            .map(|(property, value)| Some((property, negate_css_value(&value)?)))
            .collect::<Option<Vec<_>>>()?,
    )
}

/// `p-4`, `px-2`, `mt-auto`, ... for the padding and margin families.
fn box_rule(
    utility: &str,
    prefix: &str,
    property: &'static str,
    value: fn(&str) -> Option<String>,
) -> Option<Option<UtilityRule>> {
    let rest = utility.strip_prefix(prefix)?;
    let (axis, v) = rest.split_once('-')?;
    let sides: &[&'static str] = match (property, axis) {
        ("padding", "") => &["padding"],
        ("padding", "x") => &["padding-left", "padding-right"],
        ("padding", "y") => &["padding-top", "padding-bottom"],
        ("padding", "t") => &["padding-top"],
        ("padding", "r") => &["padding-right"],
        ("padding", "b") => &["padding-bottom"],
        ("padding", "l") => &["padding-left"],
        ("margin", "") => &["margin"],
        ("margin", "x") => &["margin-left", "margin-right"],
        ("margin", "y") => &["margin-top", "margin-bottom"],
        ("margin", "t") => &["margin-top"],
        ("margin", "r") => &["margin-right"],
        ("margin", "b") => &["margin-bottom"],
        ("margin", "l") => &["margin-left"],
        _ => return None,
    };
    Some(value(v).and_then(|value| rule(sides.iter().map(|side| (*side, value.clone())).collect())))
}

fn margin_value(v: &str) -> Option<String> {
    if v == "auto" {
        return Some("auto".to_owned());
    }
    spacing_value(v)
}

#[allow(clippy::too_many_lines)]
fn exact_rule(utility: &str) -> Option<UtilityRule> {
    let (property, value) = match utility {
        "block" => ("display", "block"),
        "inline-block" => ("display", "inline-block"),
        "inline" => ("display", "inline"),
        "flex" => ("display", "flex"),
        "inline-flex" => ("display", "inline-flex"),
        "grid" => ("display", "grid"),
        "inline-grid" => ("display", "inline-grid"),
        "table" => ("display", "table"),
        "contents" => ("display", "contents"),
        "hidden" => ("display", "none"),
        "static" | "fixed" | "absolute" | "relative" | "sticky" => ("position", utility),
        "visible" => ("visibility", "visible"),
        "invisible" => ("visibility", "hidden"),
        "flex-row" => ("flex-direction", "row"),
        "flex-row-reverse" => ("flex-direction", "row-reverse"),
        "flex-col" => ("flex-direction", "column"),
        "flex-col-reverse" => ("flex-direction", "column-reverse"),
        "flex-wrap" => ("flex-wrap", "wrap"),
        "flex-nowrap" => ("flex-wrap", "nowrap"),
        "flex-1" => ("flex", "1 1 0%"),
        "flex-auto" => ("flex", "1 1 auto"),
        "flex-none" => ("flex", "none"),
        "grow" => ("flex-grow", "1"),
        "grow-0" => ("flex-grow", "0"),
        "shrink" => ("flex-shrink", "1"),
        "shrink-0" => ("flex-shrink", "0"),
        "items-start" => ("align-items", "flex-start"),
        "items-end" => ("align-items", "flex-end"),
        "items-center" => ("align-items", "center"),
        "items-baseline" => ("align-items", "baseline"),
        "items-stretch" => ("align-items", "stretch"),
        "justify-start" => ("justify-content", "flex-start"),
        "justify-end" => ("justify-content", "flex-end"),
        "justify-center" => ("justify-content", "center"),
        "justify-between" => ("justify-content", "space-between"),
        "justify-around" => ("justify-content", "space-around"),
        "justify-evenly" => ("justify-content", "space-evenly"),
        "self-auto" => ("align-self", "auto"),
        "self-start" => ("align-self", "flex-start"),
        "self-end" => ("align-self", "flex-end"),
        "self-center" => ("align-self", "center"),
        "self-stretch" => ("align-self", "stretch"),
        "text-left" => ("text-align", "left"),
        "text-center" => ("text-align", "center"),
        "text-right" => ("text-align", "right"),
        "text-justify" => ("text-align", "justify"),
        "font-thin" => ("font-weight", "100"),
        "font-light" => ("font-weight", "300"),
        "font-normal" => ("font-weight", "400"),
        "font-medium" => ("font-weight", "500"),
        "font-semibold" => ("font-weight", "600"),
        "font-bold" => ("font-weight", "700"),
        "font-extrabold" => ("font-weight", "800"),
        "font-black" => ("font-weight", "900"),
        "font-sans" => (
            "font-family",
            "ui-sans-serif, system-ui, sans-serif, \"Apple Color Emoji\", \"Segoe UI Emoji\"",
        ),
        "font-serif" => (
            "font-family",
            "ui-serif, Georgia, Cambria, \"Times New Roman\", Times, serif",
        ),
        "font-mono" => (
            "font-family",
            "ui-monospace, SFMono-Regular, Menlo, Monaco, Consolas, monospace",
        ),
        "italic" => ("font-style", "italic"),
        "not-italic" => ("font-style", "normal"),
        "uppercase" => ("text-transform", "uppercase"),
        "lowercase" => ("text-transform", "lowercase"),
        "capitalize" => ("text-transform", "capitalize"),
        "normal-case" => ("text-transform", "none"),
        "underline" => ("text-decoration-line", "underline"),
        "line-through" => ("text-decoration-line", "line-through"),
        "no-underline" => ("text-decoration-line", "none"),
        "leading-none" => ("line-height", "1"),
        "leading-tight" => ("line-height", "1.25"),
        "leading-snug" => ("line-height", "1.375"),
        "leading-normal" => ("line-height", "1.5"),
        "leading-relaxed" => ("line-height", "1.625"),
        "leading-loose" => ("line-height", "2"),
        "tracking-tight" => ("letter-spacing", "-0.025em"),
        "tracking-normal" => ("letter-spacing", "0em"),
        "tracking-wide" => ("letter-spacing", "0.025em"),
        "whitespace-nowrap" => ("white-space", "nowrap"),
        "whitespace-normal" => ("white-space", "normal"),
        "whitespace-pre" => ("white-space", "pre"),
        "overflow-auto" => ("overflow", "auto"),
        "overflow-hidden" => ("overflow", "hidden"),
        "overflow-visible" => ("overflow", "visible"),
        "overflow-scroll" => ("overflow", "scroll"),
        "overflow-x-auto" => ("overflow-x", "auto"),
        "overflow-y-auto" => ("overflow-y", "auto"),
        "overflow-x-hidden" => ("overflow-x", "hidden"),
        "overflow-y-hidden" => ("overflow-y", "hidden"),
        "object-contain" => ("object-fit", "contain"),
        "object-cover" => ("object-fit", "cover"),
        "cursor-pointer" => ("cursor", "pointer"),
        "cursor-default" => ("cursor", "default"),
        "cursor-not-allowed" => ("cursor", "not-allowed"),
        "pointer-events-none" => ("pointer-events", "none"),
        "pointer-events-auto" => ("pointer-events", "auto"),
        "select-none" => ("user-select", "none"),
        "select-all" => ("user-select", "all"),
        "rounded" => ("border-radius", "0.25rem"),
        "border" => ("border-width", "1px"),
        "shadow-none" => ("box-shadow", "0 0 #0000"),
        "shadow-sm" => ("box-shadow", "0 1px 2px 0 rgb(0 0 0 / 0.05)"),
        "shadow" => (
            "box-shadow",
            "0 1px 3px 0 rgb(0 0 0 / 0.1), 0 1px 2px -1px rgb(0 0 0 / 0.1)",
        ),
        "shadow-md" => (
            "box-shadow",
            "0 4px 6px -1px rgb(0 0 0 / 0.1), 0 2px 4px -2px rgb(0 0 0 / 0.1)",
        ),
        "shadow-lg" => (
            "box-shadow",
            "0 10px 15px -3px rgb(0 0 0 / 0.1), 0 4px 6px -4px rgb(0 0 0 / 0.1)",
        ),
        "transition" => (
            "transition-property",
            "color, background-color, border-color, opacity, box-shadow, transform",
        ),
        "truncate" => {
            return rule(vec![
                ("overflow", "hidden".to_owned()),
                ("text-overflow", "ellipsis".to_owned()),
                ("white-space", "nowrap".to_owned()),
            ]);
        }
        "sr-only" => {
            return rule(vec![
                ("position", "absolute".to_owned()),
                ("width", "1px".to_owned()),
                ("height", "1px".to_owned()),
                ("padding", "0".to_owned()),
                ("margin", "-1px".to_owned()),
                ("overflow", "hidden".to_owned()),
                ("clip", "rect(0, 0, 0, 0)".to_owned()),
                ("white-space", "nowrap".to_owned()),
                ("border-width", "0".to_owned()),
            ]);
        }
        "container" => ("width", "100%"),
        _ => return None,
    };
    one(property, value)
}

fn border_rule(v: &str) -> Option<UtilityRule> {
    if let Ok(width) = v.parse::<u32>() {
        return one("border-width", format!("{width}px"));
    }
    let side = match v {
        "t" => Some("border-top-width"),
        "r" => Some("border-right-width"),
        "b" => Some("border-bottom-width"),
        "l" => Some("border-left-width"),
        _ => None,
    };
    if let Some(side) = side {
        return one(side, "1px");
    }
    match v {
        "solid" | "dashed" | "dotted" | "none" => one("border-style", v),
        _ => one("border-color", color_value(v)?),
    }
}

fn radius_value(v: &str) -> Option<String> {
    let value = match v {
        "none" => "0",
        "sm" => "0.125rem",
        "md" => "0.375rem",
        "lg" => "0.5rem",
        "xl" => "0.75rem",
        "2xl" => "1rem",
        "3xl" => "1.5rem",
        "full" => "9999px",
        _ => return arbitrary_value(v),
    };
    Some(value.to_owned())
}

fn spacing_value(v: &str) -> Option<String> {
    if v == "px" {
        return Some("1px".to_owned());
    }
    if let Some(raw) = arbitrary_value(v) {
        return Some(raw);
    }
    let parsed = v.parse::<f64>().ok().filter(|n| *n >= 0.0)?;
    if parsed == 0.0 {
        return Some("0".to_owned());
    }
    Some(format!("{}rem", format_number(parsed * 0.25)))
}

fn inset_value(v: &str) -> Option<String> {
    match v {
        "0" => Some("0".to_owned()),
        "auto" => Some("auto".to_owned()),
        "full" => Some("100%".to_owned()),
        _ => fraction_to_percent(v).or_else(|| spacing_value(v)),
    }
}

/// Negate a CSS value for negative utilities.
fn negate_css_value(v: &str) -> Option<String> {
    let trimmed = v.trim();
    if trimmed.is_empty() || trimmed == "auto" {
        return None;
    }
    if trimmed == "0" {
        return Some("0".to_owned());
    }
    if let Some(positive) = trimmed.strip_prefix('-') {
        return Some(positive.to_owned());
    }
    if trimmed.contains('(') {
        return Some(format!("calc({trimmed} * -1)"));
    }
    Some(format!("-{trimmed}"))
}

#[derive(Debug, Clone, Copy)]
enum SizeAxis {
    Width,
    Height,
}

fn size_value(v: &str, axis: SizeAxis) -> Option<String> {
    let keyword = match v {
        "full" => Some("100%"),
        "auto" => Some("auto"),
        "min" => Some("min-content"),
        "max" => Some("max-content"),
        "fit" => Some("fit-content"),
        "screen" => Some(match axis {
            SizeAxis::Width => "100vw",
            SizeAxis::Height => "100vh",
        }),
        _ => None,
    };
    if let Some(keyword) = keyword {
        return Some(keyword.to_owned());
    }
    fraction_to_percent(v).or_else(|| spacing_value(v))
}

fn minmax_size_value(v: &str, axis: SizeAxis) -> Option<String> {
    if v == "none" {
        return Some("none".to_owned());
    }
    size_value(v, axis)
}

fn max_width_value(v: &str) -> Option<String> {
    let value = match v {
        "xs" => "20rem",
        "sm" => "24rem",
        "md" => "28rem",
        "lg" => "32rem",
        "xl" => "36rem",
        "2xl" => "42rem",
        "3xl" => "48rem",
        "4xl" => "56rem",
        "5xl" => "64rem",
        "6xl" => "72rem",
        "7xl" => "80rem",
        "prose" => "65ch",
        _ => return minmax_size_value(v, SizeAxis::Width),
    };
    Some(value.to_owned())
}

/// Font size and its default line height.
fn text_size_value(v: &str) -> Option<(&'static str, &'static str)> {
    match v {
        "xs" => Some(("0.75rem", "1rem")),
        "sm" => Some(("0.875rem", "1.25rem")),
        "base" => Some(("1rem", "1.5rem")),
        "lg" => Some(("1.125rem", "1.75rem")),
        "xl" => Some(("1.25rem", "1.75rem")),
        "2xl" => Some(("1.5rem", "2rem")),
        "3xl" => Some(("1.875rem", "2.25rem")),
        "4xl" => Some(("2.25rem", "2.5rem")),
        "5xl" => Some(("3rem", "1")),
        "6xl" => Some(("3.75rem", "1")),
        _ => None,
    }
}

/// Resolve a color token, with an optional `/alpha` suffix.
fn color_value(v: &str) -> Option<String> {
    if let Some(raw) = arbitrary_value(v) {
        return Some(raw);
    }
    let (base, alpha) = match v.split_once('/') {
        Some((base, alpha)) => (base, Some(alpha.parse::<u32>().ok().filter(|a| *a <= 100)?)),
        None => (v, None),
    };

    let color = match base {
        "current" => return Some("currentColor".to_owned()),
        "transparent" => return Some("transparent".to_owned()),
        "inherit" => return Some("inherit".to_owned()),
        "black" => "#000000",
        "white" => "#ffffff",
        other => palette_hex(other)?,
    };

    Some(match alpha {
        Some(alpha) => {
            let (r, g, b) = hex_to_rgb(color)?;
            format!("rgb({r} {g} {b} / {})", format_number(f64::from(alpha) / 100.0))
        }
        None => color.to_owned(),
    })
}

fn hex_to_rgb(v: &str) -> Option<(u8, u8, u8)> {
    let hex = v.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Default palette, shades 50 to 900.
fn palette_hex(v: &str) -> Option<&'static str> {
    let (hue, shade) = v.rsplit_once('-')?;
    let shades: [&str; 10] = match hue {
        "slate" => [
            "#f8fafc", "#f1f5f9", "#e2e8f0", "#cbd5e1", "#94a3b8", "#64748b", "#475569",
            "#334155", "#1e293b", "#0f172a",
        ],
        "gray" => [
            "#f9fafb", "#f3f4f6", "#e5e7eb", "#d1d5db", "#9ca3af", "#6b7280", "#4b5563",
            "#374151", "#1f2937", "#111827",
        ],
        "red" => [
            "#fef2f2", "#fee2e2", "#fecaca", "#fca5a5", "#f87171", "#ef4444", "#dc2626",
            "#b91c1c", "#991b1b", "#7f1d1d",
        ],
        "amber" => [
            "#fffbeb", "#fef3c7", "#fde68a", "#fcd34d", "#fbbf24", "#f59e0b", "#d97706",
            "#b45309", "#92400e", "#78350f",
        ],
        "yellow" => [
            "#fefce8", "#fef9c3", "#fef08a", "#fde047", "#facc15", "#eab308", "#ca8a04",
            "#a16207", "#854d0e", "#713f12",
        ],
        "green" => [
            "#f0fdf4", "#dcfce7", "#bbf7d0", "#86efac", "#4ade80", "#22c55e", "#16a34a",
            "#15803d", "#166534", "#14532d",
        ],
        "blue" => [
            "#eff6ff", "#dbeafe", "#bfdbfe", "#93c5fd", "#60a5fa", "#3b82f6", "#2563eb",
            "#1d4ed8", "#1e40af", "#1e3a8a",
        ],
        "indigo" => [
            "#eef2ff", "#e0e7ff", "#c7d2fe", "#a5b4fc", "#818cf8", "#6366f1", "#4f46e5",
            "#4338ca", "#3730a3", "#312e81",
        ],
        "purple" => [
            "#faf5ff", "#f3e8ff", "#e9d5ff", "#d8b4fe", "#c084fc", "#a855f7", "#9333ea",
            "#7e22ce", "#6b21a8", "#581c87",
        ],
        "pink" => [
            "#fdf2f8", "#fce7f3", "#fbcfe8", "#f9a8d4", "#f472b6", "#ec4899", "#db2777",
            "#be185d", "#9d174d", "#831843",
        ],
        _ => return None,
    };
    let index = match shade {
        "50" => 0,
        "100" => 1,
        "200" => 2,
        "300" => 3,
        "400" => 4,
        "500" => 5,
        "600" => 6,
        "700" => 7,
        "800" => 8,
        "900" => 9,
        _ => return None,
    };
    Some(shades[index])
}

/// Bracketed arbitrary value, e.g. `[42px]` or `[#bada55]`.
///
/// `;`, `{` and `}` are rejected so a value cannot escape its declaration.
fn arbitrary_value(v: &str) -> Option<String> {
    let raw = v.strip_prefix('[')?.strip_suffix(']')?;
    if raw.is_empty() {
        return None;
    }
    let safe = raw.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(c, '#' | '.' | ',' | '%' | '/' | '_' | '-' | '(' | ')' | '+' | '*')
    });
    if !safe {
        return None;
    }
    Some(raw.replace('_', " "))
}

fn fraction_to_percent(v: &str) -> Option<String> {
    let (a, b) = v.split_once('/')?;
    let num = a.parse::<f64>().ok()?;
    let den = b.parse::<f64>().ok().filter(|d| *d != 0.0)?;
    Some(format!("{}%", format_number(num / den * 100.0)))
}

/// Format with at most six decimals and no trailing zeros.
fn format_number(v: f64) -> String {
    let mut s = format!("{v:.6}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s.is_empty() || s == "-0" {
        s = "0".to_owned();
    }
    s
}

/// Escape a class token into a selector fragment.
fn escape_class_selector(token: &str) -> String {
    let mut out = String::new();
    for (i, ch) in token.chars().enumerate() {
        if i == 0 && ch.is_ascii_digit() {
            let _ = write!(out, "\\3{ch} ");
        } else if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}
