//! `@import` inlining.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::StyleError;
use super::tree::{self, Node};

/// Inline local `@import` rules of `css`, which was read from `file`.
///
/// Each file is inlined at most once; an import of a file currently being
/// inlined is a cycle. Bare specifiers are looked up in `node_modules`
/// directories between the importing file and `root`.
pub(crate) fn inline(css: &str, file: &Path, root: &Path) -> Result<String, StyleError> {
    let mut state = ImportState {
        root,
        stack: vec![canonical(file)],
        seen: HashSet::new(),
    };
    state.seen.insert(canonical(file));
    let nodes = state.expand(tree::parse(css)?, file)?;
    Ok(tree::print(&nodes))
}

struct ImportState<'a> {
    root: &'a Path,
    stack: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl ImportState<'_> {
    fn expand(&mut self, nodes: Vec<Node>, file: &Path) -> Result<Vec<Node>, StyleError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            let Node::AtRule {
                name,
                prelude,
                block: None,
            } = &node
            else {
                out.push(node);
                continue;
            };
            if !name.eq_ignore_ascii_case("import") {
                out.push(node);
                continue;
            }
            let Some(specifier) = local_specifier(prelude) else {
                out.push(node);
                continue;
            };

            let dir = file.parent().unwrap_or(Path::new("."));
            let resolved =
                resolve(&specifier, dir, self.root).ok_or_else(|| StyleError::ImportNotFound {
                    specifier: specifier.clone(),
                    from: file.to_path_buf(),
                })?;
            let key = canonical(&resolved);
            if self.stack.contains(&key) {
                return Err(StyleError::ImportCycle(resolved));
            }
            if !self.seen.insert(key.clone()) {
                tracing::debug!(path = %resolved.display(), "Skipping duplicate import");
                continue;
            }

            let source = fs::read_to_string(&resolved).map_err(|source| StyleError::Io {
                path: resolved.clone(),
                source,
            })?;
            self.stack.push(key);
            let imported = self.expand(tree::parse(&source)?, &resolved)?;
            self.stack.pop();
            out.extend(imported);
        }
        Ok(out)
    }
}

/// Specifier of an import that should be inlined.
///
/// Remote URLs and imports with media or layer conditions stay in place.
fn local_specifier(prelude: &str) -> Option<String> {
    let prelude = prelude.trim();
    let (specifier, rest) = if let Some(inner) = prelude.strip_prefix("url(") {
        let end = inner.find(')')?;
        (
            inner[..end].trim().trim_matches(['"', '\'']),
            &inner[end + 1..],
        )
    } else {
        let quote = prelude.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let inner = &prelude[1..];
        let end = inner.find(quote)?;
        (&inner[..end], &inner[end + 1..])
    };

    let remote = ["http://", "https://", "//"]
        .iter()
        .any(|p| specifier.starts_with(p));
    if remote || !rest.trim().is_empty() || specifier.is_empty() {
        return None;
    }
    Some(specifier.to_owned())
}

/// Resolve an import specifier relative to `dir`, then in `node_modules`.
fn resolve(specifier: &str, dir: &Path, root: &Path) -> Option<PathBuf> {
    if let Some(found) = css_file(&dir.join(specifier)) {
        return Some(found);
    }
    if specifier.starts_with('.') || specifier.starts_with('/') {
        return None;
    }

    for ancestor in dir.ancestors() {
        let package_dir = ancestor.join("node_modules").join(specifier);
        if let Some(found) = css_file(&package_dir) {
            return Some(found);
        }
        if package_dir.is_dir() {
            return package_style(&package_dir);
        }
        if ancestor == root {
            break;
        }
    }
    None
}

/// `path` itself, or `path` with a `.css` extension appended.
fn css_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let mut with_ext = path.as_os_str().to_owned();
    with_ext.push(".css");
    let with_ext = PathBuf::from(with_ext);
    with_ext.is_file().then_some(with_ext)
}

/// Stylesheet entry of a package: `style` in `package.json`, then `index.css`.
fn package_style(package_dir: &Path) -> Option<PathBuf> {
    let manifest = fs::read_to_string(package_dir.join("package.json"))
        .ok()
        .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok());
    if let Some(style) = manifest
        .as_ref()
        .and_then(|m| m.get("style"))
        .and_then(serde_json::Value::as_str)
        && let Some(found) = css_file(&package_dir.join(style))
    {
        return Some(found);
    }
    css_file(&package_dir.join("index.css"))
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
