//! Module specifier resolution.
//!
//! Relative specifiers resolve against the importing file's directory. Bare
//! specifiers are looked up in `node_modules` directories from the importing
//! file up to the project root.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Extensions tried, in order, when a specifier has none.
const EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "json"];

#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    module: Option<String>,
    main: Option<String>,
}

/// Resolve `specifier` imported from `from`.
pub(crate) fn resolve(specifier: &str, from: &Path, root: &Path) -> Option<PathBuf> {
    let dir = from.parent().unwrap_or(root);
    if is_relative(specifier) {
        return module_file(&dir.join(specifier));
    }

    let (package, subpath) = split_package(specifier);
    for ancestor in dir.ancestors() {
        let package_dir = ancestor.join("node_modules").join(package);
        if package_dir.is_dir() {
            return match subpath {
                Some(subpath) => module_file(&package_dir.join(subpath)),
                None => package_entry(&package_dir),
            };
        }
        if ancestor == root {
            break;
        }
    }
    None
}

fn is_relative(specifier: &str) -> bool {
    matches!(specifier, "." | "..")
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

/// Split `@scope/name/sub/path` into `(@scope/name, Some(sub/path))`.
fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let name_segments = if specifier.starts_with('@') { 2 } else { 1 };
    let mut split_at = None;
    for (seen, (i, _)) in specifier.match_indices('/').enumerate() {
        if seen + 1 == name_segments {
            split_at = Some(i);
            break;
        }
    }
    match split_at {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..])),
        None => (specifier, None),
    }
}

/// `path` as a file, with an extension appended, or as a directory index.
fn module_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    for ext in EXTENSIONS {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    let index = path.join("index.js");
    index.is_file().then_some(index)
}

/// Entry file of a package: `module`, then `main`, then `index.js`.
fn package_entry(package_dir: &Path) -> Option<PathBuf> {
    let manifest = fs::read_to_string(package_dir.join("package.json"))
        .ok()
        .and_then(|text| serde_json::from_str::<PackageManifest>(&text).ok())
        .unwrap_or_default();

    [manifest.module, manifest.main]
        .into_iter()
        .flatten()
        .find_map(|field| module_file(&package_dir.join(field)))
        .or_else(|| module_file(&package_dir.join("index.js")))
}
