//! Module graph bundling.
//!
//! Starting from an entry file, every statically imported module is loaded
//! once and wrapped in a function registered under a numeric id:
//!
//! - Project modules are first lowered to the configured target.
//! - ES modules have their `import`/`export` statements rewritten to
//!   `__require` calls and live getters on `exports`.
//! - CommonJS modules are wrapped unchanged apart from resolvable `require()`
//!   calls.
//! - JSON files export their parsed value.
//!
//! Rewrites only apply where a statement starts in code, never inside a
//! string, template, regex literal or comment.
//!
//! The bundle is a single IIFE that evaluates the entry and hands its
//! exports to `module.exports` when one exists.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::ScriptError;
use super::lexer::Literals;
use super::resolve::resolve;
use super::transpile::Transpiler;

static IMPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+([\w$*{][^'"]*?)\s*from\s*['"]([^'"]+)['"][ \t]*;?"#)
        .expect("valid regex")
});

static IMPORT_BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*['"]([^'"]+)['"][ \t]*;?"#).expect("valid regex")
});

static EXPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*export\s*(\*(?:\s*as\s+[\w$]+)?|\{[^}]*\})\s*from\s*['"]([^'"]+)['"][ \t]*;?"#,
    )
    .expect("valid regex")
});

static EXPORT_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*export\s*\{([^}]*)\}[ \t]*;?").expect("valid regex")
});

static EXPORT_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^([ \t]*)export\s+default\s+(?:((?:async\s+)?function\s*\*?\s*|class\s+)([\w$]+))?",
    )
    .expect("valid regex")
});

static EXPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^([ \t]*)export\s+((?:async\s+)?function\s*\*?|class|const|let|var)\s+([\w$]+)",
    )
    .expect("valid regex")
});

static LEFTOVER_MODULE_SYNTAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*(?:import[\s{*'"]|export\b)"#).expect("valid regex")
});

static REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\(\s*['"]([^'"]+)['"]\s*\)"#).expect("valid regex")
});

const RUNTIME: &str = r"var __cache = [];
function __require(id) {
  var cached = __cache[id];
  if (cached) return cached.exports;
  var module = (__cache[id] = { exports: {} });
  __modules[id].call(module.exports, module, module.exports, __require);
  return module.exports;
}
function __export(target, getters) {
  Object.keys(getters).forEach(function (name) {
    Object.defineProperty(target, name, { enumerable: true, get: getters[name] });
  });
}
function __reexport(target, source) {
  Object.keys(source).forEach(function (name) {
    if (name === 'default' || Object.prototype.hasOwnProperty.call(target, name)) return;
    Object.defineProperty(target, name, { enumerable: true, get: function () { return source[name]; } });
  });
}
function __importDefault(mod) {
  return mod && mod.__esModule ? mod.default : mod;
}
";

/// Bundle the module graph rooted at `entry` (whose text is `source`).
pub(crate) fn bundle(
    entry: &Path,
    source: String,
    root: &Path,
    transpiler: &Transpiler,
) -> Result<String, ScriptError> {
    let mut graph = Graph::new(root, transpiler);
    graph.register(entry);
    graph.sources.insert(0, source);

    let mut wrapped = Vec::new();
    while let Some(id) = graph.queue.pop_front() {
        let path = graph.paths[id].clone();
        let text = match graph.sources.remove(&id) {
            Some(text) => text,
            None => fs::read_to_string(&path).map_err(|source| ScriptError::Io {
                path: path.clone(),
                source,
            })?,
        };
        let body = graph.transform(&path, &text)?;
        wrapped.push((id, body));
    }

    let mut out = String::from("(function () {\n'use strict';\nvar __modules = [\n");
    for (id, body) in &wrapped {
        let label = graph.paths[*id]
            .strip_prefix(root)
            .unwrap_or(&graph.paths[*id])
            .display()
            .to_string();
        let _ = write!(
            out,
            "// {label}\nfunction (module, exports, __require) {{\n{}\n}},\n",
            body.trim_end()
        );
    }
    out.push_str("];\n");
    out.push_str(RUNTIME);
    out.push_str(
        "var __entry = __require(0);\nif (typeof module === 'object' && module) module.exports = __entry;\n})();\n",
    );

    tracing::debug!(
        entry = %entry.display(),
        modules = wrapped.len(),
        "Bundled module graph"
    );
    Ok(out)
}

struct Graph<'a> {
    root: &'a Path,
    transpiler: &'a Transpiler,
    ids: HashMap<PathBuf, usize>,
    paths: Vec<PathBuf>,
    sources: HashMap<usize, String>,
    queue: VecDeque<usize>,
}

impl<'a> Graph<'a> {
    fn new(root: &'a Path, transpiler: &'a Transpiler) -> Self {
        Self {
            root,
            transpiler,
            ids: HashMap::new(),
            paths: Vec::new(),
            sources: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    /// Id of `path`, queueing it for loading on first sight.
    fn register(&mut self, path: &Path) -> usize {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = self.paths.len();
        self.ids.insert(key, id);
        self.paths.push(path.to_path_buf());
        self.queue.push_back(id);
        id
    }

    fn transform(&mut self, path: &Path, text: &str) -> Result<String, ScriptError> {
        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str::<serde_json::Value>(text).map_err(|source| {
                ScriptError::Json {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            return Ok(format!("module.exports = {};", text.trim()));
        }

        let lowered;
        let text = if self.transpiler.applies_to(path) {
            lowered = self.transpiler.transpile(path, text)?;
            lowered.as_str()
        } else {
            text
        };

        if Literals::scan(text).find(&LEFTOVER_MODULE_SYNTAX, text).is_some() {
            self.transform_esm(path, text)
        } else {
            self.transform_cjs(path, text)
        }
    }

    fn transform_cjs(&mut self, path: &Path, text: &str) -> Result<String, ScriptError> {
        replace_each(&REQUIRE, text, |caps| {
            let specifier = &caps[1];
            match resolve(specifier, path, self.root) {
                Some(found) => Ok(format!("__require({})", self.register(&found))),
                None => {
                    tracing::warn!(
                        specifier,
                        path = %path.display(),
                        "Leaving unresolved require() as is"
                    );
                    Ok(caps[0].to_owned())
                }
            }
        })
    }

    fn transform_esm(&mut self, path: &Path, text: &str) -> Result<String, ScriptError> {
        let mut exports: Vec<(String, String)> = Vec::new();
        let mut imports = 0usize;
        let mut next_binding = || {
            imports += 1;
            format!("__imp{imports}")
        };

        let text = replace_each(&EXPORT_FROM, text, |caps| {
            let id = self.dependency(&caps[2], path)?;
            let clause = caps[1].trim();
            if clause == "*" {
                return Ok(format!("__reexport(exports, __require({id}));"));
            }
            let binding = next_binding();
            if let Some(alias) = clause.strip_prefix('*') {
                let alias = alias.trim().trim_start_matches("as").trim();
                exports.push((alias.to_owned(), binding.clone()));
            } else {
                for (local, exported) in specifiers(clause) {
                    exports.push((exported, format!("{binding}.{local}")));
                }
            }
            Ok(format!("const {binding} = __require({id});"))
        })?;

        let text = replace_each(&IMPORT_FROM, &text, |caps| {
            let id = self.dependency(&caps[2], path)?;
            import_bindings(&caps[1], id, &next_binding()).map_err(|message| {
                ScriptError::Syntax {
                    path: path.to_path_buf(),
                    message,
                }
            })
        })?;

        let text = replace_each(&IMPORT_BARE, &text, |caps| {
            let id = self.dependency(&caps[1], path)?;
            Ok(format!("__require({id});"))
        })?;

        let text = replace_each(&EXPORT_LIST, &text, |caps| {
            for (local, exported) in specifiers(&caps[1]) {
                exports.push((exported, local));
            }
            Ok(String::new())
        })?;

        let text = replace_each(&EXPORT_DEFAULT, &text, |caps| {
            let indent = &caps[1];
            match (caps.get(2), caps.get(3)) {
                // `export default class extends Base {}` has no name.
                (Some(keyword), Some(name)) if name.as_str() == "extends" => {
                    exports.push(("default".to_owned(), "__default_export".to_owned()));
                    Ok(format!(
                        "{indent}const __default_export = {}{}",
                        keyword.as_str(),
                        name.as_str()
                    ))
                }
                (Some(keyword), Some(name)) => {
                    exports.push(("default".to_owned(), name.as_str().to_owned()));
                    Ok(format!("{indent}{}{}", keyword.as_str(), name.as_str()))
                }
                _ => {
                    exports.push(("default".to_owned(), "__default_export".to_owned()));
                    Ok(format!("{indent}const __default_export = "))
                }
            }
        })?;

        let text = replace_each(&EXPORT_DECL, &text, |caps| {
            exports.push((caps[3].to_owned(), caps[3].to_owned()));
            Ok(format!("{}{} {}", &caps[1], &caps[2], &caps[3]))
        })?;

        if let Some(found) = Literals::scan(&text).find(&LEFTOVER_MODULE_SYNTAX, &text) {
            return Err(ScriptError::Syntax {
                path: path.to_path_buf(),
                message: format!("unsupported module syntax `{}`", found.as_str().trim()),
            });
        }

        let mut out = String::from("Object.defineProperty(exports, '__esModule', { value: true });\n");
        if !exports.is_empty() {
            let getters: Vec<String> = exports
                .iter()
                .map(|(name, local)| format!("{name}: () => {local}"))
                .collect();
            let _ = writeln!(out, "__export(exports, {{ {} }});", getters.join(", "));
        }
        out.push_str(&text);
        Ok(out)
    }

    /// Id of the module `specifier` refers to. Unresolvable imports are errors.
    fn dependency(&mut self, specifier: &str, from: &Path) -> Result<usize, ScriptError> {
        let found = resolve(specifier, from, self.root).ok_or_else(|| ScriptError::Unresolved {
            specifier: specifier.to_owned(),
            from: from.to_path_buf(),
        })?;
        Ok(self.register(&found))
    }
}

/// `a, b as c` into `(local, exported)` pairs.
fn specifiers(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.split_once(" as ") {
            Some((local, exported)) => (local.trim().to_owned(), exported.trim().to_owned()),
            None => (s.to_owned(), s.to_owned()),
        })
        .collect()
}

/// Declarations binding the names of an import clause to module `id`.
fn import_bindings(clause: &str, id: usize, binding: &str) -> Result<String, String> {
    let mut out = format!("const {binding} = __require({id});");
    let mut rest = clause.trim();

    if !rest.starts_with('{') && !rest.starts_with('*') {
        let (default, tail) = rest.split_once(',').unwrap_or((rest, ""));
        let _ = write!(out, " const {} = __importDefault({binding});", default.trim());
        rest = tail.trim();
    }

    if let Some(namespace) = rest.strip_prefix('*') {
        let Some(name) = namespace.trim().strip_prefix("as") else {
            return Err(format!("invalid namespace import `{clause}`"));
        };
        let _ = write!(out, " const {} = {binding};", name.trim());
    } else if let Some(list) = rest.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
        let names: Vec<String> = specifiers(list)
            .into_iter()
            .map(|(imported, local)| {
                if imported == local {
                    local
                } else {
                    format!("{imported}: {local}")
                }
            })
            .collect();
        if !names.is_empty() {
            let _ = write!(out, " const {{ {} }} = {binding};", names.join(", "));
        }
    } else if !rest.is_empty() {
        return Err(format!("invalid import clause `{clause}`"));
    }
    Ok(out)
}

/// `Regex::replace_all` with a fallible replacement, skipping matches that
/// start inside a literal or comment.
fn replace_each<F>(re: &Regex, text: &str, mut f: F) -> Result<String, ScriptError>
where
    F: FnMut(&Captures<'_>) -> Result<String, ScriptError>,
{
    let literals = Literals::scan(text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if !literals.is_code(whole.start()) {
            continue;
        }
        out.push_str(&text[last..whole.start()]);
        out.push_str(&f(&caps)?);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write;
    use assetline_config::ScriptsConfig;
    use pretty_assertions::assert_eq;

    fn bundle_file(root: &Path, rel: &str) -> Result<String, ScriptError> {
        let entry = root.join(rel);
        let source = fs::read_to_string(&entry).unwrap();
        let transpiler = Transpiler::new(&ScriptsConfig::default()).unwrap();
        bundle(&entry, source, root, &transpiler)
    }

    #[test]
    fn test_import_bindings() {
        assert_eq!(
            import_bindings("greet, { shout as loud, quiet }", 2, "__imp1").unwrap(),
            "const __imp1 = __require(2); const greet = __importDefault(__imp1); const { shout: loud, quiet } = __imp1;"
        );
        assert_eq!(
            import_bindings("* as math", 1, "__imp2").unwrap(),
            "const __imp2 = __require(1); const math = __imp2;"
        );
        assert!(import_bindings("* math", 1, "__imp3").is_err());
    }

    #[test]
    fn test_bundle_esm_graph() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(
            root,
            "src/scripts/main.js",
            "import greet, { shout as loud } from './greet';\nimport * as math from './lib/math.js';\nexport const answer = math.add(40, 2);\nexport default function run() {\n  return loud(greet('x'));\n}\n",
        );
        write(
            root,
            "src/scripts/greet.js",
            "export default function greet(name) { return `hi ${name}`; }\nexport function shout(s) { return s.toUpperCase(); }\n",
        );
        write(root, "src/scripts/lib/math.js", "const add = (a, b) => a + b;\nexport { add };\n");

        let out = bundle_file(root, "src/scripts/main.js").unwrap();

        assert!(out.contains("// src/scripts/main.js"));
        assert!(out.contains("// src/scripts/greet.js"));
        assert!(out.contains("// src/scripts/lib/math.js"));
        assert!(out.contains("const __imp1 = __require(1); const greet = __importDefault(__imp1); const { shout: loud } = __imp1;"));
        assert!(out.contains("__export(exports, { default: () => run, answer: () => answer });"));
        assert!(out.contains("__export(exports, { add: () => add });"));
        assert!(out.contains("module.exports = __entry"));
        assert!(!LEFTOVER_MODULE_SYNTAX.is_match(&out));
    }

    #[test]
    fn test_shared_dependency_loaded_once() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(root, "main.js", "import './a';\nimport './b';\n");
        write(root, "a.js", "import './shared';\n");
        write(root, "b.js", "import './shared';\n");
        write(root, "shared.js", "export const x = 1;\n");

        let out = bundle_file(root, "main.js").unwrap();

        assert_eq!(out.matches("// shared.js").count(), 1);
        assert_eq!(out.matches("__require(3);").count(), 2);
    }

    #[test]
    fn test_commonjs_dependency_and_json() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(root, "main.js", "import legacy from 'legacy';\nimport data from './data.json';\nexport default legacy(data);\n");
        write(root, "node_modules/legacy/package.json", r#"{"main": "lib/index.js"}"#);
        write(
            root,
            "node_modules/legacy/lib/index.js",
            "const path = require('path');\nconst util = require('./util');\nmodule.exports = function (d) { return util(d); };\n",
        );
        write(root, "node_modules/legacy/lib/util.js", "module.exports = (d) => d;\n");
        write(root, "data.json", "{\"a\": 1}\n");

        let out = bundle_file(root, "main.js").unwrap();

        assert!(out.contains("const legacy = __importDefault(__imp1);"));
        assert!(out.contains("const util = __require(3);"));
        assert!(out.contains("require('path')"));
        assert!(out.contains("module.exports = {\"a\": 1};"));
        assert!(out.contains("const __default_export = legacy(data);"));
    }

    #[test]
    fn test_reexports() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(root, "index.js", "export * from './a';\nexport { b as bee } from './b';\nexport * as c from './c';\n");
        write(root, "a.js", "export const a = 1;\n");
        write(root, "b.js", "export const b = 2;\n");
        write(root, "c.js", "export const c = 3;\n");

        let out = bundle_file(root, "index.js").unwrap();

        assert!(out.contains("__reexport(exports, __require(1));"));
        assert!(out.contains("bee: () => __imp1.b"));
        assert!(out.contains("c: () => __imp2"));
    }

    #[test]
    fn test_unresolved_import_is_error() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "main.js", "import x from './nope';\n");

        let err = bundle_file(temp.path(), "main.js").unwrap_err();

        assert!(matches!(err, ScriptError::Unresolved { ref specifier, .. } if specifier == "./nope"));
    }

    #[test]
    fn test_unsupported_export_form_is_error() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "main.js", "export const { a, b } = obj;\n");

        let err = bundle_file(temp.path(), "main.js").unwrap_err();

        assert!(err.to_string().contains("unsupported module syntax"));
    }

    #[test]
    fn test_invalid_json_module_is_error() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "main.js", "import d from './d.json';\n");
        write(temp.path(), "d.json", "{nope");

        assert!(matches!(
            bundle_file(temp.path(), "main.js").unwrap_err(),
            ScriptError::Json { .. }
        ));
    }

    #[test]
    fn test_anonymous_default_exports() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(root, "main.js", "import Widget from './widget';\nimport make from './make';\nexport const w = make(Widget);\n");
        write(root, "base.js", "export class Base {}\n");
        write(root, "widget.js", "import { Base } from './base';\nexport default class extends Base {}\n");
        write(root, "make.js", "export default function (C) { return new C(); }\n");

        let out = bundle_file(root, "main.js").unwrap();

        assert!(out.contains("const __default_export = class extends Base"));
        assert!(out.contains("const __default_export = function"));
        assert_eq!(out.matches("default: () => __default_export").count(), 2);
        assert!(!out.contains("() => extends"));
    }

    #[test]
    fn test_module_syntax_inside_literals_is_left_alone() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(
            root,
            "main.js",
            "const doc = `\nexport default 1\nimport x from './nope'\n`;\nexport default doc;\n",
        );

        let out = bundle_file(root, "main.js").unwrap();

        assert!(out.contains("\nexport default 1\nimport x from './nope'\n`"));
        assert!(out.contains("const __default_export = doc;"));
        assert!(out.contains("default: () => __default_export"));
    }

    #[test]
    fn test_require_inside_string_is_not_bundled() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(root, "main.js", "const usage = \"call require('./dep') first\";\nmodule.exports = usage;\n");
        write(root, "dep.js", "module.exports = 1;\n");

        let out = bundle_file(root, "main.js").unwrap();

        assert!(!out.contains("// dep.js"));
        assert!(out.contains("require('./dep')"));
        assert!(!out.contains("__require(1)"));
    }

    #[test]
    fn test_project_modules_are_lowered() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(root, "main.js", "import { pick } from './pick';\nexport const v = pick({ a: { b: 1 } }) ?? 0;\n");
        write(root, "pick.js", "export const pick = (o) => o?.a?.b;\n");

        let out = bundle_file(root, "main.js").unwrap();

        assert!(!out.contains("?."));
        assert!(!out.contains("??"));
        assert!(out.contains("__export(exports, { pick: () => pick });"));
    }

    #[test]
    fn test_dependencies_are_not_lowered_by_default() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(root, "main.js", "import lib from 'lib';\nexport default lib;\n");
        write(root, "node_modules/lib/index.js", "module.exports = (o) => o?.x;\n");

        let out = bundle_file(root, "main.js").unwrap();

        assert!(out.contains("module.exports = (o) => o?.x;"));
    }
}
