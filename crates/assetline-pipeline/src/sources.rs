//! Source glob expansion.
//!
//! Globs are expanded fresh on every run. Each match remembers its glob base
//! (the leading directories of the pattern before the first wildcard) so
//! outputs can mirror the source tree below it.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::error::PipelineError;

/// A file matched by a source glob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Absolute glob base the file was matched under.
    pub base: PathBuf,
}

impl SourceFile {
    /// Path relative to the glob base.
    #[must_use]
    pub fn relative(&self) -> &Path {
        self.path.strip_prefix(&self.base).unwrap_or(&self.path)
    }
}

/// Expand `patterns` (relative to `root`) into an ordered, de-duplicated list
/// of files.
///
/// Patterns starting with `!` exclude files. When several patterns match a
/// file the last one decides, so a later include can re-admit a file an
/// earlier exclude dropped. Directories are skipped.
pub fn expand(root: &Path, patterns: &[String]) -> Result<Vec<SourceFile>, PipelineError> {
    let escaped_root = PathBuf::from(glob::Pattern::escape(&root.to_string_lossy()));
    let rules = patterns
        .iter()
        .map(|pattern| Rule::new(&escaped_root, pattern))
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for rule in rules.iter().filter(|rule| !rule.negated) {
        let base = root.join(glob_base(rule.relative));
        let entries = glob::glob(rule.pattern.as_str()).map_err(|source| PipelineError::Pattern {
            pattern: rule.relative.to_owned(),
            source,
        })?;

        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable glob match");
                    continue;
                }
            };
            if !path.is_file() || !is_selected(&rules, &path) {
                continue;
            }
            if seen.insert(path.clone()) {
                files.push(SourceFile {
                    path,
                    base: base.clone(),
                });
            }
        }
    }

    Ok(files)
}

/// One source pattern, anchored at the project root.
#[derive(Debug)]
struct Rule<'a> {
    relative: &'a str,
    negated: bool,
    pattern: glob::Pattern,
}

impl<'a> Rule<'a> {
    fn new(escaped_root: &Path, raw: &'a str) -> Result<Self, PipelineError> {
        let (negated, pattern) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let relative = pattern.trim_start_matches("./");
        let anchored = escaped_root.join(relative);
        let compiled =
            glob::Pattern::new(&anchored.to_string_lossy()).map_err(|source| PipelineError::Pattern {
                pattern: raw.to_owned(),
                source,
            })?;
        Ok(Self {
            relative,
            negated,
            pattern: compiled,
        })
    }
}

/// Whether the last rule matching `path` is an include.
fn is_selected(rules: &[Rule<'_>], path: &Path) -> bool {
    rules
        .iter()
        .rev()
        .find(|rule| rule.pattern.matches_path(path))
        .is_some_and(|rule| !rule.negated)
}

/// Leading directories of `pattern` that contain no glob metacharacters.
///
/// A pattern without wildcards is a single file, so its base is its parent.
pub(crate) fn glob_base(pattern: &str) -> PathBuf {
    let pattern = pattern.trim_start_matches("./");
    let is_magic = |s: &str| s.contains(['*', '?', '[']);

    let mut base = PathBuf::new();
    let components: Vec<_> = Path::new(pattern).components().collect();
    for (i, component) in components.iter().enumerate() {
        let Component::Normal(segment) = component else {
            base.push(component);
            continue;
        };
        let segment = segment.to_string_lossy();
        if is_magic(&segment) || i + 1 == components.len() {
            break;
        }
        base.push(segment.as_ref());
    }
    base
}
