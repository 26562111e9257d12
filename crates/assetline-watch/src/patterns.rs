//! Glob sets for watch bindings.

use std::path::Path;

use glob::{MatchOptions, Pattern};

use crate::WatchError;

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// An ordered list of globs, relative to the watch root.
///
/// A pattern prefixed with `!` excludes what earlier patterns included. The
/// last pattern that matches a path decides.
#[derive(Clone, Debug)]
pub struct PatternSet {
    rules: Vec<(bool, Pattern)>,
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> Result<Self, WatchError> {
        let rules = patterns
            .iter()
            .map(|pattern| {
                let (include, glob) = match pattern.strip_prefix('!') {
                    Some(rest) => (false, rest),
                    None => (true, pattern.as_str()),
                };
                let glob = glob.trim_start_matches("./");
                Pattern::new(glob)
                    .map(|compiled| (include, compiled))
                    .map_err(|source| WatchError::Pattern {
                        pattern: pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { rules })
    }

    /// Whether `relative` (a path below the watch root) is selected.
    #[must_use]
    pub fn matches(&self, relative: &Path) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|(_, pattern)| pattern.matches_path_with(relative, OPTIONS))
            .is_some_and(|(include, _)| *include)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(patterns: &[&str]) -> PatternSet {
        let owned: Vec<String> = patterns.iter().map(|p| (*p).to_owned()).collect();
        PatternSet::new(&owned).unwrap()
    }

    #[test]
    fn test_globstar_matches_nested_files() {
        let styles = set(&["src/styles/**/*.css"]);

        assert!(styles.matches(Path::new("src/styles/index.css")));
        assert!(styles.matches(Path::new("src/styles/partials/vars.css")));
        assert!(!styles.matches(Path::new("src/scripts/app.js")));
    }

    #[test]
    fn test_single_star_does_not_cross_directories() {
        let top = set(&["src/*.js"]);

        assert!(top.matches(Path::new("src/app.js")));
        assert!(!top.matches(Path::new("src/lib/app.js")));
    }

    #[test]
    fn test_negation_last_match_wins() {
        let images = set(&["src/images/**/*", "!src/images/raw/**", "src/images/raw/keep.png"]);

        assert!(images.matches(Path::new("src/images/logo.png")));
        assert!(!images.matches(Path::new("src/images/raw/big.png")));
        assert!(images.matches(Path::new("src/images/raw/keep.png")));
    }

    #[test]
    fn test_leading_dot_slash_ignored() {
        assert!(set(&["./src/a.css"]).matches(Path::new("src/a.css")));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PatternSet::new(&["src/[".to_owned()]).unwrap_err();

        assert!(matches!(err, WatchError::Pattern { ref pattern, .. } if pattern == "src/["));
    }
}
