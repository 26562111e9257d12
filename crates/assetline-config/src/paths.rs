//! Path table: where each asset category is read from and written to.
//!
//! The table is built once while loading configuration and is immutable
//! afterwards. Glob patterns are stored as strings relative to the project
//! root; they are expanded fresh by every pipeline run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

/// Asset category handled by one pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Styles,
    Scripts,
    Views,
    Images,
}

impl Category {
    /// All categories in build order.
    pub const ALL: [Category; 4] = [
        Category::Styles,
        Category::Scripts,
        Category::Views,
        Category::Images,
    ];

    /// Lowercase name used in config sections and CLI arguments.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Category::Styles => "styles",
            Category::Scripts => "scripts",
            Category::Views => "views",
            Category::Images => "images",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown asset category: {s}"))
    }
}

/// Source and destination of one asset category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetPaths {
    /// Source globs, relative to the project root, in evaluation order.
    pub src: Vec<String>,
    /// Watch globs. `None` means the source globs are watched.
    pub watch: Option<Vec<String>>,
    /// Absolute destination directory.
    pub dest: PathBuf,
}

impl AssetPaths {
    /// Globs the watcher binds for this category.
    #[must_use]
    pub fn watch_patterns(&self) -> &[String] {
        self.watch.as_deref().unwrap_or(&self.src)
    }
}

/// Static mapping from asset category to its paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathTable {
    /// Project root every glob is relative to.
    pub root: PathBuf,
    /// Output root removed by the clean step.
    pub dest: PathBuf,
    pub styles: AssetPaths,
    pub scripts: AssetPaths,
    pub views: AssetPaths,
    pub images: AssetPaths,
}

impl PathTable {
    /// Default layout rooted at `root`.
    #[must_use]
    pub fn with_root(root: &Path) -> Self {
        PathsConfigRaw::default().resolve(root)
    }

    /// Paths for a category.
    #[must_use]
    pub fn get(&self, category: Category) -> &AssetPaths {
        match category {
            Category::Styles => &self.styles,
            Category::Scripts => &self.scripts,
            Category::Views => &self.views,
            Category::Images => &self.images,
        }
    }

    /// Iterate over every category with its paths.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &AssetPaths)> {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

impl Default for PathTable {
    fn default() -> Self {
        Self::with_root(Path::new("."))
    }
}

/// Raw `[paths]` section as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct PathsConfigRaw {
    dest: Option<String>,
    styles: AssetPathsRaw,
    scripts: AssetPathsRaw,
    views: AssetPathsRaw,
    images: AssetPathsRaw,
}

/// Raw `[paths.<category>]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct AssetPathsRaw {
    src: Option<Vec<String>>,
    watch: Option<Vec<String>>,
    dest: Option<String>,
}

struct Defaults {
    src: &'static [&'static str],
    watch: Option<&'static [&'static str]>,
    dest: &'static str,
}

fn defaults(category: Category) -> Defaults {
    match category {
        Category::Styles => Defaults {
            src: &["src/styles/index.css"],
            watch: Some(&["src/styles/**/*.css"]),
            dest: "assets/css",
        },
        Category::Scripts => Defaults {
            src: &["src/scripts/**/*.js"],
            watch: None,
            dest: "assets/js",
        },
        Category::Views => Defaults {
            src: &["src/views/pages/**/*.twig"],
            watch: None,
            dest: "",
        },
        Category::Images => Defaults {
            src: &["src/images/**/*"],
            watch: None,
            dest: "assets/images",
        },
    }
}

fn owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| (*p).to_owned()).collect()
}

impl PathsConfigRaw {
    fn raw(&self, category: Category) -> &AssetPathsRaw {
        match category {
            Category::Styles => &self.styles,
            Category::Scripts => &self.scripts,
            Category::Views => &self.views,
            Category::Images => &self.images,
        }
    }

    /// Merge with defaults and resolve directories against `root`.
    ///
    /// Category destinations default to subdirectories of the output root,
    /// so overriding `paths.dest` moves every category along with it.
    pub(crate) fn resolve(&self, root: &Path) -> PathTable {
        let dest = root.join(self.dest.as_deref().unwrap_or("dest"));
        let resolve_category = |category: Category| {
            let raw = self.raw(category);
            let defaults = defaults(category);
            AssetPaths {
                src: raw.src.clone().unwrap_or_else(|| owned(defaults.src)),
                watch: raw.watch.clone().or_else(|| defaults.watch.map(owned)),
                dest: match &raw.dest {
                    Some(d) => root.join(d),
                    None if defaults.dest.is_empty() => dest.clone(),
                    None => dest.join(defaults.dest),
                },
            }
        };

        PathTable {
            root: root.to_path_buf(),
            styles: resolve_category(Category::Styles),
            scripts: resolve_category(Category::Scripts),
            views: resolve_category(Category::Views),
            images: resolve_category(Category::Images),
            dest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_table_layout() {
        let table = PathTable::with_root(Path::new("/project"));

        assert_eq!(table.dest, PathBuf::from("/project/dest"));
        assert_eq!(table.styles.src, vec!["src/styles/index.css".to_owned()]);
        assert_eq!(table.styles.dest, PathBuf::from("/project/dest/assets/css"));
        assert_eq!(table.scripts.dest, PathBuf::from("/project/dest/assets/js"));
        assert_eq!(table.views.dest, PathBuf::from("/project/dest"));
        assert_eq!(
            table.images.dest,
            PathBuf::from("/project/dest/assets/images")
        );
    }

    #[test]
    fn test_watch_defaults_to_src() {
        let table = PathTable::with_root(Path::new("/project"));

        assert_eq!(
            table.styles.watch_patterns(),
            &["src/styles/**/*.css".to_owned()]
        );
        assert_eq!(table.scripts.watch_patterns(), table.scripts.src.as_slice());
        assert_eq!(table.views.watch_patterns(), table.views.src.as_slice());
    }

    #[test]
    fn test_dest_override_moves_categories() {
        let raw: PathsConfigRaw = toml::from_str(r#"dest = "public""#).unwrap();
        let table = raw.resolve(Path::new("/p"));

        assert_eq!(table.dest, PathBuf::from("/p/public"));
        assert_eq!(table.styles.dest, PathBuf::from("/p/public/assets/css"));
        assert_eq!(table.views.dest, PathBuf::from("/p/public"));
    }

    #[test]
    fn test_category_override() {
        let raw: PathsConfigRaw = toml::from_str(
            r#"
[scripts]
src = ["app/**/*.mjs"]
dest = "out/js"
"#,
        )
        .unwrap();
        let table = raw.resolve(Path::new("/p"));

        assert_eq!(table.scripts.src, vec!["app/**/*.mjs".to_owned()]);
        assert_eq!(table.scripts.dest, PathBuf::from("/p/out/js"));
        assert_eq!(table.scripts.watch_patterns(), &["app/**/*.mjs".to_owned()]);
    }

    #[test]
    fn test_category_round_trips_through_name() {
        for category in Category::ALL {
            assert_eq!(category.name().parse::<Category>(), Ok(category));
        }
        assert!("fonts".parse::<Category>().is_err());
    }
}
