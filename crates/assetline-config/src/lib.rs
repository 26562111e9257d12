//! Configuration management for Assetline.
//!
//! Parses `assetline.toml` with serde and provides auto-discovery of the
//! config file in parent directories. Every setting has a default matching
//! the conventional project layout, so a project without a config file
//! builds `src/` into `dest/`.
//!
//! CLI settings can be applied during load via [`CliSettings`].

mod paths;

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use paths::{AssetPaths, Category, PathTable};
use paths::PathsConfigRaw;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override preview server host.
    pub host: Option<String>,
    /// Override preview server port.
    pub port: Option<u16>,
    /// Override live reload enabled flag.
    pub live_reload_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "assetline.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preview server configuration.
    pub server: ServerConfig,
    /// Path table as written in TOML (relative strings).
    paths: PathsConfigRaw,
    /// Style pipeline settings.
    pub styles: StylesConfig,
    /// Script pipeline settings.
    pub scripts: ScriptsConfig,
    /// View pipeline settings.
    pub views: ViewsConfig,
    /// Image pipeline settings.
    pub images: ImagesConfig,
    /// Watcher settings.
    pub watch: WatchConfig,

    /// Resolved path table (set after loading).
    #[serde(skip)]
    pub path_table: PathTable,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Preview server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Whether connected browsers receive reload events.
    pub live_reload: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            live_reload: true,
        }
    }
}

/// Style pipeline configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    /// Browserslist queries used for lowering and vendor prefixing.
    pub browsers: Vec<String>,
    /// Globs scanned for utility class candidates.
    pub content: Vec<String>,
    /// File re-deposited when a view changes (relative to the project root).
    pub resync: Option<String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            browsers: vec!["defaults".to_owned()],
            content: vec![
                "src/views/**/*.twig".to_owned(),
                "src/scripts/**/*.js".to_owned(),
            ],
            resync: None,
        }
    }
}

/// Script pipeline configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// ECMAScript version syntax is lowered to, such as `es2019`.
    pub target: String,
    /// Whether modules under `node_modules` are lowered as well.
    pub transpile_dependencies: bool,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            target: "es2019".to_owned(),
            transpile_dependencies: false,
        }
    }
}

/// View pipeline configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    /// Template root used to resolve `extends` and `include` (relative).
    pub root: String,
    /// Parent directories kept when flattening: `[leading, trailing]`.
    pub flatten: [usize; 2],
    /// Directory names removed from output routes.
    pub strip_segments: Vec<String>,
    /// Optional JSON file whose top-level object becomes the template context.
    pub data: Option<String>,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            root: "src/views".to_owned(),
            flatten: [1, 2],
            strip_segments: vec!["Index".to_owned(), "Top".to_owned()],
            data: None,
        }
    }
}

/// Image pipeline configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// PNG quality range `[min, max]` in `0.0..=1.0`.
    pub png_quality: [f32; 2],
    /// JPEG quality in `1..=100`.
    pub jpeg_quality: u8,
    /// GIF optimization level in `1..=3`.
    pub gif_optimization: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            png_quality: [0.6, 0.7],
            jpeg_quality: 70,
            gif_optimization: 3,
        }
    }
}

/// Watcher configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period before a batch of changes runs its task.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 200 }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Absolute directory holding the config file at `path`.
///
/// A bare file name such as `assetline.toml` has an empty parent, which
/// resolves to the current directory.
fn config_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let absolute = std::path::absolute(path)?;
    Ok(absolute
        .parent()
        .map_or_else(|| absolute.clone(), Path::to_path_buf))
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `assetline.toml` in current directory and parents,
    /// falling back to defaults rooted at the current directory.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or validation rejects a value.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string with paths rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_toml(content: &str, root: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.resolve_paths(root);
        config.validate()?;
        Ok(config)
    }

    /// Project root every relative setting resolves against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.path_table.root
    }

    /// Absolute path of the file re-deposited by the style resync hook.
    ///
    /// Defaults to the first style source when `styles.resync` is unset.
    #[must_use]
    pub fn resync_file(&self) -> Option<PathBuf> {
        self.styles
            .resync
            .as_deref()
            .or_else(|| self.path_table.styles.src.first().map(String::as_str))
            .map(|p| self.root().join(p))
    }

    /// Absolute template root for the view pipeline.
    #[must_use]
    pub fn views_root(&self) -> PathBuf {
        self.root().join(&self.views.root)
    }

    /// Absolute path of the view data file, if configured.
    #[must_use]
    pub fn views_data(&self) -> Option<PathBuf> {
        self.views.data.as_ref().map(|p| self.root().join(p))
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(live_reload) = settings.live_reload_enabled {
            self.server.live_reload = live_reload;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            paths: PathsConfigRaw::default(),
            styles: StylesConfig::default(),
            scripts: ScriptsConfig::default(),
            views: ViewsConfig::default(),
            images: ImagesConfig::default(),
            watch: WatchConfig::default(),
            path_table: PathTable::with_root(base),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.resolve_paths(&config_dir(path)?);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Resolve the raw `[paths]` section into the path table.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.path_table = self.paths.resolve(config_dir);
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_paths()?;
        require_non_empty(&self.scripts.target, "scripts.target")?;
        self.validate_views()?;
        self.validate_images()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Every destination must live strictly inside the project root, since
    /// the clean step deletes the output root recursively.
    fn validate_paths(&self) -> Result<(), ConfigError> {
        let table = &self.path_table;
        let inside_root = |dir: &Path| {
            dir.starts_with(&table.root)
                && dir != table.root
                && !dir
                    .components()
                    .any(|c| matches!(c, std::path::Component::ParentDir))
        };

        if !inside_root(&table.dest) {
            return Err(ConfigError::Validation(format!(
                "paths.dest must be a subdirectory of the project root, got {}",
                table.dest.display()
            )));
        }

        for (category, paths) in table.iter() {
            if paths.src.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "paths.{category}.src cannot be empty"
                )));
            }
            if !inside_root(&paths.dest) {
                return Err(ConfigError::Validation(format!(
                    "paths.{category}.dest must be inside the project root, got {}",
                    paths.dest.display()
                )));
            }
        }

        Ok(())
    }

    fn validate_views(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.views.root, "views.root")?;
        if self.views.strip_segments.iter().any(String::is_empty) {
            return Err(ConfigError::Validation(
                "views.strip_segments cannot contain empty names".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_images(&self) -> Result<(), ConfigError> {
        let [min, max] = self.images.png_quality;
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) {
            return Err(ConfigError::Validation(
                "images.png_quality values must be between 0.0 and 1.0".to_owned(),
            ));
        }
        if min > max {
            return Err(ConfigError::Validation(
                "images.png_quality minimum cannot exceed maximum".to_owned(),
            ));
        }
        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Validation(
                "images.jpeg_quality must be between 1 and 100".to_owned(),
            ));
        }
        if !(1..=3).contains(&self.images.gif_optimization) {
            return Err(ConfigError::Validation(
                "images.gif_optimization must be 1, 2 or 3".to_owned(),
            ));
        }
        Ok(())
    }
}
