//! Syntax lowering with `oxc`.
//!
//! Each module is parsed, lowered to the configured ECMAScript target and
//! printed back before the bundler rewrites its imports and exports. Module
//! syntax itself is left alone. Files under `node_modules` are only lowered
//! when `scripts.transpile_dependencies` is set.

use std::path::{Component, Path};

use assetline_config::ScriptsConfig;

use oxc::allocator::Allocator;
use oxc::codegen::Codegen;
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};

use super::ScriptError;

/// Lowers syntax newer than a target such as `es2019`.
pub(crate) struct Transpiler {
    options: TransformOptions,
    dependencies: bool,
}

impl Transpiler {
    pub(crate) fn new(settings: &ScriptsConfig) -> Result<Self, ScriptError> {
        let target = settings.target.as_str();
        let options =
            TransformOptions::from_target(target).map_err(|message| ScriptError::Target {
                target: target.to_owned(),
                message,
            })?;
        Ok(Self {
            options,
            dependencies: settings.transpile_dependencies,
        })
    }

    /// Whether the module at `path` is lowered.
    pub(crate) fn applies_to(&self, path: &Path) -> bool {
        self.dependencies
            || !path
                .components()
                .any(|c| c == Component::Normal("node_modules".as_ref()))
    }

    /// Lower `source`, the text of the module at `path`.
    pub(crate) fn transpile(&self, path: &Path, source: &str) -> Result<String, ScriptError> {
        let allocator = Allocator::default();
        let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::mjs());

        let parsed = Parser::new(&allocator, source, source_type).parse();
        if let Some(error) = parsed.errors.first() {
            return Err(syntax_error(path, error));
        }
        let mut program = parsed.program;

        let built = SemanticBuilder::new()
            .with_excess_capacity(2.0)
            .build(&program);
        if let Some(error) = built.errors.first() {
            return Err(syntax_error(path, error));
        }
        let scoping = built.semantic.into_scoping();

        let transformed = Transformer::new(&allocator, path, &self.options)
            .build_with_scoping(scoping, &mut program);
        if let Some(error) = transformed.errors.first() {
            return Err(syntax_error(path, error));
        }

        Ok(Codegen::new().build(&program).code)
    }
}

fn syntax_error(path: &Path, error: &impl std::fmt::Display) -> ScriptError {
    ScriptError::Syntax {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
