//! Ordered, short-circuiting chain of named stages.
//!
//! A [`Pipeline`] owns a list of stages that each take the current value and
//! return the next one. Stages run strictly in declaration order; the first
//! failure stops the run and is reported as a [`StageError`] carrying the
//! stage name.

use std::path::Path;
use std::time::Instant;

use crate::error::{BoxError, StageError};

type StageFn<'a, T> = Box<dyn Fn(T) -> Result<T, BoxError> + 'a>;

/// Named sequence of transforms over a value of type `T`.
pub struct Pipeline<'a, T> {
    name: &'static str,
    stages: Vec<(&'static str, StageFn<'a, T>)>,
}

impl<'a, T> Pipeline<'a, T> {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            stages: Vec::new(),
        }
    }

    /// Append a stage.
    #[must_use]
    pub fn stage<F, E>(mut self, name: &'static str, f: F) -> Self
    where
        F: Fn(T) -> Result<T, E> + 'a,
        E: Into<BoxError>,
    {
        self.stages
            .push((name, Box::new(move |value| f(value).map_err(Into::into))));
        self
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|(name, _)| *name).collect()
    }

    /// Run every stage over `input`.
    ///
    /// `subject` names the file being processed; it only appears in logs and
    /// in the returned error.
    pub fn run(&self, subject: &Path, input: T) -> Result<T, StageError> {
        let mut value = input;
        for &(stage, ref f) in &self.stages {
            let start = Instant::now();
            value = f(value).map_err(|source| StageError {
                pipeline: self.name,
                stage,
                subject: subject.to_path_buf(),
                source,
            })?;
            tracing::debug!(
                pipeline = self.name,
                stage,
                path = %subject.display(),
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Stage complete"
            );
        }
        Ok(value)
    }
}
