//! Task graph and orchestration for Assetline.
//!
//! A [`TaskGraph`] names which phases run: clean, a parallel build of any
//! set of [`Task`]s, then serving with live reload. The [`Orchestrator`]
//! drives a graph, reporting [`BuildState`] transitions to an [`Observer`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use assetline_config::Config;
//! use assetline_tasks::{Orchestrator, Silent, TaskGraph};
//!
//! let config = Arc::new(Config::load(None, None)?);
//! Orchestrator::new(config, Arc::new(Silent)).run(&TaskGraph::dev()).await?;
//! ```

mod bindings;
mod error;
mod graph;
mod orchestrator;
mod task;

pub use error::{TaskError, TaskFailure};
pub use graph::TaskGraph;
pub use orchestrator::{BuildState, Observer, Orchestrator, Silent};
pub use task::Task;

pub use assetline_pipeline::Report;
