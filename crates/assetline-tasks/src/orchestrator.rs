//! Build orchestration.
//!
//! Runs a [`TaskGraph`] through the phases
//! `Cleaning → Building → Serving`. Building starts only after a successful
//! clean. Build tasks run in parallel on the blocking pool; a failure lets
//! its siblings finish before the run stops with every failure listed.
//! Serving starts only after every build task succeeded and lasts until the
//! shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use assetline_config::Config;
use assetline_pipeline::{BuildContext, Report};
use assetline_server::{LiveReloadHub, Server, ServerConfig};
use assetline_watch::Watcher;
use tokio::task::JoinSet;

use crate::bindings;
use crate::error::{TaskError, TaskFailure};
use crate::graph::TaskGraph;
use crate::task::Task;

/// Phase of an orchestrated run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Cleaning,
    Building,
    Serving,
    Done,
    Failed,
}

/// Receives progress of an orchestrated run.
pub trait Observer: Send + Sync {
    fn state_changed(&self, _state: BuildState) {}

    fn task_finished(&self, _task: Task, _report: &Report, _elapsed: Duration) {}

    fn task_failed(&self, _failure: &TaskFailure) {}

    fn serving(&self, _address: SocketAddr) {}
}

/// Observer that ignores everything.
pub struct Silent;

impl Observer for Silent {}

/// Runs task graphs against one configuration.
pub struct Orchestrator {
    config: Arc<Config>,
    hub: LiveReloadHub,
    context: BuildContext,
    observer: Arc<dyn Observer>,
    state: Mutex<BuildState>,
}

impl Orchestrator {
    /// Create an orchestrator. Pipelines signal pages through a fresh hub.
    pub fn new(config: Arc<Config>, observer: Arc<dyn Observer>) -> Self {
        let hub = LiveReloadHub::new();
        let context = BuildContext::new(Arc::clone(&config), Arc::new(hub.clone()));
        Self {
            config,
            hub,
            context,
            observer,
            state: Mutex::new(BuildState::Idle),
        }
    }

    #[must_use]
    pub fn state(&self) -> BuildState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn hub(&self) -> &LiveReloadHub {
        &self.hub
    }

    /// Run `graph`, serving (if requested) until Ctrl-C.
    pub async fn run(&self, graph: &TaskGraph) -> Result<(), TaskError> {
        self.run_until(graph, assetline_server::shutdown_signal()).await
    }

    /// Run `graph`, serving (if requested) until `shutdown` resolves.
    pub async fn run_until<F>(&self, graph: &TaskGraph, shutdown: F) -> Result<(), TaskError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let result = self.run_phases(graph, shutdown).await;
        self.transition(if result.is_ok() {
            BuildState::Done
        } else {
            BuildState::Failed
        });
        result
    }

    async fn run_phases<F>(&self, graph: &TaskGraph, shutdown: F) -> Result<(), TaskError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if graph.clean {
            self.transition(BuildState::Cleaning);
            let ctx = self.context.clone();
            let start = Instant::now();
            let report = tokio::task::spawn_blocking(move || Task::Clean.run(&ctx))
                .await?
                .map_err(TaskError::Clean)?;
            self.observer
                .task_finished(Task::Clean, &report, start.elapsed());
        }

        if !graph.build.is_empty() {
            self.transition(BuildState::Building);
            self.build(&graph.build).await?;
        }

        if graph.serve {
            self.transition(BuildState::Serving);
            self.serve(shutdown).await?;
        }
        Ok(())
    }

    /// Run every task in parallel and wait for all of them.
    async fn build(&self, tasks: &[Task]) -> Result<(), TaskError> {
        let mut set = JoinSet::new();
        for &task in tasks {
            let ctx = self.context.clone();
            set.spawn_blocking(move || {
                let start = Instant::now();
                (task, task.run(&ctx), start.elapsed())
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (task, result, elapsed) = joined?;
            match result {
                Ok(report) => {
                    tracing::info!(
                        task = %task,
                        files = report.written.len(),
                        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                        "Task finished"
                    );
                    self.observer.task_finished(task, &report, elapsed);
                }
                Err(error) => {
                    let failure = TaskFailure { task, error };
                    tracing::error!(task = %task, error = %failure.error, "Task failed");
                    self.observer.task_failed(&failure);
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            failures.sort_by_key(|f| f.task);
            Err(TaskError::Build(failures))
        }
    }

    /// Serve the output directory and rebuild on changes until `shutdown`.
    async fn serve<F>(&self, shutdown: F) -> Result<(), TaskError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server = Server::bind(
            ServerConfig::from_config(&self.config),
            Some(self.hub.clone()),
        )
        .await?;
        self.observer.serving(server.local_addr()?);

        let watcher = Watcher::new(
            self.config.root(),
            Duration::from_millis(self.config.watch.debounce_ms),
        );
        let _subscriptions = bindings::subscribe(&watcher, &self.context)?;
        let _watch = watcher.start()?;

        server.serve(shutdown).await?;
        Ok(())
    }

    fn transition(&self, next: BuildState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(from = ?*state, to = ?next, "Build state changed");
        *state = next;
        drop(state);
        self.observer.state_changed(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetline_config::Category;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;

    #[derive(Default)]
    struct Recorder {
        states: Mutex<Vec<BuildState>>,
        finished: Mutex<Vec<Task>>,
        address: Mutex<Option<SocketAddr>>,
    }

    impl Observer for Recorder {
        fn state_changed(&self, state: BuildState) {
            self.states.lock().unwrap().push(state);
        }

        fn task_finished(&self, task: Task, _report: &Report, _elapsed: Duration) {
            self.finished.lock().unwrap().push(task);
        }

        fn serving(&self, address: SocketAddr) {
            *self.address.lock().unwrap() = Some(address);
        }
    }

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn project(root: &Path) {
        write(root, "src/styles/index.css", ".a { color: red; }\n");
        write(root, "src/scripts/app.js", "export const answer = 42;\n");
        write(root, "src/views/pages/index.twig", "<body><p class=\"a\">hi</p></body>\n");
        write(root, "src/images/note.txt", "image placeholder");
    }

    fn orchestrator(config: Config) -> (Orchestrator, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let orchestrator = Orchestrator::new(Arc::new(config), Arc::clone(&recorder) as _);
        (orchestrator, recorder)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_cleans_then_builds_everything() {
        let temp = tempfile::tempdir().unwrap();
        project(temp.path());
        write(temp.path(), "dest/stale.html", "old");
        let (orchestrator, recorder) = orchestrator(Config::default_with_base(temp.path()));

        orchestrator.run(&TaskGraph::build()).await.unwrap();

        let dest = temp.path().join("dest");
        assert!(!dest.join("stale.html").exists());
        assert!(dest.join("assets/css/styles.bundle.css").exists());
        assert!(dest.join("assets/css/styles.bundle.min.css").exists());
        assert!(dest.join("assets/js/app.bundle.js").exists());
        assert!(dest.join("assets/js/app.bundle.min.js").exists());
        assert!(dest.join("index.html").exists());
        assert!(dest.join("assets/images/note.txt").exists());
        assert_eq!(
            *recorder.states.lock().unwrap(),
            vec![BuildState::Cleaning, BuildState::Building, BuildState::Done]
        );
        let mut finished = recorder.finished.lock().unwrap().clone();
        finished.sort();
        assert_eq!(
            finished,
            vec![
                Task::Clean,
                Task::Build(Category::Styles),
                Task::Build(Category::Scripts),
                Task::Build(Category::Views),
                Task::Build(Category::Images),
            ]
        );
        assert_eq!(orchestrator.state(), BuildState::Done);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_task_lets_siblings_finish() {
        let temp = tempfile::tempdir().unwrap();
        project(temp.path());
        write(temp.path(), "src/views/pages/broken.twig", "{% if %}");
        let (orchestrator, recorder) = orchestrator(Config::default_with_base(temp.path()));

        let err = orchestrator.run(&TaskGraph::dev()).await.unwrap_err();

        let TaskError::Build(failures) = err else {
            panic!("expected build failure, got {err:?}");
        };
        assert_eq!(
            failures.iter().map(|f| f.task).collect::<Vec<_>>(),
            vec![Task::Build(Category::Views)]
        );
        let dest = temp.path().join("dest");
        assert!(dest.join("assets/css/styles.bundle.min.css").exists());
        assert!(dest.join("assets/js/app.bundle.min.js").exists());
        assert!(dest.join("assets/images/note.txt").exists());
        // Serving never starts.
        assert!(recorder.address.lock().unwrap().is_none());
        assert_eq!(
            *recorder.states.lock().unwrap(),
            vec![BuildState::Cleaning, BuildState::Building, BuildState::Failed]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unsafe_clean_stops_before_building() {
        let temp = tempfile::tempdir().unwrap();
        project(temp.path());
        let mut config = Config::default_with_base(temp.path());
        config.path_table.dest = temp.path().to_path_buf();
        let (orchestrator, recorder) = orchestrator(config);

        let err = orchestrator.run(&TaskGraph::build()).await.unwrap_err();

        assert!(matches!(err, TaskError::Clean(_)));
        assert!(temp.path().join("src/styles/index.css").exists());
        assert_eq!(
            *recorder.states.lock().unwrap(),
            vec![BuildState::Cleaning, BuildState::Failed]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_serve_starts_after_build_and_stops_on_shutdown() {
        let temp = tempfile::tempdir().unwrap();
        project(temp.path());
        let mut config = Config::default_with_base(temp.path());
        config.server.port = 0;
        config.watch.debounce_ms = 20;
        let (orchestrator, recorder) = orchestrator(config);

        orchestrator
            .run_until(&TaskGraph::dev(), tokio::time::sleep(Duration::from_millis(200)))
            .await
            .unwrap();

        assert!(recorder.address.lock().unwrap().is_some());
        assert_eq!(
            *recorder.states.lock().unwrap(),
            vec![
                BuildState::Cleaning,
                BuildState::Building,
                BuildState::Serving,
                BuildState::Done
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_single_task_skips_clean() {
        let temp = tempfile::tempdir().unwrap();
        project(temp.path());
        write(temp.path(), "dest/keep.txt", "kept");
        let (orchestrator, recorder) = orchestrator(Config::default_with_base(temp.path()));

        orchestrator
            .run(&TaskGraph::single(Task::Build(Category::Scripts)))
            .await
            .unwrap();

        assert!(temp.path().join("dest/keep.txt").exists());
        assert!(temp.path().join("dest/assets/js/app.bundle.js").exists());
        assert_eq!(
            *recorder.finished.lock().unwrap(),
            vec![Task::Build(Category::Scripts)]
        );
    }

    #[test]
    fn test_state_survives_poisoned_lock() {
        let temp = tempfile::tempdir().unwrap();
        let (orchestrator, recorder) = orchestrator(Config::default_with_base(temp.path()));
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = orchestrator.state.lock().unwrap();
            panic!("observer panicked");
        }));
        assert!(poisoned.is_err());
        assert!(orchestrator.state.is_poisoned());

        orchestrator.transition(BuildState::Cleaning);

        assert_eq!(orchestrator.state(), BuildState::Cleaning);
        assert_eq!(*recorder.states.lock().unwrap(), vec![BuildState::Cleaning]);
    }
}
