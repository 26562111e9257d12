//! The watcher and its bindings.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::debouncer::EventDebouncer;
use crate::event::{ChangeEvent, ChangeKind};
use crate::patterns::PatternSet;
use crate::WatchError;

/// Interval at which settled events are drained from the debouncer.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Capacity of the channel between the platform watcher thread and the runtime.
const RAW_EVENT_CAPACITY: usize = 100;

/// Result returned by watch handlers. Errors are logged.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

struct Binding {
    id: u64,
    patterns: PatternSet,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

#[derive(Default)]
struct Registry {
    bindings: Mutex<Vec<Binding>>,
    next_id: AtomicU64,
}

impl Registry {
    fn insert(&self, patterns: PatternSet, tx: mpsc::UnboundedSender<ChangeEvent>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Binding { id, patterns, tx });
        id
    }

    fn remove(&self, id: u64) {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|b| b.id != id);
    }

    fn len(&self) -> usize {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Queue a batch for every binding with at least one matching path.
    fn dispatch(&self, changes: &[(PathBuf, ChangeKind)]) {
        let bindings = self.bindings.lock().unwrap_or_else(PoisonError::into_inner);
        for binding in bindings.iter() {
            let mut event = ChangeEvent::default();
            for (path, kind) in changes {
                if binding.patterns.matches(path) {
                    event.push(path.clone(), *kind);
                }
            }
            if !event.is_empty() && binding.tx.send(event).is_err() {
                tracing::debug!(binding = binding.id, "Watch binding already closed");
            }
        }
    }
}

/// Debounced, glob-filtered file watcher rooted at a project directory.
pub struct Watcher {
    root: PathBuf,
    /// `root` plus its canonical form; platforms report either.
    roots: Vec<PathBuf>,
    debounce: Duration,
    registry: Arc<Registry>,
}

impl Watcher {
    /// Create a watcher for `root`. Nothing is watched until [`start`](Self::start).
    pub fn new(root: impl Into<PathBuf>, debounce: Duration) -> Self {
        let root = root.into();
        let mut roots = vec![root.clone()];
        if let Ok(canonical) = root.canonicalize()
            && canonical != root
        {
            roots.push(canonical);
        }
        Self {
            root,
            roots,
            debounce,
            registry: Arc::default(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of live bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.registry.len()
    }

    /// Register `handler` for changes matching `patterns` (relative to the root).
    ///
    /// The handler receives one [`ChangeEvent`] per debounced batch. It runs on
    /// the blocking pool; batches for the same binding are handled one at a
    /// time, in order. Must be called within a Tokio runtime.
    pub fn subscribe<F>(&self, patterns: &[String], handler: F) -> Result<Subscription, WatchError>
    where
        F: Fn(&ChangeEvent) -> HandlerResult + Send + Sync + 'static,
    {
        let patterns = PatternSet::new(patterns)?;
        let (tx, mut rx) = mpsc::unbounded_channel::<ChangeEvent>();
        let handler = Arc::new(handler);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let handler = Arc::clone(&handler);
                match tokio::task::spawn_blocking(move || (*handler)(&event)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, "Watch handler failed"),
                    Err(e) => tracing::error!(error = %e, "Watch handler panicked"),
                }
            }
        });

        let id = self.registry.insert(patterns, tx);
        Ok(Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        })
    }

    /// Start watching the root recursively.
    ///
    /// Raw events are debounced per path; settled paths are grouped into one
    /// batch per binding. Watching stops when the returned handle is dropped.
    pub fn start(&self) -> Result<WatchHandle, WatchError> {
        let (tx, mut rx) = mpsc::channel::<notify::Event>(RAW_EVENT_CAPACITY);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(e) => tracing::warn!(error = %e, "File watcher error"),
            }
        })?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        let debouncer = Arc::new(EventDebouncer::new(self.debounce));

        let record = {
            let debouncer = Arc::clone(&debouncer);
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    let Some(kind) = ChangeKind::from_notify(event.kind) else {
                        continue;
                    };
                    for path in event.paths {
                        debouncer.record(path, kind);
                    }
                }
            })
        };

        let drain = {
            let registry = Arc::clone(&self.registry);
            let roots = self.roots.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(DRAIN_INTERVAL);
                loop {
                    interval.tick().await;
                    let ready = debouncer.drain_ready();
                    if ready.is_empty() {
                        continue;
                    }
                    let changes = relative_changes(&roots, ready);
                    tracing::debug!(count = changes.len(), "Dispatching file changes");
                    registry.dispatch(&changes);
                }
            })
        };

        tracing::info!(root = %self.root.display(), "Watching for changes");
        Ok(WatchHandle {
            _watcher: watcher,
            tasks: vec![record, drain],
        })
    }

    #[cfg(test)]
    fn dispatch(&self, changes: Vec<(PathBuf, ChangeKind)>) {
        self.registry
            .dispatch(&relative_changes(&self.roots, changes));
    }
}

/// Rewrite absolute paths relative to the first root containing them.
/// Paths outside every root are dropped.
fn relative_changes(
    roots: &[PathBuf],
    changes: Vec<(PathBuf, ChangeKind)>,
) -> Vec<(PathBuf, ChangeKind)> {
    changes
        .into_iter()
        .filter_map(|(path, kind)| {
            roots
                .iter()
                .find_map(|root| path.strip_prefix(root).ok())
                .map(|relative| (relative.to_path_buf(), kind))
        })
        .collect()
}

/// A registered binding. Dropping it unregisters the handler.
#[must_use = "dropping a subscription unregisters it"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

/// Running watch. Dropping it stops the platform watcher and drain tasks.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
