//! Per-path event debouncing.
//!
//! Editors emit several events per save. Events for the same path are merged
//! until the path has been quiet for the debounce window.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::event::ChangeKind;

struct Pending {
    kind: ChangeKind,
    deadline: Instant,
}

/// Thread-safe event debouncer.
pub(crate) struct EventDebouncer {
    pending: Mutex<HashMap<PathBuf, Pending>>,
    window: Duration,
}

impl EventDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Record an event, restarting the path's debounce window.
    pub fn record(&self, path: PathBuf, kind: ChangeKind) {
        use std::collections::hash_map::Entry;

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let deadline = Instant::now() + self.window;

        match pending.entry(path) {
            Entry::Vacant(entry) => {
                entry.insert(Pending { kind, deadline });
            }
            Entry::Occupied(mut entry) => match Self::coalesce(entry.get().kind, kind) {
                Some(kind) => {
                    *entry.get_mut() = Pending { kind, deadline };
                }
                // Created then removed within one window: nothing happened.
                None => {
                    entry.remove();
                }
            },
        }
    }

    /// Merge two kinds for the same path. `None` drops the path entirely.
    #[allow(clippy::match_same_arms)]
    fn coalesce(existing: ChangeKind, new: ChangeKind) -> Option<ChangeKind> {
        use ChangeKind::{Created, Modified, Removed};

        match (existing, new) {
            (Created, Created) => Some(Created),
            (Created, Modified) => Some(Created),
            (Created, Removed) => None,

            (Modified, Created) => Some(Created),
            (Modified, Modified) => Some(Modified),
            (Modified, Removed) => Some(Removed),

            // Replaced in place (atomic save).
            (Removed, Created) => Some(Modified),
            (Removed, Modified) => Some(Removed),
            (Removed, Removed) => Some(Removed),
        }
    }

    /// Take every event whose window has elapsed, ordered by path.
    pub fn drain_ready(&self) -> Vec<(PathBuf, ChangeKind)> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let ready: Vec<PathBuf> = pending
            .iter()
            .filter(|(_, event)| event.deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        let mut events: Vec<_> = ready
            .into_iter()
            .filter_map(|path| pending.remove(&path).map(|event| (path, event.kind)))
            .collect();
        events.sort_by(|a, b| a.0.cmp(&b.0));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const WINDOW: Duration = Duration::from_millis(10);

    fn settle() {
        thread::sleep(Duration::from_millis(15));
    }

    #[test]
    fn test_event_held_until_window_elapses() {
        let debouncer = EventDebouncer::new(WINDOW);
        let path = PathBuf::from("/site/src/styles/index.css");

        debouncer.record(path.clone(), ChangeKind::Modified);
        assert!(debouncer.drain_ready().is_empty());

        settle();

        assert_eq!(debouncer.drain_ready(), vec![(path, ChangeKind::Modified)]);
        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn test_repeated_saves_coalesce() {
        let debouncer = EventDebouncer::new(WINDOW);
        let path = PathBuf::from("/site/src/scripts/app.js");

        debouncer.record(path.clone(), ChangeKind::Modified);
        debouncer.record(path.clone(), ChangeKind::Modified);
        debouncer.record(path.clone(), ChangeKind::Modified);
        settle();

        assert_eq!(debouncer.drain_ready(), vec![(path, ChangeKind::Modified)]);
    }

    #[test]
    fn test_created_then_removed_discards_both() {
        let debouncer = EventDebouncer::new(WINDOW);
        let path = PathBuf::from("/site/src/views/pages/tmp.twig");

        debouncer.record(path.clone(), ChangeKind::Created);
        debouncer.record(path, ChangeKind::Removed);
        settle();

        assert!(debouncer.drain_ready().is_empty());
    }

    #[test]
    fn test_removed_then_created_becomes_modified() {
        let debouncer = EventDebouncer::new(WINDOW);
        let path = PathBuf::from("/site/src/styles/index.css");

        debouncer.record(path.clone(), ChangeKind::Removed);
        debouncer.record(path.clone(), ChangeKind::Created);
        settle();

        assert_eq!(debouncer.drain_ready(), vec![(path, ChangeKind::Modified)]);
    }

    #[test]
    fn test_paths_are_independent_and_sorted() {
        let debouncer = EventDebouncer::new(WINDOW);

        debouncer.record(PathBuf::from("/b.css"), ChangeKind::Modified);
        debouncer.record(PathBuf::from("/a.css"), ChangeKind::Created);
        settle();

        assert_eq!(
            debouncer.drain_ready(),
            vec![
                (PathBuf::from("/a.css"), ChangeKind::Created),
                (PathBuf::from("/b.css"), ChangeKind::Modified),
            ]
        );
    }

    #[test]
    fn test_coalesce_all_combinations() {
        use ChangeKind::{Created, Modified, Removed};

        assert_eq!(EventDebouncer::coalesce(Created, Created), Some(Created));
        assert_eq!(EventDebouncer::coalesce(Created, Modified), Some(Created));
        assert_eq!(EventDebouncer::coalesce(Created, Removed), None);

        assert_eq!(EventDebouncer::coalesce(Modified, Created), Some(Created));
        assert_eq!(EventDebouncer::coalesce(Modified, Modified), Some(Modified));
        assert_eq!(EventDebouncer::coalesce(Modified, Removed), Some(Removed));

        assert_eq!(EventDebouncer::coalesce(Removed, Created), Some(Modified));
        assert_eq!(EventDebouncer::coalesce(Removed, Modified), Some(Removed));
        assert_eq!(EventDebouncer::coalesce(Removed, Removed), Some(Removed));
    }
}
