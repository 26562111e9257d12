//! Change events delivered to watch handlers.

use std::path::{Path, PathBuf};

/// Kind of file change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// File was created.
    Created,
    /// File was modified.
    Modified,
    /// File was removed.
    Removed,
}

impl ChangeKind {
    /// Map a raw `notify` event kind. Access and other events are ignored.
    pub(crate) fn from_notify(kind: notify::EventKind) -> Option<Self> {
        match kind {
            notify::EventKind::Create(_) => Some(Self::Created),
            notify::EventKind::Modify(_) => Some(Self::Modified),
            notify::EventKind::Remove(_) => Some(Self::Removed),
            _ => None,
        }
    }
}

/// A debounced batch of changes matching one binding.
///
/// `paths` and `kinds` are index-aligned. Paths are relative to the watch
/// root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeEvent {
    pub paths: Vec<PathBuf>,
    pub kinds: Vec<ChangeKind>,
}

impl ChangeEvent {
    pub(crate) fn push(&mut self, path: PathBuf, kind: ChangeKind) {
        self.paths.push(path);
        self.kinds.push(kind);
    }

    /// Iterate over `(path, kind)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, ChangeKind)> {
        self.paths
            .iter()
            .map(PathBuf::as_path)
            .zip(self.kinds.iter().copied())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_from_notify() {
        assert_eq!(
            ChangeKind::from_notify(notify::EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Created)
        );
        assert_eq!(
            ChangeKind::from_notify(notify::EventKind::Modify(ModifyKind::Any)),
            Some(ChangeKind::Modified)
        );
        assert_eq!(
            ChangeKind::from_notify(notify::EventKind::Remove(RemoveKind::File)),
            Some(ChangeKind::Removed)
        );
        assert_eq!(ChangeKind::from_notify(notify::EventKind::Other), None);
    }

    #[test]
    fn test_iter_pairs_paths_with_kinds() {
        let mut event = ChangeEvent::default();
        event.push(PathBuf::from("a.css"), ChangeKind::Created);
        event.push(PathBuf::from("b.css"), ChangeKind::Removed);

        let pairs: Vec<_> = event.iter().collect();

        assert_eq!(
            pairs,
            vec![
                (Path::new("a.css"), ChangeKind::Created),
                (Path::new("b.css"), ChangeKind::Removed),
            ]
        );
        assert_eq!(event.len(), 2);
    }
}
