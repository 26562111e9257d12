//! Style resync hook.
//!
//! Utility classes are generated from the view sources, so a view edit must
//! rebuild the stylesheet. The hook rewrites the resync file with its own
//! contents and a fresh mtime, which wakes the style watcher, then asks the
//! preview server for a full reload.

use std::fs::{self, File};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::PipelineError;
use crate::BuildContext;

/// Re-deposit the resync file and request a full reload.
///
/// The reload is requested even when the file cannot be rewritten; the
/// rewrite error is returned afterwards.
pub fn run(ctx: &BuildContext) -> Result<Option<PathBuf>, PipelineError> {
    let touched = match ctx.config().resync_file() {
        Some(path) => touch(path).map(Some),
        None => Ok(None),
    };
    ctx.sink().reload();
    touched
}

fn touch(path: PathBuf) -> Result<PathBuf, PipelineError> {
    let contents = fs::read(&path).map_err(PipelineError::io(&path))?;
    fs::write(&path, contents).map_err(PipelineError::io(&path))?;
    File::options()
        .write(true)
        .open(&path)
        .and_then(|file| file.set_modified(SystemTime::now()))
        .map_err(PipelineError::io(&path))?;
    tracing::debug!(path = %path.display(), "Re-deposited style source");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Signal;
    use crate::testing::{context, write};
    use std::time::Duration;

    #[test]
    fn test_resync_rewrites_unchanged_with_new_mtime_and_reloads() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "src/styles/index.css", "a { color: red; }");
        let entry = temp.path().join("src/styles/index.css");
        let old = SystemTime::now() - Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&entry)
            .unwrap()
            .set_modified(old)
            .unwrap();
        let (ctx, sink) = context(temp.path());

        let touched = run(&ctx).unwrap();

        assert_eq!(touched, Some(entry.clone()));
        assert_eq!(fs::read_to_string(&entry).unwrap(), "a { color: red; }");
        assert!(fs::metadata(&entry).unwrap().modified().unwrap() > old);
        assert_eq!(sink.signals(), vec![Signal::Reload]);
    }

    #[test]
    fn test_missing_resync_file_still_reloads() {
        let temp = tempfile::tempdir().unwrap();
        let (ctx, sink) = context(temp.path());

        let err = run(&ctx).unwrap_err();

        assert!(matches!(err, PipelineError::Io { .. }));
        assert_eq!(sink.signals(), vec![Signal::Reload]);
    }
}
