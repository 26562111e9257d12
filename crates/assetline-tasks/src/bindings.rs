//! Watch bindings of the serving phase.
//!
//! | Glob           | Action                                   |
//! |----------------|------------------------------------------|
//! | `styles.watch` | style pipeline                           |
//! | `scripts.watch`| script pipeline                          |
//! | `images.watch` | image pipeline                           |
//! | `views.watch`  | view pipeline                            |
//! | `views.watch`  | re-deposit the style entry, full reload  |
//!
//! The two view bindings are independent; neither waits for the other.

use assetline_config::Category;
use assetline_pipeline::BuildContext;
use assetline_watch::{Subscription, WatchError, Watcher};

use crate::task::Task;

/// Register every binding on `watcher`. Dropping the result unregisters them.
pub fn subscribe(watcher: &Watcher, ctx: &BuildContext) -> Result<Vec<Subscription>, WatchError> {
    let paths = ctx.paths();
    let mut subscriptions = Vec::with_capacity(Category::ALL.len() + 1);

    for category in Category::ALL {
        subscriptions.push(bind(watcher, ctx, paths.get(category).watch_patterns(), Task::Build(category))?);
    }
    subscriptions.push(bind(watcher, ctx, paths.views.watch_patterns(), Task::Resync)?);

    Ok(subscriptions)
}

fn bind(
    watcher: &Watcher,
    ctx: &BuildContext,
    patterns: &[String],
    task: Task,
) -> Result<Subscription, WatchError> {
    let ctx = ctx.clone();
    watcher.subscribe(patterns, move |event| {
        tracing::info!(task = %task, changed = event.len(), "Change detected");
        let report = task.run(&ctx)?;
        tracing::debug!(task = %task, files = report.written.len(), "Rebuilt");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetline_config::Config;
    use assetline_pipeline::{RecordingSink, Signal};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    async fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        false
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_five_bindings_registered() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = BuildContext::new(
            Arc::new(Config::default_with_base(temp.path())),
            Arc::new(RecordingSink::new()),
        );
        let watcher = Watcher::new(temp.path(), Duration::from_millis(20));

        let subscriptions = subscribe(&watcher, &ctx).unwrap();

        assert_eq!(subscriptions.len(), 5);
        assert_eq!(watcher.binding_count(), 5);
        drop(subscriptions);
        assert_eq!(watcher.binding_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_view_change_rerenders_resyncs_and_reloads() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "src/styles/index.css", ".a { color: red; }\n");
        write(temp.path(), "src/views/pages/index.twig", "<p>one</p>");
        let sink = Arc::new(RecordingSink::new());
        let ctx = BuildContext::new(
            Arc::new(Config::default_with_base(temp.path())),
            Arc::clone(&sink) as _,
        );
        let watcher = Watcher::new(temp.path(), Duration::from_millis(20));
        let _subscriptions = subscribe(&watcher, &ctx).unwrap();
        let _handle = watcher.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        write(temp.path(), "src/views/pages/index.twig", "<p>two</p>");

        let page = temp.path().join("dest/index.html");
        assert!(
            wait_for(|| fs::read_to_string(&page).is_ok_and(|html| html == "<p>two</p>")).await
        );
        assert!(wait_for(|| sink.signals().contains(&Signal::Reload)).await);
        // The re-deposited entry wakes the style binding, which injects.
        assert!(
            wait_for(|| sink
                .signals()
                .contains(&Signal::Inject("/assets/css/styles.bundle.css".to_owned())))
            .await
        );
    }
}
