//! Output routes for rendered pages.

use std::path::{Path, PathBuf};

/// Output path of a page template at `relative` (relative to its glob base).
///
/// Parent directories are flattened to the first `flatten[0]` and last
/// `flatten[1]` ones, then every directory named in `strip` is removed.
/// The extension becomes `.html`.
pub(crate) fn output_path(relative: &Path, flatten: [usize; 2], strip: &[String]) -> PathBuf {
    let parents: Vec<String> = relative
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    let [leading, trailing] = flatten;
    let kept: Vec<&String> = if leading + trailing >= parents.len() {
        parents.iter().collect()
    } else {
        parents[..leading]
            .iter()
            .chain(&parents[parents.len() - trailing..])
            .collect()
    };

    let mut out: PathBuf = kept
        .into_iter()
        .filter(|segment| !strip.contains(*segment))
        .collect();
    if let Some(stem) = relative.file_stem() {
        out.push(stem);
    }
    out.set_extension("html");
    out
}

/// URL route of an output path: `blog/post.html` becomes `/blog/post.html`.
pub(crate) fn route(output: &Path) -> String {
    let segments: Vec<_> = output
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn markers() -> Vec<String> {
        vec!["Index".to_owned(), "Top".to_owned()]
    }

    fn out(relative: &str) -> PathBuf {
        output_path(Path::new(relative), [1, 2], &markers())
    }

    #[test]
    fn test_marker_segments_stripped() {
        assert_eq!(out("blog/Index/post.twig"), PathBuf::from("blog/post.html"));
        assert_eq!(out("Top/index.twig"), PathBuf::from("index.html"));
        assert_eq!(out("about.twig"), PathBuf::from("about.html"));
    }

    #[test]
    fn test_deep_paths_keep_first_and_last_two_parents() {
        assert_eq!(
            out("a/b/c/d/e/page.twig"),
            PathBuf::from("a/d/e/page.html")
        );
        assert_eq!(out("a/b/c/page.twig"), PathBuf::from("a/b/c/page.html"));
    }

    #[test]
    fn test_markers_stripped_after_flattening() {
        assert_eq!(
            out("shop/x/y/Index/item.twig"),
            PathBuf::from("shop/y/item.html")
        );
    }

    #[test]
    fn test_custom_flatten_and_markers() {
        let strip = vec!["_root".to_owned()];

        assert_eq!(
            output_path(Path::new("_root/a/b/p.twig"), [0, 1], &strip),
            PathBuf::from("b/p.html")
        );
    }

    #[test]
    fn test_route() {
        assert_eq!(route(Path::new("blog/post.html")), "/blog/post.html");
        assert_eq!(route(Path::new("index.html")), "/index.html");
    }
}
