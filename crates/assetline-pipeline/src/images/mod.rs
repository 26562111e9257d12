//! Image pipeline.
//!
//! Sources are mirrored below the image destination. A file whose output is
//! at least as new as the source is skipped. Everything else is compressed by
//! format, and the source bytes are kept whenever compression does not shrink
//! them. A file that fails to decode is logged and skipped.

mod codec;

use std::fs;
use std::path::Path;
use std::time::Instant;

pub use codec::CodecError;
use codec::Format;

use crate::error::PipelineError;
use crate::runner::Pipeline;
use crate::sources;
use crate::{BuildContext, Report, write_file};

/// Compress every changed image.
pub fn run(ctx: &BuildContext) -> Result<Report, PipelineError> {
    let start = Instant::now();
    let settings = &ctx.config().images;
    let paths = &ctx.paths().images;

    let mut report = Report::default();
    for file in sources::expand(ctx.root(), &paths.src)? {
        let target = paths.dest.join(file.relative());
        if is_up_to_date(&file.path, &target) {
            report.skipped.push(file.path);
            continue;
        }

        let format = Format::from_path(&file.path);
        let source = fs::read(&file.path).map_err(PipelineError::io(&file.path))?;
        let original_len = source.len();
        let result = Pipeline::new("images")
            .stage("compress", |bytes: Vec<u8>| {
                codec::compress(format, &bytes, settings)
                    .map(|compressed| smaller(compressed, bytes))
            })
            .run(&file.path, source);

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping image");
                continue;
            }
        };
        tracing::debug!(
            path = %file.path.display(),
            before = original_len,
            after = output.len(),
            "Compressed image"
        );
        write_file(&target, output)?;
        report.wrote(target);
    }

    tracing::info!(
        files = report.written.len(),
        skipped = report.skipped.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Images built"
    );
    Ok(report)
}

fn smaller(compressed: Vec<u8>, original: Vec<u8>) -> Vec<u8> {
    if compressed.len() < original.len() {
        compressed
    } else {
        original
    }
}

/// Whether `target` exists and is at least as new as `source`.
fn is_up_to_date(source: &Path, target: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified()).ok();
    match (modified(source), modified(target)) {
        (Some(source), Some(target)) => target >= source,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    fn write_bytes(root: &Path, rel: &str, bytes: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_images_compressed_and_mirrored() {
        let temp = tempfile::tempdir().unwrap();
        let png = codec::tests::sample_png();
        let jpeg = codec::tests::sample_jpeg();
        write_bytes(temp.path(), "src/images/icons/a.png", &png);
        write_bytes(temp.path(), "src/images/photo.jpg", &jpeg);
        write_bytes(temp.path(), "src/images/data.txt", b"plain");
        let (ctx, _sink) = context(temp.path());

        let report = run(&ctx).unwrap();

        let dest = temp.path().join("dest/assets/images");
        assert_eq!(report.written.len(), 3);
        assert!(fs::read(dest.join("icons/a.png")).unwrap().len() <= png.len());
        assert!(fs::read(dest.join("photo.jpg")).unwrap().len() < jpeg.len());
        assert_eq!(fs::read(dest.join("data.txt")).unwrap(), b"plain");
    }

    #[test]
    fn test_second_run_skips_everything() {
        let temp = tempfile::tempdir().unwrap();
        write_bytes(temp.path(), "src/images/a.png", &codec::tests::sample_png());
        let (ctx, _sink) = context(temp.path());
        run(&ctx).unwrap();
        let target = temp.path().join("dest/assets/images/a.png");
        let before = (fs::read(&target).unwrap(), fs::metadata(&target).unwrap().modified().unwrap());

        let report = run(&ctx).unwrap();

        assert!(report.written.is_empty());
        assert_eq!(report.skipped, vec![temp.path().join("src/images/a.png")]);
        let after = (fs::read(&target).unwrap(), fs::metadata(&target).unwrap().modified().unwrap());
        assert_eq!(before, after);
    }

    #[test]
    fn test_newer_source_is_reprocessed() {
        let temp = tempfile::tempdir().unwrap();
        write_bytes(temp.path(), "src/images/a.txt", b"one");
        let (ctx, _sink) = context(temp.path());
        run(&ctx).unwrap();
        let target = temp.path().join("dest/assets/images/a.txt");
        File::options()
            .write(true)
            .open(&target)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(60))
            .unwrap();

        let report = run(&ctx).unwrap();

        assert_eq!(report.written, vec![target]);
    }

    #[test]
    fn test_corrupt_image_skipped_others_continue() {
        let temp = tempfile::tempdir().unwrap();
        write_bytes(temp.path(), "src/images/broken.png", b"not a png");
        write_bytes(temp.path(), "src/images/ok.txt", b"ok");
        let (ctx, _sink) = context(temp.path());

        let report = run(&ctx).unwrap();

        let dest = temp.path().join("dest/assets/images");
        assert!(!dest.join("broken.png").exists());
        assert!(dest.join("ok.txt").exists());
        assert_eq!(report.written.len(), 1);
    }
}
