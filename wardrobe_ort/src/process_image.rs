use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use wardrobe_common::detector::ColorDetector;
use wardrobe_common::item_record::{ItemFields, ItemReport};
use wardrobe_common::model::{
    Category, ColorDetectionResult, DetailedAttributes, ImageSource, PatternDetectionResult,
};
use wardrobe_common::progress::Progress;

use crate::backend::Backend;

/// Per-run item metadata supplied on the command line.
pub struct ItemContext {
    pub category: Option<Category>,
    pub subcategory: Option<String>,
    pub simple: bool,
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpeg" | "jpg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

fn progress_bar(path: &Path) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb.set_message(path.display().to_string());
    pb
}

/// Analyzes a single image file and writes `<stem>.out.png` and `<stem>.out.json` next to it.
pub fn process_image(path: &Path, backend: &Backend, ctx: &ItemContext) -> anyhow::Result<()> {
    let _span = tracing::info_span!("process_image", path = %path.display()).entered();
    let Some(mime) = mime_for(path) else {
        log::error!("Unhandled file extension: {path:?}");
        return Ok(());
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {path:?}"))?;
    let source = ImageSource::new(bytes, Some(mime.to_string()));
    let started = Instant::now();

    let colors = if ctx.simple {
        ColorDetector::process_without_segmentation(&source)
    } else {
        let pb = progress_bar(path);
        let observer = pb.clone();
        let progress = Progress::with_observer(move |v| observer.set_position(v as u64));
        let result = backend.colors.process_image_with_progress(&source, &progress);
        pb.finish_and_clear();
        result
    };

    // Color failures keep the original image and the neutral color.
    let (colors, segmented) = match colors {
        Ok(colors) => (colors, !ctx.simple),
        Err(e) if e.is_backend_failure() => {
            log::warn!("Color detection failed, keeping original image: {e}");
            let original = source.decode()?;
            (ColorDetectionResult::new(original.clone(), original, Vec::new()), false)
        }
        Err(e) => return Err(e.into()),
    };

    let (pattern, attributes) = match &backend.attributes {
        Some(detector) => {
            detector.detect_all(&colors.original_image, ctx.category, ctx.subcategory.as_deref())
        }
        None => (PatternDetectionResult::default(), DetailedAttributes::default()),
    };
    log::info!("Analyzed {path:?} in {:?}", started.elapsed());

    let processed_file = if segmented {
        let out = path.with_extension("out.png");
        colors.processed_image.save(&out)?;
        Some(out)
    } else {
        None
    };

    let report = ItemReport {
        input_file: path.to_path_buf(),
        processed_file,
        colors: colors.summary(),
        fields: ItemFields::new(
            &colors.primary_color,
            &pattern,
            &attributes,
            ctx.category,
            ctx.subcategory.as_deref(),
        ),
    };
    let report_path = path.with_extension("out.json");
    report
        .export_json(&report_path)
        .with_context(|| format!("writing {report_path:?}"))?;
    report.print_summary();
    println!("Report saved to: {report_path:?}");

    Ok(())
}
