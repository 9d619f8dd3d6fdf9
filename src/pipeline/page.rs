use std::path::{Path, PathBuf};

use anyhow::Context as _;
use image::RgbaImage;

use crate::{
    encode::emit::{ClipEmitter, OutputClip},
    encode::sink::FrameSink,
    foundation::error::{ReelError, ReelResult},
    foundation::process::ensure_parent_dir,
    media::background::BackgroundTrack,
    page::raster::{PageImage, PageRasterizer},
    page::region::{CroppedImage, extract},
    pipeline::{cancel::CancelToken, config::PipelineConfig},
    render::composite::composite_frames,
    style::overlay::{Overlay, stylize},
    timeline::compose::build_timeline,
};

/// One page of work: which page, and where its outputs go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageJob {
    /// 1-based page number.
    pub page: u32,
    /// Final clip path.
    pub clip_path: PathBuf,
    /// PNG path for the cropped region, when screenshots are requested.
    pub screenshot_path: Option<PathBuf>,
}

/// Background plus the sink its clip is encoded into.
pub struct ClipTarget<'a> {
    pub background: &'a BackgroundTrack,
    pub sink: &'a mut dyn FrameSink,
}

/// What a page run produced.
#[derive(Clone, Debug, PartialEq)]
pub struct PageOutput {
    pub page: u32,
    pub clip: Option<OutputClip>,
    pub screenshot: Option<PathBuf>,
}

/// Crop and stylize a rendered page.
pub fn prepare_overlay(
    page: &PageImage,
    cfg: &PipelineConfig,
) -> ReelResult<(CroppedImage, Overlay)> {
    let cropped = extract(page, &cfg.margins)?;
    let overlay = stylize(&cropped, &cfg.style, cfg.resolution)?;
    Ok((cropped, overlay))
}

/// Composite `overlay` over the timeline built from `background` and stream it into `sink`.
///
/// Frames are pulled `chunk_size` at a time, blended in parallel on the current rayon pool and
/// pushed in timestamp order. Cancellation is checked between chunks.
pub fn render_clip(
    overlay: &Overlay,
    cfg: &PipelineConfig,
    page: u32,
    clip_path: &Path,
    target: ClipTarget<'_>,
    cancel: &CancelToken,
) -> ReelResult<OutputClip> {
    let mut timeline = build_timeline(
        target.background,
        cfg.duration_sec,
        cfg.fps,
        cfg.resolution,
    )?;
    let plan = *timeline.plan();
    tracing::debug!(
        regime = plan.regime().as_str(),
        frames = plan.frame_count(),
        "rendering clip"
    );

    let mut emitter = ClipEmitter::begin(
        target.sink,
        clip_path,
        page,
        cfg.resolution,
        &plan,
        target.background.audio(),
    )?;

    let chunk_size = cfg.chunk_size.max(1);
    let mut chunk: Vec<RgbaImage> = Vec::with_capacity(chunk_size);
    loop {
        cancel.check()?;
        chunk.clear();
        chunk.extend(timeline.by_ref().take(chunk_size).map(|f| f.image));
        if chunk.is_empty() {
            break;
        }
        composite_frames(&mut chunk, overlay)?;
        for frame in &chunk {
            emitter.push(frame)?;
        }
    }
    emitter.finish()
}

/// Run the whole pipeline for one page.
///
/// With `clip` set to `None` only the screenshot is written.
pub fn run_page(
    rasterizer: &dyn PageRasterizer,
    pdf_path: &Path,
    job: &PageJob,
    cfg: &PipelineConfig,
    clip: Option<ClipTarget<'_>>,
    cancel: &CancelToken,
) -> ReelResult<PageOutput> {
    let span = tracing::info_span!("page", page = job.page);
    let _enter = span.enter();
    cancel.check()?;

    if clip.is_some() && !cfg.overwrite && job.clip_path.exists() {
        return Err(ReelError::validation(format!(
            "output file '{}' already exists",
            job.clip_path.display()
        )));
    }

    let page_image = rasterizer.render(pdf_path, job.page, cfg.dpi)?;
    tracing::debug!(
        width = page_image.width(),
        height = page_image.height(),
        dpi = page_image.dpi,
        "page rendered"
    );
    let cropped = extract(&page_image, &cfg.margins)?;
    drop(page_image);

    let screenshot = match &job.screenshot_path {
        Some(path) => {
            write_screenshot(&cropped, path)?;
            Some(path.clone())
        }
        None => None,
    };

    let clip = match clip {
        Some(target) => {
            let overlay = stylize(&cropped, &cfg.style, cfg.resolution)?;
            drop(cropped);
            Some(render_clip(
                &overlay,
                cfg,
                job.page,
                &job.clip_path,
                target,
                cancel,
            )?)
        }
        None => None,
    };

    Ok(PageOutput {
        page: job.page,
        clip,
        screenshot,
    })
}

fn write_screenshot(cropped: &CroppedImage, path: &Path) -> ReelResult<()> {
    ensure_parent_dir(path)?;
    cropped
        .image
        .save(path)
        .with_context(|| format!("failed to write screenshot '{}'", path.display()))?;
    tracing::info!(out = %path.display(), "screenshot written");
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/page.rs"]
mod tests;
