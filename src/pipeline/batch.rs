use std::{ops::RangeInclusive, path::Path};

use rayon::prelude::*;

use crate::{
    encode::emit::partial_path,
    encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts},
    encode::sink::FrameSink,
    foundation::error::{ReelError, ReelResult},
    media::background::{BackgroundTrack, DecodeOpts},
    page::raster::PageRasterizer,
    pipeline::{
        cancel::CancelToken,
        config::PipelineConfig,
        page::{ClipTarget, PageJob, PageOutput, run_page},
    },
};

/// Builds the sink a page's clip is encoded into.
pub type SinkFactory = dyn Fn(&PageJob) -> Box<dyn FrameSink> + Send + Sync;

/// A page that failed and was left out of the batch.
#[derive(Debug)]
pub struct SkippedPage {
    pub page: u32,
    pub error: ReelError,
}

/// Per-page outcomes of one invocation, in page order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<PageOutput>,
    pub skipped: Vec<SkippedPage>,
}

impl BatchSummary {
    /// `true` when no page was skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Number of pages attempted.
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.skipped.len()
    }
}

/// `{stem}_page_{NNNN}.{ext}`, page zero-padded to `max(4, digits(page_count))`.
pub fn output_file_name(stem: &str, page: u32, page_count: u32, ext: &str) -> String {
    let width = page_count.max(1).to_string().len().max(4);
    format!("{stem}_page_{page:0width$}.{ext}")
}

/// Clamp a requested 1-based inclusive page range to the document.
///
/// `start` below 1 becomes 1; `end` past the last page (or absent) becomes the last page.
pub fn clamp_page_range(
    start: Option<u32>,
    end: Option<u32>,
    page_count: u32,
) -> ReelResult<RangeInclusive<u32>> {
    if page_count == 0 {
        return Err(ReelError::validation("document has no pages"));
    }
    let start = start.unwrap_or(1).max(1);
    let end = end.unwrap_or(page_count).min(page_count);
    if start > end {
        return Err(ReelError::validation(format!(
            "page range {start}..={end} is empty (document has {page_count} pages)"
        )));
    }
    Ok(start..=end)
}

/// Runs the page pipeline over a page range on a bounded worker pool.
///
/// The background is decoded once and shared; per-page errors skip the page, background errors
/// stop the whole batch.
pub struct BatchDriver<'a> {
    rasterizer: &'a dyn PageRasterizer,
    cfg: PipelineConfig,
    cancel: CancelToken,
    sink_factory: Box<SinkFactory>,
}

impl<'a> BatchDriver<'a> {
    /// Driver encoding every clip with the system `ffmpeg`.
    pub fn new(rasterizer: &'a dyn PageRasterizer, cfg: PipelineConfig) -> Self {
        Self {
            rasterizer,
            cfg,
            cancel: CancelToken::new(),
            sink_factory: Box::new(|job: &PageJob| {
                let opts = FfmpegSinkOpts::new(partial_path(&job.clip_path));
                Box::new(FfmpegSink::new(opts)) as Box<dyn FrameSink>
            }),
        }
    }

    /// Share an externally owned cancel flag (e.g. wired to Ctrl+C).
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the encoder.
    pub fn with_sink_factory(
        mut self,
        factory: impl Fn(&PageJob) -> Box<dyn FrameSink> + Send + Sync + 'static,
    ) -> Self {
        self.sink_factory = Box::new(factory);
        self
    }

    /// Jobs for `range`, with output names derived from `pdf_path`.
    pub fn plan_jobs(
        &self,
        pdf_path: &Path,
        range: RangeInclusive<u32>,
        page_count: u32,
    ) -> Vec<PageJob> {
        let stem = pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let shots = self.cfg.effective_screenshots_dir();
        range
            .map(|page| PageJob {
                page,
                clip_path: self
                    .cfg
                    .output_dir
                    .join(output_file_name(&stem, page, page_count, "mp4")),
                screenshot_path: shots
                    .as_ref()
                    .map(|dir| dir.join(output_file_name(&stem, page, page_count, "png"))),
            })
            .collect()
    }

    /// Decode the background for this configuration.
    pub fn open_background(&self, video_path: &Path) -> ReelResult<BackgroundTrack> {
        BackgroundTrack::open(
            video_path,
            DecodeOpts {
                max_duration_sec: Some(self.cfg.duration_sec),
                cover: Some(self.cfg.resolution),
                skip_audio: false,
                max_bytes: Some(self.cfg.max_background_bytes()),
            },
        )
    }

    /// Process pages `start..=end` of `pdf_path` (clamped to the document).
    ///
    /// `video_path` may be `None` only in screenshots-only mode.
    pub fn run(
        &self,
        pdf_path: &Path,
        video_path: Option<&Path>,
        start: Option<u32>,
        end: Option<u32>,
    ) -> ReelResult<BatchSummary> {
        self.cfg.validate()?;
        let page_count = self.rasterizer.page_count(pdf_path)?;
        let range = clamp_page_range(start, end, page_count)?;
        tracing::info!(
            pdf = %pdf_path.display(),
            pages = page_count,
            start = range.start(),
            end = range.end(),
            "starting batch"
        );

        let background = if self.cfg.screenshots_only {
            None
        } else {
            let video = video_path.ok_or_else(|| {
                ReelError::validation("a background video is required unless screenshots-only")
            })?;
            Some(self.open_background(video)?)
        };
        self.run_with_background(pdf_path, range, page_count, background.as_ref())
    }

    /// Process an already clamped range against an already decoded background.
    pub fn run_with_background(
        &self,
        pdf_path: &Path,
        range: RangeInclusive<u32>,
        page_count: u32,
        background: Option<&BackgroundTrack>,
    ) -> ReelResult<BatchSummary> {
        self.cfg.validate()?;
        if background.is_none() && !self.cfg.screenshots_only {
            return Err(ReelError::validation("no background to composite over"));
        }
        let jobs = self.plan_jobs(pdf_path, range, page_count);
        let pool = build_thread_pool(self.cfg.workers)?;

        let results: Vec<(u32, ReelResult<PageOutput>)> = pool.install(|| {
            jobs.par_iter()
                .map(|job| (job.page, self.run_job(pdf_path, job, background)))
                .collect()
        });

        let mut summary = BatchSummary::default();
        let mut fatal = None;
        for (page, result) in results {
            match result {
                Ok(out) => summary.succeeded.push(out),
                Err(e) if e.is_fatal() => {
                    tracing::error!(page, error = %e, "fatal error, batch aborted");
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
                Err(ReelError::Cancelled) => {}
                Err(e) => {
                    tracing::warn!(page, error = %e, "page skipped");
                    summary.skipped.push(SkippedPage { page, error: e });
                }
            }
        }
        if let Some(e) = fatal {
            return Err(e);
        }
        self.cancel.check()?;

        tracing::info!(
            succeeded = summary.succeeded.len(),
            skipped = summary.skipped.len(),
            "batch finished"
        );
        Ok(summary)
    }

    fn run_job(
        &self,
        pdf_path: &Path,
        job: &PageJob,
        background: Option<&BackgroundTrack>,
    ) -> ReelResult<PageOutput> {
        self.cancel.check()?;
        let result = match background.filter(|_| !self.cfg.screenshots_only) {
            Some(bg) => {
                let mut sink = (self.sink_factory)(job);
                run_page(
                    self.rasterizer,
                    pdf_path,
                    job,
                    &self.cfg,
                    Some(ClipTarget {
                        background: bg,
                        sink: sink.as_mut(),
                    }),
                    &self.cancel,
                )
            }
            None => run_page(
                self.rasterizer,
                pdf_path,
                job,
                &self.cfg,
                None,
                &self.cancel,
            ),
        };
        if let Err(e) = &result
            && e.is_fatal()
        {
            self.cancel.cancel();
        }
        result
    }
}

fn build_thread_pool(threads: usize) -> ReelResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(ReelError::validation("workers must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("pagereel-worker-{i}"))
        .build()
        .map_err(|e| ReelError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/batch.rs"]
mod tests;
