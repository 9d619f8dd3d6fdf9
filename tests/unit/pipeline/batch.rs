use super::*;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{Fps, Resolution};
use crate::page::raster::PageImage;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::PathBuf;

/// Fake document whose listed pages fail to render.
struct FakeDoc {
    pages: u32,
    broken: Vec<u32>,
}

impl PageRasterizer for FakeDoc {
    fn page_count(&self, _pdf_path: &Path) -> ReelResult<u32> {
        Ok(self.pages)
    }

    fn render(&self, _pdf_path: &Path, page: u32, dpi: u32) -> ReelResult<PageImage> {
        if self.broken.contains(&page) {
            return Err(ReelError::page_render(page, "corrupt page"));
        }
        let shade = (page * 20) as u8;
        Ok(PageImage::new(RgbImage::from_pixel(30, 30, Rgb([shade, shade, shade])), dpi))
    }
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pagereel_batch_{tag}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn cfg(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        duration_sec: 0.5,
        fps: Fps::new(10, 1).unwrap(),
        resolution: Resolution::new(8, 16).unwrap(),
        output_dir: dir.join("out"),
        workers: 3,
        chunk_size: 2,
        ..Default::default()
    }
}

fn background() -> BackgroundTrack {
    let frames = vec![RgbaImage::from_pixel(8, 16, Rgba([10, 20, 30, 255])); 3];
    BackgroundTrack::from_frames(frames, 10.0, 0.3, None).unwrap()
}

fn in_memory(_job: &PageJob) -> Box<dyn FrameSink> {
    Box::new(InMemorySink::new())
}

/// Starts a partial file like a real encoder, then fails on the first frame.
struct FullDiskSink {
    partial: PathBuf,
}

impl FrameSink for FullDiskSink {
    fn begin(&mut self, _cfg: crate::encode::sink::SinkConfig) -> ReelResult<()> {
        std::fs::write(&self.partial, b"mdat").map_err(anyhow::Error::from)?;
        Ok(())
    }

    fn push_frame(
        &mut self,
        _idx: crate::foundation::core::FrameIndex,
        _frame: &RgbaImage,
    ) -> ReelResult<()> {
        Err(ReelError::encode("disk full"))
    }

    fn end(&mut self) -> ReelResult<()> {
        Ok(())
    }
}

#[test]
fn file_names_are_zero_padded_and_ordered() {
    assert_eq!(output_file_name("doc", 7, 12, "mp4"), "doc_page_0007.mp4");
    assert_eq!(output_file_name("doc", 7, 12345, "mp4"), "doc_page_00007.mp4");
    assert_eq!(output_file_name("a b", 1, 1, "png"), "a b_page_0001.png");
    let mut names: Vec<String> = [10, 2, 1]
        .iter()
        .map(|p| output_file_name("d", *p, 10, "mp4"))
        .collect();
    names.sort();
    assert_eq!(names, ["d_page_0001.mp4", "d_page_0002.mp4", "d_page_0010.mp4"]);
}

#[test]
fn page_range_is_clamped_to_document() {
    assert_eq!(clamp_page_range(None, None, 5).unwrap(), 1..=5);
    assert_eq!(clamp_page_range(Some(0), Some(99), 5).unwrap(), 1..=5);
    assert_eq!(clamp_page_range(Some(2), Some(3), 5).unwrap(), 2..=3);
    assert!(clamp_page_range(Some(4), Some(2), 5).is_err());
    assert!(clamp_page_range(Some(6), None, 5).is_err());
    assert!(clamp_page_range(None, None, 0).is_err());
}

#[test]
fn broken_pages_are_skipped_and_the_rest_succeed_in_order() {
    let dir = scratch_dir("skip");
    let doc = FakeDoc {
        pages: 6,
        broken: vec![2, 5],
    };
    let driver = BatchDriver::new(&doc, cfg(&dir)).with_sink_factory(in_memory);
    let bg = background();
    let summary = driver
        .run_with_background(Path::new("doc.pdf"), 1..=6, 6, Some(&bg))
        .unwrap();

    let ok: Vec<u32> = summary.succeeded.iter().map(|o| o.page).collect();
    let skipped: Vec<u32> = summary.skipped.iter().map(|s| s.page).collect();
    assert_eq!(ok, vec![1, 3, 4, 6]);
    assert_eq!(skipped, vec![2, 5]);
    assert!(!summary.is_complete());
    assert_eq!(summary.attempted(), 6);
    assert!(matches!(
        summary.skipped[0].error,
        ReelError::PageRender { page: 2, .. }
    ));

    let clip = summary.succeeded[0].clip.as_ref().unwrap();
    assert_eq!(clip.frame_count, 5);
    assert_eq!(clip.path, dir.join("out").join("doc_page_0001.mp4"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn screenshots_only_never_needs_a_video() {
    let dir = scratch_dir("shots");
    let doc = FakeDoc {
        pages: 3,
        broken: vec![],
    };
    let config = PipelineConfig {
        screenshots_only: true,
        screenshots_dir: Some(dir.join("shots")),
        ..cfg(&dir)
    };
    let driver = BatchDriver::new(&doc, config);
    let summary = driver
        .run(Path::new("notes.pdf"), None, Some(2), None)
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.succeeded.len(), 2);
    assert!(dir.join("shots").join("notes_page_0002.png").exists());
    assert!(dir.join("shots").join("notes_page_0003.png").exists());
    assert!(!dir.join("out").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_video_is_fatal() {
    let dir = scratch_dir("novideo");
    let doc = FakeDoc {
        pages: 2,
        broken: vec![],
    };
    let driver = BatchDriver::new(&doc, cfg(&dir)).with_sink_factory(in_memory);
    let err = driver
        .run(
            Path::new("doc.pdf"),
            Some(Path::new("no/such/background.mp4")),
            None,
            None,
        )
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(!dir.join("out").exists());

    assert!(matches!(
        driver.run(Path::new("doc.pdf"), None, None, None),
        Err(ReelError::Validation(_))
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cancelled_batch_reports_cancellation() {
    let dir = scratch_dir("cancel");
    let doc = FakeDoc {
        pages: 4,
        broken: vec![],
    };
    let cancel = CancelToken::new();
    cancel.cancel();
    let driver = BatchDriver::new(&doc, cfg(&dir))
        .with_sink_factory(in_memory)
        .with_cancel(cancel);
    let bg = background();
    assert!(matches!(
        driver.run_with_background(Path::new("doc.pdf"), 1..=4, 4, Some(&bg)),
        Err(ReelError::Cancelled)
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_config_is_rejected_before_any_page() {
    let dir = scratch_dir("badcfg");
    let doc = FakeDoc {
        pages: 1,
        broken: vec![],
    };
    let config = PipelineConfig {
        workers: 0,
        ..cfg(&dir)
    };
    let driver = BatchDriver::new(&doc, config);
    assert!(matches!(
        driver.run(Path::new("doc.pdf"), None, None, None),
        Err(ReelError::Validation(_))
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn encode_failure_skips_the_page_and_leaves_no_partial_output() {
    let dir = scratch_dir("encode_fail");
    let doc = FakeDoc {
        pages: 3,
        broken: vec![],
    };
    let driver = BatchDriver::new(&doc, cfg(&dir)).with_sink_factory(|job: &PageJob| -> Box<dyn FrameSink> {
        if job.page == 2 {
            Box::new(FullDiskSink {
                partial: partial_path(&job.clip_path),
            })
        } else {
            Box::new(InMemorySink::new())
        }
    });
    let bg = background();
    let summary = driver
        .run_with_background(Path::new("doc.pdf"), 1..=3, 3, Some(&bg))
        .unwrap();

    let ok: Vec<u32> = summary.succeeded.iter().map(|o| o.page).collect();
    assert_eq!(ok, vec![1, 3]);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].page, 2);
    assert!(matches!(summary.skipped[0].error, ReelError::Encode(ref m) if m == "disk full"));
    assert!(!summary.skipped[0].error.is_fatal());

    let out = dir.join("out");
    let leftovers: Vec<PathBuf> = std::fs::read_dir(&out)
        .map(|entries| entries.map(|e| e.unwrap().path()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "{leftovers:?}");
    let _ = std::fs::remove_dir_all(&dir);
}
