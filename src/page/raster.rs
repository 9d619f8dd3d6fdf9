use std::{
    path::{Path, PathBuf},
    process::Command,
};

use image::RgbImage;

use crate::foundation::{
    error::{ReelError, ReelResult},
    process::is_tool_on_path,
};

/// Raster of one PDF page.
#[derive(Clone, Debug)]
pub struct PageImage {
    /// Opaque RGB pixels, row-major.
    pub image: RgbImage,
    /// Resolution the page was rasterized at.
    pub dpi: u32,
}

impl PageImage {
    /// Wrap an already rendered raster.
    pub fn new(image: RgbImage, dpi: u32) -> Self {
        Self { image, dpi }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// PDF rasterizer contract.
///
/// Page numbers are 1-based everywhere, matching the CLI page range.
pub trait PageRasterizer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, pdf_path: &Path) -> ReelResult<u32>;

    /// Render page `page` of `pdf_path` at `dpi`.
    fn render(&self, pdf_path: &Path, page: u32, dpi: u32) -> ReelResult<PageImage>;
}

/// Rasterizer backed by the poppler command-line tools (`pdfinfo`, `pdftoppm`).
///
/// Like the ffmpeg encoder, this shells out to system binaries so the crate builds without
/// native PDF library headers.
#[derive(Clone, Debug)]
pub struct PopplerRasterizer {
    pdftoppm: PathBuf,
    pdfinfo: PathBuf,
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self {
            pdftoppm: PathBuf::from("pdftoppm"),
            pdfinfo: PathBuf::from("pdfinfo"),
        }
    }
}

impl PopplerRasterizer {
    /// Use explicit tool locations instead of `PATH` lookup.
    pub fn with_binaries(pdftoppm: impl Into<PathBuf>, pdfinfo: impl Into<PathBuf>) -> Self {
        Self {
            pdftoppm: pdftoppm.into(),
            pdfinfo: pdfinfo.into(),
        }
    }

    /// Return `true` when both poppler tools can be invoked.
    pub fn is_available(&self) -> bool {
        is_tool_on_path(&self.pdftoppm.to_string_lossy(), "-v")
            && is_tool_on_path(&self.pdfinfo.to_string_lossy(), "-v")
    }
}

impl PageRasterizer for PopplerRasterizer {
    fn page_count(&self, pdf_path: &Path) -> ReelResult<u32> {
        let out = Command::new(&self.pdfinfo)
            .arg(pdf_path)
            .output()
            .map_err(|e| ReelError::validation(format!("failed to run pdfinfo: {e}")))?;
        if !out.status.success() {
            return Err(ReelError::validation(format!(
                "pdfinfo failed for '{}': {}",
                pdf_path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        parse_pdfinfo_pages(&String::from_utf8_lossy(&out.stdout)).ok_or_else(|| {
            ReelError::validation(format!(
                "pdfinfo reported no page count for '{}'",
                pdf_path.display()
            ))
        })
    }

    fn render(&self, pdf_path: &Path, page: u32, dpi: u32) -> ReelResult<PageImage> {
        if page == 0 {
            return Err(ReelError::page_render(page, "page numbers are 1-based"));
        }
        if dpi == 0 {
            return Err(ReelError::page_render(page, "dpi must be non-zero"));
        }

        let page_arg = page.to_string();
        // Without an output root, pdftoppm streams the single page to stdout.
        let out = Command::new(&self.pdftoppm)
            .args(["-png", "-singlefile", "-r", &dpi.to_string()])
            .args(["-f", &page_arg, "-l", &page_arg])
            .arg(pdf_path)
            .output()
            .map_err(|e| ReelError::page_render(page, format!("failed to run pdftoppm: {e}")))?;
        if !out.status.success() {
            return Err(ReelError::page_render(
                page,
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            ));
        }
        if out.stdout.is_empty() {
            return Err(ReelError::page_render(page, "pdftoppm produced no image"));
        }

        let decoded = image::load_from_memory(&out.stdout)
            .map_err(|e| ReelError::page_render(page, format!("decode rendered page: {e}")))?;
        Ok(PageImage::new(decoded.to_rgb8(), dpi))
    }
}

fn parse_pdfinfo_pages(stdout: &str) -> Option<u32> {
    stdout.lines().find_map(|line| {
        let rest = line.strip_prefix("Pages:")?;
        rest.trim().parse::<u32>().ok()
    })
}

#[cfg(test)]
#[path = "../../tests/unit/page/raster.rs"]
mod tests;
