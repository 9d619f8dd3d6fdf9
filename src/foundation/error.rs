/// Convenience result type used across pagereel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Error taxonomy for the page-to-clip pipeline.
///
/// The batch driver splits these into per-page errors (the page is skipped) and fatal errors
/// (the whole invocation stops), see [`ReelError::is_fatal`].
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Margin fractions that produce an empty or inverted crop.
    #[error("invalid margin: {0}")]
    InvalidMargin(String),

    /// A cropped page region with zero area.
    #[error("empty region: {0}")]
    EmptyRegion(String),

    /// Background video with no usable duration or frames.
    #[error("empty background: {0}")]
    EmptyBackground(String),

    /// The PDF rasterizer failed for one page.
    #[error("page render error (page {page}): {msg}")]
    PageRender {
        /// 1-based page number.
        page: u32,
        /// Rasterizer diagnostic.
        msg: String,
    },

    /// The background video could not be probed or decoded.
    #[error("unreadable video: {0}")]
    UnreadableVideo(String),

    /// Downstream encoder failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// Invalid user-provided configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Work aborted through a [`CancelToken`](crate::CancelToken).
    #[error("cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::InvalidMargin`] value.
    pub fn invalid_margin(msg: impl Into<String>) -> Self {
        Self::InvalidMargin(msg.into())
    }

    /// Build a [`ReelError::EmptyRegion`] value.
    pub fn empty_region(msg: impl Into<String>) -> Self {
        Self::EmptyRegion(msg.into())
    }

    /// Build a [`ReelError::EmptyBackground`] value.
    pub fn empty_background(msg: impl Into<String>) -> Self {
        Self::EmptyBackground(msg.into())
    }

    /// Build a [`ReelError::PageRender`] value.
    pub fn page_render(page: u32, msg: impl Into<String>) -> Self {
        Self::PageRender {
            page,
            msg: msg.into(),
        }
    }

    /// Build a [`ReelError::UnreadableVideo`] value.
    pub fn unreadable_video(msg: impl Into<String>) -> Self {
        Self::UnreadableVideo(msg.into())
    }

    /// Build a [`ReelError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Errors about the shared background abort the whole invocation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnreadableVideo(_) | Self::EmptyBackground(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
