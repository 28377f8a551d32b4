//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found: {0}")]
    FfmpegNotFound(String),

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Failed to download video: {message}")]
    DownloadFailed { message: String },

    #[error("Failed to generate palette: {0}")]
    PaletteFailed(#[source] Box<MediaError>),

    #[error("Failed to convert video to GIF: {0}")]
    TranscodeFailed(#[source] Box<MediaError>),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Wrap a failure of the palette pass.
    pub fn palette(err: MediaError) -> Self {
        Self::PaletteFailed(Box::new(err))
    }

    /// Wrap a failure of the final GIF pass.
    pub fn transcode(err: MediaError) -> Self {
        Self::TranscodeFailed(Box::new(err))
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Pipeline stage the error belongs to, for metrics labels.
    pub fn stage(&self) -> &'static str {
        match self {
            MediaError::DownloadFailed { .. } => "download",
            MediaError::PaletteFailed(_) => "palette",
            MediaError::TranscodeFailed(_) => "transcode",
            _ => "other",
        }
    }
}
