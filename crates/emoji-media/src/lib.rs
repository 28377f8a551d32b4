//! Download and FFmpeg GIF transcoding pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeout support
//! - Streaming HTTP download into scratch storage
//! - The two-pass (palette + paletteuse) looping GIF pipeline

pub mod command;
pub mod download;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod pipeline;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use download::download_to_file;
pub use error::{MediaError, MediaResult};
pub use pipeline::{GifPipeline, MediaPipeline, PipelineConfig};
