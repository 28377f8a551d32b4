//! Download-and-transcode pipeline producing the looping GIF artifact.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use tracing::{info, warn};

use emoji_models::JobId;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::download::download_to_file;
use crate::error::{MediaError, MediaResult};
use crate::filters::{gif_filter, palette_filter, DEFAULT_GIF_FPS, DEFAULT_GIF_SIZE};
use crate::fs_utils::move_file;

/// Extension marking an artifact this pipeline produced.
pub const GIF_EXTENSION: &str = "gif";

const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FFMPEG_TIMEOUT_SECS: u64 = 300;

/// Converts a provider video into a publicly served artifact.
#[async_trait]
pub trait MediaPipeline: Send + Sync {
    /// Fetch `source_url` and transcode it, returning the artifact's public URL.
    async fn transcode(&self, source_url: &str, job_id: &JobId) -> MediaResult<String>;

    /// Whether `url` already points at a transcoded artifact.
    fn is_transcoded(&self, url: &str) -> bool {
        url.ends_with(".gif")
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory the finished GIFs are served from
    pub tasks_dir: PathBuf,
    /// Parent directory for per-job scratch directories
    pub scratch_dir: PathBuf,
    /// Base URL the tasks directory is reachable under (no trailing slash)
    pub public_base_url: String,
    /// FFmpeg binary name or path
    pub ffmpeg_bin: String,
    /// Per-invocation FFmpeg timeout
    pub ffmpeg_timeout: Duration,
    /// Whole-request timeout for the source download
    pub download_timeout: Duration,
    /// Connect timeout for the source download
    pub connect_timeout: Duration,
    /// Square canvas edge in pixels
    pub gif_size: u32,
    /// Output frame rate
    pub gif_fps: u32,
}

impl PipelineConfig {
    pub fn new(tasks_dir: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            tasks_dir: tasks_dir.into(),
            scratch_dir: std::env::temp_dir(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffmpeg_timeout: Duration::from_secs(DEFAULT_FFMPEG_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            gif_size: DEFAULT_GIF_SIZE,
            gif_fps: DEFAULT_GIF_FPS,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let tasks_dir = std::env::var("TASKS_DIR").unwrap_or_else(|_| "tasks".to_string());
        let public_base_url = std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| {
            let host = std::env::var("PUBLIC_HOST").unwrap_or_else(|_| "localhost".to_string());
            let port = std::env::var("PUBLIC_PORT")
                .or_else(|_| std::env::var("API_PORT"))
                .unwrap_or_else(|_| "8000".to_string());
            format!("https://{}:{}", host, port)
        });

        let mut config = Self::new(tasks_dir, public_base_url);
        if let Ok(dir) = std::env::var("SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(dir);
        }
        if let Ok(bin) = std::env::var("FFMPEG_BIN") {
            config.ffmpeg_bin = bin;
        }
        config.ffmpeg_timeout = Duration::from_secs(
            std::env::var("FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_FFMPEG_TIMEOUT_SECS),
        );
        config.download_timeout = Duration::from_secs(
            std::env::var("DOWNLOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        );
        config.gif_size = std::env::var("GIF_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_GIF_SIZE);
        config.gif_fps = std::env::var("GIF_FPS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_GIF_FPS);
        config
    }

    /// Final on-disk location of a job's GIF.
    pub fn artifact_path(&self, job_id: &JobId) -> PathBuf {
        self.tasks_dir.join(format!("{}.{}", job_id, GIF_EXTENSION))
    }

    /// Public URL of a job's GIF.
    pub fn artifact_url(&self, job_id: &JobId) -> String {
        format!(
            "{}/tasks/{}.{}",
            self.public_base_url, job_id, GIF_EXTENSION
        )
    }
}

/// Two-pass FFmpeg GIF pipeline.
#[derive(Debug, Clone)]
pub struct GifPipeline {
    http: Client,
    runner: FfmpegRunner,
    config: PipelineConfig,
}

impl GifPipeline {
    /// Create a pipeline whose download and FFmpeg steps are bounded by the configured timeouts.
    pub fn new(config: PipelineConfig) -> MediaResult<Self> {
        let http = Client::builder()
            .timeout(config.download_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("emoji-media/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::internal(format!("Failed to build HTTP client: {}", e)))?;
        let runner =
            FfmpegRunner::new(config.ffmpeg_bin.clone()).with_timeout(config.ffmpeg_timeout);

        Ok(Self {
            http,
            runner,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all stages inside `scratch`, leaving the GIF at `scratch/out.gif`.
    async fn run_stages(&self, source_url: &str, scratch: &Path) -> MediaResult<PathBuf> {
        let source = scratch.join("source.mp4");
        let palette = scratch.join("palette.png");
        let output = scratch.join("out.gif");

        let started = Instant::now();
        download_to_file(&self.http, source_url, &source).await?;
        histogram!("emoji_media_download_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let started = Instant::now();
        let palette_cmd = FfmpegCommand::new(&palette)
            .input(&source)
            .video_filter(palette_filter(self.config.gif_size));
        self.runner
            .run(&palette_cmd)
            .await
            .map_err(MediaError::palette)?;

        let gif_cmd = FfmpegCommand::new(&output)
            .input(&source)
            .input(&palette)
            .lavfi(gif_filter(self.config.gif_size, self.config.gif_fps))
            .format(GIF_EXTENSION);
        self.runner
            .run(&gif_cmd)
            .await
            .map_err(MediaError::transcode)?;
        histogram!("emoji_media_ffmpeg_duration_seconds").record(started.elapsed().as_secs_f64());

        Ok(output)
    }
}

#[async_trait]
impl MediaPipeline for GifPipeline {
    async fn transcode(&self, source_url: &str, job_id: &JobId) -> MediaResult<String> {
        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;
        // Removed on drop, whichever way this function exits.
        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}-", job_id))
            .tempdir_in(&self.config.scratch_dir)?;

        let result = match self.run_stages(source_url, scratch.path()).await {
            Ok(output) => move_file(&output, self.config.artifact_path(job_id)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                counter!("emoji_media_transcodes_total", "outcome" => "ok").increment(1);
                let url = self.config.artifact_url(job_id);
                info!(job_id = %job_id, url = %url, "GIF ready");
                Ok(url)
            }
            Err(e) => {
                counter!("emoji_media_transcodes_total", "outcome" => "error", "stage" => e.stage())
                    .increment(1);
                warn!(job_id = %job_id, error = %e, "Media pipeline failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(root: &Path, bin: &str) -> PipelineConfig {
        let mut config = PipelineConfig::new(root.join("tasks"), "https://host:8000/");
        config.scratch_dir = root.join("scratch");
        config.ffmpeg_bin = bin.to_string();
        config
    }

    fn scratch_is_empty(root: &Path) -> bool {
        std::fs::read_dir(root.join("scratch"))
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    #[test]
    fn test_artifact_url_is_deterministic() {
        let config = PipelineConfig::new("tasks", "https://host:8000/");
        let id = JobId::parse("job_abc").unwrap();
        assert_eq!(config.artifact_url(&id), "https://host:8000/tasks/job_abc.gif");
        assert_eq!(config.artifact_path(&id), PathBuf::from("tasks/job_abc.gif"));
    }

    #[test]
    fn test_is_transcoded() {
        let pipeline = GifPipeline::new(PipelineConfig::new("tasks", "https://host")).unwrap();
        assert!(pipeline.is_transcoded("https://host/tasks/job_1.gif"));
        assert!(!pipeline.is_transcoded("https://p/video.mp4"));
    }

    #[tokio::test]
    async fn test_download_failure_cleans_scratch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        let pipeline = GifPipeline::new(config(root.path(), "ffmpeg")).unwrap();
        let err = pipeline
            .transcode(&format!("{}/video.mp4", server.uri()), &JobId::new())
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::DownloadFailed { .. }));
        assert!(err.to_string().starts_with("Failed to download video"));
        assert!(scratch_is_empty(root.path()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_palette_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        let pipeline = GifPipeline::new(config(root.path(), "/bin/false")).unwrap();
        let id = JobId::new();
        let err = pipeline
            .transcode(&format!("{}/video.mp4", server.uri()), &id)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::PaletteFailed(_)));
        assert!(err.to_string().starts_with("Failed to generate palette"));
        assert!(scratch_is_empty(root.path()));
        assert!(!pipeline.config().artifact_path(&id).exists());
    }

    #[tokio::test]
    async fn test_stalled_download_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 64])
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        let mut cfg = config(root.path(), "ffmpeg");
        cfg.download_timeout = Duration::from_millis(200);
        let pipeline = GifPipeline::new(cfg).unwrap();

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            pipeline.transcode(&format!("{}/video.mp4", server.uri()), &JobId::new()),
        )
        .await
        .expect("download should be bounded by the client timeout")
        .unwrap_err();

        assert!(matches!(err, MediaError::DownloadFailed { .. }));
        assert!(scratch_is_empty(root.path()));
    }
}
