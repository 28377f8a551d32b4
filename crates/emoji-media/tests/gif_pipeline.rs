//! End-to-end pipeline runs against stand-in ffmpeg scripts.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use emoji_media::{GifPipeline, MediaError, MediaPipeline, PipelineConfig};
use emoji_models::JobId;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a tiny GIF header to whatever file is passed last.
const FAKE_FFMPEG: &str = "#!/bin/sh\nfor last; do :; done\nprintf 'GIF89a' > \"$last\"\n";

/// Succeeds on the palette pass and fails on the `-lavfi` pass.
const FAKE_FFMPEG_FAILS_GIF_PASS: &str = "#!/bin/sh\n\
for arg; do\n\
  if [ \"$arg\" = \"-lavfi\" ]; then echo 'paletteuse: broken' >&2; exit 1; fi\n\
done\n\
for last; do :; done\n\
printf 'PNG' > \"$last\"\n";

/// Writing a script while another test forks can make its exec fail with ETXTBSY.
static SCRIPT_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Never finishes on its own.
const FAKE_FFMPEG_HANGS: &str = "#!/bin/sh\nexec sleep 30\n";

fn install_script(dir: &Path, script: &str) -> String {
    let bin = dir.join("ffmpeg");
    std::fs::write(&bin, script).unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
    bin.to_string_lossy().to_string()
}

async fn video_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/video.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 256]))
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn pipeline_config(root: &Path, script: &str) -> PipelineConfig {
    let mut config = PipelineConfig::new(root.join("tasks"), "https://host:8000");
    config.scratch_dir = root.join("scratch");
    config.ffmpeg_bin = install_script(root, script);
    config
}

fn scratch_entries(root: &Path) -> usize {
    std::fs::read_dir(root.join("scratch")).unwrap().count()
}

#[tokio::test]
async fn test_transcode_moves_gif_into_tasks_dir() {
    let _serial = SCRIPT_LOCK.lock().await;
    let server = video_server().await;
    let root = TempDir::new().unwrap();
    let pipeline = GifPipeline::new(pipeline_config(root.path(), FAKE_FFMPEG)).unwrap();

    let id = JobId::new();
    let url = pipeline
        .transcode(&format!("{}/video.mp4", server.uri()), &id)
        .await
        .unwrap();

    assert_eq!(url, format!("https://host:8000/tasks/{}.gif", id));
    assert!(pipeline.is_transcoded(&url));

    let artifact = root.path().join("tasks").join(format!("{}.gif", id));
    assert_eq!(std::fs::read(artifact).unwrap(), b"GIF89a");
    assert_eq!(scratch_entries(root.path()), 0);
}

#[tokio::test]
async fn test_gif_pass_failure_is_transcode_error() {
    let _serial = SCRIPT_LOCK.lock().await;
    let server = video_server().await;
    let root = TempDir::new().unwrap();
    let pipeline =
        GifPipeline::new(pipeline_config(root.path(), FAKE_FFMPEG_FAILS_GIF_PASS)).unwrap();

    let id = JobId::new();
    let err = pipeline
        .transcode(&format!("{}/video.mp4", server.uri()), &id)
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::TranscodeFailed(_)));
    assert_eq!(err.stage(), "transcode");
    assert!(err.to_string().starts_with("Failed to convert video to GIF"));
    assert_eq!(scratch_entries(root.path()), 0);
    assert!(!pipeline.config().artifact_path(&id).exists());
}

#[tokio::test]
async fn test_hung_ffmpeg_is_killed_after_timeout() {
    let _serial = SCRIPT_LOCK.lock().await;
    let server = video_server().await;
    let root = TempDir::new().unwrap();
    let mut config = pipeline_config(root.path(), FAKE_FFMPEG_HANGS);
    config.ffmpeg_timeout = Duration::from_millis(300);
    let pipeline = GifPipeline::new(config).unwrap();

    let err = tokio::time::timeout(
        Duration::from_secs(10),
        pipeline.transcode(&format!("{}/video.mp4", server.uri()), &JobId::new()),
    )
    .await
    .expect("ffmpeg should be bounded by its timeout")
    .unwrap_err();

    match err {
        MediaError::PaletteFailed(inner) => assert!(matches!(*inner, MediaError::Timeout(_))),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(scratch_entries(root.path()), 0);
}
