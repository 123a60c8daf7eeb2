//! Camera session mode-switch behavior: a still capture must always leave
//! the session streaming again, whether the capture worked or not.

use anyhow::Result;
use regex::Regex;
use scanbench::camera::registry::CameraRegistry;
use scanbench::camera::SessionMode;
use scanbench::hardware::mock::{MockCameraFleet, MockCameraSpec};
use std::time::Duration;

async fn single_camera_registry(spec: MockCameraSpec) -> Result<CameraRegistry> {
    let fleet = MockCameraFleet::new(vec![spec]);
    Ok(CameraRegistry::initialize(&fleet).await?)
}

#[tokio::test]
async fn capture_returns_full_resolution_still_and_resumes_streaming() -> Result<()> {
    let registry = single_camera_registry(MockCameraSpec {
        model: Some("bench_cam".to_string()),
        still_size: (256, 192),
        ..MockCameraSpec::default()
    })
    .await?;
    let session = registry.get("cam0")?;

    // Preview is flowing before the capture.
    session.frames().await_next().await?;

    let still = session.capture_still().await?;
    let decoded = image::load_from_memory(&still)?;
    assert_eq!(
        (decoded.width(), decoded.height()),
        (256, 192),
        "still must use the full-resolution profile"
    );

    // Back in streaming mode, and frames keep arriving.
    assert_eq!(session.mode(), SessionMode::Streaming);
    tokio::time::timeout(Duration::from_secs(2), session.frames().await_next()).await??;

    registry.stop_all().await?;
    Ok(())
}

#[tokio::test]
async fn failed_capture_still_restores_streaming() -> Result<()> {
    let registry = single_camera_registry(MockCameraSpec {
        fail_capture: true,
        ..MockCameraSpec::default()
    })
    .await?;
    let session = registry.get("cam0")?;

    let err = session.capture_still().await.unwrap_err();
    assert!(err.to_string().contains("Capture failed"));

    // Cleanup ran: the session is streaming again and produces frames.
    assert_eq!(session.mode(), SessionMode::Streaming);
    tokio::time::timeout(Duration::from_secs(2), session.frames().await_next()).await??;

    registry.stop_all().await?;
    Ok(())
}

#[tokio::test]
async fn temp_file_fallback_reads_bytes_back() -> Result<()> {
    let registry = single_camera_registry(MockCameraSpec {
        capture_to_file: true,
        ..MockCameraSpec::default()
    })
    .await?;
    let session = registry.get("cam0")?;

    let still = session.capture_still().await?;
    assert!(image::load_from_memory(&still).is_ok());
    assert_eq!(session.mode(), SessionMode::Streaming);

    registry.stop_all().await?;
    Ok(())
}

#[tokio::test]
async fn capture_to_file_embeds_label_and_microsecond_timestamp() -> Result<()> {
    let registry = single_camera_registry(MockCameraSpec::with_model("bench_cam")).await?;
    let session = registry.get("cam0")?;

    let dir = tempfile::tempdir()?;
    let first = session.capture_still_to_file(dir.path()).await?;
    let second = session.capture_still_to_file(dir.path()).await?;

    let pattern = Regex::new(r"^bench_cam_\d{8}_\d{6}_\d{6}\.jpg$")?;
    for path in [&first, &second] {
        assert!(path.exists());
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        assert!(
            pattern.is_match(name),
            "unexpected capture file name: {}",
            name
        );
    }
    // Microsecond timestamps keep rapid captures distinct.
    assert_ne!(first, second);

    registry.stop_all().await?;
    Ok(())
}

#[tokio::test]
async fn concurrent_captures_serialize_cleanly() -> Result<()> {
    let registry = single_camera_registry(MockCameraSpec::default()).await?;
    let session = registry.get("cam0")?;

    let a = {
        let session = session.clone();
        tokio::spawn(async move { session.capture_still().await })
    };
    let b = {
        let session = session.clone();
        tokio::spawn(async move { session.capture_still().await })
    };

    assert!(a.await?.is_ok());
    assert!(b.await?.is_ok());
    assert_eq!(session.mode(), SessionMode::Streaming);

    registry.stop_all().await?;
    Ok(())
}
