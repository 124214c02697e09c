mod common;

use assetfetch::{batch, config::Config, transport::TransportError, AssetFetcher, FetchError};
use common::{bytes, quick_options, Scripted, ScriptedTransport};

fn manifest(dir: &std::path::Path) -> Config {
    let toml = format!(
        r#"
        [[asset]]
        name = "detector"
        destination = "{dir}/detector.tflite"
        min_bytes = 50

        [[asset.source]]
        url = "detector-mirror"

        [[asset]]
        name = "landmarker"
        destination = "{dir}/landmarker.task"
        min_bytes = 50

        [[asset.source]]
        url = "landmarker-primary"

        [[asset.source]]
        url = "landmarker-backup"
        "#,
        dir = dir.display()
    );
    Config::parse(&toml).unwrap()
}

#[tokio::test]
async fn partial_batch_counts_as_success_unless_all_required() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = manifest(dir.path());
    let transport = ScriptedTransport::new()
        .with("detector-mirror", Scripted::Body(bytes(80)))
        .with("landmarker-primary", Scripted::Fail(TransportError::NotFound))
        .with("landmarker-backup", Scripted::Body(bytes(10)));
    let fetcher = AssetFetcher::with_options(transport, quick_options());

    let report = batch::fetch_all(&fetcher, &cfg.assets).await;

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert!(report.is_success(false));
    assert!(!report.is_success(true));
    assert_eq!(report.exit_code(false), 0);
    assert_eq!(report.exit_code(true), FetchError::EXIT_EXHAUSTED);
    let listing = report.listing();
    assert_eq!(listing, vec![(dir.path().join("detector.tflite"), 80)]);
    assert_eq!(fetcher.transport().calls(), ["detector-mirror", "landmarker-primary", "landmarker-backup"]);
}

#[tokio::test]
async fn relocated_batch_writes_into_override_dir() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let cfg = manifest(dir.path());
    let assets: Vec<_> = cfg.assets.iter().map(|a| a.relocated(out.path())).collect();
    let transport = ScriptedTransport::new()
        .with("detector-mirror", Scripted::Body(bytes(60)))
        .with("landmarker-primary", Scripted::Body(bytes(70)));
    let fetcher = AssetFetcher::with_options(transport, quick_options());

    let report = batch::fetch_all(&fetcher, &assets).await;

    assert!(report.is_success(true));
    assert_eq!(report.exit_code(true), 0);
    assert!(out.path().join("detector.tflite").exists());
    assert!(out.path().join("landmarker.task").exists());
    assert!(!dir.path().join("detector.tflite").exists());
}

#[tokio::test]
async fn nothing_downloaded_is_failure() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = manifest(dir.path());
    let fetcher = AssetFetcher::with_options(ScriptedTransport::new(), quick_options());

    let report = batch::fetch_all(&fetcher, &cfg.assets).await;

    assert_eq!(report.succeeded(), 0);
    assert!(!report.is_success(false));
    assert_eq!(report.exit_code(false), FetchError::EXIT_EXHAUSTED);
    assert_eq!(report.exit_code(true), FetchError::EXIT_EXHAUSTED);
    assert!(report.listing().is_empty());
}
