use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use detect_stream::config::DaemonConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "DETECT_CONFIG",
        "DETECT_SOURCE",
        "DETECT_MODEL",
        "DETECT_CONFIDENCE",
        "DETECT_IOU",
        "DETECT_IMAGE_SIZE",
        "DETECT_CLASSES",
        "DETECT_CADENCE_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": { "uri": "rtsp://camera-1/stream" },
        "detector": {
            "model": "models/det.onnx",
            "confidence": 0.4,
            "iou": 0.5,
            "image_size": 320,
            "classes": ["person"]
        },
        "session": { "cadence_secs": 0.5 }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("DETECT_CONFIG", file.path());
    std::env::set_var("DETECT_SOURCE", "stub://override");
    std::env::set_var("DETECT_CADENCE_SECS", "2");

    let cfg = DaemonConfig::load().expect("load config");
    assert_eq!(cfg.source, "stub://override");
    assert_eq!(
        cfg.model.as_deref(),
        Some(std::path::Path::new("models/det.onnx"))
    );
    assert_eq!(cfg.options.confidence, 0.4);
    assert_eq!(cfg.options.iou, 0.5);
    assert_eq!(cfg.options.image_size, 320);
    assert_eq!(cfg.options.classes, Some(vec!["person".to_string()]));
    assert_eq!(cfg.cadence, Duration::from_secs(2));

    clear_env();
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = DaemonConfig::load().expect("load config");
    assert_eq!(cfg.source, "stub://camera");
    assert!(cfg.model.is_none());
    assert_eq!(cfg.options.confidence, 0.25);
    assert_eq!(cfg.options.iou, 0.7);
    assert_eq!(cfg.options.image_size, 640);
    assert_eq!(cfg.cadence, Duration::from_secs(1));
}

#[test]
fn env_class_filter_splits_csv() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DETECT_CLASSES", "person, car");
    let cfg = DaemonConfig::load().expect("load config");
    assert_eq!(
        cfg.options.classes,
        Some(vec!["person".to_string(), "car".to_string()])
    );
    clear_env();
}

#[test]
fn invalid_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DETECT_CONFIDENCE", "not-a-number");
    assert!(DaemonConfig::load().is_err());
    clear_env();

    std::env::set_var("DETECT_CADENCE_SECS", "-1");
    assert!(DaemonConfig::load().is_err());
    clear_env();

    // Out of Duration range; must be a config error, not a panic.
    std::env::set_var("DETECT_CADENCE_SECS", "1e30");
    assert!(DaemonConfig::load().is_err());
    clear_env();

    std::env::set_var("DETECT_CONFIDENCE", "3.0");
    assert!(DaemonConfig::load().is_err());
    clear_env();
}
