use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use roadwatch::config::RoadwatchConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ROADWATCH_CONFIG",
        "ROADWATCH_SOURCE",
        "ROADWATCH_FPS",
        "ROADWATCH_BACKEND",
        "ROADWATCH_MODEL",
        "ROADWATCH_OUTPUT",
        "ROADWATCH_HEADLESS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = RoadwatchConfig::load().expect("load config");

    assert_eq!(cfg.source.identifier, "stub://traffic");
    assert_eq!(cfg.source.target_fps, 10);
    assert_eq!(cfg.source.width, 640);
    assert_eq!(cfg.source.height, 480);
    assert_eq!(cfg.detector_backend, "stub");
    assert_eq!(cfg.detector.scale_factor, 1.1);
    assert_eq!(cfg.detector.min_neighbors, 5);
    assert_eq!(cfg.detector.min_size, 30);
    assert!(cfg.detector.model_path.is_none());
    assert!(cfg.output_path.is_none());
    assert!(cfg.display_enabled);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "identifier": "campus_traffic.mp4",
            "target_fps": 25,
            "width": 1280,
            "height": 720
        },
        "detector": {
            "backend": "cascade",
            "model_path": "vehicle_detection.xml",
            "scale_factor": 1.2,
            "min_neighbors": 6,
            "min_size": 48
        },
        "output": {
            "path": "annotated_out"
        },
        "display": {
            "enabled": false
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("ROADWATCH_CONFIG", file.path());
    std::env::set_var("ROADWATCH_SOURCE", "stub://override?frames=5");
    std::env::set_var("ROADWATCH_FPS", "12");

    let cfg = RoadwatchConfig::load().expect("load config");

    assert_eq!(cfg.source.identifier, "stub://override?frames=5");
    assert_eq!(cfg.source.target_fps, 12);
    assert_eq!(cfg.source.width, 1280);
    assert_eq!(cfg.source.height, 720);
    assert_eq!(cfg.detector_backend, "cascade");
    assert_eq!(
        cfg.detector.model_path,
        Some(PathBuf::from("vehicle_detection.xml"))
    );
    assert_eq!(cfg.detector.scale_factor, 1.2);
    assert_eq!(cfg.detector.min_neighbors, 6);
    assert_eq!(cfg.detector.min_size, 48);
    assert_eq!(cfg.output_path, Some(PathBuf::from("annotated_out")));
    assert!(!cfg.display_enabled);

    clear_env();
}

#[test]
fn headless_env_var_disables_display() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ROADWATCH_HEADLESS", "1");
    let cfg = RoadwatchConfig::load().expect("load config");
    assert!(!cfg.display_enabled);

    std::env::set_var("ROADWATCH_HEADLESS", "sometimes");
    assert!(RoadwatchConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ROADWATCH_FPS", "abc");
    assert!(RoadwatchConfig::load().is_err());
    clear_env();

    std::env::set_var("ROADWATCH_FPS", "0");
    assert!(RoadwatchConfig::load().is_err());
    clear_env();

    std::env::set_var("ROADWATCH_SOURCE", "rtsp://camera-1");
    assert!(RoadwatchConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "detector": { "scale_factor": 1.0 } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("ROADWATCH_CONFIG", file.path());
    assert!(RoadwatchConfig::load().is_err());

    clear_env();
}
