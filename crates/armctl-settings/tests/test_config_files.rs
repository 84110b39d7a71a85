use armctl_core::SequenceEntry;
use armctl_settings::{load_catalog, save_catalog, Config, ConnectionType, SettingsError};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_toml_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.connection.driver = ConnectionType::Tcp;
    config.connection.port = "192.168.1.40:2000".to_string();
    config.motion.default_speed_ms = Some(15);
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let mut config = Config::default();
    config.motion.native_wave = true;
    config.events.history_size = 10;
    config.save_to_file(&path).unwrap();

    assert_eq!(Config::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[connection]\nport = \"/dev/ttyACM0\"\nstatus_poll_ms = 0\n",
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();
    assert_eq!(config.connection.port, "/dev/ttyACM0");
    assert_eq!(config.connection.baud_rate, 115_200);
    assert_eq!(config.motion.pick_place_delay_ms, 100);
    assert!(config.connection_params(None).status_poll_interval.is_none());
    assert_eq!(
        config.controller_config().dispatcher.pacing.wave,
        Duration::from_millis(500)
    );
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[connection]\nbaud_rate = 0\n").unwrap();
    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::InvalidSetting { .. })
    ));

    std::fs::write(&path, "[connection\n").unwrap();
    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::LoadError { .. })
    ));
}

#[test]
fn test_invalid_config_is_not_saved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.connection.read_timeout_ms = 0;
    assert!(config.save_to_file(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_catalog_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sequences.json");
    let entries = vec![SequenceEntry::new(0, "foo"), SequenceEntry::new(1, "bar")];

    save_catalog(&path, &entries).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"note\""));

    assert_eq!(load_catalog(&path).unwrap(), entries);
}
