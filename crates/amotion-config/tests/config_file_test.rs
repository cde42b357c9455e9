#![allow(clippy::unwrap_used)]

use amotion_config::{Config, ConfigError, Profile, load_config_from, save_config_to};
use pretty_assertions::assert_eq;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();

    assert_eq!(cfg.default_profile.as_deref(), Some("default"));
    assert_eq!(cfg.defaults.output, "table");
    assert_eq!(cfg.defaults.timeout, 10);
    assert!(cfg.profiles.is_empty());
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[profiles.loft\nhost = \"192.168.1.50\"\n").unwrap();

    let err = load_config_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Figment(_)), "{err}");
}

#[test]
fn profiles_are_read_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_profile = "loft"

[defaults]
output = "json"

[profiles.loft]
host = "192.168.1.50"
username = "admin"
model = "aMotion"
production_number = "1234"

[profiles.garage]
host = "garage.local:8080"
timeout = 3
"#,
    )
    .unwrap();

    let cfg = load_config_from(&path).unwrap();
    assert_eq!(cfg.defaults.output, "json");
    assert_eq!(cfg.defaults.health_interval, 60);

    let (name, loft) = cfg.profile(None).unwrap();
    assert_eq!(name, "loft");
    assert_eq!(loft.username.as_deref(), Some("admin"));
    assert_eq!(loft.device().production_number.as_deref(), Some("1234"));

    let (_, garage) = cfg.profile(Some("garage")).unwrap();
    assert_eq!(garage.timeout, Some(3));
    assert!(garage.password.is_none());
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut cfg = Config::default();
    cfg.profiles.insert(
        "default".into(),
        Profile {
            host: "10.0.0.7".into(),
            username: Some("admin".into()),
            version: Some("2.4".into()),
            ..Profile::default()
        },
    );
    save_config_to(&cfg, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("[profiles.default]"));
    assert!(!text.contains("password"));

    let loaded = load_config_from(&path).unwrap();
    let (_, profile) = loaded.profile(None).unwrap();
    assert_eq!(profile.host, "10.0.0.7");
    assert_eq!(profile.version.as_deref(), Some("2.4"));
}
