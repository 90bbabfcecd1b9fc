use std::io::Write;

use rn_domain::config::{ConfigFile, LogLevel, NodeConfig, DEFAULT_HOST, DEFAULT_PORT};
use rn_domain::Error;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_config_from_disk() {
    let file = write_config(
        r#"
[General]
AuthToken = "abc123"
LogLevel = "Warn"
LogFile = "/tmp/node.log"

[Plugins]
hashcatdict = "/etc/dict.conf"
"#,
    );
    let parsed = ConfigFile::load(file.path()).unwrap();
    let cfg = NodeConfig::resolve(&parsed, DEFAULT_HOST, DEFAULT_PORT).unwrap();
    assert_eq!(cfg.log_level, LogLevel::Warn);
    assert_eq!(cfg.log_file.as_deref(), Some(std::path::Path::new("/tmp/node.log")));
    assert_eq!(cfg.bind_address().unwrap().to_string(), "0.0.0.0:9443");
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigFile::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::ConfigRead { .. }), "got {err:?}");
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let file = write_config("[General\nAuthToken = ");
    let err = ConfigFile::load(file.path()).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }), "got {err:?}");
}

#[test]
fn non_string_plugin_value_is_a_parse_error() {
    let file = write_config("[General]\nAuthToken = \"t\"\n[Plugins]\nhashcatdict = 3\n");
    assert!(matches!(
        ConfigFile::load(file.path()),
        Err(Error::ConfigParse { .. })
    ));
}
