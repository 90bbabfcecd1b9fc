//! Startup sequence against real config files on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rn_client::ClientBuilder;
use rn_domain::config::LogLevel;
use rn_plugins::PluginCatalog;
use rn_server::bootstrap::{self, StartupError};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// A minimal hashcatdict install: placeholder binary, one dictionary and
/// the plugin's own config file.
fn hashcat_fixture(dir: &Path) -> PathBuf {
    let bin = dir.join("hashcat");
    let words = dir.join("words.txt");
    std::fs::write(&bin, "").unwrap();
    std::fs::write(&words, "password\n").unwrap();

    let conf = dir.join("hashcatdict.toml");
    std::fs::write(
        &conf,
        format!("binary = {bin:?}\n\n[dictionaries]\nwords = {words:?}\n"),
    )
    .unwrap();
    conf
}

fn write_node_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("resourceserver.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn full_config(dir: &Path) -> PathBuf {
    let plugin_conf = hashcat_fixture(dir);
    write_node_config(
        dir,
        &format!(
            "[General]\nAuthToken = \"abc123\"\nLogLevel = \"Debug\"\n\n[Plugins]\nhashcatdict = {plugin_conf:?}\n"
        ),
    )
}

#[test]
fn resolves_bind_address_level_and_plugins() {
    let dir = tempfile::tempdir().unwrap();
    let path = full_config(dir.path());

    let config = bootstrap::load_node_config(&path, "127.0.0.1", "9443").unwrap();
    assert_eq!(config.bind_address().unwrap().to_string(), "127.0.0.1:9443");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.auth_token, "abc123");

    let registry = bootstrap::build_registry(&config, &PluginCatalog::builtin());
    assert_eq!(registry.tool_names(), vec!["hashcatdict"]);
    assert!(registry.authorize("abc123"));
}

#[test]
fn broken_plugin_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_node_config(
        dir.path(),
        "[General]\nAuthToken = \"abc123\"\n\n[Plugins]\nhashcatdict = \"/no/such/hashcatdict.toml\"\n",
    );

    let config = bootstrap::load_node_config(&path, "127.0.0.1", "9443").unwrap();
    let registry = bootstrap::build_registry(&config, &PluginCatalog::builtin());
    assert!(registry.tool_names().is_empty());
}

#[test]
fn missing_token_stops_before_the_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_node_config(
        dir.path(),
        "[General]\nLogLevel = \"Debug\"\n\n[Plugins]\nhashcatdict = \"/etc/dict.conf\"\n",
    );

    let err = bootstrap::load_node_config(&path, "127.0.0.1", "9443").unwrap_err();
    assert!(matches!(err, StartupError::MissingAuthToken));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn missing_sections_have_their_own_exit_codes() {
    let dir = tempfile::tempdir().unwrap();

    let path = write_node_config(dir.path(), "[Plugins]\nhashcatdict = \"/x\"\n");
    let err = bootstrap::load_node_config(&path, "127.0.0.1", "9443").unwrap_err();
    assert_eq!(err.exit_code(), 3, "got {err}");

    let path = write_node_config(dir.path(), "[General]\nAuthToken = \"abc123\"\n[Plugins]\n");
    let err = bootstrap::load_node_config(&path, "127.0.0.1", "9443").unwrap_err();
    assert_eq!(err.exit_code(), 5, "got {err}");
}

#[test]
fn general_settings_resolve_before_plugins_are_checked() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("node.log");
    let path = write_node_config(
        dir.path(),
        &format!("[General]\nAuthToken = \"abc123\"\nLogLevel = \"Warn\"\nLogFile = {log:?}\n"),
    );

    let (file, general) = bootstrap::load_general(&path).unwrap();
    assert_eq!(general.log_level, LogLevel::Warn);
    assert_eq!(general.log_file.as_deref(), Some(log.as_path()));

    let err = bootstrap::resolve_node_config(&file, general, "127.0.0.1", "9443").unwrap_err();
    assert!(matches!(err, StartupError::MissingPlugins));
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn unreadable_or_malformed_config_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = bootstrap::load_node_config(&dir.path().join("absent.toml"), "127.0.0.1", "9443")
        .unwrap_err();
    assert_eq!(err.exit_code(), 2);

    let path = write_node_config(dir.path(), "[General\nAuthToken = ");
    let err = bootstrap::load_node_config(&path, "127.0.0.1", "9443").unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.is_config_error());
}

#[tokio::test]
async fn port_zero_is_a_bind_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = full_config(dir.path());

    let config = bootstrap::load_node_config(&path, "127.0.0.1", "0").unwrap();
    let err = bootstrap::bind(&config).await.unwrap_err();
    assert_eq!(err.exit_code(), 6);
}

#[tokio::test]
async fn port_in_use_is_a_bind_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = full_config(dir.path());

    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port().to_string();

    let config = bootstrap::load_node_config(&path, "127.0.0.1", &port).unwrap();
    let err = bootstrap::bind(&config).await.unwrap_err();
    assert!(matches!(err, StartupError::Bind { .. }));
    assert_eq!(err.exit_code(), 6);
}

#[tokio::test]
async fn serve_answers_controllers_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let path = full_config(dir.path());

    let port = {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        probe.local_addr().unwrap().port()
    };
    let config = bootstrap::load_node_config(&path, "127.0.0.1", &port.to_string()).unwrap();

    let shutdown = CancellationToken::new();
    let node = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { bootstrap::serve(config, &PluginCatalog::builtin(), shutdown).await }
    });

    let client = ClientBuilder::new()
        .url(format!("ws://127.0.0.1:{port}"))
        .token("abc123")
        .connect_timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    // The listener comes up asynchronously.
    let mut session = None;
    for _ in 0..100 {
        match client.connect().await {
            Ok(s) => {
                session = Some(s);
                break;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    let mut session = session.expect("node never started listening");

    let hello = session.hello().await.unwrap();
    assert_eq!(hello.tools.len(), 1);
    assert_eq!(hello.tools[0].name, "hashcatdict");
    session.close().await.unwrap();

    shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), node)
        .await
        .expect("node did not stop")
        .unwrap();
    assert!(result.is_ok());
}
