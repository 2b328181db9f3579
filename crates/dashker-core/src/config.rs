//! Configuration resolution for dashker.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/dashker/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete dashker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub streams: StreamConfig,
}

/// HTTP / WebSocket listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Origins allowed to open socket sessions and make CORS requests.
    pub allowed_origins: Vec<String>,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3001".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            log_level: "info".to_string(),
        }
    }
}

/// Container runtime connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub socket_path: PathBuf,
    /// Engine API version prefix, e.g. `v1.43`. Unversioned paths when unset.
    pub api_version: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/var/run/docker.sock"),
            api_version: None,
        }
    }
}

/// Tunables for the log, terminal and event streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Number of historical log lines replayed before following.
    pub log_tail: u32,
    pub exec_command: Vec<String>,
    pub exec_user: String,
    pub terminal_buffer_bytes: usize,
    pub liveness_poll_interval_ms: u64,
    pub liveness_max_failures: u32,
    pub max_frame_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            log_tail: 100,
            exec_command: vec!["/bin/sh".to_string(), "-i".to_string()],
            exec_user: "root".to_string(),
            terminal_buffer_bytes: 1024,
            liveness_poll_interval_ms: 500,
            liveness_max_failures: 3,
            max_frame_bytes: 8 * 1024 * 1024, // 8 MB
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let global = global_config_path().filter(|path| path.exists());
    let layers = global.as_deref().into_iter().chain(explicit);
    let mut config = load_layers(layers)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Overlay config files in order, field by field, on top of the defaults.
///
/// A later file only replaces the keys it actually sets.
pub fn load_layers<'a, I>(paths: I) -> Result<Config>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut merged = serde_json::to_value(Config::default())?;
    let mut source = None;
    for path in paths {
        merge_json(&mut merged, read_layer(path)?);
        source = Some(path);
    }
    serde_json::from_value(merged).map_err(|e| {
        let origin = source.map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
        Error::Config(format!("Invalid configuration after applying {origin}: {e}"))
    })
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".dashker").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/dashker/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("dashker").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn read_layer(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let layer: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    if !layer.is_object() {
        return Err(Error::Config(format!(
            "Config file {} must contain a JSON object",
            path.display()
        )));
    }
    Ok(layer)
}

fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_json(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Apply `DASHKER_*` (and `DOCKER_HOST`) overrides read through `lookup`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("DASHKER_LISTEN_ADDR") {
        config.server.listen_addr = val;
    }
    if let Some(val) = lookup("DASHKER_ALLOWED_ORIGINS") {
        config.server.allowed_origins = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();
    }
    if let Some(val) = lookup("DASHKER_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Some(val) = lookup("DOCKER_HOST") {
        match val.strip_prefix("unix://") {
            Some(path) => config.runtime.socket_path = PathBuf::from(path),
            None => tracing::warn!(docker_host = %val, "Ignoring non-unix DOCKER_HOST"),
        }
    }
    if let Some(val) = lookup("DASHKER_DOCKER_SOCKET") {
        config.runtime.socket_path = PathBuf::from(val);
    }
    if let Some(val) = lookup("DASHKER_DOCKER_API_VERSION") {
        config.runtime.api_version = Some(val);
    }
    if let Some(val) = lookup("DASHKER_LOG_TAIL") {
        if let Ok(n) = val.parse() {
            config.streams.log_tail = n;
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_allows_dashboard_origin() {
        let config = Config::default();
        assert_eq!(config.server.allowed_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn default_config_tails_100_lines() {
        let config = Config::default();
        assert_eq!(config.streams.log_tail, 100);
    }

    #[test]
    fn default_config_gives_up_after_3_liveness_failures() {
        let config = Config::default();
        assert_eq!(config.streams.liveness_max_failures, 3);
        assert_eq!(config.streams.terminal_buffer_bytes, 1024);
        assert_eq!(config.streams.exec_command, vec!["/bin/sh", "-i"]);
    }

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "settings.json", r#"{"server": {"listen_addr": "127.0.0.1:9000"}}"#);

        let config = load_layers([path.as_path()]).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.server.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.streams.log_tail, 100);
    }

    #[test]
    fn explicit_file_keeps_global_values_it_does_not_set() {
        let dir = tempfile::tempdir().unwrap();
        let global = write(
            &dir,
            "global.json",
            r#"{"streams": {"log_tail": 500}, "runtime": {"socket_path": "/run/podman.sock"}}"#,
        );
        let explicit = write(
            &dir,
            "explicit.json",
            r#"{"server": {"listen_addr": "127.0.0.1:9000"}, "streams": {"exec_user": "app"}}"#,
        );

        let config = load_layers([global.as_path(), explicit.as_path()]).unwrap();
        assert_eq!(config.streams.log_tail, 500);
        assert_eq!(config.streams.exec_user, "app");
        assert_eq!(config.runtime.socket_path, PathBuf::from("/run/podman.sock"));
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.server.allowed_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn later_file_wins_on_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let global = write(&dir, "global.json", r#"{"runtime": {"api_version": "v1.41"}}"#);
        let explicit = write(&dir, "explicit.json", r#"{"runtime": {"api_version": "v1.44"}}"#);

        let config = load_layers([global.as_path(), explicit.as_path()]).unwrap();
        assert_eq!(config.runtime.api_version.as_deref(), Some("v1.44"));
    }

    #[test]
    fn no_files_gives_defaults() {
        let config = load_layers(std::iter::empty()).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:3001");
    }

    #[test]
    fn invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "settings.json", "{ not json");

        let err = load_layers([path.as_path()]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn wrongly_typed_value_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "settings.json", r#"{"streams": {"log_tail": "lots"}}"#);

        let err = load_layers([path.as_path()]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_split_origins() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[("DASHKER_ALLOWED_ORIGINS", "http://a.test, http://b.test,")]),
        );
        assert_eq!(config.server.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn explicit_socket_wins_over_docker_host() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("DOCKER_HOST", "unix:///run/user/1000/docker.sock"),
                ("DASHKER_DOCKER_SOCKET", "/tmp/docker.sock"),
            ]),
        );
        assert_eq!(config.runtime.socket_path, PathBuf::from("/tmp/docker.sock"));
    }

    #[test]
    fn tcp_docker_host_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[("DOCKER_HOST", "tcp://10.0.0.1:2375")]));
        assert_eq!(config.runtime.socket_path, PathBuf::from("/var/run/docker.sock"));
    }

    #[test]
    fn unparsable_tail_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, env(&[("DASHKER_LOG_TAIL", "lots")]));
        assert_eq!(config.streams.log_tail, 100);
    }
}
