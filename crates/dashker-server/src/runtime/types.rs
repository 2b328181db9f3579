//! Typed views of the runtime's JSON payloads.
//!
//! Only the fields dashker reads are typed; everything else is kept in
//! `extra` so responses are echoed back to clients unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the container list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Names", default)]
    pub names: Vec<String>,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of inspecting a single container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerInfo {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "State", default)]
    pub state: ContainerState,
    #[serde(rename = "Config", default)]
    pub config: ContainerConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerInfo {
    /// Whether the container was created with a TTY attached.
    pub const fn is_interactive(&self) -> bool {
        self.config.tty
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerState {
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Running", default)]
    pub running: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    #[serde(rename = "Tty", default)]
    pub tty: bool,
    #[serde(rename = "Image", default)]
    pub image: String,
}

/// Which containers to list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerFilter {
    /// Include stopped containers.
    pub all: bool,
    pub id: Option<String>,
}

impl ContainerFilter {
    pub const fn all() -> Self {
        Self { all: true, id: None }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            all: true,
            id: Some(id.into()),
        }
    }

    /// Query string for the list endpoint.
    pub fn query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if self.all {
            query.append_pair("all", "true");
        }
        if let Some(id) = &self.id {
            let filters = serde_json::json!({ "id": [id] });
            query.append_pair("filters", &filters.to_string());
        }
        query.finish()
    }
}

/// Options for opening a container's log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub tail: u32,
    pub follow: bool,
    pub stdout: bool,
    pub stderr: bool,
    pub timestamps: bool,
}

impl LogOptions {
    /// History of `tail` lines, then live output from both streams, timestamped.
    pub const fn follow_with_tail(tail: u32) -> Self {
        Self {
            tail,
            follow: true,
            stdout: true,
            stderr: true,
            timestamps: true,
        }
    }

    pub fn query(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("tail", &self.tail.to_string())
            .append_pair("follow", bool_param(self.follow))
            .append_pair("stdout", bool_param(self.stdout))
            .append_pair("stderr", bool_param(self.stderr))
            .append_pair("timestamps", bool_param(self.timestamps))
            .finish()
    }
}

const fn bool_param(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Exec creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecConfig {
    pub attach_stdin: bool,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    pub tty: bool,
    pub user: String,
    pub cmd: Vec<String>,
}

impl ExecConfig {
    /// Fully attached TTY session running `cmd` as `user`.
    pub fn interactive(cmd: Vec<String>, user: impl Into<String>) -> Self {
        Self {
            attach_stdin: true,
            attach_stdout: true,
            attach_stderr: true,
            tty: true,
            user: user.into(),
            cmd,
        }
    }
}

/// Exec inspection result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ExecState {
    #[serde(rename = "Running")]
    pub running: bool,
    #[serde(rename = "ExitCode", default)]
    pub exit_code: Option<i64>,
}

/// Lifecycle event published by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeEvent {
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(rename = "Action", default)]
    pub action: String,
    #[serde(rename = "Actor", default)]
    pub actor: EventActor,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventActor {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Attributes", default)]
    pub attributes: HashMap<String, String>,
}
