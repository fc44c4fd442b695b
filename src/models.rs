// src/models.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{
    DEFAULT_HOST_ARGS, DEFAULT_JSON_DEPTH, DEFAULT_MAX_RUNSPACES, DEFAULT_MIN_RUNSPACES,
};

// --- PIPELINE MODELS ---
// What a session stages and what an engine hands back.

/// A single command in a staged pipeline, with its named parameters and
/// positional arguments in the order they were added.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedCommand {
    /// Command name as PowerShell resolves it, e.g. `Get-Process`.
    pub name: String,
    /// Named parameters, bound as `-Name:value`.
    pub parameters: Vec<(String, Value)>,
    /// Positional arguments, after the parameters.
    pub arguments: Vec<Value>,
}

impl StagedCommand {
    /// A command with nothing bound yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            arguments: Vec::new(),
        }
    }

    /// Adds a named parameter (`-Name value`).
    pub fn parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Adds a positional argument.
    pub fn argument(&mut self, value: impl Into<Value>) -> &mut Self {
        self.arguments.push(value.into());
        self
    }

    /// The value staged for a named parameter, if any.
    pub fn get_parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// One structured output object produced by a command.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    properties: Map<String, Value>,
}

impl Record {
    /// Looks up a property by name.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Every property, in the order the host serialized them.
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }
}

impl From<Value> for Record {
    /// Objects keep their properties; scalars and arrays land under a single `value` property.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(properties) => Self { properties },
            other => {
                let mut properties = Map::new();
                properties.insert("value".to_string(), other);
                Self { properties }
            }
        }
    }
}

/// The outcome of one pipeline invocation that did not fail with a terminating error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    /// Output records, in pipeline order.
    pub records: Vec<Record>,
    /// Set when the engine reported any error, terminating or not, during the invocation.
    pub had_errors: bool,
    /// Messages of the errors behind `had_errors`.
    pub errors: Vec<String>,
}

// --- CALL ARGUMENTS ---

/// One argument of a dynamic call. Named when `name` is set, positional otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// Parameter name, without the leading `-`.
    pub name: Option<String>,
    /// The bound value.
    pub value: Value,
}

/// The arguments of a dynamic cmdlet call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs(Vec<Argument>);

impl CallArgs {
    /// No arguments at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Named arguments only, in order.
    pub fn named<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(name, value)| Argument {
                    name: Some(name.into()),
                    value: value.into(),
                })
                .collect(),
        )
    }

    /// Positional arguments only. These are never staged by a cmdlet call.
    pub fn positional<V, I>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self(
            values
                .into_iter()
                .map(|value| Argument {
                    name: None,
                    value: value.into(),
                })
                .collect(),
        )
    }

    /// Appends a named argument.
    pub fn with_named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push(Argument {
            name: Some(name.into()),
            value: value.into(),
        });
        self
    }

    /// Appends a positional argument.
    pub fn with_positional(mut self, value: impl Into<Value>) -> Self {
        self.0.push(Argument {
            name: None,
            value: value.into(),
        });
        self
    }

    /// True when no argument was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of supplied arguments, named or not.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the name/value pairs when every argument is named, `None` if any is positional.
    pub fn into_named(self) -> Option<Vec<(String, Value)>> {
        self.0
            .into_iter()
            .map(|arg| arg.name.map(|name| (name, arg.value)))
            .collect()
    }
}

// --- `config.toml` MODEL ---

/// Engine and pool settings, read from `~/.config/psenv/config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Path or name of the PowerShell executable. Probed on `PATH` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    /// Host arguments. The default starts a non-interactive host reading from stdin.
    #[serde(default = "default_host_args")]
    pub args: Vec<String>,
    /// Hosts spawned when the pool opens.
    #[serde(default = "default_min_runspaces")]
    pub min_runspaces: usize,
    /// Most hosts the pool keeps alive at once.
    #[serde(default = "default_max_runspaces")]
    pub max_runspaces: usize,
    /// How deep result records are serialized.
    #[serde(default = "default_json_depth")]
    pub json_depth: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: None,
            args: default_host_args(),
            min_runspaces: DEFAULT_MIN_RUNSPACES,
            max_runspaces: DEFAULT_MAX_RUNSPACES,
            json_depth: DEFAULT_JSON_DEPTH,
        }
    }
}

fn default_host_args() -> Vec<String> {
    DEFAULT_HOST_ARGS.iter().map(|s| s.to_string()).collect()
}

fn default_min_runspaces() -> usize {
    DEFAULT_MIN_RUNSPACES
}

fn default_max_runspaces() -> usize {
    DEFAULT_MAX_RUNSPACES
}

fn default_json_depth() -> u32 {
    DEFAULT_JSON_DEPTH
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_object_keeps_properties() {
        let record = Record::from(json!({"ProcessName": "explorer", "Id": 42}));
        assert_eq!(record.property("ProcessName"), Some(&json!("explorer")));
        assert_eq!(record.property("Id"), Some(&json!(42)));
        assert!(record.property("Missing").is_none());
    }

    #[test]
    fn test_record_from_scalar_wraps_value() {
        let record = Record::from(json!("hello"));
        assert_eq!(record.properties().len(), 1);
        assert_eq!(record.property("value"), Some(&json!("hello")));
    }

    #[test]
    fn test_call_args_all_named() {
        let args = CallArgs::named([("Name", "explorer"), ("Id", "7")]);
        let named = args.into_named().unwrap();
        assert_eq!(named.len(), 2);
        assert_eq!(named[0], ("Name".to_string(), json!("explorer")));
    }

    #[test]
    fn test_call_args_with_any_positional_is_not_named() {
        assert!(CallArgs::positional(["explorer"]).into_named().is_none());
        let mixed = CallArgs::none()
            .with_positional("explorer")
            .with_named("Id", 7);
        assert!(mixed.into_named().is_none());
    }

    #[test]
    fn test_empty_call_args_are_trivially_named() {
        assert_eq!(CallArgs::none().into_named(), Some(Vec::new()));
    }

    #[test]
    fn test_engine_config_defaults_from_empty_toml() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.min_runspaces, 1);
        assert_eq!(config.max_runspaces, 5);
        assert_eq!(config.json_depth, 2);
        assert!(config.args.iter().any(|a| a == "-NonInteractive"));
    }

    #[test]
    fn test_staged_command_parameter_lookup() {
        let mut command = StagedCommand::new("Install-Module");
        command.parameter("Name", "Pester").parameter("AllowClobber", true);
        assert_eq!(command.get_parameter("AllowClobber"), Some(&json!(true)));
        assert!(command.get_parameter("Scope").is_none());
    }
}
