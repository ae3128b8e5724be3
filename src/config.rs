//! Detection configuration.
//!
//! Resolution order: CLI argument → `DETECTION_CONFIG` environment variable
//! → built-in defaults. The file is JSON; object order is preserved, so
//! extra checks keep the order they are written in.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::checks::{CheckDefinition, UaPattern};
use crate::error::{DetectionError, Result};
use crate::value::{Candidates, CheckValue};

/// Environment variable naming a config file.
pub const ENV_CONFIG_PATH: &str = "DETECTION_CONFIG";

/// Where the configuration came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,
    /// Set via environment variable.
    Environment,
    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Options and extra checks for a [`crate::Client`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    /// Annotate the document root as soon as the client is built.
    pub auto_annotate: bool,
    /// Rewrite a `no-js` root class to `js`.
    pub replace_no_js: bool,
    /// name → pattern, or `{ "pattern": .., "negate": .. }`
    pub user_agents: Map<String, Value>,
    /// name → space-delimited string or array of property names
    pub properties: Map<String, Value>,
    /// name → value literal, or `{ "value": .., "property": .. }`
    pub units: Map<String, Value>,
    /// name → boolean
    pub tests: Map<String, Value>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            auto_annotate: false,
            replace_no_js: true,
            user_agents: Map::new(),
            properties: Map::new(),
            units: Map::new(),
            tests: Map::new(),
        }
    }
}

impl DetectionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| DetectionError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        debug!(path = %path.display(), "loaded detection config");
        Ok(config)
    }

    /// Extra table checks in file order: user agents, properties, units.
    pub fn extra_checks(&self) -> Result<Vec<(String, CheckDefinition)>> {
        let mut checks = Vec::new();

        for (name, value) in &self.user_agents {
            checks.push((name.clone(), user_agent_definition(name, value)?));
        }
        for (name, value) in &self.properties {
            let candidates = Candidates::from_json(&format!("properties.{name}"), value)?;
            checks.push((name.clone(), CheckDefinition::CssProperty(candidates)));
        }
        for (name, value) in &self.units {
            checks.push((name.clone(), unit_definition(name, value)?));
        }

        Ok(checks)
    }

    /// Literal tests in file order.
    pub fn literal_tests(&self) -> Result<Vec<(String, CheckValue)>> {
        self.tests
            .iter()
            .map(|(name, value)| match value {
                Value::Bool(flag) => Ok((name.clone(), CheckValue::Flag(*flag))),
                other => Err(DetectionError::unexpected_json(
                    &format!("tests.{name}"),
                    "a boolean",
                    other,
                )),
            })
            .collect()
    }
}

fn user_agent_definition(name: &str, value: &Value) -> Result<CheckDefinition> {
    let context = format!("user_agents.{name}");
    let (pattern, negate) = match value {
        Value::String(pattern) => (pattern.as_str(), false),
        Value::Object(fields) => {
            let pattern = string_field(&context, fields, "pattern")?
                .ok_or_else(|| DetectionError::unexpected_json(&context, "a pattern", value))?;
            let negate = match fields.get("negate") {
                None => false,
                Some(Value::Bool(negate)) => *negate,
                Some(other) => {
                    return Err(DetectionError::unexpected_json(&context, "a boolean", other))
                }
            };
            (pattern, negate)
        }
        other => {
            return Err(DetectionError::unexpected_json(
                &context,
                "a string or a pattern object",
                other,
            ))
        }
    };
    Ok(CheckDefinition::UserAgent(UaPattern::new(pattern, negate)?))
}

fn unit_definition(name: &str, value: &Value) -> Result<CheckDefinition> {
    let context = format!("units.{name}");
    match value {
        Value::String(literal) => Ok(CheckDefinition::CssValue {
            value: literal.clone(),
            property: None,
        }),
        Value::Object(fields) => {
            let literal = string_field(&context, fields, "value")?
                .ok_or_else(|| DetectionError::unexpected_json(&context, "a value", value))?;
            let property = string_field(&context, fields, "property")?;
            Ok(CheckDefinition::CssValue {
                value: literal.to_string(),
                property: property.map(str::to_string),
            })
        }
        other => Err(DetectionError::unexpected_json(
            &context,
            "a string or a value object",
            other,
        )),
    }
}

fn string_field<'a>(
    context: &str,
    fields: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a str>> {
    match fields.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(DetectionError::unexpected_json(context, "a string", other)),
    }
}

/// Locates the config file: explicit path first, then the environment.
pub fn resolve_config_path(cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    if let Some(path) = cli_path {
        return (Some(path.to_path_buf()), ConfigSource::CliArgument);
    }
    match std::env::var_os(ENV_CONFIG_PATH) {
        Some(path) if !path.is_empty() => (Some(PathBuf::from(path)), ConfigSource::Environment),
        _ => (None, ConfigSource::BuiltinDefault),
    }
}

/// Loads the resolved config file, or the defaults when none is configured.
pub fn load_config(cli_path: Option<&Path>) -> Result<(DetectionConfig, ConfigSource)> {
    match resolve_config_path(cli_path) {
        (Some(path), source) => Ok((DetectionConfig::from_file(&path)?, source)),
        (None, source) => Ok((DetectionConfig::default(), source)),
    }
}
