use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::TaskError;

/// A load test script as handed to the driver.
///
/// Only `config.processor` and `config.payload` are interpreted here; the
/// rest of the document (scenarios, target, phases, ...) is carried through
/// untouched for the engine. The underscore-prefixed fields are out-of-band
/// diagnostics set by whoever triggered the invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub config: ScriptConfig,

    #[serde(
        rename = "_trace",
        default,
        deserialize_with = "truthy",
        skip_serializing_if = "is_false"
    )]
    pub trace: bool,

    #[serde(
        rename = "_simulation",
        default,
        deserialize_with = "truthy",
        skip_serializing_if = "is_false"
    )]
    pub simulation: bool,

    #[serde(rename = "_genesis", default, skip_serializing_if = "Option::is_none")]
    pub genesis: Option<Value>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One entry of `config.phases`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_count: Option<u64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Flags set by external triggers may be any JSON value; `null`, `false`,
/// `0` and `""` switch them off.
fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

impl Script {
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Reads a script from disk. `.json` files are parsed as JSON, anything
    /// else as YAML (which also accepts JSON).
    pub async fn from_path(path: &Path) -> Result<Self, TaskError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| TaskError::ScriptRead {
                path: path.to_path_buf(),
                source,
            })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| TaskError::ScriptFormat {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Origin of the invocation, rendered for log lines.
    pub fn genesis(&self) -> String {
        match &self.genesis {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "unknown".to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// The processor path, when `config.processor` is a non-empty string.
    pub fn processor_path(&self) -> Option<&str> {
        self.config
            .processor
            .as_ref()
            .and_then(Value::as_str)
            .filter(|path| !path.is_empty())
    }

    /// Parses `config.phases`. A script without phases has none.
    pub fn phases(&self) -> serde_json::Result<Vec<PhaseSpec>> {
        match self.config.rest.get("phases") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(phases) => Vec::<PhaseSpec>::deserialize(phases),
        }
    }
}

impl PhaseSpec {
    /// Arrivals a phase would produce, when it can be derived from plain numbers.
    pub fn expected_arrivals(&self) -> u64 {
        if let Some(count) = self.arrival_count {
            return count;
        }
        match (self.arrival_rate, self.duration.as_ref().and_then(Value::as_f64)) {
            (Some(rate), Some(secs)) if rate > 0.0 && secs > 0.0 => (rate * secs).round() as u64,
            _ => 0,
        }
    }
}
