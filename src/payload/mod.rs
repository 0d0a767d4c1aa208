pub mod delimited;

pub use delimited::{parse_rows, CsvOptions};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::TaskError;
use crate::script::Script;

/// A payload source declared under `config.payload`.
///
/// `data` is filled in by [`load_payload`]; every other key of the
/// declaration is kept as written, including an empty `options` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadDescriptor {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Vec<String>>>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `config.payload` is either one descriptor or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PayloadSpec {
    Single(PayloadDescriptor),
    Multiple(Vec<PayloadDescriptor>),
}

impl PayloadSpec {
    /// Interprets a raw `config.payload` value.
    ///
    /// Values that are neither an object nor an array are a soft
    /// misconfiguration: one warning is emitted and the run proceeds without
    /// a payload.
    pub fn from_config(value: &Value) -> Result<Option<Self>, TaskError> {
        match value {
            // an empty declaration means "no payload"
            Value::Null | Value::Bool(false) => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::Number(n) if n.as_f64() == Some(0.0) => Ok(None),
            Value::Array(entries) => entries
                .iter()
                .enumerate()
                .map(|(index, entry)| descriptor(index, entry))
                .collect::<Result<Vec<_>, _>>()
                .map(|descriptors| Some(PayloadSpec::Multiple(descriptors))),
            Value::Object(_) => descriptor(0, value).map(|d| Some(PayloadSpec::Single(d))),
            other => {
                warn!(payload = %other, "payload file not set, but payload is configured");
                Ok(None)
            }
        }
    }

    pub fn descriptors(&self) -> &[PayloadDescriptor] {
        match self {
            PayloadSpec::Single(descriptor) => std::slice::from_ref(descriptor),
            PayloadSpec::Multiple(descriptors) => descriptors,
        }
    }

    fn descriptors_mut(&mut self) -> &mut [PayloadDescriptor] {
        match self {
            PayloadSpec::Single(descriptor) => std::slice::from_mut(descriptor),
            PayloadSpec::Multiple(descriptors) => descriptors,
        }
    }

    /// Total number of parsed rows across all descriptors.
    pub fn row_count(&self) -> usize {
        self.descriptors()
            .iter()
            .map(|d| d.data.as_ref().map_or(0, Vec::len))
            .sum()
    }
}

fn descriptor(index: usize, value: &Value) -> Result<PayloadDescriptor, TaskError> {
    PayloadDescriptor::deserialize(value).map_err(|e| TaskError::PayloadDescriptor {
        index,
        reason: e.to_string(),
    })
}

/// Loads every payload source the script declares.
///
/// Returns `None` when the script has no payload (or a misconfigured one).
/// The result mirrors the declared shape and is built from copies, so the
/// caller's script is never modified.
pub async fn load_payload(script: &Script, cwd: &Path) -> Result<Option<PayloadSpec>, TaskError> {
    let Some(raw) = script.config.payload.as_ref() else {
        return Ok(None);
    };
    let Some(mut spec) = PayloadSpec::from_config(raw)? else {
        return Ok(None);
    };

    for descriptor in spec.descriptors_mut() {
        let rows = read_descriptor(descriptor, cwd).await?;
        descriptor.data = Some(rows);
    }
    Ok(Some(spec))
}

async fn read_descriptor(
    descriptor: &PayloadDescriptor,
    cwd: &Path,
) -> Result<Vec<Vec<String>>, TaskError> {
    let path = cwd.join(&descriptor.path);
    let no_options = Map::new();
    let declared = descriptor.options.as_ref().unwrap_or(&no_options);
    let options = CsvOptions::from_map(declared).map_err(|reason| {
        TaskError::PayloadOptions {
            path: path.clone(),
            reason,
        }
    })?;

    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| TaskError::PayloadRead {
            path: path.clone(),
            source,
        })?;

    let rows = parse_rows(&text, &options).map_err(|source| TaskError::PayloadParse {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), rows = rows.len(), "payload loaded");
    Ok(rows)
}
