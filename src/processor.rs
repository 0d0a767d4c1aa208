use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::TaskError;

/// Custom scenario logic the engine calls into by function name
/// (e.g. a `beforeRequest` hook that signs requests).
///
/// Processors are compiled in and registered on a [`ProcessorRegistry`];
/// a script selects one through `config.processor`.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Names of the functions this processor exports.
    fn functions(&self) -> Vec<String>;

    async fn invoke(&self, function: &str, context: &mut Value) -> Result<()>;
}

/// A processor selected by a script, along with the path it was resolved from.
#[derive(Clone)]
pub struct ResolvedProcessor {
    pub path: PathBuf,
    pub processor: Arc<dyn Processor>,
}

impl fmt::Debug for ResolvedProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProcessor")
            .field("path", &self.path)
            .field("functions", &self.processor.functions())
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a processor under `key`. The key is matched against the
    /// path written in the script, the resolved absolute path, or the file
    /// stem of that path, in that order.
    pub fn register(&mut self, key: impl Into<String>, processor: Arc<dyn Processor>) -> &mut Self {
        self.processors.insert(key.into(), processor);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn resolve(&self, raw: &str, cwd: &Path) -> Result<ResolvedProcessor, TaskError> {
        let path = cwd.join(raw);
        let stem = path.file_stem().and_then(|s| s.to_str());

        let found = self
            .processors
            .get(raw)
            .or_else(|| path.to_str().and_then(|p| self.processors.get(p)))
            .or_else(|| stem.and_then(|s| self.processors.get(s)));

        match found {
            Some(processor) => Ok(ResolvedProcessor {
                path,
                processor: processor.clone(),
            }),
            None => Err(TaskError::ConfigResolution {
                path: raw.to_string(),
                reason: format!("no processor registered for {}", path.display()),
            }),
        }
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.processors.keys().collect();
        keys.sort();
        f.debug_struct("ProcessorRegistry").field("keys", &keys).finish()
    }
}
