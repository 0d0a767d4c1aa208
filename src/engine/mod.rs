//! # Engine seam
//!
//! The load engine is an external collaborator. The driver only needs to
//! build a runner for a resolved script and its payload, then follow the
//! runner's lifecycle events until a report (or a failure) arrives.
//!
//! A [`Runner`] hands back its events as a stream from [`Runner::run`];
//! since the stream exists before the first event is produced, no phase
//! notification can be lost.

#[cfg(feature = "sim")]
pub mod simulated;

#[cfg(feature = "sim")]
pub use simulated::SimulatedEngine;

use anyhow::Result;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::payload::PayloadSpec;
use crate::report::Report;
use crate::resolve::ResolvedScript;

/// Phase details carried by phase notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseInfo {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause: Option<Value>,
}

impl PhaseInfo {
    /// `duration`, or `pause` for pause phases.
    pub fn length(&self) -> String {
        match self.duration.as_ref().or(self.pause.as_ref()) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "unknown".to_string(),
        }
    }
}

impl fmt::Display for PhaseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "phase {} ({})", self.index, name),
            None => write!(f, "phase {}", self.index),
        }
    }
}

#[derive(Debug)]
pub enum RunnerEvent {
    PhaseStarted(PhaseInfo),
    PhaseCompleted(PhaseInfo),
    Done(Report),
    Failed(anyhow::Error),
}

/// Options passed to the engine next to the script and payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunnerOptions {
    pub invocation_id: String,
}

pub trait Engine: Send + Sync {
    /// Builds a runner. Errors here mean the engine rejected the script.
    fn runner(
        &self,
        script: &ResolvedScript,
        payload: Option<&PayloadSpec>,
        options: &RunnerOptions,
    ) -> Result<Box<dyn Runner>>;
}

pub trait Runner: Send {
    /// Starts the run. The stream ends after `Done` or `Failed`.
    fn run(self: Box<Self>) -> BoxStream<'static, RunnerEvent>;
}
