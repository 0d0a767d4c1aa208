use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while driving a load test invocation.
///
/// Every hard failure is eventually folded into [`TaskError::Invocation`] by
/// [`TaskError::wrap`], so callers only ever see one descriptive error per
/// failed run. The inner variants stay reachable through `cause` for callers
/// that want to branch on the kind of failure.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("unable to determine working directory")]
    WorkingDir(#[source] std::io::Error),

    #[error("unable to read script {path}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid script {path}: {reason}")]
    ScriptFormat { path: PathBuf, reason: String },

    #[error("unable to resolve processor '{path}': {reason}")]
    ConfigResolution { path: String, reason: String },

    #[error("invalid payload descriptor at position {index}: {reason}")]
    PayloadDescriptor { index: usize, reason: String },

    #[error("invalid payload options for {path}: {reason}")]
    PayloadOptions { path: PathBuf, reason: String },

    #[error("unable to read payload {path}")]
    PayloadRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse payload {path}")]
    PayloadParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("engine error: {0}")]
    Engine(anyhow::Error),

    #[error("{message}")]
    Invocation {
        message: String,
        #[source]
        cause: Box<TaskError>,
    },
}

impl TaskError {
    /// Renders the chain of underlying causes, one per line.
    ///
    /// Empty when the error has no source.
    pub fn trace(&self) -> String {
        let causes: Vec<String> = match self {
            TaskError::Engine(err) => err.chain().skip(1).map(|c| c.to_string()).collect(),
            _ => {
                let mut causes = Vec::new();
                let mut current = std::error::Error::source(self);
                while let Some(cause) = current {
                    causes.push(cause.to_string());
                    current = cause.source();
                }
                causes
            }
        };

        causes
            .iter()
            .map(|c| format!("    caused by: {c}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Folds this error into the single error surfaced for a failed invocation.
    ///
    /// The message always names the genesis id and the invocation id.
    pub fn wrap(self, genesis: &str, invocation_id: &str) -> TaskError {
        if matches!(self, TaskError::Invocation { .. }) {
            return self;
        }

        let mut message = format!(
            "ERROR exception encountered while executing load from {genesis} in {invocation_id}: {self}"
        );
        let trace = self.trace();
        if !trace.is_empty() {
            message.push('\n');
            message.push_str(&trace);
        }

        TaskError::Invocation {
            message,
            cause: Box::new(self),
        }
    }

    /// The underlying error of a wrapped invocation failure, or `self`.
    pub fn root(&self) -> &TaskError {
        match self {
            TaskError::Invocation { cause, .. } => cause.root(),
            other => other,
        }
    }
}
