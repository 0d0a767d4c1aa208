use chrono::Utc;
use futures::StreamExt;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::engine::{Engine, RunnerEvent, RunnerOptions};
use crate::error::TaskError;
use crate::payload::load_payload;
use crate::processor::ProcessorRegistry;
use crate::report::Report;
use crate::resolve::resolve_script;
use crate::script::Script;
use crate::state::InvocationState;

/// Drives one load test invocation at a time against an [`Engine`].
///
/// The driver holds no per-invocation state, so one instance can serve any
/// number of concurrent [`Driver::exec_load`] calls.
#[derive(Clone)]
pub struct Driver {
    engine: Arc<dyn Engine>,
    processors: ProcessorRegistry,
    working_dir: Option<PathBuf>,
}

impl Driver {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            processors: ProcessorRegistry::default(),
            working_dir: None,
        }
    }

    pub fn with_processors(mut self, processors: ProcessorRegistry) -> Self {
        self.processors = processors;
        self
    }

    /// Resolve processor and payload paths against `dir` instead of the
    /// process working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn working_dir(&self) -> Result<PathBuf, TaskError> {
        match &self.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(TaskError::WorkingDir),
        }
    }

    /// Runs a load test and returns the engine's final report.
    ///
    /// `invocation_id` only labels log lines and errors. A script flagged
    /// `_simulation` short-circuits to a zero-error report without touching
    /// the file system or the engine. Every failure comes back as a single
    /// [`TaskError::Invocation`] naming the genesis and invocation ids.
    pub async fn exec_load(&self, invocation_id: &str, script: &Script) -> Result<Report, TaskError> {
        let genesis = script.genesis();
        let mut state = InvocationState::Pending;

        if script.trace {
            info!(%genesis, invocation_id, "load run started from {genesis} @ {invocation_id}");
        }

        if script.simulation {
            match serde_json::to_string_pretty(script) {
                Ok(doc) => info!(%genesis, invocation_id, "SIMULATION: load run called with {doc}"),
                Err(e) => warn!(error = %e, "unable to render simulated script"),
            }
            advance(&mut state, InvocationState::Simulated, invocation_id);
            return Ok(Report::simulated());
        }

        match self.run(invocation_id, script, &mut state).await {
            Ok(report) => {
                advance(&mut state, InvocationState::Done, invocation_id);
                if script.trace {
                    let stopped_at = Utc::now().timestamp_millis();
                    info!(
                        %genesis,
                        invocation_id,
                        stopped_at,
                        "load run stopped from {genesis} in {invocation_id} @ {stopped_at}"
                    );
                }
                Ok(report)
            }
            Err(e) => {
                let e = e.wrap(&genesis, invocation_id);
                error!(%genesis, invocation_id, "{e}");
                advance(&mut state, InvocationState::Failed, invocation_id);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        invocation_id: &str,
        script: &Script,
        state: &mut InvocationState,
    ) -> Result<Report, TaskError> {
        let cwd = self.working_dir()?;
        let resolved = resolve_script(script, &self.processors, &cwd)?;
        let payload = load_payload(script, &cwd).await?;

        let options = RunnerOptions {
            invocation_id: invocation_id.to_string(),
        };
        let mut events = catch_unwind(AssertUnwindSafe(|| {
            self.engine
                .runner(&resolved, payload.as_ref(), &options)
                .map(|runner| runner.run())
        }))
        .map_err(|panic| {
            TaskError::Engine(anyhow::anyhow!("engine panicked: {}", panic_message(panic.as_ref())))
        })?
        .map_err(TaskError::Engine)?;
        advance(state, InvocationState::Running, invocation_id);

        while let Some(event) = events.next().await {
            match event {
                RunnerEvent::PhaseStarted(phase) => {
                    let length = phase.length();
                    info!(
                        phase = phase.index,
                        name = phase.name.as_deref(),
                        duration = %length,
                        "{phase} started, duration: {length}"
                    );
                }
                RunnerEvent::PhaseCompleted(phase) => {
                    info!(phase = phase.index, name = phase.name.as_deref(), "{phase} complete");
                }
                RunnerEvent::Done(mut report) => {
                    match report.summary_json() {
                        Ok(summary) => info!(invocation_id, "{summary}"),
                        Err(e) => warn!(error = %e, "unable to render report summary"),
                    }
                    return Ok(report);
                }
                RunnerEvent::Failed(e) => return Err(TaskError::Engine(e)),
            }
        }

        Err(TaskError::Engine(anyhow::anyhow!(
            "runner finished without a final report"
        )))
    }
}

fn advance(state: &mut InvocationState, next: InvocationState, invocation_id: &str) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid invocation transition {state} -> {next}"
    );
    debug!(invocation_id, from = %state, to = %next, "invocation state changed");
    *state = next;
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
