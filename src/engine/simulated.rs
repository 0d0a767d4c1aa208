//! In-process stand-in for the external load engine.
//!
//! Walks the script's phases and reports them as a real engine would, then
//! produces a report with arrival counts derived from the phase settings.
//! No virtual users are started and no requests are sent.

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use super::{Engine, PhaseInfo, Runner, RunnerEvent, RunnerOptions};
use crate::payload::PayloadSpec;
use crate::processor::Processor;
use crate::report::Report;
use crate::resolve::ResolvedScript;
use crate::script::PhaseSpec;

#[derive(Debug, Clone, Default)]
pub struct SimulatedEngine {
    /// Pause between a phase starting and completing.
    pub phase_tick: Duration,
}

impl SimulatedEngine {
    pub fn new(phase_tick: Duration) -> Self {
        Self { phase_tick }
    }
}

impl Engine for SimulatedEngine {
    fn runner(
        &self,
        script: &ResolvedScript,
        payload: Option<&PayloadSpec>,
        options: &RunnerOptions,
    ) -> Result<Box<dyn Runner>> {
        let phases = script
            .script
            .phases()
            .context("config.phases must be a list of phase definitions")?;

        Ok(Box::new(SimulatedRunner {
            phases,
            payload_rows: payload.map_or(0, PayloadSpec::row_count),
            processor: script.processor.as_ref().map(|p| p.processor.clone()),
            invocation_id: options.invocation_id.clone(),
            phase_tick: self.phase_tick,
        }))
    }
}

struct SimulatedRunner {
    phases: Vec<PhaseSpec>,
    payload_rows: usize,
    processor: Option<Arc<dyn Processor>>,
    invocation_id: String,
    phase_tick: Duration,
}

impl Runner for SimulatedRunner {
    fn run(self: Box<Self>) -> BoxStream<'static, RunnerEvent> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let last = match self.drive(&tx).await {
                Ok(report) => RunnerEvent::Done(report),
                Err(e) => RunnerEvent::Failed(e),
            };
            // the receiver is gone only if the driver stopped listening
            let _ = tx.send(last).await;
        });

        stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|event| (event, rx)) }).boxed()
    }
}

impl SimulatedRunner {
    async fn drive(&self, tx: &mpsc::Sender<RunnerEvent>) -> Result<Report> {
        let mut created: u64 = 0;

        for (index, phase) in self.phases.iter().enumerate() {
            let info = PhaseInfo {
                index,
                name: phase.name.clone(),
                duration: phase.duration.clone(),
                pause: phase.pause.clone(),
            };
            tx.send(RunnerEvent::PhaseStarted(info.clone()))
                .await
                .context("event receiver dropped")?;

            if let Some(processor) = &self.processor {
                let mut context = json!({
                    "phase": index,
                    "invocationId": self.invocation_id,
                    "vars": {},
                });
                for function in processor.functions() {
                    processor
                        .invoke(&function, &mut context)
                        .await
                        .with_context(|| format!("processor function '{function}' failed in phase {index}"))?;
                }
            }

            if !self.phase_tick.is_zero() {
                sleep(self.phase_tick).await;
            }
            created += phase.expected_arrivals();

            tx.send(RunnerEvent::PhaseCompleted(info))
                .await
                .context("event receiver dropped")?;
        }

        let mut fields = Map::new();
        fields.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));
        fields.insert("scenariosCreated".to_string(), json!(created));
        fields.insert("scenariosCompleted".to_string(), json!(created));
        fields.insert("requestsCompleted".to_string(), json!(0));
        fields.insert("errors".to_string(), Value::Object(Map::new()));
        fields.insert("phases".to_string(), json!(self.phases.len()));
        fields.insert("payloadRows".to_string(), json!(self.payload_rows));
        fields.insert("latencies".to_string(), Value::Array(Vec::new()));
        Ok(Report::new(fields))
    }
}
