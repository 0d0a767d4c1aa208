//! # loadtask
//!
//! Drives a single load test run on behalf of a short-lived task (for
//! example a serverless function): resolve the script's processor, load its
//! CSV payloads, hand everything to a load engine and relay the engine's
//! progress until the final report arrives.
//!
//! ```no_run
//! use std::sync::Arc;
//! use loadtask::{Driver, Script, SimulatedEngine};
//!
//! # async fn demo() -> Result<(), loadtask::TaskError> {
//! let script = Script::from_path("load.yml".as_ref()).await?;
//! let driver = Driver::new(Arc::new(SimulatedEngine::default()));
//! let report = driver.exec_load("1700000000000", &script).await?;
//! println!("{}", report.into_value());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod payload;
pub mod processor;
pub mod report;
pub mod resolve;
pub mod script;
pub mod state;
pub mod telemetry;

pub use driver::Driver;
#[cfg(feature = "sim")]
pub use engine::SimulatedEngine;
pub use engine::{Engine, PhaseInfo, Runner, RunnerEvent, RunnerOptions};
pub use error::TaskError;
pub use payload::{load_payload, CsvOptions, PayloadDescriptor, PayloadSpec};
pub use processor::{Processor, ProcessorRegistry, ResolvedProcessor};
pub use report::Report;
pub use resolve::{resolve_script, ResolvedScript};
pub use script::{PhaseSpec, Script};
pub use state::InvocationState;
