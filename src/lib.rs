//! declflow - Declarative task pipeline engine
//!
//! This library executes declarative task descriptions - a single unit of
//! work or a multi-step pipeline - by routing each unit to a pluggable
//! execution backend. It features:
//! - A DAG scheduler with run-time topological readiness and per-tick
//!   parallel dispatch
//! - `{{dotted.path}}` template plumbing between steps
//! - Bounded `forEach` fan-out with independent per-item retry state
//! - Per-step retries, timeouts, and `runWhen` conditions
//! - Optional steps whose failures become skips instead of aborts
//! - A health-aware backend registry with advisory resource matching
//!
//! # Example
//!
//! ```rust,no_run
//! use declflow::{Engine, ExecutionHooks, Task};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let task: Task = serde_json::from_str(r#"{
//!         "type": "media.render",
//!         "steps": [
//!             {"id": "probe", "task": "media.probe",
//!              "input": {"file": "{{payload.source}}"}},
//!             {"id": "encode", "task": "media.encode", "dependsOn": ["probe"],
//!              "input": {"tracks": "{{steps.probe.tracks}}"}}
//!         ]
//!     }"#)?;
//!
//!     let engine = Engine::new();
//!     let outcome = engine
//!         .process_task(&task, &ExecutionHooks::new(), None)
//!         .await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod constants;
pub mod error;
pub mod model;

// Execution components
pub mod backend;
pub mod dsl;
pub mod engine;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience
pub use backend::{Backend, BackendRegistry};
pub use engine::{ChunkPlanner, Engine, ExecutionHooks, TaskOutcome};
pub use error::{DeclFlowError, Result};
pub use model::{
    PipelineEvent, PipelineResult, RetrySpec, Step, StepState, StepStatus, Task,
};

/// Initialize logging for the application
pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "declflow=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
