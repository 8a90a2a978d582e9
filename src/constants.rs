//! Constants used throughout declflow
//!
//! Context key names, sentinel strings, and scheduler tuning values shared
//! by the runners and the template resolver.

// ============================================================================
// TEMPLATE CONTEXT
// ============================================================================

/// Context key holding the task payload
pub const CTX_PAYLOAD: &str = "payload";

/// Context key holding prior step results (map by id for the DAG runner,
/// ordered array for the sequential runner)
pub const CTX_STEPS: &str = "steps";

/// Context key holding the current forEach item
pub const CTX_ITEM: &str = "item";

/// Context key holding the current forEach index
pub const CTX_INDEX: &str = "index";

// ============================================================================
// STEPS & SCHEDULING
// ============================================================================

/// Prefix for defaulted step ids (`step_<index>`)
pub const STEP_ID_PREFIX: &str = "step_";

/// Backend hint meaning "pick any suitable backend"
pub const BACKEND_AUTO: &str = "auto";

/// runWhen sentinel: unconditionally execute
pub const RUN_WHEN_ALWAYS: &str = "always";

/// runWhen sentinel: eagerly skip, unblocking dependents
pub const RUN_WHEN_ON_DEMAND: &str = "on-demand";

/// Skip reason recorded for on-demand steps
pub const SKIP_REASON_ON_DEMAND: &str = "on-demand";

/// Skip reason recorded when a runWhen template resolves falsy
pub const SKIP_REASON_CONDITION: &str = "condition-false";

/// Sleep between scheduler ticks while all runnable work is in flight (ms)
pub const SCHEDULER_TICK_MS: u64 = 10;

// ============================================================================
// RETRY
// ============================================================================

/// Upper bound on a single backoff sleep (5 minutes)
pub const MAX_RETRY_DELAY_MS: u64 = 300_000;
