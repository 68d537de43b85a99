//! Table-driven task pipeline.
//!
//! ```text
//! ExecutionPlan → Stages → Tasks
//!
//! - Stage: tasks plus an execution mode (parallel/sequential)
//! - Task:  one unit of work over a shared, cloneable context
//! ```
//!
//! Stages run in order. A failing task aborts the pipeline; tasks of a
//! parallel stage that are still running are dropped.

mod executor;
mod metrics;
mod stage;
mod task;

pub use executor::{ExecutionPlan, PipelineExecutor};
pub use metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
pub use stage::{ExecutionMode, Stage};
pub use task::{BoxedTask, PipelineTask};
