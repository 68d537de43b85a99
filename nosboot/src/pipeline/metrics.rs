use super::stage::ExecutionMode;

#[derive(Debug, Clone)]
pub struct TaskMetrics {
    pub name: String,
    pub duration_ms: u128,
}

#[derive(Debug, Clone)]
pub struct StageMetrics {
    pub index: usize,
    pub execution: ExecutionMode,
    pub duration_ms: u128,
    pub tasks: Vec<TaskMetrics>,
}

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_duration_ms: u128,
    pub stages: Vec<StageMetrics>,
}

impl PipelineMetrics {
    pub fn task_duration_ms(&self, name: &str) -> Option<u128> {
        self.tasks()
            .find(|task| task.name == name)
            .map(|task| task.duration_ms)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskMetrics> {
        self.stages.iter().flat_map(|stage| stage.tasks.iter())
    }

    /// One line per task, then the total.
    pub fn log_summary(&self) {
        for stage in &self.stages {
            for task in &stage.tasks {
                tracing::info!(
                    stage = stage.index,
                    execution = ?stage.execution,
                    task = %task.name,
                    duration_ms = task.duration_ms as u64,
                    "Launch task finished"
                );
            }
        }
        tracing::info!(
            total_duration_ms = self.total_duration_ms as u64,
            "Launch pipeline finished"
        );
    }
}
