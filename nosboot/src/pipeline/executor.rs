use super::metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
use super::stage::{ExecutionMode, Stage};
use super::task::BoxedTask;
use futures::future::try_join_all;
use nosboot_shared::NosbootResult;
use std::time::Instant;

/// Ordered stages selected for one run.
pub struct ExecutionPlan<Ctx> {
    stages: Vec<Stage<BoxedTask<Ctx>>>,
}

impl<Ctx> ExecutionPlan<Ctx> {
    pub fn new(stages: Vec<Stage<BoxedTask<Ctx>>>) -> Self {
        Self { stages }
    }

    /// Task names per stage, in execution order.
    pub fn task_names(&self) -> Vec<Vec<String>> {
        self.stages
            .iter()
            .map(|stage| stage.tasks.iter().map(|t| t.name().to_string()).collect())
            .collect()
    }
}

pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Run every stage of `plan` against `ctx`.
    pub async fn execute<Ctx>(plan: ExecutionPlan<Ctx>, ctx: Ctx) -> NosbootResult<PipelineMetrics>
    where
        Ctx: Clone,
    {
        let total_start = Instant::now();
        let mut stages = Vec::with_capacity(plan.stages.len());

        for (index, stage) in plan.stages.into_iter().enumerate() {
            let execution = stage.execution;
            let stage_start = Instant::now();
            tracing::debug!(stage = index, ?execution, tasks = stage.tasks.len(), "Stage starting");

            let tasks = match execution {
                ExecutionMode::Parallel => {
                    try_join_all(
                        stage
                            .tasks
                            .into_iter()
                            .map(|task| run_timed(task, ctx.clone())),
                    )
                    .await?
                }
                ExecutionMode::Sequential => {
                    let mut tasks = Vec::with_capacity(stage.tasks.len());
                    for task in stage.tasks {
                        tasks.push(run_timed(task, ctx.clone()).await?);
                    }
                    tasks
                }
            };

            stages.push(StageMetrics {
                index,
                execution,
                duration_ms: stage_start.elapsed().as_millis(),
                tasks,
            });
        }

        Ok(PipelineMetrics {
            total_duration_ms: total_start.elapsed().as_millis(),
            stages,
        })
    }
}

async fn run_timed<Ctx>(task: BoxedTask<Ctx>, ctx: Ctx) -> NosbootResult<TaskMetrics> {
    let name = task.name().to_string();
    let start = Instant::now();
    task.run(ctx).await?;
    Ok(TaskMetrics {
        name,
        duration_ms: start.elapsed().as_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineTask;
    use async_trait::async_trait;
    use nosboot_shared::NosbootError;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Record(&'static str);

    #[async_trait]
    impl PipelineTask<Log> for Record {
        async fn run(self: Box<Self>, ctx: Log) -> NosbootResult<()> {
            ctx.lock().unwrap().push(self.0.to_string());
            Ok(())
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    struct Fail;

    #[async_trait]
    impl PipelineTask<Log> for Fail {
        async fn run(self: Box<Self>, _ctx: Log) -> NosbootResult<()> {
            Err(NosbootError::Internal("boom".into()))
        }

        fn name(&self) -> &str {
            "fail"
        }
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let log: Log = Arc::default();
        let plan = ExecutionPlan::new(vec![
            Stage::parallel(vec![
                Box::new(Record("a")) as BoxedTask<Log>,
                Box::new(Record("b")),
            ]),
            Stage::sequential(vec![Box::new(Record("c")) as BoxedTask<Log>]),
        ]);
        assert_eq!(plan.task_names(), vec![vec!["a", "b"], vec!["c"]]);

        let metrics = PipelineExecutor::execute(plan, Arc::clone(&log))
            .await
            .unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[2], "c");
        assert_eq!(metrics.stages.len(), 2);
        assert_eq!(metrics.stages[0].execution, ExecutionMode::Parallel);
        assert!(metrics.task_duration_ms("b").is_some());
        assert!(metrics.task_duration_ms("missing").is_none());
    }

    #[tokio::test]
    async fn test_failure_stops_later_stages() {
        let log: Log = Arc::default();
        let plan = ExecutionPlan::new(vec![
            Stage::sequential(vec![Box::new(Fail) as BoxedTask<Log>]),
            Stage::sequential(vec![Box::new(Record("never")) as BoxedTask<Log>]),
        ]);

        let err = PipelineExecutor::execute(plan, Arc::clone(&log))
            .await
            .unwrap_err();
        assert!(matches!(err, NosbootError::Internal(_)));
        assert!(log.lock().unwrap().is_empty());
    }
}
