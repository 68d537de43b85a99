use async_trait::async_trait;
use nosboot_shared::NosbootResult;

/// A unit of work in a pipeline stage.
///
/// Each task gets its own clone of the context; share state through
/// interior mutability.
#[async_trait]
pub trait PipelineTask<Ctx>: Send + Sync {
    async fn run(self: Box<Self>, ctx: Ctx) -> NosbootResult<()>;

    /// Stable name used in logs and metrics.
    fn name(&self) -> &str;
}

pub type BoxedTask<Ctx> = Box<dyn PipelineTask<Ctx>>;
