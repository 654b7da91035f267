// Job body boundary
//
// The engine invokes job bodies through this trait and only observes
// success or failure; what the unit of work does is opaque to the core.

use crate::models::FireContext;
use async_trait::async_trait;

/// An executable unit of work attached to a job definition.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, ctx: &FireContext) -> anyhow::Result<()>;
}
