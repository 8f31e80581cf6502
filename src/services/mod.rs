//! Business logic services.

pub mod cleanup;
pub mod directory;
pub mod eta;
pub mod notifier;
pub mod ordering;
pub mod prerender;
pub mod queue;
pub mod render;
pub mod reports;
pub mod segments;
pub mod storage;

pub use cleanup::{CleanupConfig, start_cleanup_task};
pub use prerender::{Prerenderer, start_prerender_task};
pub use queue::{Job, JobQueue, TaskQueue, Worker};
pub use render::{RenderRequest, Renderer};
pub use storage::{ArtifactStore, MemoryStorage, S3Storage};
