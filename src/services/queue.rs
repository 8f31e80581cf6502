//! In-process background job queue.
//!
//! Jobs are fire-and-forget: `enqueue` returns once the job is on the
//! channel. A dispatcher task drains the channel and runs every job on its
//! own task, at most `workers` at a time. Jobs are neither deduplicated nor
//! cancellable.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult};
use crate::services::prerender::Prerenderer;
use crate::services::render::{RenderRequest, Renderer};

/// Work the queue knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Render(RenderRequest),
    Prerender,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Render(_) => "render_report",
            Self::Prerender => "prerender_reports",
        }
    }
}

/// Submission side of a job queue.
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, job: Job) -> AppResult<()>;
}

/// Execution side of a job queue.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: Job);
}

/// Channel-backed queue handle. Cheap to clone.
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<Job>,
}

/// Receiving end, consumed by [`JobReceiver::spawn_dispatcher`].
pub struct JobReceiver {
    receiver: mpsc::UnboundedReceiver<Job>,
}

impl TaskQueue {
    pub fn channel() -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, JobReceiver { receiver })
    }
}

impl JobQueue for TaskQueue {
    fn enqueue(&self, job: Job) -> AppResult<()> {
        debug!(job = job.name(), "Enqueueing job");
        self.sender
            .send(job)
            .map_err(|e| AppError::Queue(format!("Failed to enqueue {}: dispatcher stopped", e.0.name())))
    }
}

impl JobReceiver {
    /// Run jobs as they arrive until every [`TaskQueue`] handle is dropped.
    pub fn spawn_dispatcher(mut self, handler: Arc<dyn JobHandler>, workers: usize) -> JoinHandle<()> {
        let workers = workers.max(1);
        let semaphore = Arc::new(Semaphore::new(workers));

        tokio::spawn(async move {
            info!("Job dispatcher started ({} workers)", workers);

            while let Some(job) = self.receiver.recv().await {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("Job dispatcher semaphore closed: {}", e);
                        break;
                    }
                };

                let handler = handler.clone();
                tokio::spawn(async move {
                    handler.handle(job).await;
                    drop(permit);
                });
            }

            info!("Job dispatcher stopped");
        })
    }
}

/// Production handler: renders reports and runs pre-render sweeps.
pub struct Worker {
    renderer: Arc<Renderer>,
    prerenderer: Arc<Prerenderer>,
}

impl Worker {
    pub fn new(renderer: Arc<Renderer>, prerenderer: Arc<Prerenderer>) -> Self {
        Self {
            renderer,
            prerenderer,
        }
    }
}

#[async_trait]
impl JobHandler for Worker {
    async fn handle(&self, job: Job) {
        match job {
            Job::Render(request) => {
                self.renderer.render_logged(request).await;
            }
            Job::Prerender => match self.prerenderer.run_sweep().await {
                Ok(summary) => info!(
                    "Pre-render sweep: {} companies, {} reports queued, {} shapes still pending",
                    summary.companies, summary.created, summary.skipped
                ),
                Err(e) => error!("Pre-render sweep failed: {}", e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    struct Recording {
        seen: Mutex<Vec<Job>>,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler for Recording {
        async fn handle(&self, job: Job) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.seen.lock().await.push(job);
            self.running.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn render_job() -> Job {
        Job::Render(RenderRequest {
            report_id: Uuid::now_v7(),
            notify: false,
            track_downloads: false,
        })
    }

    #[tokio::test]
    async fn test_dispatcher_runs_every_job_within_worker_limit() {
        let handler = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let (queue, receiver) = TaskQueue::channel();
        let dispatcher = receiver.spawn_dispatcher(handler.clone(), 2);

        for _ in 0..6 {
            queue.enqueue(render_job()).unwrap();
        }
        queue.enqueue(Job::Prerender).unwrap();
        drop(queue);
        dispatcher.await.unwrap();

        // Wait for the last spawned jobs to finish.
        for _ in 0..50 {
            if handler.seen.lock().await.len() == 7 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(handler.seen.lock().await.len(), 7);
        assert!(handler.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_enqueue_after_dispatcher_is_gone() {
        let (queue, receiver) = TaskQueue::channel();
        drop(receiver);

        let err = queue.enqueue(Job::Prerender).unwrap_err();
        assert!(matches!(err, AppError::Queue(_)));
    }
}
