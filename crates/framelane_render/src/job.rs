use crate::error::{RenderError, Result};
use crate::props::InputProps;
use framelane_core::config::EngineConfig;
use framelane_core::store::OverlayStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Opaque handle for a render started on a backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RenderJobId(pub Uuid);

impl RenderJobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RenderJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RenderJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One poll result. `Done` and `Error` are terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderStatus {
    /// Fraction complete, `0.0..=1.0`.
    Progress { progress: f64 },
    Done { url: String, size: u64 },
    Error { message: String },
}

impl RenderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RenderStatus::Progress { .. })
    }
}

/// Finished render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub url: String,
    pub size: u64,
}

/// The external compositor. Implementations talk to whatever actually
/// produces the video.
#[async_trait::async_trait]
pub trait RenderBackend: Send + Sync {
    async fn start(&self, props: &InputProps) -> Result<RenderJobId>;
    async fn poll(&self, job: RenderJobId) -> Result<RenderStatus>;
}

/// Poll `job` every `interval` until it finishes, publishing every status to
/// `status_tx`.
///
/// An error status ends the loop with [`RenderError::RenderFailed`]; nothing
/// is retried. A failing `poll` call is returned as is.
pub async fn poll_until_complete(
    backend: &dyn RenderBackend,
    job: RenderJobId,
    interval: Duration,
    status_tx: &watch::Sender<RenderStatus>,
) -> Result<RenderOutput> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let status = match backend.poll(job).await? {
            RenderStatus::Progress { progress } => RenderStatus::Progress {
                progress: progress.clamp(0.0, 1.0),
            },
            other => other,
        };
        status_tx.send_replace(status.clone());

        match status {
            RenderStatus::Progress { progress } => {
                tracing::debug!(%job, progress, "render progress");
            }
            RenderStatus::Done { url, size } => {
                tracing::info!(%job, %url, size, "render finished");
                return Ok(RenderOutput { url, size });
            }
            RenderStatus::Error { message } => {
                tracing::warn!(%job, %message, "render failed");
                return Err(RenderError::RenderFailed(message));
            }
        }
    }
}

/// A render running on its own task.
#[derive(Debug)]
pub struct RenderHandle {
    pub job: RenderJobId,
    pub status: watch::Receiver<RenderStatus>,
    pub task: JoinHandle<Result<RenderOutput>>,
}

impl RenderHandle {
    /// Wait for the polling task to end.
    pub async fn finish(self) -> Result<RenderOutput> {
        self.task
            .await
            .map_err(|e| RenderError::TaskAborted(e.to_string()))?
    }
}

/// Start a render and poll it in the background. The caller watches
/// `status` and is free to keep editing meanwhile.
pub async fn spawn_render(
    backend: Arc<dyn RenderBackend>,
    props: InputProps,
    interval: Duration,
) -> Result<RenderHandle> {
    props.ensure_renderable()?;
    let job = backend.start(&props).await?;
    tracing::info!(
        %job,
        overlays = props.overlays.len(),
        frames = props.duration_in_frames,
        "render started"
    );

    let (tx, rx) = watch::channel(RenderStatus::Progress { progress: 0.0 });
    let task = tokio::spawn(async move {
        poll_until_complete(backend.as_ref(), job, interval, &tx).await
    });

    Ok(RenderHandle {
        job,
        status: rx,
        task,
    })
}

/// Render the store's timeline with the composition and poll interval from
/// `config`.
pub async fn render_store(
    backend: Arc<dyn RenderBackend>,
    store: &OverlayStore,
    config: &EngineConfig,
) -> Result<RenderHandle> {
    let props = InputProps::from_store(store, &config.composition);
    spawn_render(backend, props, config.render_poll_interval()).await
}
