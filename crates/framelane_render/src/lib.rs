pub mod error;
pub mod job;
pub mod props;

pub use error::{RenderError, Result};
pub use job::{poll_until_complete, render_store, spawn_render, RenderBackend, RenderHandle, RenderJobId, RenderOutput, RenderStatus};
pub use props::InputProps;
