use crate::error::{RenderError, Result};
use framelane_core::config::CompositionSettings;
use framelane_core::store::OverlayStore;
use framelane_core::types::*;
use serde::{Deserialize, Serialize};

/// Everything a render collaborator needs to composite the timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InputProps {
    pub overlays: Vec<Overlay>,
    pub duration_in_frames: Frame,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl InputProps {
    pub fn from_store(store: &OverlayStore, composition: &CompositionSettings) -> Self {
        Self {
            overlays: store.overlays().to_vec(),
            duration_in_frames: store.total_duration(),
            fps: composition.fps,
            width: composition.width,
            height: composition.height,
        }
    }

    /// Reject an empty timeline before anything is sent out.
    pub fn ensure_renderable(&self) -> Result<()> {
        if self.overlays.is_empty() {
            return Err(RenderError::NothingToRender);
        }
        Ok(())
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.fps > 0.0 {
            self.duration_in_frames as f64 / self.fps
        } else {
            0.0
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
