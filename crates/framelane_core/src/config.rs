use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Hard ceiling on the number of timeline rows.
pub const MAX_ROWS_LIMIT: usize = 8;

/// How a committed move/resize that lands on occupied frames gets repaired.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// The moved overlay is bumped to the end of whatever it collides with.
    #[default]
    PushAfter,
    /// The overlays in the way are slid to start after the moved overlay.
    ShiftDisplaced,
}

/// Where `duplicate` puts the copy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePlacement {
    /// Right after the original on the same row, even if that collides.
    AfterOriginal,
    /// Right after the original if free, otherwise the next free slot.
    #[default]
    NextFreeSlot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CompositionSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub max_rows: usize,
    pub composition: CompositionSettings,
    pub overlap_policy: OverlapPolicy,
    pub cross_row_veto: bool,
    pub duplicate_placement: DuplicatePlacement,
    pub edge_snap: bool,
    pub snap_threshold_px: f64,
    pub render_poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rows: 4,
            composition: preset_1080p(),
            overlap_policy: OverlapPolicy::default(),
            cross_row_veto: false,
            duplicate_placement: DuplicatePlacement::default(),
            edge_snap: false,
            snap_threshold_px: 5.0,
            render_poll_interval_ms: 1000,
        }
    }
}

impl EngineConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&data)?;
        config.validated()
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Clamp row count into range and reject unusable composition settings.
    pub fn validated(mut self) -> Result<Self> {
        self.max_rows = self.max_rows.clamp(1, MAX_ROWS_LIMIT);
        if self.composition.fps <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "fps must be positive, got {}",
                self.composition.fps
            )));
        }
        if self.composition.width == 0 || self.composition.height == 0 {
            return Err(CoreError::InvalidConfig(
                "composition width and height must be non-zero".into(),
            ));
        }
        if self.snap_threshold_px < 0.0 {
            self.snap_threshold_px = 0.0;
        }
        if self.render_poll_interval_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "render poll interval must be non-zero".into(),
            ));
        }
        Ok(self)
    }

    /// How often a running render is polled. Never zero.
    pub fn render_poll_interval(&self) -> Duration {
        Duration::from_millis(self.render_poll_interval_ms.max(1))
    }
}

/// 1920x1080 30fps preset.
pub fn preset_1080p() -> CompositionSettings {
    CompositionSettings {
        width: 1920,
        height: 1080,
        fps: 30.0,
    }
}

/// 1080x1920 30fps (vertical/shorts) preset.
pub fn preset_shorts() -> CompositionSettings {
    CompositionSettings {
        width: 1080,
        height: 1920,
        fps: 30.0,
    }
}

/// 1280x720 30fps preset.
pub fn preset_720p() -> CompositionSettings {
    CompositionSettings {
        width: 1280,
        height: 720,
        fps: 30.0,
    }
}

/// 3840x2160 30fps (4K) preset.
pub fn preset_4k() -> CompositionSettings {
    CompositionSettings {
        width: 3840,
        height: 2160,
        fps: 30.0,
    }
}

/// 1920x1080 60fps preset.
pub fn preset_1080p_60() -> CompositionSettings {
    CompositionSettings {
        width: 1920,
        height: 1080,
        fps: 60.0,
    }
}

/// Look up a preset by its short name.
pub fn preset_by_name(name: &str) -> Option<CompositionSettings> {
    match name {
        "1080p" => Some(preset_1080p()),
        "1080p60" => Some(preset_1080p_60()),
        "720p" => Some(preset_720p()),
        "4k" => Some(preset_4k()),
        "shorts" => Some(preset_shorts()),
        _ => None,
    }
}
