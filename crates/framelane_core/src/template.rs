use crate::config::MAX_ROWS_LIMIT;
use crate::error::{CoreError, Result};
use crate::store::OverlayStore;
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const TEMPLATE_EXTENSION: &str = "framelane";

/// Largest start or length accepted from a template, about 2.2 years at 30fps.
pub const MAX_TEMPLATE_FRAMES: Frame = i32::MAX as Frame;

/// A saved overlay collection that can replace a session's timeline
/// wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Total duration in frames when exported. Informational only; the store
    /// always derives its own.
    pub duration: Frame,
    pub overlays: Vec<Overlay>,
}

impl Template {
    /// Snapshot the store's overlays under a new template id.
    pub fn from_store(name: impl Into<String>, description: impl Into<String>, store: &OverlayStore) -> Self {
        let now = Utc::now();
        let template = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
            author: None,
            category: None,
            tags: vec![],
            thumbnail: None,
            duration: store.total_duration(),
            overlays: store.overlays().to_vec(),
        };
        tracing::info!(
            template = %template.id,
            overlays = template.overlays.len(),
            duration = template.duration,
            "template exported"
        );
        template
    }

    /// Same template metadata with the store's current overlays.
    pub fn refreshed(&self, store: &OverlayStore) -> Self {
        Self {
            updated_at: Utc::now(),
            duration: store.total_duration(),
            overlays: store.overlays().to_vec(),
            ..self.clone()
        }
    }

    pub fn parse(json: &str) -> Result<Self> {
        let template: Template = serde_json::from_str(json)?;
        template.validate()?;
        Ok(template)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject collections the store could not hold without silently
    /// clamping them.
    pub fn validate(&self) -> Result<()> {
        for overlay in &self.overlays {
            if overlay.row >= MAX_ROWS_LIMIT {
                return Err(CoreError::InvalidTemplate(format!(
                    "overlay {} is on row {}, limit is {}",
                    overlay.id, overlay.row, MAX_ROWS_LIMIT
                )));
            }
            if overlay.duration_in_frames < 1 {
                return Err(CoreError::InvalidTemplate(format!(
                    "overlay {} has duration {}",
                    overlay.id, overlay.duration_in_frames
                )));
            }
            if overlay.from < 0 {
                return Err(CoreError::InvalidTemplate(format!(
                    "overlay {} starts at {}",
                    overlay.id, overlay.from
                )));
            }
            if overlay.from > MAX_TEMPLATE_FRAMES || overlay.duration_in_frames > MAX_TEMPLATE_FRAMES {
                return Err(CoreError::InvalidTemplate(format!(
                    "overlay {} timing out of range, limit is {} frames",
                    overlay.id, MAX_TEMPLATE_FRAMES
                )));
            }
        }
        Ok(())
    }

    /// The overlays stripped of their ids, ready for [`OverlayStore::replace_all`].
    pub fn drafts(&self) -> Vec<OverlayDraft> {
        self.overlays.iter().map(Overlay::to_draft).collect()
    }

    /// Save as pretty-printed JSON.
    /// Appends the `.framelane` extension if not present.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = ensure_extension(path.as_ref());
        std::fs::write(&path, self.to_json()?)?;
        Ok(path)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&data).inspect_err(|e| {
            tracing::warn!(path = %path.as_ref().display(), error = %e, "template rejected");
        })
    }
}

fn ensure_extension(path: &Path) -> PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXTENSION) {
        path.to_path_buf()
    } else {
        let mut p = path.to_path_buf();
        let mut name = p.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(TEMPLATE_EXTENSION);
        p.set_file_name(name);
        p
    }
}
