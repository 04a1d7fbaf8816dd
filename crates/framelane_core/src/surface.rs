//! Mapping between timeline space (frames, rows) and pixel space.
//!
//! The surface reads the store and the controller's ghost and produces
//! geometry to draw. It never mutates either.

use crate::controller::{DragAction, Ghost, PointerTarget};
use crate::store::OverlayStore;
use crate::types::*;

/// Width of the resize grip at each end of an item, in pixels.
pub const HANDLE_WIDTH_PX: f64 = 8.0;

const MIN_ZOOM: f64 = 0.1;

/// The external player. It owns playback; the timeline only reads the
/// current frame and asks it to seek.
pub trait Preview {
    fn current_frame(&self) -> Frame;
    fn seek(&mut self, frame: Frame);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineViewport {
    pub width_px: f64,
    pub row_height_px: f64,
    pub zoom: f64,
}

/// Pixel geometry for one item on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemLayout {
    pub id: OverlayId,
    pub kind: OverlayKind,
    pub rect: Rect,
    pub selected: bool,
    /// Drawn as a dashed preview, not a committed item.
    pub ghost: bool,
}

impl TimelineViewport {
    pub fn new(width_px: f64, row_height_px: f64) -> Self {
        Self {
            width_px,
            row_height_px,
            zoom: 1.0,
        }
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom.max(MIN_ZOOM);
        self
    }

    /// Pixel width of the full composition at the current zoom.
    pub fn content_width(&self) -> f64 {
        (self.width_px * self.zoom.max(MIN_ZOOM)).max(1.0)
    }

    pub fn frame_to_px(&self, frame: Frame, total_duration: Frame) -> f64 {
        frame as f64 / total_duration.max(1) as f64 * self.content_width()
    }

    /// Pixel x to the nearest frame, clamped to `0..=total_duration`.
    pub fn px_to_frame(&self, x: f64, total_duration: Frame) -> Frame {
        let total = total_duration.max(1);
        let frame = (x / self.content_width() * total as f64).round() as Frame;
        frame.clamp(0, total)
    }

    pub fn row_to_px(&self, row: usize) -> f64 {
        row as f64 * self.row_height_px
    }

    /// Pixel y to a row index, clamped to `0..max_rows`.
    pub fn px_to_row(&self, y: f64, max_rows: usize) -> usize {
        if y <= 0.0 || self.row_height_px <= 0.0 {
            return 0;
        }
        ((y / self.row_height_px).floor() as usize).min(max_rows.saturating_sub(1))
    }

    pub fn item_rect(&self, overlay: &Overlay, total_duration: Frame) -> Rect {
        Rect::new(
            self.frame_to_px(overlay.from, total_duration),
            self.row_to_px(overlay.row),
            self.frame_to_px(overlay.duration_in_frames, total_duration),
            self.row_height_px,
        )
    }

    pub fn ghost_rect(&self, ghost: &Ghost) -> Rect {
        let width = self.content_width();
        Rect::new(
            ghost.left_pct / 100.0 * width,
            self.row_to_px(ghost.row),
            ghost.width_pct / 100.0 * width,
            self.row_height_px,
        )
    }

    /// Geometry for every committed item plus the ghost, if any. The ghost
    /// comes last so it draws on top.
    pub fn layout(&self, store: &OverlayStore, ghost: Option<&Ghost>) -> Vec<ItemLayout> {
        let total = store.total_duration();
        let mut items: Vec<ItemLayout> = store
            .overlays()
            .iter()
            .map(|o| ItemLayout {
                id: o.id,
                kind: o.kind(),
                rect: self.item_rect(o, total),
                selected: store.selected() == Some(o.id),
                ghost: false,
            })
            .collect();

        if let Some(ghost) = ghost {
            if let Some(o) = store.get(ghost.id) {
                items.push(ItemLayout {
                    id: ghost.id,
                    kind: o.kind(),
                    rect: self.ghost_rect(ghost),
                    selected: false,
                    ghost: true,
                });
            }
        }
        items
    }

    /// Which item, and which part of it, sits under a pixel position.
    pub fn hit_test(&self, store: &OverlayStore, x: f64, y: f64) -> Option<PointerTarget> {
        let total = store.total_duration();
        store.overlays().iter().rev().find_map(|o| {
            let rect = self.item_rect(o, total);
            if x < rect.left || x > rect.right() || y < rect.top || y >= rect.bottom() {
                return None;
            }
            let grip = HANDLE_WIDTH_PX.min(rect.width / 3.0);
            let action = if x - rect.left <= grip {
                DragAction::ResizeStart
            } else if rect.right() - x <= grip {
                DragAction::ResizeEnd
            } else {
                DragAction::Move
            };
            Some(PointerTarget { id: o.id, action })
        })
    }

    /// Ruler click: seek the preview to the frame under `x`.
    pub fn seek_from_click<P: Preview + ?Sized>(
        &self,
        x: f64,
        total_duration: Frame,
        preview: &mut P,
    ) -> Frame {
        let frame = self.px_to_frame(x, total_duration);
        preview.seek(frame);
        frame
    }

    /// Pixel x of the preview's playhead.
    pub fn playhead_px<P: Preview + ?Sized>(&self, preview: &P, total_duration: Frame) -> f64 {
        self.frame_to_px(preview.current_frame(), total_duration)
    }
}
