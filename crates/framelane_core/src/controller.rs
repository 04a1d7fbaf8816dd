//! Pointer-driven drag/resize/split state machine.
//!
//! Mouse and touch input are normalized into [`PointerEvent`]s before they
//! get here. While a gesture is in flight the controller only writes its own
//! [`Ghost`]; the store is touched only through the command returned on
//! commit.

use crate::config::EngineConfig;
use crate::history::SetTimingCommand;
use crate::resolver;
use crate::snapping::{collect_snap_points, find_snap_point, snap_to_grid, GRID_SIZE};
use crate::store::OverlayStore;
use crate::surface::TimelineViewport;
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragAction {
    Move,
    ResizeStart,
    ResizeEnd,
}

/// What the pointer is over: an item, and which part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerTarget {
    pub id: OverlayId,
    pub action: DragAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Leave,
}

/// One mouse or touch event in timeline-local pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub x: f64,
    pub y: f64,
    pub target: Option<PointerTarget>,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, x: f64, y: f64) -> Self {
        Self {
            phase,
            x,
            y,
            target: None,
        }
    }

    pub fn on(mut self, target: PointerTarget) -> Self {
        self.target = Some(target);
        self
    }
}

/// Captured when a gesture starts. Every move is computed from here, so
/// replaying the same move is harmless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub id: OverlayId,
    pub action: DragAction,
    pub start_x: f64,
    pub start_y: f64,
    pub start_from: Frame,
    pub start_duration: Frame,
    pub start_row: usize,
    pub total_duration: Frame,
}

/// Uncommitted preview geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ghost {
    pub id: OverlayId,
    pub from: Frame,
    pub duration_in_frames: Frame,
    pub row: usize,
    pub left_pct: f64,
    pub width_pct: f64,
    /// Set when an edge magnet, not the grid, decided the position.
    pub magnetized: bool,
}

impl Ghost {
    pub fn top_pct(&self, max_rows: usize) -> f64 {
        self.row as f64 / max_rows.max(1) as f64 * 100.0
    }
}

/// Pointer position over an item, independent of dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hover {
    pub id: OverlayId,
    pub frame: Frame,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerState {
    Idle,
    Dragging(DragState),
}

/// What the caller should do after feeding an event.
#[derive(Debug)]
pub enum ControllerOutput {
    Nothing,
    Select(OverlayId),
    Commit(SetTimingCommand),
    Cancelled,
}

/// Read-only view of everything a gesture needs.
#[derive(Debug, Clone, Copy)]
pub struct DragContext<'a> {
    pub store: &'a OverlayStore,
    pub viewport: &'a TimelineViewport,
    pub config: &'a EngineConfig,
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    state: ControllerState,
    ghost: Option<Ghost>,
    hover: Option<Hover>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Idle,
            ghost: None,
            hover: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ControllerState::Dragging(_))
    }

    pub fn ghost(&self) -> Option<&Ghost> {
        self.ghost.as_ref()
    }

    pub fn hover(&self) -> Option<Hover> {
        self.hover
    }

    pub fn handle(&mut self, event: PointerEvent, ctx: DragContext<'_>) -> ControllerOutput {
        match event.phase {
            PointerPhase::Down => match event.target {
                Some(target) => self.begin(target, event.x, event.y, ctx),
                None => ControllerOutput::Nothing,
            },
            PointerPhase::Move => {
                if self.is_dragging() {
                    self.drag(event.x, event.y, ctx);
                } else {
                    self.track_hover(event, ctx);
                }
                ControllerOutput::Nothing
            }
            PointerPhase::Up => self.finish(ctx),
            PointerPhase::Leave => {
                self.hover = None;
                if self.ghost.is_some() {
                    self.finish(ctx)
                } else if self.is_dragging() {
                    self.cancel();
                    ControllerOutput::Cancelled
                } else {
                    ControllerOutput::Nothing
                }
            }
        }
    }

    /// Start a move or resize on `target`.
    pub fn begin(
        &mut self,
        target: PointerTarget,
        x: f64,
        y: f64,
        ctx: DragContext<'_>,
    ) -> ControllerOutput {
        let Some(overlay) = ctx.store.get(target.id) else {
            return ControllerOutput::Nothing;
        };
        self.state = ControllerState::Dragging(DragState {
            id: target.id,
            action: target.action,
            start_x: x,
            start_y: y,
            start_from: overlay.from,
            start_duration: overlay.duration_in_frames,
            start_row: overlay.row,
            total_duration: ctx.store.total_duration(),
        });
        self.ghost = None;
        tracing::debug!(id = %target.id, action = ?target.action, "drag started");
        ControllerOutput::Select(target.id)
    }

    /// Recompute the ghost from the total pointer delta since `begin`.
    pub fn drag(&mut self, x: f64, y: f64, ctx: DragContext<'_>) {
        let ControllerState::Dragging(d) = self.state else {
            return;
        };
        self.ghost = Some(propose(&d, x - d.start_x, y - d.start_y, ctx));
    }

    /// Drop the gesture without touching the store.
    pub fn cancel(&mut self) {
        if let ControllerState::Dragging(d) = self.state {
            tracing::debug!(id = %d.id, "drag cancelled");
        }
        self.state = ControllerState::Idle;
        self.ghost = None;
    }

    /// Turn the ghost into a commit, or a click if nothing moved.
    pub fn finish(&mut self, ctx: DragContext<'_>) -> ControllerOutput {
        let ControllerState::Dragging(d) = self.state else {
            return ControllerOutput::Nothing;
        };
        let ghost = self.ghost.take();
        self.state = ControllerState::Idle;

        let Some(ghost) = ghost else {
            return ControllerOutput::Select(d.id);
        };

        // Ghost frames are already whole grid steps away from the start.
        let from = ghost.from.max(0);
        let duration = match d.action {
            DragAction::Move => d.start_duration,
            DragAction::ResizeStart | DragAction::ResizeEnd => ghost
                .duration_in_frames
                .max(GRID_SIZE.min(d.start_duration)),
        };
        let row = ghost.row.min(ctx.store.max_rows().saturating_sub(1));

        if (from, duration, row) == (d.start_from, d.start_duration, d.start_row) {
            return ControllerOutput::Select(d.id);
        }

        let resolution = resolver::resolve(
            ctx.config.overlap_policy,
            ctx.store.overlays(),
            d.id,
            from,
            duration,
            row,
        );
        tracing::debug!(
            id = %d.id,
            from = resolution.from,
            duration,
            row,
            displaced = resolution.displaced.len(),
            "drag committed"
        );
        ControllerOutput::Commit(SetTimingCommand::new(
            d.id,
            resolution.from,
            duration,
            row,
            resolution.displaced,
        ))
    }

    fn track_hover(&mut self, event: PointerEvent, ctx: DragContext<'_>) {
        self.hover = event.target.map(|t| Hover {
            id: t.id,
            frame: ctx
                .viewport
                .px_to_frame(event.x, ctx.store.total_duration()),
        });
    }

    /// Split target from the hover position, if it is strictly inside the
    /// hovered item.
    pub fn split_point(&self, store: &OverlayStore) -> Option<(OverlayId, Frame)> {
        let hover = self.hover?;
        let overlay = store.get(hover.id)?;
        overlay
            .contains_interior(hover.frame)
            .then_some((hover.id, hover.frame))
    }
}

/// Proposed geometry for a drag delta, clamped to the timeline.
fn propose(d: &DragState, dx: f64, dy: f64, ctx: DragContext<'_>) -> Ghost {
    let total = d.total_duration.max(1);
    let delta_time = snap_to_grid(dx / ctx.viewport.content_width() * total as f64);
    let delta_row = if ctx.viewport.row_height_px > 0.0 {
        (dy / ctx.viewport.row_height_px).round() as i64
    } else {
        0
    };
    let start_end = d.start_from + d.start_duration;
    let min_duration = GRID_SIZE.min(d.start_duration);

    let (mut from, mut duration, row) = match d.action {
        DragAction::Move => {
            let max_row = ctx.store.max_rows() as i64 - 1;
            let row = (d.start_row as i64 + delta_row).clamp(0, max_row) as usize;
            ((d.start_from + delta_time).max(0), d.start_duration, row)
        }
        DragAction::ResizeStart => {
            let from = (d.start_from + delta_time)
                .min(start_end - min_duration)
                .max(0);
            (from, start_end - from, d.start_row)
        }
        DragAction::ResizeEnd => (
            d.start_from,
            (d.start_duration + delta_time).max(min_duration),
            d.start_row,
        ),
    };

    let mut magnetized = false;
    if ctx.config.edge_snap {
        let points = collect_snap_points(ctx.store.overlays(), Some(d.id));
        let threshold =
            (ctx.config.snap_threshold_px / ctx.viewport.content_width() * total as f64).round() as Frame;
        match d.action {
            DragAction::Move => {
                let snapped = find_snap_point(from, &points, threshold);
                if snapped != from {
                    from = snapped;
                    magnetized = true;
                } else {
                    let end = from + duration;
                    let snapped = find_snap_point(end, &points, threshold);
                    if snapped != end && snapped - duration >= 0 {
                        from = snapped - duration;
                        magnetized = true;
                    }
                }
            }
            DragAction::ResizeStart => {
                let snapped = find_snap_point(from, &points, threshold);
                if snapped != from && snapped < start_end {
                    from = snapped;
                    duration = start_end - from;
                    magnetized = true;
                }
            }
            DragAction::ResizeEnd => {
                let end = from + duration;
                let snapped = find_snap_point(end, &points, threshold);
                if snapped != end && snapped > from {
                    duration = snapped - from;
                    magnetized = true;
                }
            }
        }
    }

    let total_f = total as f64;
    let mut left_pct = (from as f64 / total_f * 100.0).clamp(0.0, 100.0);
    let mut width_pct = (duration as f64 / total_f * 100.0).clamp(0.0, 100.0);
    if left_pct + width_pct > 100.0 {
        match d.action {
            DragAction::Move => left_pct = 100.0 - width_pct,
            DragAction::ResizeStart | DragAction::ResizeEnd => width_pct = 100.0 - left_pct,
        }
        from = (left_pct / 100.0 * total_f).round() as Frame;
        duration = (width_pct / 100.0 * total_f).round() as Frame;
    }

    Ghost {
        id: d.id,
        from,
        duration_in_frames: duration,
        row,
        left_pct,
        width_pct,
        magnetized,
    }
}
