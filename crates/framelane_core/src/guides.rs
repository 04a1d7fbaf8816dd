//! Alignment guides for free-form placement inside the composition frame.

use crate::types::Rect;
use ordered_float::OrderedFloat;
use std::collections::BTreeSet;

/// Default snap distance in composition pixels.
pub const SNAP_THRESHOLD: f64 = 5.0;

const MIN_SIZE_PX: f64 = 1.0;

/// Active guide lines. `vertical` holds x positions, `horizontal` holds y
/// positions. Sets, since many overlays can share an edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentGuides {
    pub vertical: BTreeSet<OrderedFloat<f64>>,
    pub horizontal: BTreeSet<OrderedFloat<f64>>,
}

impl AlignmentGuides {
    pub fn is_empty(&self) -> bool {
        self.vertical.is_empty() && self.horizontal.is_empty()
    }
}

/// The corner handle being dragged in a resize. The opposite corner stays put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    fn moves_left(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    fn moves_top(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapOperation {
    Move,
    Resize(Corner),
}

/// Collect every canvas and sibling line within `threshold` of one of the
/// moving box's edges or centers.
pub fn compute_guides(
    moving: &Rect,
    others: &[Rect],
    canvas_width: f64,
    canvas_height: f64,
    threshold: f64,
) -> AlignmentGuides {
    let mut x_targets = vec![0.0, canvas_width / 2.0, canvas_width];
    let mut y_targets = vec![0.0, canvas_height / 2.0, canvas_height];
    for other in others {
        x_targets.extend([other.left, other.center_x(), other.right()]);
        y_targets.extend([other.top, other.center_y(), other.bottom()]);
    }

    let x_edges = [moving.left, moving.center_x(), moving.right()];
    let y_edges = [moving.top, moving.center_y(), moving.bottom()];

    let near = |edges: &[f64; 3], target: f64| edges.iter().any(|e| (e - target).abs() <= threshold);

    AlignmentGuides {
        vertical: x_targets
            .into_iter()
            .filter(|&t| near(&x_edges, t))
            .map(OrderedFloat)
            .collect(),
        horizontal: y_targets
            .into_iter()
            .filter(|&t| near(&y_edges, t))
            .map(OrderedFloat)
            .collect(),
    }
}

/// Smallest `guide - edge` over all pairs, if any lies within `threshold`.
fn best_offset(edges: &[f64], guides: &BTreeSet<OrderedFloat<f64>>, threshold: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for guide in guides {
        for edge in edges {
            let delta = guide.0 - edge;
            if delta.abs() <= threshold && best.map_or(true, |b| delta.abs() < b.abs()) {
                best = Some(delta);
            }
        }
    }
    best
}

/// Snap a box to the closest vertical and horizontal guide, independently.
///
/// A move shifts the whole box. A resize moves only the edges of the dragged
/// corner and keeps the opposite corner fixed; width and height never drop
/// below one pixel.
pub fn snap(rect: Rect, guides: &AlignmentGuides, op: SnapOperation, threshold: f64) -> Rect {
    let mut out = rect;
    match op {
        SnapOperation::Move => {
            let xs = [rect.left, rect.center_x(), rect.right()];
            let ys = [rect.top, rect.center_y(), rect.bottom()];
            if let Some(dx) = best_offset(&xs, &guides.vertical, threshold) {
                out.left += dx;
            }
            if let Some(dy) = best_offset(&ys, &guides.horizontal, threshold) {
                out.top += dy;
            }
        }
        SnapOperation::Resize(corner) => {
            let (anchor_x, edge_x) = if corner.moves_left() {
                (rect.right(), rect.left)
            } else {
                (rect.left, rect.right())
            };
            let (anchor_y, edge_y) = if corner.moves_top() {
                (rect.bottom(), rect.top)
            } else {
                (rect.top, rect.bottom())
            };

            let edge_x = edge_x + best_offset(&[edge_x], &guides.vertical, threshold).unwrap_or(0.0);
            let edge_y = edge_y + best_offset(&[edge_y], &guides.horizontal, threshold).unwrap_or(0.0);

            out.width = (edge_x - anchor_x).abs().max(MIN_SIZE_PX);
            out.height = (edge_y - anchor_y).abs().max(MIN_SIZE_PX);
            out.left = if corner.moves_left() {
                anchor_x - out.width
            } else {
                anchor_x
            };
            out.top = if corner.moves_top() {
                anchor_y - out.height
            } else {
                anchor_y
            };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xs(guides: &BTreeSet<OrderedFloat<f64>>) -> Vec<f64> {
        guides.iter().map(|g| g.0).collect()
    }

    #[test]
    fn left_edge_near_sibling_right_edge_snaps() {
        let sibling = Rect::new(100.0, 700.0, 200.0, 100.0);
        let moving = Rect::new(297.0, 100.0, 50.0, 50.0);

        let guides = compute_guides(&moving, &[sibling], 1000.0, 1000.0, SNAP_THRESHOLD);
        assert_eq!(xs(&guides.vertical), vec![300.0]);

        let snapped = snap(moving, &guides, SnapOperation::Move, SNAP_THRESHOLD);
        assert_eq!(snapped.left, 300.0);
        assert_eq!(snapped.width, 50.0);
    }

    #[test]
    fn far_boxes_produce_no_guides() {
        let moving = Rect::new(217.0, 133.0, 40.0, 40.0);
        let guides = compute_guides(&moving, &[], 1000.0, 1000.0, SNAP_THRESHOLD);
        assert!(guides.is_empty());
        assert_eq!(snap(moving, &guides, SnapOperation::Move, SNAP_THRESHOLD), moving);
    }

    #[test]
    fn canvas_center_and_edges_are_targets() {
        // Center x at 498, bottom at 1003.
        let moving = Rect::new(448.0, 903.0, 100.0, 100.0);
        let guides = compute_guides(&moving, &[], 1000.0, 1000.0, SNAP_THRESHOLD);
        assert_eq!(xs(&guides.vertical), vec![500.0]);
        assert_eq!(xs(&guides.horizontal), vec![1000.0]);

        let snapped = snap(moving, &guides, SnapOperation::Move, SNAP_THRESHOLD);
        assert_eq!(snapped.center_x(), 500.0);
        assert_eq!(snapped.bottom(), 1000.0);
    }

    #[test]
    fn shared_edges_are_deduplicated() {
        let a = Rect::new(0.0, 0.0, 300.0, 10.0);
        let b = Rect::new(100.0, 500.0, 200.0, 10.0);
        let moving = Rect::new(302.0, 200.0, 10.0, 10.0);
        let guides = compute_guides(&moving, &[a, b], 1000.0, 1000.0, SNAP_THRESHOLD);
        assert_eq!(xs(&guides.vertical), vec![300.0]);
    }

    #[test]
    fn move_picks_closest_guide_per_axis() {
        let mut guides = AlignmentGuides::default();
        guides.vertical.insert(OrderedFloat(100.0));
        guides.vertical.insert(OrderedFloat(104.0));
        let moving = Rect::new(103.0, 0.0, 20.0, 20.0);

        let snapped = snap(moving, &guides, SnapOperation::Move, SNAP_THRESHOLD);
        assert_eq!(snapped.left, 104.0);
        assert_eq!(snapped.top, 0.0);
    }

    #[test]
    fn resize_bottom_right_keeps_top_left_anchor() {
        let mut guides = AlignmentGuides::default();
        guides.vertical.insert(OrderedFloat(500.0));
        guides.horizontal.insert(OrderedFloat(300.0));
        let rect = Rect::new(100.0, 100.0, 397.0, 203.0);

        let snapped = snap(rect, &guides, SnapOperation::Resize(Corner::BottomRight), SNAP_THRESHOLD);
        assert_eq!(snapped, Rect::new(100.0, 100.0, 400.0, 200.0));
    }

    #[test]
    fn resize_top_left_keeps_bottom_right_anchor() {
        let mut guides = AlignmentGuides::default();
        guides.vertical.insert(OrderedFloat(100.0));
        guides.horizontal.insert(OrderedFloat(50.0));
        let rect = Rect::new(98.0, 53.0, 102.0, 147.0);

        let snapped = snap(rect, &guides, SnapOperation::Resize(Corner::TopLeft), SNAP_THRESHOLD);
        assert_eq!(snapped, Rect::new(100.0, 50.0, 100.0, 150.0));
    }

    #[test]
    fn resize_ignores_guides_near_the_anchor() {
        let mut guides = AlignmentGuides::default();
        guides.vertical.insert(OrderedFloat(102.0));
        let rect = Rect::new(100.0, 0.0, 50.0, 50.0);

        let snapped = snap(rect, &guides, SnapOperation::Resize(Corner::TopRight), SNAP_THRESHOLD);
        assert_eq!(snapped.left, 100.0);
        assert_eq!(snapped.width, 50.0);
    }

    #[test]
    fn resize_never_collapses_below_one_pixel() {
        let mut guides = AlignmentGuides::default();
        guides.vertical.insert(OrderedFloat(100.0));
        guides.horizontal.insert(OrderedFloat(10.0));
        // Right edge at 103 snaps onto the left anchor at 100.
        let rect = Rect::new(100.0, 10.0, 3.0, 2.0);

        let snapped = snap(rect, &guides, SnapOperation::Resize(Corner::BottomRight), SNAP_THRESHOLD);
        assert_eq!(snapped.width, 1.0);
        assert_eq!(snapped.height, 1.0);
        assert_eq!(snapped.left, 100.0);
        assert_eq!(snapped.top, 10.0);
    }
}
