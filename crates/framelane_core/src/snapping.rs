use crate::types::*;

/// One grid unit in frames (one second at 30fps). All timing edits snap to it.
pub const GRID_SIZE: Frame = 30;

/// Round a (possibly fractional) frame value to the nearest grid multiple.
pub fn snap_to_grid(value: f64) -> Frame {
    let grid = GRID_SIZE as f64;
    ((value / grid).round() * grid) as Frame
}

/// Grid snap for an integer frame.
pub fn snap_frame(frame: Frame) -> Frame {
    snap_to_grid(frame as f64)
}

/// Find the nearest snap point within the threshold.
/// Returns the snapped position if within threshold, otherwise the original position.
pub fn find_snap_point(position: Frame, snap_points: &[Frame], threshold: Frame) -> Frame {
    let mut best = position;
    let mut best_dist = threshold + 1;

    for &point in snap_points {
        let dist = (position - point).abs();
        if dist < best_dist {
            best = point;
            best_dist = dist;
        }
    }

    if best_dist <= threshold {
        best
    } else {
        position
    }
}

/// Collect the start/end frames of every overlay, plus frame 0.
pub fn collect_snap_points(overlays: &[Overlay], exclude: Option<OverlayId>) -> Vec<Frame> {
    let mut points = vec![0];

    for overlay in overlays {
        if Some(overlay.id) == exclude {
            continue;
        }
        points.push(overlay.from);
        points.push(overlay.end());
    }

    points.sort_unstable();
    points.dedup();
    points
}
