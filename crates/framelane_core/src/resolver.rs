//! Slot search for new overlays and overlap repair for moved ones.
//!
//! Everything here is a pure function over a slice of overlays; callers turn
//! the results into store mutations.

use crate::config::OverlapPolicy;
use crate::types::*;

/// A `(from, row)` position on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub from: Frame,
    pub row: usize,
}

/// Outcome of repairing a proposed placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Final start of the placed overlay.
    pub from: Frame,
    /// Other overlays that had to move, with their new start.
    pub displaced: Vec<(OverlayId, Frame)>,
}

fn row_neighbors(overlays: &[Overlay], row: usize, exclude: Option<OverlayId>) -> Vec<&Overlay> {
    let mut items: Vec<&Overlay> = overlays
        .iter()
        .filter(|o| o.row == row && Some(o.id) != exclude)
        .collect();
    items.sort_by_key(|o| (o.from, o.end()));
    items
}

/// True if `[from, from + duration)` on `row` is free of every other overlay.
/// With `cross_row_veto` the interval must be free on every row.
pub fn is_free(
    overlays: &[Overlay],
    from: Frame,
    duration: Frame,
    row: usize,
    exclude: Option<OverlayId>,
    cross_row_veto: bool,
) -> bool {
    overlays.iter().all(|o| {
        Some(o.id) == exclude
            || (o.row != row && !cross_row_veto)
            || !intervals_overlap(from, from + duration, o.from, o.end())
    })
}

/// Scan rows top to bottom for the first gap that can hold `duration` frames.
///
/// Gaps are bounded by `total_duration`, except on an empty row which accepts
/// anything at frame 0. Falls back to appending at `total_duration` on the
/// last row. Returns `None` only when there are no rows.
pub fn find_next_available_slot(
    overlays: &[Overlay],
    duration: Frame,
    rows: usize,
    total_duration: Frame,
    cross_row_veto: bool,
) -> Option<Slot> {
    if rows == 0 {
        return None;
    }
    let duration = duration.max(1);

    for row in 0..rows {
        let items = row_neighbors(overlays, row, None);

        let mut candidates = Vec::new();
        if items.is_empty() {
            candidates.push(0);
        } else {
            let mut cursor = 0;
            for item in &items {
                if item.from - cursor >= duration {
                    candidates.push(cursor);
                }
                cursor = cursor.max(item.end());
            }
            if total_duration - cursor >= duration {
                candidates.push(cursor);
            }
        }

        if let Some(from) = candidates
            .into_iter()
            .find(|&from| is_free(overlays, from, duration, row, None, cross_row_veto))
        {
            return Some(Slot { from, row });
        }
    }

    Some(Slot {
        from: total_duration,
        row: rows - 1,
    })
}

/// Overlays on `row` whose interval intersects `[from, from + duration)`,
/// in ascending start order.
pub fn colliding<'a>(
    overlays: &'a [Overlay],
    from: Frame,
    duration: Frame,
    row: usize,
    exclude: Option<OverlayId>,
) -> Vec<&'a Overlay> {
    row_neighbors(overlays, row, exclude)
        .into_iter()
        .filter(|o| intervals_overlap(from, from + duration, o.from, o.end()))
        .collect()
}

/// Bump `from` past every same-row neighbour it collides with, in ascending
/// start order, until the interval is clear.
pub fn resolve_push_after(
    overlays: &[Overlay],
    moving: OverlayId,
    from: Frame,
    duration: Frame,
    row: usize,
) -> Frame {
    let neighbors = row_neighbors(overlays, row, Some(moving));
    let mut from = from.max(0);

    loop {
        let mut moved = false;
        for n in &neighbors {
            if intervals_overlap(from, from + duration, n.from, n.end()) {
                from = n.end();
                moved = true;
            }
        }
        if !moved {
            return from;
        }
    }
}

/// Slide every same-row neighbour the placed interval intersects to start
/// right after it, cascading so shifted neighbours stack without gaps.
pub fn resolve_shift_displaced(
    overlays: &[Overlay],
    moving: OverlayId,
    from: Frame,
    duration: Frame,
    row: usize,
) -> Vec<(OverlayId, Frame)> {
    let mut cursor = from + duration;
    let mut displaced = Vec::new();

    for n in row_neighbors(overlays, row, Some(moving)) {
        if n.end() <= from {
            continue;
        }
        if n.from >= cursor {
            break;
        }
        displaced.push((n.id, cursor));
        cursor += n.duration_in_frames;
    }

    displaced
}

/// Apply `policy` to a proposed placement.
pub fn resolve(
    policy: OverlapPolicy,
    overlays: &[Overlay],
    moving: OverlayId,
    from: Frame,
    duration: Frame,
    row: usize,
) -> Resolution {
    match policy {
        OverlapPolicy::PushAfter => Resolution {
            from: resolve_push_after(overlays, moving, from, duration, row),
            displaced: vec![],
        },
        OverlapPolicy::ShiftDisplaced => Resolution {
            from,
            displaced: resolve_shift_displaced(overlays, moving, from, duration, row),
        },
    }
}

/// Every same-row pair whose intervals intersect.
pub fn find_overlaps(overlays: &[Overlay]) -> Vec<(OverlayId, OverlayId)> {
    let mut pairs = Vec::new();
    for (i, a) in overlays.iter().enumerate() {
        for b in &overlays[i + 1..] {
            if a.row == b.row && intervals_overlap(a.from, a.end(), b.from, b.end()) {
                pairs.push((a.id, b.id));
            }
        }
    }
    pairs
}

/// Push-after every row in start order so no two overlays overlap.
/// Returns the overlays whose start changed.
pub fn normalize(overlays: &[Overlay]) -> Vec<(OverlayId, Frame)> {
    let mut rows: Vec<usize> = overlays.iter().map(|o| o.row).collect();
    rows.sort_unstable();
    rows.dedup();

    let mut changes = Vec::new();
    for row in rows {
        let mut cursor = 0;
        for o in row_neighbors(overlays, row, None) {
            let from = o.from.max(cursor);
            if from != o.from {
                changes.push((o.id, from));
            }
            cursor = from + o.duration_in_frames;
        }
    }
    changes
}
