use crate::config::{DuplicatePlacement, EngineConfig};
use crate::duration::total_duration;
use crate::resolver;
use crate::types::*;

/// Partial field set for [`OverlayStore::patch`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPatch {
    pub from: Option<Frame>,
    pub duration_in_frames: Option<Frame>,
    pub row: Option<usize>,
    pub bounds: Option<Rect>,
    pub rotation: Option<f64>,
    pub content: Option<OverlayContent>,
}

impl OverlayPatch {
    pub fn timing(from: Frame, duration_in_frames: Frame, row: usize) -> Self {
        Self {
            from: Some(from),
            duration_in_frames: Some(duration_in_frames),
            row: Some(row),
            ..Default::default()
        }
    }

    fn apply(self, overlay: &mut Overlay) {
        if let Some(from) = self.from {
            overlay.from = from;
        }
        if let Some(duration) = self.duration_in_frames {
            overlay.duration_in_frames = duration;
        }
        if let Some(row) = self.row {
            overlay.row = row;
        }
        if let Some(bounds) = self.bounds {
            overlay.set_bounds(bounds);
        }
        if let Some(rotation) = self.rotation {
            overlay.rotation = rotation;
        }
        if let Some(content) = self.content {
            overlay.content = content;
        }
    }
}

/// The single owner of the overlay collection.
///
/// Every mutation goes through a method here and ends by recomputing
/// [`OverlayStore::total_duration`]. Timing and row fields are clamped on the
/// way in so the store never holds a negative start, an empty duration, or a
/// row outside `0..max_rows`. Same-row overlap is not checked here; that is
/// the resolver's job.
#[derive(Debug, Clone)]
pub struct OverlayStore {
    overlays: Vec<Overlay>,
    selected: Option<OverlayId>,
    max_rows: usize,
    total_duration: Frame,
}

impl OverlayStore {
    pub fn new(max_rows: usize) -> Self {
        Self {
            overlays: vec![],
            selected: None,
            max_rows: max_rows.max(1),
            total_duration: total_duration(&[]),
        }
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn total_duration(&self) -> Frame {
        self.total_duration
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn selected(&self) -> Option<OverlayId> {
        self.selected
    }

    /// Select an overlay. Unknown ids clear the selection.
    pub fn select(&mut self, id: Option<OverlayId>) {
        self.selected = id.filter(|id| self.get(*id).is_some());
    }

    /// Highest row index in use, if any.
    pub fn highest_row(&self) -> Option<usize> {
        self.overlays.iter().map(|o| o.row).max()
    }

    /// Change the row count, never dropping below the highest occupied row.
    /// Returns the row count actually applied.
    pub fn set_max_rows(&mut self, rows: usize) -> usize {
        let floor = self.highest_row().map_or(1, |r| r + 1);
        self.max_rows = rows.max(floor).max(1);
        self.max_rows
    }

    /// The id the next `add` will hand out: max existing id + 1, or 0.
    pub fn next_id(&self) -> OverlayId {
        self.overlays
            .iter()
            .map(|o| o.id)
            .max()
            .map_or(OverlayId(0), OverlayId::next)
    }

    /// Assign an id and append.
    pub fn add(&mut self, draft: OverlayDraft) -> OverlayId {
        let id = self.next_id();
        let mut overlay = Overlay::from_draft(id, draft);
        self.clamp(&mut overlay);
        self.overlays.push(overlay);
        self.recompute();
        tracing::debug!(%id, "overlay added");
        id
    }

    /// Put back a previously removed overlay under its old id. Used by undo.
    pub(crate) fn restore(&mut self, overlay: Overlay, index: usize) {
        let index = index.min(self.overlays.len());
        self.overlays.insert(index, overlay);
        self.recompute();
    }

    /// Remove an overlay. Clears the selection if it pointed here.
    /// Returns the removed overlay and its index.
    pub fn remove(&mut self, id: OverlayId) -> Option<(Overlay, usize)> {
        let pos = self.overlays.iter().position(|o| o.id == id)?;
        let removed = self.overlays.remove(pos);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.recompute();
        tracing::debug!(%id, "overlay removed");
        Some((removed, pos))
    }

    /// Apply a pure function to one overlay. The id cannot be changed this
    /// way. Returns false if the id is unknown.
    pub fn update_with<F>(&mut self, id: OverlayId, f: F) -> bool
    where
        F: FnOnce(&Overlay) -> Overlay,
    {
        let Some(pos) = self.overlays.iter().position(|o| o.id == id) else {
            return false;
        };
        let mut next = f(&self.overlays[pos]);
        next.id = id;
        self.clamp(&mut next);
        self.overlays[pos] = next;
        self.recompute();
        true
    }

    /// Replace one overlay wholesale, keyed by its id.
    pub fn replace(&mut self, overlay: Overlay) -> bool {
        let id = overlay.id;
        self.update_with(id, move |_| overlay)
    }

    /// Apply a partial field set. Returns false if the id is unknown.
    pub fn patch(&mut self, id: OverlayId, patch: OverlayPatch) -> bool {
        self.update_with(id, |old| {
            let mut next = old.clone();
            patch.apply(&mut next);
            next
        })
    }

    /// Set several starts in one go, recomputing the duration once.
    pub fn set_starts(&mut self, starts: &[(OverlayId, Frame)]) {
        for &(id, from) in starts {
            if let Some(o) = self.overlays.iter_mut().find(|o| o.id == id) {
                o.from = from.max(0);
            }
        }
        self.recompute();
    }

    /// Every same-row pair whose intervals intersect.
    pub fn find_overlaps(&self) -> Vec<(OverlayId, OverlayId)> {
        resolver::find_overlaps(&self.overlays)
    }

    /// Push-after every row so nothing overlaps. Returns how many overlays
    /// moved.
    pub fn normalize(&mut self) -> usize {
        let changes = resolver::normalize(&self.overlays);
        if !changes.is_empty() {
            self.set_starts(&changes);
            tracing::debug!(moved = changes.len(), "store normalized");
        }
        changes.len()
    }

    /// Clone an overlay under a fresh id.
    ///
    /// The copy goes right after the original on the same row. With
    /// [`DuplicatePlacement::NextFreeSlot`], if that spot is taken the copy
    /// goes to the next free slot instead.
    pub fn duplicate(&mut self, id: OverlayId, config: &EngineConfig) -> Option<OverlayId> {
        let original = self.get(id)?.clone();
        let mut draft = original.to_draft();
        draft.from = original.end();

        if config.duplicate_placement == DuplicatePlacement::NextFreeSlot
            && !resolver::is_free(
                &self.overlays,
                draft.from,
                draft.duration_in_frames,
                draft.row,
                None,
                config.cross_row_veto,
            )
        {
            if let Some(slot) = resolver::find_next_available_slot(
                &self.overlays,
                draft.duration_in_frames,
                self.max_rows,
                self.total_duration,
                config.cross_row_veto,
            ) {
                draft.from = slot.from;
                draft.row = slot.row;
            }
        }

        let copy = self.add(draft);
        tracing::debug!(original = %id, %copy, "overlay duplicated");
        Some(copy)
    }

    /// Split an overlay at `at`, which must be strictly inside it.
    ///
    /// The original keeps `[from, at)`; a new overlay gets `[at, end)` with
    /// the media offset advanced by `at - from`. Non-interior points are a
    /// silent no-op returning `None`.
    pub fn split(&mut self, id: OverlayId, at: Frame) -> Option<OverlayId> {
        let pos = self.overlays.iter().position(|o| o.id == id)?;
        let original = &self.overlays[pos];
        if !original.contains_interior(at) {
            return None;
        }

        let elapsed = at - original.from;
        let mut right = original.to_draft();
        right.from = at;
        right.duration_in_frames = original.end() - at;
        right.content.advance_media_offset(elapsed);

        self.overlays[pos].duration_in_frames = elapsed;

        let right_id = self.next_id();
        self.overlays
            .insert(pos + 1, Overlay::from_draft(right_id, right));
        self.recompute();
        tracing::debug!(%id, at, right = %right_id, "overlay split");
        Some(right_id)
    }

    /// Swap the whole collection, renumbering ids from 0. Used by template
    /// import.
    pub fn replace_all(&mut self, drafts: Vec<OverlayDraft>) {
        self.overlays = drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| Overlay::from_draft(OverlayId(i as u64), draft))
            .collect();
        if let Some(highest) = self.highest_row() {
            self.max_rows = self.max_rows.max(highest + 1);
        }
        let mut overlays = std::mem::take(&mut self.overlays);
        for o in &mut overlays {
            self.clamp(o);
        }
        self.overlays = overlays;
        self.selected = None;
        self.recompute();
    }

    /// Swap in an exact collection, ids included. Used by undo.
    pub(crate) fn restore_all(&mut self, overlays: Vec<Overlay>, selected: Option<OverlayId>) {
        self.overlays = overlays;
        self.selected = selected;
        self.recompute();
    }

    fn clamp(&self, overlay: &mut Overlay) {
        overlay.from = overlay.from.max(0);
        overlay.duration_in_frames = overlay.duration_in_frames.max(1);
        overlay.row = overlay.row.min(self.max_rows - 1);
        overlay.width = overlay.width.max(0.0);
        overlay.height = overlay.height.max(0.0);
    }

    fn recompute(&mut self) {
        self.total_duration = total_duration(&self.overlays);
    }
}
