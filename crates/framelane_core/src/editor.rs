use crate::config::{EngineConfig, MAX_ROWS_LIMIT};
use crate::controller::{ControllerOutput, DragContext, Ghost, InteractionController, PointerEvent};
use crate::error::Result;
use crate::guides::{self, AlignmentGuides, SnapOperation, SNAP_THRESHOLD};
use crate::history::*;
use crate::resolver;
use crate::store::OverlayStore;
use crate::surface::{ItemLayout, Preview, TimelineViewport};
use crate::template::Template;
use crate::types::*;
use std::collections::VecDeque;

const HISTORY_LIMIT: usize = 100;

/// One editing session: the store plus everything allowed to change it.
///
/// All mutations are turned into [`Command`]s and drained through a FIFO
/// queue into the history, so a commit always finishes (store updated, total
/// duration recomputed) before the next one starts.
#[derive(Debug)]
pub struct Editor {
    config: EngineConfig,
    store: OverlayStore,
    history: History,
    controller: InteractionController,
    viewport: TimelineViewport,
    pending: VecDeque<Box<dyn Command>>,
}

impl Editor {
    pub fn new(mut config: EngineConfig, viewport: TimelineViewport) -> Self {
        config.max_rows = config.max_rows.clamp(1, MAX_ROWS_LIMIT);
        Self {
            store: OverlayStore::new(config.max_rows),
            config,
            history: History::new(HISTORY_LIMIT),
            controller: InteractionController::new(),
            viewport,
            pending: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &OverlayStore {
        &self.store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn ghost(&self) -> Option<&Ghost> {
        self.controller.ghost()
    }

    pub fn viewport(&self) -> &TimelineViewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: TimelineViewport) {
        self.viewport = viewport;
    }

    /// Pixel geometry for the next frame, ghost included.
    pub fn layout(&self) -> Vec<ItemLayout> {
        self.viewport.layout(&self.store, self.controller.ghost())
    }

    // -----------------------------------------------------------------------
    // Pointer input
    // -----------------------------------------------------------------------

    /// Feed one pointer event. Events without a target are hit-tested
    /// against the current layout.
    pub fn dispatch(&mut self, mut event: PointerEvent) -> Result<()> {
        if event.target.is_none() {
            event.target = self.viewport.hit_test(&self.store, event.x, event.y);
        }
        let ctx = DragContext {
            store: &self.store,
            viewport: &self.viewport,
            config: &self.config,
        };
        match self.controller.handle(event, ctx) {
            ControllerOutput::Select(id) => self.store.select(Some(id)),
            ControllerOutput::Commit(cmd) => self.pending.push_back(Box::new(cmd)),
            ControllerOutput::Nothing | ControllerOutput::Cancelled => {}
        }
        self.flush()
    }

    /// Ruler click: move the preview's playhead.
    pub fn seek<P: Preview + ?Sized>(&self, x: f64, preview: &mut P) -> Frame {
        self.viewport
            .seek_from_click(x, self.store.total_duration(), preview)
    }

    fn submit(&mut self, cmd: Box<dyn Command>) -> Result<()> {
        self.pending.push_back(cmd);
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        while let Some(cmd) = self.pending.pop_front() {
            self.history.execute(cmd, &mut self.store)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Editing operations
    // -----------------------------------------------------------------------

    /// Add a draft exactly where it says. No overlap check.
    pub fn add(&mut self, draft: OverlayDraft) -> Result<OverlayId> {
        let id = self.store.next_id();
        self.submit(Box::new(AddOverlayCommand::new(draft)))?;
        Ok(id)
    }

    /// Add new content in the first free slot.
    pub fn insert(&mut self, content: OverlayContent, duration: Frame) -> Result<Option<OverlayId>> {
        let Some(slot) = resolver::find_next_available_slot(
            self.store.overlays(),
            duration,
            self.store.max_rows(),
            self.store.total_duration(),
            self.config.cross_row_veto,
        ) else {
            return Ok(None);
        };
        let draft = OverlayDraft::new(content, slot.from, duration.max(1), slot.row);
        self.add(draft).map(Some)
    }

    /// Returns false for unknown ids.
    pub fn remove(&mut self, id: OverlayId) -> Result<bool> {
        if self.store.get(id).is_none() {
            return Ok(false);
        }
        self.submit(Box::new(RemoveOverlayCommand::new(id)))?;
        Ok(true)
    }

    pub fn remove_selected(&mut self) -> Result<bool> {
        match self.store.selected() {
            Some(id) => self.remove(id),
            None => Ok(false),
        }
    }

    pub fn duplicate(&mut self, id: OverlayId) -> Result<Option<OverlayId>> {
        if self.store.get(id).is_none() {
            return Ok(None);
        }
        let copy = self.store.next_id();
        self.submit(Box::new(DuplicateCommand::new(id, self.config.clone())))?;
        Ok(Some(copy))
    }

    /// Split at `at`. Non-interior points do nothing.
    pub fn split(&mut self, id: OverlayId, at: Frame) -> Result<Option<OverlayId>> {
        match self.store.get(id) {
            Some(o) if o.contains_interior(at) => {}
            _ => return Ok(None),
        }
        let right = self.store.next_id();
        self.submit(Box::new(SplitCommand::new(id, at)))?;
        Ok(Some(right))
    }

    /// Split the hovered item at the hovered frame.
    pub fn split_at_hover(&mut self) -> Result<Option<OverlayId>> {
        match self.controller.split_point(&self.store) {
            Some((id, at)) => self.split(id, at),
            None => Ok(None),
        }
    }

    /// Replace one overlay with `f` applied to it. Returns false for unknown
    /// ids.
    pub fn update<F>(&mut self, id: OverlayId, f: F) -> Result<bool>
    where
        F: FnOnce(&Overlay) -> Overlay,
    {
        let Some(current) = self.store.get(id) else {
            return Ok(false);
        };
        let mut after = f(current);
        after.id = id;
        self.submit(Box::new(UpdateOverlayCommand::new(after)))?;
        Ok(true)
    }

    pub fn set_bounds(&mut self, id: OverlayId, bounds: Rect) -> Result<bool> {
        self.update(id, |o| {
            let mut next = o.clone();
            next.set_bounds(bounds);
            next
        })
    }

    /// Snap a proposed on-canvas box against the composition and every
    /// other overlay. Does not touch the store.
    pub fn snap_bounds(
        &self,
        id: OverlayId,
        proposed: Rect,
        op: SnapOperation,
    ) -> (Rect, AlignmentGuides) {
        let others: Vec<Rect> = self
            .store
            .overlays()
            .iter()
            .filter(|o| o.id != id)
            .map(Overlay::bounds)
            .collect();
        let canvas = self.config.composition;
        let active = guides::compute_guides(
            &proposed,
            &others,
            canvas.width as f64,
            canvas.height as f64,
            SNAP_THRESHOLD,
        );
        (guides::snap(proposed, &active, op, SNAP_THRESHOLD), active)
    }

    /// Repair every same-row overlap with push-after. Undoable. Returns how
    /// many overlays moved.
    pub fn normalize(&mut self) -> Result<usize> {
        let moved = resolver::normalize(self.store.overlays()).len();
        if moved > 0 {
            self.submit(Box::new(NormalizeCommand::new()))?;
        }
        Ok(moved)
    }

    pub fn select(&mut self, id: Option<OverlayId>) {
        self.store.select(id);
    }

    pub fn undo(&mut self) -> Result<()> {
        self.controller.cancel();
        self.history.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> Result<()> {
        self.controller.cancel();
        self.history.redo(&mut self.store)
    }

    /// Change the row count. Never goes above the hard limit or below the
    /// highest occupied row.
    pub fn set_max_rows(&mut self, rows: usize) -> usize {
        let applied = self.store.set_max_rows(rows.min(MAX_ROWS_LIMIT));
        self.config.max_rows = applied;
        tracing::debug!(requested = rows, applied, "max rows changed");
        applied
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    pub fn export_template(&self, name: &str, description: &str) -> Template {
        Template::from_store(name, description, &self.store)
    }

    /// Swap the whole collection for the template's. Undoable.
    pub fn apply_template(&mut self, template: &Template) -> Result<()> {
        template.validate()?;
        self.controller.cancel();
        self.submit(Box::new(ReplaceAllCommand::new(template.drafts())))?;
        self.config.max_rows = self.store.max_rows();

        let overlaps = self.store.find_overlaps();
        if !overlaps.is_empty() {
            tracing::warn!(
                template = %template.id,
                overlaps = overlaps.len(),
                "template applied with overlapping overlays"
            );
        }
        tracing::info!(
            template = %template.id,
            name = %template.name,
            overlays = self.store.len(),
            "template applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PointerPhase;
    use crate::guides::Corner;

    fn editor() -> Editor {
        Editor::new(EngineConfig::default(), TimelineViewport::new(1200.0, 40.0))
    }

    fn video() -> OverlayContent {
        OverlayContent::blank(OverlayKind::Video)
    }

    /// a [0, 100) and b [100, 200) on row 0, a 600-frame bed on row 3.
    fn editor_with_clips() -> (Editor, OverlayId, OverlayId) {
        let mut ed = editor();
        let a = ed.add(OverlayDraft::new(video(), 0, 100, 0)).unwrap();
        let b = ed.add(OverlayDraft::new(video(), 100, 100, 0)).unwrap();
        ed.add(OverlayDraft::new(video(), 0, 600, 3)).unwrap();
        (ed, a, b)
    }

    fn pointer(ed: &mut Editor, phase: PointerPhase, x: f64, y: f64) {
        ed.dispatch(PointerEvent::new(phase, x, y)).unwrap();
    }

    #[test]
    fn inserts_stack_into_fresh_rows() {
        let mut ed = editor();
        for expected_row in 0..3 {
            let id = ed.insert(video(), 300).unwrap().unwrap();
            let o = ed.store().get(id).unwrap();
            assert_eq!((o.from, o.row), (0, expected_row));
        }
        assert_eq!(ed.store().total_duration(), 300);
    }

    #[test]
    fn insert_falls_back_to_end_of_last_row() {
        let mut ed = Editor::new(
            EngineConfig {
                max_rows: 2,
                ..Default::default()
            },
            TimelineViewport::new(1200.0, 40.0),
        );
        ed.insert(video(), 300).unwrap();
        ed.insert(video(), 300).unwrap();
        let id = ed.insert(video(), 60).unwrap().unwrap();
        let o = ed.store().get(id).unwrap();
        assert_eq!((o.from, o.row), (300, 1));
        assert_eq!(ed.store().total_duration(), 360);
    }

    #[test]
    fn drag_through_dispatch_pushes_after_neighbor() {
        let (mut ed, a, b) = editor_with_clips();

        pointer(&mut ed, PointerPhase::Down, 100.0, 10.0);
        assert_eq!(ed.store().selected(), Some(a));
        pointer(&mut ed, PointerPhase::Move, 300.0, 10.0);
        assert!(ed.ghost().is_some());
        assert_eq!(ed.store().get(a).unwrap().from, 0);
        assert!(ed.layout().iter().any(|l| l.ghost));

        pointer(&mut ed, PointerPhase::Up, 300.0, 10.0);
        assert!(ed.ghost().is_none());
        assert_eq!(ed.store().get(a).unwrap().from, 200);
        assert_eq!(ed.store().get(a).unwrap().duration_in_frames, 100);
        assert_eq!(ed.store().get(b).unwrap().from, 100);
        assert!(ed.store().find_overlaps().is_empty());
        assert_eq!(ed.history().undo_description(), Some("Move overlay"));

        ed.undo().unwrap();
        assert_eq!(ed.store().get(a).unwrap().from, 0);
    }

    #[test]
    fn click_selects_without_history_entry() {
        let (mut ed, _, b) = editor_with_clips();
        let depth_before = ed.history().can_redo();

        pointer(&mut ed, PointerPhase::Down, 300.0, 10.0);
        pointer(&mut ed, PointerPhase::Up, 300.0, 10.0);
        assert_eq!(ed.store().selected(), Some(b));
        assert_eq!(ed.history().can_redo(), depth_before);
        assert_eq!(ed.history().undo_description(), Some("Add overlay"));
    }

    #[test]
    fn leaving_mid_drag_without_ghost_cancels() {
        let (mut ed, a, _) = editor_with_clips();
        pointer(&mut ed, PointerPhase::Down, 100.0, 10.0);
        pointer(&mut ed, PointerPhase::Leave, 100.0, 10.0);
        assert!(!ed.controller().is_dragging());
        assert_eq!(ed.store().get(a).unwrap().from, 0);
    }

    #[test]
    fn split_at_hover_splits_hovered_item() {
        let (mut ed, a, _) = editor_with_clips();
        pointer(&mut ed, PointerPhase::Move, 100.0, 10.0);

        let right = ed.split_at_hover().unwrap().unwrap();
        assert_eq!(ed.store().get(a).unwrap().end(), 50);
        let right = ed.store().get(right).unwrap();
        assert_eq!((right.from, right.end()), (50, 100));

        ed.undo().unwrap();
        assert_eq!(ed.store().len(), 3);
        assert_eq!(ed.store().get(a).unwrap().duration_in_frames, 100);
    }

    #[test]
    fn split_without_hover_is_noop() {
        let (mut ed, a, _) = editor_with_clips();
        assert_eq!(ed.split_at_hover().unwrap(), None);
        assert_eq!(ed.split(a, 100).unwrap(), None);
        assert_eq!(ed.store().len(), 3);
    }

    #[test]
    fn duplicate_and_remove_are_undoable() {
        let (mut ed, a, _) = editor_with_clips();
        let copy = ed.duplicate(a).unwrap().unwrap();
        assert_eq!(ed.store().len(), 4);
        assert!(ed.store().find_overlaps().is_empty());

        assert!(ed.remove(copy).unwrap());
        assert_eq!(ed.store().len(), 3);
        ed.undo().unwrap();
        assert!(ed.store().get(copy).is_some());

        assert!(!ed.remove(OverlayId(99)).unwrap());
        assert_eq!(ed.duplicate(OverlayId(99)).unwrap(), None);
    }

    #[test]
    fn update_keeps_id() {
        let (mut ed, a, _) = editor_with_clips();
        let changed = ed
            .update(a, |o| {
                let mut next = o.clone();
                next.id = OverlayId(42);
                next.rotation = 15.0;
                next
            })
            .unwrap();
        assert!(changed);
        assert_eq!(ed.store().get(a).unwrap().rotation, 15.0);
        assert!(ed.store().get(OverlayId(42)).is_none());
        assert!(!ed.update(OverlayId(42), |o| o.clone()).unwrap());
    }

    #[test]
    fn snap_bounds_aligns_to_sibling() {
        let (mut ed, a, b) = editor_with_clips();
        ed.set_bounds(a, Rect::new(100.0, 100.0, 200.0, 100.0)).unwrap();

        let (snapped, guides) = ed.snap_bounds(b, Rect::new(297.0, 613.0, 50.0, 50.0), SnapOperation::Move);
        assert_eq!(snapped.left, 300.0);
        assert!(!guides.vertical.is_empty());

        let (resized, _) = ed.snap_bounds(
            b,
            Rect::new(120.0, 613.0, 178.0, 40.0),
            SnapOperation::Resize(Corner::BottomRight),
        );
        assert_eq!(resized.right(), 300.0);
        assert_eq!(resized.left, 120.0);
    }

    #[test]
    fn set_max_rows_saturates() {
        let (mut ed, _, _) = editor_with_clips();
        assert_eq!(ed.set_max_rows(2), 4);
        assert_eq!(ed.set_max_rows(20), MAX_ROWS_LIMIT);
        assert_eq!(ed.config().max_rows, MAX_ROWS_LIMIT);
        assert_eq!(ed.set_max_rows(5), 5);
    }

    #[test]
    fn template_apply_and_undo() {
        let (mut ed, _, _) = editor_with_clips();
        let template = ed.export_template("Three clips", "");

        let mut other = editor();
        other.insert(video(), 45).unwrap();
        other.apply_template(&template).unwrap();
        assert_eq!(other.store().len(), 3);
        assert_eq!(other.store().total_duration(), 600);
        assert_eq!(other.store().overlays()[2].id, OverlayId(2));

        other.undo().unwrap();
        assert_eq!(other.store().len(), 1);
        assert_eq!(other.store().total_duration(), 45);
    }

    #[test]
    fn template_reimport_preserves_every_overlay() {
        let mut ed = editor();
        let scratch = ed.add(OverlayDraft::new(video(), 0, 30, 2)).unwrap();
        ed.add(OverlayDraft::new(
            OverlayContent::Video(VideoContent {
                src: "clip.mp4".into(),
                video_start_time: 12,
                volume: 0.8,
            }),
            0,
            120,
            0,
        ))
        .unwrap();
        ed.add(
            OverlayDraft::new(
                OverlayContent::Text(TextContent {
                    content: "Title".into(),
                    styles: TextStyle::default(),
                }),
                30,
                60,
                1,
            )
            .with_bounds(Rect::new(40.0, 60.0, 800.0, 120.0)),
        )
        .unwrap();
        ed.add(OverlayDraft::new(
            OverlayContent::Sound(SoundContent {
                src: "bed.mp3".into(),
                start_from_sound: 90,
                volume: 1.0,
            }),
            0,
            300,
            3,
        ))
        .unwrap();
        ed.add(OverlayDraft::new(
            OverlayContent::Caption(CaptionContent {
                captions: vec![CaptionLine {
                    text: "hi".into(),
                    start_ms: 0,
                    end_ms: 900,
                }],
            }),
            120,
            45,
            0,
        ))
        .unwrap();
        ed.remove(scratch).unwrap();

        let json = ed.export_template("Mixed", "").to_json().unwrap();
        let mut other = editor();
        other.apply_template(&Template::parse(&json).unwrap()).unwrap();

        let ids: Vec<OverlayId> = other.store().overlays().iter().map(|o| o.id).collect();
        assert_eq!(ids, (0..4).map(OverlayId).collect::<Vec<_>>());
        assert_eq!(other.store().len(), ed.store().len());
        for (before, after) in ed.store().overlays().iter().zip(other.store().overlays()) {
            assert_eq!(before.to_draft(), after.to_draft());
        }
        assert_eq!(other.store().total_duration(), ed.store().total_duration());
    }

    #[test]
    fn template_with_extra_rows_grows_row_count() {
        let mut ed = editor();
        let mut template = ed.export_template("Wide", "");
        template.overlays.push(Overlay::from_draft(
            OverlayId(7),
            OverlayDraft::new(video(), 0, 30, 6),
        ));
        ed.apply_template(&template).unwrap();
        assert_eq!(ed.store().max_rows(), 7);
        assert_eq!(ed.store().overlays()[0].id, OverlayId(0));
    }

    #[test]
    fn invalid_template_leaves_store_alone() {
        let (mut ed, _, _) = editor_with_clips();
        let mut template = ed.export_template("Bad", "");
        template.overlays[0].row = MAX_ROWS_LIMIT + 1;
        assert!(ed.apply_template(&template).is_err());
        assert_eq!(ed.store().len(), 3);
        assert_eq!(ed.history().undo_description(), Some("Add overlay"));
    }

    #[test]
    fn normalize_repairs_imported_overlaps() {
        let mut ed = editor();
        ed.add(OverlayDraft::new(video(), 0, 100, 1)).unwrap();
        ed.add(OverlayDraft::new(video(), 40, 100, 1)).unwrap();
        assert_eq!(ed.store().find_overlaps().len(), 1);

        assert_eq!(ed.normalize().unwrap(), 1);
        assert!(ed.store().find_overlaps().is_empty());
        assert_eq!(ed.history().undo_description(), Some("Fix overlaps"));
        assert_eq!(ed.normalize().unwrap(), 0);
        assert_eq!(ed.history().undo_description(), Some("Fix overlaps"));
    }

    #[test]
    fn remove_selected_and_viewport_change() {
        let (mut ed, a, _) = editor_with_clips();
        assert!(!ed.remove_selected().unwrap());

        ed.set_viewport(TimelineViewport::new(1200.0, 40.0).with_zoom(2.0));
        let layout = ed.layout();
        assert_eq!(layout[0].rect.width, 400.0);

        ed.select(Some(a));
        assert!(ed.remove_selected().unwrap());
        assert!(ed.store().get(a).is_none());
        assert_eq!(ed.store().selected(), None);
    }

    #[test]
    fn ruler_click_seeks() {
        struct Player(Frame);
        impl Preview for Player {
            fn current_frame(&self) -> Frame {
                self.0
            }
            fn seek(&mut self, frame: Frame) {
                self.0 = frame;
            }
        }

        let (ed, _, _) = editor_with_clips();
        let mut player = Player(0);
        assert_eq!(ed.seek(600.0, &mut player), 300);
        assert_eq!(player.current_frame(), 300);
    }
}
