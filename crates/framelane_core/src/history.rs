use crate::config::EngineConfig;
use crate::error::{CoreError, Result};
use crate::resolver;
use crate::store::{OverlayPatch, OverlayStore};
use crate::types::*;
use std::cell::RefCell;

/// A store mutation that can be executed, undone, and described.
pub trait Command: std::fmt::Debug {
    fn execute(&self, store: &mut OverlayStore) -> Result<()>;
    fn undo(&self, store: &mut OverlayStore) -> Result<()>;
    fn description(&self) -> &str;
}

/// Undo/redo history stack.
pub struct History {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size,
        }
    }

    /// Execute a command and push it onto the undo stack. Clears redo stack.
    pub fn execute(&mut self, cmd: Box<dyn Command>, store: &mut OverlayStore) -> Result<()> {
        cmd.execute(store)?;
        tracing::debug!(command = cmd.description(), "command executed");
        self.redo_stack.clear();
        self.undo_stack.push(cmd);
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
        Ok(())
    }

    /// Undo the last command.
    pub fn undo(&mut self, store: &mut OverlayStore) -> Result<()> {
        let cmd = self.undo_stack.pop().ok_or(CoreError::NothingToUndo)?;
        cmd.undo(store)?;
        self.redo_stack.push(cmd);
        Ok(())
    }

    /// Redo the last undone command.
    pub fn redo(&mut self, store: &mut OverlayStore) -> Result<()> {
        let cmd = self.redo_stack.pop().ok_or(CoreError::NothingToRedo)?;
        cmd.execute(store)?;
        self.undo_stack.push(cmd);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|cmd| cmd.description())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|cmd| cmd.description())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("max_size", &self.max_size)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AddOverlayCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AddOverlayCommand {
    draft: OverlayDraft,
    added: RefCell<Option<Overlay>>,
}

impl AddOverlayCommand {
    pub fn new(draft: OverlayDraft) -> Self {
        Self {
            draft,
            added: RefCell::new(None),
        }
    }

    /// Id handed out by the last execution.
    pub fn added_id(&self) -> Option<OverlayId> {
        self.added.borrow().as_ref().map(|o| o.id)
    }
}

impl Command for AddOverlayCommand {
    fn execute(&self, store: &mut OverlayStore) -> Result<()> {
        let saved = self.added.borrow().clone();
        match saved {
            Some(overlay) => store.restore(overlay, usize::MAX),
            None => {
                let id = store.add(self.draft.clone());
                *self.added.borrow_mut() = store.get(id).cloned();
            }
        }
        Ok(())
    }

    fn undo(&self, store: &mut OverlayStore) -> Result<()> {
        let id = self
            .added_id()
            .ok_or(CoreError::CommandState("no added overlay saved"))?;
        store.remove(id);
        Ok(())
    }

    fn description(&self) -> &str {
        "Add overlay"
    }
}

// ---------------------------------------------------------------------------
// RemoveOverlayCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RemoveOverlayCommand {
    id: OverlayId,
    removed: RefCell<Option<(Overlay, usize, bool)>>,
}

impl RemoveOverlayCommand {
    pub fn new(id: OverlayId) -> Self {
        Self {
            id,
            removed: RefCell::new(None),
        }
    }
}

impl Command for RemoveOverlayCommand {
    fn execute(&self, store: &mut OverlayStore) -> Result<()> {
        let was_selected = store.selected() == Some(self.id);
        let removed = store
            .remove(self.id)
            .map(|(overlay, index)| (overlay, index, was_selected));
        *self.removed.borrow_mut() = removed;
        Ok(())
    }

    fn undo(&self, store: &mut OverlayStore) -> Result<()> {
        let (overlay, index, was_selected) = self
            .removed
            .borrow()
            .clone()
            .ok_or(CoreError::CommandState("no removed overlay saved"))?;
        store.restore(overlay, index);
        if was_selected {
            store.select(Some(self.id));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Remove overlay"
    }
}

// ---------------------------------------------------------------------------
// UpdateOverlayCommand
// ---------------------------------------------------------------------------

/// Replace one overlay with a new value of itself.
#[derive(Debug)]
pub struct UpdateOverlayCommand {
    after: Overlay,
    before: RefCell<Option<Overlay>>,
}

impl UpdateOverlayCommand {
    pub fn new(after: Overlay) -> Self {
        Self {
            after,
            before: RefCell::new(None),
        }
    }
}

impl Command for UpdateOverlayCommand {
    fn execute(&self, store: &mut OverlayStore) -> Result<()> {
        *self.before.borrow_mut() = store.get(self.after.id).cloned();
        store.replace(self.after.clone());
        Ok(())
    }

    fn undo(&self, store: &mut OverlayStore) -> Result<()> {
        let before = self
            .before
            .borrow()
            .clone()
            .ok_or(CoreError::CommandState("no previous overlay saved"))?;
        store.replace(before);
        Ok(())
    }

    fn description(&self) -> &str {
        "Edit overlay"
    }
}

// ---------------------------------------------------------------------------
// SetTimingCommand
// ---------------------------------------------------------------------------

/// Commit of a drag or resize: new timing for one overlay, plus any
/// neighbours the overlap policy slid out of the way.
#[derive(Debug)]
pub struct SetTimingCommand {
    id: OverlayId,
    from: Frame,
    duration_in_frames: Frame,
    row: usize,
    displaced: Vec<(OverlayId, Frame)>,
    before: RefCell<Option<(Frame, Frame, usize, Vec<(OverlayId, Frame)>)>>,
}

impl SetTimingCommand {
    pub fn new(
        id: OverlayId,
        from: Frame,
        duration_in_frames: Frame,
        row: usize,
        displaced: Vec<(OverlayId, Frame)>,
    ) -> Self {
        Self {
            id,
            from,
            duration_in_frames,
            row,
            displaced,
            before: RefCell::new(None),
        }
    }

    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn timing(&self) -> (Frame, Frame, usize) {
        (self.from, self.duration_in_frames, self.row)
    }

    pub fn displaced(&self) -> &[(OverlayId, Frame)] {
        &self.displaced
    }
}

impl Command for SetTimingCommand {
    fn execute(&self, store: &mut OverlayStore) -> Result<()> {
        let Some(current) = store.get(self.id) else {
            return Ok(());
        };
        let old_starts = self
            .displaced
            .iter()
            .filter_map(|(id, _)| store.get(*id).map(|o| (*id, o.from)))
            .collect();
        *self.before.borrow_mut() = Some((
            current.from,
            current.duration_in_frames,
            current.row,
            old_starts,
        ));

        store.set_starts(&self.displaced);
        store.patch(
            self.id,
            OverlayPatch::timing(self.from, self.duration_in_frames, self.row),
        );
        Ok(())
    }

    fn undo(&self, store: &mut OverlayStore) -> Result<()> {
        let (from, duration, row, old_starts) = self
            .before
            .borrow()
            .clone()
            .ok_or(CoreError::CommandState("no previous timing saved"))?;
        store.patch(self.id, OverlayPatch::timing(from, duration, row));
        store.set_starts(&old_starts);
        Ok(())
    }

    fn description(&self) -> &str {
        "Move overlay"
    }
}

// ---------------------------------------------------------------------------
// SplitCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SplitCommand {
    id: OverlayId,
    at: Frame,
    right_id: RefCell<Option<OverlayId>>,
    original: RefCell<Option<Overlay>>,
}

impl SplitCommand {
    pub fn new(id: OverlayId, at: Frame) -> Self {
        Self {
            id,
            at,
            right_id: RefCell::new(None),
            original: RefCell::new(None),
        }
    }

    pub fn right_id(&self) -> Option<OverlayId> {
        *self.right_id.borrow()
    }
}

impl Command for SplitCommand {
    fn execute(&self, store: &mut OverlayStore) -> Result<()> {
        *self.original.borrow_mut() = store.get(self.id).cloned();
        *self.right_id.borrow_mut() = store.split(self.id, self.at);
        Ok(())
    }

    fn undo(&self, store: &mut OverlayStore) -> Result<()> {
        let Some(right_id) = self.right_id() else {
            return Ok(());
        };
        let original = self
            .original
            .borrow()
            .clone()
            .ok_or(CoreError::CommandState("no original overlay saved"))?;
        store.remove(right_id);
        store.replace(original);
        Ok(())
    }

    fn description(&self) -> &str {
        "Split overlay"
    }
}

// ---------------------------------------------------------------------------
// DuplicateCommand
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DuplicateCommand {
    id: OverlayId,
    config: EngineConfig,
    copy: RefCell<Option<Overlay>>,
}

impl DuplicateCommand {
    pub fn new(id: OverlayId, config: EngineConfig) -> Self {
        Self {
            id,
            config,
            copy: RefCell::new(None),
        }
    }

    pub fn copy_id(&self) -> Option<OverlayId> {
        self.copy.borrow().as_ref().map(|o| o.id)
    }
}

impl Command for DuplicateCommand {
    fn execute(&self, store: &mut OverlayStore) -> Result<()> {
        let saved = self.copy.borrow().clone();
        match saved {
            Some(copy) => store.restore(copy, usize::MAX),
            None => {
                let copy = store
                    .duplicate(self.id, &self.config)
                    .and_then(|id| store.get(id).cloned());
                *self.copy.borrow_mut() = copy;
            }
        }
        Ok(())
    }

    fn undo(&self, store: &mut OverlayStore) -> Result<()> {
        if let Some(id) = self.copy_id() {
            store.remove(id);
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Duplicate overlay"
    }
}

// ---------------------------------------------------------------------------
// ReplaceAllCommand
// ---------------------------------------------------------------------------

/// Swap in a whole new collection, e.g. from a template.
#[derive(Debug)]
pub struct ReplaceAllCommand {
    drafts: Vec<OverlayDraft>,
    before: RefCell<Option<(Vec<Overlay>, Option<OverlayId>)>>,
}

impl ReplaceAllCommand {
    pub fn new(drafts: Vec<OverlayDraft>) -> Self {
        Self {
            drafts,
            before: RefCell::new(None),
        }
    }
}

impl Command for ReplaceAllCommand {
    fn execute(&self, store: &mut OverlayStore) -> Result<()> {
        *self.before.borrow_mut() = Some((store.overlays().to_vec(), store.selected()));
        store.replace_all(self.drafts.clone());
        Ok(())
    }

    fn undo(&self, store: &mut OverlayStore) -> Result<()> {
        let (overlays, selected) = self
            .before
            .borrow()
            .clone()
            .ok_or(CoreError::CommandState("no previous collection saved"))?;
        store.restore_all(overlays, selected);
        Ok(())
    }

    fn description(&self) -> &str {
        "Apply template"
    }
}

// ---------------------------------------------------------------------------
// NormalizeCommand
// ---------------------------------------------------------------------------

/// Push-after repair of every row.
#[derive(Debug, Default)]
pub struct NormalizeCommand {
    before: RefCell<Vec<(OverlayId, Frame)>>,
}

impl NormalizeCommand {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for NormalizeCommand {
    fn execute(&self, store: &mut OverlayStore) -> Result<()> {
        let changes = resolver::normalize(store.overlays());
        *self.before.borrow_mut() = changes
            .iter()
            .filter_map(|(id, _)| store.get(*id).map(|o| (*id, o.from)))
            .collect();
        store.set_starts(&changes);
        Ok(())
    }

    fn undo(&self, store: &mut OverlayStore) -> Result<()> {
        store.set_starts(&self.before.borrow());
        Ok(())
    }

    fn description(&self) -> &str {
        "Fix overlaps"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(from: Frame, duration: Frame, row: usize) -> OverlayDraft {
        OverlayDraft::new(
            OverlayContent::Video(VideoContent {
                src: "clip.mp4".to_string(),
                video_start_time: 0,
                volume: 1.0,
            }),
            from,
            duration,
            row,
        )
    }

    fn store_with_one() -> (OverlayStore, OverlayId) {
        let mut store = OverlayStore::new(4);
        let id = store.add(draft(0, 150, 0));
        (store, id)
    }

    #[test]
    fn add_undo_redo_keeps_id() {
        let mut store = OverlayStore::new(4);
        let mut history = History::new(100);

        history
            .execute(Box::new(AddOverlayCommand::new(draft(0, 90, 0))), &mut store)
            .unwrap();
        assert_eq!(store.len(), 1);

        history.undo(&mut store).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.total_duration(), 1);

        history.redo(&mut store).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.overlays()[0].id, OverlayId(0));
        assert_eq!(store.total_duration(), 90);
    }

    #[test]
    fn new_action_clears_redo() {
        let (mut store, id) = store_with_one();
        let mut history = History::new(100);

        history
            .execute(Box::new(RemoveOverlayCommand::new(id)), &mut store)
            .unwrap();
        history.undo(&mut store).unwrap();
        assert!(history.can_redo());

        history
            .execute(Box::new(AddOverlayCommand::new(draft(150, 30, 0))), &mut store)
            .unwrap();
        assert!(!history.can_redo());
    }

    #[test]
    fn remove_undo_restores_position_and_selection() {
        let mut store = OverlayStore::new(4);
        let a = store.add(draft(0, 30, 0));
        let b = store.add(draft(30, 30, 0));
        let c = store.add(draft(60, 30, 0));
        store.select(Some(b));

        let mut history = History::new(10);
        history
            .execute(Box::new(RemoveOverlayCommand::new(b)), &mut store)
            .unwrap();
        assert_eq!(store.selected(), None);

        history.undo(&mut store).unwrap();
        let ids: Vec<OverlayId> = store.overlays().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![a, b, c]);
        assert_eq!(store.selected(), Some(b));
    }

    #[test]
    fn set_timing_undo_restores_displaced() {
        let mut store = OverlayStore::new(4);
        let a = store.add(draft(0, 100, 0));
        let b = store.add(draft(100, 100, 0));
        let mut history = History::new(10);

        history
            .execute(
                Box::new(SetTimingCommand::new(a, 60, 100, 0, vec![(b, 160)])),
                &mut store,
            )
            .unwrap();
        assert_eq!(store.get(a).unwrap().from, 60);
        assert_eq!(store.get(b).unwrap().from, 160);
        assert_eq!(store.total_duration(), 260);

        history.undo(&mut store).unwrap();
        assert_eq!(store.get(a).unwrap().from, 0);
        assert_eq!(store.get(b).unwrap().from, 100);
        assert_eq!(store.total_duration(), 200);
    }

    #[test]
    fn split_undo_redo() {
        let (mut store, id) = store_with_one();
        let mut history = History::new(10);

        history
            .execute(Box::new(SplitCommand::new(id, 60)), &mut store)
            .unwrap();
        assert_eq!(store.len(), 2);

        history.undo(&mut store).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().duration_in_frames, 150);

        history.redo(&mut store).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(id).unwrap().duration_in_frames, 60);
    }

    #[test]
    fn split_outside_interval_undo_is_noop() {
        let (mut store, id) = store_with_one();
        let mut history = History::new(10);
        let cmd = SplitCommand::new(id, 400);
        history.execute(Box::new(cmd), &mut store).unwrap();
        history.undo(&mut store).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_undo_redo() {
        let (mut store, id) = store_with_one();
        let mut history = History::new(10);

        history
            .execute(
                Box::new(DuplicateCommand::new(id, EngineConfig::default())),
                &mut store,
            )
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_duration(), 300);

        history.undo(&mut store).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_duration(), 150);

        history.redo(&mut store).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.overlays()[1].from, 150);
    }

    #[test]
    fn update_undo() {
        let (mut store, id) = store_with_one();
        let mut history = History::new(10);
        let mut after = store.get(id).unwrap().clone();
        after.rotation = 90.0;

        history
            .execute(Box::new(UpdateOverlayCommand::new(after)), &mut store)
            .unwrap();
        assert_eq!(store.get(id).unwrap().rotation, 90.0);

        history.undo(&mut store).unwrap();
        assert_eq!(store.get(id).unwrap().rotation, 0.0);
    }

    #[test]
    fn replace_all_undo_restores_collection() {
        let (mut store, id) = store_with_one();
        store.select(Some(id));
        let mut history = History::new(10);

        history
            .execute(
                Box::new(ReplaceAllCommand::new(vec![draft(0, 30, 1), draft(30, 30, 1)])),
                &mut store,
            )
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.selected(), None);

        history.undo(&mut store).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.selected(), Some(id));
        assert_eq!(store.total_duration(), 150);
    }

    #[test]
    fn normalize_undo_restores_overlap() {
        let mut store = OverlayStore::new(4);
        let a = store.add(draft(0, 100, 0));
        let b = store.add(draft(50, 100, 0));
        let mut history = History::new(10);

        history
            .execute(Box::new(NormalizeCommand::new()), &mut store)
            .unwrap();
        assert_eq!(store.get(b).unwrap().from, 100);
        assert!(store.find_overlaps().is_empty());

        history.undo(&mut store).unwrap();
        assert_eq!(store.get(a).unwrap().from, 0);
        assert_eq!(store.get(b).unwrap().from, 50);
        assert_eq!(store.total_duration(), 150);
    }

    #[test]
    fn undo_on_empty_fails() {
        let mut store = OverlayStore::new(4);
        let mut history = History::new(10);
        assert!(matches!(
            history.undo(&mut store),
            Err(CoreError::NothingToUndo)
        ));
        assert!(matches!(
            history.redo(&mut store),
            Err(CoreError::NothingToRedo)
        ));
    }

    #[test]
    fn max_size_drops_oldest() {
        let mut store = OverlayStore::new(4);
        let mut history = History::new(2);
        for i in 0..3 {
            history
                .execute(
                    Box::new(AddOverlayCommand::new(draft(i * 30, 30, 0))),
                    &mut store,
                )
                .unwrap();
        }
        history.undo(&mut store).unwrap();
        history.undo(&mut store).unwrap();
        assert!(!history.can_undo());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn descriptions() {
        let (mut store, id) = store_with_one();
        let mut history = History::new(10);
        assert_eq!(history.undo_description(), None);

        history
            .execute(Box::new(SplitCommand::new(id, 30)), &mut store)
            .unwrap();
        assert_eq!(history.undo_description(), Some("Split overlay"));

        history.undo(&mut store).unwrap();
        assert_eq!(history.redo_description(), Some("Split overlay"));
    }
}
