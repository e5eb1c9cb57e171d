//! Port through which the retiming engine reads and edits a host timeline.
//!
//! Keyframes carry no identity besides their time, so every query and edit is
//! addressed by time value. Implementations must keep keyframe times distinct
//! after every single write.

use std::ops::{Deref, DerefMut};

use crate::{
    timeline::{FrameTime, SelectedRange},
    Result,
};

/// Which keyframe a [`TimelineStore::find_keyframe`] query should resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// First keyframe strictly after the reference time.
    Next,
    /// Last keyframe strictly before the reference time.
    Previous,
    /// Earliest keyframe on the timeline.
    First,
    /// Latest keyframe on the timeline.
    Last,
}

/// Host timeline collaborator consumed by the retiming engine.
pub trait TimelineStore {
    /// Range currently selected by the user.
    fn selected_range(&self) -> Result<SelectedRange>;

    /// Resolves a keyframe relative to `reference`. `Next` and `Previous` fall
    /// back to the current time when no reference is given; `First` and `Last`
    /// ignore it. Returns `None` when no such keyframe exists.
    fn find_keyframe(
        &self,
        direction: Direction,
        reference: Option<FrameTime>,
    ) -> Result<Option<FrameTime>>;

    fn has_keyframe_at(&self, time: FrameTime) -> Result<bool>;

    /// Moves the keyframe at `from` to `to`.
    fn change_keyframe_time(&mut self, from: FrameTime, to: FrameTime) -> Result<()>;

    fn current_time(&self) -> Result<FrameTime>;

    fn set_current_time(&mut self, time: FrameTime) -> Result<()>;

    /// Starts grouping subsequent edits into one undoable unit. Prefer
    /// [`UndoChunk::open`], which guarantees the matching close.
    fn open_undo_chunk(&mut self, name: &str) -> Result<()>;

    fn close_undo_chunk(&mut self) -> Result<()>;

    fn first_keyframe(&self) -> Result<Option<FrameTime>> {
        self.find_keyframe(Direction::First, None)
    }

    fn last_keyframe(&self) -> Result<Option<FrameTime>> {
        self.find_keyframe(Direction::Last, None)
    }

    fn next_keyframe(&self, after: FrameTime) -> Result<Option<FrameTime>> {
        self.find_keyframe(Direction::Next, Some(after))
    }

    fn previous_keyframe(&self, before: FrameTime) -> Result<Option<FrameTime>> {
        self.find_keyframe(Direction::Previous, Some(before))
    }
}

/// Open undo chunk that closes itself when dropped.
///
/// The guard dereferences to the wrapped store, so all edits made through it
/// land inside the chunk. Dropping it closes the chunk on success, on early
/// `?` returns and while unwinding.
pub struct UndoChunk<'a, S: TimelineStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: TimelineStore + ?Sized> UndoChunk<'a, S> {
    pub fn open(store: &'a mut S, name: &str) -> Result<Self> {
        store.open_undo_chunk(name)?;
        tracing::trace!(name, "opened undo chunk");
        Ok(Self { store })
    }
}

impl<S: TimelineStore + ?Sized> Deref for UndoChunk<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.store
    }
}

impl<S: TimelineStore + ?Sized> DerefMut for UndoChunk<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.store
    }
}

impl<S: TimelineStore + ?Sized> Drop for UndoChunk<'_, S> {
    fn drop(&mut self) {
        if let Err(err) = self.store.close_undo_chunk() {
            tracing::warn!(%err, "failed to close undo chunk");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryTimeline, RetimeError};

    #[test]
    fn chunk_closes_when_guard_drops() {
        let mut timeline = MemoryTimeline::new([1.0, 5.0]).unwrap();
        {
            let mut chunk = UndoChunk::open(&mut timeline, "test").unwrap();
            chunk.change_keyframe_time(5.0, 6.0).unwrap();
            assert!(chunk.is_chunk_open());
        }

        assert!(!timeline.is_chunk_open());
        assert_eq!(timeline.undo_depth(), 1);
    }

    #[test]
    fn chunk_closes_on_early_error() {
        fn failing(timeline: &mut MemoryTimeline) -> crate::Result<()> {
            let mut chunk = UndoChunk::open(timeline, "failing")?;
            chunk.change_keyframe_time(1.0, 2.0)?;
            chunk.change_keyframe_time(42.0, 43.0)?;
            Ok(())
        }

        let mut timeline = MemoryTimeline::new([1.0, 5.0]).unwrap();
        let err = failing(&mut timeline).unwrap_err();

        assert!(matches!(err, RetimeError::MissingKeyframe(_)));
        assert!(!timeline.is_chunk_open());
        assert_eq!(timeline.keyframes(), &[2.0, 5.0]);
    }

    #[test]
    fn directional_helpers_follow_reference() {
        let timeline = MemoryTimeline::new([1.0, 5.0, 10.0]).unwrap();

        assert_eq!(timeline.first_keyframe().unwrap(), Some(1.0));
        assert_eq!(timeline.last_keyframe().unwrap(), Some(10.0));
        assert_eq!(timeline.next_keyframe(5.0).unwrap(), Some(10.0));
        assert_eq!(timeline.previous_keyframe(5.0).unwrap(), Some(1.0));
        assert_eq!(timeline.next_keyframe(10.0).unwrap(), None);
    }
}
