use crate::{
    store::TimelineStore,
    timeline::{FrameTime, SelectedRange},
    Result,
};

/// Where the playback cursor goes once a retime has been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CursorTarget {
    /// The keyframe following the range-start keyframe, looked up after the
    /// retime so it reflects the new spacing.
    KeyframeAfter(FrameTime),
    /// The range-start keyframe itself.
    StartKeyframe(FrameTime),
    /// The unsnapped start of the selected range.
    RangeStart(FrameTime),
}

/// Picks the cursor target. `start_keyframe` is `None` when no keyframe sits
/// at or before the range start.
pub fn decide(
    range: SelectedRange,
    start_keyframe: Option<FrameTime>,
    first_keyframe: FrameTime,
    move_to_next: bool,
) -> CursorTarget {
    match start_keyframe {
        Some(start) if move_to_next && range.start() >= first_keyframe => {
            CursorTarget::KeyframeAfter(start)
        }
        Some(start) if range.end() > first_keyframe => CursorTarget::StartKeyframe(start),
        _ => CursorTarget::RangeStart(range.start()),
    }
}

/// Applies [`decide`] to the store and returns the time the cursor was set to.
pub fn reposition<S: TimelineStore + ?Sized>(
    store: &mut S,
    range: SelectedRange,
    start_keyframe: Option<FrameTime>,
    first_keyframe: FrameTime,
    move_to_next: bool,
) -> Result<FrameTime> {
    let time = match decide(range, start_keyframe, first_keyframe, move_to_next) {
        // Without a following keyframe the cursor stays on the start keyframe.
        CursorTarget::KeyframeAfter(start) => store.next_keyframe(start)?.unwrap_or(start),
        CursorTarget::StartKeyframe(start) => start,
        CursorTarget::RangeStart(start) => start,
    };
    store.set_current_time(time)?;
    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTimeline;

    fn range(start: f64, end: f64) -> SelectedRange {
        SelectedRange::new(start, end).unwrap()
    }

    #[test]
    fn move_to_next_targets_following_key() {
        let target = decide(range(5.0, 10.0), Some(5.0), 1.0, true);
        assert_eq!(target, CursorTarget::KeyframeAfter(5.0));
    }

    #[test]
    fn without_move_to_next_cursor_returns_to_start_key() {
        let target = decide(range(7.0, 10.0), Some(5.0), 1.0, false);
        assert_eq!(target, CursorTarget::StartKeyframe(5.0));
    }

    #[test]
    fn range_before_first_key_uses_raw_start() {
        assert_eq!(
            decide(range(-4.0, 0.0), None, 1.0, true),
            CursorTarget::RangeStart(-4.0)
        );
        assert_eq!(
            decide(range(-4.0, 3.0), None, 1.0, false),
            CursorTarget::RangeStart(-4.0)
        );
    }

    #[test]
    fn reposition_reads_retimed_neighbour() {
        let mut timeline = MemoryTimeline::new([1.0, 5.0, 7.0, 17.0]).unwrap();

        let time = reposition(&mut timeline, range(5.0, 10.0), Some(5.0), 1.0, true).unwrap();

        assert_eq!(time, 7.0);
        assert_eq!(timeline.current_time().unwrap(), 7.0);
    }

    #[test]
    fn reposition_stays_on_last_key_without_successor() {
        let mut timeline = MemoryTimeline::new([1.0, 5.0]).unwrap();

        let time = reposition(&mut timeline, range(5.0, 9.0), Some(5.0), 1.0, true).unwrap();

        assert_eq!(time, 5.0);
    }
}
