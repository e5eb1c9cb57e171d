use serde::{Deserialize, Serialize};

use crate::{
    apply::apply_plan,
    cursor,
    plan::{build_plan, RetimePolicy, TimePlan},
    store::{TimelineStore, UndoChunk},
    timeline::FrameTime,
    Result, RetimeError,
};

const UNDO_CHUNK_NAME: &str = "Retime keys";

/// Arguments of a single retime invocation, as issued by a tool button.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetimeRequest {
    pub magnitude: f64,
    pub incremental: bool,
    pub move_to_next: bool,
}

impl RetimeRequest {
    pub fn absolute(spacing: f64) -> Self {
        Self {
            magnitude: spacing,
            incremental: false,
            move_to_next: false,
        }
    }

    pub fn incremental(delta: f64) -> Self {
        Self {
            magnitude: delta,
            incremental: true,
            move_to_next: false,
        }
    }

    pub fn with_move_to_next(mut self, move_to_next: bool) -> Self {
        self.move_to_next = move_to_next;
        self
    }

    pub fn policy(&self) -> RetimePolicy {
        RetimePolicy::new(self.magnitude, self.incremental)
    }
}

/// Outcome of a successful retime.
#[derive(Debug, Clone, PartialEq)]
pub struct RetimeReport {
    pub plan: TimePlan,
    /// Keyframe writes issued against the store.
    pub writes: usize,
    /// Time the playback cursor was left on.
    pub cursor: FrameTime,
}

/// Retimes the keyframes of the selected range and repositions the cursor,
/// grouped into a single undo chunk.
///
/// Failures are logged here before being returned; the undo chunk is closed
/// either way.
pub fn retime<S: TimelineStore + ?Sized>(store: &mut S, request: &RetimeRequest) -> Result<RetimeReport> {
    tracing::info!(
        magnitude = request.magnitude,
        incremental = request.incremental,
        move_to_next = request.move_to_next,
        "retiming keys"
    );

    match retime_in_chunk(store, request) {
        Ok(report) => {
            tracing::info!(
                keyframes = report.plan.len(),
                writes = report.writes,
                cursor = report.cursor,
                "retime complete"
            );
            Ok(report)
        }
        Err(err) => {
            tracing::error!(
                %err,
                magnitude = request.magnitude,
                incremental = request.incremental,
                "retime failed"
            );
            Err(err)
        }
    }
}

fn retime_in_chunk<S: TimelineStore + ?Sized>(
    store: &mut S,
    request: &RetimeRequest,
) -> Result<RetimeReport> {
    let policy = request.policy();
    policy.validate()?;

    let mut chunk = UndoChunk::open(store, UNDO_CHUNK_NAME)?;
    let range = chunk.selected_range()?;
    let first = chunk.first_keyframe()?.ok_or(RetimeError::NoKeyframes)?;

    let plan = build_plan(&*chunk, range, policy)?;
    let writes = if plan.is_noop() {
        0
    } else {
        apply_plan(&mut *chunk, &plan)?
    };

    let cursor = cursor::reposition(&mut *chunk, range, plan.start(), first, request.move_to_next)?;

    Ok(RetimeReport {
        plan,
        writes,
        cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::Direction,
        timeline::{MemoryTimeline, SelectedRange},
    };

    fn timeline(start: f64, end: f64) -> MemoryTimeline {
        MemoryTimeline::with_range([1.0, 5.0, 10.0, 20.0], start, end).unwrap()
    }

    #[test]
    fn absolute_retime_pins_range_end_boundary() {
        let mut store = timeline(5.0, 10.0);

        let report = retime(&mut store, &RetimeRequest::absolute(2.0)).unwrap();

        assert_eq!(store.keyframes(), &[1.0, 5.0, 7.0, 17.0]);
        assert_eq!(report.writes, 2);
        assert_eq!(report.cursor, 5.0);
    }

    #[test]
    fn incremental_retime_shrinks_gap() {
        let mut store = timeline(5.0, 10.0);

        retime(&mut store, &RetimeRequest::incremental(-3.0)).unwrap();

        assert_eq!(store.keyframes(), &[1.0, 5.0, 7.0, 17.0]);
    }

    #[test]
    fn move_to_next_lands_on_retimed_neighbour() {
        let mut store = timeline(5.0, 10.0);
        let request = RetimeRequest::absolute(2.0).with_move_to_next(true);

        let report = retime(&mut store, &request).unwrap();

        assert_eq!(report.cursor, 7.0);
        assert_eq!(store.current_time().unwrap(), 7.0);
    }

    #[test]
    fn whole_retime_is_one_undo_step() {
        let mut store = timeline(1.0, 20.0);
        store.set_current_time(12.0).unwrap();

        retime(&mut store, &RetimeRequest::incremental(2.0).with_move_to_next(true)).unwrap();
        assert_eq!(store.keyframes(), &[1.0, 7.0, 14.0, 26.0]);
        assert_eq!(store.undo_depth(), 1);

        assert!(store.undo().unwrap());
        assert_eq!(store.keyframes(), &[1.0, 5.0, 10.0, 20.0]);
        assert_eq!(store.current_time().unwrap(), 12.0);
    }

    #[test]
    fn degenerate_ranges_leave_keys_untouched() {
        for (start, end) in [(20.0, 20.0), (25.0, 40.0), (-5.0, 0.0)] {
            let mut store = timeline(start, end);

            let report = retime(&mut store, &RetimeRequest::absolute(3.0)).unwrap();

            assert_eq!(store.keyframes(), &[1.0, 5.0, 10.0, 20.0]);
            assert_eq!(report.writes, 0);
            assert!(store.write_log().is_empty());
        }
    }

    #[test]
    fn negative_zero_range_start_snaps_to_key_at_zero() {
        let mut store = MemoryTimeline::with_range([0.0, 5.0, 10.0], -0.0, 10.0).unwrap();

        let report = retime(&mut store, &RetimeRequest::absolute(2.0)).unwrap();

        assert_eq!(store.keyframes(), &[0.0, 2.0, 4.0]);
        assert_eq!(report.writes, 2);
        assert_eq!(report.cursor, 0.0);
        assert!(report.cursor.is_sign_positive());
    }

    #[test]
    fn range_before_first_key_moves_cursor_to_raw_start() {
        let mut store = timeline(-5.0, 0.0);

        let report = retime(&mut store, &RetimeRequest::absolute(3.0).with_move_to_next(true)).unwrap();

        assert_eq!(report.cursor, -5.0);
    }

    #[test]
    fn empty_timeline_is_an_error_and_closes_chunk() {
        let mut store = MemoryTimeline::new(Vec::new()).unwrap();

        let err = retime(&mut store, &RetimeRequest::absolute(2.0)).unwrap_err();

        assert!(matches!(err, RetimeError::NoKeyframes));
        assert!(!store.is_chunk_open());
    }

    #[test]
    fn invalid_spacing_is_rejected_before_any_edit() {
        let mut store = timeline(1.0, 20.0);

        let err = retime(&mut store, &RetimeRequest::absolute(0.5)).unwrap_err();

        assert!(matches!(err, RetimeError::InvalidMagnitude(_)));
        assert_eq!(store.undo_depth(), 0);
    }

    /// Store whose writes start failing after a fixed number of successes.
    struct FlakyStore {
        inner: MemoryTimeline,
        writes_left: usize,
        opened: usize,
        closed: usize,
    }

    impl TimelineStore for FlakyStore {
        fn selected_range(&self) -> Result<SelectedRange> {
            self.inner.selected_range()
        }

        fn find_keyframe(&self, direction: Direction, reference: Option<FrameTime>) -> Result<Option<FrameTime>> {
            self.inner.find_keyframe(direction, reference)
        }

        fn has_keyframe_at(&self, time: FrameTime) -> Result<bool> {
            self.inner.has_keyframe_at(time)
        }

        fn change_keyframe_time(&mut self, from: FrameTime, to: FrameTime) -> Result<()> {
            if self.writes_left == 0 {
                return Err(RetimeError::msg("host refused the edit"));
            }
            self.writes_left -= 1;
            self.inner.change_keyframe_time(from, to)
        }

        fn current_time(&self) -> Result<FrameTime> {
            self.inner.current_time()
        }

        fn set_current_time(&mut self, time: FrameTime) -> Result<()> {
            self.inner.set_current_time(time)
        }

        fn open_undo_chunk(&mut self, name: &str) -> Result<()> {
            self.opened += 1;
            self.inner.open_undo_chunk(name)
        }

        fn close_undo_chunk(&mut self) -> Result<()> {
            self.closed += 1;
            self.inner.close_undo_chunk()
        }
    }

    #[test]
    fn host_failure_mid_retime_still_closes_chunk() {
        let mut store = FlakyStore {
            inner: timeline(1.0, 20.0),
            writes_left: 1,
            opened: 0,
            closed: 0,
        };

        let err = retime(&mut store, &RetimeRequest::absolute(6.0)).unwrap_err();

        assert!(err.to_string().contains("host refused"));
        assert_eq!((store.opened, store.closed), (1, 1));
        assert!(!store.inner.is_chunk_open());

        let keys = store.inner.keyframes();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn works_through_a_trait_object() {
        let mut store = timeline(5.0, 10.0);
        let dynamic: &mut dyn TimelineStore = &mut store;

        retime(dynamic, &RetimeRequest::absolute(2.0)).unwrap();

        assert_eq!(store.keyframes(), &[1.0, 5.0, 7.0, 17.0]);
    }
}
