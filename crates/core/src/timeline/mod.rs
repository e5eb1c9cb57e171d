use std::{cmp::Ordering, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    store::{Direction, TimelineStore},
    Result, RetimeError,
};

/// Time value of a keyframe or of the playback cursor, in frames.
pub type FrameTime = f64;

/// Folds `-0.0` into `0.0` so a time has exactly one representation.
fn normalize(time: FrameTime) -> FrameTime {
    time + 0.0
}

/// Time range selected on the timeline. Not necessarily aligned to keyframes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectedRange {
    start: FrameTime,
    end: FrameTime,
}

impl SelectedRange {
    pub fn new(start: FrameTime, end: FrameTime) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || end < start {
            return Err(RetimeError::InvalidRange { start, end });
        }
        Ok(Self {
            start: normalize(start),
            end: normalize(end),
        })
    }

    pub fn start(&self) -> FrameTime {
        self.start
    }

    pub fn end(&self) -> FrameTime {
        self.end
    }
}

/// One keyframe move as recorded by [`MemoryTimeline`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyframeChange {
    pub from: FrameTime,
    pub to: FrameTime,
}

#[derive(Debug, Clone)]
struct UndoRecord {
    name: String,
    changes: Vec<KeyframeChange>,
    cursor_before: FrameTime,
}

/// In-memory [`TimelineStore`] used by the command line tool and by tests.
///
/// Keyframes are kept sorted and distinct; a write onto an occupied time is
/// rejected rather than merged. Every successful write is appended to a log so
/// callers can replay the intermediate states of an edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TimelineFile", into = "TimelineFile")]
pub struct MemoryTimeline {
    keys: Vec<FrameTime>,
    range: SelectedRange,
    current_time: FrameTime,
    chunk_depth: usize,
    pending: Option<UndoRecord>,
    history: Vec<UndoRecord>,
    write_log: Vec<KeyframeChange>,
}

/// On-disk representation of a [`MemoryTimeline`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TimelineFile {
    keyframes: Vec<FrameTime>,
    #[serde(default)]
    range: Option<SelectedRange>,
    #[serde(default)]
    current_time: Option<FrameTime>,
}

impl TryFrom<TimelineFile> for MemoryTimeline {
    type Error = RetimeError;

    fn try_from(file: TimelineFile) -> Result<Self> {
        let mut timeline = MemoryTimeline::new(file.keyframes)?;
        if let Some(range) = file.range {
            timeline.set_range(SelectedRange::new(range.start, range.end)?);
        }
        if let Some(time) = file.current_time {
            timeline.set_current_time(time)?;
        }
        Ok(timeline)
    }
}

impl From<MemoryTimeline> for TimelineFile {
    fn from(timeline: MemoryTimeline) -> Self {
        Self {
            keyframes: timeline.keys,
            range: Some(timeline.range),
            current_time: Some(timeline.current_time),
        }
    }
}

impl MemoryTimeline {
    /// Builds a timeline from unordered keyframe times. The selection and the
    /// cursor start on the first keyframe.
    pub fn new(keys: impl IntoIterator<Item = FrameTime>) -> Result<Self> {
        let mut keys: Vec<FrameTime> = keys.into_iter().map(normalize).collect();
        if let Some(bad) = keys.iter().find(|time| !time.is_finite()) {
            return Err(RetimeError::msg(format!("keyframe time {bad} is not finite")));
        }
        keys.sort_by(|a, b| a.total_cmp(b));
        if let Some(pair) = keys.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(RetimeError::msg(format!(
                "duplicate keyframe at time {}",
                pair[0]
            )));
        }

        let origin = keys.first().copied().unwrap_or(0.0);
        Ok(Self {
            keys,
            range: SelectedRange {
                start: origin,
                end: origin,
            },
            current_time: origin,
            chunk_depth: 0,
            pending: None,
            history: Vec::new(),
            write_log: Vec::new(),
        })
    }

    /// Same as [`MemoryTimeline::new`] with an explicit selection.
    pub fn with_range(
        keys: impl IntoIterator<Item = FrameTime>,
        start: FrameTime,
        end: FrameTime,
    ) -> Result<Self> {
        let mut timeline = Self::new(keys)?;
        timeline.set_range(SelectedRange::new(start, end)?);
        Ok(timeline)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn keyframes(&self) -> &[FrameTime] {
        &self.keys
    }

    pub fn range(&self) -> SelectedRange {
        self.range
    }

    pub fn set_range(&mut self, range: SelectedRange) {
        self.range = range;
    }

    /// Every keyframe move applied since creation, in application order.
    pub fn write_log(&self) -> &[KeyframeChange] {
        &self.write_log
    }

    pub fn is_chunk_open(&self) -> bool {
        self.chunk_depth > 0
    }

    /// Number of closed undo chunks that [`MemoryTimeline::undo`] can revert.
    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    /// Name of the chunk the next [`MemoryTimeline::undo`] would revert.
    pub fn next_undo_name(&self) -> Option<&str> {
        self.history.last().map(|record| record.name.as_str())
    }

    /// Reverts the most recent closed undo chunk as a whole. Returns `false`
    /// when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        if self.is_chunk_open() {
            return Err(RetimeError::msg("cannot undo while an undo chunk is open"));
        }
        let Some(record) = self.history.pop() else {
            return Ok(false);
        };

        for change in record.changes.iter().rev() {
            self.move_key(change.to, change.from)?;
        }
        self.current_time = record.cursor_before;
        tracing::debug!(name = %record.name, changes = record.changes.len(), "undid chunk");
        Ok(true)
    }

    /// Stored keys are finite, so only a NaN `time` leaves the order
    /// undefined; it never matches.
    fn position(&self, time: FrameTime) -> std::result::Result<usize, usize> {
        self.keys
            .binary_search_by(|key| key.partial_cmp(&time).unwrap_or(Ordering::Less))
    }

    fn move_key(&mut self, from: FrameTime, to: FrameTime) -> Result<()> {
        let to = normalize(to);
        let index = self
            .position(from)
            .map_err(|_| RetimeError::MissingKeyframe(from))?;
        if from == to {
            return Ok(());
        }
        if !to.is_finite() {
            return Err(RetimeError::msg(format!("keyframe time {to} is not finite")));
        }
        if self.position(to).is_ok() {
            return Err(RetimeError::Collision { from, to });
        }

        self.keys.remove(index);
        let slot = self.position(to).unwrap_or_else(|slot| slot);
        self.keys.insert(slot, to);
        Ok(())
    }
}

impl TimelineStore for MemoryTimeline {
    fn selected_range(&self) -> Result<SelectedRange> {
        Ok(self.range)
    }

    fn find_keyframe(
        &self,
        direction: Direction,
        reference: Option<FrameTime>,
    ) -> Result<Option<FrameTime>> {
        let reference = reference.unwrap_or(self.current_time);
        if reference.is_nan() {
            return Err(RetimeError::msg("keyframe lookup from a NaN time"));
        }
        let found = match direction {
            Direction::First => self.keys.first().copied(),
            Direction::Last => self.keys.last().copied(),
            Direction::Next => {
                let after = self.keys.partition_point(|&time| time <= reference);
                self.keys.get(after).copied()
            }
            Direction::Previous => {
                let before = self.keys.partition_point(|&time| time < reference);
                before.checked_sub(1).map(|index| self.keys[index])
            }
        };
        Ok(found)
    }

    fn has_keyframe_at(&self, time: FrameTime) -> Result<bool> {
        Ok(self.position(time).is_ok())
    }

    fn change_keyframe_time(&mut self, from: FrameTime, to: FrameTime) -> Result<()> {
        let to = normalize(to);
        self.move_key(from, to)?;
        if from == to {
            return Ok(());
        }

        let change = KeyframeChange { from, to };
        self.write_log.push(change);
        match self.pending.as_mut() {
            Some(record) => record.changes.push(change),
            None => self.history.push(UndoRecord {
                name: "change keyframe time".to_string(),
                changes: vec![change],
                cursor_before: self.current_time,
            }),
        }
        Ok(())
    }

    fn current_time(&self) -> Result<FrameTime> {
        Ok(self.current_time)
    }

    fn set_current_time(&mut self, time: FrameTime) -> Result<()> {
        if !time.is_finite() {
            return Err(RetimeError::msg(format!("cursor time {time} is not finite")));
        }
        self.current_time = normalize(time);
        Ok(())
    }

    fn open_undo_chunk(&mut self, name: &str) -> Result<()> {
        if self.chunk_depth == 0 {
            self.pending = Some(UndoRecord {
                name: name.to_string(),
                changes: Vec::new(),
                cursor_before: self.current_time,
            });
        }
        self.chunk_depth += 1;
        Ok(())
    }

    fn close_undo_chunk(&mut self) -> Result<()> {
        if self.chunk_depth == 0 {
            return Err(RetimeError::msg("no undo chunk is open"));
        }
        self.chunk_depth -= 1;
        if self.chunk_depth == 0 {
            if let Some(record) = self.pending.take() {
                self.history.push(record);
            }
        }
        Ok(())
    }
}
