//! Computes where every keyframe from the range start onwards should land.

use serde::{Deserialize, Serialize};

use crate::{
    store::TimelineStore,
    timeline::{FrameTime, SelectedRange},
    Result, RetimeError,
};

/// Smallest gap an incremental retime may shrink a spacing to.
pub const MIN_SPACING: FrameTime = 1.0;

/// How gaps that start inside the selected range are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RetimePolicy {
    /// Every gap becomes exactly this many frames.
    Absolute(f64),
    /// Every gap grows (or shrinks) by this many frames, floored at
    /// [`MIN_SPACING`].
    Incremental(f64),
}

impl RetimePolicy {
    pub fn new(magnitude: f64, incremental: bool) -> Self {
        if incremental {
            Self::Incremental(magnitude)
        } else {
            Self::Absolute(magnitude)
        }
    }

    pub fn magnitude(&self) -> f64 {
        match *self {
            Self::Absolute(value) | Self::Incremental(value) => value,
        }
    }

    /// Rejects magnitudes that could produce a plan that is not strictly
    /// increasing.
    pub fn validate(&self) -> Result<()> {
        let magnitude = self.magnitude();
        let valid = match self {
            Self::Absolute(spacing) => spacing.is_finite() && *spacing >= MIN_SPACING,
            Self::Incremental(delta) => delta.is_finite(),
        };
        if valid {
            Ok(())
        } else {
            Err(RetimeError::InvalidMagnitude(magnitude))
        }
    }

    /// Width of the gap leaving a keyframe at `time` whose original width was
    /// `gap`. Gaps leaving a keyframe at or after `range_end` are untouched.
    fn planned_gap(&self, time: FrameTime, gap: FrameTime, range_end: FrameTime) -> FrameTime {
        if time >= range_end {
            return gap;
        }
        match *self {
            Self::Absolute(spacing) => spacing,
            Self::Incremental(delta) => {
                let widened = gap + delta;
                if widened < MIN_SPACING {
                    MIN_SPACING
                } else {
                    widened
                }
            }
        }
    }
}

/// Target time for every keyframe from the range-start keyframe through the
/// last keyframe, alongside the times they currently occupy.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimePlan {
    originals: Vec<FrameTime>,
    targets: Vec<FrameTime>,
}

impl TimePlan {
    #[cfg(test)]
    pub(crate) fn from_parts(originals: Vec<FrameTime>, targets: Vec<FrameTime>) -> Self {
        assert_eq!(originals.len(), targets.len());
        Self { originals, targets }
    }

    /// Times the walked keyframes occupied when the plan was built.
    pub fn originals(&self) -> &[FrameTime] {
        &self.originals
    }

    pub fn targets(&self) -> &[FrameTime] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// A plan with at most one entry never moves anything.
    pub fn is_noop(&self) -> bool {
        self.targets.len() <= 1
    }

    /// Time of the range-start keyframe, which the plan never moves.
    pub fn start(&self) -> Option<FrameTime> {
        self.originals.first().copied()
    }

    /// `(from, to)` pairs for keyframes whose time actually changes.
    pub fn changes(&self) -> impl Iterator<Item = (FrameTime, FrameTime)> + '_ {
        self.originals
            .iter()
            .copied()
            .zip(self.targets.iter().copied())
            .filter(|(from, to)| from != to)
    }
}

/// Builds the plan from an ascending run of original keyframe times, the
/// first of which is the range-start keyframe.
pub fn compute_plan(originals: &[FrameTime], range_end: FrameTime, policy: RetimePolicy) -> TimePlan {
    let Some(&start) = originals.first() else {
        return TimePlan::default();
    };

    let mut targets = Vec::with_capacity(originals.len());
    targets.push(start);
    for pair in originals.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        let gap = policy.planned_gap(current, next - current, range_end);
        let previous = targets[targets.len() - 1];
        targets.push(previous + gap);
    }

    TimePlan {
        originals: originals.to_vec(),
        targets,
    }
}

/// Keyframe exactly at `range_start`, or else the closest one before it.
pub fn resolve_start_keyframe<S: TimelineStore + ?Sized>(
    store: &S,
    range_start: FrameTime,
) -> Result<Option<FrameTime>> {
    if store.has_keyframe_at(range_start)? {
        return Ok(Some(range_start));
    }
    store.previous_keyframe(range_start)
}

/// Collects the original times of every keyframe from `start` through the
/// last keyframe on the timeline.
pub fn collect_walk<S: TimelineStore + ?Sized>(store: &S, start: FrameTime) -> Result<Vec<FrameTime>> {
    let last = store.last_keyframe()?.ok_or(RetimeError::NoKeyframes)?;

    let mut walk = vec![start];
    let mut current = start;
    while current < last {
        let next = store.next_keyframe(current)?.ok_or_else(|| {
            RetimeError::msg(format!(
                "timeline ended at {current} before reaching its last keyframe {last}"
            ))
        })?;
        if next <= current {
            return Err(RetimeError::msg(format!(
                "next keyframe after {current} reported at {next}"
            )));
        }
        walk.push(next);
        current = next;
    }
    Ok(walk)
}

/// Reads the timeline and builds the plan for `range`. Yields an empty plan
/// when no keyframe sits at or before the range start.
pub fn build_plan<S: TimelineStore + ?Sized>(
    store: &S,
    range: SelectedRange,
    policy: RetimePolicy,
) -> Result<TimePlan> {
    policy.validate()?;

    let Some(start) = resolve_start_keyframe(store, range.start())? else {
        tracing::debug!(range_start = range.start(), "no keyframe at or before range start");
        return Ok(TimePlan::default());
    };

    let walk = collect_walk(store, start)?;
    let plan = compute_plan(&walk, range.end(), policy);
    tracing::debug!(
        start,
        keyframes = plan.len(),
        targets = ?plan.targets(),
        "built retime plan"
    );
    Ok(plan)
}
