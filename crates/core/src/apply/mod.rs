//! Writes a [`TimePlan`] back into a store without two keyframes ever sharing
//! a time.
//!
//! A keyframe whose target lies before the original time of its successor can
//! move straight away. Any other keyframe has to wait until everything after
//! it has moved out of the way. Walking forward and deferring the second kind
//! onto a stack that is drained in reverse reproduces that order without
//! recursion.

use crate::{plan::TimePlan, store::TimelineStore, Result};

/// Plan indices in the order their writes must be issued.
pub fn write_order(plan: &TimePlan) -> Vec<usize> {
    let originals = plan.originals();
    let targets = plan.targets();

    let mut order = Vec::with_capacity(targets.len());
    let mut deferred = Vec::new();
    for (index, &target) in targets.iter().enumerate() {
        match originals.get(index + 1) {
            Some(&next_original) if target < next_original => order.push(index),
            _ => deferred.push(index),
        }
    }
    order.extend(deferred.into_iter().rev());
    order
}

/// Moves every keyframe of `plan` to its target. Returns the number of writes
/// issued; keyframes already on their target are skipped.
pub fn apply_plan<S: TimelineStore + ?Sized>(store: &mut S, plan: &TimePlan) -> Result<usize> {
    let originals = plan.originals();
    let targets = plan.targets();

    let mut writes = 0;
    for index in write_order(plan) {
        let (from, to) = (originals[index], targets[index]);
        if from == to {
            continue;
        }
        tracing::trace!(index, from, to, "moving keyframe");
        store.change_keyframe_time(from, to)?;
        writes += 1;
    }
    Ok(writes)
}
