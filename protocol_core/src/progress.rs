//! Progress and duration aggregation over an instance tree.
//!
//! Everything here is a pure read: totals are recomputed on every call rather
//! than cached on parents, and missing data degrades to zero (or to "complete"
//! for an empty session) instead of failing.

use crate::duration::{format_clock, to_seconds};
use crate::{BlockInstanceId, WorkoutBlockExerciseInstance, WorkoutBlockInstance, WorkoutInstance};
use serde::Serialize;

/// Seconds actually performed across completed exercises
pub fn compute_elapsed(instance: &WorkoutInstance) -> f64 {
    instance.leaves().map(elapsed_seconds).sum()
}

/// Prescribed seconds still outstanding across incomplete exercises
pub fn compute_remaining(instance: &WorkoutInstance) -> f64 {
    instance.leaves().map(remaining_seconds).sum()
}

/// Completed exercises over total exercises, in `[0, 1]`.
///
/// An instance with no exercises is vacuously complete.
pub fn compute_completion_ratio(instance: &WorkoutInstance) -> f64 {
    let (completed, total) = instance
        .leaves()
        .fold((0usize, 0usize), |(done, total), leaf| {
            (done + usize::from(leaf.completed), total + 1)
        });
    ratio(completed, total)
}

/// Per-block subtotals
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct BlockProgress {
    pub block_id: BlockInstanceId,
    pub name: String,
    pub completed: usize,
    pub total: usize,
    pub elapsed_seconds: f64,
    pub remaining_seconds: f64,
}

impl BlockProgress {
    fn of(block: &WorkoutBlockInstance) -> Self {
        Self {
            block_id: block.id,
            name: block.name.clone(),
            completed: block.exercises.iter().filter(|e| e.completed).count(),
            total: block.exercises.len(),
            elapsed_seconds: block.exercises.iter().map(elapsed_seconds).sum(),
            remaining_seconds: block.exercises.iter().map(remaining_seconds).sum(),
        }
    }

    pub fn ratio(&self) -> f64 {
        ratio(self.completed, self.total)
    }
}

/// Subtotals for every block, in session order
pub fn block_progress(instance: &WorkoutInstance) -> Vec<BlockProgress> {
    instance.blocks.iter().map(BlockProgress::of).collect()
}

/// Everything a status display needs about one instance
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProgressSummary {
    pub elapsed_seconds: f64,
    pub remaining_seconds: f64,
    pub elapsed_clock: String,
    pub remaining_clock: String,
    pub completed: usize,
    pub total: usize,
    pub ratio: f64,
    pub blocks: Vec<BlockProgress>,
}

pub fn summarize(instance: &WorkoutInstance) -> ProgressSummary {
    let blocks = block_progress(instance);
    let completed = blocks.iter().map(|b| b.completed).sum();
    let total = blocks.iter().map(|b| b.total).sum();
    let elapsed_seconds = compute_elapsed(instance);
    let remaining_seconds = compute_remaining(instance);

    ProgressSummary {
        elapsed_seconds,
        remaining_seconds,
        elapsed_clock: format_clock(elapsed_seconds),
        remaining_clock: format_clock(remaining_seconds),
        completed,
        total,
        ratio: ratio(completed, total),
        blocks,
    }
}

fn elapsed_seconds(leaf: &WorkoutBlockExerciseInstance) -> f64 {
    if leaf.completed {
        to_seconds(leaf.actual_duration.as_ref())
    } else {
        0.0
    }
}

fn remaining_seconds(leaf: &WorkoutBlockExerciseInstance) -> f64 {
    if leaf.completed {
        0.0
    } else {
        to_seconds(leaf.prescribed.duration.as_ref())
    }
}

fn ratio(completed: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        completed as f64 / total as f64
    }
}
